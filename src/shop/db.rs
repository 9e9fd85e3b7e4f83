//! SQLite 数据库工具：统一创建连接池
//!
//! 表结构由各 DAO 的 `init_db` 以 `CREATE TABLE IF NOT EXISTS` 方式维护。

use anyhow::{Context, Result};
use sqlx::{sqlite::SqlitePoolOptions, Pool, Sqlite};
use tracing::info;

/// 创建 SQLite 连接池
///
/// `sqlite::memory:` 每个连接都是独立的库，调用方应传 `max_connections = 1`
pub async fn create_sqlite_pool(db_url: &str, max_connections: u32) -> Result<Pool<Sqlite>> {
    info!("[DB] 连接SQLite数据库: {}", db_url);
    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect(db_url)
        .await
        .context(format!("连接SQLite数据库失败: {}", db_url))?;
    Ok(pool)
}
