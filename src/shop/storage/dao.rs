//! 本地缓存数据访问层（DAO）
//!
//! 单表 key-value，value 为 BLOB。

use crate::shop::serialization::now_millis;
use crate::shop::storage::kv::KvStore;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{Pool, Row, Sqlite};
use tracing::{debug, info};

/// 基于 sqlx 的本地缓存
pub struct SqliteKvStore {
    db: Pool<Sqlite>,
}

impl SqliteKvStore {
    /// 创建并初始化表结构
    pub async fn new(db: Pool<Sqlite>) -> Result<Self> {
        let store = Self { db };
        store.init_db().await?;
        Ok(store)
    }

    /// 初始化数据库表结构
    pub async fn init_db(&self) -> Result<()> {
        info!("[KvDAO/DB] 初始化本地缓存表结构");
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS local_kv (
                key TEXT PRIMARY KEY,
                value BLOB NOT NULL,
                updated_at INTEGER NOT NULL DEFAULT 0
            )
            "#,
        )
        .execute(&self.db)
        .await
        .context("创建本地缓存表失败")?;
        Ok(())
    }
}

#[async_trait]
impl KvStore for SqliteKvStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let row = sqlx::query("SELECT value FROM local_kv WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.db)
            .await
            .context(format!("读取本地缓存失败: {}", key))?;

        let value = row.map(|r| r.get::<Vec<u8>, _>("value"));
        debug!(
            "[KvDAO] 读取 {}，{}",
            key,
            value
                .as_ref()
                .map(|v| format!("{} 字节", v.len()))
                .unwrap_or_else(|| "不存在".to_string())
        );
        Ok(value)
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO local_kv (key, value, updated_at) VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(now_millis())
        .execute(&self.db)
        .await
        .context(format!("写入本地缓存失败: {}", key))?;
        debug!("[KvDAO] 写入 {}，{} 字节", key, value.len());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM local_kv WHERE key = ?")
            .bind(key)
            .execute(&self.db)
            .await
            .context(format!("删除本地缓存失败: {}", key))?;
        debug!("[KvDAO] 删除 {}", key);
        Ok(())
    }
}
