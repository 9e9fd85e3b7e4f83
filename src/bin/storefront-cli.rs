//! 商城 SDK CLI
//!
//! 非交互式 CLI：每条命令先恢复会话、加载购物车，执行操作后打印购物车

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::sync::Arc;
use storefront_sdk_core::shop::cart::CartListener;
use storefront_sdk_core::{
    ClientConfig, Identity, ProductSnapshot, StorefrontClient, SyncStatus,
};
use tracing::{info, warn};

/// 商城 SDK CLI
#[derive(Parser, Debug)]
#[command(name = "storefront-cli")]
#[command(about = "商城 SDK CLI - 登录并管理购物车", long_about = None)]
struct Args {
    /// HTTP API 基础地址（默认读取 STOREFRONT_API_URL）
    #[arg(long)]
    api_url: Option<String>,

    /// 本地缓存数据库 URL（默认读取 STOREFRONT_CACHE_DB）
    #[arg(long)]
    db: Option<String>,

    /// 日志级别（默认: warn,storefront_sdk_core=info）
    #[arg(long, default_value = "warn,storefront_sdk_core=info")]
    log_level: String,

    /// 同时把日志追加写入该文件
    #[arg(long)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 登录
    Login { email: String, password: String },
    /// 注册并登录
    Register {
        name: String,
        email: String,
        password: String,
        #[arg(long, default_value = "")]
        phone: String,
    },
    /// 登出
    Logout,
    /// 显示当前身份
    Whoami,
    /// 显示购物车
    Show,
    /// 加入购物车
    Add {
        product_id: String,
        name: String,
        price: Decimal,
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// 删除条目
    Remove { product_id: String },
    /// 修改数量（<= 0 表示删除）
    Update {
        product_id: String,
        #[arg(allow_hyphen_values = true)]
        quantity: i64,
    },
    /// 清空购物车
    Clear,
    /// 显示收藏夹
    Wishlist,
    /// 收藏商品
    Wish { product_id: String },
    /// 取消收藏
    Unwish { product_id: String },
}

/// 初始化日志（输出到 stderr，可选追加到文件）
fn init_logger(log_level: &str, log_file: Option<&PathBuf>) -> Result<()> {
    use std::fs::OpenOptions;
    use std::io;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    // 优先使用环境变量 RUST_LOG（如果设置了），否则使用命令行参数
    let filter_layer =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_file(true)
        .with_line_number(true)
        .with_target(false)
        .with_ansi(true);

    // 文件不需要颜色
    let file_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("无法创建日志文件 {}", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(file)
                    .with_file(true)
                    .with_line_number(true)
                    .with_target(false)
                    .with_ansi(false),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    if let Some(path) = log_file {
        info!("[CLI] 📝 日志同时输出到文件: {}", path.display());
    }
    Ok(())
}

/// 把购物车回调写入日志
struct CliCartListener;

#[async_trait]
impl CartListener for CliCartListener {
    async fn on_cart_changed(&self, items_json: String) {
        info!("[CLI/Cart] 🛒 购物车变更: {}", items_json);
    }

    async fn on_sync_status_changed(&self, status: SyncStatus) {
        info!("[CLI/Cart] 🔄 同步状态: {}", status);
    }

    async fn on_sync_diverged(&self, product_id: String) {
        warn!(
            "[CLI/Cart] ⚠️ 商品 {} 的修改只在本地生效，服务端购物车可能不一致",
            product_id
        );
    }
}

fn print_identity(identity: &Identity) {
    match identity.user_id() {
        Some(id) => println!("当前用户: {}", id),
        None => println!("当前身份: 匿名"),
    }
}

fn print_cart(client: &StorefrontClient) {
    let state = client.cart().state();
    println!("购物车（{}）", state.sync_status);
    if state.items.is_empty() {
        println!("  (空)");
    }
    for item in &state.items {
        println!(
            "  {:<12} {:<24} {:>10} × {:<4} = {}",
            item.product_id,
            item.name,
            item.unit_price,
            item.quantity,
            item.subtotal()
        );
    }
    println!("合计: {} 件, {}", state.count(), state.total());
}

fn print_wishlist(client: &StorefrontClient) {
    let items = client.wishlist().items();
    println!("收藏夹");
    if items.is_empty() {
        println!("  (空)");
    }
    for item in &items {
        let price = item
            .price
            .map(|p| p.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!("  {:<12} {:<24} {:>10}", item.product_id, item.name, price);
    }
}

fn report_status(status: SyncStatus) {
    if status == SyncStatus::SyncFailed {
        println!("⚠️ 服务端不可用，修改已保存在本地");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logger(&args.log_level, args.log_file.as_ref())?;

    let mut config = ClientConfig::from_env();
    if let Some(url) = args.api_url {
        config.api_base_url = url;
    }
    if let Some(db) = args.db {
        config.cache_db_url = db;
    }
    info!(
        "[CLI] 🚀 启动，API: {}, 缓存: {}",
        config.api_base_url, config.cache_db_url
    );

    let client = StorefrontClient::with_listener(config, Arc::new(CliCartListener)).await?;
    let identity = client.init().await;

    match args.command {
        Command::Login { email, password } => {
            let user = client.session().login(&email, &password).await?;
            println!("✅ 登录成功: {} <{}>", user.name, user.email);
        }
        Command::Register {
            name,
            email,
            password,
            phone,
        } => {
            let user = client
                .session()
                .register(&name, &email, &password, &phone)
                .await?;
            println!("✅ 注册成功: {} <{}>", user.name, user.email);
        }
        Command::Logout => {
            client.session().logout().await;
            println!("👋 已登出");
        }
        Command::Whoami => {
            print_identity(&identity);
            return Ok(());
        }
        Command::Show => {}
        Command::Add {
            product_id,
            name,
            price,
            quantity,
        } => {
            let product = ProductSnapshot::new(product_id, price).with_name(name);
            let status = client.cart().add_item(&product, quantity).await?;
            report_status(status);
        }
        Command::Remove { product_id } => {
            report_status(client.cart().remove_item(&product_id).await);
        }
        Command::Update {
            product_id,
            quantity,
        } => {
            report_status(client.cart().update_quantity(&product_id, quantity).await);
        }
        Command::Clear => {
            report_status(client.cart().clear().await);
        }
        Command::Wishlist => {
            print_wishlist(&client);
            return Ok(());
        }
        Command::Wish { product_id } => {
            if !client.wishlist().add(&product_id).await {
                println!("⚠️ 收藏失败（需要登录且服务端可用）");
            }
            print_wishlist(&client);
            return Ok(());
        }
        Command::Unwish { product_id } => {
            client.wishlist().remove(&product_id).await;
            print_wishlist(&client);
            return Ok(());
        }
    }

    print_cart(&client);
    Ok(())
}
