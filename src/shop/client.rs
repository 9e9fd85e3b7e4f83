//! 客户端组装
//!
//! 构建 HTTP 客户端、本地缓存、会话与购物车，并把购物车注册为身份监听器。

use crate::shop::auth::{AuthApi, Identity, IdentityListener, IdentityProvider, Session};
use crate::shop::cart::{
    CartApi, CartListener, CartStore, EmptyCartListener, FallbackCartRepository,
};
use crate::shop::db::create_sqlite_pool;
use crate::shop::storage::{KvStore, SqliteKvStore};
use crate::shop::wishlist::{
    EmptyWishlistListener, WishlistApi, WishlistListener, WishlistStore,
};
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// 客户端配置
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// HTTP API 基础地址
    pub api_base_url: String,
    /// 远程调用超时，超时按网络失败处理
    pub request_timeout: Duration,
    /// 本地缓存使用的 SQLite 数据库 URL
    ///
    /// 例如：`sqlite://storefront.db?mode=rwc`
    pub cache_db_url: String,
    pub cache_max_connections: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientConfig {
    /// 创建默认配置
    pub fn new() -> Self {
        Self {
            api_base_url: "http://localhost:8080/api".to_string(),
            request_timeout: Duration::from_secs(30),
            cache_db_url: "sqlite://storefront.db?mode=rwc".to_string(),
            cache_max_connections: 5,
        }
    }

    /// 默认配置 + 环境变量覆盖
    ///
    /// `STOREFRONT_API_URL`、`STOREFRONT_CACHE_DB`、`STOREFRONT_TIMEOUT_SECS`
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::new();
        if let Some(url) = lookup("STOREFRONT_API_URL").filter(|s| !s.is_empty()) {
            config.api_base_url = url;
        }
        if let Some(db) = lookup("STOREFRONT_CACHE_DB").filter(|s| !s.is_empty()) {
            config.cache_db_url = db;
        }
        if let Some(raw) = lookup("STOREFRONT_TIMEOUT_SECS") {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => config.request_timeout = Duration::from_secs(secs),
                _ => warn!(
                    "[Client] 忽略无效的 STOREFRONT_TIMEOUT_SECS: {:?}",
                    raw
                ),
            }
        }
        config
    }

    /// 去掉末尾的 `/`，避免拼出 `//cart`
    fn base_url(&self) -> String {
        self.api_base_url.trim_end_matches('/').to_string()
    }
}

/// 商城 SDK 客户端
pub struct StorefrontClient {
    config: ClientConfig,
    session: Arc<Session>,
    cart: Arc<CartStore>,
    wishlist: Arc<WishlistStore>,
}

impl StorefrontClient {
    /// 使用 SQLite 本地缓存创建客户端（默认空购物车监听器）
    pub async fn new(config: ClientConfig) -> Result<Self> {
        Self::with_listener(config, Arc::new(EmptyCartListener)).await
    }

    /// 使用 SQLite 本地缓存创建客户端（带购物车监听器）
    pub async fn with_listener(
        config: ClientConfig,
        listener: Arc<dyn CartListener>,
    ) -> Result<Self> {
        let pool = create_sqlite_pool(&config.cache_db_url, config.cache_max_connections).await?;
        let store = SqliteKvStore::new(pool).await?;
        Self::with_store(config, Arc::new(store), listener)
    }

    /// 使用外部提供的本地缓存创建客户端
    pub fn with_store(
        config: ClientConfig,
        store: Arc<dyn KvStore>,
        listener: Arc<dyn CartListener>,
    ) -> Result<Self> {
        Self::with_listeners(config, store, listener, Arc::new(EmptyWishlistListener))
    }

    /// 使用外部提供的本地缓存创建客户端（购物车与收藏夹监听器）
    pub fn with_listeners(
        config: ClientConfig,
        store: Arc<dyn KvStore>,
        listener: Arc<dyn CartListener>,
        wishlist_listener: Arc<dyn WishlistListener>,
    ) -> Result<Self> {
        info!(
            "[Client] 创建客户端，API: {}, 超时: {:?}",
            config.api_base_url, config.request_timeout
        );
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .context("创建 HTTP 客户端失败")?;

        let base_url = config.base_url();
        let session = Arc::new(Session::new(
            AuthApi::new(http_client.clone(), base_url.clone()),
            store.clone(),
        ));
        let cart_api = Arc::new(CartApi::new(http_client.clone(), base_url.clone()));
        let wishlist_api = Arc::new(WishlistApi::new(http_client, base_url));
        let repository = FallbackCartRepository::from_parts(cart_api, store);
        let cart = Arc::new(CartStore::with_listener(
            session.clone(),
            repository,
            listener,
        ));

        let wishlist = Arc::new(WishlistStore::with_listener(
            session.clone(),
            wishlist_api,
            wishlist_listener,
        ));

        // 会话只持有购物车和收藏夹的弱引用
        let cart_listener: Arc<dyn IdentityListener> = cart.clone();
        session.subscribe(Arc::downgrade(&cart_listener));
        let wishlist_listener: Arc<dyn IdentityListener> = wishlist.clone();
        session.subscribe(Arc::downgrade(&wishlist_listener));

        Ok(Self {
            config,
            session,
            cart,
            wishlist,
        })
    }

    /// 恢复登录状态并加载购物车（收藏夹随身份变更拉取，匿名时为空）
    pub async fn init(&self) -> Identity {
        let identity = self.session.restore().await;
        // 恢复出登录用户时，身份变更通知已经触发过一次加载
        if identity.is_anonymous() {
            self.cart.load().await;
        }
        info!(
            "[Client] ✅ 初始化完成，身份: {}, 购物车状态: {}",
            identity,
            self.cart.sync_status()
        );
        identity
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn cart(&self) -> &Arc<CartStore> {
        &self.cart
    }

    pub fn wishlist(&self) -> &Arc<WishlistStore> {
        &self.wishlist
    }
}
