//! 测试辅助：内存版远程购物车、可切换身份、记录型监听器

use crate::shop::auth::{Identity, IdentityListener, IdentityProvider};
use crate::shop::cart::api::RemoteCartService;
use crate::shop::cart::listener::CartListener;
use crate::shop::cart::models::{ProductSnapshot, SyncStatus};
use crate::shop::cart::types::{ServerCartItem, ServerProduct};
use crate::shop::error::{CartError, CartResult};
use crate::shop::wishlist::api::RemoteWishlistService;
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Once, Weak};

static INIT_LOGGER: Once = Once::new();

/// 测试中默认打开当前 crate 的 debug 日志
pub fn init_test_logger() {
    INIT_LOGGER.call_once(|| {
        use tracing_subscriber::prelude::*;
        use tracing_subscriber::EnvFilter;

        let filter_layer = EnvFilter::new("info,storefront_sdk_core=debug");
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_file(true)
            .with_line_number(true)
            .with_target(false)
            .with_test_writer();

        tracing_subscriber::registry()
            .with(filter_layer)
            .with(fmt_layer)
            .init();
    });
}

#[derive(Clone)]
struct ServerLine {
    line_id: u64,
    product: ProductSnapshot,
    quantity: u32,
}

/// 内存中的远程购物车服务；`set_failing(true)` 后所有调用都模拟超时
#[derive(Default)]
pub struct FakeCartService {
    carts: Mutex<HashMap<String, Vec<ServerLine>>>,
    catalog: Mutex<HashMap<String, ProductSnapshot>>,
    next_line_id: AtomicUsize,
    failing: AtomicBool,
    calls: AtomicUsize,
}

impl FakeCartService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// 远程调用次数（包括失败的调用）
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// 登记商品（服务端 addToCart 只收到 productId，需要从目录取价格）
    pub fn register_product(&self, product: &ProductSnapshot) {
        self.catalog
            .lock()
            .insert(product.product_id.clone(), product.clone());
    }

    /// 直接在服务端放入一条记录
    pub fn seed(&self, user_id: &str, product: &ProductSnapshot, quantity: u32) {
        self.register_product(product);
        self.insert(user_id, &product.product_id, quantity);
    }

    pub fn server_quantity(&self, user_id: &str, product_id: &str) -> Option<u32> {
        self.carts.lock().get(user_id).and_then(|lines| {
            lines
                .iter()
                .find(|l| l.product.product_id == product_id)
                .map(|l| l.quantity)
        })
    }

    fn insert(&self, user_id: &str, product_id: &str, quantity: u32) {
        let product = self
            .catalog
            .lock()
            .get(product_id)
            .cloned()
            .unwrap_or_else(|| ProductSnapshot::new(product_id, Default::default()));
        let mut carts = self.carts.lock();
        let lines = carts.entry(user_id.to_string()).or_default();
        match lines.iter_mut().find(|l| l.product.product_id == product_id) {
            Some(line) => line.quantity += quantity,
            None => {
                let line_id = self.next_line_id.fetch_add(1, Ordering::SeqCst) as u64 + 1;
                lines.push(ServerLine {
                    line_id,
                    product,
                    quantity,
                });
            }
        }
    }

    fn begin(&self) -> CartResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(CartError::NetworkUnavailable(
                "operation timed out".to_string(),
            ));
        }
        Ok(())
    }

    fn not_found(cart_item_id: &str) -> CartError {
        CartError::Remote {
            status: 404,
            message: format!("cart item {} not found", cart_item_id),
        }
    }
}

#[async_trait]
impl RemoteCartService for FakeCartService {
    async fn get_cart(&self, user_id: &str) -> CartResult<Vec<ServerCartItem>> {
        self.begin()?;
        let carts = self.carts.lock();
        let lines = carts.get(user_id).cloned().unwrap_or_default();
        Ok(lines
            .into_iter()
            .map(|l| ServerCartItem {
                id: Some(l.line_id.to_string()),
                product: ServerProduct {
                    id: l.product.product_id.clone(),
                    name: Some(l.product.name.clone()),
                    price: Some(l.product.unit_price),
                    original_price: l.product.original_unit_price,
                    image: None,
                    model: None,
                },
                quantity: i64::from(l.quantity),
            })
            .collect())
    }

    async fn add_to_cart(&self, user_id: &str, product_id: &str, quantity: u32) -> CartResult<()> {
        self.begin()?;
        self.insert(user_id, product_id, quantity);
        Ok(())
    }

    async fn update_cart_item(
        &self,
        user_id: &str,
        cart_item_id: &str,
        quantity: u32,
    ) -> CartResult<()> {
        self.begin()?;
        let mut carts = self.carts.lock();
        let line = carts
            .get_mut(user_id)
            .and_then(|lines| {
                lines
                    .iter_mut()
                    .find(|l| l.line_id.to_string() == cart_item_id)
            })
            .ok_or_else(|| Self::not_found(cart_item_id))?;
        line.quantity = quantity;
        Ok(())
    }

    async fn remove_from_cart(&self, user_id: &str, cart_item_id: &str) -> CartResult<()> {
        self.begin()?;
        let mut carts = self.carts.lock();
        let lines = carts
            .get_mut(user_id)
            .ok_or_else(|| Self::not_found(cart_item_id))?;
        let before = lines.len();
        lines.retain(|l| l.line_id.to_string() != cart_item_id);
        if lines.len() == before {
            return Err(Self::not_found(cart_item_id));
        }
        Ok(())
    }

    async fn clear_cart(&self, user_id: &str) -> CartResult<()> {
        self.begin()?;
        self.carts.lock().remove(user_id);
        Ok(())
    }
}

/// 内存中的远程收藏夹服务（按用户保存商品 ID，最新收藏在前）
#[derive(Default)]
pub struct FakeWishlistService {
    lists: Mutex<HashMap<String, Vec<String>>>,
    failing: AtomicBool,
    calls: AtomicUsize,
}

impl FakeWishlistService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seed(&self, user_id: &str, product_id: &str) {
        self.lists
            .lock()
            .entry(user_id.to_string())
            .or_default()
            .insert(0, product_id.to_string());
    }

    fn begin(&self) -> CartResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(CartError::NetworkUnavailable(
                "operation timed out".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteWishlistService for FakeWishlistService {
    async fn get_wishlist(&self, user_id: &str) -> CartResult<Vec<ServerProduct>> {
        self.begin()?;
        let lists = self.lists.lock();
        Ok(lists
            .get(user_id)
            .map(|ids| {
                ids.iter()
                    .map(|id| ServerProduct {
                        id: id.clone(),
                        name: Some(format!("Product {}", id)),
                        price: None,
                        original_price: None,
                        image: None,
                        model: None,
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn add_to_wishlist(&self, user_id: &str, product_id: &str) -> CartResult<()> {
        self.begin()?;
        let already = self
            .lists
            .lock()
            .get(user_id)
            .is_some_and(|ids| ids.iter().any(|id| id == product_id));
        if !already {
            self.seed(user_id, product_id);
        }
        Ok(())
    }

    async fn remove_from_wishlist(&self, user_id: &str, product_id: &str) -> CartResult<()> {
        self.begin()?;
        if let Some(ids) = self.lists.lock().get_mut(user_id) {
            ids.retain(|id| id != product_id);
        }
        Ok(())
    }
}

/// 可手动切换的身份提供者
#[derive(Default)]
pub struct StaticIdentity {
    identity: RwLock<Identity>,
    listeners: RwLock<Vec<Weak<dyn IdentityListener>>>,
}

impl StaticIdentity {
    pub fn new(identity: Identity) -> Self {
        Self {
            identity: RwLock::new(identity),
            listeners: RwLock::new(Vec::new()),
        }
    }

    /// 只修改身份，不通知
    pub fn set_silently(&self, identity: Identity) {
        *self.identity.write() = identity;
    }

    /// 修改身份并通知订阅者
    pub async fn switch_to(&self, identity: Identity) {
        self.set_silently(identity.clone());
        let listeners: Vec<Arc<dyn IdentityListener>> = self
            .listeners
            .read()
            .iter()
            .filter_map(Weak::upgrade)
            .collect();
        for listener in listeners {
            listener.on_identity_changed(identity.clone()).await;
        }
    }
}

impl IdentityProvider for StaticIdentity {
    fn current_identity(&self) -> Identity {
        self.identity.read().clone()
    }

    fn subscribe(&self, listener: Weak<dyn IdentityListener>) {
        self.listeners.write().push(listener);
    }
}

/// 记录所有回调的监听器
#[derive(Default)]
pub struct RecordingCartListener {
    pub changes: Mutex<Vec<String>>,
    pub statuses: Mutex<Vec<SyncStatus>>,
    pub diverged: Mutex<Vec<String>>,
}

#[async_trait]
impl CartListener for RecordingCartListener {
    async fn on_cart_changed(&self, items_json: String) {
        self.changes.lock().push(items_json);
    }

    async fn on_sync_status_changed(&self, status: SyncStatus) {
        self.statuses.lock().push(status);
    }

    async fn on_sync_diverged(&self, product_id: String) {
        self.diverged.lock().push(product_id);
    }
}
