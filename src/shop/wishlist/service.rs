//! 收藏夹服务层
//!
//! 只在已登录时访问服务端；匿名或拉取失败时收藏夹为空。
//! 收藏/取消收藏成功后重新拉取整个列表。

use crate::shop::auth::{Identity, IdentityListener, IdentityProvider};
use crate::shop::wishlist::api::RemoteWishlistService;
use crate::shop::wishlist::listener::{EmptyWishlistListener, WishlistListener};
use crate::shop::wishlist::models::{WishlistItem, WishlistState};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

pub struct WishlistStore {
    identity: Arc<dyn IdentityProvider>,
    service: Arc<dyn RemoteWishlistService>,
    listener: Arc<dyn WishlistListener>,
    state: RwLock<WishlistState>,
    gate: Mutex<()>,
}

impl WishlistStore {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        service: Arc<dyn RemoteWishlistService>,
    ) -> Self {
        Self::with_listener(identity, service, Arc::new(EmptyWishlistListener))
    }

    pub fn with_listener(
        identity: Arc<dyn IdentityProvider>,
        service: Arc<dyn RemoteWishlistService>,
        listener: Arc<dyn WishlistListener>,
    ) -> Self {
        let owner = identity.current_identity();
        Self {
            identity,
            service,
            listener,
            state: RwLock::new(WishlistState::empty(owner)),
            gate: Mutex::new(()),
        }
    }

    pub fn items(&self) -> Vec<WishlistItem> {
        self.state.read().items.clone()
    }

    pub fn contains(&self, product_id: &str) -> bool {
        self.state.read().contains(product_id)
    }

    pub fn product_ids(&self) -> HashSet<String> {
        self.state.read().product_ids()
    }

    pub fn is_loading(&self) -> bool {
        self.state.read().loading
    }

    pub fn state(&self) -> WishlistState {
        self.state.read().clone()
    }

    /// 重新拉取收藏夹
    pub async fn refresh(&self) {
        let _guard = self.gate.lock().await;
        let owner = self.identity.current_identity();
        self.refresh_locked(owner).await;
    }

    /// 收藏商品，返回是否成功；匿名身份直接返回 false
    pub async fn add(&self, product_id: &str) -> bool {
        let _guard = self.gate.lock().await;
        let owner = self.identity.current_identity();
        let Some(user_id) = owner.user_id() else {
            warn!("[Wishlist] 匿名身份不能收藏商品 {}", product_id);
            return false;
        };
        if product_id.trim().is_empty() {
            warn!("[Wishlist] 拒绝收藏：商品ID为空");
            return false;
        }

        match self.service.add_to_wishlist(user_id, product_id).await {
            Ok(()) => {
                info!("[Wishlist] ✅ 已收藏商品 {}", product_id);
                self.refresh_locked(owner.clone()).await;
                true
            }
            Err(e) => {
                error!("[Wishlist] 收藏商品 {} 失败: {}", product_id, e);
                false
            }
        }
    }

    /// 取消收藏；失败只记日志
    pub async fn remove(&self, product_id: &str) {
        let _guard = self.gate.lock().await;
        let owner = self.identity.current_identity();
        let Some(user_id) = owner.user_id() else {
            debug!("[Wishlist] 匿名身份，忽略取消收藏 {}", product_id);
            return;
        };

        match self.service.remove_from_wishlist(user_id, product_id).await {
            Ok(()) => {
                info!("[Wishlist] 已取消收藏商品 {}", product_id);
                self.refresh_locked(owner.clone()).await;
            }
            Err(e) => error!("[Wishlist] 取消收藏商品 {} 失败: {}", product_id, e),
        }
    }

    async fn refresh_locked(&self, owner: Identity) {
        {
            let mut state = self.state.write();
            if state.owner != owner {
                *state = WishlistState::empty(owner.clone());
            }
            state.loading = true;
        }

        let items = match owner.user_id() {
            None => Vec::new(),
            Some(user_id) => match self.service.get_wishlist(user_id).await {
                Ok(products) => products.into_iter().map(WishlistItem::from).collect(),
                Err(e) => {
                    error!("[Wishlist] 拉取收藏夹失败，按空列表处理: {}", e);
                    Vec::new()
                }
            },
        };
        debug!("[Wishlist] {} 的收藏夹共 {} 件", owner, items.len());

        let items_json = {
            let mut state = self.state.write();
            state.owner = owner;
            state.items = items;
            state.loading = false;
            serde_json::to_string(&state.items).unwrap_or_else(|e| {
                error!("[Wishlist] 序列化收藏夹失败: {}", e);
                "[]".to_string()
            })
        };
        self.listener.on_wishlist_changed(items_json).await;
    }
}

#[async_trait]
impl IdentityListener for WishlistStore {
    async fn on_identity_changed(&self, identity: Identity) {
        let _guard = self.gate.lock().await;
        info!("[Wishlist] 身份变更为 {}，重新拉取收藏夹", identity);
        self.refresh_locked(identity).await;
    }
}
