//! 购物车仓储
//!
//! 两级数据源：本地缓存（LocalCartRepository）与远程购物车服务
//! （RemoteCartRepository），由 FallbackCartRepository 组合：
//! 已登录时优先远程，远程失败则回退本地；匿名时只用本地。

use crate::shop::auth::Identity;
use crate::shop::cart::api::RemoteCartService;
use crate::shop::cart::models::{
    merge_line, normalize_lines, remove_line, set_line_quantity, CartCacheEnvelope, CartLineItem,
    CartSnapshot, ProductSnapshot, SyncStatus,
};
use crate::shop::cart::types::ServerCartItem;
use crate::shop::error::{CartError, CartResult};
use crate::shop::serialization::now_millis;
use crate::shop::storage::KvStore;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// 本地缓存中保存购物车快照的 key
pub const CART_CACHE_KEY: &str = "cart";

/// 购物车数据源
///
/// 每个变更操作接收当前条目，返回变更后的完整条目列表
#[async_trait]
pub trait CartRepository: Send + Sync {
    async fn fetch(&self, owner: &Identity) -> CartResult<Vec<CartLineItem>>;

    async fn add(
        &self,
        owner: &Identity,
        current: &[CartLineItem],
        product: &ProductSnapshot,
        quantity: u32,
    ) -> CartResult<Vec<CartLineItem>>;

    async fn update_quantity(
        &self,
        owner: &Identity,
        current: &[CartLineItem],
        product_id: &str,
        quantity: u32,
    ) -> CartResult<Vec<CartLineItem>>;

    async fn remove(
        &self,
        owner: &Identity,
        current: &[CartLineItem],
        product_id: &str,
    ) -> CartResult<Vec<CartLineItem>>;

    async fn clear(&self, owner: &Identity) -> CartResult<()>;
}

// ========== 本地 ==========

/// 本地缓存仓储：纯本地变更 + 尽力持久化
///
/// 缓存读写失败只记日志，不影响内存中的结果
pub struct LocalCartRepository {
    store: Arc<dyn KvStore>,
}

impl LocalCartRepository {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// 读取快照；缓存缺失、损坏或属于其他身份时返回空
    pub async fn read_snapshot(&self, owner: &Identity) -> Vec<CartLineItem> {
        let bytes = match self.store.get(CART_CACHE_KEY).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!(
                    "[CartRepo/Local] {}",
                    CartError::Storage(format!("{:#}", e))
                );
                return Vec::new();
            }
        };

        let envelope: CartCacheEnvelope = match serde_json::from_slice(&bytes) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!("[CartRepo/Local] 购物车快照损坏，忽略: {}", e);
                return Vec::new();
            }
        };

        if envelope.owner.as_deref() != owner.user_id() {
            debug!(
                "[CartRepo/Local] 快照属于 {:?}，当前身份 {}，忽略",
                envelope.owner, owner
            );
            return Vec::new();
        }

        let items = normalize_lines(envelope.items);
        debug!("[CartRepo/Local] 读取本地快照，共 {} 条", items.len());
        items
    }

    /// 写入快照
    pub async fn write_snapshot(&self, owner: &Identity, items: &[CartLineItem]) {
        let envelope = CartCacheEnvelope {
            owner: owner.user_id().map(str::to_string),
            saved_at: now_millis(),
            items: items.to_vec(),
        };
        let bytes = match serde_json::to_vec(&envelope) {
            Ok(bytes) => bytes,
            Err(e) => {
                error!("[CartRepo/Local] 序列化购物车快照失败: {}", e);
                return;
            }
        };
        match self.store.set(CART_CACHE_KEY, &bytes).await {
            Ok(()) => debug!("[CartRepo/Local] 已保存本地快照，共 {} 条", items.len()),
            Err(e) => warn!(
                "[CartRepo/Local] {}",
                CartError::Storage(format!("{:#}", e))
            ),
        }
    }

    /// 删除快照
    pub async fn remove_snapshot(&self) {
        if let Err(e) = self.store.remove(CART_CACHE_KEY).await {
            warn!(
                "[CartRepo/Local] {}",
                CartError::Storage(format!("{:#}", e))
            );
        }
    }
}

#[async_trait]
impl CartRepository for LocalCartRepository {
    async fn fetch(&self, owner: &Identity) -> CartResult<Vec<CartLineItem>> {
        Ok(self.read_snapshot(owner).await)
    }

    async fn add(
        &self,
        owner: &Identity,
        current: &[CartLineItem],
        product: &ProductSnapshot,
        quantity: u32,
    ) -> CartResult<Vec<CartLineItem>> {
        let items = merge_line(current, product, quantity);
        self.write_snapshot(owner, &items).await;
        Ok(items)
    }

    async fn update_quantity(
        &self,
        owner: &Identity,
        current: &[CartLineItem],
        product_id: &str,
        quantity: u32,
    ) -> CartResult<Vec<CartLineItem>> {
        let items = set_line_quantity(current, product_id, quantity);
        self.write_snapshot(owner, &items).await;
        Ok(items)
    }

    async fn remove(
        &self,
        owner: &Identity,
        current: &[CartLineItem],
        product_id: &str,
    ) -> CartResult<Vec<CartLineItem>> {
        let items = remove_line(current, product_id);
        self.write_snapshot(owner, &items).await;
        Ok(items)
    }

    async fn clear(&self, _owner: &Identity) -> CartResult<()> {
        self.remove_snapshot().await;
        Ok(())
    }
}

// ========== 远程 ==========

/// 远程仓储：每次变更后重新拉取服务端购物车
pub struct RemoteCartRepository {
    service: Arc<dyn RemoteCartService>,
}

impl RemoteCartRepository {
    pub fn new(service: Arc<dyn RemoteCartService>) -> Self {
        Self { service }
    }

    fn user_id(owner: &Identity) -> CartResult<&str> {
        owner.user_id().ok_or(CartError::Unauthenticated)
    }

    fn server_line_id<'a>(current: &'a [CartLineItem], product_id: &str) -> CartResult<&'a str> {
        current
            .iter()
            .find(|i| i.product_id == product_id)
            .and_then(|i| i.server_line_id.as_deref())
            .ok_or_else(|| CartError::MissingServerLineId {
                product_id: product_id.to_string(),
            })
    }
}

#[async_trait]
impl CartRepository for RemoteCartRepository {
    async fn fetch(&self, owner: &Identity) -> CartResult<Vec<CartLineItem>> {
        let user_id = Self::user_id(owner)?;
        let server_items = self.service.get_cart(user_id).await?;
        let items = normalize_lines(
            server_items
                .into_iter()
                .filter_map(ServerCartItem::into_line_item)
                .collect(),
        );
        debug!("[CartRepo/Remote] 服务端购物车，共 {} 条", items.len());
        Ok(items)
    }

    async fn add(
        &self,
        owner: &Identity,
        _current: &[CartLineItem],
        product: &ProductSnapshot,
        quantity: u32,
    ) -> CartResult<Vec<CartLineItem>> {
        let user_id = Self::user_id(owner)?;
        self.service
            .add_to_cart(user_id, &product.product_id, quantity)
            .await?;
        self.fetch(owner).await
    }

    async fn update_quantity(
        &self,
        owner: &Identity,
        current: &[CartLineItem],
        product_id: &str,
        quantity: u32,
    ) -> CartResult<Vec<CartLineItem>> {
        let user_id = Self::user_id(owner)?;
        let line_id = Self::server_line_id(current, product_id)?;
        self.service
            .update_cart_item(user_id, line_id, quantity)
            .await?;
        self.fetch(owner).await
    }

    async fn remove(
        &self,
        owner: &Identity,
        current: &[CartLineItem],
        product_id: &str,
    ) -> CartResult<Vec<CartLineItem>> {
        let user_id = Self::user_id(owner)?;
        let line_id = Self::server_line_id(current, product_id)?;
        self.service.remove_from_cart(user_id, line_id).await?;
        self.fetch(owner).await
    }

    async fn clear(&self, owner: &Identity) -> CartResult<()> {
        let user_id = Self::user_id(owner)?;
        self.service.clear_cart(user_id).await
    }
}

// ========== 回退组合 ==========

/// 远程失败时回退到本地的组合仓储
///
/// 所有方法都不返回错误，远程失败只体现在 `SyncStatus::SyncFailed`
pub struct FallbackCartRepository {
    remote: Arc<dyn CartRepository>,
    local: LocalCartRepository,
}

impl FallbackCartRepository {
    pub fn new(remote: Arc<dyn CartRepository>, local: LocalCartRepository) -> Self {
        Self { remote, local }
    }

    /// 由远程服务和本地缓存直接构建
    pub fn from_parts(service: Arc<dyn RemoteCartService>, store: Arc<dyn KvStore>) -> Self {
        Self::new(
            Arc::new(RemoteCartRepository::new(service)),
            LocalCartRepository::new(store),
        )
    }

    pub async fn load(&self, owner: &Identity) -> CartSnapshot {
        if owner.is_anonymous() {
            let items = self.local.read_snapshot(owner).await;
            return CartSnapshot {
                items,
                status: SyncStatus::LocalOnly,
                diverged: None,
            };
        }

        match self.remote.fetch(owner).await {
            Ok(items) => self.synced(owner, items).await,
            Err(e) => {
                Self::report_failure("加载购物车", &e);
                let items = self.local.read_snapshot(owner).await;
                info!(
                    "[CartRepo] 已回退到本地快照，共 {} 条",
                    items.len()
                );
                CartSnapshot {
                    items,
                    status: SyncStatus::SyncFailed,
                    diverged: None,
                }
            }
        }
    }

    pub async fn add(
        &self,
        owner: &Identity,
        current: &[CartLineItem],
        product: &ProductSnapshot,
        quantity: u32,
    ) -> CartSnapshot {
        if owner.is_anonymous() {
            let result = self.local.add(owner, current, product, quantity).await;
            return self.local_only(result, current);
        }

        match self.remote.add(owner, current, product, quantity).await {
            Ok(items) => self.synced(owner, items).await,
            Err(e) => {
                Self::report_failure("加入购物车", &e);
                let items = self.local.add(owner, current, product, quantity).await;
                self.failed(items, current)
            }
        }
    }

    pub async fn update_quantity(
        &self,
        owner: &Identity,
        current: &[CartLineItem],
        product_id: &str,
        quantity: u32,
    ) -> CartSnapshot {
        if owner.is_anonymous() {
            let result = self
                .local
                .update_quantity(owner, current, product_id, quantity)
                .await;
            return self.local_only(result, current);
        }

        match self
            .remote
            .update_quantity(owner, current, product_id, quantity)
            .await
        {
            Ok(items) => self.synced(owner, items).await,
            Err(e) => {
                Self::report_failure("修改数量", &e);
                let items = self
                    .local
                    .update_quantity(owner, current, product_id, quantity)
                    .await;
                let mut snapshot = self.failed(items, current);
                snapshot.diverged = Self::diverged_product(&e);
                snapshot
            }
        }
    }

    pub async fn remove(
        &self,
        owner: &Identity,
        current: &[CartLineItem],
        product_id: &str,
    ) -> CartSnapshot {
        if owner.is_anonymous() {
            let result = self.local.remove(owner, current, product_id).await;
            return self.local_only(result, current);
        }

        match self.remote.remove(owner, current, product_id).await {
            Ok(items) => self.synced(owner, items).await,
            Err(e) => {
                Self::report_failure("删除条目", &e);
                let items = self.local.remove(owner, current, product_id).await;
                let mut snapshot = self.failed(items, current);
                snapshot.diverged = Self::diverged_product(&e);
                snapshot
            }
        }
    }

    /// 清空：本地快照无论远程结果如何都会删除
    pub async fn clear(&self, owner: &Identity) -> CartSnapshot {
        let status = if owner.is_anonymous() {
            SyncStatus::LocalOnly
        } else {
            match self.remote.clear(owner).await {
                Ok(()) => SyncStatus::Synced,
                Err(e) => {
                    Self::report_failure("清空购物车", &e);
                    SyncStatus::SyncFailed
                }
            }
        };
        self.local.remove_snapshot().await;
        CartSnapshot {
            items: Vec::new(),
            status,
            diverged: None,
        }
    }

    async fn synced(&self, owner: &Identity, items: Vec<CartLineItem>) -> CartSnapshot {
        self.local.write_snapshot(owner, &items).await;
        CartSnapshot {
            items,
            status: SyncStatus::Synced,
            diverged: None,
        }
    }

    fn local_only(
        &self,
        result: CartResult<Vec<CartLineItem>>,
        current: &[CartLineItem],
    ) -> CartSnapshot {
        CartSnapshot {
            items: result.unwrap_or_else(|_| current.to_vec()),
            status: SyncStatus::LocalOnly,
            diverged: None,
        }
    }

    fn failed(&self, result: CartResult<Vec<CartLineItem>>, current: &[CartLineItem]) -> CartSnapshot {
        CartSnapshot {
            items: result.unwrap_or_else(|_| current.to_vec()),
            status: SyncStatus::SyncFailed,
            diverged: None,
        }
    }

    fn diverged_product(err: &CartError) -> Option<String> {
        match err {
            CartError::MissingServerLineId { product_id } => Some(product_id.clone()),
            _ => None,
        }
    }

    fn report_failure(operation: &str, err: &CartError) {
        match err {
            CartError::MissingServerLineId { product_id } => warn!(
                "[CartRepo] ⚠️ {}：商品 {} 没有服务端条目 ID，仅本地生效，服务端购物车可能已不一致",
                operation, product_id
            ),
            e if e.is_remote() => {
                error!("[CartRepo] {}失败，改为本地操作: {}", operation, e)
            }
            e => error!(
                "[CartRepo] {}出现非远程错误，仍按本地处理: {}",
                operation, e
            ),
        }
    }
}
