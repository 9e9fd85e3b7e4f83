//! 购物车服务层
//!
//! CartStore 是购物车条目的唯一读模型和唯一写入口：
//! - 所有变更经过同一个异步闸门串行执行（先到先得）
//! - 读取只短暂持有同步锁，不等待进行中的操作
//! - 远程失败只降级同步状态，不向调用方传播

use crate::shop::auth::{Identity, IdentityListener, IdentityProvider};
use crate::shop::cart::listener::{CartListener, EmptyCartListener};
use crate::shop::cart::models::{
    line_amount, CartLineItem, CartPhase, CartSnapshot, CartState, ProductSnapshot, SyncStatus,
};
use crate::shop::cart::repository::FallbackCartRepository;
use crate::shop::error::{CartError, CartResult};
use async_trait::async_trait;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// 购物车状态容器
pub struct CartStore {
    identity: Arc<dyn IdentityProvider>,
    repository: FallbackCartRepository,
    listener: Arc<dyn CartListener>,
    state: RwLock<CartState>,
    /// 最近一次通知给监听器的同步状态（重置状态时不变）
    reported_status: parking_lot::Mutex<SyncStatus>,
    /// 单飞闸门：同一时刻只有一个操作在执行
    gate: Mutex<()>,
}

impl CartStore {
    /// 创建购物车（使用默认空监听器）
    pub fn new(identity: Arc<dyn IdentityProvider>, repository: FallbackCartRepository) -> Self {
        Self::with_listener(identity, repository, Arc::new(EmptyCartListener))
    }

    /// 创建购物车（带自定义监听器）
    pub fn with_listener(
        identity: Arc<dyn IdentityProvider>,
        repository: FallbackCartRepository,
        listener: Arc<dyn CartListener>,
    ) -> Self {
        let owner = identity.current_identity();
        info!("[CartStore] 创建购物车，身份: {}", owner);
        Self {
            identity,
            repository,
            listener,
            state: RwLock::new(CartState::empty(owner)),
            reported_status: parking_lot::Mutex::new(SyncStatus::default()),
            gate: Mutex::new(()),
        }
    }

    // ========== 读取 ==========

    pub fn items(&self) -> Vec<CartLineItem> {
        self.state.read().items.clone()
    }

    pub fn sync_status(&self) -> SyncStatus {
        self.state.read().sync_status
    }

    pub fn phase(&self) -> CartPhase {
        self.state.read().phase
    }

    pub fn is_loading(&self) -> bool {
        self.phase() == CartPhase::Loading
    }

    /// 当前状态的拷贝
    pub fn state(&self) -> CartState {
        self.state.read().clone()
    }

    /// 合计金额（精确小数，不做舍入）
    pub fn total(&self) -> Decimal {
        self.state.read().total()
    }

    /// 合计件数
    pub fn count(&self) -> u64 {
        self.state.read().count()
    }

    // ========== 操作 ==========

    /// 加载购物车；总会以某个状态结束（可能为空）
    pub async fn load(&self) -> SyncStatus {
        let _guard = self.gate.lock().await;
        let owner = self.identity.current_identity();
        self.load_locked(owner).await
    }

    /// 重新加载，等同于 load
    pub async fn refresh(&self) -> SyncStatus {
        self.load().await
    }

    /// 加入购物车，返回同步状态，调用方据此提示远程写入是否成功
    ///
    /// 仅在参数非法时返回错误，此时状态不变
    pub async fn add_item(&self, product: &ProductSnapshot, quantity: u32) -> CartResult<SyncStatus> {
        if product.product_id.trim().is_empty() {
            warn!("[CartStore] 拒绝加入购物车：商品ID为空");
            return Err(CartError::Validation("productId 不能为空".to_string()));
        }
        if quantity == 0 {
            warn!(
                "[CartStore] 拒绝加入购物车：商品 {} 数量为 0",
                product.product_id
            );
            return Err(CartError::Validation("quantity 必须 >= 1".to_string()));
        }
        if line_amount(product.unit_price, quantity).is_none() {
            warn!(
                "[CartStore] 拒绝加入购物车：商品 {} 金额溢出（{} × {}）",
                product.product_id, product.unit_price, quantity
            );
            return Err(CartError::Validation(format!(
                "金额超出范围: {} × {}",
                product.unit_price, quantity
            )));
        }

        let _guard = self.gate.lock().await;
        let (owner, current) = self.begin();
        info!(
            "[CartStore] 加入购物车: 商品 {} × {}，身份: {}",
            product.product_id, quantity, owner
        );
        self.set_phase(CartPhase::Loading);
        let snapshot = self.repository.add(&owner, &current, product, quantity).await;
        Ok(self.publish(&owner, snapshot).await)
    }

    /// 删除条目；不存在时什么也不做
    pub async fn remove_item(&self, product_id: &str) -> SyncStatus {
        let _guard = self.gate.lock().await;
        self.remove_locked(product_id).await
    }

    /// 修改数量；数量 <= 0 时等同于删除，商品不存在时什么也不做
    pub async fn update_quantity(&self, product_id: &str, quantity: i64) -> SyncStatus {
        let _guard = self.gate.lock().await;
        if quantity <= 0 {
            debug!(
                "[CartStore] 数量 {} <= 0，改为删除商品 {}",
                quantity, product_id
            );
            return self.remove_locked(product_id).await;
        }

        let (owner, current) = self.begin();
        if !self.state.read().contains(product_id) {
            debug!("[CartStore] 商品 {} 不在购物车中，忽略修改", product_id);
            return self.sync_status();
        }

        let quantity = u32::try_from(quantity).unwrap_or(u32::MAX);
        info!(
            "[CartStore] 修改数量: 商品 {} -> {}",
            product_id, quantity
        );
        self.set_phase(CartPhase::Loading);
        let snapshot = self
            .repository
            .update_quantity(&owner, &current, product_id, quantity)
            .await;
        self.publish(&owner, snapshot).await
    }

    /// 清空购物车；本地缓存无论远程结果如何都会删除
    pub async fn clear(&self) -> SyncStatus {
        let _guard = self.gate.lock().await;
        let (owner, _current) = self.begin();
        info!("[CartStore] 清空购物车，身份: {}", owner);
        self.set_phase(CartPhase::Loading);
        let snapshot = self.repository.clear(&owner).await;
        self.publish(&owner, snapshot).await
    }

    /// 丢弃内存中的购物车，回到当前身份的空状态（不触碰缓存和服务端）
    pub async fn reset(&self) {
        let _guard = self.gate.lock().await;
        let owner = self.identity.current_identity();
        self.reset_locked(owner).await;
        self.report_status(SyncStatus::default()).await;
    }

    // ========== 内部实现（调用方已持有闸门） ==========

    async fn load_locked(&self, owner: Identity) -> SyncStatus {
        self.adopt_owner(&owner);
        info!("[CartStore] 🔄 加载购物车，身份: {}", owner);
        self.set_phase(CartPhase::Loading);
        let snapshot = self.repository.load(&owner).await;
        self.publish(&owner, snapshot).await
    }

    async fn remove_locked(&self, product_id: &str) -> SyncStatus {
        let (owner, current) = self.begin();
        if !self.state.read().contains(product_id) {
            debug!("[CartStore] 商品 {} 不在购物车中，忽略删除", product_id);
            return self.sync_status();
        }

        info!("[CartStore] 删除商品: {}", product_id);
        self.set_phase(CartPhase::Loading);
        let snapshot = self.repository.remove(&owner, &current, product_id).await;
        self.publish(&owner, snapshot).await
    }

    async fn reset_locked(&self, owner: Identity) {
        info!("[CartStore] 重置购物车，身份: {}", owner);
        *self.state.write() = CartState::empty(owner);
        self.listener.on_cart_changed("[]".to_string()).await;
    }

    /// 读取当前身份；与状态所属身份不一致时先丢弃旧状态
    fn begin(&self) -> (Identity, Vec<CartLineItem>) {
        let owner = self.identity.current_identity();
        self.adopt_owner(&owner);
        let items = self.state.read().items.clone();
        (owner, items)
    }

    fn adopt_owner(&self, owner: &Identity) {
        let mut state = self.state.write();
        if &state.owner != owner {
            info!(
                "[CartStore] 身份已从 {} 变为 {}，丢弃旧购物车",
                state.owner, owner
            );
            *state = CartState::empty(owner.clone());
        }
    }

    fn set_phase(&self, phase: CartPhase) {
        self.state.write().phase = phase;
    }

    /// 发布仓储结果并通知监听器
    async fn publish(&self, owner: &Identity, snapshot: CartSnapshot) -> SyncStatus {
        let CartSnapshot {
            items,
            status,
            diverged,
        } = snapshot;

        let items_json = {
            let mut state = self.state.write();
            state.owner = owner.clone();
            state.items = items;
            state.sync_status = status;
            state.phase = CartPhase::from(status);
            let json = serde_json::to_string(&state.items).unwrap_or_else(|e| {
                error!("[CartStore] 序列化购物车条目失败: {}", e);
                "[]".to_string()
            });
            info!(
                "[CartStore] ✅ 购物车已更新: {} 条, {} 件, 合计 {}, 状态 {}",
                state.items.len(),
                state.count(),
                state.total(),
                status
            );
            json
        };

        self.listener.on_cart_changed(items_json).await;
        self.report_status(status).await;
        if let Some(product_id) = diverged {
            warn!(
                "[CartStore] ⚠️ 商品 {} 的修改未同步到服务端",
                product_id
            );
            self.listener.on_sync_diverged(product_id).await;
        }
        status
    }

    /// 与上次通知的状态不同才回调
    async fn report_status(&self, status: SyncStatus) {
        let changed = {
            let mut reported = self.reported_status.lock();
            let changed = *reported != status;
            *reported = status;
            changed
        };
        if changed {
            self.listener.on_sync_status_changed(status).await;
        }
    }
}

#[async_trait]
impl IdentityListener for CartStore {
    /// 身份变化：丢弃旧购物车并按新身份重新加载
    async fn on_identity_changed(&self, identity: Identity) {
        let _guard = self.gate.lock().await;
        self.reset_locked(identity.clone()).await;
        self.load_locked(identity).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shop::cart::repository::CART_CACHE_KEY;
    use crate::shop::storage::{KvStore, MemoryKvStore};
    use crate::shop::testing::{
        init_test_logger, FakeCartService, RecordingCartListener, StaticIdentity,
    };

    struct Harness {
        service: Arc<FakeCartService>,
        store: Arc<MemoryKvStore>,
        identity: Arc<StaticIdentity>,
        listener: Arc<RecordingCartListener>,
        cart: Arc<CartStore>,
    }

    impl Harness {
        fn new(identity: Identity) -> Self {
            Self::with_store(identity, Arc::new(MemoryKvStore::new()))
        }

        fn with_store(identity: Identity, store: Arc<MemoryKvStore>) -> Self {
            init_test_logger();
            let service = Arc::new(FakeCartService::new());
            let identity = Arc::new(StaticIdentity::new(identity));
            let listener = Arc::new(RecordingCartListener::default());
            let repository = FallbackCartRepository::from_parts(service.clone(), store.clone());
            let cart = Arc::new(CartStore::with_listener(
                identity.clone(),
                repository,
                listener.clone(),
            ));
            let as_listener: Arc<dyn IdentityListener> = cart.clone();
            identity.subscribe(Arc::downgrade(&as_listener));
            Self {
                service,
                store,
                identity,
                listener,
                cart,
            }
        }
    }

    fn product(id: &str, price: i64) -> ProductSnapshot {
        ProductSnapshot::new(id, Decimal::from(price)).with_name(format!("Product {}", id))
    }

    #[tokio::test]
    async fn anonymous_adds_merge_into_one_line() {
        let h = Harness::new(Identity::Anonymous);
        let p1 = product("p1", 100);

        assert_eq!(h.cart.add_item(&p1, 2).await, Ok(SyncStatus::LocalOnly));
        assert_eq!(h.cart.add_item(&p1, 3).await, Ok(SyncStatus::LocalOnly));

        let items = h.cart.items();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, 5);
        assert_eq!(h.cart.total(), Decimal::from(500));
        assert_eq!(h.cart.count(), 5);
        assert_eq!(h.cart.phase(), CartPhase::LocalOnly);
        assert_eq!(h.service.calls(), 0);
        assert!(h.store.contains(CART_CACHE_KEY));
    }

    #[tokio::test]
    async fn add_survives_remote_timeout() {
        let h = Harness::new(Identity::user("u1"));
        h.service.set_failing(true);

        let status = h.cart.add_item(&product("p1", 100), 1).await;
        assert_eq!(status, Ok(SyncStatus::SyncFailed));
        assert_eq!(h.cart.items().len(), 1);
        assert_eq!(h.cart.items()[0].product_id, "p1");
        assert_eq!(h.cart.sync_status(), SyncStatus::SyncFailed);
        assert!(!h.cart.is_loading());
    }

    #[tokio::test]
    async fn authenticated_add_is_synced_with_server_line_id() {
        let h = Harness::new(Identity::user("u1"));
        let p1 = product("p1", 100);
        h.service.register_product(&p1);

        assert_eq!(h.cart.add_item(&p1, 2).await, Ok(SyncStatus::Synced));
        let items = h.cart.items();
        assert_eq!(items.len(), 1);
        assert!(items[0].server_line_id.is_some());
        assert_eq!(h.cart.total(), Decimal::from(200));
        assert_eq!(h.service.server_quantity("u1", "p1"), Some(2));

        assert_eq!(h.cart.update_quantity("p1", 4).await, SyncStatus::Synced);
        assert_eq!(h.service.server_quantity("u1", "p1"), Some(4));
        assert_eq!(h.cart.count(), 4);
    }

    #[tokio::test]
    async fn zero_quantity_removes_and_missing_product_is_ignored() {
        let h = Harness::new(Identity::Anonymous);
        h.cart.add_item(&product("p1", 10), 1).await.unwrap();
        h.cart.add_item(&product("p2", 10), 1).await.unwrap();
        let before = h.cart.items();

        h.cart.update_quantity("missing", 5).await;
        assert_eq!(h.cart.items(), before);
        h.cart.remove_item("missing").await;
        assert_eq!(h.cart.items(), before);

        h.cart.update_quantity("p1", 0).await;
        h.cart.update_quantity("p2", -3).await;
        assert!(h.cart.items().is_empty());
        assert_eq!(h.cart.total(), Decimal::ZERO);
    }

    #[tokio::test]
    async fn invalid_add_is_rejected_without_touching_state() {
        let h = Harness::new(Identity::Anonymous);
        h.cart.add_item(&product("p1", 10), 1).await.unwrap();
        let changes = h.listener.changes.lock().len();

        let err = h.cart.add_item(&product("", 10), 1).await.unwrap_err();
        assert!(matches!(err, CartError::Validation(_)));
        let err = h.cart.add_item(&product("p2", 10), 0).await.unwrap_err();
        assert!(matches!(err, CartError::Validation(_)));

        assert_eq!(h.cart.count(), 1);
        assert_eq!(h.listener.changes.lock().len(), changes);
    }

    #[tokio::test]
    async fn every_operation_completes_while_offline() {
        let h = Harness::new(Identity::user("u1"));
        h.service.set_failing(true);

        assert_eq!(h.cart.load().await, SyncStatus::SyncFailed);
        assert!(h.cart.items().is_empty());

        h.cart.add_item(&product("p1", 10), 1).await.unwrap();
        h.cart.add_item(&product("p2", 20), 2).await.unwrap();
        assert_eq!(h.cart.update_quantity("p1", 3).await, SyncStatus::SyncFailed);
        assert_eq!(h.cart.remove_item("p2").await, SyncStatus::SyncFailed);

        let items = h.cart.items();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, 3);
        assert_eq!(h.cart.total(), Decimal::from(30));
        // 离线加入的条目没有服务端行 ID，修改与删除都会被报告为不一致
        assert_eq!(*h.listener.diverged.lock(), vec!["p1", "p2"]);

        assert_eq!(h.cart.clear().await, SyncStatus::SyncFailed);
        assert!(h.cart.items().is_empty());
        assert!(!h.store.contains(CART_CACHE_KEY));
    }

    #[tokio::test]
    async fn identity_switch_discards_previous_cart() {
        let h = Harness::new(Identity::user("a"));
        let p1 = product("p1", 10);
        h.service.register_product(&p1);
        h.cart.add_item(&p1, 2).await.unwrap();
        assert_eq!(h.cart.count(), 2);

        h.identity.switch_to(Identity::user("b")).await;
        assert!(h.cart.items().is_empty());
        assert_eq!(h.cart.state().owner, Identity::user("b"));
        assert_eq!(h.cart.sync_status(), SyncStatus::Synced);

        // a 的快照仍在缓存中，但匿名身份读不到
        h.identity.switch_to(Identity::user("a")).await;
        assert_eq!(h.cart.count(), 2);
        h.identity.switch_to(Identity::Anonymous).await;
        assert!(h.cart.items().is_empty());
        assert_eq!(h.cart.sync_status(), SyncStatus::LocalOnly);
        assert!(h.store.contains(CART_CACHE_KEY));
    }

    #[tokio::test]
    async fn logout_of_synced_user_reports_local_only() {
        let h = Harness::new(Identity::user("a"));
        assert_eq!(h.cart.load().await, SyncStatus::Synced);

        h.identity.switch_to(Identity::Anonymous).await;
        assert_eq!(h.cart.sync_status(), SyncStatus::LocalOnly);
        assert_eq!(
            *h.listener.statuses.lock(),
            vec![SyncStatus::Synced, SyncStatus::LocalOnly]
        );

        // 同状态之间切换用户不重复通知
        h.identity.switch_to(Identity::user("b")).await;
        h.identity.switch_to(Identity::user("c")).await;
        assert_eq!(
            h.listener.statuses.lock().last().copied(),
            Some(SyncStatus::Synced)
        );
        assert_eq!(h.listener.statuses.lock().len(), 3);
    }

    #[tokio::test]
    async fn explicit_reset_reports_local_only() {
        let h = Harness::new(Identity::user("a"));
        h.service.set_failing(true);
        h.cart.load().await;

        h.cart.reset().await;
        assert_eq!(h.cart.phase(), CartPhase::Empty);
        assert_eq!(
            h.listener.statuses.lock().last().copied(),
            Some(SyncStatus::LocalOnly)
        );
    }

    #[tokio::test]
    async fn overflowing_price_is_rejected_and_totals_never_panic() {
        let h = Harness::new(Identity::Anonymous);
        let huge = product("p", 0);
        let huge = ProductSnapshot {
            unit_price: Decimal::MAX,
            ..huge
        };

        let err = h.cart.add_item(&huge, 2).await.unwrap_err();
        assert!(matches!(err, CartError::Validation(_)));
        assert!(h.cart.items().is_empty());

        // 单次不溢出，合并后溢出：饱和而不是 panic
        h.cart.add_item(&huge, 1).await.unwrap();
        h.cart.add_item(&huge, 1).await.unwrap();
        assert_eq!(h.cart.count(), 2);
        assert_eq!(h.cart.total(), Decimal::MAX);

        h.cart.update_quantity("p", i64::MAX).await;
        assert_eq!(h.cart.items()[0].quantity, u32::MAX);
        assert_eq!(h.cart.total(), Decimal::MAX);
    }

    #[tokio::test]
    async fn lines_known_to_server_change_locally_when_remote_fails() {
        let h = Harness::new(Identity::user("u1"));
        h.cart.add_item(&product("p1", 10), 1).await.unwrap();
        h.cart.add_item(&product("p2", 10), 1).await.unwrap();
        assert!(h.cart.items().iter().all(|i| i.server_line_id.is_some()));

        h.service.set_failing(true);
        assert_eq!(h.cart.update_quantity("p1", 5).await, SyncStatus::SyncFailed);
        assert_eq!(h.cart.remove_item("p2").await, SyncStatus::SyncFailed);

        let items = h.cart.items();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, 5);
        assert!(h.listener.diverged.lock().is_empty());
        assert_eq!(h.service.server_quantity("u1", "p1"), Some(1));
        assert_eq!(h.service.server_quantity("u1", "p2"), Some(1));
    }

    #[tokio::test]
    async fn silent_identity_change_is_picked_up_by_next_operation() {
        let h = Harness::new(Identity::Anonymous);
        h.cart.add_item(&product("p1", 10), 1).await.unwrap();

        h.identity.set_silently(Identity::user("b"));
        h.cart.add_item(&product("p2", 10), 1).await.unwrap();

        let items = h.cart.items();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].product_id, "p2");
        assert_eq!(h.cart.state().owner, Identity::user("b"));
    }

    #[tokio::test]
    async fn cached_anonymous_cart_is_restored_by_a_new_store() {
        let store = Arc::new(MemoryKvStore::new());
        {
            let h = Harness::with_store(Identity::Anonymous, store.clone());
            h.cart.add_item(&product("p1", 25), 2).await.unwrap();
        }

        let h = Harness::with_store(Identity::Anonymous, store);
        assert_eq!(h.cart.phase(), CartPhase::Empty);
        assert_eq!(h.cart.load().await, SyncStatus::LocalOnly);
        assert_eq!(h.cart.total(), Decimal::from(50));
    }

    #[tokio::test]
    async fn corrupt_snapshot_loads_as_empty() {
        let store = Arc::new(MemoryKvStore::new());
        store.set(CART_CACHE_KEY, b"{broken").await.unwrap();

        let h = Harness::with_store(Identity::Anonymous, store);
        assert_eq!(h.cart.load().await, SyncStatus::LocalOnly);
        assert!(h.cart.items().is_empty());
    }

    #[tokio::test]
    async fn listener_receives_items_and_status_changes() {
        let h = Harness::new(Identity::user("u1"));
        h.cart.load().await;
        h.service.set_failing(true);
        h.cart.add_item(&product("p1", 10), 1).await.unwrap();

        let last = h.listener.changes.lock().last().cloned().unwrap();
        let items: Vec<CartLineItem> = serde_json::from_str(&last).unwrap();
        assert_eq!(items[0].product_id, "p1");
        assert_eq!(
            *h.listener.statuses.lock(),
            vec![SyncStatus::Synced, SyncStatus::SyncFailed]
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_adds_are_all_applied() {
        let h = Harness::new(Identity::Anonymous);
        let p1 = product("p1", 1);

        let tasks: Vec<_> = (0..20)
            .map(|_| {
                let cart = h.cart.clone();
                let p1 = p1.clone();
                tokio::spawn(async move { cart.add_item(&p1, 1).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(h.cart.items().len(), 1);
        assert_eq!(h.cart.count(), 20);
    }
}
