//! 购物车监听器回调接口

use crate::shop::cart::models::SyncStatus;
use async_trait::async_trait;

/// 购物车监听器（由 UI 层注册）
#[async_trait]
pub trait CartListener: Send + Sync {
    /// 购物车条目发生变更，参数为 JSON 数组字符串
    async fn on_cart_changed(&self, items_json: String);

    /// 同步状态变化
    async fn on_sync_status_changed(&self, status: SyncStatus);

    /// 本地修改未能同步到服务端（缺少服务端条目 ID），服务端购物车可能已不一致
    async fn on_sync_diverged(&self, product_id: String);
}

/// 默认空实现（无操作）
pub struct EmptyCartListener;

#[async_trait]
impl CartListener for EmptyCartListener {
    async fn on_cart_changed(&self, _items_json: String) {}
    async fn on_sync_status_changed(&self, _status: SyncStatus) {}
    async fn on_sync_diverged(&self, _product_id: String) {}
}
