use async_trait::async_trait;

/// 收藏夹监听器
#[async_trait]
pub trait WishlistListener: Send + Sync {
    /// 收藏列表变更，参数为 JSON 数组字符串
    async fn on_wishlist_changed(&self, items_json: String);
}

/// 默认空实现（无操作）
pub struct EmptyWishlistListener;

#[async_trait]
impl WishlistListener for EmptyWishlistListener {
    async fn on_wishlist_changed(&self, _items_json: String) {}
}
