//! 购物车模块
//!
//! 购物车条目在本地缓存与远程购物车服务之间的状态协调

pub mod api;
pub mod listener;
pub mod models;
pub mod repository;
pub mod service;
pub mod types;

// 重新导出主要类型
pub use api::{CartApi, RemoteCartService};
pub use listener::{CartListener, EmptyCartListener};
pub use models::{
    cart_count, cart_total, CartLineItem, CartPhase, CartSnapshot, CartState, ProductSnapshot,
    SyncStatus,
};
pub use repository::{
    CartRepository, FallbackCartRepository, LocalCartRepository, RemoteCartRepository,
    CART_CACHE_KEY,
};
pub use service::CartStore;
pub use types::{ServerCartItem, ServerProduct, PLACEHOLDER_IMAGE_URL};
