pub mod shop;

// 重新导出常用类型和函数，方便外部使用
pub use shop::{
    auth::{Identity, Session, SessionUser},
    cart::{CartLineItem, CartListener, CartPhase, CartState, CartStore, ProductSnapshot, SyncStatus},
    client::{ClientConfig, StorefrontClient},
    error::{CartError, CartResult},
    wishlist::{WishlistItem, WishlistStore},
};
