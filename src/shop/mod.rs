pub mod auth;
pub mod cart;
pub mod client;
pub mod db;
pub mod error;
pub mod serialization;
pub mod storage;
pub mod types;
pub mod wishlist;

#[cfg(test)]
pub(crate) mod testing;

// 重新导出常用类型
pub use auth::{Identity, IdentityListener, IdentityProvider, Session, SessionUser};
pub use cart::{CartListener, CartLineItem, CartStore, ProductSnapshot, SyncStatus};
pub use client::{ClientConfig, StorefrontClient};
pub use error::{CartError, CartResult};
pub use wishlist::{WishlistItem, WishlistListener, WishlistStore};
