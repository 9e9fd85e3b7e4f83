//! 收藏夹模块
//!
//! 已登录用户的远程收藏列表，身份变化时重新拉取

pub mod api;
pub mod listener;
pub mod models;
pub mod service;

pub use api::{RemoteWishlistService, WishlistApi};
pub use listener::{EmptyWishlistListener, WishlistListener};
pub use models::{WishlistItem, WishlistState};
pub use service::WishlistStore;
