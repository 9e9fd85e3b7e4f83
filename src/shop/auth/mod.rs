//! 身份/会话模块
//!
//! 提供当前登录身份（匿名或用户），并在身份变化时通知订阅者

pub mod api;
pub mod listener;
pub mod models;
pub mod service;

pub use api::AuthApi;
pub use listener::{IdentityListener, IdentityProvider};
pub use models::{AuthResponse, Identity, SessionUser};
pub use service::Session;
