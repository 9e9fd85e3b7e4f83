//! 身份提供者与身份变更监听器接口

use crate::shop::auth::models::Identity;
use async_trait::async_trait;
use std::sync::Weak;

/// 身份变更监听器
#[async_trait]
pub trait IdentityListener: Send + Sync {
    /// 身份发生变化（登录、切换用户、登出）
    async fn on_identity_changed(&self, identity: Identity);
}

/// 身份提供者
pub trait IdentityProvider: Send + Sync {
    /// 当前身份
    fn current_identity(&self) -> Identity;

    /// 订阅身份变更；持有弱引用，监听器释放后自动失效
    fn subscribe(&self, listener: Weak<dyn IdentityListener>);
}
