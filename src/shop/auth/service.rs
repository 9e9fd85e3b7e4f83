//! 会话服务
//!
//! 维护当前登录用户，持久化到本地缓存的 "user" key，
//! 并在身份变化后依次通知订阅者（例如购物车）。

use crate::shop::auth::api::AuthApi;
use crate::shop::auth::listener::{IdentityListener, IdentityProvider};
use crate::shop::auth::models::{AuthResponse, Identity, SessionUser};
use crate::shop::storage::KvStore;
use anyhow::{Context, Result};
use parking_lot::RwLock;
use std::sync::{Arc, Weak};
use tracing::{debug, error, info, warn};

/// 本地缓存中保存登录用户的 key
pub const USER_CACHE_KEY: &str = "user";

pub struct Session {
    api: AuthApi,
    store: Arc<dyn KvStore>,
    user: RwLock<Option<SessionUser>>,
    listeners: RwLock<Vec<Weak<dyn IdentityListener>>>,
}

impl Session {
    pub fn new(api: AuthApi, store: Arc<dyn KvStore>) -> Self {
        Self {
            api,
            store,
            user: RwLock::new(None),
            listeners: RwLock::new(Vec::new()),
        }
    }

    /// 当前登录用户
    pub fn current_user(&self) -> Option<SessionUser> {
        self.user.read().clone()
    }

    /// 从本地缓存恢复登录状态；缓存缺失或损坏时视为匿名
    pub async fn restore(&self) -> Identity {
        let user = match self.store.get(USER_CACHE_KEY).await {
            Ok(Some(bytes)) => match serde_json::from_slice::<SessionUser>(&bytes) {
                Ok(user) => Some(user),
                Err(e) => {
                    warn!("[Session] 本地用户数据损坏，按匿名处理: {}", e);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                error!("[Session] 读取本地用户失败: {:?}", e);
                None
            }
        };

        match &user {
            Some(u) => info!("[Session] 恢复登录用户: {}", u.id),
            None => info!("[Session] 无本地登录用户，匿名会话"),
        }
        self.switch_user(user).await
    }

    /// 登录；失败时返回服务端错误信息，身份保持不变
    pub async fn login(&self, email: &str, password: &str) -> Result<SessionUser> {
        let resp = self.api.login(email, password).await?;
        self.accept_auth_response(resp, "登录失败").await
    }

    /// 注册并直接登录
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
        phone: &str,
    ) -> Result<SessionUser> {
        let resp = self.api.register(name, email, password, phone).await?;
        self.accept_auth_response(resp, "注册失败").await
    }

    /// 采用外部已认证的用户（持久化并切换身份）
    pub async fn adopt_user(&self, user: SessionUser) -> Result<()> {
        let bytes = serde_json::to_vec(&user).context("序列化用户失败")?;
        self.store
            .set(USER_CACHE_KEY, &bytes)
            .await
            .context("保存登录用户失败")?;
        info!("[Session] ✅ 用户已登录: {}", user.id);
        self.switch_user(Some(user)).await;
        Ok(())
    }

    /// 登出：清除本地用户并切换为匿名
    pub async fn logout(&self) {
        if let Err(e) = self.store.remove(USER_CACHE_KEY).await {
            error!("[Session] 清除本地用户失败: {:?}", e);
        }
        info!("[Session] 👋 已登出");
        self.switch_user(None).await;
    }

    async fn accept_auth_response(&self, resp: AuthResponse, fallback: &str) -> Result<SessionUser> {
        match (resp.success, resp.user) {
            (true, Some(user)) => {
                self.adopt_user(user.clone()).await?;
                Ok(user)
            }
            _ => {
                let message = resp.error.unwrap_or_else(|| fallback.to_string());
                warn!("[Session] {}", message);
                Err(anyhow::anyhow!(message))
            }
        }
    }

    /// 更新当前用户，身份确有变化时通知订阅者
    async fn switch_user(&self, user: Option<SessionUser>) -> Identity {
        let new_identity = user
            .as_ref()
            .map(SessionUser::identity)
            .unwrap_or_default();
        let old_identity = {
            let mut guard = self.user.write();
            let old = guard
                .as_ref()
                .map(SessionUser::identity)
                .unwrap_or_default();
            *guard = user;
            old
        };

        if old_identity != new_identity {
            info!("[Session] 身份变更: {} -> {}", old_identity, new_identity);
            self.notify(new_identity.clone()).await;
        } else {
            debug!("[Session] 身份未变化: {}", new_identity);
        }
        new_identity
    }

    async fn notify(&self, identity: Identity) {
        let listeners: Vec<Arc<dyn IdentityListener>> = {
            let mut guard = self.listeners.write();
            guard.retain(|l| l.strong_count() > 0);
            guard.iter().filter_map(Weak::upgrade).collect()
        };
        for listener in listeners {
            listener.on_identity_changed(identity.clone()).await;
        }
    }
}

impl IdentityProvider for Session {
    fn current_identity(&self) -> Identity {
        self.user
            .read()
            .as_ref()
            .map(SessionUser::identity)
            .unwrap_or_default()
    }

    fn subscribe(&self, listener: Weak<dyn IdentityListener>) {
        self.listeners.write().push(listener);
    }
}
