//! 会话模型

use crate::shop::serialization::{deserialize_id, deserialize_string_or_null};
use serde::{Deserialize, Serialize};

/// 当前身份
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Identity {
    #[default]
    Anonymous,
    User { user_id: String },
}

impl Identity {
    pub fn user(user_id: impl Into<String>) -> Self {
        Identity::User {
            user_id: user_id.into(),
        }
    }

    /// 已登录时返回用户 ID
    pub fn user_id(&self) -> Option<&str> {
        match self {
            Identity::Anonymous => None,
            Identity::User { user_id } => Some(user_id.as_str()),
        }
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self, Identity::Anonymous)
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Identity::Anonymous => write!(f, "anonymous"),
            Identity::User { user_id } => write!(f, "user:{}", user_id),
        }
    }
}

/// 本地保存的登录用户（缓存 key = "user"）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(default, deserialize_with = "deserialize_string_or_null")]
    pub name: String,
    #[serde(default, deserialize_with = "deserialize_string_or_null")]
    pub email: String,
    #[serde(default, deserialize_with = "deserialize_string_or_null")]
    pub phone: String,
}

impl SessionUser {
    pub fn identity(&self) -> Identity {
        Identity::user(self.id.clone())
    }
}

#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
pub struct RegisterRequest<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
    pub phone: &'a str,
}

/// 登录/注册响应
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub user: Option<SessionUser>,
    #[serde(default)]
    pub error: Option<String>,
}
