//! 认证 HTTP API 客户端

use crate::shop::auth::models::{AuthResponse, LoginRequest, RegisterRequest};
use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, error, info};
use uuid::Uuid;

/// 登录/注册接口
pub struct AuthApi {
    client: reqwest::Client,
    api_base_url: String,
}

impl AuthApi {
    /// `client` 应该已经在外部配置好超时与默认请求头
    pub fn new(client: reqwest::Client, api_base_url: String) -> Self {
        Self {
            client,
            api_base_url,
        }
    }

    /// 邮箱密码登录
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse> {
        info!("[AuthAPI] 🔐 正在登录...");
        debug!("[AuthAPI]   邮箱: {}", email);
        self.post("/auth/login", &LoginRequest { email, password }, "登录")
            .await
    }

    /// 注册新用户
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
        phone: &str,
    ) -> Result<AuthResponse> {
        info!("[AuthAPI] 📝 正在注册...");
        debug!("[AuthAPI]   邮箱: {}, 姓名: {}", email, name);
        let req = RegisterRequest {
            name,
            email,
            password,
            phone,
        };
        self.post("/auth/register", &req, "注册").await
    }

    async fn post<B: Serialize>(
        &self,
        path: &str,
        body: &B,
        operation_name: &str,
    ) -> Result<AuthResponse> {
        let operation_id = Uuid::new_v4().to_string();
        let url = format!("{}{}", self.api_base_url, path);
        debug!("[AuthAPI]   请求URL: {}, 操作ID: {}", url, operation_id);

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .header("operationID", &operation_id)
            .json(body)
            .send()
            .await
            .context(format!("{}请求失败", operation_name))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .context(format!("读取{}响应失败", operation_name))?;

        // 失败时后端同样返回 {success:false, error}，优先解析出错误信息
        match serde_json::from_str::<AuthResponse>(&text) {
            Ok(resp) => Ok(resp),
            Err(e) if status.is_success() => {
                error!(
                    "[AuthAPI] {}响应解析失败: {:?}\n原始响应: {}",
                    operation_name, e, text
                );
                Err(anyhow::anyhow!("解析{}响应失败: {}", operation_name, e))
            }
            Err(_) => {
                error!(
                    "[AuthAPI] {}请求失败，HTTP状态: {}, 响应: {}",
                    operation_name, status, text
                );
                Err(anyhow::anyhow!("HTTP 错误 {}: {}", status, text))
            }
        }
    }
}
