//! 购物车 HTTP API 客户端
//!
//! 负责所有购物车相关的 HTTP 请求

use crate::shop::cart::types::ServerCartItem;
use crate::shop::error::{CartError, CartResult};
use crate::shop::types::{
    endpoint_url, handle_ack_response, handle_http_response, prepare_request,
};
use async_trait::async_trait;
use reqwest::Url;
use tracing::{debug, info};

/// 远程购物车服务（按用户 ID 存取服务端购物车）
#[async_trait]
pub trait RemoteCartService: Send + Sync {
    async fn get_cart(&self, user_id: &str) -> CartResult<Vec<ServerCartItem>>;

    async fn add_to_cart(&self, user_id: &str, product_id: &str, quantity: u32) -> CartResult<()>;

    async fn update_cart_item(
        &self,
        user_id: &str,
        cart_item_id: &str,
        quantity: u32,
    ) -> CartResult<()>;

    async fn remove_from_cart(&self, user_id: &str, cart_item_id: &str) -> CartResult<()>;

    async fn clear_cart(&self, user_id: &str) -> CartResult<()>;
}

/// 购物车相关的 HTTP API 客户端
pub struct CartApi {
    client: reqwest::Client,
    api_base_url: String,
}

impl CartApi {
    /// 创建新的购物车 API 客户端
    ///
    /// `client` 应该已经在外部配置好超时
    pub fn new(client: reqwest::Client, api_base_url: String) -> Self {
        Self {
            client,
            api_base_url,
        }
    }

    /// `{base}/cart/{user_id}/...`，各段均做编码
    fn cart_url(&self, user_id: &str, rest: &[&str]) -> CartResult<Url> {
        let mut segments = vec!["cart", user_id];
        segments.extend_from_slice(rest);
        endpoint_url(&self.api_base_url, &segments)
    }
}

#[async_trait]
impl RemoteCartService for CartApi {
    async fn get_cart(&self, user_id: &str) -> CartResult<Vec<ServerCartItem>> {
        let url = self.cart_url(user_id, &[])?;
        info!("[CartAPI] 📡 请求购物车");
        debug!("[CartAPI]   请求URL: {}", url);

        let response = prepare_request(self.client.get(url), user_id)
            .send()
            .await
            .map_err(CartError::from_transport)?;

        let items: Option<Vec<ServerCartItem>> =
            handle_http_response(response, "获取购物车").await?;
        let items = items.unwrap_or_default();
        info!("[CartAPI] ✅ 购物车响应，条目数: {}", items.len());
        Ok(items)
    }

    async fn add_to_cart(&self, user_id: &str, product_id: &str, quantity: u32) -> CartResult<()> {
        let url = self.cart_url(user_id, &["add"])?;
        info!(
            "[CartAPI] 📡 加入购物车: 商品 {} × {}",
            product_id, quantity
        );
        debug!("[CartAPI]   请求URL: {}", url);

        let quantity = quantity.to_string();
        let response = prepare_request(self.client.post(url), user_id)
            .query(&[("productId", product_id), ("quantity", quantity.as_str())])
            .send()
            .await
            .map_err(CartError::from_transport)?;
        handle_ack_response(response, "加入购物车").await
    }

    async fn update_cart_item(
        &self,
        user_id: &str,
        cart_item_id: &str,
        quantity: u32,
    ) -> CartResult<()> {
        let url = self.cart_url(user_id, &["items", cart_item_id])?;
        info!(
            "[CartAPI] 📡 修改购物车条目 {} 数量为 {}",
            cart_item_id, quantity
        );
        debug!("[CartAPI]   请求URL: {}", url);

        let response = prepare_request(self.client.put(url), user_id)
            .query(&[("quantity", quantity)])
            .send()
            .await
            .map_err(CartError::from_transport)?;
        handle_ack_response(response, "修改购物车条目").await
    }

    async fn remove_from_cart(&self, user_id: &str, cart_item_id: &str) -> CartResult<()> {
        let url = self.cart_url(user_id, &["items", cart_item_id])?;
        info!("[CartAPI] 📡 删除购物车条目 {}", cart_item_id);
        debug!("[CartAPI]   请求URL: {}", url);

        let response = prepare_request(self.client.delete(url), user_id)
            .send()
            .await
            .map_err(CartError::from_transport)?;
        handle_ack_response(response, "删除购物车条目").await
    }

    async fn clear_cart(&self, user_id: &str) -> CartResult<()> {
        let url = self.cart_url(user_id, &["clear"])?;
        info!("[CartAPI] 📡 清空购物车");
        debug!("[CartAPI]   请求URL: {}", url);

        let response = prepare_request(self.client.delete(url), user_id)
            .send()
            .await
            .map_err(CartError::from_transport)?;
        handle_ack_response(response, "清空购物车").await
    }
}
