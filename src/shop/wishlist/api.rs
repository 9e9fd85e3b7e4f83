//! 收藏夹 HTTP API 客户端

use crate::shop::cart::types::ServerProduct;
use crate::shop::error::{CartError, CartResult};
use crate::shop::types::{
    endpoint_url, handle_ack_response, handle_http_response, prepare_request,
};
use async_trait::async_trait;
use reqwest::Url;
use tracing::{debug, info};

/// 远程收藏夹服务
#[async_trait]
pub trait RemoteWishlistService: Send + Sync {
    async fn get_wishlist(&self, user_id: &str) -> CartResult<Vec<ServerProduct>>;

    async fn add_to_wishlist(&self, user_id: &str, product_id: &str) -> CartResult<()>;

    async fn remove_from_wishlist(&self, user_id: &str, product_id: &str) -> CartResult<()>;
}

pub struct WishlistApi {
    client: reqwest::Client,
    api_base_url: String,
}

impl WishlistApi {
    pub fn new(client: reqwest::Client, api_base_url: String) -> Self {
        Self {
            client,
            api_base_url,
        }
    }

    fn wishlist_url(&self, user_id: &str, action: Option<&str>) -> CartResult<Url> {
        match action {
            Some(action) => endpoint_url(&self.api_base_url, &["wishlist", user_id, action]),
            None => endpoint_url(&self.api_base_url, &["wishlist", user_id]),
        }
    }
}

#[async_trait]
impl RemoteWishlistService for WishlistApi {
    async fn get_wishlist(&self, user_id: &str) -> CartResult<Vec<ServerProduct>> {
        let url = self.wishlist_url(user_id, None)?;
        info!("[WishlistAPI] 📡 请求收藏夹");
        debug!("[WishlistAPI]   请求URL: {}", url);

        let response = prepare_request(self.client.get(url), user_id)
            .send()
            .await
            .map_err(CartError::from_transport)?;
        let products: Option<Vec<ServerProduct>> =
            handle_http_response(response, "获取收藏夹").await?;
        let products = products.unwrap_or_default();
        info!("[WishlistAPI] ✅ 收藏夹响应，商品数: {}", products.len());
        Ok(products)
    }

    async fn add_to_wishlist(&self, user_id: &str, product_id: &str) -> CartResult<()> {
        let url = self.wishlist_url(user_id, Some("add"))?;
        info!("[WishlistAPI] 📡 收藏商品 {}", product_id);
        debug!("[WishlistAPI]   请求URL: {}", url);

        let response = prepare_request(self.client.post(url), user_id)
            .query(&[("productId", product_id)])
            .send()
            .await
            .map_err(CartError::from_transport)?;
        handle_ack_response(response, "收藏商品").await
    }

    async fn remove_from_wishlist(&self, user_id: &str, product_id: &str) -> CartResult<()> {
        let url = self.wishlist_url(user_id, Some("remove"))?;
        info!("[WishlistAPI] 📡 取消收藏商品 {}", product_id);
        debug!("[WishlistAPI]   请求URL: {}", url);

        let response = prepare_request(self.client.delete(url), user_id)
            .query(&[("productId", product_id)])
            .send()
            .await
            .map_err(CartError::from_transport)?;
        handle_ack_response(response, "取消收藏").await
    }
}
