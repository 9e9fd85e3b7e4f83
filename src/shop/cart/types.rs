//! 购物车 API DTO（服务端响应结构体）

use crate::shop::cart::models::CartLineItem;
use crate::shop::serialization::{deserialize_id, deserialize_opt_id};
use rust_decimal::Decimal;
use serde::Deserialize;

/// 服务端未提供图片时使用的占位图
pub const PLACEHOLDER_IMAGE_URL: &str = "https://via.placeholder.com/300x300?text=Product";

/// 服务端购物车条目（CartItemDTO）
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerCartItem {
    /// 购物车条目 ID
    #[serde(default, deserialize_with = "deserialize_opt_id")]
    pub id: Option<String>,
    pub product: ServerProduct,
    #[serde(default)]
    pub quantity: i64,
}

/// 服务端商品快照（ProductDTO 的子集）
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerProduct {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub original_price: Option<Decimal>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub model: Option<ServerProductModel>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerProductModel {
    #[serde(default)]
    pub image: Option<String>,
}

impl ServerProduct {
    /// 展示图片：商品图 → 型号图 → 占位图
    pub fn display_image(&self) -> String {
        self.image
            .as_deref()
            .filter(|s| !s.is_empty())
            .or_else(|| {
                self.model
                    .as_ref()
                    .and_then(|m| m.image.as_deref())
                    .filter(|s| !s.is_empty())
            })
            .unwrap_or(PLACEHOLDER_IMAGE_URL)
            .to_string()
    }
}

impl ServerCartItem {
    /// 转为本地条目；数量非正的条目返回 None
    pub fn into_line_item(self) -> Option<CartLineItem> {
        let quantity = u32::try_from(self.quantity).ok().filter(|q| *q > 0)?;
        let image_url = self.product.display_image();
        let product = self.product;

        Some(CartLineItem {
            product_id: product.id,
            name: product.name.unwrap_or_default(),
            image_url,
            unit_price: product.price.unwrap_or_default(),
            original_unit_price: product.original_price,
            quantity,
            server_line_id: self.id,
        })
    }
}
