//! 收藏夹模型

use crate::shop::auth::Identity;
use crate::shop::cart::types::ServerProduct;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// 收藏的商品
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistItem {
    pub product_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub original_price: Option<Decimal>,
}

impl From<ServerProduct> for WishlistItem {
    fn from(product: ServerProduct) -> Self {
        let image_url = product.display_image();
        Self {
            product_id: product.id,
            name: product.name.unwrap_or_default(),
            image_url,
            price: product.price,
            original_price: product.original_price,
        }
    }
}

/// 收藏夹当前状态
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WishlistState {
    pub owner: Identity,
    pub items: Vec<WishlistItem>,
    pub loading: bool,
}

impl WishlistState {
    pub fn empty(owner: Identity) -> Self {
        Self {
            owner,
            ..Default::default()
        }
    }

    pub fn contains(&self, product_id: &str) -> bool {
        self.items.iter().any(|i| i.product_id == product_id)
    }

    pub fn product_ids(&self) -> HashSet<String> {
        self.items.iter().map(|i| i.product_id.clone()).collect()
    }
}
