//! 购物车本地模型定义

use crate::shop::auth::Identity;
use crate::shop::serialization::{deserialize_opt_id, deserialize_vec_or_null};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// 购物车条目
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineItem {
    /// 商品 ID（购物车内唯一）
    pub product_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub image_url: String,
    /// 单价，计算总额的唯一依据；缺失时按 0 处理
    #[serde(default)]
    pub unit_price: Decimal,
    #[serde(default)]
    pub original_unit_price: Option<Decimal>,
    /// 数量，始终 >= 1
    pub quantity: u32,
    /// 服务端购物车条目 ID，仅在服务端已知该条目时存在
    #[serde(default, deserialize_with = "deserialize_opt_id")]
    pub server_line_id: Option<String>,
}

impl CartLineItem {
    pub fn from_product(product: &ProductSnapshot, quantity: u32) -> Self {
        Self {
            product_id: product.product_id.clone(),
            name: product.name.clone(),
            image_url: product.image_url.clone(),
            unit_price: product.unit_price,
            original_unit_price: product.original_unit_price,
            quantity,
            server_line_id: None,
        }
    }

    /// 小计；超出 Decimal 表示范围时饱和到最大/最小值
    pub fn subtotal(&self) -> Decimal {
        line_amount(self.unit_price, self.quantity).unwrap_or_else(|| {
            warn!(
                "[CartStore] 商品 {} 小计溢出（{} × {}），按极值计算",
                self.product_id, self.unit_price, self.quantity
            );
            saturated(self.unit_price)
        })
    }
}

/// 加入购物车时传入的商品描述
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSnapshot {
    pub product_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub image_url: String,
    pub unit_price: Decimal,
    #[serde(default)]
    pub original_unit_price: Option<Decimal>,
}

impl ProductSnapshot {
    pub fn new(product_id: impl Into<String>, unit_price: Decimal) -> Self {
        Self {
            product_id: product_id.into(),
            name: String::new(),
            image_url: String::new(),
            unit_price,
            original_unit_price: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

/// 同步状态：内存中的购物车与服务端是否一致的可信度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncStatus {
    /// 匿名会话，只使用本地数据
    #[default]
    LocalOnly,
    /// 已与服务端同步
    Synced,
    /// 远程调用失败，当前为本地回退数据
    SyncFailed,
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SyncStatus::LocalOnly => "local-only",
            SyncStatus::Synced => "synced",
            SyncStatus::SyncFailed => "sync-failed",
        };
        f.write_str(s)
    }
}

/// 购物车状态机阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CartPhase {
    #[default]
    Empty,
    Loading,
    LocalOnly,
    Synced,
    SyncFailed,
}

impl From<SyncStatus> for CartPhase {
    fn from(status: SyncStatus) -> Self {
        match status {
            SyncStatus::LocalOnly => CartPhase::LocalOnly,
            SyncStatus::Synced => CartPhase::Synced,
            SyncStatus::SyncFailed => CartPhase::SyncFailed,
        }
    }
}

/// 购物车当前状态（CartStore 对外发布的读模型）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CartState {
    /// 状态所属身份
    pub owner: Identity,
    pub items: Vec<CartLineItem>,
    pub sync_status: SyncStatus,
    pub phase: CartPhase,
}

impl CartState {
    /// 某身份的空购物车
    pub fn empty(owner: Identity) -> Self {
        Self {
            owner,
            ..Default::default()
        }
    }

    pub fn total(&self) -> Decimal {
        cart_total(&self.items)
    }

    pub fn count(&self) -> u64 {
        cart_count(&self.items)
    }

    pub fn contains(&self, product_id: &str) -> bool {
        self.items.iter().any(|i| i.product_id == product_id)
    }
}

/// 一次仓储操作的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartSnapshot {
    pub items: Vec<CartLineItem>,
    pub status: SyncStatus,
    /// 因缺少服务端行 ID 而仅在本地生效的商品
    pub diverged: Option<String>,
}

/// 本地缓存中的购物车快照（key = "cart"）
///
/// `owner` 为 None 表示匿名购物车；读取方身份与 owner 不一致时视为无缓存
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartCacheEnvelope {
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub saved_at: i64,
    #[serde(default, deserialize_with = "deserialize_vec_or_null")]
    pub items: Vec<CartLineItem>,
}

/// 单价 × 数量，溢出时返回 None
pub fn line_amount(unit_price: Decimal, quantity: u32) -> Option<Decimal> {
    unit_price.checked_mul(Decimal::from(quantity))
}

fn saturated(sign_of: Decimal) -> Decimal {
    if sign_of.is_sign_negative() {
        Decimal::MIN
    } else {
        Decimal::MAX
    }
}

/// 合计金额：Σ 单价 × 数量，溢出时饱和
pub fn cart_total(items: &[CartLineItem]) -> Decimal {
    items.iter().fold(Decimal::ZERO, |acc, item| {
        let subtotal = item.subtotal();
        acc.checked_add(subtotal).unwrap_or_else(|| {
            warn!("[CartStore] 购物车合计溢出，按极值计算");
            saturated(subtotal)
        })
    })
}

/// 合计件数：Σ 数量
pub fn cart_count(items: &[CartLineItem]) -> u64 {
    items.iter().map(|i| u64::from(i.quantity)).sum()
}

/// 规范化：去掉数量为 0 的条目，同一商品合并为一条（数量相加，保留首个服务端行 ID）
pub fn normalize_lines(lines: Vec<CartLineItem>) -> Vec<CartLineItem> {
    let mut out: Vec<CartLineItem> = Vec::with_capacity(lines.len());
    for line in lines {
        if line.quantity == 0 || line.product_id.is_empty() {
            continue;
        }
        match out.iter_mut().find(|l| l.product_id == line.product_id) {
            Some(existing) => {
                existing.quantity = existing.quantity.saturating_add(line.quantity);
                if existing.server_line_id.is_none() {
                    existing.server_line_id = line.server_line_id;
                }
            }
            None => out.push(line),
        }
    }
    out
}

/// 本地合并：已存在则累加数量，否则追加到末尾
pub fn merge_line(
    items: &[CartLineItem],
    product: &ProductSnapshot,
    quantity: u32,
) -> Vec<CartLineItem> {
    let mut next = items.to_vec();
    match next.iter_mut().find(|i| i.product_id == product.product_id) {
        Some(existing) => existing.quantity = existing.quantity.saturating_add(quantity),
        None => next.push(CartLineItem::from_product(product, quantity)),
    }
    next
}

/// 本地修改数量；数量为 0 时删除
pub fn set_line_quantity(items: &[CartLineItem], product_id: &str, quantity: u32) -> Vec<CartLineItem> {
    if quantity == 0 {
        return remove_line(items, product_id);
    }
    items
        .iter()
        .cloned()
        .map(|mut i| {
            if i.product_id == product_id {
                i.quantity = quantity;
            }
            i
        })
        .collect()
}

/// 本地删除
pub fn remove_line(items: &[CartLineItem], product_id: &str) -> Vec<CartLineItem> {
    items
        .iter()
        .filter(|i| i.product_id != product_id)
        .cloned()
        .collect()
}
