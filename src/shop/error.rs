//! 购物车错误类型
//!
//! CartStore 对外只暴露 `Validation`，其余错误在仓储层被吸收，
//! 仅通过 `SyncStatus` 反映同步可信度。

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CartError {
    /// 无法连接远程购物车服务（传输错误、超时）
    #[error("网络不可用: {0}")]
    NetworkUnavailable(String),

    /// 远程服务返回非 2xx 或无法解析的响应
    #[error("远程购物车服务错误 {status}: {message}")]
    Remote { status: u16, message: String },

    /// 本地缓存读写失败
    #[error("本地缓存错误: {0}")]
    Storage(String),

    /// 非法输入（例如缺少 productId、数量为 0）
    #[error("非法的购物车参数: {0}")]
    Validation(String),

    /// 已登录用户的购物车条目缺少服务端行 ID，无法远程更新/删除
    #[error("商品 {product_id} 缺少服务端购物车条目 ID")]
    MissingServerLineId { product_id: String },

    /// 匿名身份调用了远程购物车
    #[error("远程购物车需要已登录用户")]
    Unauthenticated,
}

impl CartError {
    /// 是否为远程相关错误（需要走本地回退）
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            CartError::NetworkUnavailable(_)
                | CartError::Remote { .. }
                | CartError::MissingServerLineId { .. }
                | CartError::Unauthenticated
        )
    }

    /// 从 reqwest 错误归类
    pub(crate) fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() || err.is_request() {
            return CartError::NetworkUnavailable(err.to_string());
        }
        let status = err.status().map(|s| s.as_u16()).unwrap_or(0);
        CartError::Remote {
            status,
            message: err.to_string(),
        }
    }
}

pub type CartResult<T> = std::result::Result<T, CartError>;
