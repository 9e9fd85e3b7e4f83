use crate::shop::error::{CartError, CartResult};
use reqwest::{RequestBuilder, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, error};
use uuid::Uuid;

/// 公共请求头：Content-Type、operationID 与 X-User-Id
pub fn prepare_request(builder: RequestBuilder, user_id: &str) -> RequestBuilder {
    let operation_id = Uuid::new_v4().to_string();
    debug!("[HTTP]   用户ID: {}, 操作ID: {}", user_id, operation_id);
    builder
        .header("Content-Type", "application/json")
        .header("operationID", operation_id)
        .header("X-User-Id", user_id)
}

/// 拼接接口地址：`segments` 逐段做百分号编码后追加到基础地址的路径之后
pub fn endpoint_url(api_base_url: &str, segments: &[&str]) -> CartResult<Url> {
    let invalid = |detail: String| CartError::Remote {
        status: 0,
        message: format!("无效的 API 地址 {}: {}", api_base_url, detail),
    };
    let mut url = Url::parse(api_base_url).map_err(|e| invalid(e.to_string()))?;
    url.path_segments_mut()
        .map_err(|_| invalid("不能作为基础地址".to_string()))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// 通用 HTTP 响应处理：检查状态码并把 body 反序列化为 `T`
///
/// 后端直接返回业务 JSON（没有 errCode 包装），非 2xx 一律视为失败
pub async fn handle_http_response<T: DeserializeOwned>(
    response: reqwest::Response,
    operation_name: &str,
) -> CartResult<T> {
    let status = response.status();

    // 读取 body bytes（只能读取一次）
    let body_bytes = response
        .bytes()
        .await
        .map_err(CartError::from_transport)?;
    let body_str = String::from_utf8_lossy(&body_bytes);
    debug!("[HTTP] {}响应 Body: {}", operation_name, body_str);

    if !status.is_success() {
        error!(
            "[HTTP] {}请求失败，HTTP状态: {}, 响应: {}",
            operation_name, status, body_str
        );
        return Err(CartError::Remote {
            status: status.as_u16(),
            message: body_str.into_owned(),
        });
    }

    serde_json::from_slice(&body_bytes).map_err(|e| {
        error!(
            "[HTTP] {}反序列化失败: {:?}\n原始响应: {}",
            operation_name, e, body_str
        );
        CartError::Remote {
            status: status.as_u16(),
            message: format!("反序列化响应失败: {}", e),
        }
    })
}

/// 只关心成功与否的响应（ack）
pub async fn handle_ack_response(
    response: reqwest::Response,
    operation_name: &str,
) -> CartResult<()> {
    let status = response.status();
    if status.is_success() {
        debug!("[HTTP] {}请求成功，HTTP状态: {}", operation_name, status);
        return Ok(());
    }

    let body = response.text().await.unwrap_or_default();
    error!(
        "[HTTP] {}请求失败，HTTP状态: {}, 响应: {}",
        operation_name, status, body
    );
    Err(CartError::Remote {
        status: status.as_u16(),
        message: body,
    })
}
