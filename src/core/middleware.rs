//! 核心中间件模块

use axum::{
    extract::Request,
    http::{HeaderValue, header::HeaderName},
    middleware::Next,
    response::Response,
};
use std::time::Instant;
use tracing::info;
use uuid::Uuid;

use super::error::ErrorReport;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// 当前请求的 ID，由中间件写入请求扩展
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

/// 请求日志中间件
///
/// 沿用客户端传入的 `x-request-id`，否则生成一个；ID 写入请求扩展、响应头，
/// 以及错误响应体中的 `request_id`。
pub async fn request_logging_middleware(mut req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let uri = req.uri().clone();
    let request_id = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let user_agent = req
        .headers()
        .get("user-agent")
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string());

    req.extensions_mut().insert(RequestId(request_id.clone()));

    let mut response = next.run(req).await;
    if let Some(report) = response.extensions_mut().remove::<ErrorReport>() {
        response = report.apply(response, &request_id);
    }

    let status = response.status();
    let duration = start.elapsed();

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response
            .headers_mut()
            .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
    }

    info!(
        "[{}] {} {} - {} - {}ms - User-Agent: {:?}",
        request_id,
        method,
        uri,
        status,
        duration.as_millis(),
        user_agent
    );

    response
}
