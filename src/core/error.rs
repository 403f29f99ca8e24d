//! 核心错误处理模块

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    BoxError, Json,
};
use thiserror::Error;
use tracing::{error, warn};
use uuid::Uuid;

use super::response::ErrorResponse;
use crate::infrastructure::source::SourceError;

/// 核心错误类型
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("{0}")]
    BadRequest(String),
    #[error("request timed out: {0}")]
    RequestTimeout(String),
    #[error("upstream unavailable: {0}")]
    BadGateway(String),
    #[error("upstream timed out: {0}")]
    GatewayTimeout(String),
    #[error("{0}")]
    InternalServerError(String),
}

impl CoreError {
    pub fn status(&self) -> StatusCode {
        match self {
            CoreError::BadRequest(_) => StatusCode::BAD_REQUEST,
            CoreError::RequestTimeout(_) => StatusCode::REQUEST_TIMEOUT,
            CoreError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            CoreError::GatewayTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            CoreError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            CoreError::BadRequest(_) => "BAD_REQUEST",
            CoreError::RequestTimeout(_) => "REQUEST_TIMEOUT",
            CoreError::BadGateway(_) => "BAD_GATEWAY",
            CoreError::GatewayTimeout(_) => "GATEWAY_TIMEOUT",
            CoreError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    /// 返回给客户端的消息，5xx 不暴露内部细节
    fn public_message(&self) -> String {
        match self {
            CoreError::BadGateway(_) => "商品数据源暂不可用，请稍后重试".to_string(),
            CoreError::GatewayTimeout(_) => "商品数据源响应超时，请稍后重试".to_string(),
            CoreError::InternalServerError(_) => "服务器内部错误".to_string(),
            _ => self.to_string(),
        }
    }
}

/// 随错误响应传递给请求日志中间件，由中间件填入请求 ID 并记录日志
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub body: ErrorResponse,
    pub detail: String,
}

impl ErrorReport {
    /// 用请求 ID 重写响应体，保留其余响应头
    pub fn apply(mut self, response: Response, request_id: &str) -> Response {
        let status = response.status();
        if status.is_server_error() {
            error!("请求失败 [{}]: {}", request_id, self.detail);
        } else {
            warn!("请求被拒绝 [{}]: {}", request_id, self.detail);
        }

        self.body.request_id = request_id.to_string();
        let (mut parts, _) = response.into_parts();
        parts.headers.remove(axum::http::header::CONTENT_LENGTH);
        Response::from_parts(parts, Json(self.body).into_response().into_body())
    }
}

impl IntoResponse for CoreError {
    fn into_response(self) -> Response {
        let status = self.status();

        // 请求 ID 由中间件替换；未经过中间件时使用新生成的 ID
        let body = ErrorResponse {
            error: self.label().to_string(),
            message: self.public_message(),
            code: status.as_u16(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            request_id: Uuid::new_v4().to_string(),
        };

        let mut response = (status, Json(body.clone())).into_response();
        response.extensions_mut().insert(ErrorReport {
            body,
            detail: self.to_string(),
        });
        response
    }
}

/// `HandleErrorLayer` 的处理函数，把中间件错误转换为统一的错误响应
pub async fn handle_middleware_error(err: BoxError) -> CoreError {
    if err.is::<tower::timeout::error::Elapsed>() {
        CoreError::RequestTimeout("request took too long".to_string())
    } else {
        CoreError::InternalServerError(err.to_string())
    }
}

impl From<SourceError> for CoreError {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::Timeout(_) => CoreError::GatewayTimeout(err.to_string()),
            SourceError::Unavailable(_) | SourceError::InvalidResponse(_) => {
                CoreError::BadGateway(err.to_string())
            }
            #[cfg(feature = "database")]
            SourceError::Database(_) => CoreError::BadGateway(err.to_string()),
            SourceError::UnknownTable(_) | SourceError::Seed(_) => {
                CoreError::InternalServerError(err.to_string())
            }
        }
    }
}

impl From<validator::ValidationErrors> for CoreError {
    fn from(err: validator::ValidationErrors) -> Self {
        let mut messages: Vec<String> = err
            .field_errors()
            .into_iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |error| {
                    error
                        .message
                        .as_ref()
                        .map(|msg| msg.to_string())
                        .unwrap_or_else(|| format!("invalid {}", field))
                })
            })
            .collect();
        messages.sort();

        CoreError::BadRequest(messages.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_source_errors_map_to_gateway_statuses() {
        let timeout: CoreError = SourceError::Timeout(Duration::from_millis(100)).into();
        assert_eq!(timeout.status(), StatusCode::GATEWAY_TIMEOUT);

        let down: CoreError = SourceError::Unavailable("connection refused".to_string()).into();
        assert_eq!(down.status(), StatusCode::BAD_GATEWAY);

        let garbage: CoreError = SourceError::InvalidResponse("eof".to_string()).into();
        assert_eq!(garbage.status(), StatusCode::BAD_GATEWAY);

        let table: CoreError = SourceError::UnknownTable("orders".to_string()).into();
        assert_eq!(table.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_bad_request_response_body() {
        let response = CoreError::BadRequest("query must be a string".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let report = response.extensions().get::<ErrorReport>().unwrap();
        assert_eq!(report.body.error, "BAD_REQUEST");
        assert_eq!(report.body.message, "query must be a string");
    }

    #[test]
    fn test_server_errors_hide_detail() {
        let response = CoreError::BadGateway("connection refused".to_string()).into_response();
        let report = response.extensions().get::<ErrorReport>().unwrap();
        assert!(!report.body.message.contains("connection refused"));
        assert!(report.detail.contains("connection refused"));
    }

    #[tokio::test]
    async fn test_elapsed_timeout_maps_to_request_timeout() {
        let err: BoxError = Box::new(tower::timeout::error::Elapsed::new());
        let mapped = handle_middleware_error(err).await;
        assert_eq!(mapped.status(), StatusCode::REQUEST_TIMEOUT);

        let other: BoxError = "boom".into();
        let mapped = handle_middleware_error(other).await;
        assert_eq!(mapped.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
