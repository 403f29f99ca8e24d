//! 核心响应处理模块

use serde::{Deserialize, Serialize};

/// 错误响应结构
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub code: u16,
    pub timestamp: String,
    pub request_id: String,
}

/// 健康检查响应
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub source: String,
    pub products: usize,
    pub snapshot_taken_at: String,
    pub timestamp: String,
}
