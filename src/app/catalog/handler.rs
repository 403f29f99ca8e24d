//! 目录处理器

use axum::{extract::State, response::Json};

use super::model::{CategoriesResponse, StorefrontPage};
use crate::app::AppState;
use crate::core::error::CoreError;
use crate::core::response::HealthResponse;

/// `GET /api/categories`
pub async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<CategoriesResponse>, CoreError> {
    let categories = state.catalog.categories().await?;
    Ok(Json(CategoriesResponse { categories }))
}

/// `GET /api/storefront`：首屏渲染数据，来自预先计算的快照
pub async fn storefront_page(State(state): State<AppState>) -> Json<StorefrontPage> {
    let snapshot = state.catalog.snapshot().await;
    Json(StorefrontPage::clone(&snapshot.page))
}

/// 健康检查
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let snapshot = state.catalog.snapshot().await;

    Json(HealthResponse {
        status: "healthy".to_string(),
        source: state.catalog.source().kind().to_string(),
        products: snapshot.page.products.len(),
        snapshot_taken_at: snapshot.taken_at.to_rfc3339(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}
