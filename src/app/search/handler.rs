//! 搜索处理器

use axum::{body::Bytes, extract::State, response::Json, Extension};
use tracing::info;

use super::model::{SearchQuery, SearchResponse};
use crate::app::AppState;
use crate::core::error::CoreError;
use crate::core::middleware::RequestId;

/// `POST /api/search`
pub async fn search_products(
    State(state): State<AppState>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    body: Bytes,
) -> Result<Json<SearchResponse>, CoreError> {
    let query = SearchQuery::decode(&body)?;
    let products = state.search.search(&query).await?;

    info!(
        "[{}] 搜索 query={:?} category={:?} -> {} 个结果",
        request_id,
        query.query,
        query.category,
        products.len()
    );

    Ok(Json(SearchResponse { products }))
}
