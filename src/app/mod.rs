//! HTTP 应用：状态与路由

pub mod catalog;
pub mod search;

use axum::{
    error_handling::HandleErrorLayer,
    http::{header::CONTENT_TYPE, HeaderName, Method},
    middleware,
    routing::{get, post},
    Router,
};
use std::time::Duration;
use tower::{timeout::TimeoutLayer, ServiceBuilder};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::core::error::handle_middleware_error;
use crate::core::middleware::{request_logging_middleware, REQUEST_ID_HEADER};
use catalog::service::CatalogService;
use search::service::SearchService;

/// 应用状态，数据源在进程启动时显式构造后注入
#[derive(Clone)]
pub struct AppState {
    pub catalog: CatalogService,
    pub search: SearchService,
}

impl AppState {
    pub fn new(catalog: CatalogService, table: impl Into<String>) -> Self {
        let search = SearchService::new(catalog.source().clone(), table);
        Self { catalog, search }
    }
}

/// 创建路由
pub fn create_routes(state: AppState, request_timeout: Duration) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, HeaderName::from_static(REQUEST_ID_HEADER)])
        .expose_headers([HeaderName::from_static(REQUEST_ID_HEADER)])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/health", get(catalog::handler::health_check))
        .route("/api/search", post(search::handler::search_products))
        .route("/api/categories", get(catalog::handler::list_categories))
        .route("/api/storefront", get(catalog::handler::storefront_page))
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(request_logging_middleware))
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                // 超时也返回统一的 JSON 错误体
                .layer(HandleErrorLayer::new(handle_middleware_error))
                .layer(TimeoutLayer::new(request_timeout)),
        )
        .with_state(state)
}
