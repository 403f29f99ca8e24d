//! 服务启动与优雅退出

use anyhow::Context;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::info;

use crate::app::{catalog::service::CatalogService, create_routes, AppState};
use crate::infrastructure::{config::Config, connect_source};

pub async fn run(config: Config) -> anyhow::Result<()> {
    info!("初始化数据源...");
    let source = connect_source(&config.source)
        .await
        .context("failed to initialize product source")?;

    let catalog = CatalogService::load(source)
        .await
        .context("failed to load catalog snapshot")?;

    if config.catalog.refresh_interval_secs > 0 {
        let interval = Duration::from_secs(config.catalog.refresh_interval_secs);
        info!("目录快照每 {:?} 刷新一次", interval);
        catalog.spawn_refresh(interval);
    }

    let state = AppState::new(catalog, config.source.table.clone());
    let app = create_routes(
        state,
        Duration::from_secs(config.server.request_timeout_secs),
    );

    let address = config.listen_address();
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {address}"))?;

    info!("🚀 Storefront 服务运行在 http://{}", address);
    info!("📖 API 端点:");
    info!("   POST /api/search      - 商品搜索");
    info!("   GET  /api/categories  - 分类列表");
    info!("   GET  /api/storefront  - 首屏数据");
    info!("   GET  /health          - 健康检查");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("服务已关闭");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
        info!("收到 Ctrl+C，正在关闭");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
        info!("收到 terminate 信号，正在关闭");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
