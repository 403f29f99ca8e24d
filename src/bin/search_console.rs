//! 终端版店面搜索
//!
//! 每行输入视为搜索框的最新内容，`:cat <分类>` 选择分类，`:all` 清除分类，`:quit` 退出。
//! 连接正在运行的 storefront 服务。

use anyhow::Context;
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

use storefront::client::api::HttpSearchApi;
use storefront::client::controller::{ControllerConfig, SearchController};
use storefront::client::state::{Phase, ViewSnapshot};
use storefront::infrastructure::{config::Config, logger::Logger};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = env::args()
        .nth(1)
        .or_else(|| env::var("STOREFRONT_CONFIG").ok())
        .map(PathBuf::from);
    let (mut config, report) = Config::load(config_path.as_deref())?;
    // 终端被搜索结果占用，日志默认只写文件
    config.logging.console_output = false;
    let _guard = Logger::init(&config.logging)?;
    report.log();

    let api = HttpSearchApi::new(
        config.client.api_base_url.clone(),
        Duration::from_millis(config.client.request_timeout_ms),
    )?;
    let page = api
        .storefront()
        .await
        .with_context(|| format!("failed to load storefront from {}", config.client.api_base_url))?;

    println!(
        "🛒 已加载 {} 个商品，{} 个分类",
        page.products.len(),
        page.categories.len()
    );
    println!("输入关键词搜索，:cat <分类> 选择分类，:all 清除分类，:quit 退出");

    let (handle, mut view, task) = SearchController::spawn(
        Arc::new(api),
        ControllerConfig::from(&config.client),
        page,
    );

    let printer = tokio::spawn(async move {
        while view.changed().await.is_ok() {
            let snapshot = view.borrow_and_update().clone();
            render(&snapshot);
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim_end();
        if line == ":quit" {
            break;
        } else if line == ":all" {
            handle.select_category(None);
        } else if let Some(name) = line.strip_prefix(":cat ") {
            handle.select_category(Some(name.trim().to_string()));
        } else {
            handle.input(line);
        }
    }

    handle.shutdown();
    task.await?;
    printer.await?;
    Ok(())
}

fn render(snapshot: &ViewSnapshot) {
    let category = snapshot
        .state
        .selected_category
        .as_deref()
        .unwrap_or("全部");
    match snapshot.phase {
        Phase::Pending => {
            println!("… 搜索中 \"{}\" [{}]", snapshot.state.query_text, category);
            return;
        }
        Phase::Failed => {
            println!(
                "❌ 搜索失败: {}",
                snapshot.state.error.as_deref().unwrap_or("unknown error")
            );
            return;
        }
        Phase::Empty => println!("🔍 没有找到商品"),
        Phase::Idle => println!("📦 全部商品 ({})", snapshot.catalog_size),
        Phase::Resolved => println!(
            "🔍 \"{}\" [{}]: {} 个结果",
            snapshot.state.committed_query,
            category,
            snapshot.visible.len()
        ),
    }

    for product in &snapshot.visible {
        println!(
            "  {:>6}  {:<40} {:>10}  {}",
            product.id,
            product.title,
            product.display_price(),
            product.category
        );
    }
    let names: Vec<_> = snapshot.categories.iter().map(|c| c.name.as_str()).collect();
    println!("  分类: {}", names.join(", "));
}
