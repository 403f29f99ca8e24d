//! Storefront 服务入口
//!
//! 用法: storefront [配置文件]，也可通过 STOREFRONT_CONFIG 指定配置文件。

use std::env;
use std::path::PathBuf;

use storefront::infrastructure::{config::Config, logger::Logger};
use storefront::server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();
    let config_path = args
        .get(1)
        .cloned()
        .or_else(|| env::var("STOREFRONT_CONFIG").ok())
        .map(PathBuf::from);

    let (config, report) = Config::load(config_path.as_deref())?;

    // 文件日志的后台写入线程随 guard 一起存活
    let _guard = Logger::init(&config.logging)?;
    report.log();

    server::run(config).await
}
