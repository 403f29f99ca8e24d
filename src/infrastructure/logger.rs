//! 日志基础设施

use anyhow::Result;
use std::io;
use tracing_appender::{non_blocking, non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use super::config::LoggingConfig;

pub struct Logger;

impl Logger {
    /// 初始化日志系统
    ///
    /// - `RUST_LOG` 优先于配置中的级别
    /// - 配置了 `log_dir` 时按日期滚动写文件
    /// - 返回的 guard 必须由调用方持有到进程结束，否则文件日志会丢失
    pub fn init(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&config.level))?;

        let console = config
            .console_output
            .then(|| fmt::layer().with_writer(io::stdout).with_ansi(true));

        let (file, guard) = match &config.log_dir {
            Some(dir) => {
                std::fs::create_dir_all(dir)?;
                let appender = rolling::daily(dir, &config.file_prefix);
                let (writer, guard) = non_blocking(appender);
                let layer = fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false)
                    .with_target(false)
                    .with_thread_names(true);
                (Some(layer), Some(guard))
            }
            None => (None, None),
        };

        tracing_subscriber::registry()
            .with(filter)
            .with(console)
            .with(file)
            .try_init()?;

        Ok(guard)
    }
}
