//! 基础设施：配置、日志与商品数据源

pub mod config;
#[cfg(feature = "database")]
pub mod database;
pub mod logger;
pub mod matcher;
pub mod memory;
pub mod remote;
pub mod source;

use std::sync::Arc;
use tracing::info;

use config::{SourceConfig, SourceKind};
use source::{ProductSource, SourceError};

/// 按配置构造数据源，进程启动时调用一次
pub async fn connect_source(config: &SourceConfig) -> Result<Arc<dyn ProductSource>, SourceError> {
    let source: Arc<dyn ProductSource> = match config.kind {
        SourceKind::Memory => Arc::new(
            memory::InMemoryProductSource::from_seed_file(&config.table, &config.seed_path).await?,
        ),
        SourceKind::Remote => Arc::new(remote::RemoteProductSource::new(config)?),
        #[cfg(feature = "database")]
        SourceKind::Postgres => Arc::new(database::DatabaseManager::new(config).await?),
        #[cfg(not(feature = "database"))]
        SourceKind::Postgres => {
            return Err(SourceError::Unavailable(
                "postgres source requires the `database` feature".to_string(),
            ))
        }
    };

    info!("数据源已就绪: {}", source.kind());
    Ok(source)
}
