//! 配置管理
//!
//! 所有字段都有默认值。加载顺序：默认值 → TOML 配置文件 → `STOREFRONT_*` 环境变量。

use serde::{Deserialize, Serialize};
use std::env;
use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tracing::info;

use super::source::PRODUCTS_TABLE;

/// 配置错误类型
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    FileRead(String),
    #[error("failed to parse config file: {0}")]
    Parse(String),
    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// 配置加载过程的记录
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub file: Option<PathBuf>,
    /// 生效的环境变量名，不含取值
    pub overrides: Vec<String>,
}

impl LoadReport {
    /// 在日志系统初始化之后调用
    pub fn log(&self) {
        match &self.file {
            Some(path) => info!("已加载配置文件: {}", path.display()),
            None => info!("未指定配置文件，使用默认配置"),
        }
        for key in &self.overrides {
            info!("{} 由环境变量覆盖", key);
        }
    }
}

/// 系统配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub source: SourceConfig,
    pub catalog: CatalogConfig,
    pub client: ClientConfig,
}

/// HTTP 服务配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    /// 整个请求的超时时间（秒）
    pub request_timeout_secs: u64,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 日志级别，`RUST_LOG` 优先
    pub level: String,
    /// 设置后按天滚动写入该目录
    pub log_dir: Option<PathBuf>,
    pub file_prefix: String,
    pub console_output: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Memory,
    Remote,
    Postgres,
}

impl FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "remote" => Ok(Self::Remote),
            "postgres" => Ok(Self::Postgres),
            other => Err(format!("unknown source kind '{other}'")),
        }
    }
}

/// 商品数据源配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub kind: SourceKind,
    pub table: String,
    /// `memory` 数据源的种子文件
    pub seed_path: PathBuf,
    /// `remote` 数据源地址
    pub base_url: String,
    pub api_key: Option<String>,
    /// `postgres` 数据源连接串
    pub database_url: Option<String>,
    pub max_connections: u32,
    /// 单次数据源调用超时（毫秒）
    pub timeout_ms: u64,
    pub page_size: usize,
}

/// 目录快照配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// 大于 0 时定期刷新首屏目录快照
    pub refresh_interval_secs: u64,
}

/// 搜索控制器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub debounce_ms: u64,
    pub min_query_len: usize,
    pub refresh_categories_on_load: bool,
    /// 旧行为：空结果回退显示完整目录
    pub empty_results_fall_back_to_catalog: bool,
    pub request_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 3000,
            request_timeout_secs: 10,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_dir: None,
            file_prefix: "storefront".to_string(),
            console_output: true,
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::Memory,
            table: PRODUCTS_TABLE.to_string(),
            seed_path: PathBuf::from("data/products.json"),
            base_url: "http://127.0.0.1:7700".to_string(),
            api_key: None,
            database_url: None,
            max_connections: 10,
            timeout_ms: 3_000,
            page_size: 200,
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:3000".to_string(),
            debounce_ms: 500,
            min_query_len: 3,
            refresh_categories_on_load: true,
            empty_results_fall_back_to_catalog: false,
            request_timeout_ms: 5_000,
        }
    }
}

impl Config {
    /// 从配置文件加载配置
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::FileRead(e.to_string()))?;

        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// 加载配置：文件可选，随后应用环境变量覆盖并校验
    ///
    /// 此时日志系统尚未初始化，加载过程记录在 `LoadReport` 中，由调用方稍后输出
    pub fn load(path: Option<&Path>) -> Result<(Self, LoadReport), ConfigError> {
        let mut config = match path {
            Some(path) => Self::load_from_file(path)?,
            None => Self::default(),
        };

        let overrides = config.apply_env_overrides(|key| env::var(key).ok())?;
        config.validate()?;

        let report = LoadReport {
            file: path.map(Path::to_path_buf),
            overrides,
        };
        Ok((config, report))
    }

    /// 使用 `STOREFRONT_*` 变量覆盖配置，返回生效的变量名；`lookup` 便于测试注入
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<Vec<String>, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut applied = Vec::new();
        override_parsed(&lookup, &mut applied, "STOREFRONT_PORT", &mut self.server.port)?;
        override_parsed(&lookup, &mut applied, "STOREFRONT_BIND_ADDRESS", &mut self.server.bind_address)?;
        override_parsed(&lookup, &mut applied, "STOREFRONT_LOG_LEVEL", &mut self.logging.level)?;
        override_parsed(&lookup, &mut applied, "STOREFRONT_SOURCE_KIND", &mut self.source.kind)?;
        override_parsed(&lookup, &mut applied, "STOREFRONT_SOURCE_URL", &mut self.source.base_url)?;
        override_parsed(&lookup, &mut applied, "STOREFRONT_SEED_PATH", &mut self.source.seed_path)?;
        override_parsed(&lookup, &mut applied, "STOREFRONT_SOURCE_TIMEOUT_MS", &mut self.source.timeout_ms)?;

        if let Some(key) = lookup("STOREFRONT_SOURCE_API_KEY") {
            self.source.api_key = Some(key);
            applied.push("STOREFRONT_SOURCE_API_KEY".to_string());
        }
        if let Some(url) = lookup("STOREFRONT_DATABASE_URL") {
            self.source.database_url = Some(url);
            applied.push("STOREFRONT_DATABASE_URL".to_string());
        }
        if let Some(dir) = lookup("STOREFRONT_LOG_DIR") {
            self.logging.log_dir = Some(PathBuf::from(dir));
            applied.push("STOREFRONT_LOG_DIR".to_string());
        }
        Ok(applied)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let checks = [
            (self.source.timeout_ms == 0, "source.timeout_ms", "must be greater than 0"),
            (self.source.page_size == 0, "source.page_size", "must be greater than 0"),
            (self.source.table.trim().is_empty(), "source.table", "must not be empty"),
            (self.server.request_timeout_secs == 0, "server.request_timeout_secs", "must be greater than 0"),
            (self.client.min_query_len == 0, "client.min_query_len", "must be greater than 0"),
        ];

        for (failed, key, message) in checks {
            if failed {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    message: message.to_string(),
                });
            }
        }

        if self.source.kind == SourceKind::Postgres && self.source.database_url.is_none() {
            return Err(ConfigError::InvalidValue {
                key: "source.database_url".to_string(),
                message: "required when source.kind = \"postgres\"".to_string(),
            });
        }

        Ok(())
    }

    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.server.bind_address, self.server.port)
    }
}

/// 变量存在时解析并写入 `slot`，变量名记入 `applied`
fn override_parsed<F, T>(
    lookup: &F,
    applied: &mut Vec<String>,
    key: &str,
    slot: &mut T,
) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    let Some(raw) = lookup(key) else {
        return Ok(());
    };

    *slot = raw.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        key: key.to_string(),
        message: e.to_string(),
    })?;
    applied.push(key.to_string());
    Ok(())
}
