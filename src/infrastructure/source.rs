//! 商品数据源抽象
//!
//! 数据源是外部协作方：可以返回完整目录，也可以按查询词和搜索范围返回排序后的命中。
//! 具体实现见 `memory`、`remote` 与 `database`。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::app::catalog::model::Product;

/// 商品表名
pub const PRODUCTS_TABLE: &str = "products";

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("data source timed out after {0:?}")]
    Timeout(Duration),

    #[error("data source unavailable: {0}")]
    Unavailable(String),

    #[error("invalid response from data source: {0}")]
    InvalidResponse(String),

    #[error("unknown table: {0}")]
    UnknownTable(String),

    #[error("failed to load seed catalog: {0}")]
    Seed(String),

    #[cfg(feature = "database")]
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// 前缀匹配模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrefixMode {
    /// 查询词作为字段中某个短语的前缀
    Phrase,
    /// 所有词都必须完整匹配
    Disabled,
}

/// 表内精确匹配过滤条件
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl TableFilter {
    pub fn is_empty(&self) -> bool {
        self.category.is_none()
    }

    pub fn matches(&self, product: &Product) -> bool {
        match &self.category {
            Some(category) => product.category == *category,
            None => true,
        }
    }
}

/// 单表搜索范围
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableScope {
    pub table: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<TableFilter>,
}

impl TableScope {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            filter: None,
        }
    }

    pub fn with_filter(mut self, filter: TableFilter) -> Self {
        if !filter.is_empty() {
            self.filter = Some(filter);
        }
        self
    }

    pub fn admits(&self, product: &Product) -> bool {
        self.filter.as_ref().map_or(true, |f| f.matches(product))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchOptions {
    pub tables: Vec<TableScope>,
    pub fuzziness: u8,
    pub prefix: PrefixMode,
}

/// 搜索命中的信封：记录本身加上来源表和相关度
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub table: String,
    pub score: f64,
    pub record: Product,
}

#[async_trait]
pub trait ProductSource: Send + Sync {
    /// 数据源类型名，用于日志和健康检查
    fn kind(&self) -> &'static str;

    async fn list_products(&self) -> Result<Vec<Product>, SourceError>;

    /// 返回按相关度排序的命中，数据源之外不再重新排序
    async fn search(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Vec<SearchHit>, SourceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_filter_is_dropped_from_scope() {
        let scope = TableScope::new(PRODUCTS_TABLE).with_filter(TableFilter::default());
        assert!(scope.filter.is_none());

        let scope = TableScope::new(PRODUCTS_TABLE).with_filter(TableFilter {
            category: Some("men".to_string()),
        });
        assert_eq!(
            scope.filter.and_then(|f| f.category).as_deref(),
            Some("men")
        );
    }

    #[test]
    fn test_search_options_wire_shape() {
        let options = SearchOptions {
            tables: vec![TableScope::new(PRODUCTS_TABLE).with_filter(TableFilter {
                category: Some("men".to_string()),
            })],
            fuzziness: 0,
            prefix: PrefixMode::Phrase,
        };

        let json = serde_json::to_value(&options).unwrap();
        assert_eq!(json["tables"][0]["table"], "products");
        assert_eq!(json["tables"][0]["filter"]["category"], "men");
        assert_eq!(json["fuzziness"], 0);
        assert_eq!(json["prefix"], "phrase");
    }
}
