//! 内存数据源
//!
//! 从 JSON 种子文件加载目录，在进程内执行短语前缀搜索。
//! 适合本地开发和测试，也是默认数据源。

use async_trait::async_trait;
use std::path::Path;
use tokio::sync::RwLock;
use tracing::info;

use super::matcher::PhraseQuery;
use super::source::{ProductSource, SearchHit, SearchOptions, SourceError};
use crate::app::catalog::model::Product;

pub struct InMemoryProductSource {
    table: String,
    products: RwLock<Vec<Product>>,
}

impl InMemoryProductSource {
    pub fn new(table: impl Into<String>, products: Vec<Product>) -> Self {
        Self {
            table: table.into(),
            products: RwLock::new(products),
        }
    }

    pub async fn from_seed_file(
        table: impl Into<String>,
        path: impl AsRef<Path>,
    ) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| SourceError::Seed(format!("{}: {}", path.display(), e)))?;
        let products: Vec<Product> = serde_json::from_str(&content)
            .map_err(|e| SourceError::Seed(format!("{}: {}", path.display(), e)))?;

        info!("已从 {} 加载 {} 个商品", path.display(), products.len());
        Ok(Self::new(table, products))
    }

    /// 整体替换目录
    pub async fn replace(&self, products: Vec<Product>) {
        *self.products.write().await = products;
    }
}

#[async_trait]
impl ProductSource for InMemoryProductSource {
    fn kind(&self) -> &'static str {
        "memory"
    }

    async fn list_products(&self) -> Result<Vec<Product>, SourceError> {
        Ok(self.products.read().await.clone())
    }

    async fn search(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Vec<SearchHit>, SourceError> {
        let phrase = PhraseQuery::new(query, options.fuzziness, options.prefix);
        let products = self.products.read().await;
        let mut hits = Vec::new();

        for scope in &options.tables {
            if scope.table != self.table {
                return Err(SourceError::UnknownTable(scope.table.clone()));
            }

            hits.extend(
                products
                    .iter()
                    .filter(|p| scope.admits(p))
                    .filter_map(|p| {
                        phrase.score(p).map(|score| SearchHit {
                            table: scope.table.clone(),
                            score,
                            record: p.clone(),
                        })
                    }),
            );
        }

        // 稳定排序：同分时保持目录顺序
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        Ok(hits)
    }
}
