//! 搜索业务服务

use std::sync::Arc;

use super::model::SearchQuery;
use crate::app::catalog::model::Product;
use crate::infrastructure::source::{
    PrefixMode, ProductSource, SearchOptions, SourceError, TableFilter, TableScope,
};

/// 无状态的搜索请求处理：构造搜索范围，调用数据源，拆开命中信封
#[derive(Clone)]
pub struct SearchService {
    source: Arc<dyn ProductSource>,
    table: String,
}

impl SearchService {
    pub fn new(source: Arc<dyn ProductSource>, table: impl Into<String>) -> Self {
        Self {
            source,
            table: table.into(),
        }
    }

    /// 单表范围，按分类精确过滤，模糊度 0，短语前缀
    pub fn options_for(&self, query: &SearchQuery) -> SearchOptions {
        let scope = TableScope::new(self.table.clone()).with_filter(TableFilter {
            category: query.category.clone(),
        });

        SearchOptions {
            tables: vec![scope],
            fuzziness: 0,
            prefix: PrefixMode::Phrase,
        }
    }

    /// 返回数据源给出的相关度顺序，不再排序
    pub async fn search(&self, query: &SearchQuery) -> Result<Vec<Product>, SourceError> {
        let options = self.options_for(query);
        let hits = self.source.search(&query.query, &options).await?;
        Ok(hits.into_iter().map(|hit| hit.record).collect())
    }
}
