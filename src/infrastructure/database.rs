//! 数据库基础设施
//!
//! Postgres 数据源：SQL 负责分类过滤和粗筛，短语前缀匹配与排序在进程内完成，
//! 保证与内存数据源的语义一致。

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::info;

use super::config::SourceConfig;
use super::matcher::PhraseQuery;
use super::source::{ProductSource, SearchHit, SearchOptions, SourceError};
use crate::app::catalog::model::Product;

const PRODUCT_COLUMNS: &str = "id, title, price, category, image, rating_rate, rating_count";

pub struct DatabaseManager {
    pool: PgPool,
    table: String,
    timeout: Duration,
}

impl DatabaseManager {
    pub async fn new(config: &SourceConfig) -> Result<Self, SourceError> {
        let database_url = config
            .database_url
            .as_deref()
            .ok_or_else(|| SourceError::Unavailable("source.database_url is not set".to_string()))?;
        let timeout = Duration::from_millis(config.timeout_ms);

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(1)
            .acquire_timeout(timeout)
            .idle_timeout(Duration::from_secs(60))
            .connect(database_url)
            .await?;

        info!("已连接 Postgres 数据源，表: {}", config.table);
        Ok(Self {
            pool,
            table: quote_ident(&config.table),
            timeout,
        })
    }

    async fn with_timeout<T, F>(&self, fut: F) -> Result<T, SourceError>
    where
        F: std::future::Future<Output = Result<T, sqlx::Error>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result.map_err(SourceError::from),
            Err(_) => Err(SourceError::Timeout(self.timeout)),
        }
    }
}

#[async_trait]
impl ProductSource for DatabaseManager {
    fn kind(&self) -> &'static str {
        "postgres"
    }

    async fn list_products(&self) -> Result<Vec<Product>, SourceError> {
        let sql = format!("SELECT {} FROM {} ORDER BY id", PRODUCT_COLUMNS, self.table);
        self.with_timeout(sqlx::query_as::<_, Product>(&sql).fetch_all(&self.pool))
            .await
    }

    async fn search(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Vec<SearchHit>, SourceError> {
        let phrase = PhraseQuery::new(query, options.fuzziness, options.prefix);
        let patterns: Vec<String> = if options.fuzziness == 0 {
            phrase.tokens().iter().map(|t| like_pattern(t)).collect()
        } else {
            // 模糊匹配无法用 ILIKE 粗筛
            Vec::new()
        };

        let sql = format!(
            "SELECT {} FROM {} \
             WHERE ($1::text IS NULL OR category = $1) \
               AND (title ILIKE ALL($2) OR category ILIKE ALL($2)) \
             ORDER BY id",
            PRODUCT_COLUMNS, self.table
        );

        let mut hits = Vec::new();
        for scope in &options.tables {
            if quote_ident(&scope.table) != self.table {
                return Err(SourceError::UnknownTable(scope.table.clone()));
            }
            let category = scope.filter.as_ref().and_then(|f| f.category.clone());

            let rows = self
                .with_timeout(
                    sqlx::query_as::<_, Product>(&sql)
                        .bind(category)
                        .bind(&patterns)
                        .fetch_all(&self.pool),
                )
                .await?;

            hits.extend(rows.into_iter().filter_map(|p| {
                phrase.score(&p).map(|score| SearchHit {
                    table: scope.table.clone(),
                    score,
                    record: p,
                })
            }));
        }

        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        Ok(hits)
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn like_pattern(token: &str) -> String {
    let escaped = token
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("shirt"), "%shirt%");
        assert_eq!(like_pattern("100%"), "%100\\%%");
        assert_eq!(like_pattern("a_b"), "%a\\_b%");
    }

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("products"), "\"products\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }
}
