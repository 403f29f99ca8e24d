//! 托管数据库的 REST 数据源
//!
//! - 目录：`POST {base}/tables/{table}/query`，按游标分页
//! - 搜索：`POST {base}/search`，请求体为 `{ query, tables, fuzziness, prefix }`
//! - 每条命中是记录本身加上 `xata: { table, score }` 元数据
//!
//! 所有请求都带有显式超时，超时映射为 `SourceError::Timeout`。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use super::config::SourceConfig;
use super::source::{ProductSource, SearchHit, SearchOptions, SourceError};
use crate::app::catalog::model::Product;

const MAX_PAGES: usize = 100;

#[derive(Serialize)]
struct QueryRequest {
    page: PageRequest,
}

#[derive(Serialize)]
struct PageRequest {
    size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    after: Option<String>,
}

#[derive(Deserialize)]
struct QueryResponse {
    records: Vec<Product>,
    #[serde(default)]
    meta: QueryMeta,
}

#[derive(Default, Deserialize)]
struct QueryMeta {
    #[serde(default)]
    page: PageMeta,
}

#[derive(Default, Deserialize)]
struct PageMeta {
    cursor: Option<String>,
    #[serde(default)]
    more: bool,
}

#[derive(Serialize)]
struct SearchBody<'a> {
    query: &'a str,
    #[serde(flatten)]
    options: &'a SearchOptions,
}

#[derive(Deserialize)]
struct SearchResponseBody {
    records: Vec<RemoteHit>,
}

#[derive(Deserialize)]
struct RemoteHit {
    #[serde(flatten)]
    record: Product,
    xata: HitMeta,
}

#[derive(Deserialize)]
struct HitMeta {
    table: String,
    #[serde(default)]
    score: f64,
}

#[derive(Debug, Clone)]
pub struct RemoteProductSource {
    base_url: String,
    api_key: Option<String>,
    table: String,
    page_size: usize,
    timeout: Duration,
    inner: reqwest::Client,
}

impl RemoteProductSource {
    pub fn new(config: &SourceConfig) -> Result<Self, SourceError> {
        let timeout = Duration::from_millis(config.timeout_ms);
        let inner = reqwest::Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()
            .map_err(|e| SourceError::Unavailable(e.to_string()))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            table: config.table.clone(),
            page_size: config.page_size,
            timeout,
            inner,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, SourceError>
    where
        B: Serialize + ?Sized,
        T: for<'de> Deserialize<'de>,
    {
        let mut request = self.inner.post(self.endpoint(path)).json(body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| self.map_err(e))?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            warn!("数据源返回错误 {} {}: {}", status, path, text);
            return Err(SourceError::Unavailable(format!("HTTP {status} from {path}")));
        }

        response.json::<T>().await.map_err(|e| self.map_err(e))
    }

    fn map_err(&self, e: reqwest::Error) -> SourceError {
        if e.is_timeout() {
            SourceError::Timeout(self.timeout)
        } else if e.is_decode() {
            SourceError::InvalidResponse(e.to_string())
        } else {
            SourceError::Unavailable(e.to_string())
        }
    }
}

#[async_trait]
impl ProductSource for RemoteProductSource {
    fn kind(&self) -> &'static str {
        "remote"
    }

    async fn list_products(&self) -> Result<Vec<Product>, SourceError> {
        let path = format!("tables/{}/query", self.table);
        let mut products = Vec::new();
        let mut after = None;

        for page in 0..MAX_PAGES {
            let request = QueryRequest {
                page: PageRequest {
                    size: self.page_size,
                    after: after.take(),
                },
            };
            let response: QueryResponse = self.post(&path, &request).await?;
            debug!("目录第 {} 页: {} 条记录", page + 1, response.records.len());
            products.extend(response.records);

            match response.meta.page.cursor {
                Some(cursor) if response.meta.page.more => after = Some(cursor),
                _ => return Ok(products),
            }
        }

        warn!("目录分页超过 {} 页，截断结果", MAX_PAGES);
        Ok(products)
    }

    async fn search(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Vec<SearchHit>, SourceError> {
        let body = SearchBody { query, options };
        let response: SearchResponseBody = self.post("search", &body).await?;

        Ok(response
            .records
            .into_iter()
            .map(|hit| SearchHit {
                table: hit.xata.table,
                score: hit.xata.score,
                record: hit.record,
            })
            .collect())
    }
}
