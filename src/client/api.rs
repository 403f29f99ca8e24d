//! 店面 API 客户端

use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;

use crate::app::catalog::model::{CategoriesResponse, Category, Product, StorefrontPage};
use crate::app::search::model::{SearchQuery, SearchResponse};
use crate::core::response::ErrorResponse;

#[derive(Debug, Clone, Error)]
pub enum ClientError {
    #[error("request timed out")]
    Timeout,
    #[error("request failed: {0}")]
    Transport(String),
    #[error("server rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ClientError::Timeout
        } else if e.is_decode() {
            ClientError::Decode(e.to_string())
        } else {
            ClientError::Transport(e.to_string())
        }
    }
}

/// 搜索控制器依赖的服务端接口
#[async_trait]
pub trait SearchApi: Send + Sync + 'static {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<Product>, ClientError>;

    async fn categories(&self) -> Result<Vec<Category>, ClientError>;
}

#[derive(Debug, Clone)]
pub struct HttpSearchApi {
    base_url: String,
    inner: reqwest::Client,
}

impl HttpSearchApi {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ClientError> {
        let inner = reqwest::Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            inner,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// 首屏数据：完整目录与分类
    pub async fn storefront(&self) -> Result<StorefrontPage, ClientError> {
        let response = self.inner.get(self.endpoint("/api/storefront")).send().await?;
        Ok(check(response).await?.json().await?)
    }
}

async fn check(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorResponse>(&text)
        .map(|e| e.message)
        .unwrap_or_else(|_| {
            if text.is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("unknown error")
                    .to_string()
            } else {
                text
            }
        });

    if status == StatusCode::GATEWAY_TIMEOUT || status == StatusCode::REQUEST_TIMEOUT {
        return Err(ClientError::Timeout);
    }
    Err(ClientError::Rejected {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl SearchApi for HttpSearchApi {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<Product>, ClientError> {
        let response = self
            .inner
            .post(self.endpoint("/api/search"))
            .json(query)
            .send()
            .await?;
        let body: SearchResponse = check(response).await?.json().await?;
        Ok(body.products)
    }

    async fn categories(&self) -> Result<Vec<Category>, ClientError> {
        let response = self.inner.get(self.endpoint("/api/categories")).send().await?;
        let body: CategoriesResponse = check(response).await?.json().await?;
        Ok(body.categories)
    }
}
