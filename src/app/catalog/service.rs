//! 目录业务服务

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::model::{Category, Product, StorefrontPage};
use crate::infrastructure::source::{ProductSource, SourceError};

/// 从商品列表推导分类
pub struct CategoryIndex;

impl CategoryIndex {
    /// 每个不同的 `category` 值恰好出现一次，按名称升序（区分大小写），附带商品数
    pub fn build(products: &[Product]) -> Vec<Category> {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for product in products {
            *counts.entry(product.category.as_str()).or_default() += 1;
        }

        counts
            .into_iter()
            .map(|(name, count)| Category {
                name: name.to_string(),
                count: Some(count),
            })
            .collect()
    }
}

/// 首屏目录快照，在请求之前计算
#[derive(Debug, Clone)]
pub struct CatalogSnapshot {
    pub page: Arc<StorefrontPage>,
    pub taken_at: DateTime<Utc>,
}

impl CatalogSnapshot {
    pub fn from_products(products: Vec<Product>) -> Self {
        let categories = CategoryIndex::build(&products);
        Self {
            page: Arc::new(StorefrontPage {
                products,
                categories,
            }),
            taken_at: Utc::now(),
        }
    }
}

#[derive(Clone)]
pub struct CatalogService {
    source: Arc<dyn ProductSource>,
    snapshot: Arc<RwLock<CatalogSnapshot>>,
}

impl CatalogService {
    /// 拉取完整目录并生成初始快照
    pub async fn load(source: Arc<dyn ProductSource>) -> Result<Self, SourceError> {
        let products = source.list_products().await?;
        info!("目录快照: {} 个商品", products.len());

        Ok(Self {
            source,
            snapshot: Arc::new(RwLock::new(CatalogSnapshot::from_products(products))),
        })
    }

    pub fn source(&self) -> &Arc<dyn ProductSource> {
        &self.source
    }

    pub async fn snapshot(&self) -> CatalogSnapshot {
        self.snapshot.read().await.clone()
    }

    /// 重新拉取目录并替换快照，返回商品数
    pub async fn refresh(&self) -> Result<usize, SourceError> {
        let products = self.source.list_products().await?;
        let count = products.len();
        *self.snapshot.write().await = CatalogSnapshot::from_products(products);
        Ok(count)
    }

    /// 基于数据源当前目录实时计算分类
    pub async fn categories(&self) -> Result<Vec<Category>, SourceError> {
        let products = self.source.list_products().await?;
        Ok(CategoryIndex::build(&products))
    }

    /// 后台定期刷新快照，失败时保留旧快照
    pub fn spawn_refresh(&self, interval: Duration) -> JoinHandle<()> {
        let service = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // 第一次 tick 立即返回，启动时已经加载过
            ticker.tick().await;
            loop {
                ticker.tick().await;
                match service.refresh().await {
                    Ok(count) => info!("目录快照已刷新: {} 个商品", count),
                    Err(e) => warn!("目录快照刷新失败，保留旧快照: {}", e),
                }
            }
        })
    }
}
