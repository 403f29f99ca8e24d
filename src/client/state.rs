//! 搜索状态与显示规则

use crate::app::catalog::model::{Category, Product};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// 无查询、无分类，显示完整目录
    Idle,
    /// 输入已变化或请求在途，仍显示上一次的结果
    Pending,
    Resolved,
    /// 已解析但零结果
    Empty,
    /// 搜索失败，显示内联错误
    Failed,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchState {
    /// 输入框中的原始文本，立即更新
    pub query_text: String,
    /// 防抖后提交的查询
    pub committed_query: String,
    pub selected_category: Option<String>,
    /// 未激活搜索时为 `None`
    pub results: Option<Vec<Product>>,
    pub error: Option<String>,
}

impl SearchState {
    /// 激活条件：选中了分类，或查询长度达到阈值
    pub fn is_active(&self, min_query_len: usize) -> bool {
        self.selected_category.is_some() || self.committed_query.chars().count() >= min_query_len
    }
}

/// 发布给视图的快照
#[derive(Debug, Clone)]
pub struct ViewSnapshot {
    pub phase: Phase,
    pub state: SearchState,
    pub categories: Vec<Category>,
    pub visible: Vec<Product>,
    pub catalog_size: usize,
}

/// 显示规则
///
/// 未激活时显示完整目录；解析出的空结果显示为空。
/// `fall_back_on_empty` 复现旧行为：空结果退回完整目录，与"未搜索"无法区分。
pub fn visible_products(
    catalog: &[Product],
    state: &SearchState,
    fall_back_on_empty: bool,
) -> Vec<Product> {
    if state.error.is_some() {
        return Vec::new();
    }
    match &state.results {
        None => catalog.to_vec(),
        Some(results) if results.is_empty() && fall_back_on_empty => catalog.to_vec(),
        Some(results) => results.clone(),
    }
}

pub fn sorted_categories(mut categories: Vec<Category>) -> Vec<Category> {
    categories.sort_by(|a, b| a.name.cmp(&b.name));
    categories
}
