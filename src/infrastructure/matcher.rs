//! 短语前缀匹配
//!
//! 文本按字母数字切分为小写词。查询词序列必须在字段中连续出现：
//! 前面的词整词匹配，最后一个词在 `PrefixMode::Phrase` 下只需是字段词的前缀。
//! `fuzziness` 是每个词允许的最大编辑距离，0 表示逐字符精确匹配。

use super::source::PrefixMode;
use crate::app::catalog::model::Product;

const TITLE_WEIGHT: f64 = 2.0;
const CATEGORY_WEIGHT: f64 = 1.0;
const EXACT_TAIL_BONUS: f64 = 0.5;

pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_lowercase())
        .collect()
}

/// 字段内的一次命中
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldMatch {
    /// 命中起始词的位置
    pub position: usize,
    /// 最后一个查询词是否整词命中
    pub exact_tail: bool,
}

#[derive(Debug, Clone)]
pub struct PhraseQuery {
    tokens: Vec<String>,
    fuzziness: usize,
    prefix: PrefixMode,
}

impl PhraseQuery {
    pub fn new(query: &str, fuzziness: u8, prefix: PrefixMode) -> Self {
        Self {
            tokens: tokenize(query),
            fuzziness: fuzziness as usize,
            prefix,
        }
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn match_field(&self, text: &str) -> Option<FieldMatch> {
        let field = tokenize(text);
        let n = self.tokens.len();
        if n == 0 {
            return Some(FieldMatch {
                position: 0,
                exact_tail: true,
            });
        }
        if field.len() < n {
            return None;
        }

        let (head, tail) = self.tokens.split_at(n - 1);
        let tail = &tail[0];

        for start in 0..=field.len() - n {
            let window = &field[start..start + n];
            let head_ok = head
                .iter()
                .zip(window)
                .all(|(q, f)| self.token_eq(q, f));
            if !head_ok {
                continue;
            }
            let last = &window[n - 1];
            if self.token_eq(tail, last) {
                return Some(FieldMatch {
                    position: start,
                    exact_tail: true,
                });
            }
            if self.prefix == PrefixMode::Phrase && self.token_prefix(tail, last) {
                return Some(FieldMatch {
                    position: start,
                    exact_tail: false,
                });
            }
        }

        None
    }

    /// 相关度打分，不匹配时返回 `None`。空查询匹配所有商品，得分为 0
    pub fn score(&self, product: &Product) -> Option<f64> {
        if self.is_empty() {
            return Some(0.0);
        }

        let title = self
            .match_field(&product.title)
            .map(|m| field_score(TITLE_WEIGHT, m));
        let category = self
            .match_field(&product.category)
            .map(|m| field_score(CATEGORY_WEIGHT, m));

        match (title, category) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        }
    }

    fn token_eq(&self, query: &str, field: &str) -> bool {
        if self.fuzziness == 0 {
            return query == field;
        }
        edit_distance(query, field) <= self.fuzziness
    }

    fn token_prefix(&self, query: &str, field: &str) -> bool {
        if field.starts_with(query) {
            return true;
        }
        if self.fuzziness == 0 {
            return false;
        }
        let len = query.chars().count();
        let head: String = field.chars().take(len).collect();
        edit_distance(query, &head) <= self.fuzziness
    }
}

fn field_score(weight: f64, m: FieldMatch) -> f64 {
    let tail = if m.exact_tail { EXACT_TAIL_BONUS } else { 0.0 };
    weight + tail + 1.0 / (1.0 + m.position as f64)
}

fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for i in 1..=a.len() {
        curr[0] = i;
        for j in 1..=b.len() {
            let cost = if a[i - 1] == b[j - 1] { 0 } else { 1 };
            curr[j] = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}
