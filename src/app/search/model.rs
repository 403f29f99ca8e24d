//! 搜索请求与响应模型

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::app::catalog::model::Product;
use crate::core::error::CoreError;

/// 线上格式：`{ query: string, category?: string|false }`
#[derive(Debug, Deserialize)]
struct RawSearchRequest {
    #[serde(default)]
    query: Option<String>,
    #[serde(default)]
    category: Option<CategoryField>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CategoryField {
    Name(String),
    Flag(bool),
}

/// 解码并校验后的搜索请求
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct SearchQuery {
    #[validate(length(max = 200, message = "query must be at most 200 characters"))]
    pub query: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 100, message = "category must be 1 to 100 characters"))]
    pub category: Option<String>,
}

impl SearchQuery {
    pub fn new(query: impl Into<String>, category: Option<String>) -> Self {
        Self {
            query: query.into(),
            category: category.filter(|c| !c.is_empty()),
        }
    }

    /// 在边界处解码请求体，不依赖 Content-Type
    ///
    /// 缺省或 null 的 `query` 视为空串；`category` 为 false、null、缺省或空串时不过滤
    pub fn decode(body: &[u8]) -> Result<Self, CoreError> {
        let value: serde_json::Value = serde_json::from_slice(body)
            .map_err(|e| CoreError::BadRequest(format!("malformed search request: {e}")))?;
        if !value.is_object() {
            return Err(CoreError::BadRequest(
                "search request must be a JSON object".to_string(),
            ));
        }
        let raw: RawSearchRequest = serde_json::from_value(value)
            .map_err(|e| CoreError::BadRequest(format!("malformed search request: {e}")))?;

        let category = match raw.category {
            None | Some(CategoryField::Flag(false)) => None,
            Some(CategoryField::Flag(true)) => {
                return Err(CoreError::BadRequest(
                    "category must be a string or false".to_string(),
                ))
            }
            Some(CategoryField::Name(name)) => Some(name),
        };

        let query = Self::new(raw.query.unwrap_or_default(), category);
        query.validate()?;
        Ok(query)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub products: Vec<Product>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(body: &str) -> Result<SearchQuery, CoreError> {
        SearchQuery::decode(body.as_bytes())
    }

    #[test]
    fn test_decode_full_request() {
        let q = decode(r#"{"query":"shirt","category":"men"}"#).unwrap();
        assert_eq!(q, SearchQuery::new("shirt", Some("men".to_string())));
    }

    #[test]
    fn test_absent_or_false_category_means_no_filter() {
        for body in [
            r#"{"query":"shirt"}"#,
            r#"{"query":"shirt","category":false}"#,
            r#"{"query":"shirt","category":null}"#,
            r#"{"query":"shirt","category":""}"#,
        ] {
            assert_eq!(decode(body).unwrap().category, None, "body: {body}");
        }
    }

    #[test]
    fn test_missing_query_is_empty() {
        let q = decode(r#"{"category":"electronics"}"#).unwrap();
        assert_eq!(q.query, "");
        assert_eq!(q.category.as_deref(), Some("electronics"));
    }

    #[test]
    fn test_malformed_bodies_are_rejected() {
        for body in [
            "",
            "not json",
            r#"["shirt"]"#,
            r#"{"query":42}"#,
            r#"{"query":"shirt","category":true}"#,
            r#"{"query":"shirt","category":7}"#,
        ] {
            assert!(
                matches!(decode(body), Err(CoreError::BadRequest(_))),
                "body should be rejected: {body}"
            );
        }
    }

    #[test]
    fn test_overlong_query_fails_validation() {
        let body = serde_json::json!({ "query": "a".repeat(201) }).to_string();
        assert!(matches!(decode(&body), Err(CoreError::BadRequest(_))));

        let body = serde_json::json!({ "query": "a".repeat(200) }).to_string();
        assert!(decode(&body).is_ok());
    }

    #[test]
    fn test_outbound_shape_omits_missing_category() {
        let json = serde_json::to_string(&SearchQuery::new("sho", None)).unwrap();
        assert_eq!(json, r#"{"query":"sho"}"#);
    }
}
