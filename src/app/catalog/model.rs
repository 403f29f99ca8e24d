//! 商品目录数据模型

use serde::{Deserialize, Serialize};

/// 商品记录，价格以分为单位
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "database", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub title: String,
    pub price: i64,
    pub category: String,
    pub image: String,
    pub rating_rate: f64,
    pub rating_count: i64,
}

impl Product {
    /// 以 `$D.CC` 格式显示价格
    pub fn display_price(&self) -> String {
        let sign = if self.price < 0 { "-" } else { "" };
        let cents = self.price.unsigned_abs();
        format!("{}${}.{:02}", sign, cents / 100, cents % 100)
    }
}

/// 分类，由商品的 `category` 字段推导
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
}

/// 首屏渲染数据
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorefrontPage {
    pub products: Vec<Product>,
    pub categories: Vec<Category>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoriesResponse {
    pub categories: Vec<Category>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(price: i64) -> Product {
        Product {
            id: "1".to_string(),
            title: "Men's Shirt".to_string(),
            price,
            category: "men".to_string(),
            image: "https://example.com/shirt.png".to_string(),
            rating_rate: 4.5,
            rating_count: 120,
        }
    }

    #[test]
    fn test_display_price() {
        assert_eq!(product(2500).display_price(), "$25.00");
        assert_eq!(product(1999).display_price(), "$19.99");
        assert_eq!(product(5).display_price(), "$0.05");
        assert_eq!(product(-150).display_price(), "-$1.50");
    }

    #[test]
    fn test_product_json_uses_camel_case() {
        let json = serde_json::to_value(product(2500)).unwrap();
        assert_eq!(json["ratingRate"], 4.5);
        assert_eq!(json["ratingCount"], 120);
        assert!(json.get("rating_rate").is_none());
    }

    #[test]
    fn test_category_count_is_optional() {
        let json = serde_json::to_string(&Category {
            name: "men".to_string(),
            count: None,
        })
        .unwrap();
        assert_eq!(json, r#"{"name":"men"}"#);

        let parsed: Category = serde_json::from_str(r#"{"name":"women","count":3}"#).unwrap();
        assert_eq!(parsed.count, Some(3));
    }
}
