//! Data models for captured product listings and detail-page enrichment

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Placeholder value substituted when a listing field cannot be resolved.
pub const NA: &str = "N/A";

/// Placeholder for a missing review count.
pub const NO_REVIEWS: &str = "0";

/// One product card from a rendered listing page.
///
/// Every field is always populated: either the text the page carried or the
/// placeholder value. Extraction of one field never disturbs the others.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub name: String,
    pub link: String,
    pub price: String,
    pub rating: String,
    #[serde(rename = "reviews")]
    pub review_count: String,
    pub sku: String,
    pub model: String,
}

/// One customer review from a product detail page.
///
/// Reviews carry no placeholders: an item missing any of the three parts is
/// dropped during extraction rather than recorded with holes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub title: String,
    pub rating: String,
    pub body: String,
}

/// A product record joined with everything captured from its detail page.
///
/// Both collections may legitimately be empty; a detail page without a
/// specification table or review section is not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailRecord {
    pub basic_info: ProductRecord,
    pub specifications: BTreeMap<String, String>,
    pub reviews: Vec<Review>,
}

/// The filters applied to the listing, in the order the site's UI needs
/// them: price brackets first, then brands, then the rating floor. Brand
/// options hide behind an expansion control that only appears once the
/// price facets have rendered.
#[derive(Debug, Clone)]
pub struct FilterSpec {
    pub price_brackets: Vec<String>,
    pub brands: Vec<String>,
    pub min_rating: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_record_serializes_review_count_under_reviews_key() {
        let record = ProductRecord {
            name: "Inspiron 15".to_string(),
            link: "https://www.bestbuy.com/site/inspiron-15".to_string(),
            price: "$649.99".to_string(),
            rating: "4.5 out of 5 stars".to_string(),
            review_count: "1,024".to_string(),
            sku: "6537363".to_string(),
            model: "I3530".to_string(),
        };

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["reviews"], "1,024");
        assert!(value.get("review_count").is_none());

        let back: ProductRecord = serde_json::from_value(value).unwrap();
        assert_eq!(back, record);
    }
}
