//! Listing page extraction: rendered markup in, product records out

use anyhow::{Result, anyhow};
use scraper::{ElementRef, Html, Selector};
use tracing::info;

use crate::models::{NA, NO_REVIEWS, ProductRecord};
use crate::site::ListingSelectors;

/// The listing selectors parsed once, plus the origin used to absolutize
/// relative product links.
pub struct CompiledListing {
    origin: String,
    card: Selector,
    title: Selector,
    price: Selector,
    rating: Selector,
    review_count: Selector,
    link: Selector,
    attribute_row: Selector,
    attribute_value: Selector,
}

impl CompiledListing {
    pub fn compile(selectors: &ListingSelectors, origin: &str) -> Result<Self> {
        Ok(Self {
            origin: origin.to_string(),
            card: parse(&selectors.card)?,
            title: parse(&selectors.title)?,
            price: parse(&selectors.price)?,
            rating: parse(&selectors.rating)?,
            review_count: parse(&selectors.review_count)?,
            link: parse(&selectors.link)?,
            attribute_row: parse(&selectors.attribute_row)?,
            attribute_value: parse(&selectors.attribute_value)?,
        })
    }
}

fn parse(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| anyhow!("failed to parse selector {selector:?}: {e:?}"))
}

/// Parse a rendered listing page into product records, one per card in
/// document order. Each field resolves independently; a missing
/// sub-element degrades that one field to its placeholder, never the
/// record and never the page. Duplicate cards yield duplicate records.
pub fn extract(markup: &str, listing: &CompiledListing) -> Vec<ProductRecord> {
    let document = Html::parse_document(markup);

    let mut records = Vec::new();
    for card in document.select(&listing.card) {
        records.push(extract_card(card, listing));
    }

    info!("Found {} product cards", records.len());
    records
}

fn extract_card(card: ElementRef<'_>, listing: &CompiledListing) -> ProductRecord {
    let name = field_text(card, &listing.title).unwrap_or_else(|| NA.to_string());
    let price = field_text(card, &listing.price).unwrap_or_else(|| NA.to_string());
    let rating = field_text(card, &listing.rating).unwrap_or_else(|| NA.to_string());

    let review_count = field_text(card, &listing.review_count)
        .map(|text| text.trim_matches(|c| c == '(' || c == ')').to_string())
        .unwrap_or_else(|| NO_REVIEWS.to_string());

    let link = card
        .select(&listing.link)
        .next()
        .and_then(|el| el.value().attr("href"))
        .map_or_else(
            || NA.to_string(),
            |href| {
                if href.starts_with("http") {
                    href.to_string()
                } else {
                    format!("{}{href}", listing.origin)
                }
            },
        );

    let mut model = NA.to_string();
    let mut sku = NA.to_string();
    for row in card.select(&listing.attribute_row) {
        let label = row.text().collect::<String>();
        if let Some(value_el) = row.select(&listing.attribute_value).next() {
            let value = value_el.text().collect::<String>().trim().to_string();
            if label.contains("Model:") {
                model = value;
            } else if label.contains("SKU:") {
                sku = value;
            }
        }
    }

    ProductRecord {
        name,
        link,
        price,
        rating,
        review_count,
        sku,
        model,
    }
}

fn field_text(card: ElementRef<'_>, selector: &Selector) -> Option<String> {
    card.select(selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
}
