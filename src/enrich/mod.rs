//! Detail-page enrichment: specifications and paginated reviews
//!
//! Enrichment is best effort at the granularity of one product: a record
//! whose link never resolved is returned empty without touching the
//! browser, and a detail page that fails to load abandons that product
//! only, never the run.

use std::collections::BTreeMap;
use std::sync::LazyLock;
use std::time::Duration;

use anyhow::{Result, anyhow};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tokio::time::sleep;
use tracing::{info, warn};

use crate::browser::{Target, UiDriver};
use crate::config::Pacing;
use crate::models::{DetailRecord, NA, ProductRecord, Review};
use crate::site::DetailSelectors;

/// Upper bound on review pages read per product. The natural stop is the
/// "next" control going absent or disabled, but the disabled marker is not
/// guaranteed by the page, so the loop is capped.
const MAX_REVIEW_PAGES: u32 = 50;

/// Maximum length of a storage slug.
const SLUG_MAX_LEN: usize = 100;

static NON_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w-]+").expect("fixed slug pattern"));

/// The detail-page selectors parsed once.
pub struct CompiledDetail {
    spec_row: Selector,
    spec_label: Selector,
    spec_value: Selector,
    review_item: Selector,
    review_title: Selector,
    review_rating: Selector,
    review_body: Selector,
    /// Kept as raw text: the "next" control is driven through the browser,
    /// not the parser
    review_next: String,
}

impl CompiledDetail {
    pub fn compile(selectors: &DetailSelectors) -> Result<Self> {
        Ok(Self {
            spec_row: parse(&selectors.spec_row)?,
            spec_label: parse(&selectors.spec_label)?,
            spec_value: parse(&selectors.spec_value)?,
            review_item: parse(&selectors.review_item)?,
            review_title: parse(&selectors.review_title)?,
            review_rating: parse(&selectors.review_rating)?,
            review_body: parse(&selectors.review_body)?,
            review_next: selectors.review_next.clone(),
        })
    }
}

fn parse(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| anyhow!("failed to parse selector {selector:?}: {e:?}"))
}

/// Visit a product's detail page and collect its specification table and
/// reviews. A record with an unresolved link comes back with empty
/// collections, no navigation attempted.
pub async fn enrich<D: UiDriver>(
    driver: &mut D,
    detail: &CompiledDetail,
    record: &ProductRecord,
    pacing: &Pacing,
) -> Result<DetailRecord> {
    if record.link == NA {
        return Ok(DetailRecord {
            basic_info: record.clone(),
            specifications: BTreeMap::new(),
            reviews: Vec::new(),
        });
    }

    driver.navigate(&record.link).await?;
    sleep(pacing.detail_settle).await;
    let markup = driver.page_source().await?;

    let specifications = extract_specifications(&markup, detail);
    let reviews = collect_reviews(driver, detail, &markup, pacing).await;
    info!(
        "Captured {} specifications and {} reviews for {}",
        specifications.len(),
        reviews.len(),
        record.name
    );

    Ok(DetailRecord {
        basic_info: record.clone(),
        specifications,
        reviews,
    })
}

/// Read reviews from the current page, then keep turning the review
/// widget's pages until the "next" control is absent, reports itself
/// disabled, or the page cap is hit.
async fn collect_reviews<D: UiDriver>(
    driver: &mut D,
    detail: &CompiledDetail,
    first_page: &str,
    pacing: &Pacing,
) -> Vec<Review> {
    let mut reviews = extract_reviews(first_page, detail);
    let next = Target::css(&detail.review_next);

    for _ in 1..MAX_REVIEW_PAGES {
        let class = match driver.attribute(&next, "class").await {
            Ok(Some(class)) => class,
            Ok(None) | Err(_) => break,
        };
        if class.contains("disabled") {
            break;
        }
        if driver.forced_click(&next).await.is_err() {
            break;
        }
        sleep(pacing.review_settle).await;

        match driver.page_source().await {
            Ok(markup) => reviews.extend(extract_reviews(&markup, detail)),
            Err(e) => {
                warn!("Lost the review page mid-pagination: {e:#}");
                break;
            }
        }
    }

    reviews
}

fn extract_specifications(markup: &str, detail: &CompiledDetail) -> BTreeMap<String, String> {
    let document = Html::parse_document(markup);

    let mut specifications = BTreeMap::new();
    for row in document.select(&detail.spec_row) {
        // A row missing either half is dropped, not inserted with a blank.
        if let Some(label) = row.select(&detail.spec_label).next()
            && let Some(value) = row.select(&detail.spec_value).next()
        {
            specifications.insert(trimmed_text(label), trimmed_text(value));
        }
    }
    specifications
}

fn extract_reviews(markup: &str, detail: &CompiledDetail) -> Vec<Review> {
    let document = Html::parse_document(markup);

    document
        .select(&detail.review_item)
        .filter_map(|item| {
            let title = item.select(&detail.review_title).next().map(trimmed_text)?;
            let rating = item.select(&detail.review_rating).next().map(trimmed_text)?;
            let body = item.select(&detail.review_body).next().map(trimmed_text)?;
            Some(Review {
                title,
                rating,
                body,
            })
        })
        .collect()
}

fn trimmed_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Derive the filesystem-safe storage key for a product name: runs of
/// non-word characters collapse to a single underscore, truncated to a
/// fixed length. Two distinct names can collide; the report writer warns
/// and the last write wins.
pub fn slug(name: &str) -> String {
    NON_WORD
        .replace_all(name, "_")
        .chars()
        .take(SLUG_MAX_LEN)
        .collect()
}

/// Pacing between detail-page visits: a base delay plus a small cycling
/// increment, a politeness measure rather than a correctness one.
pub fn backoff_delay(index: usize) -> Duration {
    Duration::from_secs(2 + (index as u64) % 3)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::site::SiteProfile;

    fn compiled() -> CompiledDetail {
        CompiledDetail::compile(&SiteProfile::bestbuy().detail).unwrap()
    }

    #[test]
    fn slug_collapses_runs_and_truncates() {
        assert_eq!(slug("HP Spectre x360 14\" (2-in-1)"), "HP_Spectre_x360_14_2-in-1_");
        assert_eq!(slug("Déjà vu"), "Déjà_vu");

        let long = "a".repeat(300);
        assert_eq!(slug(&long).chars().count(), 100);
    }

    #[test]
    fn backoff_cycles_over_base_plus_modulo() {
        let seconds: Vec<u64> = (0..6).map(|i| backoff_delay(i).as_secs()).collect();
        assert_eq!(seconds, vec![2, 3, 4, 2, 3, 4]);
    }

    #[test]
    fn specification_rows_missing_either_half_are_dropped() {
        let markup = r#"
            <div class="row"><div class="row-title">Brand</div><div class="row-value">Dell</div></div>
            <div class="row"><div class="row-title">Orphan label</div></div>
            <div class="row"><div class="row-value">Orphan value</div></div>
        "#;

        let specs = extract_specifications(markup, &compiled());
        assert_eq!(specs.len(), 1);
        assert_eq!(specs.get("Brand").map(String::as_str), Some("Dell"));
    }

    #[test]
    fn reviews_missing_any_part_are_dropped() {
        let markup = r#"
            <div class="review-item">
                <span class="c-review-average">5</span>
                <h4 class="review-title">Great laptop</h4>
                <p class="pre-white-space">Fast and quiet.</p>
            </div>
            <div class="review-item">
                <span class="c-review-average">1</span>
                <p class="pre-white-space">No title on this one.</p>
            </div>
        "#;

        let reviews = extract_reviews(markup, &compiled());
        assert_eq!(reviews.len(), 1);
        assert_eq!(reviews[0].title, "Great laptop");
        assert_eq!(reviews[0].rating, "5");
        assert_eq!(reviews[0].body, "Fast and quiet.");
    }
}
