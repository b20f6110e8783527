//! End-to-end runs against a scripted driver: the flow tolerates missing
//! optional controls, aborts cleanly on missing required ones, and the
//! review pagination cannot hang on a widget that never reports itself
//! exhausted.

use std::collections::HashSet;
use std::time::Duration;

use anyhow::{Result, bail};
use async_trait::async_trait;
use serde_json::{Value, json};

use shelf_scout::browser::{Target, UiDriver, WaitCondition};
use shelf_scout::config::{Pacing, RunConfig};
use shelf_scout::context::RunContext;
use shelf_scout::enrich::{self, CompiledDetail};
use shelf_scout::models::{FilterSpec, NA, ProductRecord};
use shelf_scout::pipeline::{self, RunStatus};
use shelf_scout::report;
use shelf_scout::site::SiteProfile;

/// Driver whose page is defined by a set of existing selectors and a fixed
/// markup string. Locating anything outside the set fails immediately.
struct ScriptedDriver {
    present: HashSet<String>,
    markup: String,
    navigations: Vec<String>,
    screenshots: usize,
}

impl ScriptedDriver {
    fn new(present: HashSet<String>, markup: impl Into<String>) -> Self {
        Self {
            present,
            markup: markup.into(),
            navigations: Vec::new(),
            screenshots: 0,
        }
    }

    fn has(&self, target: &Target) -> bool {
        self.present.contains(target.selector())
    }
}

#[async_trait]
impl UiDriver for ScriptedDriver {
    async fn navigate(&mut self, url: &str) -> Result<()> {
        self.navigations.push(url.to_string());
        Ok(())
    }

    async fn locate(
        &mut self,
        target: &Target,
        _condition: WaitCondition,
        _timeout: Duration,
    ) -> Result<()> {
        if self.has(target) {
            Ok(())
        } else {
            bail!("no such element: {target}")
        }
    }

    async fn click(&mut self, target: &Target) -> Result<()> {
        if self.has(target) {
            Ok(())
        } else {
            bail!("no such element: {target}")
        }
    }

    async fn forced_click(&mut self, target: &Target) -> Result<()> {
        if self.has(target) {
            Ok(())
        } else {
            bail!("no such element: {target}")
        }
    }

    async fn clear_and_type(&mut self, target: &Target, _text: &str) -> Result<()> {
        if self.has(target) {
            Ok(())
        } else {
            bail!("no such element: {target}")
        }
    }

    async fn attribute(&mut self, target: &Target, _name: &str) -> Result<Option<String>> {
        if self.has(target) {
            Ok(Some(String::new()))
        } else {
            bail!("no such element: {target}")
        }
    }

    async fn execute(&mut self, script: &str) -> Result<Value> {
        if script.contains("querySelectorAll") {
            Ok(json!(3))
        } else if script.contains("return document.body.scrollHeight") {
            Ok(json!(4200))
        } else {
            Ok(Value::Null)
        }
    }

    async fn page_source(&mut self) -> Result<String> {
        Ok(self.markup.clone())
    }

    async fn screenshot(&mut self) -> Result<Vec<u8>> {
        self.screenshots += 1;
        Ok(vec![0x89, b'P', b'N', b'G'])
    }
}

fn test_config() -> RunConfig {
    RunConfig {
        query: "laptop".to_string(),
        category: "Windows laptops".to_string(),
        filters: FilterSpec {
            price_brackets: vec![
                "$500_-_$749.99".to_string(),
                "$750_-_$999.99".to_string(),
                "$1000_-_$1249.99".to_string(),
            ],
            brands: vec![
                "Apple".to_string(),
                "Lenovo".to_string(),
                "HP".to_string(),
            ],
            min_rating: 4,
        },
        headless: true,
        webdriver_url: "http://localhost:9515".to_string(),
        output_root: ".".into(),
        enrich_details: false,
        pacing: Pacing::instant(),
    }
}

/// Every control of the flow, including the optional ones.
fn full_present(site: &SiteProfile, config: &RunConfig) -> HashSet<String> {
    let mut present = HashSet::new();
    present.insert(site.flow.splash_dismiss.clone());
    present.insert(site.flow.search_input.clone());
    present.insert(site.flow.search_submit.clone());
    present.insert(site.category_chip(&config.category));
    present.insert(site.flow.brand_expand.clone());
    present.insert(site.flow.modal_header.clone());
    present.insert(site.flow.modal_close.clone());
    present.insert(site.rating_floor(config.filters.min_rating));
    for bracket in &config.filters.price_brackets {
        present.insert(bracket.clone());
    }
    for brand in &config.filters.brands {
        present.insert(brand.clone());
    }
    present
}

fn card(name: &str, price: Option<&str>, href: &str) -> String {
    let price_div = price.map_or(String::new(), |p| {
        format!("<div data-testid=\"medium-customer-price\">{p}</div>")
    });
    format!(
        r#"<li class="product-list-item">
            <h2 class="product-title">{name}</h2>
            {price_div}
            <div class="c-ratings-reviews"><span class="visually-hidden">4.7 out of 5 stars</span></div>
            <span class="c-reviews">(87)</span>
            <a class="product-list-item-link" href="{href}">{name}</a>
            <div class="product-attributes">
                <div class="attribute">Model: <span class="value">M-{name}</span></div>
                <div class="attribute">SKU: <span class="value">1234</span></div>
            </div>
        </li>"#
    )
}

fn listing_markup() -> String {
    format!(
        "<ul>{}{}{}</ul>",
        card("Aspire 5", Some("$549.99"), "/site/aspire-5"),
        card("Inspiron 15", Some("$649.99"), "/site/inspiron-15"),
        card("Pavilion 14", None, "/site/pavilion-14"),
    )
}

#[tokio::test]
async fn full_flow_extracts_every_card_with_field_level_degradation() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = RunContext::init(dir.path()).unwrap();
    let config = test_config();
    let site = SiteProfile::bestbuy();
    let mut driver = ScriptedDriver::new(full_present(&site, &config), listing_markup());

    let status = pipeline::run(&mut driver, &site, &config, &ctx).await.unwrap();
    assert_eq!(
        status,
        RunStatus::Completed {
            products: 3,
            enriched: 0
        }
    );

    let records = report::read_products(&ctx.products_document()).unwrap();
    assert_eq!(records.len(), 3);

    let third = &records[2];
    assert_eq!(third.price, "N/A");
    assert_eq!(third.name, "Pavilion 14");
    assert_eq!(third.link, "https://www.bestbuy.com/site/pavilion-14");
    assert_eq!(third.rating, "4.7 out of 5 stars");
    assert_eq!(third.review_count, "87");
    assert_eq!(third.sku, "1234");

    assert!(ctx.summary_csv().exists());
    assert!(ctx.rendered_markup().exists());
    assert!(!ctx.screenshot().exists());
}

#[tokio::test]
async fn missing_splash_control_is_skipped_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = RunContext::init(dir.path()).unwrap();
    let config = test_config();
    let site = SiteProfile::bestbuy();

    let mut present = full_present(&site, &config);
    present.remove(&site.flow.splash_dismiss);
    let mut driver = ScriptedDriver::new(present, listing_markup());

    let status = pipeline::run(&mut driver, &site, &config, &ctx).await.unwrap();
    assert_eq!(
        status,
        RunStatus::Completed {
            products: 3,
            enriched: 0
        }
    );
    assert!(ctx.products_document().exists());
}

#[tokio::test]
async fn missing_search_box_aborts_with_screenshot_and_no_output() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = RunContext::init(dir.path()).unwrap();
    let config = test_config();
    let site = SiteProfile::bestbuy();

    let mut present = full_present(&site, &config);
    present.remove(&site.flow.search_input);
    let mut driver = ScriptedDriver::new(present, listing_markup());

    let status = pipeline::run(&mut driver, &site, &config, &ctx).await.unwrap();
    assert_eq!(status, RunStatus::Aborted);

    assert_eq!(driver.screenshots, 1);
    assert!(ctx.screenshot().exists());
    assert!(!ctx.products_document().exists());
    assert!(!ctx.summary_csv().exists());
}

/// Review widget that always has an enabled "next" control: every page
/// turn succeeds and serves one more review, forever.
struct EndlessReviewDriver {
    next_clicks: u32,
}

#[async_trait]
impl UiDriver for EndlessReviewDriver {
    async fn navigate(&mut self, _url: &str) -> Result<()> {
        Ok(())
    }

    async fn locate(
        &mut self,
        _target: &Target,
        _condition: WaitCondition,
        _timeout: Duration,
    ) -> Result<()> {
        Ok(())
    }

    async fn click(&mut self, _target: &Target) -> Result<()> {
        Ok(())
    }

    async fn forced_click(&mut self, _target: &Target) -> Result<()> {
        self.next_clicks += 1;
        Ok(())
    }

    async fn clear_and_type(&mut self, _target: &Target, _text: &str) -> Result<()> {
        Ok(())
    }

    async fn attribute(&mut self, _target: &Target, _name: &str) -> Result<Option<String>> {
        Ok(Some("pagination-button".to_string()))
    }

    async fn execute(&mut self, _script: &str) -> Result<Value> {
        Ok(Value::Null)
    }

    async fn page_source(&mut self) -> Result<String> {
        Ok(r#"
            <div class="review-item">
                <span class="c-review-average">5</span>
                <h4 class="review-title">Still scrolling</h4>
                <p class="pre-white-space">Another page of praise.</p>
            </div>
        "#
        .to_string())
    }

    async fn screenshot(&mut self) -> Result<Vec<u8>> {
        Ok(Vec::new())
    }
}

fn linked_record() -> ProductRecord {
    ProductRecord {
        name: "Aspire 5".to_string(),
        link: "https://www.bestbuy.com/site/aspire-5".to_string(),
        price: "$549.99".to_string(),
        rating: "4.7 out of 5 stars".to_string(),
        review_count: "87".to_string(),
        sku: "1234".to_string(),
        model: "M-Aspire 5".to_string(),
    }
}

#[tokio::test]
async fn review_pagination_terminates_without_a_disabled_marker() {
    let site = SiteProfile::bestbuy();
    let detail = CompiledDetail::compile(&site.detail).unwrap();
    let mut driver = EndlessReviewDriver { next_clicks: 0 };

    let record = linked_record();
    let enriched = enrich::enrich(&mut driver, &detail, &record, &Pacing::instant())
        .await
        .unwrap();

    assert_eq!(enriched.reviews.len(), 50);
    assert_eq!(driver.next_clicks, 49);
}

#[tokio::test]
async fn unresolved_link_enriches_empty_without_navigating() {
    let site = SiteProfile::bestbuy();
    let detail = CompiledDetail::compile(&site.detail).unwrap();
    let mut driver = ScriptedDriver::new(HashSet::new(), "");

    let mut record = linked_record();
    record.link = NA.to_string();

    let enriched = enrich::enrich(&mut driver, &detail, &record, &Pacing::instant())
        .await
        .unwrap();

    assert!(enriched.specifications.is_empty());
    assert!(enriched.reviews.is_empty());
    assert_eq!(enriched.basic_info, record);
    assert!(driver.navigations.is_empty());
}
