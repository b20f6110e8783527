//! Report writing: the JSON documents, the tabular export, and the
//! diagnostic artifacts

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::{info, warn};

use crate::context::RunContext;
use crate::models::{DetailRecord, ProductRecord};

/// Column order of the tabular export, matching the products document.
const SUMMARY_COLUMNS: [&str; 7] = ["name", "link", "price", "rating", "reviews", "sku", "model"];

/// Write the listing snapshot document.
pub fn write_products(ctx: &RunContext, records: &[ProductRecord]) -> Result<PathBuf> {
    let path = ctx.products_document();
    let json = serde_json::to_string_pretty(records).context("serializing product records")?;
    fs::write(&path, json)
        .with_context(|| format!("writing products document {}", path.display()))?;

    info!("{} products saved to {}", records.len(), path.display());
    Ok(path)
}

/// Read a previously written products document back.
pub fn read_products(path: &Path) -> Result<Vec<ProductRecord>> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("reading products document {}", path.display()))?;
    serde_json::from_str(&json)
        .with_context(|| format!("parsing products document {}", path.display()))
}

/// Write one enriched product, keyed by its storage slug. A collision
/// between two product names overwrites; the warning is the only trace.
pub fn write_detail(ctx: &RunContext, slug: &str, detail: &DetailRecord) -> Result<PathBuf> {
    let path = ctx.detail_document(slug);
    if path.exists() {
        warn!("Overwriting existing detail document {}", path.display());
    }

    let json = serde_json::to_string_pretty(detail).context("serializing detail record")?;
    fs::write(&path, json)
        .with_context(|| format!("writing detail document {}", path.display()))?;

    info!("Saved {}", path.display());
    Ok(path)
}

/// Flatten the products document into the tabular export. Works from the
/// raw document rather than typed records so a field absent from some
/// record becomes an empty cell instead of a failure.
pub fn write_summary_csv(ctx: &RunContext) -> Result<PathBuf> {
    let document = fs::read_to_string(ctx.products_document())
        .with_context(|| format!("reading {}", ctx.products_document().display()))?;
    let records: Vec<Value> =
        serde_json::from_str(&document).context("parsing the products document")?;

    let path = ctx.summary_csv();
    let mut writer = csv::Writer::from_path(&path)
        .with_context(|| format!("creating summary export {}", path.display()))?;

    writer
        .write_record(SUMMARY_COLUMNS)
        .context("writing summary header")?;
    for record in &records {
        let row: Vec<&str> = SUMMARY_COLUMNS
            .iter()
            .map(|column| record.get(column).and_then(Value::as_str).unwrap_or(""))
            .collect();
        writer.write_record(&row).context("writing summary row")?;
    }
    writer.flush().context("flushing summary export")?;

    info!("Summary report generated at {}", path.display());
    Ok(path)
}

/// Keep the raw rendered markup for diagnosis, once per run.
pub fn write_rendered_markup(ctx: &RunContext, markup: &str) -> Result<PathBuf> {
    let path = ctx.rendered_markup();
    fs::write(&path, markup)
        .with_context(|| format!("writing rendered markup {}", path.display()))?;
    Ok(path)
}

/// Write the abort screenshot.
pub fn write_screenshot(ctx: &RunContext, png: &[u8]) -> Result<PathBuf> {
    let path = ctx.screenshot();
    fs::write(&path, png).with_context(|| format!("writing screenshot {}", path.display()))?;

    info!("Diagnostic screenshot saved to {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NA;
    use std::collections::BTreeMap;

    fn record(name: &str, price: &str) -> ProductRecord {
        ProductRecord {
            name: name.to_string(),
            link: format!("https://www.bestbuy.com/site/{name}"),
            price: price.to_string(),
            rating: "4.5 out of 5 stars".to_string(),
            review_count: "12".to_string(),
            sku: NA.to_string(),
            model: NA.to_string(),
        }
    }

    #[test]
    fn products_document_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = RunContext::init(dir.path()).unwrap();
        let records = vec![record("aspire-5", "$549.99"), record("inspiron-15", "$649.99")];

        let path = write_products(&ctx, &records).unwrap();
        let back = read_products(&path).unwrap();
        assert_eq!(back, records);
    }

    #[test]
    fn summary_export_fills_missing_fields_with_empty_cells() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = RunContext::init(dir.path()).unwrap();

        // A document produced elsewhere may lack fields entirely.
        fs::write(
            ctx.products_document(),
            r#"[{"name": "Aspire 5", "price": "$549.99"}]"#,
        )
        .unwrap();

        let path = write_summary_csv(&ctx).unwrap();
        let csv = fs::read_to_string(path).unwrap();
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("name,link,price,rating,reviews,sku,model"));
        assert_eq!(lines.next(), Some("Aspire 5,,$549.99,,,,"));
    }

    #[test]
    fn detail_collision_overwrites_last_write_wins() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = RunContext::init(dir.path()).unwrap();

        let first = DetailRecord {
            basic_info: record("aspire-5", "$549.99"),
            specifications: BTreeMap::new(),
            reviews: Vec::new(),
        };
        let mut second = first.clone();
        second.basic_info.price = "$499.99".to_string();

        write_detail(&ctx, "same_slug", &first).unwrap();
        write_detail(&ctx, "same_slug", &second).unwrap();

        let json = fs::read_to_string(ctx.detail_document("same_slug")).unwrap();
        let stored: DetailRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(stored, second);
    }
}
