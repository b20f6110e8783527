//! Run context: the output directory layout and run-lifetime metadata

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tracing::info;

/// Owns where a run writes its artifacts. Created once at startup, passed
/// to every component that produces output, so no component reaches for
/// process-global paths.
#[derive(Debug, Clone)]
pub struct RunContext {
    root: PathBuf,
    started_at: DateTime<Utc>,
}

impl RunContext {
    /// Create the full directory layout under `root`. Existing directories
    /// are reused.
    pub fn init(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let ctx = Self {
            root,
            started_at: Utc::now(),
        };

        for dir in [
            ctx.data_dir(),
            ctx.products_dir(),
            ctx.logs_dir(),
            ctx.reports_dir(),
        ] {
            fs::create_dir_all(&dir)
                .with_context(|| format!("creating output directory {}", dir.display()))?;
        }

        info!("Output directories ready under {}", ctx.root.display());
        Ok(ctx)
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn data_dir(&self) -> PathBuf {
        self.root.join("data")
    }

    pub fn products_dir(&self) -> PathBuf {
        self.data_dir().join("products")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    pub fn reports_dir(&self) -> PathBuf {
        self.root.join("reports")
    }

    /// The listing snapshot document.
    pub fn products_document(&self) -> PathBuf {
        self.data_dir().join("filtered_products.json")
    }

    /// The per-product enrichment document for a given storage slug.
    pub fn detail_document(&self, slug: &str) -> PathBuf {
        self.products_dir().join(format!("{slug}.json"))
    }

    /// The tabular export derived from the products document.
    pub fn summary_csv(&self) -> PathBuf {
        self.reports_dir().join("summary.csv")
    }

    /// The raw rendered markup kept for diagnosis.
    pub fn rendered_markup(&self) -> PathBuf {
        self.logs_dir().join("rendered_page.html")
    }

    /// The screenshot written when the run aborts.
    pub fn screenshot(&self) -> PathBuf {
        self.logs_dir().join("error_screenshot.png")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_creates_the_full_layout() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = RunContext::init(dir.path()).unwrap();

        assert!(ctx.data_dir().is_dir());
        assert!(ctx.products_dir().is_dir());
        assert!(ctx.logs_dir().is_dir());
        assert!(ctx.reports_dir().is_dir());
        assert!(ctx.detail_document("some_product").starts_with(ctx.products_dir()));
    }
}
