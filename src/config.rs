//! Run configuration from environment variables with compiled defaults

use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

use crate::models::FilterSpec;

/// Everything a run needs, fixed before the browser launches. Nothing here
/// is reconfigurable mid-run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Text typed into the site's search box
    pub query: String,
    /// Label of the category chip narrowing the results
    pub category: String,
    /// Filters applied to the listing
    pub filters: FilterSpec,
    /// Run the browser without a visible window
    pub headless: bool,
    /// WebDriver endpoint the browser session is created against
    pub webdriver_url: String,
    /// Root directory for the data/logs/reports layout
    pub output_root: PathBuf,
    /// Visit each product's detail page after capturing the listing
    pub enrich_details: bool,
    /// Fixed delays between pipeline phases
    pub pacing: Pacing,
}

impl RunConfig {
    /// Build the configuration from the environment. Every variable has a
    /// default, so an empty environment yields a usable run.
    pub fn from_env() -> Self {
        Self {
            query: env_or("SEARCH_QUERY", "laptop"),
            category: env_or("CATEGORY_CHIP", "Windows laptops"),
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
            headless: env_flag("HEADLESS", true),
            webdriver_url: env_or("WEBDRIVER_URL", "http://localhost:9515"),
            output_root: PathBuf::from(env_or("OUTPUT_ROOT", ".")),
            enrich_details: env_flag("ENRICH_DETAILS", false),
            pacing: Pacing::default(),
        }
    }
}

/// The fixed settle delays inserted between actions. The listing re-renders
/// asynchronously after every filter toggle with no completion signal, so
/// these are unconditional waits rather than condition waits, except for the
/// post-filter stabilization which prefers a card-count probe (see the
/// sequencer) and only falls back to `stabilize_fallback`.
#[derive(Debug, Clone)]
pub struct Pacing {
    /// After submitting the search
    pub post_search: Duration,
    /// After narrowing by category chip
    pub post_category: Duration,
    /// After toggling each price or brand checkbox
    pub per_filter: Duration,
    /// After expanding the brand facet
    pub post_expand: Duration,
    /// After applying the rating floor
    pub post_rating: Duration,
    /// Interval between card-count stability probes
    pub stabilize_poll: Duration,
    /// Give up waiting for a stable card count after this long
    pub stabilize_deadline: Duration,
    /// Unconditional wait used when the card count cannot be probed
    pub stabilize_fallback: Duration,
    /// After each scroll-to-bottom, before re-reading the page height
    pub scroll_settle: Duration,
    /// After navigating to a product detail page
    pub detail_settle: Duration,
    /// After turning a review page
    pub review_settle: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            post_search: Duration::from_secs(3),
            post_category: Duration::from_secs(4),
            per_filter: Duration::from_secs(1),
            post_expand: Duration::from_secs(2),
            post_rating: Duration::from_secs(1),
            stabilize_poll: Duration::from_secs(1),
            stabilize_deadline: Duration::from_secs(15),
            stabilize_fallback: Duration::from_secs(10),
            scroll_settle: Duration::from_secs(2),
            detail_settle: Duration::from_secs(2),
            review_settle: Duration::from_secs(2),
        }
    }
}

impl Pacing {
    /// All-zero pacing. Only useful against a scripted driver where there
    /// is no rendering to wait for.
    pub fn instant() -> Self {
        Self {
            post_search: Duration::ZERO,
            post_category: Duration::ZERO,
            per_filter: Duration::ZERO,
            post_expand: Duration::ZERO,
            post_rating: Duration::ZERO,
            stabilize_poll: Duration::ZERO,
            stabilize_deadline: Duration::ZERO,
            stabilize_fallback: Duration::ZERO,
            scroll_settle: Duration::ZERO,
            detail_settle: Duration::ZERO,
            review_settle: Duration::ZERO,
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_flag(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(value) => match value.to_lowercase().as_str() {
            "1" | "true" | "yes" => true,
            "0" | "false" | "no" => false,
            other => {
                warn!("Unrecognized value {other:?} for {key}, using default");
                default
            }
        },
        Err(_) => default,
    }
}
