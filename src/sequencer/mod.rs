//! The search-and-filter flow, step by step
//!
//! Retail UIs routinely omit a splash page, a category chip, or a "show
//! more" control depending on session state. Each step therefore declares
//! whether the run can survive without it: `Tolerate` steps log a warning
//! and are skipped, `Require` steps abort the run. One flaky selector must
//! not destroy a whole capture.

use std::time::Duration;

use anyhow::{Context, Result};
use tokio::time::{Instant, sleep};
use tracing::{error, info, warn};

use crate::browser::{Target, UiDriver, WaitCondition};
use crate::config::Pacing;
use crate::context::RunContext;
use crate::models::FilterSpec;
use crate::report;
use crate::site::SiteProfile;

/// Wait window for elements the flow depends on.
const DEFAULT_WAIT: Duration = Duration::from_secs(15);
/// Wait window for interstitials that may simply not appear.
const OPTIONAL_WAIT: Duration = Duration::from_secs(5);
/// Wait window for individual facet checkboxes.
const FILTER_WAIT: Duration = Duration::from_secs(2);

/// Upper bound on scroll-to-bottom rounds. The natural stop is a cycle
/// with no height growth; the cap guards against a page that keeps
/// reporting growth.
const MAX_SCROLL_ROUNDS: u32 = 50;

/// Whether a failed step aborts the run or is skipped with a warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepPolicy {
    Tolerate,
    Require,
}

/// What happened to an attempted step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Completed,
    Skipped,
}

/// The interaction performed once the step's element is located.
#[derive(Debug, Clone)]
enum StepAction {
    Click,
    ForcedClick,
    Type(String),
    /// Locate only; used when presence itself is the information
    Probe,
}

/// One locate-then-act unit of the flow. A step does not verify that its
/// DOM mutation took effect; a later step that depends on the result will
/// surface the miss.
struct ActionStep {
    name: String,
    target: Target,
    condition: WaitCondition,
    timeout: Duration,
    action: StepAction,
    policy: StepPolicy,
}

/// Terminal state of the flow.
#[derive(Debug)]
pub enum SequenceOutcome {
    /// The rendered listing markup, ready for extraction
    Captured(String),
    /// A required step failed; diagnostics written, downstream skipped
    Aborted,
}

/// Drives the site from its home page to a fully filtered, fully loaded
/// listing, then captures the markup.
pub struct Sequencer<'a, D: UiDriver> {
    driver: &'a mut D,
    site: &'a SiteProfile,
    filters: &'a FilterSpec,
    query: &'a str,
    category: &'a str,
    pacing: &'a Pacing,
}

impl<'a, D: UiDriver> Sequencer<'a, D> {
    pub fn new(
        driver: &'a mut D,
        site: &'a SiteProfile,
        filters: &'a FilterSpec,
        query: &'a str,
        category: &'a str,
        pacing: &'a Pacing,
    ) -> Self {
        Self {
            driver,
            site,
            filters,
            query,
            category,
            pacing,
        }
    }

    /// Run the flow to a terminal state. A required-step failure yields
    /// `Aborted` (with a diagnostic screenshot), not an error: the caller
    /// decides nothing, the run is simply over.
    pub async fn run(&mut self, ctx: &RunContext) -> Result<SequenceOutcome> {
        match self.drive().await {
            Ok(markup) => Ok(SequenceOutcome::Captured(markup)),
            Err(e) => {
                error!("Aborting run: {e:#}");
                match self.driver.screenshot().await {
                    Ok(png) => {
                        report::write_screenshot(ctx, &png)?;
                    }
                    Err(shot_err) => {
                        error!("Could not capture diagnostic screenshot: {shot_err:#}");
                    }
                }
                Ok(SequenceOutcome::Aborted)
            }
        }
    }

    async fn drive(&mut self) -> Result<String> {
        let flow = &self.site.flow;

        self.driver
            .navigate(&self.site.home_url)
            .await
            .context("opening the site home page")?;
        info!("Navigated to {}", self.site.name);

        self.attempt(&ActionStep {
            name: "dismiss-country-splash".to_string(),
            target: Target::css(&flow.splash_dismiss),
            condition: WaitCondition::Clickable,
            timeout: OPTIONAL_WAIT,
            action: StepAction::Click,
            policy: StepPolicy::Tolerate,
        })
        .await?;

        self.attempt(&ActionStep {
            name: "type-search-query".to_string(),
            target: Target::css(&flow.search_input),
            condition: WaitCondition::Present,
            timeout: DEFAULT_WAIT,
            action: StepAction::Type(self.query.to_string()),
            policy: StepPolicy::Require,
        })
        .await?;

        self.attempt(&ActionStep {
            name: "submit-search".to_string(),
            target: Target::css(&flow.search_submit),
            condition: WaitCondition::Clickable,
            timeout: DEFAULT_WAIT,
            action: StepAction::Click,
            policy: StepPolicy::Require,
        })
        .await?;
        info!("Search submitted: {}", self.query);
        sleep(self.pacing.post_search).await;

        self.attempt(&ActionStep {
            name: format!("narrow-category {}", self.category),
            target: Target::xpath(self.site.category_chip(self.category)),
            condition: WaitCondition::Clickable,
            timeout: DEFAULT_WAIT,
            action: StepAction::Click,
            policy: StepPolicy::Tolerate,
        })
        .await?;
        sleep(self.pacing.post_category).await;

        // One missing price bracket or unavailable brand must not block
        // the others.
        for bracket in &self.filters.price_brackets {
            self.attempt(&ActionStep {
                name: format!("price-filter {bracket}"),
                target: Target::id(bracket),
                condition: WaitCondition::Present,
                timeout: FILTER_WAIT,
                action: StepAction::ForcedClick,
                policy: StepPolicy::Tolerate,
            })
            .await?;
            sleep(self.pacing.per_filter).await;
        }

        self.attempt(&ActionStep {
            name: "expand-brand-list".to_string(),
            target: Target::css(&flow.brand_expand),
            condition: WaitCondition::Clickable,
            timeout: DEFAULT_WAIT,
            action: StepAction::ForcedClick,
            policy: StepPolicy::Tolerate,
        })
        .await?;
        sleep(self.pacing.post_expand).await;

        for brand in &self.filters.brands {
            self.attempt(&ActionStep {
                name: format!("brand-filter {brand}"),
                target: Target::id(brand),
                condition: WaitCondition::Present,
                timeout: FILTER_WAIT,
                action: StepAction::ForcedClick,
                policy: StepPolicy::Tolerate,
            })
            .await?;
            sleep(self.pacing.per_filter).await;
        }

        let modal_seen = self
            .attempt(&ActionStep {
                name: "probe-filter-modal".to_string(),
                target: Target::css(&flow.modal_header),
                condition: WaitCondition::Present,
                timeout: OPTIONAL_WAIT,
                action: StepAction::Probe,
                policy: StepPolicy::Tolerate,
            })
            .await?;
        if modal_seen == StepOutcome::Completed {
            self.attempt(&ActionStep {
                name: "close-filter-modal".to_string(),
                target: Target::css(&flow.modal_close),
                condition: WaitCondition::Present,
                timeout: FILTER_WAIT,
                action: StepAction::ForcedClick,
                policy: StepPolicy::Tolerate,
            })
            .await?;
        }

        self.attempt(&ActionStep {
            name: format!("apply-rating-floor {}", self.filters.min_rating),
            target: Target::xpath(self.site.rating_floor(self.filters.min_rating)),
            condition: WaitCondition::Present,
            timeout: DEFAULT_WAIT,
            action: StepAction::ForcedClick,
            policy: StepPolicy::Require,
        })
        .await?;
        sleep(self.pacing.post_rating).await;

        self.await_stabilization().await;
        self.scroll_to_exhaustion().await;

        self.driver
            .page_source()
            .await
            .context("capturing the rendered listing markup")
    }

    /// Locate then act, applying the step's policy to any failure.
    async fn attempt(&mut self, step: &ActionStep) -> Result<StepOutcome> {
        match self.try_step(step).await {
            Ok(()) => {
                info!("Completed step: {}", step.name);
                Ok(StepOutcome::Completed)
            }
            Err(e) => match step.policy {
                StepPolicy::Tolerate => {
                    warn!("Skipped step {}: {e:#}", step.name);
                    Ok(StepOutcome::Skipped)
                }
                StepPolicy::Require => {
                    Err(e.context(format!("required step {} failed", step.name)))
                }
            },
        }
    }

    async fn try_step(&mut self, step: &ActionStep) -> Result<()> {
        self.driver
            .locate(&step.target, step.condition, step.timeout)
            .await?;

        match &step.action {
            StepAction::Click => self.driver.click(&step.target).await,
            StepAction::ForcedClick => self.driver.forced_click(&step.target).await,
            StepAction::Type(text) => self.driver.clear_and_type(&step.target, text).await,
            StepAction::Probe => Ok(()),
        }
    }

    /// Wait for the listing to settle after the filter toggles. The page
    /// exposes no completion signal, so the card count is used as a proxy:
    /// two consecutive polls agreeing is taken as stable. The proxy can
    /// fire early if a re-render leaves the count unchanged; when the
    /// count cannot be probed at all, an unconditional delay is the
    /// fallback.
    async fn await_stabilization(&mut self) {
        let probe = format!(
            "return document.querySelectorAll(\"{}\").length;",
            self.site.listing.card
        );
        let deadline = Instant::now() + self.pacing.stabilize_deadline;
        let mut last_count: Option<u64> = None;

        while Instant::now() < deadline {
            sleep(self.pacing.stabilize_poll).await;

            match self.driver.execute(&probe).await {
                Ok(value) => {
                    let count = value.as_u64().unwrap_or(0);
                    if last_count == Some(count) {
                        info!("Listing stabilized at {count} cards");
                        return;
                    }
                    last_count = Some(count);
                }
                Err(e) => {
                    warn!("Card-count probe failed ({e:#}); using the fixed settle delay");
                    sleep(self.pacing.stabilize_fallback).await;
                    return;
                }
            }
        }

        warn!(
            "Listing card count still changing after {:?}; continuing with what rendered",
            self.pacing.stabilize_deadline
        );
    }

    /// Scroll to the bottom until a full cycle produces no height growth.
    /// Best effort: any script failure ends the loop with a warning, the
    /// markup captured afterwards simply holds fewer cards.
    async fn scroll_to_exhaustion(&mut self) {
        let mut last_height = match self.scroll_height().await {
            Ok(height) => height,
            Err(e) => {
                warn!("Could not read page height, skipping scroll-through: {e:#}");
                return;
            }
        };

        for round in 1..=MAX_SCROLL_ROUNDS {
            if let Err(e) = self
                .driver
                .execute("window.scrollTo(0, document.body.scrollHeight);")
                .await
            {
                warn!("Scroll failed on round {round}: {e:#}");
                return;
            }
            sleep(self.pacing.scroll_settle).await;

            match self.scroll_height().await {
                Ok(height) if height == last_height => {
                    info!("Page height settled at {height} after {round} scroll rounds");
                    return;
                }
                Ok(height) => last_height = height,
                Err(e) => {
                    warn!("Could not re-read page height on round {round}: {e:#}");
                    return;
                }
            }
        }

        warn!("Page kept growing after {MAX_SCROLL_ROUNDS} scroll rounds, capturing as is");
    }

    async fn scroll_height(&mut self) -> Result<u64> {
        let value = self
            .driver
            .execute("return document.body.scrollHeight;")
            .await?;
        Ok(value
            .as_u64()
            .or_else(|| value.as_f64().map(|f| f as u64))
            .unwrap_or(0))
    }
}
