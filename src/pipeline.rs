//! End-to-end run: drive the flow, extract, report, optionally enrich

use anyhow::Result;
use tracing::{info, warn};

use crate::browser::UiDriver;
use crate::config::RunConfig;
use crate::context::RunContext;
use crate::enrich::{self, CompiledDetail};
use crate::extract::{self, CompiledListing};
use crate::report;
use crate::sequencer::{SequenceOutcome, Sequencer};
use crate::site::SiteProfile;

/// How a run ended. Both variants are normal process termination; an
/// aborted run is observable through the logs and the screenshot artifact,
/// not an exit code.
#[derive(Debug, PartialEq, Eq)]
pub enum RunStatus {
    Completed { products: usize, enriched: usize },
    Aborted,
}

pub async fn run<D: UiDriver>(
    driver: &mut D,
    site: &SiteProfile,
    config: &RunConfig,
    ctx: &RunContext,
) -> Result<RunStatus> {
    let mut sequencer = Sequencer::new(
        driver,
        site,
        &config.filters,
        &config.query,
        &config.category,
        &config.pacing,
    );

    let markup = match sequencer.run(ctx).await? {
        SequenceOutcome::Captured(markup) => markup,
        SequenceOutcome::Aborted => return Ok(RunStatus::Aborted),
    };

    report::write_rendered_markup(ctx, &markup)?;

    let listing = CompiledListing::compile(&site.listing, &site.origin)?;
    let records = extract::extract(&markup, &listing);
    let products = records.len();

    report::write_products(ctx, &records)?;
    report::write_summary_csv(ctx)?;

    let mut enriched = 0;
    if config.enrich_details {
        // Re-read the document just written: enrichment always works from
        // the durable snapshot, so it behaves the same against a listing
        // captured by an earlier run.
        let stored = report::read_products(&ctx.products_document())?;
        let detail = CompiledDetail::compile(&site.detail)?;
        let total = stored.len();

        for (index, record) in stored.iter().enumerate() {
            info!("[{}/{}] Visiting {}", index + 1, total, record.link);

            match enrich::enrich(driver, &detail, record, &config.pacing).await {
                Ok(detail_record) => {
                    report::write_detail(ctx, &enrich::slug(&record.name), &detail_record)?;
                    enriched += 1;
                }
                Err(e) => {
                    warn!("Abandoning detail capture for {}: {e:#}", record.name);
                }
            }

            tokio::time::sleep(enrich::backoff_delay(index)).await;
        }
    }

    Ok(RunStatus::Completed { products, enriched })
}
