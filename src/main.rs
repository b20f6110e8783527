use anyhow::Result;
use tracing::{error, info};

use shelf_scout::browser::WebBrowser;
use shelf_scout::config::RunConfig;
use shelf_scout::context::RunContext;
use shelf_scout::pipeline::{self, RunStatus};
use shelf_scout::site::SiteProfile;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = RunConfig::from_env();
    let ctx = RunContext::init(&config.output_root)?;

    let file_appender = tracing_appender::rolling::never(ctx.logs_dir(), "app.log");
    let (writer, _guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_writer(writer)
        .with_ansi(false)
        .init();

    info!(
        "Starting shelf-scout run at {} (query: {:?})",
        ctx.started_at().to_rfc3339(),
        config.query
    );

    let mut browser = WebBrowser::launch(&config.webdriver_url, config.headless).await?;
    let site = SiteProfile::bestbuy();

    let status = pipeline::run(&mut browser, &site, &config, &ctx).await;

    // The session is released on every exit path, success or failure.
    if let Err(e) = browser.shutdown().await {
        error!("Browser teardown failed: {e:#}");
    }
    info!("Browser closed");

    match status {
        Ok(RunStatus::Completed { products, enriched }) => {
            if config.enrich_details {
                println!("✅ {products} products extracted, {enriched} enriched and saved.");
            } else {
                println!("✅ {products} products extracted and saved.");
            }
        }
        Ok(RunStatus::Aborted) => {
            println!("❌ Run aborted. Check logs and screenshot.");
        }
        Err(e) => {
            error!("Run failed: {e:#}");
            println!("❌ Run failed. Check logs.");
        }
    }

    Ok(())
}
