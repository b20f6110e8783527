//! Browser primitives behind the `UiDriver` seam
//!
//! Everything above this module talks to the page through the small set of
//! primitives below: navigate, wait-for-element, click (normal or scripted),
//! type, attribute read, script evaluation, markup capture, screenshot.
//! `WebBrowser` implements them over a WebDriver session; tests implement
//! them over scripted stubs.

use std::fmt;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use fantoccini::elements::Element;
use fantoccini::{Client, ClientBuilder, Locator};
use serde_json::json;
use tokio::time::Instant;
use tracing::info;

/// Interval between DOM polls while waiting for an element.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// How an element is addressed on the page.
#[derive(Debug, Clone)]
pub enum Target {
    Css(String),
    Id(String),
    XPath(String),
}

impl Target {
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    pub fn id(id: impl Into<String>) -> Self {
        Self::Id(id.into())
    }

    pub fn xpath(xpath: impl Into<String>) -> Self {
        Self::XPath(xpath.into())
    }

    /// The raw selector text, however the target is addressed.
    pub fn selector(&self) -> &str {
        match self {
            Self::Css(s) | Self::Id(s) | Self::XPath(s) => s,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Css(s) => write!(f, "css `{s}`"),
            Self::Id(s) => write!(f, "id `{s}`"),
            Self::XPath(s) => write!(f, "xpath `{s}`"),
        }
    }
}

/// What must hold before a wait resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitCondition {
    /// The element exists in the DOM
    Present,
    /// The element exists, is displayed, and is enabled
    Clickable,
}

/// The browser primitives the pipeline is built on.
#[async_trait]
pub trait UiDriver: Send {
    async fn navigate(&mut self, url: &str) -> Result<()>;

    /// Poll the DOM until `condition` holds for `target` or `timeout`
    /// elapses. No retries beyond the window; callers needing more compose
    /// multiple waits.
    async fn locate(
        &mut self,
        target: &Target,
        condition: WaitCondition,
        timeout: Duration,
    ) -> Result<()>;

    async fn click(&mut self, target: &Target) -> Result<()>;

    /// Click through script injection, for elements obscured to normal
    /// input (overlays, sticky headers).
    async fn forced_click(&mut self, target: &Target) -> Result<()>;

    async fn clear_and_type(&mut self, target: &Target, text: &str) -> Result<()>;

    async fn attribute(&mut self, target: &Target, name: &str) -> Result<Option<String>>;

    async fn execute(&mut self, script: &str) -> Result<serde_json::Value>;

    async fn page_source(&mut self) -> Result<String>;

    async fn screenshot(&mut self) -> Result<Vec<u8>>;
}

/// A live WebDriver-backed browser session.
pub struct WebBrowser {
    client: Client,
}

impl WebBrowser {
    /// Create a session against a running WebDriver endpoint
    /// (chromedriver). The window is fixed at 1920x1080 so selectors see
    /// the desktop layout.
    pub async fn launch(webdriver_url: &str, headless: bool) -> Result<Self> {
        let mut args = vec!["--disable-gpu", "--window-size=1920,1080"];
        if headless {
            args.push("--headless=new");
        }

        let mut capabilities = serde_json::map::Map::new();
        capabilities.insert("goog:chromeOptions".to_string(), json!({ "args": args }));

        let client = ClientBuilder::native()
            .capabilities(capabilities)
            .connect(webdriver_url)
            .await
            .with_context(|| format!("connecting to WebDriver at {webdriver_url}"))?;

        info!("Browser session started (headless: {headless})");
        Ok(Self { client })
    }

    /// End the session and release the browser. Must run on every exit
    /// path; the pipeline owner calls this after the run, success or not.
    pub async fn shutdown(self) -> Result<()> {
        self.client.close().await.context("closing browser session")
    }

    async fn find(&self, target: &Target) -> Result<Element> {
        self.client
            .find(locator(target))
            .await
            .with_context(|| format!("finding {target}"))
    }
}

fn locator(target: &Target) -> Locator<'_> {
    match target {
        Target::Css(s) => Locator::Css(s),
        Target::Id(s) => Locator::Id(s),
        Target::XPath(s) => Locator::XPath(s),
    }
}

#[async_trait]
impl UiDriver for WebBrowser {
    async fn navigate(&mut self, url: &str) -> Result<()> {
        self.client
            .goto(url)
            .await
            .with_context(|| format!("navigating to {url}"))
    }

    async fn locate(
        &mut self,
        target: &Target,
        condition: WaitCondition,
        timeout: Duration,
    ) -> Result<()> {
        let deadline = Instant::now() + timeout;

        loop {
            if let Ok(element) = self.client.find(locator(target)).await {
                match condition {
                    WaitCondition::Present => return Ok(()),
                    WaitCondition::Clickable => {
                        let displayed = matches!(element.is_displayed().await, Ok(true));
                        let enabled = matches!(element.is_enabled().await, Ok(true));
                        if displayed && enabled {
                            return Ok(());
                        }
                    }
                }
            }

            if Instant::now() >= deadline {
                bail!("timed out after {timeout:?} waiting for {target} ({condition:?})");
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn click(&mut self, target: &Target) -> Result<()> {
        let element = self.find(target).await?;
        element
            .click()
            .await
            .with_context(|| format!("clicking {target}"))
    }

    async fn forced_click(&mut self, target: &Target) -> Result<()> {
        let element = self.find(target).await?;
        let handle = serde_json::to_value(&element)
            .with_context(|| format!("passing {target} to the click script"))?;
        self.client
            .execute("arguments[0].click();", vec![handle])
            .await
            .with_context(|| format!("script-clicking {target}"))?;
        Ok(())
    }

    async fn clear_and_type(&mut self, target: &Target, text: &str) -> Result<()> {
        let element = self.find(target).await?;
        element
            .clear()
            .await
            .with_context(|| format!("clearing {target}"))?;
        element
            .send_keys(text)
            .await
            .with_context(|| format!("typing into {target}"))
    }

    async fn attribute(&mut self, target: &Target, name: &str) -> Result<Option<String>> {
        let element = self.find(target).await?;
        element
            .attr(name)
            .await
            .with_context(|| format!("reading attribute {name} of {target}"))
    }

    async fn execute(&mut self, script: &str) -> Result<serde_json::Value> {
        self.client
            .execute(script, Vec::new())
            .await
            .context("executing script")
    }

    async fn page_source(&mut self) -> Result<String> {
        self.client.source().await.context("reading page source")
    }

    async fn screenshot(&mut self) -> Result<Vec<u8>> {
        self.client.screenshot().await.context("capturing screenshot")
    }
}
