use std::time::Duration;

use anyhow::Context;
use headless_chrome::{Browser, LaunchOptionsBuilder};
use log::{debug, info, warn};
use scraper::{Html, Selector};
use typed_builder::TypedBuilder;
use url::Url;

use crate::error::{LookupError, LookupResult};

/// Tab sites render the tablature inside the first `<pre>`.
pub const TAB_SELECTOR: &str = "pre";

#[derive(Clone, Debug)]
pub struct TabPage {
    pub url: Url,
    /// The whole document as it was when the element was read.
    pub html: String,
    /// Text content of the first element matching the selector.
    pub text: String,
}

#[allow(async_fn_in_trait)]
pub trait PageFetcher {
    /// Loads `url` once.  `Ok(None)` means the page came back without the element.
    async fn fetch(&self, url: &Url, selector: &str) -> LookupResult<Option<TabPage>>;
}

pub fn extract_text(html: &Html, selector: &Selector) -> Option<String> {
    html.select(selector)
        .next()
        .map(|element| element.text().collect())
}

fn parse_selector(selector: &str) -> LookupResult<Selector> {
    Selector::parse(selector).map_err(|_| LookupError::Selector(selector.to_owned()))
}

/// Plain GET; only sees what the server renders.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(user_agent: &str, timeout: Duration) -> reqwest::Result<Self> {
        Ok(Self {
            client: reqwest::Client::builder()
                .user_agent(user_agent)
                .timeout(timeout)
                .build()?,
        })
    }
}

impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &Url, selector: &str) -> LookupResult<Option<TabPage>> {
        let selector_parsed = parse_selector(selector)?;
        info!("Downloading {url}");
        let response = self.client.get(url.clone()).send().await?;
        if !response.status().is_success() {
            return Err(LookupError::Status(response.status()));
        }
        let html = response.text().await?;
        let Some(text) = extract_text(&Html::parse_document(&html), &selector_parsed) else {
            info!("{url} has no element matching {selector:?}");
            return Ok(None);
        };
        Ok(Some(TabPage {
            url: url.clone(),
            html,
            text,
        }))
    }
}

/// Drives a fresh headless Chrome per fetch, for pages that build the tab with JavaScript.
#[derive(Clone, Debug, TypedBuilder)]
pub struct BrowserFetcher {
    timeout: Duration,
    #[builder(default)]
    remote_debugging_port: Option<u16>,
    #[builder(default = true)]
    sandbox: bool,
}

impl PageFetcher for BrowserFetcher {
    async fn fetch(&self, url: &Url, selector: &str) -> LookupResult<Option<TabPage>> {
        // Validated here so a typo is not reported as a browser failure.
        parse_selector(selector)?;
        let (this, url, selector) = (self.clone(), url.clone(), selector.to_owned());
        tokio::task::spawn_blocking(move || this.fetch_blocking(url, &selector))
            .await?
            .map_err(LookupError::Browser)
    }
}

impl BrowserFetcher {
    fn fetch_blocking(&self, url: Url, selector: &str) -> anyhow::Result<Option<TabPage>> {
        info!("Opening {url} in a headless browser");
        let browser = Browser::new(
            LaunchOptionsBuilder::default()
                .port(self.remote_debugging_port)
                .sandbox(self.sandbox)
                .idle_browser_timeout(self.timeout * 2)
                .build()?,
        )
        .context("Failed to launch the browser")?;
        let tab = browser.new_tab()?;
        tab.set_default_timeout(self.timeout);
        tab.navigate_to(url.as_str())
            .with_context(|| format!("While navigating to {url}"))?;

        let text = match tab.wait_for_element_with_custom_timeout(selector, self.timeout) {
            Ok(element) => Some(element.get_inner_text()?),
            Err(e) => {
                debug!("Waiting for {selector:?} ended with: {e:#}");
                None
            }
        };
        let html = tab.get_content()?;
        // The wait may have given up on a slow page that rendered the element afterwards.
        let text = match text {
            Some(text) => text,
            None => match extract_text(&Html::parse_document(&html), &parse_selector(selector)?) {
                Some(text) => text,
                None => {
                    warn!("{url} never showed an element matching {selector:?}");
                    return Ok(None);
                }
            },
        };
        Ok(Some(TabPage { url, html, text }))
    }
}

/// Fetcher picked at start-up from the configuration.
pub enum Fetcher {
    Http(HttpFetcher),
    Browser(BrowserFetcher),
}

impl PageFetcher for Fetcher {
    async fn fetch(&self, url: &Url, selector: &str) -> LookupResult<Option<TabPage>> {
        match self {
            Self::Http(fetcher) => fetcher.fetch(url, selector).await,
            Self::Browser(fetcher) => fetcher.fetch(url, selector).await,
        }
    }
}
