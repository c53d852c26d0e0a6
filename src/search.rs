use std::time::Duration;

use itertools::Itertools;
use log::{debug, info, trace};
use reqwest::StatusCode;
use scraper::{ElementRef, Html};
use tab_finder_utils::selector;
use url::Url;

use crate::{
    error::{LookupError, LookupResult},
    song::SongRequest,
    video,
};

pub const DUCKDUCKGO_HTML_URL: &str = "https://html.duckduckgo.com/html/";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchHit {
    pub title: String,
    pub url: Url,
    pub snippet: String,
}

/// What a search is trying to land on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkTarget {
    Tab,
    Video,
}

impl LinkTarget {
    pub fn site(self) -> &'static str {
        match self {
            Self::Tab => "ultimate-guitar.com",
            Self::Video => "youtube.com",
        }
    }

    /// Substring a result URL must contain to be accepted.
    pub fn url_marker(self) -> &'static str {
        match self {
            Self::Tab => "tabs",
            Self::Video => "youtube.com/watch",
        }
    }
}

#[allow(async_fn_in_trait)]
pub trait SearchProvider {
    async fn search(&self, query: &str, max_results: usize) -> LookupResult<Vec<SearchHit>>;
}

/// First hit whose URL contains the target's marker.  No ranking.
pub fn first_matching(hits: &[SearchHit], target: LinkTarget) -> Option<&SearchHit> {
    hits.iter()
        .find(|hit| hit.url.as_str().contains(target.url_marker()))
}

pub struct LinkResolver<S> {
    provider: S,
    max_results: usize,
}

impl<S: SearchProvider> LinkResolver<S> {
    pub fn new(provider: S, max_results: usize) -> Self {
        Self {
            provider,
            max_results,
        }
    }

    pub fn provider(&self) -> &S {
        &self.provider
    }

    pub async fn resolve(&self, song: &SongRequest, target: LinkTarget) -> LookupResult<Option<Url>> {
        let query = song.search_query(target.site());
        info!("Searching {target:?} links: {query:?}");
        let hits = self.provider.search(&query, self.max_results).await?;
        debug!("Candidates: {:?}", hits.iter().map(|x| x.url.as_str()).collect_vec());
        let found = first_matching(&hits, target).map(|hit| hit.url.clone());
        match &found {
            Some(url) => info!("Resolved {target:?} link: {url}"),
            None => info!("No {target:?} link among {} results", hits.len()),
        }
        Ok(found)
    }

    pub async fn resolve_video_embed(&self, song: &SongRequest) -> LookupResult<Option<Url>> {
        Ok(self
            .resolve(song, LinkTarget::Video)
            .await?
            .as_ref()
            .and_then(video::embed_url))
    }
}

/// Scrapes the JavaScript-free DuckDuckGo result page.
pub struct DuckDuckGo {
    client: reqwest::Client,
}

impl DuckDuckGo {
    pub fn new(user_agent: &str, timeout: Duration) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;
        Ok(Self::with_client(client))
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl SearchProvider for DuckDuckGo {
    async fn search(&self, query: &str, max_results: usize) -> LookupResult<Vec<SearchHit>> {
        let response = self
            .client
            .get(DUCKDUCKGO_HTML_URL)
            .query(&[("q", query)])
            .send()
            .await?;
        // Throttled clients get a 202 with a challenge page instead of results.
        if response.status() == StatusCode::ACCEPTED {
            return Err(LookupError::Blocked("DuckDuckGo"));
        }
        if !response.status().is_success() {
            return Err(LookupError::Status(response.status()));
        }
        parse_page(&response.text().await?, max_results)
    }
}

/// Parses a result page, failing on the bot-check page that would otherwise read as "no results".
pub fn parse_page(body: &str, max_results: usize) -> LookupResult<Vec<SearchHit>> {
    let html = Html::parse_document(body);
    if is_challenge(&html) {
        return Err(LookupError::Blocked("DuckDuckGo"));
    }
    Ok(parse_results(&html, max_results))
}

fn is_challenge(html: &Html) -> bool {
    html.select(selector!(".anomaly-modal, #challenge-form, form.challenge-form"))
        .next()
        .is_some()
}

pub fn parse_results(html: &Html, max_results: usize) -> Vec<SearchHit> {
    html.select(selector!("div.result"))
        .filter(|e| !e.value().classes().any(|c| c == "result--ad"))
        .filter_map(parse_result)
        .take(max_results)
        .collect()
}

fn parse_result(result: ElementRef) -> Option<SearchHit> {
    let anchor = result.select(selector!("a.result__a")).next()?;
    let href = anchor.value().attr("href")?;
    let Some(url) = clean_result_url(href) else {
        trace!("Skipping unparsable result href {href:?}");
        return None;
    };
    let snippet = result
        .select(selector!(".result__snippet"))
        .next()
        .map(|e| e.text().collect::<String>().trim().to_owned())
        .unwrap_or_default();
    Some(SearchHit {
        title: anchor.text().collect::<String>().trim().to_owned(),
        url,
        snippet,
    })
}

/// Result links point at `//duckduckgo.com/l/?uddg=<target>`; unwrap them.
fn clean_result_url(href: &str) -> Option<Url> {
    let base = Url::parse("https://duckduckgo.com/").ok()?;
    let url = base.join(href).ok()?;
    match url.query_pairs().find(|(k, _)| k == "uddg") {
        Some((_, target)) => Url::parse(&target).ok(),
        None => Some(url),
    }
}
