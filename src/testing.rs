//! In-memory collaborators for exercising the pipeline without a network.

use std::{
    cell::{Cell, RefCell},
    path::Path,
};

use reqwest::StatusCode;
use url::Url;

use crate::{
    cache::{TabCache, TabStorage},
    error::{LookupError, LookupResult},
    fetch::{PageFetcher, TabPage},
    pipeline::TabFinder,
    search::{LinkResolver, SearchHit, SearchProvider},
};

pub const TAB_TEXT: &str = "e|-----0-----|\nB|-----1-----|\nG|-----0-----|";

enum Answer {
    BySite,
    Fixed(Vec<Url>),
    Fail,
}

pub struct StubSearch {
    answer: Answer,
    queries: RefCell<Vec<String>>,
}

impl Default for StubSearch {
    fn default() -> Self {
        Self {
            answer: Answer::BySite,
            queries: RefCell::default(),
        }
    }
}

impl StubSearch {
    pub fn with_urls(urls: &[&str]) -> Self {
        Self {
            answer: Answer::Fixed(urls.iter().map(|u| Url::parse(u).unwrap()).collect()),
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            answer: Answer::Fail,
            ..Self::default()
        }
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.borrow().clone()
    }
}

impl SearchProvider for StubSearch {
    async fn search(&self, query: &str, max_results: usize) -> LookupResult<Vec<SearchHit>> {
        self.queries.borrow_mut().push(query.to_owned());
        let urls = match &self.answer {
            Answer::Fail => return Err(LookupError::Status(StatusCode::SERVICE_UNAVAILABLE)),
            Answer::Fixed(urls) => urls.clone(),
            Answer::BySite if query.ends_with("site:youtube.com") => vec![
                Url::parse("https://www.youtube.com/channel/UCmMjx4ZxBqQ").unwrap(),
                Url::parse("https://www.youtube.com/watch?v=6hzrDeceEKc&t=4").unwrap(),
            ],
            Answer::BySite => vec![
                Url::parse("https://www.ultimate-guitar.com/artist/oasis_1003").unwrap(),
                Url::parse("https://tabs.ultimate-guitar.com/tab/oasis/wonderwall-tabs-4128")
                    .unwrap(),
            ],
        };
        Ok(urls
            .into_iter()
            .take(max_results)
            .map(|url| SearchHit {
                title: String::new(),
                url,
                snippet: String::new(),
            })
            .collect())
    }
}

pub struct StubFetcher {
    text: Option<&'static str>,
    calls: Cell<usize>,
}

impl Default for StubFetcher {
    fn default() -> Self {
        Self {
            text: Some(TAB_TEXT),
            calls: Cell::new(0),
        }
    }
}

impl StubFetcher {
    /// A fetcher whose pages never contain the tab.
    pub fn empty() -> Self {
        Self {
            text: None,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl PageFetcher for StubFetcher {
    async fn fetch(&self, url: &Url, _selector: &str) -> LookupResult<Option<TabPage>> {
        self.calls.set(self.calls.get() + 1);
        Ok(self.text.map(|text| TabPage {
            url: url.clone(),
            html: format!("<html><body><pre>{text}</pre></body></html>"),
            text: text.to_owned(),
        }))
    }
}

pub fn stub_finder(
    root: &Path,
    search: StubSearch,
    fetcher: StubFetcher,
) -> TabFinder<StubSearch, StubFetcher> {
    TabFinder::new(
        LinkResolver::new(search, 5),
        fetcher,
        TabCache::open(root).unwrap(),
        TabStorage::Pre,
    )
}
