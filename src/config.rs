use std::{path::Path, path::PathBuf, time::Duration};

use anyhow::Context;
use serde::Deserialize;
use serde_with::{serde_as, DurationSeconds};
use tab_finder_utils::fs_util::read_toml;

use crate::{
    cache::{TabCache, TabStorage},
    fetch::{BrowserFetcher, Fetcher, HttpFetcher},
    pipeline::TabFinder,
    search::{DuckDuckGo, LinkResolver},
    songsterr::SongsterrClient,
};

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

#[derive(Clone, Copy, Default, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetcherKind {
    Http,
    #[default]
    Browser,
}

#[serde_as]
#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub bind_address: String,
    pub port: u16,
    /// `tabs/` and `videos/` live here.
    pub data_dir: PathBuf,
    pub max_results: usize,
    #[serde_as(as = "DurationSeconds<u64>")]
    pub http_timeout: Duration,
    #[serde_as(as = "DurationSeconds<u64>")]
    pub browser_timeout: Duration,
    pub fetcher: FetcherKind,
    pub storage: TabStorage,
    pub user_agent: String,
    pub remote_debugging_port: Option<u16>,
    pub browser_sandbox: bool,
    pub recommended_searches: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_owned(),
            port: 5000,
            data_dir: PathBuf::from("."),
            max_results: 5,
            http_timeout: Duration::from_secs(30),
            browser_timeout: Duration::from_secs(30),
            fetcher: FetcherKind::default(),
            storage: TabStorage::default(),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            remote_debugging_port: None,
            browser_sandbox: true,
            recommended_searches: [
                "Sweet Child O' Mine - Guns N Roses",
                "Smells Like Teen Spirit - Nirvana",
                "Under the Bridge - Red Hot Chili Peppers",
                "Hotel California - Eagles",
                "Stairway to Heaven - Led Zeppelin",
                "Tears in Heaven - Eric Clapton",
                "Blackbird - Beatles",
                "Wonderwall - Oasis",
            ]
            .map(String::from)
            .to_vec(),
        }
    }
}

impl Config {
    /// Reads the TOML file if one is given; otherwise every key takes its default.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => read_toml(path),
            None => Ok(Self::default()),
        }
    }

    pub fn fetcher(&self) -> anyhow::Result<Fetcher> {
        Ok(match self.fetcher {
            FetcherKind::Http => Fetcher::Http(HttpFetcher::new(&self.user_agent, self.http_timeout)?),
            FetcherKind::Browser => Fetcher::Browser(
                BrowserFetcher::builder()
                    .timeout(self.browser_timeout)
                    .remote_debugging_port(self.remote_debugging_port)
                    .sandbox(self.browser_sandbox)
                    .build(),
            ),
        })
    }

    pub fn tab_finder(&self) -> anyhow::Result<TabFinder<DuckDuckGo, Fetcher>> {
        let search = DuckDuckGo::new(&self.user_agent, self.http_timeout)?;
        let cache = TabCache::open(&self.data_dir)
            .with_context(|| format!("While preparing the cache in {:?}", self.data_dir))?;
        Ok(TabFinder::new(
            LinkResolver::new(search, self.max_results),
            self.fetcher()?,
            cache,
            self.storage,
        ))
    }

    pub fn songsterr(&self) -> anyhow::Result<SongsterrClient> {
        Ok(SongsterrClient::new(&self.user_agent, self.http_timeout)?)
    }
}
