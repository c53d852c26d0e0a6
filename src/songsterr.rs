use std::time::Duration;

use log::info;
use once_cell::sync::Lazy;
use serde::Deserialize;
use url::Url;

use crate::error::{LookupError, LookupResult};

pub const SEARCH_URL: &str = "https://www.songsterr.com/a/ra/songs.json";
static EMBED_BASE: Lazy<Url> =
    Lazy::new(|| Url::parse("https://www.songsterr.com/a/wsa/").unwrap());

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct SongsterrSong {
    pub id: u64,
    pub title: String,
    pub artist: SongsterrArtist,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct SongsterrArtist {
    pub name: String,
}

impl SongsterrSong {
    pub fn embed_url(&self) -> Url {
        embed_url(&self.artist.name, &self.title, self.id)
    }
}

/// `https://www.songsterr.com/a/wsa/{artist}-{title}-tab-s{id}t0`
pub fn embed_url(artist: &str, title: &str, id: u64) -> Url {
    let dashed = |s: &str| s.trim().to_lowercase().replace(' ', "-");
    let mut url = EMBED_BASE.clone();
    if let Ok(mut segments) = url.path_segments_mut() {
        segments
            .pop_if_empty()
            .push(&format!("{}-{}-tab-s{id}t0", dashed(artist), dashed(title)));
    }
    url
}

pub fn parse_songs(body: &str) -> serde_json::Result<Vec<SongsterrSong>> {
    serde_json::from_str(body)
}

pub struct SongsterrClient {
    client: reqwest::Client,
}

impl SongsterrClient {
    pub fn new(user_agent: &str, timeout: Duration) -> reqwest::Result<Self> {
        Ok(Self {
            client: reqwest::Client::builder()
                .user_agent(user_agent)
                .timeout(timeout)
                .build()?,
        })
    }

    /// The first song Songsterr suggests for `pattern`, if any.
    pub async fn find(&self, pattern: &str) -> LookupResult<Option<SongsterrSong>> {
        info!("Searching Songsterr for {pattern:?}");
        let response = self
            .client
            .get(SEARCH_URL)
            .query(&[("pattern", pattern.trim())])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(LookupError::Status(response.status()));
        }
        let song = parse_songs(&response.text().await?)?.into_iter().next();
        match &song {
            Some(song) => info!("Songsterr match: {} by {} ({})", song.title, song.artist.name, song.id),
            None => info!("Songsterr has nothing for {pattern:?}"),
        }
        Ok(song)
    }
}
