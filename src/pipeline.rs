use getset::Getters;
use log::{info, warn};
use url::Url;

use crate::{
    cache::{TabCache, TabStorage},
    error::LookupResult,
    fetch::{PageFetcher, TAB_SELECTOR},
    search::{LinkResolver, LinkTarget, SearchProvider},
    song::{Slug, SongRequest},
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TabStatus {
    /// Served from `tabs/<slug>.html` without touching the network.
    Cached,
    Fetched { source: Url },
    NotFound,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VideoStatus {
    Cached,
    Saved(Url),
    NotFound,
    /// The video search failed; the tab is still usable.
    Failed(String),
    /// No video lookup was attempted.
    Skipped,
}

#[derive(Clone, Debug)]
pub struct LookupReport {
    pub slug: Slug,
    pub tab: TabStatus,
    pub video: VideoStatus,
}

impl LookupReport {
    pub fn found(&self) -> bool {
        matches!(self.tab, TabStatus::Cached | TabStatus::Fetched { .. })
    }
}

/// Search, download and cache a tab (and a video) for one song.
#[derive(Getters)]
#[getset(get = "pub")]
pub struct TabFinder<S, F> {
    resolver: LinkResolver<S>,
    fetcher: F,
    cache: TabCache,
    #[getset(skip)]
    storage: TabStorage,
}

impl<S: SearchProvider, F: PageFetcher> TabFinder<S, F> {
    pub fn new(resolver: LinkResolver<S>, fetcher: F, cache: TabCache, storage: TabStorage) -> Self {
        Self {
            resolver,
            fetcher,
            cache,
            storage,
        }
    }

    pub async fn lookup(&self, song: &SongRequest) -> LookupResult<LookupReport> {
        let slug = song.slug();
        let report = |tab, video| LookupReport {
            slug: slug.clone(),
            tab,
            video,
        };

        if self.cache.has_tab(&slug) {
            info!("{slug:?} is already cached");
            let video = if self.cache.has_video(&slug) {
                VideoStatus::Cached
            } else {
                VideoStatus::Skipped
            };
            return Ok(report(TabStatus::Cached, video));
        }

        let Some(url) = self.resolver.resolve(song, LinkTarget::Tab).await? else {
            return Ok(report(TabStatus::NotFound, VideoStatus::Skipped));
        };
        let Some(page) = self.fetcher.fetch(&url, TAB_SELECTOR).await? else {
            return Ok(report(TabStatus::NotFound, VideoStatus::Skipped));
        };
        // Another request may have cached the same slug meanwhile; its copy wins.
        self.cache
            .write_tab_if_absent(&slug, &self.storage.render(&page))?;

        let video = self.lookup_video(song, &slug).await;
        Ok(report(TabStatus::Fetched { source: url }, video))
    }

    async fn lookup_video(&self, song: &SongRequest, slug: &Slug) -> VideoStatus {
        if self.cache.has_video(slug) {
            return VideoStatus::Cached;
        }
        match self.resolver.resolve_video_embed(song).await {
            Ok(Some(url)) => match self.cache.write_video(slug, &url) {
                Ok(()) => VideoStatus::Saved(url),
                Err(e) => {
                    warn!("Could not save the video link for {slug:?}: {e}");
                    VideoStatus::Failed(e.to_string())
                }
            },
            Ok(None) => VideoStatus::NotFound,
            Err(e) => {
                warn!("Video lookup for {slug:?} failed: {e}");
                VideoStatus::Failed(e.to_string())
            }
        }
    }
}
