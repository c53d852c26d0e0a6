use std::{
    fmt::Display,
    io::{self, ErrorKind, Write},
    path::{Path, PathBuf},
    time::SystemTime,
};

use itertools::Itertools;
use log::{debug, info, warn};
use scraper::Html;
use serde::Deserialize;
use tab_finder_utils::{fs_util::read_to_string_if_exists, selector};
use tempfile::NamedTempFile;
use url::Url;

use crate::{
    fetch::{extract_text, TabPage, TAB_SELECTOR},
    song::Slug,
};

pub const TABS_DIR: &str = "tabs";
pub const VIDEOS_DIR: &str = "videos";

/// What goes into `tabs/<slug>.html`.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TabStorage {
    /// Only the tab text, wrapped in `<pre>`.
    #[default]
    Pre,
    /// The whole scraped page.
    Page,
}

impl TabStorage {
    pub fn render(self, page: &TabPage) -> String {
        match self {
            Self::Pre => format!("<pre>\n{}\n</pre>", html_escape::encode_text(&page.text)),
            Self::Page => page.html.clone(),
        }
    }
}

/// A cached tab as shown to the user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TabText {
    Missing,
    NoPreBlock,
    Text(String),
}

impl Display for TabText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing => f.write_str("Tab file not found."),
            Self::NoPreBlock => f.write_str("No <pre> block found."),
            Self::Text(text) => f.write_str(text),
        }
    }
}

#[derive(Clone, Debug)]
pub struct CachedSong {
    pub slug: Slug,
    pub name: String,
    pub modified: SystemTime,
}

/// Flat-file cache under a data directory: `tabs/<slug>.html` and `videos/<slug>.txt`.
///
/// Entries are written once and never refreshed; only [`TabCache::remove`] clears one.
#[derive(Clone, Debug)]
pub struct TabCache {
    tabs_dir: PathBuf,
    videos_dir: PathBuf,
}

impl TabCache {
    pub fn open(root: impl AsRef<Path>) -> io::Result<Self> {
        let root = root.as_ref();
        let cache = Self {
            tabs_dir: root.join(TABS_DIR),
            videos_dir: root.join(VIDEOS_DIR),
        };
        fs_err::create_dir_all(&cache.tabs_dir)?;
        fs_err::create_dir_all(&cache.videos_dir)?;
        Ok(cache)
    }

    pub fn tab_path(&self, slug: &Slug) -> PathBuf {
        self.tabs_dir.join(format!("{slug}.html"))
    }

    pub fn video_path(&self, slug: &Slug) -> PathBuf {
        self.videos_dir.join(format!("{slug}.txt"))
    }

    pub fn has_tab(&self, slug: &Slug) -> bool {
        self.tab_path(slug).is_file()
    }

    pub fn has_video(&self, slug: &Slug) -> bool {
        self.video_path(slug).is_file()
    }

    /// Returns `false`, leaving the file untouched, if the slug is already cached.
    ///
    /// The content is staged in a temporary file next to the target, so readers
    /// never see a partial tab and a failed write leaves nothing behind.
    pub fn write_tab_if_absent(&self, slug: &Slug, content: &str) -> io::Result<bool> {
        let path = self.tab_path(slug);
        if path.exists() {
            debug!("{path:?} already exists; keeping it");
            return Ok(false);
        }
        let mut staged = NamedTempFile::new_in(&self.tabs_dir)?;
        staged.write_all(content.as_bytes())?;
        staged.as_file().sync_all()?;
        match staged.persist_noclobber(&path) {
            Ok(_) => {
                info!("Saved tab to {path:?}");
                Ok(true)
            }
            Err(e) if e.error.kind() == ErrorKind::AlreadyExists => {
                debug!("{path:?} was written concurrently; keeping it");
                Ok(false)
            }
            Err(e) => Err(e.error),
        }
    }

    pub fn read_tab(&self, slug: &Slug) -> io::Result<TabText> {
        let Some(content) = read_to_string_if_exists(self.tab_path(slug))? else {
            return Ok(TabText::Missing);
        };
        let html = Html::parse_document(&content);
        Ok(match extract_text(&html, selector!(TAB_SELECTOR)) {
            Some(text) => TabText::Text(text.trim_matches(['\r', '\n']).to_owned()),
            None => TabText::NoPreBlock,
        })
    }

    pub fn read_video(&self, slug: &Slug) -> io::Result<Option<Url>> {
        let path = self.video_path(slug);
        let Some(content) = read_to_string_if_exists(&path)? else {
            return Ok(None);
        };
        match Url::parse(content.trim()) {
            Ok(url) => Ok(Some(url)),
            Err(e) => {
                warn!("Ignoring malformed video link in {path:?}: {e}");
                Ok(None)
            }
        }
    }

    pub fn write_video(&self, slug: &Slug, url: &Url) -> io::Result<()> {
        let path = self.video_path(slug);
        fs_err::write(&path, url.as_str())?;
        info!("Saved video link to {path:?}");
        Ok(())
    }

    /// Cached tabs, most recently written first.
    pub fn list_songs(&self) -> io::Result<Vec<CachedSong>> {
        let mut songs = vec![];
        for entry in fs_err::read_dir(&self.tabs_dir)? {
            let path = entry?.path();
            if path.extension().map_or(true, |ext| ext != "html") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let slug = Slug::from_file_stem(stem);
            songs.push(CachedSong {
                name: slug.display_name(),
                modified: fs_err::metadata(&path)?.modified()?,
                slug,
            });
        }
        Ok(songs
            .into_iter()
            .sorted_by(|x, y| y.modified.cmp(&x.modified).then_with(|| x.slug.cmp(&y.slug)))
            .collect())
    }

    /// Deletes both files of a slug.  Returns whether anything was there.
    pub fn remove(&self, slug: &Slug) -> io::Result<bool> {
        let mut removed = false;
        for path in [self.tab_path(slug), self.video_path(slug)] {
            match fs_err::remove_file(&path) {
                Ok(()) => {
                    info!("Removed {path:?}");
                    removed = true;
                }
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
        }
        Ok(removed)
    }
}
