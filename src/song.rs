use derive_more::{AsRef, Display};
use itertools::Itertools;

/// A song the user asked for.  Built per submission and never stored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SongRequest {
    title: String,
    artist: Option<String>,
}

impl SongRequest {
    pub fn new(title: impl Into<String>, artist: Option<String>) -> Self {
        Self {
            title: title.into().trim().to_owned(),
            artist: artist.and_then(non_blank),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn artist(&self) -> Option<&str> {
        self.artist.as_deref()
    }

    pub fn slug(&self) -> Slug {
        Slug::from_title(&self.title)
    }

    /// `"{title} {artist} site:{site}"`, whitespace collapsed.
    pub fn search_query(&self, site: &str) -> String {
        let site = format!("site:{site}");
        let query = [self.title(), self.artist().unwrap_or_default(), &site]
            .into_iter()
            .flat_map(str::split_whitespace)
            .join(" ");
        query
    }

    /// Title-cased title, used as the `song` parameter after a fetch.
    pub fn display_title(&self) -> String {
        title_case(&self.title)
    }
}

fn non_blank(s: String) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_owned())
}

/// File-system key of a song: lower-cased title without spaces, apostrophes or hyphens.
/// Characters that cannot appear in a file name become `_`.
///
/// Distinct titles may collide ("Don't Stop" and "Dont Stop" share `dontstop`).
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Display, AsRef)]
#[as_ref(forward)]
pub struct Slug(String);

impl Slug {
    pub fn from_title(title: &str) -> Self {
        Self(
            title
                .to_lowercase()
                .chars()
                .filter(|c| !matches!(c, ' ' | '\'' | '-'))
                .map(|c| if disallowed_for_filename(c) { '_' } else { c })
                .collect(),
        )
    }

    /// Wraps a file stem read back from the cache directory.
    pub(crate) fn from_file_stem(stem: &str) -> Self {
        Self(stem.to_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn display_name(&self) -> String {
        title_case(&self.0.replace('_', " "))
    }
}

fn disallowed_for_filename(c: char) -> bool {
    matches!(
        c,
        '\u{0}'..='\u{1F}' | '<' | '>' | ':' | '\\' | '|' | '?' | '*' | '"' | '/'
    )
}

fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect::<String>(),
                None => String::new(),
            }
        })
        .join(" ")
}
