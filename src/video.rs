use url::Url;

pub const EMBED_BASE: &str = "https://www.youtube.com/embed/";

/// Turns a `watch?v=` link into the iframe-friendly `/embed/{id}` form.
pub fn embed_url(watch_url: &Url) -> Option<Url> {
    let (_, rest) = watch_url.as_str().split_once("watch?v=")?;
    let id = rest.split(['&', '#']).next()?;
    if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_')) {
        return None;
    }
    Url::parse(&format!("{EMBED_BASE}{id}")).ok()
}
