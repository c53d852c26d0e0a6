/// A `&'static scraper::Selector`, parsed on first use.
///
/// Panics with the offending selector if it does not parse; only pass literals.
/// The calling crate must depend on `once_cell` and `scraper`.
#[macro_export]
macro_rules! selector {
    ($css: expr) => {{
        static SELECTOR: ::once_cell::sync::Lazy<::scraper::Selector> =
            ::once_cell::sync::Lazy::new(|| {
                ::scraper::Selector::parse($css)
                    .unwrap_or_else(|e| panic!("invalid selector {:?}: {e}", $css))
            });
        &*SELECTOR
    }};
}
