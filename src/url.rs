use once_cell::sync::Lazy;
use regex::Regex;

static URL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(https?|ftp)://[^\s/$.?#].[^\s]*$|^www\.[^\s/$.?#].[^\s]*$|^[^\s/$.?#].[^\s]*\.[^\s]{2,}$",
    )
    .expect("URL pattern is valid")
});

/// Loose check for whether `s` looks like a link: a `http`, `https` or `ftp`
/// URL, a `www.` host, or something domain shaped like `example.com`.
///
/// Only decides whether a preview image is worth showing; any non-empty text
/// can be bookmarked.
pub fn is_valid_url(s: &str) -> bool {
    URL_PATTERN.is_match(s)
}
