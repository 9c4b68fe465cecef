//! Link extraction for task descriptions.
//!
//! Descriptions are free text that may embed URLs, `www.` hosts or bare
//! domains. Links without a scheme are given an `https://` href.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)((?:https?|ftp|file)://[-A-Z0-9+&@#/%?=~_|!:,.;]*[-A-Z0-9+&@#/%=~_|])|(www\.[-A-Z0-9+&@#/%?=~_|!:,.;]*[-A-Z0-9+&@#/%=~_|])|([A-Z0-9.-]+\.[A-Z]{2,})",
    )
    .expect("valid url regex")
});

static SCHEME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(?:https?|ftp|file)://").expect("valid scheme regex"));

/// A link found in free text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    /// The text as it appeared.
    pub title: String,
    /// Navigable target.
    pub href: String,
}

/// Extracts every link in `text`, in order of appearance.
#[must_use]
pub fn extract_links(text: &str) -> Vec<Link> {
    URL_RE
        .find_iter(text)
        .map(|m| {
            let raw = m.as_str();
            let href = if SCHEME_RE.is_match(raw) {
                raw.to_string()
            } else {
                format!("https://{raw}")
            };
            Link {
                title: raw.to_string(),
                href,
            }
        })
        .collect()
}

/// Removes every link from `text` and trims the result.
#[must_use]
pub fn remove_links(text: &str) -> String {
    URL_RE.replace_all(text, "").trim().to_string()
}
