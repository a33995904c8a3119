//! Fixed page catalogue for redirect resolution.

use std::collections::BTreeSet;

use ssogate_auth::PageResolver;

/// Resolves titles against a known set of pages under one base URL.
///
/// Titles are normalized the way wiki links are: surrounding whitespace
/// trimmed, spaces turned into underscores, first letter upper-cased.
#[derive(Debug, Clone)]
pub struct StaticPageResolver {
    base_url: String,
    home_title: String,
    pages: BTreeSet<String>,
}

impl StaticPageResolver {
    pub fn new(base_url: impl Into<String>, home_title: &str) -> Self {
        let home_title = normalize(home_title).unwrap_or_else(|| "Main_Page".to_string());
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            pages: BTreeSet::from([home_title.clone()]),
            home_title,
        }
    }

    pub fn with_page(mut self, title: &str) -> Self {
        if let Some(title) = normalize(title) {
            self.pages.insert(title);
        }
        self
    }

    fn url_for(&self, normalized: &str) -> String {
        format!("{}/{}", self.base_url, urlencoding::encode(normalized))
    }
}

impl PageResolver for StaticPageResolver {
    fn page_url(&self, title: &str) -> Option<String> {
        let title = normalize(title)?;
        self.pages
            .contains(&title)
            .then(|| self.url_for(&title))
    }

    fn home_url(&self) -> String {
        self.url_for(&self.home_title)
    }
}

fn normalize(title: &str) -> Option<String> {
    let title = title.trim().replace(' ', "_");
    if title.is_empty() || title.chars().any(|c| c.is_control() || "<>[]|{}#".contains(c)) {
        return None;
    }
    let mut chars = title.chars();
    let first = chars.next()?;
    Some(first.to_uppercase().chain(chars).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> StaticPageResolver {
        StaticPageResolver::new("https://wiki.example.org/wiki/", "Main Page")
            .with_page("PageX")
            .with_page("Fleet doctrine")
    }

    #[test]
    fn known_pages_resolve() {
        let pages = resolver();
        assert_eq!(
            pages.page_url("PageX").as_deref(),
            Some("https://wiki.example.org/wiki/PageX")
        );
        assert_eq!(
            pages.page_url("fleet doctrine").as_deref(),
            Some("https://wiki.example.org/wiki/Fleet_doctrine")
        );
    }

    #[test]
    fn unknown_or_invalid_titles_do_not_resolve() {
        let pages = resolver();
        assert_eq!(pages.page_url("Nowhere"), None);
        assert_eq!(pages.page_url("  "), None);
        assert_eq!(pages.page_url("[[PageX]]"), None);
    }

    #[test]
    fn home_url_uses_the_home_title() {
        assert_eq!(
            resolver().home_url(),
            "https://wiki.example.org/wiki/Main_Page"
        );
    }
}
