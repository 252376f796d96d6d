//! Paginated response body shared by every listing endpoint.

use axum::http::Uri;
use serde::Serialize;
use url::Url;

use crate::search::Page;

#[derive(Debug, Serialize)]
pub struct PageEnvelope<T> {
    pub data: Vec<T>,
    pub total_items: u64,
    pub total_pages: u32,
    pub page: u32,
    pub per_page: u32,
    pub has_prev: bool,
    pub has_next: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev_page: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_page: Option<String>,
}

impl<T> PageEnvelope<T> {
    /// Wrap `page`, linking neighbours through the endpoint that served `uri`.
    pub fn new(page: Page<T>, base_url: &str, uri: &Uri) -> Self {
        Self::with_query(page, base_url, uri.path(), &query_pairs(uri))
    }

    /// Wrap `page`, linking neighbours through `path` with `query` as the
    /// non-page parameters. Used when the filters did not come from the URL.
    pub fn with_query(
        page: Page<T>,
        base_url: &str,
        path: &str,
        query: &[(String, String)],
    ) -> Self {
        let prev_page = if page.has_prev {
            page_link(base_url, path, query, page.page - 1)
        } else {
            None
        };
        let next_page = if page.has_next {
            page_link(base_url, path, query, page.page + 1)
        } else {
            None
        };
        Self {
            data: page.items,
            total_items: page.total,
            total_pages: page.pages,
            page: page.page,
            per_page: page.per_page,
            has_prev: page.has_prev,
            has_next: page.has_next,
            prev_page,
            next_page,
        }
    }
}

/// Query parameters of `uri` in order, without `page`.
pub fn query_pairs(uri: &Uri) -> Vec<(String, String)> {
    uri.query()
        .map(|query| {
            url::form_urlencoded::parse(query.as_bytes())
                .into_owned()
                .filter(|(key, _)| key != "page")
                .collect()
        })
        .unwrap_or_default()
}

/// Absolute URL for `path` carrying `query` followed by `page`.
pub fn page_link(
    base_url: &str,
    path: &str,
    query: &[(String, String)],
    page: u32,
) -> Option<String> {
    let mut url = Url::parse(base_url).ok()?.join(path).ok()?;
    url.query_pairs_mut()
        .clear()
        .extend_pairs(query.iter().filter(|(key, _)| key != "page"))
        .append_pair("page", &page.to_string());
    Some(url.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_link_replaces_page_and_keeps_filters() {
        let uri: Uri = "/api/books/search?text=zahn&page=2&kind_id=1".parse().unwrap();
        let link = page_link("http://localhost:3001", uri.path(), &query_pairs(&uri), 3).unwrap();
        assert_eq!(link, "http://localhost:3001/api/books/search?text=zahn&kind_id=1&page=3");
    }

    #[test]
    fn test_page_link_without_query() {
        let link = page_link("https://books.example.com", "/api/books", &[], 2).unwrap();
        assert_eq!(link, "https://books.example.com/api/books?page=2");
    }

    #[test]
    fn test_page_link_encodes_text() {
        let uri: Uri = "/api/books/search?text=pequeno%20pr%C3%ADncipe".parse().unwrap();
        let link = page_link("http://localhost:3001", uri.path(), &query_pairs(&uri), 2).unwrap();
        assert_eq!(
            link,
            "http://localhost:3001/api/books/search?text=pequeno+pr%C3%ADncipe&page=2"
        );
    }

    #[test]
    fn test_envelope_links_only_existing_pages() {
        let uri: Uri = "/api/books?page=1".parse().unwrap();
        let first = PageEnvelope::new(Page::new(vec![1, 2], 5, 1, 2), "http://h", &uri);
        assert!(first.prev_page.is_none());
        assert_eq!(first.next_page.as_deref(), Some("http://h/api/books?page=2"));
        assert_eq!(first.total_pages, 3);

        let last = PageEnvelope::new(Page::new(vec![5], 5, 3, 2), "http://h", &uri);
        assert_eq!(last.prev_page.as_deref(), Some("http://h/api/books?page=2"));
        assert!(last.next_page.is_none());
    }

    #[test]
    fn test_envelope_with_explicit_query() {
        let query = vec![("min_price".to_string(), "50".to_string())];
        let env = PageEnvelope::with_query(
            Page::new(vec![1], 3, 1, 1),
            "http://h",
            "/api/books/search",
            &query,
        );
        assert_eq!(
            env.next_page.as_deref(),
            Some("http://h/api/books/search?min_price=50&page=2")
        );
    }
}
