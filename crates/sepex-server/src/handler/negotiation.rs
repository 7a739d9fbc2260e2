//! `Accept`/`?f=` content negotiation for sync execution responses.
//!
//! SEPEX produces JSON only; "HTML" here is the degenerate fallback defined
//! by [`HtmlFallback`](crate::handler::dto::HtmlFallback) so a browser
//! navigating straight to a sync-execute URL still gets a readable body
//! instead of a raw JSON blob it can't render, without this crate actually
//! implementing a template engine.

use axum::http::HeaderMap;
use axum::http::header;
use serde::Deserialize;

use crate::handler::dto::HtmlFallback;

/// The `?f=json|html` query parameter, as an alternative to `Accept`.
#[derive(Debug, Clone, Default, Deserialize, schemars::JsonSchema)]
pub struct FormatQuery {
    pub f: Option<String>,
}

/// Decides whether the caller asked for HTML, preferring the explicit `?f=`
/// override over the `Accept` header when both are present.
pub fn wants_html(headers: &HeaderMap, format: &FormatQuery) -> bool {
    if let Some(f) = format.f.as_deref() {
        return f.eq_ignore_ascii_case("html");
    }

    headers
        .get(header::ACCEPT)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|accept| accept.contains("text/html"))
}

/// A sync-execute response body, negotiated between plain JSON and the
/// JSON-wrapped HTML fallback.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(untagged)]
pub enum Negotiated<T> {
    Json(T),
    Html(HtmlFallback<T>),
}

impl<T> Negotiated<T> {
    pub fn new(data: T, as_html: bool) -> Self {
        if as_html {
            Self::Html(HtmlFallback::wrap(data))
        } else {
            Self::Json(data)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_override_wins_over_accept_header() {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, "application/json".parse().unwrap());
        let format = FormatQuery { f: Some("html".into()) };
        assert!(wants_html(&headers, &format));
    }

    #[test]
    fn accept_header_is_honored_without_query_override() {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, "text/html,application/xhtml+xml".parse().unwrap());
        assert!(wants_html(&headers, &FormatQuery::default()));
    }

    #[test]
    fn defaults_to_json() {
        let headers = HeaderMap::new();
        assert!(!wants_html(&headers, &FormatQuery::default()));
    }
}
