//! Helpers for redirect URLs during authentication flows.

use axum::{extract::Request, http::Uri};

use crate::endpoints;

/// Only same-site paths are allowed, and never the log-in page itself.
fn is_safe_redirect_url(redirect_url: &str) -> bool {
    if !redirect_url.starts_with('/') || redirect_url.starts_with("//") {
        return false;
    }

    let path = redirect_url
        .split_once('?')
        .map(|(path, _)| path)
        .unwrap_or(redirect_url);

    path != endpoints::LOG_IN_VIEW
}

/// Reduce `raw_url` to a safe path and query, or `None` if it points off-site.
pub fn normalize_redirect_url(raw_url: &str) -> Option<String> {
    let uri = raw_url.parse::<Uri>().ok()?;
    if uri.scheme().is_some() || uri.authority().is_some() {
        return None;
    }
    let path_and_query = uri.path_and_query()?.as_str();

    is_safe_redirect_url(path_and_query).then(|| path_and_query.to_owned())
}

/// HTMX sends the full URL of the current page, so the origin is dropped.
fn normalize_hx_current_url(raw_url: &str) -> Option<String> {
    let uri = raw_url.parse::<Uri>().ok()?;
    let path_and_query = uri.path_and_query()?.as_str();

    is_safe_redirect_url(path_and_query).then(|| path_and_query.to_owned())
}

/// The log-in page URL that sends the user back to where `request` came from.
///
/// For HTMX requests the page the user was on is read from the
/// `HX-Current-URL` header. Other `/api` requests have no page to return to.
pub fn build_log_in_redirect_url(request: &Request) -> Option<String> {
    let redirect_target = if is_hx_request(request) {
        redirect_target_from_hx_request(request)?
    } else if request.uri().path().starts_with("/api") {
        return None;
    } else {
        redirect_target_from_request_uri(request)?
    };

    build_log_in_redirect_url_from_target(&redirect_target)
}

pub(super) fn build_log_in_redirect_url_from_target(redirect_target: &str) -> Option<String> {
    match serde_urlencoded::to_string([("redirect_url", redirect_target)]) {
        Ok(param) => Some(format!("{}?{}", endpoints::LOG_IN_VIEW, param)),
        Err(error) => {
            tracing::error!("Could not encode redirect URL {redirect_target}: {error}");
            None
        }
    }
}

fn redirect_target_from_request_uri(request: &Request) -> Option<String> {
    let path_and_query = request.uri().path_and_query()?.as_str();
    normalize_redirect_url(path_and_query)
}

fn is_hx_request(request: &Request) -> bool {
    request
        .headers()
        .get("hx-request")
        .and_then(|header| header.to_str().ok())
        .is_some_and(|header| header.eq_ignore_ascii_case("true"))
}

fn redirect_target_from_hx_request(request: &Request) -> Option<String> {
    let current_url = request
        .headers()
        .get("hx-current-url")
        .and_then(|header| header.to_str().ok())?;

    let redirect_url = normalize_hx_current_url(current_url);
    if redirect_url.is_none() {
        tracing::warn!("Invalid HX-Current-URL header value: {current_url}");
    }

    redirect_url
}

#[cfg(test)]
mod redirect_tests {
    use axum::{body::Body, extract::Request};

    use crate::endpoints;

    use super::{build_log_in_redirect_url, normalize_redirect_url};

    #[test]
    fn rejects_off_site_urls() {
        assert_eq!(normalize_redirect_url("https://evil.example/budgets"), None);
        assert_eq!(normalize_redirect_url("//evil.example/budgets"), None);
        assert_eq!(normalize_redirect_url("budgets"), None);
    }

    #[test]
    fn rejects_log_in_page() {
        assert_eq!(normalize_redirect_url(endpoints::LOG_IN_VIEW), None);
    }

    #[test]
    fn keeps_path_and_query() {
        assert_eq!(
            normalize_redirect_url("/expenses?page=2"),
            Some("/expenses?page=2".to_owned())
        );
    }

    #[test]
    fn page_request_redirects_back_to_page() {
        let request = Request::builder()
            .uri(endpoints::BUDGETS_VIEW)
            .body(Body::empty())
            .unwrap();

        assert_eq!(
            build_log_in_redirect_url(&request),
            Some("/log_in?redirect_url=%2Fbudgets".to_owned())
        );
    }

    #[test]
    fn api_request_uses_current_url() {
        let request = Request::builder()
            .uri("/api/budgets/1")
            .header("HX-Request", "true")
            .header("HX-Current-URL", "http://localhost:3000/budgets")
            .body(Body::empty())
            .unwrap();

        assert_eq!(
            build_log_in_redirect_url(&request),
            Some("/log_in?redirect_url=%2Fbudgets".to_owned())
        );
    }

    #[test]
    fn htmx_request_to_page_path_uses_current_url() {
        let request = Request::builder()
            .method("DELETE")
            .uri("/expenses/3")
            .header("HX-Request", "true")
            .header("HX-Current-URL", "http://localhost:3000/expenses")
            .body(Body::empty())
            .unwrap();

        assert_eq!(
            build_log_in_redirect_url(&request),
            Some("/log_in?redirect_url=%2Fexpenses".to_owned())
        );
    }

    #[test]
    fn api_request_without_htmx_headers() {
        let request = Request::builder()
            .uri("/api/expenses")
            .body(Body::empty())
            .unwrap();

        assert_eq!(build_log_in_redirect_url(&request), None);
    }
}
