use std::str::FromStr;

use http::Uri;

/// Extract the opaque token from raw scanned text.
///
/// Extraction rule: if the text parses as a URL, the `token` query
/// parameter is the token; otherwise a string of exactly three non-empty
/// dot-separated segments (JWT shape) is taken whole. Anything else is
/// not a token. No cryptographic validation happens here; the backend
/// resolve endpoint is the authority.
pub fn resolve_scanned_text(raw: &str) -> Option<String> {
    let text = raw.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(uri) = Uri::from_str(text) {
        // a bare token also parses as a path-only URI; require a scheme
        if uri.scheme().is_some() {
            return token_query_param(uri.query()?);
        }
    }

    let segments: Vec<&str> = text.split('.').collect();
    if segments.len() == 3 && segments.iter().all(|s| !s.is_empty()) {
        return Some(text.to_string());
    }

    None
}

fn token_query_param(query: &str) -> Option<String> {
    for pair in query.split('&') {
        if let Some((name, value)) = pair.split_once('=') {
            if name == "token" && !value.is_empty() {
                return urlencoding::decode(value).ok().map(|v| v.into_owned());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_with_token_param() {
        let token = resolve_scanned_text("https://app.example/qr/rent?token=abc.def.ghi");
        assert_eq!(token.as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn test_url_token_param_among_others() {
        let token = resolve_scanned_text("https://app.example/qr?from=poster&token=abc.def.ghi");
        assert_eq!(token.as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn test_url_token_percent_decoded() {
        let token = resolve_scanned_text("https://app.example/qr?token=abc%2Edef%2Eghi");
        assert_eq!(token.as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn test_url_without_token_param() {
        assert_eq!(resolve_scanned_text("https://app.example/qr/rent"), None);
        assert_eq!(resolve_scanned_text("https://app.example/qr?other=1"), None);
    }

    #[test]
    fn test_bare_jwt_shape_fallback() {
        let token = resolve_scanned_text("abc.def.ghi");
        assert_eq!(token.as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn test_jwt_shape_requires_three_nonempty_segments() {
        assert_eq!(resolve_scanned_text("abc.def"), None);
        assert_eq!(resolve_scanned_text("abc.def.ghi.jkl"), None);
        assert_eq!(resolve_scanned_text("abc..ghi"), None);
    }

    #[test]
    fn test_garbage_returns_none() {
        assert_eq!(resolve_scanned_text("hello world"), None);
        assert_eq!(resolve_scanned_text(""), None);
        assert_eq!(resolve_scanned_text("   "), None);
    }

    #[test]
    fn test_leading_trailing_whitespace_trimmed() {
        let token = resolve_scanned_text("  abc.def.ghi\n");
        assert_eq!(token.as_deref(), Some("abc.def.ghi"));
    }
}
