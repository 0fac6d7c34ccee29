use axum::http::{header::AUTHORIZATION, HeaderMap};
use base64::{engine::general_purpose::STANDARD, Engine};

const BASIC_PREFIX: &str = "Basic ";
const SECRET_HEADER: &str = "x-webhook-secret";

/// Pulls the secret candidate out of the request, checking each transport
/// location in priority order: Authorization header, x-webhook-secret header,
/// query string, body field. The first non-empty candidate wins, even when it
/// will not match the configured secret.
pub fn extract_secret(
    headers: &HeaderMap,
    query_secret: Option<&str>,
    body_secret: Option<&str>,
    configured: &str,
) -> Option<String> {
    let candidates = [
        from_basic_auth(headers, configured),
        from_secret_header(headers),
        query_secret.map(str::to_string),
        body_secret.map(str::to_string),
    ];

    candidates.into_iter().flatten().find(|s| !s.is_empty())
}

/// Authorization header in the Basic scheme. The remainder after the prefix
/// is used verbatim when it already equals the configured secret, otherwise
/// it gets base64 decoded. A decoded value containing a colon is rebuilt as
/// `username:password` from its first two segments; anything past a second
/// colon is dropped, and an empty password falls back to the whole decoded
/// string. A failed decode falls back to the raw remainder.
fn from_basic_auth(headers: &HeaderMap, configured: &str) -> Option<String> {
    let raw = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let raw = raw.strip_prefix(BASIC_PREFIX)?;

    if raw == configured {
        return Some(raw.to_string());
    }

    let decoded = match STANDARD.decode(raw).map(String::from_utf8) {
        Ok(Ok(decoded)) => decoded,
        _ => return Some(raw.to_string()),
    };

    if !decoded.contains(':') {
        return Some(decoded);
    }

    let mut segments = decoded.split(':');
    let username = segments.next().unwrap_or_default();
    let password = segments.next().unwrap_or_default();

    if password.is_empty() {
        Some(decoded.clone())
    } else {
        Some(format!("{username}:{password}"))
    }
}

fn from_secret_header(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(SECRET_HEADER)?.to_str().ok()?;
    Some(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    const SECRET: &str = "nvzpix:nvzpix_secret_2025";

    fn headers_with(name: &'static str, value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(name, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn basic_header_verbatim_secret() {
        let headers = headers_with("authorization", &format!("Basic {SECRET}"));
        let got = extract_secret(&headers, None, None, SECRET);
        assert_eq!(got.as_deref(), Some(SECRET));
    }

    #[test]
    fn basic_header_base64_credentials_are_rebuilt() {
        let encoded = STANDARD.encode(SECRET);
        let headers = headers_with("authorization", &format!("Basic {encoded}"));
        let got = extract_secret(&headers, None, None, SECRET);
        assert_eq!(got.as_deref(), Some(SECRET));
    }

    #[test]
    fn basic_header_decoded_without_colon_is_used_directly() {
        let encoded = STANDARD.encode("somesecret");
        let headers = headers_with("authorization", &format!("Basic {encoded}"));
        let got = extract_secret(&headers, None, None, SECRET);
        assert_eq!(got.as_deref(), Some("somesecret"));
    }

    #[test]
    fn basic_header_extra_colon_segments_are_dropped() {
        let encoded = STANDARD.encode("user:pass:extra");
        let headers = headers_with("authorization", &format!("Basic {encoded}"));
        let got = extract_secret(&headers, None, None, SECRET);
        assert_eq!(got.as_deref(), Some("user:pass"));
    }

    #[test]
    fn basic_header_empty_password_keeps_decoded_value() {
        let encoded = STANDARD.encode("user:");
        let headers = headers_with("authorization", &format!("Basic {encoded}"));
        let got = extract_secret(&headers, None, None, SECRET);
        assert_eq!(got.as_deref(), Some("user:"));
    }

    #[test]
    fn basic_header_decode_failure_falls_back_to_raw() {
        let headers = headers_with("authorization", "Basic %%%not-base64%%%");
        let got = extract_secret(&headers, None, None, SECRET);
        assert_eq!(got.as_deref(), Some("%%%not-base64%%%"));
    }

    #[test]
    fn non_basic_authorization_is_ignored() {
        let headers = headers_with("authorization", "Bearer sometoken");
        let got = extract_secret(&headers, None, None, SECRET);
        assert_eq!(got, None);
    }

    #[test]
    fn custom_header_is_second_in_line() {
        let headers = headers_with("x-webhook-secret", SECRET);
        let got = extract_secret(&headers, Some("query-secret"), Some("body-secret"), SECRET);
        assert_eq!(got.as_deref(), Some(SECRET));
    }

    #[test]
    fn basic_candidate_shadows_other_channels() {
        // a wrong Basic candidate still wins the chain, the 403 happens later
        let encoded = STANDARD.encode("wrong:secret");
        let mut headers = headers_with("authorization", &format!("Basic {encoded}"));
        headers.insert("x-webhook-secret", HeaderValue::from_str(SECRET).unwrap());
        let got = extract_secret(&headers, Some(SECRET), Some(SECRET), SECRET);
        assert_eq!(got.as_deref(), Some("wrong:secret"));
    }

    #[test]
    fn query_beats_body() {
        let headers = HeaderMap::new();
        let got = extract_secret(&headers, Some("from-query"), Some("from-body"), SECRET);
        assert_eq!(got.as_deref(), Some("from-query"));
    }

    #[test]
    fn empty_candidates_are_skipped() {
        let headers = HeaderMap::new();
        let got = extract_secret(&headers, Some(""), Some("from-body"), SECRET);
        assert_eq!(got.as_deref(), Some("from-body"));
    }

    #[test]
    fn no_candidates_yields_none() {
        let headers = HeaderMap::new();
        assert_eq!(extract_secret(&headers, None, None, SECRET), None);
    }
}
