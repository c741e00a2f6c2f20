//! Request metadata extraction

use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;

use crate::domain::gateway::RequestMeta;

/// Pulls the admission inputs out of the request headers: the bearer
/// credential from `Authorization: Bearer` or `x-api-key`, and the caller IP
/// hints from `x-forwarded-for` / `x-real-ip`.
pub fn request_meta(headers: &HeaderMap) -> RequestMeta {
    RequestMeta {
        bearer: extract_bearer(headers),
        forwarded_for: header_string(headers, "x-forwarded-for"),
        real_ip: header_string(headers, "x-real-ip"),
    }
}

fn extract_bearer(headers: &HeaderMap) -> Option<String> {
    if let Some(auth) = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        if let Some(token) = auth.strip_prefix("Bearer ") {
            let token = token.trim();
            if !token.is_empty() {
                return Some(token.to_string());
            }
        }
    }

    header_string(headers, "x-api-key")
}

fn header_string(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .filter(|s| !s.is_empty())
}
