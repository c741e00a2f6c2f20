//! Rendering gateway replies onto the wire
//!
//! Success data is returned as the JSON body verbatim; failures use the
//! standard error envelope. Rate-limit headers computed by the gateway are
//! merged onto both.

use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::api::types::ApiError;
use crate::infrastructure::gateway::{GatewayReply, RateLimitHeaders};

fn rate_limit_header_map(headers: &RateLimitHeaders) -> HeaderMap {
    let mut map = HeaderMap::with_capacity(headers.len());

    for (name, value) in headers.iter() {
        // Names are static constants and values are rendered integers or
        // validated resource paths; both are valid header material.
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            map.insert(name, value);
        }
    }

    map
}

impl IntoResponse for GatewayReply {
    fn into_response(self) -> Response {
        match self {
            Self::Success {
                status,
                data,
                headers,
            } => {
                let status = StatusCode::from_u16(status).unwrap_or(StatusCode::OK);
                (status, rate_limit_header_map(&headers), Json(data)).into_response()
            }
            Self::Failure {
                status,
                error,
                headers,
            } => {
                let map = rate_limit_header_map(&headers);
                let api_error = ApiError::from_status(status, error);
                (map, api_error).into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entitlement::ResourcePath;
    use crate::infrastructure::gateway::headers;

    #[test]
    fn test_success_reply_carries_headers() {
        let reply = GatewayReply::Success {
            status: 200,
            data: serde_json::json!({"ok": true}),
            headers: RateLimitHeaders::resource_only(
                &ResourcePath::new("search.text").unwrap(),
            ),
        };

        let response = reply.into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(headers::RESOURCE).unwrap(),
            "search.text"
        );
    }

    #[test]
    fn test_failure_reply_renders_error_envelope() {
        let reply = GatewayReply::Failure {
            status: 429,
            error: "Rate limit exceeded".to_string(),
            headers: RateLimitHeaders::resource_only(&ResourcePath::new("x").unwrap())
                .with_retry_after(60),
        };

        let response = reply.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers().get(headers::RETRY_AFTER).unwrap(), "60");
    }
}
