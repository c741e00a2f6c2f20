//! Gated v1 endpoints
//!
//! Each handler runs behind the admission gateway; the handler body only
//! executes once credentials, entitlements and limits have all passed.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;

use crate::infrastructure::gateway::HandlerReply;

use super::extract::request_meta;
use super::state::AppState;

pub fn create_v1_router() -> Router<AppState> {
    Router::new()
        .route("/search/text", post(text_search))
        .route("/reports/export", post(report_export))
}

#[derive(Debug, Deserialize)]
struct SearchRequest {
    query: String,
    #[serde(default)]
    limit: Option<u32>,
}

async fn text_search(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<SearchRequest>,
) -> Response {
    let meta = request_meta(&headers);

    state
        .gateway
        .invoke(&state.routes.text_search, &meta, |context| async move {
            if request.query.trim().is_empty() {
                return Ok(HandlerReply::error("Query must not be empty"));
            }

            Ok(HandlerReply::data(json!({
                "query": request.query,
                "limit": request.limit.unwrap_or(10),
                "results": [],
                "resource": context.entitlement.resource.as_str(),
            })))
        })
        .await
        .into_response()
}

#[derive(Debug, Deserialize)]
struct ExportRequest {
    report_id: String,
}

async fn report_export(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ExportRequest>,
) -> Response {
    let meta = request_meta(&headers);

    state
        .gateway
        .invoke(&state.routes.report_export, &meta, |context| async move {
            Ok(HandlerReply::data_with_status(
                202,
                json!({
                    "report_id": request.report_id,
                    "status": "queued",
                    "owner": context.identity.bucket_id(),
                }),
            ))
        })
        .await
        .into_response()
}
