//! HTTP handlers
//!
//! Two groups: the publish callbacks called by the ingest server, and the
//! JSON reads used by the stream pages.

use axum::extract::{Form, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};

use crate::registry::{StreamEntry, StreamOptions, StreamSummary, Unregistered};
use crate::server::state::AppState;

/// Fields sent by the ingest server when a publisher starts
#[derive(Debug, Default, Deserialize)]
pub struct PublishForm {
    pub name: Option<String>,
    pub password: Option<String>,
    pub description: Option<String>,
    pub unlisted: Option<String>,
}

/// Fields sent by the ingest server when a publisher stops
#[derive(Debug, Default, Deserialize)]
pub struct PublishDoneForm {
    pub name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PublishResponse {
    pub key: String,
    pub accepted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Detail view of one stream key
#[derive(Debug, Serialize, Deserialize)]
pub struct StreamDetails {
    pub key: String,
    pub description: Option<String>,
    pub unlisted: bool,
    pub protected: bool,
    pub active: bool,
    pub live_for_secs: Option<u64>,
    pub offline_for_secs: Option<u64>,
    pub viewers: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PageConfig {
    pub page_title: String,
    pub hls_path: String,
}

/// Treat blank form fields as absent
fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn is_truthy(value: Option<&str>) -> bool {
    matches!(
        value.map(|v| v.trim().to_ascii_lowercase()).as_deref(),
        Some("1" | "true" | "yes" | "on")
    )
}

fn bad_request(message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}

/// Publish started: 201 if admitted, 409 if refused
pub async fn on_publish(State(state): State<AppState>, Form(form): Form<PublishForm>) -> Response {
    let Some(key) = non_blank(form.name) else {
        tracing::warn!("Publish callback without stream name");
        return bad_request("missing stream name");
    };

    let options = StreamOptions {
        password: non_blank(form.password),
        description: non_blank(form.description),
        unlisted: is_truthy(form.unlisted.as_deref()),
        protected: false,
    };

    match state
        .registry
        .register(StreamEntry::new(key.clone(), options))
        .await
    {
        Ok(()) => (
            StatusCode::CREATED,
            Json(PublishResponse {
                key,
                accepted: true,
                reason: None,
            }),
        )
            .into_response(),
        Err(e) => {
            tracing::info!(stream = %key, reason = e.reason(), "Publish refused");
            (
                StatusCode::CONFLICT,
                Json(PublishResponse {
                    key,
                    accepted: false,
                    reason: Some(e.reason().to_string()),
                }),
            )
                .into_response()
        }
    }
}

/// Publish stopped: always 200 once a name is given
pub async fn on_publish_done(
    State(state): State<AppState>,
    Form(form): Form<PublishDoneForm>,
) -> Response {
    let Some(key) = non_blank(form.name) else {
        tracing::warn!("Publish-done callback without stream name");
        return bad_request("missing stream name");
    };

    if state.registry.unregister(&key).await == Unregistered::Removed {
        state.viewers.reset(&key).await;
    }

    StatusCode::OK.into_response()
}

/// Listed streams
pub async fn list_streams(State(state): State<AppState>) -> Json<Vec<StreamSummary>> {
    let list = state.registry.snapshot().await;
    tracing::debug!(streams = list.len(), "Listing streams");
    Json(list)
}

/// One stream by key, listed or not
pub async fn get_stream(State(state): State<AppState>, Path(key): Path<String>) -> Response {
    let Some(entry) = state.registry.get(&key).await else {
        return (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "no such stream".to_string(),
            }),
        )
            .into_response();
    };

    let details = StreamDetails {
        key: entry.key().to_string(),
        description: entry.description().map(str::to_string),
        unlisted: entry.is_unlisted(),
        protected: entry.is_protected(),
        active: entry.is_active(),
        live_for_secs: entry.time_active().map(|d| d.as_secs()),
        offline_for_secs: entry.time_inactive().map(|d| d.as_secs()),
        viewers: state.viewers.count(&key).await,
    };

    Json(details).into_response()
}

/// Settings the page renderer needs
pub async fn get_config(State(state): State<AppState>) -> Json<PageConfig> {
    let application = &state.config.application;
    Json(PageConfig {
        page_title: application.page_title.clone(),
        hls_path: application.hls_path.trim_end_matches('/').to_string(),
    })
}
