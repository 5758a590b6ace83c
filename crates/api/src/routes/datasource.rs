//! Data source routes
//!
//! The four verbs external clients use to inspect and mutate the source
//! set. Mutation is asynchronous: `add_source` answers 202 once the open is
//! underway; the outcome shows up in subsequent snapshots.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use aircap_datasource::{DriverInfo, OpenHandle, SourceStatus};

use crate::error::ApiError;
use crate::state::AppState;

// =============================================================================
// Request / response types
// =============================================================================

/// Form body of `POST /datasource/add_source`
#[derive(Debug, Deserialize)]
pub struct AddSourceForm {
    /// Source definition string (`name:type=...,key=value,...`)
    pub source: String,
}

/// Form body of `POST /datasource/remove_source`
#[derive(Debug, Deserialize)]
pub struct RemoveSourceForm {
    /// UUID of the source to remove
    pub uuid: String,
}

/// Response to a successful `add_source`
#[derive(Debug, Serialize)]
pub struct AddSourceResponse {
    /// "pending" for direct opens, "probing" while a race resolves
    pub status: &'static str,

    /// UUID of the instantiated source, when one exists already
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uuid: Option<Uuid>,

    /// Echo of the submitted definition
    pub source: String,
}

/// Response to a successful `remove_source`
#[derive(Debug, Serialize)]
pub struct RemoveSourceResponse {
    /// UUID that was removed
    pub uuid: Uuid,
}

// =============================================================================
// Routes
// =============================================================================

/// Data source routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/datasource/all_sources", get(all_sources_handler))
        .route("/datasource/types", get(types_handler))
        .route("/datasource/add_source", post(add_source_handler))
        .route("/datasource/remove_source", post(remove_source_handler))
}

// =============================================================================
// Handlers
// =============================================================================

/// Snapshot of active and failed sources
///
/// GET /datasource/all_sources
async fn all_sources_handler(State(state): State<AppState>) -> Json<Vec<SourceStatus>> {
    Json(state.tracker.status_snapshot())
}

/// Registered driver summaries
///
/// GET /datasource/types
async fn types_handler(State(state): State<AppState>) -> Json<Vec<DriverInfo>> {
    Json(state.tracker.driver_infos())
}

/// Open a source from a definition string
///
/// POST /datasource/add_source, form field `source`
///
/// Returns 202 with a handle; opening completes asynchronously. Malformed
/// definitions and unknown types answer 400.
async fn add_source_handler(
    State(state): State<AppState>,
    Form(form): Form<AddSourceForm>,
) -> Result<(StatusCode, Json<AddSourceResponse>), ApiError> {
    tracing::debug!(source = %form.source, "add_source request");

    let response = match state.tracker.open_source(&form.source)? {
        OpenHandle::Source(uuid) => AddSourceResponse {
            status: "pending",
            uuid: Some(uuid),
            source: form.source,
        },
        OpenHandle::Probing => AddSourceResponse {
            status: "probing",
            uuid: None,
            source: form.source,
        },
    };

    Ok((StatusCode::ACCEPTED, Json(response)))
}

/// Remove a source by UUID
///
/// POST /datasource/remove_source, form field `uuid`
///
/// Returns 200 on removal, 404 for unknown UUIDs, 400 for non-UUID input.
async fn remove_source_handler(
    State(state): State<AppState>,
    Form(form): Form<RemoveSourceForm>,
) -> Result<Json<RemoveSourceResponse>, ApiError> {
    let uuid = Uuid::parse_str(form.uuid.trim())
        .map_err(|_| ApiError::InvalidUuid(form.uuid.clone()))?;

    tracing::debug!(source = %uuid, "remove_source request");

    if !state.tracker.remove_source(uuid) {
        return Err(ApiError::UnknownSource(uuid));
    }

    Ok(Json(RemoveSourceResponse { uuid }))
}
