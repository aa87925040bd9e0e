use std::sync::Arc;
use std::time::Instant;

use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequestParts, Query, State};
use axum::http::request::Parts;
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router, async_trait};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tokio::task::JoinError;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::bulk::BulkDelete;
use crate::construct::{Contact, TenantId};
use crate::error::{LeadsiftError, Result};
use crate::filter::{FilterPolicy, FilterState, RawFilterState};
use crate::interface::ContactInterface;

/// Set by the authentication layer in front of this service. The value is
/// opaque to us, it only has to be printable and reasonably short.
pub const TENANT_HEADER: &str = "x-organization-id";

lazy_static! {
    static ref TENANT_PATTERN: Regex =
        Regex::new(r"^[[:print:]]{1,128}$").expect("tenant pattern compiles");
}

#[derive(Clone)]
pub struct AppState {
    interface: Arc<ContactInterface>,
    expose_details: bool,
}

#[derive(Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub filters: Option<String>,
    #[serde(default, alias = "searchTerm")]
    pub search: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkDeleteBody {
    pub contact_ids: Option<Vec<String>>,
    pub is_select_all_matching_active: Option<bool>,
    pub filter_state: Option<RawFilterState>,
    pub search_term: Option<String>,
    pub force: Option<bool>,
}
impl BulkDeleteBody {
    /// Validates the body into a coordinator request.
    pub fn into_request(self, policy: FilterPolicy) -> Result<BulkDelete> {
        let force = self.force.unwrap_or(false);
        if self.is_select_all_matching_active == Some(true) {
            let filter = self
                .filter_state
                .map(|raw| FilterState::from_wire(raw, policy))
                .transpose()?;
            return Ok(BulkDelete::matching(filter, self.search_term, force));
        }
        match self.contact_ids {
            Some(ids) if !ids.is_empty() => Ok(BulkDelete::explicit(ids, force)),
            _ => Err(LeadsiftError::Validation(
                "contactIds must be a non-empty array unless isSelectAllMatchingActive is true"
                    .to_string(),
            )),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkDeleteResponse {
    pub message: String,
    pub deleted_count: usize,
    pub invalid_count: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub error: String,
    pub code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_ids: Option<Vec<String>>,
    // developer facing, only filled in when enabled in the settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// A [`LeadsiftError`] on its way out of a handler.
#[derive(Debug)]
pub struct ApiError {
    error: LeadsiftError,
    expose_details: bool,
}
impl ApiError {
    pub fn new(error: LeadsiftError, expose_details: bool) -> Self {
        Self {
            error,
            expose_details,
        }
    }
}

pub fn status_of(error: &LeadsiftError) -> StatusCode {
    match error {
        LeadsiftError::Validation(_)
        | LeadsiftError::DependencyConflict { .. }
        | LeadsiftError::ConstraintViolation(_) => StatusCode::BAD_REQUEST,
        LeadsiftError::Unauthenticated => StatusCode::UNAUTHORIZED,
        LeadsiftError::NotFound(_) => StatusCode::NOT_FOUND,
        LeadsiftError::Config(_) | LeadsiftError::Store(_) | LeadsiftError::Lock(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_of(&self.error);
        let code = self.error.code();
        let body = if self.error.is_client_error() {
            warn!(%code, status = %status.as_u16(), error = %self.error, "request rejected");
            let contact_ids = match &self.error {
                LeadsiftError::DependencyConflict { contact_ids } => Some(contact_ids.clone()),
                _ => None,
            };
            ErrorBody {
                error: self.error.to_string(),
                code,
                contact_ids,
                details: None,
            }
        } else {
            error!(%code, error = %self.error, "request failed");
            ErrorBody {
                error: "Internal server error".to_string(),
                code,
                contact_ids: None,
                details: self.expose_details.then(|| self.error.to_string()),
            }
        };
        (status, Json(body)).into_response()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for TenantId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        parts
            .headers
            .get(TENANT_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| TENANT_PATTERN.is_match(value))
            .map(TenantId::new)
            .ok_or_else(|| ApiError::new(LeadsiftError::Unauthenticated, false))
    }
}

pub fn router(interface: Arc<ContactInterface>, expose_details: bool) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);
    let state = AppState {
        interface,
        expose_details,
    };
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/v1/contacts", get(list_contacts))
        .route("/v1/contacts/bulk-delete", post(bulk_delete))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn list_contacts(
    State(state): State<AppState>,
    tenant: TenantId,
    Query(params): Query<ListParams>,
) -> std::result::Result<Json<Vec<Contact>>, ApiError> {
    let started = Instant::now();
    let expose = state.expose_details;
    let iface = Arc::clone(&state.interface);
    // The store is synchronous, so we run on a blocking thread.
    let contacts = joined(
        tokio::task::spawn_blocking(move || {
            let filter = iface.parse_filters(params.filters.as_deref())?;
            iface.list(&tenant, filter.as_ref(), params.search.as_deref())
        })
        .await,
    )
    .map_err(|e| ApiError::new(e, expose))?;
    let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
    info!(ms = elapsed_ms, rows = contacts.len(), "list complete");
    Ok(Json(contacts))
}

async fn bulk_delete(
    State(state): State<AppState>,
    tenant: TenantId,
    body: std::result::Result<Json<BulkDeleteBody>, JsonRejection>,
) -> std::result::Result<Json<BulkDeleteResponse>, ApiError> {
    let started = Instant::now();
    let expose = state.expose_details;
    let Json(body) = body.map_err(|e| {
        ApiError::new(LeadsiftError::Validation(e.body_text()), expose)
    })?;
    let request = body
        .into_request(state.interface.policy())
        .map_err(|e| ApiError::new(e, expose))?;
    let iface = Arc::clone(&state.interface);
    let outcome = joined(
        tokio::task::spawn_blocking(move || iface.bulk_delete(&tenant, request)).await,
    )
    .map_err(|e| ApiError::new(e, expose))?;
    let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
    info!(
        ms = elapsed_ms,
        deleted = outcome.deleted_count,
        invalid = outcome.invalid_count,
        "bulk delete complete"
    );
    Ok(Json(BulkDeleteResponse {
        message: format!("Successfully deleted {} contacts", outcome.deleted_count),
        deleted_count: outcome.deleted_count,
        invalid_count: outcome.invalid_count,
    }))
}

fn joined<T>(result: std::result::Result<Result<T>, JoinError>) -> Result<T> {
    result.map_err(|e| {
        warn!(error = %e, "Join error");
        LeadsiftError::Store("worker task failed".to_string())
    })?
}
