//! Counselling-Session REST API Routes
//!
//! Session records plus the draft endpoint that feeds the autosave worker.
//! PATCH is the durable save; POST /{id}/draft queues a debounced save and
//! returns immediately.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

use counsel_core::{new_entity_id, CounsellingSession, Role};
use counsel_storage::{SessionUpdate, Storage};

use crate::{
    error::{ApiError, ApiResult},
    jobs::autosave::AutosaveRequest,
    middleware::AuthExtractor,
    state::AppState,
    types::{
        session::ListSessionsQuery, CreateSessionRequest, ListSessionsResponse, SessionResponse,
        UpdateSessionRequest,
    },
    validation::{HasUpdates, ValidateNonEmpty},
};

impl HasUpdates for UpdateSessionRequest {
    fn has_any_updates(&self) -> bool {
        self.held_at.is_some() || self.summary.is_some() || self.follow_up.is_some()
    }
}

// ============================================================================
// ROUTE HANDLERS
// ============================================================================

/// POST /api/v1/sessions - Record a counselling session
#[utoipa::path(
    post,
    path = "/api/v1/sessions",
    tag = "Sessions",
    request_body = CreateSessionRequest,
    responses(
        (status = 201, description = "Session recorded", body = SessionResponse),
        (status = 400, description = "Invalid request", body = ApiError),
        (status = 404, description = "Counsellor or student not found", body = ApiError),
        (status = 401, description = "Unauthorized", body = ApiError),
    ),
    security(
        ("api_key" = []),
        ("bearer_auth" = [])
    )
)]
pub async fn create_session(
    State(storage): State<Arc<dyn Storage>>,
    AuthExtractor(auth): AuthExtractor,
    Json(req): Json<CreateSessionRequest>,
) -> ApiResult<impl IntoResponse> {
    auth.require_role(&[Role::Admin, Role::Counsellor])?;
    req.summary.validate_non_empty("summary")?;

    // Both parties must exist before a session can reference them.
    storage
        .counsellor_get(req.counsellor_id)
        .await?
        .ok_or_else(|| ApiError::counsellor_not_found(req.counsellor_id))?;
    storage
        .student_get(req.student_id)
        .await?
        .ok_or_else(|| ApiError::student_not_found(req.student_id))?;

    let now = chrono::Utc::now();
    let session = CounsellingSession {
        session_id: new_entity_id(),
        counsellor_id: req.counsellor_id,
        student_id: req.student_id,
        held_at: req.held_at,
        summary: req.summary,
        follow_up: req.follow_up,
        created_at: now,
        updated_at: now,
    };

    storage.session_insert(&session).await?;
    tracing::info!(session_id = %session.session_id, "Session recorded");

    Ok((StatusCode::CREATED, Json(SessionResponse::from(session))))
}

/// GET /api/v1/sessions - List sessions by student or counsellor
#[utoipa::path(
    get,
    path = "/api/v1/sessions",
    tag = "Sessions",
    params(
        ("student_id" = Option<Uuid>, Query, description = "Filter by student"),
        ("counsellor_id" = Option<Uuid>, Query, description = "Filter by counsellor"),
    ),
    responses(
        (status = 200, description = "Matching sessions, newest first", body = ListSessionsResponse),
        (status = 400, description = "Neither filter given", body = ApiError),
        (status = 401, description = "Unauthorized", body = ApiError),
    ),
    security(
        ("api_key" = []),
        ("bearer_auth" = [])
    )
)]
pub async fn list_sessions(
    State(storage): State<Arc<dyn Storage>>,
    AuthExtractor(auth): AuthExtractor,
    Query(query): Query<ListSessionsQuery>,
) -> ApiResult<Json<ListSessionsResponse>> {
    if auth.role == Role::Student {
        // Students see only their own history.
        match query.student_id {
            Some(id) if auth.may_act_for_student(id) => {}
            _ => {
                return Err(ApiError::forbidden(
                    "Students may only list their own sessions",
                ))
            }
        }
    }

    let sessions = match (query.student_id, query.counsellor_id) {
        (Some(student_id), _) => storage.session_list_by_student(student_id).await?,
        (None, Some(counsellor_id)) => {
            storage
                .session_list_by_counsellor(counsellor_id)
                .await?
        }
        (None, None) => {
            return Err(ApiError::invalid_input(
                "Provide student_id or counsellor_id",
            ))
        }
    };

    let total = sessions.len() as i32;
    Ok(Json(ListSessionsResponse {
        sessions: sessions.into_iter().map(SessionResponse::from).collect(),
        total,
    }))
}

/// GET /api/v1/sessions/{id} - Get a session by ID
#[utoipa::path(
    get,
    path = "/api/v1/sessions/{id}",
    tag = "Sessions",
    params(
        ("id" = Uuid, Path, description = "Session ID")
    ),
    responses(
        (status = 200, description = "Session details", body = SessionResponse),
        (status = 404, description = "Session not found", body = ApiError),
        (status = 401, description = "Unauthorized", body = ApiError),
    ),
    security(
        ("api_key" = []),
        ("bearer_auth" = [])
    )
)]
pub async fn get_session(
    State(storage): State<Arc<dyn Storage>>,
    AuthExtractor(auth): AuthExtractor,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<SessionResponse>> {
    let session = storage
        .session_get(id)
        .await?
        .ok_or_else(|| ApiError::session_not_found(id))?;

    if auth.role == Role::Student && !auth.may_act_for_student(session.student_id) {
        return Err(ApiError::forbidden(
            "Students may only view their own sessions",
        ));
    }

    Ok(Json(session.into()))
}

/// PATCH /api/v1/sessions/{id} - Update a session (durable save)
#[utoipa::path(
    patch,
    path = "/api/v1/sessions/{id}",
    tag = "Sessions",
    params(
        ("id" = Uuid, Path, description = "Session ID")
    ),
    request_body = UpdateSessionRequest,
    responses(
        (status = 200, description = "Session updated", body = SessionResponse),
        (status = 400, description = "No fields to update", body = ApiError),
        (status = 404, description = "Session not found", body = ApiError),
        (status = 401, description = "Unauthorized", body = ApiError),
    ),
    security(
        ("api_key" = []),
        ("bearer_auth" = [])
    )
)]
pub async fn update_session(
    State(storage): State<Arc<dyn Storage>>,
    AuthExtractor(auth): AuthExtractor,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateSessionRequest>,
) -> ApiResult<Json<SessionResponse>> {
    auth.require_role(&[Role::Admin, Role::Counsellor])?;
    req.validate_has_updates()?;

    let update = SessionUpdate {
        held_at: req.held_at,
        summary: req.summary,
        follow_up: req.follow_up,
    };
    let session = storage.session_update(id, update).await?;

    Ok(Json(session.into()))
}

/// POST /api/v1/sessions/{id}/draft - Queue a debounced autosave
///
/// Accepts the draft and returns 202 immediately; the autosave worker
/// persists it once it has been stable for the debounce window. Not a
/// durability guarantee; clients still PATCH on explicit save.
#[utoipa::path(
    post,
    path = "/api/v1/sessions/{id}/draft",
    tag = "Sessions",
    params(
        ("id" = Uuid, Path, description = "Session ID")
    ),
    request_body = UpdateSessionRequest,
    responses(
        (status = 202, description = "Draft queued"),
        (status = 404, description = "Session not found", body = ApiError),
        (status = 503, description = "Autosave worker unavailable", body = ApiError),
        (status = 401, description = "Unauthorized", body = ApiError),
    ),
    security(
        ("api_key" = []),
        ("bearer_auth" = [])
    )
)]
pub async fn draft_session(
    State(storage): State<Arc<dyn Storage>>,
    State(autosave_tx): State<mpsc::Sender<AutosaveRequest>>,
    AuthExtractor(auth): AuthExtractor,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateSessionRequest>,
) -> ApiResult<StatusCode> {
    auth.require_role(&[Role::Admin, Role::Counsellor])?;
    req.validate_has_updates()?;

    storage
        .session_get(id)
        .await?
        .ok_or_else(|| ApiError::session_not_found(id))?;

    let request = AutosaveRequest {
        session_id: id,
        update: SessionUpdate {
            held_at: req.held_at,
            summary: req.summary,
            follow_up: req.follow_up,
        },
    };

    autosave_tx.try_send(request).map_err(|e| {
        tracing::warn!(session_id = %id, error = %e, "Autosave queue rejected draft");
        ApiError::new(
            crate::error::ErrorCode::ServiceUnavailable,
            "Autosave is not accepting drafts right now",
        )
    })?;

    Ok(StatusCode::ACCEPTED)
}

// ============================================================================
// ROUTER SETUP
// ============================================================================

/// Create the session routes router.
pub fn create_router(state: AppState) -> axum::Router {
    axum::Router::new()
        .route(
            "/",
            axum::routing::post(create_session).get(list_sessions),
        )
        .route(
            "/:id",
            axum::routing::get(get_session).patch(update_session),
        )
        .route("/:id/draft", axum::routing::post(draft_session))
        .with_state(state)
}
