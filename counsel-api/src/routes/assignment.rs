//! Assignment REST API Routes
//!
//! The update-semester flow: query the slots matching a student's tuple,
//! then bind to a chosen counsellor. The bind is transactional in storage;
//! these handlers validate the request shape and authorization only.

use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

use counsel_core::{Role, SlotKey};
use counsel_storage::Storage;

use crate::{
    error::{ApiError, ApiResult},
    middleware::AuthExtractor,
    services::assignment::validate_slot_key,
    state::AppState,
    types::{AvailableSlotResponse, BindStudentRequest, StudentResponse},
};

// ============================================================================
// ROUTE HANDLERS
// ============================================================================

/// GET /api/v1/assignments/available - Slots matching a full tuple
///
/// All four tuple fields are required; a missing one fails deserialization.
/// Full slots are included (flagged) and rows are sorted least-loaded first.
#[utoipa::path(
    get,
    path = "/api/v1/assignments/available",
    tag = "Assignments",
    params(
        ("year" = i16, Query, description = "Year of study (1-4)"),
        ("semester" = i16, Query, description = "Semester (1-2)"),
        ("branch" = String, Query, description = "Branch code, e.g. CSE"),
        ("section" = String, Query, description = "Section letter"),
    ),
    responses(
        (status = 200, description = "Matching slots, least loaded first", body = [AvailableSlotResponse]),
        (status = 400, description = "Invalid or incomplete tuple", body = ApiError),
        (status = 401, description = "Unauthorized", body = ApiError),
    ),
    security(
        ("api_key" = []),
        ("bearer_auth" = [])
    )
)]
pub async fn available_slots(
    State(storage): State<Arc<dyn Storage>>,
    AuthExtractor(_auth): AuthExtractor,
    Query(key): Query<SlotKey>,
) -> ApiResult<Json<Vec<AvailableSlotResponse>>> {
    validate_slot_key(&key)?;

    let rows = storage.slot_query(key).await?;
    Ok(Json(
        rows.into_iter()
            .map(|(slot, counsellor)| AvailableSlotResponse::from_pair(slot, counsellor))
            .collect(),
    ))
}

/// POST /api/v1/assignments/bind - Bind a student to a counsellor slot
#[utoipa::path(
    post,
    path = "/api/v1/assignments/bind",
    tag = "Assignments",
    request_body = BindStudentRequest,
    responses(
        (status = 200, description = "Student bound", body = StudentResponse),
        (status = 404, description = "Student, counsellor, or slot not found", body = ApiError),
        (status = 409, description = "Slot is at capacity", body = ApiError),
        (status = 401, description = "Unauthorized", body = ApiError),
    ),
    security(
        ("api_key" = []),
        ("bearer_auth" = [])
    )
)]
pub async fn bind_student(
    State(storage): State<Arc<dyn Storage>>,
    AuthExtractor(auth): AuthExtractor,
    Json(req): Json<BindStudentRequest>,
) -> ApiResult<Json<StudentResponse>> {
    if auth.role == Role::Counsellor {
        return Err(ApiError::forbidden(
            "Counsellors cannot bind students to slots",
        ));
    }
    if !auth.may_act_for_student(req.student_id) {
        return Err(ApiError::forbidden(
            "Students may only bind their own record",
        ));
    }

    let key: SlotKey = req.key();
    validate_slot_key(&key)?;

    let student = storage
        .bind_student(req.student_id, req.counsellor_id, key)
        .await?;
    tracing::info!(
        student_id = %req.student_id,
        counsellor_id = %req.counsellor_id,
        slot = %key,
        "Student bound"
    );

    Ok(Json(student.into()))
}

// ============================================================================
// ROUTER SETUP
// ============================================================================

/// Create the assignment routes router.
pub fn create_router(state: AppState) -> axum::Router {
    axum::Router::new()
        .route("/available", axum::routing::get(available_slots))
        .route("/bind", axum::routing::post(bind_student))
        .with_state(state)
}
