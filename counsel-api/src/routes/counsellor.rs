//! Counsellor REST API Routes
//!
//! Registration with assignment slots, profile reads, full assignment-list
//! replacement, and guarded deletion.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use counsel_core::{new_entity_id, Counsellor, Role};
use counsel_storage::Storage;

use crate::{
    error::{ApiError, ApiResult},
    middleware::AuthExtractor,
    services::assignment::validate_assignment_specs,
    state::AppState,
    types::{
        CounsellorResponse, EditAssignmentsRequest, ListCounsellorsResponse,
        RegisterCounsellorRequest, SlotResponse,
    },
    validation::ValidateNonEmpty,
};

// ============================================================================
// ROUTE HANDLERS
// ============================================================================

/// POST /api/v1/counsellors - Register a counsellor with assignment slots
#[utoipa::path(
    post,
    path = "/api/v1/counsellors",
    tag = "Counsellors",
    request_body = RegisterCounsellorRequest,
    responses(
        (status = 201, description = "Counsellor registered", body = CounsellorResponse),
        (status = 400, description = "Invalid request", body = ApiError),
        (status = 409, description = "Duplicate slot in submission", body = ApiError),
        (status = 401, description = "Unauthorized", body = ApiError),
    ),
    security(
        ("api_key" = []),
        ("bearer_auth" = [])
    )
)]
pub async fn register_counsellor(
    State(storage): State<Arc<dyn Storage>>,
    AuthExtractor(auth): AuthExtractor,
    Json(req): Json<RegisterCounsellorRequest>,
) -> ApiResult<impl IntoResponse> {
    auth.require_role(&[Role::Admin])?;
    req.name.validate_non_empty("name")?;
    req.email.validate_non_empty("email")?;

    let specs = validate_assignment_specs(&req.assignments)?;

    let now = chrono::Utc::now();
    let counsellor = Counsellor {
        counsellor_id: new_entity_id(),
        name: req.name,
        email: req.email,
        phone: req.phone,
        department: req.department,
        created_at: now,
        updated_at: now,
    };

    let slots = storage.counsellor_register(&counsellor, &specs).await?;
    tracing::info!(
        counsellor = %counsellor.name,
        slots = slots.len(),
        "Counsellor registered"
    );

    let response = CounsellorResponse::from(counsellor).with_slots(slots);
    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /api/v1/counsellors - List all counsellors
#[utoipa::path(
    get,
    path = "/api/v1/counsellors",
    tag = "Counsellors",
    responses(
        (status = 200, description = "List of counsellors", body = ListCounsellorsResponse),
        (status = 401, description = "Unauthorized", body = ApiError),
    ),
    security(
        ("api_key" = []),
        ("bearer_auth" = [])
    )
)]
pub async fn list_counsellors(
    State(storage): State<Arc<dyn Storage>>,
    AuthExtractor(_auth): AuthExtractor,
) -> ApiResult<Json<ListCounsellorsResponse>> {
    let counsellors = storage.counsellor_list().await?;
    let total = counsellors.len() as i32;

    Ok(Json(ListCounsellorsResponse {
        counsellors: counsellors
            .into_iter()
            .map(CounsellorResponse::from)
            .collect(),
        total,
    }))
}

/// GET /api/v1/counsellors/{id} - Get a counsellor with their slots
#[utoipa::path(
    get,
    path = "/api/v1/counsellors/{id}",
    tag = "Counsellors",
    params(
        ("id" = Uuid, Path, description = "Counsellor ID")
    ),
    responses(
        (status = 200, description = "Counsellor details", body = CounsellorResponse),
        (status = 404, description = "Counsellor not found", body = ApiError),
        (status = 401, description = "Unauthorized", body = ApiError),
    ),
    security(
        ("api_key" = []),
        ("bearer_auth" = [])
    )
)]
pub async fn get_counsellor(
    State(storage): State<Arc<dyn Storage>>,
    AuthExtractor(_auth): AuthExtractor,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<CounsellorResponse>> {
    let counsellor = storage
        .counsellor_get(id)
        .await?
        .ok_or_else(|| ApiError::counsellor_not_found(id))?;
    let slots = storage.slot_list_by_counsellor(id).await?;

    Ok(Json(CounsellorResponse::from(counsellor).with_slots(slots)))
}

/// GET /api/v1/counsellors/{id}/slots - List a counsellor's slots
#[utoipa::path(
    get,
    path = "/api/v1/counsellors/{id}/slots",
    tag = "Counsellors",
    params(
        ("id" = Uuid, Path, description = "Counsellor ID")
    ),
    responses(
        (status = 200, description = "Assignment slots", body = [SlotResponse]),
        (status = 404, description = "Counsellor not found", body = ApiError),
        (status = 401, description = "Unauthorized", body = ApiError),
    ),
    security(
        ("api_key" = []),
        ("bearer_auth" = [])
    )
)]
pub async fn list_counsellor_slots(
    State(storage): State<Arc<dyn Storage>>,
    AuthExtractor(_auth): AuthExtractor,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<SlotResponse>>> {
    storage
        .counsellor_get(id)
        .await?
        .ok_or_else(|| ApiError::counsellor_not_found(id))?;

    let slots = storage.slot_list_by_counsellor(id).await?;
    Ok(Json(slots.into_iter().map(SlotResponse::from).collect()))
}

/// PUT /api/v1/counsellors/{id}/assignments - Replace the assignment list
#[utoipa::path(
    put,
    path = "/api/v1/counsellors/{id}/assignments",
    tag = "Counsellors",
    params(
        ("id" = Uuid, Path, description = "Counsellor ID")
    ),
    request_body = EditAssignmentsRequest,
    responses(
        (status = 200, description = "Assignments replaced", body = [SlotResponse]),
        (status = 404, description = "Counsellor not found", body = ApiError),
        (status = 409, description = "Occupied slot removed or duplicate tuple", body = ApiError),
        (status = 401, description = "Unauthorized", body = ApiError),
    ),
    security(
        ("api_key" = []),
        ("bearer_auth" = [])
    )
)]
pub async fn edit_assignments(
    State(storage): State<Arc<dyn Storage>>,
    AuthExtractor(auth): AuthExtractor,
    Path(id): Path<Uuid>,
    Json(req): Json<EditAssignmentsRequest>,
) -> ApiResult<Json<Vec<SlotResponse>>> {
    auth.require_role(&[Role::Admin])?;

    let specs = validate_assignment_specs(&req.assignments)?;
    let slots = storage.replace_assignments(id, &specs).await?;
    tracing::info!(counsellor_id = %id, slots = slots.len(), "Assignments replaced");

    Ok(Json(slots.into_iter().map(SlotResponse::from).collect()))
}

/// DELETE /api/v1/counsellors/{id} - Delete a counsellor and their slots
#[utoipa::path(
    delete,
    path = "/api/v1/counsellors/{id}",
    tag = "Counsellors",
    params(
        ("id" = Uuid, Path, description = "Counsellor ID")
    ),
    responses(
        (status = 204, description = "Counsellor deleted"),
        (status = 404, description = "Counsellor not found", body = ApiError),
        (status = 409, description = "Students still bound", body = ApiError),
        (status = 401, description = "Unauthorized", body = ApiError),
    ),
    security(
        ("api_key" = []),
        ("bearer_auth" = [])
    )
)]
pub async fn delete_counsellor(
    State(storage): State<Arc<dyn Storage>>,
    AuthExtractor(auth): AuthExtractor,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    auth.require_role(&[Role::Admin])?;

    storage.counsellor_delete(id).await?;
    tracing::info!(counsellor_id = %id, "Counsellor deleted");

    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// ROUTER SETUP
// ============================================================================

/// Create the counsellor routes router.
pub fn create_router(state: AppState) -> axum::Router {
    axum::Router::new()
        .route(
            "/",
            axum::routing::post(register_counsellor).get(list_counsellors),
        )
        .route(
            "/:id",
            axum::routing::get(get_counsellor).delete(delete_counsellor),
        )
        .route("/:id/slots", axum::routing::get(list_counsellor_slots))
        .route("/:id/assignments", axum::routing::put(edit_assignments))
        .with_state(state)
}
