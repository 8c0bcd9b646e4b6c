//! Student REST API Routes
//!
//! CRUD for student records. Students are never deleted; their records back
//! the counselling-session history. The counsellor binding is read-only
//! here; it only changes through the assignment bind flow.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use counsel_core::{new_entity_id, Role, Student, StudentFilter};
use counsel_storage::{Storage, StudentUpdate};

use crate::{
    error::{ApiError, ApiResult},
    middleware::AuthExtractor,
    state::AppState,
    types::{
        CreateStudentRequest, ListStudentsQuery, ListStudentsResponse, StudentResponse,
        UpdateStudentRequest,
    },
    validation::{HasUpdates, ValidateNonEmpty, ValidateRange},
};

impl HasUpdates for UpdateStudentRequest {
    fn has_any_updates(&self) -> bool {
        self.name.is_some() || self.email.is_some()
    }
}

// ============================================================================
// ROUTE HANDLERS
// ============================================================================

/// POST /api/v1/students - Create a student record
#[utoipa::path(
    post,
    path = "/api/v1/students",
    tag = "Students",
    request_body = CreateStudentRequest,
    responses(
        (status = 201, description = "Student created", body = StudentResponse),
        (status = 400, description = "Invalid request", body = ApiError),
        (status = 409, description = "Roll number taken", body = ApiError),
        (status = 401, description = "Unauthorized", body = ApiError),
    ),
    security(
        ("api_key" = []),
        ("bearer_auth" = [])
    )
)]
pub async fn create_student(
    State(storage): State<Arc<dyn Storage>>,
    AuthExtractor(auth): AuthExtractor,
    Json(req): Json<CreateStudentRequest>,
) -> ApiResult<impl IntoResponse> {
    auth.require_role(&[Role::Admin])?;
    req.roll_no.validate_non_empty("roll_no")?;
    req.name.validate_non_empty("name")?;
    req.email.validate_non_empty("email")?;
    req.year.validate_range("year", 1, 4)?;
    req.semester.validate_range("semester", 1, 2)?;

    let now = chrono::Utc::now();
    let student = Student {
        student_id: new_entity_id(),
        roll_no: req.roll_no.trim().to_string(),
        name: req.name,
        email: req.email,
        year: req.year,
        semester: req.semester,
        branch: req.branch,
        section: req.section,
        counsellor_id: None,
        created_at: now,
        updated_at: now,
    };

    storage.student_insert(&student).await?;
    tracing::info!(roll_no = %student.roll_no, "Student created");

    Ok((StatusCode::CREATED, Json(StudentResponse::from(student))))
}

/// GET /api/v1/students - List students, optionally filtered
#[utoipa::path(
    get,
    path = "/api/v1/students",
    tag = "Students",
    params(
        ("year" = Option<i16>, Query, description = "Filter by year of study"),
        ("semester" = Option<i16>, Query, description = "Filter by semester"),
        ("branch" = Option<String>, Query, description = "Filter by branch"),
        ("section" = Option<String>, Query, description = "Filter by section"),
        ("counsellor_id" = Option<Uuid>, Query, description = "Filter by bound counsellor"),
    ),
    responses(
        (status = 200, description = "List of students", body = ListStudentsResponse),
        (status = 401, description = "Unauthorized", body = ApiError),
    ),
    security(
        ("api_key" = []),
        ("bearer_auth" = [])
    )
)]
pub async fn list_students(
    State(storage): State<Arc<dyn Storage>>,
    AuthExtractor(auth): AuthExtractor,
    Query(query): Query<ListStudentsQuery>,
) -> ApiResult<Json<ListStudentsResponse>> {
    auth.require_role(&[Role::Admin, Role::Counsellor])?;

    // The predicate runs server side so portals never page a full table.
    let filter: StudentFilter = query.into();
    let students = storage.student_list(&filter).await?;
    let total = students.len() as i32;

    Ok(Json(ListStudentsResponse {
        students: students.into_iter().map(StudentResponse::from).collect(),
        total,
    }))
}

/// GET /api/v1/students/{id} - Get a student by ID
#[utoipa::path(
    get,
    path = "/api/v1/students/{id}",
    tag = "Students",
    params(
        ("id" = Uuid, Path, description = "Student ID")
    ),
    responses(
        (status = 200, description = "Student details", body = StudentResponse),
        (status = 404, description = "Student not found", body = ApiError),
        (status = 401, description = "Unauthorized", body = ApiError),
    ),
    security(
        ("api_key" = []),
        ("bearer_auth" = [])
    )
)]
pub async fn get_student(
    State(storage): State<Arc<dyn Storage>>,
    AuthExtractor(auth): AuthExtractor,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<StudentResponse>> {
    if auth.role == Role::Student && !auth.may_act_for_student(id) {
        return Err(ApiError::forbidden(
            "Students may only view their own record",
        ));
    }

    let student = storage
        .student_get(id)
        .await?
        .ok_or_else(|| ApiError::student_not_found(id))?;

    Ok(Json(student.into()))
}

/// PATCH /api/v1/students/{id} - Update profile fields
#[utoipa::path(
    patch,
    path = "/api/v1/students/{id}",
    tag = "Students",
    params(
        ("id" = Uuid, Path, description = "Student ID")
    ),
    request_body = UpdateStudentRequest,
    responses(
        (status = 200, description = "Student updated", body = StudentResponse),
        (status = 400, description = "No fields to update", body = ApiError),
        (status = 404, description = "Student not found", body = ApiError),
        (status = 401, description = "Unauthorized", body = ApiError),
    ),
    security(
        ("api_key" = []),
        ("bearer_auth" = [])
    )
)]
pub async fn update_student(
    State(storage): State<Arc<dyn Storage>>,
    AuthExtractor(auth): AuthExtractor,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateStudentRequest>,
) -> ApiResult<Json<StudentResponse>> {
    if !auth.may_act_for_student(id) {
        return Err(ApiError::forbidden(
            "Only the student or an admin may edit this record",
        ));
    }
    req.validate_has_updates()?;

    let update = StudentUpdate {
        name: req.name,
        email: req.email,
    };
    let student = storage.student_update(id, update).await?;

    Ok(Json(student.into()))
}

// ============================================================================
// ROUTER SETUP
// ============================================================================

/// Create the student routes router.
pub fn create_router(state: AppState) -> axum::Router {
    axum::Router::new()
        .route(
            "/",
            axum::routing::post(create_student).get(list_students),
        )
        .route(
            "/:id",
            axum::routing::get(get_student).patch(update_student),
        )
        .with_state(state)
}
