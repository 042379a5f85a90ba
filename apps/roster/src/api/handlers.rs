//! # API Endpoint Handlers
//!
//! Each handler takes the roster lock once: a read lock for queries, the
//! write lock for anything that mutates, held across the whole operation.

use super::{
    AppState,
    types::{
        EnrollParams, HealthResponse, MessageResponse, SectionJson, SectionRequest, StatusResponse,
        StudentDetailResponse, StudentJson, StudentRequest, StudentSummaryJson, SubjectJson,
        SubjectRequest,
    },
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use roster_core::{
    ConflictKind, Entity, RosterError, SectionDraft, SectionId, StudentDraft, StudentId,
    SubjectDraft, SubjectId,
};

/// Error half of every handler result.
pub type ApiError = (StatusCode, Json<MessageResponse>);

const INTERNAL_ERROR: &str = "An internal error occurred.";
const DELETE_STUDENT_ERROR: &str = "An error occurred while deleting the student.";

// =============================================================================
// ERROR MAPPING
// =============================================================================

fn not_found_message(entity: Entity) -> &'static str {
    match entity {
        Entity::Student => "Student not found.",
        Entity::Section => "Section not found.",
        Entity::Subject => "Subject not found",
        Entity::Enrollment => "Enrollment not found.",
    }
}

fn conflict_message(kind: ConflictKind) -> &'static str {
    match kind {
        ConflictKind::DuplicateSubjectEnrollment => {
            "Student is already enrolled in a section with the same subject."
        }
        ConflictKind::AlreadyEnrolled => "Student is already enrolled in this section.",
        ConflictKind::DuplicateEmail => "A student with this email already exists.",
    }
}

/// Map a `RosterError` to a response. `internal` is the only text a client
/// sees for store failures; the cause goes to the log.
fn reject(operation: &str, internal: &str, err: RosterError) -> ApiError {
    match err {
        RosterError::NotFound(entity) => (
            StatusCode::NOT_FOUND,
            Json(MessageResponse::error(not_found_message(entity))),
        ),
        RosterError::Conflict(kind) => (
            StatusCode::BAD_REQUEST,
            Json(MessageResponse::error(conflict_message(kind))),
        ),
        RosterError::Invalid(message) => {
            (StatusCode::BAD_REQUEST, Json(MessageResponse::error(message)))
        }
        RosterError::Internal(cause) => {
            tracing::error!(
                operation,
                constraint = cause.is_constraint(),
                error = %cause,
                "store failure"
            );
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(MessageResponse::error(internal)),
            )
        }
    }
}

// =============================================================================
// HEALTH & STATUS
// =============================================================================

/// Health check endpoint.
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse::default())
}

/// Row counts.
pub async fn status_handler(
    State(state): State<AppState>,
) -> Result<Json<StatusResponse>, ApiError> {
    let roster = state.roster.read().await;
    let counts = roster
        .status()
        .map_err(|e| reject("status", INTERNAL_ERROR, e))?;
    Ok(Json(StatusResponse::new(roster.backend_name(), counts)))
}

// =============================================================================
// STUDENTS
// =============================================================================

pub async fn list_students_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<StudentSummaryJson>>, ApiError> {
    let roster = state.roster.read().await;
    let students = roster
        .list_students()
        .map_err(|e| reject("list_students", INTERNAL_ERROR, e))?;
    Ok(Json(students.into_iter().map(Into::into).collect()))
}

pub async fn get_student_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<StudentDetailResponse>, ApiError> {
    let roster = state.roster.read().await;
    let record = roster
        .get_student(StudentId(id))
        .map_err(|e| reject("get_student", INTERNAL_ERROR, e))?;
    Ok(Json(record.into()))
}

pub async fn create_student_handler(
    State(state): State<AppState>,
    Json(request): Json<StudentRequest>,
) -> Result<(StatusCode, Json<StudentJson>), ApiError> {
    let draft = StudentDraft::from(request);
    let mut roster = state.roster.write().await;
    let student = roster
        .create_student(&draft)
        .map_err(|e| reject("create_student", INTERNAL_ERROR, e))?;
    tracing::info!(student = %student.id, number = %student.student_number, "student created");
    Ok((StatusCode::CREATED, Json(StudentJson::from(&student))))
}

pub async fn update_student_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(request): Json<StudentRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let draft = StudentDraft::from(request);
    let mut roster = state.roster.write().await;
    roster
        .update_student(StudentId(id), &draft)
        .map_err(|e| reject("update_student", INTERNAL_ERROR, e))?;
    Ok(Json(MessageResponse::success("Student updated successfully.")))
}

pub async fn delete_student_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<MessageResponse>, ApiError> {
    let mut roster = state.roster.write().await;
    let removed = roster
        .delete_student(StudentId(id))
        .map_err(|e| reject("delete_student", DELETE_STUDENT_ERROR, e))?;
    tracing::info!(student = id, enrollments = removed, "student deleted");
    Ok(Json(MessageResponse::success("Student deleted successfully.")))
}

/// `POST /api/students/enroll?studentId=&sectionId=`
pub async fn enroll_handler(
    State(state): State<AppState>,
    Query(params): Query<EnrollParams>,
) -> Result<Json<MessageResponse>, ApiError> {
    let (student, section) = params.ids();
    let mut roster = state.roster.write().await;
    roster
        .enroll(student, section)
        .map_err(|e| reject("enroll", INTERNAL_ERROR, e))?;
    tracing::info!(%student, %section, "student enrolled");
    Ok(Json(MessageResponse::success("Student enrolled successfully.")))
}

/// `DELETE /api/students/{id}/sections/{sectionId}`
pub async fn withdraw_handler(
    State(state): State<AppState>,
    Path((student, section)): Path<(u64, u64)>,
) -> Result<Json<MessageResponse>, ApiError> {
    let mut roster = state.roster.write().await;
    roster
        .withdraw(StudentId(student), SectionId(section))
        .map_err(|e| reject("withdraw", INTERNAL_ERROR, e))?;
    Ok(Json(MessageResponse::success("Student withdrawn successfully.")))
}

// =============================================================================
// SUBJECTS
// =============================================================================

pub async fn list_subjects_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<SubjectJson>>, ApiError> {
    let roster = state.roster.read().await;
    let subjects = roster
        .list_subjects()
        .map_err(|e| reject("list_subjects", INTERNAL_ERROR, e))?;
    Ok(Json(subjects.iter().map(SubjectJson::from).collect()))
}

pub async fn get_subject_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<SubjectJson>, ApiError> {
    let roster = state.roster.read().await;
    let subject = roster
        .get_subject(SubjectId(id))
        .map_err(|e| reject("get_subject", INTERNAL_ERROR, e))?;
    Ok(Json(SubjectJson::from(&subject)))
}

pub async fn create_subject_handler(
    State(state): State<AppState>,
    Json(request): Json<SubjectRequest>,
) -> Result<(StatusCode, Json<SubjectJson>), ApiError> {
    let draft = SubjectDraft::from(request);
    let mut roster = state.roster.write().await;
    let subject = roster
        .create_subject(&draft)
        .map_err(|e| reject("create_subject", INTERNAL_ERROR, e))?;
    Ok((StatusCode::CREATED, Json(SubjectJson::from(&subject))))
}

pub async fn update_subject_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(request): Json<SubjectRequest>,
) -> Result<StatusCode, ApiError> {
    let draft = SubjectDraft::from(request);
    let mut roster = state.roster.write().await;
    roster
        .update_subject(SubjectId(id), &draft)
        .map_err(|e| reject("update_subject", INTERNAL_ERROR, e))?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_subject_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<StatusCode, ApiError> {
    let mut roster = state.roster.write().await;
    let detached = roster
        .delete_subject(SubjectId(id))
        .map_err(|e| reject("delete_subject", INTERNAL_ERROR, e))?;
    tracing::info!(subject = id, sections = detached, "subject deleted");
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// SECTIONS
// =============================================================================

pub async fn list_sections_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<SectionJson>>, ApiError> {
    let roster = state.roster.read().await;
    let sections = roster
        .list_sections()
        .map_err(|e| reject("list_sections", INTERNAL_ERROR, e))?;
    Ok(Json(sections.iter().map(SectionJson::from).collect()))
}

pub async fn get_section_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<SectionJson>, ApiError> {
    let roster = state.roster.read().await;
    let section = roster
        .get_section(SectionId(id))
        .map_err(|e| reject("get_section", INTERNAL_ERROR, e))?;
    Ok(Json(SectionJson::from(&section)))
}

pub async fn create_section_handler(
    State(state): State<AppState>,
    Json(request): Json<SectionRequest>,
) -> Result<(StatusCode, Json<SectionJson>), ApiError> {
    let draft = SectionDraft::from(request);
    let mut roster = state.roster.write().await;
    let section = roster
        .create_section(&draft)
        .map_err(|e| reject("create_section", INTERNAL_ERROR, e))?;
    Ok((StatusCode::CREATED, Json(SectionJson::from(&section))))
}

pub async fn update_section_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(request): Json<SectionRequest>,
) -> Result<StatusCode, ApiError> {
    let draft = SectionDraft::from(request);
    let mut roster = state.roster.write().await;
    roster
        .update_section(SectionId(id), &draft)
        .map_err(|e| reject("update_section", INTERNAL_ERROR, e))?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_section_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<StatusCode, ApiError> {
    let mut roster = state.roster.write().await;
    let removed = roster
        .delete_section(SectionId(id))
        .map_err(|e| reject("delete_section", INTERNAL_ERROR, e))?;
    tracing::info!(section = id, enrollments = removed, "section deleted");
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// TESTS
// =============================================================================
