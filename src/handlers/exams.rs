// src/handlers/exams.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use validator::Validate;

use crate::{
    error::AppError,
    models::exam::CreateExamRequest,
    services::exam_service,
    state::AppState,
    utils::jwt::Claims,
};

/// Creates an exam from a complete submission (title plus question list).
///
/// The entries are composed and checked against the curriculum pattern
/// before anything is written.
pub async fn create_exam(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let owner_id = claims.user_id()?;
    let finalized = exam_service::compose_exam(state.pattern.clone(), state.policy(), &payload)?;
    let exam = exam_service::persist_exam(state.exams.as_ref(), owner_id, &finalized).await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({"id": exam.id})),
    ))
}

/// Lists the caller's exams, newest first.
pub async fn list_exams(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let exams = state.exams.list_exams_by_owner(claims.user_id()?).await?;
    Ok(Json(exams))
}

/// Returns an exam with its questions grouped by section.
pub async fn get_exam(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let view =
        exam_service::load_exam_view(state.exams.as_ref(), &state.pattern, claims.user_id()?, id)
            .await?;
    Ok(Json(view))
}
