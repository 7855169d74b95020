// src/handlers/drafts.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    engine::ExamComposer,
    error::AppError,
    models::draft::{AddQuestionRequest, DraftSectionView, DraftView, SetTitleRequest},
    services::exam_service,
    state::AppState,
    utils::jwt::Claims,
};

fn draft_view(id: Uuid, composer: &ExamComposer) -> DraftView {
    let sections = composer
        .pattern()
        .entries()
        .iter()
        .map(|entry| DraftSectionView {
            section: entry.section,
            label: entry.label.clone(),
            marks_per_question: entry.marks_per_question,
            questions: composer.questions_in(entry.section).to_vec(),
        })
        .collect();

    DraftView {
        id,
        title: composer.title().to_string(),
        state: composer.state(),
        sections,
        progress: composer.progress(),
    }
}

/// Opens a new, empty authoring session.
pub async fn create_draft(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let owner_id = claims.user_id()?;
    let id = state.drafts.create(owner_id, state.new_composer()).await?;

    let view = state
        .drafts
        .with_draft(owner_id, id, |c| Ok(draft_view(id, c)))
        .await?;
    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn get_draft(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let view = state
        .drafts
        .with_draft(claims.user_id()?, id, |c| Ok(draft_view(id, c)))
        .await?;
    Ok(Json(view))
}

/// Abandons a draft; nothing is persisted.
pub async fn discard_draft(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    state.drafts.remove(claims.user_id()?, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn set_title(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SetTitleRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let view = state
        .drafts
        .with_draft(claims.user_id()?, id, |c| {
            c.set_title(payload.title)?;
            Ok(draft_view(id, c))
        })
        .await?;
    Ok(Json(view))
}

/// Adds a question to a section; returns it with its assigned number.
pub async fn add_question(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AddQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let question = state
        .drafts
        .with_draft(claims.user_id()?, id, |c| {
            let section = c.pattern().parse_section(&payload.section)?;
            Ok(c.add_question(section, &payload.question_text)?)
        })
        .await?;
    Ok((StatusCode::CREATED, Json(question)))
}

/// Removes a question; later questions of the section move up by one.
pub async fn remove_question(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((id, section, number)): Path<(Uuid, String, u32)>,
) -> Result<impl IntoResponse, AppError> {
    let view = state
        .drafts
        .with_draft(claims.user_id()?, id, |c| {
            let section = c.pattern().parse_section(&section)?;
            c.remove_question(section, number)?;
            Ok(draft_view(id, c))
        })
        .await?;
    Ok(Json(view))
}

pub async fn get_progress(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let progress = state
        .drafts
        .with_draft(claims.user_id()?, id, |c| Ok(c.progress()))
        .await?;
    Ok(Json(progress))
}

/// Finalizes the draft and saves it.
///
/// The draft is only discarded once the exam and all its questions are
/// stored; after a failed save the same request can simply be repeated.
/// A submit that overlaps one still in flight is rejected with 409.
pub async fn submit_draft(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let owner_id = claims.user_id()?;

    let (finalized, submission) = state.drafts.begin_submit(owner_id, id).await?;

    let exam = match exam_service::persist_exam(state.exams.as_ref(), owner_id, &finalized).await {
        Ok(exam) => exam,
        Err(e) => {
            submission.release().await;
            return Err(e);
        }
    };
    submission.complete().await;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({"id": exam.id})),
    ))
}
