// src/models/draft.rs

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::engine::{ComposerState, Progress, Question, SectionId};

/// DTO for setting a draft title.
#[derive(Debug, Deserialize, Validate)]
pub struct SetTitleRequest {
    #[validate(length(max = 200, message = "Title is limited to 200 characters."))]
    pub title: String,
}

/// DTO for adding one question to a draft.
#[derive(Debug, Deserialize, Validate)]
pub struct AddQuestionRequest {
    #[validate(length(min = 1, max = 4, message = "Section must be a section letter."))]
    pub section: String,
    #[validate(length(max = 5000, message = "Question text is limited to 5000 characters."))]
    pub question_text: String,
}

#[derive(Debug, Serialize)]
pub struct DraftSectionView {
    pub section: SectionId,
    pub label: String,
    pub marks_per_question: u32,
    pub questions: Vec<Question>,
}

/// Snapshot of an authoring session for the creation view.
#[derive(Debug, Serialize)]
pub struct DraftView {
    pub id: Uuid,
    pub title: String,
    pub state: ComposerState,
    pub sections: Vec<DraftSectionView>,
    pub progress: Progress,
}
