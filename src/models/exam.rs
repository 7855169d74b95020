// src/models/exam.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::engine::SectionId;

/// Represents the 'exams' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Exam {
    pub id: i64,
    pub owner_id: i64,
    pub title: String,
    pub subject: String,
    pub class_level: String,
    pub board: String,
    pub total_marks: i32,
    pub duration_minutes: i32,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Represents the 'exam_questions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct StoredQuestion {
    pub id: i64,
    pub exam_id: i64,
    pub section: String,
    pub question_number: i32,
    pub question_text: String,
    pub question_type: String,
    pub marks: i32,
}

/// One non-empty section of a persisted exam.
#[derive(Debug, Serialize)]
pub struct SectionView {
    pub section: SectionId,
    pub label: String,
    pub marks_per_question: u32,
    pub questions: Vec<StoredQuestion>,
}

/// Composed read view of a persisted exam.
#[derive(Debug, Serialize)]
pub struct ExamView {
    #[serde(flatten)]
    pub exam: Exam,
    pub question_count: usize,
    pub sections: Vec<SectionView>,
}

/// A question entry as submitted by the client.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct QuestionInput {
    #[validate(length(min = 1, max = 4, message = "Section must be a section letter."))]
    pub section: String,
    #[validate(length(max = 5000, message = "Question text is limited to 5000 characters."))]
    pub question_text: String,
}

/// DTO for submitting a whole exam in one request.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateExamRequest {
    #[validate(length(max = 200, message = "Title is limited to 200 characters."))]
    pub title: String,
    #[validate(length(max = 200, message = "An exam holds at most 200 questions."))]
    #[validate(nested)]
    pub questions: Vec<QuestionInput>,
}
