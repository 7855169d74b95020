// src/services/exam_service.rs

use std::collections::HashMap;

use crate::{
    engine::{ComposerPolicy, CurriculumPattern, ExamComposer, FinalizedExam, SectionId},
    error::AppError,
    models::exam::{CreateExamRequest, Exam, ExamView, SectionView, StoredQuestion},
    store::ExamStore,
};

/// Replays a one-shot submission through a fresh composer.
///
/// The entries are added in request order, so numbering inside each
/// section follows the order the client sent them.
pub fn compose_exam(
    pattern: std::sync::Arc<CurriculumPattern>,
    policy: ComposerPolicy,
    req: &CreateExamRequest,
) -> Result<FinalizedExam, AppError> {
    let mut composer = ExamComposer::new(pattern, policy);
    composer.set_title(req.title.as_str())?;

    for input in &req.questions {
        let section = composer.pattern().parse_section(&input.section)?;
        composer.add_question(section, &input.question_text)?;
    }

    Ok(composer.finalize()?)
}

/// Writes a finalized exam: the exam row, then the question batch.
///
/// If the batch fails after the exam row was written, the row is deleted
/// again and a single `IntegrityError` is returned.
pub async fn persist_exam(
    store: &dyn ExamStore,
    owner_id: i64,
    finalized: &FinalizedExam,
) -> Result<Exam, AppError> {
    let exam = store
        .insert_exam(owner_id, &finalized.exam)
        .await
        .map_err(|e| {
            tracing::error!("Failed to insert exam: {:?}", e);
            AppError::IntegrityError(e.to_string())
        })?;

    if let Err(e) = store.insert_questions(exam.id, &finalized.questions).await {
        tracing::error!("Failed to insert questions for exam {}: {:?}", exam.id, e);

        if let Err(cleanup) = store.delete_exam(exam.id).await {
            tracing::error!("Failed to remove orphaned exam {}: {:?}", exam.id, cleanup);
        }

        return Err(AppError::IntegrityError(e.to_string()));
    }

    tracing::info!(
        "Exam {} saved for user {} ({} questions)",
        exam.id,
        owner_id,
        finalized.questions.len()
    );
    Ok(exam)
}

/// Loads an exam owned by `owner_id` and groups its questions by section.
///
/// Empty sections are left out. Another user's exam is reported as not found.
pub async fn load_exam_view(
    store: &dyn ExamStore,
    pattern: &CurriculumPattern,
    owner_id: i64,
    exam_id: i64,
) -> Result<ExamView, AppError> {
    let exam = store
        .find_exam(exam_id)
        .await?
        .filter(|e| e.owner_id == owner_id)
        .ok_or_else(|| AppError::NotFound("Exam not found".to_string()))?;

    let questions = store.list_questions(exam_id).await?;

    let mut by_section: HashMap<SectionId, Vec<StoredQuestion>> = HashMap::new();
    for q in questions {
        match pattern.parse_section(&q.section) {
            Ok(section) => by_section.entry(section).or_default().push(q),
            Err(_) => tracing::warn!(
                "Exam {} has question in section '{}' outside the curriculum pattern",
                exam_id,
                q.section
            ),
        }
    }

    let sections: Vec<SectionView> = pattern
        .entries()
        .iter()
        .filter_map(|entry| {
            let mut questions = by_section.remove(&entry.section)?;
            questions.sort_by_key(|q| q.question_number);
            Some(SectionView {
                section: entry.section,
                label: entry.label.clone(),
                marks_per_question: entry.marks_per_question,
                questions,
            })
        })
        .collect();
    let question_count = sections.iter().map(|s| s.questions.len()).sum();

    Ok(ExamView {
        exam,
        question_count,
        sections,
    })
}
