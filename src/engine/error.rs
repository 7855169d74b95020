// src/engine/error.rs

use thiserror::Error;

/// Errors raised by the composition engine.
///
/// Every mutating composer operation either succeeds completely or returns
/// one of these and leaves the draft untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComposeError {
    /// Empty or otherwise invalid user-supplied field.
    #[error("{0}")]
    Validation(String),

    /// Section identifier outside the curriculum pattern.
    #[error("unknown section '{0}'")]
    UnknownSection(String),

    /// The section already holds its required number of questions.
    #[error("section {section} is full ({required} questions required)")]
    SectionFull { section: String, required: u32 },

    /// Finalize attempted before the exam meets the completion policy.
    #[error("{0}")]
    IncompleteExam(String),

    /// No question with this number exists in the section.
    #[error("question {number} not found in section {section}")]
    NotFound { section: String, number: u32 },

    /// Mutation attempted after the draft was finalized.
    #[error("exam draft is already finalized")]
    Finalized,
}
