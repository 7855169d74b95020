//! Exam composition engine.
//!
//! `CurriculumPattern` is the fixed table of sections; `ExamComposer`
//! assigns questions to sections, keeps their numbering dense and produces
//! the finalized exam handed to persistence. Nothing here does I/O.

pub mod composer;
pub mod error;
pub mod pattern;

pub use composer::{
    CapacityPolicy, CompletionPolicy, ComposerPolicy, ComposerState, ExamComposer, ExamDraft,
    FinalizedExam, Progress, Question, SectionProgress,
};
pub use error::ComposeError;
pub use pattern::{CurriculumPattern, PatternEntry, PatternError, PatternMeta, QuestionType, SectionId};
