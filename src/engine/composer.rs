// src/engine/composer.rs

use std::{collections::HashMap, str::FromStr, sync::Arc};

use serde::{Deserialize, Serialize};

use super::{
    error::ComposeError,
    pattern::{CurriculumPattern, QuestionType, SectionId},
};

/// A question held by a draft.
///
/// `question_type` and `marks` always come from the pattern entry of
/// `section`; the composer is the only place questions are created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub section: SectionId,
    /// 1-based and dense within the section.
    pub question_number: u32,
    pub question_text: String,
    pub question_type: QuestionType,
    pub marks: u32,
}

/// What happens when a question is added to a section that already holds
/// its required count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CapacityPolicy {
    #[default]
    Strict,
    Lenient,
}

impl FromStr for CapacityPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(CapacityPolicy::Strict),
            "lenient" => Ok(CapacityPolicy::Lenient),
            other => Err(format!("unknown capacity policy '{other}'")),
        }
    }
}

/// What finalize requires before it produces a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompletionPolicy {
    /// At least one question anywhere.
    #[default]
    NonEmpty,
    /// Every section holds exactly its required count.
    FullPattern,
}

impl FromStr for CompletionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "non_empty" | "nonempty" => Ok(CompletionPolicy::NonEmpty),
            "full_pattern" | "full" => Ok(CompletionPolicy::FullPattern),
            other => Err(format!("unknown completion policy '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ComposerPolicy {
    pub capacity: CapacityPolicy,
    pub completion: CompletionPolicy,
}

/// Exam metadata produced by finalize, ready for `insert_exam`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExamDraft {
    pub title: String,
    pub subject: String,
    pub class_level: String,
    pub board: String,
    /// Sum of the marks of the finalized questions.
    pub total_marks: u32,
    pub duration_minutes: u32,
}

/// Immutable output of finalize.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FinalizedExam {
    pub exam: ExamDraft,
    /// Ordered by pattern section order, then question number.
    pub questions: Vec<Question>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ComposerState {
    Empty,
    Drafting,
    Finalized,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionProgress {
    pub section: SectionId,
    pub added: u32,
    pub required: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub sections: Vec<SectionProgress>,
    pub added: u32,
    pub required: u32,
    /// True when every section holds exactly its required count.
    pub complete: bool,
}

impl Progress {
    pub fn section(&self, section: SectionId) -> Option<&SectionProgress> {
        self.sections.iter().find(|s| s.section == section)
    }
}

/// Accumulates the questions of one exam draft.
///
/// Owned by a single authoring session; all operations are synchronous
/// and either apply fully or leave the draft as it was.
#[derive(Debug, Clone)]
pub struct ExamComposer {
    pattern: Arc<CurriculumPattern>,
    policy: ComposerPolicy,
    title: String,
    sections: HashMap<SectionId, Vec<Question>>,
    touched: bool,
    finalized: Option<FinalizedExam>,
}

impl ExamComposer {
    pub fn new(pattern: Arc<CurriculumPattern>, policy: ComposerPolicy) -> Self {
        Self {
            pattern,
            policy,
            title: String::new(),
            sections: HashMap::new(),
            touched: false,
            finalized: None,
        }
    }

    pub fn pattern(&self) -> &CurriculumPattern {
        &self.pattern
    }

    pub fn policy(&self) -> ComposerPolicy {
        self.policy
    }

    pub fn state(&self) -> ComposerState {
        if self.finalized.is_some() {
            ComposerState::Finalized
        } else if self.touched {
            ComposerState::Drafting
        } else {
            ComposerState::Empty
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Stores the title as given; emptiness is checked at finalize.
    pub fn set_title(&mut self, title: impl Into<String>) -> Result<(), ComposeError> {
        self.ensure_mutable()?;
        self.title = title.into();
        self.touched = true;
        Ok(())
    }

    pub fn add_question(&mut self, section: SectionId, text: &str) -> Result<Question, ComposeError> {
        self.ensure_mutable()?;

        let text = text.trim();
        if text.is_empty() {
            return Err(ComposeError::Validation(
                "question text must not be empty".to_string(),
            ));
        }

        let entry = self.pattern.entry_for(section)?;
        let current = self.count_in(section);

        if current >= entry.required_count {
            match self.policy.capacity {
                CapacityPolicy::Strict => {
                    return Err(ComposeError::SectionFull {
                        section: section.to_string(),
                        required: entry.required_count,
                    });
                }
                CapacityPolicy::Lenient => {
                    tracing::warn!(
                        "Section {} over capacity: {} of {} questions",
                        section,
                        current + 1,
                        entry.required_count
                    );
                }
            }
        }

        let question = Question {
            section,
            question_number: current + 1,
            question_text: text.to_string(),
            question_type: entry.question_type,
            marks: entry.marks_per_question,
        };

        self.sections
            .entry(section)
            .or_default()
            .push(question.clone());
        self.touched = true;

        tracing::debug!("Added question {}{}", section, question.question_number);
        Ok(question)
    }

    /// Removes a question and closes the gap in its section's numbering.
    pub fn remove_question(
        &mut self,
        section: SectionId,
        question_number: u32,
    ) -> Result<Question, ComposeError> {
        self.ensure_mutable()?;
        self.pattern.entry_for(section)?;

        let not_found = || ComposeError::NotFound {
            section: section.to_string(),
            number: question_number,
        };

        let questions = self.sections.get_mut(&section).ok_or_else(not_found)?;
        let index = questions
            .iter()
            .position(|q| q.question_number == question_number)
            .ok_or_else(not_found)?;

        let removed = questions.remove(index);
        for q in questions
            .iter_mut()
            .filter(|q| q.question_number > question_number)
        {
            q.question_number -= 1;
        }
        self.touched = true;

        tracing::debug!("Removed question {}{}", section, question_number);
        Ok(removed)
    }

    pub fn questions_in(&self, section: SectionId) -> &[Question] {
        self.sections.get(&section).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All questions in section order, then by number.
    pub fn questions(&self) -> Vec<&Question> {
        self.pattern
            .all_sections()
            .flat_map(|s| self.questions_in(s).iter())
            .collect()
    }

    pub fn question_count(&self) -> u32 {
        self.sections.values().map(|q| q.len() as u32).sum()
    }

    pub fn progress(&self) -> Progress {
        let sections: Vec<SectionProgress> = self
            .pattern
            .entries()
            .iter()
            .map(|e| SectionProgress {
                section: e.section,
                added: self.count_in(e.section),
                required: e.required_count,
            })
            .collect();

        let complete = sections.iter().all(|s| s.added == s.required);

        Progress {
            added: sections.iter().map(|s| s.added).sum(),
            required: self.pattern.total_required_questions(),
            complete,
            sections,
        }
    }

    /// Freezes the draft and returns the snapshot to persist.
    ///
    /// Calling it again after success returns the same snapshot, so a failed
    /// save can be retried without touching the draft.
    pub fn finalize(&mut self) -> Result<FinalizedExam, ComposeError> {
        if let Some(done) = &self.finalized {
            return Ok(done.clone());
        }

        let title = self.title.trim();
        if title.is_empty() {
            return Err(ComposeError::Validation(
                "exam title must not be empty".to_string(),
            ));
        }

        self.check_completion()?;

        let questions: Vec<Question> = self.questions().into_iter().cloned().collect();
        let meta = self.pattern.meta();

        let snapshot = FinalizedExam {
            exam: ExamDraft {
                title: title.to_string(),
                subject: meta.subject.clone(),
                class_level: meta.class_level.clone(),
                board: meta.board.clone(),
                total_marks: questions.iter().map(|q| q.marks).sum(),
                duration_minutes: meta.duration_minutes,
            },
            questions,
        };

        tracing::info!(
            "Finalized exam '{}' with {} questions",
            snapshot.exam.title,
            snapshot.questions.len()
        );
        self.finalized = Some(snapshot.clone());
        Ok(snapshot)
    }

    fn check_completion(&self) -> Result<(), ComposeError> {
        if self.question_count() == 0 {
            return Err(ComposeError::IncompleteExam(
                "add at least one question before submitting".to_string(),
            ));
        }

        if self.policy.completion == CompletionPolicy::FullPattern {
            for s in self.progress().sections {
                if s.added < s.required {
                    return Err(ComposeError::IncompleteExam(format!(
                        "add {} more questions to section {}",
                        s.required - s.added,
                        s.section
                    )));
                }
                if s.added > s.required {
                    return Err(ComposeError::IncompleteExam(format!(
                        "remove {} questions from section {}",
                        s.added - s.required,
                        s.section
                    )));
                }
            }
        }

        Ok(())
    }

    fn count_in(&self, section: SectionId) -> u32 {
        self.questions_in(section).len() as u32
    }

    fn ensure_mutable(&self) -> Result<(), ComposeError> {
        if self.finalized.is_some() {
            return Err(ComposeError::Finalized);
        }
        Ok(())
    }
}
