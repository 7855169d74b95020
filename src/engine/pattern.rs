// src/engine/pattern.rs

use std::{collections::HashSet, fmt, path::Path, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::error::ComposeError;

/// Question count the built-in CBSE Class 10 Mathematics paper must contain.
pub const CBSE_CLASS_10_TOTAL_QUESTIONS: u32 = 38;

/// Marks the built-in CBSE Class 10 Mathematics paper is worth.
pub const CBSE_CLASS_10_TOTAL_MARKS: u32 = 80;

/// Identifier of a paper section (`A`, `B`, ...).
///
/// Ordering between sections is defined by the pattern, not by the letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SectionId(char);

impl SectionId {
    pub fn new(id: char) -> Self {
        Self(id.to_ascii_uppercase())
    }

    pub fn as_char(self) -> char {
        self.0
    }
}

impl fmt::Display for SectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SectionId {
    type Err = ComposeError;

    /// Accepts exactly one alphanumeric character, ignoring surrounding whitespace.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let mut chars = trimmed.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if c.is_ascii_alphanumeric() => Ok(SectionId::new(c)),
            _ => Err(ComposeError::UnknownSection(trimmed.to_string())),
        }
    }
}

/// Expected answer format of the questions in a section.
/// Informational only; question text is never checked against it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuestionType {
    #[serde(rename = "MCQ")]
    MultipleChoice,
    #[serde(rename = "Assertion-Reason")]
    AssertionReason,
    #[serde(rename = "VSA")]
    VeryShortAnswer,
    #[serde(rename = "SA")]
    ShortAnswer,
    #[serde(rename = "LA")]
    LongAnswer,
}

impl QuestionType {
    /// Tag stored in the `question_type` column.
    pub fn as_str(self) -> &'static str {
        match self {
            QuestionType::MultipleChoice => "MCQ",
            QuestionType::AssertionReason => "Assertion-Reason",
            QuestionType::VeryShortAnswer => "VSA",
            QuestionType::ShortAnswer => "SA",
            QuestionType::LongAnswer => "LA",
        }
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the curriculum table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatternEntry {
    pub section: SectionId,
    pub required_count: u32,
    pub marks_per_question: u32,
    pub question_type: QuestionType,
    /// Human readable type label shown on section tabs.
    pub label: String,
}

/// Fixed exam metadata for the curriculum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternMeta {
    pub subject: String,
    pub class_level: String,
    pub board: String,
    pub duration_minutes: u32,
}

#[derive(Debug, Error)]
pub enum PatternError {
    #[error("curriculum pattern has no sections")]
    Empty,
    #[error("section {0} appears more than once")]
    DuplicateSection(SectionId),
    #[error("section {0}: {1} must be positive")]
    NonPositive(SectionId, &'static str),
    #[error("pattern totals exceed {}", u32::MAX)]
    TotalsOverflow,
    #[error("invalid section id '{0}'")]
    InvalidSectionId(String),
    #[error("failed to parse curriculum pattern: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to read curriculum pattern: {0}")]
    Io(#[from] std::io::Error),
}

/// Immutable table describing how a paper is divided into sections.
///
/// Built once at startup and shared read-only; totals are computed at
/// construction and never change afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CurriculumPattern {
    #[serde(flatten)]
    meta: PatternMeta,
    sections: Vec<PatternEntry>,
    total_required_questions: u32,
    total_required_marks: u32,
}

impl CurriculumPattern {
    pub fn new(meta: PatternMeta, entries: Vec<PatternEntry>) -> Result<Self, PatternError> {
        if entries.is_empty() {
            return Err(PatternError::Empty);
        }

        let mut seen = HashSet::new();
        for entry in &entries {
            if !seen.insert(entry.section) {
                return Err(PatternError::DuplicateSection(entry.section));
            }
            if entry.required_count == 0 {
                return Err(PatternError::NonPositive(entry.section, "required_count"));
            }
            if entry.marks_per_question == 0 {
                return Err(PatternError::NonPositive(entry.section, "marks_per_question"));
            }
        }

        let mut total_required_questions: u32 = 0;
        let mut total_required_marks: u32 = 0;
        for entry in &entries {
            total_required_questions = total_required_questions
                .checked_add(entry.required_count)
                .ok_or(PatternError::TotalsOverflow)?;
            total_required_marks = entry
                .required_count
                .checked_mul(entry.marks_per_question)
                .and_then(|marks| total_required_marks.checked_add(marks))
                .ok_or(PatternError::TotalsOverflow)?;
        }

        Ok(Self {
            meta,
            sections: entries,
            total_required_questions,
            total_required_marks,
        })
    }

    /// The CBSE Class 10 Mathematics board pattern.
    pub fn cbse_class_10_mathematics() -> Self {
        let entry = |id: char, count: u32, marks: u32, qt: QuestionType, label: &str| PatternEntry {
            section: SectionId::new(id),
            required_count: count,
            marks_per_question: marks,
            question_type: qt,
            label: label.to_string(),
        };

        let entries = vec![
            entry('A', 20, 1, QuestionType::MultipleChoice, "MCQ & Assertion-Reason"),
            entry('B', 5, 2, QuestionType::VeryShortAnswer, "VSA"),
            entry('C', 6, 3, QuestionType::ShortAnswer, "SA"),
            entry('D', 3, 4, QuestionType::ShortAnswer, "SA"),
            entry('E', 4, 5, QuestionType::LongAnswer, "LA"),
        ];

        let meta = PatternMeta {
            subject: "Mathematics".to_string(),
            class_level: "10".to_string(),
            board: "CBSE".to_string(),
            duration_minutes: 180,
        };

        // Fixed table: five distinct sections, small positive counts
        Self::new(meta, entries).expect("built-in CBSE pattern is valid")
    }

    /// Parses an alternate pattern from TOML.
    ///
    /// ```toml
    /// subject = "Science"
    /// class_level = "10"
    /// board = "CBSE"
    /// duration_minutes = 180
    ///
    /// [[sections]]
    /// id = "A"
    /// required_count = 20
    /// marks_per_question = 1
    /// question_type = "MCQ"
    /// ```
    pub fn from_toml_str(input: &str) -> Result<Self, PatternError> {
        let file: PatternFile = toml::from_str(input)?;

        let entries = file
            .sections
            .into_iter()
            .map(|s| {
                let section = s
                    .id
                    .parse::<SectionId>()
                    .map_err(|_| PatternError::InvalidSectionId(s.id.clone()))?;
                Ok(PatternEntry {
                    section,
                    required_count: s.required_count,
                    marks_per_question: s.marks_per_question,
                    question_type: s.question_type,
                    label: s.label.unwrap_or_else(|| s.question_type.to_string()),
                })
            })
            .collect::<Result<Vec<_>, PatternError>>()?;

        Self::new(file.meta, entries)
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, PatternError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn meta(&self) -> &PatternMeta {
        &self.meta
    }

    pub fn entry_for(&self, section: SectionId) -> Result<&PatternEntry, ComposeError> {
        self.sections
            .iter()
            .find(|e| e.section == section)
            .ok_or_else(|| ComposeError::UnknownSection(section.to_string()))
    }

    /// Resolves a caller-supplied identifier such as `"a"` or `" C "`.
    pub fn parse_section(&self, raw: &str) -> Result<SectionId, ComposeError> {
        let section = raw.parse::<SectionId>()?;
        self.entry_for(section)?;
        Ok(section)
    }

    /// Section ids in presentation order.
    pub fn all_sections(&self) -> impl Iterator<Item = SectionId> + '_ {
        self.sections.iter().map(|e| e.section)
    }

    pub fn entries(&self) -> &[PatternEntry] {
        &self.sections
    }

    /// Position of the section in presentation order.
    pub fn position(&self, section: SectionId) -> Option<usize> {
        self.sections.iter().position(|e| e.section == section)
    }

    pub fn total_required_questions(&self) -> u32 {
        self.total_required_questions
    }

    pub fn total_required_marks(&self) -> u32 {
        self.total_required_marks
    }
}

impl Default for CurriculumPattern {
    fn default() -> Self {
        Self::cbse_class_10_mathematics()
    }
}

#[derive(Deserialize)]
struct PatternFile {
    #[serde(flatten)]
    meta: PatternMeta,
    sections: Vec<SectionFile>,
}

#[derive(Deserialize)]
struct SectionFile {
    id: String,
    required_count: u32,
    marks_per_question: u32,
    question_type: QuestionType,
    label: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCIENCE: &str = r#"
        subject = "Science"
        class_level = "9"
        board = "State"
        duration_minutes = 90

        [[sections]]
        id = "a"
        required_count = 4
        marks_per_question = 1
        question_type = "MCQ"

        [[sections]]
        id = "B"
        required_count = 2
        marks_per_question = 5
        question_type = "LA"
        label = "Essay"
    "#;

    #[test]
    fn oversized_totals_are_rejected() {
        let toml = r#"
            subject = "Huge"
            class_level = "10"
            board = "CBSE"
            duration_minutes = 60

            [[sections]]
            id = "A"
            required_count = 4294967295
            marks_per_question = 2
            question_type = "MCQ"
        "#;

        assert!(matches!(
            CurriculumPattern::from_toml_str(toml),
            Err(PatternError::TotalsOverflow)
        ));
    }

    #[test]
    fn parses_alternate_pattern() {
        let pattern = CurriculumPattern::from_toml_str(SCIENCE).unwrap();

        assert_eq!(pattern.meta().subject, "Science");
        assert_eq!(pattern.meta().duration_minutes, 90);
        assert_eq!(pattern.total_required_questions(), 6);
        assert_eq!(pattern.total_required_marks(), 14);

        let order: Vec<char> = pattern.all_sections().map(SectionId::as_char).collect();
        assert_eq!(order, vec!['A', 'B']);

        let a = pattern.entry_for(SectionId::new('A')).unwrap();
        assert_eq!(a.label, "MCQ");
        let b = pattern.entry_for(SectionId::new('B')).unwrap();
        assert_eq!(b.label, "Essay");
    }

    #[test]
    fn rejects_duplicate_sections() {
        let input = r#"
            subject = "X"
            class_level = "1"
            board = "Y"
            duration_minutes = 10

            [[sections]]
            id = "A"
            required_count = 1
            marks_per_question = 1
            question_type = "SA"

            [[sections]]
            id = "a"
            required_count = 1
            marks_per_question = 1
            question_type = "SA"
        "#;

        let err = CurriculumPattern::from_toml_str(input).unwrap_err();
        assert!(matches!(err, PatternError::DuplicateSection(s) if s.as_char() == 'A'));
    }

    #[test]
    fn rejects_zero_marks_and_bad_ids() {
        let zero = SCIENCE.replace("marks_per_question = 5", "marks_per_question = 0");
        assert!(matches!(
            CurriculumPattern::from_toml_str(&zero),
            Err(PatternError::NonPositive(_, "marks_per_question"))
        ));

        let bad_id = SCIENCE.replace("id = \"B\"", "id = \"BB\"");
        assert!(matches!(
            CurriculumPattern::from_toml_str(&bad_id),
            Err(PatternError::InvalidSectionId(id)) if id == "BB"
        ));
    }

    #[test]
    fn bundled_toml_matches_builtin() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/config/cbse_class_10_mathematics.toml");
        let from_file = CurriculumPattern::from_toml_file(path).unwrap();
        assert_eq!(from_file, CurriculumPattern::cbse_class_10_mathematics());
    }

    #[test]
    fn parse_section_is_case_insensitive() {
        let pattern = CurriculumPattern::default();
        assert_eq!(pattern.parse_section(" c ").unwrap(), SectionId::new('C'));
        assert_eq!(
            pattern.parse_section("Z"),
            Err(ComposeError::UnknownSection("Z".to_string()))
        );
        assert_eq!(
            pattern.parse_section(""),
            Err(ComposeError::UnknownSection(String::new()))
        );
    }
}
