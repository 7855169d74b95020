// src/store/memory.rs

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{ExamStore, StoreError, UserStore};
use crate::{
    engine::{ExamDraft, Question},
    models::{
        exam::{Exam, StoredQuestion},
        user::{NewUser, User},
    },
};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    exams: Vec<Exam>,
    questions: Vec<StoredQuestion>,
    next_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Process-local store. Used by the test-suite and for running without Postgres.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let mut tables = self.tables.write().await;

        if tables.users.iter().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict(format!(
                "Email '{}' is already registered",
                user.email
            )));
        }

        let created = User {
            id: tables.next_id(),
            email: user.email,
            display_name: user.display_name,
            password: user.password_hash,
            created_at: Some(chrono::Utc::now()),
        };
        tables.users.push(created.clone());

        Ok(created)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_user(&self, id: i64) -> Result<Option<User>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.id == id).cloned())
    }
}

#[async_trait]
impl ExamStore for MemoryStore {
    async fn insert_exam(&self, owner_id: i64, exam: &ExamDraft) -> Result<Exam, StoreError> {
        let mut tables = self.tables.write().await;

        let created = Exam {
            id: tables.next_id(),
            owner_id,
            title: exam.title.clone(),
            subject: exam.subject.clone(),
            class_level: exam.class_level.clone(),
            board: exam.board.clone(),
            total_marks: exam.total_marks as i32,
            duration_minutes: exam.duration_minutes as i32,
            created_at: Some(chrono::Utc::now()),
        };
        tables.exams.push(created.clone());

        Ok(created)
    }

    async fn insert_questions(&self, exam_id: i64, questions: &[Question]) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;

        if !tables.exams.iter().any(|e| e.id == exam_id) {
            return Err(StoreError::NotFound(format!("Exam {}", exam_id)));
        }

        let duplicate = questions.iter().any(|q| {
            let section = q.section.to_string();
            tables.questions.iter().any(|s| {
                s.exam_id == exam_id
                    && s.section == section
                    && s.question_number == q.question_number as i32
            })
        });
        if duplicate {
            return Err(StoreError::Conflict(format!(
                "Exam {} already has questions with these numbers",
                exam_id
            )));
        }

        for q in questions {
            let id = tables.next_id();
            tables.questions.push(StoredQuestion {
                id,
                exam_id,
                section: q.section.to_string(),
                question_number: q.question_number as i32,
                question_text: q.question_text.clone(),
                question_type: q.question_type.as_str().to_string(),
                marks: q.marks as i32,
            });
        }

        Ok(())
    }

    async fn delete_exam(&self, exam_id: i64) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;

        let before = tables.exams.len();
        tables.exams.retain(|e| e.id != exam_id);
        if tables.exams.len() == before {
            return Err(StoreError::NotFound(format!("Exam {}", exam_id)));
        }
        tables.questions.retain(|q| q.exam_id != exam_id);

        Ok(())
    }

    async fn find_exam(&self, exam_id: i64) -> Result<Option<Exam>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.exams.iter().find(|e| e.id == exam_id).cloned())
    }

    async fn list_questions(&self, exam_id: i64) -> Result<Vec<StoredQuestion>, StoreError> {
        let tables = self.tables.read().await;

        let mut questions: Vec<StoredQuestion> = tables
            .questions
            .iter()
            .filter(|q| q.exam_id == exam_id)
            .cloned()
            .collect();
        questions.sort_by(|a, b| {
            a.section
                .cmp(&b.section)
                .then(a.question_number.cmp(&b.question_number))
        });

        Ok(questions)
    }

    async fn list_exams_by_owner(&self, owner_id: i64) -> Result<Vec<Exam>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .exams
            .iter()
            .rev()
            .filter(|e| e.owner_id == owner_id)
            .cloned()
            .collect())
    }
}
