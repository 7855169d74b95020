//! Persistence seam.
//!
//! The engine never talks to storage; handlers and services go through
//! these traits so the Postgres store can be swapped for the in-memory one.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;

use crate::{
    engine::{ExamDraft, Question},
    models::{
        exam::{Exam, StoredQuestion},
        user::{NewUser, User},
    },
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with `StoreError::Conflict` when the email is taken.
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn find_user(&self, id: i64) -> Result<Option<User>, StoreError>;
}

#[async_trait]
pub trait ExamStore: Send + Sync {
    async fn insert_exam(&self, owner_id: i64, exam: &ExamDraft) -> Result<Exam, StoreError>;

    /// Inserts the whole batch or nothing.
    async fn insert_questions(&self, exam_id: i64, questions: &[Question]) -> Result<(), StoreError>;

    async fn delete_exam(&self, exam_id: i64) -> Result<(), StoreError>;

    async fn find_exam(&self, exam_id: i64) -> Result<Option<Exam>, StoreError>;

    /// Ordered by section, then question number.
    async fn list_questions(&self, exam_id: i64) -> Result<Vec<StoredQuestion>, StoreError>;

    /// Newest first.
    async fn list_exams_by_owner(&self, owner_id: i64) -> Result<Vec<Exam>, StoreError>;
}
