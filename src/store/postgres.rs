// src/store/postgres.rs

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};

use super::{ExamStore, StoreError, UserStore};
use crate::{
    engine::{ExamDraft, Question},
    models::{
        exam::{Exam, StoredQuestion},
        user::{NewUser, User},
    },
};

/// Store backed by the Postgres schema in `migrations/`.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, display_name, password)
            VALUES ($1, $2, $3)
            RETURNING id, email, display_name, password, created_at
            "#,
        )
        .bind(&user.email)
        .bind(&user.display_name)
        .bind(&user.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db) = &e {
                if db.is_unique_violation() {
                    return StoreError::Conflict(format!(
                        "Email '{}' is already registered",
                        user.email
                    ));
                }
            }
            StoreError::Database(e)
        })
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, display_name, password, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_user(&self, id: i64) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, display_name, password, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }
}

#[async_trait]
impl ExamStore for PgStore {
    async fn insert_exam(&self, owner_id: i64, exam: &ExamDraft) -> Result<Exam, StoreError> {
        let exam = sqlx::query_as::<_, Exam>(
            r#"
            INSERT INTO exams
                (owner_id, title, subject, class_level, board, total_marks, duration_minutes)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING
                id, owner_id, title, subject, class_level, board,
                total_marks, duration_minutes, created_at
            "#,
        )
        .bind(owner_id)
        .bind(&exam.title)
        .bind(&exam.subject)
        .bind(&exam.class_level)
        .bind(&exam.board)
        .bind(exam.total_marks as i32)
        .bind(exam.duration_minutes as i32)
        .fetch_one(&self.pool)
        .await?;

        Ok(exam)
    }

    async fn insert_questions(&self, exam_id: i64, questions: &[Question]) -> Result<(), StoreError> {
        if questions.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;

        // Single multi-row insert
        let mut query_builder = QueryBuilder::<Postgres>::new(
            "INSERT INTO exam_questions
                (exam_id, section, question_number, question_text, question_type, marks) ",
        );
        query_builder.push_values(questions, |mut row, q| {
            row.push_bind(exam_id)
                .push_bind(q.section.to_string())
                .push_bind(q.question_number as i32)
                .push_bind(q.question_text.clone())
                .push_bind(q.question_type.as_str())
                .push_bind(q.marks as i32);
        });

        query_builder.build().execute(&mut *tx).await?;
        tx.commit().await?;

        Ok(())
    }

    async fn delete_exam(&self, exam_id: i64) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM exams WHERE id = $1")
            .bind(exam_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("Exam {}", exam_id)));
        }
        Ok(())
    }

    async fn find_exam(&self, exam_id: i64) -> Result<Option<Exam>, StoreError> {
        let exam = sqlx::query_as::<_, Exam>(
            r#"
            SELECT
                id, owner_id, title, subject, class_level, board,
                total_marks, duration_minutes, created_at
            FROM exams
            WHERE id = $1
            "#,
        )
        .bind(exam_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(exam)
    }

    async fn list_questions(&self, exam_id: i64) -> Result<Vec<StoredQuestion>, StoreError> {
        let questions = sqlx::query_as::<_, StoredQuestion>(
            r#"
            SELECT
                id, exam_id, section, question_number,
                question_text, question_type, marks
            FROM exam_questions
            WHERE exam_id = $1
            ORDER BY section, question_number
            "#,
        )
        .bind(exam_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(questions)
    }

    async fn list_exams_by_owner(&self, owner_id: i64) -> Result<Vec<Exam>, StoreError> {
        let exams = sqlx::query_as::<_, Exam>(
            r#"
            SELECT
                id, owner_id, title, subject, class_level, board,
                total_marks, duration_minutes, created_at
            FROM exams
            WHERE owner_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(exams)
    }
}
