//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `StudySetStore` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{types::Json, FromRow, PgPool};
use study_set_core::domain::{NewStudySet, QuestionRecord, StudySet, StudySetKind, StudySetSummary};
use study_set_core::ports::{PortError, PortResult, StudySetStore};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `StudySetStore` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct StudySetRecord {
    id: Uuid,
    title: String,
    description: String,
    kind: String,
    questions: Json<Vec<QuestionRecord>>,
    created_at: DateTime<Utc>,
}
impl StudySetRecord {
    fn to_domain(self) -> PortResult<StudySet> {
        Ok(StudySet {
            id: self.id,
            title: self.title,
            description: self.description,
            kind: parse_kind(&self.kind)?,
            questions: self.questions.0,
            created_at: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct StudySetSummaryRecord {
    id: Uuid,
    title: String,
    description: String,
    kind: String,
    question_count: i32,
    created_at: DateTime<Utc>,
}
impl StudySetSummaryRecord {
    fn to_domain(self) -> PortResult<StudySetSummary> {
        Ok(StudySetSummary {
            id: self.id,
            title: self.title,
            description: self.description,
            kind: parse_kind(&self.kind)?,
            question_count: self.question_count.max(0) as usize,
            created_at: self.created_at,
        })
    }
}

fn parse_kind(raw: &str) -> PortResult<StudySetKind> {
    raw.parse::<StudySetKind>().map_err(PortError::Unexpected)
}

fn db_error(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

//=========================================================================================
// `StudySetStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl StudySetStore for DbAdapter {
    async fn persist(&self, study_set: NewStudySet) -> PortResult<StudySet> {
        let record = sqlx::query_as::<_, StudySetRecord>(
            "INSERT INTO study_sets (id, title, description, kind, questions) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id, title, description, kind, questions, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(&study_set.title)
        .bind(&study_set.description)
        .bind(study_set.kind.as_str())
        .bind(Json(&study_set.questions))
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)?;

        record.to_domain()
    }

    async fn fetch(&self, id: Uuid) -> PortResult<StudySet> {
        let record = sqlx::query_as::<_, StudySetRecord>(
            "SELECT id, title, description, kind, questions, created_at FROM study_sets WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?
        .ok_or_else(|| PortError::NotFound(format!("Study set {} not found", id)))?;

        record.to_domain()
    }

    async fn update(&self, id: Uuid, study_set: NewStudySet) -> PortResult<StudySet> {
        let record = sqlx::query_as::<_, StudySetRecord>(
            "UPDATE study_sets SET title = $2, description = $3, kind = $4, questions = $5 \
             WHERE id = $1 \
             RETURNING id, title, description, kind, questions, created_at",
        )
        .bind(id)
        .bind(&study_set.title)
        .bind(&study_set.description)
        .bind(study_set.kind.as_str())
        .bind(Json(&study_set.questions))
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?
        .ok_or_else(|| PortError::NotFound(format!("Study set {} not found", id)))?;

        record.to_domain()
    }

    async fn list(&self) -> PortResult<Vec<StudySetSummary>> {
        let records = sqlx::query_as::<_, StudySetSummaryRecord>(
            "SELECT id, title, description, kind, jsonb_array_length(questions) AS question_count, created_at \
             FROM study_sets ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        records.into_iter().map(StudySetSummaryRecord::to_domain).collect()
    }

    async fn delete(&self, id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM study_sets WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Study set {} not found", id)));
        }
        Ok(())
    }
}
