//! PostgreSQL workflow repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use loanshark_core::WorkflowKey;
use loanshark_workflow::{StoreError, Workflow, WorkflowRepository};
use rootcause::Report;
use sqlx::{FromRow, PgPool};
use tracing::debug;

/// Row type for workflow queries.
#[derive(FromRow)]
struct WorkflowRow {
    key: String,
    definition: serde_json::Value,
    updated_at: DateTime<Utc>,
}

impl WorkflowRow {
    fn try_into_workflow(self) -> Result<Workflow, Report<StoreError>> {
        serde_json::from_value(self.definition).map_err(|e| {
            StoreError::Serialization {
                reason: format!("invalid workflow '{}': {e}", self.key),
            }
            .into()
        })
    }
}

fn backend(e: sqlx::Error) -> StoreError {
    StoreError::Backend {
        reason: e.to_string(),
    }
}

fn definition(workflow: &Workflow) -> Result<serde_json::Value, Report<StoreError>> {
    serde_json::to_value(workflow).map_err(|e| {
        StoreError::Serialization {
            reason: e.to_string(),
        }
        .into()
    })
}

/// [`WorkflowRepository`] backed by the `workflows` table.
pub struct PgWorkflowRepository {
    pool: PgPool,
}

impl PgWorkflowRepository {
    /// Creates a new repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WorkflowRepository for PgWorkflowRepository {
    async fn create(&self, key: &WorkflowKey, workflow: &Workflow) -> Result<(), Report<StoreError>> {
        let result = sqlx::query(
            r#"
            INSERT INTO workflows (key, creator, state, definition)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (key) DO NOTHING
            "#,
        )
        .bind(key.as_str())
        .bind(&workflow.creator)
        .bind(workflow.state.to_string())
        .bind(definition(workflow)?)
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::AlreadyExists { key: key.clone() }.into());
        }
        debug!(workflow_key = %key, "workflow row inserted");
        Ok(())
    }

    async fn update(&self, workflow: &Workflow) -> Result<(), Report<StoreError>> {
        let key = workflow.key.as_ref().ok_or(StoreError::MissingKey)?;

        sqlx::query(
            r#"
            INSERT INTO workflows (key, creator, state, definition)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (key) DO UPDATE
            SET creator = EXCLUDED.creator, state = EXCLUDED.state,
                definition = EXCLUDED.definition, updated_at = NOW()
            "#,
        )
        .bind(key.as_str())
        .bind(&workflow.creator)
        .bind(workflow.state.to_string())
        .bind(definition(workflow)?)
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        debug!(workflow_key = %key, "workflow row updated");
        Ok(())
    }

    async fn get(&self, key: &WorkflowKey) -> Result<Option<Workflow>, Report<StoreError>> {
        let row: Option<WorkflowRow> = sqlx::query_as(
            r#"
            SELECT key, definition, updated_at
            FROM workflows
            WHERE key = $1
            "#,
        )
        .bind(key.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        let Some(row) = row else {
            return Ok(None);
        };
        debug!(workflow_key = %key, updated_at = %row.updated_at, "workflow row loaded");
        row.try_into_workflow().map(Some)
    }

    async fn delete(&self, key: &WorkflowKey) -> Result<(), Report<StoreError>> {
        let result = sqlx::query(
            r#"
            DELETE FROM workflows
            WHERE key = $1
            "#,
        )
        .bind(key.as_str())
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound { key: key.clone() }.into());
        }
        Ok(())
    }
}
