//! Postgres-backed email queue.
//!
//! The claim is a single `UPDATE ... WHERE id IN (SELECT ... FOR UPDATE SKIP LOCKED)`
//! statement: rows locked by a concurrent claim are skipped rather than waited
//! on, so overlapping cron invocations partition the backlog between them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use tracing::instrument;
use uuid::Uuid;

use investi_core::EmailAddress;

use super::store::{ClaimRequest, EmailQueueStore};
use super::types::{EmailJob, EmailJobId, EmailJobStatus, QueueStats};
use crate::store::StoreError;
use crate::store::postgres::map_sqlx_error;

const JOB_COLUMNS: &str = "id, recipient, template, data, status, attempts, last_error, \
     created_at, updated_at, next_attempt_at, claimed_at, sent_at";

#[derive(Debug, Clone)]
pub struct PostgresEmailQueueStore {
    pool: PgPool,
}

impl PostgresEmailQueueStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fail_stranded(&self, request: &ClaimRequest) -> Result<u64, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE email_queue
            SET status = 'failed',
                last_error = COALESCE(last_error, 'attempt ceiling reached'),
                updated_at = $1
            WHERE attempts >= $3
              AND (
                   (status = 'pending' AND (next_attempt_at IS NULL OR next_attempt_at <= $1))
                OR (status = 'in_flight' AND claimed_at <= $1 - make_interval(secs => $2))
              )
            "#,
        )
        .bind(request.now)
        .bind(request.lease.as_secs_f64())
        .bind(attempts_param(request.max_attempts))
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("fail_stranded", e))?;
        Ok(result.rows_affected())
    }
}

/// Claim due pending jobs and lease-expired in-flight jobs, oldest first.
/// Both branches stay under the attempt ceiling (`$4`) on their own.
fn claim_sql() -> String {
    format!(
        r#"
        UPDATE email_queue
        SET status = 'in_flight',
            attempts = attempts + 1,
            claimed_at = $1,
            updated_at = $1
        WHERE id IN (
            SELECT id FROM email_queue
            WHERE attempts < $4
              AND (
                   (status = 'pending' AND (next_attempt_at IS NULL OR next_attempt_at <= $1))
                OR (status = 'in_flight' AND claimed_at <= $1 - make_interval(secs => $2))
              )
            ORDER BY created_at, id
            LIMIT $3
            FOR UPDATE SKIP LOCKED
        )
        RETURNING {JOB_COLUMNS}
        "#
    )
}

fn attempts_param(n: u32) -> i32 {
    i32::try_from(n).unwrap_or(i32::MAX)
}

fn limit_param(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

#[async_trait]
impl EmailQueueStore for PostgresEmailQueueStore {
    #[instrument(skip(self, job), fields(job_id = %job.id, template = %job.template))]
    async fn enqueue(&self, job: EmailJob) -> Result<EmailJobId, StoreError> {
        sqlx::query(
            r#"
            INSERT INTO email_queue
                (id, recipient, template, data, status, attempts, last_error,
                 created_at, updated_at, next_attempt_at, claimed_at, sent_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(job.id.0)
        .bind(job.recipient.as_str())
        .bind(&job.template)
        .bind(&job.data)
        .bind(job.status.as_str())
        .bind(attempts_param(job.attempts))
        .bind(&job.last_error)
        .bind(job.created_at)
        .bind(job.updated_at)
        .bind(job.next_attempt_at)
        .bind(job.claimed_at)
        .bind(job.sent_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("enqueue", e))?;
        Ok(job.id)
    }

    #[instrument(skip(self), fields(limit = request.limit))]
    async fn claim_batch(&self, request: ClaimRequest) -> Result<Vec<EmailJob>, StoreError> {
        if request.limit == 0 {
            return Ok(Vec::new());
        }

        let stranded = self.fail_stranded(&request).await?;
        if stranded > 0 {
            tracing::warn!(stranded, "dead-lettered claimable jobs already at the attempt ceiling");
        }

        let sql = claim_sql();
        let rows = sqlx::query(&sql)
            .bind(request.now)
            .bind(request.lease.as_secs_f64())
            .bind(limit_param(request.limit))
            .bind(attempts_param(request.max_attempts))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("claim_batch", e))?;

        // RETURNING does not preserve the subquery order.
        let mut jobs = rows.iter().map(job_from_row).collect::<Result<Vec<_>, _>>()?;
        jobs.sort_by_key(|j| (j.created_at, j.id));
        Ok(jobs)
    }

    #[instrument(skip(self, job), fields(job_id = %job.id, status = job.status.as_str()))]
    async fn record_attempt(&self, job: &EmailJob) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE email_queue
            SET status = $2,
                last_error = $3,
                updated_at = $4,
                next_attempt_at = $5,
                sent_at = $6
            WHERE id = $1 AND status = 'in_flight' AND attempts = $7
            "#,
        )
        .bind(job.id.0)
        .bind(job.status.as_str())
        .bind(&job.last_error)
        .bind(job.updated_at)
        .bind(job.next_attempt_at)
        .bind(job.sent_at)
        .bind(attempts_param(job.attempts))
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("record_attempt", e))?;
        Ok(result.rows_affected() == 1)
    }

    async fn get(&self, id: EmailJobId) -> Result<Option<EmailJob>, StoreError> {
        let sql = format!("SELECT {JOB_COLUMNS} FROM email_queue WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get", e))?;
        row.as_ref().map(job_from_row).transpose()
    }

    async fn stats(&self) -> Result<QueueStats, StoreError> {
        let rows = sqlx::query("SELECT status, COUNT(*) AS n FROM email_queue GROUP BY status")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("stats", e))?;

        let mut stats = QueueStats::default();
        for row in rows {
            let status: String = row.try_get("status").map_err(|e| map_sqlx_error("stats", e))?;
            let n: i64 = row.try_get("n").map_err(|e| map_sqlx_error("stats", e))?;
            let status = status.parse::<EmailJobStatus>().map_err(StoreError::storage)?;
            stats.record(status, u64::try_from(n).unwrap_or_default());
        }
        Ok(stats)
    }

    async fn list_failed(&self, limit: usize) -> Result<Vec<EmailJob>, StoreError> {
        let sql = format!(
            "SELECT {JOB_COLUMNS} FROM email_queue WHERE status = 'failed' \
             ORDER BY updated_at DESC LIMIT $1"
        );
        let rows = sqlx::query(&sql)
            .bind(limit_param(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_failed", e))?;
        rows.iter().map(job_from_row).collect()
    }

    #[instrument(skip(self))]
    async fn retry_failed(&self, id: EmailJobId) -> Result<EmailJob, StoreError> {
        let sql = format!(
            r#"
            UPDATE email_queue
            SET status = 'pending',
                attempts = 0,
                next_attempt_at = NULL,
                claimed_at = NULL,
                updated_at = now()
            WHERE id = $1 AND status = 'failed'
            RETURNING {JOB_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("retry_failed", e))?;
        match row {
            Some(row) => job_from_row(&row),
            None => Err(StoreError::NotFound(format!("failed email job {id}"))),
        }
    }
}

fn job_from_row(row: &sqlx::postgres::PgRow) -> Result<EmailJob, StoreError> {
    let get_err = |e| map_sqlx_error("decode email job", e);

    let id: Uuid = row.try_get("id").map_err(get_err)?;
    let recipient: String = row.try_get("recipient").map_err(get_err)?;
    let status: String = row.try_get("status").map_err(get_err)?;
    let attempts: i32 = row.try_get("attempts").map_err(get_err)?;
    let created_at: DateTime<Utc> = row.try_get("created_at").map_err(get_err)?;
    let updated_at: DateTime<Utc> = row.try_get("updated_at").map_err(get_err)?;

    Ok(EmailJob {
        id: EmailJobId::from_uuid(id),
        recipient: EmailAddress::parse(&recipient)
            .map_err(|e| StoreError::storage(format!("email job {id}: {e}")))?,
        template: row.try_get("template").map_err(get_err)?,
        data: row.try_get("data").map_err(get_err)?,
        status: status.parse().map_err(StoreError::storage)?,
        attempts: u32::try_from(attempts).unwrap_or_default(),
        last_error: row.try_get("last_error").map_err(get_err)?,
        created_at,
        updated_at,
        next_attempt_at: row.try_get("next_attempt_at").map_err(get_err)?,
        claimed_at: row.try_get("claimed_at").map_err(get_err)?,
        sent_at: row.try_get("sent_at").map_err(get_err)?,
    })
}
