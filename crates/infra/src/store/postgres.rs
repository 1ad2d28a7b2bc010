//! Postgres-backed intake store.
//!
//! Each intake table holds its uniqueness columns plus the validated record
//! as JSONB. Uniqueness is enforced by the schema; the pre-insert `*_exists`
//! lookups only let callers answer "already exists" without a failed write.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `Duplicate` |
//! | Database (other) | any other | `Storage` |
//! | PoolClosed / Io / other | N/A | `Storage` |

use async_trait::async_trait;
use serde::Serialize;
use sqlx::{PgPool, Row};
use tracing::instrument;

use investi_core::{ApplicationId, EmailAddress};
use investi_intake::{
    ApplicationKind, CareerApplication, FounderApplication, InvestorApplication,
    NewCareerApplication, NewInvestorApplication, NewsletterSubscription, WaitlistEntry,
};

use super::{IntakeCounts, IntakeStore, StoreError};

const SCHEMA: &str = include_str!("../../migrations/0001_init.sql");

/// Create the intake and email-queue tables if they do not exist.
pub async fn run_migrations(pool: &PgPool) -> Result<(), StoreError> {
    sqlx::raw_sql(SCHEMA)
        .execute(pool)
        .await
        .map_err(|e| map_sqlx_error("run_migrations", e))?;
    Ok(())
}

/// Postgres-backed intake store.
///
/// Uses the SQLx connection pool, which is `Send + Sync` and cheap to clone.
#[derive(Debug, Clone)]
pub struct PostgresIntakeStore {
    pool: PgPool,
}

impl PostgresIntakeStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn exists(&self, operation: &str, sql: &str, binds: &[&str]) -> Result<bool, StoreError> {
        let mut query = sqlx::query(sql);
        for b in binds {
            query = query.bind(*b);
        }
        let row = query
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error(operation, e))?;
        row.try_get::<bool, _>(0)
            .map_err(|e| map_sqlx_error(operation, e))
    }

    async fn count(&self, table: &'static str) -> Result<u64, StoreError> {
        let sql = format!("SELECT COUNT(*) FROM {table}");
        let row = sqlx::query(&sql)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("count", e))?;
        let n: i64 = row.try_get(0).map_err(|e| map_sqlx_error("count", e))?;
        Ok(u64::try_from(n).unwrap_or_default())
    }
}

fn to_details<T: Serialize>(value: &T) -> Result<serde_json::Value, StoreError> {
    serde_json::to_value(value).map_err(|e| StoreError::storage(format!("serialize record: {e}")))
}

#[async_trait]
impl IntakeStore for PostgresIntakeStore {
    async fn founder_exists(&self, email: &EmailAddress) -> Result<bool, StoreError> {
        self.exists(
            "founder_exists",
            "SELECT EXISTS (SELECT 1 FROM founder_applications WHERE email = $1)",
            &[email.as_str()],
        )
        .await
    }

    #[instrument(skip(self, app), fields(application_id = %app.id), err)]
    async fn insert_founder(&self, app: &FounderApplication) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO founder_applications (id, email, details, created_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(app.id.as_uuid())
        .bind(app.details.email.as_str())
        .bind(to_details(&app.details)?)
        .bind(app.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_founder", e))?;
        Ok(())
    }

    async fn investor_exists(&self, candidate: &NewInvestorApplication) -> Result<bool, StoreError> {
        let identity = candidate.identity();
        self.exists(
            "investor_exists",
            r#"
            SELECT EXISTS (
                SELECT 1 FROM investor_applications
                WHERE email = $1 OR (name_key = $2 AND company_key = $3)
            )
            "#,
            &[candidate.email.as_str(), &identity.name, &identity.company],
        )
        .await
    }

    #[instrument(skip(self, app), fields(application_id = %app.id), err)]
    async fn insert_investor(&self, app: &InvestorApplication) -> Result<(), StoreError> {
        let identity = app.details.identity();
        sqlx::query(
            r#"
            INSERT INTO investor_applications (id, email, name_key, company_key, details, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(app.id.as_uuid())
        .bind(app.details.email.as_str())
        .bind(&identity.name)
        .bind(&identity.company)
        .bind(to_details(&app.details)?)
        .bind(app.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_investor", e))?;
        Ok(())
    }

    async fn career_exists(&self, candidate: &NewCareerApplication) -> Result<bool, StoreError> {
        let (email, position_key) = candidate.uniqueness_key();
        self.exists(
            "career_exists",
            "SELECT EXISTS (SELECT 1 FROM career_applications WHERE email = $1 AND position_key = $2)",
            &[email.as_str(), &position_key],
        )
        .await
    }

    #[instrument(skip(self, app), fields(application_id = %app.id), err)]
    async fn insert_career(&self, app: &CareerApplication) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO career_applications (id, email, position_key, details, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(app.id.as_uuid())
        .bind(app.details.email.as_str())
        .bind(app.details.uniqueness_key().1)
        .bind(to_details(&app.details)?)
        .bind(app.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_career", e))?;
        Ok(())
    }

    async fn subscription_exists(&self, email: &EmailAddress) -> Result<bool, StoreError> {
        self.exists(
            "subscription_exists",
            "SELECT EXISTS (SELECT 1 FROM newsletter_subscriptions WHERE email = $1)",
            &[email.as_str()],
        )
        .await
    }

    #[instrument(skip(self, sub), fields(subscription_id = %sub.id), err)]
    async fn insert_subscription(&self, sub: &NewsletterSubscription) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO newsletter_subscriptions (id, email, name, source, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(sub.id.as_uuid())
        .bind(sub.details.email.as_str())
        .bind(sub.details.name.as_deref())
        .bind(&sub.details.source)
        .bind(sub.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_subscription", e))?;
        Ok(())
    }

    #[instrument(skip(self, entry), fields(entry_id = %entry.id), err)]
    async fn insert_waitlist(&self, entry: &WaitlistEntry) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO waitlist (id, email, created_at) VALUES ($1, $2, $3)")
            .bind(entry.id.as_uuid())
            .bind(entry.email.as_str())
            .bind(entry.created_at)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("insert_waitlist", e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(kind = %kind, id = %id), err)]
    async fn delete_application(&self, kind: ApplicationKind, id: ApplicationId) -> Result<bool, StoreError> {
        let sql = match kind {
            ApplicationKind::Founder => "DELETE FROM founder_applications WHERE id = $1",
            ApplicationKind::Investor => "DELETE FROM investor_applications WHERE id = $1",
            ApplicationKind::Career => "DELETE FROM career_applications WHERE id = $1",
        };
        let result = sqlx::query(sql)
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_application", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn counts(&self) -> Result<IntakeCounts, StoreError> {
        Ok(IntakeCounts {
            founders: self.count("founder_applications").await?,
            investors: self.count("investor_applications").await?,
            careers: self.count("career_applications").await?,
            newsletter: self.count("newsletter_subscriptions").await?,
            waitlist: self.count("waitlist").await?,
        })
    }
}

/// Map SQLx errors to `StoreError`.
pub(crate) fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::Duplicate(msg),
                _ => StoreError::Storage(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Storage(format!("connection pool closed in {}", operation))
        }
        sqlx::Error::RowNotFound => {
            StoreError::NotFound(format!("row not found in {}", operation))
        }
        _ => StoreError::Storage(format!("sqlx error in {}: {}", operation, err)),
    }
}
