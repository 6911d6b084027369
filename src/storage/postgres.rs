use crate::models::{NewUrl, ShortenedUrl, UrlSummary, VisitRecord};
use crate::storage::trait_def::bounded;
use crate::storage::{Storage, StorageError, StorageResult, UrlStore, VisitStore};
use anyhow::Result;
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;

const URL_COLUMNS: &str =
    "id, short_code, manage_code, original_url, session_id, delete_after_minutes, created_at";

const VISIT_COLUMNS: &str =
    "short_code, country, country_code, city, region, ip, referer, browser, os, occurred_at";

pub struct PostgresStorage {
    pool: Arc<PgPool>,
    timeout: Duration,
}

impl PostgresStorage {
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self {
            pool: Arc::new(pool),
            timeout: Duration::from_secs(5),
        })
    }

    /// Override the per-call deadline
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl UrlStore for PostgresStorage {
    async fn create(&self, url: &NewUrl) -> StorageResult<ShortenedUrl> {
        let query = format!(
            r#"
            INSERT INTO urls (short_code, manage_code, original_url, session_id, delete_after_minutes, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {URL_COLUMNS}
            "#
        );

        bounded(
            self.timeout,
            sqlx::query_as::<_, ShortenedUrl>(&query)
                .bind(&url.short_code)
                .bind(&url.manage_code)
                .bind(&url.original_url)
                .bind(&url.session_id)
                .bind(url.delete_after_minutes)
                .bind(url.created_at)
                .fetch_one(self.pool.as_ref()),
        )
        .await
    }

    async fn get_by_short_code(&self, short_code: &str) -> StorageResult<ShortenedUrl> {
        let query = format!("SELECT {URL_COLUMNS} FROM urls WHERE short_code = $1");

        bounded(
            self.timeout,
            sqlx::query_as::<_, ShortenedUrl>(&query)
                .bind(short_code)
                .fetch_one(self.pool.as_ref()),
        )
        .await
    }

    async fn get_by_manage_code(&self, manage_code: &str) -> StorageResult<ShortenedUrl> {
        let query = format!("SELECT {URL_COLUMNS} FROM urls WHERE manage_code = $1");

        bounded(
            self.timeout,
            sqlx::query_as::<_, ShortenedUrl>(&query)
                .bind(manage_code)
                .fetch_one(self.pool.as_ref()),
        )
        .await
    }

    async fn delete(&self, manage_code: &str, session_id: &str) -> StorageResult<ShortenedUrl> {
        let query = format!(
            r#"
            DELETE FROM urls
            WHERE manage_code = $1 AND session_id = $2
            RETURNING {URL_COLUMNS}
            "#
        );

        bounded(
            self.timeout,
            sqlx::query_as::<_, ShortenedUrl>(&query)
                .bind(manage_code)
                .bind(session_id)
                .fetch_one(self.pool.as_ref()),
        )
        .await
    }

    async fn list_by_session(
        &self,
        session_id: &str,
        limit: i64,
    ) -> StorageResult<Vec<UrlSummary>> {
        bounded(
            self.timeout,
            sqlx::query_as::<_, UrlSummary>(
                r#"
                SELECT u.short_code, u.manage_code, u.original_url, u.delete_after_minutes,
                       u.created_at, COUNT(r.id) AS total_visits
                FROM urls u
                LEFT JOIN requests r ON r.short_code = u.short_code
                WHERE u.session_id = $1
                GROUP BY u.id
                ORDER BY u.created_at DESC, u.id DESC
                LIMIT $2
                "#,
            )
            .bind(session_id)
            .bind(limit)
            .fetch_all(self.pool.as_ref()),
        )
        .await
    }

    async fn list_expirable(&self) -> StorageResult<Vec<ShortenedUrl>> {
        let query = format!(
            "SELECT {URL_COLUMNS} FROM urls WHERE delete_after_minutes > 0 ORDER BY created_at"
        );

        bounded(
            self.timeout,
            sqlx::query_as::<_, ShortenedUrl>(&query).fetch_all(self.pool.as_ref()),
        )
        .await
    }
}

#[async_trait]
impl VisitStore for PostgresStorage {
    async fn record_visit(&self, visit: &VisitRecord) -> StorageResult<()> {
        let inserted = bounded(self.timeout, async {
            let mut tx = self.pool.begin().await?;

            // Share-lock the link row until commit; a concurrent delete waits or wins outright
            let link = sqlx::query_scalar::<_, i64>(
                "SELECT id FROM urls WHERE short_code = $1 FOR SHARE",
            )
            .bind(&visit.short_code)
            .fetch_optional(&mut *tx)
            .await?;

            if link.is_none() {
                return Ok(false);
            }

            sqlx::query(
                r#"
                INSERT INTO requests (short_code, country, country_code, city, region, ip, referer, browser, os, occurred_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                "#,
            )
            .bind(&visit.short_code)
            .bind(&visit.geo.country)
            .bind(&visit.geo.country_code)
            .bind(&visit.geo.city)
            .bind(&visit.geo.region)
            .bind(&visit.geo.ip)
            .bind(&visit.referer)
            .bind(&visit.user_agent.browser)
            .bind(&visit.user_agent.os)
            .bind(visit.occurred_at)
            .execute(&mut *tx)
            .await?;

            tx.commit().await?;
            Ok::<_, sqlx::Error>(true)
        })
        .await?;

        if !inserted {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn delete_all_for(&self, short_code: &str) -> StorageResult<u64> {
        let result = bounded(
            self.timeout,
            sqlx::query("DELETE FROM requests WHERE short_code = $1")
                .bind(short_code)
                .execute(self.pool.as_ref()),
        )
        .await?;

        Ok(result.rows_affected())
    }

    async fn get_all_for(&self, short_code: &str) -> StorageResult<Vec<VisitRecord>> {
        let query = format!("SELECT {VISIT_COLUMNS} FROM requests WHERE short_code = $1");

        bounded(
            self.timeout,
            sqlx::query_as::<_, VisitRecord>(&query)
                .bind(short_code)
                .fetch_all(self.pool.as_ref()),
        )
        .await
    }

    async fn count_for(&self, short_code: &str) -> StorageResult<i64> {
        bounded(
            self.timeout,
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM requests WHERE short_code = $1")
                .bind(short_code)
                .fetch_one(self.pool.as_ref()),
        )
        .await
    }

    async fn get_recent_for(
        &self,
        short_code: &str,
        limit: i64,
    ) -> StorageResult<Vec<VisitRecord>> {
        let query = format!(
            r#"
            SELECT {VISIT_COLUMNS} FROM requests
            WHERE short_code = $1
            ORDER BY occurred_at DESC, id DESC
            LIMIT $2
            "#
        );

        bounded(
            self.timeout,
            sqlx::query_as::<_, VisitRecord>(&query)
                .bind(short_code)
                .bind(limit)
                .fetch_all(self.pool.as_ref()),
        )
        .await
    }
}

#[async_trait]
impl Storage for PostgresStorage {
    async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS urls (
                id BIGSERIAL PRIMARY KEY,
                short_code TEXT NOT NULL UNIQUE,
                manage_code TEXT NOT NULL UNIQUE,
                original_url TEXT NOT NULL,
                session_id TEXT NOT NULL,
                delete_after_minutes BIGINT,
                created_at BIGINT NOT NULL
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_urls_session ON urls(session_id, created_at)")
            .execute(self.pool.as_ref())
            .await?;

        // Visit records; joined to urls by short code without a foreign key
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS requests (
                id BIGSERIAL PRIMARY KEY,
                short_code TEXT NOT NULL,
                country TEXT NOT NULL DEFAULT '',
                country_code TEXT NOT NULL DEFAULT '',
                city TEXT NOT NULL DEFAULT '',
                region TEXT NOT NULL DEFAULT '',
                ip TEXT NOT NULL DEFAULT '',
                referer TEXT NOT NULL DEFAULT '',
                browser TEXT NOT NULL DEFAULT '',
                os TEXT NOT NULL DEFAULT '',
                occurred_at BIGINT NOT NULL
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_requests_short_code ON requests(short_code)")
            .execute(self.pool.as_ref())
            .await?;

        Ok(())
    }
}
