use std::future::Future;

use anyhow::Context;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgConnection;
use sqlx::{Connection, PgPool, Row};

use crate::error::StoreError;
use crate::ingest::format_timestamp;
use crate::models::{ClassificationStatus, DatasetSummary, Review};
use crate::store::{Dataset, DatasetSink, DatasetStore};

/// Advisory lock key shared by every process importing into this database.
const UPLOAD_LOCK_KEY: i64 = 0x5245_5649_4557;

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Session-level advisory lock held for a whole import, from reading the
/// file until the new dataset is committed. Lives on a connection detached
/// from the pool; dropping it closes the session, which releases the lock.
pub struct UploadLock {
    conn: PgConnection,
}

/// Claims the import slot, or fails with `UploadInProgress` when another
/// process holds it.
pub async fn try_lock_upload(pool: &PgPool) -> anyhow::Result<UploadLock> {
    let mut conn = pool.acquire().await?.detach();
    let acquired: bool = sqlx::query_scalar("SELECT pg_try_advisory_lock($1)")
        .bind(UPLOAD_LOCK_KEY)
        .fetch_one(&mut conn)
        .await?;

    if !acquired {
        return Err(StoreError::UploadInProgress.into());
    }
    Ok(UploadLock { conn })
}

impl UploadLock {
    pub async fn release(mut self) -> anyhow::Result<()> {
        sqlx::query("SELECT pg_advisory_unlock($1)")
            .bind(UPLOAD_LOCK_KEY)
            .execute(&mut self.conn)
            .await?;
        self.conn.close().await?;
        Ok(())
    }
}

impl DatasetSink for PgPool {
    fn replace(&self, dataset: &Dataset) -> impl Future<Output = anyhow::Result<usize>> + Send {
        replace_dataset(self, dataset)
    }
}

/// Replaces the stored dataset in one transaction. Readers see either the old
/// set or the new one, never a mix.
pub async fn replace_dataset(pool: &PgPool, dataset: &Dataset) -> anyhow::Result<usize> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM review_insights.reviews")
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM review_insights.datasets")
        .execute(&mut *tx)
        .await?;

    sqlx::query(
        r#"
        INSERT INTO review_insights.datasets (source_name, loaded_at, review_count, status)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(&dataset.source_name)
    .bind(dataset.loaded_at)
    .bind(dataset.reviews.len() as i64)
    .bind(dataset.status.as_str())
    .execute(&mut *tx)
    .await?;

    for (position, review) in dataset.reviews.iter().enumerate() {
        let reviewed_at = review
            .timestamp()
            .with_context(|| format!("review {} has an unparseable date", review.id))?;

        sqlx::query(
            r#"
            INSERT INTO review_insights.reviews
            (id, position, platform, author, rating, body, reviewed_at, sentiment, theme)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(&review.id)
        .bind(position as i32)
        .bind(review.platform.as_str())
        .bind(&review.author)
        .bind(i16::from(review.rating))
        .bind(&review.text)
        .bind(reviewed_at)
        .bind(review.sentiment.as_str())
        .bind(review.theme.as_str())
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(dataset.reviews.len())
}

pub async fn fetch_reviews(pool: &PgPool) -> anyhow::Result<Vec<Review>> {
    let records = sqlx::query(
        "SELECT id, platform, author, rating, body, reviewed_at, sentiment, theme \
         FROM review_insights.reviews \
         ORDER BY position",
    )
    .fetch_all(pool)
    .await?;

    let mut reviews = Vec::with_capacity(records.len());

    for row in records {
        let id: String = row.get("id");
        let rating: i16 = row.get("rating");
        let reviewed_at: DateTime<Utc> = row.get("reviewed_at");
        let platform: String = row.get("platform");
        let sentiment: String = row.get("sentiment");
        let theme: String = row.get("theme");

        reviews.push(Review {
            platform: platform
                .parse()
                .map_err(anyhow::Error::msg)
                .with_context(|| format!("stored review {id}"))?,
            author: row.get("author"),
            rating: u8::try_from(rating)
                .with_context(|| format!("stored review {id} has rating {rating}"))?,
            text: row.get("body"),
            date: format_timestamp(&reviewed_at),
            sentiment: sentiment
                .parse()
                .map_err(anyhow::Error::msg)
                .with_context(|| format!("stored review {id}"))?,
            theme: theme
                .parse()
                .map_err(anyhow::Error::msg)
                .with_context(|| format!("stored review {id}"))?,
            id,
        });
    }

    Ok(reviews)
}

pub async fn fetch_summary(pool: &PgPool) -> anyhow::Result<Option<DatasetSummary>> {
    let row = sqlx::query(
        "SELECT source_name, loaded_at, review_count, status FROM review_insights.datasets LIMIT 1",
    )
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let status: String = row.get("status");
    Ok(Some(DatasetSummary {
        source_name: row.get("source_name"),
        loaded_at: row.get("loaded_at"),
        review_count: row.get("review_count"),
        status: status
            .parse::<ClassificationStatus>()
            .map_err(anyhow::Error::msg)?,
    }))
}

/// Reads the persisted dataset back into the in-memory shape.
pub async fn load_dataset(pool: &PgPool) -> anyhow::Result<Option<Dataset>> {
    let Some(summary) = fetch_summary(pool).await? else {
        return Ok(None);
    };
    let reviews = fetch_reviews(pool).await?;
    anyhow::ensure!(
        reviews.len() as i64 == summary.review_count,
        "stored dataset {} lists {} reviews but {} were found",
        summary.source_name,
        summary.review_count,
        reviews.len()
    );

    Ok(Some(Dataset {
        source_name: summary.source_name,
        loaded_at: summary.loaded_at,
        status: summary.status,
        reviews: reviews.into(),
    }))
}

/// Store seeded with whatever dataset is persisted, empty when nothing is.
pub async fn open_store(pool: &PgPool) -> anyhow::Result<DatasetStore> {
    Ok(match load_dataset(pool).await? {
        Some(dataset) => DatasetStore::with_dataset(dataset),
        None => DatasetStore::new(),
    })
}
