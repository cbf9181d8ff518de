//! Attempt counters per link.
//!
//! Every mutation runs under the link's [`KeyLocks`](super::KeyLocks) entry and
//! replaces the row with delete-then-insert inside one transaction, so a link
//! never has more than one record and concurrent writers to the same link are
//! serialized.

use crate::error::DatabaseError;
use crate::{Error, Result};

use super::{Database, LinkRecord, LinkState};

impl Database {
    /// Get the attempt count for a link
    ///
    /// A link that has never been recorded has a count of 0.
    pub async fn get_count(&self, link: &str) -> Result<u32> {
        let count: Option<i64> =
            sqlx::query_scalar("SELECT attempt_count FROM links WHERE link = ?")
                .bind(link)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| {
                    Error::Database(DatabaseError::QueryFailed(format!(
                        "Failed to get attempt count: {}",
                        e
                    )))
                })?;

        Ok(count.map(to_count).unwrap_or(0))
    }

    /// Get the full record for a link
    pub async fn get_link(&self, link: &str) -> Result<Option<LinkRecord>> {
        let record = sqlx::query_as::<_, LinkRecord>(
            r#"
            SELECT id, link, attempt_count, succeeded, last_update
            FROM links
            WHERE link = ?
            "#,
        )
        .bind(link)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to get link: {}",
                e
            )))
        })?;

        Ok(record)
    }

    /// Replace the attempt count for a link
    ///
    /// Idempotent: setting the same count twice leaves that count stored.
    pub async fn set_count(&self, link: &str, count: u32) -> Result<()> {
        let _guard = self.locks.lock(link).await;
        self.replace_link(link, count, false).await
    }

    /// Add one attempt to a link and return the new count
    pub async fn increment(&self, link: &str) -> Result<u32> {
        let _guard = self.locks.lock(link).await;
        let count = self.get_count(link).await?.saturating_add(1);
        self.replace_link(link, count, false).await?;
        Ok(count)
    }

    /// Record a failed attempt, never counting past `ceiling`
    ///
    /// A link that is already terminal is left untouched, which keeps the
    /// success flag of a link another feed has just downloaded.
    pub async fn record_failure(&self, link: &str, ceiling: u32) -> Result<u32> {
        let _guard = self.locks.lock(link).await;
        let count = self.get_count(link).await?;
        if count >= ceiling {
            return Ok(count);
        }
        let count = count + 1;
        self.replace_link(link, count, false).await?;
        Ok(count)
    }

    /// Record a successful download by pinning the count at `ceiling`
    pub async fn mark_succeeded(&self, link: &str, ceiling: u32) -> Result<()> {
        let _guard = self.locks.lock(link).await;
        self.replace_link(link, ceiling, true).await
    }

    /// Classify a link against the retry limit
    pub async fn link_state(&self, link: &str, ceiling: u32) -> Result<LinkState> {
        let state = match self.get_link(link).await? {
            None => LinkState::Pending { attempts: 0 },
            Some(record) if record.succeeded != 0 => LinkState::Succeeded,
            Some(record) => {
                let attempts = to_count(record.attempt_count);
                if attempts >= ceiling {
                    LinkState::Exhausted
                } else {
                    LinkState::Pending { attempts }
                }
            }
        };

        Ok(state)
    }

    /// Count all recorded links
    pub async fn count_links(&self) -> Result<i64> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM links")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to count links: {}",
                    e
                )))
            })?;

        Ok(total)
    }

    /// Delete-then-insert a link's row in one transaction
    ///
    /// Callers must hold the link's lock.
    async fn replace_link(&self, link: &str, count: u32, succeeded: bool) -> Result<()> {
        let now = chrono::Utc::now().timestamp();

        let mut tx = self.pool.begin().await.map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to begin transaction: {}",
                e
            )))
        })?;

        sqlx::query("DELETE FROM links WHERE link = ?")
            .bind(link)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to delete link: {}",
                    e
                )))
            })?;

        sqlx::query(
            r#"
            INSERT INTO links (link, attempt_count, succeeded, last_update)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(link)
        .bind(i64::from(count))
        .bind(succeeded as i32)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to insert link: {}",
                e
            )))
        })?;

        tx.commit().await.map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to commit link update: {}",
                e
            )))
        })?;

        Ok(())
    }
}

fn to_count(stored: i64) -> u32 {
    u32::try_from(stored.max(0)).unwrap_or(u32::MAX)
}
