//! # Change Feed Repository
//!
//! Ordered log of committed ledger mutations, for replicating the ledger
//! somewhere else (a head-office copy, a reporting database).
//!
//! ## The Outbox Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Change Feed                                          │
//! │                                                                         │
//! │  LEDGER OPERATION (e.g., record_payment)                               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   SINGLE TRANSACTION                            │   │
//! │  │                                                                 │   │
//! │  │  1. UPDATE sales SET amount_paid = ?, payment_status = ?       │   │
//! │  │  2. INSERT INTO payment_history (...)                          │   │
//! │  │  3. INSERT INTO change_feed ('payment', id, 'created', JSON)   │   │
//! │  │     INSERT INTO change_feed ('sale', id, 'updated', JSON)      │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  COMMIT ← Mutation and its change rows land together or not at all     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  CONSUMER (outside this crate)                                         │
//! │  1. pending(limit)       ← oldest first, by seq                        │
//! │  2. ship the payloads                                                  │
//! │  3. mark_consumed(id)                                                  │
//! │  4. prune_consumed(days) now and then                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{Duration, Utc};
use serde::Serialize;
use shade_core::{ChangeEntity, ChangeOperation, ChangeRecord};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::new_id;

const CHANGE_COLUMNS: &str =
    "id, seq, entity_type, entity_id, operation, payload, created_at, consumed_at";

/// Appends a change row on the caller's connection (normally inside its
/// transaction).
pub(crate) async fn append_change<T: Serialize>(
    conn: &mut SqliteConnection,
    entity_type: ChangeEntity,
    entity_id: &str,
    operation: ChangeOperation,
    payload: &T,
) -> DbResult<()> {
    let payload = serde_json::to_string(payload)?;

    debug!(
        entity_type = ?entity_type,
        entity_id = %entity_id,
        operation = ?operation,
        "Appending change"
    );

    sqlx::query(
        r#"
        INSERT INTO change_feed (
            id, seq, entity_type, entity_id, operation, payload, created_at
        ) VALUES (
            ?1, (SELECT COALESCE(MAX(seq), 0) + 1 FROM change_feed), ?2, ?3, ?4, ?5, ?6
        )
        "#,
    )
    .bind(new_id())
    .bind(entity_type)
    .bind(entity_id)
    .bind(operation)
    .bind(payload)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Repository for reading and acknowledging the change feed.
#[derive(Debug, Clone)]
pub struct ChangeFeedRepository {
    pool: SqlitePool,
}

impl ChangeFeedRepository {
    /// Creates a new ChangeFeedRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ChangeFeedRepository { pool }
    }

    /// Unconsumed changes, oldest first.
    pub async fn pending(&self, limit: u32) -> DbResult<Vec<ChangeRecord>> {
        let sql = format!(
            "SELECT {} FROM change_feed WHERE consumed_at IS NULL ORDER BY seq ASC LIMIT ?1",
            CHANGE_COLUMNS
        );

        let records = sqlx::query_as::<_, ChangeRecord>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(records)
    }

    /// All changes after `seq`, consumed or not. For consumers that track
    /// their own position.
    pub async fn since(&self, seq: i64, limit: u32) -> DbResult<Vec<ChangeRecord>> {
        let sql = format!(
            "SELECT {} FROM change_feed WHERE seq > ?1 ORDER BY seq ASC LIMIT ?2",
            CHANGE_COLUMNS
        );

        let records = sqlx::query_as::<_, ChangeRecord>(&sql)
            .bind(seq)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(records)
    }

    /// Marks a change as delivered.
    pub async fn mark_consumed(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE change_feed SET consumed_at = ?2 WHERE id = ?1 AND consumed_at IS NULL",
        )
        .bind(id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Change (pending)", id));
        }

        Ok(())
    }

    /// Counts unconsumed changes.
    pub async fn count_pending(&self) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM change_feed WHERE consumed_at IS NULL")
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }

    /// Deletes changes consumed more than `days_old` days ago.
    ///
    /// ## Returns
    /// Number of deleted rows.
    pub async fn prune_consumed(&self, days_old: u32) -> DbResult<u64> {
        let cutoff = Utc::now() - Duration::days(i64::from(days_old));

        let result = sqlx::query(
            "DELETE FROM change_feed WHERE consumed_at IS NOT NULL AND consumed_at < ?1",
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await?;

        debug!(deleted = result.rows_affected(), days_old, "Pruned change feed");
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use shade_core::NewProduct;

    async fn db_with_product() -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.catalog()
            .create_product(NewProduct {
                company: "Berger".to_string(),
                product_name: "Weathercoat".to_string(),
            })
            .await
            .unwrap();
        db
    }

    #[tokio::test]
    async fn test_mutation_writes_change() {
        let db = db_with_product().await;
        let feed = db.change_feed();

        assert_eq!(feed.count_pending().await.unwrap(), 1);
        let pending = feed.pending(10).await.unwrap();
        assert_eq!(pending[0].entity_type, ChangeEntity::Product);
        assert_eq!(pending[0].operation, ChangeOperation::Created);
        assert!(pending[0].payload.contains("Weathercoat"));
    }

    #[tokio::test]
    async fn test_consume_and_prune() {
        let db = db_with_product().await;
        let feed = db.change_feed();

        let id = feed.pending(1).await.unwrap()[0].id.clone();
        feed.mark_consumed(&id).await.unwrap();
        assert_eq!(feed.count_pending().await.unwrap(), 0);

        // Second acknowledgement is rejected
        assert!(feed.mark_consumed(&id).await.unwrap_err().is_not_found());

        // Consumed just now: kept by a 1 day retention, dropped by 0
        assert_eq!(feed.prune_consumed(1).await.unwrap(), 0);
        assert_eq!(feed.prune_consumed(0).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_sequence_is_ordered() {
        let db = db_with_product().await;
        db.catalog()
            .create_product(NewProduct {
                company: "ICI".to_string(),
                product_name: "Dulux".to_string(),
            })
            .await
            .unwrap();

        let all = db.change_feed().since(0, 10).await.unwrap();
        assert_eq!(all.len(), 2);
        assert!(all[0].seq < all[1].seq);
        assert!(db.change_feed().since(all[1].seq, 10).await.unwrap().is_empty());
    }
}
