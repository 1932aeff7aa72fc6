use sqlx::SqliteExecutor;

use crate::db::models::Gift;
use crate::error::{AppError, AppResult};

// ============================================================================
// Gift Repository
// ============================================================================

/// Repository for White Elephant gift entries (`gifts` table).
///
/// Every method takes a generic SQLite executor so callers can pass either the
/// pool or `&mut *tx` when the statements must share a transaction.
pub struct GiftRepository;

impl GiftRepository {
    /// All gift entries in insertion order.
    pub async fn list_all<'e, E>(executor: E) -> AppResult<Vec<Gift>>
    where
        E: SqliteExecutor<'e>,
    {
        let rows = sqlx::query_as::<_, Gift>(
            r#"
            SELECT id, user_id, name
            FROM gifts
            ORDER BY rowid
            "#,
        )
        .fetch_all(executor)
        .await
        .map_err(AppError::Database)?;

        Ok(rows)
    }

    /// Unassign every turn number.
    ///
    /// Must run before writing a new permutation in the same transaction:
    /// `idx_gifts_turn_order` is checked per statement, so swapping values in
    /// place would collide.
    pub async fn clear_turn_orders<'e, E>(executor: E) -> AppResult<u64>
    where
        E: SqliteExecutor<'e>,
    {
        let result = sqlx::query("UPDATE gifts SET turn_order = NULL WHERE turn_order IS NOT NULL")
            .execute(executor)
            .await
            .map_err(AppError::Database)?;

        Ok(result.rows_affected())
    }

    /// Set the turn number of a single gift. Returns the number of rows touched.
    pub async fn set_turn_order<'e, E>(executor: E, id: &str, turn_order: i64) -> AppResult<u64>
    where
        E: SqliteExecutor<'e>,
    {
        let now = chrono::Utc::now().naive_utc();

        let result = sqlx::query(
            r#"
            UPDATE gifts
            SET turn_order = ?,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(turn_order)
        .bind(now)
        .bind(id)
        .execute(executor)
        .await
        .map_err(AppError::Database)?;

        Ok(result.rows_affected())
    }
}
