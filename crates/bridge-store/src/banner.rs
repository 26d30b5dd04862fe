//! Conflict banner CRUD operations.

use sqlx::SqlitePool;

use crate::error::Result;
use crate::models::ConflictBanner;

/// Create a banner for a user. Takes any executor so the displacement
/// transaction can insert within its own scope.
pub async fn create<'e, E>(executor: E, user_id: &str, message: &str) -> Result<()>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO conflict_banners (user_id, message)
        VALUES (?, ?)
        "#,
    )
    .bind(user_id)
    .bind(message)
    .execute(executor)
    .await?;

    Ok(())
}

/// List a user's undismissed banners, newest first.
pub async fn list_active(pool: &SqlitePool, user_id: &str) -> Result<Vec<ConflictBanner>> {
    let banners = sqlx::query_as::<_, ConflictBanner>(
        r#"
        SELECT id, user_id, message, dismissed, created_at
        FROM conflict_banners
        WHERE user_id = ? AND dismissed = 0
        ORDER BY created_at DESC, id DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(banners)
}

/// Mark a banner dismissed. Idempotent: dismissing an already-dismissed or
/// missing banner is a no-op success.
pub async fn dismiss(pool: &SqlitePool, banner_id: i64) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE conflict_banners
        SET dismissed = 1
        WHERE id = ?
        "#,
    )
    .bind(banner_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Delete dismissed banners older than the given number of days.
pub async fn prune_dismissed(pool: &SqlitePool, older_than_days: u32) -> Result<u64> {
    let result = sqlx::query(
        r#"
        DELETE FROM conflict_banners
        WHERE dismissed = 1
          AND created_at < datetime('now', ?)
        "#,
    )
    .bind(format!("-{} days", older_than_days))
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}
