//! Connection CRUD and the atomic displacement operation.

use sqlx::SqlitePool;
use tracing::info;

use crate::crypto::{self, PhoneCipher};
use crate::error::{Result, StoreError};
use crate::models::Connection;
use crate::banner;

/// Create (or reset) a user's link row in `pending` status.
///
/// Fails with [`StoreError::AlreadyLinked`] if the user already holds a
/// `connected` row; a leftover pending/error/disconnected row is reset in
/// place with any stale phone fields purged.
pub async fn create_pending_link(pool: &SqlitePool, user_id: &str) -> Result<Connection> {
    let mut tx = pool.begin().await?;

    let existing = sqlx::query_as::<_, Connection>(
        r#"
        SELECT id, user_id, phone_enc, phone_hash, status, notification_mode,
               last_active_project, linked_at, created_at, updated_at
        FROM connections
        WHERE user_id = ?
        "#,
    )
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await?;

    match existing {
        Some(row) if row.is_connected() => {
            return Err(StoreError::AlreadyLinked(user_id.to_string()));
        }
        Some(_) => {
            sqlx::query(
                r#"
                UPDATE connections
                SET status = 'pending', phone_enc = NULL, phone_hash = NULL,
                    linked_at = NULL, updated_at = datetime('now')
                WHERE user_id = ?
                "#,
            )
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        }
        None => {
            sqlx::query(
                r#"
                INSERT INTO connections (user_id, status)
                VALUES (?, 'pending')
                "#,
            )
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        }
    }

    let row = fetch_by_user(&mut tx, user_id).await?.ok_or_else(|| StoreError::NotFound {
        entity: "Connection",
        id: user_id.to_string(),
    })?;

    tx.commit().await?;
    Ok(row)
}

/// Promote a user's pending link to `connected`, encrypting and hashing the
/// phone number and displacing any other user currently holding it.
///
/// The hash-uniqueness check, displacement (purge + banner) and activation
/// run in a single transaction so two users can never simultaneously hold a
/// `connected` row for the same hash.
///
/// Returns the updated connection and the displaced user's id, if any.
pub async fn complete_link(
    pool: &SqlitePool,
    cipher: &PhoneCipher,
    user_id: &str,
    raw_number: &str,
) -> Result<(Connection, Option<String>)> {
    let normalized = crypto::normalize_number(raw_number);
    let phone_enc = cipher.encrypt(&normalized)?;
    let phone_hash = crypto::lookup_hash(&normalized);

    let mut tx = pool.begin().await?;

    let displaced = sqlx::query_as::<_, Connection>(
        r#"
        SELECT id, user_id, phone_enc, phone_hash, status, notification_mode,
               last_active_project, linked_at, created_at, updated_at
        FROM connections
        WHERE phone_hash = ? AND user_id != ? AND status != 'disconnected'
        "#,
    )
    .bind(&phone_hash)
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await?;

    let displaced_user = match displaced {
        Some(other) => {
            sqlx::query(
                r#"
                UPDATE connections
                SET status = 'disconnected', phone_enc = NULL, phone_hash = NULL,
                    updated_at = datetime('now')
                WHERE id = ?
                "#,
            )
            .bind(other.id)
            .execute(&mut *tx)
            .await?;

            banner::create(
                &mut *tx,
                &other.user_id,
                "Your Signal link was disconnected because its phone number \
                 was linked to a different account.",
            )
            .await?;

            info!(
                displaced_user = %other.user_id,
                new_user = %user_id,
                "Displaced existing Signal link"
            );
            Some(other.user_id)
        }
        None => None,
    };

    let updated = sqlx::query(
        r#"
        UPDATE connections
        SET status = 'connected', phone_enc = ?, phone_hash = ?,
            linked_at = datetime('now'), updated_at = datetime('now')
        WHERE user_id = ?
        "#,
    )
    .bind(&phone_enc)
    .bind(&phone_hash)
    .bind(user_id)
    .execute(&mut *tx)
    .await?;

    if updated.rows_affected() == 0 {
        return Err(StoreError::NotFound {
            entity: "Connection",
            id: user_id.to_string(),
        });
    }

    let row = fetch_by_user(&mut tx, user_id).await?.ok_or_else(|| StoreError::NotFound {
        entity: "Connection",
        id: user_id.to_string(),
    })?;

    tx.commit().await?;
    Ok((row, displaced_user))
}

/// Get a user's connection row, if one exists.
pub async fn get_by_user(pool: &SqlitePool, user_id: &str) -> Result<Option<Connection>> {
    let row = sqlx::query_as::<_, Connection>(
        r#"
        SELECT id, user_id, phone_enc, phone_hash, status, notification_mode,
               last_active_project, linked_at, created_at, updated_at
        FROM connections
        WHERE user_id = ?
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Resolve an active connection by phone lookup hash.
///
/// Used by the inbound listener; works purely on the hash, no decryption.
pub async fn get_by_phone_hash(pool: &SqlitePool, hash: &str) -> Result<Option<Connection>> {
    let row = sqlx::query_as::<_, Connection>(
        r#"
        SELECT id, user_id, phone_enc, phone_hash, status, notification_mode,
               last_active_project, linked_at, created_at, updated_at
        FROM connections
        WHERE phone_hash = ? AND status != 'disconnected'
        "#,
    )
    .bind(hash)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Disconnect a user's link, purging the encrypted phone and hash in the
/// same statement. Idempotent: a missing or already-disconnected row is a
/// no-op success.
pub async fn disconnect(pool: &SqlitePool, user_id: &str) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE connections
        SET status = 'disconnected', phone_enc = NULL, phone_hash = NULL,
            updated_at = datetime('now')
        WHERE user_id = ?
        "#,
    )
    .bind(user_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Mark a pending link as errored (scan timeout or gateway failure).
pub async fn mark_error(pool: &SqlitePool, user_id: &str) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE connections
        SET status = 'error', updated_at = datetime('now')
        WHERE user_id = ? AND status = 'pending'
        "#,
    )
    .bind(user_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Update the user's notification mode.
pub async fn update_notification_mode(
    pool: &SqlitePool,
    user_id: &str,
    mode: &str,
) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE connections
        SET notification_mode = ?, updated_at = datetime('now')
        WHERE user_id = ?
        "#,
    )
    .bind(mode)
    .bind(user_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(StoreError::NotFound {
            entity: "Connection",
            id: user_id.to_string(),
        });
    }

    Ok(())
}

/// Update the project inbound messages default to.
pub async fn update_last_active_project(
    pool: &SqlitePool,
    user_id: &str,
    project_id: &str,
) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE connections
        SET last_active_project = ?, updated_at = datetime('now')
        WHERE user_id = ?
        "#,
    )
    .bind(project_id)
    .bind(user_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(StoreError::NotFound {
            entity: "Connection",
            id: user_id.to_string(),
        });
    }

    Ok(())
}

async fn fetch_by_user(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    user_id: &str,
) -> Result<Option<Connection>> {
    let row = sqlx::query_as::<_, Connection>(
        r#"
        SELECT id, user_id, phone_enc, phone_hash, status, notification_mode,
               last_active_project, linked_at, created_at, updated_at
        FROM connections
        WHERE user_id = ?
        "#,
    )
    .bind(user_id)
    .fetch_optional(&mut **tx)
    .await?;

    Ok(row)
}
