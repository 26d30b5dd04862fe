//! Message audit log operations.
//!
//! Audit rows track delivery of every Signal message sent or received. They
//! contain no raw phone numbers (previews are redacted) and are never
//! deleted, even after the parent connection is removed. Status transitions
//! are guarded in SQL: pending→{delivered, retrying},
//! retrying→{delivered, retrying, failed}; terminal rows are immutable.

use sqlx::SqlitePool;

use crate::crypto;
use crate::error::{Result, StoreError};
use crate::models::{AuditDirection, MessageAudit};

/// Maximum preview length in characters.
pub const MAX_PREVIEW_LEN: usize = 200;

/// Create an outbound audit row in `pending` status.
pub async fn create_outbound(
    pool: &SqlitePool,
    connection_id: i64,
    chat_message_id: Option<&str>,
    content: &str,
) -> Result<MessageAudit> {
    let preview = preview_of(content);
    let result = sqlx::query(
        r#"
        INSERT INTO message_audit (connection_id, direction, chat_message_id, preview, status)
        VALUES (?, 'outbound', ?, ?, 'pending')
        "#,
    )
    .bind(connection_id)
    .bind(chat_message_id)
    .bind(&preview)
    .execute(pool)
    .await?;

    get(pool, result.last_insert_rowid()).await
}

/// Create an inbound audit row, already delivered into the chat pipeline.
pub async fn create_inbound(
    pool: &SqlitePool,
    connection_id: i64,
    chat_message_id: Option<&str>,
    content: &str,
) -> Result<MessageAudit> {
    let preview = preview_of(content);
    let result = sqlx::query(
        r#"
        INSERT INTO message_audit
            (connection_id, direction, chat_message_id, preview, status, delivered_at)
        VALUES (?, 'inbound', ?, ?, 'delivered', datetime('now'))
        "#,
    )
    .bind(connection_id)
    .bind(chat_message_id)
    .bind(&preview)
    .execute(pool)
    .await?;

    get(pool, result.last_insert_rowid()).await
}

/// Record an inbound message from an unlinked sender. No connection parent,
/// no content beyond a fixed redacted marker.
pub async fn record_redacted_inbound(pool: &SqlitePool) -> Result<MessageAudit> {
    let result = sqlx::query(
        r#"
        INSERT INTO message_audit (connection_id, direction, preview, status, delivered_at)
        VALUES (NULL, 'inbound', '[unlinked sender]', 'delivered', datetime('now'))
        "#,
    )
    .execute(pool)
    .await?;

    get(pool, result.last_insert_rowid()).await
}

/// Mark an audit row delivered.
pub async fn mark_delivered(pool: &SqlitePool, id: i64) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE message_audit
        SET status = 'delivered', delivered_at = datetime('now'), next_retry_at = NULL
        WHERE id = ? AND status IN ('pending', 'retrying')
        "#,
    )
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(StoreError::NotFound {
            entity: "MessageAudit",
            id: id.to_string(),
        });
    }

    Ok(())
}

/// Mark an audit row retrying with the given attempt count and schedule.
pub async fn mark_retrying(
    pool: &SqlitePool,
    id: i64,
    retry_count: u32,
    next_retry_at: &str,
    error: &str,
) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE message_audit
        SET status = 'retrying', retry_count = ?, next_retry_at = ?, last_error = ?
        WHERE id = ? AND status IN ('pending', 'retrying')
        "#,
    )
    .bind(retry_count as i64)
    .bind(next_retry_at)
    .bind(error)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(StoreError::NotFound {
            entity: "MessageAudit",
            id: id.to_string(),
        });
    }

    Ok(())
}

/// Mark an audit row failed after retries are exhausted.
pub async fn mark_failed(pool: &SqlitePool, id: i64, error: &str) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE message_audit
        SET status = 'failed', last_error = ?, next_retry_at = NULL
        WHERE id = ? AND status IN ('pending', 'retrying')
        "#,
    )
    .bind(error)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(StoreError::NotFound {
            entity: "MessageAudit",
            id: id.to_string(),
        });
    }

    Ok(())
}

/// Get an audit row by ID.
pub async fn get(pool: &SqlitePool, id: i64) -> Result<MessageAudit> {
    sqlx::query_as::<_, MessageAudit>(
        r#"
        SELECT id, connection_id, direction, chat_message_id, preview, status,
               retry_count, next_retry_at, last_error, created_at, delivered_at
        FROM message_audit
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| StoreError::NotFound {
        entity: "MessageAudit",
        id: id.to_string(),
    })
}

/// List audit rows for a connection, newest first.
pub async fn list_for_connection(
    pool: &SqlitePool,
    connection_id: i64,
    direction: Option<AuditDirection>,
) -> Result<Vec<MessageAudit>> {
    let rows = match direction {
        Some(direction) => {
            sqlx::query_as::<_, MessageAudit>(
                r#"
                SELECT id, connection_id, direction, chat_message_id, preview, status,
                       retry_count, next_retry_at, last_error, created_at, delivered_at
                FROM message_audit
                WHERE connection_id = ? AND direction = ?
                ORDER BY id DESC
                "#,
            )
            .bind(connection_id)
            .bind(direction.as_str())
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, MessageAudit>(
                r#"
                SELECT id, connection_id, direction, chat_message_id, preview, status,
                       retry_count, next_retry_at, last_error, created_at, delivered_at
                FROM message_audit
                WHERE connection_id = ?
                ORDER BY id DESC
                "#,
            )
            .bind(connection_id)
            .fetch_all(pool)
            .await?
        }
    };

    Ok(rows)
}

/// Build the stored preview: phone numbers redacted, truncated to
/// [`MAX_PREVIEW_LEN`] characters.
pub fn preview_of(content: &str) -> String {
    let redacted = redact_phone_numbers(content);
    if redacted.chars().count() <= MAX_PREVIEW_LEN {
        redacted
    } else {
        let mut out: String = redacted.chars().take(MAX_PREVIEW_LEN - 1).collect();
        out.push('…');
        out
    }
}

/// Replace phone-number-shaped runs (`+` followed by at least seven digits,
/// separators allowed) with their masked form.
pub fn redact_phone_numbers(content: &str) -> String {
    let chars: Vec<char> = content.chars().collect();
    let mut out = String::with_capacity(content.len());
    let mut i = 0;

    while i < chars.len() {
        if chars[i] == '+' {
            let mut j = i + 1;
            let mut digits = 0;
            while j < chars.len() && is_phone_char(chars[j]) {
                if chars[j].is_ascii_digit() {
                    digits += 1;
                }
                j += 1;
            }
            // Trailing separators belong to the surrounding text.
            while j > i + 1 && !chars[j - 1].is_ascii_digit() {
                j -= 1;
            }
            if digits >= 7 {
                let run: String = chars[i..j].iter().collect();
                out.push_str(&crypto::mask_number(&run));
                i = j;
                continue;
            }
        }
        out.push(chars[i]);
        i += 1;
    }

    out
}

fn is_phone_char(c: char) -> bool {
    c.is_ascii_digit() || matches!(c, ' ' | '-' | '.' | '(' | ')')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacts_phone_numbers() {
        let input = "call me at +1 (555) 000-1234 tomorrow";
        let redacted = redact_phone_numbers(input);
        assert!(!redacted.contains("555"));
        assert!(redacted.contains("tomorrow"));
        assert!(redacted.contains("+1••••••••34"));
    }

    #[test]
    fn leaves_short_plus_runs_alone() {
        assert_eq!(redact_phone_numbers("2 + 2 = 4"), "2 + 2 = 4");
        assert_eq!(redact_phone_numbers("+123"), "+123");
    }

    #[test]
    fn preview_truncates_to_limit() {
        let long = "x".repeat(500);
        let preview = preview_of(&long);
        assert_eq!(preview.chars().count(), MAX_PREVIEW_LEN);
        assert!(preview.ends_with('…'));
    }

    #[test]
    fn preview_keeps_short_content() {
        assert_eq!(preview_of("hello"), "hello");
    }
}
