//! Link manager: the QR-code handshake state machine.
//!
//! States: NotLinked → Pending → Connected, with Pending → Error → Pending
//! on retry and Connected → Disconnected (row purged) on disconnect.
//! Completing a link may displace another user's connection as a side
//! effect; that happens inside the store's displacement transaction.

use std::time::Duration;

use chrono::{NaiveDateTime, Utc};
use tracing::{info, warn};

use bridge_store::{connection, Connection, ConnectionStatus, Database, NotificationMode, PhoneCipher};

use crate::error::BridgeError;
use crate::gateway::SignalGateway;

/// Configuration for the linking flow.
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// How long a pending link may sit unconfirmed before it is marked
    /// errored (the gateway invalidates the QR code on its own schedule).
    pub link_timeout: Duration,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            link_timeout: Duration::from_secs(5 * 60),
        }
    }
}

/// Current link state as surfaced to the UI layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkState {
    NotLinked,
    Pending,
    Connected { phone_masked: String },
    Error,
}

/// Summary of a user's connection for the settings surface.
#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    pub status: ConnectionStatus,
    pub phone_masked: Option<String>,
    pub notification_mode: NotificationMode,
    pub last_active_project: Option<String>,
}

/// Orchestrates the end-user-facing linking state machine.
pub struct LinkManager<G> {
    gateway: G,
    db: Database,
    cipher: PhoneCipher,
    config: LinkConfig,
}

impl<G: SignalGateway> LinkManager<G> {
    /// Create a new link manager.
    pub fn new(gateway: G, db: Database, cipher: PhoneCipher, config: LinkConfig) -> Self {
        Self {
            gateway,
            db,
            cipher,
            config,
        }
    }

    /// Start (or restart) the linking flow for a user and return the QR
    /// code image to display.
    ///
    /// Rejects if the user already holds a connected link. A pending or
    /// errored row is reset to pending and a fresh code issued — the gateway
    /// invalidates old codes, so there is nothing to resume. If the gateway
    /// call fails the row stays pending and the error is recoverable.
    pub async fn start_link(&self, user_id: &str) -> Result<Vec<u8>, BridgeError> {
        connection::create_pending_link(self.db.pool(), user_id).await?;

        let qr = self.gateway.request_link_qr_code().await?;
        info!(user_id = %user_id, "Issued link QR code");
        Ok(qr)
    }

    /// Poll the linking state, promoting the connection when the gateway
    /// reports the scan confirmed.
    pub async fn poll_link_status(&self, user_id: &str) -> Result<LinkState, BridgeError> {
        let Some(conn) = connection::get_by_user(self.db.pool(), user_id).await? else {
            return Ok(LinkState::NotLinked);
        };

        match conn.status() {
            Some(ConnectionStatus::Connected) => Ok(match self.masked_phone(&conn) {
                Some(phone_masked) => LinkState::Connected { phone_masked },
                // Corrupted ciphertext reads as not linked.
                None => LinkState::NotLinked,
            }),
            Some(ConnectionStatus::Error) => Ok(LinkState::Error),
            Some(ConnectionStatus::Disconnected) | None => Ok(LinkState::NotLinked),
            Some(ConnectionStatus::Pending) => self.poll_pending(user_id, &conn).await,
        }
    }

    async fn poll_pending(&self, user_id: &str, conn: &Connection) -> Result<LinkState, BridgeError> {
        let status = self.gateway.link_status().await?;

        if status.complete {
            let number = status.number.ok_or(BridgeError::LinkMetadataMissing)?;
            let (row, displaced) =
                connection::complete_link(self.db.pool(), &self.cipher, user_id, &number).await?;
            if let Some(displaced) = displaced {
                info!(user_id = %user_id, displaced = %displaced, "Link completed, displacing existing link");
            } else {
                info!(user_id = %user_id, "Link completed");
            }
            return Ok(match self.masked_phone(&row) {
                Some(phone_masked) => LinkState::Connected { phone_masked },
                None => LinkState::NotLinked,
            });
        }

        if pending_expired(&conn.updated_at, self.config.link_timeout) {
            connection::mark_error(self.db.pool(), user_id).await?;
            info!(user_id = %user_id, "Link attempt timed out");
            return Ok(LinkState::Error);
        }

        Ok(LinkState::Pending)
    }

    /// Disconnect the user's link. Idempotent: unlinked users succeed.
    pub async fn disconnect(&self, user_id: &str) -> Result<(), BridgeError> {
        connection::disconnect(self.db.pool(), user_id).await?;
        info!(user_id = %user_id, "Disconnected Signal link");
        Ok(())
    }

    /// Connection summary for the settings surface. A disconnected (purged)
    /// row reads as not linked.
    pub async fn connection_info(&self, user_id: &str) -> Result<Option<ConnectionInfo>, BridgeError> {
        let Some(conn) = connection::get_by_user(self.db.pool(), user_id).await? else {
            return Ok(None);
        };
        let status = match conn.status() {
            Some(ConnectionStatus::Disconnected) | None => return Ok(None),
            Some(status) => status,
        };

        Ok(Some(ConnectionInfo {
            status,
            phone_masked: self.masked_phone(&conn),
            notification_mode: conn.notification_mode(),
            last_active_project: conn.last_active_project.clone(),
        }))
    }

    /// Update the user's notification mode.
    pub async fn set_notification_mode(
        &self,
        user_id: &str,
        mode: NotificationMode,
    ) -> Result<(), BridgeError> {
        connection::update_notification_mode(self.db.pool(), user_id, mode.as_str()).await?;
        Ok(())
    }

    fn masked_phone(&self, conn: &Connection) -> Option<String> {
        let phone_enc = conn.phone_enc.as_deref()?;
        match self.cipher.decrypt(phone_enc) {
            Ok(phone) => Some(bridge_store::mask_number(&phone)),
            Err(e) => {
                warn!(user_id = %conn.user_id, "Failed to decrypt stored phone: {}", e);
                None
            }
        }
    }
}

/// Whether a pending row's last update is older than the timeout window.
fn pending_expired(updated_at: &str, timeout: Duration) -> bool {
    let Ok(updated) = NaiveDateTime::parse_from_str(updated_at, "%Y-%m-%d %H:%M:%S") else {
        // Unparseable timestamps never expire; the user can restart.
        return false;
    };
    let age = Utc::now().naive_utc() - updated;
    age >= chrono::Duration::milliseconds(timeout.as_millis() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expiry_window() {
        let recent = Utc::now().naive_utc().format("%Y-%m-%d %H:%M:%S").to_string();
        assert!(!pending_expired(&recent, Duration::from_secs(300)));

        let old = (Utc::now().naive_utc() - chrono::Duration::minutes(10))
            .format("%Y-%m-%d %H:%M:%S")
            .to_string();
        assert!(pending_expired(&old, Duration::from_secs(300)));

        assert!(!pending_expired("not a timestamp", Duration::from_secs(300)));
    }
}
