//! Outbound delivery pipeline.
//!
//! Turns an application chat message into a Signal message and delivers it
//! with bounded retries. Delivery is fire-and-forget: the chat-side caller
//! spawns it and never waits, and a dropped message after exhausted retries
//! is logged, not surfaced. At-most-once, best-effort — retry chains are not
//! persisted across process restarts.

use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use bridge_store::{audit, connection, Database, PhoneCipher};

use crate::chat::ChatMessage;
use crate::error::BridgeError;
use crate::formatting;
use crate::gateway::SignalGateway;

/// Configuration for the delivery pipeline.
#[derive(Debug, Clone)]
pub struct DeliveryConfig {
    /// Maximum number of retries after the initial attempt.
    pub max_retries: u32,
    /// Backoff before the first retry.
    pub initial_backoff: Duration,
    /// Backoff ceiling.
    pub max_backoff: Duration,
    /// Application base URL for deep links in rendered messages.
    pub app_base_url: String,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_secs(30),
            max_backoff: Duration::from_secs(8 * 60),
            app_base_url: "http://localhost:3000".to_string(),
        }
    }
}

impl DeliveryConfig {
    /// Backoff before the given retry (1-based): doubles from the initial
    /// delay up to the ceiling.
    pub fn backoff_for_retry(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

/// Outcome of a single delivery, mostly of interest to tests and logs.
#[derive(Debug)]
pub enum DeliveryOutcome {
    /// Message sent; audit row is `delivered`.
    Delivered { audit_id: i64 },
    /// Retries exhausted; audit row is `failed`.
    Failed { audit_id: i64, retries: u32 },
    /// Nothing sent (no connection, filtered out, corrupted row).
    Skipped { reason: &'static str },
}

/// The outbound delivery pipeline.
#[derive(Clone)]
pub struct DeliveryPipeline<G> {
    gateway: G,
    db: Database,
    cipher: PhoneCipher,
    config: DeliveryConfig,
}

impl<G> DeliveryPipeline<G>
where
    G: SignalGateway + Clone + Send + Sync + 'static,
{
    /// Create a new pipeline.
    pub fn new(gateway: G, db: Database, cipher: PhoneCipher, config: DeliveryConfig) -> Self {
        Self {
            gateway,
            db,
            cipher,
            config,
        }
    }

    /// Deliver a chat message in a detached background task.
    ///
    /// The caller must not wait on the handle; it is returned for shutdown
    /// bookkeeping only. Errors never propagate to the chat-side caller.
    pub fn deliver(&self, message: ChatMessage) -> JoinHandle<()> {
        let pipeline = self.clone();
        tokio::spawn(async move {
            match pipeline.deliver_now(&message).await {
                Ok(outcome) => debug!(message_id = %message.id, ?outcome, "Delivery finished"),
                Err(e) => warn!(message_id = %message.id, "Delivery error: {}", e),
            }
        })
    }

    /// Run one delivery to completion: filter, format, send with bounded
    /// backoff retries, and keep the audit row current throughout.
    pub async fn deliver_now(&self, message: &ChatMessage) -> Result<DeliveryOutcome, BridgeError> {
        let pool = self.db.pool();

        // Signal delivery is a supplementary channel: no link, no delivery.
        let Some(conn) = connection::get_by_user(pool, &message.user_id).await? else {
            return Ok(DeliveryOutcome::Skipped {
                reason: "not linked",
            });
        };
        if !conn.is_connected() {
            return Ok(DeliveryOutcome::Skipped {
                reason: "not connected",
            });
        }

        let mode = conn.notification_mode();
        if !message.category.allowed_under(mode) {
            debug!(
                user_id = %message.user_id,
                mode = mode.as_str(),
                "Message filtered by notification mode"
            );
            return Ok(DeliveryOutcome::Skipped { reason: "filtered" });
        }

        let Some(phone_enc) = conn.phone_enc.as_deref() else {
            warn!(user_id = %message.user_id, "Connected row without phone ciphertext");
            return Ok(DeliveryOutcome::Skipped {
                reason: "corrupted row",
            });
        };
        let phone = match self.cipher.decrypt(phone_enc) {
            Ok(phone) => phone,
            Err(e) => {
                warn!(user_id = %message.user_id, "Failed to decrypt phone: {}", e);
                return Ok(DeliveryOutcome::Skipped {
                    reason: "corrupted row",
                });
            }
        };

        let formatted = formatting::compose_outbound(message, &self.config.app_base_url);
        let audit_row =
            audit::create_outbound(pool, conn.id, Some(&message.id), &formatted.text).await?;

        let mut retries: u32 = 0;
        loop {
            match self
                .gateway
                .send_styled(&phone, &formatted.text, formatted.styles.clone())
                .await
            {
                Ok(receipt) => {
                    audit::mark_delivered(pool, audit_row.id).await?;
                    info!(
                        message_id = %message.id,
                        timestamp = receipt.timestamp,
                        "Delivered to Signal"
                    );
                    return Ok(DeliveryOutcome::Delivered {
                        audit_id: audit_row.id,
                    });
                }
                Err(e) if retries >= self.config.max_retries => {
                    audit::mark_failed(pool, audit_row.id, &e.to_string()).await?;
                    warn!(
                        message_id = %message.id,
                        retries,
                        "Giving up on Signal delivery: {}",
                        e
                    );
                    return Ok(DeliveryOutcome::Failed {
                        audit_id: audit_row.id,
                        retries,
                    });
                }
                Err(e) => {
                    retries += 1;
                    let delay = self.config.backoff_for_retry(retries);
                    let next_retry_at = timestamp_after(delay);
                    audit::mark_retrying(
                        pool,
                        audit_row.id,
                        retries,
                        &next_retry_at,
                        &e.to_string(),
                    )
                    .await?;
                    debug!(
                        message_id = %message.id,
                        retry = retries,
                        ?delay,
                        "Delivery failed, backing off: {}",
                        e
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

/// Wall-clock timestamp `delay` from now, in the store's datetime format.
fn timestamp_after(delay: Duration) -> String {
    let delay = chrono::Duration::milliseconds(delay.as_millis() as i64);
    (Utc::now() + delay).format("%Y-%m-%d %H:%M:%S").to_string()
}
