//! Inbound listener: routes Signal messages into the application.
//!
//! Consumes the gateway's receive stream for the lifetime of the process
//! (reconnection is the stream's own job), resolves senders to linked users
//! through the phone lookup hash, and forwards text into the chat pipeline.
//! Senders the bridge cannot serve get a Signal auto-reply, never an error.

use futures::{Stream, StreamExt};
use tracing::{debug, error, info, warn};

use bridge_store::{audit, connection, crypto, Database};
use signal_gateway::Envelope;

use crate::chat::{AuthorRole, ChatPipeline};
use crate::gateway::SignalGateway;

/// Auto-reply for senders with no linked account.
pub const UNLINKED_REPLY: &str =
    "This number isn't linked to a workspace account. Open Settings › Signal in the app to link it.";

/// Auto-reply for unsupported (non-text) content.
pub const NON_TEXT_REPLY: &str = "Only text messages are supported right now.";

/// Auto-reply when no target project can be resolved.
pub const NO_PROJECT_REPLY: &str =
    "No active project. Start your message with #project-name to pick one.";

/// Configuration for the inbound listener.
#[derive(Debug, Clone)]
pub struct ListenerConfig {
    /// The gateway account's own number, to ignore echoed self-messages.
    pub own_number: Option<String>,
    /// Inbound payloads larger than this (in characters) are truncated
    /// before any further handling.
    pub max_inbound_len: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            own_number: None,
            max_inbound_len: 100_000,
        }
    }
}

/// Result of processing a single inbound envelope.
#[derive(Debug)]
pub enum InboundOutcome {
    /// Forwarded into the chat pipeline.
    Forwarded {
        user_id: String,
        project_id: String,
        chat_message_id: String,
    },
    /// Answered on Signal instead of forwarding.
    AutoReplied { reason: &'static str },
    /// Dropped without a reply (self-messages, groups, receipts...).
    Skipped { reason: &'static str },
}

/// Routes inbound Signal envelopes into the application.
pub struct InboundListener<G, C> {
    gateway: G,
    chat: C,
    db: Database,
    config: ListenerConfig,
}

impl<G, C> InboundListener<G, C>
where
    G: SignalGateway,
    C: ChatPipeline,
{
    /// Create a new listener.
    pub fn new(gateway: G, chat: C, db: Database, config: ListenerConfig) -> Self {
        Self {
            gateway,
            chat,
            db,
            config,
        }
    }

    /// Consume envelopes until the stream ends or the shutdown future
    /// completes. Per-envelope failures are logged and the loop continues; a
    /// single bad message must never take the listener down.
    pub async fn run_with_shutdown<St, S>(&self, stream: St, shutdown: S)
    where
        St: Stream<Item = Envelope>,
        S: std::future::Future<Output = ()>,
    {
        info!("Inbound listener started");

        tokio::pin!(stream);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                biased;

                () = &mut shutdown => {
                    info!("Shutdown signal received, stopping inbound listener");
                    return;
                }

                maybe = stream.next() => {
                    match maybe {
                        Some(envelope) => {
                            match self.process_envelope(&envelope).await {
                                InboundOutcome::Forwarded { user_id, project_id, .. } => {
                                    debug!(%user_id, %project_id, "Forwarded inbound message");
                                }
                                InboundOutcome::AutoReplied { reason } => {
                                    debug!(reason, "Auto-replied to inbound message");
                                }
                                InboundOutcome::Skipped { reason } => {
                                    debug!(reason, "Skipped inbound envelope");
                                }
                            }
                        }
                        None => {
                            // The reconnecting stream only ends when dropped.
                            warn!("Inbound stream ended");
                            return;
                        }
                    }
                }
            }
        }
    }

    /// Process one envelope. Public so tests can drive the routing logic
    /// without a live stream.
    pub async fn process_envelope(&self, envelope: &Envelope) -> InboundOutcome {
        let Some(data) = envelope.data_message.as_ref() else {
            return InboundOutcome::Skipped {
                reason: "no data message",
            };
        };

        let sender = if envelope.source_number.is_empty() {
            envelope.source.as_str()
        } else {
            envelope.source_number.as_str()
        };
        if sender.is_empty() {
            return InboundOutcome::Skipped {
                reason: "no sender number",
            };
        }
        if let Some(own) = self.config.own_number.as_deref() {
            if crypto::normalize_number(sender) == crypto::normalize_number(own) {
                return InboundOutcome::Skipped {
                    reason: "message from self",
                };
            }
        }
        // Group traffic is outside the bridge; only direct messages route.
        if data.group_info.is_some() {
            return InboundOutcome::Skipped {
                reason: "group message",
            };
        }

        let hash = crypto::lookup_hash(sender);
        let conn = match connection::get_by_phone_hash(self.db.pool(), &hash).await {
            Ok(conn) => conn,
            Err(e) => {
                error!("Connection lookup failed: {}", e);
                return InboundOutcome::Skipped {
                    reason: "lookup failed",
                };
            }
        };

        let Some(conn) = conn.filter(|c| c.is_connected()) else {
            self.auto_reply(sender, UNLINKED_REPLY).await;
            if let Err(e) = audit::record_redacted_inbound(self.db.pool()).await {
                warn!("Failed to record redacted inbound audit: {}", e);
            }
            return InboundOutcome::AutoReplied { reason: "unlinked" };
        };

        let text = match data.message.as_deref() {
            Some(text) if !text.trim().is_empty() => text,
            _ => {
                // Attachments, reactions, empty bodies: not forwardable.
                self.auto_reply(sender, NON_TEXT_REPLY).await;
                return InboundOutcome::AutoReplied { reason: "non-text" };
            }
        };

        let text = truncate_inbound(text, self.config.max_inbound_len);

        // A leading #project-slug switches the active project and is
        // stripped from the forwarded body.
        let (project_id, body) = match parse_project_selector(&text) {
            Some((slug, rest)) => {
                if let Err(e) =
                    connection::update_last_active_project(self.db.pool(), &conn.user_id, slug)
                        .await
                {
                    warn!(user_id = %conn.user_id, "Failed to switch project: {}", e);
                }
                (slug.to_string(), rest.to_string())
            }
            None => match conn.last_active_project.clone() {
                Some(project) => (project, text.to_string()),
                None => {
                    self.auto_reply(sender, NO_PROJECT_REPLY).await;
                    return InboundOutcome::AutoReplied { reason: "no project" };
                }
            },
        };

        if body.is_empty() {
            // Bare "#project" message: just a switch, acknowledge it.
            self.auto_reply(sender, &format!("Now posting to #{}.", project_id))
                .await;
            return InboundOutcome::AutoReplied {
                reason: "project switch",
            };
        }

        let chat_message_id = match self
            .chat
            .add_message(&conn.user_id, &project_id, &body, AuthorRole::User)
            .await
        {
            Ok(id) => id,
            Err(e) => {
                error!(user_id = %conn.user_id, "Chat pipeline rejected message: {}", e);
                return InboundOutcome::Skipped {
                    reason: "chat pipeline error",
                };
            }
        };

        if let Err(e) =
            audit::create_inbound(self.db.pool(), conn.id, Some(&chat_message_id), &body).await
        {
            warn!("Failed to record inbound audit: {}", e);
        }

        InboundOutcome::Forwarded {
            user_id: conn.user_id.clone(),
            project_id,
            chat_message_id,
        }
    }

    /// Best-effort auto-reply; failures are logged and swallowed.
    async fn auto_reply(&self, recipient: &str, text: &str) {
        if let Err(e) = self.gateway.send_styled(recipient, text, Vec::new()).await {
            warn!("Failed to send auto-reply: {}", e);
        }
    }
}

/// Parse a leading `#project-slug` selector. Returns the slug and the
/// remaining body with the marker stripped.
pub fn parse_project_selector(text: &str) -> Option<(&str, &str)> {
    let trimmed = text.trim_start();
    let rest = trimmed.strip_prefix('#')?;
    let end = rest
        .find(char::is_whitespace)
        .unwrap_or(rest.len());
    let slug = &rest[..end];
    if slug.is_empty() {
        return None;
    }
    Some((slug, rest[end..].trim()))
}

/// Truncate abnormally large inbound payloads (char-boundary safe).
fn truncate_inbound(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        text.chars().take(max_chars).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_parsing() {
        assert_eq!(
            parse_project_selector("#project-beta fix the login bug"),
            Some(("project-beta", "fix the login bug"))
        );
        assert_eq!(parse_project_selector("#solo"), Some(("solo", "")));
        assert_eq!(parse_project_selector("no marker here"), None);
        assert_eq!(parse_project_selector("# not a slug"), None);
        assert_eq!(
            parse_project_selector("  #padded   trailing  "),
            Some(("padded", "trailing"))
        );
    }

    #[test]
    fn inbound_truncation() {
        assert_eq!(truncate_inbound("short", 100), "short");
        let huge = "a".repeat(150_000);
        assert_eq!(truncate_inbound(&huge, 100_000).chars().count(), 100_000);
    }
}
