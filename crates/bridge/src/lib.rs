//! Signal bridge core.
//!
//! Bidirectional relay between the application's chat system and the Signal
//! network, mediated by the external gateway daemon:
//!
//! - [`link::LinkManager`] — the QR-code linking handshake, conflict
//!   displacement and disconnect.
//! - [`delivery::DeliveryPipeline`] — outbound chat messages to Signal, with
//!   notification-preference filtering and bounded background retries.
//! - [`listener::InboundListener`] — the long-lived receive loop that
//!   resolves senders to users/projects and forwards into the chat pipeline.
//!
//! The chat system and the gateway sit behind the [`chat::ChatPipeline`] and
//! [`gateway::SignalGateway`] traits, so the core runs against mocks in
//! tests.

pub mod chat;
pub mod delivery;
pub mod error;
pub mod formatting;
pub mod gateway;
pub mod link;
pub mod listener;

pub use chat::{AuthorRole, ChatMessage, ChatPipeline, MessageCategory};
pub use delivery::{DeliveryConfig, DeliveryOutcome, DeliveryPipeline};
pub use error::BridgeError;
pub use formatting::{compose_outbound, FormattedMessage, MAX_SIGNAL_MESSAGE_LEN};
pub use gateway::SignalGateway;
pub use link::{ConnectionInfo, LinkConfig, LinkManager, LinkState};
pub use listener::{InboundListener, InboundOutcome, ListenerConfig};

/// Crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
