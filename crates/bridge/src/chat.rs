//! Chat pipeline seam and message classification.
//!
//! The chat system itself (persistence, sessions, assistant orchestration)
//! lives outside this subsystem; the bridge only needs to deposit inbound
//! text and classify outbound messages for preference filtering.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::BridgeError;
use bridge_store::NotificationMode;

/// Category of an outbound chat message, used for notification filtering
/// and the Signal rendering header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageCategory {
    /// General assistant reply.
    AssistantReply,
    /// Proposed action awaiting the user's approval.
    ActionProposal,
    /// Confirmation that an approved action was carried out.
    ActionConfirmation,
    /// System-level confirmation (settings changed, job finished).
    SystemConfirmation,
}

impl MessageCategory {
    /// Emoji marker shown at the start of the Signal rendering.
    pub fn emoji(&self) -> &'static str {
        match self {
            Self::AssistantReply => "💬",
            Self::ActionProposal => "⚡",
            Self::ActionConfirmation => "✅",
            Self::SystemConfirmation => "ℹ️",
        }
    }

    /// Header label for the Signal rendering.
    pub fn header(&self) -> &'static str {
        match self {
            Self::AssistantReply => "Assistant",
            Self::ActionProposal => "Action proposal",
            Self::ActionConfirmation => "Action confirmed",
            Self::SystemConfirmation => "Confirmation",
        }
    }

    /// Whether a message of this category passes the given notification
    /// mode. `none` skips everything, `all` nothing; the partial modes keep
    /// the categories their name covers.
    pub fn allowed_under(&self, mode: NotificationMode) -> bool {
        match mode {
            NotificationMode::All => true,
            NotificationMode::None => false,
            NotificationMode::ActionsOnly => {
                matches!(self, Self::ActionProposal | Self::ActionConfirmation)
            }
            NotificationMode::ConfirmationsOnly => {
                matches!(self, Self::ActionConfirmation | Self::SystemConfirmation)
            }
        }
    }
}

/// Author role for messages deposited into the chat pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorRole {
    User,
    Assistant,
    System,
}

/// An application chat message handed to the outbound pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Application message id.
    pub id: String,
    /// Owning user.
    pub user_id: String,
    /// Project the message belongs to.
    pub project_id: String,
    /// Message body (may contain markdown markers).
    pub body: String,
    /// Category for filtering and rendering.
    pub category: MessageCategory,
}

/// The external chat system the inbound listener deposits messages into.
#[async_trait]
pub trait ChatPipeline: Send + Sync {
    /// Create a chat message in the given user's project session.
    /// Returns the created message id.
    async fn add_message(
        &self,
        user_id: &str,
        project_id: &str,
        body: &str,
        author: AuthorRole,
    ) -> Result<String, BridgeError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filtering_matrix() {
        use MessageCategory::*;
        use NotificationMode as M;

        for category in [AssistantReply, ActionProposal, ActionConfirmation, SystemConfirmation] {
            assert!(category.allowed_under(M::All));
            assert!(!category.allowed_under(M::None));
        }

        assert!(!AssistantReply.allowed_under(M::ActionsOnly));
        assert!(ActionProposal.allowed_under(M::ActionsOnly));
        assert!(ActionConfirmation.allowed_under(M::ActionsOnly));
        assert!(!SystemConfirmation.allowed_under(M::ActionsOnly));

        assert!(!AssistantReply.allowed_under(M::ConfirmationsOnly));
        assert!(!ActionProposal.allowed_under(M::ConfirmationsOnly));
        assert!(ActionConfirmation.allowed_under(M::ConfirmationsOnly));
        assert!(SystemConfirmation.allowed_under(M::ConfirmationsOnly));
    }
}
