//! Types for sending messages via the gateway.

use serde::{Deserialize, Serialize};

/// Parameters for sending a message.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendParams {
    /// Recipients (phone numbers).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub recipient: Vec<String>,

    /// The message text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Account to send from (multi-account mode).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,

    /// Text style formatting.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub text_style: Vec<TextStyleParam>,
}

impl SendParams {
    /// Create new send params for a text message to a recipient.
    pub fn text(recipient: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            recipient: vec![recipient.into()],
            message: Some(message.into()),
            ..Default::default()
        }
    }

    /// Set the account for multi-account mode.
    pub fn with_account(mut self, account: impl Into<String>) -> Self {
        self.account = Some(account.into());
        self
    }

    /// Add text style ranges.
    pub fn with_styles(mut self, styles: Vec<TextStyleParam>) -> Self {
        self.text_style = styles;
        self
    }
}

/// Text style parameter (Signal body range).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextStyleParam {
    /// Start position.
    pub start: u32,
    /// Length.
    pub length: u32,
    /// Style type (BOLD, ITALIC, etc.).
    pub style: String,
}

/// Receipt for a sent message.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendReceipt {
    /// Timestamp of the sent message.
    pub timestamp: u64,

    /// Results per recipient (if available).
    #[serde(default)]
    pub results: Vec<RecipientResult>,
}

/// Result for a specific recipient.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipientResult {
    /// Whether the message was sent successfully.
    #[serde(default)]
    pub success: bool,

    /// Error message if failed.
    #[serde(default)]
    pub error: Option<String>,
}
