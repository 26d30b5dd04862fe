//! Envelope and message types received from the gateway.

use serde::{Deserialize, Serialize};

/// A message envelope received from Signal.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    /// Source phone number (e.g., "+1234567890").
    #[serde(default)]
    pub source: String,

    /// Source phone number (same as source).
    #[serde(default)]
    pub source_number: String,

    /// Source UUID.
    #[serde(default)]
    pub source_uuid: Option<String>,

    /// Contact name if available.
    #[serde(default)]
    pub source_name: Option<String>,

    /// Message timestamp (milliseconds since epoch).
    #[serde(default)]
    pub timestamp: u64,

    /// Data message content (regular message). Absent for receipts, typing
    /// indicators and other envelope kinds the bridge does not consume.
    #[serde(default)]
    pub data_message: Option<DataMessage>,
}

/// A data message containing the actual message content.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataMessage {
    /// Message timestamp.
    #[serde(default)]
    pub timestamp: u64,

    /// The text message content.
    #[serde(default)]
    pub message: Option<String>,

    /// Group information if this is a group message.
    #[serde(default)]
    pub group_info: Option<GroupInfo>,

    /// Attachments included with the message.
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

/// Information about a group.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupInfo {
    /// Group ID (base64 encoded).
    #[serde(default)]
    pub group_id: String,
}

/// An attachment in a message.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    /// Content type (MIME type).
    #[serde(default)]
    pub content_type: String,

    /// Original filename.
    #[serde(default)]
    pub filename: Option<String>,

    /// Attachment ID.
    #[serde(default)]
    pub id: Option<String>,

    /// Size in bytes.
    #[serde(default)]
    pub size: Option<u64>,
}

/// Wrapper for SSE event data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiveEvent {
    /// The message envelope.
    pub envelope: Envelope,
}
