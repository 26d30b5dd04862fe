//! Store models.
//!
//! Enum-valued columns are stored as TEXT and converted through the
//! `as_str`/`parse` helpers below; rows keep the raw strings so unknown
//! values read from disk degrade gracefully instead of failing the query.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Lifecycle status of a user's Signal link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    Pending,
    Connected,
    Error,
    Disconnected,
}

impl ConnectionStatus {
    /// Stored string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Connected => "connected",
            Self::Error => "error",
            Self::Disconnected => "disconnected",
        }
    }

    /// Parse the stored string form.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "connected" => Some(Self::Connected),
            "error" => Some(Self::Error),
            "disconnected" => Some(Self::Disconnected),
            _ => None,
        }
    }
}

/// Which outbound message categories a user wants relayed to Signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationMode {
    All,
    ActionsOnly,
    ConfirmationsOnly,
    None,
}

impl NotificationMode {
    /// Stored string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::ActionsOnly => "actions_only",
            Self::ConfirmationsOnly => "confirmations_only",
            Self::None => "none",
        }
    }

    /// Parse the stored string form.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "all" => Some(Self::All),
            "actions_only" => Some(Self::ActionsOnly),
            "confirmations_only" => Some(Self::ConfirmationsOnly),
            "none" => Some(Self::None),
            _ => None,
        }
    }
}

/// A user's Signal link. At most one row per application user; the row is
/// retained across relinks with its status cycling through the lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Connection {
    /// Auto-incrementing ID.
    pub id: i64,
    /// Owning application user.
    pub user_id: String,
    /// Encrypted phone number; NULL once disconnected.
    pub phone_enc: Option<String>,
    /// One-way lookup hash of the phone number; NULL once disconnected.
    pub phone_hash: Option<String>,
    /// Stored status string, see [`ConnectionStatus`].
    pub status: String,
    /// Stored notification mode string, see [`NotificationMode`].
    pub notification_mode: String,
    /// Project inbound messages default to.
    pub last_active_project: Option<String>,
    /// When the link was first confirmed.
    pub linked_at: Option<String>,
    /// Creation timestamp.
    pub created_at: String,
    /// Last update timestamp.
    pub updated_at: String,
}

impl Connection {
    /// Typed status, if the stored value is recognized.
    pub fn status(&self) -> Option<ConnectionStatus> {
        ConnectionStatus::parse(&self.status)
    }

    /// Typed notification mode, defaulting to `All` for unknown values.
    pub fn notification_mode(&self) -> NotificationMode {
        NotificationMode::parse(&self.notification_mode).unwrap_or(NotificationMode::All)
    }

    /// Whether this link is active and usable for delivery.
    pub fn is_connected(&self) -> bool {
        self.status() == Some(ConnectionStatus::Connected)
    }
}

/// Direction of an audited Signal message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditDirection {
    Inbound,
    Outbound,
}

impl AuditDirection {
    /// Stored string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inbound => "inbound",
            Self::Outbound => "outbound",
        }
    }
}

/// Delivery status of an audited message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Pending,
    Delivered,
    Failed,
    Retrying,
}

impl DeliveryStatus {
    /// Stored string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Delivered => "delivered",
            Self::Failed => "failed",
            Self::Retrying => "retrying",
        }
    }

    /// Parse the stored string form.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "delivered" => Some(Self::Delivered),
            "failed" => Some(Self::Failed),
            "retrying" => Some(Self::Retrying),
            _ => None,
        }
    }
}

/// One audited Signal message, sent or received. Append-mostly; rows are
/// never deleted, even after the parent connection goes away.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct MessageAudit {
    /// Auto-incrementing ID.
    pub id: i64,
    /// Parent connection; NULL for redacted unknown-sender records.
    pub connection_id: Option<i64>,
    /// Stored direction string, see [`AuditDirection`].
    pub direction: String,
    /// Corresponding application chat message, if any.
    pub chat_message_id: Option<String>,
    /// Truncated, phone-redacted content preview.
    pub preview: String,
    /// Stored status string, see [`DeliveryStatus`].
    pub status: String,
    /// Retry attempts consumed so far (bounded by the delivery pipeline).
    pub retry_count: i64,
    /// When the next retry is scheduled, while retrying.
    pub next_retry_at: Option<String>,
    /// Most recent delivery error.
    pub last_error: Option<String>,
    /// Creation timestamp.
    pub created_at: String,
    /// Delivery timestamp, once delivered.
    pub delivered_at: Option<String>,
}

impl MessageAudit {
    /// Typed status, if the stored value is recognized.
    pub fn status(&self) -> Option<DeliveryStatus> {
        DeliveryStatus::parse(&self.status)
    }
}

/// A dismissible notice that a user's link was displaced by another user
/// claiming the same phone number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ConflictBanner {
    /// Auto-incrementing ID.
    pub id: i64,
    /// User the banner is shown to.
    pub user_id: String,
    /// Banner text.
    pub message: String,
    /// Whether the user has acknowledged it.
    pub dismissed: bool,
    /// Creation timestamp.
    pub created_at: String,
}
