//! Device-linking types.

use serde::Deserialize;

/// Status of an in-progress device link, as reported by the gateway.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkStatus {
    /// Whether the user's phone has confirmed the link.
    #[serde(default)]
    pub complete: bool,

    /// The phone number now registered with the gateway, once complete.
    #[serde(default)]
    pub number: Option<String>,
}
