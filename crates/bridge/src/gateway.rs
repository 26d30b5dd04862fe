//! Gateway seam.
//!
//! Abstracted so link, delivery and listener logic runs against mocks in
//! tests; [`GatewayClient`] is the production implementation.

use async_trait::async_trait;

use signal_gateway::{GatewayClient, GatewayError, LinkStatus, SendParams, SendReceipt, TextStyleParam};

/// The slice of the gateway the bridge core needs.
///
/// Errors carry no retry semantics of their own — every failure means
/// "gateway unavailable" and policy belongs to the caller.
#[async_trait]
pub trait SignalGateway: Send + Sync {
    /// Send a styled text message to a phone number.
    async fn send_styled(
        &self,
        recipient: &str,
        text: &str,
        styles: Vec<TextStyleParam>,
    ) -> Result<SendReceipt, GatewayError>;

    /// Request a fresh, single-use linking QR code (image bytes).
    async fn request_link_qr_code(&self) -> Result<Vec<u8>, GatewayError>;

    /// Poll whether a previously requested link has completed.
    async fn link_status(&self) -> Result<LinkStatus, GatewayError>;
}

#[async_trait]
impl SignalGateway for GatewayClient {
    async fn send_styled(
        &self,
        recipient: &str,
        text: &str,
        styles: Vec<TextStyleParam>,
    ) -> Result<SendReceipt, GatewayError> {
        if styles.is_empty() {
            self.send(SendParams::text(recipient, text)).await
        } else {
            self.send_styled_text(recipient, text, styles).await
        }
    }

    async fn request_link_qr_code(&self) -> Result<Vec<u8>, GatewayError> {
        GatewayClient::request_link_qr_code(self).await
    }

    async fn link_status(&self) -> Result<LinkStatus, GatewayError> {
        GatewayClient::link_status(self).await
    }
}
