//! Server-Sent Events (SSE) client for receiving messages.
//!
//! The gateway pushes inbound Signal envelopes over a long-lived SSE
//! connection. [`ReceiveStream`] wraps that connection in a single logical
//! stream that transparently re-opens it whenever it terminates, so callers
//! never observe a permanent close short of dropping the stream.

use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::stream::Stream;
use futures::StreamExt;
use reqwest_eventsource::{Event, RequestBuilderExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::GatewayConfig;
use crate::types::{Envelope, ReceiveEvent};
use crate::GatewayClient;

/// Configuration for automatic reconnection.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Initial delay before the first reconnect attempt.
    pub initial_delay: Duration,
    /// Maximum delay between reconnect attempts.
    pub max_delay: Duration,
    /// Backoff multiplier for each attempt.
    pub backoff_multiplier: f64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
        }
    }
}

impl ReconnectConfig {
    /// Calculate delay for a given attempt number (1-based).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay_ms = self.initial_delay.as_millis() as f64
            * self.backoff_multiplier.powi(attempt.saturating_sub(1) as i32);
        let delay = Duration::from_millis(delay_ms as u64);
        delay.min(self.max_delay)
    }
}

/// A stream of incoming Signal message envelopes.
///
/// Backed by a task that owns the SSE connection and re-opens it after any
/// termination, with [`ReconnectConfig`]'s delay curve. Dropping the stream
/// aborts the task and closes the connection.
pub struct ReceiveStream {
    rx: mpsc::Receiver<Envelope>,
    task: JoinHandle<()>,
}

impl ReceiveStream {
    fn spawn(config: GatewayConfig, reconnect: ReconnectConfig) -> Self {
        let (tx, rx) = mpsc::channel(64);
        let task = tokio::spawn(run_receive_loop(config, reconnect, tx));
        Self { rx, task }
    }
}

impl Stream for ReceiveStream {
    type Item = Envelope;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

impl Drop for ReceiveStream {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Connection-owning loop behind [`ReceiveStream`].
async fn run_receive_loop(
    config: GatewayConfig,
    reconnect: ReconnectConfig,
    tx: mpsc::Sender<Envelope>,
) {
    let url = config.events_url();

    // Separate HTTP client without a request timeout: SSE connections are
    // long-lived and must not be timed out mid-stream.
    let http = match reqwest::Client::builder().build() {
        Ok(http) => http,
        Err(e) => {
            warn!("Failed to build SSE client: {}", e);
            return;
        }
    };

    let mut attempt: u32 = 0;
    loop {
        info!("Opening SSE connection to {}", url);

        let mut source = match http.get(&url).eventsource() {
            Ok(source) => source,
            Err(e) => {
                warn!("Failed to create SSE request: {}", e);
                return;
            }
        };

        while let Some(event) = source.next().await {
            match event {
                Ok(Event::Open) => {
                    debug!("SSE connection opened");
                    attempt = 0;
                }
                Ok(Event::Message(msg)) => {
                    // Only the "receive" event type carries message data.
                    if msg.event != "receive" {
                        debug!("Ignoring SSE event type: {}", msg.event);
                        continue;
                    }
                    match serde_json::from_str::<ReceiveEvent>(&msg.data) {
                        Ok(event) => {
                            if tx.send(event.envelope).await.is_err() {
                                // Receiver dropped; shut down.
                                return;
                            }
                        }
                        Err(e) => {
                            warn!("Failed to parse SSE event data: {}", e);
                            debug!("Raw data: {}", msg.data);
                        }
                    }
                }
                Err(e) => {
                    warn!("SSE error: {}", e);
                    break;
                }
            }
        }
        source.close();

        if tx.is_closed() {
            return;
        }

        attempt += 1;
        let delay = reconnect.delay_for_attempt(attempt);
        info!(
            "SSE stream ended, reconnecting in {:?} (attempt {})",
            delay, attempt
        );
        tokio::time::sleep(delay).await;
    }
}

/// Subscribe to incoming messages with default reconnection behavior.
pub fn subscribe(client: &GatewayClient) -> ReceiveStream {
    subscribe_with_reconnect(client, ReconnectConfig::default())
}

/// Subscribe to incoming messages with custom reconnection configuration.
pub fn subscribe_with_reconnect(
    client: &GatewayClient,
    reconnect: ReconnectConfig,
) -> ReceiveStream {
    ReceiveStream::spawn(client.config().clone(), reconnect)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_curve_doubles_and_caps() {
        let config = ReconnectConfig {
            initial_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(10),
            backoff_multiplier: 2.0,
        };

        assert_eq!(config.delay_for_attempt(1), Duration::from_secs(5));
        assert_eq!(config.delay_for_attempt(2), Duration::from_secs(10));
        // Capped from here on.
        assert_eq!(config.delay_for_attempt(3), Duration::from_secs(10));
        assert_eq!(config.delay_for_attempt(8), Duration::from_secs(10));
    }
}
