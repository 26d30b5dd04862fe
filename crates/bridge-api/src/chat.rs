//! HTTP client for the external chat service.
//!
//! The chat pipeline lives in the main application; the listener deposits
//! Signal-originated text through its internal ingestion endpoint.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use bridge::{AuthorRole, BridgeError, ChatPipeline};

/// Chat pipeline backed by the application's internal HTTP API.
#[derive(Clone)]
pub struct HttpChatPipeline {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Serialize)]
struct AddMessageRequest<'a> {
    user_id: &'a str,
    project_id: &'a str,
    body: &'a str,
    author_role: AuthorRole,
}

#[derive(Deserialize)]
struct AddMessageResponse {
    id: String,
}

impl HttpChatPipeline {
    /// Create a client for the chat service at the given base URL.
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/internal/chat/messages",
            self.base_url.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl ChatPipeline for HttpChatPipeline {
    async fn add_message(
        &self,
        user_id: &str,
        project_id: &str,
        body: &str,
        author: AuthorRole,
    ) -> Result<String, BridgeError> {
        let request = AddMessageRequest {
            user_id,
            project_id,
            body,
            author_role: author,
        };

        let response = self
            .http
            .post(self.messages_url())
            .json(&request)
            .send()
            .await
            .map_err(|e| BridgeError::Chat(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BridgeError::Chat(format!("HTTP {}: {}", status, body)));
        }

        let created: AddMessageResponse = response
            .json()
            .await
            .map_err(|e| BridgeError::Chat(e.to_string()))?;

        debug!(user_id = %user_id, project_id = %project_id, "Deposited chat message");
        Ok(created.id)
    }
}
