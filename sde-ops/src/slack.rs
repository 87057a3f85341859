//! Slack incoming-webhook client.

use async_trait::async_trait;
use sde_ops_core::contract::{ChatWebhook, ServiceError};
use serde_json::Value;
use tracing::info;

/// [`ChatWebhook`] posting JSON to a Slack incoming-webhook URL.
pub struct SlackWebhook {
    client: reqwest::Client,
    url: String,
}

impl SlackWebhook {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl ChatWebhook for SlackWebhook {
    async fn post(&self, payload: &Value) -> Result<u16, ServiceError> {
        let response = self.client.post(&self.url).json(payload).send().await?;
        let status = response.status().as_u16();
        info!(status, "Slack webhook responded");
        Ok(status)
    }
}
