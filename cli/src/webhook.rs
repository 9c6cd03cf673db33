//! Webhook delivery over HTTP.

use std::sync::Arc;
use std::time::Duration;

use ocrtable::{Error, Notifier, WebhookPayload};
use tokio::runtime::Runtime;

/// Timeout for one webhook call.
const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

/// Header carrying the shared secret.
const SECRET_HEADER: &str = "x-webhook-secret";

/// Posts job outcomes as JSON to a URL.
pub struct WebhookNotifier {
    url: String,
    secret: Option<String>,
    client: reqwest::Client,
    runtime: Arc<Runtime>,
}

impl WebhookNotifier {
    /// Create a notifier posting to `url`, optionally signed with `secret`.
    pub fn new(
        url: impl Into<String>,
        secret: Option<String>,
        runtime: Arc<Runtime>,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(WEBHOOK_TIMEOUT).build()?;
        Ok(Self {
            url: url.into(),
            secret,
            client,
            runtime,
        })
    }

    async fn post(&self, payload: &WebhookPayload) -> Result<reqwest::StatusCode, reqwest::Error> {
        let mut request = self.client.post(&self.url).json(payload);
        if let Some(secret) = &self.secret {
            request = request.header(SECRET_HEADER, secret);
        }
        let response = request.send().await?.error_for_status()?;
        Ok(response.status())
    }
}

impl Notifier for WebhookNotifier {
    fn notify(&self, payload: &WebhookPayload) -> ocrtable::Result<()> {
        match self.runtime.block_on(self.post(payload)) {
            Ok(status) => {
                log::info!("Webhook sent to {} (status {})", self.url, status);
                Ok(())
            }
            Err(e) => Err(Error::Collaborator(format!(
                "webhook to {} failed: {}",
                self.url, e
            ))),
        }
    }
}
