use std::time::Duration;

use reqwest::{StatusCode, Url};
use thiserror::Error;

const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub(super) enum TriggerError {
    #[error("webhook request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("webhook failed: {0}")]
    Status(StatusCode),
}

/// Fire-and-forget notification to the updater's webhook. Never retried.
#[derive(Clone, Debug)]
pub(super) struct WebhookTrigger {
    client: reqwest::Client,
    url: Url,
}

impl WebhookTrigger {
    pub fn new(url: Url) -> Result<Self, TriggerError> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(WEBHOOK_TIMEOUT)
            .build()?;
        Ok(Self { client, url })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub async fn fire(&self) -> Result<(), TriggerError> {
        let resp = self.client.post(self.url.clone()).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(TriggerError::Status(status));
        }
        Ok(())
    }
}
