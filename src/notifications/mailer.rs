//! Outbound email via a transactional mail provider's HTTP API
//!
//! Sending is strictly fire-and-forget: failures are logged and dropped so
//! a mail outage can never fail a swap operation.

use reqwest::Client;
use serde_json::json;
use std::time::Duration;

use crate::config::MailConfig;
use crate::notifications::EmailMessage;

/// Mail provider client. Disabled when no provider is configured.
pub struct Mailer {
    inner: Option<MailerInner>,
}

struct MailerInner {
    client: Client,
    config: MailConfig,
}

impl Mailer {
    pub fn new(config: Option<MailConfig>) -> Self {
        let inner = config.map(|config| MailerInner {
            client: Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_else(|_| Client::new()),
            config,
        });

        if inner.is_none() {
            tracing::info!("Mail provider not configured, outbound email disabled");
        }

        Self { inner }
    }

    /// Whether a provider is configured
    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }

    /// Send one email. Logs and swallows every failure.
    pub async fn send(&self, message: EmailMessage) {
        let Some(inner) = &self.inner else {
            tracing::debug!(to = %message.to, template = %message.template, "Email dropped (mailer disabled)");
            return;
        };

        let payload = json!({
            "from": inner.config.from_address,
            "to": message.to,
            "template": message.template,
            "vars": message.vars,
        });

        let result = inner
            .client
            .post(&inner.config.api_url)
            .bearer_auth(&inner.config.api_key)
            .json(&payload)
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                tracing::debug!(to = %message.to, template = %message.template, "Email accepted by provider");
            }
            Ok(response) => {
                tracing::warn!(
                    to = %message.to,
                    template = %message.template,
                    status = %response.status(),
                    "Mail provider rejected email"
                );
            }
            Err(e) => {
                tracing::warn!(
                    to = %message.to,
                    template = %message.template,
                    error = %e,
                    "Failed to reach mail provider"
                );
            }
        }
    }
}
