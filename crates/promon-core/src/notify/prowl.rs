//! Prowl push notifications (<https://www.prowlapp.com>).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Notifier, NotifyContext, NotifyError};

pub const PROWL_API_URL: &str = "https://api.prowlapp.com/publicapi/add";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProwlConfig {
    pub apikey: String,

    /// Prowl priority, -2 (very low) to 2 (emergency).
    #[serde(default)]
    pub priority: i8,

    #[serde(default = "default_api_url")]
    pub api_url: String,

    #[serde(default = "default_prowl_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_api_url() -> String {
    PROWL_API_URL.to_string()
}

fn default_prowl_timeout_ms() -> u64 {
    10_000
}

impl ProwlConfig {
    pub fn new(apikey: impl Into<String>) -> Self {
        Self {
            apikey: apikey.into(),
            priority: 0,
            api_url: default_api_url(),
            timeout_ms: default_prowl_timeout_ms(),
        }
    }
}

pub struct ProwlNotifier {
    app_name: String,
    config: ProwlConfig,
    client: Client,
}

impl ProwlNotifier {
    pub fn new(config: ProwlConfig, app_name: &str) -> Result<Self, NotifyError> {
        if config.apikey.trim().is_empty() {
            return Err(NotifyError::InvalidConfig("prowl apikey is empty".into()));
        }
        if !(-2..=2).contains(&config.priority) {
            return Err(NotifyError::InvalidConfig(format!(
                "prowl priority {} is outside -2..=2",
                config.priority
            )));
        }

        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| NotifyError::InvalidConfig(e.to_string()))?;

        Ok(Self {
            app_name: app_name.to_string(),
            config,
            client,
        })
    }

    fn form(&self, subject: &str, body: &str, context: Option<&NotifyContext>) -> Vec<(&'static str, String)> {
        let mut form = vec![
            ("apikey", self.config.apikey.clone()),
            ("application", self.app_name.clone()),
            ("event", subject.to_string()),
            ("description", body.to_string()),
            ("priority", self.config.priority.to_string()),
        ];
        if let Some(url) = context.and_then(|c| c.url.as_ref()) {
            form.push(("url", url.clone()));
        }
        form
    }
}

#[async_trait]
impl Notifier for ProwlNotifier {
    fn name(&self) -> &str {
        "prowl"
    }

    async fn notify(
        &self,
        subject: &str,
        body: &str,
        context: Option<&NotifyContext>,
    ) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(&self.config.api_url)
            .form(&self.form(subject, body, context))
            .send()
            .await
            .map_err(|e| NotifyError::Delivery(format!("prowl request failed: {}", e)))?;

        let status = response.status();
        if status.is_success() {
            debug!(subject, "Prowl notification accepted");
            Ok(())
        } else {
            let text = response.text().await.unwrap_or_default();
            Err(NotifyError::Delivery(format!(
                "prowl returned {}: {}",
                status, text
            )))
        }
    }
}
