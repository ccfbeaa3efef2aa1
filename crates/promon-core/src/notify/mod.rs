//! Notification channels.
//!
//! Every channel implements [`Notifier`]. The set of channels is built once
//! from a list of [`NotifierConfig`] entries, tagged by `method`, and handed
//! to a [`NotificationDispatcher`] which delivers each event to all of them.

mod dispatcher;
pub mod growl;
pub mod mail;
pub mod prowl;

pub use dispatcher::{DispatchReport, NotificationDispatcher};
pub use growl::{GrowlConfig, GrowlNotifier};
pub use mail::{MailConfig, MailNotifier};
pub use prowl::{ProwlConfig, ProwlNotifier};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("invalid notifier configuration: {0}")]
    InvalidConfig(String),
    #[error("delivery failed: {0}")]
    Delivery(String),
    #[error("no response within {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
    #[error("notifier panicked: {0}")]
    Panic(String),
}

/// Structured extra data attached to a notification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotifyContext {
    /// The affected target, when the event concerns one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl NotifyContext {
    pub fn for_url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
        }
    }
}

/// A single outbound notification channel.
///
/// Implementations share no state with each other. Errors returned here are
/// logged by the dispatcher and never reach the monitor loop.
#[async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &str;

    async fn notify(
        &self,
        subject: &str,
        body: &str,
        context: Option<&NotifyContext>,
    ) -> Result<(), NotifyError>;
}

/// Channel configuration, discriminated by the `method` key.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "lowercase")]
pub enum NotifierConfig {
    Prowl(ProwlConfig),
    Growl(GrowlConfig),
    Mail(MailConfig),
}

impl NotifierConfig {
    pub fn method(&self) -> &'static str {
        match self {
            Self::Prowl(_) => "prowl",
            Self::Growl(_) => "growl",
            Self::Mail(_) => "mail",
        }
    }

    pub fn build(&self, app_name: &str) -> Result<Box<dyn Notifier>, NotifyError> {
        let notifier: Box<dyn Notifier> = match self {
            Self::Prowl(c) => Box::new(ProwlNotifier::new(c.clone(), app_name)?),
            Self::Growl(c) => Box::new(GrowlNotifier::new(c.clone(), app_name)?),
            Self::Mail(c) => Box::new(MailNotifier::new(c.clone(), app_name)?),
        };
        info!(method = self.method(), "Initialized notifier");
        Ok(notifier)
    }
}

/// Build the channel registry in configuration order.
pub fn build_notifiers(
    configs: &[NotifierConfig],
    app_name: &str,
) -> Result<Vec<Box<dyn Notifier>>, NotifyError> {
    configs
        .iter()
        .enumerate()
        .map(|(i, c)| {
            c.build(app_name).map_err(|e| {
                NotifyError::InvalidConfig(format!("notifier {} ({}): {}", i, c.method(), e))
            })
        })
        .collect()
}
