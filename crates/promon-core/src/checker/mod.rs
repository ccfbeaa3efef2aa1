mod http;

pub use http::HttpChecker;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::CheckTarget;

/// Classified result of a single probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeOutcome {
    Success,
    ConnectionRefused,
    Timeout,
    NoRouteToHost,
    BadHostname,
    BadUrl,
    WrongResponseCode { actual: u16, expected: u16 },
    /// Any transport failure that matched none of the above.
    UnclassifiedFailure { reason: String },
}

impl ProbeOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Short label used as the notification subject.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Success => "OK",
            Self::ConnectionRefused => "Connection refused",
            Self::Timeout => "Timed out",
            Self::NoRouteToHost => "No route to host",
            Self::BadHostname => "Couldn't find hostname",
            Self::BadUrl => "Bad URL",
            Self::WrongResponseCode { .. } => "Wrong response code",
            Self::UnclassifiedFailure { .. } => "Site is down",
        }
    }

    /// Extra detail appended to the target URL in alert bodies.
    pub fn detail(&self) -> Option<String> {
        match self {
            Self::WrongResponseCode { actual, expected } => {
                Some(format!("responded with {} instead of {}", actual, expected))
            }
            _ => None,
        }
    }

    /// Every failure label, in the order channels register them.
    pub fn failure_labels() -> [&'static str; 7] {
        [
            "Couldn't find hostname",
            "Bad URL",
            "Site is down",
            "Timed out",
            "Connection refused",
            "Wrong response code",
            "No route to host",
        ]
    }
}

impl fmt::Display for ProbeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnclassifiedFailure { reason } => write!(f, "{}: {}", self.label(), reason),
            _ => match self.detail() {
                Some(detail) => write!(f, "{} ({})", self.label(), detail),
                None => write!(f, "{}", self.label()),
            },
        }
    }
}

/// A failure of the checker itself, as opposed to a failing target.
#[derive(Debug, Error)]
pub enum CheckError {
    #[error("failed to build HTTP client: {0}")]
    Client(String),
    #[error("health check failed unexpectedly: {0}")]
    Internal(String),
}

/// Executes one probe against one target.
///
/// Expected network failures are returned as `Ok` with a failing
/// [`ProbeOutcome`]; `Err` is reserved for faults the caller cannot classify.
#[async_trait]
pub trait HealthCheck: Send + Sync {
    async fn check(&self, target: &CheckTarget) -> Result<ProbeOutcome, CheckError>;
}
