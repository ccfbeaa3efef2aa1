use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::checker::ProbeOutcome;
use crate::notify::NotifyContext;

pub const SUBJECT_STARTUP: &str = "started";
pub const SUBJECT_SHUTDOWN: &str = "terminated";
pub const SUBJECT_RESOLVED: &str = "Error resolved";
pub const SUBJECT_INTERNAL_ERROR: &str = "internal error";

/// Subjects emitted for lifecycle and recovery events.
pub fn lifecycle_subjects() -> [&'static str; 4] {
    [
        SUBJECT_RESOLVED,
        SUBJECT_INTERNAL_ERROR,
        SUBJECT_STARTUP,
        SUBJECT_SHUTDOWN,
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Startup,
    Shutdown,
    Alert,
    Resolved,
    InternalError,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Startup => write!(f, "startup"),
            Self::Shutdown => write!(f, "shutdown"),
            Self::Alert => write!(f, "alert"),
            Self::Resolved => write!(f, "resolved"),
            Self::InternalError => write!(f, "internal-error"),
        }
    }
}

/// One logical notification, fanned out to every channel by the dispatcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub kind: EventKind,
    pub subject: String,
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<NotifyContext>,
}

impl NotificationEvent {
    pub fn new(kind: EventKind, subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            kind,
            subject: subject.into(),
            body: body.into(),
            context: None,
        }
    }

    pub fn with_context(mut self, context: NotifyContext) -> Self {
        self.context = Some(context);
        self
    }

    pub fn startup(pid: u32) -> Self {
        Self::new(
            EventKind::Startup,
            SUBJECT_STARTUP,
            format!("running with PID: {}", pid),
        )
    }

    pub fn shutdown(pid: u32) -> Self {
        Self::new(
            EventKind::Shutdown,
            SUBJECT_SHUTDOWN,
            format!("terminated, PID: {}", pid),
        )
    }

    /// Alert for a failing target: subject is the failure label, body is the
    /// URL plus any outcome detail.
    pub fn alert(url: &str, outcome: &ProbeOutcome) -> Self {
        let body = match outcome.detail() {
            Some(detail) => format!("{} {}", url, detail),
            None => url.to_string(),
        };
        Self::new(EventKind::Alert, outcome.label(), body).with_context(NotifyContext::for_url(url))
    }

    pub fn resolved(url: &str) -> Self {
        Self::new(EventKind::Resolved, SUBJECT_RESOLVED, url)
            .with_context(NotifyContext::for_url(url))
    }

    pub fn internal_error(description: impl Into<String>) -> Self {
        Self::new(EventKind::InternalError, SUBJECT_INTERNAL_ERROR, description)
    }
}
