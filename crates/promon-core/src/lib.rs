#![forbid(unsafe_code)]

pub mod checker;
pub mod config;
pub mod monitor;
pub mod notify;

pub use checker::{CheckError, HealthCheck, HttpChecker, ProbeOutcome};
pub use config::{CheckTarget, MonitorConfig};
pub use monitor::{
    ErrorStateTracker, EventKind, Monitor, MonitorError, MonitorState, NotificationEvent,
    TransitionDecision,
};
pub use notify::{
    build_notifiers, NotificationDispatcher, Notifier, NotifierConfig, NotifyContext, NotifyError,
};
