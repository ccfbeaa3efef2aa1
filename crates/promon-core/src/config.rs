use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_APP_NAME: &str = "promon";
pub const DEFAULT_NOTIFY_TIMEOUT: Duration = Duration::from_secs(30);

/// Runtime settings for a [`Monitor`](crate::Monitor) instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Name reported to notification channels and in the probe User-Agent.
    pub app_name: String,
    /// Sleep between two check cycles (default: 60s).
    pub interval: Duration,
    /// Deadline covering one whole probe, connect to last byte (default: 5s).
    pub request_timeout: Duration,
    /// Verify TLS certificates of probed targets. Off unless explicitly enabled.
    pub verify_tls: bool,
    /// Deadline for a single channel within one dispatch.
    pub notify_timeout: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            app_name: DEFAULT_APP_NAME.to_string(),
            interval: Duration::from_secs(60),
            request_timeout: Duration::from_secs(5),
            verify_tls: false,
            notify_timeout: DEFAULT_NOTIFY_TIMEOUT,
        }
    }
}

impl MonitorConfig {
    pub fn with_app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = name.into();
        self
    }

    pub fn with_interval_secs(mut self, secs: u64) -> Self {
        self.interval = Duration::from_secs(secs);
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_verify_tls(mut self, verify: bool) -> Self {
        self.verify_tls = verify;
        self
    }

    pub fn with_notify_timeout(mut self, timeout: Duration) -> Self {
        self.notify_timeout = timeout;
        self
    }

    pub fn user_agent(&self) -> String {
        format!("{}: Site Monitor", self.app_name)
    }
}

/// One monitored endpoint. Loaded once and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckTarget {
    pub url: String,
    #[serde(default = "default_expected_code")]
    pub expected_code: u16,
    /// Reserved; not evaluated by the checker.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_body: Option<String>,
}

fn default_expected_code() -> u16 {
    200
}

impl CheckTarget {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            expected_code: default_expected_code(),
            expected_body: None,
        }
    }

    pub fn with_expected_code(mut self, code: u16) -> Self {
        self.expected_code = code;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_legacy_behaviour() {
        let c = MonitorConfig::default();
        assert_eq!(c.app_name, "promon");
        assert_eq!(c.interval, Duration::from_secs(60));
        assert_eq!(c.request_timeout, Duration::from_secs(5));
        assert!(!c.verify_tls);
    }

    #[test]
    fn user_agent_includes_app_name() {
        let c = MonitorConfig::default().with_app_name("sitewatch");
        assert_eq!(c.user_agent(), "sitewatch: Site Monitor");
    }

    #[test]
    fn target_defaults_to_200() {
        let t = CheckTarget::new("http://a.test");
        assert_eq!(t.expected_code, 200);
        assert!(t.expected_body.is_none());
        assert_eq!(t.with_expected_code(204).expected_code, 204);
    }
}
