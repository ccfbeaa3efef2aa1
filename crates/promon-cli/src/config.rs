//! TOML configuration file schema and parsing.
//!
//! Example config file:
//!
//! ```toml
//! app_name = "promon"
//! sleep = 60
//! timeout = 5
//! verify_tls = false
//!
//! [logging]
//! format = "json"
//! file = "/var/log/promon/promon.log"
//!
//! [[http]]
//! url = "https://example.com/"
//!
//! [[http]]
//! url = "https://api.example.com/health"
//! code = 204
//!
//! [[notifier]]
//! method = "prowl"
//! apikey = "0123456789abcdef"
//!
//! [[notifier]]
//! method = "mail"
//! smtp_server = "smtp.example.com"
//! to = ["ops@example.com"]
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use promon_core::config::DEFAULT_APP_NAME;
use promon_core::{CheckTarget, MonitorConfig, NotifierConfig};

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_app_name")]
    pub app_name: String,

    /// Seconds between check cycles.
    #[serde(default = "default_sleep")]
    pub sleep: u64,

    /// Probe timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    #[serde(default)]
    pub verify_tls: bool,

    #[serde(default = "default_notify_timeout")]
    pub notify_timeout: u64,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub http: Vec<TargetDef>,

    #[serde(default)]
    pub notifier: Vec<NotifierConfig>,
}

fn default_app_name() -> String {
    DEFAULT_APP_NAME.to_string()
}

fn default_sleep() -> u64 {
    60
}

fn default_timeout() -> u64 {
    5
}

fn default_notify_timeout() -> u64 {
    30
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_format")]
    pub format: String,

    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: default_log_format(),
            file: None,
        }
    }
}

fn default_log_format() -> String {
    "pretty".into()
}

#[derive(Debug, Clone, Deserialize)]
pub struct TargetDef {
    pub url: String,

    #[serde(default = "default_code")]
    pub code: u16,

    /// Reserved for body matching.
    #[serde(default)]
    pub response: Option<String>,
}

fn default_code() -> u16 {
    200
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {}", path.display(), e))?;

        let config: AppConfig = toml::from_str(&content)
            .map_err(|e| format!("Failed to parse config file {}: {}", path.display(), e))?;

        config.validate()?;
        Ok(config)
    }

    pub fn to_monitor_config(&self) -> MonitorConfig {
        MonitorConfig::default()
            .with_app_name(&self.app_name)
            .with_interval_secs(self.sleep)
            .with_request_timeout(Duration::from_secs(self.timeout))
            .with_verify_tls(self.verify_tls)
            .with_notify_timeout(Duration::from_secs(self.notify_timeout))
    }

    pub fn to_targets(&self) -> Vec<CheckTarget> {
        self.http
            .iter()
            .map(|t| CheckTarget {
                url: t.url.clone(),
                expected_code: t.code,
                expected_body: t.response.clone(),
            })
            .collect()
    }

    // Target URL syntax is left to the checker, which reports it as "Bad URL".
    fn validate(&self) -> Result<(), String> {
        if self.app_name.trim().is_empty() {
            return Err("app_name must not be empty".into());
        }
        if self.sleep == 0 {
            return Err("sleep must be at least 1 second".into());
        }
        if self.timeout == 0 {
            return Err("timeout must be at least 1 second".into());
        }
        if self.notify_timeout == 0 {
            return Err("notify_timeout must be at least 1 second".into());
        }

        if self.http.is_empty() {
            return Err("No [[http]] targets configured".into());
        }
        let mut urls = HashSet::new();
        for (i, t) in self.http.iter().enumerate() {
            if t.url.trim().is_empty() {
                return Err(format!("Target at index {} has an empty url", i));
            }
            if !urls.insert(t.url.as_str()) {
                return Err(format!("Duplicate target URL: {}", t.url));
            }
            if !(100..=599).contains(&t.code) {
                return Err(format!(
                    "Target '{}' expects invalid status code {}",
                    t.url, t.code
                ));
            }
        }

        for (i, n) in self.notifier.iter().enumerate() {
            match n {
                NotifierConfig::Prowl(p) if p.apikey.trim().is_empty() => {
                    return Err(format!("Prowl notifier at index {} has an empty apikey", i));
                }
                NotifierConfig::Mail(m) if m.to.is_empty() => {
                    return Err(format!("Mail notifier at index {} has no recipients", i));
                }
                NotifierConfig::Growl(g) if g.host.trim().is_empty() => {
                    return Err(format!("Growl notifier at index {} has an empty host", i));
                }
                _ => {}
            }
        }

        match self.logging.format.as_str() {
            "pretty" | "json" => {}
            other => {
                return Err(format!(
                    "Invalid logging format '{}': must be 'pretty' or 'json'",
                    other
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_minimal_config() {
        let toml = r#"
[[http]]
url = "https://example.com/"
"#;
        let config: AppConfig = toml::from_str(toml).unwrap();
        config.validate().unwrap();
        assert_eq!(config.app_name, "promon");
        assert_eq!(config.sleep, 60);
        assert_eq!(config.timeout, 5);
        assert!(!config.verify_tls);
        assert_eq!(config.http[0].code, 200);
        assert!(config.notifier.is_empty());
        assert_eq!(config.logging.format, "pretty");

        let mc = config.to_monitor_config();
        assert_eq!(mc.interval, Duration::from_secs(60));
        assert_eq!(mc.request_timeout, Duration::from_secs(5));
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
app_name = "sitewatch"
sleep = 30
timeout = 10
verify_tls = true

[logging]
format = "json"
file = "/tmp/promon.log"

[[http]]
url = "https://example.com/"

[[http]]
url = "https://api.example.com/health"
code = 204
response = "ok"

[[notifier]]
method = "prowl"
apikey = "abc"
priority = 2

[[notifier]]
method = "growl"
host = "192.168.1.255"
password = "pw"

[[notifier]]
method = "mail"
smtp_server = "smtp.example.com"
smtp_username = "bot"
smtp_password = "hunter2"
port = 587
to = "ops@example.com"
cc = ["lead@example.com"]
"#;
        let config: AppConfig = toml::from_str(toml).unwrap();
        config.validate().unwrap();

        assert_eq!(config.logging.format, "json");
        assert_eq!(config.logging.file.as_deref(), Some(Path::new("/tmp/promon.log")));

        let targets = config.to_targets();
        assert_eq!(targets.len(), 2);
        assert_eq!(targets[1].expected_code, 204);
        assert_eq!(targets[1].expected_body.as_deref(), Some("ok"));

        assert_eq!(config.notifier.len(), 3);
        let methods: Vec<&str> = config.notifier.iter().map(|n| n.method()).collect();
        assert_eq!(methods, vec!["prowl", "growl", "mail"]);
        match &config.notifier[1] {
            NotifierConfig::Growl(g) => {
                assert_eq!(g.port, 9887);
                assert_eq!(g.priority, 1);
                assert!(g.sticky);
            }
            other => panic!("expected growl, got {:?}", other),
        }
        match &config.notifier[2] {
            NotifierConfig::Mail(m) => {
                assert_eq!(m.port, 587);
                assert_eq!(m.to, vec!["ops@example.com"]);
            }
            other => panic!("expected mail, got {:?}", other),
        }

        let mc = config.to_monitor_config();
        assert_eq!(mc.app_name, "sitewatch");
        assert_eq!(mc.user_agent(), "sitewatch: Site Monitor");
        assert_eq!(mc.interval, Duration::from_secs(30));
        assert!(mc.verify_tls);
    }

    #[test]
    fn unknown_notifier_method_is_rejected() {
        let toml = r#"
[[http]]
url = "https://example.com/"

[[notifier]]
method = "pigeon"
"#;
        let err = toml::from_str::<AppConfig>(toml).unwrap_err();
        assert!(err.to_string().contains("pigeon"), "{}", err);
    }

    #[test]
    fn validate_rejects_missing_targets() {
        let config: AppConfig = toml::from_str("sleep = 10").unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.contains("No [[http]] targets"), "{}", err);
    }

    #[test]
    fn validate_rejects_duplicate_targets() {
        let toml = r#"
[[http]]
url = "https://example.com/"

[[http]]
url = "https://example.com/"
"#;
        let config: AppConfig = toml::from_str(toml).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.contains("Duplicate target URL"), "{}", err);
    }

    #[test]
    fn validate_rejects_zero_sleep() {
        let toml = r#"
sleep = 0

[[http]]
url = "https://example.com/"
"#;
        let config: AppConfig = toml::from_str(toml).unwrap();
        assert!(config.validate().unwrap_err().contains("sleep"));
    }

    #[test]
    fn validate_rejects_empty_prowl_key() {
        let toml = r#"
[[http]]
url = "https://example.com/"

[[notifier]]
method = "prowl"
apikey = ""
"#;
        let config: AppConfig = toml::from_str(toml).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.contains("empty apikey"), "{}", err);
    }

    #[test]
    fn validate_rejects_invalid_log_format() {
        let toml = r#"
[logging]
format = "xml"

[[http]]
url = "https://example.com/"
"#;
        let config: AppConfig = toml::from_str(toml).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.contains("Invalid logging format"), "{}", err);
    }

    #[test]
    fn malformed_target_url_is_left_to_the_checker() {
        let toml = r#"
[[http]]
url = "not a url"
"#;
        let config: AppConfig = toml::from_str(toml).unwrap();
        config.validate().unwrap();
    }
}
