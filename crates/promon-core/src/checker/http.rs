use std::error::Error as StdError;
use std::io;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{redirect, Client};
use tracing::{debug, info};
use url::Url;

use super::{CheckError, HealthCheck, ProbeOutcome};
use crate::config::{CheckTarget, MonitorConfig};

/// Probes targets with a single HTTP GET per check. No retries.
#[derive(Debug, Clone)]
pub struct HttpChecker {
    client: Client,
}

impl HttpChecker {
    pub fn new(timeout: Duration, user_agent: &str, verify_tls: bool) -> Result<Self, CheckError> {
        Ok(Self {
            client: Self::build_client(timeout, user_agent, verify_tls)?,
        })
    }

    pub fn from_config(config: &MonitorConfig) -> Result<Self, CheckError> {
        Self::new(config.request_timeout, &config.user_agent(), config.verify_tls)
    }

    /// Redirects are never followed: a 3xx is compared against the expected code.
    pub fn build_client(
        timeout: Duration,
        user_agent: &str,
        verify_tls: bool,
    ) -> Result<Client, CheckError> {
        Client::builder()
            .timeout(timeout)
            .redirect(redirect::Policy::none())
            .user_agent(user_agent)
            .danger_accept_invalid_certs(!verify_tls)
            .build()
            .map_err(|e| CheckError::Client(e.to_string()))
    }
}

#[async_trait]
impl HealthCheck for HttpChecker {
    async fn check(&self, target: &CheckTarget) -> Result<ProbeOutcome, CheckError> {
        info!(url = %target.url, "Checking target");

        let Some(url) = parse_target_url(&target.url) else {
            return Ok(ProbeOutcome::BadUrl);
        };

        let outcome = match self.client.get(url).send().await {
            Ok(response) => {
                let actual = response.status().as_u16();
                if actual == target.expected_code {
                    ProbeOutcome::Success
                } else {
                    ProbeOutcome::WrongResponseCode {
                        actual,
                        expected: target.expected_code,
                    }
                }
            }
            Err(e) => classify_error(&e),
        };

        debug!(url = %target.url, %outcome, "Probe finished");
        Ok(outcome)
    }
}

fn parse_target_url(raw: &str) -> Option<Url> {
    let url = Url::parse(raw).ok()?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return None;
    }
    url.host_str().filter(|h| !h.is_empty())?;
    Some(url)
}

/// Maps a transport failure onto a [`ProbeOutcome`] by walking its cause chain.
pub(crate) fn classify_error(err: &reqwest::Error) -> ProbeOutcome {
    if err.is_timeout() {
        return ProbeOutcome::Timeout;
    }
    if err.is_builder() {
        return ProbeOutcome::BadUrl;
    }

    let mut source: Option<&(dyn StdError + 'static)> = err.source();
    while let Some(cause) = source {
        if let Some(outcome) = classify_cause(cause) {
            return outcome;
        }
        source = cause.source();
    }

    ProbeOutcome::UnclassifiedFailure {
        reason: err.to_string(),
    }
}

/// Classifies a single link of a cause chain, ignoring its own sources.
fn classify_cause(cause: &(dyn StdError + 'static)) -> Option<ProbeOutcome> {
    if let Some(io_err) = cause.downcast_ref::<io::Error>() {
        match io_err.kind() {
            io::ErrorKind::ConnectionRefused => return Some(ProbeOutcome::ConnectionRefused),
            io::ErrorKind::TimedOut => return Some(ProbeOutcome::Timeout),
            io::ErrorKind::HostUnreachable | io::ErrorKind::NetworkUnreachable => {
                return Some(ProbeOutcome::NoRouteToHost)
            }
            _ => {}
        }
    }
    is_dns_failure(cause).then_some(ProbeOutcome::BadHostname)
}

// hyper-util reports resolver failures as an opaque `ConnectError("dns error")`.
fn is_dns_failure(cause: &(dyn StdError + 'static)) -> bool {
    let message = cause.to_string();
    message.starts_with("dns error") || message.contains("failed to lookup address")
}
