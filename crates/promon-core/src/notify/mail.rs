use std::time::Duration;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::{Credentials, Mechanism};
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use super::{Notifier, NotifyContext, NotifyError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    pub smtp_server: String,

    #[serde(default = "default_smtp_port")]
    pub port: u16,

    #[serde(default)]
    pub smtp_username: Option<String>,

    #[serde(default)]
    pub smtp_password: Option<String>,

    /// A single address or a list.
    #[serde(deserialize_with = "one_or_many")]
    pub to: Vec<String>,

    #[serde(default, deserialize_with = "one_or_many")]
    pub cc: Vec<String>,

    /// Defaults to `<app_name>@<hostname>`.
    #[serde(default)]
    pub from: Option<String>,

    #[serde(default = "default_smtp_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_smtp_port() -> u16 {
    25
}

fn default_smtp_timeout_ms() -> u64 {
    30_000
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(s) => vec![s],
        OneOrMany::Many(v) => v,
    })
}

impl MailConfig {
    pub fn new(smtp_server: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            smtp_server: smtp_server.into(),
            port: default_smtp_port(),
            smtp_username: None,
            smtp_password: None,
            to: vec![to.into()],
            cc: Vec::new(),
            from: None,
            timeout_ms: default_smtp_timeout_ms(),
        }
    }
}

/// Plain-text mail over SMTP, PLAIN auth when a username is configured.
pub struct MailNotifier {
    app_name: String,
    from: Mailbox,
    to: Vec<Mailbox>,
    cc: Vec<Mailbox>,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl MailNotifier {
    pub fn new(config: MailConfig, app_name: &str) -> Result<Self, NotifyError> {
        if config.smtp_server.trim().is_empty() {
            return Err(NotifyError::InvalidConfig("smtp_server is empty".into()));
        }
        if config.to.is_empty() {
            return Err(NotifyError::InvalidConfig("mail notifier has no recipients".into()));
        }

        let from = match config.from {
            Some(ref address) => parse_mailbox(address)?,
            None => default_sender(app_name)?,
        };

        let mut builder =
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(config.smtp_server.as_str())
                .port(config.port)
                .timeout(Some(Duration::from_millis(config.timeout_ms)));
        if let Some(ref user) = config.smtp_username {
            builder = builder
                .credentials(Credentials::new(
                    user.clone(),
                    config.smtp_password.clone().unwrap_or_default(),
                ))
                .authentication(vec![Mechanism::Plain]);
        }
        let transport: AsyncSmtpTransport<Tokio1Executor> = builder.build();

        Ok(Self {
            app_name: app_name.to_string(),
            from,
            to: config
                .to
                .iter()
                .map(|a| parse_mailbox(a))
                .collect::<Result<_, _>>()?,
            cc: config
                .cc
                .iter()
                .map(|a| parse_mailbox(a))
                .collect::<Result<_, _>>()?,
            transport,
        })
    }

    fn build_message(&self, subject: &str, body: &str) -> Result<Message, NotifyError> {
        let mut builder = Message::builder()
            .from(self.from.clone())
            .subject(format!("{} - {}", self.app_name, subject))
            .header(ContentType::TEXT_PLAIN);
        for to in &self.to {
            builder = builder.to(to.clone());
        }
        for cc in &self.cc {
            builder = builder.cc(cc.clone());
        }
        builder
            .body(body.to_string())
            .map_err(|e| NotifyError::Delivery(format!("failed to build mail: {}", e)))
    }
}

#[async_trait]
impl Notifier for MailNotifier {
    fn name(&self) -> &str {
        "mail"
    }

    async fn notify(
        &self,
        subject: &str,
        body: &str,
        _context: Option<&NotifyContext>,
    ) -> Result<(), NotifyError> {
        let message = self.build_message(subject, body)?;
        self.transport
            .send(message)
            .await
            .map_err(|e| NotifyError::Delivery(format!("smtp: {}", e)))?;
        debug!(subject, recipients = self.to.len(), "Mail sent");
        Ok(())
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, NotifyError> {
    address
        .parse::<Mailbox>()
        .map_err(|e| NotifyError::InvalidConfig(format!("invalid mail address '{}': {}", address, e)))
}

// Falls back to localhost when the hostname is not a valid mail domain.
fn default_sender(app_name: &str) -> Result<Mailbox, NotifyError> {
    parse_mailbox(&format!("{}@{}", app_name, local_hostname()))
        .or_else(|_| parse_mailbox(&format!("{}@localhost", app_name)))
}

fn local_hostname() -> String {
    let name = gethostname::gethostname();
    let name = name.to_string_lossy();
    let name = name.trim();
    if name.is_empty() {
        "localhost".to_string()
    } else {
        name.to_string()
    }
}
