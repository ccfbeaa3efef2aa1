//! Growl notifications over the legacy UDP network protocol.
//!
//! Packets may be sent to a single host or to a LAN broadcast/multicast
//! address. Every packet ends with a SHA-256 checksum over the packet bytes
//! followed by the password.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::net::UdpSocket;
use tokio::sync::OnceCell;
use tracing::debug;

use super::{Notifier, NotifyContext, NotifyError};
use crate::checker::ProbeOutcome;
use crate::monitor::event::lifecycle_subjects;

pub const GROWL_UDP_PORT: u16 = 9887;

const PROTOCOL_VERSION: u8 = 1;
const TYPE_REGISTRATION_SHA256: u8 = 2;
const TYPE_NOTIFICATION_SHA256: u8 = 3;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrowlConfig {
    pub host: String,

    #[serde(default = "default_growl_port")]
    pub port: u16,

    #[serde(default)]
    pub password: String,

    /// -2 (very low) to 2 (emergency).
    #[serde(default = "default_growl_priority")]
    pub priority: i8,

    #[serde(default = "default_sticky")]
    pub sticky: bool,
}

fn default_growl_port() -> u16 {
    GROWL_UDP_PORT
}

fn default_growl_priority() -> i8 {
    1
}

fn default_sticky() -> bool {
    true
}

impl GrowlConfig {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: default_growl_port(),
            password: String::new(),
            priority: default_growl_priority(),
            sticky: default_sticky(),
        }
    }
}

pub struct GrowlNotifier {
    app_name: String,
    config: GrowlConfig,
    notifications: Vec<String>,
    registered: OnceCell<()>,
}

impl GrowlNotifier {
    pub fn new(config: GrowlConfig, app_name: &str) -> Result<Self, NotifyError> {
        if config.host.trim().is_empty() {
            return Err(NotifyError::InvalidConfig("growl host is empty".into()));
        }
        if !(-2..=2).contains(&config.priority) {
            return Err(NotifyError::InvalidConfig(format!(
                "growl priority {} is outside -2..=2",
                config.priority
            )));
        }

        let notifications = ProbeOutcome::failure_labels()
            .into_iter()
            .chain(lifecycle_subjects())
            .map(str::to_string)
            .collect();

        Ok(Self {
            app_name: app_name.to_string(),
            config,
            notifications,
            registered: OnceCell::new(),
        })
    }

    async fn send(&self, packet: &[u8]) -> Result<(), NotifyError> {
        let socket = UdpSocket::bind("0.0.0.0:0")
            .await
            .map_err(|e| NotifyError::Delivery(format!("growl socket: {}", e)))?;
        socket
            .set_broadcast(true)
            .map_err(|e| NotifyError::Delivery(format!("growl socket: {}", e)))?;
        socket
            .send_to(packet, (self.config.host.as_str(), self.config.port))
            .await
            .map_err(|e| {
                NotifyError::Delivery(format!(
                    "growl send to {}:{}: {}",
                    self.config.host, self.config.port, e
                ))
            })?;
        Ok(())
    }

    async fn ensure_registered(&self) -> Result<(), NotifyError> {
        self.registered
            .get_or_try_init(|| async {
                let packet =
                    registration_packet(&self.app_name, &self.notifications, &self.config.password)?;
                self.send(&packet).await?;
                debug!(host = %self.config.host, "Registered with growl");
                Ok::<(), NotifyError>(())
            })
            .await?;
        Ok(())
    }
}

#[async_trait]
impl Notifier for GrowlNotifier {
    fn name(&self) -> &str {
        "growl"
    }

    async fn notify(
        &self,
        subject: &str,
        body: &str,
        _context: Option<&NotifyContext>,
    ) -> Result<(), NotifyError> {
        self.ensure_registered().await?;

        let title = format!("{} {}", self.app_name, subject);
        let packet = notification_packet(
            &self.app_name,
            subject,
            &title,
            body,
            self.config.priority,
            self.config.sticky,
            &self.config.password,
        )?;
        self.send(&packet).await
    }
}

fn len_u16(field: &str, value: &str) -> Result<u16, NotifyError> {
    u16::try_from(value.len())
        .map_err(|_| NotifyError::Delivery(format!("growl {} exceeds 65535 bytes", field)))
}

fn append_checksum(packet: &mut Vec<u8>, password: &str) {
    let mut hasher = Sha256::new();
    hasher.update(&packet[..]);
    hasher.update(password.as_bytes());
    packet.extend_from_slice(&hasher.finalize());
}

/// Registers `notifications` for `app_name`, all of them enabled by default.
fn registration_packet(
    app_name: &str,
    notifications: &[String],
    password: &str,
) -> Result<Vec<u8>, NotifyError> {
    let count = u8::try_from(notifications.len())
        .map_err(|_| NotifyError::InvalidConfig("too many growl notifications".into()))?;

    let mut packet = vec![PROTOCOL_VERSION, TYPE_REGISTRATION_SHA256];
    packet.extend_from_slice(&len_u16("application name", app_name)?.to_be_bytes());
    packet.push(count);
    packet.push(count);
    packet.extend_from_slice(app_name.as_bytes());
    for name in notifications {
        packet.extend_from_slice(&len_u16("notification name", name)?.to_be_bytes());
        packet.extend_from_slice(name.as_bytes());
    }
    packet.extend(0..count);

    append_checksum(&mut packet, password);
    Ok(packet)
}

fn notification_flags(priority: i8, sticky: bool) -> u16 {
    let mut flags = ((i16::from(priority) & 0x7) << 1) as u16;
    if priority < 0 {
        flags |= 1 << 3;
    }
    if sticky {
        flags |= 1;
    }
    flags
}

fn notification_packet(
    app_name: &str,
    name: &str,
    title: &str,
    description: &str,
    priority: i8,
    sticky: bool,
    password: &str,
) -> Result<Vec<u8>, NotifyError> {
    let mut packet = vec![PROTOCOL_VERSION, TYPE_NOTIFICATION_SHA256];
    packet.extend_from_slice(&notification_flags(priority, sticky).to_be_bytes());
    packet.extend_from_slice(&len_u16("notification name", name)?.to_be_bytes());
    packet.extend_from_slice(&len_u16("title", title)?.to_be_bytes());
    packet.extend_from_slice(&len_u16("description", description)?.to_be_bytes());
    packet.extend_from_slice(&len_u16("application name", app_name)?.to_be_bytes());
    packet.extend_from_slice(name.as_bytes());
    packet.extend_from_slice(title.as_bytes());
    packet.extend_from_slice(description.as_bytes());
    packet.extend_from_slice(app_name.as_bytes());

    append_checksum(&mut packet, password);
    Ok(packet)
}
