//! Outcome notifications for ReelMiner runs.
//!
//! - [`SmtpNotifier`] sends a plain-text email over implicit-TLS SMTP
//! - [`LogNotifier`] only logs, for runs without email settings
//! - [`ConfiguredNotifier`] picks one of the two from [`EmailSettings`]
//!
//! Every [`Notifier`] swallows delivery failures after logging them.

use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{info, instrument, warn};

use reelminer_shared::{EmailSettings, Notifier, ReelMinerError, Result};

// ---------------------------------------------------------------------------
// SMTP
// ---------------------------------------------------------------------------

/// Email notifier. The SMTP user is also the sender address.
pub struct SmtpNotifier {
    from: Mailbox,
    to: Mailbox,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpNotifier {
    pub fn new(settings: &EmailSettings) -> Result<Self> {
        let from = parse_mailbox(&settings.user)?;
        let to = parse_mailbox(&settings.recipient)?;
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.smtp_host)
            .map_err(|e| {
                ReelMinerError::config(format!("invalid SMTP host '{}': {e}", settings.smtp_host))
            })?
            .port(settings.smtp_port)
            .credentials(Credentials::new(
                settings.user.clone(),
                settings.password.clone(),
            ))
            .build();

        Ok(Self { from, to, transport })
    }

    /// Build the message without sending it.
    pub fn message(&self, subject: &str, body: &str) -> Result<Message> {
        build_message(&self.from, &self.to, subject, body)
    }

    /// Send one email, surfacing any failure.
    pub async fn send(&self, subject: &str, body: &str) -> Result<()> {
        let message = self.message(subject, body)?;
        self.transport
            .send(message)
            .await
            .map_err(|e| ReelMinerError::Notify(format!("SMTP delivery failed: {e}")))?;
        Ok(())
    }
}

impl Notifier for SmtpNotifier {
    #[instrument(skip_all, fields(subject = %subject))]
    async fn notify(&self, subject: &str, body: &str) {
        match self.send(subject, body).await {
            Ok(()) => info!(to = %self.to, "notification sent"),
            Err(e) => warn!(error = %e, "notification not delivered"),
        }
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox> {
    address
        .parse()
        .map_err(|e| ReelMinerError::config(format!("invalid email address '{address}': {e}")))
}

fn build_message(from: &Mailbox, to: &Mailbox, subject: &str, body: &str) -> Result<Message> {
    Message::builder()
        .from(from.clone())
        .to(to.clone())
        .subject(subject)
        .header(ContentType::TEXT_PLAIN)
        .body(body.to_string())
        .map_err(|e| ReelMinerError::Notify(format!("failed to build message: {e}")))
}

// ---------------------------------------------------------------------------
// Log only
// ---------------------------------------------------------------------------

/// Writes notifications to the log instead of sending them.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    async fn notify(&self, subject: &str, body: &str) {
        info!(%subject, %body, "notification (email not configured)");
    }
}

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

/// The notifier a run actually uses.
pub enum ConfiguredNotifier {
    Smtp(SmtpNotifier),
    Log(LogNotifier),
}

impl ConfiguredNotifier {
    /// SMTP when settings are present, log-only otherwise.
    pub fn from_settings(settings: Option<&EmailSettings>) -> Result<Self> {
        match settings {
            Some(settings) => Ok(Self::Smtp(SmtpNotifier::new(settings)?)),
            None => Ok(Self::Log(LogNotifier)),
        }
    }

    pub fn is_email(&self) -> bool {
        matches!(self, Self::Smtp(_))
    }
}

impl Notifier for ConfiguredNotifier {
    async fn notify(&self, subject: &str, body: &str) {
        match self {
            Self::Smtp(smtp) => smtp.notify(subject, body).await,
            Self::Log(log) => log.notify(subject, body).await,
        }
    }
}
