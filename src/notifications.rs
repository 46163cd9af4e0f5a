//! Outgoing email.
//!
//! The only notification today is the welcome email sent once a new user has
//! verified their address. It is plain text, in Spanish or English.

use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use std::sync::{Arc, Mutex};
use thiserror::Error;

use crate::models::Locale;

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    #[error("failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    #[error("invalid email address: {0}")]
    InvalidAddress(String),

    #[error("notification failed (simulated)")]
    Simulated,
}

/// Rendered subject and body of a welcome email.
#[derive(Debug, Clone, PartialEq)]
pub struct WelcomeEmail {
    pub subject: String,
    pub body: String,
}

/// welcome_email
///
/// Renders the welcome message. The greeting uses whichever name parts are
/// present and drops the name entirely when both are missing.
pub fn welcome_email(first_name: Option<&str>, last_name: Option<&str>, locale: Locale, site_url: &str) -> WelcomeEmail {
    let name = [first_name, last_name]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    match locale {
        Locale::Es => {
            let greeting = if name.is_empty() { "Hola,".to_string() } else { format!("Hola {name},") };
            WelcomeEmail {
                subject: "Bienvenido a la Guardia de Honor".to_string(),
                body: format!(
                    "{greeting}\n\n\
                     Tu correo electrónico ha sido verificado y tu cuenta ya está activa.\n\
                     Puedes ingresar al panel de administración en {site_url}/admin\n\n\
                     Atentamente,\nGuardia de Honor"
                ),
            }
        }
        Locale::En => {
            let greeting = if name.is_empty() { "Hello,".to_string() } else { format!("Hello {name},") };
            WelcomeEmail {
                subject: "Welcome to the Honor Guard".to_string(),
                body: format!(
                    "{greeting}\n\n\
                     Your email address has been verified and your account is now active.\n\
                     You can sign in to the admin panel at {site_url}/admin\n\n\
                     Regards,\nHonor Guard"
                ),
            }
        }
    }
}

/// Notifier
///
/// Sends user-facing notifications. Failures are returned to the caller.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_welcome_email(
        &self,
        email: &str,
        first_name: Option<&str>,
        last_name: Option<&str>,
        locale: Locale,
    ) -> Result<(), NotificationError>;
}

pub type NotifierState = Arc<dyn Notifier>;

/// SmtpNotifier
///
/// Delivers over SMTP with STARTTLS.
#[derive(Clone)]
pub struct SmtpNotifier {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
    site_url: String,
}

impl SmtpNotifier {
    pub fn new(
        host: &str,
        port: u16,
        username: &str,
        password: &str,
        from_address: &str,
        site_url: &str,
    ) -> Result<Self, SmtpError> {
        let credentials = Credentials::new(username.to_string(), password.to_string());

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)?
            .port(port)
            .credentials(credentials)
            .build();

        Ok(Self {
            mailer,
            from_address: from_address.to_string(),
            site_url: site_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send_welcome_email(
        &self,
        email: &str,
        first_name: Option<&str>,
        last_name: Option<&str>,
        locale: Locale,
    ) -> Result<(), NotificationError> {
        let from: Mailbox = self
            .from_address
            .parse()
            .map_err(|_| NotificationError::InvalidAddress(self.from_address.clone()))?;
        let to: Mailbox = email
            .parse()
            .map_err(|_| NotificationError::InvalidAddress(email.to_string()))?;

        let content = welcome_email(first_name, last_name, locale, &self.site_url);
        let message = Message::builder()
            .from(from)
            .to(to)
            .subject(content.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(content.body)?;

        self.mailer.send(message).await?;
        Ok(())
    }
}

/// LogNotifier
///
/// Local stand-in when SMTP is not configured. Renders the email and writes it
/// to the log instead of sending it.
#[derive(Clone)]
pub struct LogNotifier {
    site_url: String,
}

impl LogNotifier {
    pub fn new(site_url: &str) -> Self {
        Self {
            site_url: site_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_welcome_email(
        &self,
        email: &str,
        first_name: Option<&str>,
        last_name: Option<&str>,
        locale: Locale,
    ) -> Result<(), NotificationError> {
        let content = welcome_email(first_name, last_name, locale, &self.site_url);
        tracing::info!(to = %email, subject = %content.subject, "Welcome email (not sent, SMTP disabled)");
        Ok(())
    }
}

/// A welcome email captured by `MockNotifier`.
#[derive(Debug, Clone, PartialEq)]
pub struct SentEmail {
    pub to: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub locale: Locale,
}

/// MockNotifier
///
/// Records sends in memory. `new_failing` rejects every send.
#[derive(Default)]
pub struct MockNotifier {
    sent: Mutex<Vec<SentEmail>>,
    pub should_fail: bool,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<SentEmail> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn send_welcome_email(
        &self,
        email: &str,
        first_name: Option<&str>,
        last_name: Option<&str>,
        locale: Locale,
    ) -> Result<(), NotificationError> {
        if self.should_fail {
            return Err(NotificationError::Simulated);
        }
        let mut sent = self.sent.lock().map_err(|_| NotificationError::Simulated)?;
        sent.push(SentEmail {
            to: email.to_string(),
            first_name: first_name.map(str::to_string),
            last_name: last_name.map(str::to_string),
            locale,
        });
        Ok(())
    }
}
