//! Outbound notification mail. Failures are reported as a boolean and
//! logged by the transport; callers treat delivery as best-effort and never
//! surface a mail failure as an operation failure.

use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::MailConfig;

/// Typed notification bodies. Each variant carries exactly the context its
/// rendering needs, instead of a loose bag of template variables.
#[derive(Debug, Clone)]
pub enum MailTemplate {
    StatusUpdate {
        username: String,
        document_name: String,
        new_status: String,
        admin_message: String,
    },
    Welcome {
        username: String,
    },
    LoginAlert {
        username: String,
    },
    LogoutAlert {
        username: String,
    },
}

impl MailTemplate {
    #[must_use]
    pub fn subject(&self) -> String {
        match self {
            Self::StatusUpdate { new_status, .. } => {
                format!("Document Status Update: {new_status}")
            }
            Self::Welcome { .. } => "Welcome to DocBay".to_string(),
            Self::LoginAlert { .. } => "Login Alert - DocBay".to_string(),
            Self::LogoutAlert { .. } => "Logout Notification - DocBay".to_string(),
        }
    }

    #[must_use]
    pub fn body(&self) -> String {
        match self {
            Self::StatusUpdate {
                username,
                document_name,
                new_status,
                admin_message,
            } => format!(
                "Hello {username},\n\n\
                 The status of your document \"{document_name}\" has changed to: {new_status}.\n\n\
                 Message from the review team:\n{admin_message}\n\n\
                 You can check your submissions on your dashboard.\n"
            ),
            Self::Welcome { username } => format!(
                "Hello {username},\n\n\
                 Your account has been created. You can now log in and submit documents\n\
                 for review.\n"
            ),
            Self::LoginAlert { username } => format!(
                "Hello {username},\n\n\
                 A new login to your account was just recorded. If this was not you,\n\
                 please change your password.\n"
            ),
            Self::LogoutAlert { username } => {
                format!("Hello {username},\n\nYou have been logged out of your account.\n")
            }
        }
    }
}

/// Mail transport boundary. Returns whether delivery was handed off
/// successfully; failures are logged, never propagated.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, recipients: &[String], template: &MailTemplate) -> bool;
}

/// SMTP-backed transport.
#[derive(Clone)]
pub struct SmtpMailer {
    mailer: Arc<AsyncSmtpTransport<Tokio1Executor>>,
    from: String,
}

impl SmtpMailer {
    /// Create an SMTP mailer from config. Returns `None` when mail is
    /// disabled or the relay cannot be constructed.
    #[must_use]
    pub fn from_config(config: &MailConfig) -> Option<Self> {
        if !config.enabled {
            debug!("Mail notifications disabled");
            return None;
        }

        let builder = if config.use_starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host).ok()?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_host)
        };

        let mut builder = builder.port(config.smtp_port);
        if !config.username.is_empty() {
            builder = builder.credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ));
        }

        info!(
            host = %config.smtp_host,
            port = config.smtp_port,
            starttls = config.use_starttls,
            "Mail transport initialized"
        );

        Some(Self {
            mailer: Arc::new(builder.build()),
            from: config.from_address.clone(),
        })
    }

    fn build_message(&self, recipients: &[String], template: &MailTemplate) -> Option<Message> {
        let from_addr: Mailbox = match self.from.parse() {
            Ok(mb) => mb,
            Err(e) => {
                warn!("Invalid mail from address '{}': {e}", self.from);
                return None;
            }
        };

        let to_addrs: Vec<Mailbox> = recipients.iter().filter_map(|s| s.parse().ok()).collect();
        if to_addrs.is_empty() {
            warn!("No valid recipient addresses for '{}'", template.subject());
            return None;
        }

        let mut builder = Message::builder().from(from_addr).subject(template.subject());
        for mb in to_addrs {
            builder = builder.to(mb);
        }

        match builder
            .header(ContentType::TEXT_PLAIN)
            .body(template.body())
        {
            Ok(message) => Some(message),
            Err(e) => {
                warn!("Failed to build mail message: {e}");
                None
            }
        }
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, recipients: &[String], template: &MailTemplate) -> bool {
        if recipients.is_empty() {
            warn!(
                "Attempted to send '{}' with no recipients",
                template.subject()
            );
            return false;
        }

        let Some(message) = self.build_message(recipients, template) else {
            return false;
        };

        match self.mailer.send(message).await {
            Ok(_) => {
                info!(
                    subject = %template.subject(),
                    recipients = recipients.len(),
                    "Notification email sent"
                );
                true
            }
            Err(e) => {
                warn!(
                    subject = %template.subject(),
                    "Failed to send notification email: {e}"
                );
                false
            }
        }
    }
}

/// Stand-in used when mail is disabled; pretends every send succeeded.
pub struct NoopMailer;

#[async_trait]
impl Mailer for NoopMailer {
    async fn send(&self, recipients: &[String], template: &MailTemplate) -> bool {
        debug!(
            subject = %template.subject(),
            recipients = recipients.len(),
            "Mail disabled, dropping notification"
        );
        true
    }
}
