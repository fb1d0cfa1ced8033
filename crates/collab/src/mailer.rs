//! Invitation and acceptance notification emails via SMTP.
//!
//! [`Mailer`] wraps the `lettre` async SMTP transport. The core invokes it
//! fire-and-forget after a collaboration or invitation mutation; the
//! result feeds a user-facing confirmation message and is never used for
//! rollback. Configuration is loaded from environment variables; if
//! `SMTP_HOST` is not set, [`MailerConfig::from_env`] returns `None` and
//! no mailer should be constructed.

use packshare_db::models::invitation::Invitation;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for email delivery failures.
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    /// SMTP transport-level failure (authentication, connection, etc.).
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    /// The recipient or sender address could not be parsed.
    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// The MIME message could not be assembled.
    #[error("Email build error: {0}")]
    Build(String),
}

// ---------------------------------------------------------------------------
// MailerConfig
// ---------------------------------------------------------------------------

/// Default SMTP port (STARTTLS).
const DEFAULT_SMTP_PORT: u16 = 587;

/// Default sender address when `SMTP_FROM` is not set.
const DEFAULT_FROM_ADDRESS: &str = "noreply@packshare.local";

/// Configuration for the SMTP notification mailer.
#[derive(Debug, Clone)]
pub struct MailerConfig {
    /// SMTP server hostname.
    pub smtp_host: String,
    /// SMTP server port (defaults to 587).
    pub smtp_port: u16,
    /// RFC 5322 "From" address.
    pub from_address: String,
    /// Optional SMTP username.
    pub smtp_user: Option<String>,
    /// Optional SMTP password.
    pub smtp_password: Option<String>,
}

impl MailerConfig {
    /// Load configuration from environment variables.
    ///
    /// Returns `None` if `SMTP_HOST` is not set, signalling that email
    /// notification is not configured and should be skipped.
    ///
    /// | Variable        | Required | Default                    |
    /// |-----------------|----------|----------------------------|
    /// | `SMTP_HOST`     | yes      | —                          |
    /// | `SMTP_PORT`     | no       | `587`                      |
    /// | `SMTP_FROM`     | no       | `noreply@packshare.local`  |
    /// | `SMTP_USER`     | no       | —                          |
    /// | `SMTP_PASSWORD` | no       | —                          |
    pub fn from_env() -> Option<Self> {
        let smtp_host = std::env::var("SMTP_HOST").ok()?;
        Some(Self {
            smtp_host,
            smtp_port: std::env::var("SMTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_SMTP_PORT),
            from_address: std::env::var("SMTP_FROM")
                .unwrap_or_else(|_| DEFAULT_FROM_ADDRESS.to_string()),
            smtp_user: std::env::var("SMTP_USER").ok(),
            smtp_password: std::env::var("SMTP_PASSWORD").ok(),
        })
    }
}

// ---------------------------------------------------------------------------
// Mailer
// ---------------------------------------------------------------------------

/// Sends collaboration notification emails via SMTP.
pub struct Mailer {
    config: MailerConfig,
}

impl Mailer {
    /// Create a new mailer with the given configuration.
    pub fn new(config: MailerConfig) -> Self {
        Self { config }
    }

    /// Notify the invitee that an invitation was created for them.
    ///
    /// Returns `true` on successful delivery. Failures are logged and
    /// reported through the return value only.
    pub async fn send_invitation(&self, invitation: &Invitation, package_name: &str) -> bool {
        let subject = format!(
            "{} invites you to work on '{package_name}'",
            invitation.inviter_name
        );
        let body = format!(
            "Hello {},\n\n\
             {} ({}) invites you to collaborate on the package '{package_name}'.\n\
             Your invitation code is: {}\n\n\
             Enter the code on the collaboration page to accept.\n",
            invitation.invitee_name,
            invitation.inviter_name,
            invitation.inviter_email,
            invitation.invitation_code.trim(),
        );
        self.deliver(&invitation.invitee_email, &subject, &body).await
    }

    /// Notify the inviter that their invitation was accepted.
    pub async fn send_acceptance(
        &self,
        invitation: &Invitation,
        acceptor_login: &str,
        package_name: &str,
    ) -> bool {
        let subject = format!("{acceptor_login} now collaborates on '{package_name}'");
        let body = format!(
            "Hello {},\n\n\
             {acceptor_login} accepted your invitation and can now open the \
             package '{package_name}'.\n",
            invitation.inviter_name,
        );
        self.deliver(&invitation.inviter_email, &subject, &body).await
    }

    async fn deliver(&self, to_email: &str, subject: &str, body: &str) -> bool {
        match self.send(to_email, subject, body).await {
            Ok(()) => {
                tracing::info!(to = to_email, subject, "notification email sent");
                true
            }
            Err(err) => {
                tracing::warn!(to = to_email, error = %err, "notification email failed");
                false
            }
        }
    }

    async fn send(&self, to_email: &str, subject: &str, body: &str) -> Result<(), MailError> {
        use lettre::{
            message::header::ContentType, transport::smtp::authentication::Credentials,
            AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
        };

        let email = Message::builder()
            .from(self.config.from_address.parse()?)
            .to(to_email.parse()?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| MailError::Build(e.to_string()))?;

        let mut transport_builder =
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.smtp_host)?
                .port(self.config.smtp_port);

        if let (Some(user), Some(pass)) = (&self.config.smtp_user, &self.config.smtp_password) {
            transport_builder =
                transport_builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        let mailer = transport_builder.build();
        mailer.send(email).await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_env_returns_none_without_smtp_host() {
        std::env::remove_var("SMTP_HOST");
        assert!(MailerConfig::from_env().is_none());
    }

    #[test]
    fn mail_error_display_build() {
        let err = MailError::Build("missing body".to_string());
        assert_eq!(err.to_string(), "Email build error: missing body");
    }

    #[test]
    fn mail_error_display_address() {
        let addr_err: Result<lettre::Address, _> = "not-an-email".parse();
        let err = MailError::Address(addr_err.unwrap_err());
        assert!(err.to_string().contains("Email address parse error"));
    }
}
