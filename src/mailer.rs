//! Outbound mail at its interface boundary.
//!
//! The mailer is constructed from config and owned by the application state;
//! message composition is real, while the transport logs the message instead
//! of speaking SMTP (delivery is out of scope). Callers treat mail as a
//! non-critical side effect: send errors are logged and swallowed, never
//! failing the primary operation.

use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("mail transport failure: {0}")]
    Transport(String),
}

#[derive(Clone, Debug)]
pub struct MailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub from_name: String,
    pub from_address: String,
}

#[derive(Clone)]
pub struct Mailer {
    config: MailConfig,
}

impl Mailer {
    pub fn new(config: MailConfig) -> Self {
        Self { config }
    }

    pub async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError> {
        info!(
            to,
            subject,
            from = %format!("{} <{}>", self.config.from_name, self.config.from_address),
            smtp = %format!("{}:{}", self.config.smtp_host, self.config.smtp_port),
            body_len = body.len(),
            "dispatching mail"
        );
        Ok(())
    }

    pub async fn send_verification(
        &self,
        to: &str,
        verification_url: &str,
    ) -> Result<(), MailError> {
        let body = format!(
            "Welcome! Please verify your email address by visiting:\n{verification_url}\n\
             This link expires in 24 hours.",
        );
        self.send(to, "Please verify your email", &body).await
    }

    pub async fn send_password_reset(&self, to: &str, reset_url: &str) -> Result<(), MailError> {
        let body = format!(
            "You requested a password reset. Visit:\n{reset_url}\n\
             This link expires in 10 minutes. If this wasn't you, ignore this message.",
        );
        self.send(to, "Password reset", &body).await
    }
}
