//! Email service for activation codes and order confirmations.
//!
//! Uses SMTP via lettre for delivery. Messages are plain text.

use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::header::ContentType,
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;

use crate::config::SmtpConfig;

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),
}

/// Email service for sending transactional emails.
#[derive(Clone)]
pub struct EmailService {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl EmailService {
    /// Create a new email service from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the SMTP relay cannot be configured.
    pub fn new(config: &SmtpConfig) -> Result<Self, SmtpError> {
        let credentials = Credentials::new(
            config.username.clone(),
            config.password.expose_secret().to_string(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
            .port(config.port)
            .credentials(credentials)
            .build();

        Ok(Self {
            mailer,
            from_address: config.from_address.clone(),
        })
    }

    /// Send the activation code for a pending registration.
    ///
    /// # Errors
    ///
    /// Returns error if the email fails to send.
    pub async fn send_activation_code(
        &self,
        to: &str,
        name: &str,
        code: &str,
    ) -> Result<(), EmailError> {
        let body = format!(
            "Hello {name},\n\n\
             Your Learnly activation code is: {code}\n\n\
             The code expires in 5 minutes. If you did not create a Learnly \
             account, you can ignore this email.\n\n\
             The Learnly Team\n"
        );

        self.send_plain_email(to, "Activate your Learnly account", &body)
            .await
    }

    /// Send an order confirmation after a successful purchase.
    ///
    /// # Errors
    ///
    /// Returns error if the email fails to send.
    pub async fn send_order_confirmation(
        &self,
        to: &str,
        name: &str,
        course_name: &str,
    ) -> Result<(), EmailError> {
        let body = format!(
            "Hello {name},\n\n\
             Thank you for your purchase! You now have full access to:\n\n\
             \x20   {course_name}\n\n\
             The course is available from your Learnly dashboard.\n\n\
             The Learnly Team\n"
        );

        self.send_plain_email(to, "Your Learnly order confirmation", &body)
            .await
    }

    /// Send a plain text email.
    async fn send_plain_email(&self, to: &str, subject: &str, body: &str) -> Result<(), EmailError> {
        let email = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| EmailError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(to
                .parse()
                .map_err(|_| EmailError::InvalidAddress(to.to_string()))?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())?;

        self.mailer.send(email).await?;

        tracing::info!(to = %to, subject = %subject, "Email sent successfully");
        Ok(())
    }
}
