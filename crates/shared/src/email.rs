//! Email service for sending transactional emails.
//!
//! Uses `lettre` for SMTP transport.

use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor, message::header::ContentType,
    transport::smtp::authentication::Credentials,
};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::config::EmailConfig;

/// Email service errors.
#[derive(Debug, Error)]
pub enum EmailError {
    /// Failed to build email message.
    #[error("Failed to build email: {0}")]
    BuildError(String),
    /// Failed to send email.
    #[error("Failed to send email: {0}")]
    SendError(String),
    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),
}

/// Order details rendered into notification emails.
#[derive(Debug, Clone)]
pub struct OrderEmail {
    /// Recipient address.
    pub to_email: String,
    /// Recipient display name.
    pub to_name: String,
    /// Human-readable order number.
    pub order_number: String,
    /// Current order status.
    pub status: String,
    /// Item lines as `(name, quantity, unit price)`.
    pub lines: Vec<(String, i32, Decimal)>,
    /// Items subtotal.
    pub subtotal: Decimal,
    /// Delivery fee.
    pub delivery_fee: Decimal,
    /// Order total.
    pub total: Decimal,
    /// Loyalty points credited.
    pub points_earned: i32,
}

/// Email service for sending transactional emails.
#[derive(Clone)]
pub struct EmailService {
    config: EmailConfig,
}

impl EmailService {
    /// Creates a new email service.
    #[must_use]
    pub const fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    /// Creates an SMTP transport.
    fn create_transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>, EmailError> {
        let builder = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&self.config.smtp_host)
            .port(self.config.smtp_port);

        let builder = if self.config.smtp_username.is_empty() {
            builder
        } else {
            builder.credentials(Credentials::new(
                self.config.smtp_username.clone(),
                self.config.smtp_password.clone(),
            ))
        };

        Ok(builder.build())
    }

    /// Sends a password reset link.
    ///
    /// # Errors
    ///
    /// Returns an error if the email cannot be sent.
    pub async fn send_password_reset(
        &self,
        to_email: &str,
        to_name: &str,
        frontend_url: &str,
        token: &str,
    ) -> Result<(), EmailError> {
        let reset_url = password_reset_link(frontend_url, token);
        let body = format!(
            r"Hi {to_name},

We received a request to reset your password. Use the link below to choose a new one:

{reset_url}

This link expires in one hour. If you didn't ask for a reset, you can ignore this email.

The Grocer Team"
        );

        self.send_email(to_email, "Reset your password", &body).await
    }

    /// Sends the order confirmation after checkout.
    ///
    /// # Errors
    ///
    /// Returns an error if the email cannot be sent.
    pub async fn send_order_confirmation(&self, order: &OrderEmail) -> Result<(), EmailError> {
        let subject = format!("Order {} confirmed", order.order_number);
        self.send_email(&order.to_email, &subject, &render_confirmation(order))
            .await
    }

    /// Sends a status change notification.
    ///
    /// # Errors
    ///
    /// Returns an error if the email cannot be sent.
    pub async fn send_order_status_update(&self, order: &OrderEmail) -> Result<(), EmailError> {
        let subject = format!("Order {} is now {}", order.order_number, order.status);
        let body = format!(
            "Hi {},\n\nYour order {} is now {}.\n\nThe Grocer Team",
            order.to_name,
            order.order_number,
            order.status.replace('_', " ")
        );
        self.send_email(&order.to_email, &subject, &body).await
    }

    /// Sends a generic email.
    ///
    /// # Errors
    ///
    /// Returns an error if the email cannot be sent.
    pub async fn send_email(
        &self,
        to_email: &str,
        subject: &str,
        body: &str,
    ) -> Result<(), EmailError> {
        let from = format!("{} <{}>", self.config.from_name, self.config.from_email);

        let email = Message::builder()
            .from(
                from.parse()
                    .map_err(|e| EmailError::InvalidAddress(format!("{e}")))?,
            )
            .to(to_email
                .parse()
                .map_err(|e| EmailError::InvalidAddress(format!("{e}")))?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| EmailError::BuildError(e.to_string()))?;

        let transport = self.create_transport()?;
        transport
            .send(email)
            .await
            .map_err(|e| EmailError::SendError(e.to_string()))?;

        Ok(())
    }
}

fn password_reset_link(frontend_url: &str, token: &str) -> String {
    format!(
        "{}/reset-password?token={token}",
        frontend_url.trim_end_matches('/')
    )
}

fn render_confirmation(order: &OrderEmail) -> String {
    let mut body = format!(
        "Hi {},\n\nThanks for your order {}.\n\n",
        order.to_name, order.order_number
    );
    for (name, quantity, price) in &order.lines {
        body.push_str(&format!("  {quantity} x {name} @ {price}\n"));
    }
    body.push_str(&format!(
        "\nSubtotal: {}\nDelivery: {}\nTotal: {}\n\nYou earned {} loyalty points.\n\nThe Grocer Team",
        order.subtotal, order.delivery_fee, order.total, order.points_earned
    ));
    body
}
