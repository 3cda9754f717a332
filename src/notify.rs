//! Order notification emails
//!
//! Sending never blocks or fails an order: messages go out from a spawned
//! task and failures are only logged and counted.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info, instrument};

use crate::config::MailSettings;
use crate::error::{Error, Result};
use crate::metrics::NOTIFICATIONS_TOTAL;
use crate::model::{CartOrder, Publisher};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub text: String,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, email: &Email) -> Result<()>;
}

/// Writes messages to the log instead of sending them
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, email: &Email) -> Result<()> {
        info!(to = %email.to, subject = %email.subject, "Email (not sent, no mail endpoint)");
        Ok(())
    }
}

/// POSTs each message as JSON to a mail API
#[derive(Debug, Clone)]
pub struct HttpMailer {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    from: String,
}

#[derive(Serialize)]
struct MailRequest<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
}

impl HttpMailer {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>, from: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            api_key,
            from: from.into(),
        }
    }
}

#[async_trait]
impl Notifier for HttpMailer {
    #[instrument(skip(self, email), fields(to = %email.to))]
    async fn send(&self, email: &Email) -> Result<()> {
        let mut request = self.client.post(&self.endpoint).json(&MailRequest {
            from: &self.from,
            to: &email.to,
            subject: &email.subject,
            text: &email.text,
        });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::Notification(e.to_string()))?;
        if !response.status().is_success() {
            return Err(Error::Notification(format!(
                "Mail API returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}

/// Mailer for the configured endpoint, or the log-only fallback
pub fn from_settings(settings: &MailSettings) -> Arc<dyn Notifier> {
    match &settings.endpoint {
        Some(endpoint) => Arc::new(HttpMailer::new(
            endpoint.clone(),
            settings.api_key.clone(),
            settings.from.clone(),
        )),
        None => Arc::new(LogNotifier),
    }
}

/// The publisher's order notice and the visitor's confirmation
pub fn order_emails(order: &CartOrder, publisher: &Publisher) -> [Email; 2] {
    let books = order.books.to_string();
    [
        Email {
            to: publisher.publisher_email.clone(),
            subject: format!("New Order from {}", order.user_name),
            text: format!(
                "User Name: {}\nUser Email: {}\nBooth Number: {}\nBooks: {}",
                order.user_name, order.user_email, order.booth_number, books
            ),
        },
        Email {
            to: order.user_email.clone(),
            subject: "Order Confirmation".to_string(),
            text: format!(
                "Thank you, {}, for your order!\nYou selected books: {}\nFrom booth number: {}",
                order.user_name, books, order.booth_number
            ),
        },
    ]
}

/// Send in the background, in order
pub fn dispatch(notifier: Arc<dyn Notifier>, emails: Vec<Email>) -> JoinHandle<()> {
    tokio::spawn(async move {
        for email in emails {
            match notifier.send(&email).await {
                Ok(()) => {
                    NOTIFICATIONS_TOTAL.with_label_values(&["sent"]).inc();
                }
                Err(e) => {
                    NOTIFICATIONS_TOTAL.with_label_values(&["failed"]).inc();
                    error!(to = %email.to, subject = %email.subject, error = %e, "Failed to send email");
                }
            }
        }
    })
}
