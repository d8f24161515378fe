//! Outgoing account notifications
//!
//! Delivery is best-effort everywhere: a failed send is logged and reported
//! as `false`, never as an error, so callers commit their state change first
//! and notify afterwards. A mailer built with [`AccountMailer::in_background`]
//! hands each message to a spawned task and returns immediately.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use std::sync::Arc;

use crate::config::EmailConfig;
use crate::models::User;

/// Email-send capability
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send one message to every address in `to`. Returns whether it was accepted.
    async fn send(&self, from: &str, to: &[String], subject: &str, body: &str) -> bool;
}

/// SMTP delivery over an implicit-TLS relay
pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpNotifier {
    pub fn new(config: &EmailConfig) -> Result<Self> {
        if config.smtp_host.is_empty() {
            return Err(anyhow!("SMTP host not configured"));
        }

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
            .map_err(|e| anyhow!("Failed to create SMTP transport: {}", e))?
            .port(config.smtp_port);

        if !config.smtp_username.is_empty() {
            builder = builder.credentials(Credentials::new(
                config.smtp_username.clone(),
                config.smtp_password.clone(),
            ));
        }

        Ok(Self {
            transport: builder.build(),
        })
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send(&self, from: &str, to: &[String], subject: &str, body: &str) -> bool {
        let message = match build_message(from, to, subject, body) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!("Failed to build email '{}': {}", subject, e);
                return false;
            }
        };

        match self.transport.send(message).await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!("Failed to send email '{}': {}", subject, e);
                false
            }
        }
    }
}

fn build_message(from: &str, to: &[String], subject: &str, body: &str) -> Result<Message> {
    if to.is_empty() {
        return Err(anyhow!("No recipients"));
    }

    let from: Mailbox = from
        .parse()
        .map_err(|e| anyhow!("Invalid from address: {}", e))?;
    let mut builder = Message::builder()
        .from(from)
        .subject(subject)
        .header(ContentType::TEXT_PLAIN);

    for address in to {
        let mailbox: Mailbox = address
            .parse()
            .map_err(|e| anyhow!("Invalid to address '{}': {}", address, e))?;
        builder = builder.to(mailbox);
    }

    builder
        .body(body.to_string())
        .map_err(|e| anyhow!("Failed to build email: {}", e))
}

/// Writes messages to the log instead of sending them. Used when email is disabled.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, from: &str, to: &[String], subject: &str, body: &str) -> bool {
        tracing::info!(from, to = ?to, subject, "Email delivery disabled, message: {}", body);
        true
    }
}

/// Build the notifier the configuration asks for
pub fn notifier_from_config(config: &EmailConfig) -> Result<Arc<dyn Notifier>> {
    if config.enabled {
        Ok(Arc::new(SmtpNotifier::new(config)?))
    } else {
        Ok(Arc::new(LogNotifier))
    }
}

/// Sends notifications to an account from the configured sender address.
#[derive(Clone)]
pub struct AccountMailer {
    notifier: Arc<dyn Notifier>,
    from_address: String,
    background: bool,
}

impl AccountMailer {
    pub fn new(notifier: Arc<dyn Notifier>, from_address: impl Into<String>) -> Self {
        Self {
            notifier,
            from_address: from_address.into(),
            background: false,
        }
    }

    /// Deliver from a spawned task instead of inside the caller's request.
    pub fn in_background(mut self) -> Self {
        self.background = true;
        self
    }

    pub async fn notify(&self, user: &User, subject: &str, body: &str) {
        self.notify_with(user, &[], subject, body).await
    }

    /// Notify the account's address plus `additional` recipients.
    pub async fn notify_with(&self, user: &User, additional: &[String], subject: &str, body: &str) {
        let mut recipients = Vec::with_capacity(1 + additional.len());
        recipients.push(user.email.clone());
        recipients.extend(additional.iter().cloned());

        let delivery = Delivery {
            notifier: self.notifier.clone(),
            from: self.from_address.clone(),
            to: recipients,
            user_id: user.id,
            subject: subject.to_string(),
            body: body.to_string(),
        };

        if self.background {
            tokio::spawn(delivery.run());
        } else {
            delivery.run().await;
        }
    }
}

/// One owned message, so it can outlive the request that produced it.
struct Delivery {
    notifier: Arc<dyn Notifier>,
    from: String,
    to: Vec<String>,
    user_id: i64,
    subject: String,
    body: String,
}

impl Delivery {
    async fn run(self) -> bool {
        let delivered = self
            .notifier
            .send(&self.from, &self.to, &self.subject, &self.body)
            .await;
        if !delivered {
            tracing::warn!(
                user_id = self.user_id,
                subject = %self.subject,
                "Account notification was not delivered"
            );
        }
        delivered
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct SentMessage {
        pub from: String,
        pub to: Vec<String>,
        pub subject: String,
        pub body: String,
    }

    /// Records every message; can be switched to fail every send.
    #[derive(Default)]
    pub struct RecordingNotifier {
        sent: Mutex<Vec<SentMessage>>,
        failing: AtomicBool,
    }

    impl RecordingNotifier {
        pub fn failing() -> Self {
            let notifier = Self::default();
            notifier.set_failing(true);
            notifier
        }

        pub fn set_failing(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }

        pub fn sent(&self) -> Vec<SentMessage> {
            self.sent.lock().unwrap().clone()
        }

        pub fn subjects(&self) -> Vec<String> {
            self.sent().into_iter().map(|m| m.subject).collect()
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send(&self, from: &str, to: &[String], subject: &str, body: &str) -> bool {
            if self.failing.load(Ordering::SeqCst) {
                return false;
            }
            self.sent.lock().unwrap().push(SentMessage {
                from: from.to_string(),
                to: to.to_vec(),
                subject: subject.to_string(),
                body: body.to_string(),
            });
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::RecordingNotifier;
    use super::*;

    fn user() -> User {
        User::new(
            "bob".into(),
            "bobnick".into(),
            "bob@example.com".into(),
            "hash".into(),
        )
    }

    #[tokio::test]
    async fn test_mailer_addresses_account_and_extras() {
        let notifier = Arc::new(RecordingNotifier::default());
        let mailer = AccountMailer::new(notifier.clone(), "blog@example.com");

        mailer
            .notify_with(&user(), &["old@example.com".to_string()], "Change email.", "body")
            .await;

        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].from, "blog@example.com");
        assert_eq!(sent[0].to, vec!["bob@example.com", "old@example.com"]);
    }

    #[tokio::test]
    async fn test_mailer_swallows_failure() {
        let notifier = Arc::new(RecordingNotifier::failing());
        let mailer = AccountMailer::new(notifier.clone(), "blog@example.com");

        mailer.notify(&user(), "Unban", "body").await;

        assert!(notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn test_delivery_reports_outcome() {
        let delivery = |notifier: Arc<RecordingNotifier>| Delivery {
            notifier,
            from: "blog@example.com".to_string(),
            to: vec!["bob@example.com".to_string()],
            user_id: 1,
            subject: "Unban".to_string(),
            body: "body".to_string(),
        };

        assert!(delivery(Arc::new(RecordingNotifier::default())).run().await);
        assert!(!delivery(Arc::new(RecordingNotifier::failing())).run().await);
    }

    #[tokio::test]
    async fn test_background_mailer_does_not_wait_for_delivery() {
        let notifier = Arc::new(GatedNotifier::default());
        let mailer =
            AccountMailer::new(notifier.clone(), "blog@example.com").in_background();

        tokio::time::timeout(
            std::time::Duration::from_secs(1),
            mailer.notify(&user(), "Unban", "body"),
        )
        .await
        .expect("notify waited for the relay");

        notifier.gate.notify_one();
        tokio::time::timeout(std::time::Duration::from_secs(1), notifier.done.notified())
            .await
            .expect("message was never delivered");
    }

    /// Holds every send until the test opens the gate.
    #[derive(Default)]
    struct GatedNotifier {
        gate: tokio::sync::Notify,
        done: tokio::sync::Notify,
    }

    #[async_trait]
    impl Notifier for GatedNotifier {
        async fn send(&self, _from: &str, _to: &[String], _subject: &str, _body: &str) -> bool {
            self.gate.notified().await;
            self.done.notify_one();
            true
        }
    }

    #[tokio::test]
    async fn test_log_notifier_accepts_everything() {
        assert!(LogNotifier.send("a@b.c", &[], "s", "b").await);
    }

    #[test]
    fn test_build_message_validates_addresses() {
        assert!(build_message("blog@example.com", &["x@example.com".into()], "s", "b").is_ok());
        assert!(build_message("not an address", &["x@example.com".into()], "s", "b").is_err());
        assert!(build_message("blog@example.com", &["bad".into()], "s", "b").is_err());
        assert!(build_message("blog@example.com", &[], "s", "b").is_err());
    }

    #[test]
    fn test_notifier_from_config() {
        let disabled = EmailConfig::default();
        assert!(notifier_from_config(&disabled).is_ok());

        let broken = EmailConfig {
            enabled: true,
            smtp_host: String::new(),
            ..EmailConfig::default()
        };
        assert!(notifier_from_config(&broken).is_err());
    }
}
