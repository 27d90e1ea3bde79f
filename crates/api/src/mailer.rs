use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use notehub_core::notify::{Notifier, NotifyError, ShareNotice};
use notehub_core::permission::AccessLevel;

use crate::config::SmtpConfig;

/// Share and welcome emails over SMTP.
pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    frontend_url: String,
}

impl SmtpNotifier {
    pub fn new(config: &SmtpConfig, frontend_url: &str) -> Result<Self, NotifyError> {
        let from = config
            .from
            .parse()
            .map_err(|e| NotifyError::NotConfigured(format!("invalid MAIL_FROM: {e}")))?;

        let transport = match (&config.user, &config.password) {
            (Some(user), Some(password)) => {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
                    .map_err(|e| NotifyError::NotConfigured(format!("SMTP relay error: {e}")))?
                    .credentials(Credentials::new(user.clone(), password.clone()))
                    .port(config.port)
                    .build()
            }
            // Local development servers without authentication.
            _ => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
                .port(config.port)
                .build(),
        };

        Ok(Self {
            transport,
            from,
            frontend_url: frontend_url.trim_end_matches('/').to_string(),
        })
    }

    async fn send(&self, to: &str, subject: String, body: String) -> Result<(), NotifyError> {
        let to: Mailbox = to
            .parse()
            .map_err(|e| NotifyError::Message(format!("invalid recipient address: {e}")))?;
        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body)
            .map_err(|e| NotifyError::Message(e.to_string()))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| NotifyError::Delivery(e.to_string()))?;
        Ok(())
    }
}

fn level_summary(level: AccessLevel) -> &'static str {
    match level {
        AccessLevel::Read => "You can view this note.",
        AccessLevel::Write => "You can view and edit this note.",
        AccessLevel::Admin => "You can view, edit and share this note with others.",
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn notify_share(&self, notice: &ShareNotice) -> Result<(), NotifyError> {
        let subject = format!("{} shared \"{}\" with you", notice.sender_name, notice.document_title);
        let body = format!(
            "{sender} shared the note \"{title}\" with you.\n\n{summary}\n\nOpen it: {url}/notes/{id}\n\n\
             If you do not have an account yet, sign up with this email address and the note \
             will be waiting for you.\n",
            sender = notice.sender_name,
            title = notice.document_title,
            summary = level_summary(notice.level),
            url = self.frontend_url,
            id = notice.document_id,
        );
        self.send(&notice.recipient_email, subject, body).await?;
        tracing::info!(document_id = %notice.document_id, "share email sent");
        Ok(())
    }

    async fn notify_welcome(&self, email: &str, name: &str) -> Result<(), NotifyError> {
        let body = format!(
            "Hi {name},\n\nWelcome to NoteHub. Notes others have shared with this address are \
             already in your list.\n\nGet started: {url}\n",
            url = self.frontend_url,
        );
        self.send(email, "Welcome to NoteHub".to_string(), body).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(from: &str) -> SmtpConfig {
        SmtpConfig {
            host: "localhost".to_string(),
            port: 2525,
            user: None,
            password: None,
            from: from.to_string(),
        }
    }

    #[test]
    fn rejects_malformed_sender() {
        assert!(matches!(
            SmtpNotifier::new(&config("not an address"), "http://localhost:3000"),
            Err(NotifyError::NotConfigured(_))
        ));
    }

    #[tokio::test]
    async fn builds_unauthenticated_transport() {
        let notifier =
            SmtpNotifier::new(&config("NoteHub <noreply@notehub.local>"), "http://app/").unwrap();
        assert_eq!(notifier.frontend_url, "http://app");
    }

    #[test]
    fn level_summaries_differ() {
        assert_ne!(
            level_summary(AccessLevel::Read),
            level_summary(AccessLevel::Write)
        );
    }
}
