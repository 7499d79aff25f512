// src/dispatch.rs

use std::sync::Arc;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use once_cell::sync::Lazy;
use rand::{distributions::Alphanumeric, thread_rng, Rng};
use regex::Regex;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info};

pub const DEFAULT_SUBJECT: &str = "Relatório de Chamada Diária";
pub const DEFAULT_BODY: &str = "Segue em anexo o relatório de chamada diária.";

// Minimal shape check; the transport does the real validation on delivery.
static EMAIL_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email shape regex"));

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Invalid recipient address: {0}")]
    InvalidRecipient(String),
    #[error("No report recipients configured")]
    NoRecipients,
    #[error("Failed to build email: {0}")]
    Build(String),
    #[error("Mail transport failure: {0}")]
    Transport(String),
}

#[derive(Debug, Clone)]
pub struct DispatchConfig {
    pub smtp_server: String,
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: String,
    pub from_address: String,
    /// Fixed distribution list. Reports always go to the configured
    /// oversight addresses; callers cannot substitute their own.
    pub recipients: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DispatchReceipt {
    pub message_id: String,
    pub recipients: usize,
}

#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn deliver(&self, message: Message) -> Result<(), DispatchError>;
}

pub struct SmtpMailTransport {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailTransport {
    pub fn new(config: &DispatchConfig) -> Result<Self, DispatchError> {
        let creds = Credentials::new(config.smtp_username.clone(), config.smtp_password.clone());
        let tls_parameters = TlsParameters::new(config.smtp_server.clone())
            .map_err(|e| DispatchError::Transport(format!("TLS error: {}", e)))?;
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_server)
            .map_err(|e| DispatchError::Transport(format!("SMTP relay error: {}", e)))?
            .port(config.smtp_port)
            .credentials(creds)
            .tls(Tls::Required(tls_parameters))
            .build();
        Ok(Self { transport })
    }
}

#[async_trait]
impl MailTransport for SmtpMailTransport {
    async fn deliver(&self, message: Message) -> Result<(), DispatchError> {
        self.transport
            .send(message)
            .await
            .map(|_| ())
            .map_err(|e| DispatchError::Transport(e.to_string()))
    }
}

/// Converts a rendered report into an email attachment and hands it to the
/// outbound transport. All-or-nothing: one bad recipient aborts the whole
/// send before the transport is contacted.
pub struct ReportDispatcher {
    config: Arc<DispatchConfig>,
    transport: Arc<dyn MailTransport>,
}

impl ReportDispatcher {
    pub fn new(config: DispatchConfig, transport: Arc<dyn MailTransport>) -> Self {
        Self {
            config: Arc::new(config),
            transport,
        }
    }

    /// Every address must pass the shape check; the first offender aborts
    /// the send and is named in the error.
    pub fn validate_recipients(recipients: &[String]) -> Result<(), DispatchError> {
        if recipients.is_empty() {
            return Err(DispatchError::NoRecipients);
        }
        for address in recipients {
            if !EMAIL_SHAPE.is_match(address.trim()) {
                return Err(DispatchError::InvalidRecipient(address.clone()));
            }
        }
        Ok(())
    }

    pub async fn send_report(
        &self,
        pdf_bytes: Vec<u8>,
        pdf_name: &str,
        subject: Option<&str>,
        body_text: Option<&str>,
    ) -> Result<DispatchReceipt, DispatchError> {
        Self::validate_recipients(&self.config.recipients)?;

        let from: Mailbox = self
            .config
            .from_address
            .parse()
            .map_err(|_| DispatchError::Build(format!(
                "Invalid from address: {}",
                self.config.from_address
            )))?;
        let message_id = generate_message_id(&self.config.from_address);
        let mut builder = Message::builder()
            .from(from)
            .subject(subject.unwrap_or(DEFAULT_SUBJECT))
            .message_id(Some(message_id.clone()));
        for address in &self.config.recipients {
            let mailbox: Mailbox = address
                .trim()
                .parse()
                .map_err(|_| DispatchError::InvalidRecipient(address.clone()))?;
            builder = builder.to(mailbox);
        }

        let content_type = ContentType::parse("application/pdf")
            .map_err(|e| DispatchError::Build(format!("Attachment content type: {}", e)))?;
        let attachment = Attachment::new(pdf_name.to_string()).body(pdf_bytes, content_type);
        let body = SinglePart::builder()
            .header(ContentType::TEXT_PLAIN)
            .body(body_text.unwrap_or(DEFAULT_BODY).to_string());
        let email = builder
            .multipart(MultiPart::mixed().singlepart(body).singlepart(attachment))
            .map_err(|e| DispatchError::Build(e.to_string()))?;

        match self.transport.deliver(email).await {
            Ok(()) => {
                info!(
                    "Report {} dispatched to {} recipients",
                    pdf_name,
                    self.config.recipients.len()
                );
                Ok(DispatchReceipt {
                    message_id,
                    recipients: self.config.recipients.len(),
                })
            }
            Err(e) => {
                error!("Report dispatch failed: {}", e);
                Err(e)
            }
        }
    }
}

fn generate_message_id(from_address: &str) -> String {
    let token: String = thread_rng()
        .sample_iter(&Alphanumeric)
        .take(16)
        .map(char::from)
        .collect();
    let domain = from_address.split('@').nth(1).unwrap_or("squadops");
    format!("<{}@{}>", token, domain)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct RecordingTransport {
        delivered: Mutex<Vec<Message>>,
    }

    impl RecordingTransport {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                delivered: Mutex::new(Vec::new()),
            })
        }

        fn delivered_count(&self) -> usize {
            self.delivered.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl MailTransport for RecordingTransport {
        async fn deliver(&self, message: Message) -> Result<(), DispatchError> {
            self.delivered.lock().unwrap().push(message);
            Ok(())
        }
    }

    fn config(recipients: Vec<&str>) -> DispatchConfig {
        DispatchConfig {
            smtp_server: "smtp.example.com".to_string(),
            smtp_port: 587,
            smtp_username: "user".to_string(),
            smtp_password: "pass".to_string(),
            from_address: "chamada@esquadrao.mil.br".to_string(),
            recipients: recipients.into_iter().map(String::from).collect(),
        }
    }

    #[test]
    fn recipient_shape_check_accepts_plain_addresses() {
        let ok = vec![
            "sap@esquadrao.mil.br".to_string(),
            "comando@fab.mil.br".to_string(),
        ];
        assert!(ReportDispatcher::validate_recipients(&ok).is_ok());
    }

    #[test]
    fn recipient_shape_check_names_the_offender() {
        let bad = vec![
            "sap@esquadrao.mil.br".to_string(),
            "nao-e-email".to_string(),
        ];
        match ReportDispatcher::validate_recipients(&bad) {
            Err(DispatchError::InvalidRecipient(address)) => assert_eq!(address, "nao-e-email"),
            other => panic!("Expected InvalidRecipient but got: {:?}", other),
        }
    }

    #[test]
    fn empty_recipient_list_is_rejected() {
        assert!(matches!(
            ReportDispatcher::validate_recipients(&[]),
            Err(DispatchError::NoRecipients)
        ));
    }

    #[tokio::test]
    async fn send_report_delivers_one_message_with_attachment() {
        let transport = RecordingTransport::new();
        let dispatcher = ReportDispatcher::new(
            config(vec!["sap@esquadrao.mil.br", "comando@fab.mil.br"]),
            transport.clone(),
        );
        let receipt = dispatcher
            .send_report(b"%PDF-1.3 fake".to_vec(), "chamada_2024-01-10.pdf", None, None)
            .await
            .unwrap();
        assert_eq!(receipt.recipients, 2);
        assert!(receipt.message_id.contains("@esquadrao.mil.br"));
        assert_eq!(transport.delivered_count(), 1, "one message for all recipients");
    }

    #[tokio::test]
    async fn invalid_recipient_aborts_before_transport_contact() {
        let transport = RecordingTransport::new();
        let dispatcher = ReportDispatcher::new(
            config(vec!["sap@esquadrao.mil.br", "quebrado@@x"]),
            transport.clone(),
        );
        let result = dispatcher
            .send_report(b"%PDF-1.3 fake".to_vec(), "chamada.pdf", None, None)
            .await;
        match result {
            Err(DispatchError::InvalidRecipient(address)) => assert_eq!(address, "quebrado@@x"),
            other => panic!("Expected InvalidRecipient but got: {:?}", other),
        }
        assert_eq!(
            transport.delivered_count(),
            0,
            "no partial delivery to valid recipients"
        );
    }

    #[tokio::test]
    async fn subject_and_body_overrides_are_honored() {
        let transport = RecordingTransport::new();
        let dispatcher =
            ReportDispatcher::new(config(vec!["sap@esquadrao.mil.br"]), transport.clone());
        let receipt = dispatcher
            .send_report(
                vec![1, 2, 3],
                "chamada.pdf",
                Some("Assunto custom"),
                Some("Corpo custom"),
            )
            .await
            .unwrap();
        assert_eq!(receipt.recipients, 1);
        assert_eq!(transport.delivered_count(), 1);
    }
}
