use async_trait::async_trait;

/// Inline attachment for outbound email.
#[derive(Debug, Clone)]
pub struct EmailAttachment {
    pub filename: String,
    pub content_type: String,
    pub content: Vec<u8>,
}

#[derive(Debug, thiserror::Error)]
#[error("email delivery failed: {0}")]
pub struct MailError(pub String);

/// Outbound email. Fire-and-forget from the engines' perspective:
/// callers log a failure and continue, they never fail the request.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(
        &self,
        to: &str,
        subject: &str,
        html_body: &str,
        attachments: &[EmailAttachment],
    ) -> Result<(), MailError>;
}

/// External image upload. `None` on any failure; the caller stores no
/// reference in that case.
#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn upload(&self, bytes: &[u8], filename: &str) -> Option<String>;
}

/// Logs and drops mail. Used when no provider is configured.
#[derive(Debug, Default)]
pub struct NoopMailer;

#[async_trait]
impl Mailer for NoopMailer {
    async fn send(
        &self,
        to: &str,
        subject: &str,
        _html_body: &str,
        attachments: &[EmailAttachment],
    ) -> Result<(), MailError> {
        tracing::info!(%to, %subject, attachments = attachments.len(), "mail provider not configured, dropping email");
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct NoopImageStore;

#[async_trait]
impl ImageStore for NoopImageStore {
    async fn upload(&self, bytes: &[u8], filename: &str) -> Option<String> {
        tracing::info!(size = bytes.len(), %filename, "image store not configured, dropping upload");
        None
    }
}
