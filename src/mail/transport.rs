// SMTP transport module
// Builds the lettre transport once and sends composed messages through it

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment as MimeAttachment, Mailbox, Mailboxes, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::path::Path;
use tokio::sync::OnceCell;

use super::{Attachment, MailDispatcher, MailMessage};
use crate::config::{MailSettings, SmtpSettings, TlsMode};
use crate::error::SubmissionError;
use crate::http::mime::get_content_type;

pub type SmtpTransport = AsyncSmtpTransport<Tokio1Executor>;

/// Owner of the process-wide SMTP transport.
///
/// Created at startup, the transport itself is built on first use and then
/// shared by every send. A failed build leaves the cell empty so the next
/// request tries again.
pub struct TransportProvider {
    settings: MailSettings,
    transport: OnceCell<SmtpTransport>,
}

impl TransportProvider {
    pub fn new(settings: MailSettings) -> Self {
        Self {
            settings,
            transport: OnceCell::new(),
        }
    }

    pub async fn get(&self) -> Result<&SmtpTransport, SubmissionError> {
        self.transport
            .get_or_try_init(|| async {
                self.settings
                    .smtp()
                    .map_err(SubmissionError::from)
                    .and_then(|smtp| build_transport(&smtp))
            })
            .await
    }

    pub fn is_initialized(&self) -> bool {
        self.transport.initialized()
    }
}

/// Build the transport for the given settings.
///
/// Port 465 uses implicit TLS, every other port must upgrade with STARTTLS.
/// The server certificate is not verified.
pub fn build_transport(smtp: &SmtpSettings) -> Result<SmtpTransport, SubmissionError> {
    let params = TlsParameters::builder(smtp.host.clone())
        .dangerous_accept_invalid_certs(true)
        .build()
        .map_err(SubmissionError::dispatch)?;

    let tls = match smtp.tls_mode() {
        TlsMode::Implicit => Tls::Wrapper(params),
        TlsMode::StartTls => Tls::Required(params),
    };

    tracing::debug!(host = %smtp.host, port = smtp.port, tls = ?smtp.tls_mode(), "building SMTP transport");

    Ok(SmtpTransport::builder_dangerous(smtp.host.as_str())
        .port(smtp.port)
        .tls(tls)
        .credentials(Credentials::new(smtp.user.clone(), smtp.password.clone()))
        .build())
}

/// [`MailDispatcher`] backed by an SMTP server
pub struct SmtpMailer {
    provider: TransportProvider,
}

impl SmtpMailer {
    pub const fn new(provider: TransportProvider) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl MailDispatcher for SmtpMailer {
    async fn send(&self, message: MailMessage) -> Result<(), SubmissionError> {
        let transport = self.provider.get().await?;
        let email = compose(&message).await?;

        let response = transport
            .send(email)
            .await
            .map_err(SubmissionError::dispatch)?;

        tracing::info!(
            to = %message.to,
            subject = %message.subject,
            attachments = message.attachments.len(),
            code = %response.code(),
            "mail accepted by SMTP server"
        );
        Ok(())
    }
}

/// Turn a [`MailMessage`] into a MIME message, reading attachments from disk
pub async fn compose(message: &MailMessage) -> Result<Message, SubmissionError> {
    let from: Mailbox = message
        .from
        .parse()
        .map_err(|e| SubmissionError::dispatch(format!("invalid sender {}: {e}", message.from)))?;
    // Destinations may list several addresses separated by commas
    let to: Mailboxes = message
        .to
        .parse()
        .map_err(|e| SubmissionError::dispatch(format!("invalid recipient {}: {e}", message.to)))?;
    if to.iter().next().is_none() {
        return Err(SubmissionError::dispatch("no recipient address"));
    }

    let mut builder = to
        .into_iter()
        .fold(Message::builder().from(from), |builder, mailbox| builder.to(mailbox))
        .subject(message.subject.as_str());

    if let Some(reply_to) = &message.reply_to {
        match reply_to.parse::<Mailbox>() {
            Ok(mailbox) => builder = builder.reply_to(mailbox),
            Err(e) => tracing::warn!(reply_to = %reply_to, error = %e, "dropping unparseable reply-to"),
        }
    }

    let mut body = MultiPart::mixed().multipart(MultiPart::alternative_plain_html(
        message.text.clone(),
        message.html.clone(),
    ));

    for attachment in &message.attachments {
        let content = tokio::fs::read(&attachment.path).await.map_err(|e| {
            SubmissionError::dispatch(format!(
                "failed to read attachment {}: {e}",
                attachment.path.display()
            ))
        })?;
        body = body.singlepart(
            MimeAttachment::new(attachment.filename.clone())
                .body(content, attachment_content_type(attachment)),
        );
    }

    builder.multipart(body).map_err(SubmissionError::dispatch)
}

/// Declared type when it parses, else a guess from the file extension
fn attachment_content_type(attachment: &Attachment) -> ContentType {
    if let Some(declared) = attachment.content_type.as_deref() {
        if let Ok(content_type) = ContentType::parse(declared) {
            return content_type;
        }
    }

    let extension = Path::new(&attachment.filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    ContentType::parse(get_content_type(extension.as_deref()))
        .unwrap_or_else(|_| octet_stream())
}

fn octet_stream() -> ContentType {
    ContentType::parse("application/octet-stream").unwrap_or(ContentType::TEXT_PLAIN)
}
