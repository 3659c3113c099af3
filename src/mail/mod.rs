//! Outbound mail module
//!
//! [`MailMessage`] is what a form handler composes; a [`MailDispatcher`]
//! delivers it. The SMTP implementation lives in [`transport`].

pub mod report;
pub mod transport;

use async_trait::async_trait;
use std::path::PathBuf;

use crate::error::SubmissionError;
use crate::form::UploadedFile;

pub use report::{escape_html, Report, Row, NOT_PROVIDED};
pub use transport::{SmtpMailer, TransportProvider};

/// A file to attach, read from disk at send time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    pub path: PathBuf,
    pub content_type: Option<String>,
}

impl From<&UploadedFile> for Attachment {
    fn from(file: &UploadedFile) -> Self {
        Self {
            filename: file.display_name(),
            path: file.path.clone(),
            content_type: file.content_type.clone(),
        }
    }
}

/// A fully composed message, sent at most once
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    pub from: String,
    pub to: String,
    pub reply_to: Option<String>,
    pub subject: String,
    pub text: String,
    pub html: String,
    pub attachments: Vec<Attachment>,
}

#[async_trait]
pub trait MailDispatcher: Send + Sync {
    /// Hand the message to the mail system. No retries.
    async fn send(&self, message: MailMessage) -> Result<(), SubmissionError>;
}
