//! Form submission pipeline
//!
//! parse → validate and compose → resolve addresses → send → clean up.
//! Spooled uploads are removed on every path that got past parsing; the
//! parser removes its own files when it fails. A pipeline dropped midway
//! leaves the removal to the [`Submission`] it owned.

use http_body_util::Full;
use hyper::body::{Body, Bytes};
use hyper::{Request, Response};

use crate::config::{AppState, FormsConfig, MailSettings, SettingsError};
use crate::error::{ErrorKind, SubmissionError};
use crate::form::{parse_multipart, Submission};
use crate::http;
use crate::mail::{Attachment, MailMessage, Report};

/// Mail content derived from one validated submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Draft {
    pub reply_to: Option<String>,
    pub report: Report,
    pub attachments: Vec<Attachment>,
}

/// One form endpoint: what it requires and where its mail goes
pub trait FormEndpoint: Send + Sync {
    /// Name used in log lines
    const NAME: &'static str;

    /// Public error text for configuration and dispatch failures
    const FAILURE_MESSAGE: &'static str;

    /// Validate the submission and build the mail content
    fn draft(&self, submission: &Submission) -> Result<Draft, SubmissionError>;

    fn subject<'a>(&self, forms: &'a FormsConfig) -> &'a str;

    fn destination<'a>(&self, mail: &'a MailSettings) -> Result<&'a str, SettingsError>;
}

/// Run one submission through the pipeline and produce its only response
pub async fn handle_submission<E, B>(
    endpoint: &E,
    req: Request<B>,
    state: &AppState,
) -> Response<Full<Bytes>>
where
    E: FormEndpoint,
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let (parts, body) = req.into_parts();

    let mut submission = match parse_multipart(&parts.headers, body, &state.limits).await {
        Ok(submission) => submission,
        Err(e) => return failure_response::<E>(&SubmissionError::from(e)),
    };

    let result = deliver(endpoint, &submission, state).await;
    let files = submission.file_count();
    submission.discard().await;

    match result {
        Ok(()) => {
            tracing::info!(endpoint = E::NAME, files, "submission relayed");
            http::build_ok_response()
        }
        Err(e) => failure_response::<E>(&e),
    }
}

async fn deliver<E: FormEndpoint>(
    endpoint: &E,
    submission: &Submission,
    state: &AppState,
) -> Result<(), SubmissionError> {
    let draft = endpoint.draft(submission)?;
    let to = endpoint.destination(&state.mail)?;
    let from = state.mail.sender()?;

    let message = MailMessage {
        from: from.to_string(),
        to: to.to_string(),
        reply_to: draft.reply_to,
        subject: endpoint.subject(&state.config.forms).to_string(),
        text: draft.report.to_text(),
        html: draft.report.to_html(),
        attachments: draft.attachments,
    };

    state.dispatcher.send(message).await
}

fn failure_response<E: FormEndpoint>(error: &SubmissionError) -> Response<Full<Bytes>> {
    match error.kind() {
        ErrorKind::InvalidForm => {
            tracing::warn!(endpoint = E::NAME, error = %error, "failed to parse submission");
        }
        ErrorKind::Validation => {
            tracing::warn!(endpoint = E::NAME, error = %error, "rejected submission");
        }
        ErrorKind::Config | ErrorKind::Dispatch => {
            tracing::error!(endpoint = E::NAME, error = %error, "failed to relay submission");
        }
    }
    http::build_error_response(error.status(), &error.public_message(E::FAILURE_MESSAGE))
}
