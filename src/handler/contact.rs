// Contact form endpoint
// Requires name, email and message; only files under `attachment` are sent

use super::submission::{Draft, FormEndpoint};
use crate::config::{FormsConfig, MailSettings, SettingsError};
use crate::error::SubmissionError;
use crate::form::{optional_field, require_field, FieldMap, Submission};
use crate::mail::{Attachment, Report};

/// File field whose uploads are attached
pub const ATTACHMENT_FIELD: &str = "attachment";

/// A validated contact request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactRequest {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub service_type: Option<String>,
    pub message: String,
}

impl ContactRequest {
    pub fn from_fields(fields: &FieldMap) -> Result<Self, SubmissionError> {
        Ok(Self {
            name: require_field(fields, "name")?,
            email: require_field(fields, "email")?,
            message: require_field(fields, "message")?,
            phone: optional_field(fields, "phone"),
            service_type: optional_field(fields, "serviceType"),
        })
    }

    pub fn report(&self) -> Report {
        Report::new("New Contact Request", "New contact request", 640)
            .row("Name", Some(self.name.clone()))
            .row("Email", Some(self.email.clone()))
            .row("Phone", self.phone.clone())
            .row("Service Type", self.service_type.clone())
            .body("Message", self.message.clone())
    }
}

pub struct ContactForm;

impl FormEndpoint for ContactForm {
    const NAME: &'static str = "contact";
    const FAILURE_MESSAGE: &'static str = "Failed to send message";

    fn draft(&self, submission: &Submission) -> Result<Draft, SubmissionError> {
        let request = ContactRequest::from_fields(submission.fields())?;
        Ok(Draft {
            reply_to: Some(request.email.clone()),
            report: request.report(),
            attachments: submission
                .files_for(ATTACHMENT_FIELD)
                .iter()
                .map(Attachment::from)
                .collect(),
        })
    }

    fn subject<'a>(&self, forms: &'a FormsConfig) -> &'a str {
        &forms.contact_subject
    }

    fn destination<'a>(&self, mail: &'a MailSettings) -> Result<&'a str, SettingsError> {
        mail.contact_to()
    }
}
