// Driver application endpoint
// Requires name and phone; every uploaded file is attached

use super::submission::{Draft, FormEndpoint};
use crate::config::{FormsConfig, MailSettings, SettingsError};
use crate::error::SubmissionError;
use crate::form::{optional_field, require_field, FieldMap, Submission};
use crate::mail::{Attachment, Report};

/// Optional questionnaire fields with their labels, in table order
pub const OPTIONAL_FIELDS: [(&str, &str); 8] = [
    ("criminalHistory", "Criminal History"),
    ("commercialLicense", "Commercial License"),
    ("passengerEndorsement", "Passenger Endorsement"),
    ("drugTestCompleted", "Drug Test Completed"),
    ("priorExperience", "Prior Experience"),
    ("experienceCompany", "Experience Company"),
    ("experienceDuration", "Experience Duration"),
    ("extraNotes", "Extra Notes"),
];

/// A validated driver application
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverApplication {
    pub name: String,
    pub phone: String,
    /// Only used as reply-to
    pub email: Option<String>,
    /// Values of [`OPTIONAL_FIELDS`], same order
    pub answers: Vec<(&'static str, Option<String>)>,
}

impl DriverApplication {
    pub fn from_fields(fields: &FieldMap) -> Result<Self, SubmissionError> {
        Ok(Self {
            name: require_field(fields, "name")?,
            phone: require_field(fields, "phone")?,
            email: optional_field(fields, "email"),
            answers: OPTIONAL_FIELDS
                .iter()
                .map(|(key, label)| (*label, optional_field(fields, key)))
                .collect(),
        })
    }

    pub fn report(&self) -> Report {
        let report = Report::new("New Driver Application", "New driver application", 720)
            .row("Name", Some(self.name.clone()))
            .row("Phone", Some(self.phone.clone()));
        self.answers
            .iter()
            .fold(report, |report, (label, value)| report.row(*label, value.clone()))
    }
}

pub struct DriverForm;

impl FormEndpoint for DriverForm {
    const NAME: &'static str = "driver";
    const FAILURE_MESSAGE: &'static str = "Failed to send application";

    fn draft(&self, submission: &Submission) -> Result<Draft, SubmissionError> {
        let application = DriverApplication::from_fields(submission.fields())?;
        Ok(Draft {
            reply_to: application.email.clone(),
            report: application.report(),
            attachments: submission.files().map(Attachment::from).collect(),
        })
    }

    fn subject<'a>(&self, forms: &'a FormsConfig) -> &'a str {
        &forms.driver_subject
    }

    fn destination<'a>(&self, mail: &'a MailSettings) -> Result<&'a str, SettingsError> {
        mail.driver_to()
    }
}
