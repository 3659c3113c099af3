// Application state module
// Everything a request handler needs, built once at startup and shared

use std::sync::Arc;

use super::mail::MailSettings;
use super::types::Config;
use crate::form::ParseLimits;
use crate::mail::{MailDispatcher, SmtpMailer, TransportProvider};

/// Application state
pub struct AppState {
    pub config: Config,
    pub mail: MailSettings,
    pub limits: ParseLimits,
    pub dispatcher: Arc<dyn MailDispatcher>,
}

impl AppState {
    /// State with an explicit dispatcher
    pub fn new(config: Config, mail: MailSettings, dispatcher: Arc<dyn MailDispatcher>) -> Self {
        let limits = ParseLimits::from_config(&config);
        Self {
            config,
            mail,
            limits,
            dispatcher,
        }
    }

    /// State that sends through SMTP; the transport is built on first send
    pub fn with_smtp(config: Config, mail: MailSettings) -> Self {
        let provider = TransportProvider::new(mail.clone());
        Self::new(config, mail, Arc::new(SmtpMailer::new(provider)))
    }
}
