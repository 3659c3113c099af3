// Mail settings module
// Snapshot of the SMTP and destination environment variables

use thiserror::Error;

pub const SMTP_HOST_VAR: &str = "PORKBUN_SMTP_HOST";
pub const SMTP_PORT_VAR: &str = "PORKBUN_SMTP_PORT";
pub const SMTP_USER_VAR: &str = "PORKBUN_SMTP_USER";
pub const SMTP_PASS_VAR: &str = "PORKBUN_SMTP_PASS";
pub const CONTACT_TO_VAR: &str = "CONTACT_TO";
pub const DRIVER_TO_VAR: &str = "DRIVER_TO";

/// Port that implies TLS from the first byte
pub const IMPLICIT_TLS_PORT: u16 = 465;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SettingsError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
    #[error("Invalid PORKBUN_SMTP_PORT value: {0}")]
    InvalidPort(String),
}

/// How the SMTP connection is secured
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsMode {
    /// TLS handshake right after connecting
    Implicit,
    /// Plain connection that must be upgraded with STARTTLS
    StartTls,
}

/// Validated SMTP connection settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
}

impl SmtpSettings {
    pub const fn tls_mode(&self) -> TlsMode {
        if self.port == IMPLICIT_TLS_PORT {
            TlsMode::Implicit
        } else {
            TlsMode::StartTls
        }
    }
}

/// Raw mail-related environment values, captured once at startup.
///
/// Values are kept optional here; a missing one only becomes an error when a
/// handler actually needs it.
#[derive(Debug, Clone, Default)]
pub struct MailSettings {
    host: Option<String>,
    port: Option<String>,
    user: Option<String>,
    password: Option<String>,
    contact_to: Option<String>,
    driver_to: Option<String>,
}

impl MailSettings {
    /// Read the process environment
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Self::from_source(config::Environment::default())
    }

    /// Read from an arbitrary environment source
    pub fn from_source(env: config::Environment) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder().add_source(env).build()?;
        let read = |name: &str| {
            settings
                .get_string(&name.to_lowercase())
                .ok()
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        Ok(Self {
            host: read(SMTP_HOST_VAR),
            port: read(SMTP_PORT_VAR),
            user: read(SMTP_USER_VAR),
            password: read(SMTP_PASS_VAR),
            contact_to: read(CONTACT_TO_VAR),
            driver_to: read(DRIVER_TO_VAR),
        })
    }

    /// Build settings from a plain key/value map, keyed by variable name
    pub fn from_map<I, K, V>(vars: I) -> Result<Self, config::ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let map = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect::<config::Map<String, String>>();
        Self::from_source(config::Environment::default().source(Some(map)))
    }

    pub fn smtp(&self) -> Result<SmtpSettings, SettingsError> {
        let host = require(self.host.as_ref(), SMTP_HOST_VAR)?;
        let port_value = require(self.port.as_ref(), SMTP_PORT_VAR)?;
        let user = require(self.user.as_ref(), SMTP_USER_VAR)?;
        let password = require(self.password.as_ref(), SMTP_PASS_VAR)?;

        let port = port_value
            .parse::<u16>()
            .map_err(|_| SettingsError::InvalidPort(port_value.clone()))?;

        Ok(SmtpSettings {
            host: host.clone(),
            port,
            user: user.clone(),
            password: password.clone(),
        })
    }

    /// Sender address; the SMTP account itself
    pub fn sender(&self) -> Result<&str, SettingsError> {
        require(self.user.as_ref(), SMTP_USER_VAR).map(String::as_str)
    }

    pub fn contact_to(&self) -> Result<&str, SettingsError> {
        require(self.contact_to.as_ref(), CONTACT_TO_VAR).map(String::as_str)
    }

    pub fn driver_to(&self) -> Result<&str, SettingsError> {
        require(self.driver_to.as_ref(), DRIVER_TO_VAR).map(String::as_str)
    }

    /// Names of every variable that is currently absent
    pub fn missing(&self) -> Vec<&'static str> {
        [
            (SMTP_HOST_VAR, &self.host),
            (SMTP_PORT_VAR, &self.port),
            (SMTP_USER_VAR, &self.user),
            (SMTP_PASS_VAR, &self.password),
            (CONTACT_TO_VAR, &self.contact_to),
            (DRIVER_TO_VAR, &self.driver_to),
        ]
        .into_iter()
        .filter(|(_, value)| value.is_none())
        .map(|(name, _)| name)
        .collect()
    }
}

fn require<'a>(
    value: Option<&'a String>,
    name: &'static str,
) -> Result<&'a String, SettingsError> {
    value.ok_or(SettingsError::Missing(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full() -> Vec<(&'static str, &'static str)> {
        vec![
            (SMTP_HOST_VAR, "smtp.example.net"),
            (SMTP_PORT_VAR, "587"),
            (SMTP_USER_VAR, "forms@example.net"),
            (SMTP_PASS_VAR, "secret"),
            (CONTACT_TO_VAR, "office@example.net"),
            (DRIVER_TO_VAR, "hiring@example.net"),
        ]
    }

    #[test]
    fn test_complete_settings() {
        let settings = MailSettings::from_map(full()).unwrap();
        let smtp = settings.smtp().unwrap();
        assert_eq!(smtp.host, "smtp.example.net");
        assert_eq!(smtp.port, 587);
        assert_eq!(smtp.tls_mode(), TlsMode::StartTls);
        assert_eq!(settings.sender().unwrap(), "forms@example.net");
        assert_eq!(settings.contact_to().unwrap(), "office@example.net");
        assert_eq!(settings.driver_to().unwrap(), "hiring@example.net");
        assert!(settings.missing().is_empty());
    }

    #[test]
    fn test_implicit_tls_port() {
        let mut vars = full();
        vars[1] = (SMTP_PORT_VAR, "465");
        let smtp = MailSettings::from_map(vars).unwrap().smtp().unwrap();
        assert_eq!(smtp.tls_mode(), TlsMode::Implicit);
    }

    #[test]
    fn test_missing_variable() {
        let vars = full()
            .into_iter()
            .filter(|(k, _)| *k != SMTP_PASS_VAR && *k != DRIVER_TO_VAR);
        let settings = MailSettings::from_map(vars).unwrap();
        assert_eq!(
            settings.smtp(),
            Err(SettingsError::Missing(SMTP_PASS_VAR))
        );
        assert_eq!(
            settings.driver_to(),
            Err(SettingsError::Missing(DRIVER_TO_VAR))
        );
        assert_eq!(settings.missing(), vec![SMTP_PASS_VAR, DRIVER_TO_VAR]);
    }

    #[test]
    fn test_empty_value_counts_as_missing() {
        let mut vars = full();
        vars[0] = (SMTP_HOST_VAR, "   ");
        let settings = MailSettings::from_map(vars).unwrap();
        assert_eq!(settings.smtp(), Err(SettingsError::Missing(SMTP_HOST_VAR)));
    }

    #[test]
    fn test_non_numeric_port() {
        let mut vars = full();
        vars[1] = (SMTP_PORT_VAR, "smtp");
        let settings = MailSettings::from_map(vars).unwrap();
        assert_eq!(
            settings.smtp(),
            Err(SettingsError::InvalidPort("smtp".to_string()))
        );
        assert_eq!(
            settings.smtp().unwrap_err().to_string(),
            "Invalid PORKBUN_SMTP_PORT value: smtp"
        );
    }
}
