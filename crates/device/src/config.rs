//! Construction-time configuration for the emulated card device

use std::str::FromStr;

use thiserror::Error;

/// Default certificate database path for the certificates backend.
pub const CERTIFICATES_DEFAULT_DB: &str = "/etc/pki/nssdb";

/// Name of the [`Backend::NssEmulated`] backend.
pub const BACKEND_NSS_EMULATED: &str = "nss-emulated";

/// Name of the [`Backend::Certificates`] backend.
pub const BACKEND_CERTIFICATES: &str = "certificates";

/// Errors reported while validating a device configuration.
///
/// These are the only errors surfaced synchronously by the device
/// constructor's configuration check; the device never starts when one
/// is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The backend name is not one of the known backends.
    #[error(
        "unknown backend `{0}`; the options are {BACKEND_NSS_EMULATED} (default), {BACKEND_CERTIFICATES}"
    )]
    UnknownBackend(String),

    /// The certificates backend needs all three certificate names.
    #[error("the certificates backend requires cert1, cert2 and cert3")]
    MissingCertificates,
}

/// Card backend selected at construction, immutable thereafter.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Backend {
    /// Mirror the local hardware readers (the default).
    #[default]
    NssEmulated,

    /// Emulate a card from three named certificates.
    Certificates {
        /// First certificate name.
        cert1: String,
        /// Second certificate name.
        cert2: String,
        /// Third certificate name.
        cert3: String,
        /// Certificate database path; [`CERTIFICATES_DEFAULT_DB`] when
        /// absent.
        db: Option<String>,
    },
}

impl Backend {
    /// Select the certificates backend with the default database path.
    pub fn certificates(cert1: impl Into<String>, cert2: impl Into<String>, cert3: impl Into<String>) -> Self {
        Self::Certificates {
            cert1: cert1.into(),
            cert2: cert2.into(),
            cert3: cert3.into(),
            db: None,
        }
    }

    /// Check the backend selection is complete.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            Self::NssEmulated => Ok(()),
            Self::Certificates {
                cert1,
                cert2,
                cert3,
                ..
            } => {
                if cert1.is_empty() || cert2.is_empty() || cert3.is_empty() {
                    Err(ConfigError::MissingCertificates)
                } else {
                    Ok(())
                }
            }
        }
    }

    /// Database path used by the certificates backend.
    pub fn db_path(&self) -> &str {
        match self {
            Self::NssEmulated => CERTIFICATES_DEFAULT_DB,
            Self::Certificates { db, .. } => db.as_deref().unwrap_or(CERTIFICATES_DEFAULT_DB),
        }
    }
}

impl FromStr for Backend {
    type Err = ConfigError;

    /// Map a backend name to its selection.
    ///
    /// `certificates` yields a selection with empty certificate names;
    /// filling them in is the caller's job and [`validate`](Self::validate)
    /// catches the omission.
    fn from_str(name: &str) -> Result<Self, ConfigError> {
        match name {
            BACKEND_NSS_EMULATED => Ok(Self::NssEmulated),
            BACKEND_CERTIFICATES => Ok(Self::Certificates {
                cert1: String::new(),
                cert2: String::new(),
                cert3: String::new(),
                db: None,
            }),
            other => Err(ConfigError::UnknownBackend(other.to_string())),
        }
    }
}

/// Configuration for [`EmulatedCardDevice`](crate::EmulatedCardDevice).
#[derive(Debug, Clone, Default)]
pub struct DeviceConfig {
    /// Selected card backend.
    pub backend: Backend,

    /// Debug verbosity carried from the device property; trace filtering
    /// itself is the subscriber's job.
    pub debug: u8,
}

impl DeviceConfig {
    /// Create a default configuration (NSS-emulated backend, debug off).
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the backend.
    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    /// Set the debug verbosity.
    pub const fn with_debug(mut self, debug: u8) -> Self {
        self.debug = debug;
        self
    }

    /// Validate the configuration; called by the device constructor
    /// before any thread is spawned.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.backend.validate()
    }
}
