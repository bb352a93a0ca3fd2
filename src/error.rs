use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("malformed coordinate text")]
    Malformed,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordinateError {
    #[error("Latitude {0} is out of valid range [-90, 90]")]
    LatitudeOutOfRange(f64),
    #[error("Longitude {0} is out of valid range [-180, 180]")]
    LongitudeOutOfRange(f64),
    #[error("Coordinate value is not finite (NaN or Infinity)")]
    NonFinite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("identifier must be at least 3 letters or digits")]
    InvalidIdentifier,
    #[error("disaster type not selected")]
    MissingType,
    #[error("location not selected")]
    MissingLocation,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io failure: {0}")]
    IoFailure(String),

    #[error("duplicate incident id: {0}")]
    DuplicateId(String),

    #[error("schema version {found} is newer than supported {max}")]
    FutureSchema { found: u32, max: u32 },

    #[error("lock acquisition failed")]
    LockFailed,
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::IoFailure(e.to_string())
    }
}

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Error)]
pub enum CapabilityError {
    #[error("capability unavailable: {0}")]
    Unavailable(String),
    #[error("capability failed: {0}")]
    Failed(String),
}

#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("invalid config: {0}")]
    Invalid(String),
    #[error("config parse failed: {0}")]
    Parse(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorSeverity {
    Transient,
    Permanent,
    Fatal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    InvalidLocation,
    InvalidIdentifier,
    MissingType,
    MissingLocation,
    DuplicateIdentifier,
    Storage,
    Location,
    LocationPermissionDenied,
    Configuration,
    Internal,
}

impl ErrorKind {
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::InvalidLocation => "INVALID_LOCATION",
            Self::InvalidIdentifier => "INVALID_IDENTIFIER",
            Self::MissingType => "MISSING_TYPE",
            Self::MissingLocation => "MISSING_LOCATION",
            Self::DuplicateIdentifier => "DUPLICATE_IDENTIFIER",
            Self::Storage => "STORAGE_ERROR",
            Self::Location => "LOCATION_ERROR",
            Self::LocationPermissionDenied => "LOCATION_PERMISSION_DENIED",
            Self::Configuration => "CONFIG_ERROR",
            Self::Internal => "INTERNAL_ERROR",
        }
    }

    #[must_use]
    pub const fn default_severity(self) -> ErrorSeverity {
        match self {
            Self::Storage | Self::Location => ErrorSeverity::Transient,

            Self::Configuration | Self::Internal => ErrorSeverity::Fatal,

            Self::InvalidLocation
            | Self::InvalidIdentifier
            | Self::MissingType
            | Self::MissingLocation
            | Self::DuplicateIdentifier
            | Self::LocationPermissionDenied => ErrorSeverity::Permanent,
        }
    }

    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::Storage | Self::Location)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppError {
    pub kind: ErrorKind,
    pub severity: ErrorSeverity,
    pub message: String,
    pub internal_message: Option<String>,
    pub context: HashMap<String, String>,
}

impl AppError {
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: kind.default_severity(),
            message: message.into(),
            internal_message: None,
            context: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_internal(mut self, internal: impl Into<String>) -> Self {
        self.internal_message = Some(internal.into());
        self
    }

    #[must_use]
    pub fn with_severity(mut self, severity: ErrorSeverity) -> Self {
        self.severity = severity;
        self
    }

    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.kind.code()
    }

    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        self.kind.is_retryable() && !matches!(self.severity, ErrorSeverity::Fatal)
    }

    #[must_use]
    pub fn user_facing_message(&self) -> String {
        match self.kind {
            ErrorKind::InvalidLocation => "Invalid location".into(),
            ErrorKind::InvalidIdentifier => {
                "Enter a valid ID (at least 3 letters or numbers)".into()
            }
            ErrorKind::MissingType => "Select Type".into(),
            ErrorKind::MissingLocation => "Drag map to location".into(),
            ErrorKind::DuplicateIdentifier => {
                "An incident with this ID already exists. Please use a different ID.".into()
            }
            ErrorKind::Storage => {
                "Unable to save data locally. Please try again.".into()
            }
            ErrorKind::Location => {
                "Unable to determine your location. Please check your GPS settings.".into()
            }
            ErrorKind::LocationPermissionDenied => {
                "Location access is required. Please enable location permissions in Settings."
                    .into()
            }
            ErrorKind::Configuration => self.message.clone(),
            ErrorKind::Internal => {
                "An unexpected error occurred. Please try again.".into()
            }
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code(), self.message)?;
        if let Some(internal) = &self.internal_message {
            write!(f, " (internal: {internal})")?;
        }
        Ok(())
    }
}

impl std::error::Error for AppError {}

pub type AppResult<T> = Result<T, AppError>;

impl From<ParseError> for AppError {
    fn from(e: ParseError) -> Self {
        AppError::new(ErrorKind::InvalidLocation, e.to_string())
    }
}

impl From<CoordinateError> for AppError {
    fn from(e: CoordinateError) -> Self {
        AppError::new(ErrorKind::InvalidLocation, e.to_string())
    }
}

impl From<ValidationError> for AppError {
    fn from(e: ValidationError) -> Self {
        let kind = match e {
            ValidationError::InvalidIdentifier => ErrorKind::InvalidIdentifier,
            ValidationError::MissingType => ErrorKind::MissingType,
            ValidationError::MissingLocation => ErrorKind::MissingLocation,
        };
        AppError::new(kind, e.to_string())
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match &e {
            StoreError::DuplicateId(id) => AppError::new(ErrorKind::DuplicateIdentifier, e.to_string())
                .with_context("incident_id", id.clone()),
            StoreError::IoFailure(_) | StoreError::LockFailed => {
                AppError::new(ErrorKind::Storage, "Storage operation failed")
                    .with_internal(e.to_string())
            }
            StoreError::FutureSchema { .. } => {
                AppError::new(ErrorKind::Storage, "Unsupported database version")
                    .with_internal(e.to_string())
                    .with_severity(ErrorSeverity::Fatal)
            }
        }
    }
}

impl From<SubmitError> for AppError {
    fn from(e: SubmitError) -> Self {
        match e {
            SubmitError::Validation(v) => v.into(),
            SubmitError::Store(s) => s.into(),
        }
    }
}

impl From<CapabilityError> for AppError {
    fn from(e: CapabilityError) -> Self {
        AppError::new(ErrorKind::Location, e.to_string())
    }
}

impl From<ConfigError> for AppError {
    fn from(e: ConfigError) -> Self {
        AppError::new(ErrorKind::Configuration, e.to_string())
    }
}
