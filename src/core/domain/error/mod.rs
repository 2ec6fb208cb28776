use thiserror::Error;

/// The main error type for Proxmox monitoring operations.
///
/// Transport failures are classified at the HTTP boundary so callers can
/// decide per class: authentication problems surface to the operator,
/// connection problems degrade a single cycle, and `NotFound` means the
/// resource vanished between enumeration and detail fetch.
#[derive(Error, Debug)]
pub enum ProxmoxError {
    /// Conflicting or missing configuration, detected before any network call
    ///
    /// # Fields
    /// * `0` - What is wrong with the configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Represents errors that occur during connection attempts (network, DNS, timeout)
    ///
    /// # Fields
    /// * `0` - A description of what went wrong during the connection attempt
    #[error("Connection error: {0}")]
    Connection(String),

    /// Represents authentication failures (HTTP 401/403 or a rejected login)
    ///
    /// # Fields
    /// * `0` - A description of the authentication failure
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// The requested resource does not exist (HTTP 404)
    ///
    /// # Fields
    /// * `0` - The path that was requested
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Any other failure, including non-2xx statuses and malformed bodies
    ///
    /// # Fields
    /// * `0` - Details about the failure
    #[error("Unexpected error: {0}")]
    Unexpected(String),

    /// Represents validation failures with detailed context
    ///
    /// # Fields
    /// * `source` - The underlying validation error
    #[error("Validation error: {source}")]
    Validation { source: ValidationError },

    /// A raw API record could not be mapped onto the internal schema
    #[error("Normalization defect: {0}")]
    Normalization(#[from] NormalizationDefect),
}

impl ProxmoxError {
    /// Returns true for errors that belong to the configuration class
    /// (reported at setup, block activation).
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            ProxmoxError::Configuration(_) | ProxmoxError::Validation { .. }
        )
    }

    /// Returns true when the error means the resource is gone.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ProxmoxError::NotFound(_))
    }
}

impl From<ValidationError> for ProxmoxError {
    fn from(error: ValidationError) -> Self {
        ProxmoxError::Validation { source: error }
    }
}

/// Specialized error type for validation failures.
///
/// This enum provides detailed context about why a validation
/// failed, including field-specific errors and format violations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Represents a validation failure for a specific field
    ///
    /// # Fields
    /// * `field` - The name of the field that failed validation
    /// * `message` - A detailed message about why validation failed
    #[error("Field '{field}' validation failed: {message}")]
    Field { field: String, message: String },

    /// Represents format/syntax validation failures
    ///
    /// # Fields
    /// * `0` - Description of the format violation
    #[error("Format error: {0}")]
    Format(String),

    /// Represents violations of domain constraints
    ///
    /// # Fields
    /// * `0` - Description of the constraint violation
    #[error("Domain constraint violation: {0}")]
    ConstraintViolation(String),
}

/// A record-level defect found while normalizing API responses.
///
/// Defects are logged and the offending record is skipped; they never
/// abort a poll cycle.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NormalizationDefect {
    #[error("{kind} on node '{node}' has neither 'vmid' nor 'id'")]
    MissingIdentifier { kind: String, node: String },

    #[error("{kind} on node '{node}' has an unusable identifier: {raw}")]
    InvalidIdentifier {
        kind: String,
        node: String,
        raw: String,
    },

    #[error("record is missing required field '{0}'")]
    MissingField(String),

    #[error("duplicate {kind} identifier '{id}'")]
    DuplicateIdentifier { kind: String, id: String },

    #[error("{kind} {vmid} references unknown node '{node}'")]
    OrphanGuest {
        kind: String,
        vmid: u32,
        node: String,
    },
}

/// Type alias for Results that may fail with a ProxmoxError
pub type ProxmoxResult<T> = Result<T, ProxmoxError>;
