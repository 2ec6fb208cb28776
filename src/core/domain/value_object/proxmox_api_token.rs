use crate::core::domain::error::ValidationError;

/// An API token: an opaque token label plus its secret.
///
/// The label is never realm-qualified. When an operator pastes a full token
/// id (`user@realm!label`) into the name field, only the part after the last
/// `!` is kept.
#[derive(Clone, PartialEq, Eq)]
pub struct ProxmoxApiToken {
    name: String,
    secret: String,
}

impl ProxmoxApiToken {
    /// Creates a new token without validation.
    pub(crate) fn new_unchecked(name: String, secret: String) -> Self {
        Self { name, secret }
    }

    /// Normalizes and validates a token name/value pair.
    pub(crate) fn parse(name: &str, secret: &str) -> Result<Self, ValidationError> {
        let name = strip_token_prefix(name.trim());
        validate_token_name(name)?;
        validate_token_secret(secret)?;
        Ok(Self::new_unchecked(name.to_string(), secret.to_string()))
    }

    /// Returns the token label.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the token secret.
    #[must_use]
    pub fn secret(&self) -> &str {
        &self.secret
    }
}

impl std::fmt::Debug for ProxmoxApiToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxmoxApiToken")
            .field("name", &self.name)
            .field("secret", &"***")
            .finish()
    }
}

fn strip_token_prefix(name: &str) -> &str {
    match name.rsplit_once('!') {
        Some((_, label)) => label,
        None => name,
    }
}

/// Validates a token label.
pub(crate) fn validate_token_name(name: &str) -> Result<(), ValidationError> {
    if name.is_empty() {
        return Err(ValidationError::Field {
            field: "token_name".to_string(),
            message: "Token name cannot be empty".to_string(),
        });
    }
    let allowed = |c: char| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.';
    if !name.chars().all(allowed) {
        return Err(ValidationError::Format(
            "Token name may only contain alphanumeric characters, '-', '_' and '.'".to_string(),
        ));
    }
    Ok(())
}

/// Validates a token secret.
pub(crate) fn validate_token_secret(secret: &str) -> Result<(), ValidationError> {
    if secret.is_empty() {
        return Err(ValidationError::Field {
            field: "token_value".to_string(),
            message: "Token value cannot be empty".to_string(),
        });
    }
    if secret.chars().any(char::is_whitespace) {
        return Err(ValidationError::Format(
            "Token value cannot contain whitespace".to_string(),
        ));
    }
    Ok(())
}
