use crate::core::domain::error::ValidationError;

/// Realm appended to usernames that carry none.
pub const DEFAULT_REALM: &str = "pam";

/// A Proxmox authentication realm (`pam`, `pve`, `ldap`, `ad`, or a custom realm id).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProxmoxRealm(String);

impl ProxmoxRealm {
    /// Creates a new realm without validation.
    pub(crate) fn new_unchecked(realm: String) -> Self {
        Self(realm)
    }

    /// Returns the realm as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ProxmoxRealm {
    fn default() -> Self {
        Self(DEFAULT_REALM.to_string())
    }
}

/// Validates a realm identifier.
///
/// Custom realm ids are allowed, so only the character set and length are checked.
pub(crate) fn validate_realm(realm: &str) -> Result<(), ValidationError> {
    if realm.is_empty() {
        return Err(ValidationError::Field {
            field: "realm".to_string(),
            message: "Realm cannot be empty".to_string(),
        });
    }
    if realm.len() < 2 || realm.len() > 32 {
        return Err(ValidationError::Format(format!(
            "Realm length must be between 2 and 32 characters (got {})",
            realm.len()
        )));
    }
    let allowed = |c: char| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.';
    if !realm.chars().all(allowed) {
        return Err(ValidationError::Format(
            "Realm contains invalid characters".to_string(),
        ));
    }
    Ok(())
}
