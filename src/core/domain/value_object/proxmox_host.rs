use crate::core::domain::error::ValidationError;

const MAX_HOSTNAME_LENGTH: usize = 253;
const MAX_LABEL_LENGTH: usize = 63;

/// A validated Proxmox host address (hostname or IPv4 literal).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProxmoxHost(String);

impl ProxmoxHost {
    /// Creates a new host without validation.
    pub(crate) fn new_unchecked(host: String) -> Self {
        Self(host)
    }

    /// Returns the host as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ProxmoxHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

fn validate_label(label: &str) -> Result<(), ValidationError> {
    if label.is_empty() || label.len() > MAX_LABEL_LENGTH {
        return Err(ValidationError::Format(format!(
            "Label must be between 1 and {} characters",
            MAX_LABEL_LENGTH
        )));
    }

    if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(ValidationError::Format(
            "Label can only contain alphanumeric characters and hyphens".to_string(),
        ));
    }

    if label.starts_with('-') || label.ends_with('-') {
        return Err(ValidationError::Format(
            "Label cannot start or end with hyphen".to_string(),
        ));
    }

    Ok(())
}

/// Validates a hostname according to RFC 1035 label rules.
///
/// No DNS lookup is performed here; reachability is checked when the
/// transport authenticates.
pub(crate) fn validate_host(host: &str) -> Result<(), ValidationError> {
    if host.is_empty() {
        return Err(ValidationError::Field {
            field: "host".to_string(),
            message: "Host cannot be empty".to_string(),
        });
    }

    if host.len() > MAX_HOSTNAME_LENGTH {
        return Err(ValidationError::ConstraintViolation(format!(
            "Host length exceeds maximum of {} characters",
            MAX_HOSTNAME_LENGTH
        )));
    }

    for label in host.split('.') {
        validate_label(label)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_hostnames() {
        let valid_hosts = vec![
            "example.com",
            "sub.example.com",
            "example-domain.com",
            "123.example.com",
            "192.168.1.10",
            "pve",
        ];

        for host in valid_hosts {
            assert!(validate_host(host).is_ok(), "Host {} should be valid", host);
        }
    }

    #[test]
    fn test_invalid_hostnames() {
        let long_hostname = "a".repeat(254);
        let test_cases = vec![
            ("", "empty hostname"),
            (long_hostname.as_str(), "hostname too long"),
            ("-example.com", "starts with hyphen"),
            ("example-.com", "ends with hyphen"),
            ("exam@ple.com", "invalid character"),
            ("exam ple.com", "contains space"),
            (".example.com", "empty label"),
            ("example..com", "consecutive dots"),
        ];

        for (host, case) in test_cases {
            assert!(
                validate_host(host).is_err(),
                "Case '{}' should fail validation: {}",
                case,
                host
            );
        }
    }
}
