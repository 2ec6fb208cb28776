use crate::core::domain::error::ValidationError;
use crate::core::domain::value_object::{proxmox_host::ProxmoxHost, proxmox_port::ProxmoxPort};
use url::Url;

const API_PREFIX: &str = "api2/json";

/// The base URL of a PVE API endpoint (`https://host:port/`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxmoxUrl(Url);

impl ProxmoxUrl {
    /// Builds the HTTPS base URL for a host and port.
    pub(crate) fn from_parts(
        host: &ProxmoxHost,
        port: &ProxmoxPort,
    ) -> Result<Self, ValidationError> {
        Self::parse(&format!("https://{}:{}/", host.as_str(), port.get()))
    }

    /// Parses an explicit base URL.
    pub(crate) fn parse(raw: &str) -> Result<Self, ValidationError> {
        validate_url(raw)?;
        let url = Url::parse(raw)
            .map_err(|e| ValidationError::Format(format!("Invalid URL format: {}", e)))?;
        Ok(Self(url))
    }

    /// Returns the base URL.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Returns the full URL of an API path (`/nodes` → `…/api2/json/nodes`).
    #[must_use]
    pub fn api_endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}/{}",
            self.0.as_str().trim_end_matches('/'),
            API_PREFIX,
            path.trim_start_matches('/')
        )
    }
}

/// Validates a base URL: http(s) scheme, a host, and nothing past the root path.
pub(crate) fn validate_url(raw: &str) -> Result<(), ValidationError> {
    if raw.is_empty() {
        return Err(ValidationError::Field {
            field: "url".to_string(),
            message: "URL cannot be empty".to_string(),
        });
    }
    let url =
        Url::parse(raw).map_err(|e| ValidationError::Format(format!("Invalid URL format: {}", e)))?;
    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(ValidationError::ConstraintViolation(format!(
            "Invalid scheme '{}'. Must be one of: https, http",
            url.scheme()
        )));
    }
    if url.host_str().is_none() {
        return Err(ValidationError::Field {
            field: "url".to_string(),
            message: "URL must contain a host".to_string(),
        });
    }
    if url.path() != "/" {
        return Err(ValidationError::ConstraintViolation(
            "Base URL must not carry a path".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_composition() {
        let host = ProxmoxHost::new_unchecked("proxmox.example.com".to_string());
        let port = ProxmoxPort::new_unchecked(8006);
        let url = ProxmoxUrl::from_parts(&host, &port).unwrap();
        assert_eq!(url.as_str(), "https://proxmox.example.com:8006/");
        assert_eq!(
            url.api_endpoint("/nodes/pve1/qemu"),
            "https://proxmox.example.com:8006/api2/json/nodes/pve1/qemu"
        );
        assert_eq!(
            url.api_endpoint("version"),
            "https://proxmox.example.com:8006/api2/json/version"
        );
    }

    #[test]
    fn test_invalid_urls() {
        assert!(validate_url("").is_err());
        assert!(validate_url("ftp://pve:8006/").is_err());
        assert!(validate_url("https://pve:8006/api2/json").is_err());
        assert!(validate_url("not a url").is_err());
    }

    #[test]
    fn test_plain_http_allowed_for_explicit_urls() {
        let url = ProxmoxUrl::parse("http://127.0.0.1:4321/").unwrap();
        assert_eq!(url.api_endpoint("nodes"), "http://127.0.0.1:4321/api2/json/nodes");
    }
}
