//! Runtime tuning for transports and poll cycles.

use std::num::NonZeroU32;
use std::time::Duration;

/// How long PVE honours a ticket after issuing it.
pub const PVE_TICKET_VALIDITY: Duration = Duration::from_secs(2 * 60 * 60);

/// Default ticket reuse window, ten minutes short of [`PVE_TICKET_VALIDITY`]
/// so a request sent just before renewal still reaches PVE with a live ticket.
pub const DEFAULT_TICKET_LIFETIME: Duration = Duration::from_secs(110 * 60);

/// Token-bucket limits applied to every request of one transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub requests_per_second: NonZeroU32,
    pub burst_size: NonZeroU32,
}

/// Tuning knobs shared by the transport, the fetcher and the poller.
///
/// These are not part of a server's configuration surface; they apply to
/// every configured server alike.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorConfig {
    /// Upper bound on every single HTTP call. A timed-out call is a connection error.
    pub request_timeout: Duration,
    /// How long a password-mode ticket is reused before logging in again.
    /// Keep it below [`PVE_TICKET_VALIDITY`].
    pub ticket_lifetime: Duration,
    /// How many nodes are processed in parallel within one cycle.
    pub node_concurrency: usize,
    /// Fetch `status/current` for every guest to fill fields missing from the list.
    pub fetch_guest_details: bool,
    /// Consecutive failed cycles after which a server is reported unavailable.
    pub stale_threshold: u32,
    /// Optional request rate limit; `None` disables limiting.
    pub rate_limit: Option<RateLimitConfig>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(10),
            ticket_lifetime: DEFAULT_TICKET_LIFETIME,
            node_concurrency: 4,
            fetch_guest_details: false,
            stale_threshold: 3,
            rate_limit: None,
        }
    }
}

impl MonitorConfig {
    /// Node parallelism, never below one.
    pub(crate) fn effective_node_concurrency(&self) -> usize {
        self.node_concurrency.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MonitorConfig::default();
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.node_concurrency, 4);
        assert_eq!(config.stale_threshold, 3);
        assert!(config.rate_limit.is_none());
        assert!(!config.fetch_guest_details);
    }

    #[test]
    fn test_ticket_renewed_before_pve_expiry() {
        let config = MonitorConfig::default();
        assert_eq!(config.ticket_lifetime, Duration::from_secs(110 * 60));
        assert!(
            PVE_TICKET_VALIDITY - config.ticket_lifetime >= Duration::from_secs(5 * 60),
            "renewal margin too small"
        );
    }

    #[test]
    fn test_zero_concurrency_is_clamped() {
        let config = MonitorConfig {
            node_concurrency: 0,
            ..Default::default()
        };
        assert_eq!(config.effective_node_concurrency(), 1);
    }
}
