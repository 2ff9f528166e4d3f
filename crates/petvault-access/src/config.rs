//! Access-control configuration.

/// Configuration for one-time codes and clinic grants.
#[derive(Debug, Clone)]
pub struct AccessConfig {
    /// One-time code lifetime in seconds (default: 600 = 10 minutes).
    pub otp_ttl_secs: u64,
    /// Wrong submissions before a code locks (default: 3).
    pub otp_max_attempts: u32,
    /// Re-reads allowed when a code changed underneath a validation.
    pub otp_cas_retries: u32,
    /// Grant lifetime when the caller does not ask for one (default: 24).
    pub default_grant_duration_hours: u32,
    /// Upper bound on a requested grant lifetime (default: 72).
    pub max_grant_duration_hours: u32,
    /// Extra activation attempts after a storage conflict (default: 1).
    pub activation_retries: u32,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            otp_ttl_secs: 600,
            otp_max_attempts: 3,
            otp_cas_retries: 3,
            default_grant_duration_hours: 24,
            max_grant_duration_hours: 72,
            activation_retries: 1,
        }
    }
}
