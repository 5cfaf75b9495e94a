//! Lifecycle configuration from environment variables.
//!
//! All variables are optional; defaults suit an interactive deployment.
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | `CIVIS_LOCK_TTL_SECS` | `300` | Soft edit-lock lifetime in seconds |
//! | `CIVIS_CLAIM_WINDOW_DAYS` | `30` | Days after closure during which claims are accepted; `0` disables the limit |
//! | `CIVIS_REQUIRE_APPLICANT` | `false` | Require an identified applicant for every theme |

use std::time::Duration;

use crate::error::{Error, Result};

/// Smallest accepted edit-lock TTL.
const MIN_LOCK_TTL_SECS: u64 = 5;

/// Largest accepted edit-lock TTL (one hour).
const MAX_LOCK_TTL_SECS: u64 = 3600;

/// Largest accepted claim window (one year).
const MAX_CLAIM_WINDOW_DAYS: u32 = 365;

/// Runtime configuration for the record lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleConfig {
    /// Soft edit-lock lifetime in seconds.
    pub lock_ttl_secs: u64,

    /// Days after closure during which claims are accepted.
    /// Zero disables the window check.
    pub claim_window_days: u32,

    /// When set, every theme behaves as if it required an identified
    /// applicant, regardless of the theme's own flag.
    pub require_applicant: bool,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            lock_ttl_secs: 300,
            claim_window_days: 30,
            require_applicant: false,
        }
    }
}

impl LifecycleConfig {
    /// Loads configuration from the environment, falling back to
    /// defaults for unset variables.
    ///
    /// # Errors
    ///
    /// Returns a validation error naming the variable when a value does
    /// not parse or falls outside its accepted range.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(raw) = env_string("CIVIS_LOCK_TTL_SECS") {
            config.lock_ttl_secs = parse_u64("CIVIS_LOCK_TTL_SECS", &raw)?;
        }
        if let Some(raw) = env_string("CIVIS_CLAIM_WINDOW_DAYS") {
            let days = parse_u64("CIVIS_CLAIM_WINDOW_DAYS", &raw)?;
            config.claim_window_days = u32::try_from(days).map_err(|_| {
                Error::validation(format!(
                    "CIVIS_CLAIM_WINDOW_DAYS value '{raw}' is out of range"
                ))
            })?;
        }
        if let Some(raw) = env_string("CIVIS_REQUIRE_APPLICANT") {
            config.require_applicant = parse_bool("CIVIS_REQUIRE_APPLICANT", &raw)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Checks every value against its accepted range.
    pub fn validate(&self) -> Result<()> {
        if self.lock_ttl_secs < MIN_LOCK_TTL_SECS || self.lock_ttl_secs > MAX_LOCK_TTL_SECS {
            return Err(Error::validation(format!(
                "CIVIS_LOCK_TTL_SECS must be between {MIN_LOCK_TTL_SECS} and {MAX_LOCK_TTL_SECS}, got {}",
                self.lock_ttl_secs
            )));
        }
        if self.claim_window_days > MAX_CLAIM_WINDOW_DAYS {
            return Err(Error::validation(format!(
                "CIVIS_CLAIM_WINDOW_DAYS must be at most {MAX_CLAIM_WINDOW_DAYS}, got {}",
                self.claim_window_days
            )));
        }
        Ok(())
    }

    /// The edit-lock lifetime as a duration.
    #[must_use]
    pub const fn lock_ttl(&self) -> Duration {
        Duration::from_secs(self.lock_ttl_secs)
    }

    /// The claim window as a duration, or `None` when disabled.
    #[must_use]
    pub fn claim_window(&self) -> Option<chrono::Duration> {
        if self.claim_window_days == 0 {
            None
        } else {
            Some(chrono::Duration::days(i64::from(self.claim_window_days)))
        }
    }
}

/// Reads an environment variable, treating empty or whitespace-only
/// values as unset.
fn env_string(key: &str) -> Option<String> {
    match std::env::var(key) {
        Ok(value) => {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Err(_) => None,
    }
}

fn parse_u64(key: &str, raw: &str) -> Result<u64> {
    raw.parse().map_err(|_| {
        Error::validation(format!("{key} value '{raw}' is not a non-negative integer"))
    })
}

fn parse_bool(key: &str, raw: &str) -> Result<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "y" => Ok(true),
        "false" | "0" | "no" | "n" => Ok(false),
        _ => Err(Error::validation(format!(
            "{key} value '{raw}' is not a boolean"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = LifecycleConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.lock_ttl(), Duration::from_secs(300));
        assert_eq!(config.claim_window(), Some(chrono::Duration::days(30)));
    }

    #[test]
    fn zero_claim_window_disables_the_limit() {
        let config = LifecycleConfig {
            claim_window_days: 0,
            ..LifecycleConfig::default()
        };
        assert!(config.validate().is_ok());
        assert_eq!(config.claim_window(), None);
    }

    #[test]
    fn lock_ttl_bounds_are_enforced() {
        let too_small = LifecycleConfig {
            lock_ttl_secs: 1,
            ..LifecycleConfig::default()
        };
        let err = too_small.validate().unwrap_err();
        assert!(err.to_string().contains("CIVIS_LOCK_TTL_SECS"));

        let too_large = LifecycleConfig {
            lock_ttl_secs: 7200,
            ..LifecycleConfig::default()
        };
        assert!(too_large.validate().is_err());
    }

    #[test]
    fn claim_window_upper_bound_is_enforced() {
        let config = LifecycleConfig {
            claim_window_days: 1000,
            ..LifecycleConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("CIVIS_CLAIM_WINDOW_DAYS"));
    }

    #[test]
    fn parse_bool_accepts_common_spellings() {
        for raw in ["true", "1", "yes", "Y"] {
            assert!(parse_bool("X", raw).unwrap());
        }
        for raw in ["false", "0", "no", "N"] {
            assert!(!parse_bool("X", raw).unwrap());
        }
        assert!(parse_bool("X", "maybe").is_err());
    }

    #[test]
    fn parse_u64_rejects_garbage() {
        assert!(parse_u64("X", "12").is_ok());
        assert!(parse_u64("X", "-3").is_err());
        assert!(parse_u64("X", "soon").is_err());
    }
}
