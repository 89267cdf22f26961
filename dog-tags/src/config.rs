//! # Registry configuration
//!
//! [`RegistryConfig`] is a plain struct with sensible defaults. It can also
//! be layered from environment variables sharing a prefix, the same
//! convention DogRS apps use for their key/value config:
//!
//! ```bash
//! export DOGTAGS__CASE_SENSITIVITY=strict
//! export DOGTAGS__MAX_ATTEMPTS=5
//! ```
//!
//! ```rust
//! use dog_tags::{RegistryConfig, normalize::CaseSensitivity};
//!
//! let vars = vec![("DOGTAGS__CASE_SENSITIVITY".to_string(), "strict".to_string())];
//! let config = RegistryConfig::from_vars("DOGTAGS__", vars).unwrap();
//! assert_eq!(config.case_sensitivity, CaseSensitivity::StrictCaseMatch);
//! ```

use std::str::FromStr;
use std::time::Duration;

use crate::{normalize::CaseSensitivity, TagError, TagResult};

/// Attempts per name before giving up with `DuplicateTag`
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Maximum tag name length, in characters
pub const DEFAULT_MAX_NAME_LENGTH: usize = 255;

/// What a batch find-or-create does when one name exhausts its retries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatchFailurePolicy {
    /// Propagate the error; tags created earlier in the call stay committed
    #[default]
    AbortBatch,
    /// Leave the failed name out of the result and keep going
    SkipFailed,
}

impl FromStr for BatchFailurePolicy {
    type Err = TagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "abort" | "abort_batch" => Ok(Self::AbortBatch),
            "skip" | "skip_failed" => Ok(Self::SkipFailed),
            other => Err(TagError::InvalidConfig(format!(
                "unknown batch failure policy: {}",
                other
            ))),
        }
    }
}

/// Configuration for the tag registry
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Initial name comparison policy; changeable later through the registry's `CasePolicy`
    pub case_sensitivity: CaseSensitivity,
    /// Find-or-create attempts per name
    pub max_attempts: u32,
    pub max_name_length: usize,
    pub batch_failure: BatchFailurePolicy,
    /// Names of one batch resolved at the same time
    pub batch_concurrency: usize,
    /// Bound on each storage call when the caller supplied no deadline
    pub operation_timeout: Option<Duration>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            case_sensitivity: CaseSensitivity::CaseInsensitive,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            max_name_length: DEFAULT_MAX_NAME_LENGTH,
            batch_failure: BatchFailurePolicy::AbortBatch,
            batch_concurrency: 1,
            operation_timeout: None,
        }
    }
}

impl RegistryConfig {
    pub fn with_case_sensitivity(mut self, sensitivity: CaseSensitivity) -> Self {
        self.case_sensitivity = sensitivity;
        self
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub fn with_batch_failure(mut self, policy: BatchFailurePolicy) -> Self {
        self.batch_failure = policy;
        self
    }

    pub fn with_batch_concurrency(mut self, concurrency: usize) -> Self {
        self.batch_concurrency = concurrency;
        self
    }

    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = Some(timeout);
        self
    }

    /// Load overrides from the process environment
    pub fn from_env(prefix: &str) -> TagResult<Self> {
        Self::from_vars(prefix, std::env::vars())
    }

    /// Load overrides from `(key, value)` pairs whose key starts with `prefix`.
    ///
    /// Unknown keys are ignored; malformed values are an error.
    pub fn from_vars<I>(prefix: &str, vars: I) -> TagResult<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut config = Self::default();

        for (key, value) in vars {
            let Some(stripped) = key.strip_prefix(prefix) else {
                continue;
            };

            match stripped.to_ascii_uppercase().as_str() {
                "CASE_SENSITIVITY" => config.case_sensitivity = value.parse()?,
                "MAX_ATTEMPTS" => config.max_attempts = parse_number(&key, &value)?,
                "MAX_NAME_LENGTH" => config.max_name_length = parse_number(&key, &value)?,
                "BATCH_FAILURE" => config.batch_failure = value.parse()?,
                "BATCH_CONCURRENCY" => config.batch_concurrency = parse_number(&key, &value)?,
                "OPERATION_TIMEOUT_MS" => {
                    let millis: u64 = parse_number(&key, &value)?;
                    config.operation_timeout = Some(Duration::from_millis(millis));
                }
                _ => {}
            }
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> TagResult<()> {
        if self.max_attempts == 0 {
            return Err(TagError::InvalidConfig("max_attempts must be at least 1".to_string()));
        }
        if self.max_name_length == 0 {
            return Err(TagError::InvalidConfig("max_name_length must be at least 1".to_string()));
        }
        if self.batch_concurrency == 0 {
            return Err(TagError::InvalidConfig("batch_concurrency must be at least 1".to_string()));
        }
        Ok(())
    }
}

fn parse_number<T: FromStr>(key: &str, value: &str) -> TagResult<T> {
    value
        .trim()
        .parse::<T>()
        .map_err(|_| TagError::InvalidConfig(format!("{} expects a number, got {:?}", key, value)))
}
