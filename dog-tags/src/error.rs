use thiserror::Error;

/// Result type for registry operations
pub type TagResult<T> = Result<T, TagError>;

/// Why a tag name was rejected before touching storage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidNameReason {
    /// Empty or whitespace-only
    Blank,
    /// Longer than the configured bound
    TooLong { max: usize },
}

impl std::fmt::Display for InvalidNameReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Blank => write!(f, "name can't be blank"),
            Self::TooLong { max } => write!(f, "name is too long (maximum is {} characters)", max),
        }
    }
}

/// Errors surfaced by the tag registry and its storage backends
#[derive(Error, Debug, Clone)]
pub enum TagError {
    #[error("Invalid tag name {name:?}: {reason}")]
    InvalidName {
        name: String,
        reason: InvalidNameReason,
    },

    /// Creation kept losing the uniqueness race until attempts ran out
    #[error("'{0}' has already been taken")]
    DuplicateTag(String),

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Operation aborted: {0}")]
    Aborted(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl TagError {
    pub fn blank(name: impl Into<String>) -> Self {
        Self::InvalidName {
            name: name.into(),
            reason: InvalidNameReason::Blank,
        }
    }

    pub fn too_long(name: impl Into<String>, max: usize) -> Self {
        Self::InvalidName {
            name: name.into(),
            reason: InvalidNameReason::TooLong { max },
        }
    }

    /// Check if this error came from name validation
    pub fn is_invalid_name(&self) -> bool {
        matches!(self, Self::InvalidName { .. })
    }

    /// Check if this error is the terminal outcome of exhausted retries
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::DuplicateTag(_))
    }
}

#[cfg(feature = "json")]
impl From<serde_json::Error> for TagError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_message_names_the_tag() {
        let err = TagError::DuplicateTag("rust".to_string());
        assert_eq!(err.to_string(), "'rust' has already been taken");
        assert!(err.is_duplicate());
    }

    #[test]
    fn too_long_reports_bound() {
        let err = TagError::too_long("x", 255);
        assert!(err.is_invalid_name());
        assert!(err.to_string().contains("maximum is 255"));
    }
}
