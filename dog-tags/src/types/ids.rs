use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a tag, assigned by storage
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TagId(pub String);

impl TagId {
    /// Generate a new unique tag ID
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TagId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TagId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for TagId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for TagId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Opaque tenant (company) identifier; part of every uniqueness scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TenantId(pub String);

impl TenantId {
    pub fn new<S: Into<String>>(tenant: S) -> Self {
        Self(tenant.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for TenantId {
    fn from(tenant: String) -> Self {
        Self(tenant)
    }
}

impl From<&str> for TenantId {
    fn from(tenant: &str) -> Self {
        Self(tenant.to_string())
    }
}
