use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

use super::{TagId, TenantId};

/// A canonical tag record owned by storage.
///
/// Two tags are equal when they belong to the same tenant and carry the
/// same raw name; the storage id does not take part in the comparison.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub id: TagId,

    /// Name as supplied at creation, original casing preserved
    pub name: String,

    pub tenant_id: TenantId,

    /// Maintained by the tagging subsystem; read-only here
    pub usage_count: u64,

    pub created_at: DateTime<Utc>,
}

impl Tag {
    /// Build a fresh record with a new id and a zero usage count
    pub fn new(tenant_id: TenantId, name: impl Into<String>) -> Self {
        Self {
            id: TagId::new(),
            name: name.into(),
            tenant_id,
            usage_count: 0,
            created_at: Utc::now(),
        }
    }

    pub fn count(&self) -> u64 {
        self.usage_count
    }

    #[cfg(feature = "json")]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "id": self.id.as_str(),
            "name": self.name,
            "tenantId": self.tenant_id.as_str(),
            "usageCount": self.usage_count,
            "createdAt": self.created_at.to_rfc3339(),
        })
    }
}

impl PartialEq for Tag {
    fn eq(&self, other: &Self) -> bool {
        self.tenant_id == other.tenant_id && self.name == other.name
    }
}

impl Eq for Tag {}

impl Hash for Tag {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.tenant_id.hash(state);
        self.name.hash(state);
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_ignores_id() {
        let a = Tag::new(TenantId::from("acme"), "rust");
        let b = Tag::new(TenantId::from("acme"), "rust");
        assert_ne!(a.id, b.id);
        assert_eq!(a, b);
    }

    #[test]
    fn equality_is_tenant_scoped() {
        let a = Tag::new(TenantId::from("acme"), "rust");
        let b = Tag::new(TenantId::from("globex"), "rust");
        assert_ne!(a, b);
    }

    #[test]
    fn equality_is_case_exact() {
        let a = Tag::new(TenantId::from("acme"), "Rust");
        let b = Tag::new(TenantId::from("acme"), "rust");
        assert_ne!(a, b);
    }

    #[test]
    fn displays_name() {
        let tag = Tag::new(TenantId::from("acme"), "Ruby on Rails");
        assert_eq!(tag.to_string(), "Ruby on Rails");
        assert_eq!(tag.count(), 0);
    }

    #[cfg(feature = "json")]
    #[test]
    fn json_shape() {
        let tag = Tag::new(TenantId::from("acme"), "rust");
        let json = tag.to_json();
        assert_eq!(json["name"], "rust");
        assert_eq!(json["tenantId"], "acme");
        assert_eq!(json["usageCount"], 0);
    }
}
