//! Permission names and permission-check requests.

use serde::{Deserialize, Serialize};

/// Permission to open a document.
pub const READ: &str = "Read";

/// Permission to see a document in listings. Queries are rewritten for it.
pub const BROWSE: &str = "Browse";

/// Permission to modify a document.
pub const WRITE: &str = "Write";

/// Everything the host knows about one permission check.
///
/// `resolved_permissions` are the compound permissions that imply
/// `permission` (e.g. `ReadWrite` for `Read`). `additional_principals` are
/// extra identities attached to the request, usually groups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionRequest {
    permission: String,
    resolved_permissions: Vec<String>,
    additional_principals: Vec<String>,
}

impl PermissionRequest {
    pub fn new(permission: impl Into<String>) -> Self {
        Self {
            permission: permission.into(),
            resolved_permissions: Vec::new(),
            additional_principals: Vec::new(),
        }
    }

    /// A `Read` request.
    pub fn read() -> Self {
        Self::new(READ)
    }

    /// A `Browse` request.
    pub fn browse() -> Self {
        Self::new(BROWSE)
    }

    pub fn with_resolved_permissions<I, S>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.resolved_permissions = permissions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_additional_principals<I, S>(mut self, principals: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.additional_principals = principals.into_iter().map(Into::into).collect();
        self
    }

    pub fn permission(&self) -> &str {
        &self.permission
    }

    pub fn resolved_permissions(&self) -> &[String] {
        &self.resolved_permissions
    }

    pub fn additional_principals(&self) -> &[String] {
        &self.additional_principals
    }

    /// The requested permission followed by every resolved permission.
    pub fn all_permissions(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.permission.as_str())
            .chain(self.resolved_permissions.iter().map(String::as_str))
    }
}
