use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Role identifier.
///
/// Roles are intentionally opaque strings at this layer; the ledger only
/// cares about the well-known `admin` role for mutation eligibility.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    /// Administrators review donations and manage campaigns.
    pub fn admin() -> Self {
        Self(Cow::Borrowed("admin"))
    }

    /// Donors submit donations; they own nothing else in the ledger.
    pub fn donor() -> Self {
        Self(Cow::Borrowed("donor"))
    }

    /// Organizers front campaigns; campaign management still goes through
    /// administrators.
    pub fn organizer() -> Self {
        Self(Cow::Borrowed("organizer"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
