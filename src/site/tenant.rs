//! Tenant identity: the key for every piece of per-site state.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A physical site belonging to an organization.
///
/// Created lazily the first time a session identifies itself and never
/// removed while the process runs.
///
/// # Examples
///
/// ```
/// use site_regulator::site::TenantLocation;
///
/// let tl = TenantLocation::new("Acme", "Roof").unwrap();
/// assert_eq!(tl.to_string(), "Acme/Roof");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TenantLocation {
    /// Owning organization (the `company` handshake field).
    pub organization: String,
    /// Physical site within the organization (the `location` handshake field).
    pub site: String,
}

impl TenantLocation {
    /// Builds a key from handshake fields, trimming surrounding whitespace.
    ///
    /// Returns `None` if either part is empty after trimming.
    pub fn new(organization: impl AsRef<str>, site: impl AsRef<str>) -> Option<Self> {
        let organization = organization.as_ref().trim();
        let site = site.as_ref().trim();
        if organization.is_empty() || site.is_empty() {
            return None;
        }
        Some(Self {
            organization: organization.to_string(),
            site: site.to_string(),
        })
    }
}

impl fmt::Display for TenantLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.organization, self.site)
    }
}
