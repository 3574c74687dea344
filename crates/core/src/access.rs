//! Caller identity and the organization-membership access policy.

use serde::{Deserialize, Serialize};

use crate::ports::AccessControl;

/// Role granting access to every organization.
pub const DEFAULT_ADMIN_ROLE: &str = "ROLE_SITE_ADMIN";

/// An authenticated caller, as verified upstream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Caller {
    /// MRN of the organization the caller belongs to.
    pub org_mrn: Option<String>,
    /// MRN of the caller.
    pub user_mrn: Option<String>,
    /// Granted roles.
    #[serde(default)]
    pub roles: Vec<String>,
}

impl Caller {
    /// A caller with no organization and no roles.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// A member of `org_mrn`.
    pub fn member_of(org_mrn: impl Into<String>) -> Self {
        Self {
            org_mrn: Some(org_mrn.into()),
            ..Self::default()
        }
    }

    /// Add a role.
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.push(role.into());
        self
    }

    /// Whether the caller holds `role`.
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

/// Grants access to members of the target organization and to site administrators.
///
/// MRNs compare ASCII case-insensitively.
#[derive(Debug, Clone)]
pub struct OrgMembershipAccess {
    admin_role: String,
}

impl OrgMembershipAccess {
    /// Policy with a custom administrator role.
    pub fn new(admin_role: impl Into<String>) -> Self {
        Self {
            admin_role: admin_role.into(),
        }
    }
}

impl Default for OrgMembershipAccess {
    fn default() -> Self {
        Self::new(DEFAULT_ADMIN_ROLE)
    }
}

impl AccessControl for OrgMembershipAccess {
    fn has_access_to_org(&self, caller: &Caller, org_mrn: &str) -> bool {
        let org_mrn = org_mrn.trim();
        if org_mrn.is_empty() {
            return false;
        }
        if caller.has_role(&self.admin_role) {
            return true;
        }
        caller
            .org_mrn
            .as_deref()
            .is_some_and(|own| own.trim().eq_ignore_ascii_case(org_mrn))
    }
}
