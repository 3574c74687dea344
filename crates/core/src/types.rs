//! Core types for endorsements.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An organization vouching for a service, optionally narrowed to a user.
///
/// The pair `(org_mrn, service_mrn)` identifies the record: at most one
/// endorsement exists per organization/service combination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Endorsement {
    /// Store-assigned surrogate key (absent until persisted).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,

    /// MRN of the endorsing organization.
    #[serde(default)]
    pub org_mrn: String,

    /// MRN of the endorsed service.
    #[serde(default)]
    pub service_mrn: String,

    /// MRN of the user the endorsement narrows to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_mrn: Option<String>,

    /// MRN of the parent service or organization.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_mrn: Option<String>,

    /// Classification tag used for org-scoped listing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_level: Option<String>,

    /// Set by the store on insert.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    /// Refreshed by the store on every write.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Endorsement {
    /// Create an unpersisted endorsement for an organization/service pair.
    pub fn new(org_mrn: impl Into<String>, service_mrn: impl Into<String>) -> Self {
        Self {
            id: None,
            org_mrn: org_mrn.into(),
            service_mrn: service_mrn.into(),
            user_mrn: None,
            parent_mrn: None,
            service_level: None,
            created_at: None,
            updated_at: None,
        }
    }

    /// Narrow the endorsement to a user.
    pub fn with_user(mut self, user_mrn: impl Into<String>) -> Self {
        self.user_mrn = Some(user_mrn.into());
        self
    }

    /// Attach a parent MRN.
    pub fn with_parent(mut self, parent_mrn: impl Into<String>) -> Self {
        self.parent_mrn = Some(parent_mrn.into());
        self
    }

    /// Attach a service level.
    pub fn with_service_level(mut self, service_level: impl Into<String>) -> Self {
        self.service_level = Some(service_level.into());
        self
    }

    /// Whether this record has the given identity key.
    pub fn has_key(&self, org_mrn: &str, service_mrn: &str) -> bool {
        self.org_mrn == org_mrn && self.service_mrn == service_mrn
    }
}

/// A service MRN together with every endorsement currently matching it.
///
/// Built on demand for batch lookups; never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndorsementList {
    /// The service the endorsements refer to.
    pub service_mrn: String,

    /// Matching endorsements in store order.
    pub endorsements: Vec<Endorsement>,
}
