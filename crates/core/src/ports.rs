//! Capabilities the endorsement service depends on.
//!
//! Both are held as `Arc<dyn Trait>` so the same service logic runs against
//! SQLite, the in-memory store, or test doubles.

use async_trait::async_trait;

use crate::access::Caller;
use crate::page::{Page, PageRequest};
use crate::types::Endorsement;

/// Persistence for endorsement records.
///
/// Paginated listings must return a stable order for identical inputs.
#[async_trait]
pub trait EndorsementStore: Send + Sync {
    /// Exact-key lookup.
    async fn find_by_org_and_service(
        &self,
        org_mrn: &str,
        service_mrn: &str,
    ) -> anyhow::Result<Option<Endorsement>>;

    /// Endorsements for a service, one page at a time.
    async fn list_by_service(
        &self,
        service_mrn: &str,
        page: PageRequest,
    ) -> anyhow::Result<Page<Endorsement>>;

    /// Every endorsement for a service.
    async fn list_all_by_service(&self, service_mrn: &str) -> anyhow::Result<Vec<Endorsement>>;

    /// Endorsements issued by an organization at a service level.
    async fn list_by_org_and_level(
        &self,
        org_mrn: &str,
        service_level: &str,
        page: PageRequest,
    ) -> anyhow::Result<Page<Endorsement>>;

    /// Endorsements whose parent is `parent_mrn`.
    async fn list_by_parent(
        &self,
        parent_mrn: &str,
        page: PageRequest,
    ) -> anyhow::Result<Page<Endorsement>>;

    /// Endorsements whose parent is `parent_mrn`, issued by `org_mrn`.
    async fn list_by_parent_and_org(
        &self,
        parent_mrn: &str,
        org_mrn: &str,
        page: PageRequest,
    ) -> anyhow::Result<Page<Endorsement>>;

    /// Insert, or update the record with the same `(org_mrn, service_mrn)` in place.
    ///
    /// Returns the persisted value including store-assigned fields.
    async fn save(&self, endorsement: &Endorsement) -> anyhow::Result<Endorsement>;

    /// Remove an existing record.
    async fn delete(&self, endorsement: &Endorsement) -> anyhow::Result<()>;
}

/// Decides whether a caller may act for an organization.
pub trait AccessControl: Send + Sync {
    /// True iff `caller` may act on behalf of `org_mrn`. Never fails.
    fn has_access_to_org(&self, caller: &Caller, org_mrn: &str) -> bool;
}
