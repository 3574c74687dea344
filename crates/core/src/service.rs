//! EndorsementService: upsert, lookups, listings and delete over the store capability.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::access::Caller;
use crate::error::{EndorsementError, Result};
use crate::page::{Page, PageRequest};
use crate::ports::{AccessControl, EndorsementStore};
use crate::types::{Endorsement, EndorsementList};

/// Stateless orchestration of the store and access-control capabilities.
///
/// Reads are open to everyone. Writes require access to the organization
/// named in the record, checked before the store is mutated.
#[derive(Clone)]
pub struct EndorsementService {
    store: Arc<dyn EndorsementStore>,
    access: Arc<dyn AccessControl>,
}

impl EndorsementService {
    /// Create a service over the given capabilities.
    pub fn new(store: Arc<dyn EndorsementStore>, access: Arc<dyn AccessControl>) -> Self {
        Self { store, access }
    }

    /// Create the endorsement for `(org_mrn, service_mrn)`, or re-assign its user.
    ///
    /// When a record already exists only `user_mrn` is replaced; its parent and
    /// service level are kept. Returns the persisted record.
    pub async fn create_or_update(
        &self,
        caller: &Caller,
        input: Endorsement,
    ) -> Result<Endorsement> {
        require_mrn("orgMrn", &input.org_mrn)?;
        require_mrn("serviceMrn", &input.service_mrn)?;
        self.authorize(caller, &input.org_mrn)?;

        let existing = self
            .store
            .find_by_org_and_service(&input.org_mrn, &input.service_mrn)
            .await?;

        let to_save = match existing {
            Some(mut existing) => {
                debug!(
                    org_mrn = %input.org_mrn,
                    service_mrn = %input.service_mrn,
                    "Re-assigning endorsed user"
                );
                existing.user_mrn = input.user_mrn;
                existing
            }
            None => {
                debug!(
                    org_mrn = %input.org_mrn,
                    service_mrn = %input.service_mrn,
                    "Creating endorsement"
                );
                Endorsement {
                    id: None,
                    created_at: None,
                    updated_at: None,
                    ..input
                }
            }
        };

        Ok(self.store.save(&to_save).await?)
    }

    /// Fetch one endorsement by its identity key.
    pub async fn get_by_key(&self, org_mrn: &str, service_mrn: &str) -> Result<Endorsement> {
        self.store
            .find_by_org_and_service(org_mrn, service_mrn)
            .await?
            .ok_or(EndorsementError::NotFound)
    }

    /// Endorsements for a service.
    pub async fn list_by_service(
        &self,
        service_mrn: &str,
        page: PageRequest,
    ) -> Result<Page<Endorsement>> {
        Ok(self.store.list_by_service(service_mrn, page).await?)
    }

    /// One `EndorsementList` per input MRN, in input order, duplicates kept.
    ///
    /// `None` and an empty slice both return an empty vector without touching the store.
    pub async fn list_by_services(
        &self,
        service_mrns: Option<&[String]>,
    ) -> Result<Vec<EndorsementList>> {
        let Some(service_mrns) = service_mrns.filter(|mrns| !mrns.is_empty()) else {
            return Ok(Vec::new());
        };

        let mut lists = Vec::with_capacity(service_mrns.len());
        for service_mrn in service_mrns {
            let endorsements = self.store.list_all_by_service(service_mrn).await?;
            lists.push(EndorsementList {
                service_mrn: service_mrn.clone(),
                endorsements,
            });
        }
        Ok(lists)
    }

    /// Endorsements an organization issued at a service level.
    pub async fn list_by_org_and_level(
        &self,
        org_mrn: &str,
        service_level: &str,
        page: PageRequest,
    ) -> Result<Page<Endorsement>> {
        Ok(self
            .store
            .list_by_org_and_level(org_mrn, service_level, page)
            .await?)
    }

    /// Endorsed children of a parent MRN.
    pub async fn list_by_parent(
        &self,
        parent_mrn: &str,
        page: PageRequest,
    ) -> Result<Page<Endorsement>> {
        Ok(self.store.list_by_parent(parent_mrn, page).await?)
    }

    /// Endorsed children of a parent MRN, issued by one organization.
    pub async fn list_by_parent_and_org(
        &self,
        parent_mrn: &str,
        org_mrn: &str,
        page: PageRequest,
    ) -> Result<Page<Endorsement>> {
        Ok(self
            .store
            .list_by_parent_and_org(parent_mrn, org_mrn, page)
            .await?)
    }

    /// Delete the endorsement for `(org_mrn, service_mrn)`.
    ///
    /// Existence is checked first (NotFound), then access (Forbidden).
    pub async fn delete(&self, caller: &Caller, org_mrn: &str, service_mrn: &str) -> Result<()> {
        let endorsement = self.get_by_key(org_mrn, service_mrn).await?;
        self.authorize(caller, org_mrn)?;

        self.store.delete(&endorsement).await?;
        debug!(org_mrn, service_mrn, "Deleted endorsement");
        Ok(())
    }

    fn authorize(&self, caller: &Caller, org_mrn: &str) -> Result<()> {
        if self.access.has_access_to_org(caller, org_mrn) {
            return Ok(());
        }
        warn!(
            org_mrn,
            caller_org = caller.org_mrn.as_deref().unwrap_or("-"),
            "Denied write to organization"
        );
        Err(EndorsementError::Forbidden {
            org_mrn: org_mrn.to_string(),
        })
    }
}

fn require_mrn(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(EndorsementError::InvalidInput(format!("{} is required", field)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::OrgMembershipAccess;
    use crate::memory::MemoryEndorsementStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const ORG_A: &str = "urn:mrn:org:A";
    const ORG_B: &str = "urn:mrn:org:B";
    const SERVICE_X: &str = "urn:mrn:service:X";

    /// Counts every store call before delegating to an in-memory store.
    #[derive(Default)]
    struct CountingStore {
        inner: MemoryEndorsementStore,
        calls: AtomicUsize,
    }

    impl CountingStore {
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn hit(&self) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl EndorsementStore for CountingStore {
        async fn find_by_org_and_service(
            &self,
            org_mrn: &str,
            service_mrn: &str,
        ) -> anyhow::Result<Option<Endorsement>> {
            self.hit();
            self.inner.find_by_org_and_service(org_mrn, service_mrn).await
        }

        async fn list_by_service(
            &self,
            service_mrn: &str,
            page: PageRequest,
        ) -> anyhow::Result<Page<Endorsement>> {
            self.hit();
            self.inner.list_by_service(service_mrn, page).await
        }

        async fn list_all_by_service(
            &self,
            service_mrn: &str,
        ) -> anyhow::Result<Vec<Endorsement>> {
            self.hit();
            self.inner.list_all_by_service(service_mrn).await
        }

        async fn list_by_org_and_level(
            &self,
            org_mrn: &str,
            service_level: &str,
            page: PageRequest,
        ) -> anyhow::Result<Page<Endorsement>> {
            self.hit();
            self.inner
                .list_by_org_and_level(org_mrn, service_level, page)
                .await
        }

        async fn list_by_parent(
            &self,
            parent_mrn: &str,
            page: PageRequest,
        ) -> anyhow::Result<Page<Endorsement>> {
            self.hit();
            self.inner.list_by_parent(parent_mrn, page).await
        }

        async fn list_by_parent_and_org(
            &self,
            parent_mrn: &str,
            org_mrn: &str,
            page: PageRequest,
        ) -> anyhow::Result<Page<Endorsement>> {
            self.hit();
            self.inner
                .list_by_parent_and_org(parent_mrn, org_mrn, page)
                .await
        }

        async fn save(&self, endorsement: &Endorsement) -> anyhow::Result<Endorsement> {
            self.hit();
            self.inner.save(endorsement).await
        }

        async fn delete(&self, endorsement: &Endorsement) -> anyhow::Result<()> {
            self.hit();
            self.inner.delete(endorsement).await
        }
    }

    /// Store whose every call fails.
    struct BrokenStore;

    #[async_trait]
    impl EndorsementStore for BrokenStore {
        async fn find_by_org_and_service(
            &self,
            _: &str,
            _: &str,
        ) -> anyhow::Result<Option<Endorsement>> {
            anyhow::bail!("connection refused")
        }

        async fn list_by_service(
            &self,
            _: &str,
            _: PageRequest,
        ) -> anyhow::Result<Page<Endorsement>> {
            anyhow::bail!("connection refused")
        }

        async fn list_all_by_service(&self, _: &str) -> anyhow::Result<Vec<Endorsement>> {
            anyhow::bail!("connection refused")
        }

        async fn list_by_org_and_level(
            &self,
            _: &str,
            _: &str,
            _: PageRequest,
        ) -> anyhow::Result<Page<Endorsement>> {
            anyhow::bail!("connection refused")
        }

        async fn list_by_parent(
            &self,
            _: &str,
            _: PageRequest,
        ) -> anyhow::Result<Page<Endorsement>> {
            anyhow::bail!("connection refused")
        }

        async fn list_by_parent_and_org(
            &self,
            _: &str,
            _: &str,
            _: PageRequest,
        ) -> anyhow::Result<Page<Endorsement>> {
            anyhow::bail!("connection refused")
        }

        async fn save(&self, _: &Endorsement) -> anyhow::Result<Endorsement> {
            anyhow::bail!("connection refused")
        }

        async fn delete(&self, _: &Endorsement) -> anyhow::Result<()> {
            anyhow::bail!("connection refused")
        }
    }

    fn setup() -> (EndorsementService, Arc<CountingStore>) {
        let store = Arc::new(CountingStore::default());
        let service =
            EndorsementService::new(store.clone(), Arc::new(OrgMembershipAccess::default()));
        (service, store)
    }

    #[tokio::test]
    async fn test_create_then_update_keeps_single_record() {
        let (service, store) = setup();
        let caller = Caller::member_of(ORG_A);

        let created = service
            .create_or_update(&caller, Endorsement::new(ORG_A, SERVICE_X).with_user("u1"))
            .await
            .unwrap();
        assert_eq!(created.user_mrn.as_deref(), Some("u1"));

        let updated = service
            .create_or_update(&caller, Endorsement::new(ORG_A, SERVICE_X).with_user("u2"))
            .await
            .unwrap();
        assert_eq!(updated.user_mrn.as_deref(), Some("u2"));
        assert_eq!(updated.id, created.id);
        assert_eq!(store.inner.len().await, 1);

        let fetched = service.get_by_key(ORG_A, SERVICE_X).await.unwrap();
        assert_eq!(fetched, updated);
    }

    #[tokio::test]
    async fn test_update_only_touches_user_mrn() {
        let (service, _store) = setup();
        let caller = Caller::member_of(ORG_A);

        service
            .create_or_update(
                &caller,
                Endorsement::new(ORG_A, SERVICE_X)
                    .with_user("u1")
                    .with_parent("urn:mrn:org:P")
                    .with_service_level("gold"),
            )
            .await
            .unwrap();

        let updated = service
            .create_or_update(
                &caller,
                Endorsement::new(ORG_A, SERVICE_X)
                    .with_parent("urn:mrn:org:Other")
                    .with_service_level("bronze"),
            )
            .await
            .unwrap();

        assert_eq!(updated.user_mrn, None);
        assert_eq!(updated.parent_mrn.as_deref(), Some("urn:mrn:org:P"));
        assert_eq!(updated.service_level.as_deref(), Some("gold"));
    }

    #[tokio::test]
    async fn test_create_rejects_blank_keys_before_store_access() {
        let (service, store) = setup();
        let admin = Caller::anonymous().with_role(crate::access::DEFAULT_ADMIN_ROLE);

        let err = service
            .create_or_update(&admin, Endorsement::new("", SERVICE_X))
            .await
            .unwrap_err();
        assert!(matches!(err, EndorsementError::InvalidInput(_)));

        let err = service
            .create_or_update(&admin, Endorsement::new(ORG_A, "  "))
            .await
            .unwrap_err();
        assert!(matches!(err, EndorsementError::InvalidInput(_)));
        assert_eq!(store.calls(), 0);
    }

    #[tokio::test]
    async fn test_create_forbidden_leaves_store_untouched() {
        let (service, store) = setup();

        let err = service
            .create_or_update(
                &Caller::member_of(ORG_B),
                Endorsement::new(ORG_A, SERVICE_X).with_user("u1"),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, EndorsementError::Forbidden { ref org_mrn } if org_mrn == ORG_A));
        assert_eq!(store.calls(), 0);
        assert!(store.inner.is_empty().await);
    }

    #[tokio::test]
    async fn test_create_ignores_client_supplied_store_fields() {
        let (service, _store) = setup();
        let mut input = Endorsement::new(ORG_A, SERVICE_X);
        input.id = Some(999);

        let created = service
            .create_or_update(&Caller::member_of(ORG_A), input)
            .await
            .unwrap();
        assert_eq!(created.id, Some(1));
    }

    #[tokio::test]
    async fn test_get_by_key_not_found() {
        let (service, _store) = setup();
        let err = service.get_by_key(ORG_A, SERVICE_X).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_delete_flow() {
        let (service, store) = setup();
        let owner = Caller::member_of(ORG_A);

        service
            .create_or_update(&owner, Endorsement::new(ORG_A, SERVICE_X).with_user("u1"))
            .await
            .unwrap();

        let err = service
            .delete(&Caller::member_of(ORG_B), ORG_A, SERVICE_X)
            .await
            .unwrap_err();
        assert!(matches!(err, EndorsementError::Forbidden { .. }));
        assert_eq!(store.inner.len().await, 1);

        service.delete(&owner, ORG_A, SERVICE_X).await.unwrap();
        assert!(service
            .get_by_key(ORG_A, SERVICE_X)
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn test_delete_missing_reports_not_found_before_access() {
        let (service, _store) = setup();

        let err = service
            .delete(&Caller::anonymous(), ORG_A, SERVICE_X)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_list_by_services_empty_or_absent_skips_store() {
        let (service, store) = setup();

        assert!(service.list_by_services(None).await.unwrap().is_empty());
        assert!(service.list_by_services(Some(&[][..])).await.unwrap().is_empty());
        assert_eq!(store.calls(), 0);
    }

    #[tokio::test]
    async fn test_list_by_services_keeps_order_and_duplicates() {
        let (service, _store) = setup();
        let caller = Caller::member_of(ORG_A);
        service
            .create_or_update(&caller, Endorsement::new(ORG_A, "s1").with_user("u1"))
            .await
            .unwrap();
        service
            .create_or_update(&caller, Endorsement::new(ORG_A, "s2"))
            .await
            .unwrap();

        let input: Vec<String> = ["s1", "s1", "s2", "s3"].map(String::from).to_vec();
        let lists = service.list_by_services(Some(input.as_slice())).await.unwrap();

        assert_eq!(lists.len(), 4);
        assert_eq!(lists[0], lists[1]);
        assert_eq!(lists[0].endorsements.len(), 1);
        assert_eq!(lists[2].service_mrn, "s2");
        assert_eq!(lists[3].service_mrn, "s3");
        assert!(lists[3].endorsements.is_empty());
    }

    #[tokio::test]
    async fn test_hierarchical_and_level_listings() {
        let (service, _store) = setup();
        let admin = Caller::anonymous().with_role(crate::access::DEFAULT_ADMIN_ROLE);
        for (org, svc) in [(ORG_A, "s1"), (ORG_A, "s2"), (ORG_B, "s3")] {
            service
                .create_or_update(
                    &admin,
                    Endorsement::new(org, svc)
                        .with_parent("urn:mrn:org:P")
                        .with_service_level("gold"),
                )
                .await
                .unwrap();
        }

        let children = service
            .list_by_parent("urn:mrn:org:P", PageRequest::new(0, 2))
            .await
            .unwrap();
        assert_eq!(children.total_elements, 3);
        assert_eq!(children.content.len(), 2);

        let from_b = service
            .list_by_parent_and_org("urn:mrn:org:P", ORG_B, PageRequest::default())
            .await
            .unwrap();
        assert_eq!(from_b.content.len(), 1);

        let gold = service
            .list_by_org_and_level(ORG_A, "gold", PageRequest::default())
            .await
            .unwrap();
        assert_eq!(gold.total_elements, 2);

        let none = service
            .list_by_service("urn:mrn:service:unknown", PageRequest::default())
            .await
            .unwrap();
        assert!(none.empty);
    }

    #[tokio::test]
    async fn test_store_failure_propagates() {
        let service = EndorsementService::new(
            Arc::new(BrokenStore),
            Arc::new(OrgMembershipAccess::default()),
        );

        let err = service.get_by_key(ORG_A, SERVICE_X).await.unwrap_err();
        assert!(matches!(err, EndorsementError::Store(_)));

        let err = service
            .create_or_update(&Caller::member_of(ORG_A), Endorsement::new(ORG_A, SERVICE_X))
            .await
            .unwrap_err();
        assert!(matches!(err, EndorsementError::Store(_)));
    }
}
