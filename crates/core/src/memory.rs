//! In-memory `EndorsementStore`.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::page::{paginate, Page, PageRequest};
use crate::ports::EndorsementStore;
use crate::types::Endorsement;

#[derive(Debug, Default)]
struct Inner {
    records: Vec<Endorsement>,
    next_id: i64,
}

/// Endorsement store held in process memory.
///
/// Records keep insertion order, which is also the listing order.
/// Clones share the same records.
#[derive(Debug, Clone, Default)]
pub struct MemoryEndorsementStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryEndorsementStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.inner.read().await.records.len()
    }

    /// Whether the store holds no records.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Snapshot of every record.
    pub async fn all(&self) -> Vec<Endorsement> {
        self.inner.read().await.records.clone()
    }

    async fn filtered(&self, pred: impl Fn(&Endorsement) -> bool) -> Vec<Endorsement> {
        self.inner
            .read()
            .await
            .records
            .iter()
            .filter(|&e| pred(e))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl EndorsementStore for MemoryEndorsementStore {
    async fn find_by_org_and_service(
        &self,
        org_mrn: &str,
        service_mrn: &str,
    ) -> anyhow::Result<Option<Endorsement>> {
        let inner = self.inner.read().await;
        Ok(inner
            .records
            .iter()
            .find(|e| e.has_key(org_mrn, service_mrn))
            .cloned())
    }

    async fn list_by_service(
        &self,
        service_mrn: &str,
        page: PageRequest,
    ) -> anyhow::Result<Page<Endorsement>> {
        let matches = self.filtered(|e| e.service_mrn == service_mrn).await;
        Ok(paginate(&matches, page))
    }

    async fn list_all_by_service(&self, service_mrn: &str) -> anyhow::Result<Vec<Endorsement>> {
        Ok(self.filtered(|e| e.service_mrn == service_mrn).await)
    }

    async fn list_by_org_and_level(
        &self,
        org_mrn: &str,
        service_level: &str,
        page: PageRequest,
    ) -> anyhow::Result<Page<Endorsement>> {
        let matches = self
            .filtered(|e| e.org_mrn == org_mrn && e.service_level.as_deref() == Some(service_level))
            .await;
        Ok(paginate(&matches, page))
    }

    async fn list_by_parent(
        &self,
        parent_mrn: &str,
        page: PageRequest,
    ) -> anyhow::Result<Page<Endorsement>> {
        let matches = self
            .filtered(|e| e.parent_mrn.as_deref() == Some(parent_mrn))
            .await;
        Ok(paginate(&matches, page))
    }

    async fn list_by_parent_and_org(
        &self,
        parent_mrn: &str,
        org_mrn: &str,
        page: PageRequest,
    ) -> anyhow::Result<Page<Endorsement>> {
        let matches = self
            .filtered(|e| e.parent_mrn.as_deref() == Some(parent_mrn) && e.org_mrn == org_mrn)
            .await;
        Ok(paginate(&matches, page))
    }

    async fn save(&self, endorsement: &Endorsement) -> anyhow::Result<Endorsement> {
        let now = Utc::now();
        let mut inner = self.inner.write().await;

        if let Some(existing) = inner
            .records
            .iter_mut()
            .find(|e| e.has_key(&endorsement.org_mrn, &endorsement.service_mrn))
        {
            existing.user_mrn = endorsement.user_mrn.clone();
            existing.parent_mrn = endorsement.parent_mrn.clone();
            existing.service_level = endorsement.service_level.clone();
            existing.updated_at = Some(now);
            return Ok(existing.clone());
        }

        inner.next_id += 1;
        let stored = Endorsement {
            id: Some(inner.next_id),
            created_at: Some(now),
            updated_at: Some(now),
            ..endorsement.clone()
        };
        inner.records.push(stored.clone());
        Ok(stored)
    }

    async fn delete(&self, endorsement: &Endorsement) -> anyhow::Result<()> {
        let mut inner = self.inner.write().await;
        let before = inner.records.len();
        inner
            .records
            .retain(|e| !e.has_key(&endorsement.org_mrn, &endorsement.service_mrn));
        anyhow::ensure!(
            inner.records.len() < before,
            "No endorsement stored for org {} and service {}",
            endorsement.org_mrn,
            endorsement.service_mrn
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_assigns_id_and_updates_in_place() {
        let store = MemoryEndorsementStore::new();

        let first = store
            .save(&Endorsement::new("org", "svc").with_user("u1"))
            .await
            .unwrap();
        assert_eq!(first.id, Some(1));
        assert!(first.created_at.is_some());

        let second = store
            .save(&Endorsement::new("org", "svc").with_user("u2"))
            .await
            .unwrap();
        assert_eq!(second.id, Some(1));
        assert_eq!(second.user_mrn.as_deref(), Some("u2"));
        assert_eq!(second.created_at, first.created_at);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_delete_missing_record_fails() {
        let store = MemoryEndorsementStore::new();
        assert!(store.delete(&Endorsement::new("org", "svc")).await.is_err());
    }

    #[tokio::test]
    async fn test_listings_filter_on_secondary_keys() {
        let store = MemoryEndorsementStore::new();
        for (org, svc, level, parent) in [
            ("A", "s1", "gold", "p1"),
            ("A", "s2", "gold", "p2"),
            ("B", "s1", "silver", "p1"),
        ] {
            store
                .save(
                    &Endorsement::new(org, svc)
                        .with_service_level(level)
                        .with_parent(parent),
                )
                .await
                .unwrap();
        }

        let by_service = store
            .list_by_service("s1", PageRequest::default())
            .await
            .unwrap();
        assert_eq!(by_service.total_elements, 2);

        let gold = store
            .list_by_org_and_level("A", "gold", PageRequest::default())
            .await
            .unwrap();
        assert_eq!(gold.total_elements, 2);

        let children = store
            .list_by_parent_and_org("p1", "B", PageRequest::default())
            .await
            .unwrap();
        assert_eq!(children.content.len(), 1);
        assert_eq!(children.content[0].service_mrn, "s1");
    }
}
