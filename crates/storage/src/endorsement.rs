//! Endorsement storage operations.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use endorsement_core::{Endorsement, EndorsementStore, Page, PageRequest};

use super::Storage;

const COLUMNS: &str = r#"
    id, org_mrn, service_mrn, user_mrn, parent_mrn, service_level,
    created_at_ms, updated_at_ms
"#;

/// Row from `endorsements`.
#[derive(Debug, sqlx::FromRow)]
struct DbEndorsement {
    id: i64,
    org_mrn: String,
    service_mrn: String,
    user_mrn: Option<String>,
    parent_mrn: Option<String>,
    service_level: Option<String>,
    created_at_ms: i64,
    updated_at_ms: i64,
}

impl From<DbEndorsement> for Endorsement {
    fn from(row: DbEndorsement) -> Self {
        Endorsement {
            id: Some(row.id),
            org_mrn: row.org_mrn,
            service_mrn: row.service_mrn,
            user_mrn: row.user_mrn,
            parent_mrn: row.parent_mrn,
            service_level: row.service_level,
            created_at: DateTime::from_timestamp_millis(row.created_at_ms),
            updated_at: DateTime::from_timestamp_millis(row.updated_at_ms),
        }
    }
}

impl Storage {
    /// Fetch one page of endorsements matching `filter`, ordered by id.
    ///
    /// `filter` is a fixed SQL predicate with one `?` per entry of `args`.
    async fn page_where(
        &self,
        filter: &str,
        args: &[&str],
        page: PageRequest,
    ) -> Result<Page<Endorsement>> {
        let count_sql = format!("SELECT COUNT(*) FROM endorsements WHERE {}", filter);
        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
        for arg in args {
            count_query = count_query.bind(*arg);
        }
        let total = count_query
            .fetch_one(&self.pool)
            .await
            .with_context(|| format!("Failed to count endorsements where {}", filter))?;

        let select_sql = format!(
            "SELECT {} FROM endorsements WHERE {} ORDER BY id ASC LIMIT ? OFFSET ?",
            COLUMNS, filter
        );
        let mut select_query = sqlx::query_as::<_, DbEndorsement>(&select_sql);
        for arg in args {
            select_query = select_query.bind(*arg);
        }
        let rows = select_query
            .bind(i64::from(page.size()))
            .bind(i64::try_from(page.offset()).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("Failed to list endorsements where {}", filter))?;

        let content = rows.into_iter().map(Endorsement::from).collect();
        Ok(Page::new(content, page, total as u64))
    }
}

#[async_trait]
impl EndorsementStore for Storage {
    async fn find_by_org_and_service(
        &self,
        org_mrn: &str,
        service_mrn: &str,
    ) -> Result<Option<Endorsement>> {
        let sql = format!(
            "SELECT {} FROM endorsements WHERE org_mrn = ? AND service_mrn = ?",
            COLUMNS
        );
        let row = sqlx::query_as::<_, DbEndorsement>(&sql)
            .bind(org_mrn)
            .bind(service_mrn)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch endorsement")?;

        Ok(row.map(Endorsement::from))
    }

    async fn list_by_service(
        &self,
        service_mrn: &str,
        page: PageRequest,
    ) -> Result<Page<Endorsement>> {
        self.page_where("service_mrn = ?", &[service_mrn], page)
            .await
    }

    async fn list_all_by_service(&self, service_mrn: &str) -> Result<Vec<Endorsement>> {
        let sql = format!(
            "SELECT {} FROM endorsements WHERE service_mrn = ? ORDER BY id ASC",
            COLUMNS
        );
        let rows = sqlx::query_as::<_, DbEndorsement>(&sql)
            .bind(service_mrn)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list endorsements by service")?;

        Ok(rows.into_iter().map(Endorsement::from).collect())
    }

    async fn list_by_org_and_level(
        &self,
        org_mrn: &str,
        service_level: &str,
        page: PageRequest,
    ) -> Result<Page<Endorsement>> {
        self.page_where(
            "org_mrn = ? AND service_level = ?",
            &[org_mrn, service_level],
            page,
        )
        .await
    }

    async fn list_by_parent(
        &self,
        parent_mrn: &str,
        page: PageRequest,
    ) -> Result<Page<Endorsement>> {
        self.page_where("parent_mrn = ?", &[parent_mrn], page).await
    }

    async fn list_by_parent_and_org(
        &self,
        parent_mrn: &str,
        org_mrn: &str,
        page: PageRequest,
    ) -> Result<Page<Endorsement>> {
        self.page_where("parent_mrn = ? AND org_mrn = ?", &[parent_mrn, org_mrn], page)
            .await
    }

    /// Single-statement upsert on `(org_mrn, service_mrn)`; concurrent writers are last-wins.
    async fn save(&self, endorsement: &Endorsement) -> Result<Endorsement> {
        let now_ms = Utc::now().timestamp_millis();
        let sql = format!(
            r#"
            INSERT INTO endorsements (
                org_mrn, service_mrn, user_mrn, parent_mrn, service_level,
                created_at_ms, updated_at_ms
            )
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(org_mrn, service_mrn)
            DO UPDATE SET
                user_mrn = excluded.user_mrn,
                parent_mrn = excluded.parent_mrn,
                service_level = excluded.service_level,
                updated_at_ms = excluded.updated_at_ms
            RETURNING {}
            "#,
            COLUMNS
        );

        let row = sqlx::query_as::<_, DbEndorsement>(&sql)
            .bind(endorsement.org_mrn.as_str())
            .bind(endorsement.service_mrn.as_str())
            .bind(endorsement.user_mrn.as_deref())
            .bind(endorsement.parent_mrn.as_deref())
            .bind(endorsement.service_level.as_deref())
            .bind(now_ms)
            .bind(now_ms)
            .fetch_one(&self.pool)
            .await
            .context("Failed to save endorsement")?;

        Ok(row.into())
    }

    async fn delete(&self, endorsement: &Endorsement) -> Result<()> {
        let result =
            sqlx::query("DELETE FROM endorsements WHERE org_mrn = ? AND service_mrn = ?")
                .bind(endorsement.org_mrn.as_str())
                .bind(endorsement.service_mrn.as_str())
                .execute(&self.pool)
                .await
                .context("Failed to delete endorsement")?;

        anyhow::ensure!(
            result.rows_affected() > 0,
            "No endorsement stored for org {} and service {}",
            endorsement.org_mrn,
            endorsement.service_mrn
        );
        Ok(())
    }
}
