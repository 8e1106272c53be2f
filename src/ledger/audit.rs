//! Audit trail recorder
//!
//! Entries are append-only and carry an `expires_at` set from the configured
//! retention period. Expired entries stay readable until `purge_expired`
//! runs; nothing is deleted on read.

use chrono::{DateTime, Months, Utc};
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use tracing::info;

use crate::config::LedgerConfig;
use crate::traits::AuditStore;
use crate::types::*;

/// Origin recorded for system-initiated changes
pub const SYSTEM_ORIGIN: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

/// Records and queries audit entries
pub struct AuditTrail<A: AuditStore> {
    store: A,
    config: Arc<LedgerConfig>,
}

impl<A: AuditStore> AuditTrail<A> {
    pub fn new(store: A, config: Arc<LedgerConfig>) -> Self {
        Self { store, config }
    }

    /// Expiry for an entry created at `created_at`
    pub fn expiry_for(&self, created_at: DateTime<Utc>) -> LedgerResult<DateTime<Utc>> {
        created_at
            .checked_add_months(Months::new(self.config.audit_retention_months()?))
            .ok_or_else(|| {
                LedgerError::PreconditionFailed(format!(
                    "audit retention from {} is out of range",
                    created_at
                ))
            })
    }

    /// Build an entry without writing it, for stores that commit it
    /// alongside the change it describes
    pub fn entry(
        &self,
        auditable: AuditableRef,
        action: &str,
        changes: serde_json::Value,
        user_id: Option<&str>,
        remote_address: IpAddr,
        now: DateTime<Utc>,
    ) -> LedgerResult<AuditEntry> {
        Ok(AuditEntry {
            id: uuid::Uuid::new_v4().to_string(),
            auditable,
            action: action.to_string(),
            audited_changes: changes.to_string(),
            user_id: user_id.map(str::to_string),
            remote_address,
            created_at: now,
            expires_at: self.expiry_for(now)?,
        })
    }

    /// Append an entry for a compliance-relevant change
    pub async fn record(
        &self,
        auditable: AuditableRef,
        action: &str,
        changes: serde_json::Value,
        user_id: Option<&str>,
        remote_address: IpAddr,
        now: DateTime<Utc>,
    ) -> LedgerResult<AuditEntry> {
        let entry = self.entry(auditable, action, changes, user_id, remote_address, now)?;
        self.store.append(&entry).await?;
        Ok(entry)
    }

    /// Entries past their retention period
    pub async fn expired(&self, now: DateTime<Utc>) -> LedgerResult<Vec<AuditEntry>> {
        self.store.expiring_before(now).await
    }

    /// Entries still under retention, including those expiring exactly now
    pub async fn for_retention(&self, now: DateTime<Utc>) -> LedgerResult<Vec<AuditEntry>> {
        self.store.expiring_from(now).await
    }

    /// Delete entries whose `expires_at` is strictly before `now`
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> LedgerResult<usize> {
        let purged = self.store.delete_expiring_before(now).await?;
        info!(purged, cutoff = %now, "Purged expired audit entries");
        Ok(purged)
    }

    /// Every entry recorded against an entity
    pub async fn entries_for(&self, auditable: &AuditableRef) -> LedgerResult<Vec<AuditEntry>> {
        self.store.entries_for(auditable).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::memory_storage::MemoryStorage;
    use chrono::{Duration, TimeZone};

    fn trail(storage: MemoryStorage) -> AuditTrail<MemoryStorage> {
        AuditTrail::new(storage, Arc::new(LedgerConfig::default()))
    }

    #[tokio::test]
    async fn test_record_sets_seven_year_expiry() {
        let trail = trail(MemoryStorage::new());
        let now = Utc.with_ymd_and_hms(2024, 2, 29, 12, 0, 0).unwrap();

        let entry = trail
            .record(
                AuditableRef::transaction("t1"),
                "financial_transaction_created",
                serde_json::json!({ "amount_cents": 15000 }),
                Some("user-1"),
                SYSTEM_ORIGIN,
                now,
            )
            .await
            .unwrap();

        // Leap day clamps to the end of February
        assert_eq!(entry.expires_at, Utc.with_ymd_and_hms(2031, 2, 28, 12, 0, 0).unwrap());
        assert_eq!(entry.parsed_changes()["amount_cents"], 15000);
        assert_eq!(
            trail.entries_for(&AuditableRef::transaction("t1")).await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn test_purge_keeps_entries_expiring_now() {
        let storage = MemoryStorage::new();
        let trail = trail(storage.clone());
        let created = Utc.with_ymd_and_hms(2017, 1, 1, 0, 0, 0).unwrap();

        for offset in [0, 1, 2] {
            trail
                .record(
                    AuditableRef::transaction(&format!("t{}", offset)),
                    "financial_transaction_created",
                    serde_json::json!({}),
                    None,
                    SYSTEM_ORIGIN,
                    created + Duration::seconds(offset),
                )
                .await
                .unwrap();
        }

        // The middle entry expires exactly now
        let now = trail.expiry_for(created + Duration::seconds(1)).unwrap();
        assert_eq!(trail.expired(now).await.unwrap().len(), 1);
        assert_eq!(trail.for_retention(now).await.unwrap().len(), 2);

        assert_eq!(trail.purge_expired(now).await.unwrap(), 1);
        assert_eq!(storage.audit_entry_count().unwrap(), 2);
        assert!(trail.expired(now).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reads_never_delete() {
        let storage = MemoryStorage::new();
        let trail = trail(storage.clone());
        let created = Utc.with_ymd_and_hms(2010, 6, 1, 0, 0, 0).unwrap();

        trail
            .record(
                AuditableRef::transaction("old"),
                "financial_transaction_created",
                serde_json::json!({}),
                None,
                SYSTEM_ORIGIN,
                created,
            )
            .await
            .unwrap();

        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(trail.expired(now).await.unwrap().len(), 1);
        assert_eq!(trail.expired(now).await.unwrap().len(), 1);
        assert_eq!(storage.audit_entry_count().unwrap(), 1);
    }
}
