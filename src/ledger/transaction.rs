//! Transaction recording pipeline
//!
//! `validate -> classify -> commit -> enqueue-reporting`, run under the
//! originating account's lock. The transaction and its audit entry are
//! committed in one storage call, so a reader never sees one without the
//! other.

use chrono::{DateTime, Utc};
use std::net::IpAddr;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::compliance::{ClassificationContext, ComplianceEngine};
use crate::ledger::account::AccountLocks;
use crate::ledger::audit::{AuditTrail, SYSTEM_ORIGIN};
use crate::traits::*;
use crate::types::*;
use crate::utils::clock::Clock;

/// Action recorded in the audit trail for every committed transaction
pub const TRANSACTION_CREATED_ACTION: &str = "financial_transaction_created";

/// Produces a transaction reference for a submission instant
pub type ReferenceGenerator = Box<dyn Fn(DateTime<Utc>) -> String + Send + Sync>;

/// `TXN-YYYYMMDD-<16 upper-case hex>`
pub fn generate_reference(now: DateTime<Utc>) -> String {
    let random = uuid::Uuid::new_v4().simple().to_string().to_uppercase();
    format!("TXN-{}-{}", now.format("%Y%m%d"), &random[..16])
}

/// A committed transaction together with its audit entry
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedTransaction {
    pub transaction: FinancialTransaction,
    pub audit_entry: AuditEntry,
}

/// Everything the rules need, loaded for one candidate
struct LoadedContext {
    organization: Organization,
    account: Account,
    counterparty: Option<Account>,
    user: User,
    recent_transactions: Vec<FinancialTransaction>,
    submitted_at: DateTime<Utc>,
}

impl LoadedContext {
    fn as_context(&self) -> ClassificationContext<'_> {
        ClassificationContext {
            organization: &self.organization,
            account: &self.account,
            counterparty: self.counterparty.as_ref(),
            user: &self.user,
            recent_transactions: &self.recent_transactions,
            submitted_at: self.submitted_at,
        }
    }
}

/// Records transactions through the compliance pipeline
pub struct TransactionRecorder<S: LedgerStorage + AuditStore> {
    storage: S,
    engine: ComplianceEngine,
    audit: AuditTrail<S>,
    locks: AccountLocks,
    clock: Arc<dyn Clock>,
    reporting: Option<Arc<dyn ReportingQueue>>,
    reference_generator: ReferenceGenerator,
}

impl<S: LedgerStorage + AuditStore> TransactionRecorder<S> {
    /// Create a new recorder
    pub fn new(
        storage: S,
        engine: ComplianceEngine,
        audit: AuditTrail<S>,
        locks: AccountLocks,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            storage,
            engine,
            audit,
            locks,
            clock,
            reporting: None,
            reference_generator: Box::new(generate_reference),
        }
    }

    /// Queue qualifying transactions for regulatory reporting
    pub fn with_reporting_queue(mut self, queue: Arc<dyn ReportingQueue>) -> Self {
        self.reporting = Some(queue);
        self
    }

    /// Replace the reference generator
    pub fn with_reference_generator(mut self, generator: ReferenceGenerator) -> Self {
        self.reference_generator = generator;
        self
    }

    async fn load_context(&self, candidate: &TransactionCandidate) -> LedgerResult<LoadedContext> {
        let account = self
            .storage
            .get_account(&candidate.account_id)
            .await?
            .ok_or_else(|| LedgerError::AccountNotFound(candidate.account_id.clone()))?;

        let organization = self
            .storage
            .get_organization(&account.organization_id)
            .await?
            .ok_or_else(|| LedgerError::OrganizationNotFound(account.organization_id.clone()))?;

        let counterparty = match &candidate.counterparty_account_id {
            Some(id) => Some(
                self.storage
                    .get_account(id)
                    .await?
                    .ok_or_else(|| LedgerError::AccountNotFound(id.clone()))?,
            ),
            None => None,
        };

        let user = self
            .storage
            .get_user(&candidate.created_by)
            .await?
            .ok_or_else(|| LedgerError::UserNotFound(candidate.created_by.clone()))?;

        let submitted_at = self.clock.now();
        let window_start = submitted_at - self.engine.config().suspicious_window()?;
        let recent_transactions = self
            .storage
            .account_transactions(&account.id, window_start, submitted_at)
            .await?;

        Ok(LoadedContext {
            organization,
            account,
            counterparty,
            user,
            recent_transactions,
            submitted_at,
        })
    }

    /// Classify a candidate against current state without recording it
    pub async fn validate_and_classify(
        &self,
        candidate: &TransactionCandidate,
    ) -> LedgerResult<Classification> {
        let loaded = self.load_context(candidate).await?;
        self.engine
            .validate_and_classify(candidate, &loaded.as_context())
    }

    /// Record a system-originated transaction
    pub async fn record_transaction(
        &self,
        candidate: TransactionCandidate,
    ) -> LedgerResult<RecordedTransaction> {
        self.record_transaction_from(candidate, SYSTEM_ORIGIN).await
    }

    /// Record a transaction submitted from `remote_address`.
    ///
    /// The actor is the candidate's `created_by` user.
    pub async fn record_transaction_from(
        &self,
        candidate: TransactionCandidate,
        remote_address: IpAddr,
    ) -> LedgerResult<RecordedTransaction> {
        let _guard = self.locks.acquire(&candidate.account_id).await?;

        let loaded = self.load_context(&candidate).await?;
        let classification = self
            .engine
            .validate_and_classify(&candidate, &loaded.as_context())?;

        let generated = candidate.reference.is_none();
        let reference = candidate
            .reference
            .clone()
            .unwrap_or_else(|| (self.reference_generator)(loaded.submitted_at));
        let mut transaction = FinancialTransaction::new(
            candidate,
            loaded.organization.id.clone(),
            reference,
            &classification,
            loaded.submitted_at,
        );

        let audit_entry = match self
            .commit(&mut transaction, generated, remote_address)
            .await
        {
            Ok(entry) => entry,
            Err(e) => {
                error!(
                    reference = %transaction.reference,
                    error = %e,
                    "Transaction commit failed"
                );
                return Err(e);
            }
        };

        self.enqueue_reporting(&transaction, &loaded.organization).await;

        info!(
            reference = %transaction.reference,
            account_id = %transaction.account_id,
            amount = %transaction.format_amount(),
            status = ?transaction.compliance_status,
            "Transaction recorded"
        );

        Ok(RecordedTransaction {
            transaction,
            audit_entry,
        })
    }

    fn audit_entry(
        &self,
        transaction: &FinancialTransaction,
        remote_address: IpAddr,
    ) -> LedgerResult<AuditEntry> {
        self.audit.entry(
            AuditableRef::transaction(&transaction.id),
            TRANSACTION_CREATED_ACTION,
            transaction.audit_changes(),
            Some(transaction.created_by.as_str()),
            remote_address,
            transaction.created_at,
        )
    }

    /// Commit with its audit entry, regenerating a system reference once on conflict
    async fn commit(
        &self,
        transaction: &mut FinancialTransaction,
        generated: bool,
        remote_address: IpAddr,
    ) -> LedgerResult<AuditEntry> {
        let entry = self.audit_entry(transaction, remote_address)?;
        match self.storage.commit_transaction(transaction, &entry).await {
            Ok(()) => Ok(entry),
            Err(LedgerError::Conflict(reason)) if generated => {
                warn!(
                    reference = %transaction.reference,
                    reason = %reason,
                    "Generated reference collided, regenerating"
                );
                transaction.reference = (self.reference_generator)(transaction.created_at);
                let entry = self.audit_entry(transaction, remote_address)?;
                self.storage.commit_transaction(transaction, &entry).await?;
                Ok(entry)
            }
            Err(e) => Err(e),
        }
    }

    async fn enqueue_reporting(&self, transaction: &FinancialTransaction, organization: &Organization) {
        if !transaction.requires_reporting() {
            return;
        }

        let queue = match &self.reporting {
            Some(queue) if self.engine.config().capabilities.regulatory_reporting => queue,
            _ => {
                warn!(
                    reference = %transaction.reference,
                    "Regulatory reporting unavailable, transaction not queued"
                );
                return;
            }
        };

        if let Err(e) = queue.enqueue(transaction.to_rbnz_format(organization)).await {
            warn!(
                reference = %transaction.reference,
                error = %e,
                "Failed to queue regulatory report"
            );
        }
    }

    /// Get a transaction by ID
    pub async fn get_transaction(
        &self,
        transaction_id: &str,
    ) -> LedgerResult<Option<FinancialTransaction>> {
        self.storage.get_transaction(transaction_id).await
    }

    /// Get a transaction by ID, returning an error if not found
    pub async fn get_transaction_required(
        &self,
        transaction_id: &str,
    ) -> LedgerResult<FinancialTransaction> {
        self.storage
            .get_transaction(transaction_id)
            .await?
            .ok_or_else(|| LedgerError::TransactionNotFound(transaction_id.to_string()))
    }

    /// Transactions originated by an account in `[start, end]`
    pub async fn account_transactions(
        &self,
        account_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> LedgerResult<Vec<FinancialTransaction>> {
        self.storage.account_transactions(account_id, start, end).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_reference_format() {
        let now = Utc.with_ymd_and_hms(2024, 3, 5, 1, 2, 3).unwrap();
        let reference = generate_reference(now);

        assert_eq!(reference.len(), "TXN-20240305-".len() + 16);
        assert!(reference.starts_with("TXN-20240305-"));
        assert!(reference[13..]
            .chars()
            .all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c)));
        assert_ne!(reference, generate_reference(now));
    }
}
