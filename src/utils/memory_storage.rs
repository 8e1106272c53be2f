//! In-memory storage implementation for testing

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::traits::*;
use crate::types::*;

fn read<T>(lock: &RwLock<T>) -> LedgerResult<RwLockReadGuard<'_, T>> {
    lock.read()
        .map_err(|_| LedgerError::Storage("storage lock poisoned".to_string()))
}

fn write<T>(lock: &RwLock<T>) -> LedgerResult<RwLockWriteGuard<'_, T>> {
    lock.write()
        .map_err(|_| LedgerError::Storage("storage lock poisoned".to_string()))
}

/// Transactions plus the reference index, guarded together so the
/// uniqueness check and the insert are one step
#[derive(Debug, Default)]
struct TransactionLog {
    by_id: HashMap<String, FinancialTransaction>,
    references: HashMap<String, String>,
}

impl TransactionLog {
    fn insert(&mut self, transaction: &FinancialTransaction) {
        self.references
            .insert(transaction.reference.clone(), transaction.id.clone());
        self.by_id.insert(transaction.id.clone(), transaction.clone());
    }
}

fn check_reference(log: &TransactionLog, transaction: &FinancialTransaction) -> LedgerResult<()> {
    if log.references.contains_key(&transaction.reference) {
        return Err(LedgerError::Conflict(format!(
            "reference {} already exists",
            transaction.reference
        )));
    }
    Ok(())
}

/// In-memory storage implementation for testing and development
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    organizations: Arc<RwLock<HashMap<String, Organization>>>,
    accounts: Arc<RwLock<HashMap<String, Account>>>,
    users: Arc<RwLock<HashMap<String, User>>>,
    transactions: Arc<RwLock<TransactionLog>>,
    tax_filings: Arc<RwLock<Vec<TaxFiling>>>,
    audit_entries: Arc<RwLock<Vec<AuditEntry>>>,
    fail_audit_writes: Arc<AtomicBool>,
}

impl MemoryStorage {
    /// Create a new memory storage instance
    pub fn new() -> Self {
        Self::default()
    }

    pub fn save_organization(&self, organization: Organization) -> LedgerResult<()> {
        write(&self.organizations)?.insert(organization.id.clone(), organization);
        Ok(())
    }

    pub fn save_account(&self, account: Account) -> LedgerResult<()> {
        write(&self.accounts)?.insert(account.id.clone(), account);
        Ok(())
    }

    pub fn save_user(&self, user: User) -> LedgerResult<()> {
        write(&self.users)?.insert(user.id.clone(), user);
        Ok(())
    }

    pub fn save_tax_filing(&self, filing: TaxFiling) -> LedgerResult<()> {
        write(&self.tax_filings)?.push(filing);
        Ok(())
    }

    /// Seed a transaction without an audit entry
    pub fn save_transaction(&self, transaction: &FinancialTransaction) -> LedgerResult<()> {
        let mut log = write(&self.transactions)?;
        check_reference(&log, transaction)?;
        log.insert(transaction);
        Ok(())
    }

    /// Make every subsequent audit write fail (or succeed again)
    pub fn set_fail_audit_writes(&self, fail: bool) {
        self.fail_audit_writes.store(fail, Ordering::SeqCst);
    }

    pub fn transaction_count(&self) -> LedgerResult<usize> {
        Ok(read(&self.transactions)?.by_id.len())
    }

    pub fn audit_entry_count(&self) -> LedgerResult<usize> {
        Ok(read(&self.audit_entries)?.len())
    }

    /// Clear all data (useful for testing)
    pub fn clear(&self) -> LedgerResult<()> {
        write(&self.organizations)?.clear();
        write(&self.accounts)?.clear();
        write(&self.users)?.clear();
        *write(&self.transactions)? = TransactionLog::default();
        write(&self.tax_filings)?.clear();
        write(&self.audit_entries)?.clear();
        Ok(())
    }
}

fn oldest_first(mut transactions: Vec<FinancialTransaction>) -> Vec<FinancialTransaction> {
    transactions.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.reference.cmp(&b.reference))
    });
    transactions
}

#[async_trait]
impl LedgerStorage for MemoryStorage {
    async fn get_organization(&self, organization_id: &str) -> LedgerResult<Option<Organization>> {
        Ok(read(&self.organizations)?.get(organization_id).cloned())
    }

    async fn get_account(&self, account_id: &str) -> LedgerResult<Option<Account>> {
        Ok(read(&self.accounts)?.get(account_id).cloned())
    }

    async fn list_accounts(&self, organization_id: &str) -> LedgerResult<Vec<Account>> {
        let accounts = read(&self.accounts)?;
        let mut filtered: Vec<Account> = accounts
            .values()
            .filter(|account| account.organization_id == organization_id)
            .cloned()
            .collect();
        filtered.sort_by(|a, b| a.account_number.cmp(&b.account_number));
        Ok(filtered)
    }

    async fn update_account(&self, account: &Account) -> LedgerResult<()> {
        let mut accounts = write(&self.accounts)?;
        match accounts.get_mut(&account.id) {
            Some(existing) => {
                *existing = account.clone();
                Ok(())
            }
            None => Err(LedgerError::AccountNotFound(account.id.clone())),
        }
    }

    async fn get_user(&self, user_id: &str) -> LedgerResult<Option<User>> {
        Ok(read(&self.users)?.get(user_id).cloned())
    }

    async fn commit_transaction(
        &self,
        transaction: &FinancialTransaction,
        audit_entry: &AuditEntry,
    ) -> LedgerResult<()> {
        // Transaction log first, then audit entries
        let mut log = write(&self.transactions)?;
        let mut entries = write(&self.audit_entries)?;
        if self.fail_audit_writes.load(Ordering::SeqCst) {
            return Err(LedgerError::Storage("audit store rejected the write".to_string()));
        }
        check_reference(&log, transaction)?;
        log.insert(transaction);
        entries.push(audit_entry.clone());
        Ok(())
    }

    async fn get_transaction(
        &self,
        transaction_id: &str,
    ) -> LedgerResult<Option<FinancialTransaction>> {
        Ok(read(&self.transactions)?.by_id.get(transaction_id).cloned())
    }

    async fn account_transactions(
        &self,
        account_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> LedgerResult<Vec<FinancialTransaction>> {
        let log = read(&self.transactions)?;
        let filtered = log
            .by_id
            .values()
            .filter(|txn| {
                txn.account_id == account_id && txn.created_at >= start && txn.created_at <= end
            })
            .cloned()
            .collect();
        Ok(oldest_first(filtered))
    }

    async fn organization_transactions(
        &self,
        organization_id: &str,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> LedgerResult<Vec<FinancialTransaction>> {
        let log = read(&self.transactions)?;
        let filtered = log
            .by_id
            .values()
            .filter(|txn| {
                if txn.organization_id != organization_id {
                    return false;
                }
                if let Some(start) = start {
                    if txn.created_at < start {
                        return false;
                    }
                }
                if let Some(end) = end {
                    if txn.created_at >= end {
                        return false;
                    }
                }
                true
            })
            .cloned()
            .collect();
        Ok(oldest_first(filtered))
    }

    async fn tax_filings(&self, organization_id: &str) -> LedgerResult<Vec<TaxFiling>> {
        Ok(read(&self.tax_filings)?
            .iter()
            .filter(|filing| filing.organization_id == organization_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl AuditStore for MemoryStorage {
    async fn append(&self, entry: &AuditEntry) -> LedgerResult<()> {
        if self.fail_audit_writes.load(Ordering::SeqCst) {
            return Err(LedgerError::Storage("audit store rejected the write".to_string()));
        }
        write(&self.audit_entries)?.push(entry.clone());
        Ok(())
    }

    async fn expiring_before(&self, instant: DateTime<Utc>) -> LedgerResult<Vec<AuditEntry>> {
        Ok(read(&self.audit_entries)?
            .iter()
            .filter(|entry| entry.expires_at < instant)
            .cloned()
            .collect())
    }

    async fn expiring_from(&self, instant: DateTime<Utc>) -> LedgerResult<Vec<AuditEntry>> {
        Ok(read(&self.audit_entries)?
            .iter()
            .filter(|entry| entry.expires_at >= instant)
            .cloned()
            .collect())
    }

    async fn delete_expiring_before(&self, instant: DateTime<Utc>) -> LedgerResult<usize> {
        let mut entries = write(&self.audit_entries)?;
        let before = entries.len();
        entries.retain(|entry| entry.expires_at >= instant);
        Ok(before - entries.len())
    }

    async fn entries_for(&self, auditable: &AuditableRef) -> LedgerResult<Vec<AuditEntry>> {
        Ok(read(&self.audit_entries)?
            .iter()
            .filter(|entry| &entry.auditable == auditable)
            .cloned()
            .collect())
    }
}

/// Reporting queue that keeps enqueued reports in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryReportingQueue {
    reports: Arc<RwLock<Vec<RbnzReport>>>,
    fail: Arc<AtomicBool>,
}

impl MemoryReportingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn reports(&self) -> LedgerResult<Vec<RbnzReport>> {
        Ok(read(&self.reports)?.clone())
    }
}

#[async_trait]
impl ReportingQueue for MemoryReportingQueue {
    async fn enqueue(&self, report: RbnzReport) -> LedgerResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(LedgerError::DependencyUnavailable(
                "reporting queue unavailable".to_string(),
            ));
        }
        write(&self.reports)?.push(report);
        Ok(())
    }
}

/// Payroll provider backed by per-organization totals.
///
/// An organization with no totals registered has no employees.
#[derive(Debug, Clone, Default)]
pub struct MemoryPayroll {
    totals: Arc<RwLock<HashMap<String, PayrollTotals>>>,
}

impl MemoryPayroll {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, organization_id: &str, totals: PayrollTotals) -> LedgerResult<()> {
        write(&self.totals)?.insert(organization_id.to_string(), totals);
        Ok(())
    }
}

#[async_trait]
impl PayrollProvider for MemoryPayroll {
    async fn has_employees(&self, organization_id: &str) -> LedgerResult<bool> {
        Ok(read(&self.totals)?.contains_key(organization_id))
    }

    async fn payroll_totals(
        &self,
        organization_id: &str,
        _period_start: NaiveDate,
        _period_end: NaiveDate,
    ) -> LedgerResult<PayrollTotals> {
        Ok(read(&self.totals)?
            .get(organization_id)
            .cloned()
            .unwrap_or_default())
    }
}
