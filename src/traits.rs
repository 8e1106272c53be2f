//! Collaborator traits the compliance core depends on
//!
//! Persistence, payroll, regulatory reporting and the tax authority live
//! outside this crate; the core only talks to them through these traits.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::tax::gst::GstReturn;
use crate::types::*;
use crate::utils::calendar::Holiday;

/// Storage abstraction for the ledger system
///
/// Implementations use interior mutability so a single store can be shared
/// by concurrent recorders. Committed transactions have no update path.
#[async_trait]
pub trait LedgerStorage: Send + Sync {
    /// Get an organization by ID
    async fn get_organization(&self, organization_id: &str) -> LedgerResult<Option<Organization>>;

    /// Get an account by ID
    async fn get_account(&self, account_id: &str) -> LedgerResult<Option<Account>>;

    /// List the accounts owned by an organization
    async fn list_accounts(&self, organization_id: &str) -> LedgerResult<Vec<Account>>;

    /// Persist account flag changes (freeze, unfreeze, deactivate)
    async fn update_account(&self, account: &Account) -> LedgerResult<()>;

    /// Get a user by ID
    async fn get_user(&self, user_id: &str) -> LedgerResult<Option<User>>;

    /// Insert a transaction together with its audit entry.
    ///
    /// Readers observe both records or neither. Fails with
    /// `LedgerError::Conflict` if the reference is already taken, in which
    /// case nothing is written.
    async fn commit_transaction(
        &self,
        transaction: &FinancialTransaction,
        audit_entry: &AuditEntry,
    ) -> LedgerResult<()>;

    /// Get a transaction by ID
    async fn get_transaction(&self, transaction_id: &str)
        -> LedgerResult<Option<FinancialTransaction>>;

    /// Transactions originated by an account with `start <= created_at <= end`,
    /// oldest first
    async fn account_transactions(
        &self,
        account_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> LedgerResult<Vec<FinancialTransaction>>;

    /// Transactions of every account of an organization with
    /// `start <= created_at < end`, oldest first. Open bounds are unbounded.
    async fn organization_transactions(
        &self,
        organization_id: &str,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> LedgerResult<Vec<FinancialTransaction>>;

    /// Tax filings of an organization, any order
    async fn tax_filings(&self, organization_id: &str) -> LedgerResult<Vec<TaxFiling>>;
}

/// Append-only store for audit entries
#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn append(&self, entry: &AuditEntry) -> LedgerResult<()>;

    /// Entries with `expires_at < instant`
    async fn expiring_before(&self, instant: DateTime<Utc>) -> LedgerResult<Vec<AuditEntry>>;

    /// Entries with `expires_at >= instant`
    async fn expiring_from(&self, instant: DateTime<Utc>) -> LedgerResult<Vec<AuditEntry>>;

    /// Delete entries with `expires_at < instant`, returning how many went
    async fn delete_expiring_before(&self, instant: DateTime<Utc>) -> LedgerResult<usize>;

    /// Entries recorded against one entity, oldest first
    async fn entries_for(&self, auditable: &AuditableRef) -> LedgerResult<Vec<AuditEntry>>;
}

/// Holiday and business-hours provider
pub trait BusinessCalendar: Send + Sync {
    /// Ordered holidays with `start <= date <= end` for a jurisdiction
    fn holidays_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        jurisdiction: &str,
    ) -> LedgerResult<Vec<Holiday>>;

    /// Whether an instant falls inside business hours on a business day
    fn is_business_time(&self, instant: DateTime<Utc>) -> LedgerResult<bool>;
}

/// Payroll system holding employee and wage data
#[async_trait]
pub trait PayrollProvider: Send + Sync {
    async fn has_employees(&self, organization_id: &str) -> LedgerResult<bool>;

    /// Totals for pay dates in `[period_start, period_end)`
    async fn payroll_totals(
        &self,
        organization_id: &str,
        period_start: NaiveDate,
        period_end: NaiveDate,
    ) -> LedgerResult<PayrollTotals>;
}

/// Queue feeding the regulatory reporting job
#[async_trait]
pub trait ReportingQueue: Send + Sync {
    async fn enqueue(&self, report: RbnzReport) -> LedgerResult<()>;
}

/// Tax authority submission gateway
#[async_trait]
pub trait TaxGateway: Send + Sync {
    async fn submit_gst_return(&self, gst_return: &GstReturn) -> LedgerResult<GatewayAcknowledgement>;
}

/// Payroll figures for one period, in minor units
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayrollTotals {
    pub gross_wages_cents: i64,
    pub paye_cents: i64,
    pub acc_levies_cents: i64,
    pub kiwisaver_cents: i64,
}

/// Acknowledgement returned by the tax authority
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayAcknowledgement {
    pub submission_id: String,
    pub reference_number: String,
    pub confirmation_code: String,
    pub status: String,
    pub received_at: DateTime<Utc>,
}
