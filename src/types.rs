//! Core types and data structures for the compliance ledger

use bigdecimal::BigDecimal;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::net::IpAddr;

use crate::utils::money::{Currency, Money};

/// Legal structure of an organisation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BusinessType {
    SoleTrader,
    Partnership,
    Company,
    Trust,
    Other,
}

/// How often GST returns are filed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilingFrequency {
    Monthly,
    TwoMonthly,
    SixMonthly,
}

impl FilingFrequency {
    /// Length of one filing period in months
    pub fn months(&self) -> u32 {
        match self {
            FilingFrequency::Monthly => 1,
            FilingFrequency::TwoMonthly => 2,
            FilingFrequency::SixMonthly => 6,
        }
    }
}

/// Root aggregate: owns accounts, users and tax filings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    pub id: String,
    pub name: String,
    /// IRD number, 8 or 9 digits
    pub ird_number: String,
    pub business_type: BusinessType,
    pub gst_registered: bool,
    pub annual_turnover_cents: i64,
    pub international_transactions_enabled: bool,
    /// Filing frequency the organisation has elected with IRD, if known
    pub gst_filing_frequency: Option<FilingFrequency>,
    pub created_at: DateTime<Utc>,
}

impl Organization {
    /// Create a company that is not yet GST registered
    pub fn new(id: String, name: String, ird_number: String) -> Self {
        Self {
            id,
            name,
            ird_number,
            business_type: BusinessType::Company,
            gst_registered: false,
            annual_turnover_cents: 0,
            international_transactions_enabled: false,
            gst_filing_frequency: None,
            created_at: Utc::now(),
        }
    }

    /// Turnover has crossed the threshold but the organisation is not registered
    pub fn requires_gst_registration(&self, threshold_cents: i64) -> bool {
        self.annual_turnover_cents >= threshold_cents && !self.gst_registered
    }

    pub fn display_name(&self) -> String {
        format!("{} (IRD: {})", self.name, self.ird_number)
    }
}

/// Account products offered to organisations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    Checking,
    Savings,
    Investment,
    BusinessChecking,
    TermDeposit,
    CreditCard,
    Loan,
}

/// A bank account owned by exactly one organisation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub organization_id: String,
    pub name: String,
    /// Unique within the organisation
    pub account_number: String,
    pub account_type: AccountType,
    pub currency: Currency,
    pub active: bool,
    pub frozen: bool,
    /// Running balance maintained by the posting component
    pub balance_cents: i64,
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Create an active, unfrozen account with a zero balance
    pub fn new(
        id: String,
        organization_id: String,
        name: String,
        account_number: String,
        account_type: AccountType,
        currency: Currency,
    ) -> Self {
        Self {
            id,
            organization_id,
            name,
            account_number,
            account_type,
            currency,
            active: true,
            frozen: false,
            balance_cents: 0,
            created_at: Utc::now(),
        }
    }

    /// Frozen or inactive accounts can neither originate nor receive
    pub fn can_transact(&self) -> bool {
        self.active && !self.frozen
    }

    pub fn display_name(&self) -> String {
        format!("{} ({})", self.name, self.account_number)
    }

    pub fn balance(&self) -> Money {
        Money::new(self.balance_cents, self.currency.clone())
    }

    pub fn balance_major(&self) -> BigDecimal {
        self.balance().to_major()
    }
}

/// Role of a user within their organisation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    User,
    Admin,
    Manager,
    ComplianceOfficer,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub organization_id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
    /// Explicit high-value approval, independent of role
    pub authorized_for_high_value: bool,
}

impl User {
    pub fn new(
        id: String,
        organization_id: String,
        email: String,
        first_name: String,
        last_name: String,
        role: UserRole,
    ) -> Self {
        Self {
            id,
            organization_id,
            email,
            first_name,
            last_name,
            role,
            authorized_for_high_value: false,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Admins and compliance officers are authorised by role
    pub fn authorized_for_high_value(&self) -> bool {
        self.authorized_for_high_value
            || matches!(self.role, UserRole::Admin | UserRole::ComplianceOfficer)
    }

    pub fn can_approve_transactions(&self) -> bool {
        matches!(
            self.role,
            UserRole::Admin | UserRole::Manager | UserRole::ComplianceOfficer
        )
    }
}

/// Kinds of money movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Deposit,
    Withdrawal,
    Transfer,
    PaymentIn,
    PaymentOut,
    FeeCharge,
    InterestPayment,
}

impl TransactionType {
    /// Money coming in; also the GST "sales" partition
    pub fn is_inflow(&self) -> bool {
        matches!(self, TransactionType::Deposit | TransactionType::PaymentIn)
    }

    /// Money going out; also the GST "purchases" partition
    pub fn is_outflow(&self) -> bool {
        matches!(self, TransactionType::Withdrawal | TransactionType::PaymentOut)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Deposit => "deposit",
            TransactionType::Withdrawal => "withdrawal",
            TransactionType::Transfer => "transfer",
            TransactionType::PaymentIn => "payment_in",
            TransactionType::PaymentOut => "payment_out",
            TransactionType::FeeCharge => "fee_charge",
            TransactionType::InterestPayment => "interest_payment",
        }
    }

    /// Human readable label, e.g. "Payment in"
    pub fn humanize(&self) -> String {
        let label = self.as_str().replace('_', " ");
        let mut chars = label.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => label,
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// GST treatment of a supply
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GstTreatment {
    #[default]
    Standard,
    /// Taxable at 0%, e.g. exports
    ZeroRated,
    /// Outside the GST system, e.g. financial services
    Exempt,
}

/// Regulatory condition attached to a transaction.
///
/// Declaration order is the canonical flag order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceFlag {
    HighValue,
    International,
    SuspiciousPattern,
    AfterHours,
}

impl ComplianceFlag {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComplianceFlag::HighValue => "high_value",
            ComplianceFlag::International => "international",
            ComplianceFlag::SuspiciousPattern => "suspicious_pattern",
            ComplianceFlag::AfterHours => "after_hours",
        }
    }

    /// Contribution to the additive risk score
    pub fn risk_weight(&self) -> u8 {
        match self {
            ComplianceFlag::SuspiciousPattern => 3,
            ComplianceFlag::HighValue => 2,
            ComplianceFlag::International | ComplianceFlag::AfterHours => 1,
        }
    }
}

impl fmt::Display for ComplianceFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceStatus {
    Compliant,
    Flagged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceCategory {
    Standard,
    MediumRisk,
    HighRisk,
}

/// Outcome of classifying an accepted transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub compliance_flags: BTreeSet<ComplianceFlag>,
    pub compliance_status: ComplianceStatus,
    pub risk_score: u8,
    pub compliance_category: ComplianceCategory,
}

impl Classification {
    /// Derive status, score and category from a flag set
    pub fn from_flags(compliance_flags: BTreeSet<ComplianceFlag>) -> Self {
        Self {
            compliance_status: compliance_status(&compliance_flags),
            risk_score: risk_score(&compliance_flags),
            compliance_category: compliance_category(&compliance_flags),
            compliance_flags,
        }
    }

    pub fn has_flag(&self, flag: ComplianceFlag) -> bool {
        self.compliance_flags.contains(&flag)
    }

    /// Flag tokens in canonical order
    pub fn flag_tokens(&self) -> Vec<&'static str> {
        self.compliance_flags.iter().map(ComplianceFlag::as_str).collect()
    }
}

pub fn compliance_status(flags: &BTreeSet<ComplianceFlag>) -> ComplianceStatus {
    if flags.is_empty() {
        ComplianceStatus::Compliant
    } else {
        ComplianceStatus::Flagged
    }
}

pub fn risk_score(flags: &BTreeSet<ComplianceFlag>) -> u8 {
    flags.iter().map(ComplianceFlag::risk_weight).sum()
}

pub fn compliance_category(flags: &BTreeSet<ComplianceFlag>) -> ComplianceCategory {
    if flags.contains(&ComplianceFlag::SuspiciousPattern) {
        ComplianceCategory::HighRisk
    } else if flags.contains(&ComplianceFlag::HighValue)
        || flags.contains(&ComplianceFlag::International)
    {
        ComplianceCategory::MediumRisk
    } else {
        ComplianceCategory::Standard
    }
}

/// A proposed transaction, before validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionCandidate {
    /// Caller supplied reference; generated when absent
    pub reference: Option<String>,
    pub account_id: String,
    pub counterparty_account_id: Option<String>,
    pub amount_cents: i64,
    pub currency: Currency,
    pub transaction_type: TransactionType,
    pub created_by: String,
    pub category: Option<String>,
    pub description: String,
    pub gst_treatment: GstTreatment,
}

impl TransactionCandidate {
    pub fn new(
        account_id: String,
        amount: Money,
        transaction_type: TransactionType,
        created_by: String,
        description: String,
    ) -> Self {
        Self {
            reference: None,
            account_id,
            counterparty_account_id: None,
            amount_cents: amount.amount_cents,
            currency: amount.currency,
            transaction_type,
            created_by,
            category: None,
            description,
            gst_treatment: GstTreatment::Standard,
        }
    }

    pub fn reference(mut self, reference: String) -> Self {
        self.reference = Some(reference);
        self
    }

    pub fn counterparty(mut self, account_id: String) -> Self {
        self.counterparty_account_id = Some(account_id);
        self
    }

    pub fn category(mut self, category: String) -> Self {
        self.category = Some(category);
        self
    }

    pub fn gst_treatment(mut self, treatment: GstTreatment) -> Self {
        self.gst_treatment = treatment;
        self
    }

    pub fn amount(&self) -> Money {
        Money::new(self.amount_cents, self.currency.clone())
    }
}

/// A committed transaction.
///
/// Compliance fields are fixed at creation; storage offers no update path,
/// corrections are new reversing transactions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialTransaction {
    pub id: String,
    pub reference: String,
    pub organization_id: String,
    pub account_id: String,
    pub counterparty_account_id: Option<String>,
    pub amount: Money,
    pub transaction_type: TransactionType,
    pub created_by: String,
    pub category: Option<String>,
    pub description: String,
    pub gst_treatment: GstTreatment,
    pub compliance_flags: BTreeSet<ComplianceFlag>,
    pub compliance_status: ComplianceStatus,
    pub created_at: DateTime<Utc>,
}

impl FinancialTransaction {
    /// Materialise an accepted candidate
    pub fn new(
        candidate: TransactionCandidate,
        organization_id: String,
        reference: String,
        classification: &Classification,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            reference,
            organization_id,
            amount: candidate.amount(),
            account_id: candidate.account_id,
            counterparty_account_id: candidate.counterparty_account_id,
            transaction_type: candidate.transaction_type,
            created_by: candidate.created_by,
            category: candidate.category,
            description: candidate.description,
            gst_treatment: candidate.gst_treatment,
            compliance_flags: classification.compliance_flags.clone(),
            compliance_status: classification.compliance_status,
            created_at,
        }
    }

    pub fn amount_cents(&self) -> i64 {
        self.amount.amount_cents
    }

    pub fn has_flag(&self, flag: ComplianceFlag) -> bool {
        self.compliance_flags.contains(&flag)
    }

    pub fn is_flagged(&self) -> bool {
        self.compliance_status == ComplianceStatus::Flagged
    }

    /// High value, international or otherwise flagged transactions are reported
    pub fn requires_reporting(&self) -> bool {
        self.has_flag(ComplianceFlag::HighValue)
            || self.has_flag(ComplianceFlag::International)
            || self.is_flagged()
    }

    pub fn risk_score(&self) -> u8 {
        risk_score(&self.compliance_flags)
    }

    pub fn compliance_category(&self) -> ComplianceCategory {
        compliance_category(&self.compliance_flags)
    }

    pub fn format_amount(&self) -> String {
        self.amount.format_amount()
    }

    /// Fields captured in the creation audit entry
    pub fn audit_changes(&self) -> serde_json::Value {
        serde_json::json!({
            "amount_cents": self.amount.amount_cents,
            "currency": self.amount.currency,
            "transaction_type": self.transaction_type,
            "compliance_flags": self.compliance_flags,
        })
    }

    /// Compact view for audit listings
    pub fn audit_summary(&self) -> TransactionAuditSummary {
        TransactionAuditSummary {
            reference: self.reference.clone(),
            amount: self.format_amount(),
            created_by: self.created_by.clone(),
            created_at: self.created_at,
            compliance_flags: self.compliance_flags.iter().map(|f| f.as_str().to_string()).collect(),
            compliance_status: self.compliance_status,
            risk_score: self.risk_score(),
            requires_reporting: self.requires_reporting(),
        }
    }

    pub fn statement_line(&self) -> StatementLine {
        StatementLine {
            date: self.created_at.date_naive(),
            description: self.description.clone(),
            reference: self.reference.clone(),
            amount: self.format_amount(),
            transaction_type: self.transaction_type.humanize(),
            balance_impact: if self.transaction_type.is_inflow() {
                '+'
            } else {
                '-'
            },
        }
    }

    /// Regulatory reporting record for the Reserve Bank
    pub fn to_rbnz_format(&self, organization: &Organization) -> RbnzReport {
        RbnzReport {
            transaction_reference: self.reference.clone(),
            amount_cents: self.amount.amount_cents,
            currency: self.amount.currency.clone(),
            transaction_type: self.transaction_type,
            transaction_date: self.created_at.date_naive(),
            reporting_entity: organization.ird_number.clone(),
            compliance_category: self.compliance_category(),
            risk_assessment: self.risk_score(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionAuditSummary {
    pub reference: String,
    pub amount: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub compliance_flags: Vec<String>,
    pub compliance_status: ComplianceStatus,
    pub risk_score: u8,
    pub requires_reporting: bool,
}

/// One line of an account statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementLine {
    pub date: NaiveDate,
    pub description: String,
    pub reference: String,
    pub amount: String,
    pub transaction_type: String,
    pub balance_impact: char,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RbnzReport {
    pub transaction_reference: String,
    pub amount_cents: i64,
    pub currency: Currency,
    pub transaction_type: TransactionType,
    pub transaction_date: NaiveDate,
    pub reporting_entity: String,
    pub compliance_category: ComplianceCategory,
    pub risk_assessment: u8,
}

/// Entity kinds that carry an audit trail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditableKind {
    FinancialTransaction,
    Account,
    Organization,
}

impl AuditableKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditableKind::FinancialTransaction => "FinancialTransaction",
            AuditableKind::Account => "Account",
            AuditableKind::Organization => "Organization",
        }
    }
}

/// Tagged reference to an audited entity
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AuditableRef {
    pub kind: AuditableKind,
    pub id: String,
}

impl AuditableRef {
    pub fn new(kind: AuditableKind, id: &str) -> Self {
        Self {
            kind,
            id: id.to_string(),
        }
    }

    pub fn transaction(id: &str) -> Self {
        Self::new(AuditableKind::FinancialTransaction, id)
    }
}

impl fmt::Display for AuditableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.kind.as_str(), self.id)
    }
}

/// Append-only audit record with a regulatory expiry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: String,
    pub auditable: AuditableRef,
    pub action: String,
    /// JSON snapshot of the relevant changed fields
    pub audited_changes: String,
    /// `None` means system initiated
    pub user_id: Option<String>,
    pub remote_address: IpAddr,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl AuditEntry {
    /// Snapshot as JSON; malformed snapshots read as an empty object
    pub fn parsed_changes(&self) -> serde_json::Value {
        serde_json::from_str(&self.audited_changes)
            .unwrap_or_else(|_| serde_json::Value::Object(serde_json::Map::new()))
    }

    /// Eligible for deletion
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }

    /// Time left until the entry may be deleted (negative once expired)
    pub fn retention_remaining(&self, now: DateTime<Utc>) -> Duration {
        self.expires_at - now
    }

    pub fn summary(&self) -> AuditSummary {
        AuditSummary {
            id: self.id.clone(),
            action: self.action.clone(),
            auditable: self.auditable.to_string(),
            user: self.user_id.clone().unwrap_or_else(|| "System".to_string()),
            timestamp: self.created_at.to_rfc3339(),
            ip_address: self.remote_address.to_string(),
            expires: self.expires_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditSummary {
    pub id: String,
    pub action: String,
    pub auditable: String,
    pub user: String,
    pub timestamp: String,
    pub ip_address: String,
    pub expires: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilingType {
    Gst,
    Paye,
    IncomeTax,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilingStatus {
    Pending,
    Submitted,
    Accepted,
    Rejected,
}

/// One return per organisation, period and filing type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxFiling {
    pub id: String,
    pub organization_id: String,
    pub filing_type: FilingType,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub due_date: NaiveDate,
    pub filed_date: Option<NaiveDate>,
    pub status: FilingStatus,
}

impl TaxFiling {
    /// Create a pending, unfiled return
    pub fn new(
        id: String,
        organization_id: String,
        filing_type: FilingType,
        period_start: NaiveDate,
        period_end: NaiveDate,
        due_date: NaiveDate,
    ) -> Self {
        Self {
            id,
            organization_id,
            filing_type,
            period_start,
            period_end,
            due_date,
            filed_date: None,
            status: FilingStatus::Pending,
        }
    }

    /// Mark as filed on a date
    pub fn filed_on(mut self, date: NaiveDate) -> Self {
        self.filed_date = Some(date);
        self.status = FilingStatus::Submitted;
        self
    }

    pub fn filed(&self) -> bool {
        self.filed_date.is_some()
    }

    /// Due date has passed and nothing was filed
    pub fn overdue(&self, today: NaiveDate) -> bool {
        self.due_date < today && !self.filed()
    }

    pub fn filed_late(&self) -> bool {
        self.filed_date.is_some_and(|filed| filed > self.due_date)
    }

    pub fn period_description(&self) -> String {
        format!(
            "{} - {}",
            self.period_start.format("%b %Y"),
            self.period_end.format("%b %Y")
        )
    }
}

/// A single field-level validation failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Every validation failure for a candidate, in rule order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.push(FieldError::new(field, message));
    }

    pub fn push(&mut self, error: FieldError) {
        self.0.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.0
    }

    /// Messages reported against one field
    pub fn messages_for(&self, field: &str) -> Vec<&str> {
        self.0
            .iter()
            .filter(|e| e.field == field)
            .map(|e| e.message.as_str())
            .collect()
    }

    /// `Ok(())` when empty, otherwise a `ValidationFailed` error
    pub fn into_result(self) -> LedgerResult<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(LedgerError::ValidationFailed(self))
        }
    }
}

impl From<FieldError> for ValidationErrors {
    fn from(error: FieldError) -> Self {
        Self(vec![error])
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        f.write_str(&messages.join("; "))
    }
}

/// Errors that can occur in the compliance ledger
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Validation failed: {0}")]
    ValidationFailed(ValidationErrors),
    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),
    #[error("Organization not found: {0}")]
    OrganizationNotFound(String),
    #[error("Account not found: {0}")]
    AccountNotFound(String),
    #[error("User not found: {0}")]
    UserNotFound(String),
    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Dependency unavailable: {0}")]
    DependencyUnavailable(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

impl LedgerError {
    /// Field errors, when this is a validation failure
    pub fn validation_errors(&self) -> Option<&ValidationErrors> {
        match self {
            LedgerError::ValidationFailed(errors) => Some(errors),
            _ => None,
        }
    }
}

/// Result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn flags(list: &[ComplianceFlag]) -> BTreeSet<ComplianceFlag> {
        list.iter().copied().collect()
    }

    #[test]
    fn test_flag_order_is_canonical() {
        let classification = Classification::from_flags(flags(&[
            ComplianceFlag::AfterHours,
            ComplianceFlag::SuspiciousPattern,
            ComplianceFlag::International,
            ComplianceFlag::HighValue,
        ]));
        assert_eq!(
            classification.flag_tokens(),
            vec!["high_value", "international", "suspicious_pattern", "after_hours"]
        );
        assert_eq!(classification.risk_score, 7);
        assert_eq!(classification.compliance_category, ComplianceCategory::HighRisk);
        assert_eq!(classification.compliance_status, ComplianceStatus::Flagged);
    }

    #[test]
    fn test_classification_categories() {
        let clean = Classification::from_flags(BTreeSet::new());
        assert_eq!(clean.compliance_status, ComplianceStatus::Compliant);
        assert_eq!(clean.risk_score, 0);
        assert_eq!(clean.compliance_category, ComplianceCategory::Standard);

        let after_hours = Classification::from_flags(flags(&[ComplianceFlag::AfterHours]));
        assert_eq!(after_hours.compliance_category, ComplianceCategory::Standard);
        assert_eq!(after_hours.compliance_status, ComplianceStatus::Flagged);

        let international = Classification::from_flags(flags(&[ComplianceFlag::International]));
        assert_eq!(international.compliance_category, ComplianceCategory::MediumRisk);
        assert_eq!(international.risk_score, 1);
    }

    #[test]
    fn test_user_high_value_authorisation() {
        let mut user = User::new(
            "u1".to_string(),
            "org".to_string(),
            "a@example.co.nz".to_string(),
            "Aroha".to_string(),
            "Ngata".to_string(),
            UserRole::User,
        );
        assert!(!user.authorized_for_high_value());
        assert!(!user.can_approve_transactions());

        user.role = UserRole::ComplianceOfficer;
        assert!(user.authorized_for_high_value());

        user.role = UserRole::Manager;
        assert!(!user.authorized_for_high_value());
        assert!(user.can_approve_transactions());

        user.authorized_for_high_value = true;
        assert!(user.authorized_for_high_value());
        assert_eq!(user.full_name(), "Aroha Ngata");
    }

    #[test]
    fn test_tax_filing_lateness() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        let due = NaiveDate::from_ymd_opt(2024, 2, 28).unwrap();
        let filing = TaxFiling::new(
            "f1".to_string(),
            "org".to_string(),
            FilingType::Gst,
            start,
            end,
            due,
        );

        assert!(!filing.overdue(due));
        assert!(filing.overdue(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()));
        assert_eq!(filing.period_description(), "Jan 2024 - Jan 2024");

        let late = filing.clone().filed_on(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert!(late.filed_late());
        assert!(!late.overdue(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()));

        let on_time = filing.filed_on(due);
        assert!(!on_time.filed_late());
    }

    #[test]
    fn test_audit_entry_helpers() {
        let created = Utc::now();
        let entry = AuditEntry {
            id: "a1".to_string(),
            auditable: AuditableRef::transaction("t1"),
            action: "financial_transaction_created".to_string(),
            audited_changes: "not json".to_string(),
            user_id: None,
            remote_address: "127.0.0.1".parse().unwrap(),
            created_at: created,
            expires_at: created + Duration::days(10),
        };

        assert_eq!(entry.parsed_changes(), serde_json::json!({}));
        assert!(!entry.is_expired(created + Duration::days(10)));
        assert!(entry.is_expired(created + Duration::days(11)));
        assert_eq!(entry.retention_remaining(created), Duration::days(10));

        let summary = entry.summary();
        assert_eq!(summary.user, "System");
        assert_eq!(summary.auditable, "FinancialTransaction#t1");
    }

    #[test]
    fn test_validation_errors_render_every_field() {
        let mut errors = ValidationErrors::new();
        errors.add("amount", "must be greater than 0");
        errors.add("currency", "must be a supported currency: NZD");

        assert_eq!(errors.len(), 2);
        assert_eq!(errors.messages_for("amount"), vec!["must be greater than 0"]);

        let err = errors.into_result().unwrap_err();
        assert!(err.to_string().contains("amount: must be greater than 0"));
        assert!(err.to_string().contains("currency: must be a supported currency"));
        assert_eq!(err.validation_errors().map(|e| e.len()), Some(2));
    }

    #[test]
    fn test_transaction_audit_summary() {
        let created = Utc::now();
        let candidate = TransactionCandidate::new(
            "acc-1".to_string(),
            Money::nzd(15_000),
            TransactionType::Deposit,
            "clerk".to_string(),
            "Customer payment".to_string(),
        );
        let txn = FinancialTransaction::new(
            candidate,
            "org-1".to_string(),
            "TXN-20240311-0123456789ABCDEF".to_string(),
            &Classification::from_flags(flags(&[ComplianceFlag::AfterHours])),
            created,
        );

        let summary = txn.audit_summary();
        assert_eq!(summary.reference, "TXN-20240311-0123456789ABCDEF");
        assert_eq!(summary.amount, "NZD $150.00");
        assert_eq!(summary.created_by, "clerk");
        assert_eq!(summary.created_at, created);
        assert_eq!(summary.compliance_flags, vec!["after_hours".to_string()]);
        assert_eq!(summary.compliance_status, ComplianceStatus::Flagged);
        assert_eq!(summary.risk_score, txn.risk_score());
        assert!(summary.requires_reporting);
    }

    #[test]
    fn test_transaction_type_helpers() {
        assert_eq!(TransactionType::PaymentIn.humanize(), "Payment in");
        assert!(TransactionType::Deposit.is_inflow());
        assert!(TransactionType::PaymentOut.is_outflow());
        assert!(!TransactionType::Transfer.is_inflow());
        assert!(!TransactionType::FeeCharge.is_outflow());
    }
}
