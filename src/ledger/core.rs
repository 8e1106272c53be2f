//! Main ledger orchestrator that wires the compliance pipeline, aggregates
//! and tax calculations to one storage backend

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use std::net::IpAddr;
use std::sync::Arc;

use crate::compliance::ComplianceEngine;
use crate::config::LedgerConfig;
use crate::ledger::aggregator::*;
use crate::ledger::audit::{AuditTrail, SYSTEM_ORIGIN};
use crate::ledger::{
    AccountLocks, AccountManager, RecordedTransaction, ReferenceGenerator, TransactionRecorder,
};
use crate::tax::assessment::{TaxComplianceAssessment, TaxComplianceAssessor};
use crate::tax::gst::{GstCalculator, GstReturn, TaxPeriod};
use crate::tax::paye::{PayeCalculator, PayeOutcome};
use crate::tax::submission::{SubmissionResult, TaxSubmitter};
use crate::traits::*;
use crate::types::*;
use crate::utils::calendar::{next_holiday_status, to_nz_local, HolidayStatus, NzBusinessCalendar};
use crate::utils::clock::{Clock, SystemClock};

/// Assembles a [`Ledger`] from its collaborators
pub struct LedgerBuilder<S> {
    storage: S,
    config: LedgerConfig,
    clock: Option<Arc<dyn Clock>>,
    calendar: Option<Arc<dyn BusinessCalendar>>,
    reporting: Option<Arc<dyn ReportingQueue>>,
    payroll: Option<Arc<dyn PayrollProvider>>,
    gateway: Option<Arc<dyn TaxGateway>>,
    reference_generator: Option<ReferenceGenerator>,
}

impl<S: LedgerStorage + AuditStore + Clone> LedgerBuilder<S> {
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            config: LedgerConfig::default(),
            clock: None,
            calendar: None,
            reporting: None,
            payroll: None,
            gateway: None,
            reference_generator: None,
        }
    }

    pub fn config(mut self, config: LedgerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Replace the built-in NZ calendar
    pub fn calendar(mut self, calendar: Arc<dyn BusinessCalendar>) -> Self {
        self.calendar = Some(calendar);
        self
    }

    pub fn reporting_queue(mut self, queue: Arc<dyn ReportingQueue>) -> Self {
        self.reporting = Some(queue);
        self
    }

    pub fn payroll(mut self, payroll: Arc<dyn PayrollProvider>) -> Self {
        self.payroll = Some(payroll);
        self
    }

    pub fn tax_gateway(mut self, gateway: Arc<dyn TaxGateway>) -> Self {
        self.gateway = Some(gateway);
        self
    }

    pub fn reference_generator(mut self, generator: ReferenceGenerator) -> Self {
        self.reference_generator = Some(generator);
        self
    }

    /// Validate the configuration and build the ledger
    pub fn build(self) -> LedgerResult<Ledger<S>> {
        self.config.validate()?;

        let config = Arc::new(self.config);
        let clock: Arc<dyn Clock> = match self.clock {
            Some(clock) => clock,
            None => Arc::new(SystemClock),
        };
        let calendar: Arc<dyn BusinessCalendar> = match self.calendar {
            Some(calendar) => calendar,
            None => Arc::new(NzBusinessCalendar::new(&config)),
        };
        let locks = AccountLocks::new();
        let storage = self.storage;
        let audit = || AuditTrail::new(storage.clone(), config.clone());

        let engine = ComplianceEngine::new(config.clone(), calendar.clone());
        let mut recorder = TransactionRecorder::new(
            storage.clone(),
            engine,
            audit(),
            locks.clone(),
            clock.clone(),
        );
        if let Some(queue) = self.reporting {
            recorder = recorder.with_reporting_queue(queue);
        }
        if let Some(generator) = self.reference_generator {
            recorder = recorder.with_reference_generator(generator);
        }

        Ok(Ledger {
            accounts: AccountManager::new(storage.clone(), audit(), locks, clock.clone()),
            recorder,
            audit: audit(),
            aggregator: LedgerAggregator::new(storage.clone(), config.clone()),
            gst: GstCalculator::new(storage.clone(), config.clone(), clock.clone()),
            paye: PayeCalculator::new(storage.clone(), self.payroll),
            assessor: TaxComplianceAssessor::new(storage.clone(), config.clone(), clock.clone()),
            submitter: TaxSubmitter::new(audit(), config.clone(), clock.clone(), self.gateway),
            config,
            clock,
            calendar,
        })
    }
}

/// Main ledger system that orchestrates all compliance operations
pub struct Ledger<S: LedgerStorage + AuditStore> {
    config: Arc<LedgerConfig>,
    clock: Arc<dyn Clock>,
    calendar: Arc<dyn BusinessCalendar>,
    accounts: AccountManager<S>,
    recorder: TransactionRecorder<S>,
    audit: AuditTrail<S>,
    aggregator: LedgerAggregator<S>,
    gst: GstCalculator<S>,
    paye: PayeCalculator<S>,
    assessor: TaxComplianceAssessor<S>,
    submitter: TaxSubmitter<S>,
}

impl<S: LedgerStorage + AuditStore + Clone> Ledger<S> {
    /// Ledger with the default configuration and the system clock
    pub fn new(storage: S) -> LedgerResult<Self> {
        LedgerBuilder::new(storage).build()
    }

    pub fn builder(storage: S) -> LedgerBuilder<S> {
        LedgerBuilder::new(storage)
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    // Transaction operations
    /// Classify a candidate without recording it
    pub async fn validate_and_classify(
        &self,
        candidate: &TransactionCandidate,
    ) -> LedgerResult<Classification> {
        self.recorder.validate_and_classify(candidate).await
    }

    /// Record a system-originated transaction
    pub async fn record_transaction(
        &self,
        candidate: TransactionCandidate,
    ) -> LedgerResult<RecordedTransaction> {
        self.recorder.record_transaction(candidate).await
    }

    /// Record a transaction submitted from a remote address
    pub async fn record_transaction_from(
        &self,
        candidate: TransactionCandidate,
        remote_address: IpAddr,
    ) -> LedgerResult<RecordedTransaction> {
        self.recorder
            .record_transaction_from(candidate, remote_address)
            .await
    }

    pub async fn get_transaction(
        &self,
        transaction_id: &str,
    ) -> LedgerResult<Option<FinancialTransaction>> {
        self.recorder.get_transaction(transaction_id).await
    }

    pub async fn get_transaction_required(
        &self,
        transaction_id: &str,
    ) -> LedgerResult<FinancialTransaction> {
        self.recorder.get_transaction_required(transaction_id).await
    }

    /// Transactions originated by an account in `[start, end]`
    pub async fn account_transactions(
        &self,
        account_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> LedgerResult<Vec<FinancialTransaction>> {
        self.recorder.account_transactions(account_id, start, end).await
    }

    // Account operations
    pub async fn get_account(&self, account_id: &str) -> LedgerResult<Option<Account>> {
        self.accounts.get_account(account_id).await
    }

    pub async fn get_account_required(&self, account_id: &str) -> LedgerResult<Account> {
        self.accounts.get_account_required(account_id).await
    }

    pub async fn list_accounts(&self, organization_id: &str) -> LedgerResult<Vec<Account>> {
        self.accounts.list_accounts(organization_id).await
    }

    pub async fn freeze_account(
        &self,
        account_id: &str,
        user_id: Option<&str>,
        reason: &str,
    ) -> LedgerResult<Account> {
        self.accounts
            .freeze(account_id, user_id, reason, SYSTEM_ORIGIN)
            .await
    }

    pub async fn unfreeze_account(
        &self,
        account_id: &str,
        user_id: Option<&str>,
        reason: &str,
    ) -> LedgerResult<Account> {
        self.accounts
            .unfreeze(account_id, user_id, reason, SYSTEM_ORIGIN)
            .await
    }

    // Aggregates
    pub async fn monthly_summary(&self, account_id: &str) -> LedgerResult<MonthlySummary> {
        self.aggregator.monthly_summary(account_id, self.now()).await
    }

    pub async fn compliance_flags_for_account(
        &self,
        account_id: &str,
    ) -> LedgerResult<AccountComplianceFlags> {
        self.aggregator
            .compliance_flags_for_account(account_id, self.now())
            .await
    }

    /// Statement for `[start, end]`; balances are the current balance
    pub async fn statement(
        &self,
        account_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> LedgerResult<AccountStatement> {
        self.aggregator.statement(account_id, start, end).await
    }

    pub async fn organization_compliance_score(&self, organization_id: &str) -> LedgerResult<u32> {
        self.aggregator
            .organization_compliance_score(organization_id, self.now())
            .await
    }

    pub async fn organization_total_balance(&self, organization_id: &str) -> LedgerResult<BigDecimal> {
        self.aggregator
            .organization_total_balance(organization_id)
            .await
    }

    pub async fn organization_monthly_volume(
        &self,
        organization_id: &str,
    ) -> LedgerResult<BigDecimal> {
        self.aggregator
            .organization_monthly_volume(organization_id, self.now())
            .await
    }

    pub async fn compliance_report(
        &self,
        organization_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> LedgerResult<ComplianceReport> {
        self.aggregator
            .compliance_report(organization_id, start, end, self.now())
            .await
    }

    // Audit trail
    pub async fn audit_entries_for(&self, auditable: &AuditableRef) -> LedgerResult<Vec<AuditEntry>> {
        self.audit.entries_for(auditable).await
    }

    pub async fn expired_audit_entries(&self) -> LedgerResult<Vec<AuditEntry>> {
        self.audit.expired(self.now()).await
    }

    pub async fn audit_entries_for_retention(&self) -> LedgerResult<Vec<AuditEntry>> {
        self.audit.for_retention(self.now()).await
    }

    /// Maintenance: delete audit entries past retention
    pub async fn purge_expired_audit_entries(&self) -> LedgerResult<usize> {
        self.audit.purge_expired(self.now()).await
    }

    // Tax
    pub async fn compute_gst_return(
        &self,
        organization_id: &str,
        period: TaxPeriod,
    ) -> LedgerResult<GstReturn> {
        self.gst.compute_gst_return(organization_id, period).await
    }

    pub async fn calculate_paye(
        &self,
        organization_id: &str,
        period: TaxPeriod,
    ) -> LedgerResult<PayeOutcome> {
        self.paye.calculate(organization_id, period).await
    }

    pub async fn assess_tax_compliance(
        &self,
        organization_id: &str,
    ) -> LedgerResult<TaxComplianceAssessment> {
        self.assessor.assess(organization_id).await
    }

    pub async fn submit_gst_return(
        &self,
        gst_return: &GstReturn,
        dry_run: bool,
        user_id: Option<&str>,
    ) -> LedgerResult<SubmissionResult> {
        self.submitter
            .submit(gst_return, dry_run, user_id, SYSTEM_ORIGIN)
            .await
    }

    // Calendar
    pub fn is_business_time(&self) -> LedgerResult<bool> {
        self.calendar.is_business_time(self.now())
    }

    /// Next NZ public holiday; `Unavailable` when holiday data is missing
    pub fn next_holiday(&self) -> HolidayStatus {
        next_holiday_status(
            self.calendar.as_ref(),
            &self.config.jurisdiction,
            to_nz_local(self.now()).date(),
        )
    }
}
