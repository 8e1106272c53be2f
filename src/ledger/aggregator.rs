//! Read-side summaries over the transaction log
//!
//! Everything here is recomputed on each call from committed transactions.
//! Money leaves this module in major units.

use bigdecimal::BigDecimal;
use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::LedgerConfig;
use crate::traits::LedgerStorage;
use crate::types::*;
use crate::utils::calendar::to_nz_local;
use crate::utils::money::{divide_round_half_up, to_major};

/// Above this many transactions a month an account is "high volume"
pub const HIGH_VOLUME_MONTHLY_COUNT: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlySummary {
    pub account_id: String,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub total_transactions: usize,
    pub total_inflow: BigDecimal,
    pub total_outflow: BigDecimal,
    pub average_transaction: BigDecimal,
    pub largest_transaction: BigDecimal,
}

/// Account-level conditions, evaluated fresh on every call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountComplianceFlags {
    pub high_volume: bool,
    pub large_transactions: bool,
    pub dormant: bool,
}

impl AccountComplianceFlags {
    pub fn tokens(&self) -> Vec<&'static str> {
        let mut tokens = Vec::new();
        if self.high_volume {
            tokens.push("high_volume");
        }
        if self.large_transactions {
            tokens.push("large_transactions");
        }
        if self.dormant {
            tokens.push("dormant");
        }
        tokens
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountStatement {
    pub account: String,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    /// Both balances are the account's current running balance, not a
    /// reconstruction at the period bounds
    pub opening_balance: BigDecimal,
    pub closing_balance: BigDecimal,
    pub balance_is_approximate: bool,
    pub transactions: Vec<StatementLine>,
    pub total_transactions: usize,
    pub total_deposits: BigDecimal,
    pub total_withdrawals: BigDecimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceReport {
    pub organization_id: String,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub total_transactions: usize,
    pub total_value: BigDecimal,
    pub high_value_transactions: usize,
    pub international_transactions: usize,
    pub currency_breakdown: BTreeMap<String, BigDecimal>,
    /// Count per distinct non-empty flag combination, keyed "flag,flag"
    pub compliance_flags: BTreeMap<String, usize>,
    pub generated_at: DateTime<Utc>,
    pub retention_until: DateTime<Utc>,
}

#[derive(Default)]
struct FlowTotals {
    count: usize,
    inflow_cents: i64,
    outflow_cents: i64,
    total_cents: i64,
    largest_cents: i64,
}

impl FlowTotals {
    fn from_transactions(transactions: &[FinancialTransaction]) -> Self {
        transactions.iter().fold(Self::default(), |mut totals, txn| {
            let amount = txn.amount_cents();
            totals.count += 1;
            totals.total_cents += amount;
            totals.largest_cents = totals.largest_cents.max(amount);
            if txn.transaction_type.is_inflow() {
                totals.inflow_cents += amount;
            } else if txn.transaction_type.is_outflow() {
                totals.outflow_cents += amount;
            }
            totals
        })
    }

    fn average_cents(&self) -> i64 {
        if self.count == 0 {
            return 0;
        }
        divide_round_half_up(i128::from(self.total_cents), self.count as i128) as i64
    }
}

fn months_before(now: DateTime<Utc>, months: u32) -> LedgerResult<DateTime<Utc>> {
    now.checked_sub_months(Months::new(months)).ok_or_else(|| {
        LedgerError::PreconditionFailed(format!("{} months before {} is out of range", months, now))
    })
}

/// Stateless aggregator over the transaction log
pub struct LedgerAggregator<S: LedgerStorage> {
    storage: S,
    config: Arc<LedgerConfig>,
}

impl<S: LedgerStorage> LedgerAggregator<S> {
    pub fn new(storage: S, config: Arc<LedgerConfig>) -> Self {
        Self { storage, config }
    }

    async fn account_required(&self, account_id: &str) -> LedgerResult<Account> {
        self.storage
            .get_account(account_id)
            .await?
            .ok_or_else(|| LedgerError::AccountNotFound(account_id.to_string()))
    }

    async fn organization_required(&self, organization_id: &str) -> LedgerResult<Organization> {
        self.storage
            .get_organization(organization_id)
            .await?
            .ok_or_else(|| LedgerError::OrganizationNotFound(organization_id.to_string()))
    }

    /// Flow over `[now - 1 month, now]`
    pub async fn monthly_summary(
        &self,
        account_id: &str,
        now: DateTime<Utc>,
    ) -> LedgerResult<MonthlySummary> {
        self.account_required(account_id).await?;
        let period_start = months_before(now, 1)?;
        let transactions = self
            .storage
            .account_transactions(account_id, period_start, now)
            .await?;
        let totals = FlowTotals::from_transactions(&transactions);

        Ok(MonthlySummary {
            account_id: account_id.to_string(),
            period_start,
            period_end: now,
            total_transactions: totals.count,
            total_inflow: to_major(totals.inflow_cents),
            total_outflow: to_major(totals.outflow_cents),
            average_transaction: to_major(totals.average_cents()),
            largest_transaction: to_major(totals.largest_cents),
        })
    }

    pub async fn compliance_flags_for_account(
        &self,
        account_id: &str,
        now: DateTime<Utc>,
    ) -> LedgerResult<AccountComplianceFlags> {
        self.account_required(account_id).await?;

        let month = self
            .storage
            .account_transactions(account_id, months_before(now, 1)?, now)
            .await?;
        let totals = FlowTotals::from_transactions(&month);

        let quarter = self
            .storage
            .account_transactions(account_id, months_before(now, 3)?, now)
            .await?;

        Ok(AccountComplianceFlags {
            high_volume: totals.count > HIGH_VOLUME_MONTHLY_COUNT,
            large_transactions: totals.largest_cents > self.config.large_transaction_threshold_cents,
            dormant: quarter.is_empty(),
        })
    }

    /// Statement for `[start, end]`, oldest first
    pub async fn statement(
        &self,
        account_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> LedgerResult<AccountStatement> {
        let account = self.account_required(account_id).await?;
        let transactions = self
            .storage
            .account_transactions(account_id, start, end)
            .await?;
        let totals = FlowTotals::from_transactions(&transactions);

        Ok(AccountStatement {
            account: account.display_name(),
            period_start: start,
            period_end: end,
            opening_balance: account.balance_major(),
            closing_balance: account.balance_major(),
            balance_is_approximate: true,
            transactions: transactions.iter().map(FinancialTransaction::statement_line).collect(),
            total_transactions: totals.count,
            total_deposits: to_major(totals.inflow_cents),
            total_withdrawals: to_major(totals.outflow_cents),
        })
    }

    /// 100, minus 20 for missing GST registration, 10 for overdue filings and
    /// 5 for more than five flagged transactions; never below 0
    pub async fn organization_compliance_score(
        &self,
        organization_id: &str,
        now: DateTime<Utc>,
    ) -> LedgerResult<u32> {
        let organization = self.organization_required(organization_id).await?;
        let today = to_nz_local(now).date();

        let mut score: i32 = 100;
        if organization.requires_gst_registration(self.config.gst_registration_threshold_cents) {
            score -= 20;
        }

        let filings = self.storage.tax_filings(organization_id).await?;
        if filings.iter().any(|filing| filing.overdue(today)) {
            score -= 10;
        }

        let flagged = self
            .storage
            .organization_transactions(organization_id, None, None)
            .await?
            .iter()
            .filter(|txn| txn.is_flagged())
            .count();
        if flagged > 5 {
            score -= 5;
        }

        Ok(score.max(0) as u32)
    }

    /// Sum of the running balances of the organization's active accounts
    pub async fn organization_total_balance(&self, organization_id: &str) -> LedgerResult<BigDecimal> {
        let cents: i64 = self
            .storage
            .list_accounts(organization_id)
            .await?
            .iter()
            .filter(|account| account.active)
            .map(|account| account.balance_cents)
            .sum();
        Ok(to_major(cents))
    }

    /// Value moved by the organization over `[now - 1 month, now)`
    pub async fn organization_monthly_volume(
        &self,
        organization_id: &str,
        now: DateTime<Utc>,
    ) -> LedgerResult<BigDecimal> {
        let transactions = self
            .storage
            .organization_transactions(organization_id, Some(months_before(now, 1)?), Some(now))
            .await?;
        Ok(to_major(FlowTotals::from_transactions(&transactions).total_cents))
    }

    /// Regulatory summary of the organization's transactions in `[start, end)`
    pub async fn compliance_report(
        &self,
        organization_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> LedgerResult<ComplianceReport> {
        self.organization_required(organization_id).await?;
        let transactions = self
            .storage
            .organization_transactions(organization_id, Some(start), Some(end))
            .await?;

        let mut currency_cents: BTreeMap<String, i64> = BTreeMap::new();
        let mut combinations: BTreeMap<String, usize> = BTreeMap::new();
        for txn in &transactions {
            *currency_cents
                .entry(txn.amount.currency.code().to_string())
                .or_default() += txn.amount_cents();

            if !txn.compliance_flags.is_empty() {
                let key = txn
                    .compliance_flags
                    .iter()
                    .map(ComplianceFlag::as_str)
                    .collect::<Vec<_>>()
                    .join(",");
                *combinations.entry(key).or_default() += 1;
            }
        }

        let retention_until = now
            .checked_add_months(Months::new(self.config.audit_retention_months()?))
            .ok_or_else(|| {
                LedgerError::PreconditionFailed(format!("retention from {} is out of range", now))
            })?;

        Ok(ComplianceReport {
            organization_id: organization_id.to_string(),
            period_start: start,
            period_end: end,
            total_transactions: transactions.len(),
            total_value: to_major(FlowTotals::from_transactions(&transactions).total_cents),
            high_value_transactions: transactions
                .iter()
                .filter(|txn| txn.has_flag(ComplianceFlag::HighValue))
                .count(),
            international_transactions: transactions
                .iter()
                .filter(|txn| txn.has_flag(ComplianceFlag::International))
                .count(),
            currency_breakdown: currency_cents
                .into_iter()
                .map(|(currency, cents)| (currency, to_major(cents)))
                .collect(),
            compliance_flags: combinations,
            generated_at: now,
            retention_until,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::memory_storage::MemoryStorage;
    use crate::utils::money::{Currency, Money};
    use chrono::{Duration, NaiveDate, TimeZone};
    use std::collections::BTreeSet;
    use std::str::FromStr;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 0, 0, 0).unwrap()
    }

    fn dec(value: &str) -> BigDecimal {
        BigDecimal::from_str(value).unwrap()
    }

    fn setup() -> (MemoryStorage, LedgerAggregator<MemoryStorage>) {
        let storage = MemoryStorage::new();
        storage
            .save_organization(Organization::new(
                "org-1".to_string(),
                "Harbour Cafe Ltd".to_string(),
                "12345678".to_string(),
            ))
            .unwrap();
        let mut account = Account::new(
            "acc-1".to_string(),
            "org-1".to_string(),
            "Cheque".to_string(),
            "02-0100-0012345-00".to_string(),
            AccountType::Checking,
            Currency::nzd(),
        );
        account.balance_cents = 250_000;
        storage.save_account(account).unwrap();

        let aggregator = LedgerAggregator::new(storage.clone(), Arc::new(LedgerConfig::default()));
        (storage, aggregator)
    }

    async fn seed(
        storage: &MemoryStorage,
        amount: Money,
        transaction_type: TransactionType,
        flags: &[ComplianceFlag],
        created_at: DateTime<Utc>,
    ) {
        let candidate = TransactionCandidate::new(
            "acc-1".to_string(),
            amount,
            transaction_type,
            "user-1".to_string(),
            "Seeded".to_string(),
        );
        let flags: BTreeSet<_> = flags.iter().copied().collect();
        let txn = FinancialTransaction::new(
            candidate,
            "org-1".to_string(),
            uuid::Uuid::new_v4().to_string(),
            &Classification::from_flags(flags),
            created_at,
        );
        storage.save_transaction(&txn).unwrap();
    }

    #[tokio::test]
    async fn test_monthly_summary() {
        let (storage, aggregator) = setup();
        let now = now();
        seed(&storage, Money::nzd(10_000), TransactionType::Deposit, &[], now - Duration::days(1)).await;
        seed(&storage, Money::nzd(5_001), TransactionType::PaymentIn, &[], now - Duration::days(2)).await;
        seed(&storage, Money::nzd(2_000), TransactionType::Withdrawal, &[], now - Duration::days(3)).await;
        seed(&storage, Money::nzd(1_000), TransactionType::FeeCharge, &[], now - Duration::days(4)).await;
        // Outside the month
        seed(&storage, Money::nzd(99_999), TransactionType::Deposit, &[], now - Duration::days(40)).await;

        let summary = aggregator.monthly_summary("acc-1", now).await.unwrap();
        assert_eq!(summary.total_transactions, 4);
        assert_eq!(summary.total_inflow, dec("150.01"));
        assert_eq!(summary.total_outflow, dec("20.00"));
        // 18_001 / 4 = 4500.25 cents, rounded half up
        assert_eq!(summary.average_transaction, dec("45.00"));
        assert_eq!(summary.largest_transaction, dec("100.00"));
    }

    #[tokio::test]
    async fn test_empty_summary_and_dormant_account() {
        let (_storage, aggregator) = setup();

        let summary = aggregator.monthly_summary("acc-1", now()).await.unwrap();
        assert_eq!(summary.total_transactions, 0);
        assert_eq!(summary.average_transaction, dec("0"));
        assert_eq!(summary.largest_transaction, dec("0"));

        let flags = aggregator.compliance_flags_for_account("acc-1", now()).await.unwrap();
        assert_eq!(flags.tokens(), vec!["dormant"]);
    }

    #[tokio::test]
    async fn test_account_flags() {
        let (storage, aggregator) = setup();
        let now = now();
        seed(&storage, Money::nzd(5_000_001), TransactionType::Deposit, &[], now - Duration::days(2)).await;
        for i in 0..100 {
            seed(&storage, Money::nzd(100), TransactionType::Deposit, &[], now - Duration::hours(i)).await;
        }

        let flags = aggregator.compliance_flags_for_account("acc-1", now).await.unwrap();
        assert!(flags.high_volume);
        assert!(flags.large_transactions);
        assert!(!flags.dormant);
    }

    #[tokio::test]
    async fn test_statement_uses_current_balance() {
        let (storage, aggregator) = setup();
        let now = now();
        seed(&storage, Money::nzd(15_000), TransactionType::PaymentIn, &[], now - Duration::days(3)).await;
        seed(&storage, Money::nzd(4_000), TransactionType::PaymentOut, &[], now - Duration::days(1)).await;

        let statement = aggregator
            .statement("acc-1", now - Duration::days(7), now)
            .await
            .unwrap();
        assert_eq!(statement.account, "Cheque (02-0100-0012345-00)");
        assert!(statement.balance_is_approximate);
        assert_eq!(statement.opening_balance, dec("2500.00"));
        assert_eq!(statement.closing_balance, dec("2500.00"));
        assert_eq!(statement.total_deposits, dec("150.00"));
        assert_eq!(statement.total_withdrawals, dec("40.00"));
        assert_eq!(statement.transactions[0].amount, "NZD $150.00");
        assert_eq!(statement.transactions[0].balance_impact, '+');
        assert_eq!(statement.transactions[1].balance_impact, '-');
    }

    #[tokio::test]
    async fn test_compliance_score_penalties() {
        let (storage, aggregator) = setup();
        let now = now();
        assert_eq!(aggregator.organization_compliance_score("org-1", now).await.unwrap(), 100);

        let mut organization = storage.get_organization("org-1").await.unwrap().unwrap();
        organization.annual_turnover_cents = 6_000_000;
        storage.save_organization(organization).unwrap();
        storage
            .save_tax_filing(TaxFiling::new(
                "f1".to_string(),
                "org-1".to_string(),
                FilingType::Gst,
                NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 4, 30).unwrap(),
                NaiveDate::from_ymd_opt(2024, 5, 28).unwrap(),
            ))
            .unwrap();
        for i in 0..6 {
            seed(
                &storage,
                Money::nzd(100),
                TransactionType::Deposit,
                &[ComplianceFlag::AfterHours],
                now - Duration::hours(i),
            )
            .await;
        }

        let score = aggregator.organization_compliance_score("org-1", now).await.unwrap();
        assert_eq!(score, 65);
    }

    #[tokio::test]
    async fn test_compliance_report() {
        let (storage, aggregator) = setup();
        let now = now();
        seed(&storage, Money::nzd(2_000_000), TransactionType::Deposit, &[ComplianceFlag::HighValue], now - Duration::days(1)).await;
        seed(
            &storage,
            Money::new(30_000, Currency::new("AUD")),
            TransactionType::PaymentIn,
            &[ComplianceFlag::International, ComplianceFlag::AfterHours],
            now - Duration::days(2),
        )
        .await;
        seed(&storage, Money::nzd(500), TransactionType::Deposit, &[], now - Duration::days(3)).await;

        let report = aggregator
            .compliance_report("org-1", now - Duration::days(30), now, now)
            .await
            .unwrap();

        assert_eq!(report.total_transactions, 3);
        assert_eq!(report.total_value, dec("20305.00"));
        assert_eq!(report.high_value_transactions, 1);
        assert_eq!(report.international_transactions, 1);
        assert_eq!(report.currency_breakdown["NZD"], dec("20005.00"));
        assert_eq!(report.currency_breakdown["AUD"], dec("300.00"));
        assert_eq!(report.compliance_flags["high_value"], 1);
        assert_eq!(report.compliance_flags["international,after_hours"], 1);
        assert_eq!(report.retention_until, Utc.with_ymd_and_hms(2031, 6, 15, 0, 0, 0).unwrap());
    }
}
