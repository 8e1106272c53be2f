//! GST (Goods and Services Tax) return calculation for New Zealand
//!
//! Amounts stay in minor units until they reach the return; the tax-exclusive
//! part of a tax-inclusive total is rounded half up to the cent.

use bigdecimal::BigDecimal;
use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

use crate::config::LedgerConfig;
use crate::traits::LedgerStorage;
use crate::types::*;
use crate::utils::calendar::nz_start_of_day;
use crate::utils::clock::Clock;
use crate::utils::money::{gst_exclusive, to_major};
use crate::utils::validation::{validate_ird_number, validate_period};

pub const CALCULATOR_VERSION: &str = "1.0";

/// Net GST movement between periods worth flagging (NZD 10,000)
pub const SIGNIFICANT_VARIATION_CENTS: i64 = 1_000_000;

/// Upper bound of the smallest turnover band (NZD 2m)
pub const SMALL_BAND_MAX_CENTS: i64 = 200_000_000;

/// Upper bound of the middle turnover band (NZD 24m)
pub const MEDIUM_BAND_MAX_CENTS: i64 = 2_400_000_000;

/// A return period in Auckland local dates, `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxPeriod {
    start: NaiveDate,
    end: NaiveDate,
}

impl TaxPeriod {
    /// Period from `start` up to but excluding `end`
    pub fn new(start: NaiveDate, end: NaiveDate) -> LedgerResult<Self> {
        validate_period(start, end)?;
        Ok(Self { start, end })
    }

    /// One calendar month
    pub fn month(year: i32, month: u32) -> LedgerResult<Self> {
        let start = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| {
            LedgerError::PreconditionFailed(format!("invalid month {}-{}", year, month))
        })?;
        let end = add_months(start, 1)?;
        Self::new(start, end)
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// Exclusive end date
    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Last day inside the period
    pub fn last_day(&self) -> NaiveDate {
        self.end - Duration::days(1)
    }

    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    /// Period of the same length immediately before this one
    pub fn previous(&self) -> Self {
        Self {
            start: self.start - Duration::days(self.days()),
            end: self.start,
        }
    }

    /// Instants bounding the period in Auckland time
    pub fn utc_bounds(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        (nz_start_of_day(self.start), nz_start_of_day(self.end))
    }

    /// "January 2024", "January - February 2024" or an explicit date range
    pub fn description(&self) -> String {
        match self.days() {
            27..=31 => self.start.format("%B %Y").to_string(),
            58..=62 => format!(
                "{} - {}",
                self.start.format("%B"),
                self.last_day().format("%B %Y")
            ),
            _ => format!(
                "{} to {}",
                self.start.format("%d %b %Y"),
                self.last_day().format("%d %b %Y")
            ),
        }
    }
}

fn add_months(date: NaiveDate, months: u32) -> LedgerResult<NaiveDate> {
    date.checked_add_months(Months::new(months))
        .ok_or_else(|| LedgerError::PreconditionFailed(format!("date {} is out of range", date)))
}

/// `months` after `date`, moved to the 28th
fn offset_to_28th(date: NaiveDate, months: u32) -> LedgerResult<NaiveDate> {
    add_months(date, months)?
        .with_day(28)
        .ok_or_else(|| LedgerError::PreconditionFailed(format!("date {} is out of range", date)))
}

/// Tax-inclusive amount split into its exclusive and GST parts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GstSplit {
    pub inclusive_cents: i64,
    pub exclusive_cents: i64,
    pub gst_cents: i64,
}

impl GstSplit {
    /// Reverse calculation from a tax-inclusive total
    pub fn from_inclusive(inclusive_cents: i64, rate_basis_points: i64) -> Self {
        let exclusive_cents = gst_exclusive(inclusive_cents, rate_basis_points);
        Self {
            inclusive_cents,
            exclusive_cents,
            gst_cents: inclusive_cents - exclusive_cents,
        }
    }
}

/// Turnover band that decides filing cadence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnoverBand {
    UpToTwoMillion,
    TwoToTwentyFourMillion,
    OverTwentyFourMillion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilingRequirement {
    pub band: TurnoverBand,
    pub frequency: FilingFrequency,
    /// Days after the period's last day that the return is due
    pub due_date_offset_days: i64,
    pub special_requirements: bool,
}

impl FilingRequirement {
    /// Filing requirement for an annual turnover.
    ///
    /// Every band currently files monthly, 28 days after the period.
    pub fn for_turnover(annual_turnover_cents: i64) -> Self {
        if annual_turnover_cents <= SMALL_BAND_MAX_CENTS {
            Self {
                band: TurnoverBand::UpToTwoMillion,
                frequency: FilingFrequency::Monthly,
                due_date_offset_days: 28,
                special_requirements: false,
            }
        } else if annual_turnover_cents <= MEDIUM_BAND_MAX_CENTS {
            Self {
                band: TurnoverBand::TwoToTwentyFourMillion,
                frequency: FilingFrequency::Monthly,
                due_date_offset_days: 28,
                special_requirements: false,
            }
        } else {
            Self {
                band: TurnoverBand::OverTwentyFourMillion,
                frequency: FilingFrequency::Monthly,
                due_date_offset_days: 28,
                special_requirements: true,
            }
        }
    }
}

/// Totals for one period, all in minor units
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GstSummary {
    pub sales_count: usize,
    pub sales: GstSplit,
    pub purchases_count: usize,
    pub purchases: GstSplit,
    pub total_gst_collected_cents: i64,
    pub total_gst_paid_cents: i64,
    /// Collected minus paid; negative means a refund
    pub net_gst_position_cents: i64,
    pub gst_to_pay_cents: i64,
    pub gst_refund_due_cents: i64,
    pub zero_rated_sales_cents: i64,
    pub exempt_supplies_cents: i64,
}

impl GstSummary {
    fn from_transactions(transactions: &[FinancialTransaction], rate_basis_points: i64) -> Self {
        let mut summary = Self::default();
        let mut standard_sales_cents = 0;
        let mut purchases_cents = 0;

        for txn in transactions {
            let amount = txn.amount_cents();
            if txn.transaction_type.is_inflow() {
                summary.sales_count += 1;
                match (txn.transaction_type, txn.gst_treatment) {
                    (TransactionType::PaymentIn, GstTreatment::ZeroRated) => {
                        summary.zero_rated_sales_cents += amount
                    }
                    (TransactionType::PaymentIn, GstTreatment::Exempt) => {
                        summary.exempt_supplies_cents += amount
                    }
                    _ => standard_sales_cents += amount,
                }
            } else if txn.transaction_type.is_outflow() {
                summary.purchases_count += 1;
                purchases_cents += amount;
            }
        }

        summary.sales = GstSplit::from_inclusive(standard_sales_cents, rate_basis_points);
        summary.purchases = GstSplit::from_inclusive(purchases_cents, rate_basis_points);
        summary.total_gst_collected_cents = summary.sales.gst_cents;
        summary.total_gst_paid_cents = summary.purchases.gst_cents;
        summary.net_gst_position_cents =
            summary.total_gst_collected_cents - summary.total_gst_paid_cents;
        summary.gst_to_pay_cents = summary.net_gst_position_cents.max(0);
        summary.gst_refund_due_cents = (-summary.net_gst_position_cents).max(0);
        summary
    }

    pub fn is_payable(&self) -> bool {
        self.net_gst_position_cents > 0
    }

    pub fn net_gst_position(&self) -> BigDecimal {
        to_major(self.net_gst_position_cents)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GstIssue {
    LateFilingHistory,
    SignificantVariation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GstComplianceStatus {
    Compliant,
    AttentionRequired,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GstAssessment {
    pub status: GstComplianceStatus,
    pub issues: Vec<GstIssue>,
    pub confidence_score: u8,
}

/// A computed GST return
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GstReturn {
    pub organization_id: String,
    pub organization_name: String,
    pub ird_number: String,
    pub period: TaxPeriod,
    pub period_description: String,
    pub summary: GstSummary,
    /// Sales by category name, major units
    pub sales_breakdown: BTreeMap<String, BigDecimal>,
    /// Purchases by category name, major units
    pub purchase_breakdown: BTreeMap<String, BigDecimal>,
    pub assessment: GstAssessment,
    pub filing_requirement: FilingRequirement,
    pub due_date: NaiveDate,
    pub next_filing_due: NaiveDate,
    pub payment_due_date: NaiveDate,
    pub calculated_at: DateTime<Utc>,
    pub calculator_version: String,
}

fn breakdown<F>(transactions: &[FinancialTransaction], include: F) -> BTreeMap<String, BigDecimal>
where
    F: Fn(&FinancialTransaction) -> bool,
{
    let mut cents: BTreeMap<String, i64> = BTreeMap::new();
    for txn in transactions.iter().filter(|txn| include(txn)) {
        if let Some(category) = &txn.category {
            *cents.entry(category.clone()).or_default() += txn.amount_cents();
        }
    }
    cents
        .into_iter()
        .map(|(category, total)| (category, to_major(total)))
        .collect()
}

/// Calculates GST returns from the committed transaction log
pub struct GstCalculator<S: LedgerStorage> {
    storage: S,
    config: Arc<LedgerConfig>,
    clock: Arc<dyn Clock>,
}

impl<S: LedgerStorage> GstCalculator<S> {
    pub fn new(storage: S, config: Arc<LedgerConfig>, clock: Arc<dyn Clock>) -> Self {
        Self {
            storage,
            config,
            clock,
        }
    }

    /// Compute the return of a GST-registered organization for a period
    pub async fn compute_gst_return(
        &self,
        organization_id: &str,
        period: TaxPeriod,
    ) -> LedgerResult<GstReturn> {
        let organization = self
            .storage
            .get_organization(organization_id)
            .await?
            .ok_or_else(|| LedgerError::OrganizationNotFound(organization_id.to_string()))?;

        if !organization.gst_registered {
            return Err(LedgerError::PreconditionFailed(format!(
                "organization {} must be GST registered",
                organization_id
            )));
        }
        validate_ird_number(&organization.ird_number)?;

        let rate = self.config.gst_rate_basis_points;
        let transactions = self.period_transactions(organization_id, &period).await?;
        let summary = GstSummary::from_transactions(&transactions, rate);

        let assessment = self
            .assess(&organization, &period, &transactions, &summary)
            .await?;

        let filing_requirement = FilingRequirement::for_turnover(organization.annual_turnover_cents);
        let last_day = period.last_day();

        let gst_return = GstReturn {
            organization_id: organization.id.clone(),
            organization_name: organization.name.clone(),
            ird_number: organization.ird_number.clone(),
            period,
            period_description: period.description(),
            sales_breakdown: breakdown(&transactions, |txn| txn.transaction_type.is_inflow()),
            purchase_breakdown: breakdown(&transactions, |txn| txn.transaction_type.is_outflow()),
            summary,
            assessment,
            filing_requirement,
            due_date: last_day + Duration::days(filing_requirement.due_date_offset_days),
            next_filing_due: offset_to_28th(last_day, filing_requirement.frequency.months())?,
            payment_due_date: offset_to_28th(last_day, 1)?,
            calculated_at: self.clock.now(),
            calculator_version: CALCULATOR_VERSION.to_string(),
        };

        info!(
            organization_id,
            period = %gst_return.period_description,
            net_gst_cents = gst_return.summary.net_gst_position_cents,
            issues = ?gst_return.assessment.issues,
            "GST return computed"
        );
        Ok(gst_return)
    }

    async fn period_transactions(
        &self,
        organization_id: &str,
        period: &TaxPeriod,
    ) -> LedgerResult<Vec<FinancialTransaction>> {
        let (start, end) = period.utc_bounds();
        self.storage
            .organization_transactions(organization_id, Some(start), Some(end))
            .await
    }

    async fn assess(
        &self,
        organization: &Organization,
        period: &TaxPeriod,
        transactions: &[FinancialTransaction],
        summary: &GstSummary,
    ) -> LedgerResult<GstAssessment> {
        let filings: Vec<TaxFiling> = self
            .storage
            .tax_filings(&organization.id)
            .await?
            .into_iter()
            .filter(|filing| filing.filing_type == FilingType::Gst)
            .collect();

        let mut issues = Vec::new();

        let last_prior = filings
            .iter()
            .filter(|filing| filing.period_end < period.start())
            .max_by_key(|filing| filing.period_end);
        if last_prior.is_some_and(TaxFiling::filed_late) {
            issues.push(GstIssue::LateFilingHistory);
        }

        let previous = self
            .period_transactions(&organization.id, &period.previous())
            .await?;
        if !previous.is_empty() {
            let previous_net =
                GstSummary::from_transactions(&previous, self.config.gst_rate_basis_points)
                    .net_gst_position_cents;
            if (summary.net_gst_position_cents - previous_net).abs() > SIGNIFICANT_VARIATION_CENTS {
                issues.push(GstIssue::SignificantVariation);
            }
        }

        let history = self
            .storage
            .organization_transactions(&organization.id, None, None)
            .await?;
        let uncategorised = transactions.iter().filter(|txn| txn.category.is_none()).count();

        let mut confidence: i32 = 85;
        if history.len() > 50 {
            confidence += 10;
        }
        if uncategorised * 10 > transactions.len() {
            confidence -= 15;
        }
        if filings.iter().filter(|filing| filing.filed()).count() >= 12 {
            confidence += 5;
        }

        Ok(GstAssessment {
            status: if issues.is_empty() {
                GstComplianceStatus::Compliant
            } else {
                GstComplianceStatus::AttentionRequired
            },
            issues,
            confidence_score: confidence.clamp(0, 100) as u8,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::clock::FixedClock;
    use crate::utils::memory_storage::MemoryStorage;
    use crate::utils::money::Money;
    use chrono::TimeZone;
    use std::collections::BTreeSet;
    use std::str::FromStr;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn setup() -> (MemoryStorage, GstCalculator<MemoryStorage>) {
        let storage = MemoryStorage::new();
        let mut organization = Organization::new(
            "org-1".to_string(),
            "Southern Exports Ltd".to_string(),
            "123456789".to_string(),
        );
        organization.gst_registered = true;
        organization.annual_turnover_cents = 150_000_000;
        storage.save_organization(organization).unwrap();

        let clock = FixedClock::new(Utc.with_ymd_and_hms(2024, 2, 10, 0, 0, 0).unwrap());
        let calculator =
            GstCalculator::new(storage.clone(), Arc::new(LedgerConfig::default()), Arc::new(clock));
        (storage, calculator)
    }

    async fn seed(
        storage: &MemoryStorage,
        amount_cents: i64,
        transaction_type: TransactionType,
        treatment: GstTreatment,
        category: Option<&str>,
        created_at: DateTime<Utc>,
    ) {
        let mut candidate = TransactionCandidate::new(
            "acc-1".to_string(),
            Money::nzd(amount_cents),
            transaction_type,
            "user-1".to_string(),
            "Seeded".to_string(),
        )
        .gst_treatment(treatment);
        candidate.category = category.map(str::to_string);
        let txn = FinancialTransaction::new(
            candidate,
            "org-1".to_string(),
            uuid::Uuid::new_v4().to_string(),
            &Classification::from_flags(BTreeSet::new()),
            created_at,
        );
        storage.save_transaction(&txn).unwrap();
    }

    fn mid_january() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_standard_sales_return() {
        let (storage, calculator) = setup();
        seed(&storage, 1_150_000_000, TransactionType::PaymentIn, GstTreatment::Standard, Some("Sales"), mid_january()).await;

        let gst_return = calculator
            .compute_gst_return("org-1", TaxPeriod::month(2024, 1).unwrap())
            .await
            .unwrap();
        let summary = &gst_return.summary;

        assert_eq!(summary.sales.exclusive_cents, 1_000_000_000);
        assert_eq!(summary.total_gst_collected_cents, 150_000_000);
        assert_eq!(summary.net_gst_position_cents, 150_000_000);
        assert!(summary.is_payable());
        assert_eq!(summary.gst_to_pay_cents, 150_000_000);
        assert_eq!(summary.gst_refund_due_cents, 0);

        assert_eq!(gst_return.organization_name, "Southern Exports Ltd");
        assert_eq!(gst_return.period_description, "January 2024");
        assert_eq!(gst_return.calculator_version, "1.0");
        assert_eq!(
            gst_return.sales_breakdown["Sales"],
            BigDecimal::from_str("11500000.00").unwrap()
        );
        assert_eq!(gst_return.due_date, date(2024, 2, 28));
        assert_eq!(gst_return.next_filing_due, date(2024, 2, 28));
        assert_eq!(gst_return.payment_due_date, date(2024, 2, 28));
    }

    #[tokio::test]
    async fn test_refund_position() {
        let (storage, calculator) = setup();
        seed(&storage, 115_000, TransactionType::Deposit, GstTreatment::Standard, None, mid_january()).await;
        seed(&storage, 230_000, TransactionType::PaymentOut, GstTreatment::Standard, Some("Stock"), mid_january()).await;
        seed(&storage, 50_000, TransactionType::FeeCharge, GstTreatment::Standard, None, mid_january()).await;

        let gst_return = calculator
            .compute_gst_return("org-1", TaxPeriod::month(2024, 1).unwrap())
            .await
            .unwrap();
        let summary = &gst_return.summary;

        assert_eq!(summary.sales_count, 1);
        assert_eq!(summary.purchases_count, 1);
        assert_eq!(summary.total_gst_collected_cents, 15_000);
        assert_eq!(summary.total_gst_paid_cents, 30_000);
        assert_eq!(summary.net_gst_position_cents, -15_000);
        assert_eq!(summary.gst_to_pay_cents, 0);
        assert_eq!(summary.gst_refund_due_cents, 15_000);
    }

    #[tokio::test]
    async fn test_zero_rated_and_exempt_sales_reported_separately() {
        let (storage, calculator) = setup();
        seed(&storage, 115_000, TransactionType::PaymentIn, GstTreatment::Standard, None, mid_january()).await;
        seed(&storage, 400_000, TransactionType::PaymentIn, GstTreatment::ZeroRated, None, mid_january()).await;
        seed(&storage, 70_000, TransactionType::PaymentIn, GstTreatment::Exempt, None, mid_january()).await;

        let summary = calculator
            .compute_gst_return("org-1", TaxPeriod::month(2024, 1).unwrap())
            .await
            .unwrap()
            .summary;

        assert_eq!(summary.sales.inclusive_cents, 115_000);
        assert_eq!(summary.total_gst_collected_cents, 15_000);
        assert_eq!(summary.zero_rated_sales_cents, 400_000);
        assert_eq!(summary.exempt_supplies_cents, 70_000);
    }

    #[tokio::test]
    async fn test_period_is_half_open_in_local_time() {
        let (storage, calculator) = setup();
        let period = TaxPeriod::month(2024, 1).unwrap();
        let (start, end) = period.utc_bounds();
        seed(&storage, 1_150, TransactionType::Deposit, GstTreatment::Standard, None, start).await;
        seed(&storage, 2_300, TransactionType::Deposit, GstTreatment::Standard, None, end).await;

        let summary = calculator.compute_gst_return("org-1", period).await.unwrap().summary;
        assert_eq!(summary.sales_count, 1);
        assert_eq!(summary.sales.inclusive_cents, 1_150);
    }

    #[tokio::test]
    async fn test_preconditions() {
        let (storage, calculator) = setup();

        let mut organization = storage.get_organization("org-1").await.unwrap().unwrap();
        organization.ird_number = "1234".to_string();
        storage.save_organization(organization.clone()).unwrap();
        let err = calculator
            .compute_gst_return("org-1", TaxPeriod::month(2024, 1).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::PreconditionFailed(_)));

        organization.ird_number = "12345678".to_string();
        organization.gst_registered = false;
        storage.save_organization(organization).unwrap();
        let err = calculator
            .compute_gst_return("org-1", TaxPeriod::month(2024, 1).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::PreconditionFailed(_)));

        assert!(TaxPeriod::new(date(2024, 2, 1), date(2024, 1, 1)).is_err());

        let err = calculator
            .compute_gst_return("missing", TaxPeriod::month(2024, 1).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::OrganizationNotFound(_)));
    }

    #[test]
    fn test_period_descriptions() {
        assert_eq!(TaxPeriod::month(2024, 2).unwrap().description(), "February 2024");
        assert_eq!(
            TaxPeriod::new(date(2024, 1, 1), date(2024, 3, 1)).unwrap().description(),
            "January - February 2024"
        );
        assert_eq!(
            TaxPeriod::new(date(2024, 1, 1), date(2024, 1, 15)).unwrap().description(),
            "01 Jan 2024 to 14 Jan 2024"
        );
        let march = TaxPeriod::month(2024, 3).unwrap();
        assert_eq!(march.previous(), TaxPeriod::new(date(2024, 1, 30), date(2024, 3, 1)).unwrap());
    }

    #[test]
    fn test_filing_bands() {
        let small = FilingRequirement::for_turnover(200_000_000);
        assert_eq!(small.band, TurnoverBand::UpToTwoMillion);
        let medium = FilingRequirement::for_turnover(200_000_001);
        assert_eq!(medium.band, TurnoverBand::TwoToTwentyFourMillion);
        let large = FilingRequirement::for_turnover(2_400_000_001);
        assert_eq!(large.band, TurnoverBand::OverTwentyFourMillion);
        assert!(large.special_requirements);

        for requirement in [small, medium, large] {
            assert_eq!(requirement.frequency, FilingFrequency::Monthly);
            assert_eq!(requirement.due_date_offset_days, 28);
        }
    }

    #[tokio::test]
    async fn test_assessment_flags_late_history_and_variation() {
        let (storage, calculator) = setup();
        storage
            .save_tax_filing(
                TaxFiling::new(
                    "f-dec".to_string(),
                    "org-1".to_string(),
                    FilingType::Gst,
                    date(2023, 12, 1),
                    date(2023, 12, 31),
                    date(2024, 1, 28),
                )
                .filed_on(date(2024, 2, 2)),
            )
            .unwrap();
        // December had a small position, January a large one
        seed(&storage, 11_500, TransactionType::PaymentIn, GstTreatment::Standard, Some("Sales"), Utc.with_ymd_and_hms(2023, 12, 10, 0, 0, 0).unwrap()).await;
        seed(&storage, 115_000_000, TransactionType::PaymentIn, GstTreatment::Standard, Some("Sales"), mid_january()).await;

        let assessment = calculator
            .compute_gst_return("org-1", TaxPeriod::month(2024, 1).unwrap())
            .await
            .unwrap()
            .assessment;

        assert_eq!(assessment.status, GstComplianceStatus::AttentionRequired);
        assert_eq!(
            assessment.issues,
            vec![GstIssue::LateFilingHistory, GstIssue::SignificantVariation]
        );
        assert_eq!(assessment.confidence_score, 85);
    }

    #[tokio::test]
    async fn test_confidence_score_adjustments() {
        let (storage, calculator) = setup();
        for i in 0..51 {
            let category = if i % 5 == 0 { None } else { Some("Sales") };
            seed(&storage, 1_000, TransactionType::PaymentIn, GstTreatment::Standard, category, mid_january() + Duration::minutes(i)).await;
        }
        for month in 1..=12 {
            storage
                .save_tax_filing(
                    TaxFiling::new(
                        format!("f-{}", month),
                        "org-1".to_string(),
                        FilingType::Gst,
                        date(2023, month, 1),
                        date(2023, month, 28),
                        date(2023, month, 28) + Duration::days(28),
                    )
                    .filed_on(date(2023, month, 28)),
                )
                .unwrap();
        }

        let assessment = calculator
            .compute_gst_return("org-1", TaxPeriod::month(2024, 1).unwrap())
            .await
            .unwrap()
            .assessment;

        // 85 + 10 (history) - 15 (11 of 51 uncategorised) + 5 (filings)
        assert_eq!(assessment.confidence_score, 85);
        assert!(assessment.issues.is_empty());
        assert_eq!(assessment.status, GstComplianceStatus::Compliant);
    }
}
