//! PAYE (Pay As You Earn) summaries from payroll data

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

use crate::tax::gst::TaxPeriod;
use crate::traits::{LedgerStorage, PayrollProvider};
use crate::types::*;

pub const NO_EMPLOYEES_REASON: &str = "No employees registered";
pub const NO_PAYROLL_PROVIDER_REASON: &str = "Payroll data unavailable";

/// Day of the following month PAYE is due
pub const PAYE_DUE_DAY: u32 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayeIssue {
    /// Wages were paid but nothing was withheld
    NoPayeDeducted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayeSummary {
    pub period: TaxPeriod,
    pub gross_wages_cents: i64,
    pub paye_cents: i64,
    pub acc_levies_cents: i64,
    pub kiwisaver_cents: i64,
    /// PAYE plus KiwiSaver contributions
    pub net_payment_cents: i64,
    pub due_date: NaiveDate,
    pub issues: Vec<PayeIssue>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PayeOutcome {
    NotApplicable { reason: String },
    Calculated(PayeSummary),
}

impl PayeOutcome {
    pub fn is_applicable(&self) -> bool {
        matches!(self, PayeOutcome::Calculated(_))
    }
}

/// 20th of the month after `last_day`
pub fn paye_due_date(last_day: NaiveDate) -> LedgerResult<NaiveDate> {
    let (year, month) = if last_day.month() == 12 {
        (last_day.year() + 1, 1)
    } else {
        (last_day.year(), last_day.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, PAYE_DUE_DAY)
        .ok_or_else(|| LedgerError::PreconditionFailed(format!("date {} is out of range", last_day)))
}

pub struct PayeCalculator<S: LedgerStorage> {
    storage: S,
    payroll: Option<Arc<dyn PayrollProvider>>,
}

impl<S: LedgerStorage> PayeCalculator<S> {
    pub fn new(storage: S, payroll: Option<Arc<dyn PayrollProvider>>) -> Self {
        Self { storage, payroll }
    }

    /// PAYE owed for a period, or why it does not apply
    pub async fn calculate(
        &self,
        organization_id: &str,
        period: TaxPeriod,
    ) -> LedgerResult<PayeOutcome> {
        self.storage
            .get_organization(organization_id)
            .await?
            .ok_or_else(|| LedgerError::OrganizationNotFound(organization_id.to_string()))?;

        let payroll = match &self.payroll {
            Some(payroll) => payroll,
            None => {
                warn!(organization_id, "No payroll provider configured, PAYE not calculated");
                return Ok(PayeOutcome::NotApplicable {
                    reason: NO_PAYROLL_PROVIDER_REASON.to_string(),
                });
            }
        };

        if !payroll.has_employees(organization_id).await? {
            return Ok(PayeOutcome::NotApplicable {
                reason: NO_EMPLOYEES_REASON.to_string(),
            });
        }

        let totals = payroll
            .payroll_totals(organization_id, period.start(), period.end())
            .await?;

        let mut issues = Vec::new();
        if totals.gross_wages_cents > 0 && totals.paye_cents == 0 {
            issues.push(PayeIssue::NoPayeDeducted);
        }

        Ok(PayeOutcome::Calculated(PayeSummary {
            period,
            gross_wages_cents: totals.gross_wages_cents,
            paye_cents: totals.paye_cents,
            acc_levies_cents: totals.acc_levies_cents,
            kiwisaver_cents: totals.kiwisaver_cents,
            net_payment_cents: totals.paye_cents + totals.kiwisaver_cents,
            due_date: paye_due_date(period.last_day())?,
            issues,
        }))
    }
}
