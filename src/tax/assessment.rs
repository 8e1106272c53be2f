//! Organisation-level tax compliance assessment

use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::config::LedgerConfig;
use crate::tax::gst::FilingRequirement;
use crate::traits::LedgerStorage;
use crate::types::*;
use crate::utils::calendar::to_nz_local;
use crate::utils::clock::Clock;

pub const HIGH_SEVERITY_PENALTY: u32 = 25;
pub const MEDIUM_SEVERITY_PENALTY: u32 = 10;

/// Months until the organisation should be assessed again
pub const REVIEW_INTERVAL_MONTHS: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueSeverity {
    High,
    Medium,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxIssueKind {
    GstRegistrationRequired,
    FilingFrequencyIncorrect,
    OutstandingReturns,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxComplianceIssue {
    pub kind: TaxIssueKind,
    pub severity: IssueSeverity,
    pub description: String,
    pub action_required: String,
    /// Filings behind the issue, if any
    pub details: Vec<TaxFiling>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxComplianceAssessment {
    pub organization_id: String,
    pub compliant: bool,
    pub issues_count: usize,
    pub compliance_score: u32,
    pub issues: Vec<TaxComplianceIssue>,
    pub last_assessed: DateTime<Utc>,
    pub next_review_date: DateTime<Utc>,
}

impl TaxComplianceAssessment {
    pub fn has_issue(&self, kind: TaxIssueKind) -> bool {
        self.issues.iter().any(|issue| issue.kind == kind)
    }
}

/// 100 less the severity penalties, never below 0
pub fn compliance_score(issues: &[TaxComplianceIssue]) -> u32 {
    let penalty: u32 = issues
        .iter()
        .map(|issue| match issue.severity {
            IssueSeverity::High => HIGH_SEVERITY_PENALTY,
            IssueSeverity::Medium => MEDIUM_SEVERITY_PENALTY,
        })
        .sum();
    100u32.saturating_sub(penalty)
}

pub struct TaxComplianceAssessor<S: LedgerStorage> {
    storage: S,
    config: Arc<LedgerConfig>,
    clock: Arc<dyn Clock>,
}

impl<S: LedgerStorage> TaxComplianceAssessor<S> {
    pub fn new(storage: S, config: Arc<LedgerConfig>, clock: Arc<dyn Clock>) -> Self {
        Self {
            storage,
            config,
            clock,
        }
    }

    pub async fn assess(&self, organization_id: &str) -> LedgerResult<TaxComplianceAssessment> {
        let organization = self
            .storage
            .get_organization(organization_id)
            .await?
            .ok_or_else(|| LedgerError::OrganizationNotFound(organization_id.to_string()))?;

        let now = self.clock.now();
        let today = to_nz_local(now).date();
        let mut issues = Vec::new();

        if organization.requires_gst_registration(self.config.gst_registration_threshold_cents) {
            issues.push(TaxComplianceIssue {
                kind: TaxIssueKind::GstRegistrationRequired,
                severity: IssueSeverity::High,
                description: "GST registration required - annual turnover exceeds $60,000"
                    .to_string(),
                action_required: "Register for GST within 21 days".to_string(),
                details: Vec::new(),
            });
        }

        let expected = FilingRequirement::for_turnover(organization.annual_turnover_cents).frequency;
        if organization
            .gst_filing_frequency
            .is_some_and(|declared| declared != expected)
        {
            issues.push(TaxComplianceIssue {
                kind: TaxIssueKind::FilingFrequencyIncorrect,
                severity: IssueSeverity::Medium,
                description: "Filing frequency may need adjustment based on turnover".to_string(),
                action_required: "Review filing frequency with IRD".to_string(),
                details: Vec::new(),
            });
        }

        let outstanding: Vec<TaxFiling> = self
            .storage
            .tax_filings(organization_id)
            .await?
            .into_iter()
            .filter(|filing| filing.overdue(today))
            .collect();
        if !outstanding.is_empty() {
            issues.push(TaxComplianceIssue {
                kind: TaxIssueKind::OutstandingReturns,
                severity: IssueSeverity::High,
                description: format!("{} overdue tax returns", outstanding.len()),
                action_required: "File outstanding returns immediately".to_string(),
                details: outstanding,
            });
        }

        let next_review_date = now
            .checked_add_months(Months::new(REVIEW_INTERVAL_MONTHS))
            .ok_or_else(|| LedgerError::PreconditionFailed(format!("date {} is out of range", now)))?;

        let assessment = TaxComplianceAssessment {
            organization_id: organization.id,
            compliant: issues.is_empty(),
            issues_count: issues.len(),
            compliance_score: compliance_score(&issues),
            issues,
            last_assessed: now,
            next_review_date,
        };

        info!(
            organization_id,
            score = assessment.compliance_score,
            issues = assessment.issues_count,
            "Tax compliance assessed"
        );
        Ok(assessment)
    }
}
