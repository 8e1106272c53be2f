//! Compliance rule engine
//!
//! Validates a candidate transaction against the regulatory rules and
//! derives its compliance flags. Every validation rule runs, so a rejected
//! candidate carries all of its field errors at once.

use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::LedgerConfig;
use crate::traits::BusinessCalendar;
use crate::types::*;
use crate::utils::validation::{
    validate_account_can_transact, validate_positive_amount, validate_transaction_description,
};

pub const HIGH_VALUE_APPROVAL_MESSAGE: &str =
    "high value transactions require authorized user approval";
pub const INTERNATIONAL_DISABLED_MESSAGE: &str =
    "international transactions not enabled for this organization";
pub const LARGE_OUTSIDE_HOURS_MESSAGE: &str =
    "large transactions must be processed during business hours";

/// State the rules read, loaded by the caller before classification
#[derive(Debug, Clone, Copy)]
pub struct ClassificationContext<'a> {
    pub organization: &'a Organization,
    pub account: &'a Account,
    pub counterparty: Option<&'a Account>,
    pub user: &'a User,
    /// The account's transactions in the trailing suspicious-pattern window
    pub recent_transactions: &'a [FinancialTransaction],
    /// Wall-clock submission time
    pub submitted_at: DateTime<Utc>,
}

/// Stateless rule engine
#[derive(Clone)]
pub struct ComplianceEngine {
    config: Arc<LedgerConfig>,
    calendar: Arc<dyn BusinessCalendar>,
}

impl ComplianceEngine {
    pub fn new(config: Arc<LedgerConfig>, calendar: Arc<dyn BusinessCalendar>) -> Self {
        Self { config, calendar }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Validate a candidate and, if it is acceptable, classify it.
    ///
    /// Validation failures come back as `LedgerError::ValidationFailed` with
    /// one `FieldError` per broken rule. A failing calendar is reported as
    /// `DependencyUnavailable`.
    pub fn validate_and_classify(
        &self,
        candidate: &TransactionCandidate,
        ctx: &ClassificationContext<'_>,
    ) -> LedgerResult<Classification> {
        let business_time = self.calendar.is_business_time(ctx.submitted_at)?;
        let window = self.config.suspicious_window()?;

        let errors = self.validate(candidate, ctx, business_time);
        if !errors.is_empty() {
            warn!(
                account_id = %candidate.account_id,
                amount_cents = candidate.amount_cents,
                errors = %errors,
                "Transaction candidate rejected"
            );
            return Err(LedgerError::ValidationFailed(errors));
        }

        let classification =
            Classification::from_flags(self.derive_flags(candidate, ctx, business_time, window));
        debug!(
            account_id = %candidate.account_id,
            flags = ?classification.flag_tokens(),
            risk_score = classification.risk_score,
            category = ?classification.compliance_category,
            "Transaction classified"
        );
        Ok(classification)
    }

    fn validate(
        &self,
        candidate: &TransactionCandidate,
        ctx: &ClassificationContext<'_>,
        business_time: bool,
    ) -> ValidationErrors {
        let config = &self.config;
        let mut errors = ValidationErrors::new();

        if let Err(e) = validate_positive_amount(candidate.amount_cents) {
            errors.push(e);
        }

        if let Err(e) =
            validate_transaction_description(&candidate.description, config.max_description_length)
        {
            errors.push(e);
        }

        if !config.supports_currency(&candidate.currency) {
            errors.add(
                "currency",
                format!(
                    "must be a supported currency: {}",
                    config.supported_currency_list()
                ),
            );
        }

        if let Err(e) = validate_account_can_transact("account", ctx.account) {
            errors.push(e);
        }
        if let Some(counterparty) = ctx.counterparty {
            if let Err(e) = validate_account_can_transact("counterparty_account", counterparty) {
                errors.push(e);
            }
        }

        if ctx.user.organization_id != ctx.account.organization_id {
            errors.add("created_by", "must belong to the account's organization");
        }

        if candidate.amount_cents > config.high_value_threshold_cents
            && !ctx.user.authorized_for_high_value()
        {
            errors.add("amount", HIGH_VALUE_APPROVAL_MESSAGE);
        }

        if config.is_international(&candidate.currency)
            && !ctx.organization.international_transactions_enabled
        {
            errors.add("currency", INTERNATIONAL_DISABLED_MESSAGE);
        }

        if candidate.amount_cents > config.large_transaction_threshold_cents && !business_time {
            errors.add("base", LARGE_OUTSIDE_HOURS_MESSAGE);
        }

        errors
    }

    fn derive_flags(
        &self,
        candidate: &TransactionCandidate,
        ctx: &ClassificationContext<'_>,
        business_time: bool,
        window: Duration,
    ) -> BTreeSet<ComplianceFlag> {
        let mut flags = BTreeSet::new();

        if candidate.amount_cents > self.config.high_value_threshold_cents {
            flags.insert(ComplianceFlag::HighValue);
        }
        if self.config.is_international(&candidate.currency) {
            flags.insert(ComplianceFlag::International);
        }
        if self.suspicious_pattern(candidate, ctx, window) {
            flags.insert(ComplianceFlag::SuspiciousPattern);
        }
        if !business_time {
            flags.insert(ComplianceFlag::AfterHours);
        }

        flags
    }

    /// Enough large transactions on the same account inside the trailing window
    fn suspicious_pattern(
        &self,
        candidate: &TransactionCandidate,
        ctx: &ClassificationContext<'_>,
        window: Duration,
    ) -> bool {
        let window_start = ctx.submitted_at - window;
        let qualifying = ctx
            .recent_transactions
            .iter()
            .filter(|txn| txn.account_id == candidate.account_id)
            .filter(|txn| txn.created_at >= window_start && txn.created_at <= ctx.submitted_at)
            .filter(|txn| txn.amount_cents() > self.config.suspicious_amount_threshold_cents)
            .count();
        qualifying >= self.config.suspicious_transaction_count
    }
}
