//! Engine configuration
//!
//! Regulatory constants (retention period, currencies, GST rate and
//! thresholds) live in one immutable struct handed to every component.
//! Every field has a default, so a partial JSON document is a valid config.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::types::{LedgerError, LedgerResult};
use crate::utils::money::{Currency, BASIS_POINTS};

/// Longest trailing window for the suspicious pattern rule (one year)
pub const MAX_SUSPICIOUS_WINDOW_HOURS: i64 = 8_760;

/// Longest audit retention period accepted
pub const MAX_AUDIT_RETENTION_YEARS: u32 = 100;

/// Configuration shared by the compliance engine, aggregator and tax calculator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerConfig {
    // === Currency ===
    /// Currency that is not "international"
    #[serde(default = "default_home_currency")]
    pub home_currency: Currency,

    /// Currencies a transaction may be denominated in
    #[serde(default = "default_supported_currencies")]
    pub supported_currencies: Vec<Currency>,

    // === Retention ===
    /// Years an audit entry must be kept (RBNZ)
    #[serde(default = "default_audit_retention_years")]
    pub audit_retention_years: u32,

    // === Tax ===
    /// GST rate in basis points (1500 = 15%)
    #[serde(default = "default_gst_rate_basis_points")]
    pub gst_rate_basis_points: i64,

    /// Annual turnover at which GST registration becomes mandatory
    #[serde(default = "default_gst_registration_threshold_cents")]
    pub gst_registration_threshold_cents: i64,

    // === Transaction thresholds ===
    /// Above this amount a transaction is "high value"
    #[serde(default = "default_high_value_threshold_cents")]
    pub high_value_threshold_cents: i64,

    /// Above this amount a transaction is only accepted in business hours
    #[serde(default = "default_large_transaction_threshold_cents")]
    pub large_transaction_threshold_cents: i64,

    /// Per-transaction amount counted by the suspicious pattern rule
    #[serde(default = "default_suspicious_amount_threshold_cents")]
    pub suspicious_amount_threshold_cents: i64,

    /// Number of prior qualifying transactions that triggers the rule
    #[serde(default = "default_suspicious_transaction_count")]
    pub suspicious_transaction_count: usize,

    /// Trailing window of the suspicious pattern rule
    #[serde(default = "default_suspicious_window_hours")]
    pub suspicious_window_hours: i64,

    #[serde(default = "default_max_description_length")]
    pub max_description_length: usize,

    // === Calendar ===
    #[serde(default = "default_business_hours_start")]
    pub business_hours_start: NaiveTime,

    #[serde(default = "default_business_hours_end")]
    pub business_hours_end: NaiveTime,

    /// Holiday jurisdiction code handed to the calendar provider
    #[serde(default = "default_jurisdiction")]
    pub jurisdiction: String,

    /// Additional non-business days (regional anniversaries, closures)
    #[serde(default)]
    pub extra_holidays: Vec<NaiveDate>,

    #[serde(default)]
    pub capabilities: Capabilities,
}

/// Optional subsystems the surrounding deployment provides
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    /// Public holiday data is available to the business calendar
    #[serde(default = "enabled")]
    pub holiday_calendar: bool,

    /// Qualifying transactions are queued for regulatory reporting
    #[serde(default = "enabled")]
    pub regulatory_reporting: bool,

    /// GST returns may be submitted to the tax authority
    #[serde(default)]
    pub live_tax_submission: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            holiday_calendar: true,
            regulatory_reporting: true,
            live_tax_submission: false,
        }
    }
}

fn enabled() -> bool {
    true
}

fn default_home_currency() -> Currency {
    Currency::nzd()
}

fn default_supported_currencies() -> Vec<Currency> {
    ["NZD", "AUD", "USD", "GBP", "EUR"]
        .into_iter()
        .map(Currency::new)
        .collect()
}

fn default_audit_retention_years() -> u32 {
    7
}

fn default_gst_rate_basis_points() -> i64 {
    1500
}

fn default_gst_registration_threshold_cents() -> i64 {
    6_000_000 // NZD 60,000
}

fn default_high_value_threshold_cents() -> i64 {
    1_000_000 // NZD 10,000
}

fn default_large_transaction_threshold_cents() -> i64 {
    5_000_000 // NZD 50,000
}

fn default_suspicious_amount_threshold_cents() -> i64 {
    500_000 // NZD 5,000
}

fn default_suspicious_transaction_count() -> usize {
    5
}

fn default_suspicious_window_hours() -> i64 {
    24
}

fn default_max_description_length() -> usize {
    500
}

fn default_business_hours_start() -> NaiveTime {
    NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN)
}

fn default_business_hours_end() -> NaiveTime {
    NaiveTime::from_hms_opt(17, 0, 0).unwrap_or(NaiveTime::MIN)
}

fn default_jurisdiction() -> String {
    "nz".to_string()
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            home_currency: default_home_currency(),
            supported_currencies: default_supported_currencies(),
            audit_retention_years: default_audit_retention_years(),
            gst_rate_basis_points: default_gst_rate_basis_points(),
            gst_registration_threshold_cents: default_gst_registration_threshold_cents(),
            high_value_threshold_cents: default_high_value_threshold_cents(),
            large_transaction_threshold_cents: default_large_transaction_threshold_cents(),
            suspicious_amount_threshold_cents: default_suspicious_amount_threshold_cents(),
            suspicious_transaction_count: default_suspicious_transaction_count(),
            suspicious_window_hours: default_suspicious_window_hours(),
            max_description_length: default_max_description_length(),
            business_hours_start: default_business_hours_start(),
            business_hours_end: default_business_hours_end(),
            jurisdiction: default_jurisdiction(),
            extra_holidays: Vec::new(),
            capabilities: Capabilities::default(),
        }
    }
}

impl LedgerConfig {
    /// Load and validate configuration from a JSON file
    pub fn from_file(path: &Path) -> LedgerResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| LedgerError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&content)
    }

    /// Parse and validate configuration from a JSON document
    pub fn from_json(content: &str) -> LedgerResult<Self> {
        let config: Self =
            serde_json::from_str(content).map_err(|e| LedgerError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject internally inconsistent settings
    pub fn validate(&self) -> LedgerResult<()> {
        if !self.supports_currency(&self.home_currency) {
            return Err(LedgerError::Config(format!(
                "home currency {} is not in the supported currency list",
                self.home_currency
            )));
        }
        if self.gst_rate_basis_points < 0 || self.gst_rate_basis_points > BASIS_POINTS {
            return Err(LedgerError::Config(format!(
                "GST rate of {} basis points is out of range",
                self.gst_rate_basis_points
            )));
        }
        if self.business_hours_start >= self.business_hours_end {
            return Err(LedgerError::Config(
                "business hours must start before they end".to_string(),
            ));
        }
        if self.audit_retention_years == 0 || self.audit_retention_years > MAX_AUDIT_RETENTION_YEARS {
            return Err(LedgerError::Config(format!(
                "audit retention of {} years must be between 1 and {}",
                self.audit_retention_years, MAX_AUDIT_RETENTION_YEARS
            )));
        }
        if self.suspicious_window_hours <= 0
            || self.suspicious_window_hours > MAX_SUSPICIOUS_WINDOW_HOURS
        {
            return Err(LedgerError::Config(format!(
                "suspicious pattern window of {} hours must be between 1 and {}",
                self.suspicious_window_hours, MAX_SUSPICIOUS_WINDOW_HOURS
            )));
        }
        Ok(())
    }

    pub fn supports_currency(&self, currency: &Currency) -> bool {
        self.supported_currencies.contains(currency)
    }

    pub fn is_international(&self, currency: &Currency) -> bool {
        *currency != self.home_currency
    }

    /// Audit retention as whole months, for calendar-exact arithmetic
    pub fn audit_retention_months(&self) -> LedgerResult<u32> {
        self.audit_retention_years.checked_mul(12).ok_or_else(|| {
            LedgerError::Config(format!(
                "audit retention of {} years is out of range",
                self.audit_retention_years
            ))
        })
    }

    pub fn suspicious_window(&self) -> LedgerResult<chrono::Duration> {
        chrono::Duration::try_hours(self.suspicious_window_hours).ok_or_else(|| {
            LedgerError::Config(format!(
                "suspicious pattern window of {} hours is out of range",
                self.suspicious_window_hours
            ))
        })
    }

    /// Comma separated list used in validation messages
    pub fn supported_currency_list(&self) -> String {
        self.supported_currencies
            .iter()
            .map(Currency::code)
            .collect::<Vec<_>>()
            .join(", ")
    }
}
