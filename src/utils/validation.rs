//! Validation utilities
//!
//! Field checks return the `FieldError` instead of failing fast so callers
//! can collect every problem with a candidate.

use chrono::NaiveDate;

use crate::types::*;

/// Validate that an amount is a positive number of minor units
pub fn validate_positive_amount(amount_cents: i64) -> Result<(), FieldError> {
    if amount_cents <= 0 {
        Err(FieldError::new("amount", "must be greater than 0"))
    } else {
        Ok(())
    }
}

/// Validate that a transaction description is present and not too long
pub fn validate_transaction_description(
    description: &str,
    max_length: usize,
) -> Result<(), FieldError> {
    if description.trim().is_empty() {
        return Err(FieldError::new("description", "can't be blank"));
    }

    if description.chars().count() > max_length {
        return Err(FieldError::new(
            "description",
            format!("is too long (maximum is {} characters)", max_length),
        ));
    }

    Ok(())
}

/// Validate that an account can take part in a new transaction
pub fn validate_account_can_transact(field: &str, account: &Account) -> Result<(), FieldError> {
    if !account.active {
        return Err(FieldError::new(field, "is inactive"));
    }
    if account.frozen {
        return Err(FieldError::new(field, "is frozen"));
    }
    Ok(())
}

/// Validate an IRD number: 8 or 9 digits, nothing else
pub fn validate_ird_number(ird_number: &str) -> LedgerResult<()> {
    let valid = (8..=9).contains(&ird_number.len())
        && ird_number.chars().all(|c| c.is_ascii_digit());
    if valid {
        Ok(())
    } else {
        Err(LedgerError::PreconditionFailed(format!(
            "IRD number '{}' must be 8 or 9 digits",
            ird_number
        )))
    }
}

/// Validate that a reporting period starts before it ends
pub fn validate_period(start: NaiveDate, end: NaiveDate) -> LedgerResult<()> {
    if start < end {
        Ok(())
    } else {
        Err(LedgerError::PreconditionFailed(format!(
            "period start {} must be before period end {}",
            start, end
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amount_must_be_positive() {
        assert!(validate_positive_amount(1).is_ok());
        assert_eq!(validate_positive_amount(0).unwrap_err().field, "amount");
        assert!(validate_positive_amount(-500).is_err());
    }

    #[test]
    fn test_description_rules() {
        assert!(validate_transaction_description("Rent", 500).is_ok());
        assert_eq!(
            validate_transaction_description("   ", 500).unwrap_err().message,
            "can't be blank"
        );
        let long = "x".repeat(501);
        assert!(validate_transaction_description(&long, 500).is_err());
        assert!(validate_transaction_description(&"x".repeat(500), 500).is_ok());
    }

    #[test]
    fn test_ird_number_format() {
        assert!(validate_ird_number("12345678").is_ok());
        assert!(validate_ird_number("123456789").is_ok());
        assert!(validate_ird_number("1234567").is_err());
        assert!(validate_ird_number("1234567890").is_err());
        assert!(validate_ird_number("123-456-78").is_err());
    }

    #[test]
    fn test_period_order() {
        let jan = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let feb = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        assert!(validate_period(jan, feb).is_ok());
        assert!(matches!(
            validate_period(feb, jan),
            Err(LedgerError::PreconditionFailed(_))
        ));
        assert!(validate_period(jan, jan).is_err());
    }
}
