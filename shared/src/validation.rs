//! Validation utilities for the Condominium Management Platform

use rust_decimal::Decimal;

// ============================================================================
// General Validations
// ============================================================================

/// Validate password strength
pub fn validate_password(password: &str) -> Result<(), &'static str> {
    if password.chars().count() < 8 {
        return Err("Password must be at least 8 characters");
    }
    Ok(())
}

/// Validate a human-entered title (announcement, ballot, project, ...)
pub fn validate_title(title: &str) -> Result<(), &'static str> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err("Title must not be empty");
    }
    if trimmed.chars().count() > 200 {
        return Err("Title must be at most 200 characters");
    }
    Ok(())
}

/// Normalize an email for lookups
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

// ============================================================================
// Budget Validations
// ============================================================================

/// Amounts are stored as NUMERIC(14, 2): at most 999 999 999 999.99
pub const AMOUNT_LIMIT: i64 = 1_000_000_000_000;

/// Validate a monetary amount (non-negative, below the limit, at most two decimals)
pub fn validate_amount(amount: Decimal) -> Result<(), &'static str> {
    if amount < Decimal::ZERO {
        return Err("Amount cannot be negative");
    }
    if amount >= Decimal::from(AMOUNT_LIMIT) {
        return Err("Amount must be below 1 000 000 000 000");
    }
    if amount.scale() > 2 && amount != amount.round_dp(2) {
        return Err("Amount must have at most two decimal places");
    }
    Ok(())
}

/// Validate a fiscal year
pub fn validate_fiscal_year(year: i32) -> Result<(), &'static str> {
    if !(1970..=2200).contains(&year) {
        return Err("Fiscal year is out of range");
    }
    Ok(())
}

/// Validate a month number used as fiscal year start
pub fn validate_month(month: i16) -> Result<(), &'static str> {
    if !(1..=12).contains(&month) {
        return Err("Month must be between 1 and 12");
    }
    Ok(())
}

/// Validate an ISO 4217-style currency code
pub fn validate_currency(code: &str) -> Result<(), &'static str> {
    if code.len() == 3 && code.chars().all(|c| c.is_ascii_uppercase()) {
        Ok(())
    } else {
        Err("Currency must be a three-letter uppercase code")
    }
}

// ============================================================================
// Storage Validations
// ============================================================================

/// Validate an object-store path relative to the bucket
pub fn validate_storage_path(path: &str) -> Result<(), &'static str> {
    if path.is_empty() {
        return Err("Storage path must not be empty");
    }
    if path.starts_with('/') {
        return Err("Storage path must be relative");
    }
    if path.split('/').any(|segment| segment.is_empty() || segment == "." || segment == "..") {
        return Err("Storage path contains an invalid segment");
    }
    if path.chars().any(|c| c.is_control()) {
        return Err("Storage path contains control characters");
    }
    Ok(())
}

/// Validate a workflow name for the automation webhook (kebab-case)
pub fn validate_workflow_name(name: &str) -> Result<(), &'static str> {
    if name.is_empty() || name.len() > 64 {
        return Err("Workflow name must be 1-64 characters");
    }
    if name.starts_with('-') || name.ends_with('-') {
        return Err("Workflow name must not start or end with '-'");
    }
    if !name.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-') {
        return Err("Workflow name must be lowercase kebab-case");
    }
    Ok(())
}
