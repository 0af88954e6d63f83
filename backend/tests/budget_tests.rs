//! Budget tests
//!
//! Property-based and unit tests for:
//! - Per-category budget summaries
//! - Amount, fiscal year and settings validation

use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::{
    summarize_budget, validate_amount, validate_currency, validate_fiscal_year, validate_month,
    BudgetLine, BudgetOverflow, AMOUNT_LIMIT,
};
use std::str::FromStr;

// ============================================================================
// Property Test Strategies
// ============================================================================

/// Amounts in cents, 0.00 to 99 999.99
fn amount_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..10_000_000).prop_map(|cents| Decimal::new(cents, 2))
}

fn category_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("Cleaning".to_string()),
        Just("Elevator".to_string()),
        Just("Insurance".to_string()),
        Just("Utilities".to_string()),
        Just("Reserve fund".to_string()),
    ]
}

fn line_strategy() -> impl Strategy<Value = BudgetLine> {
    (category_strategy(), amount_strategy(), amount_strategy()).prop_map(
        |(category, planned_amount, actual_amount)| BudgetLine {
            category,
            planned_amount,
            actual_amount,
        },
    )
}

// ============================================================================
// Property-Based Tests
// ============================================================================

proptest! {
    /// Totals equal the sum of every line
    #[test]
    fn test_totals_match_lines(lines in proptest::collection::vec(line_strategy(), 0..30)) {
        let summary = summarize_budget(2026, &lines).unwrap();
        let planned: Decimal = lines.iter().map(|l| l.planned_amount).sum();
        let actual: Decimal = lines.iter().map(|l| l.actual_amount).sum();

        prop_assert_eq!(summary.total_planned, planned);
        prop_assert_eq!(summary.total_actual, actual);
        prop_assert_eq!(summary.total_variance, planned - actual);
        prop_assert_eq!(summary.is_over_budget(), actual > planned);
    }

    /// Categories are unique, sorted and account for every line
    #[test]
    fn test_categories_partition_lines(lines in proptest::collection::vec(line_strategy(), 0..30)) {
        let summary = summarize_budget(2026, &lines).unwrap();
        let names: Vec<&str> = summary.categories.iter().map(|c| c.category.as_str()).collect();
        let mut sorted = names.clone();
        sorted.sort();
        sorted.dedup();

        prop_assert_eq!(names, sorted);
        prop_assert_eq!(
            summary.categories.iter().map(|c| c.item_count).sum::<usize>(),
            lines.len()
        );
        for category in &summary.categories {
            prop_assert_eq!(category.variance, category.planned - category.actual);
        }
    }

    /// Non-negative amounts with cent precision are always accepted
    #[test]
    fn test_cent_amounts_valid(amount in amount_strategy()) {
        prop_assert!(validate_amount(amount).is_ok());
    }

    /// Negative amounts are always rejected
    #[test]
    fn test_negative_amounts_invalid(cents in 1i64..10_000_000) {
        prop_assert!(validate_amount(Decimal::new(-cents, 2)).is_err());
    }

    /// Anything the NUMERIC(14, 2) columns cannot hold is rejected up front
    #[test]
    fn test_amounts_at_or_above_limit_invalid(extra_cents in 0i64..1_000_000_000_000) {
        let amount = Decimal::from(AMOUNT_LIMIT) + Decimal::new(extra_cents, 2);
        prop_assert!(validate_amount(amount).is_err());
    }

    /// Fiscal year start month is 1-12
    #[test]
    fn test_month_range(month in -5i16..20) {
        prop_assert_eq!(validate_month(month).is_ok(), (1..=12).contains(&month));
    }

    /// Currency codes are three uppercase letters
    #[test]
    fn test_currency_codes(code in "[A-Z]{3}") {
        prop_assert!(validate_currency(&code).is_ok());
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod summary_tests {
    use super::*;

    fn line(category: &str, planned: &str, actual: &str) -> BudgetLine {
        BudgetLine {
            category: category.to_string(),
            planned_amount: Decimal::from_str(planned).unwrap(),
            actual_amount: Decimal::from_str(actual).unwrap(),
        }
    }

    #[test]
    fn test_empty_year() {
        let summary = summarize_budget(2025, &[]).unwrap();
        assert_eq!(summary.fiscal_year, 2025);
        assert!(summary.categories.is_empty());
        assert_eq!(summary.total_variance, Decimal::ZERO);
        assert!(!summary.is_over_budget());
    }

    #[test]
    fn test_over_budget_category() {
        let summary = summarize_budget(
            2026,
            &[
                line("Elevator", "1200.00", "1450.50"),
                line("Cleaning", "800.00", "640.00"),
                line("Elevator", "300.00", "0.00"),
            ],
        )
        .unwrap();

        assert_eq!(summary.categories[0].category, "Cleaning");
        let elevator = &summary.categories[1];
        assert_eq!(elevator.item_count, 2);
        assert_eq!(elevator.variance, Decimal::from_str("49.50").unwrap());
        assert_eq!(summary.total_actual, Decimal::from_str("2090.50").unwrap());
        assert!(!summary.is_over_budget());
    }

    #[test]
    fn test_sub_cent_amount_rejected() {
        assert!(validate_amount(Decimal::from_str("10.005").unwrap()).is_err());
        assert!(validate_amount(Decimal::from_str("10.500").unwrap()).is_ok());
    }

    #[test]
    fn test_amount_limit_boundary() {
        assert!(validate_amount(Decimal::from_str("999999999999.99").unwrap()).is_ok());
        assert!(validate_amount(Decimal::from_str("1000000000000.00").unwrap()).is_err());
        assert!(validate_amount(Decimal::from_str("1000000000000000.00").unwrap()).is_err());
    }

    #[test]
    fn test_summary_overflow_reported() {
        let lines = vec![
            BudgetLine {
                category: "Reserve fund".to_string(),
                planned_amount: Decimal::MAX,
                actual_amount: Decimal::ZERO,
            };
            2
        ];
        assert_eq!(summarize_budget(2026, &lines), Err(BudgetOverflow));
    }

    #[test]
    fn test_fiscal_year_range() {
        assert!(validate_fiscal_year(2026).is_ok());
        assert!(validate_fiscal_year(1969).is_err());
        assert!(validate_fiscal_year(2201).is_err());
    }

    #[test]
    fn test_lowercase_currency_rejected() {
        assert!(validate_currency("eur").is_err());
        assert!(validate_currency("EURO").is_err());
    }
}
