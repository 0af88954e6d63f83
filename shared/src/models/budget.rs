//! Budget line items and yearly summaries

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Minimal view of a budget line used for aggregation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetLine {
    pub category: String,
    pub planned_amount: Decimal,
    pub actual_amount: Decimal,
}

/// Totals for one category
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategoryTotals {
    pub category: String,
    pub planned: Decimal,
    pub actual: Decimal,
    /// planned - actual; negative when over budget
    pub variance: Decimal,
    pub item_count: usize,
}

/// Summary of a fiscal year
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BudgetSummary {
    pub fiscal_year: i32,
    pub categories: Vec<CategoryTotals>,
    pub total_planned: Decimal,
    pub total_actual: Decimal,
    pub total_variance: Decimal,
}

impl BudgetSummary {
    pub fn is_over_budget(&self) -> bool {
        self.total_variance < Decimal::ZERO
    }
}

/// Totals exceed what a decimal can represent
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("budget totals overflow")]
pub struct BudgetOverflow;

fn add(a: Decimal, b: Decimal) -> Result<Decimal, BudgetOverflow> {
    a.checked_add(b).ok_or(BudgetOverflow)
}

fn sub(a: Decimal, b: Decimal) -> Result<Decimal, BudgetOverflow> {
    a.checked_sub(b).ok_or(BudgetOverflow)
}

/// Group lines by category (alphabetical) and compute totals
pub fn summarize_budget(
    fiscal_year: i32,
    lines: &[BudgetLine],
) -> Result<BudgetSummary, BudgetOverflow> {
    let mut by_category: BTreeMap<&str, CategoryTotals> = BTreeMap::new();

    for line in lines {
        let entry = by_category
            .entry(line.category.as_str())
            .or_insert_with(|| CategoryTotals {
                category: line.category.clone(),
                planned: Decimal::ZERO,
                actual: Decimal::ZERO,
                variance: Decimal::ZERO,
                item_count: 0,
            });
        entry.planned = add(entry.planned, line.planned_amount)?;
        entry.actual = add(entry.actual, line.actual_amount)?;
        entry.variance = sub(entry.planned, entry.actual)?;
        entry.item_count += 1;
    }

    let categories: Vec<CategoryTotals> = by_category.into_values().collect();
    let mut total_planned = Decimal::ZERO;
    let mut total_actual = Decimal::ZERO;
    for category in &categories {
        total_planned = add(total_planned, category.planned)?;
        total_actual = add(total_actual, category.actual)?;
    }

    Ok(BudgetSummary {
        fiscal_year,
        categories,
        total_planned,
        total_actual,
        total_variance: sub(total_planned, total_actual)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn line(category: &str, planned: &str, actual: &str) -> BudgetLine {
        BudgetLine {
            category: category.to_string(),
            planned_amount: Decimal::from_str(planned).unwrap(),
            actual_amount: Decimal::from_str(actual).unwrap(),
        }
    }

    #[test]
    fn test_summary_groups_by_category() {
        let summary = summarize_budget(
            2026,
            &[
                line("Cleaning", "1200.00", "1100.50"),
                line("Elevator", "3000", "3400"),
                line("Cleaning", "300", "0"),
            ],
        )
        .unwrap();

        assert_eq!(summary.categories.len(), 2);
        assert_eq!(summary.categories[0].category, "Cleaning");
        assert_eq!(summary.categories[0].planned, Decimal::from_str("1500.00").unwrap());
        assert_eq!(summary.categories[0].item_count, 2);
        assert_eq!(summary.categories[1].variance, Decimal::from(-400));
        assert_eq!(summary.total_planned, Decimal::from(4500));
        assert_eq!(summary.total_actual, Decimal::from_str("4500.50").unwrap());
        assert!(summary.is_over_budget());
    }

    #[test]
    fn test_empty_year() {
        let summary = summarize_budget(2025, &[]).unwrap();
        assert!(summary.categories.is_empty());
        assert_eq!(summary.total_variance, Decimal::ZERO);
        assert!(!summary.is_over_budget());
    }

    #[test]
    fn test_overflowing_totals_are_an_error() {
        let huge = BudgetLine {
            category: "Reserve fund".to_string(),
            planned_amount: Decimal::MAX,
            actual_amount: Decimal::ZERO,
        };
        assert_eq!(
            summarize_budget(2026, &[huge.clone(), huge.clone()]),
            Err(BudgetOverflow)
        );

        // separate categories only overflow in the grand total
        let other = BudgetLine {
            category: "Insurance".to_string(),
            ..huge.clone()
        };
        assert_eq!(summarize_budget(2026, &[huge, other]), Err(BudgetOverflow));
    }

    #[test]
    fn test_variance_overflow_is_an_error() {
        let line = BudgetLine {
            category: "Elevator".to_string(),
            planned_amount: Decimal::MIN,
            actual_amount: Decimal::MAX,
        };
        assert_eq!(summarize_budget(2026, &[line]), Err(BudgetOverflow));
    }
}
