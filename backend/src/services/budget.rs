//! Budget service: line items per fiscal year, summaries and export

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::export::{to_csv, CsvExport};
use shared::{summarize_budget, BudgetLine, BudgetSummary};

/// Budget service
#[derive(Clone)]
pub struct BudgetService {
    db: PgPool,
}

/// Budget line item
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct BudgetItem {
    pub id: Uuid,
    pub condominium_id: Uuid,
    pub fiscal_year: i32,
    pub category: String,
    pub description: Option<String>,
    pub planned_amount: Decimal,
    pub actual_amount: Decimal,
    pub created_at: DateTime<Utc>,
}

impl From<&BudgetItem> for BudgetLine {
    fn from(item: &BudgetItem) -> Self {
        BudgetLine {
            category: item.category.clone(),
            planned_amount: item.planned_amount,
            actual_amount: item.actual_amount,
        }
    }
}

/// Input for creating a budget item
#[derive(Debug, Deserialize, Validate)]
pub struct CreateBudgetItemInput {
    pub fiscal_year: i32,
    #[validate(length(min = 1, max = 100))]
    pub category: String,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    pub planned_amount: Decimal,
    #[serde(default)]
    pub actual_amount: Decimal,
}

/// Input for updating a budget item
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateBudgetItemInput {
    #[validate(length(min = 1, max = 100))]
    pub category: Option<String>,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    pub planned_amount: Option<Decimal>,
    pub actual_amount: Option<Decimal>,
}

/// Row of the yearly CSV export
#[derive(Debug, Serialize)]
struct BudgetExportRow<'a> {
    fiscal_year: i32,
    category: &'a str,
    description: &'a str,
    planned_amount: Decimal,
    actual_amount: Decimal,
    variance: Decimal,
}

const BUDGET_EXPORT_HEADERS: [&str; 6] = [
    "fiscal_year",
    "category",
    "description",
    "planned_amount",
    "actual_amount",
    "variance",
];

fn check_amount(field: &str, amount: Decimal) -> AppResult<()> {
    shared::validate_amount(amount).map_err(|e| AppError::invalid(field, e))
}

fn check_year(year: i32) -> AppResult<()> {
    shared::validate_fiscal_year(year).map_err(|e| AppError::invalid("fiscal_year", e))
}

impl BudgetService {
    /// Create a new BudgetService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Items of a fiscal year, grouped by category
    pub async fn list(&self, condominium_id: Uuid, fiscal_year: i32) -> AppResult<Vec<BudgetItem>> {
        check_year(fiscal_year)?;

        let items = sqlx::query_as::<_, BudgetItem>(
            r#"
            SELECT id, condominium_id, fiscal_year, category, description,
                   planned_amount, actual_amount, created_at
            FROM budget_items
            WHERE condominium_id = $1 AND fiscal_year = $2
            ORDER BY category ASC, created_at ASC
            "#,
        )
        .bind(condominium_id)
        .bind(fiscal_year)
        .fetch_all(&self.db)
        .await?;

        Ok(items)
    }

    pub async fn create(&self, condominium_id: Uuid, input: CreateBudgetItemInput) -> AppResult<BudgetItem> {
        input.validate()?;
        check_year(input.fiscal_year)?;
        check_amount("planned_amount", input.planned_amount)?;
        check_amount("actual_amount", input.actual_amount)?;

        let item = sqlx::query_as::<_, BudgetItem>(
            r#"
            INSERT INTO budget_items
                (condominium_id, fiscal_year, category, description, planned_amount, actual_amount)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, condominium_id, fiscal_year, category, description,
                      planned_amount, actual_amount, created_at
            "#,
        )
        .bind(condominium_id)
        .bind(input.fiscal_year)
        .bind(input.category.trim())
        .bind(input.description.as_deref())
        .bind(input.planned_amount)
        .bind(input.actual_amount)
        .fetch_one(&self.db)
        .await?;

        Ok(item)
    }

    pub async fn update(
        &self,
        condominium_id: Uuid,
        item_id: Uuid,
        input: UpdateBudgetItemInput,
    ) -> AppResult<BudgetItem> {
        input.validate()?;
        if let Some(amount) = input.planned_amount {
            check_amount("planned_amount", amount)?;
        }
        if let Some(amount) = input.actual_amount {
            check_amount("actual_amount", amount)?;
        }

        sqlx::query_as::<_, BudgetItem>(
            r#"
            UPDATE budget_items
            SET category = COALESCE($3, category),
                description = COALESCE($4, description),
                planned_amount = COALESCE($5, planned_amount),
                actual_amount = COALESCE($6, actual_amount)
            WHERE condominium_id = $1 AND id = $2
            RETURNING id, condominium_id, fiscal_year, category, description,
                      planned_amount, actual_amount, created_at
            "#,
        )
        .bind(condominium_id)
        .bind(item_id)
        .bind(input.category.as_deref().map(str::trim))
        .bind(input.description.as_deref())
        .bind(input.planned_amount)
        .bind(input.actual_amount)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Budget item".to_string()))
    }

    pub async fn delete(&self, condominium_id: Uuid, item_id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM budget_items WHERE condominium_id = $1 AND id = $2")
            .bind(condominium_id)
            .bind(item_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Budget item".to_string()));
        }

        Ok(())
    }

    /// Per-category totals for a fiscal year
    pub async fn summary(&self, condominium_id: Uuid, fiscal_year: i32) -> AppResult<BudgetSummary> {
        let items = self.list(condominium_id, fiscal_year).await?;
        let lines: Vec<BudgetLine> = items.iter().map(BudgetLine::from).collect();
        summarize_budget(fiscal_year, &lines).map_err(|e| AppError::Internal(e.to_string()))
    }

    pub async fn export(&self, condominium_id: Uuid, fiscal_year: i32) -> AppResult<CsvExport> {
        let items = self.list(condominium_id, fiscal_year).await?;
        Ok(CsvExport {
            filename: format!("budget-{}.csv", fiscal_year),
            body: budget_csv(&items)?,
        })
    }
}

fn budget_csv(items: &[BudgetItem]) -> AppResult<String> {
    let rows: Vec<BudgetExportRow> = items
        .iter()
        .map(|item| BudgetExportRow {
            fiscal_year: item.fiscal_year,
            category: &item.category,
            description: item.description.as_deref().unwrap_or(""),
            planned_amount: item.planned_amount,
            actual_amount: item.actual_amount,
            variance: item.planned_amount - item.actual_amount,
        })
        .collect();
    to_csv(&BUDGET_EXPORT_HEADERS, &rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(value: &str) -> Decimal {
        value.parse().unwrap()
    }

    fn item(category: &str, planned: Decimal, actual: Decimal) -> BudgetItem {
        BudgetItem {
            id: Uuid::new_v4(),
            condominium_id: Uuid::new_v4(),
            fiscal_year: 2026,
            category: category.to_string(),
            description: None,
            planned_amount: planned,
            actual_amount: actual,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_budget_csv_includes_variance() {
        let csv = budget_csv(&[item("Cleaning", dec("1200.00"), dec("1350.50"))]).unwrap();
        assert_eq!(
            csv,
            "fiscal_year,category,description,planned_amount,actual_amount,variance\n\
             2026,Cleaning,,1200.00,1350.50,-150.50\n"
        );
    }

    #[test]
    fn test_negative_amount_rejected() {
        assert!(check_amount("planned_amount", dec("-1")).is_err());
        assert!(check_amount("planned_amount", dec("10.25")).is_ok());
    }

    #[tokio::test]
    async fn test_oversized_amount_is_a_bad_request() {
        // validation runs before the pool is ever used
        let db = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgres://localhost/unused")
            .unwrap();
        let err = BudgetService::new(db)
            .create(
                Uuid::new_v4(),
                CreateBudgetItemInput {
                    fiscal_year: 2026,
                    category: "Reserve fund".to_string(),
                    description: None,
                    planned_amount: dec("1000000000000000.00"),
                    actual_amount: Decimal::ZERO,
                },
            )
            .await
            .unwrap_err();

        assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST);
        assert!(matches!(err, AppError::Validation { ref field, .. } if field == "planned_amount"));
    }
}
