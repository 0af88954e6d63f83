//! Condominium (tenant) and settings service

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use shared::{SystemRole, DEFAULT_SETTINGS};

/// Condominium service
#[derive(Clone)]
pub struct CondominiumService {
    db: PgPool,
}

/// Condominium information
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Condominium {
    pub id: Uuid,
    pub name: String,
    pub address: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Condominium as seen by one of its members
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct MyCondominium {
    pub id: Uuid,
    pub name: String,
    pub address: Option<String>,
    pub role: SystemRole,
    pub member_count: i64,
}

/// Per-condominium settings
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CondominiumSettings {
    pub condominium_id: Uuid,
    pub currency: String,
    pub fiscal_year_start_month: i16,
    pub allow_member_initiatives: bool,
    pub notify_on_announcement: bool,
    pub notify_on_ballot: bool,
}

/// Input for creating a condominium
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCondominiumInput {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(max = 500))]
    pub address: Option<String>,
}

/// Input for updating a condominium
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCondominiumInput {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(max = 500))]
    pub address: Option<String>,
}

/// Input for updating settings; absent fields are left unchanged
#[derive(Debug, Deserialize)]
pub struct UpdateSettingsInput {
    pub currency: Option<String>,
    pub fiscal_year_start_month: Option<i16>,
    pub allow_member_initiatives: Option<bool>,
    pub notify_on_announcement: Option<bool>,
    pub notify_on_ballot: Option<bool>,
}

impl UpdateSettingsInput {
    fn check(&self) -> AppResult<()> {
        if let Some(currency) = &self.currency {
            shared::validate_currency(currency).map_err(|e| AppError::invalid("currency", e))?;
        }
        if let Some(month) = self.fiscal_year_start_month {
            shared::validate_month(month)
                .map_err(|e| AppError::invalid("fiscal_year_start_month", e))?;
        }
        Ok(())
    }
}

impl CondominiumService {
    /// Create a new CondominiumService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create a condominium; the creator becomes its first admin
    pub async fn create(&self, user_id: Uuid, input: CreateCondominiumInput) -> AppResult<Condominium> {
        input.validate()?;

        let mut tx = self.db.begin().await?;

        let condominium = sqlx::query_as::<_, Condominium>(
            r#"
            INSERT INTO condominiums (name, address, created_by)
            VALUES ($1, $2, $3)
            RETURNING id, name, address, created_by, created_at, updated_at
            "#,
        )
        .bind(input.name.trim())
        .bind(input.address.as_deref().map(str::trim))
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO condominium_settings
                (condominium_id, currency, fiscal_year_start_month,
                 allow_member_initiatives, notify_on_announcement, notify_on_ballot)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(condominium.id)
        .bind(DEFAULT_SETTINGS.currency)
        .bind(DEFAULT_SETTINGS.fiscal_year_start_month)
        .bind(DEFAULT_SETTINGS.allow_member_initiatives)
        .bind(DEFAULT_SETTINGS.notify_on_announcement)
        .bind(DEFAULT_SETTINGS.notify_on_ballot)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO condominium_members (condominium_id, user_id, role)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(condominium.id)
        .bind(user_id)
        .bind(SystemRole::Admin)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(condominium_id = %condominium.id, %user_id, "condominium created");
        Ok(condominium)
    }

    /// Condominiums the user belongs to, with their role
    pub async fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<MyCondominium>> {
        let condominiums = sqlx::query_as::<_, MyCondominium>(
            r#"
            SELECT c.id, c.name, c.address, m.role,
                   (SELECT COUNT(*) FROM condominium_members cm
                    WHERE cm.condominium_id = c.id) AS member_count
            FROM condominiums c
            JOIN condominium_members m ON m.condominium_id = c.id
            WHERE m.user_id = $1
            ORDER BY c.name ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        Ok(condominiums)
    }

    pub async fn get(&self, condominium_id: Uuid) -> AppResult<Condominium> {
        sqlx::query_as::<_, Condominium>(
            r#"
            SELECT id, name, address, created_by, created_at, updated_at
            FROM condominiums
            WHERE id = $1
            "#,
        )
        .bind(condominium_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Condominium".to_string()))
    }

    pub async fn update(
        &self,
        condominium_id: Uuid,
        input: UpdateCondominiumInput,
    ) -> AppResult<Condominium> {
        input.validate()?;

        sqlx::query_as::<_, Condominium>(
            r#"
            UPDATE condominiums
            SET name = COALESCE($2, name),
                address = COALESCE($3, address),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, address, created_by, created_at, updated_at
            "#,
        )
        .bind(condominium_id)
        .bind(input.name.as_deref().map(str::trim))
        .bind(input.address.as_deref().map(str::trim))
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Condominium".to_string()))
    }

    // ========================================================================
    // Settings
    // ========================================================================

    pub async fn settings(&self, condominium_id: Uuid) -> AppResult<CondominiumSettings> {
        sqlx::query_as::<_, CondominiumSettings>(
            r#"
            SELECT condominium_id, currency, fiscal_year_start_month,
                   allow_member_initiatives, notify_on_announcement, notify_on_ballot
            FROM condominium_settings
            WHERE condominium_id = $1
            "#,
        )
        .bind(condominium_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Condominium settings".to_string()))
    }

    pub async fn update_settings(
        &self,
        condominium_id: Uuid,
        input: UpdateSettingsInput,
    ) -> AppResult<CondominiumSettings> {
        input.check()?;

        sqlx::query_as::<_, CondominiumSettings>(
            r#"
            UPDATE condominium_settings
            SET currency = COALESCE($2, currency),
                fiscal_year_start_month = COALESCE($3, fiscal_year_start_month),
                allow_member_initiatives = COALESCE($4, allow_member_initiatives),
                notify_on_announcement = COALESCE($5, notify_on_announcement),
                notify_on_ballot = COALESCE($6, notify_on_ballot)
            WHERE condominium_id = $1
            RETURNING condominium_id, currency, fiscal_year_start_month,
                      allow_member_initiatives, notify_on_announcement, notify_on_ballot
            "#,
        )
        .bind(condominium_id)
        .bind(input.currency.as_deref())
        .bind(input.fiscal_year_start_month)
        .bind(input.allow_member_initiatives)
        .bind(input.notify_on_announcement)
        .bind(input.notify_on_ballot)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Condominium settings".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings_input() -> UpdateSettingsInput {
        UpdateSettingsInput {
            currency: None,
            fiscal_year_start_month: None,
            allow_member_initiatives: None,
            notify_on_announcement: None,
            notify_on_ballot: None,
        }
    }

    #[test]
    fn test_settings_input_checks_currency_and_month() {
        assert!(settings_input().check().is_ok());

        let mut bad_currency = settings_input();
        bad_currency.currency = Some("euro".to_string());
        assert!(matches!(
            bad_currency.check(),
            Err(AppError::Validation { field, .. }) if field == "currency"
        ));

        let mut bad_month = settings_input();
        bad_month.fiscal_year_start_month = Some(13);
        assert!(bad_month.check().is_err());
    }

    #[test]
    fn test_create_input_requires_name() {
        let input = CreateCondominiumInput {
            name: String::new(),
            address: None,
        };
        assert!(input.validate().is_err());
    }
}
