//! Initiative service: member proposals, support and decisions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::project::Project;
use shared::{InitiativeStatus, SystemRole};

/// Initiative service
#[derive(Clone)]
pub struct InitiativeService {
    db: PgPool,
}

/// Initiative with support information for the caller
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Initiative {
    pub id: Uuid,
    pub condominium_id: Uuid,
    pub title: String,
    pub description: String,
    pub status: InitiativeStatus,
    pub proposed_by: Uuid,
    pub proposer_name: String,
    pub created_at: DateTime<Utc>,
    pub supporter_count: i64,
    pub supported_by_me: bool,
}

/// Input for proposing an initiative
#[derive(Debug, Deserialize, Validate)]
pub struct ProposeInitiativeInput {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1, max = 10000))]
    pub description: String,
}

/// Input for an admin decision
#[derive(Debug, Deserialize)]
pub struct DecideInitiativeInput {
    pub status: InitiativeStatus,
}

const INITIATIVE_SELECT: &str = r#"
    SELECT i.id, i.condominium_id, i.title, i.description, i.status,
           i.proposed_by, u.full_name AS proposer_name, i.created_at,
           (SELECT COUNT(*) FROM initiative_supporters s
            WHERE s.initiative_id = i.id) AS supporter_count,
           EXISTS(SELECT 1 FROM initiative_supporters s
                  WHERE s.initiative_id = i.id AND s.user_id = $2) AS supported_by_me
    FROM initiatives i
    JOIN users u ON u.id = i.proposed_by
"#;

impl InitiativeService {
    /// Create a new InitiativeService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Propose an initiative; members need `allow_member_initiatives`
    pub async fn propose(
        &self,
        condominium_id: Uuid,
        user_id: Uuid,
        role: SystemRole,
        input: ProposeInitiativeInput,
    ) -> AppResult<Initiative> {
        input.validate()?;
        shared::validate_title(&input.title).map_err(|e| AppError::invalid("title", e))?;

        if !role.is_admin() {
            let allowed = sqlx::query_scalar::<_, bool>(
                "SELECT allow_member_initiatives FROM condominium_settings WHERE condominium_id = $1",
            )
            .bind(condominium_id)
            .fetch_optional(&self.db)
            .await?
            .unwrap_or(shared::DEFAULT_SETTINGS.allow_member_initiatives);

            if !allowed {
                return Err(AppError::InsufficientPermissions);
            }
        }

        let initiative_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO initiatives (condominium_id, title, description, status, proposed_by)
            VALUES ($1, $2, $3, 'open', $4)
            RETURNING id
            "#,
        )
        .bind(condominium_id)
        .bind(input.title.trim())
        .bind(&input.description)
        .bind(user_id)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(%condominium_id, %initiative_id, "initiative proposed");
        self.get(condominium_id, initiative_id, user_id).await
    }

    /// Initiatives with the most support first, undecided before decided
    pub async fn list(&self, condominium_id: Uuid, user_id: Uuid) -> AppResult<Vec<Initiative>> {
        let initiatives = sqlx::query_as::<_, Initiative>(&format!(
            r#"
            {INITIATIVE_SELECT}
            WHERE i.condominium_id = $1
            ORDER BY (i.status IN ('accepted', 'rejected')) ASC,
                     supporter_count DESC, i.created_at DESC
            "#
        ))
        .bind(condominium_id)
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        Ok(initiatives)
    }

    pub async fn get(&self, condominium_id: Uuid, initiative_id: Uuid, user_id: Uuid) -> AppResult<Initiative> {
        sqlx::query_as::<_, Initiative>(&format!(
            "{INITIATIVE_SELECT} WHERE i.condominium_id = $1 AND i.id = $3"
        ))
        .bind(condominium_id)
        .bind(user_id)
        .bind(initiative_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Initiative".to_string()))
    }

    /// Add the caller's support; supporting twice is a no-op
    pub async fn support(&self, condominium_id: Uuid, initiative_id: Uuid, user_id: Uuid) -> AppResult<Initiative> {
        let initiative = self.get(condominium_id, initiative_id, user_id).await?;
        if !initiative.status.accepts_support() {
            return Err(AppError::InvalidStateTransition(format!(
                "Initiative is {} and no longer collects support",
                initiative.status
            )));
        }

        sqlx::query(
            r#"
            INSERT INTO initiative_supporters (initiative_id, user_id)
            VALUES ($1, $2)
            ON CONFLICT (initiative_id, user_id) DO NOTHING
            "#,
        )
        .bind(initiative_id)
        .bind(user_id)
        .execute(&self.db)
        .await?;

        self.get(condominium_id, initiative_id, user_id).await
    }

    /// Remove the caller's support; withdrawing twice is a no-op
    pub async fn withdraw(&self, condominium_id: Uuid, initiative_id: Uuid, user_id: Uuid) -> AppResult<Initiative> {
        let initiative = self.get(condominium_id, initiative_id, user_id).await?;
        if !initiative.status.accepts_support() {
            return Err(AppError::InvalidStateTransition(format!(
                "Initiative is {} and no longer collects support",
                initiative.status
            )));
        }

        sqlx::query("DELETE FROM initiative_supporters WHERE initiative_id = $1 AND user_id = $2")
            .bind(initiative_id)
            .bind(user_id)
            .execute(&self.db)
            .await?;

        self.get(condominium_id, initiative_id, user_id).await
    }

    /// Move to review, accept or reject
    pub async fn decide(
        &self,
        condominium_id: Uuid,
        initiative_id: Uuid,
        user_id: Uuid,
        input: DecideInitiativeInput,
    ) -> AppResult<Initiative> {
        let current = self.get(condominium_id, initiative_id, user_id).await?;
        if !current.status.can_transition_to(input.status) {
            return Err(AppError::InvalidStateTransition(format!(
                "Cannot move an initiative from {} to {}",
                current.status, input.status
            )));
        }

        let result = sqlx::query(
            "UPDATE initiatives SET status = $4 WHERE condominium_id = $1 AND id = $2 AND status = $3",
        )
        .bind(condominium_id)
        .bind(initiative_id)
        .bind(current.status)
        .bind(input.status)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::InvalidStateTransition(
                "Initiative status changed concurrently".to_string(),
            ));
        }

        tracing::info!(%initiative_id, from = current.status.as_str(), to = input.status.as_str(), "initiative decided");
        self.get(condominium_id, initiative_id, user_id).await
    }

    /// Turn an accepted initiative into a proposed project
    pub async fn promote(&self, condominium_id: Uuid, initiative_id: Uuid, user_id: Uuid) -> AppResult<Project> {
        let initiative = self.get(condominium_id, initiative_id, user_id).await?;
        if initiative.status != InitiativeStatus::Accepted {
            return Err(AppError::InvalidStateTransition(format!(
                "Only accepted initiatives can become projects, this one is {}",
                initiative.status
            )));
        }

        let already = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM projects WHERE initiative_id = $1)",
        )
        .bind(initiative_id)
        .fetch_one(&self.db)
        .await?;
        if already {
            return Err(AppError::Conflict {
                resource: "project".to_string(),
                message: "This initiative already has a project".to_string(),
            });
        }

        let project = sqlx::query_as::<_, Project>(
            r#"
            INSERT INTO projects
                (condominium_id, initiative_id, title, description, status, created_by)
            VALUES ($1, $2, $3, $4, 'proposed', $5)
            RETURNING id, condominium_id, initiative_id, title, description, status,
                      budget_amount, created_by, created_at, updated_at
            "#,
        )
        .bind(condominium_id)
        .bind(initiative_id)
        .bind(&initiative.title)
        .bind(&initiative.description)
        .bind(user_id)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(%initiative_id, project_id = %project.id, "initiative promoted to project");
        Ok(project)
    }
}
