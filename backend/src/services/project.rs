//! Project service: linear status progression and progress updates

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::notification::{NewNotification, NotificationService};
use shared::{NotificationKind, ProjectStatus};

/// Project service
#[derive(Clone)]
pub struct ProjectService {
    db: PgPool,
    notifications: NotificationService,
}

/// Project
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Project {
    pub id: Uuid,
    pub condominium_id: Uuid,
    pub initiative_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub status: ProjectStatus,
    pub budget_amount: Option<Decimal>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Progress note posted on a project
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ProjectUpdate {
    pub id: Uuid,
    pub project_id: Uuid,
    pub body: String,
    pub author_id: Uuid,
    pub author_name: String,
    pub created_at: DateTime<Utc>,
}

/// Project with its updates, newest first
#[derive(Debug, Clone, Serialize)]
pub struct ProjectDetail {
    #[serde(flatten)]
    pub project: Project,
    pub next_status: Option<ProjectStatus>,
    pub updates: Vec<ProjectUpdate>,
}

/// Input for creating a project
#[derive(Debug, Deserialize, Validate)]
pub struct CreateProjectInput {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 10000))]
    pub description: Option<String>,
    pub budget_amount: Option<Decimal>,
}

/// Input for posting a progress update
#[derive(Debug, Deserialize, Validate)]
pub struct PostUpdateInput {
    #[validate(length(min = 1, max = 10000))]
    pub body: String,
}

const PROJECT_COLUMNS: &str = r#"
    id, condominium_id, initiative_id, title, description, status,
    budget_amount, created_by, created_at, updated_at
"#;

impl ProjectService {
    /// Create a new ProjectService instance
    pub fn new(db: PgPool, notifications: NotificationService) -> Self {
        Self { db, notifications }
    }

    pub async fn create(
        &self,
        condominium_id: Uuid,
        author_id: Uuid,
        input: CreateProjectInput,
    ) -> AppResult<Project> {
        input.validate()?;
        shared::validate_title(&input.title).map_err(|e| AppError::invalid("title", e))?;
        if let Some(amount) = input.budget_amount {
            shared::validate_amount(amount).map_err(|e| AppError::invalid("budget_amount", e))?;
        }

        let project = sqlx::query_as::<_, Project>(&format!(
            r#"
            INSERT INTO projects (condominium_id, title, description, status, budget_amount, created_by)
            VALUES ($1, $2, $3, 'proposed', $4, $5)
            RETURNING {PROJECT_COLUMNS}
            "#
        ))
        .bind(condominium_id)
        .bind(input.title.trim())
        .bind(input.description.as_deref())
        .bind(input.budget_amount)
        .bind(author_id)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(%condominium_id, project_id = %project.id, "project created");
        Ok(project)
    }

    /// Projects of a condominium, active ones first
    pub async fn list(&self, condominium_id: Uuid) -> AppResult<Vec<Project>> {
        let projects = sqlx::query_as::<_, Project>(&format!(
            r#"
            SELECT {PROJECT_COLUMNS}
            FROM projects
            WHERE condominium_id = $1
            ORDER BY (status = 'archived') ASC, updated_at DESC
            "#
        ))
        .bind(condominium_id)
        .fetch_all(&self.db)
        .await?;

        Ok(projects)
    }

    async fn find(&self, condominium_id: Uuid, project_id: Uuid) -> AppResult<Project> {
        sqlx::query_as::<_, Project>(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects WHERE condominium_id = $1 AND id = $2"
        ))
        .bind(condominium_id)
        .bind(project_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Project".to_string()))
    }

    pub async fn get(&self, condominium_id: Uuid, project_id: Uuid) -> AppResult<ProjectDetail> {
        let project = self.find(condominium_id, project_id).await?;
        let updates = self.list_updates(condominium_id, project_id).await?;

        Ok(ProjectDetail {
            next_status: project.status.next(),
            project,
            updates,
        })
    }

    /// Move the project to its single successor status
    pub async fn advance(&self, condominium_id: Uuid, project_id: Uuid) -> AppResult<Project> {
        let current = self.find(condominium_id, project_id).await?;
        let next = current.status.next().ok_or_else(|| {
            AppError::InvalidStateTransition(format!(
                "Project is {} and cannot advance further",
                current.status
            ))
        })?;

        let project = sqlx::query_as::<_, Project>(&format!(
            r#"
            UPDATE projects
            SET status = $4, updated_at = NOW()
            WHERE condominium_id = $1 AND id = $2 AND status = $3
            RETURNING {PROJECT_COLUMNS}
            "#
        ))
        .bind(condominium_id)
        .bind(project_id)
        .bind(current.status)
        .bind(next)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| {
            AppError::InvalidStateTransition("Project status changed concurrently".to_string())
        })?;

        tracing::info!(%project_id, from = current.status.as_str(), to = next.as_str(), "project advanced");

        self.notify(
            &project,
            format!("{} is now {}", project.title, project.status),
            None,
        )
        .await;

        Ok(project)
    }

    // ========================================================================
    // Updates
    // ========================================================================

    pub async fn list_updates(&self, condominium_id: Uuid, project_id: Uuid) -> AppResult<Vec<ProjectUpdate>> {
        let updates = sqlx::query_as::<_, ProjectUpdate>(
            r#"
            SELECT pu.id, pu.project_id, pu.body, pu.author_id,
                   u.full_name AS author_name, pu.created_at
            FROM project_updates pu
            JOIN projects p ON p.id = pu.project_id
            JOIN users u ON u.id = pu.author_id
            WHERE p.condominium_id = $1 AND pu.project_id = $2
            ORDER BY pu.created_at DESC
            "#,
        )
        .bind(condominium_id)
        .bind(project_id)
        .fetch_all(&self.db)
        .await?;

        Ok(updates)
    }

    pub async fn post_update(
        &self,
        condominium_id: Uuid,
        project_id: Uuid,
        author_id: Uuid,
        input: PostUpdateInput,
    ) -> AppResult<ProjectUpdate> {
        input.validate()?;
        let project = self.find(condominium_id, project_id).await?;

        let update = sqlx::query_as::<_, ProjectUpdate>(
            r#"
            WITH inserted AS (
                INSERT INTO project_updates (project_id, body, author_id)
                VALUES ($1, $2, $3)
                RETURNING id, project_id, body, author_id, created_at
            )
            SELECT i.id, i.project_id, i.body, i.author_id,
                   u.full_name AS author_name, i.created_at
            FROM inserted i
            JOIN users u ON u.id = i.author_id
            "#,
        )
        .bind(project_id)
        .bind(input.body.trim())
        .bind(author_id)
        .fetch_one(&self.db)
        .await?;

        sqlx::query("UPDATE projects SET updated_at = NOW() WHERE id = $1")
            .bind(project_id)
            .execute(&self.db)
            .await?;

        self.notify(
            &project,
            format!("New update on {}", project.title),
            Some(update.body.clone()),
        )
        .await;

        Ok(update)
    }

    async fn notify(&self, project: &Project, title: String, body: Option<String>) {
        let notification = NewNotification {
            kind: NotificationKind::ProjectUpdated,
            title,
            body,
            link: Some(format!(
                "/condominiums/{}/projects/{}",
                project.condominium_id, project.id
            )),
        };
        self.notifications
            .notify_members(project.condominium_id, None, &notification)
            .await;

        self.notifications.trigger_workflow(
            NotificationKind::ProjectUpdated,
            json!({
                "condominium_id": project.condominium_id,
                "project_id": project.id,
                "title": project.title,
                "status": project.status,
            }),
        );
    }
}
