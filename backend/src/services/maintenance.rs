//! Maintenance request service

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::notification::{NewNotification, NotificationService};
use shared::{MaintenancePriority, MaintenanceStatus, NotificationKind, SystemRole};

/// Maintenance request service
#[derive(Clone)]
pub struct MaintenanceService {
    db: PgPool,
    notifications: NotificationService,
}

/// Maintenance request
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct MaintenanceRequest {
    pub id: Uuid,
    pub condominium_id: Uuid,
    pub title: String,
    pub description: String,
    pub location: Option<String>,
    pub priority: MaintenancePriority,
    pub status: MaintenanceStatus,
    pub reported_by: Uuid,
    pub reporter_name: String,
    pub assigned_to: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

/// Input for reporting a problem
#[derive(Debug, Deserialize, Validate)]
pub struct CreateMaintenanceInput {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1, max = 5000))]
    pub description: String,
    #[validate(length(max = 200))]
    pub location: Option<String>,
    #[serde(default)]
    pub priority: MaintenancePriority,
}

/// Input for updating a request
#[derive(Debug, Deserialize)]
pub struct UpdateMaintenanceInput {
    pub status: Option<MaintenanceStatus>,
    pub priority: Option<MaintenancePriority>,
    /// Absent keeps the assignee, `null` clears it
    #[serde(default, deserialize_with = "present")]
    pub assigned_to: Option<Option<Uuid>>,
}

/// Marks a field that was sent, even as `null`
fn present<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// Query parameters for listing requests
#[derive(Debug, Deserialize)]
pub struct MaintenanceQuery {
    pub status: Option<MaintenanceStatus>,
}

const REQUEST_SELECT: &str = r#"
    SELECT r.id, r.condominium_id, r.title, r.description, r.location,
           r.priority, r.status, r.reported_by, u.full_name AS reporter_name,
           r.assigned_to, r.created_at, r.updated_at, r.resolved_at
    FROM maintenance_requests r
    JOIN users u ON u.id = r.reported_by
"#;

/// Who may apply an update: admins anything, the reporter only closing an open request
fn authorize_update(
    request: &MaintenanceRequest,
    actor: Uuid,
    role: SystemRole,
    input: &UpdateMaintenanceInput,
) -> AppResult<()> {
    if role.is_admin() {
        return Ok(());
    }

    let closes_own_open_request = request.reported_by == actor
        && request.status == MaintenanceStatus::Open
        && input.status == Some(MaintenanceStatus::Closed)
        && input.priority.is_none()
        && input.assigned_to.is_none();

    if closes_own_open_request {
        Ok(())
    } else {
        Err(AppError::InsufficientPermissions)
    }
}

impl MaintenanceService {
    /// Create a new MaintenanceService instance
    pub fn new(db: PgPool, notifications: NotificationService) -> Self {
        Self { db, notifications }
    }

    pub async fn create(
        &self,
        condominium_id: Uuid,
        reporter_id: Uuid,
        input: CreateMaintenanceInput,
    ) -> AppResult<MaintenanceRequest> {
        input.validate()?;
        shared::validate_title(&input.title).map_err(|e| AppError::invalid("title", e))?;

        let request_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO maintenance_requests
                (condominium_id, title, description, location, priority, status, reported_by)
            VALUES ($1, $2, $3, $4, $5, 'open', $6)
            RETURNING id
            "#,
        )
        .bind(condominium_id)
        .bind(input.title.trim())
        .bind(&input.description)
        .bind(input.location.as_deref().map(str::trim))
        .bind(input.priority)
        .bind(reporter_id)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(%condominium_id, %request_id, priority = ?input.priority, "maintenance request reported");
        self.get(condominium_id, request_id).await
    }

    /// Requests of a condominium, newest first
    pub async fn list(
        &self,
        condominium_id: Uuid,
        query: &MaintenanceQuery,
    ) -> AppResult<Vec<MaintenanceRequest>> {
        let requests = sqlx::query_as::<_, MaintenanceRequest>(&format!(
            r#"
            {REQUEST_SELECT}
            WHERE r.condominium_id = $1 AND ($2::maintenance_status IS NULL OR r.status = $2)
            ORDER BY r.created_at DESC
            "#
        ))
        .bind(condominium_id)
        .bind(query.status)
        .fetch_all(&self.db)
        .await?;

        Ok(requests)
    }

    pub async fn get(&self, condominium_id: Uuid, request_id: Uuid) -> AppResult<MaintenanceRequest> {
        sqlx::query_as::<_, MaintenanceRequest>(&format!(
            "{REQUEST_SELECT} WHERE r.condominium_id = $1 AND r.id = $2"
        ))
        .bind(condominium_id)
        .bind(request_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Maintenance request".to_string()))
    }

    /// Apply a status, priority or assignee change
    pub async fn update(
        &self,
        condominium_id: Uuid,
        request_id: Uuid,
        actor: Uuid,
        role: SystemRole,
        input: UpdateMaintenanceInput,
    ) -> AppResult<MaintenanceRequest> {
        let current = self.get(condominium_id, request_id).await?;
        authorize_update(&current, actor, role, &input)?;

        if let Some(target) = input.status {
            if !current.status.can_transition_to(target) {
                return Err(AppError::InvalidStateTransition(format!(
                    "Cannot move a maintenance request from {} to {}",
                    current.status, target
                )));
            }
        }

        if let Some(Some(assignee)) = input.assigned_to {
            let is_member = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM condominium_members WHERE condominium_id = $1 AND user_id = $2)",
            )
            .bind(condominium_id)
            .bind(assignee)
            .fetch_one(&self.db)
            .await?;
            if !is_member {
                return Err(AppError::invalid("assigned_to", "Assignee must be a member"));
            }
        }

        // status guard makes a concurrent transition lose instead of overwrite
        let result = sqlx::query(
            r#"
            UPDATE maintenance_requests
            SET status = COALESCE($4, status),
                priority = COALESCE($5, priority),
                assigned_to = CASE WHEN $6 THEN $7 ELSE assigned_to END,
                resolved_at = CASE WHEN $4 = 'resolved'::maintenance_status THEN NOW()
                                   WHEN $4 = 'in_progress'::maintenance_status THEN NULL
                                   ELSE resolved_at END,
                updated_at = NOW()
            WHERE condominium_id = $1 AND id = $2 AND status = $3
            "#,
        )
        .bind(condominium_id)
        .bind(request_id)
        .bind(current.status)
        .bind(input.status)
        .bind(input.priority)
        .bind(input.assigned_to.is_some())
        .bind(input.assigned_to.flatten())
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::Conflict {
                resource: "maintenance_request".to_string(),
                message: "The request was changed concurrently, reload and retry".to_string(),
            });
        }

        let updated = self.get(condominium_id, request_id).await?;

        if updated.status != current.status {
            tracing::info!(
                %request_id,
                from = current.status.as_str(),
                to = updated.status.as_str(),
                "maintenance status changed"
            );
            if updated.reported_by != actor {
                self.notify_reporter(&updated).await;
            }
        }

        Ok(updated)
    }

    async fn notify_reporter(&self, request: &MaintenanceRequest) {
        let notification = NewNotification {
            kind: NotificationKind::MaintenanceUpdated,
            title: format!("{}: {}", request.title, request.status),
            body: None,
            link: Some(format!(
                "/condominiums/{}/maintenance/{}",
                request.condominium_id, request.id
            )),
        };
        self.notifications
            .notify_user(request.condominium_id, request.reported_by, &notification)
            .await;

        self.notifications.trigger_workflow(
            NotificationKind::MaintenanceUpdated,
            json!({
                "condominium_id": request.condominium_id,
                "request_id": request.id,
                "title": request.title,
                "status": request.status,
                "reported_by": request.reported_by,
            }),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(reported_by: Uuid, status: MaintenanceStatus) -> MaintenanceRequest {
        MaintenanceRequest {
            id: Uuid::new_v4(),
            condominium_id: Uuid::new_v4(),
            title: "Leaking pipe".to_string(),
            description: "Basement, near the boiler".to_string(),
            location: None,
            priority: MaintenancePriority::High,
            status,
            reported_by,
            reporter_name: "Rui".to_string(),
            assigned_to: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            resolved_at: None,
        }
    }

    fn close() -> UpdateMaintenanceInput {
        UpdateMaintenanceInput {
            status: Some(MaintenanceStatus::Closed),
            priority: None,
            assigned_to: None,
        }
    }

    #[test]
    fn test_reporter_may_close_own_open_request() {
        let reporter = Uuid::new_v4();
        let req = request(reporter, MaintenanceStatus::Open);
        assert!(authorize_update(&req, reporter, SystemRole::Member, &close()).is_ok());
    }

    #[test]
    fn test_reporter_limited_to_closing() {
        let reporter = Uuid::new_v4();
        let req = request(reporter, MaintenanceStatus::Open);
        let start = UpdateMaintenanceInput {
            status: Some(MaintenanceStatus::InProgress),
            priority: None,
            assigned_to: None,
        };
        assert!(matches!(
            authorize_update(&req, reporter, SystemRole::Member, &start),
            Err(AppError::InsufficientPermissions)
        ));

        let in_progress = request(reporter, MaintenanceStatus::InProgress);
        assert!(authorize_update(&in_progress, reporter, SystemRole::Member, &close()).is_err());
    }

    #[test]
    fn test_other_members_cannot_update() {
        let req = request(Uuid::new_v4(), MaintenanceStatus::Open);
        assert!(authorize_update(&req, Uuid::new_v4(), SystemRole::Member, &close()).is_err());
        assert!(authorize_update(&req, Uuid::new_v4(), SystemRole::Admin, &close()).is_ok());
    }

    #[test]
    fn test_assignee_absent_null_or_set() {
        let keep: UpdateMaintenanceInput = serde_json::from_str(r#"{"priority": "urgent"}"#).unwrap();
        assert_eq!(keep.assigned_to, None);

        let clear: UpdateMaintenanceInput =
            serde_json::from_str(r#"{"assigned_to": null}"#).unwrap();
        assert_eq!(clear.assigned_to, Some(None));

        let id = Uuid::new_v4();
        let set: UpdateMaintenanceInput =
            serde_json::from_str(&format!(r#"{{"assigned_to": "{}"}}"#, id)).unwrap();
        assert_eq!(set.assigned_to, Some(Some(id)));
    }

    #[test]
    fn test_reporter_cannot_unassign() {
        let reporter = Uuid::new_v4();
        let req = request(reporter, MaintenanceStatus::Open);
        let unassign = UpdateMaintenanceInput {
            assigned_to: Some(None),
            ..close()
        };
        assert!(authorize_update(&req, reporter, SystemRole::Member, &unassign).is_err());
    }
}
