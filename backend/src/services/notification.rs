//! Notification service for in-app notifications and workflow triggers
//!
//! Supports:
//! - Fan-out of in-app notifications to condominium members
//! - Forwarding of email workflows to the automation webhook
//! - Listing, unread counts and read markers per user
//!
//! Fan-out is a side effect of other writes: failures are logged and
//! never returned to the caller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::external::WorkflowClient;
use shared::NotificationKind;

/// Largest page of notifications returned at once
pub const MAX_LIST_LIMIT: i64 = 200;

/// Notification service for managing notifications
#[derive(Clone)]
pub struct NotificationService {
    db: PgPool,
    workflow: WorkflowClient,
}

/// In-app notification
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub condominium_id: Uuid,
    pub kind: NotificationKind,
    pub title: String,
    pub body: Option<String>,
    pub link: Option<String>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
}

/// Content of a notification about to be fanned out
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub kind: NotificationKind,
    pub title: String,
    pub body: Option<String>,
    pub link: Option<String>,
}

/// Query parameters for listing notifications
#[derive(Debug, Deserialize)]
pub struct ListNotificationsQuery {
    pub unread_only: Option<bool>,
    pub limit: Option<i64>,
}

impl ListNotificationsQuery {
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(50).clamp(1, MAX_LIST_LIMIT)
    }
}

impl NotificationService {
    /// Create a new NotificationService instance
    pub fn new(db: PgPool, workflow: WorkflowClient) -> Self {
        Self { db, workflow }
    }

    // ========================================================================
    // Fan-out
    // ========================================================================

    /// Notify every member of a condominium except `exclude`.
    /// Returns how many rows were written; 0 on failure.
    pub async fn notify_members(
        &self,
        condominium_id: Uuid,
        exclude: Option<Uuid>,
        notification: &NewNotification,
    ) -> u64 {
        let result = sqlx::query(
            r#"
            INSERT INTO notifications (user_id, condominium_id, kind, title, body, link)
            SELECT m.user_id, m.condominium_id, $3, $4, $5, $6
            FROM condominium_members m
            WHERE m.condominium_id = $1
              AND ($2::uuid IS NULL OR m.user_id <> $2)
            "#,
        )
        .bind(condominium_id)
        .bind(exclude)
        .bind(notification.kind)
        .bind(&notification.title)
        .bind(&notification.body)
        .bind(&notification.link)
        .execute(&self.db)
        .await;

        match result {
            Ok(done) => {
                tracing::debug!(
                    %condominium_id,
                    kind = ?notification.kind,
                    recipients = done.rows_affected(),
                    "notifications fanned out"
                );
                done.rows_affected()
            }
            Err(e) => {
                tracing::warn!(%condominium_id, kind = ?notification.kind, "failed to notify members: {}", e);
                0
            }
        }
    }

    /// Notify a single user. Failures are logged and swallowed.
    pub async fn notify_user(
        &self,
        condominium_id: Uuid,
        user_id: Uuid,
        notification: &NewNotification,
    ) -> bool {
        let result = sqlx::query(
            r#"
            INSERT INTO notifications (user_id, condominium_id, kind, title, body, link)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(user_id)
        .bind(condominium_id)
        .bind(notification.kind)
        .bind(&notification.title)
        .bind(&notification.body)
        .bind(&notification.link)
        .execute(&self.db)
        .await;

        if let Err(e) = result {
            tracing::warn!(%condominium_id, %user_id, "failed to notify user: {}", e);
            return false;
        }
        true
    }

    /// Forward the workflow tied to `kind`, if any, without waiting on it
    pub fn trigger_workflow(&self, kind: NotificationKind, payload: Value) {
        if let Some(workflow) = kind.workflow() {
            self.workflow.spawn_trigger(workflow, payload);
        }
    }

    // ========================================================================
    // Inbox
    // ========================================================================

    /// Notifications of a user, newest first
    pub async fn list(&self, user_id: Uuid, query: &ListNotificationsQuery) -> AppResult<Vec<Notification>> {
        let notifications = sqlx::query_as::<_, Notification>(
            r#"
            SELECT id, user_id, condominium_id, kind, title, body, link,
                   is_read, created_at, read_at
            FROM notifications
            WHERE user_id = $1 AND ($2 = false OR is_read = false)
            ORDER BY created_at DESC
            LIMIT $3
            "#,
        )
        .bind(user_id)
        .bind(query.unread_only.unwrap_or(false))
        .bind(query.limit())
        .fetch_all(&self.db)
        .await?;

        Ok(notifications)
    }

    pub async fn unread_count(&self, user_id: Uuid) -> AppResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND is_read = false",
        )
        .bind(user_id)
        .fetch_one(&self.db)
        .await?;

        Ok(count)
    }

    /// Mark one notification read; other users' notifications are not found
    pub async fn mark_read(&self, user_id: Uuid, notification_id: Uuid) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE notifications
            SET is_read = true, read_at = COALESCE(read_at, NOW())
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(notification_id)
        .bind(user_id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Notification".to_string()));
        }

        Ok(())
    }

    pub async fn mark_all_read(&self, user_id: Uuid) -> AppResult<i64> {
        let result = sqlx::query(
            r#"
            UPDATE notifications
            SET is_read = true, read_at = NOW()
            WHERE user_id = $1 AND is_read = false
            "#,
        )
        .bind(user_id)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected() as i64)
    }
}
