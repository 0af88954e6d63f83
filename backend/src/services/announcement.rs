//! Announcement service

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::notification::{NewNotification, NotificationService};
use shared::{NotificationKind, PaginatedResponse, Pagination};

/// Announcement service
#[derive(Clone)]
pub struct AnnouncementService {
    db: PgPool,
    notifications: NotificationService,
}

/// Announcement with its author's name
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Announcement {
    pub id: Uuid,
    pub condominium_id: Uuid,
    pub title: String,
    pub body: String,
    pub pinned: bool,
    pub created_by: Uuid,
    pub author_name: String,
    pub created_at: DateTime<Utc>,
}

/// Input for publishing an announcement
#[derive(Debug, Deserialize, Validate)]
pub struct CreateAnnouncementInput {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1, max = 20000))]
    pub body: String,
    #[serde(default)]
    pub pinned: bool,
}

/// Input for editing an announcement
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateAnnouncementInput {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 20000))]
    pub body: Option<String>,
    pub pinned: Option<bool>,
}

const ANNOUNCEMENT_SELECT: &str = r#"
    SELECT a.id, a.condominium_id, a.title, a.body, a.pinned, a.created_by,
           u.full_name AS author_name, a.created_at
    FROM announcements a
    JOIN users u ON u.id = a.created_by
"#;

impl AnnouncementService {
    /// Create a new AnnouncementService instance
    pub fn new(db: PgPool, notifications: NotificationService) -> Self {
        Self { db, notifications }
    }

    /// Pinned first, then newest first
    pub async fn list(
        &self,
        condominium_id: Uuid,
        pagination: &Pagination,
    ) -> AppResult<PaginatedResponse<Announcement>> {
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM announcements WHERE condominium_id = $1")
                .bind(condominium_id)
                .fetch_one(&self.db)
                .await?;

        let announcements = sqlx::query_as::<_, Announcement>(&format!(
            "{ANNOUNCEMENT_SELECT} WHERE a.condominium_id = $1 \
             ORDER BY a.pinned DESC, a.created_at DESC LIMIT $2 OFFSET $3"
        ))
        .bind(condominium_id)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse::new(
            announcements,
            pagination,
            total.max(0) as u64,
        ))
    }

    pub async fn get(&self, condominium_id: Uuid, announcement_id: Uuid) -> AppResult<Announcement> {
        sqlx::query_as::<_, Announcement>(&format!(
            "{ANNOUNCEMENT_SELECT} WHERE a.condominium_id = $1 AND a.id = $2"
        ))
        .bind(condominium_id)
        .bind(announcement_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Announcement".to_string()))
    }

    /// Publish an announcement and notify the other members
    pub async fn create(
        &self,
        condominium_id: Uuid,
        author_id: Uuid,
        input: CreateAnnouncementInput,
    ) -> AppResult<Announcement> {
        input.validate()?;
        shared::validate_title(&input.title).map_err(|e| AppError::invalid("title", e))?;

        let announcement_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO announcements (condominium_id, title, body, pinned, created_by)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(condominium_id)
        .bind(input.title.trim())
        .bind(&input.body)
        .bind(input.pinned)
        .bind(author_id)
        .fetch_one(&self.db)
        .await?;

        let announcement = self.get(condominium_id, announcement_id).await?;
        self.announce(&announcement).await;

        Ok(announcement)
    }

    async fn announce(&self, announcement: &Announcement) {
        let enabled = sqlx::query_scalar::<_, bool>(
            "SELECT notify_on_announcement FROM condominium_settings WHERE condominium_id = $1",
        )
        .bind(announcement.condominium_id)
        .fetch_optional(&self.db)
        .await;

        match enabled {
            Ok(Some(false)) => return,
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(announcement_id = %announcement.id, "could not read settings: {}", e);
                return;
            }
        }

        let notification = NewNotification {
            kind: NotificationKind::Announcement,
            title: announcement.title.clone(),
            body: Some(excerpt(&announcement.body, 280)),
            link: Some(format!(
                "/condominiums/{}/announcements/{}",
                announcement.condominium_id, announcement.id
            )),
        };

        self.notifications
            .notify_members(announcement.condominium_id, Some(announcement.created_by), &notification)
            .await;

        self.notifications.trigger_workflow(
            NotificationKind::Announcement,
            json!({
                "condominium_id": announcement.condominium_id,
                "announcement_id": announcement.id,
                "title": announcement.title,
                "body": announcement.body,
                "author": announcement.author_name,
            }),
        );
    }

    pub async fn update(
        &self,
        condominium_id: Uuid,
        announcement_id: Uuid,
        input: UpdateAnnouncementInput,
    ) -> AppResult<Announcement> {
        input.validate()?;
        if let Some(title) = &input.title {
            shared::validate_title(title).map_err(|e| AppError::invalid("title", e))?;
        }

        let result = sqlx::query(
            r#"
            UPDATE announcements
            SET title = COALESCE($3, title),
                body = COALESCE($4, body),
                pinned = COALESCE($5, pinned)
            WHERE condominium_id = $1 AND id = $2
            "#,
        )
        .bind(condominium_id)
        .bind(announcement_id)
        .bind(input.title.as_deref().map(str::trim))
        .bind(input.body.as_deref())
        .bind(input.pinned)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Announcement".to_string()));
        }

        self.get(condominium_id, announcement_id).await
    }

    pub async fn delete(&self, condominium_id: Uuid, announcement_id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM announcements WHERE condominium_id = $1 AND id = $2")
            .bind(condominium_id)
            .bind(announcement_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Announcement".to_string()));
        }

        Ok(())
    }
}

/// First `max` characters of `text`, with an ellipsis when cut
fn excerpt(text: &str, max: usize) -> String {
    let text = text.trim();
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}…", text[..cut].trim_end()),
        None => text.to_string(),
    }
}
