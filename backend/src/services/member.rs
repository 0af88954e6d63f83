//! Membership service: tenant role resolution, member management,
//! functional titles and the governance roster

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use shared::{normalize_email, would_orphan_condominium, RoleRequirement, SystemRole};

/// Member service
#[derive(Clone)]
pub struct MemberService {
    db: PgPool,
}

/// Member of a condominium as listed to other members
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Member {
    pub user_id: Uuid,
    pub full_name: String,
    pub email: String,
    pub role: SystemRole,
    pub unit_label: Option<String>,
    pub functional_title_id: Option<Uuid>,
    pub functional_title: Option<String>,
    pub joined_at: DateTime<Utc>,
}

/// Governance label assignable to a member
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct FunctionalTitle {
    pub id: Uuid,
    pub condominium_id: Uuid,
    pub name: String,
    pub display_order: i32,
}

/// One line of the governance roster
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct RosterEntry {
    pub user_id: Uuid,
    pub full_name: String,
    pub title: String,
    pub role: SystemRole,
    pub unit_label: Option<String>,
}

/// Input for adding a member by email
#[derive(Debug, Deserialize, Validate)]
pub struct AddMemberInput {
    #[validate(email)]
    pub email: String,
    pub role: Option<SystemRole>,
    #[validate(length(max = 40))]
    pub unit_label: Option<String>,
}

/// Input for updating a membership
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateMemberInput {
    pub role: Option<SystemRole>,
    #[validate(length(max = 40))]
    pub unit_label: Option<String>,
}

/// Input for creating a functional title
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTitleInput {
    #[validate(length(min = 1, max = 80))]
    pub name: String,
    pub display_order: Option<i32>,
}

/// Input for assigning (or clearing, with `None`) a member's title
#[derive(Debug, Deserialize)]
pub struct AssignTitleInput {
    pub functional_title_id: Option<Uuid>,
}

const MEMBER_COLUMNS: &str = r#"
    m.user_id, u.full_name, u.email, m.role, m.unit_label,
    m.functional_title_id, ft.name AS functional_title, m.joined_at
"#;

impl MemberService {
    /// Create a new MemberService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    // ========================================================================
    // Role resolution
    // ========================================================================

    /// Role of `user_id` in the condominium, `None` for non-members
    pub async fn role_of(&self, condominium_id: Uuid, user_id: Uuid) -> AppResult<Option<SystemRole>> {
        let role = sqlx::query_scalar::<_, SystemRole>(
            "SELECT role FROM condominium_members WHERE condominium_id = $1 AND user_id = $2",
        )
        .bind(condominium_id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(role)
    }

    /// Resolve the caller's role and enforce the requirement
    pub async fn require(
        &self,
        condominium_id: Uuid,
        user_id: Uuid,
        requirement: RoleRequirement,
    ) -> AppResult<SystemRole> {
        let role = self.role_of(condominium_id, user_id).await?;
        requirement.check(role).map_err(|denied| {
            tracing::debug!(%condominium_id, %user_id, ?requirement, "access denied: {}", denied);
            AppError::from(denied)
        })
    }

    pub async fn require_member(&self, condominium_id: Uuid, user_id: Uuid) -> AppResult<SystemRole> {
        self.require(condominium_id, user_id, RoleRequirement::Member).await
    }

    pub async fn require_admin(&self, condominium_id: Uuid, user_id: Uuid) -> AppResult<SystemRole> {
        self.require(condominium_id, user_id, RoleRequirement::Admin).await
    }

    // ========================================================================
    // Members
    // ========================================================================

    /// All members of a condominium, admins first
    pub async fn list_members(&self, condominium_id: Uuid) -> AppResult<Vec<Member>> {
        let members = sqlx::query_as::<_, Member>(&format!(
            r#"
            SELECT {MEMBER_COLUMNS}
            FROM condominium_members m
            JOIN users u ON u.id = m.user_id
            LEFT JOIN functional_titles ft ON ft.id = m.functional_title_id
            WHERE m.condominium_id = $1
            ORDER BY m.role ASC, u.full_name ASC
            "#
        ))
        .bind(condominium_id)
        .fetch_all(&self.db)
        .await?;

        Ok(members)
    }

    pub async fn get_member(&self, condominium_id: Uuid, user_id: Uuid) -> AppResult<Member> {
        sqlx::query_as::<_, Member>(&format!(
            r#"
            SELECT {MEMBER_COLUMNS}
            FROM condominium_members m
            JOIN users u ON u.id = m.user_id
            LEFT JOIN functional_titles ft ON ft.id = m.functional_title_id
            WHERE m.condominium_id = $1 AND m.user_id = $2
            "#
        ))
        .bind(condominium_id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Member".to_string()))
    }

    /// Add an existing user to the condominium
    pub async fn add_member(&self, condominium_id: Uuid, input: AddMemberInput) -> AppResult<Member> {
        input.validate()?;

        let user_id = sqlx::query_scalar::<_, Uuid>("SELECT id FROM users WHERE email = $1")
            .bind(normalize_email(&input.email))
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("User".to_string()))?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO condominium_members (condominium_id, user_id, role, unit_label)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (condominium_id, user_id) DO NOTHING
            "#,
        )
        .bind(condominium_id)
        .bind(user_id)
        .bind(input.role.unwrap_or(SystemRole::Member))
        .bind(input.unit_label.as_deref().map(str::trim))
        .execute(&self.db)
        .await?;

        if inserted.rows_affected() == 0 {
            return Err(AppError::Conflict {
                resource: "member".to_string(),
                message: "User is already a member of this condominium".to_string(),
            });
        }

        tracing::info!(%condominium_id, %user_id, "member added");
        self.get_member(condominium_id, user_id).await
    }

    /// Change role and/or unit label; refuses to demote the last admin
    pub async fn update_member(
        &self,
        condominium_id: Uuid,
        user_id: Uuid,
        input: UpdateMemberInput,
    ) -> AppResult<Member> {
        input.validate()?;

        let mut tx = self.db.begin().await?;

        Self::lock_condominium(&mut tx, condominium_id).await?;
        let current = Self::lock_member(&mut tx, condominium_id, user_id).await?;

        if let Some(new_role) = input.role {
            let admins = Self::admin_count(&mut tx, condominium_id).await?;
            if would_orphan_condominium(admins, current, Some(new_role)) {
                return Err(AppError::LastAdmin);
            }
        }

        sqlx::query(
            r#"
            UPDATE condominium_members
            SET role = COALESCE($3, role), unit_label = COALESCE($4, unit_label)
            WHERE condominium_id = $1 AND user_id = $2
            "#,
        )
        .bind(condominium_id)
        .bind(user_id)
        .bind(input.role)
        .bind(input.unit_label.as_deref().map(str::trim))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        self.get_member(condominium_id, user_id).await
    }

    /// Remove a membership; refuses to remove the last admin
    pub async fn remove_member(&self, condominium_id: Uuid, user_id: Uuid) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        Self::lock_condominium(&mut tx, condominium_id).await?;
        let current = Self::lock_member(&mut tx, condominium_id, user_id).await?;
        let admins = Self::admin_count(&mut tx, condominium_id).await?;
        if would_orphan_condominium(admins, current, None) {
            return Err(AppError::LastAdmin);
        }

        sqlx::query("DELETE FROM condominium_members WHERE condominium_id = $1 AND user_id = $2")
            .bind(condominium_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(%condominium_id, %user_id, "member removed");
        Ok(())
    }

    /// Serializes role changes within one condominium
    async fn lock_condominium(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        condominium_id: Uuid,
    ) -> AppResult<()> {
        sqlx::query_scalar::<_, Uuid>("SELECT id FROM condominiums WHERE id = $1 FOR NO KEY UPDATE")
            .bind(condominium_id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or_else(|| AppError::NotFound("Condominium".to_string()))?;
        Ok(())
    }

    async fn lock_member(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        condominium_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<SystemRole> {
        sqlx::query_scalar::<_, SystemRole>(
            r#"
            SELECT role FROM condominium_members
            WHERE condominium_id = $1 AND user_id = $2
            FOR UPDATE
            "#,
        )
        .bind(condominium_id)
        .bind(user_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Member".to_string()))
    }

    async fn admin_count(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        condominium_id: Uuid,
    ) -> AppResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM condominium_members WHERE condominium_id = $1 AND role = 'admin'",
        )
        .bind(condominium_id)
        .fetch_one(&mut **tx)
        .await?;

        Ok(count)
    }

    // ========================================================================
    // Functional titles
    // ========================================================================

    pub async fn list_titles(&self, condominium_id: Uuid) -> AppResult<Vec<FunctionalTitle>> {
        let titles = sqlx::query_as::<_, FunctionalTitle>(
            r#"
            SELECT id, condominium_id, name, display_order
            FROM functional_titles
            WHERE condominium_id = $1
            ORDER BY display_order ASC, name ASC
            "#,
        )
        .bind(condominium_id)
        .fetch_all(&self.db)
        .await?;

        Ok(titles)
    }

    pub async fn create_title(
        &self,
        condominium_id: Uuid,
        input: CreateTitleInput,
    ) -> AppResult<FunctionalTitle> {
        input.validate()?;
        let name = input.name.trim();

        let existing = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM functional_titles WHERE condominium_id = $1 AND LOWER(name) = LOWER($2)",
        )
        .bind(condominium_id)
        .bind(name)
        .fetch_one(&self.db)
        .await?;

        if existing > 0 {
            return Err(AppError::Conflict {
                resource: "functional_title".to_string(),
                message: "A functional title with this name already exists".to_string(),
            });
        }

        let title = sqlx::query_as::<_, FunctionalTitle>(
            r#"
            INSERT INTO functional_titles (condominium_id, name, display_order)
            VALUES ($1, $2, COALESCE($3, (
                SELECT COALESCE(MAX(display_order), 0) + 10
                FROM functional_titles WHERE condominium_id = $1
            )))
            RETURNING id, condominium_id, name, display_order
            "#,
        )
        .bind(condominium_id)
        .bind(name)
        .bind(input.display_order)
        .fetch_one(&self.db)
        .await?;

        Ok(title)
    }

    /// Delete a title; holders are unassigned by the foreign key
    pub async fn delete_title(&self, condominium_id: Uuid, title_id: Uuid) -> AppResult<()> {
        let result =
            sqlx::query("DELETE FROM functional_titles WHERE id = $1 AND condominium_id = $2")
                .bind(title_id)
                .bind(condominium_id)
                .execute(&self.db)
                .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Functional title".to_string()));
        }

        Ok(())
    }

    /// Assign or clear a member's functional title
    pub async fn assign_title(
        &self,
        condominium_id: Uuid,
        user_id: Uuid,
        input: AssignTitleInput,
    ) -> AppResult<Member> {
        if let Some(title_id) = input.functional_title_id {
            let belongs = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM functional_titles WHERE id = $1 AND condominium_id = $2)",
            )
            .bind(title_id)
            .bind(condominium_id)
            .fetch_one(&self.db)
            .await?;

            if !belongs {
                return Err(AppError::NotFound("Functional title".to_string()));
            }
        }

        let result = sqlx::query(
            r#"
            UPDATE condominium_members
            SET functional_title_id = $3
            WHERE condominium_id = $1 AND user_id = $2
            "#,
        )
        .bind(condominium_id)
        .bind(user_id)
        .bind(input.functional_title_id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Member".to_string()));
        }

        self.get_member(condominium_id, user_id).await
    }

    /// Members holding a title, ordered by title rank then name
    pub async fn roster(&self, condominium_id: Uuid) -> AppResult<Vec<RosterEntry>> {
        let roster = sqlx::query_as::<_, RosterEntry>(
            r#"
            SELECT m.user_id, u.full_name, ft.name AS title, m.role, m.unit_label
            FROM condominium_members m
            JOIN users u ON u.id = m.user_id
            JOIN functional_titles ft ON ft.id = m.functional_title_id
            WHERE m.condominium_id = $1
            ORDER BY ft.display_order ASC, u.full_name ASC
            "#,
        )
        .bind(condominium_id)
        .fetch_all(&self.db)
        .await?;

        Ok(roster)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn user(db: &PgPool, name: &str) -> Uuid {
        sqlx::query_scalar::<_, Uuid>(
            "INSERT INTO users (email, password_hash, full_name) VALUES ($1, 'x', $2) RETURNING id",
        )
        .bind(format!("{}@example.com", Uuid::new_v4()))
        .bind(name)
        .fetch_one(db)
        .await
        .unwrap()
    }

    async fn condominium_with_admins(db: &PgPool, admins: &[Uuid]) -> Uuid {
        let condominium_id = sqlx::query_scalar::<_, Uuid>(
            "INSERT INTO condominiums (name, created_by) VALUES ('Rua Augusta 12', $1) RETURNING id",
        )
        .bind(admins[0])
        .fetch_one(db)
        .await
        .unwrap();

        for admin in admins {
            sqlx::query(
                "INSERT INTO condominium_members (condominium_id, user_id, role) VALUES ($1, $2, 'admin')",
            )
            .bind(condominium_id)
            .bind(admin)
            .execute(db)
            .await
            .unwrap();
        }
        condominium_id
    }

    async fn admin_total(db: &PgPool, condominium_id: Uuid) -> i64 {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM condominium_members WHERE condominium_id = $1 AND role = 'admin'",
        )
        .bind(condominium_id)
        .fetch_one(db)
        .await
        .unwrap()
    }

    fn demote() -> UpdateMemberInput {
        UpdateMemberInput {
            role: Some(SystemRole::Member),
            unit_label: None,
        }
    }

    #[sqlx::test]
    async fn test_last_admin_cannot_be_demoted_or_removed(db: PgPool) {
        let ana = user(&db, "Ana").await;
        let condominium_id = condominium_with_admins(&db, &[ana]).await;
        let service = MemberService::new(db.clone());

        let err = service.update_member(condominium_id, ana, demote()).await.unwrap_err();
        assert!(matches!(err, AppError::LastAdmin));

        let err = service.remove_member(condominium_id, ana).await.unwrap_err();
        assert!(matches!(err, AppError::LastAdmin));

        assert_eq!(admin_total(&db, condominium_id).await, 1);
    }

    #[sqlx::test]
    async fn test_one_of_two_admins_can_step_down(db: PgPool) {
        let ana = user(&db, "Ana").await;
        let rui = user(&db, "Rui").await;
        let condominium_id = condominium_with_admins(&db, &[ana, rui]).await;
        let service = MemberService::new(db.clone());

        let member = service.update_member(condominium_id, rui, demote()).await.unwrap();
        assert_eq!(member.role, SystemRole::Member);

        // a plain member can always be removed
        service.remove_member(condominium_id, rui).await.unwrap();
        assert_eq!(admin_total(&db, condominium_id).await, 1);
    }

    #[sqlx::test]
    async fn test_concurrent_demotions_keep_an_admin(db: PgPool) {
        let service = MemberService::new(db.clone());

        for round in 0..20 {
            let ana = user(&db, "Ana").await;
            let rui = user(&db, "Rui").await;
            let condominium_id = condominium_with_admins(&db, &[ana, rui]).await;

            let outcomes: Vec<AppResult<()>> = if round % 2 == 0 {
                let (first, second) = tokio::join!(
                    service.update_member(condominium_id, ana, demote()),
                    service.update_member(condominium_id, rui, demote()),
                );
                vec![first.map(|_| ()), second.map(|_| ())]
            } else {
                let (removed, demoted) = tokio::join!(
                    service.remove_member(condominium_id, ana),
                    service.update_member(condominium_id, rui, demote()),
                );
                vec![removed, demoted.map(|_| ())]
            };

            let refused = outcomes
                .iter()
                .filter(|o| matches!(o, Err(AppError::LastAdmin)))
                .count();
            assert_eq!(refused, 1, "round {}", round);
            assert_eq!(outcomes.iter().filter(|o| o.is_ok()).count(), 1, "round {}", round);
            assert_eq!(admin_total(&db, condominium_id).await, 1, "round {}", round);
        }
    }
}
