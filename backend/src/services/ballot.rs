//! Ballot service: definition, lifecycle, voting and results

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::export::{attachment_name, to_csv, CsvExport};
use crate::services::notification::{NewNotification, NotificationService};
use shared::{
    accepts_votes, validate_ballot_definition, validate_selection, BallotKind, BallotResults,
    BallotStatus, NotificationKind, OptionTally, SystemRole,
};

/// Ballot service
#[derive(Clone)]
pub struct BallotService {
    db: PgPool,
    notifications: NotificationService,
}

/// Ballot row
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Ballot {
    pub id: Uuid,
    pub condominium_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub kind: BallotKind,
    pub max_selections: Option<i32>,
    pub status: BallotStatus,
    pub closes_at: Option<DateTime<Utc>>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Ballot {
    /// Voting is over, either explicitly or because the deadline passed
    pub fn is_finished(&self, now: DateTime<Utc>) -> bool {
        match self.status {
            BallotStatus::Closed => true,
            BallotStatus::Open => !accepts_votes(self.status, self.closes_at, now),
            BallotStatus::Draft => false,
        }
    }
}

/// Ballot option
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct BallotOption {
    pub id: Uuid,
    pub ballot_id: Uuid,
    pub label: String,
    pub position: i32,
}

/// Ballot in a list, with the caller's participation
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct BallotListItem {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub ballot: Ballot,
    pub has_voted: bool,
}

/// Ballot with its options
#[derive(Debug, Clone, Serialize)]
pub struct BallotDetail {
    #[serde(flatten)]
    pub ballot: Ballot,
    pub options: Vec<BallotOption>,
    pub has_voted: bool,
    pub accepting_votes: bool,
    /// Options chosen by the caller, empty when not voted
    pub my_selection: Vec<Uuid>,
}

/// Input for creating a ballot
#[derive(Debug, Deserialize, Validate)]
pub struct CreateBallotInput {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    pub kind: BallotKind,
    #[serde(default)]
    pub options: Vec<String>,
    pub max_selections: Option<i32>,
    pub closes_at: Option<DateTime<Utc>>,
}

/// Input for casting a vote
#[derive(Debug, Deserialize)]
pub struct CastVoteInput {
    pub option_ids: Vec<Uuid>,
}

/// Tallies plus the leading option(s)
#[derive(Debug, Clone, Serialize)]
pub struct ResultsView {
    #[serde(flatten)]
    pub results: BallotResults,
    /// Empty without votes, several on a tie
    pub leaders: Vec<Uuid>,
}

impl From<BallotResults> for ResultsView {
    fn from(results: BallotResults) -> Self {
        let leaders = results.leaders().iter().map(|o| o.option_id).collect();
        Self { results, leaders }
    }
}

/// One vote in the CSV export
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct VoteExportRow {
    pub ballot: String,
    pub option: String,
    pub voter: String,
    pub email: String,
    pub cast_at: DateTime<Utc>,
}

pub const VOTE_EXPORT_HEADERS: [&str; 5] = ["ballot", "option", "voter", "email", "cast_at"];

const BALLOT_COLUMNS: &str = r#"
    b.id, b.condominium_id, b.title, b.description, b.kind, b.max_selections,
    b.status, b.closes_at, b.created_by, b.created_at
"#;

impl BallotService {
    /// Create a new BallotService instance
    pub fn new(db: PgPool, notifications: NotificationService) -> Self {
        Self { db, notifications }
    }

    // ========================================================================
    // Definition and lifecycle
    // ========================================================================

    /// Create a draft ballot with its options
    pub async fn create(
        &self,
        condominium_id: Uuid,
        author_id: Uuid,
        input: CreateBallotInput,
    ) -> AppResult<BallotDetail> {
        input.validate()?;
        shared::validate_title(&input.title).map_err(|e| AppError::invalid("title", e))?;
        validate_ballot_definition(input.kind, &input.options, input.max_selections)?;

        if let Some(closes_at) = input.closes_at {
            if closes_at <= Utc::now() {
                return Err(AppError::invalid("closes_at", "closes_at must be in the future"));
            }
        }

        let labels = input.kind.option_labels(&input.options);
        let max_selections = input.max_selections.filter(|_| input.kind.allows_multiple());

        let mut tx = self.db.begin().await?;

        let ballot_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO ballots
                (condominium_id, title, description, kind, max_selections, status, closes_at, created_by)
            VALUES ($1, $2, $3, $4, $5, 'draft', $6, $7)
            RETURNING id
            "#,
        )
        .bind(condominium_id)
        .bind(input.title.trim())
        .bind(input.description.as_deref())
        .bind(input.kind)
        .bind(max_selections)
        .bind(input.closes_at)
        .bind(author_id)
        .fetch_one(&mut *tx)
        .await?;

        for (position, label) in labels.iter().enumerate() {
            sqlx::query(
                "INSERT INTO ballot_options (ballot_id, label, position) VALUES ($1, $2, $3)",
            )
            .bind(ballot_id)
            .bind(label)
            .bind(position as i32)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::info!(%condominium_id, %ballot_id, kind = ?input.kind, "ballot created");
        self.get(condominium_id, ballot_id, author_id).await
    }

    /// Draft → Open, then notify members
    pub async fn open(&self, condominium_id: Uuid, ballot_id: Uuid) -> AppResult<Ballot> {
        let ballot = self
            .advance(condominium_id, ballot_id, BallotStatus::Draft)
            .await?;

        self.announce_opening(&ballot).await;
        Ok(ballot)
    }

    /// Open → Closed
    pub async fn close(&self, condominium_id: Uuid, ballot_id: Uuid) -> AppResult<Ballot> {
        self.advance(condominium_id, ballot_id, BallotStatus::Open).await
    }

    /// Move a ballot that is still in `from` to its successor
    async fn advance(
        &self,
        condominium_id: Uuid,
        ballot_id: Uuid,
        from: BallotStatus,
    ) -> AppResult<Ballot> {
        let to = from.next().ok_or_else(|| {
            AppError::InvalidStateTransition(format!("Ballot is already {}", from.as_str()))
        })?;

        let updated = sqlx::query_as::<_, Ballot>(&format!(
            r#"
            UPDATE ballots b SET status = $4
            WHERE b.condominium_id = $1 AND b.id = $2 AND b.status = $3
            RETURNING {BALLOT_COLUMNS}
            "#
        ))
        .bind(condominium_id)
        .bind(ballot_id)
        .bind(from)
        .bind(to)
        .fetch_optional(&self.db)
        .await?;

        match updated {
            Some(ballot) => {
                tracing::info!(%ballot_id, from = from.as_str(), to = to.as_str(), "ballot status changed");
                Ok(ballot)
            }
            None => {
                let current = self.find(condominium_id, ballot_id).await?;
                Err(AppError::InvalidStateTransition(format!(
                    "Ballot is {}, expected {}",
                    current.status.as_str(),
                    from.as_str()
                )))
            }
        }
    }

    async fn announce_opening(&self, ballot: &Ballot) {
        let enabled = sqlx::query_scalar::<_, bool>(
            "SELECT notify_on_ballot FROM condominium_settings WHERE condominium_id = $1",
        )
        .bind(ballot.condominium_id)
        .fetch_optional(&self.db)
        .await;

        match enabled {
            Ok(Some(false)) => return,
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(ballot_id = %ballot.id, "could not read settings: {}", e);
                return;
            }
        }

        let notification = NewNotification {
            kind: NotificationKind::BallotOpened,
            title: format!("Voting is open: {}", ballot.title),
            body: ballot.description.clone(),
            link: Some(format!(
                "/condominiums/{}/ballots/{}",
                ballot.condominium_id, ballot.id
            )),
        };
        self.notifications
            .notify_members(ballot.condominium_id, None, &notification)
            .await;

        self.notifications.trigger_workflow(
            NotificationKind::BallotOpened,
            json!({
                "condominium_id": ballot.condominium_id,
                "ballot_id": ballot.id,
                "title": ballot.title,
                "closes_at": ballot.closes_at,
            }),
        );
    }

    // ========================================================================
    // Queries
    // ========================================================================

    async fn find(&self, condominium_id: Uuid, ballot_id: Uuid) -> AppResult<Ballot> {
        sqlx::query_as::<_, Ballot>(&format!(
            "SELECT {BALLOT_COLUMNS} FROM ballots b WHERE b.condominium_id = $1 AND b.id = $2"
        ))
        .bind(condominium_id)
        .bind(ballot_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Ballot".to_string()))
    }

    async fn options(&self, ballot_id: Uuid) -> AppResult<Vec<BallotOption>> {
        let options = sqlx::query_as::<_, BallotOption>(
            r#"
            SELECT id, ballot_id, label, position
            FROM ballot_options
            WHERE ballot_id = $1
            ORDER BY position ASC
            "#,
        )
        .bind(ballot_id)
        .fetch_all(&self.db)
        .await?;

        Ok(options)
    }

    /// Ballots of a condominium, newest first; drafts only for admins
    pub async fn list(
        &self,
        condominium_id: Uuid,
        user_id: Uuid,
        role: SystemRole,
    ) -> AppResult<Vec<BallotListItem>> {
        let ballots = sqlx::query_as::<_, BallotListItem>(&format!(
            r#"
            SELECT {BALLOT_COLUMNS},
                   EXISTS(SELECT 1 FROM ballot_votes v
                          WHERE v.ballot_id = b.id AND v.user_id = $2) AS has_voted
            FROM ballots b
            WHERE b.condominium_id = $1 AND ($3 OR b.status <> 'draft')
            ORDER BY b.created_at DESC
            "#
        ))
        .bind(condominium_id)
        .bind(user_id)
        .bind(role.is_admin())
        .fetch_all(&self.db)
        .await?;

        Ok(ballots)
    }

    pub async fn get(&self, condominium_id: Uuid, ballot_id: Uuid, user_id: Uuid) -> AppResult<BallotDetail> {
        let ballot = self.find(condominium_id, ballot_id).await?;
        let options = self.options(ballot_id).await?;

        let my_selection = sqlx::query_scalar::<_, Uuid>(
            "SELECT option_id FROM ballot_votes WHERE ballot_id = $1 AND user_id = $2",
        )
        .bind(ballot_id)
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        Ok(BallotDetail {
            accepting_votes: accepts_votes(ballot.status, ballot.closes_at, Utc::now()),
            has_voted: !my_selection.is_empty(),
            ballot,
            options,
            my_selection,
        })
    }

    /// Same as [`BallotService::get`] but hides drafts from non-admins
    pub async fn get_visible(
        &self,
        condominium_id: Uuid,
        ballot_id: Uuid,
        user_id: Uuid,
        role: SystemRole,
    ) -> AppResult<BallotDetail> {
        let detail = self.get(condominium_id, ballot_id, user_id).await?;
        if detail.ballot.status == BallotStatus::Draft && !role.is_admin() {
            return Err(AppError::NotFound("Ballot".to_string()));
        }
        Ok(detail)
    }

    // ========================================================================
    // Voting
    // ========================================================================

    /// Record a member's selection; one vote per member and ballot
    pub async fn vote(
        &self,
        condominium_id: Uuid,
        ballot_id: Uuid,
        user_id: Uuid,
        input: CastVoteInput,
    ) -> AppResult<BallotDetail> {
        let mut tx = self.db.begin().await?;

        // serializes concurrent votes of the same member
        sqlx::query(
            "SELECT 1 FROM condominium_members WHERE condominium_id = $1 AND user_id = $2 FOR UPDATE",
        )
        .bind(condominium_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        let ballot = sqlx::query_as::<_, Ballot>(&format!(
            "SELECT {BALLOT_COLUMNS} FROM ballots b WHERE b.condominium_id = $1 AND b.id = $2 FOR SHARE"
        ))
        .bind(condominium_id)
        .bind(ballot_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Ballot".to_string()))?;

        if ballot.status == BallotStatus::Draft {
            return Err(AppError::NotFound("Ballot".to_string()));
        }
        if !accepts_votes(ballot.status, ballot.closes_at, Utc::now()) {
            return Err(AppError::BallotClosed);
        }

        let already = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM ballot_votes WHERE ballot_id = $1 AND user_id = $2)",
        )
        .bind(ballot_id)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;
        if already {
            return Err(AppError::AlreadyVoted);
        }

        let option_ids = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM ballot_options WHERE ballot_id = $1",
        )
        .bind(ballot_id)
        .fetch_all(&mut *tx)
        .await?;

        validate_selection(ballot.kind, &option_ids, &input.option_ids, ballot.max_selections)?;

        for option_id in &input.option_ids {
            sqlx::query(
                "INSERT INTO ballot_votes (ballot_id, option_id, user_id) VALUES ($1, $2, $3)",
            )
            .bind(ballot_id)
            .bind(option_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::info!(%ballot_id, %user_id, selected = input.option_ids.len(), "vote cast");
        self.get(condominium_id, ballot_id, user_id).await
    }

    // ========================================================================
    // Results
    // ========================================================================

    /// Vote counts; members see them once voting is over, admins always.
    /// Drafts do not exist for members.
    pub async fn results(
        &self,
        condominium_id: Uuid,
        ballot_id: Uuid,
        role: SystemRole,
    ) -> AppResult<ResultsView> {
        let ballot = self.find(condominium_id, ballot_id).await?;
        if !role.is_admin() {
            if ballot.status == BallotStatus::Draft {
                return Err(AppError::NotFound("Ballot".to_string()));
            }
            if !ballot.is_finished(Utc::now()) {
                return Err(AppError::InsufficientPermissions);
            }
        }

        let options = sqlx::query_as::<_, OptionTally>(
            r#"
            SELECT o.id AS option_id, o.label, COUNT(v.id) AS votes
            FROM ballot_options o
            LEFT JOIN ballot_votes v ON v.option_id = o.id
            WHERE o.ballot_id = $1
            GROUP BY o.id, o.label, o.position
            ORDER BY o.position ASC
            "#,
        )
        .bind(ballot_id)
        .fetch_all(&self.db)
        .await?;

        let voters = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(DISTINCT user_id) FROM ballot_votes WHERE ballot_id = $1",
        )
        .bind(ballot_id)
        .fetch_one(&self.db)
        .await?;

        Ok(ResultsView::from(BallotResults {
            ballot_id,
            voters,
            options,
        }))
    }

    /// One CSV row per selected option
    pub async fn export_votes(&self, condominium_id: Uuid, ballot_id: Uuid) -> AppResult<CsvExport> {
        let ballot = self.find(condominium_id, ballot_id).await?;

        let rows = sqlx::query_as::<_, VoteExportRow>(
            r#"
            SELECT b.title AS ballot, o.label AS option, u.full_name AS voter,
                   u.email, v.cast_at
            FROM ballot_votes v
            JOIN ballots b ON b.id = v.ballot_id
            JOIN ballot_options o ON o.id = v.option_id
            JOIN users u ON u.id = v.user_id
            WHERE v.ballot_id = $1
            ORDER BY v.cast_at ASC, u.full_name ASC, o.position ASC
            "#,
        )
        .bind(ballot_id)
        .fetch_all(&self.db)
        .await?;

        Ok(CsvExport {
            filename: attachment_name(&format!("ballot-{}", ballot.title), "csv"),
            body: to_csv(&VOTE_EXPORT_HEADERS, &rows)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorkflowConfig;
    use crate::external::WorkflowClient;
    use chrono::Duration;

    fn ballot(status: BallotStatus, closes_at: Option<DateTime<Utc>>) -> Ballot {
        Ballot {
            id: Uuid::new_v4(),
            condominium_id: Uuid::new_v4(),
            title: "Facade colour".to_string(),
            description: None,
            kind: BallotKind::SingleChoice,
            max_selections: None,
            status,
            closes_at,
            created_by: Uuid::new_v4(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_is_finished() {
        let now = Utc::now();
        assert!(!ballot(BallotStatus::Draft, None).is_finished(now));
        assert!(!ballot(BallotStatus::Open, Some(now + Duration::hours(1))).is_finished(now));
        assert!(ballot(BallotStatus::Open, Some(now - Duration::hours(1))).is_finished(now));
        assert!(ballot(BallotStatus::Closed, None).is_finished(now));
    }

    #[test]
    fn test_vote_export_shape() {
        let rows = vec![VoteExportRow {
            ballot: "Facade colour".to_string(),
            option: "Sand".to_string(),
            voter: "Ana Pereira".to_string(),
            email: "ana@example.com".to_string(),
            cast_at: DateTime::parse_from_rfc3339("2026-03-01T10:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
        }];
        let csv = to_csv(&VOTE_EXPORT_HEADERS, &rows).unwrap();
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("ballot,option,voter,email,cast_at"));
        assert_eq!(
            lines.next(),
            Some("Facade colour,Sand,Ana Pereira,ana@example.com,2026-03-01T10:00:00Z")
        );
        assert_eq!(lines.next(), None);
    }

    // ========================================================================
    // Database-backed
    // ========================================================================

    fn service(db: &PgPool) -> BallotService {
        let workflow = WorkflowClient::new(&WorkflowConfig {
            url: None,
            secret: None,
            timeout_secs: 5,
        });
        BallotService::new(db.clone(), NotificationService::new(db.clone(), workflow))
    }

    async fn seed_user(db: &PgPool, name: &str) -> Uuid {
        sqlx::query_scalar::<_, Uuid>(
            "INSERT INTO users (email, password_hash, full_name) VALUES ($1, 'x', $2) RETURNING id",
        )
        .bind(format!("{}@example.com", Uuid::new_v4()))
        .bind(name)
        .fetch_one(db)
        .await
        .unwrap()
    }

    /// Condominium with one admin and one member
    async fn seed_condominium(db: &PgPool) -> (Uuid, Uuid, Uuid) {
        let admin = seed_user(db, "Ana Pereira").await;
        let member = seed_user(db, "Rui Costa").await;
        let condominium_id = sqlx::query_scalar::<_, Uuid>(
            "INSERT INTO condominiums (name, created_by) VALUES ('Rua Augusta 12', $1) RETURNING id",
        )
        .bind(admin)
        .fetch_one(db)
        .await
        .unwrap();

        for (user_id, role) in [(admin, SystemRole::Admin), (member, SystemRole::Member)] {
            sqlx::query(
                "INSERT INTO condominium_members (condominium_id, user_id, role) VALUES ($1, $2, $3)",
            )
            .bind(condominium_id)
            .bind(user_id)
            .bind(role)
            .execute(db)
            .await
            .unwrap();
        }
        (condominium_id, admin, member)
    }

    fn yes_no(title: &str) -> CreateBallotInput {
        CreateBallotInput {
            title: title.to_string(),
            description: None,
            kind: BallotKind::YesNo,
            options: Vec::new(),
            max_selections: None,
            closes_at: None,
        }
    }

    #[sqlx::test]
    async fn test_draft_is_invisible_to_members(db: PgPool) {
        let (condominium_id, admin, member) = seed_condominium(&db).await;
        let ballots = service(&db);
        let draft = ballots.create(condominium_id, admin, yes_no("Replace the lift")).await.unwrap();
        let ballot_id = draft.ballot.id;

        let err = ballots
            .get_visible(condominium_id, ballot_id, member, SystemRole::Member)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let err = ballots
            .results(condominium_id, ballot_id, SystemRole::Member)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let err = ballots
            .vote(
                condominium_id,
                ballot_id,
                member,
                CastVoteInput {
                    option_ids: vec![draft.options[0].id],
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let listed = ballots.list(condominium_id, member, SystemRole::Member).await.unwrap();
        assert!(listed.is_empty());

        // admins still see it
        assert!(ballots.results(condominium_id, ballot_id, SystemRole::Admin).await.is_ok());
    }

    #[sqlx::test]
    async fn test_second_vote_is_rejected(db: PgPool) {
        let (condominium_id, admin, member) = seed_condominium(&db).await;
        let ballots = service(&db);
        let draft = ballots.create(condominium_id, admin, yes_no("Repaint the facade")).await.unwrap();
        let ballot_id = draft.ballot.id;
        let yes = draft.options[0].id;
        let no = draft.options[1].id;

        ballots.open(condominium_id, ballot_id).await.unwrap();

        let detail = ballots
            .vote(condominium_id, ballot_id, member, CastVoteInput { option_ids: vec![yes] })
            .await
            .unwrap();
        assert!(detail.has_voted);
        assert_eq!(detail.my_selection, vec![yes]);

        let err = ballots
            .vote(condominium_id, ballot_id, member, CastVoteInput { option_ids: vec![no] })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::AlreadyVoted));
        assert_eq!(err.status_code(), axum::http::StatusCode::CONFLICT);

        // still running: members wait for the close
        let err = ballots
            .results(condominium_id, ballot_id, SystemRole::Member)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InsufficientPermissions));

        ballots.close(condominium_id, ballot_id).await.unwrap();
        let results = ballots
            .results(condominium_id, ballot_id, SystemRole::Member)
            .await
            .unwrap();
        assert_eq!(results.results.voters, 1);
        assert_eq!(results.leaders, vec![yes]);

        let err = ballots
            .vote(condominium_id, ballot_id, admin, CastVoteInput { option_ids: vec![no] })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BallotClosed));
    }

    #[sqlx::test]
    async fn test_closed_ballot_cannot_be_advanced(db: PgPool) {
        let (condominium_id, admin, _) = seed_condominium(&db).await;
        let ballots = service(&db);
        let draft = ballots.create(condominium_id, admin, yes_no("Bike storage")).await.unwrap();
        let ballot_id = draft.ballot.id;

        let err = ballots.close(condominium_id, ballot_id).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidStateTransition(_)));

        ballots.open(condominium_id, ballot_id).await.unwrap();
        ballots.close(condominium_id, ballot_id).await.unwrap();
        let err = ballots.open(condominium_id, ballot_id).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidStateTransition(_)));
    }
}
