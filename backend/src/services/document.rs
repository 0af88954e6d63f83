//! Document service: folders, document metadata and signed downloads

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::external::{SignedUrl, UrlSigner};
use shared::{can_access, resolve_visibility, SystemRole, Visibility};

/// Document service
#[derive(Clone)]
pub struct DocumentService {
    db: PgPool,
    signer: UrlSigner,
}

/// Document folder
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Folder {
    pub id: Uuid,
    pub condominium_id: Uuid,
    pub name: String,
    pub default_visibility: Option<Visibility>,
    pub document_count: i64,
}

/// Document metadata joined with its folder default
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Document {
    pub id: Uuid,
    pub condominium_id: Uuid,
    pub folder_id: Option<Uuid>,
    pub folder_name: Option<String>,
    pub title: String,
    #[serde(skip_serializing)]
    pub storage_path: String,
    pub mime_type: Option<String>,
    pub size_bytes: Option<i64>,
    /// Explicit override, `None` inherits from the folder
    pub visibility: Option<Visibility>,
    #[serde(skip_serializing)]
    pub folder_visibility: Option<Visibility>,
    pub uploaded_by: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Document {
    pub fn effective_visibility(&self) -> Visibility {
        resolve_visibility(self.visibility, self.folder_visibility)
    }
}

/// Document as returned to clients
#[derive(Debug, Clone, Serialize)]
pub struct DocumentView {
    #[serde(flatten)]
    pub document: Document,
    pub effective_visibility: Visibility,
}

impl From<Document> for DocumentView {
    fn from(document: Document) -> Self {
        Self {
            effective_visibility: document.effective_visibility(),
            document,
        }
    }
}

/// Input for creating a folder
#[derive(Debug, Deserialize, Validate)]
pub struct CreateFolderInput {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    pub default_visibility: Option<Visibility>,
}

/// Metadata of an object already uploaded to storage
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterDocumentInput {
    pub folder_id: Option<Uuid>,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1, max = 1024))]
    pub storage_path: String,
    #[validate(length(max = 255))]
    pub mime_type: Option<String>,
    #[validate(range(min = 0))]
    pub size_bytes: Option<i64>,
    pub visibility: Option<Visibility>,
}

/// Query parameters for listing documents
#[derive(Debug, Deserialize)]
pub struct DocumentQuery {
    pub folder_id: Option<Uuid>,
}

const DOCUMENT_SELECT: &str = r#"
    SELECT d.id, d.condominium_id, d.folder_id, f.name AS folder_name, d.title,
           d.storage_path, d.mime_type, d.size_bytes, d.visibility,
           f.default_visibility AS folder_visibility, d.uploaded_by, d.created_at
    FROM documents d
    LEFT JOIN document_folders f ON f.id = d.folder_id
"#;

/// Keep only the documents `role` may see
pub fn visible_to(documents: Vec<Document>, role: Option<SystemRole>) -> Vec<DocumentView> {
    documents
        .into_iter()
        .filter(|d| can_access(d.effective_visibility(), role))
        .map(DocumentView::from)
        .collect()
}

impl DocumentService {
    /// Create a new DocumentService instance
    pub fn new(db: PgPool, signer: UrlSigner) -> Self {
        Self { db, signer }
    }

    // ========================================================================
    // Folders
    // ========================================================================

    pub async fn list_folders(&self, condominium_id: Uuid) -> AppResult<Vec<Folder>> {
        let folders = sqlx::query_as::<_, Folder>(
            r#"
            SELECT f.id, f.condominium_id, f.name, f.default_visibility,
                   (SELECT COUNT(*) FROM documents d WHERE d.folder_id = f.id) AS document_count
            FROM document_folders f
            WHERE f.condominium_id = $1
            ORDER BY f.name ASC
            "#,
        )
        .bind(condominium_id)
        .fetch_all(&self.db)
        .await?;

        Ok(folders)
    }

    pub async fn create_folder(&self, condominium_id: Uuid, input: CreateFolderInput) -> AppResult<Folder> {
        input.validate()?;

        let folder = sqlx::query_as::<_, Folder>(
            r#"
            INSERT INTO document_folders (condominium_id, name, default_visibility)
            VALUES ($1, $2, $3)
            RETURNING id, condominium_id, name, default_visibility, 0::BIGINT AS document_count
            "#,
        )
        .bind(condominium_id)
        .bind(input.name.trim())
        .bind(input.default_visibility)
        .fetch_one(&self.db)
        .await?;

        Ok(folder)
    }

    /// Delete a folder; its documents stay, unfiled
    pub async fn delete_folder(&self, condominium_id: Uuid, folder_id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM document_folders WHERE condominium_id = $1 AND id = $2")
            .bind(condominium_id)
            .bind(folder_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Folder".to_string()));
        }

        Ok(())
    }

    // ========================================================================
    // Documents
    // ========================================================================

    pub async fn register(
        &self,
        condominium_id: Uuid,
        uploader_id: Uuid,
        input: RegisterDocumentInput,
    ) -> AppResult<DocumentView> {
        input.validate()?;
        shared::validate_title(&input.title).map_err(|e| AppError::invalid("title", e))?;
        shared::validate_storage_path(&input.storage_path)
            .map_err(|e| AppError::invalid("storage_path", e))?;

        if let Some(folder_id) = input.folder_id {
            let exists = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM document_folders WHERE id = $1 AND condominium_id = $2)",
            )
            .bind(folder_id)
            .bind(condominium_id)
            .fetch_one(&self.db)
            .await?;
            if !exists {
                return Err(AppError::NotFound("Folder".to_string()));
            }
        }

        let document_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO documents
                (condominium_id, folder_id, title, storage_path, mime_type, size_bytes, visibility, uploaded_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            "#,
        )
        .bind(condominium_id)
        .bind(input.folder_id)
        .bind(input.title.trim())
        .bind(&input.storage_path)
        .bind(input.mime_type.as_deref())
        .bind(input.size_bytes)
        .bind(input.visibility)
        .bind(uploader_id)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(%condominium_id, %document_id, "document registered");
        self.find(condominium_id, document_id).await.map(DocumentView::from)
    }

    async fn find(&self, condominium_id: Uuid, document_id: Uuid) -> AppResult<Document> {
        sqlx::query_as::<_, Document>(&format!(
            "{DOCUMENT_SELECT} WHERE d.condominium_id = $1 AND d.id = $2"
        ))
        .bind(condominium_id)
        .bind(document_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Document".to_string()))
    }

    /// Documents the caller may see, newest first
    pub async fn list(
        &self,
        condominium_id: Uuid,
        role: Option<SystemRole>,
        query: &DocumentQuery,
    ) -> AppResult<Vec<DocumentView>> {
        let documents = sqlx::query_as::<_, Document>(&format!(
            r#"
            {DOCUMENT_SELECT}
            WHERE d.condominium_id = $1 AND ($2::uuid IS NULL OR d.folder_id = $2)
            ORDER BY d.created_at DESC
            "#
        ))
        .bind(condominium_id)
        .bind(query.folder_id)
        .fetch_all(&self.db)
        .await?;

        Ok(visible_to(documents, role))
    }

    pub async fn delete(&self, condominium_id: Uuid, document_id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM documents WHERE condominium_id = $1 AND id = $2")
            .bind(condominium_id)
            .bind(document_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Document".to_string()));
        }

        Ok(())
    }

    /// Signed URL for a document; invisible documents are reported as missing
    pub async fn download_url(
        &self,
        condominium_id: Uuid,
        document_id: Uuid,
        role: Option<SystemRole>,
    ) -> AppResult<SignedUrl> {
        let document = self.find(condominium_id, document_id).await?;
        let visibility = document.effective_visibility();

        if !can_access(visibility, role) {
            tracing::debug!(%document_id, ?visibility, ?role, "document hidden from caller");
            return Err(AppError::NotFound("Document".to_string()));
        }

        self.signer.sign(&document.storage_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageConfig;
    use chrono::Duration;
    use reqwest::Url;

    fn document(visibility: Option<Visibility>, folder_visibility: Option<Visibility>) -> Document {
        Document {
            id: Uuid::new_v4(),
            condominium_id: Uuid::new_v4(),
            folder_id: None,
            folder_name: None,
            title: "General assembly minutes".to_string(),
            storage_path: "condo/minutes.pdf".to_string(),
            mime_type: Some("application/pdf".to_string()),
            size_bytes: Some(1024),
            visibility,
            folder_visibility,
            uploaded_by: Uuid::new_v4(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_override_beats_folder_default() {
        let doc = document(Some(Visibility::Public), Some(Visibility::Admin));
        assert_eq!(doc.effective_visibility(), Visibility::Public);
        let doc = document(None, Some(Visibility::Admin));
        assert_eq!(doc.effective_visibility(), Visibility::Admin);
        let doc = document(None, None);
        assert_eq!(doc.effective_visibility(), Visibility::Members);
    }

    #[test]
    fn test_visible_to_filters_by_role() {
        let docs = || {
            vec![
                document(Some(Visibility::Public), None),
                document(None, None),
                document(None, Some(Visibility::Admin)),
            ]
        };
        assert_eq!(visible_to(docs(), None).len(), 1);
        assert_eq!(visible_to(docs(), Some(SystemRole::Member)).len(), 2);
        assert_eq!(visible_to(docs(), Some(SystemRole::Admin)).len(), 3);
    }

    #[test]
    fn test_storage_path_hidden_from_clients() {
        let view = DocumentView::from(document(None, None));
        let json = serde_json::to_value(&view).unwrap();
        assert!(json.get("storage_path").is_none());
        assert_eq!(json["effective_visibility"], "members");
    }

    // ========================================================================
    // Database-backed
    // ========================================================================

    fn service(db: &PgPool) -> DocumentService {
        let signer = UrlSigner::new(&StorageConfig {
            public_base_url: "https://files.example.com/object".to_string(),
            bucket: "documents".to_string(),
            signing_secret: "s3cr3t".to_string(),
            signed_url_ttl: 60,
        })
        .unwrap();
        DocumentService::new(db.clone(), signer)
    }

    /// Condominium owned by a fresh admin; returns (condominium, admin)
    async fn seed(db: &PgPool) -> (Uuid, Uuid) {
        let admin = sqlx::query_scalar::<_, Uuid>(
            "INSERT INTO users (email, password_hash, full_name) VALUES ($1, 'x', 'Ana Pereira') RETURNING id",
        )
        .bind(format!("{}@example.com", Uuid::new_v4()))
        .fetch_one(db)
        .await
        .unwrap();
        let condominium_id = sqlx::query_scalar::<_, Uuid>(
            "INSERT INTO condominiums (name, created_by) VALUES ('Rua Augusta 12', $1) RETURNING id",
        )
        .bind(admin)
        .fetch_one(db)
        .await
        .unwrap();
        (condominium_id, admin)
    }

    fn upload(title: &str, path: &str, visibility: Option<Visibility>) -> RegisterDocumentInput {
        RegisterDocumentInput {
            folder_id: None,
            title: title.to_string(),
            storage_path: path.to_string(),
            mime_type: Some("application/pdf".to_string()),
            size_bytes: Some(2048),
            visibility,
        }
    }

    fn query_param(url: &Url, name: &str) -> String {
        url.query_pairs()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
            .unwrap()
    }

    #[sqlx::test]
    async fn test_download_url_expires_after_ttl(db: PgPool) {
        let (condominium_id, admin) = seed(&db).await;
        let documents = service(&db);
        let view = documents
            .register(condominium_id, admin, upload("House rules", "condo/rules.pdf", None))
            .await
            .unwrap();

        let before = Utc::now();
        let signed = documents
            .download_url(condominium_id, view.document.id, Some(SystemRole::Member))
            .await
            .unwrap();
        let after = Utc::now();

        assert!(signed.expires_at >= before + Duration::seconds(60));
        assert!(signed.expires_at <= after + Duration::seconds(60));

        let url = Url::parse(&signed.url).unwrap();
        assert_eq!(url.path(), "/object/documents/condo/rules.pdf");
        let expires: i64 = query_param(&url, "expires").parse().unwrap();
        assert_eq!(expires, signed.expires_at.timestamp());

        let signature = query_param(&url, "signature");
        let signer = &documents.signer;
        assert!(signer.verify("condo/rules.pdf", expires, &signature, after));
        assert!(!signer.verify("condo/rules.pdf", expires, &signature, signed.expires_at));
    }

    #[sqlx::test]
    async fn test_hidden_documents_are_not_found(db: PgPool) {
        let (condominium_id, admin) = seed(&db).await;
        let documents = service(&db);
        let minutes = documents
            .register(
                condominium_id,
                admin,
                upload("Board minutes", "condo/board.pdf", Some(Visibility::Admin)),
            )
            .await
            .unwrap();
        let notice = documents
            .register(
                condominium_id,
                admin,
                upload("Works notice", "condo/notice.pdf", Some(Visibility::Public)),
            )
            .await
            .unwrap();

        let err = documents
            .download_url(condominium_id, minutes.document.id, Some(SystemRole::Member))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        assert!(documents
            .download_url(condominium_id, minutes.document.id, Some(SystemRole::Admin))
            .await
            .is_ok());
        assert!(documents
            .download_url(condominium_id, notice.document.id, None)
            .await
            .is_ok());

        let err = documents
            .download_url(condominium_id, Uuid::new_v4(), Some(SystemRole::Admin))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
