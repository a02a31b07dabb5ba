use chrono::Utc;
use sqlx::Row;

use jansetu_core::domain::document::{Document, DocumentStatus};
use jansetu_core::domain::identity::UserId;
use jansetu_core::domain::request::RequestId;

use super::{parse_ts, DocumentStore, RepositoryError};
use crate::DbPool;

pub struct SqlDocumentStore {
    pool: DbPool,
}

impl SqlDocumentStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[derive(Clone, Debug)]
pub struct NewDocument {
    pub user_id: UserId,
    pub request_id: Option<RequestId>,
    pub document_type: String,
    pub document_number: Option<String>,
    pub file_path: String,
}

fn document_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Document, RepositoryError> {
    let request_id: Option<i64> =
        row.try_get("request_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let verified_status: String =
        row.try_get("verified_status").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let uploaded_at: String =
        row.try_get("uploaded_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(Document {
        id: row.try_get("document_id").map_err(|e| RepositoryError::Decode(e.to_string()))?,
        user_id: UserId(row.try_get("user_id").map_err(|e| RepositoryError::Decode(e.to_string()))?),
        request_id: request_id.map(RequestId),
        document_type: row
            .try_get("document_type")
            .map_err(|e| RepositoryError::Decode(e.to_string()))?,
        document_number: row
            .try_get("document_number")
            .map_err(|e| RepositoryError::Decode(e.to_string()))?,
        file_path: row.try_get("file_path").map_err(|e| RepositoryError::Decode(e.to_string()))?,
        verified_status: DocumentStatus::parse(&verified_status)
            .ok_or_else(|| RepositoryError::Decode(format!("verified_status: `{verified_status}`")))?,
        uploaded_at: parse_ts("uploaded_at", &uploaded_at)?,
    })
}

const DOCUMENT_COLUMNS: &str = "document_id, user_id, request_id, document_type, \
                                document_number, file_path, verified_status, uploaded_at";

#[async_trait::async_trait]
impl DocumentStore for SqlDocumentStore {
    async fn add(&self, new: NewDocument) -> Result<i64, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO document (user_id, request_id, document_type, document_number,
                                   file_path, verified_status, uploaded_at)
             VALUES (?, ?, ?, ?, ?, 'Pending', ?)",
        )
        .bind(&new.user_id.0)
        .bind(new.request_id.map(|id| id.0))
        .bind(&new.document_type)
        .bind(&new.document_number)
        .bind(&new.file_path)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    async fn list_for_user(&self, user: &UserId) -> Result<Vec<Document>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {DOCUMENT_COLUMNS} FROM document WHERE user_id = ?
             ORDER BY uploaded_at DESC, document_id DESC"
        ))
        .bind(&user.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(document_from_row).collect()
    }

    async fn list_for_request(
        &self,
        request: RequestId,
    ) -> Result<Vec<Document>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {DOCUMENT_COLUMNS} FROM document WHERE request_id = ?
             ORDER BY uploaded_at DESC, document_id DESC"
        ))
        .bind(request.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(document_from_row).collect()
    }

    async fn delete(&self, id: i64, owner: &UserId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM document WHERE document_id = ? AND user_id = ?")
            .bind(id)
            .bind(&owner.0)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
