//! The request lifecycle engine: creation with payment linkage, status
//! transitions, user cancellation, assignment, and the request/history
//! read aggregate.
//!
//! Every multi-write operation runs inside one transaction against the
//! injected pool; a failure rolls the whole operation back, so a request
//! row can never be observed without its matching history entry.

use std::sync::Arc;

use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use sqlx::Row;

use jansetu_core::credentials::constant_time_eq;
use jansetu_core::domain::document::Document;
use jansetu_core::domain::history::StatusHistoryEntry;
use jansetu_core::domain::identity::{AdminId, UserId};
use jansetu_core::domain::payment::{Payment, PaymentStatus};
use jansetu_core::domain::request::{RequestId, RequestKind, RequestStatus, ServiceRequest};
use jansetu_core::domain::service::ServiceId;
use jansetu_core::errors::LifecycleError;

use crate::repositories::{
    parse_ts, DocumentStore, IdentityStore, PaymentLedger, RepositoryError, ServiceCatalog,
};
use crate::DbPool;

pub struct LifecycleEngine {
    pool: DbPool,
    catalog: Arc<dyn ServiceCatalog>,
    identity: Arc<dyn IdentityStore>,
    payments: Arc<dyn PaymentLedger>,
    documents: Arc<dyn DocumentStore>,
    superadmin_code: SecretString,
}

/// Visibility of a request read: admins see everything, a user-scoped
/// read treats other users' requests as nonexistent.
#[derive(Clone, Debug)]
pub enum RequestScope {
    Any,
    ForUser(UserId),
}

#[derive(Clone, Debug)]
pub struct RequestBundle {
    pub request: ServiceRequest,
    /// Oldest first, matching append order.
    pub history: Vec<StatusHistoryEntry>,
    pub documents: Vec<Document>,
    pub payments: Vec<Payment>,
}

fn store_err(error: impl std::fmt::Display) -> LifecycleError {
    LifecycleError::Store(error.to_string())
}

impl From<RepositoryError> for LifecycleError {
    fn from(error: RepositoryError) -> Self {
        LifecycleError::Store(error.to_string())
    }
}

const REQUEST_COLUMNS: &str = "request_id, user_id, service_id, request_kind, description, \
                               status, assigned_to, created_at, updated_at";

fn request_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<ServiceRequest, RepositoryError> {
    let kind: String =
        row.try_get("request_kind").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let status: String =
        row.try_get("status").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let assigned_to: Option<String> =
        row.try_get("assigned_to").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let updated_at: String =
        row.try_get("updated_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(ServiceRequest {
        id: RequestId(row.try_get("request_id").map_err(|e| RepositoryError::Decode(e.to_string()))?),
        user_id: UserId(row.try_get("user_id").map_err(|e| RepositoryError::Decode(e.to_string()))?),
        service_id: ServiceId(
            row.try_get("service_id").map_err(|e| RepositoryError::Decode(e.to_string()))?,
        ),
        kind: RequestKind::parse(&kind)
            .ok_or_else(|| RepositoryError::Decode(format!("request_kind: `{kind}`")))?,
        description: row
            .try_get("description")
            .map_err(|e| RepositoryError::Decode(e.to_string()))?,
        status: RequestStatus::parse(&status)
            .ok_or_else(|| RepositoryError::Decode(format!("status: `{status}`")))?,
        assigned_to: assigned_to.map(AdminId),
        created_at: parse_ts("created_at", &created_at)?,
        updated_at: parse_ts("updated_at", &updated_at)?,
    })
}

fn history_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<StatusHistoryEntry, RepositoryError> {
    let old_status: Option<String> =
        row.try_get("old_status").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let new_status: String =
        row.try_get("new_status").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let changed_by: Option<String> =
        row.try_get("changed_by").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let changed_at: String =
        row.try_get("changed_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(StatusHistoryEntry {
        id: row.try_get("history_id").map_err(|e| RepositoryError::Decode(e.to_string()))?,
        request_id: RequestId(
            row.try_get("request_id").map_err(|e| RepositoryError::Decode(e.to_string()))?,
        ),
        old_status: old_status
            .as_deref()
            .map(|status| {
                RequestStatus::parse(status)
                    .ok_or_else(|| RepositoryError::Decode(format!("old_status: `{status}`")))
            })
            .transpose()?,
        new_status: RequestStatus::parse(&new_status)
            .ok_or_else(|| RepositoryError::Decode(format!("new_status: `{new_status}`")))?,
        changed_by: changed_by.map(AdminId),
        remarks: row.try_get("remarks").map_err(|e| RepositoryError::Decode(e.to_string()))?,
        changed_at: parse_ts("changed_at", &changed_at)?,
    })
}

impl LifecycleEngine {
    pub fn new(
        pool: DbPool,
        catalog: Arc<dyn ServiceCatalog>,
        identity: Arc<dyn IdentityStore>,
        payments: Arc<dyn PaymentLedger>,
        documents: Arc<dyn DocumentStore>,
        superadmin_code: SecretString,
    ) -> Self {
        Self { pool, catalog, identity, payments, documents, superadmin_code }
    }

    /// Create a request, validating the referenced service and, for
    /// payable services, consuming exactly one successful payment. The
    /// request insert, the payment link, and the creation history entry
    /// commit atomically.
    pub async fn create_request(
        &self,
        user_id: &UserId,
        service_id: &ServiceId,
        kind: RequestKind,
        description: Option<String>,
        transaction_ref: Option<&str>,
    ) -> Result<RequestId, LifecycleError> {
        let service = self
            .catalog
            .find_service(service_id)
            .await?
            .ok_or(LifecycleError::ServiceNotFound)?;
        if !service.active {
            return Err(LifecycleError::ServiceInactive);
        }
        if service.requires_payment() && transaction_ref.is_none() {
            return Err(LifecycleError::PaymentRequired);
        }

        let payment = match transaction_ref {
            Some(transaction_ref) => {
                let payment = self
                    .payments
                    .find_payment(transaction_ref, user_id)
                    .await?
                    .ok_or(LifecycleError::PaymentNotFound)?;
                if payment.status != PaymentStatus::Success {
                    return Err(LifecycleError::PaymentNotSuccessful);
                }
                if payment.service_id != *service_id {
                    return Err(LifecycleError::PaymentServiceMismatch);
                }
                Some(payment)
            }
            None => None,
        };

        let now = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await.map_err(store_err)?;

        let inserted = sqlx::query(
            "INSERT INTO service_request (user_id, service_id, request_kind, description,
                                          status, created_at, updated_at)
             VALUES (?, ?, ?, ?, 'Pending', ?, ?)",
        )
        .bind(&user_id.0)
        .bind(&service_id.0)
        .bind(kind.as_str())
        .bind(&description)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await
        .map_err(store_err)?;
        let request_id = inserted.last_insert_rowid();

        if let Some(payment) = &payment {
            // The null guard serializes concurrent creates on the same
            // transaction reference: exactly one update touches a row.
            let linked = sqlx::query(
                "UPDATE payment SET request_id = ? WHERE payment_id = ? AND request_id IS NULL",
            )
            .bind(request_id)
            .bind(&payment.id.0)
            .execute(&mut *tx)
            .await
            .map_err(store_err)?;
            if linked.rows_affected() == 0 {
                tx.rollback().await.map_err(store_err)?;
                return Err(LifecycleError::PaymentAlreadyLinked);
            }
        }

        sqlx::query(
            "INSERT INTO request_status_history (request_id, old_status, new_status,
                                                 changed_by, remarks, changed_at)
             VALUES (?, NULL, 'Pending', NULL, 'Request created', ?)",
        )
        .bind(request_id)
        .bind(&now)
        .execute(&mut *tx)
        .await
        .map_err(store_err)?;

        tx.commit().await.map_err(store_err)?;
        Ok(RequestId(request_id))
    }

    /// Admin status change. Any status may move to any other status; only
    /// re-applying the current status is rejected, without touching the
    /// history.
    pub async fn transition_status(
        &self,
        request_id: RequestId,
        new_status: RequestStatus,
        actor: &AdminId,
        remarks: Option<&str>,
    ) -> Result<(), LifecycleError> {
        let mut tx = self.pool.begin().await.map_err(store_err)?;

        let row = sqlx::query("SELECT status FROM service_request WHERE request_id = ?")
            .bind(request_id.0)
            .fetch_optional(&mut *tx)
            .await
            .map_err(store_err)?
            .ok_or(LifecycleError::RequestNotFound)?;
        let status: String =
            row.try_get("status").map_err(|e| RepositoryError::Decode(e.to_string()))?;
        let current = RequestStatus::parse(&status)
            .ok_or_else(|| store_err(format!("undecodable status `{status}`")))?;

        if current == new_status {
            return Err(LifecycleError::NoOpTransition(current));
        }

        let now = Utc::now().to_rfc3339();
        sqlx::query("UPDATE service_request SET status = ?, updated_at = ? WHERE request_id = ?")
            .bind(new_status.as_str())
            .bind(&now)
            .bind(request_id.0)
            .execute(&mut *tx)
            .await
            .map_err(store_err)?;

        sqlx::query(
            "INSERT INTO request_status_history (request_id, old_status, new_status,
                                                 changed_by, remarks, changed_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(request_id.0)
        .bind(current.as_str())
        .bind(new_status.as_str())
        .bind(&actor.0)
        .bind(remarks)
        .bind(&now)
        .execute(&mut *tx)
        .await
        .map_err(store_err)?;

        tx.commit().await.map_err(store_err)?;
        Ok(())
    }

    /// User-initiated cancellation, allowed only while the request is
    /// still `Pending`. A foreign request reads as nonexistent.
    pub async fn cancel_request(
        &self,
        request_id: RequestId,
        user_id: &UserId,
    ) -> Result<(), LifecycleError> {
        let mut tx = self.pool.begin().await.map_err(store_err)?;

        let row = sqlx::query(
            "SELECT status FROM service_request WHERE request_id = ? AND user_id = ?",
        )
        .bind(request_id.0)
        .bind(&user_id.0)
        .fetch_optional(&mut *tx)
        .await
        .map_err(store_err)?
        .ok_or(LifecycleError::RequestNotFound)?;
        let status: String =
            row.try_get("status").map_err(|e| RepositoryError::Decode(e.to_string()))?;
        let current = RequestStatus::parse(&status)
            .ok_or_else(|| store_err(format!("undecodable status `{status}`")))?;

        if current != RequestStatus::Pending {
            return Err(LifecycleError::NotCancellable);
        }

        let now = Utc::now().to_rfc3339();
        sqlx::query("UPDATE service_request SET status = 'Cancelled', updated_at = ? WHERE request_id = ?")
            .bind(&now)
            .bind(request_id.0)
            .execute(&mut *tx)
            .await
            .map_err(store_err)?;

        sqlx::query(
            "INSERT INTO request_status_history (request_id, old_status, new_status,
                                                 changed_by, remarks, changed_at)
             VALUES (?, ?, 'Cancelled', NULL, 'Cancelled by user', ?)",
        )
        .bind(request_id.0)
        .bind(current.as_str())
        .bind(&now)
        .execute(&mut *tx)
        .await
        .map_err(store_err)?;

        tx.commit().await.map_err(store_err)?;
        Ok(())
    }

    /// Super-admin only assignment. Deliberately does NOT append a
    /// history entry; assignment is out-of-band from status.
    pub async fn assign_request(
        &self,
        request_id: RequestId,
        assigned_to: &AdminId,
        elevated_credential: &str,
    ) -> Result<(), LifecycleError> {
        if !constant_time_eq(elevated_credential, self.superadmin_code.expose_secret()) {
            return Err(LifecycleError::Forbidden);
        }

        let request = sqlx::query("SELECT request_id FROM service_request WHERE request_id = ?")
            .bind(request_id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?;
        if request.is_none() {
            return Err(LifecycleError::RequestNotFound);
        }

        if self.identity.find_admin(assigned_to).await?.is_none() {
            return Err(LifecycleError::AdminNotFound);
        }

        sqlx::query("UPDATE service_request SET assigned_to = ? WHERE request_id = ?")
            .bind(&assigned_to.0)
            .bind(request_id.0)
            .execute(&self.pool)
            .await
            .map_err(store_err)?;

        Ok(())
    }

    /// Read-only aggregate of a request with its history (oldest first),
    /// documents, and payments.
    pub async fn get_request_with_history(
        &self,
        request_id: RequestId,
        scope: RequestScope,
    ) -> Result<RequestBundle, LifecycleError> {
        let row = match &scope {
            RequestScope::Any => {
                sqlx::query(&format!(
                    "SELECT {REQUEST_COLUMNS} FROM service_request WHERE request_id = ?"
                ))
                .bind(request_id.0)
                .fetch_optional(&self.pool)
                .await
            }
            RequestScope::ForUser(user_id) => {
                sqlx::query(&format!(
                    "SELECT {REQUEST_COLUMNS} FROM service_request
                     WHERE request_id = ? AND user_id = ?"
                ))
                .bind(request_id.0)
                .bind(&user_id.0)
                .fetch_optional(&self.pool)
                .await
            }
        }
        .map_err(store_err)?;

        let request =
            request_from_row(&row.ok_or(LifecycleError::RequestNotFound)?).map_err(store_err)?;

        let history_rows = sqlx::query(
            "SELECT history_id, request_id, old_status, new_status, changed_by, remarks, changed_at
             FROM request_status_history
             WHERE request_id = ?
             ORDER BY changed_at ASC, history_id ASC",
        )
        .bind(request_id.0)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;
        let history = history_rows
            .iter()
            .map(history_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(store_err)?;

        let documents = self.documents.list_for_request(request_id).await?;
        let payments = self.payments.list_for_request(request_id).await?;

        Ok(RequestBundle { request, history, documents, payments })
    }
}
