use sqlx::{QueryBuilder, Row};

use jansetu_core::domain::identity::UserId;
use jansetu_core::domain::payment::{Payment, PaymentId, PaymentStatus};
use jansetu_core::domain::request::{RequestId, RequestStatus};
use jansetu_core::domain::service::{ServiceId, ServiceType};
use jansetu_core::reporting::PaymentReceipt;

use super::{parse_decimal, parse_opt_ts, PaymentLedger, RepositoryError};
use crate::DbPool;

pub struct SqlPaymentLedger {
    pool: DbPool,
}

impl SqlPaymentLedger {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

const PAYMENT_COLUMNS: &str = "payment_id, user_id, service_id, transaction_ref, amount, \
                               payment_method, payment_status, request_id, paid_at";

pub(crate) fn payment_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Payment, RepositoryError> {
    let amount: String =
        row.try_get("amount").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let status: String =
        row.try_get("payment_status").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let request_id: Option<i64> =
        row.try_get("request_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let paid_at: Option<String> =
        row.try_get("paid_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(Payment {
        id: PaymentId(row.try_get("payment_id").map_err(|e| RepositoryError::Decode(e.to_string()))?),
        user_id: UserId(row.try_get("user_id").map_err(|e| RepositoryError::Decode(e.to_string()))?),
        service_id: ServiceId(
            row.try_get("service_id").map_err(|e| RepositoryError::Decode(e.to_string()))?,
        ),
        transaction_ref: row
            .try_get("transaction_ref")
            .map_err(|e| RepositoryError::Decode(e.to_string()))?,
        amount: parse_decimal("amount", &amount)?,
        method: row
            .try_get("payment_method")
            .map_err(|e| RepositoryError::Decode(e.to_string()))?,
        status: PaymentStatus::parse(&status)
            .ok_or_else(|| RepositoryError::Decode(format!("payment_status: `{status}`")))?,
        request_id: request_id.map(RequestId),
        paid_at: parse_opt_ts("paid_at", paid_at)?,
    })
}

#[async_trait::async_trait]
impl PaymentLedger for SqlPaymentLedger {
    async fn find_payment(
        &self,
        transaction_ref: &str,
        user: &UserId,
    ) -> Result<Option<Payment>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payment WHERE transaction_ref = ? AND user_id = ?"
        ))
        .bind(transaction_ref)
        .bind(&user.0)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(payment_from_row).transpose()
    }

    async fn list_for_request(
        &self,
        request: RequestId,
    ) -> Result<Vec<Payment>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payment WHERE request_id = ?"
        ))
        .bind(request.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(payment_from_row).collect()
    }

    async fn list_receipts(
        &self,
        user: &UserId,
        status: Option<PaymentStatus>,
    ) -> Result<Vec<PaymentReceipt>, RepositoryError> {
        let mut query = QueryBuilder::new(
            "SELECT p.payment_id, p.amount, p.transaction_ref, p.payment_method,
                    p.payment_status, p.paid_at,
                    s.service_name, s.service_type,
                    d.dept_name,
                    r.request_id, r.status AS request_status
             FROM payment p
             JOIN service s ON p.service_id = s.service_id
             JOIN department d ON s.dept_id = d.dept_id
             LEFT JOIN service_request r ON p.request_id = r.request_id
             WHERE p.user_id = ",
        );
        query.push_bind(&user.0);
        if let Some(status) = status {
            query.push(" AND p.payment_status = ").push_bind(status.as_str());
        }
        query.push(" ORDER BY p.paid_at DESC");

        let rows = query.build().fetch_all(&self.pool).await?;
        rows.iter().map(receipt_from_row).collect()
    }
}

fn receipt_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<PaymentReceipt, RepositoryError> {
    let amount: String =
        row.try_get("amount").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let payment_status: String =
        row.try_get("payment_status").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let paid_at: Option<String> =
        row.try_get("paid_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let service_type: String =
        row.try_get("service_type").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let request_id: Option<i64> =
        row.try_get("request_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let request_status: Option<String> =
        row.try_get("request_status").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(PaymentReceipt {
        payment_id: PaymentId(
            row.try_get("payment_id").map_err(|e| RepositoryError::Decode(e.to_string()))?,
        ),
        amount: parse_decimal("amount", &amount)?,
        transaction_ref: row
            .try_get("transaction_ref")
            .map_err(|e| RepositoryError::Decode(e.to_string()))?,
        payment_method: row
            .try_get("payment_method")
            .map_err(|e| RepositoryError::Decode(e.to_string()))?,
        payment_status: PaymentStatus::parse(&payment_status)
            .ok_or_else(|| RepositoryError::Decode(format!("payment_status: `{payment_status}`")))?,
        paid_at: parse_opt_ts("paid_at", paid_at)?,
        service_name: row
            .try_get("service_name")
            .map_err(|e| RepositoryError::Decode(e.to_string()))?,
        service_type: ServiceType::parse(&service_type)
            .ok_or_else(|| RepositoryError::Decode(format!("service_type: `{service_type}`")))?,
        dept_name: row.try_get("dept_name").map_err(|e| RepositoryError::Decode(e.to_string()))?,
        request_id: request_id.map(RequestId),
        request_status: request_status
            .as_deref()
            .map(|status| {
                RequestStatus::parse(status)
                    .ok_or_else(|| RepositoryError::Decode(format!("request_status: `{status}`")))
            })
            .transpose()?,
    })
}
