//! Read-only reporting queries: filtered request listings and aggregate
//! statistics. Listings re-query the store on every call, so a consumer
//! can restart the sequence at any time.

use rust_decimal::Decimal;
use sqlx::{QueryBuilder, Row};

use jansetu_core::domain::department::DepartmentId;
use jansetu_core::domain::identity::UserId;
use jansetu_core::domain::request::{RequestId, RequestKind, RequestStatus};
use jansetu_core::domain::service::{ServiceId, ServiceType};
use jansetu_core::reporting::{DepartmentStats, RequestFilter, RequestSummary, ServiceStats};

use crate::repositories::{parse_decimal, parse_ts, RepositoryError};
use crate::DbPool;

pub struct ReportingRepository {
    pool: DbPool,
}

impl ReportingRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// List request summaries under a structured filter. The admin view
    /// sorts by department name ascending then creation time descending;
    /// a user-scoped view sorts by creation time descending only.
    pub async fn list_requests(
        &self,
        filter: &RequestFilter,
    ) -> Result<Vec<RequestSummary>, RepositoryError> {
        let mut query = QueryBuilder::new(
            "SELECT r.request_id, r.request_kind, r.description, r.status, r.created_at,
                    r.user_id, u.full_name AS user_name,
                    s.service_id, s.service_name,
                    d.dept_id, d.dept_name,
                    a.name AS assigned_to_name
             FROM service_request r
             JOIN user_account u ON r.user_id = u.user_id
             JOIN service s ON r.service_id = s.service_id
             JOIN department d ON s.dept_id = d.dept_id
             LEFT JOIN admin_account a ON r.assigned_to = a.admin_id
             WHERE 1 = 1",
        );

        if let Some(user) = &filter.user {
            query.push(" AND r.user_id = ").push_bind(&user.0);
        }
        if let Some(status) = filter.status {
            query.push(" AND r.status = ").push_bind(status.as_str());
        }
        if let Some(kind) = filter.kind {
            query.push(" AND r.request_kind = ").push_bind(kind.as_str());
        }
        if let Some(department) = &filter.department {
            query.push(" AND d.dept_id = ").push_bind(&department.0);
        }

        if filter.user.is_some() {
            query.push(" ORDER BY r.created_at DESC, r.request_id DESC");
        } else {
            query.push(" ORDER BY d.dept_name ASC, r.created_at DESC, r.request_id DESC");
        }

        let rows = query.build().fetch_all(&self.pool).await?;
        rows.iter().map(summary_from_row).collect()
    }

    pub async fn department_stats(
        &self,
        dept_id: &DepartmentId,
    ) -> Result<Option<DepartmentStats>, RepositoryError> {
        let row = sqlx::query(
            "SELECT d.dept_id, d.dept_name,
                    COUNT(DISTINCT s.service_id) AS total_services,
                    COUNT(DISTINCT r.request_id) AS total_requests,
                    COUNT(DISTINCT CASE WHEN r.status = 'Pending' THEN r.request_id END) AS pending_requests,
                    COUNT(DISTINCT CASE WHEN r.status = 'Completed' THEN r.request_id END) AS completed_requests
             FROM department d
             LEFT JOIN service s ON d.dept_id = s.dept_id
             LEFT JOIN service_request r ON s.service_id = r.service_id
             WHERE d.dept_id = ?
             GROUP BY d.dept_id",
        )
        .bind(&dept_id.0)
        .fetch_optional(&self.pool)
        .await?;

        let row = match row {
            Some(row) => row,
            None => return Ok(None),
        };

        Ok(Some(DepartmentStats {
            dept_id: DepartmentId(
                row.try_get("dept_id").map_err(|e| RepositoryError::Decode(e.to_string()))?,
            ),
            dept_name: row
                .try_get("dept_name")
                .map_err(|e| RepositoryError::Decode(e.to_string()))?,
            total_services: row
                .try_get("total_services")
                .map_err(|e| RepositoryError::Decode(e.to_string()))?,
            total_requests: row
                .try_get("total_requests")
                .map_err(|e| RepositoryError::Decode(e.to_string()))?,
            pending_requests: row
                .try_get("pending_requests")
                .map_err(|e| RepositoryError::Decode(e.to_string()))?,
            completed_requests: row
                .try_get("completed_requests")
                .map_err(|e| RepositoryError::Decode(e.to_string()))?,
        }))
    }

    pub async fn service_stats(
        &self,
        dept_id: &DepartmentId,
        service_id: &ServiceId,
    ) -> Result<Option<ServiceStats>, RepositoryError> {
        let row = sqlx::query(
            "SELECT s.service_id, s.service_name, s.service_type, s.fee,
                    COUNT(DISTINCT r.request_id) AS total_requests,
                    COUNT(DISTINCT CASE WHEN r.status = 'Pending' THEN r.request_id END) AS pending_requests,
                    COUNT(DISTINCT CASE WHEN r.status = 'Completed' THEN r.request_id END) AS completed_requests
             FROM service s
             LEFT JOIN service_request r ON s.service_id = r.service_id
             WHERE s.service_id = ? AND s.dept_id = ?
             GROUP BY s.service_id",
        )
        .bind(&service_id.0)
        .bind(&dept_id.0)
        .fetch_optional(&self.pool)
        .await?;

        let row = match row {
            Some(row) => row,
            None => return Ok(None),
        };

        let service_type: String =
            row.try_get("service_type").map_err(|e| RepositoryError::Decode(e.to_string()))?;
        let fee: String = row.try_get("fee").map_err(|e| RepositoryError::Decode(e.to_string()))?;

        // Revenue is summed in Rust so amounts never go through floats.
        let amounts: Vec<String> = sqlx::query_scalar(
            "SELECT amount FROM payment WHERE service_id = ? AND payment_status = 'Success'",
        )
        .bind(&service_id.0)
        .fetch_all(&self.pool)
        .await?;
        let total_payments = amounts.len() as i64;
        let mut total_revenue = Decimal::ZERO;
        for amount in &amounts {
            total_revenue += parse_decimal("amount", amount)?;
        }

        Ok(Some(ServiceStats {
            service_id: ServiceId(
                row.try_get("service_id").map_err(|e| RepositoryError::Decode(e.to_string()))?,
            ),
            service_name: row
                .try_get("service_name")
                .map_err(|e| RepositoryError::Decode(e.to_string()))?,
            service_type: ServiceType::parse(&service_type)
                .ok_or_else(|| RepositoryError::Decode(format!("service_type: `{service_type}`")))?,
            fee: parse_decimal("fee", &fee)?,
            total_requests: row
                .try_get("total_requests")
                .map_err(|e| RepositoryError::Decode(e.to_string()))?,
            pending_requests: row
                .try_get("pending_requests")
                .map_err(|e| RepositoryError::Decode(e.to_string()))?,
            completed_requests: row
                .try_get("completed_requests")
                .map_err(|e| RepositoryError::Decode(e.to_string()))?,
            total_payments,
            total_revenue,
        }))
    }
}

fn summary_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<RequestSummary, RepositoryError> {
    let kind: String =
        row.try_get("request_kind").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let status: String =
        row.try_get("status").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(RequestSummary {
        request_id: RequestId(
            row.try_get("request_id").map_err(|e| RepositoryError::Decode(e.to_string()))?,
        ),
        kind: RequestKind::parse(&kind)
            .ok_or_else(|| RepositoryError::Decode(format!("request_kind: `{kind}`")))?,
        description: row
            .try_get("description")
            .map_err(|e| RepositoryError::Decode(e.to_string()))?,
        status: RequestStatus::parse(&status)
            .ok_or_else(|| RepositoryError::Decode(format!("status: `{status}`")))?,
        created_at: parse_ts("created_at", &created_at)?,
        user_id: UserId(row.try_get("user_id").map_err(|e| RepositoryError::Decode(e.to_string()))?),
        user_name: row.try_get("user_name").map_err(|e| RepositoryError::Decode(e.to_string()))?,
        service_id: ServiceId(
            row.try_get("service_id").map_err(|e| RepositoryError::Decode(e.to_string()))?,
        ),
        service_name: row
            .try_get("service_name")
            .map_err(|e| RepositoryError::Decode(e.to_string()))?,
        dept_id: DepartmentId(
            row.try_get("dept_id").map_err(|e| RepositoryError::Decode(e.to_string()))?,
        ),
        dept_name: row.try_get("dept_name").map_err(|e| RepositoryError::Decode(e.to_string()))?,
        assigned_to_name: row
            .try_get("assigned_to_name")
            .map_err(|e| RepositoryError::Decode(e.to_string()))?,
    })
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;

    use jansetu_core::domain::department::DepartmentId;
    use jansetu_core::domain::identity::UserId;
    use jansetu_core::domain::request::{RequestKind, RequestStatus};
    use jansetu_core::domain::service::ServiceId;
    use jansetu_core::reporting::{group_by_department, RequestFilter};

    use super::ReportingRepository;
    use crate::fixtures::{self, SeedDataset};
    use crate::{connect_with_settings, migrations, DbPool};

    async fn setup() -> (ReportingRepository, DbPool) {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        SeedDataset::load(&pool).await.expect("seed");
        (ReportingRepository::new(pool.clone()), pool)
    }

    /// Insert a request row directly with a controlled creation time;
    /// the reporting layer never writes, so tests set state by hand.
    async fn insert_request(
        pool: &DbPool,
        user_id: &str,
        service_id: &str,
        kind: &str,
        status: &str,
        age_minutes: i64,
    ) -> i64 {
        let at = (Utc::now() - Duration::minutes(age_minutes)).to_rfc3339();
        let result = sqlx::query(
            "INSERT INTO service_request (user_id, service_id, request_kind, description,
                                          status, created_at, updated_at)
             VALUES (?, ?, ?, NULL, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(service_id)
        .bind(kind)
        .bind(status)
        .bind(&at)
        .bind(&at)
        .execute(pool)
        .await
        .expect("insert request");
        result.last_insert_rowid()
    }

    #[tokio::test]
    async fn user_view_lists_own_requests_newest_first() {
        let (reporting, pool) = setup().await;
        let oldest =
            insert_request(&pool, fixtures::USER_ASHA, fixtures::SERVICE_LICENCE, "Request", "Pending", 30).await;
        let newest =
            insert_request(&pool, fixtures::USER_ASHA, fixtures::SERVICE_CERTIFICATE, "Complaint", "Pending", 5).await;
        insert_request(&pool, fixtures::USER_VIKRAM, fixtures::SERVICE_LICENCE, "Request", "Pending", 1).await;

        let summaries = reporting
            .list_requests(&RequestFilter {
                user: Some(UserId(fixtures::USER_ASHA.to_string())),
                ..RequestFilter::default()
            })
            .await
            .expect("list");

        let ids: Vec<i64> = summaries.iter().map(|s| s.request_id.0).collect();
        assert_eq!(ids, vec![newest, oldest]);
    }

    #[tokio::test]
    async fn admin_view_sorts_by_department_then_recency() {
        let (reporting, pool) = setup().await;
        // Transport Department sorts after Revenue Department by name.
        let transport_old =
            insert_request(&pool, fixtures::USER_ASHA, fixtures::SERVICE_LICENCE, "Request", "Pending", 60).await;
        let transport_new =
            insert_request(&pool, fixtures::USER_VIKRAM, fixtures::SERVICE_REGISTRATION, "Request", "Pending", 10).await;
        let revenue =
            insert_request(&pool, fixtures::USER_ASHA, fixtures::SERVICE_CERTIFICATE, "Complaint", "Pending", 20).await;

        let summaries =
            reporting.list_requests(&RequestFilter::default()).await.expect("list");
        let ids: Vec<i64> = summaries.iter().map(|s| s.request_id.0).collect();
        assert_eq!(ids, vec![revenue, transport_new, transport_old]);

        let groups = group_by_department(summaries);
        let names: Vec<&str> = groups.iter().map(|g| g.dept_name.as_str()).collect();
        assert_eq!(names, vec!["Revenue Department", "Transport Department"]);
        assert_eq!(groups[1].requests.len(), 2);
    }

    #[tokio::test]
    async fn filters_compose_independently() {
        let (reporting, pool) = setup().await;
        insert_request(&pool, fixtures::USER_ASHA, fixtures::SERVICE_LICENCE, "Request", "Pending", 30).await;
        insert_request(&pool, fixtures::USER_ASHA, fixtures::SERVICE_LICENCE, "Complaint", "Completed", 20).await;
        insert_request(&pool, fixtures::USER_ASHA, fixtures::SERVICE_CERTIFICATE, "Request", "Pending", 10).await;

        let completed = reporting
            .list_requests(&RequestFilter {
                status: Some(RequestStatus::Completed),
                ..RequestFilter::default()
            })
            .await
            .expect("by status");
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].kind, RequestKind::Complaint);

        let complaints = reporting
            .list_requests(&RequestFilter {
                kind: Some(RequestKind::Complaint),
                ..RequestFilter::default()
            })
            .await
            .expect("by kind");
        assert_eq!(complaints.len(), 1);

        let transport = reporting
            .list_requests(&RequestFilter {
                department: Some(DepartmentId(fixtures::DEPT_TRANSPORT.to_string())),
                ..RequestFilter::default()
            })
            .await
            .expect("by department");
        assert_eq!(transport.len(), 2);

        let pending_transport_requests = reporting
            .list_requests(&RequestFilter {
                status: Some(RequestStatus::Pending),
                kind: Some(RequestKind::Request),
                department: Some(DepartmentId(fixtures::DEPT_TRANSPORT.to_string())),
                user: None,
            })
            .await
            .expect("combined");
        assert_eq!(pending_transport_requests.len(), 1);
    }

    #[tokio::test]
    async fn listing_restarts_from_the_store_on_each_call() {
        let (reporting, pool) = setup().await;
        insert_request(&pool, fixtures::USER_ASHA, fixtures::SERVICE_LICENCE, "Request", "Pending", 10).await;

        let first = reporting.list_requests(&RequestFilter::default()).await.expect("list");
        insert_request(&pool, fixtures::USER_ASHA, fixtures::SERVICE_LICENCE, "Request", "Pending", 1).await;
        let second = reporting.list_requests(&RequestFilter::default()).await.expect("list again");

        assert_eq!(first.len() + 1, second.len());
    }

    #[tokio::test]
    async fn department_stats_count_services_and_request_states() {
        let (reporting, pool) = setup().await;
        insert_request(&pool, fixtures::USER_ASHA, fixtures::SERVICE_LICENCE, "Request", "Pending", 30).await;
        insert_request(&pool, fixtures::USER_ASHA, fixtures::SERVICE_REGISTRATION, "Request", "Completed", 20).await;
        insert_request(&pool, fixtures::USER_VIKRAM, fixtures::SERVICE_LICENCE, "Request", "Rejected", 10).await;

        let stats = reporting
            .department_stats(&DepartmentId(fixtures::DEPT_TRANSPORT.to_string()))
            .await
            .expect("query")
            .expect("department exists");

        assert_eq!(stats.dept_name, "Transport Department");
        assert_eq!(stats.total_services, 3);
        assert_eq!(stats.total_requests, 3);
        assert_eq!(stats.pending_requests, 1);
        assert_eq!(stats.completed_requests, 1);

        assert!(reporting
            .department_stats(&DepartmentId("DEPT_FFFFFFFF".to_string()))
            .await
            .expect("query")
            .is_none());
    }

    #[tokio::test]
    async fn service_stats_sum_successful_revenue_only() {
        let (reporting, pool) = setup().await;
        insert_request(&pool, fixtures::USER_ASHA, fixtures::SERVICE_LICENCE, "Request", "Completed", 10).await;

        let stats = reporting
            .service_stats(
                &DepartmentId(fixtures::DEPT_TRANSPORT.to_string()),
                &ServiceId(fixtures::SERVICE_LICENCE.to_string()),
            )
            .await
            .expect("query")
            .expect("service exists");

        assert_eq!(stats.total_requests, 1);
        assert_eq!(stats.completed_requests, 1);
        // Two successful licence payments seeded (Asha's and Vikram's);
        // the failed one is excluded.
        assert_eq!(stats.total_payments, 2);
        assert_eq!(stats.total_revenue, Decimal::new(1000, 0));

        // Wrong department scoping reads as absent.
        assert!(reporting
            .service_stats(
                &DepartmentId(fixtures::DEPT_REVENUE.to_string()),
                &ServiceId(fixtures::SERVICE_LICENCE.to_string()),
            )
            .await
            .expect("query")
            .is_none());
    }
}
