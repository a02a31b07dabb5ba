use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::{QueryBuilder, Row};

use jansetu_core::domain::department::{Department, DepartmentId};
use jansetu_core::domain::service::{normalized_fee, Service, ServiceId, ServiceType};
use jansetu_core::errors::CatalogError;
use jansetu_core::idgen;

use super::{parse_decimal, parse_ts, RepositoryError, ServiceCatalog};
use crate::DbPool;

pub struct SqlCatalogRepository {
    pool: DbPool,
}

impl SqlCatalogRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[derive(Clone, Debug)]
pub struct NewDepartment {
    pub name: String,
    pub office_location: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct DepartmentUpdate {
    pub name: Option<String>,
    pub office_location: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
}

impl DepartmentUpdate {
    fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.office_location.is_none()
            && self.contact_email.is_none()
            && self.contact_phone.is_none()
    }
}

#[derive(Clone, Debug)]
pub struct NewService {
    pub name: String,
    pub service_type: ServiceType,
    pub description: Option<String>,
    pub fee: Option<Decimal>,
    pub processing_time_days: Option<u32>,
}

#[derive(Clone, Debug, Default)]
pub struct ServiceUpdate {
    pub name: Option<String>,
    pub service_type: Option<ServiceType>,
    pub description: Option<String>,
    pub fee: Option<Decimal>,
    pub processing_time_days: Option<u32>,
    pub active: Option<bool>,
}

impl ServiceUpdate {
    fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.service_type.is_none()
            && self.description.is_none()
            && self.fee.is_none()
            && self.processing_time_days.is_none()
            && self.active.is_none()
    }
}

fn department_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Department, RepositoryError> {
    let created_at: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    Ok(Department {
        id: DepartmentId(row.try_get("dept_id").map_err(|e| RepositoryError::Decode(e.to_string()))?),
        name: row.try_get("dept_name").map_err(|e| RepositoryError::Decode(e.to_string()))?,
        office_location: row
            .try_get("office_location")
            .map_err(|e| RepositoryError::Decode(e.to_string()))?,
        contact_email: row
            .try_get("contact_email")
            .map_err(|e| RepositoryError::Decode(e.to_string()))?,
        contact_phone: row
            .try_get("contact_phone")
            .map_err(|e| RepositoryError::Decode(e.to_string()))?,
        created_at: parse_ts("created_at", &created_at)?,
    })
}

fn service_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Service, RepositoryError> {
    let service_type: String =
        row.try_get("service_type").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let fee: String = row.try_get("fee").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let processing_time_days: i64 =
        row.try_get("processing_time_days").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let is_active: i64 =
        row.try_get("is_active").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(Service {
        id: ServiceId(row.try_get("service_id").map_err(|e| RepositoryError::Decode(e.to_string()))?),
        dept_id: DepartmentId(
            row.try_get("dept_id").map_err(|e| RepositoryError::Decode(e.to_string()))?,
        ),
        name: row.try_get("service_name").map_err(|e| RepositoryError::Decode(e.to_string()))?,
        service_type: ServiceType::parse(&service_type)
            .ok_or_else(|| RepositoryError::Decode(format!("service_type: `{service_type}`")))?,
        description: row
            .try_get("description")
            .map_err(|e| RepositoryError::Decode(e.to_string()))?,
        fee: parse_decimal("fee", &fee)?,
        processing_time_days: u32::try_from(processing_time_days)
            .map_err(|_| RepositoryError::Decode("processing_time_days out of range".to_string()))?,
        active: is_active != 0,
        created_at: parse_ts("created_at", &created_at)?,
    })
}

const SERVICE_COLUMNS: &str = "service_id, dept_id, service_name, service_type, description, \
                               fee, processing_time_days, is_active, created_at";

fn store_err(error: impl std::fmt::Display) -> CatalogError {
    CatalogError::Store(error.to_string())
}

impl SqlCatalogRepository {
    async fn department_exists(&self, id: &DepartmentId) -> Result<bool, CatalogError> {
        Ok(self.find_department(id).await?.is_some())
    }

    async fn service_in_department(
        &self,
        dept: &DepartmentId,
        id: &ServiceId,
    ) -> Result<Option<Service>, CatalogError> {
        let row = sqlx::query(&format!(
            "SELECT {SERVICE_COLUMNS} FROM service WHERE service_id = ? AND dept_id = ?"
        ))
        .bind(&id.0)
        .bind(&dept.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?;

        row.as_ref().map(service_from_row).transpose().map_err(store_err)
    }
}

#[async_trait::async_trait]
impl ServiceCatalog for SqlCatalogRepository {
    async fn find_department(
        &self,
        id: &DepartmentId,
    ) -> Result<Option<Department>, RepositoryError> {
        let row = sqlx::query(
            "SELECT dept_id, dept_name, office_location, contact_email, contact_phone, created_at
             FROM department WHERE dept_id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(department_from_row).transpose()
    }

    async fn list_departments(&self) -> Result<Vec<Department>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT dept_id, dept_name, office_location, contact_email, contact_phone, created_at
             FROM department ORDER BY dept_name ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(department_from_row).collect()
    }

    async fn find_service(&self, id: &ServiceId) -> Result<Option<Service>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {SERVICE_COLUMNS} FROM service WHERE service_id = ?"
        ))
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(service_from_row).transpose()
    }

    async fn list_services(
        &self,
        dept: &DepartmentId,
        only_active: Option<bool>,
    ) -> Result<Vec<Service>, CatalogError> {
        if !self.department_exists(dept).await? {
            return Err(CatalogError::DepartmentNotFound);
        }

        let mut query = QueryBuilder::new(format!(
            "SELECT {SERVICE_COLUMNS} FROM service WHERE dept_id = "
        ));
        query.push_bind(&dept.0);
        if let Some(active) = only_active {
            query.push(" AND is_active = ").push_bind(i64::from(active));
        }
        query.push(" ORDER BY service_name ASC");

        let rows = query.build().fetch_all(&self.pool).await.map_err(store_err)?;
        rows.iter().map(service_from_row).collect::<Result<Vec<_>, _>>().map_err(store_err)
    }

    async fn create_department(&self, new: NewDepartment) -> Result<DepartmentId, CatalogError> {
        let existing = sqlx::query("SELECT dept_id FROM department WHERE dept_name = ?")
            .bind(&new.name)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?;
        if existing.is_some() {
            return Err(CatalogError::DepartmentExists);
        }

        let dept_id = idgen::generate_department_id();
        sqlx::query(
            "INSERT INTO department (dept_id, dept_name, office_location, contact_email, contact_phone, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&dept_id)
        .bind(&new.name)
        .bind(&new.office_location)
        .bind(&new.contact_email)
        .bind(&new.contact_phone)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        Ok(DepartmentId(dept_id))
    }

    async fn update_department(
        &self,
        id: &DepartmentId,
        update: DepartmentUpdate,
    ) -> Result<(), CatalogError> {
        if update.is_empty() {
            return Err(CatalogError::NoFieldsToUpdate);
        }
        if !self.department_exists(id).await? {
            return Err(CatalogError::DepartmentNotFound);
        }

        let mut query = QueryBuilder::new("UPDATE department SET ");
        let mut fields = query.separated(", ");
        if let Some(name) = &update.name {
            fields.push("dept_name = ").push_bind_unseparated(name);
        }
        if let Some(office_location) = &update.office_location {
            fields.push("office_location = ").push_bind_unseparated(office_location);
        }
        if let Some(contact_email) = &update.contact_email {
            fields.push("contact_email = ").push_bind_unseparated(contact_email);
        }
        if let Some(contact_phone) = &update.contact_phone {
            fields.push("contact_phone = ").push_bind_unseparated(contact_phone);
        }
        query.push(" WHERE dept_id = ").push_bind(&id.0);

        query.build().execute(&self.pool).await.map_err(store_err)?;
        Ok(())
    }

    async fn delete_department(&self, id: &DepartmentId) -> Result<(), CatalogError> {
        if !self.department_exists(id).await? {
            return Err(CatalogError::DepartmentNotFound);
        }

        let services = sqlx::query("SELECT service_id FROM service WHERE dept_id = ? LIMIT 1")
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?;
        if services.is_some() {
            return Err(CatalogError::DepartmentHasServices);
        }

        sqlx::query("DELETE FROM department WHERE dept_id = ?")
            .bind(&id.0)
            .execute(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(())
    }

    async fn add_service(
        &self,
        dept: &DepartmentId,
        new: NewService,
    ) -> Result<ServiceId, CatalogError> {
        if !self.department_exists(dept).await? {
            return Err(CatalogError::DepartmentNotFound);
        }

        let existing =
            sqlx::query("SELECT service_id FROM service WHERE dept_id = ? AND service_name = ?")
                .bind(&dept.0)
                .bind(&new.name)
                .fetch_optional(&self.pool)
                .await
                .map_err(store_err)?;
        if existing.is_some() {
            return Err(CatalogError::ServiceExists);
        }

        let fee = normalized_fee(new.service_type, new.fee)?;
        let service_id = idgen::generate_service_id();
        sqlx::query(
            "INSERT INTO service (service_id, dept_id, service_name, service_type, description,
                                  fee, processing_time_days, is_active, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, 1, ?)",
        )
        .bind(&service_id)
        .bind(&dept.0)
        .bind(&new.name)
        .bind(new.service_type.as_str())
        .bind(&new.description)
        .bind(fee.to_string())
        .bind(i64::from(new.processing_time_days.unwrap_or(7)))
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        Ok(ServiceId(service_id))
    }

    async fn update_service(
        &self,
        dept: &DepartmentId,
        id: &ServiceId,
        update: ServiceUpdate,
    ) -> Result<(), CatalogError> {
        if update.is_empty() {
            return Err(CatalogError::NoFieldsToUpdate);
        }
        let current =
            self.service_in_department(dept, id).await?.ok_or(CatalogError::ServiceNotFound)?;

        // Hold the fee invariant across partial updates.
        let next_type = update.service_type.unwrap_or(current.service_type);
        let next_fee = update.fee.or(Some(current.fee));
        let fee = normalized_fee(next_type, next_fee)?;

        let mut query = QueryBuilder::new("UPDATE service SET ");
        let mut fields = query.separated(", ");
        if let Some(name) = &update.name {
            fields.push("service_name = ").push_bind_unseparated(name);
        }
        fields.push("service_type = ").push_bind_unseparated(next_type.as_str());
        fields.push("fee = ").push_bind_unseparated(fee.to_string());
        if let Some(description) = &update.description {
            fields.push("description = ").push_bind_unseparated(description);
        }
        if let Some(days) = update.processing_time_days {
            fields.push("processing_time_days = ").push_bind_unseparated(i64::from(days));
        }
        if let Some(active) = update.active {
            fields.push("is_active = ").push_bind_unseparated(i64::from(active));
        }
        query.push(" WHERE service_id = ").push_bind(&id.0);

        query.build().execute(&self.pool).await.map_err(store_err)?;
        Ok(())
    }

    async fn toggle_service(
        &self,
        dept: &DepartmentId,
        id: &ServiceId,
    ) -> Result<bool, CatalogError> {
        let current =
            self.service_in_department(dept, id).await?.ok_or(CatalogError::ServiceNotFound)?;
        let next = !current.active;

        sqlx::query("UPDATE service SET is_active = ? WHERE service_id = ?")
            .bind(i64::from(next))
            .bind(&id.0)
            .execute(&self.pool)
            .await
            .map_err(store_err)?;

        Ok(next)
    }

    async fn remove_service(
        &self,
        dept: &DepartmentId,
        id: &ServiceId,
    ) -> Result<(), CatalogError> {
        if self.service_in_department(dept, id).await?.is_none() {
            return Err(CatalogError::ServiceNotFound);
        }

        let requests =
            sqlx::query("SELECT request_id FROM service_request WHERE service_id = ? LIMIT 1")
                .bind(&id.0)
                .fetch_optional(&self.pool)
                .await
                .map_err(store_err)?;
        if requests.is_some() {
            return Err(CatalogError::ServiceHasRequests);
        }

        let payments = sqlx::query("SELECT payment_id FROM payment WHERE service_id = ? LIMIT 1")
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?;
        if payments.is_some() {
            return Err(CatalogError::ServiceHasPayments);
        }

        sqlx::query("DELETE FROM service WHERE service_id = ?")
            .bind(&id.0)
            .execute(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(())
    }
}

impl From<RepositoryError> for CatalogError {
    fn from(error: RepositoryError) -> Self {
        CatalogError::Store(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use jansetu_core::domain::department::DepartmentId;
    use jansetu_core::domain::service::{ServiceId, ServiceType};
    use jansetu_core::errors::CatalogError;

    use super::{DepartmentUpdate, NewDepartment, NewService, SqlCatalogRepository};
    use crate::repositories::ServiceCatalog;
    use crate::{connect_with_settings, migrations};

    async fn setup() -> SqlCatalogRepository {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        SqlCatalogRepository::new(pool)
    }

    fn new_department(name: &str) -> NewDepartment {
        NewDepartment {
            name: name.to_string(),
            office_location: Some("Collectorate Complex".to_string()),
            contact_email: None,
            contact_phone: None,
        }
    }

    fn payable_service(name: &str, fee: i64) -> NewService {
        NewService {
            name: name.to_string(),
            service_type: ServiceType::Payable,
            description: None,
            fee: Some(Decimal::new(fee, 0)),
            processing_time_days: Some(10),
        }
    }

    #[tokio::test]
    async fn create_and_list_departments_sorted_by_name() {
        let repo = setup().await;
        repo.create_department(new_department("Transport Department")).await.expect("create");
        repo.create_department(new_department("Revenue Department")).await.expect("create");

        let departments = repo.list_departments().await.expect("list");
        let names: Vec<&str> = departments.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["Revenue Department", "Transport Department"]);
    }

    #[tokio::test]
    async fn duplicate_department_name_is_a_conflict() {
        let repo = setup().await;
        repo.create_department(new_department("Revenue Department")).await.expect("create");
        let error = repo
            .create_department(new_department("Revenue Department"))
            .await
            .expect_err("duplicate");
        assert_eq!(error, CatalogError::DepartmentExists);
    }

    #[tokio::test]
    async fn add_service_enforces_fee_invariant() {
        let repo = setup().await;
        let dept = repo.create_department(new_department("Transport Department")).await.expect("create");

        let mut free_payable = payable_service("Driving Licence Renewal", 500);
        free_payable.fee = Some(Decimal::ZERO);
        let error = repo.add_service(&dept, free_payable).await.expect_err("zero fee");
        assert_eq!(error, CatalogError::InvalidFee);

        let service_id =
            repo.add_service(&dept, payable_service("Driving Licence Renewal", 500)).await.expect("add");
        let service = repo.find_service(&service_id).await.expect("find").expect("exists");
        assert_eq!(service.fee, Decimal::new(500, 0));
        assert!(service.active);
    }

    #[tokio::test]
    async fn non_payable_services_store_zero_fee() {
        let repo = setup().await;
        let dept = repo.create_department(new_department("Revenue Department")).await.expect("create");
        let service_id = repo
            .add_service(
                &dept,
                NewService {
                    name: "Income Certificate".to_string(),
                    service_type: ServiceType::NonPayable,
                    description: None,
                    fee: Some(Decimal::new(250, 0)),
                    processing_time_days: None,
                },
            )
            .await
            .expect("add");

        let service = repo.find_service(&service_id).await.expect("find").expect("exists");
        assert_eq!(service.fee, Decimal::ZERO);
        assert_eq!(service.processing_time_days, 7);
    }

    #[tokio::test]
    async fn list_services_filters_inactive_when_asked() {
        let repo = setup().await;
        let dept = repo.create_department(new_department("Transport Department")).await.expect("create");
        let keep = repo.add_service(&dept, payable_service("Driving Licence Renewal", 500)).await.expect("add");
        let toggled = repo.add_service(&dept, payable_service("Vehicle Registration", 900)).await.expect("add");
        repo.toggle_service(&dept, &toggled).await.expect("toggle off");

        let all = repo.list_services(&dept, None).await.expect("list all");
        assert_eq!(all.len(), 2);

        let active = repo.list_services(&dept, Some(true)).await.expect("list active");
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, keep);
    }

    #[tokio::test]
    async fn toggle_flips_and_reports_the_new_state() {
        let repo = setup().await;
        let dept = repo.create_department(new_department("Transport Department")).await.expect("create");
        let service = repo.add_service(&dept, payable_service("Driving Licence Renewal", 500)).await.expect("add");

        assert!(!repo.toggle_service(&dept, &service).await.expect("toggle"));
        assert!(repo.toggle_service(&dept, &service).await.expect("toggle"));
    }

    #[tokio::test]
    async fn department_with_services_cannot_be_deleted() {
        let repo = setup().await;
        let dept = repo.create_department(new_department("Transport Department")).await.expect("create");
        repo.add_service(&dept, payable_service("Driving Licence Renewal", 500)).await.expect("add");

        let error = repo.delete_department(&dept).await.expect_err("has services");
        assert_eq!(error, CatalogError::DepartmentHasServices);

        let service_id = repo.list_services(&dept, None).await.expect("list")[0].id.clone();
        repo.remove_service(&dept, &service_id).await.expect("remove service");
        repo.delete_department(&dept).await.expect("delete");
    }

    #[tokio::test]
    async fn empty_update_is_rejected() {
        let repo = setup().await;
        let dept = repo.create_department(new_department("Transport Department")).await.expect("create");
        let error =
            repo.update_department(&dept, DepartmentUpdate::default()).await.expect_err("empty");
        assert_eq!(error, CatalogError::NoFieldsToUpdate);
    }

    #[tokio::test]
    async fn unknown_department_and_service_yield_not_found() {
        let repo = setup().await;
        let missing_dept = DepartmentId("DEPT_FFFFFFFF".to_string());
        assert_eq!(
            repo.list_services(&missing_dept, None).await.expect_err("missing dept"),
            CatalogError::DepartmentNotFound
        );

        let dept = repo.create_department(new_department("Transport Department")).await.expect("create");
        assert_eq!(
            repo.toggle_service(&dept, &ServiceId("SERV_FFFFFF".to_string()))
                .await
                .expect_err("missing service"),
            CatalogError::ServiceNotFound
        );
    }
}
