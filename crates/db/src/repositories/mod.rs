use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use jansetu_core::domain::department::{Department, DepartmentId};
use jansetu_core::domain::document::Document;
use jansetu_core::domain::identity::{Admin, AdminId, AuthPrincipal, User, UserId};
use jansetu_core::domain::payment::{Payment, PaymentStatus};
use jansetu_core::domain::request::RequestId;
use jansetu_core::domain::service::{Service, ServiceId};
use jansetu_core::errors::{CatalogError, IdentityError};
use jansetu_core::reporting::PaymentReceipt;

pub mod catalog;
pub mod documents;
pub mod identity;
pub mod payments;

pub use catalog::{
    DepartmentUpdate, NewDepartment, NewService, ServiceUpdate, SqlCatalogRepository,
};
pub use documents::{NewDocument, SqlDocumentStore};
pub use identity::{
    AdminLogin, CreatedAdmin, IssuedSession, NewAdmin, NewUser, ProfileUpdate, SqlIdentityStore,
    UserLogin,
};
pub use payments::SqlPaymentLedger;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

/// Departments and services, as consumed by the lifecycle engine and the
/// catalog management endpoints.
#[async_trait]
pub trait ServiceCatalog: Send + Sync {
    async fn find_department(&self, id: &DepartmentId)
        -> Result<Option<Department>, RepositoryError>;
    async fn list_departments(&self) -> Result<Vec<Department>, RepositoryError>;
    async fn find_service(&self, id: &ServiceId) -> Result<Option<Service>, RepositoryError>;
    async fn list_services(
        &self,
        dept: &DepartmentId,
        only_active: Option<bool>,
    ) -> Result<Vec<Service>, CatalogError>;

    async fn create_department(&self, new: NewDepartment) -> Result<DepartmentId, CatalogError>;
    async fn update_department(
        &self,
        id: &DepartmentId,
        update: DepartmentUpdate,
    ) -> Result<(), CatalogError>;
    async fn delete_department(&self, id: &DepartmentId) -> Result<(), CatalogError>;

    async fn add_service(
        &self,
        dept: &DepartmentId,
        new: NewService,
    ) -> Result<ServiceId, CatalogError>;
    async fn update_service(
        &self,
        dept: &DepartmentId,
        id: &ServiceId,
        update: ServiceUpdate,
    ) -> Result<(), CatalogError>;
    /// Flips the active flag and returns the new value.
    async fn toggle_service(&self, dept: &DepartmentId, id: &ServiceId)
        -> Result<bool, CatalogError>;
    async fn remove_service(&self, dept: &DepartmentId, id: &ServiceId)
        -> Result<(), CatalogError>;
}

/// Accounts, sessions, and profile maintenance.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn register_user(&self, new_user: NewUser) -> Result<UserId, IdentityError>;
    async fn login_user(&self, login: UserLogin) -> Result<IssuedSession, IdentityError>;
    async fn login_admin(&self, login: AdminLogin) -> Result<IssuedSession, IdentityError>;
    /// Resolve a bearer token to its principal. Missing, unknown, and
    /// expired tokens are indistinguishable to the caller.
    async fn authenticate(&self, token: &str) -> Result<AuthPrincipal, IdentityError>;
    async fn find_user(&self, id: &UserId) -> Result<Option<User>, RepositoryError>;
    async fn find_admin(&self, id: &AdminId) -> Result<Option<Admin>, RepositoryError>;
    async fn update_profile(&self, id: &UserId, update: ProfileUpdate)
        -> Result<(), IdentityError>;
    async fn change_password(
        &self,
        id: &UserId,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), IdentityError>;
    async fn create_admin(&self, new_admin: NewAdmin) -> Result<CreatedAdmin, IdentityError>;
}

/// Read side of the payment ledger. Linking a payment to a request is a
/// lifecycle-engine write and happens inside the engine's transaction.
#[async_trait]
pub trait PaymentLedger: Send + Sync {
    async fn find_payment(
        &self,
        transaction_ref: &str,
        user: &UserId,
    ) -> Result<Option<Payment>, RepositoryError>;
    async fn list_for_request(&self, request: RequestId)
        -> Result<Vec<Payment>, RepositoryError>;
    async fn list_receipts(
        &self,
        user: &UserId,
        status: Option<PaymentStatus>,
    ) -> Result<Vec<PaymentReceipt>, RepositoryError>;
}

/// Document upload bookkeeping; file bytes live elsewhere.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn add(&self, new: NewDocument) -> Result<i64, RepositoryError>;
    async fn list_for_user(&self, user: &UserId) -> Result<Vec<Document>, RepositoryError>;
    async fn list_for_request(&self, request: RequestId)
        -> Result<Vec<Document>, RepositoryError>;
    /// Returns false when the document does not exist or belongs to
    /// another user; the two cases are not distinguished.
    async fn delete(&self, id: i64, owner: &UserId) -> Result<bool, RepositoryError>;
}

pub(crate) fn parse_ts(column: &str, value: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Decode(format!("{column}: {e}")))
}

pub(crate) fn parse_opt_ts(
    column: &str,
    value: Option<String>,
) -> Result<Option<DateTime<Utc>>, RepositoryError> {
    value.as_deref().map(|v| parse_ts(column, v)).transpose()
}

pub(crate) fn parse_decimal(
    column: &str,
    value: &str,
) -> Result<rust_decimal::Decimal, RepositoryError> {
    value
        .parse::<rust_decimal::Decimal>()
        .map_err(|e| RepositoryError::Decode(format!("{column}: {e}")))
}
