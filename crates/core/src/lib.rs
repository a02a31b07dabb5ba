pub mod config;
pub mod credentials;
pub mod domain;
pub mod errors;
pub mod idgen;
pub mod reporting;
pub mod validation;

pub use domain::department::{Department, DepartmentId};
pub use domain::document::{Document, DocumentStatus};
pub use domain::history::{verify_chain, ChainViolation, StatusHistoryEntry};
pub use domain::identity::{Admin, AdminId, AdminRole, AuthPrincipal, User, UserId};
pub use domain::payment::{Payment, PaymentId, PaymentStatus};
pub use domain::request::{RequestId, RequestKind, RequestStatus, ServiceRequest};
pub use domain::service::{normalized_fee, Service, ServiceId, ServiceType};
pub use errors::{CatalogError, ErrorKind, IdentityError, LifecycleError};
pub use reporting::{
    group_by_department, DepartmentGroup, DepartmentStats, PaymentReceipt, RequestFilter,
    RequestSummary, ServiceStats,
};
