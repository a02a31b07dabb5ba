use thiserror::Error;

use crate::domain::request::RequestStatus;

/// Stable classification every failure maps to at the interface boundary.
/// `NotFound` covers both absent entities and entities not owned by the
/// caller; the two cases are indistinguishable on purpose.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Validation,
    Conflict,
    Unauthenticated,
    Forbidden,
    Unavailable,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Validation => "validation",
            Self::Conflict => "conflict",
            Self::Unauthenticated => "unauthenticated",
            Self::Forbidden => "forbidden",
            Self::Unavailable => "unavailable",
            Self::Internal => "internal",
        }
    }
}

/// Failures raised by the request lifecycle engine.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("service not found")]
    ServiceNotFound,
    #[error("this service is currently unavailable")]
    ServiceInactive,
    #[error("a payment transaction reference is required for payable services")]
    PaymentRequired,
    #[error("payment not found")]
    PaymentNotFound,
    #[error("payment was not successful")]
    PaymentNotSuccessful,
    #[error("payment is for a different service")]
    PaymentServiceMismatch,
    #[error("payment is already linked to another request")]
    PaymentAlreadyLinked,
    #[error("request not found")]
    RequestNotFound,
    #[error("admin not found")]
    AdminNotFound,
    #[error("request already has status {}", .0.as_str())]
    NoOpTransition(RequestStatus),
    #[error("invalid status `{0}`")]
    InvalidStatus(String),
    #[error("only pending requests can be cancelled")]
    NotCancellable,
    #[error("invalid super-admin code")]
    Forbidden,
    #[error("storage failure: {0}")]
    Store(String),
}

impl LifecycleError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ServiceNotFound
            | Self::PaymentNotFound
            | Self::RequestNotFound
            | Self::AdminNotFound => ErrorKind::NotFound,
            Self::PaymentRequired
            | Self::PaymentNotSuccessful
            | Self::PaymentServiceMismatch
            | Self::InvalidStatus(_)
            | Self::NotCancellable => ErrorKind::Validation,
            Self::PaymentAlreadyLinked | Self::NoOpTransition(_) => ErrorKind::Conflict,
            Self::Forbidden => ErrorKind::Forbidden,
            Self::ServiceInactive => ErrorKind::Unavailable,
            Self::Store(_) => ErrorKind::Internal,
        }
    }
}

/// Failures raised by department/service catalog management.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("department not found")]
    DepartmentNotFound,
    #[error("department already exists")]
    DepartmentExists,
    #[error("cannot delete a department with existing services")]
    DepartmentHasServices,
    #[error("service not found in this department")]
    ServiceNotFound,
    #[error("service already exists in this department")]
    ServiceExists,
    #[error("cannot delete a service with existing requests; deactivate instead")]
    ServiceHasRequests,
    #[error("cannot delete a service with existing payments; deactivate instead")]
    ServiceHasPayments,
    #[error("invalid service type `{0}`")]
    InvalidServiceType(String),
    #[error("a positive fee is required for payable services")]
    InvalidFee,
    #[error("no fields to update")]
    NoFieldsToUpdate,
    #[error("storage failure: {0}")]
    Store(String),
}

impl CatalogError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DepartmentNotFound | Self::ServiceNotFound => ErrorKind::NotFound,
            Self::DepartmentExists | Self::ServiceExists => ErrorKind::Conflict,
            Self::DepartmentHasServices
            | Self::ServiceHasRequests
            | Self::ServiceHasPayments
            | Self::InvalidServiceType(_)
            | Self::InvalidFee
            | Self::NoFieldsToUpdate => ErrorKind::Validation,
            Self::Store(_) => ErrorKind::Internal,
        }
    }
}

/// Failures raised by registration, login, token resolution, and profile
/// maintenance. Unknown identifiers and wrong passwords collapse into
/// `InvalidCredentials` so login never reveals whether an account exists.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum IdentityError {
    #[error("required fields missing")]
    MissingCredentials,
    #[error("invalid email format")]
    InvalidEmail,
    #[error("mobile number must be exactly 10 digits")]
    InvalidMobile,
    #[error("password must be at least 8 characters")]
    WeakPassword,
    #[error("invalid role `{0}`")]
    InvalidRole(String),
    #[error("email already in use")]
    DuplicateEmail,
    #[error("mobile number already in use")]
    DuplicateMobile,
    #[error("aadhaar already registered")]
    DuplicateAadhaar,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("authentication required")]
    Unauthenticated,
    #[error("this token cannot access the requested resource")]
    Unauthorized,
    #[error("user not found")]
    UserNotFound,
    #[error("admin not found")]
    AdminNotFound,
    #[error("no fields to update")]
    NoFieldsToUpdate,
    #[error("storage failure: {0}")]
    Store(String),
}

impl IdentityError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingCredentials
            | Self::InvalidEmail
            | Self::InvalidMobile
            | Self::WeakPassword
            | Self::InvalidRole(_)
            | Self::NoFieldsToUpdate => ErrorKind::Validation,
            Self::DuplicateEmail | Self::DuplicateMobile | Self::DuplicateAadhaar => {
                ErrorKind::Conflict
            }
            Self::InvalidCredentials | Self::Unauthenticated => ErrorKind::Unauthenticated,
            Self::Unauthorized => ErrorKind::Forbidden,
            Self::UserNotFound | Self::AdminNotFound => ErrorKind::NotFound,
            Self::Store(_) => ErrorKind::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::request::RequestStatus;

    use super::{CatalogError, ErrorKind, IdentityError, LifecycleError};

    #[test]
    fn lifecycle_not_found_variants_share_one_signal() {
        for error in [
            LifecycleError::ServiceNotFound,
            LifecycleError::PaymentNotFound,
            LifecycleError::RequestNotFound,
            LifecycleError::AdminNotFound,
        ] {
            assert_eq!(error.kind(), ErrorKind::NotFound);
        }
    }

    #[test]
    fn duplicate_linkage_and_noop_transitions_are_conflicts() {
        assert_eq!(LifecycleError::PaymentAlreadyLinked.kind(), ErrorKind::Conflict);
        assert_eq!(
            LifecycleError::NoOpTransition(RequestStatus::Completed).kind(),
            ErrorKind::Conflict
        );
    }

    #[test]
    fn inactive_service_maps_to_unavailable() {
        assert_eq!(LifecycleError::ServiceInactive.kind(), ErrorKind::Unavailable);
    }

    #[test]
    fn store_failures_map_to_internal() {
        assert_eq!(LifecycleError::Store("lock timeout".to_string()).kind(), ErrorKind::Internal);
        assert_eq!(CatalogError::Store("lock timeout".to_string()).kind(), ErrorKind::Internal);
        assert_eq!(IdentityError::Store("lock timeout".to_string()).kind(), ErrorKind::Internal);
    }

    #[test]
    fn login_failures_never_reveal_account_existence() {
        assert_eq!(IdentityError::InvalidCredentials.kind(), ErrorKind::Unauthenticated);
    }

    #[test]
    fn messages_stay_user_safe() {
        assert_eq!(LifecycleError::RequestNotFound.to_string(), "request not found");
        assert_eq!(
            LifecycleError::NoOpTransition(RequestStatus::Pending).to_string(),
            "request already has status Pending"
        );
        assert_eq!(
            CatalogError::InvalidFee.to_string(),
            "a positive fee is required for payable services"
        );
    }
}
