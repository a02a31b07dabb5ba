use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AdminId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdminRole {
    Admin,
    SuperAdmin,
    DepartmentAdmin,
}

impl AdminRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::SuperAdmin => "super_admin",
            Self::DepartmentAdmin => "department_admin",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "admin" => Some(Self::Admin),
            "super_admin" => Some(Self::SuperAdmin),
            "department_admin" => Some(Self::DepartmentAdmin),
            _ => None,
        }
    }
}

/// Citizen profile. Credentials never leave the store layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub full_name: String,
    pub email: Option<String>,
    pub mobile: Option<String>,
    pub language_preference: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Admin {
    pub id: AdminId,
    pub name: String,
    pub email: String,
    pub mobile: Option<String>,
    pub role: AdminRole,
    pub created_at: DateTime<Utc>,
}

/// The identity a bearer token resolves to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthPrincipal {
    User(UserId),
    Admin { id: AdminId, role: AdminRole },
}

#[cfg(test)]
mod tests {
    use super::AdminRole;

    #[test]
    fn admin_role_round_trips_through_str() {
        for role in [AdminRole::Admin, AdminRole::SuperAdmin, AdminRole::DepartmentAdmin] {
            assert_eq!(AdminRole::parse(role.as_str()), Some(role));
        }
        assert_eq!(AdminRole::parse("root"), None);
    }
}
