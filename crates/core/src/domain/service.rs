use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::department::DepartmentId;
use crate::errors::CatalogError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServiceId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceType {
    Payable,
    NonPayable,
}

impl ServiceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Payable => "Payable",
            Self::NonPayable => "NonPayable",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Payable" => Some(Self::Payable),
            "NonPayable" => Some(Self::NonPayable),
            _ => None,
        }
    }
}

/// A government offering exposed under a department. Inactive services
/// reject new requests; a payable service always carries a positive fee.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub id: ServiceId,
    pub dept_id: DepartmentId,
    pub name: String,
    pub service_type: ServiceType,
    pub description: Option<String>,
    pub fee: Decimal,
    pub processing_time_days: u32,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl Service {
    pub fn requires_payment(&self) -> bool {
        matches!(self.service_type, ServiceType::Payable)
    }
}

/// Resolve the fee a service row is stored with. Payable services must
/// declare a positive fee; non-payable services always store zero.
pub fn normalized_fee(
    service_type: ServiceType,
    fee: Option<Decimal>,
) -> Result<Decimal, CatalogError> {
    match service_type {
        ServiceType::Payable => match fee {
            Some(fee) if fee > Decimal::ZERO => Ok(fee),
            _ => Err(CatalogError::InvalidFee),
        },
        ServiceType::NonPayable => Ok(Decimal::ZERO),
    }
}
