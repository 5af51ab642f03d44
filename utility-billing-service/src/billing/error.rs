use crate::models::{BillingPeriod, UtilityKind};
use service_core::error::AppError;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum BillingError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unit {unit_id} has no {utility} meter reading pair for {period}")]
    MissingReading {
        unit_id: Uuid,
        utility: UtilityKind,
        period: BillingPeriod,
    },

    #[error("Unit {unit_id} already has a bill for {period}")]
    DuplicatePeriod { unit_id: Uuid, period: BillingPeriod },

    #[error("Bill generation failed for {} unit(s)", .0.len())]
    Batch(Vec<UnitFailure>),

    #[error("Property {0} not found")]
    PropertyNotFound(Uuid),

    #[error("Unit {0} not found")]
    UnitNotFound(Uuid),

    #[error("Bill {0} not found")]
    BillNotFound(Uuid),

    #[error("Bill {0} is already paid")]
    AlreadyPaid(Uuid),

    #[error(transparent)]
    Store(#[from] AppError),
}

/// One unit that could not be billed, and why.
#[derive(Debug)]
pub struct UnitFailure {
    pub unit_id: Uuid,
    pub error: BillingError,
}

impl fmt::Display for UnitFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unit {}: {}", self.unit_id, self.error)
    }
}

impl BillingError {
    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            BillingError::InvalidInput(_) => "invalid_input",
            BillingError::MissingReading { .. } => "missing_reading",
            BillingError::DuplicatePeriod { .. } => "duplicate_period",
            BillingError::Batch(_) => "batch",
            BillingError::PropertyNotFound(_)
            | BillingError::UnitNotFound(_)
            | BillingError::BillNotFound(_) => "not_found",
            BillingError::AlreadyPaid(_) => "already_paid",
            BillingError::Store(_) => "store",
        }
    }

    /// Failing units carried by a batch error; empty otherwise.
    pub fn failures(&self) -> &[UnitFailure] {
        match self {
            BillingError::Batch(failures) => failures,
            _ => &[],
        }
    }
}

impl From<BillingError> for AppError {
    fn from(err: BillingError) -> Self {
        match err {
            BillingError::InvalidInput(_) | BillingError::MissingReading { .. } => {
                AppError::BadRequest(anyhow::anyhow!(err.to_string()))
            }
            BillingError::Batch(ref failures) => AppError::Rejected(
                err.to_string(),
                failures.iter().map(|f| f.to_string()).collect(),
            ),
            BillingError::DuplicatePeriod { .. } | BillingError::AlreadyPaid(_) => {
                AppError::Conflict(anyhow::anyhow!(err.to_string()))
            }
            BillingError::PropertyNotFound(_)
            | BillingError::UnitNotFound(_)
            | BillingError::BillNotFound(_) => AppError::NotFound(anyhow::anyhow!(err.to_string())),
            BillingError::Store(inner) => inner,
        }
    }
}
