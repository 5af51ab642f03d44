//! Utility bill computation.
//!
//! Everything here is a pure function of its inputs: no I/O, no state kept
//! between calls. The orchestration that loads inputs and persists bills
//! lives in [`crate::services::generator`].

mod charges;
mod error;
mod generate;
pub mod limits;

pub use charges::{
    compute_service_charge, compute_utility_charge, validate_service_rate, validate_utilities,
};
pub use error::{BillingError, UnitFailure};
pub use generate::{compute_bill, generate_bills_for_period};
pub use limits::{DecimalLimits, CURRENCY, METER_READING, RATE};
