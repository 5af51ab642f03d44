//! Request and response bodies for the REST API.

pub mod bill;
pub mod property;
pub mod reading;

use crate::billing::{DecimalLimits, CURRENCY, METER_READING};
use rust_decimal::Decimal;
use std::borrow::Cow;
use validator::ValidationError;

pub use bill::{GenerateBillsRequest, ListBillsQuery, ListBillsResponse};
pub use property::{
    CreatePropertyRequest, OccupancyRequest, PropertyResponse, UnitEntryRequest, UnitGroupRequest,
    UnitsQuery, UpdatePropertyRequest,
};
pub use reading::{ListReadingsQuery, RecordReadingRequest};

fn invalid(code: &'static str, message: String) -> ValidationError {
    ValidationError::new(code).with_message(Cow::Owned(message))
}

fn within(limits: DecimalLimits, value: &Decimal) -> Result<(), ValidationError> {
    limits
        .check("value", *value)
        .map_err(|e| invalid("out_of_range", e.to_string()))
}

/// Non-negative money with at most two decimal places.
pub(crate) fn currency(value: &Decimal) -> Result<(), ValidationError> {
    within(CURRENCY, value)
}

pub(crate) fn meter_reading(value: &Decimal) -> Result<(), ValidationError> {
    within(METER_READING, value)
}

pub(crate) fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(invalid("required", "must not be blank".to_string()));
    }
    Ok(())
}
