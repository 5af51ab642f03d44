//! Meter reading model.

use crate::models::UtilityKind;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A cumulative meter reading taken for a unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeterReading {
    pub reading_id: Uuid,
    pub unit_id: Uuid,
    pub utility: UtilityKind,
    pub reading: Decimal,
    pub recorded_utc: DateTime<Utc>,
    pub created_utc: DateTime<Utc>,
}

/// Input for recording a meter reading.
#[derive(Debug, Clone)]
pub struct RecordReading {
    pub unit_id: Uuid,
    pub utility: UtilityKind,
    pub reading: Decimal,
    pub recorded_utc: DateTime<Utc>,
}

/// Filter parameters for listing readings.
#[derive(Debug, Clone, Default)]
pub struct ListReadingsFilter {
    pub utility: Option<UtilityKind>,
    pub limit: Option<i64>,
}
