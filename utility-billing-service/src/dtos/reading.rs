use super::{invalid, meter_reading};
use crate::models::{ListReadingsFilter, RecordReading, UtilityKind};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;
use validator::{Validate, ValidationError};

#[derive(Debug, Deserialize, Validate)]
pub struct RecordReadingRequest {
    pub unit_id: Uuid,

    #[validate(custom(function = "meterable"))]
    pub utility: UtilityKind,

    #[validate(custom(function = "meter_reading"))]
    pub reading: Decimal,

    /// Defaults to the time the request is handled.
    pub recorded_utc: Option<DateTime<Utc>>,
}

fn meterable(utility: &UtilityKind) -> Result<(), ValidationError> {
    if !utility.is_meterable() {
        return Err(invalid(
            "meterable",
            format!("{} is not metered", utility),
        ));
    }
    Ok(())
}

impl RecordReadingRequest {
    pub fn into_command(self) -> RecordReading {
        RecordReading {
            unit_id: self.unit_id,
            utility: self.utility,
            reading: self.reading,
            recorded_utc: self.recorded_utc.unwrap_or_else(Utc::now),
        }
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct ListReadingsQuery {
    pub utility: Option<UtilityKind>,

    #[validate(range(min = 1, max = 500))]
    pub limit: Option<i64>,
}

impl From<ListReadingsQuery> for ListReadingsFilter {
    fn from(query: ListReadingsQuery) -> Self {
        ListReadingsFilter {
            utility: query.utility,
            limit: query.limit,
        }
    }
}
