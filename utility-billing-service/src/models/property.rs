//! Property and unit models.

use crate::billing::{BillingError, METER_READING};
use crate::models::{BillingPeriod, ServiceRate, UtilityConfig, UtilityKind};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Occupancy status of a rental unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitStatus {
    Vacant,
    Occupied,
}

impl UnitStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitStatus::Vacant => "vacant",
            UnitStatus::Occupied => "occupied",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "occupied" => UnitStatus::Occupied,
            _ => UnitStatus::Vacant,
        }
    }
}

/// A rental property and how it bills utilities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Property {
    pub property_id: Uuid,
    pub name: String,
    pub location: String,
    pub utilities: UtilityConfig,
    pub service_rate: ServiceRate,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

/// A single rentable unit within a property.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Unit {
    pub unit_id: Uuid,
    pub property_id: Uuid,
    pub unit_label: String,
    pub unit_type: String,
    pub rent: Decimal,
    pub deposit: Decimal,
    pub status: UnitStatus,
    pub tenant_name: Option<String>,
    pub occupied_since: Option<NaiveDate>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl Unit {
    /// Occupancy as of `period`. A tenancy that starts after the period
    /// ends does not count.
    pub fn status_for(&self, period: BillingPeriod) -> UnitStatus {
        match (self.status, self.occupied_since) {
            (UnitStatus::Occupied, Some(since)) if since > period.last_day() => UnitStatus::Vacant,
            (status, _) => status,
        }
    }

    /// Snapshot without meter readings; the reading store fills those in.
    pub fn snapshot(&self, period: BillingPeriod) -> UnitSnapshot {
        UnitSnapshot {
            unit_id: self.unit_id,
            unit_label: self.unit_label.clone(),
            tenant_name: self.tenant_name.clone(),
            rent: self.rent,
            status: self.status_for(period),
            water: ReadingWindow::default(),
            electricity: ReadingWindow::default(),
        }
    }
}

/// Input for creating a property together with its units.
#[derive(Debug, Clone)]
pub struct CreateProperty {
    pub name: String,
    pub location: String,
    pub utilities: UtilityConfig,
    pub service_rate: ServiceRate,
    pub units: Vec<CreateUnit>,
}

/// Input for one unit of a new property.
#[derive(Debug, Clone)]
pub struct CreateUnit {
    pub unit_label: String,
    pub unit_type: String,
    pub rent: Decimal,
    pub deposit: Decimal,
    pub status: UnitStatus,
    pub tenant_name: Option<String>,
    pub occupied_since: Option<NaiveDate>,
}

/// Replacement name, location and billing settings for a property.
/// Units are left untouched.
#[derive(Debug, Clone)]
pub struct UpdateProperty {
    pub name: String,
    pub location: String,
    pub utilities: UtilityConfig,
    pub service_rate: ServiceRate,
}

/// Occupancy change for a unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOccupancy {
    Occupy {
        tenant_name: String,
        since: NaiveDate,
    },
    Vacate,
}

/// Prior and current meter readings bracketing a billing period.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadingWindow {
    pub prior: Option<Decimal>,
    pub current: Option<Decimal>,
}

impl ReadingWindow {
    pub fn new(prior: Decimal, current: Decimal) -> Self {
        Self {
            prior: Some(prior),
            current: Some(current),
        }
    }

    /// Units consumed during the period.
    pub fn consumption(
        &self,
        unit_id: Uuid,
        utility: UtilityKind,
        period: BillingPeriod,
    ) -> Result<Decimal, BillingError> {
        let (Some(prior), Some(current)) = (self.prior, self.current) else {
            return Err(BillingError::MissingReading {
                unit_id,
                utility,
                period,
            });
        };

        for reading in [prior, current] {
            METER_READING.check(&format!("unit {}: {} reading", unit_id, utility), reading)?;
        }

        if current < prior {
            return Err(BillingError::InvalidInput(format!(
                "unit {}: current {} reading {} is below prior reading {}",
                unit_id, utility, current, prior
            )));
        }

        current.checked_sub(prior).ok_or_else(|| {
            BillingError::InvalidInput(format!(
                "unit {}: {} consumption overflows",
                unit_id, utility
            ))
        })
    }
}

/// Occupancy and metering facts for one unit as of a billing period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitSnapshot {
    pub unit_id: Uuid,
    pub unit_label: String,
    pub tenant_name: Option<String>,
    pub rent: Decimal,
    pub status: UnitStatus,
    pub water: ReadingWindow,
    pub electricity: ReadingWindow,
}

impl UnitSnapshot {
    pub fn readings(&self, utility: UtilityKind) -> ReadingWindow {
        match utility {
            UtilityKind::Water => self.water,
            UtilityKind::Electricity => self.electricity,
            UtilityKind::Garbage => ReadingWindow::default(),
        }
    }

    pub fn set_readings(&mut self, utility: UtilityKind, window: ReadingWindow) {
        match utility {
            UtilityKind::Water => self.water = window,
            UtilityKind::Electricity => self.electricity = window,
            UtilityKind::Garbage => {}
        }
    }
}
