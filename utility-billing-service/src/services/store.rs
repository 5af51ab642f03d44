//! Persistence contracts consumed by bill generation.

use crate::models::{
    Bill, BillingPeriod, CreateProperty, ListBillsFilter, ListReadingsFilter, MeterReading,
    NewBill, Property, ReadingWindow, RecordReading, Unit, UnitSnapshot, UpdateOccupancy,
    UpdateProperty, UtilityKind,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use service_core::error::AppError;
use uuid::Uuid;

/// Properties and their units.
#[async_trait]
pub trait PropertyStore: Send + Sync {
    async fn create_property(&self, input: &CreateProperty)
        -> Result<(Property, Vec<Unit>), AppError>;

    async fn get_property(&self, property_id: Uuid) -> Result<Option<Property>, AppError>;

    /// Ordered by name.
    async fn list_properties(&self) -> Result<Vec<Property>, AppError>;

    /// Returns `None` if the property does not exist.
    async fn update_property(
        &self,
        property_id: Uuid,
        update: &UpdateProperty,
    ) -> Result<Option<Property>, AppError>;

    async fn list_units(&self, property_id: Uuid) -> Result<Vec<Unit>, AppError>;

    async fn get_unit(&self, unit_id: Uuid) -> Result<Option<Unit>, AppError>;

    /// Units that need `utility` readings: all of the property's units when
    /// it meters `utility`, none otherwise.
    async fn list_metered_units(
        &self,
        property: &Property,
        utility: UtilityKind,
    ) -> Result<Vec<Unit>, AppError> {
        if !property.utilities.mode_for(utility).is_metered() {
            return Ok(Vec::new());
        }
        self.list_units(property.property_id).await
    }

    /// Returns `None` if the unit does not exist.
    async fn update_occupancy(
        &self,
        unit_id: Uuid,
        update: &UpdateOccupancy,
    ) -> Result<Option<Unit>, AppError>;

    /// Snapshots of every unit of the property as of `period`, without
    /// meter readings.
    async fn get_units_for_property(
        &self,
        property_id: Uuid,
        period: BillingPeriod,
    ) -> Result<Vec<UnitSnapshot>, AppError> {
        Ok(self
            .list_units(property_id)
            .await?
            .iter()
            .map(|unit| unit.snapshot(period))
            .collect())
    }
}

/// Cumulative meter readings per unit and utility.
#[async_trait]
pub trait MeterReadingStore: Send + Sync {
    async fn record_reading(&self, input: &RecordReading) -> Result<MeterReading, AppError>;

    /// Latest reading before the period starts and latest reading inside it.
    async fn get_reading(
        &self,
        unit_id: Uuid,
        utility: UtilityKind,
        period: BillingPeriod,
    ) -> Result<ReadingWindow, AppError>;

    /// Newest first.
    async fn list_readings(
        &self,
        unit_id: Uuid,
        filter: &ListReadingsFilter,
    ) -> Result<Vec<MeterReading>, AppError>;
}

/// Generated bills.
#[async_trait]
pub trait BillStore: Send + Sync {
    /// Persist every bill or none. A bill that already exists for its
    /// `(unit_id, period)` fails the whole call with [`AppError::Conflict`].
    async fn save_bills(&self, bills: &[NewBill]) -> Result<Vec<Bill>, AppError>;

    async fn bill_exists(&self, unit_id: Uuid, period: BillingPeriod) -> Result<bool, AppError>;

    async fn list_bills(&self, filter: &ListBillsFilter) -> Result<Vec<Bill>, AppError>;

    async fn get_bill(&self, bill_id: Uuid) -> Result<Option<Bill>, AppError>;

    /// Move an unpaid bill to paid. Returns `None` when no unpaid bill with
    /// this id exists.
    async fn mark_paid(
        &self,
        bill_id: Uuid,
        paid_utc: DateTime<Utc>,
    ) -> Result<Option<Bill>, AppError>;
}

/// Everything the service needs from its backing store.
#[async_trait]
pub trait BillingStore: PropertyStore + MeterReadingStore + BillStore {
    async fn health_check(&self) -> Result<(), AppError>;
}
