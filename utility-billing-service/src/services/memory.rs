//! In-process store used when no database is configured, and by tests.

use crate::models::{
    Bill, BillStatus, BillingPeriod, CreateProperty, ListBillsFilter, ListReadingsFilter,
    MeterReading, NewBill, Property, ReadingWindow, RecordReading, Unit, UnitStatus,
    UpdateOccupancy, UpdateProperty, UtilityKind,
};
use crate::services::store::{BillStore, BillingStore, MeterReadingStore, PropertyStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use service_core::error::AppError;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{info, instrument};
use uuid::Uuid;

#[derive(Default)]
struct Inner {
    properties: HashMap<Uuid, Property>,
    units: HashMap<Uuid, Unit>,
    readings: Vec<MeterReading>,
    bills: HashMap<Uuid, Bill>,
}

/// All state behind one lock, so a batch of bills is checked and inserted
/// atomically.
#[derive(Default)]
pub struct InMemoryStore {
    inner: RwLock<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PropertyStore for InMemoryStore {
    #[instrument(skip(self, input), fields(name = %input.name))]
    async fn create_property(
        &self,
        input: &CreateProperty,
    ) -> Result<(Property, Vec<Unit>), AppError> {
        let now = Utc::now();
        let property = Property {
            property_id: Uuid::new_v4(),
            name: input.name.clone(),
            location: input.location.clone(),
            utilities: input.utilities,
            service_rate: input.service_rate,
            created_utc: now,
            updated_utc: now,
        };

        let units: Vec<Unit> = input
            .units
            .iter()
            .map(|u| Unit {
                unit_id: Uuid::new_v4(),
                property_id: property.property_id,
                unit_label: u.unit_label.clone(),
                unit_type: u.unit_type.clone(),
                rent: u.rent,
                deposit: u.deposit,
                status: u.status,
                tenant_name: u.tenant_name.clone(),
                occupied_since: u.occupied_since,
                created_utc: now,
                updated_utc: now,
            })
            .collect();

        let mut inner = self.inner.write().await;
        inner
            .properties
            .insert(property.property_id, property.clone());
        for unit in &units {
            inner.units.insert(unit.unit_id, unit.clone());
        }

        info!(property_id = %property.property_id, units = units.len(), "Property created");
        Ok((property, units))
    }

    async fn get_property(&self, property_id: Uuid) -> Result<Option<Property>, AppError> {
        Ok(self.inner.read().await.properties.get(&property_id).cloned())
    }

    async fn list_properties(&self) -> Result<Vec<Property>, AppError> {
        let inner = self.inner.read().await;
        let mut properties: Vec<Property> = inner.properties.values().cloned().collect();
        properties.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(properties)
    }

    #[instrument(skip(self, update))]
    async fn update_property(
        &self,
        property_id: Uuid,
        update: &UpdateProperty,
    ) -> Result<Option<Property>, AppError> {
        let mut inner = self.inner.write().await;
        let Some(property) = inner.properties.get_mut(&property_id) else {
            return Ok(None);
        };

        property.name = update.name.clone();
        property.location = update.location.clone();
        property.utilities = update.utilities;
        property.service_rate = update.service_rate;
        property.updated_utc = Utc::now();

        info!("Property updated");
        Ok(Some(property.clone()))
    }

    async fn list_units(&self, property_id: Uuid) -> Result<Vec<Unit>, AppError> {
        let inner = self.inner.read().await;
        let mut units: Vec<Unit> = inner
            .units
            .values()
            .filter(|u| u.property_id == property_id)
            .cloned()
            .collect();
        units.sort_by(|a, b| a.unit_label.cmp(&b.unit_label));
        Ok(units)
    }

    async fn get_unit(&self, unit_id: Uuid) -> Result<Option<Unit>, AppError> {
        Ok(self.inner.read().await.units.get(&unit_id).cloned())
    }

    async fn update_occupancy(
        &self,
        unit_id: Uuid,
        update: &UpdateOccupancy,
    ) -> Result<Option<Unit>, AppError> {
        let mut inner = self.inner.write().await;
        let Some(unit) = inner.units.get_mut(&unit_id) else {
            return Ok(None);
        };

        match update {
            UpdateOccupancy::Occupy { tenant_name, since } => {
                unit.status = UnitStatus::Occupied;
                unit.tenant_name = Some(tenant_name.clone());
                unit.occupied_since = Some(*since);
            }
            UpdateOccupancy::Vacate => {
                unit.status = UnitStatus::Vacant;
                unit.tenant_name = None;
                unit.occupied_since = None;
            }
        }
        unit.updated_utc = Utc::now();

        Ok(Some(unit.clone()))
    }
}

#[async_trait]
impl MeterReadingStore for InMemoryStore {
    async fn record_reading(&self, input: &RecordReading) -> Result<MeterReading, AppError> {
        let reading = MeterReading {
            reading_id: Uuid::new_v4(),
            unit_id: input.unit_id,
            utility: input.utility,
            reading: input.reading,
            recorded_utc: input.recorded_utc,
            created_utc: Utc::now(),
        };
        self.inner.write().await.readings.push(reading.clone());
        Ok(reading)
    }

    async fn get_reading(
        &self,
        unit_id: Uuid,
        utility: UtilityKind,
        period: BillingPeriod,
    ) -> Result<ReadingWindow, AppError> {
        let inner = self.inner.read().await;
        let (start, end) = (period.start_utc(), period.end_utc());

        let latest = |from: Option<DateTime<Utc>>, to: DateTime<Utc>| {
            inner
                .readings
                .iter()
                .filter(|r| r.unit_id == unit_id && r.utility == utility)
                .filter(|r| r.recorded_utc < to && from.map_or(true, |f| r.recorded_utc >= f))
                .max_by_key(|r| r.recorded_utc)
                .map(|r| r.reading)
        };

        Ok(ReadingWindow {
            prior: latest(None, start),
            current: latest(Some(start), end),
        })
    }

    async fn list_readings(
        &self,
        unit_id: Uuid,
        filter: &ListReadingsFilter,
    ) -> Result<Vec<MeterReading>, AppError> {
        let inner = self.inner.read().await;
        let mut readings: Vec<MeterReading> = inner
            .readings
            .iter()
            .filter(|r| r.unit_id == unit_id)
            .filter(|r| filter.utility.map_or(true, |u| r.utility == u))
            .cloned()
            .collect();
        readings.sort_by(|a, b| b.recorded_utc.cmp(&a.recorded_utc));
        if let Some(limit) = filter.limit {
            readings.truncate(usize::try_from(limit).unwrap_or(0));
        }
        Ok(readings)
    }
}

#[async_trait]
impl BillStore for InMemoryStore {
    #[instrument(skip(self, bills), fields(count = bills.len()))]
    async fn save_bills(&self, bills: &[NewBill]) -> Result<Vec<Bill>, AppError> {
        let mut inner = self.inner.write().await;

        for (i, bill) in bills.iter().enumerate() {
            let clashes_stored = inner
                .bills
                .values()
                .any(|b| b.unit_id == bill.unit_id && b.period == bill.period);
            let clashes_batch = bills[..i]
                .iter()
                .any(|b| b.unit_id == bill.unit_id && b.period == bill.period);
            if clashes_stored || clashes_batch {
                return Err(AppError::Conflict(anyhow::anyhow!(
                    "Unit {} already has a bill for {}",
                    bill.unit_id,
                    bill.period
                )));
            }
        }

        let now = Utc::now();
        let saved: Vec<Bill> = bills
            .iter()
            .cloned()
            .map(|b| Bill::from_new(b, now))
            .collect();
        for bill in &saved {
            inner.bills.insert(bill.bill_id, bill.clone());
        }

        Ok(saved)
    }

    async fn bill_exists(&self, unit_id: Uuid, period: BillingPeriod) -> Result<bool, AppError> {
        Ok(self
            .inner
            .read()
            .await
            .bills
            .values()
            .any(|b| b.unit_id == unit_id && b.period == period))
    }

    async fn list_bills(&self, filter: &ListBillsFilter) -> Result<Vec<Bill>, AppError> {
        let inner = self.inner.read().await;
        let mut bills: Vec<Bill> = inner
            .bills
            .values()
            .filter(|b| filter.property_id.map_or(true, |p| b.property_id == p))
            .filter(|b| filter.period.map_or(true, |p| b.period == p))
            .filter(|b| filter.status.map_or(true, |s| b.status == s))
            .cloned()
            .collect();
        bills.sort_by(|a, b| {
            b.period
                .cmp(&a.period)
                .then_with(|| a.unit_label.cmp(&b.unit_label))
        });
        Ok(bills)
    }

    async fn get_bill(&self, bill_id: Uuid) -> Result<Option<Bill>, AppError> {
        Ok(self.inner.read().await.bills.get(&bill_id).cloned())
    }

    async fn mark_paid(
        &self,
        bill_id: Uuid,
        paid_utc: DateTime<Utc>,
    ) -> Result<Option<Bill>, AppError> {
        let mut inner = self.inner.write().await;
        match inner.bills.get_mut(&bill_id) {
            Some(bill) if bill.status == BillStatus::Unpaid => {
                bill.status = BillStatus::Paid;
                bill.paid_utc = Some(paid_utc);
                Ok(Some(bill.clone()))
            }
            _ => Ok(None),
        }
    }
}

#[async_trait]
impl BillingStore for InMemoryStore {
    async fn health_check(&self) -> Result<(), AppError> {
        Ok(())
    }
}
