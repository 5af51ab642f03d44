//! Generation workflow against the in-memory store.

mod common;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use common::{at, d, period, sample_create_property};
use service_core::error::AppError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use utility_billing_service::billing::BillingError;
use utility_billing_service::models::{
    Bill, BillStatus, BillingMode, BillingPeriod, CreateProperty, ListBillsFilter, ListReadingsFilter,
    MeterReading, NewBill, Property, ReadingWindow, RecordReading, Unit, UnitStatus,
    UpdateOccupancy, UpdateProperty, UtilityKind,
};
use utility_billing_service::services::{
    BillGenerator, BillStore, BillingStore, InMemoryStore, MeterReadingStore, PropertyStore,
};
use uuid::Uuid;

/// Store whose first `save_bills` loses a race: another writer stores the
/// same bills first, then the call fails with a conflict.
struct RacingStore {
    inner: InMemoryStore,
    raced: AtomicBool,
}

#[async_trait]
impl PropertyStore for RacingStore {
    async fn create_property(
        &self,
        input: &CreateProperty,
    ) -> Result<(Property, Vec<Unit>), AppError> {
        self.inner.create_property(input).await
    }

    async fn get_property(&self, property_id: Uuid) -> Result<Option<Property>, AppError> {
        self.inner.get_property(property_id).await
    }

    async fn list_properties(&self) -> Result<Vec<Property>, AppError> {
        self.inner.list_properties().await
    }

    async fn update_property(
        &self,
        property_id: Uuid,
        update: &UpdateProperty,
    ) -> Result<Option<Property>, AppError> {
        self.inner.update_property(property_id, update).await
    }

    async fn list_units(&self, property_id: Uuid) -> Result<Vec<Unit>, AppError> {
        self.inner.list_units(property_id).await
    }

    async fn get_unit(&self, unit_id: Uuid) -> Result<Option<Unit>, AppError> {
        self.inner.get_unit(unit_id).await
    }

    async fn update_occupancy(
        &self,
        unit_id: Uuid,
        update: &UpdateOccupancy,
    ) -> Result<Option<Unit>, AppError> {
        self.inner.update_occupancy(unit_id, update).await
    }
}

#[async_trait]
impl MeterReadingStore for RacingStore {
    async fn record_reading(&self, input: &RecordReading) -> Result<MeterReading, AppError> {
        self.inner.record_reading(input).await
    }

    async fn get_reading(
        &self,
        unit_id: Uuid,
        utility: UtilityKind,
        period: BillingPeriod,
    ) -> Result<ReadingWindow, AppError> {
        self.inner.get_reading(unit_id, utility, period).await
    }

    async fn list_readings(
        &self,
        unit_id: Uuid,
        filter: &ListReadingsFilter,
    ) -> Result<Vec<MeterReading>, AppError> {
        self.inner.list_readings(unit_id, filter).await
    }
}

#[async_trait]
impl BillStore for RacingStore {
    async fn save_bills(&self, bills: &[NewBill]) -> Result<Vec<Bill>, AppError> {
        if !self.raced.swap(true, Ordering::SeqCst) {
            self.inner.save_bills(bills).await?;
            return Err(AppError::Conflict(anyhow::anyhow!(
                "bill already exists for this unit and period"
            )));
        }
        self.inner.save_bills(bills).await
    }

    async fn bill_exists(&self, unit_id: Uuid, period: BillingPeriod) -> Result<bool, AppError> {
        self.inner.bill_exists(unit_id, period).await
    }

    async fn list_bills(&self, filter: &ListBillsFilter) -> Result<Vec<Bill>, AppError> {
        self.inner.list_bills(filter).await
    }

    async fn get_bill(&self, bill_id: Uuid) -> Result<Option<Bill>, AppError> {
        self.inner.get_bill(bill_id).await
    }

    async fn mark_paid(
        &self,
        bill_id: Uuid,
        paid_utc: DateTime<Utc>,
    ) -> Result<Option<Bill>, AppError> {
        self.inner.mark_paid(bill_id, paid_utc).await
    }
}

#[async_trait]
impl BillingStore for RacingStore {
    async fn health_check(&self) -> Result<(), AppError> {
        self.inner.health_check().await
    }
}

struct Fixture {
    store: Arc<dyn BillingStore>,
    generator: BillGenerator,
    property: Property,
    units: Vec<Unit>,
}

impl Fixture {
    async fn new() -> Self {
        Self::with_store(Arc::new(InMemoryStore::new())).await
    }

    async fn with_store(store: Arc<dyn BillingStore>) -> Self {
        let (property, units) = store
            .create_property(&sample_create_property())
            .await
            .unwrap();
        Self {
            generator: BillGenerator::new(store.clone()),
            store,
            property,
            units,
        }
    }

    fn unit(&self, label: &str) -> Uuid {
        self.units
            .iter()
            .find(|u| u.unit_label == label)
            .map(|u| u.unit_id)
            .unwrap()
    }

    async fn water(&self, label: &str, reading: &str, day: (i32, u32, u32)) {
        self.store
            .record_reading(&RecordReading {
                unit_id: self.unit(label),
                utility: UtilityKind::Water,
                reading: d(reading),
                recorded_utc: at(day.0, day.1, day.2),
            })
            .await
            .unwrap();
    }

    /// March 2025 readings for both occupied units.
    async fn march_readings(&self) {
        self.water("A1", "100", (2025, 2, 27)).await;
        self.water("A1", "108", (2025, 3, 28)).await;
        self.water("A2", "40", (2025, 2, 27)).await;
        self.water("A2", "50", (2025, 3, 28)).await;
    }
}

#[tokio::test]
async fn generates_bills_for_occupied_units() {
    let fx = Fixture::new().await;
    fx.march_readings().await;

    let outcome = fx
        .generator
        .generate(fx.property.property_id, period("2025-03"))
        .await
        .unwrap();

    assert_eq!(outcome.created.len(), 2);
    assert!(outcome.skipped_units.is_empty());

    let a1 = outcome
        .created
        .iter()
        .find(|b| b.unit_id == fx.unit("A1"))
        .unwrap();
    assert_eq!(a1.total_amount, d("19000"));
    assert_eq!(a1.status, BillStatus::Unpaid);
    assert!(a1.paid_utc.is_none());

    let a2 = outcome
        .created
        .iter()
        .find(|b| b.unit_id == fx.unit("A2"))
        .unwrap();
    assert_eq!(a2.water_charge, d("1500"));
    assert_eq!(a2.total_amount, d("19300"));

    assert!(!outcome.created.iter().any(|b| b.unit_id == fx.unit("A3")));
}

#[tokio::test]
async fn regeneration_is_a_noop() {
    let fx = Fixture::new().await;
    fx.march_readings().await;

    let first = fx
        .generator
        .generate(fx.property.property_id, period("2025-03"))
        .await
        .unwrap();
    let second = fx
        .generator
        .generate(fx.property.property_id, period("2025-03"))
        .await
        .unwrap();

    assert!(second.created.is_empty());
    let mut skipped = second.skipped_units.clone();
    skipped.sort();
    let mut billed: Vec<_> = first.created.iter().map(|b| b.unit_id).collect();
    billed.sort();
    assert_eq!(skipped, billed);

    let stored = fx
        .store
        .list_bills(&ListBillsFilter {
            property_id: Some(fx.property.property_id),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(stored.len(), 2);
}

#[tokio::test]
async fn missing_reading_writes_nothing() {
    let fx = Fixture::new().await;
    fx.water("A1", "100", (2025, 2, 27)).await;
    fx.water("A1", "108", (2025, 3, 28)).await;
    // A2 has a prior reading but none inside March.
    fx.water("A2", "40", (2025, 2, 27)).await;

    let err = fx
        .generator
        .generate(fx.property.property_id, period("2025-03"))
        .await
        .unwrap_err();

    let failures = err.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].unit_id, fx.unit("A2"));
    assert!(matches!(failures[0].error, BillingError::MissingReading { .. }));

    assert!(!fx.store.bill_exists(fx.unit("A1"), period("2025-03")).await.unwrap());
}

#[tokio::test]
async fn newly_occupied_unit_is_billed_on_rerun() {
    let fx = Fixture::new().await;
    fx.march_readings().await;
    fx.generator
        .generate(fx.property.property_id, period("2025-03"))
        .await
        .unwrap();

    fx.store
        .update_occupancy(
            fx.unit("A3"),
            &UpdateOccupancy::Occupy {
                tenant_name: "Late Arrival".to_string(),
                since: NaiveDate::from_ymd_opt(2025, 3, 15).unwrap(),
            },
        )
        .await
        .unwrap();
    fx.water("A3", "0", (2025, 2, 1)).await;
    fx.water("A3", "3", (2025, 3, 30)).await;

    let outcome = fx
        .generator
        .generate(fx.property.property_id, period("2025-03"))
        .await
        .unwrap();

    assert_eq!(outcome.created.len(), 1);
    assert_eq!(outcome.created[0].unit_id, fx.unit("A3"));
    assert_eq!(outcome.created[0].tenant_name.as_deref(), Some("Late Arrival"));
    assert_eq!(outcome.skipped_units.len(), 2);
}

#[tokio::test]
async fn tenancy_starting_after_period_is_not_billed() {
    let fx = Fixture::new().await;
    fx.march_readings().await;
    fx.store
        .update_occupancy(
            fx.unit("A3"),
            &UpdateOccupancy::Occupy {
                tenant_name: "Next Month".to_string(),
                since: NaiveDate::from_ymd_opt(2025, 4, 1).unwrap(),
            },
        )
        .await
        .unwrap();

    let outcome = fx
        .generator
        .generate(fx.property.property_id, period("2025-03"))
        .await
        .unwrap();

    assert_eq!(outcome.created.len(), 2);
    assert!(!outcome.created.iter().any(|b| b.unit_id == fx.unit("A3")));

    let units = fx.store.list_units(fx.property.property_id).await.unwrap();
    let a3 = units.iter().find(|u| u.unit_label == "A3").unwrap();
    assert_eq!(a3.status, UnitStatus::Occupied);
    assert_eq!(a3.status_for(period("2025-03")), UnitStatus::Vacant);
}

#[tokio::test]
async fn unknown_property_is_not_found() {
    let fx = Fixture::new().await;
    let err = fx
        .generator
        .generate(Uuid::new_v4(), period("2025-03"))
        .await
        .unwrap_err();
    assert!(matches!(err, BillingError::PropertyNotFound(_)));
}

#[tokio::test]
async fn bill_can_be_paid_once() {
    let fx = Fixture::new().await;
    fx.march_readings().await;
    let outcome = fx
        .generator
        .generate(fx.property.property_id, period("2025-03"))
        .await
        .unwrap();
    let bill_id = outcome.created[0].bill_id;

    let paid = fx.generator.mark_paid(bill_id).await.unwrap();
    assert_eq!(paid.status, BillStatus::Paid);
    assert!(paid.paid_utc.is_some());

    let err = fx.generator.mark_paid(bill_id).await.unwrap_err();
    assert!(matches!(err, BillingError::AlreadyPaid(id) if id == bill_id));

    let err = fx.generator.mark_paid(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, BillingError::BillNotFound(_)));
}

#[tokio::test]
async fn concurrent_runs_create_each_bill_once() {
    let fx = Fixture::new().await;
    fx.march_readings().await;

    let (a, b) = tokio::join!(
        fx.generator.generate(fx.property.property_id, period("2025-03")),
        fx.generator.generate(fx.property.property_id, period("2025-03")),
    );

    let (a, b) = (a.unwrap(), b.unwrap());
    assert_eq!(a.created.len() + b.created.len(), 2);
    assert_eq!(a.skipped_units.len() + b.skipped_units.len(), 2);

    let stored = fx
        .store
        .list_bills(&ListBillsFilter {
            period: Some(period("2025-03")),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(stored.len(), 2);
}

#[tokio::test]
async fn run_losing_the_save_race_reports_units_as_skipped() {
    let fx = Fixture::with_store(Arc::new(RacingStore {
        inner: InMemoryStore::new(),
        raced: AtomicBool::new(false),
    }))
    .await;
    fx.march_readings().await;

    let outcome = fx
        .generator
        .generate(fx.property.property_id, period("2025-03"))
        .await
        .unwrap();

    assert!(outcome.created.is_empty());
    let mut skipped = outcome.skipped_units.clone();
    skipped.sort();
    let mut expected = vec![fx.unit("A1"), fx.unit("A2")];
    expected.sort();
    assert_eq!(skipped, expected);

    let stored = fx
        .store
        .list_bills(&ListBillsFilter {
            period: Some(period("2025-03")),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(stored.len(), 2);
}

#[tokio::test]
async fn updated_billing_settings_apply_to_next_period() {
    let fx = Fixture::new().await;
    fx.march_readings().await;
    fx.generator
        .generate(fx.property.property_id, period("2025-03"))
        .await
        .unwrap();

    let mut utilities = fx.property.utilities;
    utilities.water = BillingMode::Fixed { amount: d("300") };
    fx.store
        .update_property(
            fx.property.property_id,
            &UpdateProperty {
                name: fx.property.name.clone(),
                location: fx.property.location.clone(),
                utilities,
                service_rate: fx.property.service_rate,
            },
        )
        .await
        .unwrap()
        .unwrap();

    // No April readings needed once water is a flat fee.
    let outcome = fx
        .generator
        .generate(fx.property.property_id, period("2025-04"))
        .await
        .unwrap();
    assert_eq!(outcome.created.len(), 2);
    assert!(outcome.created.iter().all(|b| b.water_charge == d("300")));
    assert!(outcome.created.iter().all(|b| b.water_consumption.is_none()));

    let metered = fx
        .store
        .list_metered_units(
            &fx.store
                .get_property(fx.property.property_id)
                .await
                .unwrap()
                .unwrap(),
            UtilityKind::Water,
        )
        .await
        .unwrap();
    assert!(metered.is_empty());
}
