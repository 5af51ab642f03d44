//! PostgreSQL store for utility-billing-service.

use crate::models::{
    Bill, BillStatus, BillingMode, BillingPeriod, CreateProperty, FlatBillingMode,
    ListBillsFilter, ListReadingsFilter, MeterReading, NewBill, Property, ReadingWindow,
    RecordReading, ServiceRate, Unit, UnitStatus, UpdateOccupancy, UpdateProperty, UtilityConfig,
    UtilityKind,
};
use crate::services::metrics::DB_QUERY_DURATION;
use crate::services::store::{BillStore, BillingStore, MeterReadingStore, PropertyStore};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use service_core::error::AppError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::FromRow;
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

const PROPERTY_COLUMNS: &str = "property_id, name, location, water_mode, water_amount, water_cost_per_unit, electricity_mode, electricity_amount, electricity_cost_per_unit, garbage_mode, garbage_amount, service_rate_kind, service_rate_value, created_utc, updated_utc";

const UNIT_COLUMNS: &str = "unit_id, property_id, unit_label, unit_type, rent, deposit, status, tenant_name, occupied_since, created_utc, updated_utc";

const READING_COLUMNS: &str = "reading_id, unit_id, utility, reading, recorded_utc, created_utc";

const BILL_COLUMNS: &str = "bill_id, property_id, unit_id, unit_label, tenant_name, period, rent_amount, water_consumption, electricity_consumption, water_charge, garbage_charge, electricity_charge, service_charge, total_amount, status, created_utc, paid_utc";

fn db_error(context: &str, e: sqlx::Error) -> AppError {
    AppError::DatabaseError(anyhow::anyhow!("{}: {}", context, e))
}

fn corrupt_row(what: &str, id: Uuid) -> AppError {
    AppError::DatabaseError(anyhow::anyhow!("Stored {} {} is malformed", what, id))
}

#[derive(Debug, FromRow)]
struct PropertyRow {
    property_id: Uuid,
    name: String,
    location: String,
    water_mode: String,
    water_amount: Option<Decimal>,
    water_cost_per_unit: Option<Decimal>,
    electricity_mode: String,
    electricity_amount: Option<Decimal>,
    electricity_cost_per_unit: Option<Decimal>,
    garbage_mode: String,
    garbage_amount: Option<Decimal>,
    service_rate_kind: String,
    service_rate_value: Decimal,
    created_utc: DateTime<Utc>,
    updated_utc: DateTime<Utc>,
}

impl TryFrom<PropertyRow> for Property {
    type Error = AppError;

    fn try_from(row: PropertyRow) -> Result<Self, Self::Error> {
        let bad = || corrupt_row("property", row.property_id);
        let utilities = UtilityConfig {
            water: BillingMode::from_columns(
                &row.water_mode,
                row.water_amount,
                row.water_cost_per_unit,
            )
            .ok_or_else(bad)?,
            electricity: BillingMode::from_columns(
                &row.electricity_mode,
                row.electricity_amount,
                row.electricity_cost_per_unit,
            )
            .ok_or_else(bad)?,
            garbage: FlatBillingMode::from_columns(&row.garbage_mode, row.garbage_amount)
                .ok_or_else(bad)?,
        };
        let service_rate = ServiceRate::from_columns(&row.service_rate_kind, row.service_rate_value)
            .ok_or_else(bad)?;

        Ok(Property {
            property_id: row.property_id,
            name: row.name,
            location: row.location,
            utilities,
            service_rate,
            created_utc: row.created_utc,
            updated_utc: row.updated_utc,
        })
    }
}

#[derive(Debug, FromRow)]
struct UnitRow {
    unit_id: Uuid,
    property_id: Uuid,
    unit_label: String,
    unit_type: String,
    rent: Decimal,
    deposit: Decimal,
    status: String,
    tenant_name: Option<String>,
    occupied_since: Option<NaiveDate>,
    created_utc: DateTime<Utc>,
    updated_utc: DateTime<Utc>,
}

impl From<UnitRow> for Unit {
    fn from(row: UnitRow) -> Self {
        Unit {
            unit_id: row.unit_id,
            property_id: row.property_id,
            unit_label: row.unit_label,
            unit_type: row.unit_type,
            rent: row.rent,
            deposit: row.deposit,
            status: UnitStatus::from_string(&row.status),
            tenant_name: row.tenant_name,
            occupied_since: row.occupied_since,
            created_utc: row.created_utc,
            updated_utc: row.updated_utc,
        }
    }
}

#[derive(Debug, FromRow)]
struct ReadingRow {
    reading_id: Uuid,
    unit_id: Uuid,
    utility: String,
    reading: Decimal,
    recorded_utc: DateTime<Utc>,
    created_utc: DateTime<Utc>,
}

impl TryFrom<ReadingRow> for MeterReading {
    type Error = AppError;

    fn try_from(row: ReadingRow) -> Result<Self, Self::Error> {
        Ok(MeterReading {
            reading_id: row.reading_id,
            unit_id: row.unit_id,
            utility: UtilityKind::from_string(&row.utility)
                .ok_or_else(|| corrupt_row("meter reading", row.reading_id))?,
            reading: row.reading,
            recorded_utc: row.recorded_utc,
            created_utc: row.created_utc,
        })
    }
}

#[derive(Debug, FromRow)]
struct BillRow {
    bill_id: Uuid,
    property_id: Uuid,
    unit_id: Uuid,
    unit_label: String,
    tenant_name: Option<String>,
    period: String,
    rent_amount: Decimal,
    water_consumption: Option<Decimal>,
    electricity_consumption: Option<Decimal>,
    water_charge: Decimal,
    garbage_charge: Decimal,
    electricity_charge: Decimal,
    service_charge: Decimal,
    total_amount: Decimal,
    status: String,
    created_utc: DateTime<Utc>,
    paid_utc: Option<DateTime<Utc>>,
}

impl TryFrom<BillRow> for Bill {
    type Error = AppError;

    fn try_from(row: BillRow) -> Result<Self, Self::Error> {
        Ok(Bill {
            bill_id: row.bill_id,
            property_id: row.property_id,
            unit_id: row.unit_id,
            unit_label: row.unit_label,
            tenant_name: row.tenant_name,
            period: row
                .period
                .parse()
                .map_err(|_| corrupt_row("bill", row.bill_id))?,
            rent_amount: row.rent_amount,
            water_consumption: row.water_consumption,
            electricity_consumption: row.electricity_consumption,
            water_charge: row.water_charge,
            garbage_charge: row.garbage_charge,
            electricity_charge: row.electricity_charge,
            service_charge: row.service_charge,
            total_amount: row.total_amount,
            status: BillStatus::from_string(&row.status),
            created_utc: row.created_utc,
            paid_utc: row.paid_utc,
        })
    }
}

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool.
    #[instrument(skip(database_url), fields(service = "utility-billing-service"))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| db_error("Failed to connect", e))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }

    async fn latest_reading(
        &self,
        unit_id: Uuid,
        utility: UtilityKind,
        from: Option<DateTime<Utc>>,
        to: DateTime<Utc>,
    ) -> Result<Option<Decimal>, AppError> {
        sqlx::query_scalar::<_, Decimal>(
            r#"
            SELECT reading
            FROM meter_readings
            WHERE unit_id = $1 AND utility = $2
              AND recorded_utc < $3
              AND ($4::timestamptz IS NULL OR recorded_utc >= $4)
            ORDER BY recorded_utc DESC
            LIMIT 1
            "#,
        )
        .bind(unit_id)
        .bind(utility.as_str())
        .bind(to)
        .bind(from)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to get meter reading", e))
    }
}

// =========================================================================
// Property Operations
// =========================================================================

#[async_trait]
impl PropertyStore for Database {
    #[instrument(skip(self, input), fields(name = %input.name))]
    async fn create_property(
        &self,
        input: &CreateProperty,
    ) -> Result<(Property, Vec<Unit>), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_property"])
            .start_timer();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("Failed to begin transaction", e))?;

        let (water_mode, water_amount, water_cost) = input.utilities.water.to_columns();
        let (electricity_mode, electricity_amount, electricity_cost) =
            input.utilities.electricity.to_columns();
        let (garbage_mode, garbage_amount) = input.utilities.garbage.to_columns();

        let sql = format!(
            r#"
            INSERT INTO properties (property_id, name, location, water_mode, water_amount, water_cost_per_unit, electricity_mode, electricity_amount, electricity_cost_per_unit, garbage_mode, garbage_amount, service_rate_kind, service_rate_value)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING {}
            "#,
            PROPERTY_COLUMNS
        );
        let row = sqlx::query_as::<_, PropertyRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(&input.name)
            .bind(&input.location)
            .bind(water_mode)
            .bind(water_amount)
            .bind(water_cost)
            .bind(electricity_mode)
            .bind(electricity_amount)
            .bind(electricity_cost)
            .bind(garbage_mode)
            .bind(garbage_amount)
            .bind(input.service_rate.kind_str())
            .bind(input.service_rate.value())
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| db_error("Failed to create property", e))?;
        let property = Property::try_from(row)?;

        let unit_sql = format!(
            r#"
            INSERT INTO units (unit_id, property_id, unit_label, unit_type, rent, deposit, status, tenant_name, occupied_since)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {}
            "#,
            UNIT_COLUMNS
        );
        let mut units = Vec::with_capacity(input.units.len());
        for unit in &input.units {
            let result = sqlx::query_as::<_, UnitRow>(&unit_sql)
                .bind(Uuid::new_v4())
                .bind(property.property_id)
                .bind(&unit.unit_label)
                .bind(&unit.unit_type)
                .bind(unit.rent)
                .bind(unit.deposit)
                .bind(unit.status.as_str())
                .bind(&unit.tenant_name)
                .bind(unit.occupied_since)
                .fetch_one(&mut *tx)
                .await;

            match result {
                Ok(row) => units.push(Unit::from(row)),
                Err(sqlx::Error::Database(ref db_err)) if db_err.is_unique_violation() => {
                    tx.rollback().await.ok();
                    return Err(AppError::Conflict(anyhow::anyhow!(
                        "Unit label '{}' is used more than once",
                        unit.unit_label
                    )));
                }
                Err(e) => return Err(db_error("Failed to create unit", e)),
            }
        }

        tx.commit()
            .await
            .map_err(|e| db_error("Failed to commit property", e))?;

        timer.observe_duration();
        info!(property_id = %property.property_id, units = units.len(), "Property created");

        Ok((property, units))
    }

    #[instrument(skip(self), fields(property_id = %property_id))]
    async fn get_property(&self, property_id: Uuid) -> Result<Option<Property>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_property"])
            .start_timer();

        let sql = format!(
            "SELECT {} FROM properties WHERE property_id = $1",
            PROPERTY_COLUMNS
        );
        let row = sqlx::query_as::<_, PropertyRow>(&sql)
            .bind(property_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to get property", e))?;

        timer.observe_duration();

        row.map(Property::try_from).transpose()
    }

    #[instrument(skip(self))]
    async fn list_properties(&self) -> Result<Vec<Property>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_properties"])
            .start_timer();

        let sql = format!(
            "SELECT {} FROM properties ORDER BY name, created_utc",
            PROPERTY_COLUMNS
        );
        let rows = sqlx::query_as::<_, PropertyRow>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("Failed to list properties", e))?;

        timer.observe_duration();

        rows.into_iter().map(Property::try_from).collect()
    }

    #[instrument(skip(self, update), fields(property_id = %property_id))]
    async fn update_property(
        &self,
        property_id: Uuid,
        update: &UpdateProperty,
    ) -> Result<Option<Property>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_property"])
            .start_timer();

        let (water_mode, water_amount, water_cost) = update.utilities.water.to_columns();
        let (electricity_mode, electricity_amount, electricity_cost) =
            update.utilities.electricity.to_columns();
        let (garbage_mode, garbage_amount) = update.utilities.garbage.to_columns();

        let sql = format!(
            r#"
            UPDATE properties
            SET name = $2, location = $3,
                water_mode = $4, water_amount = $5, water_cost_per_unit = $6,
                electricity_mode = $7, electricity_amount = $8, electricity_cost_per_unit = $9,
                garbage_mode = $10, garbage_amount = $11,
                service_rate_kind = $12, service_rate_value = $13,
                updated_utc = NOW()
            WHERE property_id = $1
            RETURNING {}
            "#,
            PROPERTY_COLUMNS
        );
        let row = sqlx::query_as::<_, PropertyRow>(&sql)
            .bind(property_id)
            .bind(&update.name)
            .bind(&update.location)
            .bind(water_mode)
            .bind(water_amount)
            .bind(water_cost)
            .bind(electricity_mode)
            .bind(electricity_amount)
            .bind(electricity_cost)
            .bind(garbage_mode)
            .bind(garbage_amount)
            .bind(update.service_rate.kind_str())
            .bind(update.service_rate.value())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to update property", e))?;

        timer.observe_duration();

        let property = row.map(Property::try_from).transpose()?;
        if property.is_some() {
            info!("Property updated");
        }
        Ok(property)
    }

    #[instrument(skip(self), fields(property_id = %property_id))]
    async fn list_units(&self, property_id: Uuid) -> Result<Vec<Unit>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_units"])
            .start_timer();

        let sql = format!(
            "SELECT {} FROM units WHERE property_id = $1 ORDER BY unit_label",
            UNIT_COLUMNS
        );
        let rows = sqlx::query_as::<_, UnitRow>(&sql)
            .bind(property_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("Failed to list units", e))?;

        timer.observe_duration();

        Ok(rows.into_iter().map(Unit::from).collect())
    }

    #[instrument(skip(self), fields(unit_id = %unit_id))]
    async fn get_unit(&self, unit_id: Uuid) -> Result<Option<Unit>, AppError> {
        let sql = format!("SELECT {} FROM units WHERE unit_id = $1", UNIT_COLUMNS);
        let row = sqlx::query_as::<_, UnitRow>(&sql)
            .bind(unit_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to get unit", e))?;

        Ok(row.map(Unit::from))
    }

    #[instrument(skip(self, update), fields(unit_id = %unit_id))]
    async fn update_occupancy(
        &self,
        unit_id: Uuid,
        update: &UpdateOccupancy,
    ) -> Result<Option<Unit>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_occupancy"])
            .start_timer();

        let (status, tenant_name, since) = match update {
            UpdateOccupancy::Occupy { tenant_name, since } => {
                (UnitStatus::Occupied, Some(tenant_name.as_str()), Some(*since))
            }
            UpdateOccupancy::Vacate => (UnitStatus::Vacant, None, None),
        };

        let sql = format!(
            r#"
            UPDATE units
            SET status = $2, tenant_name = $3, occupied_since = $4, updated_utc = NOW()
            WHERE unit_id = $1
            RETURNING {}
            "#,
            UNIT_COLUMNS
        );
        let row = sqlx::query_as::<_, UnitRow>(&sql)
            .bind(unit_id)
            .bind(status.as_str())
            .bind(tenant_name)
            .bind(since)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to update occupancy", e))?;

        timer.observe_duration();

        Ok(row.map(Unit::from))
    }
}

// =========================================================================
// Meter Reading Operations
// =========================================================================

#[async_trait]
impl MeterReadingStore for Database {
    #[instrument(skip(self, input), fields(unit_id = %input.unit_id, utility = %input.utility))]
    async fn record_reading(&self, input: &RecordReading) -> Result<MeterReading, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["record_reading"])
            .start_timer();

        let sql = format!(
            r#"
            INSERT INTO meter_readings (reading_id, unit_id, utility, reading, recorded_utc)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            READING_COLUMNS
        );
        let row = sqlx::query_as::<_, ReadingRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(input.unit_id)
            .bind(input.utility.as_str())
            .bind(input.reading)
            .bind(input.recorded_utc)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("Failed to record meter reading", e))?;

        timer.observe_duration();

        MeterReading::try_from(row)
    }

    #[instrument(skip(self), fields(unit_id = %unit_id, utility = %utility, period = %period))]
    async fn get_reading(
        &self,
        unit_id: Uuid,
        utility: UtilityKind,
        period: BillingPeriod,
    ) -> Result<ReadingWindow, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_reading"])
            .start_timer();

        let prior = self
            .latest_reading(unit_id, utility, None, period.start_utc())
            .await?;
        let current = self
            .latest_reading(unit_id, utility, Some(period.start_utc()), period.end_utc())
            .await?;

        timer.observe_duration();

        Ok(ReadingWindow { prior, current })
    }

    #[instrument(skip(self, filter), fields(unit_id = %unit_id))]
    async fn list_readings(
        &self,
        unit_id: Uuid,
        filter: &ListReadingsFilter,
    ) -> Result<Vec<MeterReading>, AppError> {
        let sql = format!(
            r#"
            SELECT {}
            FROM meter_readings
            WHERE unit_id = $1 AND ($2::text IS NULL OR utility = $2)
            ORDER BY recorded_utc DESC
            LIMIT $3
            "#,
            READING_COLUMNS
        );
        let rows = sqlx::query_as::<_, ReadingRow>(&sql)
            .bind(unit_id)
            .bind(filter.utility.map(|u| u.as_str()))
            .bind(filter.limit.unwrap_or(500))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("Failed to list meter readings", e))?;

        rows.into_iter().map(MeterReading::try_from).collect()
    }
}

// =========================================================================
// Bill Operations
// =========================================================================

#[async_trait]
impl BillStore for Database {
    #[instrument(skip(self, bills), fields(count = bills.len()))]
    async fn save_bills(&self, bills: &[NewBill]) -> Result<Vec<Bill>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["save_bills"])
            .start_timer();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("Failed to begin transaction", e))?;

        let sql = format!(
            r#"
            INSERT INTO bills (bill_id, property_id, unit_id, unit_label, tenant_name, period, rent_amount, water_consumption, electricity_consumption, water_charge, garbage_charge, electricity_charge, service_charge, total_amount)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING {}
            "#,
            BILL_COLUMNS
        );

        let mut saved = Vec::with_capacity(bills.len());
        for bill in bills {
            let result = sqlx::query_as::<_, BillRow>(&sql)
                .bind(Uuid::new_v4())
                .bind(bill.property_id)
                .bind(bill.unit_id)
                .bind(&bill.unit_label)
                .bind(&bill.tenant_name)
                .bind(bill.period.to_string())
                .bind(bill.rent_amount)
                .bind(bill.water_consumption)
                .bind(bill.electricity_consumption)
                .bind(bill.water_charge)
                .bind(bill.garbage_charge)
                .bind(bill.electricity_charge)
                .bind(bill.service_charge)
                .bind(bill.total_amount)
                .fetch_one(&mut *tx)
                .await;

            match result {
                Ok(row) => saved.push(Bill::try_from(row)?),
                Err(sqlx::Error::Database(ref db_err)) if db_err.is_unique_violation() => {
                    // Another run billed this unit first; keep nothing from this batch.
                    tx.rollback().await.ok();
                    return Err(AppError::Conflict(anyhow::anyhow!(
                        "Unit {} already has a bill for {}",
                        bill.unit_id,
                        bill.period
                    )));
                }
                Err(e) => return Err(db_error("Failed to save bill", e)),
            }
        }

        tx.commit()
            .await
            .map_err(|e| db_error("Failed to commit bills", e))?;

        timer.observe_duration();
        info!(count = saved.len(), "Bills saved");

        Ok(saved)
    }

    #[instrument(skip(self), fields(unit_id = %unit_id, period = %period))]
    async fn bill_exists(&self, unit_id: Uuid, period: BillingPeriod) -> Result<bool, AppError> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM bills WHERE unit_id = $1 AND period = $2)",
        )
        .bind(unit_id)
        .bind(period.to_string())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("Failed to check bill", e))
    }

    #[instrument(skip(self, filter))]
    async fn list_bills(&self, filter: &ListBillsFilter) -> Result<Vec<Bill>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_bills"])
            .start_timer();

        let sql = format!(
            r#"
            SELECT {}
            FROM bills
            WHERE ($1::uuid IS NULL OR property_id = $1)
              AND ($2::text IS NULL OR period = $2)
              AND ($3::text IS NULL OR status = $3)
            ORDER BY period DESC, unit_label
            "#,
            BILL_COLUMNS
        );
        let rows = sqlx::query_as::<_, BillRow>(&sql)
            .bind(filter.property_id)
            .bind(filter.period.map(|p| p.to_string()))
            .bind(filter.status.map(|s| s.as_str()))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("Failed to list bills", e))?;

        timer.observe_duration();

        rows.into_iter().map(Bill::try_from).collect()
    }

    #[instrument(skip(self), fields(bill_id = %bill_id))]
    async fn get_bill(&self, bill_id: Uuid) -> Result<Option<Bill>, AppError> {
        let sql = format!("SELECT {} FROM bills WHERE bill_id = $1", BILL_COLUMNS);
        let row = sqlx::query_as::<_, BillRow>(&sql)
            .bind(bill_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to get bill", e))?;

        row.map(Bill::try_from).transpose()
    }

    #[instrument(skip(self), fields(bill_id = %bill_id))]
    async fn mark_paid(
        &self,
        bill_id: Uuid,
        paid_utc: DateTime<Utc>,
    ) -> Result<Option<Bill>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["mark_paid"])
            .start_timer();

        let sql = format!(
            r#"
            UPDATE bills
            SET status = 'paid', paid_utc = $2
            WHERE bill_id = $1 AND status = 'unpaid'
            RETURNING {}
            "#,
            BILL_COLUMNS
        );
        let row = sqlx::query_as::<_, BillRow>(&sql)
            .bind(bill_id)
            .bind(paid_utc)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to mark bill paid", e))?;

        timer.observe_duration();

        row.map(Bill::try_from).transpose()
    }
}

#[async_trait]
impl BillingStore for Database {
    /// Check database health.
    #[instrument(skip(self))]
    async fn health_check(&self) -> Result<(), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["health_check"])
            .start_timer();

        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("Health check failed", e))?;

        timer.observe_duration();
        Ok(())
    }
}
