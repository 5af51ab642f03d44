//! Bill generation workflow: load inputs, compute, persist.

use crate::billing::{generate_bills_for_period, BillingError};
use crate::models::{Bill, BillingPeriod, UnitStatus};
use crate::services::metrics::{
    record_bill_paid, record_billed_amount, record_bills_created, record_error,
    record_generation_run,
};
use crate::services::store::BillingStore;
use chrono::Utc;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Passes over the store per run; a second pass follows a lost race.
const GENERATION_ATTEMPTS: u32 = 2;

/// Result of a generation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationOutcome {
    pub property_id: Uuid,
    pub period: BillingPeriod,
    /// Bills created by this run.
    pub created: Vec<Bill>,
    /// Occupied units that already had a bill for the period.
    pub skipped_units: Vec<Uuid>,
}

/// Drives bill generation for one `(property, period)` per call.
///
/// Holds no state of its own; concurrent runs for the same pair are
/// serialised by the store's unique `(unit_id, period)` constraint.
#[derive(Clone)]
pub struct BillGenerator {
    store: Arc<dyn BillingStore>,
}

impl BillGenerator {
    pub fn new(store: Arc<dyn BillingStore>) -> Self {
        Self { store }
    }

    /// Generate bills for every occupied, not yet billed unit.
    ///
    /// Re-running for the same period is a no-op for units billed earlier:
    /// they are reported in `skipped_units`. If any remaining unit cannot be
    /// billed, nothing is written.
    #[instrument(skip(self), fields(property_id = %property_id, period = %period))]
    pub async fn generate(
        &self,
        property_id: Uuid,
        period: BillingPeriod,
    ) -> Result<GenerationOutcome, BillingError> {
        let result = self.run(property_id, period).await;

        match &result {
            Ok(outcome) => {
                let status = if outcome.created.is_empty() {
                    "noop"
                } else {
                    "completed"
                };
                record_generation_run(status);
                record_bills_created(outcome.created.len());
                record_amounts(&outcome.created);
                info!(
                    created = outcome.created.len(),
                    skipped = outcome.skipped_units.len(),
                    "Bill generation completed"
                );
            }
            Err(e) => {
                record_generation_run("failed");
                record_error(e.kind(), "generate_bills");
                for failure in e.failures() {
                    warn!(unit_id = %failure.unit_id, error = %failure.error, "Unit not billed");
                }
                warn!(error = %e, "Bill generation failed");
            }
        }

        result
    }

    /// A run that loses the race for the same period re-reads what the
    /// winner stored, so its units come back as skipped.
    async fn run(
        &self,
        property_id: Uuid,
        period: BillingPeriod,
    ) -> Result<GenerationOutcome, BillingError> {
        let mut attempt = 1;
        loop {
            match self.attempt(property_id, period).await {
                Err(BillingError::Store(AppError::Conflict(e))) if attempt < GENERATION_ATTEMPTS => {
                    warn!(attempt, error = %e, "Concurrent generation detected, re-reading bills");
                    attempt += 1;
                }
                Err(BillingError::Store(AppError::Conflict(_))) => {
                    return Err(BillingError::Store(AppError::Conflict(anyhow::anyhow!(
                        "Bills for property {} in {} were generated concurrently; retry to pick up the result",
                        property_id,
                        period
                    ))));
                }
                result => return result,
            }
        }
    }

    async fn attempt(
        &self,
        property_id: Uuid,
        period: BillingPeriod,
    ) -> Result<GenerationOutcome, BillingError> {
        let property = self
            .store
            .get_property(property_id)
            .await?
            .ok_or(BillingError::PropertyNotFound(property_id))?;

        let snapshots = self.store.get_units_for_property(property_id, period).await?;

        let mut skipped_units = Vec::new();
        let mut pending = Vec::new();
        for mut snapshot in snapshots {
            if snapshot.status != UnitStatus::Occupied {
                continue;
            }
            if self.store.bill_exists(snapshot.unit_id, period).await? {
                skipped_units.push(snapshot.unit_id);
                continue;
            }
            for utility in property.utilities.metered_kinds() {
                let window = self
                    .store
                    .get_reading(snapshot.unit_id, utility, period)
                    .await?;
                snapshot.set_readings(utility, window);
            }
            pending.push(snapshot);
        }

        let bills = generate_bills_for_period(&property, period, &pending, &HashSet::new())?;

        let created = if bills.is_empty() {
            Vec::new()
        } else {
            self.store.save_bills(&bills).await?
        };

        Ok(GenerationOutcome {
            property_id,
            period,
            created,
            skipped_units,
        })
    }

    /// Record payment of a bill (`unpaid -> paid`).
    #[instrument(skip(self), fields(bill_id = %bill_id))]
    pub async fn mark_paid(&self, bill_id: Uuid) -> Result<Bill, BillingError> {
        if let Some(bill) = self.store.mark_paid(bill_id, Utc::now()).await? {
            record_bill_paid();
            info!(unit_id = %bill.unit_id, period = %bill.period, "Bill marked paid");
            return Ok(bill);
        }

        match self.store.get_bill(bill_id).await? {
            Some(_) => Err(BillingError::AlreadyPaid(bill_id)),
            None => Err(BillingError::BillNotFound(bill_id)),
        }
    }
}

fn record_amounts(bills: &[Bill]) {
    let sum = |f: fn(&Bill) -> Decimal| -> f64 {
        bills
            .iter()
            .map(f)
            .fold(Decimal::ZERO, |acc, v| acc.saturating_add(v))
            .to_f64()
            .unwrap_or_default()
    };

    record_billed_amount("rent", sum(|b| b.rent_amount));
    record_billed_amount("water", sum(|b| b.water_charge));
    record_billed_amount("electricity", sum(|b| b.electricity_charge));
    record_billed_amount("garbage", sum(|b| b.garbage_charge));
    record_billed_amount("service", sum(|b| b.service_charge));
}
