//! Bill generation for one property and period.

use crate::billing::charges::{
    compute_service_charge, compute_utility_charge, validate_service_rate, validate_utilities,
};
use crate::billing::limits::CURRENCY;
use crate::billing::{BillingError, UnitFailure};
use crate::models::{
    BillingMode, BillingPeriod, NewBill, Property, UnitSnapshot, UnitStatus, UtilityKind,
};
use rust_decimal::Decimal;
use std::collections::HashSet;
use uuid::Uuid;

/// Units consumed for `utility`, or `None` when it is not metered.
fn metered_consumption(
    mode: &BillingMode,
    snapshot: &UnitSnapshot,
    utility: UtilityKind,
    period: BillingPeriod,
) -> Result<Option<Decimal>, BillingError> {
    if !mode.is_metered() {
        return Ok(None);
    }
    snapshot
        .readings(utility)
        .consumption(snapshot.unit_id, utility, period)
        .map(Some)
}

/// Compute the bill for a single occupied unit.
pub fn compute_bill(
    property: &Property,
    period: BillingPeriod,
    snapshot: &UnitSnapshot,
) -> Result<NewBill, BillingError> {
    CURRENCY.check(&format!("unit {}: rent", snapshot.unit_id), snapshot.rent)?;

    let utilities = &property.utilities;
    let garbage_mode = BillingMode::from(utilities.garbage);

    let water_consumption =
        metered_consumption(&utilities.water, snapshot, UtilityKind::Water, period)?;
    let electricity_consumption = metered_consumption(
        &utilities.electricity,
        snapshot,
        UtilityKind::Electricity,
        period,
    )?;

    let water_charge = compute_utility_charge(
        &utilities.water,
        water_consumption.unwrap_or(Decimal::ZERO),
    )?;
    let electricity_charge = compute_utility_charge(
        &utilities.electricity,
        electricity_consumption.unwrap_or(Decimal::ZERO),
    )?;
    let garbage_charge = compute_utility_charge(&garbage_mode, Decimal::ZERO)?;
    let service_charge = compute_service_charge(&property.service_rate, snapshot.rent)?;

    let total_amount = [water_charge, electricity_charge, garbage_charge, service_charge]
        .into_iter()
        .try_fold(snapshot.rent, |acc, charge| acc.checked_add(charge))
        .ok_or_else(|| {
            BillingError::InvalidInput(format!(
                "unit {}: bill total overflows the currency range",
                snapshot.unit_id
            ))
        })?;
    CURRENCY.check(
        &format!("unit {}: bill total", snapshot.unit_id),
        total_amount,
    )?;

    Ok(NewBill {
        property_id: property.property_id,
        unit_id: snapshot.unit_id,
        unit_label: snapshot.unit_label.clone(),
        tenant_name: snapshot.tenant_name.clone(),
        period,
        rent_amount: snapshot.rent,
        water_consumption,
        electricity_consumption,
        water_charge,
        garbage_charge,
        electricity_charge,
        service_charge,
        total_amount,
    })
}

/// Produce one bill per occupied unit.
///
/// Vacant units are skipped. Units in `already_billed`, or listed twice,
/// fail with [`BillingError::DuplicatePeriod`]. The batch is atomic: if any
/// occupied unit fails, every failure is returned in
/// [`BillingError::Batch`] and no bills are produced.
pub fn generate_bills_for_period(
    property: &Property,
    period: BillingPeriod,
    snapshots: &[UnitSnapshot],
    already_billed: &HashSet<Uuid>,
) -> Result<Vec<NewBill>, BillingError> {
    validate_utilities(&property.utilities)?;
    validate_service_rate(&property.service_rate)?;

    let mut seen = HashSet::new();
    let mut bills = Vec::new();
    let mut failures = Vec::new();

    for snapshot in snapshots
        .iter()
        .filter(|s| s.status == UnitStatus::Occupied)
    {
        let duplicate =
            already_billed.contains(&snapshot.unit_id) || !seen.insert(snapshot.unit_id);

        let result = if duplicate {
            Err(BillingError::DuplicatePeriod {
                unit_id: snapshot.unit_id,
                period,
            })
        } else {
            compute_bill(property, period, snapshot)
        };

        match result {
            Ok(bill) => bills.push(bill),
            Err(error) => failures.push(UnitFailure {
                unit_id: snapshot.unit_id,
                error,
            }),
        }
    }

    if !failures.is_empty() {
        return Err(BillingError::Batch(failures));
    }

    Ok(bills)
}
