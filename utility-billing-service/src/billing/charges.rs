//! Per-utility and service charge computation.

use crate::billing::limits::{CURRENCY, RATE};
use crate::billing::BillingError;
use crate::models::{BillingMode, ServiceRate, UtilityConfig, UtilityKind};
use rust_decimal::{Decimal, RoundingStrategy};

/// Charges are kept in currency minor units (cents).
const CURRENCY_SCALE: u32 = 2;

pub(crate) fn round_currency(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(CURRENCY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

fn overflow(what: &str) -> BillingError {
    BillingError::InvalidInput(format!("{} overflows the currency range", what))
}

/// Charge for one utility given the units consumed in the period.
///
/// `consumption` is only read for metered utilities; fixed utilities return
/// their amount whatever the consumption (no pro-rating).
pub fn compute_utility_charge(
    mode: &BillingMode,
    consumption: Decimal,
) -> Result<Decimal, BillingError> {
    match *mode {
        BillingMode::Fixed { amount } => Ok(amount),
        BillingMode::Metered { cost_per_unit } => {
            if consumption.is_sign_negative() && !consumption.is_zero() {
                return Err(BillingError::InvalidInput(format!(
                    "consumption must not be negative, got {}",
                    consumption
                )));
            }
            cost_per_unit
                .checked_mul(consumption)
                .map(round_currency)
                .ok_or_else(|| overflow("metered charge"))
        }
        BillingMode::Free => Ok(Decimal::ZERO),
    }
}

/// Management fee on top of `base_amount` (the unit's rent).
pub fn compute_service_charge(
    rate: &ServiceRate,
    base_amount: Decimal,
) -> Result<Decimal, BillingError> {
    match *rate {
        ServiceRate::Percentage { value } => base_amount
            .checked_mul(value)
            .and_then(|v| v.checked_div(Decimal::ONE_HUNDRED))
            .map(round_currency)
            .ok_or_else(|| overflow("service charge")),
        ServiceRate::Fixed { value } => Ok(value),
    }
}

/// Reject configurations with negative, over-precise or out of range
/// amounts and rates.
pub fn validate_utilities(config: &UtilityConfig) -> Result<(), BillingError> {
    for kind in [
        UtilityKind::Water,
        UtilityKind::Electricity,
        UtilityKind::Garbage,
    ] {
        match config.mode_for(kind) {
            BillingMode::Fixed { amount } => {
                CURRENCY.check(&format!("{} amount", kind), amount)?
            }
            BillingMode::Metered { cost_per_unit } => {
                RATE.check(&format!("{} cost per unit", kind), cost_per_unit)?
            }
            BillingMode::Free => {}
        }
    }
    Ok(())
}

/// A fixed fee is an amount of money; a percentage is a rate.
pub fn validate_service_rate(rate: &ServiceRate) -> Result<(), BillingError> {
    match *rate {
        ServiceRate::Percentage { value } => RATE.check("percentage service rate", value),
        ServiceRate::Fixed { value } => CURRENCY.check("fixed service rate", value),
    }
}
