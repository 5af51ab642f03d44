//! Precision and range accepted for stored decimals.

use crate::billing::BillingError;
use rust_decimal::Decimal;

/// Maximum fractional digits and integer digits of a decimal column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecimalLimits {
    pub scale: u32,
    pub integer_digits: u32,
}

/// Rent, deposits, fixed amounts and bill lines: `NUMERIC(14, 2)`.
pub const CURRENCY: DecimalLimits = DecimalLimits {
    scale: 2,
    integer_digits: 12,
};

/// Cost per unit and service rates: `NUMERIC(14, 4)`.
pub const RATE: DecimalLimits = DecimalLimits {
    scale: 4,
    integer_digits: 10,
};

/// Cumulative meter readings: `NUMERIC(14, 3)`.
pub const METER_READING: DecimalLimits = DecimalLimits {
    scale: 3,
    integer_digits: 11,
};

impl DecimalLimits {
    /// Exclusive upper bound.
    pub fn max(&self) -> Decimal {
        Decimal::from(10u64.pow(self.integer_digits))
    }

    /// Non-negative, at most `scale` decimal places and below [`Self::max`].
    /// Trailing zeros do not count towards the scale.
    pub fn check(&self, label: &str, value: Decimal) -> Result<(), BillingError> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(BillingError::InvalidInput(format!(
                "{} must not be negative, got {}",
                label, value
            )));
        }
        if value.normalize().scale() > self.scale {
            return Err(BillingError::InvalidInput(format!(
                "{} allows at most {} decimal places, got {}",
                label, self.scale, value
            )));
        }
        if value >= self.max() {
            return Err(BillingError::InvalidInput(format!(
                "{} must be below {}, got {}",
                label,
                self.max(),
                value
            )));
        }
        Ok(())
    }
}
