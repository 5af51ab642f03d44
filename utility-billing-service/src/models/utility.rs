//! Utility billing configuration for a property.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The utilities a property can charge for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UtilityKind {
    Water,
    Electricity,
    Garbage,
}

impl UtilityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            UtilityKind::Water => "water",
            UtilityKind::Electricity => "electricity",
            UtilityKind::Garbage => "garbage",
        }
    }

    pub fn from_string(s: &str) -> Option<Self> {
        match s {
            "water" => Some(UtilityKind::Water),
            "electricity" => Some(UtilityKind::Electricity),
            "garbage" => Some(UtilityKind::Garbage),
            _ => None,
        }
    }

    /// Whether a meter can exist for this utility.
    pub fn is_meterable(&self) -> bool {
        !matches!(self, UtilityKind::Garbage)
    }
}

impl fmt::Display for UtilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a meterable utility (water, electricity) is charged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "billing", rename_all = "snake_case")]
pub enum BillingMode {
    Fixed { amount: Decimal },
    Metered { cost_per_unit: Decimal },
    Free,
}

impl BillingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillingMode::Fixed { .. } => "fixed",
            BillingMode::Metered { .. } => "metered",
            BillingMode::Free => "free",
        }
    }

    pub fn is_metered(&self) -> bool {
        matches!(self, BillingMode::Metered { .. })
    }

    /// Rebuild a mode from its stored columns.
    pub fn from_columns(
        mode: &str,
        amount: Option<Decimal>,
        cost_per_unit: Option<Decimal>,
    ) -> Option<Self> {
        match mode {
            "fixed" => amount.map(|amount| BillingMode::Fixed { amount }),
            "metered" => cost_per_unit.map(|cost_per_unit| BillingMode::Metered { cost_per_unit }),
            "free" => Some(BillingMode::Free),
            _ => None,
        }
    }

    /// `(mode, amount, cost_per_unit)` as stored.
    pub fn to_columns(&self) -> (&'static str, Option<Decimal>, Option<Decimal>) {
        match *self {
            BillingMode::Fixed { amount } => ("fixed", Some(amount), None),
            BillingMode::Metered { cost_per_unit } => ("metered", None, Some(cost_per_unit)),
            BillingMode::Free => ("free", None, None),
        }
    }
}

/// How garbage collection is charged. It is never metered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "billing", rename_all = "snake_case")]
pub enum FlatBillingMode {
    Fixed { amount: Decimal },
    Free,
}

impl FlatBillingMode {
    pub fn from_columns(mode: &str, amount: Option<Decimal>) -> Option<Self> {
        match mode {
            "fixed" => amount.map(|amount| FlatBillingMode::Fixed { amount }),
            "free" => Some(FlatBillingMode::Free),
            _ => None,
        }
    }

    pub fn to_columns(&self) -> (&'static str, Option<Decimal>) {
        match *self {
            FlatBillingMode::Fixed { amount } => ("fixed", Some(amount)),
            FlatBillingMode::Free => ("free", None),
        }
    }
}

impl From<FlatBillingMode> for BillingMode {
    fn from(mode: FlatBillingMode) -> Self {
        match mode {
            FlatBillingMode::Fixed { amount } => BillingMode::Fixed { amount },
            FlatBillingMode::Free => BillingMode::Free,
        }
    }
}

/// Per-utility billing configuration of a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtilityConfig {
    pub water: BillingMode,
    pub electricity: BillingMode,
    pub garbage: FlatBillingMode,
}

impl UtilityConfig {
    pub fn mode_for(&self, kind: UtilityKind) -> BillingMode {
        match kind {
            UtilityKind::Water => self.water,
            UtilityKind::Electricity => self.electricity,
            UtilityKind::Garbage => self.garbage.into(),
        }
    }

    /// Utilities billed from meter readings.
    pub fn metered_kinds(&self) -> Vec<UtilityKind> {
        [UtilityKind::Water, UtilityKind::Electricity]
            .into_iter()
            .filter(|kind| self.mode_for(*kind).is_metered())
            .collect()
    }
}

/// Management fee layered on top of rent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServiceRate {
    /// Percent of the base amount, e.g. `10` for 10%.
    Percentage { value: Decimal },
    Fixed { value: Decimal },
}

impl ServiceRate {
    pub fn value(&self) -> Decimal {
        match *self {
            ServiceRate::Percentage { value } | ServiceRate::Fixed { value } => value,
        }
    }

    pub fn kind_str(&self) -> &'static str {
        match self {
            ServiceRate::Percentage { .. } => "percentage",
            ServiceRate::Fixed { .. } => "fixed",
        }
    }

    pub fn from_columns(kind: &str, value: Decimal) -> Option<Self> {
        match kind {
            "percentage" => Some(ServiceRate::Percentage { value }),
            "fixed" => Some(ServiceRate::Fixed { value }),
            _ => None,
        }
    }
}
