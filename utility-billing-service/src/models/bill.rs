//! Bill model.

use crate::models::BillingPeriod;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Bill payment status. Only `unpaid -> paid` is allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillStatus {
    Unpaid,
    Paid,
}

impl BillStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillStatus::Unpaid => "unpaid",
            BillStatus::Paid => "paid",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "paid" => BillStatus::Paid,
            _ => BillStatus::Unpaid,
        }
    }
}

/// Computed bill for one occupied unit, not yet persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBill {
    pub property_id: Uuid,
    pub unit_id: Uuid,
    pub unit_label: String,
    pub tenant_name: Option<String>,
    pub period: BillingPeriod,
    pub rent_amount: Decimal,
    pub water_consumption: Option<Decimal>,
    pub electricity_consumption: Option<Decimal>,
    pub water_charge: Decimal,
    pub garbage_charge: Decimal,
    pub electricity_charge: Decimal,
    pub service_charge: Decimal,
    pub total_amount: Decimal,
}

/// Persisted bill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bill {
    pub bill_id: Uuid,
    pub property_id: Uuid,
    pub unit_id: Uuid,
    pub unit_label: String,
    pub tenant_name: Option<String>,
    pub period: BillingPeriod,
    pub rent_amount: Decimal,
    pub water_consumption: Option<Decimal>,
    pub electricity_consumption: Option<Decimal>,
    pub water_charge: Decimal,
    pub garbage_charge: Decimal,
    pub electricity_charge: Decimal,
    pub service_charge: Decimal,
    pub total_amount: Decimal,
    pub status: BillStatus,
    pub created_utc: DateTime<Utc>,
    pub paid_utc: Option<DateTime<Utc>>,
}

impl Bill {
    /// Materialise a computed bill as a new unpaid record.
    pub fn from_new(bill: NewBill, created_utc: DateTime<Utc>) -> Self {
        Self {
            bill_id: Uuid::new_v4(),
            property_id: bill.property_id,
            unit_id: bill.unit_id,
            unit_label: bill.unit_label,
            tenant_name: bill.tenant_name,
            period: bill.period,
            rent_amount: bill.rent_amount,
            water_consumption: bill.water_consumption,
            electricity_consumption: bill.electricity_consumption,
            water_charge: bill.water_charge,
            garbage_charge: bill.garbage_charge,
            electricity_charge: bill.electricity_charge,
            service_charge: bill.service_charge,
            total_amount: bill.total_amount,
            status: BillStatus::Unpaid,
            created_utc,
            paid_utc: None,
        }
    }
}

/// Filter parameters for listing bills.
#[derive(Debug, Clone, Default)]
pub struct ListBillsFilter {
    pub property_id: Option<Uuid>,
    pub period: Option<BillingPeriod>,
    pub status: Option<BillStatus>,
}
