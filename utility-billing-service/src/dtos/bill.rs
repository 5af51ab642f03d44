use crate::models::{Bill, BillStatus, BillingPeriod, ListBillsFilter};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct GenerateBillsRequest {
    pub property_id: Uuid,
    /// `YYYY-MM`; defaults to the current month.
    #[serde(default = "BillingPeriod::current")]
    pub period: BillingPeriod,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListBillsQuery {
    pub property_id: Option<Uuid>,
    pub period: Option<BillingPeriod>,
    pub status: Option<BillStatus>,
}

impl From<ListBillsQuery> for ListBillsFilter {
    fn from(query: ListBillsQuery) -> Self {
        ListBillsFilter {
            property_id: query.property_id,
            period: query.period,
            status: query.status,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ListBillsResponse {
    pub count: usize,
    pub total_amount: Decimal,
    pub bills: Vec<Bill>,
}

impl From<Vec<Bill>> for ListBillsResponse {
    fn from(bills: Vec<Bill>) -> Self {
        let total_amount = bills
            .iter()
            .fold(Decimal::ZERO, |acc, b| acc.saturating_add(b.total_amount));
        Self {
            count: bills.len(),
            total_amount,
            bills,
        }
    }
}
