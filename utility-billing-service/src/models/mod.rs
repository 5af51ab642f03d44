//! Domain models for utility-billing-service.

mod bill;
mod period;
mod property;
mod reading;
mod utility;

pub use bill::{Bill, BillStatus, ListBillsFilter, NewBill};
pub use period::{BillingPeriod, ParsePeriodError};
pub use property::{
    CreateProperty, CreateUnit, Property, ReadingWindow, Unit, UnitSnapshot, UnitStatus,
    UpdateOccupancy, UpdateProperty,
};
pub use reading::{ListReadingsFilter, MeterReading, RecordReading};
pub use utility::{BillingMode, FlatBillingMode, ServiceRate, UtilityConfig, UtilityKind};
