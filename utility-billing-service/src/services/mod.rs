//! Services module for utility-billing-service.

pub mod database;
pub mod generator;
pub mod memory;
pub mod metrics;
pub mod store;

pub use database::Database;
pub use generator::{BillGenerator, GenerationOutcome};
pub use memory::InMemoryStore;
pub use metrics::{get_metrics, init_metrics};
pub use store::{BillStore, BillingStore, MeterReadingStore, PropertyStore};
