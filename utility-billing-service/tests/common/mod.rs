//! Test helper module for utility-billing-service integration tests.
//!
//! The default `TestApp` runs on the in-memory store. PostgreSQL-backed
//! helpers are used only when `TEST_DATABASE_URL` is set.

#![allow(dead_code)]

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use service_core::config::Config as CoreConfig;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use utility_billing_service::config::BillingConfig;
use utility_billing_service::models::{
    BillingMode, BillingPeriod, CreateProperty, CreateUnit, FlatBillingMode, Property,
    ReadingWindow, ServiceRate, UnitSnapshot, UnitStatus, UtilityConfig,
};
use utility_billing_service::services::{init_metrics, BillingStore, Database, InMemoryStore};
use utility_billing_service::startup::Application;
use uuid::Uuid;

static SCHEMA_COUNTER: AtomicU32 = AtomicU32::new(0);

pub fn d(s: &str) -> Decimal {
    s.parse().expect("valid decimal")
}

pub fn period(s: &str) -> BillingPeriod {
    s.parse().expect("valid period")
}

pub fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 12, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub fn test_config() -> BillingConfig {
    BillingConfig {
        common: CoreConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        service_name: "utility-billing-service-test".to_string(),
        service_version: "0.1.0".to_string(),
        log_level: "warn".to_string(),
        otlp_endpoint: None,
        database: None,
    }
}

/// Metered water at 150/unit, fixed electricity 800, fixed garbage 500,
/// 10% service on rent.
pub fn sample_utilities() -> UtilityConfig {
    UtilityConfig {
        water: BillingMode::Metered {
            cost_per_unit: d("150"),
        },
        electricity: BillingMode::Fixed { amount: d("800") },
        garbage: FlatBillingMode::Fixed { amount: d("500") },
    }
}

pub fn sample_property() -> Property {
    Property {
        property_id: Uuid::new_v4(),
        name: "Sunrise Apartments".to_string(),
        location: "Westlands".to_string(),
        utilities: sample_utilities(),
        service_rate: ServiceRate::Percentage { value: d("10") },
        created_utc: Utc::now(),
        updated_utc: Utc::now(),
    }
}

pub fn snapshot(label: &str, status: UnitStatus, rent: &str, water: ReadingWindow) -> UnitSnapshot {
    UnitSnapshot {
        unit_id: Uuid::new_v4(),
        unit_label: label.to_string(),
        tenant_name: (status == UnitStatus::Occupied).then(|| format!("Tenant {}", label)),
        rent: d(rent),
        status,
        water,
        electricity: ReadingWindow::default(),
    }
}

/// Two occupied units and one vacant unit, all at rent 15000.
pub fn sample_create_property() -> CreateProperty {
    let unit = |label: &str, status: UnitStatus| CreateUnit {
        unit_label: label.to_string(),
        unit_type: "1br".to_string(),
        rent: d("15000"),
        deposit: d("15000"),
        status,
        tenant_name: (status == UnitStatus::Occupied).then(|| format!("Tenant {}", label)),
        occupied_since: (status == UnitStatus::Occupied)
            .then(|| NaiveDate::from_ymd_opt(2024, 1, 1).expect("valid date")),
    };

    CreateProperty {
        name: "Sunrise Apartments".to_string(),
        location: "Westlands".to_string(),
        utilities: sample_utilities(),
        service_rate: ServiceRate::Percentage { value: d("10") },
        units: vec![
            unit("A1", UnitStatus::Occupied),
            unit("A2", UnitStatus::Occupied),
            unit("A3", UnitStatus::Vacant),
        ],
    }
}

/// Request body equivalent to [`sample_create_property`].
pub fn property_body() -> Value {
    json!({
        "name": "Sunrise Apartments",
        "location": "Westlands",
        "utilities": {
            "water": { "billing": "metered", "cost_per_unit": "150" },
            "electricity": { "billing": "fixed", "amount": "800" },
            "garbage": { "billing": "fixed", "amount": "500" }
        },
        "service_rate": { "type": "percentage", "value": "10" },
        "unit_groups": [{
            "unit_type": "1br",
            "rent": "15000",
            "deposit": "15000",
            "units": [
                { "unit_label": "A1", "status": "occupied", "tenant_name": "Jane", "occupied_since": "2024-01-01" },
                { "unit_label": "A2", "status": "occupied", "tenant_name": "John", "occupied_since": "2024-01-01" },
                { "unit_label": "A3" }
            ]
        }]
    })
}

/// Test application wrapper for integration tests.
pub struct TestApp {
    pub http_address: String,
    pub http_port: u16,
    pub store: Arc<dyn BillingStore>,
    pub client: reqwest::Client,
}

impl TestApp {
    /// Spawn the application on a random port with a fresh in-memory store.
    pub async fn spawn() -> Self {
        Self::spawn_with_store(Arc::new(InMemoryStore::new())).await
    }

    pub async fn spawn_with_store(store: Arc<dyn BillingStore>) -> Self {
        init_metrics();

        let app = Application::with_store(test_config(), store)
            .await
            .expect("Failed to build test application");

        let http_port = app.http_port();
        let store = app.store();
        let http_address = format!("http://127.0.0.1:{}", http_port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        let client = reqwest::Client::new();
        let health_url = format!("{}/health", http_address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        }

        TestApp {
            http_address,
            http_port,
            store,
            client,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.http_address, path)
    }

    pub async fn post_json(&self, path: &str, body: &Value) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn put_json(&self, path: &str, body: &Value) -> reqwest::Response {
        self.client
            .put(self.url(path))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Create the sample property; returns the response body.
    pub async fn create_property(&self) -> Value {
        let response = self.post_json("/api/properties", &property_body()).await;
        assert_eq!(response.status().as_u16(), 201);
        response.json().await.expect("Failed to parse JSON")
    }

    pub async fn record_reading(
        &self,
        unit_id: &str,
        utility: &str,
        reading: &str,
        recorded_utc: DateTime<Utc>,
    ) -> reqwest::Response {
        self.post_json(
            "/api/meter-readings",
            &json!({
                "unit_id": unit_id,
                "utility": utility,
                "reading": reading,
                "recorded_utc": recorded_utc
            }),
        )
        .await
    }

    pub async fn generate(&self, property_id: &str, period: &str) -> reqwest::Response {
        self.post_json(
            "/api/bills/generate",
            &json!({ "property_id": property_id, "period": period }),
        )
        .await
    }
}

/// Unit id by label from a property response body.
pub fn unit_id(property: &Value, label: &str) -> String {
    property["units"]
        .as_array()
        .expect("units array")
        .iter()
        .find(|u| u["unit_label"] == label)
        .and_then(|u| u["unit_id"].as_str())
        .expect("unit present")
        .to_string()
}

pub fn get_test_database_url() -> Option<String> {
    std::env::var("TEST_DATABASE_URL").ok()
}

/// A migrated PostgreSQL store in its own schema, or `None` when
/// `TEST_DATABASE_URL` is not set.
pub async fn postgres_store() -> Option<Database> {
    let base_url = get_test_database_url()?;
    let counter = SCHEMA_COUNTER.fetch_add(1, Ordering::SeqCst);
    let schema_name = format!("test_utility_billing_{}_{}", std::process::id(), counter);

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(1)
        .connect(&base_url)
        .await
        .expect("Failed to connect to test database");
    sqlx::query(&format!("DROP SCHEMA IF EXISTS {} CASCADE", schema_name))
        .execute(&pool)
        .await
        .ok();
    sqlx::query(&format!("CREATE SCHEMA {}", schema_name))
        .execute(&pool)
        .await
        .expect("Failed to create test schema");
    pool.close().await;

    let separator = if base_url.contains('?') { "&" } else { "?" };
    let url = format!(
        "{}{}options=-c search_path%3D{}",
        base_url, separator, schema_name
    );

    let db = Database::new(&url, 5, 1)
        .await
        .expect("Failed to create test database");
    db.run_migrations().await.expect("Failed to run migrations");
    Some(db)
}
