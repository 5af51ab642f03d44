use super::{currency, invalid, not_blank};
use crate::billing::{validate_service_rate, validate_utilities};
use crate::models::{
    CreateProperty, CreateUnit, Property, ServiceRate, Unit, UnitStatus, UpdateOccupancy,
    UpdateProperty, UtilityConfig, UtilityKind,
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;
use validator::{Validate, ValidationError};

#[derive(Debug, Deserialize, Validate)]
#[validate(schema(function = "unique_unit_labels"))]
pub struct CreatePropertyRequest {
    #[validate(custom(function = "not_blank", message = "Property name is required"))]
    pub name: String,

    #[validate(custom(function = "not_blank", message = "Location is required"))]
    pub location: String,

    #[validate(custom(function = "check_utilities"))]
    pub utilities: UtilityConfig,

    #[validate(custom(function = "check_service_rate"))]
    pub service_rate: ServiceRate,

    #[validate(
        length(min = 1, message = "At least one unit group is required"),
        nested
    )]
    pub unit_groups: Vec<UnitGroupRequest>,
}

/// Units sharing a type, rent and deposit.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct UnitGroupRequest {
    #[validate(custom(function = "not_blank", message = "Unit type is required"))]
    pub unit_type: String,

    #[validate(custom(function = "currency"))]
    pub rent: Decimal,

    #[validate(custom(function = "currency"))]
    pub deposit: Decimal,

    #[validate(length(min = 1, message = "At least one unit is required"), nested)]
    pub units: Vec<UnitEntryRequest>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
#[validate(schema(function = "occupied_unit_has_tenant"))]
pub struct UnitEntryRequest {
    #[validate(custom(function = "not_blank", message = "Unit number is required"))]
    pub unit_label: String,

    #[serde(default = "vacant")]
    pub status: UnitStatus,

    pub tenant_name: Option<String>,

    pub occupied_since: Option<NaiveDate>,
}

fn vacant() -> UnitStatus {
    UnitStatus::Vacant
}

fn check_utilities(config: &UtilityConfig) -> Result<(), ValidationError> {
    validate_utilities(config).map_err(|e| invalid("utilities", e.to_string()))
}

fn check_service_rate(rate: &ServiceRate) -> Result<(), ValidationError> {
    validate_service_rate(rate).map_err(|e| invalid("service_rate", e.to_string()))
}

fn has_tenant(tenant_name: Option<&str>) -> bool {
    tenant_name.is_some_and(|name| !name.trim().is_empty())
}

fn occupied_unit_has_tenant(entry: &UnitEntryRequest) -> Result<(), ValidationError> {
    if entry.status == UnitStatus::Occupied && !has_tenant(entry.tenant_name.as_deref()) {
        return Err(invalid(
            "tenant_required",
            format!("Occupied unit {} needs a tenant name", entry.unit_label),
        ));
    }
    Ok(())
}

fn unique_unit_labels(request: &CreatePropertyRequest) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    for entry in request.unit_groups.iter().flat_map(|g| g.units.iter()) {
        if !seen.insert(entry.unit_label.trim()) {
            return Err(invalid(
                "duplicate_unit",
                format!("Unit number {} is used more than once", entry.unit_label.trim()),
            ));
        }
    }
    Ok(())
}

impl CreatePropertyRequest {
    /// Flatten unit groups into one unit list.
    pub fn into_command(self) -> CreateProperty {
        let units = self
            .unit_groups
            .into_iter()
            .flat_map(|group| {
                let UnitGroupRequest {
                    unit_type,
                    rent,
                    deposit,
                    units,
                } = group;
                units.into_iter().map(move |entry| {
                    let occupied = entry.status == UnitStatus::Occupied;
                    CreateUnit {
                        unit_label: entry.unit_label.trim().to_string(),
                        unit_type: unit_type.trim().to_string(),
                        rent,
                        deposit,
                        status: entry.status,
                        tenant_name: entry
                            .tenant_name
                            .filter(|_| occupied)
                            .map(|name| name.trim().to_string()),
                        occupied_since: entry.occupied_since.filter(|_| occupied),
                    }
                })
            })
            .collect();

        CreateProperty {
            name: self.name.trim().to_string(),
            location: self.location.trim().to_string(),
            utilities: self.utilities,
            service_rate: self.service_rate,
            units,
        }
    }
}

/// Edit a property's name, location and billing settings.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePropertyRequest {
    #[validate(custom(function = "not_blank", message = "Property name is required"))]
    pub name: String,

    #[validate(custom(function = "not_blank", message = "Location is required"))]
    pub location: String,

    #[validate(custom(function = "check_utilities"))]
    pub utilities: UtilityConfig,

    #[validate(custom(function = "check_service_rate"))]
    pub service_rate: ServiceRate,
}

impl UpdatePropertyRequest {
    pub fn into_command(self) -> UpdateProperty {
        UpdateProperty {
            name: self.name.trim().to_string(),
            location: self.location.trim().to_string(),
            utilities: self.utilities,
            service_rate: self.service_rate,
        }
    }
}

/// Units of one property, optionally only those billed by meter for
/// `metered`.
#[derive(Debug, Deserialize)]
pub struct UnitsQuery {
    pub property_id: Uuid,
    pub metered: Option<UtilityKind>,
}

#[derive(Debug, Serialize)]
pub struct PropertyResponse {
    pub property: Property,
    pub units: Vec<Unit>,
}

/// Assign a tenant (`occupied`) or vacate a unit.
#[derive(Debug, Deserialize, Validate)]
#[validate(schema(function = "occupancy_has_tenant"))]
pub struct OccupancyRequest {
    pub status: UnitStatus,
    pub tenant_name: Option<String>,
    /// Defaults to today when occupying.
    pub occupied_since: Option<NaiveDate>,
}

fn occupancy_has_tenant(request: &OccupancyRequest) -> Result<(), ValidationError> {
    if request.status == UnitStatus::Occupied && !has_tenant(request.tenant_name.as_deref()) {
        return Err(invalid(
            "tenant_required",
            "A tenant name is required to occupy a unit".to_string(),
        ));
    }
    Ok(())
}

impl OccupancyRequest {
    pub fn into_update(self) -> UpdateOccupancy {
        match (self.status, self.tenant_name) {
            (UnitStatus::Occupied, Some(tenant_name)) => UpdateOccupancy::Occupy {
                tenant_name: tenant_name.trim().to_string(),
                since: self
                    .occupied_since
                    .unwrap_or_else(|| Utc::now().date_naive()),
            },
            _ => UpdateOccupancy::Vacate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(body: serde_json::Value) -> CreatePropertyRequest {
        serde_json::from_value(body).unwrap()
    }

    fn valid_body() -> serde_json::Value {
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
                    { "unit_label": "A1", "status": "occupied", "tenant_name": "Jane" },
                    { "unit_label": "A2" }
                ]
            }]
        })
    }

    #[test]
    fn test_valid_request_flattens_groups() {
        let req = request(valid_body());
        assert!(req.validate().is_ok());

        let cmd = req.into_command();
        assert_eq!(cmd.units.len(), 2);
        assert_eq!(cmd.units[0].unit_type, "1br");
        assert_eq!(cmd.units[0].tenant_name.as_deref(), Some("Jane"));
        assert_eq!(cmd.units[1].status, UnitStatus::Vacant);
        assert_eq!(cmd.units[1].rent, Decimal::from(15000));
    }

    #[test]
    fn test_blank_name_rejected() {
        let mut body = valid_body();
        body["name"] = json!("  ");
        assert!(request(body).validate().is_err());
    }

    #[test]
    fn test_negative_rent_rejected() {
        let mut body = valid_body();
        body["unit_groups"][0]["rent"] = json!("-1");
        assert!(request(body).validate().is_err());
    }

    #[test]
    fn test_rent_with_fractional_cents_rejected() {
        let mut body = valid_body();
        body["unit_groups"][0]["rent"] = json!("15000.555");
        assert!(request(body).validate().is_err());

        let mut body = valid_body();
        body["unit_groups"][0]["rent"] = json!("15000.50");
        assert!(request(body).validate().is_ok());
    }

    #[test]
    fn test_amounts_beyond_storage_range_rejected() {
        let mut body = valid_body();
        body["unit_groups"][0]["deposit"] = json!("10000000000000");
        assert!(request(body).validate().is_err());

        let mut body = valid_body();
        body["utilities"]["garbage"] = json!({ "billing": "fixed", "amount": "10000000000000" });
        assert!(request(body).validate().is_err());
    }

    #[test]
    fn test_cost_per_unit_precision() {
        let mut body = valid_body();
        body["utilities"]["water"] = json!({ "billing": "metered", "cost_per_unit": "150.1234" });
        assert!(request(body).validate().is_ok());

        let mut body = valid_body();
        body["utilities"]["water"] = json!({ "billing": "metered", "cost_per_unit": "150.12345" });
        assert!(request(body).validate().is_err());
    }

    #[test]
    fn test_update_property_request() {
        let body = json!({
            "name": " Sunrise Court ",
            "location": "Westlands",
            "utilities": {
                "water": { "billing": "fixed", "amount": "300" },
                "electricity": { "billing": "free" },
                "garbage": { "billing": "free" }
            },
            "service_rate": { "type": "fixed", "value": "250" }
        });
        let req: UpdatePropertyRequest = serde_json::from_value(body.clone()).unwrap();
        assert!(req.validate().is_ok());
        let cmd = req.into_command();
        assert_eq!(cmd.name, "Sunrise Court");
        assert!(cmd.utilities.metered_kinds().is_empty());

        let mut bad = body;
        bad["service_rate"] = json!({ "type": "fixed", "value": "250.001" });
        let req: UpdatePropertyRequest = serde_json::from_value(bad).unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_negative_cost_per_unit_rejected() {
        let mut body = valid_body();
        body["utilities"]["water"] = json!({ "billing": "metered", "cost_per_unit": "-5" });
        assert!(request(body).validate().is_err());
    }

    #[test]
    fn test_group_without_units_rejected() {
        let mut body = valid_body();
        body["unit_groups"][0]["units"] = json!([]);
        assert!(request(body).validate().is_err());
    }

    #[test]
    fn test_duplicate_labels_rejected() {
        let mut body = valid_body();
        body["unit_groups"][0]["units"][1]["unit_label"] = json!("A1");
        assert!(request(body).validate().is_err());
    }

    #[test]
    fn test_occupied_unit_needs_tenant() {
        let mut body = valid_body();
        body["unit_groups"][0]["units"][1]["status"] = json!("occupied");
        assert!(request(body).validate().is_err());
    }

    #[test]
    fn test_occupancy_request() {
        let vacate: OccupancyRequest = serde_json::from_value(json!({ "status": "vacant" })).unwrap();
        assert!(vacate.validate().is_ok());
        assert_eq!(vacate.into_update(), UpdateOccupancy::Vacate);

        let missing: OccupancyRequest =
            serde_json::from_value(json!({ "status": "occupied" })).unwrap();
        assert!(missing.validate().is_err());

        let occupy: OccupancyRequest = serde_json::from_value(json!({
            "status": "occupied",
            "tenant_name": "Jane",
            "occupied_since": "2025-03-01"
        }))
        .unwrap();
        assert_eq!(
            occupy.into_update(),
            UpdateOccupancy::Occupy {
                tenant_name: "Jane".to_string(),
                since: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            }
        );
    }
}
