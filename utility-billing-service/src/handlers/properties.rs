use crate::billing::BillingError;
use crate::dtos::{
    CreatePropertyRequest, OccupancyRequest, PropertyResponse, UnitsQuery, UpdatePropertyRequest,
};
use crate::models::{Property, Unit};
use crate::startup::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;
use validator::Validate;

#[tracing::instrument(skip(state, request), fields(name = %request.name))]
pub async fn create_property(
    State(state): State<AppState>,
    Json(request): Json<CreatePropertyRequest>,
) -> Result<(StatusCode, Json<PropertyResponse>), AppError> {
    request.validate()?;

    let (property, units) = state.store.create_property(&request.into_command()).await?;

    Ok((StatusCode::CREATED, Json(PropertyResponse { property, units })))
}

#[tracing::instrument(skip(state))]
pub async fn get_property(
    State(state): State<AppState>,
    Path(property_id): Path<Uuid>,
) -> Result<Json<PropertyResponse>, AppError> {
    let property = state
        .store
        .get_property(property_id)
        .await?
        .ok_or(BillingError::PropertyNotFound(property_id))?;
    let units = state.store.list_units(property_id).await?;

    Ok(Json(PropertyResponse { property, units }))
}

#[tracing::instrument(skip(state))]
pub async fn list_properties(
    State(state): State<AppState>,
) -> Result<Json<Vec<Property>>, AppError> {
    Ok(Json(state.store.list_properties().await?))
}

/// Replace name, location and billing settings. Bills already generated
/// keep the amounts they were computed with.
#[tracing::instrument(skip(state, request))]
pub async fn update_property(
    State(state): State<AppState>,
    Path(property_id): Path<Uuid>,
    Json(request): Json<UpdatePropertyRequest>,
) -> Result<Json<PropertyResponse>, AppError> {
    request.validate()?;

    let property = state
        .store
        .update_property(property_id, &request.into_command())
        .await?
        .ok_or(BillingError::PropertyNotFound(property_id))?;
    let units = state.store.list_units(property_id).await?;

    Ok(Json(PropertyResponse { property, units }))
}

/// Units of a property; with `metered`, only those needing readings for
/// that utility.
#[tracing::instrument(skip(state, query), fields(property_id = %query.property_id))]
pub async fn list_units(
    State(state): State<AppState>,
    Query(query): Query<UnitsQuery>,
) -> Result<Json<Vec<Unit>>, AppError> {
    let property = state
        .store
        .get_property(query.property_id)
        .await?
        .ok_or(BillingError::PropertyNotFound(query.property_id))?;

    let units = match query.metered {
        Some(utility) => state.store.list_metered_units(&property, utility).await?,
        None => state.store.list_units(property.property_id).await?,
    };
    Ok(Json(units))
}

#[tracing::instrument(skip(state, request))]
pub async fn update_occupancy(
    State(state): State<AppState>,
    Path(unit_id): Path<Uuid>,
    Json(request): Json<OccupancyRequest>,
) -> Result<Json<Unit>, AppError> {
    request.validate()?;

    let unit = state
        .store
        .update_occupancy(unit_id, &request.into_update())
        .await?
        .ok_or(BillingError::UnitNotFound(unit_id))?;

    tracing::info!(unit_id = %unit_id, status = unit.status.as_str(), "Occupancy updated");
    Ok(Json(unit))
}
