use crate::billing::BillingError;
use crate::dtos::{ListReadingsQuery, RecordReadingRequest};
use crate::models::MeterReading;
use crate::services::metrics::record_meter_reading;
use crate::startup::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;
use validator::Validate;

#[tracing::instrument(skip(state, request), fields(unit_id = %request.unit_id))]
pub async fn record_reading(
    State(state): State<AppState>,
    Json(request): Json<RecordReadingRequest>,
) -> Result<(StatusCode, Json<MeterReading>), AppError> {
    request.validate()?;

    if state.store.get_unit(request.unit_id).await?.is_none() {
        return Err(BillingError::UnitNotFound(request.unit_id).into());
    }

    let reading = state.store.record_reading(&request.into_command()).await?;
    record_meter_reading(reading.utility.as_str());

    Ok((StatusCode::CREATED, Json(reading)))
}

#[tracing::instrument(skip(state, query))]
pub async fn list_readings(
    State(state): State<AppState>,
    Path(unit_id): Path<Uuid>,
    Query(query): Query<ListReadingsQuery>,
) -> Result<Json<Vec<MeterReading>>, AppError> {
    query.validate()?;

    if state.store.get_unit(unit_id).await?.is_none() {
        return Err(BillingError::UnitNotFound(unit_id).into());
    }

    let readings = state.store.list_readings(unit_id, &query.into()).await?;
    Ok(Json(readings))
}
