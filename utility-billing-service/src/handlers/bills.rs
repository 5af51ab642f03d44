use crate::dtos::{GenerateBillsRequest, ListBillsQuery, ListBillsResponse};
use crate::models::Bill;
use crate::services::GenerationOutcome;
use crate::startup::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;

#[tracing::instrument(skip(state, query))]
pub async fn list_bills(
    State(state): State<AppState>,
    Query(query): Query<ListBillsQuery>,
) -> Result<Json<ListBillsResponse>, AppError> {
    let bills = state.store.list_bills(&query.into()).await?;
    Ok(Json(bills.into()))
}

/// `201` when bills were created, `200` when every occupied unit was
/// already billed.
#[tracing::instrument(skip(state, request), fields(property_id = %request.property_id, period = %request.period))]
pub async fn generate_bills(
    State(state): State<AppState>,
    Json(request): Json<GenerateBillsRequest>,
) -> Result<(StatusCode, Json<GenerationOutcome>), AppError> {
    let outcome = state
        .generator
        .generate(request.property_id, request.period)
        .await?;

    let status = if outcome.created.is_empty() {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((status, Json(outcome)))
}

#[tracing::instrument(skip(state))]
pub async fn pay_bill(
    State(state): State<AppState>,
    Path(bill_id): Path<Uuid>,
) -> Result<Json<Bill>, AppError> {
    let bill = state.generator.mark_paid(bill_id).await?;
    Ok(Json(bill))
}
