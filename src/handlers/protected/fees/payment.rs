use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::database::models::fee::Payment;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::fee_service::{FeeService, PayRequest, Receipt};
use crate::state::AppState;
use crate::types::{Page, Paginated};

#[derive(Debug, Default, Deserialize)]
pub struct PaymentQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// POST /api/fees/:id/pay - a declined charge surfaces as 402 from the service
pub async fn pay(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(request): Json<PayRequest>,
) -> ApiResult<Payment> {
    let payment = FeeService::new(&state).pay(&auth, id, &request).await?;
    Ok(ApiResponse::created("Payment successful", payment))
}

/// GET /api/fees/payments - the caller's payment history
pub async fn list(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(query): Query<PaymentQuery>,
) -> ApiResult<Paginated<Payment>> {
    let page = Page::new(query.page, query.limit, &state.config.api);
    Ok(ApiResponse::success(FeeService::new(&state).payments(auth.id, page).await?))
}

/// GET /api/fees/payments/:id - receipt
pub async fn get(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Receipt> {
    Ok(ApiResponse::success(FeeService::new(&state).receipt(&auth, id).await?))
}
