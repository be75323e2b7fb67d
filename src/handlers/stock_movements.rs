use axum::{
    extract::{Path, Query, State},
    response::{Json, Response},
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use super::common::{created_response, PaginatedResponse, PaginationParams};
use crate::{
    auth::Session,
    entities::{stock_movement, MovementType},
    errors::ServiceError,
    ledger::MovementSummary,
    queries::{search_term, MovementFilter, MovementQuery, MovementSort, MovementWithProduct, SortDirection},
    services::stock::{CreateMovementRequest, DeletedMovement},
    ApiResponse, AppState,
};

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MovementListParams {
    /// Restrict to one product (also accepted as `productId`)
    #[serde(alias = "productId")]
    pub product_id: Option<Uuid>,
    pub movement_type: Option<MovementType>,
    pub reference_type: Option<String>,
    pub reference_id: Option<String>,
    /// Inclusive lower bound on `created_at`
    pub from: Option<DateTime<Utc>>,
    /// Exclusive upper bound on `created_at`
    pub to: Option<DateTime<Utc>>,
    /// Case-insensitive match on notes or product name
    pub search: Option<String>,
    pub sort: Option<MovementSort>,
    pub direction: Option<SortDirection>,
}

impl MovementListParams {
    fn into_query(self) -> MovementQuery {
        let filters = [
            self.product_id.map(MovementFilter::Product),
            self.movement_type.map(MovementFilter::Type),
            self.reference_type.map(MovementFilter::ReferenceType),
            self.reference_id.map(MovementFilter::ReferenceId),
            self.from.map(MovementFilter::CreatedFrom),
            self.to.map(MovementFilter::CreatedBefore),
            self.search.as_deref().and_then(search_term).map(MovementFilter::Search),
        ];
        let query = filters
            .into_iter()
            .flatten()
            .fold(MovementQuery::new(), MovementQuery::filter);
        query.sorted(
            self.sort.unwrap_or_default(),
            self.direction.unwrap_or_default(),
        )
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DeleteMovementParams {
    /// Compensate the product's stock; defaults to the server setting
    pub reverse_stock: Option<bool>,
}

pub fn stock_movements_routes() -> Router<AppState> {
    Router::new()
        .route("/stock-movements", get(list_movements).post(create_movement))
        .route("/stock-movements/summary", get(movement_summary))
        .route(
            "/stock-movements/:id",
            get(get_movement).delete(delete_movement),
        )
}

/// List ledger entries, newest first by default
#[utoipa::path(
    get,
    path = "/api/v1/stock-movements",
    params(MovementListParams, PaginationParams),
    responses(
        (status = 200, description = "Page of stock movements"),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "stock-movements"
)]
pub async fn list_movements(
    State(state): State<AppState>,
    session: Session,
    Query(params): Query<MovementListParams>,
    Query(pagination): Query<PaginationParams>,
) -> Result<Json<PaginatedResponse<MovementWithProduct>>, ServiceError> {
    let window = pagination.window(&state);
    let (movements, total) = state
        .services
        .stock
        .list_movements(&session, params.into_query(), window)
        .await?;
    Ok(Json(PaginatedResponse::new(movements, window, total)))
}

/// Record a movement and apply it to the product's stock
#[utoipa::path(
    post,
    path = "/api/v1/stock-movements",
    request_body = CreateMovementRequest,
    responses(
        (status = 201, description = "Movement recorded", body = stock_movement::Model),
        (status = 400, description = "Invalid quantity", body = crate::errors::ErrorResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Insufficient stock", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "stock-movements"
)]
pub async fn create_movement(
    State(state): State<AppState>,
    session: Session,
    Json(payload): Json<CreateMovementRequest>,
) -> Result<Response, ServiceError> {
    let movement = state.services.stock.create_movement(&session, payload).await?;
    Ok(created_response(movement))
}

#[utoipa::path(
    get,
    path = "/api/v1/stock-movements/{id}",
    params(("id" = Uuid, Path, description = "Movement id")),
    responses(
        (status = 200, description = "Stock movement", body = MovementWithProduct),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "stock-movements"
)]
pub async fn get_movement(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<MovementWithProduct>>, ServiceError> {
    let movement = state.services.stock.get_movement(&session, id).await?;
    Ok(Json(ApiResponse::success(movement)))
}

/// Delete exactly one movement, optionally reversing its stock effect
#[utoipa::path(
    delete,
    path = "/api/v1/stock-movements/{id}",
    params(("id" = Uuid, Path, description = "Movement id"), DeleteMovementParams),
    responses(
        (status = 200, description = "Movement deleted", body = DeletedMovement),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "stock-movements"
)]
pub async fn delete_movement(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    Query(params): Query<DeleteMovementParams>,
) -> Result<Json<ApiResponse<DeletedMovement>>, ServiceError> {
    let deleted = state
        .services
        .stock
        .delete_movement(&session, id, params.reverse_stock)
        .await?;
    Ok(Json(ApiResponse::success(deleted)))
}

/// Totals per movement type over the filtered ledger
#[utoipa::path(
    get,
    path = "/api/v1/stock-movements/summary",
    params(MovementListParams),
    responses((status = 200, description = "Movement summary", body = MovementSummary)),
    security(("bearer_auth" = [])),
    tag = "stock-movements"
)]
pub async fn movement_summary(
    State(state): State<AppState>,
    session: Session,
    Query(params): Query<MovementListParams>,
) -> Result<Json<ApiResponse<MovementSummary>>, ServiceError> {
    let summary = state
        .services
        .stock
        .summarize(&session, params.into_query())
        .await?;
    Ok(Json(ApiResponse::success(summary)))
}
