use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use super::common::{created_response, no_content_response, PaginatedResponse, PaginationParams};
use crate::{
    auth::Session,
    entities::{product, stock_movement},
    errors::ServiceError,
    ledger::{StockAlert, StockSummary, StockValuation},
    queries::{search_term, ProductFilter, ProductQuery, ProductSort, SortDirection},
    services::{
        products::{CreateProductRequest, UpdateProductRequest},
        stock::StockAvailability,
    },
    ApiResponse, AppState,
};

const DEFAULT_RECENT_MOVEMENTS: u64 = 10;
const MAX_RECENT_MOVEMENTS: u64 = 100;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProductListParams {
    pub category: Option<String>,
    pub active: Option<bool>,
    /// Only products at or below their minimum stock
    pub low_stock: Option<bool>,
    /// Only products expiring within this many days
    pub expiring_within_days: Option<i64>,
    /// Case-insensitive match on name, SKU or description
    pub search: Option<String>,
    pub sort: Option<ProductSort>,
    pub direction: Option<SortDirection>,
}

impl ProductListParams {
    fn into_query(self) -> ProductQuery {
        let mut query = ProductQuery::default();
        if let Some(category) = self.category.filter(|c| !c.trim().is_empty()) {
            query = query.filter(ProductFilter::Category(category));
        }
        if let Some(active) = self.active {
            query = query.filter(ProductFilter::Active(active));
        }
        if self.low_stock == Some(true) {
            query = query.filter(ProductFilter::LowStock);
        }
        if let Some(days) = self.expiring_within_days {
            query = query.filter(ProductFilter::ExpiringWithin {
                today: crate::services::today(),
                days,
            });
        }
        if let Some(term) = self.search.as_deref().and_then(search_term) {
            query = query.filter(ProductFilter::Search(term));
        }
        if let Some(sort) = self.sort {
            query.sort = sort;
        }
        if let Some(direction) = self.direction {
            query.direction = direction;
        }
        query
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AvailabilityParams {
    pub quantity: Decimal,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RecentMovementsParams {
    pub limit: Option<u64>,
}

pub fn products_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_products).post(create_product))
        .route("/products/categories", get(list_categories))
        .route("/products/summary", get(stock_summary))
        .route("/products/valuation", get(stock_valuation))
        .route("/products/alerts", get(stock_alerts))
        .route(
            "/products/:id",
            get(get_product).put(update_product).delete(delete_product),
        )
        .route("/products/:id/toggle", post(toggle_product))
        .route("/products/:id/availability", get(check_availability))
        .route("/products/:id/movements", get(recent_movements))
}

/// List products with filters, sorting and pagination
#[utoipa::path(
    get,
    path = "/api/v1/products",
    params(ProductListParams, PaginationParams),
    responses(
        (status = 200, description = "Page of products"),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "products"
)]
pub async fn list_products(
    State(state): State<AppState>,
    session: Session,
    Query(params): Query<ProductListParams>,
    Query(pagination): Query<PaginationParams>,
) -> Result<Json<PaginatedResponse<product::Model>>, ServiceError> {
    let window = pagination.window(&state);
    let (products, total) = state
        .services
        .products
        .list_products(&session, params.into_query(), window)
        .await?;
    Ok(Json(PaginatedResponse::new(products, window, total)))
}

/// Create a product
#[utoipa::path(
    post,
    path = "/api/v1/products",
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Product created", body = product::Model),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "products"
)]
pub async fn create_product(
    State(state): State<AppState>,
    session: Session,
    Json(payload): Json<CreateProductRequest>,
) -> Result<Response, ServiceError> {
    let product = state.services.products.create_product(&session, payload).await?;
    Ok(created_response(product))
}

#[utoipa::path(
    get,
    path = "/api/v1/products/{id}",
    params(("id" = Uuid, Path, description = "Product id")),
    responses(
        (status = 200, description = "Product", body = product::Model),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "products"
)]
pub async fn get_product(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<product::Model>>, ServiceError> {
    let product = state.services.products.get_product(&session, id).await?;
    Ok(Json(ApiResponse::success(product)))
}

/// Update product details. Stock only changes through movements.
#[utoipa::path(
    put,
    path = "/api/v1/products/{id}",
    params(("id" = Uuid, Path, description = "Product id")),
    request_body = UpdateProductRequest,
    responses(
        (status = 200, description = "Product updated", body = product::Model),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "products"
)]
pub async fn update_product(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProductRequest>,
) -> Result<Json<ApiResponse<product::Model>>, ServiceError> {
    let product = state
        .services
        .products
        .update_product(&session, id, payload)
        .await?;
    Ok(Json(ApiResponse::success(product)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/products/{id}",
    params(("id" = Uuid, Path, description = "Product id")),
    responses(
        (status = 204, description = "Product deleted"),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Product still holds stock", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "products"
)]
pub async fn delete_product(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> Result<Response, ServiceError> {
    state.services.products.delete_product(&session, id).await?;
    Ok(no_content_response())
}

/// Flip the product's active flag
#[utoipa::path(
    post,
    path = "/api/v1/products/{id}/toggle",
    params(("id" = Uuid, Path, description = "Product id")),
    responses(
        (status = 200, description = "Product updated", body = product::Model),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "products"
)]
pub async fn toggle_product(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<product::Model>>, ServiceError> {
    let product = state.services.products.toggle_active(&session, id).await?;
    Ok(Json(ApiResponse::success(product)))
}

#[utoipa::path(
    get,
    path = "/api/v1/products/categories",
    responses((status = 200, description = "Distinct product categories", body = [String])),
    security(("bearer_auth" = [])),
    tag = "products"
)]
pub async fn list_categories(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<ApiResponse<Vec<String>>>, ServiceError> {
    let categories = state.services.products.categories(&session).await?;
    Ok(Json(ApiResponse::success(categories)))
}

#[utoipa::path(
    get,
    path = "/api/v1/products/summary",
    responses((status = 200, description = "Stock overview", body = StockSummary)),
    security(("bearer_auth" = [])),
    tag = "products"
)]
pub async fn stock_summary(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<ApiResponse<StockSummary>>, ServiceError> {
    let summary = state.services.products.stock_summary(&session).await?;
    Ok(Json(ApiResponse::success(summary)))
}

#[utoipa::path(
    get,
    path = "/api/v1/products/valuation",
    responses((status = 200, description = "Stock valued at cost", body = StockValuation)),
    security(("bearer_auth" = [])),
    tag = "products"
)]
pub async fn stock_valuation(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<ApiResponse<StockValuation>>, ServiceError> {
    let valuation = state.services.products.valuation(&session).await?;
    Ok(Json(ApiResponse::success(valuation)))
}

/// Low-stock and expiry alerts, most severe first
#[utoipa::path(
    get,
    path = "/api/v1/products/alerts",
    responses((status = 200, description = "Stock alerts", body = [StockAlert])),
    security(("bearer_auth" = [])),
    tag = "products"
)]
pub async fn stock_alerts(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<ApiResponse<Vec<StockAlert>>>, ServiceError> {
    let alerts = state.services.products.alerts(&session).await?;
    Ok(Json(ApiResponse::success(alerts)))
}

#[utoipa::path(
    get,
    path = "/api/v1/products/{id}/availability",
    params(("id" = Uuid, Path, description = "Product id"), AvailabilityParams),
    responses(
        (status = 200, description = "Whether the quantity can leave stock", body = StockAvailability),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "products"
)]
pub async fn check_availability(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    Query(params): Query<AvailabilityParams>,
) -> Result<Json<ApiResponse<StockAvailability>>, ServiceError> {
    let availability = state
        .services
        .stock
        .check_availability(&session, id, params.quantity)
        .await?;
    Ok(Json(ApiResponse::success(availability)))
}

#[utoipa::path(
    get,
    path = "/api/v1/products/{id}/movements",
    params(("id" = Uuid, Path, description = "Product id"), RecentMovementsParams),
    responses((status = 200, description = "Most recent movements of the product", body = [stock_movement::Model])),
    security(("bearer_auth" = [])),
    tag = "products"
)]
pub async fn recent_movements(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    Query(params): Query<RecentMovementsParams>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.products.get_product(&session, id).await?;
    let limit = params
        .limit
        .unwrap_or(DEFAULT_RECENT_MOVEMENTS)
        .clamp(1, MAX_RECENT_MOVEMENTS);
    let movements = state
        .services
        .stock
        .recent_movements(&session, id, limit)
        .await?;
    Ok(Json(ApiResponse::success(movements)))
}
