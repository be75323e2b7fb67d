use axum::{
    extract::{Path, Query, State},
    response::{Json, Response},
    routing::{get, put},
    Router,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use super::common::{created_response, no_content_response};
use crate::{
    auth::Session,
    entities::{procedure, procedure_category},
    errors::ServiceError,
    services::procedures::{
        CreateCategoryRequest, CreateProcedureRequest, ProcedureFilter, UpdateCategoryRequest,
        UpdateProcedureRequest,
    },
    ApiResponse, AppState,
};

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CategoryListParams {
    /// Only active categories (default true)
    pub active_only: Option<bool>,
}

pub fn procedures_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/procedure-categories",
            get(list_categories).post(create_category),
        )
        .route(
            "/procedure-categories/:id",
            put(update_category).delete(delete_category),
        )
        .route("/procedures", get(list_procedures).post(create_procedure))
        .route(
            "/procedures/:id",
            get(get_procedure).put(update_procedure).delete(delete_procedure),
        )
}

#[utoipa::path(
    get,
    path = "/api/v1/procedure-categories",
    params(CategoryListParams),
    responses((status = 200, description = "Procedure categories", body = [procedure_category::Model])),
    security(("bearer_auth" = [])),
    tag = "procedures"
)]
pub async fn list_categories(
    State(state): State<AppState>,
    session: Session,
    Query(params): Query<CategoryListParams>,
) -> Result<Json<ApiResponse<Vec<procedure_category::Model>>>, ServiceError> {
    let categories = state
        .services
        .procedures
        .list_categories(&session, params.active_only.unwrap_or(true))
        .await?;
    Ok(Json(ApiResponse::success(categories)))
}

#[utoipa::path(
    post,
    path = "/api/v1/procedure-categories",
    request_body = CreateCategoryRequest,
    responses(
        (status = 201, description = "Category created", body = procedure_category::Model),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "procedures"
)]
pub async fn create_category(
    State(state): State<AppState>,
    session: Session,
    Json(payload): Json<CreateCategoryRequest>,
) -> Result<Response, ServiceError> {
    let category = state
        .services
        .procedures
        .create_category(&session, payload)
        .await?;
    Ok(created_response(category))
}

#[utoipa::path(
    put,
    path = "/api/v1/procedure-categories/{id}",
    params(("id" = Uuid, Path, description = "Category id")),
    request_body = UpdateCategoryRequest,
    responses(
        (status = 200, description = "Category updated", body = procedure_category::Model),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "procedures"
)]
pub async fn update_category(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCategoryRequest>,
) -> Result<Json<ApiResponse<procedure_category::Model>>, ServiceError> {
    let category = state
        .services
        .procedures
        .update_category(&session, id, payload)
        .await?;
    Ok(Json(ApiResponse::success(category)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/procedure-categories/{id}",
    params(("id" = Uuid, Path, description = "Category id")),
    responses(
        (status = 204, description = "Category deleted"),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "procedures"
)]
pub async fn delete_category(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> Result<Response, ServiceError> {
    state.services.procedures.delete_category(&session, id).await?;
    Ok(no_content_response())
}

#[utoipa::path(
    get,
    path = "/api/v1/procedures",
    params(ProcedureFilter),
    responses((status = 200, description = "Procedures by name", body = [procedure::Model])),
    security(("bearer_auth" = [])),
    tag = "procedures"
)]
pub async fn list_procedures(
    State(state): State<AppState>,
    session: Session,
    Query(filter): Query<ProcedureFilter>,
) -> Result<Json<ApiResponse<Vec<procedure::Model>>>, ServiceError> {
    let procedures = state
        .services
        .procedures
        .list_procedures(&session, filter)
        .await?;
    Ok(Json(ApiResponse::success(procedures)))
}

#[utoipa::path(
    post,
    path = "/api/v1/procedures",
    request_body = CreateProcedureRequest,
    responses(
        (status = 201, description = "Procedure created", body = procedure::Model),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Category not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "procedures"
)]
pub async fn create_procedure(
    State(state): State<AppState>,
    session: Session,
    Json(payload): Json<CreateProcedureRequest>,
) -> Result<Response, ServiceError> {
    let procedure = state
        .services
        .procedures
        .create_procedure(&session, payload)
        .await?;
    Ok(created_response(procedure))
}

#[utoipa::path(
    get,
    path = "/api/v1/procedures/{id}",
    params(("id" = Uuid, Path, description = "Procedure id")),
    responses(
        (status = 200, description = "Procedure", body = procedure::Model),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "procedures"
)]
pub async fn get_procedure(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<procedure::Model>>, ServiceError> {
    let procedure = state.services.procedures.get_procedure(&session, id).await?;
    Ok(Json(ApiResponse::success(procedure)))
}

#[utoipa::path(
    put,
    path = "/api/v1/procedures/{id}",
    params(("id" = Uuid, Path, description = "Procedure id")),
    request_body = UpdateProcedureRequest,
    responses(
        (status = 200, description = "Procedure updated", body = procedure::Model),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "procedures"
)]
pub async fn update_procedure(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProcedureRequest>,
) -> Result<Json<ApiResponse<procedure::Model>>, ServiceError> {
    let procedure = state
        .services
        .procedures
        .update_procedure(&session, id, payload)
        .await?;
    Ok(Json(ApiResponse::success(procedure)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/procedures/{id}",
    params(("id" = Uuid, Path, description = "Procedure id")),
    responses(
        (status = 204, description = "Procedure deleted"),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Procedure has appointments", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "procedures"
)]
pub async fn delete_procedure(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> Result<Response, ServiceError> {
    state.services.procedures.delete_procedure(&session, id).await?;
    Ok(no_content_response())
}
