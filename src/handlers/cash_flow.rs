use axum::{extract::State, response::Json, routing::post, Router};

use crate::{
    auth::Session,
    errors::ServiceError,
    services::cash_flow::{ProjectionRequest, ProjectionResponse},
    ApiResponse, AppState,
};

pub fn cash_flow_routes() -> Router<AppState> {
    Router::new().route("/cash-flow/projection", post(project_cash_flow))
}

/// Day-by-day balance projection, regrouped at the requested granularity
#[utoipa::path(
    post,
    path = "/api/v1/cash-flow/projection",
    request_body = ProjectionRequest,
    responses(
        (status = 200, description = "Projection", body = ProjectionResponse),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "cash-flow"
)]
pub async fn project_cash_flow(
    State(state): State<AppState>,
    session: Session,
    Json(payload): Json<ProjectionRequest>,
) -> Result<Json<ApiResponse<ProjectionResponse>>, ServiceError> {
    let projection = state.services.cash_flow.project(&session, payload).await?;
    Ok(Json(ApiResponse::success(projection)))
}
