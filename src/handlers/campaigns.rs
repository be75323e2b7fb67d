use axum::{
    extract::{Path, Query, State},
    response::{Json, Response},
    routing::{get, post, put},
    Router,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::common::{created_response, no_content_response, PaginatedResponse, PaginationParams};
use crate::{
    auth::Session,
    entities::{campaign, CampaignStatus},
    errors::ServiceError,
    services::campaigns::{
        Audience, CampaignFilter, CampaignReport, CampaignWithPerformance, CreateCampaignRequest,
        DuplicateCampaignRequest, TargetingParams, UpdateCampaignRequest,
    },
    ApiResponse, AppState,
};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CampaignStatusRequest {
    pub status: CampaignStatus,
}

pub fn campaigns_routes() -> Router<AppState> {
    Router::new()
        .route("/campaigns", get(list_campaigns).post(create_campaign))
        .route("/campaigns/report", get(campaign_report))
        .route("/campaigns/targeting", get(campaign_targeting))
        .route(
            "/campaigns/:id",
            get(get_campaign).put(update_campaign).delete(delete_campaign),
        )
        .route("/campaigns/:id/status", put(set_campaign_status))
        .route("/campaigns/:id/duplicate", post(duplicate_campaign))
        .route("/campaigns/:id/audience", get(campaign_audience))
}

/// Campaigns, newest first
#[utoipa::path(
    get,
    path = "/api/v1/campaigns",
    params(CampaignFilter, PaginationParams),
    responses(
        (status = 200, description = "Page of campaigns"),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "campaigns"
)]
pub async fn list_campaigns(
    State(state): State<AppState>,
    session: Session,
    Query(filter): Query<CampaignFilter>,
    Query(pagination): Query<PaginationParams>,
) -> Result<Json<PaginatedResponse<campaign::Model>>, ServiceError> {
    let window = pagination.window(&state);
    let (campaigns, total) = state
        .services
        .campaigns
        .list_campaigns(&session, filter, window)
        .await?;
    Ok(Json(PaginatedResponse::new(campaigns, window, total)))
}

/// New campaigns start as drafts
#[utoipa::path(
    post,
    path = "/api/v1/campaigns",
    request_body = CreateCampaignRequest,
    responses(
        (status = 201, description = "Campaign created", body = campaign::Model),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "campaigns"
)]
pub async fn create_campaign(
    State(state): State<AppState>,
    session: Session,
    Json(payload): Json<CreateCampaignRequest>,
) -> Result<Response, ServiceError> {
    let campaign = state
        .services
        .campaigns
        .create_campaign(&session, payload)
        .await?;
    Ok(created_response(campaign))
}

#[utoipa::path(
    get,
    path = "/api/v1/campaigns/{id}",
    params(("id" = Uuid, Path, description = "Campaign id")),
    responses(
        (status = 200, description = "Campaign with performance rates", body = CampaignWithPerformance),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "campaigns"
)]
pub async fn get_campaign(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<CampaignWithPerformance>>, ServiceError> {
    let campaign = state.services.campaigns.get_campaign(&session, id).await?;
    Ok(Json(ApiResponse::success(campaign)))
}

#[utoipa::path(
    put,
    path = "/api/v1/campaigns/{id}",
    params(("id" = Uuid, Path, description = "Campaign id")),
    request_body = UpdateCampaignRequest,
    responses(
        (status = 200, description = "Campaign updated", body = campaign::Model),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "campaigns"
)]
pub async fn update_campaign(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCampaignRequest>,
) -> Result<Json<ApiResponse<campaign::Model>>, ServiceError> {
    let campaign = state
        .services
        .campaigns
        .update_campaign(&session, id, payload)
        .await?;
    Ok(Json(ApiResponse::success(campaign)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/campaigns/{id}",
    params(("id" = Uuid, Path, description = "Campaign id")),
    responses(
        (status = 204, description = "Campaign deleted"),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "campaigns"
)]
pub async fn delete_campaign(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> Result<Response, ServiceError> {
    state.services.campaigns.delete_campaign(&session, id).await?;
    Ok(no_content_response())
}

/// Completed and cancelled campaigns cannot change status
#[utoipa::path(
    put,
    path = "/api/v1/campaigns/{id}/status",
    params(("id" = Uuid, Path, description = "Campaign id")),
    request_body = CampaignStatusRequest,
    responses(
        (status = 200, description = "Status changed", body = campaign::Model),
        (status = 400, description = "Campaign already finished", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "campaigns"
)]
pub async fn set_campaign_status(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    Json(payload): Json<CampaignStatusRequest>,
) -> Result<Json<ApiResponse<campaign::Model>>, ServiceError> {
    let campaign = state
        .services
        .campaigns
        .set_status(&session, id, payload.status)
        .await?;
    Ok(Json(ApiResponse::success(campaign)))
}

#[utoipa::path(
    post,
    path = "/api/v1/campaigns/{id}/duplicate",
    params(("id" = Uuid, Path, description = "Campaign id")),
    request_body = DuplicateCampaignRequest,
    responses(
        (status = 201, description = "Draft copy created", body = campaign::Model),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "campaigns"
)]
pub async fn duplicate_campaign(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    Json(payload): Json<DuplicateCampaignRequest>,
) -> Result<Response, ServiceError> {
    let copy = state
        .services
        .campaigns
        .duplicate_campaign(&session, id, payload.name)
        .await?;
    Ok(created_response(copy))
}

#[utoipa::path(
    get,
    path = "/api/v1/campaigns/{id}/audience",
    params(("id" = Uuid, Path, description = "Campaign id")),
    responses(
        (status = 200, description = "Active clients the campaign reaches", body = Audience),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "campaigns"
)]
pub async fn campaign_audience(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Audience>>, ServiceError> {
    let audience = state.services.campaigns.audience(&session, id).await?;
    Ok(Json(ApiResponse::success(audience)))
}

/// Preview an audience by segment or upcoming birthdays; all active clients otherwise
#[utoipa::path(
    get,
    path = "/api/v1/campaigns/targeting",
    params(TargetingParams),
    responses(
        (status = 200, description = "Matching active clients", body = Audience),
        (status = 400, description = "Conflicting or out-of-range criteria", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "campaigns"
)]
pub async fn campaign_targeting(
    State(state): State<AppState>,
    session: Session,
    Query(params): Query<TargetingParams>,
) -> Result<Json<ApiResponse<Audience>>, ServiceError> {
    let audience = state.services.campaigns.targeting(&session, params).await?;
    Ok(Json(ApiResponse::success(audience)))
}

#[utoipa::path(
    get,
    path = "/api/v1/campaigns/report",
    responses((status = 200, description = "Totals and average rates across campaigns", body = CampaignReport)),
    security(("bearer_auth" = [])),
    tag = "campaigns"
)]
pub async fn campaign_report(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<ApiResponse<CampaignReport>>, ServiceError> {
    let report = state.services.campaigns.report(&session).await?;
    Ok(Json(ApiResponse::success(report)))
}
