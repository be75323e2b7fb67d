use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use super::common::{
    created_response, no_content_response, LinkResponse, PaginatedResponse, PaginationParams,
};
use crate::{
    auth::Session,
    entities::client,
    errors::ServiceError,
    links,
    services::{
        appointments::ClientHistory,
        clients::{
            BirthdayParams, BulkSegmentRequest, DEFAULT_BIRTHDAY_WINDOW_DAYS, BulkSegmentResult, ClientFilter, ClientStats,
            CreateClientRequest, UpcomingBirthday, UpdateClientRequest,
        },
        today,
    },
    ApiResponse, AppState,
};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DraftAccepted {
    pub client_id: Uuid,
    /// Milliseconds until the draft is written, unless superseded
    pub save_in_ms: u64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DraftCancelled {
    pub client_id: Uuid,
    pub cancelled: bool,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct SegmentChange {
    pub segment: crate::entities::ClientSegment,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct WhatsAppParams {
    /// Prefilled message text
    pub message: Option<String>,
}

pub fn clients_routes() -> Router<AppState> {
    Router::new()
        .route("/clients", get(list_clients).post(create_client))
        .route("/clients/stats", get(client_stats))
        .route("/clients/birthdays", get(upcoming_birthdays))
        .route("/clients/segments", axum::routing::put(bulk_update_segments))
        .route(
            "/clients/:id",
            get(get_client).put(update_client).delete(delete_client),
        )
        .route(
            "/clients/:id/draft",
            axum::routing::put(stage_draft).delete(cancel_draft),
        )
        .route("/clients/:id/whatsapp-link", get(whatsapp_link))
        .route("/clients/:id/history", get(client_history))
        .route("/clients/:id/segment", axum::routing::put(update_segment))
}

/// List clients, alphabetically
#[utoipa::path(
    get,
    path = "/api/v1/clients",
    params(ClientFilter, PaginationParams),
    responses(
        (status = 200, description = "Page of clients"),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "clients"
)]
pub async fn list_clients(
    State(state): State<AppState>,
    session: Session,
    Query(filter): Query<ClientFilter>,
    Query(pagination): Query<PaginationParams>,
) -> Result<Json<PaginatedResponse<client::Model>>, ServiceError> {
    let window = pagination.window(&state);
    let (clients, total) = state
        .services
        .clients
        .list_clients(&session, filter, window)
        .await?;
    Ok(Json(PaginatedResponse::new(clients, window, total)))
}

#[utoipa::path(
    post,
    path = "/api/v1/clients",
    request_body = CreateClientRequest,
    responses(
        (status = 201, description = "Client created", body = client::Model),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 409, description = "CPF already registered", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "clients"
)]
pub async fn create_client(
    State(state): State<AppState>,
    session: Session,
    Json(payload): Json<CreateClientRequest>,
) -> Result<Response, ServiceError> {
    let client = state.services.clients.create_client(&session, payload).await?;
    Ok(created_response(client))
}

#[utoipa::path(
    get,
    path = "/api/v1/clients/{id}",
    params(("id" = Uuid, Path, description = "Client id")),
    responses(
        (status = 200, description = "Client", body = client::Model),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "clients"
)]
pub async fn get_client(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<client::Model>>, ServiceError> {
    let client = state.services.clients.get_client(&session, id).await?;
    Ok(Json(ApiResponse::success(client)))
}

/// Immediate update; a pending draft for the same client is discarded
#[utoipa::path(
    put,
    path = "/api/v1/clients/{id}",
    params(("id" = Uuid, Path, description = "Client id")),
    request_body = UpdateClientRequest,
    responses(
        (status = 200, description = "Client updated", body = client::Model),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "CPF already registered", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "clients"
)]
pub async fn update_client(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateClientRequest>,
) -> Result<Json<ApiResponse<client::Model>>, ServiceError> {
    state.services.client_drafts.cancel(&session, id);
    let client = state
        .services
        .clients
        .update_client(&session, id, payload)
        .await?;
    Ok(Json(ApiResponse::success(client)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/clients/{id}",
    params(("id" = Uuid, Path, description = "Client id")),
    responses(
        (status = 204, description = "Client deleted"),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Client has upcoming appointments", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "clients"
)]
pub async fn delete_client(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> Result<Response, ServiceError> {
    state.services.client_drafts.cancel(&session, id);
    state.services.clients.delete_client(&session, id).await?;
    Ok(no_content_response())
}

#[utoipa::path(
    get,
    path = "/api/v1/clients/stats",
    responses((status = 200, description = "Client counts by status and segment", body = ClientStats)),
    security(("bearer_auth" = [])),
    tag = "clients"
)]
pub async fn client_stats(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<ApiResponse<ClientStats>>, ServiceError> {
    let stats = state.services.clients.stats(&session).await?;
    Ok(Json(ApiResponse::success(stats)))
}

/// Stage a partial update. It is written after the auto-save delay unless
/// another draft for the same client replaces it first.
#[utoipa::path(
    put,
    path = "/api/v1/clients/{id}/draft",
    params(("id" = Uuid, Path, description = "Client id")),
    request_body = UpdateClientRequest,
    responses(
        (status = 202, description = "Draft staged", body = DraftAccepted),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "clients"
)]
pub async fn stage_draft(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateClientRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    payload.validate()?;
    state.services.clients.get_client(&session, id).await?;

    let drafts = &state.services.client_drafts;
    drafts.stage(session, id, payload);
    let accepted = DraftAccepted {
        client_id: id,
        save_in_ms: drafts.delay().as_millis() as u64,
    };
    Ok((StatusCode::ACCEPTED, Json(ApiResponse::success(accepted))))
}

#[utoipa::path(
    delete,
    path = "/api/v1/clients/{id}/draft",
    params(("id" = Uuid, Path, description = "Client id")),
    responses((status = 200, description = "Whether a pending draft was dropped", body = DraftCancelled)),
    security(("bearer_auth" = [])),
    tag = "clients"
)]
pub async fn cancel_draft(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> Json<ApiResponse<DraftCancelled>> {
    let cancelled = state.services.client_drafts.cancel(&session, id);
    Json(ApiResponse::success(DraftCancelled {
        client_id: id,
        cancelled,
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/clients/{id}/whatsapp-link",
    params(("id" = Uuid, Path, description = "Client id"), WhatsAppParams),
    responses(
        (status = 200, description = "wa.me deep link", body = LinkResponse),
        (status = 400, description = "Client has no usable phone", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "clients"
)]
pub async fn whatsapp_link(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    Query(params): Query<WhatsAppParams>,
) -> Result<Json<ApiResponse<LinkResponse>>, ServiceError> {
    let client = state.services.clients.get_client(&session, id).await?;
    let phone = client.phone.as_deref().ok_or_else(|| {
        ServiceError::ValidationError(format!("client {} has no phone number", client.name))
    })?;
    let url = links::whatsapp_link(phone, params.message.as_deref())?;
    Ok(Json(ApiResponse::success(LinkResponse {
        url: url.to_string(),
    })))
}

/// Appointments newest first, with spend and visits over completed ones
#[utoipa::path(
    get,
    path = "/api/v1/clients/{id}/history",
    params(("id" = Uuid, Path, description = "Client id")),
    responses(
        (status = 200, description = "Client history", body = ClientHistory),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "clients"
)]
pub async fn client_history(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ClientHistory>>, ServiceError> {
    let history = state
        .services
        .appointments
        .client_history(&session, id)
        .await?;
    Ok(Json(ApiResponse::success(history)))
}

#[utoipa::path(
    get,
    path = "/api/v1/clients/birthdays",
    params(BirthdayParams),
    responses(
        (status = 200, description = "Active clients with an upcoming birthday, soonest first", body = [UpcomingBirthday]),
        (status = 400, description = "Window out of range", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "clients"
)]
pub async fn upcoming_birthdays(
    State(state): State<AppState>,
    session: Session,
    Query(params): Query<BirthdayParams>,
) -> Result<Json<ApiResponse<Vec<UpcomingBirthday>>>, ServiceError> {
    let days = params
        .days
        .unwrap_or(DEFAULT_BIRTHDAY_WINDOW_DAYS);
    let birthdays = state
        .services
        .clients
        .upcoming_birthdays(&session, days, today())
        .await?;
    Ok(Json(ApiResponse::success(birthdays)))
}

#[utoipa::path(
    put,
    path = "/api/v1/clients/{id}/segment",
    params(("id" = Uuid, Path, description = "Client id")),
    request_body = SegmentChange,
    responses(
        (status = 200, description = "Client updated", body = client::Model),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "clients"
)]
pub async fn update_segment(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    Json(payload): Json<SegmentChange>,
) -> Result<Json<ApiResponse<client::Model>>, ServiceError> {
    let client = state
        .services
        .clients
        .update_segment(&session, id, payload.segment)
        .await?;
    Ok(Json(ApiResponse::success(client)))
}

/// All-or-nothing: one unknown client rejects the whole batch
#[utoipa::path(
    put,
    path = "/api/v1/clients/segments",
    request_body = BulkSegmentRequest,
    responses(
        (status = 200, description = "Segments updated", body = BulkSegmentResult),
        (status = 400, description = "Empty batch", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown client", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "clients"
)]
pub async fn bulk_update_segments(
    State(state): State<AppState>,
    session: Session,
    Json(payload): Json<BulkSegmentRequest>,
) -> Result<Json<ApiResponse<BulkSegmentResult>>, ServiceError> {
    let result = state
        .services
        .clients
        .bulk_update_segments(&session, payload)
        .await?;
    Ok(Json(ApiResponse::success(result)))
}
