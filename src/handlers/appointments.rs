use axum::{
    extract::{Path, Query, State},
    response::{Json, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::common::{
    created_response, no_content_response, LinkResponse, PaginatedResponse, PaginationParams,
};
use crate::{
    auth::Session,
    entities::AppointmentStatus,
    errors::ServiceError,
    services::appointments::{
        AppointmentDetails, AppointmentFilter, CreateAppointmentRequest, UpdateAppointmentRequest,
    },
    ApiResponse, AppState,
};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UpdateStatusRequest {
    pub status: AppointmentStatus,
}

pub fn appointments_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/appointments",
            get(list_appointments).post(create_appointment),
        )
        .route(
            "/appointments/:id",
            get(get_appointment)
                .put(update_appointment)
                .delete(delete_appointment),
        )
        .route(
            "/appointments/:id/status",
            axum::routing::put(update_status),
        )
        .route("/appointments/:id/calendar-link", get(calendar_link))
}

/// Agenda in chronological order, joined with client and procedure
#[utoipa::path(
    get,
    path = "/api/v1/appointments",
    params(AppointmentFilter, PaginationParams),
    responses(
        (status = 200, description = "Page of appointments"),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "appointments"
)]
pub async fn list_appointments(
    State(state): State<AppState>,
    session: Session,
    Query(filter): Query<AppointmentFilter>,
    Query(pagination): Query<PaginationParams>,
) -> Result<Json<PaginatedResponse<AppointmentDetails>>, ServiceError> {
    let window = pagination.window(&state);
    let (appointments, total) = state
        .services
        .appointments
        .list_appointments(&session, filter, window)
        .await?;
    Ok(Json(PaginatedResponse::new(appointments, window, total)))
}

#[utoipa::path(
    post,
    path = "/api/v1/appointments",
    request_body = CreateAppointmentRequest,
    responses(
        (status = 201, description = "Appointment booked", body = AppointmentDetails),
        (status = 400, description = "Client or procedure cannot be booked", body = crate::errors::ErrorResponse),
        (status = 404, description = "Client or procedure not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "appointments"
)]
pub async fn create_appointment(
    State(state): State<AppState>,
    session: Session,
    Json(payload): Json<CreateAppointmentRequest>,
) -> Result<Response, ServiceError> {
    let appointment = state
        .services
        .appointments
        .create_appointment(&session, payload)
        .await?;
    Ok(created_response(appointment))
}

#[utoipa::path(
    get,
    path = "/api/v1/appointments/{id}",
    params(("id" = Uuid, Path, description = "Appointment id")),
    responses(
        (status = 200, description = "Appointment", body = AppointmentDetails),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "appointments"
)]
pub async fn get_appointment(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<AppointmentDetails>>, ServiceError> {
    let appointment = state
        .services
        .appointments
        .get_appointment(&session, id)
        .await?;
    Ok(Json(ApiResponse::success(appointment)))
}

#[utoipa::path(
    put,
    path = "/api/v1/appointments/{id}",
    params(("id" = Uuid, Path, description = "Appointment id")),
    request_body = UpdateAppointmentRequest,
    responses(
        (status = 200, description = "Appointment updated", body = AppointmentDetails),
        (status = 400, description = "Appointment is final", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "appointments"
)]
pub async fn update_appointment(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateAppointmentRequest>,
) -> Result<Json<ApiResponse<AppointmentDetails>>, ServiceError> {
    let appointment = state
        .services
        .appointments
        .update_appointment(&session, id, payload)
        .await?;
    Ok(Json(ApiResponse::success(appointment)))
}

#[utoipa::path(
    put,
    path = "/api/v1/appointments/{id}/status",
    params(("id" = Uuid, Path, description = "Appointment id")),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Status changed", body = AppointmentDetails),
        (status = 400, description = "Appointment is final", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "appointments"
)]
pub async fn update_status(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<Json<ApiResponse<AppointmentDetails>>, ServiceError> {
    let appointment = state
        .services
        .appointments
        .update_status(&session, id, payload.status)
        .await?;
    Ok(Json(ApiResponse::success(appointment)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/appointments/{id}",
    params(("id" = Uuid, Path, description = "Appointment id")),
    responses(
        (status = 204, description = "Appointment deleted"),
        (status = 400, description = "Completed appointments are kept", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "appointments"
)]
pub async fn delete_appointment(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> Result<Response, ServiceError> {
    state
        .services
        .appointments
        .delete_appointment(&session, id)
        .await?;
    Ok(no_content_response())
}

#[utoipa::path(
    get,
    path = "/api/v1/appointments/{id}/calendar-link",
    params(("id" = Uuid, Path, description = "Appointment id")),
    responses(
        (status = 200, description = "Google Calendar link", body = LinkResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "appointments"
)]
pub async fn calendar_link(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<LinkResponse>>, ServiceError> {
    let url = state.services.appointments.calendar_link(&session, id).await?;
    Ok(Json(ApiResponse::success(LinkResponse {
        url: url.to_string(),
    })))
}
