use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, LoaderTrait, ModelTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use url::Url;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use super::non_blank;
use crate::{
    auth::Session,
    db::DbPool,
    entities::{
        appointment::{self, Column as AppointmentColumn, Entity as Appointment},
        client::{self, Entity as Client},
        procedure::{self, Entity as Procedure},
        AppointmentStatus, ClientStatus,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    links,
    queries::PageWindow,
};

pub const MIN_DURATION_MINUTES: i32 = 15;

#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct CreateAppointmentRequest {
    pub client_id: Uuid,
    pub procedure_id: Uuid,
    pub scheduled_at: DateTime<Utc>,
    /// Defaults to the procedure's duration
    #[validate(range(min = 15, max = 720))]
    pub duration_minutes: Option<i32>,
    pub status: Option<AppointmentStatus>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate, ToSchema)]
pub struct UpdateAppointmentRequest {
    pub procedure_id: Option<Uuid>,
    pub scheduled_at: Option<DateTime<Utc>>,
    #[validate(range(min = 15, max = 720))]
    pub duration_minutes: Option<i32>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct AppointmentFilter {
    /// Inclusive lower bound on `scheduled_at`
    pub from: Option<DateTime<Utc>>,
    /// Exclusive upper bound on `scheduled_at`
    pub to: Option<DateTime<Utc>>,
    pub status: Option<AppointmentStatus>,
    pub client_id: Option<Uuid>,
}

/// An appointment with the client and procedure fields the agenda shows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AppointmentDetails {
    #[serde(flatten)]
    pub appointment: appointment::Model,
    pub client_name: Option<String>,
    pub client_phone: Option<String>,
    pub procedure_name: Option<String>,
    pub procedure_price: Option<Decimal>,
}

impl AppointmentDetails {
    fn assemble(
        appointment: appointment::Model,
        client: Option<client::Model>,
        procedure: Option<procedure::Model>,
    ) -> Self {
        Self {
            appointment,
            client_name: client.as_ref().map(|c| c.name.clone()),
            client_phone: client.and_then(|c| c.phone),
            procedure_name: procedure.as_ref().map(|p| p.name.clone()),
            procedure_price: procedure.map(|p| p.price),
        }
    }
}

/// A client's appointments, newest first, with totals over the completed ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ClientHistory {
    pub client: client::Model,
    pub appointments: Vec<AppointmentDetails>,
    pub total_spent: Decimal,
    pub total_visits: u64,
    pub last_visit: Option<DateTime<Utc>>,
}

impl ClientHistory {
    fn new(client: client::Model, appointments: Vec<AppointmentDetails>) -> Self {
        let completed = || {
            appointments
                .iter()
                .filter(|a| a.appointment.status == AppointmentStatus::Completed)
        };
        Self {
            total_spent: completed()
                .filter_map(|a| a.procedure_price)
                .fold(Decimal::ZERO, |t, p| t.saturating_add(p)),
            total_visits: completed().count() as u64,
            last_visit: completed().map(|a| a.appointment.scheduled_at).max(),
            client,
            appointments,
        }
    }
}

fn ensure_not_final(current: &appointment::Model) -> Result<(), ServiceError> {
    if current.status.is_final() {
        return Err(ServiceError::InvalidOperation(format!(
            "appointment is {} and can no longer change",
            current.status
        )));
    }
    Ok(())
}

/// Service for the clinic agenda
pub struct AppointmentService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl AppointmentService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    async fn bookable_procedure(&self, session: &Session, id: Uuid) -> Result<procedure::Model, ServiceError> {
        let procedure = Procedure::find_by_id(id)
            .filter(procedure::Column::UserId.eq(session.user_id))
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::not_found("Procedure", id))?;
        if !procedure.is_active {
            return Err(ServiceError::InvalidOperation(format!(
                "procedure {} is inactive and cannot be booked",
                procedure.name
            )));
        }
        Ok(procedure)
    }

    #[instrument(skip(self, request), fields(user_id = %session.user_id))]
    pub async fn create_appointment(
        &self,
        session: &Session,
        request: CreateAppointmentRequest,
    ) -> Result<AppointmentDetails, ServiceError> {
        request.validate()?;

        let client = Client::find_by_id(request.client_id)
            .filter(client::Column::UserId.eq(session.user_id))
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::not_found("Client", request.client_id))?;
        if client.status != ClientStatus::Active {
            return Err(ServiceError::InvalidOperation(format!(
                "client {} is {} and cannot book appointments",
                client.name, client.status
            )));
        }
        let procedure = self.bookable_procedure(session, request.procedure_id).await?;
        let duration = request
            .duration_minutes
            .unwrap_or(procedure.duration_minutes)
            .max(MIN_DURATION_MINUTES);

        let now = Utc::now();
        let created = appointment::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(session.user_id),
            client_id: Set(client.id),
            procedure_id: Set(procedure.id),
            scheduled_at: Set(request.scheduled_at),
            duration_minutes: Set(Some(duration)),
            status: Set(request.status.unwrap_or(AppointmentStatus::Scheduled)),
            notes: Set(non_blank(request.notes)),
            google_event_id: Set(None),
            google_meet_link: Set(None),
            calendar_synced: Set(false),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db_pool)
        .await?;

        self.event_sender
            .send_or_log(Event::AppointmentScheduled(created.id))
            .await;
        info!(appointment_id = %created.id, scheduled_at = %created.scheduled_at, "Appointment scheduled");
        Ok(AppointmentDetails::assemble(created, Some(client), Some(procedure)))
    }

    async fn find(&self, session: &Session, id: Uuid) -> Result<appointment::Model, ServiceError> {
        Appointment::find_by_id(id)
            .filter(AppointmentColumn::UserId.eq(session.user_id))
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::not_found("Appointment", id))
    }

    async fn details(&self, appointment: appointment::Model) -> Result<AppointmentDetails, ServiceError> {
        let client = appointment.find_related(Client).one(&*self.db_pool).await?;
        let procedure = appointment.find_related(Procedure).one(&*self.db_pool).await?;
        Ok(AppointmentDetails::assemble(appointment, client, procedure))
    }

    #[instrument(skip(self), fields(user_id = %session.user_id))]
    pub async fn get_appointment(&self, session: &Session, id: Uuid) -> Result<AppointmentDetails, ServiceError> {
        let appointment = self.find(session, id).await?;
        self.details(appointment).await
    }

    #[instrument(skip(self, filter), fields(user_id = %session.user_id))]
    pub async fn list_appointments(
        &self,
        session: &Session,
        filter: AppointmentFilter,
        window: PageWindow,
    ) -> Result<(Vec<AppointmentDetails>, u64), ServiceError> {
        let mut query = Appointment::find().filter(AppointmentColumn::UserId.eq(session.user_id));
        if let Some(from) = filter.from {
            query = query.filter(AppointmentColumn::ScheduledAt.gte(from));
        }
        if let Some(to) = filter.to {
            query = query.filter(AppointmentColumn::ScheduledAt.lt(to));
        }
        if let Some(status) = filter.status {
            query = query.filter(AppointmentColumn::Status.eq(status));
        }
        if let Some(client_id) = filter.client_id {
            query = query.filter(AppointmentColumn::ClientId.eq(client_id));
        }

        let total = query.clone().count(&*self.db_pool).await?;
        let appointments = query
            .order_by_asc(AppointmentColumn::ScheduledAt)
            .order_by_asc(AppointmentColumn::Id)
            .offset(window.offset())
            .limit(window.per_page)
            .all(&*self.db_pool)
            .await?;

        let clients = appointments.load_one(Client, &*self.db_pool).await?;
        let procedures = appointments.load_one(Procedure, &*self.db_pool).await?;
        let rows = appointments
            .into_iter()
            .zip(clients)
            .zip(procedures)
            .map(|((a, c), p)| AppointmentDetails::assemble(a, c, p))
            .collect();
        Ok((rows, total))
    }

    #[instrument(skip(self, request), fields(user_id = %session.user_id))]
    pub async fn update_appointment(
        &self,
        session: &Session,
        id: Uuid,
        request: UpdateAppointmentRequest,
    ) -> Result<AppointmentDetails, ServiceError> {
        request.validate()?;
        let current = self.find(session, id).await?;
        ensure_not_final(&current)?;

        let mut model: appointment::ActiveModel = current.into();
        if let Some(procedure_id) = request.procedure_id {
            let procedure = self.bookable_procedure(session, procedure_id).await?;
            model.procedure_id = Set(procedure.id);
        }
        if let Some(at) = request.scheduled_at {
            model.scheduled_at = Set(at);
            model.calendar_synced = Set(false);
        }
        if let Some(duration) = request.duration_minutes {
            model.duration_minutes = Set(Some(duration));
        }
        if request.notes.is_some() {
            model.notes = Set(non_blank(request.notes));
        }
        model.updated_at = Set(Utc::now());

        let updated = model.update(&*self.db_pool).await?;
        self.details(updated).await
    }

    #[instrument(skip(self), fields(user_id = %session.user_id))]
    pub async fn update_status(
        &self,
        session: &Session,
        id: Uuid,
        status: AppointmentStatus,
    ) -> Result<AppointmentDetails, ServiceError> {
        let current = self.find(session, id).await?;
        if current.status == status {
            return self.details(current).await;
        }
        ensure_not_final(&current)?;

        let old_status = current.status;
        let mut model: appointment::ActiveModel = current.into();
        model.status = Set(status);
        model.updated_at = Set(Utc::now());
        let updated = model.update(&*self.db_pool).await?;

        info!(appointment_id = %id, %old_status, new_status = %status, "Appointment status changed");
        self.event_sender
            .send_or_log(Event::AppointmentStatusChanged {
                appointment_id: id,
                old_status,
                new_status: status,
            })
            .await;
        self.details(updated).await
    }

    #[instrument(skip(self), fields(user_id = %session.user_id))]
    pub async fn delete_appointment(&self, session: &Session, id: Uuid) -> Result<(), ServiceError> {
        let current = self.find(session, id).await?;
        if current.status == AppointmentStatus::Completed {
            return Err(ServiceError::InvalidOperation(
                "completed appointments cannot be deleted".to_string(),
            ));
        }
        Appointment::delete_by_id(id).exec(&*self.db_pool).await?;
        info!(appointment_id = %id, "Appointment deleted");
        Ok(())
    }

    /// Google Calendar link: the synced event when there is one, otherwise
    /// a prefilled "add event" form.
    pub async fn calendar_link(&self, session: &Session, id: Uuid) -> Result<Url, ServiceError> {
        let details = self.get_appointment(session, id).await?;
        let appointment = &details.appointment;
        if let Some(event_id) = appointment.google_event_id.as_deref() {
            return Ok(links::calendar_event_link(event_id)?);
        }

        let title = match (&details.procedure_name, &details.client_name) {
            (Some(procedure), Some(client)) => format!("{} - {}", procedure, client),
            (Some(procedure), None) => procedure.clone(),
            _ => "Appointment".to_string(),
        };
        let duration = appointment.duration_minutes.unwrap_or(60);
        Ok(links::calendar_template_link(
            &title,
            appointment.scheduled_at,
            i64::from(duration),
            appointment.notes.as_deref(),
        )?)
    }

    /// Σ procedure price of completed appointments scheduled in `[from, to)`.
    #[instrument(skip(self), fields(user_id = %session.user_id))]
    pub async fn completed_revenue(
        &self,
        session: &Session,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Decimal, ServiceError> {
        let rows = Appointment::find()
            .filter(AppointmentColumn::UserId.eq(session.user_id))
            .filter(AppointmentColumn::Status.eq(AppointmentStatus::Completed))
            .filter(AppointmentColumn::ScheduledAt.gte(from))
            .filter(AppointmentColumn::ScheduledAt.lt(to))
            .find_also_related(Procedure)
            .all(&*self.db_pool)
            .await?;

        rows.into_iter()
            .filter_map(|(_, procedure)| procedure.map(|p| p.price))
            .try_fold(Decimal::ZERO, |total, price| total.checked_add(price))
            .ok_or_else(|| {
                ServiceError::ValidationError("completed revenue exceeds the supported range".into())
            })
    }

    #[instrument(skip(self), fields(user_id = %session.user_id))]
    pub async fn client_history(
        &self,
        session: &Session,
        client_id: Uuid,
    ) -> Result<ClientHistory, ServiceError> {
        let client = Client::find_by_id(client_id)
            .filter(client::Column::UserId.eq(session.user_id))
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::not_found("Client", client_id))?;

        let rows = Appointment::find()
            .filter(AppointmentColumn::UserId.eq(session.user_id))
            .filter(AppointmentColumn::ClientId.eq(client_id))
            .order_by_desc(AppointmentColumn::ScheduledAt)
            .order_by_desc(AppointmentColumn::Id)
            .find_also_related(Procedure)
            .all(&*self.db_pool)
            .await?;
        let appointments = rows
            .into_iter()
            .map(|(a, p)| AppointmentDetails::assemble(a, Some(client.clone()), p))
            .collect();
        Ok(ClientHistory::new(client, appointments))
    }
}
