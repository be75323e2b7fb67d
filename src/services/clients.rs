use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use super::non_blank;
use crate::{
    auth::Session,
    db::DbPool,
    entities::{
        appointment::{self, Entity as Appointment},
        client::{self, Column as ClientColumn, Entity as Client},
        AppointmentStatus, ClientSegment, ClientStatus,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    queries::{lower_contains, search_term, PageWindow},
    validation::{format_cpf, normalize_phone},
};

#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct CreateClientRequest {
    #[validate(length(max = 200), custom = "crate::validation::validate_not_blank")]
    pub name: String,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(custom = "crate::validation::validate_phone")]
    pub phone: Option<String>,
    #[validate(custom = "crate::validation::validate_cpf")]
    pub cpf: Option<String>,
    pub birthday: Option<NaiveDate>,
    #[schema(value_type = Option<Object>)]
    pub address: Option<serde_json::Value>,
    pub preferences: Option<String>,
    pub observations: Option<String>,
    pub status: Option<ClientStatus>,
    pub segment: Option<ClientSegment>,
}

/// Partial client update; also the payload of an auto-saved draft.
#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate, ToSchema)]
pub struct UpdateClientRequest {
    #[validate(length(max = 200), custom = "crate::validation::validate_not_blank")]
    pub name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(custom = "crate::validation::validate_phone")]
    pub phone: Option<String>,
    #[validate(custom = "crate::validation::validate_cpf")]
    pub cpf: Option<String>,
    pub birthday: Option<NaiveDate>,
    #[schema(value_type = Option<Object>)]
    pub address: Option<serde_json::Value>,
    pub preferences: Option<String>,
    pub observations: Option<String>,
    pub status: Option<ClientStatus>,
    pub segment: Option<ClientSegment>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct ClientFilter {
    /// Matches name, email, phone or CPF
    pub search: Option<String>,
    pub status: Option<ClientStatus>,
    pub segment: Option<ClientSegment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SegmentCount {
    pub segment: String,
    pub count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ClientStats {
    pub total: u64,
    pub active: u64,
    pub inactive: u64,
    pub blocked: u64,
    pub vip: u64,
    pub at_risk: u64,
    pub new: u64,
    pub clients_by_segment: Vec<SegmentCount>,
    pub total_spent: Decimal,
}

impl ClientStats {
    pub fn from_rows<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = (ClientStatus, Option<ClientSegment>, Decimal)>,
    {
        let mut stats = ClientStats::default();
        let mut by_segment: BTreeMap<String, u64> = BTreeMap::new();
        for (status, segment, spent) in rows {
            stats.total += 1;
            stats.total_spent += spent;
            match status {
                ClientStatus::Active => stats.active += 1,
                ClientStatus::Inactive => stats.inactive += 1,
                ClientStatus::Blocked => stats.blocked += 1,
            }
            match segment {
                Some(ClientSegment::Vip) => stats.vip += 1,
                Some(ClientSegment::AtRisk) => stats.at_risk += 1,
                Some(ClientSegment::New) => stats.new += 1,
                _ => {}
            }
            let key = segment.map_or_else(|| "unclassified".to_string(), |s| s.to_string());
            *by_segment.entry(key).or_insert(0) += 1;
        }
        stats.clients_by_segment = by_segment
            .into_iter()
            .map(|(segment, count)| SegmentCount { segment, count })
            .collect();
        stats
    }
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct BirthdayParams {
    /// Look-ahead window, 0 to 366 days; defaults to 30
    pub days: Option<i64>,
}

/// Birthday lists and birthday campaigns look this many days ahead.
pub const DEFAULT_BIRTHDAY_WINDOW_DAYS: i64 = 30;
pub const MAX_BIRTHDAY_WINDOW_DAYS: i64 = 366;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UpcomingBirthday {
    #[serde(flatten)]
    pub client: client::Model,
    pub next_birthday: NaiveDate,
    pub days_until: i64,
    pub turning: i32,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct SegmentUpdate {
    pub client_id: Uuid,
    pub segment: ClientSegment,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct BulkSegmentRequest {
    pub updates: Vec<SegmentUpdate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BulkSegmentResult {
    pub updated: usize,
}

/// First birthday on or after `today`. A 29 February birthday falls on the
/// 28th in common years. `None` past the calendar's end.
pub fn next_birthday(birthday: NaiveDate, today: NaiveDate) -> Option<NaiveDate> {
    let on = |year: i32| {
        NaiveDate::from_ymd_opt(year, birthday.month(), birthday.day())
            .or_else(|| NaiveDate::from_ymd_opt(year, 2, 28))
    };
    let this_year = on(today.year())?;
    if this_year >= today {
        Some(this_year)
    } else {
        on(today.year() + 1)
    }
}

/// Clients whose next birthday is at most `days` away, soonest first.
pub fn upcoming_birthdays<I>(clients: I, today: NaiveDate, days: i64) -> Vec<UpcomingBirthday>
where
    I: IntoIterator<Item = client::Model>,
{
    let mut upcoming: Vec<UpcomingBirthday> = clients
        .into_iter()
        .filter_map(|client| {
            let birthday = client.birthday?;
            let next = next_birthday(birthday, today)?;
            let days_until = (next - today).num_days();
            (days_until <= days).then(|| UpcomingBirthday {
                turning: next.year() - birthday.year(),
                next_birthday: next,
                days_until,
                client,
            })
        })
        .collect();
    upcoming.sort_by(|a, b| {
        a.days_until
            .cmp(&b.days_until)
            .then_with(|| a.client.name.cmp(&b.client.name))
    });
    upcoming
}

fn normalized_cpf(raw: Option<String>) -> Result<Option<String>, ServiceError> {
    match non_blank(raw) {
        None => Ok(None),
        Some(cpf) => format_cpf(&cpf)
            .map(Some)
            .ok_or_else(|| ServiceError::ValidationError("cpf: invalid CPF".to_string())),
    }
}

fn normalized_phone(raw: Option<String>) -> Result<Option<String>, ServiceError> {
    match non_blank(raw) {
        None => Ok(None),
        Some(phone) => normalize_phone(&phone).map(Some).ok_or_else(|| {
            ServiceError::ValidationError("phone: phone must have 10 or 11 digits".to_string())
        }),
    }
}

/// Service for the clinic's client records
pub struct ClientService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl ClientService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    async fn ensure_cpf_free(
        &self,
        session: &Session,
        cpf: &str,
        except: Option<Uuid>,
    ) -> Result<(), ServiceError> {
        let mut query = Client::find()
            .filter(ClientColumn::UserId.eq(session.user_id))
            .filter(ClientColumn::Cpf.eq(cpf));
        if let Some(id) = except {
            query = query.filter(ClientColumn::Id.ne(id));
        }
        if query.count(&*self.db_pool).await? > 0 {
            return Err(ServiceError::Conflict(format!(
                "a client with CPF {} already exists",
                cpf
            )));
        }
        Ok(())
    }

    #[instrument(skip(self, request), fields(user_id = %session.user_id))]
    pub async fn create_client(
        &self,
        session: &Session,
        request: CreateClientRequest,
    ) -> Result<client::Model, ServiceError> {
        request.validate()?;
        let cpf = normalized_cpf(request.cpf)?;
        if let Some(cpf) = &cpf {
            self.ensure_cpf_free(session, cpf, None).await?;
        }

        let now = Utc::now();
        let created = client::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(session.user_id),
            name: Set(request.name.trim().to_string()),
            email: Set(non_blank(request.email)),
            phone: Set(normalized_phone(request.phone)?),
            cpf: Set(cpf),
            birthday: Set(request.birthday),
            address: Set(request.address),
            preferences: Set(non_blank(request.preferences)),
            observations: Set(non_blank(request.observations)),
            status: Set(request.status.unwrap_or(ClientStatus::Active)),
            segment: Set(Some(request.segment.unwrap_or(ClientSegment::New))),
            first_visit: Set(None),
            last_visit: Set(None),
            total_spent: Set(Decimal::ZERO),
            total_visits: Set(0),
            ltv_score: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db_pool)
        .await?;

        self.event_sender
            .send_or_log(Event::ClientSaved(created.id))
            .await;
        info!(client_id = %created.id, "Client created");
        Ok(created)
    }

    #[instrument(skip(self), fields(user_id = %session.user_id))]
    pub async fn get_client(&self, session: &Session, id: Uuid) -> Result<client::Model, ServiceError> {
        Client::find_by_id(id)
            .filter(ClientColumn::UserId.eq(session.user_id))
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::not_found("Client", id))
    }

    #[instrument(skip(self, request), fields(user_id = %session.user_id))]
    pub async fn update_client(
        &self,
        session: &Session,
        id: Uuid,
        request: UpdateClientRequest,
    ) -> Result<client::Model, ServiceError> {
        request.validate()?;
        let existing = self.get_client(session, id).await?;

        let cpf = match request.cpf {
            Some(raw) => {
                let cpf = normalized_cpf(Some(raw))?;
                if let Some(cpf) = cpf.as_deref().filter(|c| existing.cpf.as_deref() != Some(*c)) {
                    self.ensure_cpf_free(session, cpf, Some(id)).await?;
                }
                Some(cpf)
            }
            None => None,
        };

        let mut model: client::ActiveModel = existing.into();
        if let Some(name) = request.name {
            model.name = Set(name.trim().to_string());
        }
        if request.email.is_some() {
            model.email = Set(non_blank(request.email));
        }
        if request.phone.is_some() {
            model.phone = Set(normalized_phone(request.phone)?);
        }
        if let Some(cpf) = cpf {
            model.cpf = Set(cpf);
        }
        if request.birthday.is_some() {
            model.birthday = Set(request.birthday);
        }
        if request.address.is_some() {
            model.address = Set(request.address);
        }
        if request.preferences.is_some() {
            model.preferences = Set(non_blank(request.preferences));
        }
        if request.observations.is_some() {
            model.observations = Set(non_blank(request.observations));
        }
        if let Some(status) = request.status {
            model.status = Set(status);
        }
        if let Some(segment) = request.segment {
            model.segment = Set(Some(segment));
        }
        model.updated_at = Set(Utc::now());

        let updated = model.update(&*self.db_pool).await?;
        self.event_sender
            .send_or_log(Event::ClientSaved(updated.id))
            .await;
        Ok(updated)
    }

    /// Refused while the client still has upcoming appointments.
    #[instrument(skip(self), fields(user_id = %session.user_id))]
    pub async fn delete_client(&self, session: &Session, id: Uuid) -> Result<(), ServiceError> {
        self.get_client(session, id).await?;

        let upcoming = Appointment::find()
            .filter(appointment::Column::UserId.eq(session.user_id))
            .filter(appointment::Column::ClientId.eq(id))
            .filter(appointment::Column::ScheduledAt.gt(Utc::now()))
            .filter(
                appointment::Column::Status
                    .is_in([AppointmentStatus::Scheduled, AppointmentStatus::Confirmed]),
            )
            .count(&*self.db_pool)
            .await?;
        if upcoming > 0 {
            return Err(ServiceError::Conflict(format!(
                "client has {} upcoming appointment(s)",
                upcoming
            )));
        }

        Client::delete_by_id(id).exec(&*self.db_pool).await?;
        self.event_sender.send_or_log(Event::ClientDeleted(id)).await;
        info!(client_id = %id, "Client deleted");
        Ok(())
    }

    #[instrument(skip(self, filter), fields(user_id = %session.user_id))]
    pub async fn list_clients(
        &self,
        session: &Session,
        filter: ClientFilter,
        window: PageWindow,
    ) -> Result<(Vec<client::Model>, u64), ServiceError> {
        let mut query = Client::find().filter(ClientColumn::UserId.eq(session.user_id));
        if let Some(term) = filter.search.as_deref().and_then(search_term) {
            let digits = crate::validation::digits_only(&term);
            let mut any = Condition::any()
                .add(lower_contains((Client, ClientColumn::Name), &term))
                .add(lower_contains((Client, ClientColumn::Email), &term));
            if !digits.is_empty() {
                any = any
                    .add(ClientColumn::Phone.contains(digits.as_str()))
                    .add(lower_contains((Client, ClientColumn::Cpf), &term));
            }
            query = query.filter(any);
        }
        if let Some(status) = filter.status {
            query = query.filter(ClientColumn::Status.eq(status));
        }
        if let Some(segment) = filter.segment {
            query = query.filter(ClientColumn::Segment.eq(segment));
        }

        let total = query.clone().count(&*self.db_pool).await?;
        let clients = query
            .order_by_asc(ClientColumn::Name)
            .order_by_asc(ClientColumn::Id)
            .offset(window.offset())
            .limit(window.per_page)
            .all(&*self.db_pool)
            .await?;
        Ok((clients, total))
    }

    /// Active clients with a birthday in the next `days` days.
    #[instrument(skip(self), fields(user_id = %session.user_id))]
    pub async fn upcoming_birthdays(
        &self,
        session: &Session,
        days: i64,
        today: NaiveDate,
    ) -> Result<Vec<UpcomingBirthday>, ServiceError> {
        if !(0..=MAX_BIRTHDAY_WINDOW_DAYS).contains(&days) {
            return Err(ServiceError::ValidationError(format!(
                "days: must be between 0 and {}",
                MAX_BIRTHDAY_WINDOW_DAYS
            )));
        }
        let clients = Client::find()
            .filter(ClientColumn::UserId.eq(session.user_id))
            .filter(ClientColumn::Status.eq(ClientStatus::Active))
            .filter(ClientColumn::Birthday.is_not_null())
            .all(&*self.db_pool)
            .await?;
        Ok(upcoming_birthdays(clients, today, days))
    }

    #[instrument(skip(self), fields(user_id = %session.user_id))]
    pub async fn update_segment(
        &self,
        session: &Session,
        id: Uuid,
        segment: ClientSegment,
    ) -> Result<client::Model, ServiceError> {
        let request = UpdateClientRequest {
            segment: Some(segment),
            ..Default::default()
        };
        self.update_client(session, id, request).await
    }

    /// Applies every segment change or none of them.
    #[instrument(skip(self, request), fields(user_id = %session.user_id, count = request.updates.len()))]
    pub async fn bulk_update_segments(
        &self,
        session: &Session,
        request: BulkSegmentRequest,
    ) -> Result<BulkSegmentResult, ServiceError> {
        if request.updates.is_empty() {
            return Err(ServiceError::ValidationError(
                "updates: at least one segment change is required".to_string(),
            ));
        }

        let txn = self.db_pool.begin().await?;
        let now = Utc::now();
        for update in &request.updates {
            let client = Client::find_by_id(update.client_id)
                .filter(ClientColumn::UserId.eq(session.user_id))
                .one(&txn)
                .await?
                .ok_or_else(|| ServiceError::not_found("Client", update.client_id))?;
            let mut model: client::ActiveModel = client.into();
            model.segment = Set(Some(update.segment));
            model.updated_at = Set(now);
            model.update(&txn).await?;
        }
        txn.commit().await?;

        for update in &request.updates {
            self.event_sender
                .send_or_log(Event::ClientSaved(update.client_id))
                .await;
        }
        info!(count = request.updates.len(), "Client segments updated");
        Ok(BulkSegmentResult {
            updated: request.updates.len(),
        })
    }

    pub async fn stats(&self, session: &Session) -> Result<ClientStats, ServiceError> {
        let rows: Vec<(ClientStatus, Option<ClientSegment>, Decimal)> = Client::find()
            .select_only()
            .column(ClientColumn::Status)
            .column(ClientColumn::Segment)
            .column(ClientColumn::TotalSpent)
            .filter(ClientColumn::UserId.eq(session.user_id))
            .into_tuple()
            .all(&*self.db_pool)
            .await?;
        Ok(ClientStats::from_rows(rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn stats_count_status_and_segment() {
        let stats = ClientStats::from_rows(vec![
            (ClientStatus::Active, Some(ClientSegment::Vip), dec!(1200)),
            (ClientStatus::Active, Some(ClientSegment::New), dec!(0)),
            (ClientStatus::Inactive, Some(ClientSegment::AtRisk), dec!(300)),
            (ClientStatus::Blocked, None, dec!(50)),
        ]);

        assert_eq!(stats.total, 4);
        assert_eq!((stats.active, stats.inactive, stats.blocked), (2, 1, 1));
        assert_eq!((stats.vip, stats.at_risk, stats.new), (1, 1, 1));
        assert_eq!(stats.total_spent, dec!(1550));
        assert!(stats
            .clients_by_segment
            .contains(&SegmentCount { segment: "unclassified".into(), count: 1 }));
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn client_born(name: &str, birthday: Option<NaiveDate>) -> client::Model {
        let now = Utc::now();
        client::Model {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            name: name.into(),
            email: None,
            phone: None,
            cpf: None,
            birthday,
            address: None,
            preferences: None,
            observations: None,
            status: ClientStatus::Active,
            segment: None,
            first_visit: None,
            last_visit: None,
            total_spent: Decimal::ZERO,
            total_visits: 0,
            ltv_score: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn next_birthday_rolls_into_next_year() {
        let today = date(2026, 6, 15);
        assert_eq!(next_birthday(date(1990, 6, 15), today), Some(today));
        assert_eq!(next_birthday(date(1990, 7, 1), today), Some(date(2026, 7, 1)));
        assert_eq!(next_birthday(date(1990, 1, 10), today), Some(date(2027, 1, 10)));
    }

    #[test]
    fn leap_day_birthdays_fall_on_the_28th_in_common_years() {
        assert_eq!(
            next_birthday(date(2000, 2, 29), date(2026, 2, 1)),
            Some(date(2026, 2, 28))
        );
        assert_eq!(
            next_birthday(date(2000, 2, 29), date(2027, 3, 1)),
            Some(date(2028, 2, 29))
        );
    }

    #[test]
    fn upcoming_birthdays_are_windowed_and_sorted() {
        let today = date(2026, 12, 20);
        let clients = vec![
            client_born("Carla", Some(date(1985, 1, 5))),
            client_born("Bruna", Some(date(1992, 12, 25))),
            client_born("Ana", Some(date(1992, 12, 25))),
            client_born("Dora", Some(date(1980, 3, 1))),
            client_born("Eva", None),
        ];
        let upcoming = upcoming_birthdays(clients, today, 30);
        let names: Vec<&str> = upcoming.iter().map(|b| b.client.name.as_str()).collect();
        assert_eq!(names, ["Ana", "Bruna", "Carla"]);
        assert_eq!(upcoming[0].days_until, 5);
        assert_eq!(upcoming[0].turning, 34);
        assert_eq!(upcoming[2].next_birthday, date(2027, 1, 5));
        assert_eq!(upcoming[2].turning, 42);
    }

    #[test]
    fn cpf_and_phone_are_normalized() {
        assert_eq!(
            normalized_cpf(Some("52998224725".into())).unwrap().as_deref(),
            Some("529.982.247-25")
        );
        assert_eq!(normalized_cpf(Some("  ".into())).unwrap(), None);
        assert!(normalized_cpf(Some("123".into())).is_err());
        assert_eq!(
            normalized_phone(Some("(11) 98765-4321".into())).unwrap().as_deref(),
            Some("11987654321")
        );
    }
}
