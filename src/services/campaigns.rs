use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, instrument};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::{
    clients::{ClientService, DEFAULT_BIRTHDAY_WINDOW_DAYS},
    non_blank, today,
};
use crate::{
    auth::Session,
    db::DbPool,
    entities::{
        campaign::{self, Column as CampaignColumn, Entity as Campaign},
        client::{self, Column as ClientColumn, Entity as Client},
        CampaignStatus, CampaignTargetType, CampaignTrigger, CampaignType, ClientSegment,
        ClientStatus,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    queries::{lower_contains, search_term, PageWindow},
};

fn validate_client_ids(ids: &[Uuid]) -> Result<(), ValidationError> {
    if ids.is_empty() {
        let mut err = ValidationError::new("client_ids");
        err.message = Some("at least one client id is required".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct CreateCampaignRequest {
    #[validate(length(max = 200), custom = "crate::validation::validate_not_blank")]
    pub name: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    pub campaign_type: CampaignType,
    #[serde(default)]
    pub trigger_type: CampaignTrigger,
    pub target_type: CampaignTargetType,
    /// Required when `target_type` is `segment`
    pub target_segment: Option<ClientSegment>,
    /// Required for `custom_list` and `individual` targets
    #[validate(custom = "validate_client_ids")]
    pub target_client_ids: Option<Vec<Uuid>>,
    #[schema(value_type = Option<Object>)]
    pub content: Option<serde_json::Value>,
    pub scheduled_at: Option<DateTime<Utc>>,
    #[validate(custom = "crate::validation::validate_amount")]
    pub cost: Option<Decimal>,
}

/// Partial update. Delivery counters are reported back by the sending channel.
#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate, ToSchema)]
pub struct UpdateCampaignRequest {
    #[validate(length(max = 200), custom = "crate::validation::validate_not_blank")]
    pub name: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    pub campaign_type: Option<CampaignType>,
    pub trigger_type: Option<CampaignTrigger>,
    pub target_type: Option<CampaignTargetType>,
    pub target_segment: Option<ClientSegment>,
    #[validate(custom = "validate_client_ids")]
    pub target_client_ids: Option<Vec<Uuid>>,
    #[schema(value_type = Option<Object>)]
    pub content: Option<serde_json::Value>,
    pub scheduled_at: Option<DateTime<Utc>>,
    #[validate(range(min = 0))]
    pub target_count: Option<i32>,
    #[validate(range(min = 0))]
    pub sent_count: Option<i32>,
    #[validate(range(min = 0))]
    pub delivered_count: Option<i32>,
    #[validate(range(min = 0))]
    pub opened_count: Option<i32>,
    #[validate(range(min = 0))]
    pub clicked_count: Option<i32>,
    #[validate(range(min = 0))]
    pub converted_count: Option<i32>,
    #[validate(custom = "crate::validation::validate_amount")]
    pub revenue_generated: Option<Decimal>,
    #[validate(custom = "crate::validation::validate_amount")]
    pub cost: Option<Decimal>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct CampaignFilter {
    pub status: Option<CampaignStatus>,
    pub campaign_type: Option<CampaignType>,
    pub target_segment: Option<ClientSegment>,
    /// Inclusive lower bound on `created_at`
    pub from: Option<DateTime<Utc>>,
    /// Exclusive upper bound on `created_at`
    pub to: Option<DateTime<Utc>>,
    /// Matches name or description
    pub search: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct DuplicateCampaignRequest {
    pub name: Option<String>,
}

/// Rates in percent, ROI as revenue per unit of cost; all to two places.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CampaignPerformance {
    pub open_rate: Decimal,
    pub click_rate: Decimal,
    pub conversion_rate: Decimal,
    pub roi: Decimal,
}

fn percent(part: i64, whole: i64) -> Decimal {
    if whole <= 0 {
        return Decimal::ZERO;
    }
    (Decimal::from(part) * Decimal::ONE_HUNDRED / Decimal::from(whole)).round_dp(2)
}

fn ratio(revenue: Decimal, cost: Decimal) -> Decimal {
    if cost <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    revenue
        .checked_div(cost)
        .map(|r| r.round_dp(2))
        .unwrap_or(Decimal::ZERO)
}

impl CampaignPerformance {
    pub fn of(c: &campaign::Model) -> Self {
        Self {
            open_rate: percent(c.opened_count.into(), c.target_count.into()),
            click_rate: percent(c.clicked_count.into(), c.opened_count.into()),
            conversion_rate: percent(c.converted_count.into(), c.target_count.into()),
            roi: ratio(c.revenue_generated, c.cost),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CampaignWithPerformance {
    #[serde(flatten)]
    pub campaign: campaign::Model,
    pub performance: CampaignPerformance,
}

/// Totals across every campaign of the account.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CampaignReport {
    pub total_campaigns: u64,
    pub active_campaigns: u64,
    pub total_sent: i64,
    pub total_opened: i64,
    pub total_clicked: i64,
    pub total_converted: i64,
    pub total_revenue: Decimal,
    pub total_cost: Decimal,
    pub avg_open_rate: Decimal,
    pub avg_click_rate: Decimal,
    pub avg_conversion_rate: Decimal,
    pub avg_roi: Decimal,
}

impl CampaignReport {
    pub fn from_campaigns<'a, I>(campaigns: I) -> Self
    where
        I: IntoIterator<Item = &'a campaign::Model>,
    {
        let mut report = CampaignReport::default();
        for c in campaigns {
            report.total_campaigns += 1;
            if c.status == CampaignStatus::Active {
                report.active_campaigns += 1;
            }
            report.total_sent += i64::from(c.sent_count);
            report.total_opened += i64::from(c.opened_count);
            report.total_clicked += i64::from(c.clicked_count);
            report.total_converted += i64::from(c.converted_count);
            report.total_revenue = report.total_revenue.saturating_add(c.revenue_generated);
            report.total_cost = report.total_cost.saturating_add(c.cost);
        }
        report.avg_open_rate = percent(report.total_opened, report.total_sent);
        report.avg_click_rate = percent(report.total_clicked, report.total_opened);
        report.avg_conversion_rate = percent(report.total_converted, report.total_sent);
        report.avg_roi = ratio(report.total_revenue, report.total_cost);
        report
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AudienceKind {
    AllClients,
    Segment,
    Birthdays,
    ClientList,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AudienceMember {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl From<client::Model> for AudienceMember {
    fn from(c: client::Model) -> Self {
        Self {
            id: c.id,
            name: c.name,
            email: c.email,
            phone: c.phone,
        }
    }
}

/// Active clients a campaign would reach.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Audience {
    pub kind: AudienceKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub segment: Option<ClientSegment>,
    pub client_count: usize,
    pub clients: Vec<AudienceMember>,
}

impl Audience {
    fn new(kind: AudienceKind, segment: Option<ClientSegment>, clients: Vec<AudienceMember>) -> Self {
        Self {
            kind,
            segment,
            client_count: clients.len(),
            clients,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct TargetingParams {
    /// Active clients in this segment
    pub segment: Option<ClientSegment>,
    /// Active clients with a birthday in the next N days
    pub birthdays_within_days: Option<i64>,
}

fn check_targeting(
    target_type: CampaignTargetType,
    segment: Option<ClientSegment>,
    client_ids: &[Uuid],
) -> Result<(), ServiceError> {
    match target_type {
        CampaignTargetType::Segment if segment.is_none() => Err(ServiceError::ValidationError(
            "target_segment: required when targeting a segment".to_string(),
        )),
        CampaignTargetType::CustomList | CampaignTargetType::Individual if client_ids.is_empty() => {
            Err(ServiceError::ValidationError(
                "target_client_ids: required for custom lists and individual targets".to_string(),
            ))
        }
        CampaignTargetType::Individual if client_ids.len() > 1 => Err(ServiceError::ValidationError(
            "target_client_ids: an individual target takes exactly one client".to_string(),
        )),
        _ => Ok(()),
    }
}

fn criteria(client_ids: &[Uuid]) -> Option<serde_json::Value> {
    (!client_ids.is_empty()).then(|| json!({ "client_ids": client_ids }))
}

/// Marketing campaigns, their performance and their audiences
pub struct CampaignService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    clients: Arc<ClientService>,
}

impl CampaignService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>, clients: Arc<ClientService>) -> Self {
        Self {
            db_pool,
            event_sender,
            clients,
        }
    }

    async fn find(&self, session: &Session, id: Uuid) -> Result<campaign::Model, ServiceError> {
        Campaign::find_by_id(id)
            .filter(CampaignColumn::UserId.eq(session.user_id))
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::not_found("Campaign", id))
    }

    #[instrument(skip(self, request), fields(user_id = %session.user_id))]
    pub async fn create_campaign(
        &self,
        session: &Session,
        request: CreateCampaignRequest,
    ) -> Result<campaign::Model, ServiceError> {
        request.validate()?;
        let client_ids = request.target_client_ids.unwrap_or_default();
        check_targeting(request.target_type, request.target_segment, &client_ids)?;

        let now = Utc::now();
        let created = campaign::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(session.user_id),
            name: Set(request.name.trim().to_string()),
            description: Set(non_blank(request.description)),
            campaign_type: Set(request.campaign_type),
            status: Set(CampaignStatus::Draft),
            trigger_type: Set(request.trigger_type),
            target_type: Set(request.target_type),
            target_segment: Set(request.target_segment),
            target_criteria: Set(criteria(&client_ids)),
            content: Set(request.content),
            scheduled_at: Set(request.scheduled_at),
            started_at: Set(None),
            completed_at: Set(None),
            target_count: Set(0),
            sent_count: Set(0),
            delivered_count: Set(0),
            opened_count: Set(0),
            clicked_count: Set(0),
            converted_count: Set(0),
            revenue_generated: Set(Decimal::ZERO),
            cost: Set(request.cost.unwrap_or(Decimal::ZERO)),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db_pool)
        .await?;

        self.event_sender
            .send_or_log(Event::CampaignSaved(created.id))
            .await;
        info!(campaign_id = %created.id, "Campaign created");
        Ok(created)
    }

    #[instrument(skip(self), fields(user_id = %session.user_id))]
    pub async fn get_campaign(
        &self,
        session: &Session,
        id: Uuid,
    ) -> Result<CampaignWithPerformance, ServiceError> {
        let campaign = self.find(session, id).await?;
        Ok(CampaignWithPerformance {
            performance: CampaignPerformance::of(&campaign),
            campaign,
        })
    }

    #[instrument(skip(self, request), fields(user_id = %session.user_id))]
    pub async fn update_campaign(
        &self,
        session: &Session,
        id: Uuid,
        request: UpdateCampaignRequest,
    ) -> Result<campaign::Model, ServiceError> {
        request.validate()?;
        let existing = self.find(session, id).await?;

        let target_type = request.target_type.unwrap_or(existing.target_type);
        let segment = request.target_segment.or(existing.target_segment);
        let client_ids = request
            .target_client_ids
            .clone()
            .unwrap_or_else(|| existing.target_client_ids());
        check_targeting(target_type, segment, &client_ids)?;

        let mut model: campaign::ActiveModel = existing.into();
        if let Some(name) = request.name {
            model.name = Set(name.trim().to_string());
        }
        if request.description.is_some() {
            model.description = Set(non_blank(request.description));
        }
        if let Some(t) = request.campaign_type {
            model.campaign_type = Set(t);
        }
        if let Some(t) = request.trigger_type {
            model.trigger_type = Set(t);
        }
        model.target_type = Set(target_type);
        model.target_segment = Set(segment);
        if request.target_client_ids.is_some() {
            model.target_criteria = Set(criteria(&client_ids));
        }
        if request.content.is_some() {
            model.content = Set(request.content);
        }
        if request.scheduled_at.is_some() {
            model.scheduled_at = Set(request.scheduled_at);
        }
        let counters = [
            (request.target_count, &mut model.target_count),
            (request.sent_count, &mut model.sent_count),
            (request.delivered_count, &mut model.delivered_count),
            (request.opened_count, &mut model.opened_count),
            (request.clicked_count, &mut model.clicked_count),
            (request.converted_count, &mut model.converted_count),
        ];
        for (value, column) in counters {
            if let Some(value) = value {
                *column = Set(value);
            }
        }
        if let Some(revenue) = request.revenue_generated {
            model.revenue_generated = Set(revenue);
        }
        if let Some(cost) = request.cost {
            model.cost = Set(cost);
        }
        if let Some(active) = request.is_active {
            model.is_active = Set(active);
        }
        model.updated_at = Set(Utc::now());

        let updated = model.update(&*self.db_pool).await?;
        self.event_sender
            .send_or_log(Event::CampaignSaved(updated.id))
            .await;
        Ok(updated)
    }

    #[instrument(skip(self), fields(user_id = %session.user_id))]
    pub async fn delete_campaign(&self, session: &Session, id: Uuid) -> Result<(), ServiceError> {
        self.find(session, id).await?;
        Campaign::delete_by_id(id).exec(&*self.db_pool).await?;
        self.event_sender
            .send_or_log(Event::CampaignDeleted(id))
            .await;
        info!(campaign_id = %id, "Campaign deleted");
        Ok(())
    }

    /// Moves a campaign to `status`. Activating stamps `started_at`,
    /// completing stamps `completed_at`. Completed and cancelled campaigns
    /// stay where they are.
    #[instrument(skip(self), fields(user_id = %session.user_id))]
    pub async fn set_status(
        &self,
        session: &Session,
        id: Uuid,
        status: CampaignStatus,
    ) -> Result<campaign::Model, ServiceError> {
        let current = self.find(session, id).await?;
        if current.status == status {
            return Ok(current);
        }
        if current.status.is_final() {
            return Err(ServiceError::InvalidOperation(format!(
                "campaign is {} and can no longer change",
                current.status
            )));
        }

        let old_status = current.status;
        let now = Utc::now();
        let mut model: campaign::ActiveModel = current.into();
        model.status = Set(status);
        match status {
            CampaignStatus::Active => model.started_at = Set(Some(now)),
            CampaignStatus::Completed => model.completed_at = Set(Some(now)),
            _ => {}
        }
        model.updated_at = Set(now);
        let updated = model.update(&*self.db_pool).await?;

        info!(campaign_id = %id, %old_status, new_status = %status, "Campaign status changed");
        self.event_sender
            .send_or_log(Event::CampaignStatusChanged {
                campaign_id: id,
                old_status,
                new_status: status,
            })
            .await;
        Ok(updated)
    }

    /// Copies a campaign as a fresh draft with zeroed counters.
    #[instrument(skip(self, name), fields(user_id = %session.user_id))]
    pub async fn duplicate_campaign(
        &self,
        session: &Session,
        id: Uuid,
        name: Option<String>,
    ) -> Result<campaign::Model, ServiceError> {
        let source = self.find(session, id).await?;
        let name = non_blank(name).unwrap_or_else(|| format!("{} (copy)", source.name));

        let now = Utc::now();
        let copy = campaign::Model {
            id: Uuid::new_v4(),
            name,
            status: CampaignStatus::Draft,
            started_at: None,
            completed_at: None,
            target_count: 0,
            sent_count: 0,
            delivered_count: 0,
            opened_count: 0,
            clicked_count: 0,
            converted_count: 0,
            revenue_generated: Decimal::ZERO,
            created_at: now,
            updated_at: now,
            ..source
        };
        let created = campaign::ActiveModel::from(copy)
            .reset_all()
            .insert(&*self.db_pool)
            .await?;

        self.event_sender
            .send_or_log(Event::CampaignSaved(created.id))
            .await;
        info!(campaign_id = %created.id, source_id = %id, "Campaign duplicated");
        Ok(created)
    }

    #[instrument(skip(self, filter), fields(user_id = %session.user_id))]
    pub async fn list_campaigns(
        &self,
        session: &Session,
        filter: CampaignFilter,
        window: PageWindow,
    ) -> Result<(Vec<campaign::Model>, u64), ServiceError> {
        let mut query = Campaign::find().filter(CampaignColumn::UserId.eq(session.user_id));
        if let Some(status) = filter.status {
            query = query.filter(CampaignColumn::Status.eq(status));
        }
        if let Some(t) = filter.campaign_type {
            query = query.filter(CampaignColumn::CampaignType.eq(t));
        }
        if let Some(segment) = filter.target_segment {
            query = query.filter(CampaignColumn::TargetSegment.eq(segment));
        }
        if let Some(from) = filter.from {
            query = query.filter(CampaignColumn::CreatedAt.gte(from));
        }
        if let Some(to) = filter.to {
            query = query.filter(CampaignColumn::CreatedAt.lt(to));
        }
        if let Some(term) = filter.search.as_deref().and_then(search_term) {
            query = query.filter(
                Condition::any()
                    .add(lower_contains((Campaign, CampaignColumn::Name), &term))
                    .add(lower_contains((Campaign, CampaignColumn::Description), &term)),
            );
        }

        let total = query.clone().count(&*self.db_pool).await?;
        let campaigns = query
            .order_by_desc(CampaignColumn::CreatedAt)
            .order_by_desc(CampaignColumn::Id)
            .offset(window.offset())
            .limit(window.per_page)
            .all(&*self.db_pool)
            .await?;
        Ok((campaigns, total))
    }

    pub async fn report(&self, session: &Session) -> Result<CampaignReport, ServiceError> {
        let campaigns = Campaign::find()
            .filter(CampaignColumn::UserId.eq(session.user_id))
            .all(&*self.db_pool)
            .await?;
        Ok(CampaignReport::from_campaigns(&campaigns))
    }

    async fn active_clients(
        &self,
        session: &Session,
        extra: Condition,
    ) -> Result<Vec<AudienceMember>, ServiceError> {
        let clients = Client::find()
            .filter(ClientColumn::UserId.eq(session.user_id))
            .filter(ClientColumn::Status.eq(ClientStatus::Active))
            .filter(extra)
            .order_by_asc(ClientColumn::Name)
            .all(&*self.db_pool)
            .await?;
        Ok(clients.into_iter().map(AudienceMember::from).collect())
    }

    /// Active clients matching ad-hoc targeting: a segment, upcoming
    /// birthdays, or everyone.
    #[instrument(skip(self), fields(user_id = %session.user_id))]
    pub async fn targeting(
        &self,
        session: &Session,
        params: TargetingParams,
    ) -> Result<Audience, ServiceError> {
        match (params.segment, params.birthdays_within_days) {
            (Some(_), Some(_)) => Err(ServiceError::ValidationError(
                "choose either segment or birthdays_within_days".to_string(),
            )),
            (Some(segment), None) => {
                let clients = self
                    .active_clients(session, Condition::all().add(ClientColumn::Segment.eq(segment)))
                    .await?;
                Ok(Audience::new(AudienceKind::Segment, Some(segment), clients))
            }
            (None, Some(days)) => self.birthday_audience(session, days).await,
            (None, None) => {
                let clients = self.active_clients(session, Condition::all()).await?;
                Ok(Audience::new(AudienceKind::AllClients, None, clients))
            }
        }
    }

    async fn birthday_audience(&self, session: &Session, days: i64) -> Result<Audience, ServiceError> {
        let upcoming = self.clients.upcoming_birthdays(session, days, today()).await?;
        let clients = upcoming
            .into_iter()
            .map(|b| AudienceMember::from(b.client))
            .collect();
        Ok(Audience::new(AudienceKind::Birthdays, None, clients))
    }

    /// Clients the campaign targets right now.
    #[instrument(skip(self), fields(user_id = %session.user_id))]
    pub async fn audience(&self, session: &Session, id: Uuid) -> Result<Audience, ServiceError> {
        let campaign = self.find(session, id).await?;
        if campaign.campaign_type == CampaignType::Birthday
            && campaign.target_type == CampaignTargetType::AllClients
        {
            return self
                .birthday_audience(session, DEFAULT_BIRTHDAY_WINDOW_DAYS)
                .await;
        }

        match campaign.target_type {
            CampaignTargetType::AllClients => {
                let clients = self.active_clients(session, Condition::all()).await?;
                Ok(Audience::new(AudienceKind::AllClients, None, clients))
            }
            CampaignTargetType::Segment => {
                let segment = campaign.target_segment;
                let condition = match segment {
                    Some(s) => Condition::all().add(ClientColumn::Segment.eq(s)),
                    None => Condition::all().add(ClientColumn::Segment.is_null()),
                };
                let clients = self.active_clients(session, condition).await?;
                Ok(Audience::new(AudienceKind::Segment, segment, clients))
            }
            CampaignTargetType::CustomList | CampaignTargetType::Individual => {
                let ids = campaign.target_client_ids();
                let clients = self
                    .active_clients(session, Condition::all().add(ClientColumn::Id.is_in(ids)))
                    .await?;
                Ok(Audience::new(AudienceKind::ClientList, None, clients))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample() -> campaign::Model {
        let now = Utc::now();
        campaign::Model {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            name: "Summer peel".into(),
            description: None,
            campaign_type: CampaignType::Whatsapp,
            status: CampaignStatus::Active,
            trigger_type: CampaignTrigger::Manual,
            target_type: CampaignTargetType::AllClients,
            target_segment: None,
            target_criteria: None,
            content: None,
            scheduled_at: None,
            started_at: None,
            completed_at: None,
            target_count: 200,
            sent_count: 200,
            delivered_count: 190,
            opened_count: 80,
            clicked_count: 20,
            converted_count: 6,
            revenue_generated: dec!(1800),
            cost: dec!(300),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn performance_rates_are_percentages() {
        let p = CampaignPerformance::of(&sample());
        assert_eq!(p.open_rate, dec!(40));
        assert_eq!(p.click_rate, dec!(25));
        assert_eq!(p.conversion_rate, dec!(3));
        assert_eq!(p.roi, dec!(6));
    }

    #[test]
    fn empty_campaign_has_zero_rates() {
        let mut c = sample();
        c.target_count = 0;
        c.opened_count = 0;
        c.cost = Decimal::ZERO;
        assert_eq!(CampaignPerformance::of(&c), CampaignPerformance::default());
    }

    #[test]
    fn report_totals_and_averages() {
        let mut paused = sample();
        paused.status = CampaignStatus::Paused;
        paused.sent_count = 100;
        paused.opened_count = 10;
        paused.clicked_count = 5;
        paused.converted_count = 0;
        paused.revenue_generated = dec!(0);
        paused.cost = dec!(100);

        let report = CampaignReport::from_campaigns(&[sample(), paused]);
        assert_eq!(report.total_campaigns, 2);
        assert_eq!(report.active_campaigns, 1);
        assert_eq!(report.total_sent, 300);
        assert_eq!(report.avg_open_rate, dec!(30));
        assert_eq!(report.avg_click_rate, dec!(27.78));
        assert_eq!(report.avg_conversion_rate, dec!(2));
        assert_eq!(report.avg_roi, dec!(4.5));
    }

    #[test]
    fn targets_need_their_details() {
        assert!(check_targeting(CampaignTargetType::Segment, None, &[]).is_err());
        assert!(check_targeting(CampaignTargetType::Segment, Some(ClientSegment::Vip), &[]).is_ok());
        assert!(check_targeting(CampaignTargetType::CustomList, None, &[]).is_err());
        let two = [Uuid::new_v4(), Uuid::new_v4()];
        assert!(check_targeting(CampaignTargetType::CustomList, None, &two).is_ok());
        assert!(check_targeting(CampaignTargetType::Individual, None, &two).is_err());
        assert!(check_targeting(CampaignTargetType::AllClients, None, &[]).is_ok());
    }

    #[test]
    fn target_client_ids_round_trip_through_criteria() {
        let ids = vec![Uuid::new_v4()];
        let mut c = sample();
        c.target_criteria = criteria(&ids);
        assert_eq!(c.target_client_ids(), ids);
        assert_eq!(criteria(&[]), None);
    }
}
