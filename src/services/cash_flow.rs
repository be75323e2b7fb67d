use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::Display;
use tracing::{debug, instrument};
use utoipa::ToSchema;
use validator::Validate;

use super::appointments::AppointmentService;
use crate::{
    auth::Session,
    cashflow::{self, CashFlowEntry, CashFlowProjection, Granularity, ProjectionBucket, MAX_PERIOD_DAYS},
    errors::ServiceError,
};

#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct ProjectionRequest {
    /// Opening balance; when absent, completed appointment revenue inside
    /// the window seeds the projection.
    #[validate(custom = "crate::validation::validate_signed_amount")]
    pub seed_balance: Option<Decimal>,
    pub start_date: NaiveDate,
    pub period_days: u32,
    #[validate]
    #[serde(default)]
    pub entries: Vec<CashFlowEntry>,
    #[serde(default)]
    pub granularity: Granularity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, ToSchema)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SeedSource {
    Provided,
    CompletedAppointments,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ProjectionResponse {
    pub seed_source: SeedSource,
    pub granularity: Granularity,
    pub projection: CashFlowProjection,
    pub buckets: Vec<ProjectionBucket>,
}

/// Runs cash-flow projections for the signed-in account
pub struct CashFlowService {
    appointments: Arc<AppointmentService>,
}

impl CashFlowService {
    pub fn new(appointments: Arc<AppointmentService>) -> Self {
        Self { appointments }
    }

    #[instrument(skip(self, request), fields(user_id = %session.user_id, period_days = request.period_days))]
    pub async fn project(
        &self,
        session: &Session,
        request: ProjectionRequest,
    ) -> Result<ProjectionResponse, ServiceError> {
        request.validate()?;
        if request.period_days > MAX_PERIOD_DAYS {
            return Err(ServiceError::ValidationError(format!(
                "period_days: at most {} days",
                MAX_PERIOD_DAYS
            )));
        }

        let (seed, seed_source) = match request.seed_balance {
            Some(seed) => (seed, SeedSource::Provided),
            None => {
                let from = request.start_date.and_time(NaiveTime::MIN).and_utc();
                let to = cashflow::shift_date(request.start_date, i64::from(request.period_days))?
                    .and_time(NaiveTime::MIN)
                    .and_utc();
                let revenue = self.appointments.completed_revenue(session, from, to).await?;
                (revenue, SeedSource::CompletedAppointments)
            }
        };

        let projection =
            cashflow::project(seed, &request.entries, request.start_date, request.period_days)?;
        let buckets = projection.buckets(request.granularity);
        debug!(
            %seed,
            final_balance = %projection.final_balance,
            negative_days = projection.days_with_negative_balance,
            "Cash flow projected"
        );

        Ok(ProjectionResponse {
            seed_source,
            granularity: request.granularity,
            projection,
            buckets,
        })
    }
}
