use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "clients")]
#[schema(as = Client)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    #[sea_orm(nullable)]
    pub email: Option<String>,
    #[sea_orm(nullable)]
    pub phone: Option<String>,
    /// Stored formatted as `000.000.000-00`
    #[sea_orm(nullable)]
    pub cpf: Option<String>,
    #[sea_orm(nullable)]
    pub birthday: Option<NaiveDate>,
    #[sea_orm(column_type = "Json", nullable)]
    #[schema(value_type = Option<Object>)]
    pub address: Option<Json>,
    #[sea_orm(nullable)]
    pub preferences: Option<String>,
    #[sea_orm(nullable)]
    pub observations: Option<String>,
    pub status: ClientStatus,
    #[sea_orm(nullable)]
    pub segment: Option<ClientSegment>,
    #[sea_orm(nullable)]
    pub first_visit: Option<DateTime<Utc>>,
    #[sea_orm(nullable)]
    pub last_visit: Option<DateTime<Utc>>,
    pub total_spent: Decimal,
    pub total_visits: i32,
    #[sea_orm(nullable)]
    pub ltv_score: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::appointment::Entity")]
    Appointments,
}

impl Related<super::appointment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Appointments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumIter,
    DeriveActiveEnum,
    Display,
    EnumString,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ClientStatus {
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "inactive")]
    Inactive,
    #[sea_orm(string_value = "blocked")]
    Blocked,
}

/// Lifecycle classification used for marketing targeting
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumIter,
    DeriveActiveEnum,
    Display,
    EnumString,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ClientSegment {
    #[sea_orm(string_value = "vip")]
    Vip,
    #[sea_orm(string_value = "regular")]
    Regular,
    #[sea_orm(string_value = "new")]
    New,
    #[sea_orm(string_value = "at_risk")]
    AtRisk,
    #[sea_orm(string_value = "lost")]
    Lost,
}
