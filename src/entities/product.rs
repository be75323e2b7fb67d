use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Stocked consumable (toxins, fillers, disposables) owned by one clinic account
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "products")]
#[schema(as = Product)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    #[sea_orm(nullable)]
    pub description: Option<String>,
    #[sea_orm(nullable)]
    pub sku: Option<String>,
    #[sea_orm(nullable)]
    pub category: Option<String>,
    pub unit: String,
    pub cost_price: Decimal,
    pub current_stock: Decimal,
    pub min_stock: Decimal,
    #[sea_orm(nullable)]
    pub expiry_date: Option<NaiveDate>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::stock_movement::Entity")]
    StockMovements,
}

impl Related<super::stock_movement::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StockMovements.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn is_low_stock(&self) -> bool {
        self.current_stock <= self.min_stock
    }

    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.expiry_date.map(|d| d < today).unwrap_or(false)
    }

    /// Days until expiry; negative once expired.
    pub fn days_until_expiry(&self, today: NaiveDate) -> Option<i64> {
        self.expiry_date.map(|d| (d - today).num_days())
    }

    pub fn is_expiring_within(&self, today: NaiveDate, days: i64) -> bool {
        self.days_until_expiry(today)
            .map(|left| (0..=days).contains(&left))
            .unwrap_or(false)
    }

    pub fn stock_value(&self) -> Decimal {
        self.current_stock * self.cost_price
    }
}
