use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Query as SqlQuery, ColumnTrait, Condition, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{lower_contains, text_contains, PageWindow, Query, SortDirection};
use crate::entities::{
    product,
    stock_movement::{self, Column, Entity as StockMovement},
    MovementType,
};
use crate::errors::ServiceError;
use crate::ledger::MovementSummary;

/// A single restriction on the movement ledger.
#[derive(Debug, Clone, PartialEq)]
pub enum MovementFilter {
    Product(Uuid),
    Type(MovementType),
    ReferenceType(String),
    ReferenceId(String),
    /// Inclusive lower bound on `created_at`.
    CreatedFrom(DateTime<Utc>),
    /// Exclusive upper bound on `created_at`.
    CreatedBefore(DateTime<Utc>),
    /// Lowercased term matched against notes or the product name.
    Search(String),
}

impl MovementFilter {
    fn condition(&self) -> Condition {
        let cond = Condition::all();
        match self {
            Self::Product(id) => cond.add(Column::ProductId.eq(*id)),
            Self::Type(t) => cond.add(Column::MovementType.eq(*t)),
            Self::ReferenceType(r) => cond.add(Column::ReferenceType.eq(r.as_str())),
            Self::ReferenceId(r) => cond.add(Column::ReferenceId.eq(r.as_str())),
            Self::CreatedFrom(at) => cond.add(Column::CreatedAt.gte(*at)),
            Self::CreatedBefore(at) => cond.add(Column::CreatedAt.lt(*at)),
            Self::Search(term) => {
                let named_products = SqlQuery::select()
                    .column((product::Entity, product::Column::Id))
                    .from(product::Entity)
                    .and_where(lower_contains((product::Entity, product::Column::Name), term))
                    .to_owned();
                cond.add(
                    Condition::any()
                        .add(lower_contains((StockMovement, Column::Notes), term))
                        .add(Column::ProductId.in_subquery(named_products)),
                )
            }
        }
    }

    fn matches(&self, m: &stock_movement::Model, product_name: Option<&str>) -> bool {
        match self {
            Self::Product(id) => m.product_id == *id,
            Self::Type(t) => m.movement_type == *t,
            Self::ReferenceType(r) => m.reference_type.as_deref() == Some(r.as_str()),
            Self::ReferenceId(r) => m.reference_id.as_deref() == Some(r.as_str()),
            Self::CreatedFrom(at) => m.created_at >= *at,
            Self::CreatedBefore(at) => m.created_at < *at,
            Self::Search(term) => {
                text_contains(m.notes.as_deref(), term) || text_contains(product_name, term)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MovementSort {
    #[default]
    CreatedAt,
    Quantity,
    MovementType,
}

impl MovementSort {
    fn column(self) -> Column {
        match self {
            Self::CreatedAt => Column::CreatedAt,
            Self::Quantity => Column::Quantity,
            Self::MovementType => Column::MovementType,
        }
    }
}

/// Conjunction of filters; the order they were added in does not matter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MovementQuery {
    pub filters: Vec<MovementFilter>,
    pub sort: MovementSort,
    pub direction: SortDirection,
}

impl MovementQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: MovementFilter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn sorted(mut self, sort: MovementSort, direction: SortDirection) -> Self {
        self.sort = sort;
        self.direction = direction;
        self
    }

    pub fn condition(&self) -> Condition {
        self.filters
            .iter()
            .fold(Condition::all(), |acc, f| acc.add(f.condition()))
    }

    pub fn matches(&self, m: &stock_movement::Model, product_name: Option<&str>) -> bool {
        self.filters.iter().all(|f| f.matches(m, product_name))
    }
}

/// A ledger row with the product fields the movement list shows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MovementWithProduct {
    #[serde(flatten)]
    pub movement: stock_movement::Model,
    pub product_name: Option<String>,
    pub product_unit: Option<String>,
    pub product_sku: Option<String>,
}

impl From<(stock_movement::Model, Option<product::Model>)> for MovementWithProduct {
    fn from((movement, product): (stock_movement::Model, Option<product::Model>)) -> Self {
        Self {
            movement,
            product_name: product.as_ref().map(|p| p.name.clone()),
            product_unit: product.as_ref().map(|p| p.unit.clone()),
            product_sku: product.and_then(|p| p.sku),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ListMovementsQuery {
    pub user_id: Uuid,
    pub query: MovementQuery,
    pub window: PageWindow,
}

#[async_trait]
impl Query for ListMovementsQuery {
    type Result = (Vec<MovementWithProduct>, u64);

    async fn execute(&self, db_pool: &DatabaseConnection) -> Result<Self::Result, ServiceError> {
        let base = StockMovement::find()
            .filter(Column::UserId.eq(self.user_id))
            .filter(self.query.condition());

        let total = base.clone().count(db_pool).await?;

        let rows = base
            .find_also_related(product::Entity)
            .order_by(self.query.sort.column(), self.query.direction.into())
            .order_by_desc(Column::Id)
            .offset(self.window.offset())
            .limit(self.window.per_page)
            .all(db_pool)
            .await?;

        Ok((rows.into_iter().map(MovementWithProduct::from).collect(), total))
    }
}

#[derive(Debug, Clone)]
pub struct MovementSummaryQuery {
    pub user_id: Uuid,
    pub query: MovementQuery,
}

#[async_trait]
impl Query for MovementSummaryQuery {
    type Result = MovementSummary;

    async fn execute(&self, db_pool: &DatabaseConnection) -> Result<Self::Result, ServiceError> {
        let rows: Vec<(MovementType, Decimal)> = StockMovement::find()
            .select_only()
            .column(Column::MovementType)
            .column(Column::Quantity)
            .filter(Column::UserId.eq(self.user_id))
            .filter(self.query.condition())
            .into_tuple()
            .all(db_pool)
            .await?;

        let mut summary = MovementSummary::default();
        for (movement_type, quantity) in rows {
            summary.record(movement_type, quantity, 1);
        }
        Ok(summary)
    }
}
