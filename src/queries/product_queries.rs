use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use sea_orm::{
    sea_query::Expr, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{lower_contains, text_contains, PageWindow, Query, SortDirection};
use crate::entities::product::{self, Column, Entity as Product};
use crate::errors::ServiceError;

#[derive(Debug, Clone, PartialEq)]
pub enum ProductFilter {
    Category(String),
    Active(bool),
    /// Current stock at or below the minimum.
    LowStock,
    /// Expiry date within `[today, today + days]`.
    ExpiringWithin { today: NaiveDate, days: i64 },
    /// Lowercased term matched against name, sku or description.
    Search(String),
}

impl ProductFilter {
    fn condition(&self) -> Condition {
        let cond = Condition::all();
        match self {
            Self::Category(c) => cond.add(Column::Category.eq(c.as_str())),
            Self::Active(active) => cond.add(Column::IsActive.eq(*active)),
            Self::LowStock => cond.add(
                Expr::col((Product, Column::CurrentStock)).lte(Expr::col((Product, Column::MinStock))),
            ),
            Self::ExpiringWithin { today, days } => cond.add(
                Column::ExpiryDate.between(*today, *today + Duration::days(*days)),
            ),
            Self::Search(term) => cond.add(
                Condition::any()
                    .add(lower_contains((Product, Column::Name), term))
                    .add(lower_contains((Product, Column::Sku), term))
                    .add(lower_contains((Product, Column::Description), term)),
            ),
        }
    }

    pub fn matches(&self, p: &product::Model) -> bool {
        match self {
            Self::Category(c) => p.category.as_deref() == Some(c.as_str()),
            Self::Active(active) => p.is_active == *active,
            Self::LowStock => p.is_low_stock(),
            Self::ExpiringWithin { today, days } => p.is_expiring_within(*today, *days),
            Self::Search(term) => {
                text_contains(Some(&p.name), term)
                    || text_contains(p.sku.as_deref(), term)
                    || text_contains(p.description.as_deref(), term)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ProductSort {
    #[default]
    Name,
    CreatedAt,
    CurrentStock,
    ExpiryDate,
    CostPrice,
}

impl ProductSort {
    fn column(self) -> Column {
        match self {
            Self::Name => Column::Name,
            Self::CreatedAt => Column::CreatedAt,
            Self::CurrentStock => Column::CurrentStock,
            Self::ExpiryDate => Column::ExpiryDate,
            Self::CostPrice => Column::CostPrice,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProductQuery {
    pub filters: Vec<ProductFilter>,
    pub sort: ProductSort,
    pub direction: SortDirection,
}

impl Default for ProductQuery {
    fn default() -> Self {
        Self {
            filters: Vec::new(),
            sort: ProductSort::Name,
            direction: SortDirection::Asc,
        }
    }
}

impl ProductQuery {
    pub fn filter(mut self, filter: ProductFilter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn condition(&self) -> Condition {
        self.filters
            .iter()
            .fold(Condition::all(), |acc, f| acc.add(f.condition()))
    }

    pub fn matches(&self, p: &product::Model) -> bool {
        self.filters.iter().all(|f| f.matches(p))
    }
}

#[derive(Debug, Clone)]
pub struct ListProductsQuery {
    pub user_id: Uuid,
    pub query: ProductQuery,
    pub window: PageWindow,
}

#[async_trait]
impl Query for ListProductsQuery {
    type Result = (Vec<product::Model>, u64);

    async fn execute(&self, db_pool: &DatabaseConnection) -> Result<Self::Result, ServiceError> {
        let base = Product::find()
            .filter(Column::UserId.eq(self.user_id))
            .filter(self.query.condition());

        let total = base.clone().count(db_pool).await?;
        let items = base
            .order_by(self.query.sort.column(), self.query.direction.into())
            .order_by_asc(Column::Id)
            .offset(self.window.offset())
            .limit(self.window.per_page)
            .all(db_pool)
            .await?;

        Ok((items, total))
    }
}
