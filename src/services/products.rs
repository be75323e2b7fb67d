use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::{non_blank, today};
use crate::{
    auth::Session,
    db::DbPool,
    entities::product::{self, Column as ProductColumn, Entity as Product},
    errors::ServiceError,
    events::{Event, EventSender},
    ledger::{self, StockAlert, StockSummary, StockValuation},
    queries::{ListProductsQuery, PageWindow, ProductQuery, Query},
};

fn default_unit() -> String {
    "un".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct CreateProductRequest {
    #[validate(length(max = 200), custom = "crate::validation::validate_not_blank")]
    pub name: String,
    pub description: Option<String>,
    #[validate(length(max = 64))]
    pub sku: Option<String>,
    #[validate(length(max = 100))]
    pub category: Option<String>,
    #[serde(default = "default_unit")]
    #[validate(length(max = 20), custom = "crate::validation::validate_not_blank")]
    pub unit: String,
    #[serde(default)]
    #[validate(custom = "crate::validation::validate_amount")]
    pub cost_price: Decimal,
    #[serde(default)]
    #[validate(custom = "crate::validation::validate_amount")]
    pub current_stock: Decimal,
    #[serde(default)]
    #[validate(custom = "crate::validation::validate_amount")]
    pub min_stock: Decimal,
    pub expiry_date: Option<NaiveDate>,
}

/// Partial update. Stock levels only change through movements.
#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate, ToSchema)]
pub struct UpdateProductRequest {
    #[validate(length(max = 200), custom = "crate::validation::validate_not_blank")]
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(length(max = 64))]
    pub sku: Option<String>,
    #[validate(length(max = 100))]
    pub category: Option<String>,
    #[validate(length(max = 20), custom = "crate::validation::validate_not_blank")]
    pub unit: Option<String>,
    #[validate(custom = "crate::validation::validate_amount")]
    pub cost_price: Option<Decimal>,
    #[validate(custom = "crate::validation::validate_amount")]
    pub min_stock: Option<Decimal>,
    pub expiry_date: Option<NaiveDate>,
    pub is_active: Option<bool>,
}

/// Service for the clinic's stocked products
pub struct ProductService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    expiry_window_days: i64,
}

impl ProductService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>, expiry_window_days: i64) -> Self {
        Self {
            db_pool,
            event_sender,
            expiry_window_days,
        }
    }

    #[instrument(skip(self, request), fields(user_id = %session.user_id))]
    pub async fn create_product(
        &self,
        session: &Session,
        request: CreateProductRequest,
    ) -> Result<product::Model, ServiceError> {
        request.validate()?;
        if let Some(expiry) = request.expiry_date {
            if expiry < today() {
                return Err(ServiceError::ValidationError(
                    "expiry_date: must not be in the past".to_string(),
                ));
            }
        }

        let now = Utc::now();
        let model = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(session.user_id),
            name: Set(request.name.trim().to_string()),
            description: Set(non_blank(request.description)),
            sku: Set(non_blank(request.sku)),
            category: Set(non_blank(request.category)),
            unit: Set(request.unit.trim().to_string()),
            cost_price: Set(request.cost_price),
            current_stock: Set(request.current_stock),
            min_stock: Set(request.min_stock),
            expiry_date: Set(request.expiry_date),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let created = model.insert(&*self.db_pool).await?;
        self.event_sender
            .send_or_log(Event::ProductCreated(created.id))
            .await;
        info!(product_id = %created.id, name = %created.name, "Product created");
        Ok(created)
    }

    #[instrument(skip(self), fields(user_id = %session.user_id))]
    pub async fn get_product(&self, session: &Session, id: Uuid) -> Result<product::Model, ServiceError> {
        Product::find_by_id(id)
            .filter(ProductColumn::UserId.eq(session.user_id))
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::not_found("Product", id))
    }

    #[instrument(skip(self, request), fields(user_id = %session.user_id))]
    pub async fn update_product(
        &self,
        session: &Session,
        id: Uuid,
        request: UpdateProductRequest,
    ) -> Result<product::Model, ServiceError> {
        request.validate()?;
        let existing = self.get_product(session, id).await?;
        let mut model: product::ActiveModel = existing.into();

        if let Some(name) = request.name {
            model.name = Set(name.trim().to_string());
        }
        if request.description.is_some() {
            model.description = Set(non_blank(request.description));
        }
        if request.sku.is_some() {
            model.sku = Set(non_blank(request.sku));
        }
        if request.category.is_some() {
            model.category = Set(non_blank(request.category));
        }
        if let Some(unit) = request.unit {
            model.unit = Set(unit.trim().to_string());
        }
        if let Some(cost) = request.cost_price {
            model.cost_price = Set(cost);
        }
        if let Some(min) = request.min_stock {
            model.min_stock = Set(min);
        }
        if let Some(expiry) = request.expiry_date {
            model.expiry_date = Set(Some(expiry));
        }
        if let Some(active) = request.is_active {
            model.is_active = Set(active);
        }
        model.updated_at = Set(Utc::now());

        let updated = model.update(&*self.db_pool).await?;
        self.event_sender
            .send_or_log(Event::ProductUpdated(updated.id))
            .await;
        Ok(updated)
    }

    #[instrument(skip(self), fields(user_id = %session.user_id))]
    pub async fn toggle_active(&self, session: &Session, id: Uuid) -> Result<product::Model, ServiceError> {
        let existing = self.get_product(session, id).await?;
        let active = !existing.is_active;
        let mut model: product::ActiveModel = existing.into();
        model.is_active = Set(active);
        model.updated_at = Set(Utc::now());

        let updated = model.update(&*self.db_pool).await?;
        info!(product_id = %id, is_active = active, "Product active flag toggled");
        Ok(updated)
    }

    /// Refused while the product still holds stock; its movements go with it.
    #[instrument(skip(self), fields(user_id = %session.user_id))]
    pub async fn delete_product(&self, session: &Session, id: Uuid) -> Result<(), ServiceError> {
        let existing = self.get_product(session, id).await?;
        if existing.current_stock > Decimal::ZERO {
            return Err(ServiceError::Conflict(format!(
                "product {} still holds {} {}; zero its stock before deleting",
                existing.name, existing.current_stock, existing.unit
            )));
        }

        Product::delete_by_id(id).exec(&*self.db_pool).await?;
        self.event_sender.send_or_log(Event::ProductDeleted(id)).await;
        info!(product_id = %id, "Product deleted");
        Ok(())
    }

    #[instrument(skip(self, query), fields(user_id = %session.user_id))]
    pub async fn list_products(
        &self,
        session: &Session,
        query: ProductQuery,
        window: PageWindow,
    ) -> Result<(Vec<product::Model>, u64), ServiceError> {
        ListProductsQuery {
            user_id: session.user_id,
            query,
            window,
        }
        .execute(&self.db_pool)
        .await
    }

    /// Distinct non-empty categories, sorted.
    pub async fn categories(&self, session: &Session) -> Result<Vec<String>, ServiceError> {
        let rows: Vec<Option<String>> = Product::find()
            .select_only()
            .column(ProductColumn::Category)
            .distinct()
            .filter(ProductColumn::UserId.eq(session.user_id))
            .filter(ProductColumn::Category.is_not_null())
            .order_by_asc(ProductColumn::Category)
            .into_tuple()
            .all(&*self.db_pool)
            .await?;

        Ok(rows
            .into_iter()
            .flatten()
            .filter(|c| !c.trim().is_empty())
            .collect())
    }

    async fn active_products(&self, session: &Session) -> Result<Vec<product::Model>, ServiceError> {
        Ok(Product::find()
            .filter(ProductColumn::UserId.eq(session.user_id))
            .filter(ProductColumn::IsActive.eq(true))
            .order_by_asc(ProductColumn::Name)
            .all(&*self.db_pool)
            .await?)
    }

    pub async fn stock_summary(&self, session: &Session) -> Result<StockSummary, ServiceError> {
        let products = self.active_products(session).await?;
        Ok(ledger::stock_summary(&products, today(), self.expiry_window_days))
    }

    pub async fn valuation(&self, session: &Session) -> Result<StockValuation, ServiceError> {
        let products = self.active_products(session).await?;
        Ok(ledger::valuation(&products))
    }

    pub async fn alerts(&self, session: &Session) -> Result<Vec<StockAlert>, ServiceError> {
        let products = self.active_products(session).await?;
        Ok(ledger::alerts_for(&products, today(), self.expiry_window_days))
    }
}
