use std::sync::Arc;

use chrono::Utc;
use metrics::counter;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseBackend, DatabaseTransaction, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::non_blank;
use crate::{
    auth::Session,
    db::DbPool,
    entities::{
        product::{self, Entity as Product},
        stock_movement::{self, Column as MovementColumn, Entity as StockMovement},
        MovementType,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    ledger::{self, MovementSummary},
    queries::{
        ListMovementsQuery, MovementFilter, MovementQuery, MovementSummaryQuery,
        MovementWithProduct, PageWindow, Query,
    },
};

#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct CreateMovementRequest {
    pub product_id: Uuid,
    pub movement_type: MovementType,
    /// Units moved; for adjustments, the counted stock level.
    #[validate(custom = "crate::validation::validate_signed_amount")]
    pub quantity: Decimal,
    #[validate(custom = "crate::validation::validate_amount")]
    pub unit_cost: Option<Decimal>,
    #[validate(length(max = 50))]
    pub reference_type: Option<String>,
    #[validate(length(max = 100))]
    pub reference_id: Option<String>,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DeletedMovement {
    pub movement_id: Uuid,
    pub product_id: Uuid,
    pub stock_reversed: bool,
    /// Product stock after the delete, when it was compensated.
    pub product_stock: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct StockAvailability {
    pub is_valid: bool,
    pub available_stock: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Append-only stock ledger. Every write keeps the product's
/// `current_stock` in step inside one transaction.
pub struct StockService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    reverse_on_delete: bool,
}

async fn lock_product(
    txn: &DatabaseTransaction,
    session: &Session,
    product_id: Uuid,
) -> Result<product::Model, ServiceError> {
    let mut select = Product::find_by_id(product_id)
        .filter(product::Column::UserId.eq(session.user_id));
    // SQLite serializes writers already and has no row locks.
    if txn.get_database_backend() == DatabaseBackend::Postgres {
        select = select.lock_exclusive();
    }
    select
        .one(txn)
        .await?
        .ok_or_else(|| ServiceError::not_found("Product", product_id))
}

async fn set_stock(
    txn: &DatabaseTransaction,
    product: product::Model,
    stock: Decimal,
) -> Result<product::Model, ServiceError> {
    let mut model: product::ActiveModel = product.into();
    model.current_stock = Set(stock);
    model.updated_at = Set(Utc::now());
    Ok(model.update(txn).await?)
}

impl StockService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>, reverse_on_delete: bool) -> Self {
        Self {
            db_pool,
            event_sender,
            reverse_on_delete,
        }
    }

    /// Records a movement and applies it to the product's stock.
    #[instrument(skip(self, request), fields(user_id = %session.user_id, product_id = %request.product_id))]
    pub async fn create_movement(
        &self,
        session: &Session,
        request: CreateMovementRequest,
    ) -> Result<stock_movement::Model, ServiceError> {
        request.validate()?;
        ledger::validate_quantity(request.movement_type, request.quantity)?;

        let txn = self.db_pool.begin().await?;
        let product = lock_product(&txn, session, request.product_id).await?;
        let previous_stock = product.current_stock;
        let new_stock = ledger::apply(previous_stock, request.movement_type, request.quantity)
            .map_err(|e| {
                warn!(product = %product.name, error = %e, "movement rejected");
                ServiceError::InsufficientStock(format!(
                    "product {} has {} {}, requested {}",
                    product.name, previous_stock, product.unit, request.quantity
                ))
            })?;

        let product = set_stock(&txn, product, new_stock).await?;
        let movement = stock_movement::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(session.user_id),
            product_id: Set(product.id),
            movement_type: Set(request.movement_type),
            quantity: Set(request.quantity),
            unit_cost: Set(request.unit_cost),
            previous_stock: Set(previous_stock),
            new_stock: Set(new_stock),
            reference_type: Set(non_blank(request.reference_type)),
            reference_id: Set(non_blank(request.reference_id)),
            notes: Set(non_blank(request.notes)),
            created_at: Set(Utc::now()),
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;

        counter!("clinic_stock.movements_created", 1);
        info!(
            movement_id = %movement.id,
            movement_type = %movement.movement_type,
            quantity = %movement.quantity,
            %previous_stock,
            %new_stock,
            "Stock movement recorded"
        );

        self.event_sender
            .send_or_log(Event::StockMovementRecorded {
                movement_id: movement.id,
                product_id: product.id,
                movement_type: movement.movement_type,
                quantity: movement.quantity,
                new_stock,
            })
            .await;
        if product.is_low_stock() && movement.movement_type != MovementType::In {
            self.event_sender
                .send_or_log(Event::LowStockDetected {
                    product_id: product.id,
                    current_stock: product.current_stock,
                    min_stock: product.min_stock,
                })
                .await;
        }

        Ok(movement)
    }

    /// Removes exactly one movement. With `reverse_stock` (or the configured
    /// default) the product's stock is compensated in the same transaction.
    #[instrument(skip(self), fields(user_id = %session.user_id))]
    pub async fn delete_movement(
        &self,
        session: &Session,
        id: Uuid,
        reverse_stock: Option<bool>,
    ) -> Result<DeletedMovement, ServiceError> {
        let reverse = reverse_stock.unwrap_or(self.reverse_on_delete);
        let txn = self.db_pool.begin().await?;

        let movement = StockMovement::find_by_id(id)
            .filter(MovementColumn::UserId.eq(session.user_id))
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::not_found("Stock movement", id))?;

        let product_stock = if reverse {
            let product = lock_product(&txn, session, movement.product_id).await?;
            let restored = ledger::reverse(product.current_stock, &movement);
            Some(set_stock(&txn, product, restored).await?.current_stock)
        } else {
            None
        };

        let result = StockMovement::delete_by_id(movement.id)
            .filter(MovementColumn::UserId.eq(session.user_id))
            .exec(&txn)
            .await?;
        if result.rows_affected != 1 {
            return Err(ServiceError::InternalError(format!(
                "expected to delete one movement, deleted {}",
                result.rows_affected
            )));
        }
        txn.commit().await?;

        counter!("clinic_stock.movements_deleted", 1);
        info!(movement_id = %id, stock_reversed = reverse, "Stock movement deleted");
        self.event_sender
            .send_or_log(Event::StockMovementDeleted {
                movement_id: id,
                product_id: movement.product_id,
                stock_reversed: reverse,
            })
            .await;

        Ok(DeletedMovement {
            movement_id: id,
            product_id: movement.product_id,
            stock_reversed: reverse,
            product_stock,
        })
    }

    #[instrument(skip(self), fields(user_id = %session.user_id))]
    pub async fn get_movement(&self, session: &Session, id: Uuid) -> Result<MovementWithProduct, ServiceError> {
        StockMovement::find_by_id(id)
            .filter(MovementColumn::UserId.eq(session.user_id))
            .find_also_related(Product)
            .one(&*self.db_pool)
            .await?
            .map(MovementWithProduct::from)
            .ok_or_else(|| ServiceError::not_found("Stock movement", id))
    }

    #[instrument(skip(self, query), fields(user_id = %session.user_id))]
    pub async fn list_movements(
        &self,
        session: &Session,
        query: MovementQuery,
        window: PageWindow,
    ) -> Result<(Vec<MovementWithProduct>, u64), ServiceError> {
        ListMovementsQuery {
            user_id: session.user_id,
            query,
            window,
        }
        .execute(&self.db_pool)
        .await
    }

    #[instrument(skip(self, query), fields(user_id = %session.user_id))]
    pub async fn summarize(&self, session: &Session, query: MovementQuery) -> Result<MovementSummary, ServiceError> {
        MovementSummaryQuery {
            user_id: session.user_id,
            query,
        }
        .execute(&self.db_pool)
        .await
    }

    /// Whether `quantity` can leave stock right now.
    pub async fn check_availability(
        &self,
        session: &Session,
        product_id: Uuid,
        quantity: Decimal,
    ) -> Result<StockAvailability, ServiceError> {
        let product = Product::find_by_id(product_id)
            .filter(product::Column::UserId.eq(session.user_id))
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::not_found("Product", product_id))?;

        let available = product.current_stock;
        Ok(if quantity <= available {
            StockAvailability {
                is_valid: true,
                available_stock: available,
                message: None,
            }
        } else {
            StockAvailability {
                is_valid: false,
                available_stock: available,
                message: Some(format!(
                    "insufficient stock: {} {} available, {} requested",
                    available, product.unit, quantity
                )),
            }
        })
    }

    /// Most recent movements of one product, newest first.
    pub async fn recent_movements(
        &self,
        session: &Session,
        product_id: Uuid,
        limit: u64,
    ) -> Result<Vec<stock_movement::Model>, ServiceError> {
        let query = MovementQuery::new().filter(MovementFilter::Product(product_id));
        Ok(StockMovement::find()
            .filter(MovementColumn::UserId.eq(session.user_id))
            .filter(query.condition())
            .order_by_desc(MovementColumn::CreatedAt)
            .limit(limit)
            .all(&*self.db_pool)
            .await?)
    }
}
