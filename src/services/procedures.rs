use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
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
        procedure::{self, Column as ProcedureColumn, Entity as Procedure},
        procedure_category::{self, Column as CategoryColumn, Entity as ProcedureCategory},
    },
    errors::ServiceError,
};

fn default_duration() -> i32 {
    60
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct CreateCategoryRequest {
    #[validate(length(max = 100), custom = "crate::validation::validate_not_blank")]
    pub name: String,
    pub description: Option<String>,
    #[validate(custom = "crate::validation::validate_hex_color")]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate, ToSchema)]
pub struct UpdateCategoryRequest {
    #[validate(length(max = 100), custom = "crate::validation::validate_not_blank")]
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(custom = "crate::validation::validate_hex_color")]
    pub color: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct CreateProcedureRequest {
    #[validate(length(max = 200), custom = "crate::validation::validate_not_blank")]
    pub name: String,
    pub category_id: Option<Uuid>,
    pub description: Option<String>,
    #[validate(custom = "crate::validation::validate_amount")]
    pub price: Decimal,
    #[serde(default)]
    #[validate(custom = "crate::validation::validate_amount")]
    pub cost: Decimal,
    #[serde(default = "default_duration")]
    #[validate(range(min = 15, max = 720))]
    pub duration_minutes: i32,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate, ToSchema)]
pub struct UpdateProcedureRequest {
    #[validate(length(max = 200), custom = "crate::validation::validate_not_blank")]
    pub name: Option<String>,
    pub category_id: Option<Uuid>,
    pub description: Option<String>,
    #[validate(custom = "crate::validation::validate_amount")]
    pub price: Option<Decimal>,
    #[validate(custom = "crate::validation::validate_amount")]
    pub cost: Option<Decimal>,
    #[validate(range(min = 15, max = 720))]
    pub duration_minutes: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct ProcedureFilter {
    pub category_id: Option<Uuid>,
    /// Only active procedures (default true)
    pub active_only: Option<bool>,
}

/// Procedure catalogue and its categories
pub struct ProcedureService {
    db_pool: Arc<DbPool>,
}

impl ProcedureService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self, request), fields(user_id = %session.user_id))]
    pub async fn create_category(
        &self,
        session: &Session,
        request: CreateCategoryRequest,
    ) -> Result<procedure_category::Model, ServiceError> {
        request.validate()?;
        let created = procedure_category::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(session.user_id),
            name: Set(request.name.trim().to_string()),
            description: Set(non_blank(request.description)),
            color: Set(non_blank(request.color)),
            is_active: Set(true),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.db_pool)
        .await?;
        info!(category_id = %created.id, "Procedure category created");
        Ok(created)
    }

    pub async fn list_categories(
        &self,
        session: &Session,
        active_only: bool,
    ) -> Result<Vec<procedure_category::Model>, ServiceError> {
        let mut query = ProcedureCategory::find().filter(CategoryColumn::UserId.eq(session.user_id));
        if active_only {
            query = query.filter(CategoryColumn::IsActive.eq(true));
        }
        Ok(query
            .order_by_asc(CategoryColumn::Name)
            .all(&*self.db_pool)
            .await?)
    }

    async fn get_category(
        &self,
        session: &Session,
        id: Uuid,
    ) -> Result<procedure_category::Model, ServiceError> {
        ProcedureCategory::find_by_id(id)
            .filter(CategoryColumn::UserId.eq(session.user_id))
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::not_found("Procedure category", id))
    }

    #[instrument(skip(self, request), fields(user_id = %session.user_id))]
    pub async fn update_category(
        &self,
        session: &Session,
        id: Uuid,
        request: UpdateCategoryRequest,
    ) -> Result<procedure_category::Model, ServiceError> {
        request.validate()?;
        let mut model: procedure_category::ActiveModel = self.get_category(session, id).await?.into();
        if let Some(name) = request.name {
            model.name = Set(name.trim().to_string());
        }
        if request.description.is_some() {
            model.description = Set(non_blank(request.description));
        }
        if request.color.is_some() {
            model.color = Set(non_blank(request.color));
        }
        if let Some(active) = request.is_active {
            model.is_active = Set(active);
        }
        Ok(model.update(&*self.db_pool).await?)
    }

    /// Procedures in the category keep existing, uncategorized.
    #[instrument(skip(self), fields(user_id = %session.user_id))]
    pub async fn delete_category(&self, session: &Session, id: Uuid) -> Result<(), ServiceError> {
        self.get_category(session, id).await?;
        ProcedureCategory::delete_by_id(id).exec(&*self.db_pool).await?;
        info!(category_id = %id, "Procedure category deleted");
        Ok(())
    }

    async fn ensure_category(&self, session: &Session, category_id: Option<Uuid>) -> Result<(), ServiceError> {
        match category_id {
            Some(id) => self.get_category(session, id).await.map(|_| ()),
            None => Ok(()),
        }
    }

    #[instrument(skip(self, request), fields(user_id = %session.user_id))]
    pub async fn create_procedure(
        &self,
        session: &Session,
        request: CreateProcedureRequest,
    ) -> Result<procedure::Model, ServiceError> {
        request.validate()?;
        self.ensure_category(session, request.category_id).await?;

        let now = Utc::now();
        let created = procedure::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(session.user_id),
            category_id: Set(request.category_id),
            name: Set(request.name.trim().to_string()),
            description: Set(non_blank(request.description)),
            price: Set(request.price),
            cost: Set(request.cost),
            duration_minutes: Set(request.duration_minutes),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db_pool)
        .await?;
        info!(procedure_id = %created.id, name = %created.name, "Procedure created");
        Ok(created)
    }

    pub async fn get_procedure(&self, session: &Session, id: Uuid) -> Result<procedure::Model, ServiceError> {
        Procedure::find_by_id(id)
            .filter(ProcedureColumn::UserId.eq(session.user_id))
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::not_found("Procedure", id))
    }

    pub async fn list_procedures(
        &self,
        session: &Session,
        filter: ProcedureFilter,
    ) -> Result<Vec<procedure::Model>, ServiceError> {
        let mut query = Procedure::find().filter(ProcedureColumn::UserId.eq(session.user_id));
        if filter.active_only.unwrap_or(true) {
            query = query.filter(ProcedureColumn::IsActive.eq(true));
        }
        if let Some(category_id) = filter.category_id {
            query = query.filter(ProcedureColumn::CategoryId.eq(category_id));
        }
        Ok(query
            .order_by_asc(ProcedureColumn::Name)
            .all(&*self.db_pool)
            .await?)
    }

    #[instrument(skip(self, request), fields(user_id = %session.user_id))]
    pub async fn update_procedure(
        &self,
        session: &Session,
        id: Uuid,
        request: UpdateProcedureRequest,
    ) -> Result<procedure::Model, ServiceError> {
        request.validate()?;
        self.ensure_category(session, request.category_id).await?;

        let mut model: procedure::ActiveModel = self.get_procedure(session, id).await?.into();
        if let Some(name) = request.name {
            model.name = Set(name.trim().to_string());
        }
        if request.category_id.is_some() {
            model.category_id = Set(request.category_id);
        }
        if request.description.is_some() {
            model.description = Set(non_blank(request.description));
        }
        if let Some(price) = request.price {
            model.price = Set(price);
        }
        if let Some(cost) = request.cost {
            model.cost = Set(cost);
        }
        if let Some(duration) = request.duration_minutes {
            model.duration_minutes = Set(duration);
        }
        if let Some(active) = request.is_active {
            model.is_active = Set(active);
        }
        model.updated_at = Set(Utc::now());
        Ok(model.update(&*self.db_pool).await?)
    }

    /// Procedures referenced by appointments cannot be deleted; deactivate them instead.
    #[instrument(skip(self), fields(user_id = %session.user_id))]
    pub async fn delete_procedure(&self, session: &Session, id: Uuid) -> Result<(), ServiceError> {
        self.get_procedure(session, id).await?;
        let booked = Appointment::find()
            .filter(appointment::Column::ProcedureId.eq(id))
            .count(&*self.db_pool)
            .await?;
        if booked > 0 {
            return Err(ServiceError::Conflict(format!(
                "procedure is used by {} appointment(s); deactivate it instead",
                booked
            )));
        }
        Procedure::delete_by_id(id).exec(&*self.db_pool).await?;
        info!(procedure_id = %id, "Procedure deleted");
        Ok(())
    }
}
