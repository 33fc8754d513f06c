use crate::{
    entities::{activity, ActivityModel, ActivityType},
    errors::ServiceError,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, instrument};
use utoipa::IntoParams;
use uuid::Uuid;

/// Entity type labels recorded on activity rows
pub mod entity_types {
    pub const INVENTORY: &str = "inventory";
    pub const WAREHOUSE: &str = "warehouse";
    pub const SELL_TRANSACTION: &str = "sell_transaction";
    pub const USER: &str = "user";
}

/// An audit entry waiting to be written
#[derive(Debug, Clone)]
pub struct NewActivity {
    pub user_id: Option<Uuid>,
    pub activity_type: ActivityType,
    pub entity_type: &'static str,
    pub entity_id: Option<Uuid>,
    pub description: String,
    pub metadata: Option<serde_json::Value>,
}

impl NewActivity {
    pub fn new(
        user_id: Option<Uuid>,
        activity_type: ActivityType,
        entity_type: &'static str,
        entity_id: Option<Uuid>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            activity_type,
            entity_type,
            entity_id,
            description: description.into(),
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Writes one audit row on `conn`. Pass the open transaction so the entry
/// commits or rolls back with the change it records.
pub async fn log_activity<C>(conn: &C, entry: NewActivity) -> Result<ActivityModel, ServiceError>
where
    C: ConnectionTrait,
{
    let model = activity::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(entry.user_id),
        activity_type: Set(entry.activity_type),
        entity_type: Set(entry.entity_type.to_string()),
        entity_id: Set(entry.entity_id),
        description: Set(entry.description),
        metadata: Set(entry.metadata),
        created_at: Set(Utc::now()),
    };

    let saved = model.insert(conn).await.map_err(ServiceError::db_error)?;
    debug!(
        activity_type = %saved.activity_type,
        entity_type = %saved.entity_type,
        "Activity recorded"
    );
    Ok(saved)
}

/// Query parameters for the activity feed
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ActivityQuery {
    /// Records to skip
    pub skip: Option<u64>,
    /// Page size, capped at 500
    pub limit: Option<u64>,
    pub user_id: Option<Uuid>,
    /// inventory, warehouse, sell_transaction or user
    pub entity_type: Option<String>,
    pub activity_type: Option<ActivityType>,
}

pub const MAX_ACTIVITY_PAGE: u64 = 500;
const DEFAULT_ACTIVITY_PAGE: u64 = 100;

/// Read side of the audit trail
#[derive(Clone)]
pub struct ActivityService {
    db: Arc<DatabaseConnection>,
}

impl ActivityService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Lists activities newest first. Filters combine with AND; the returned
    /// total counts every matching row, not just the page.
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        query: &ActivityQuery,
    ) -> Result<(Vec<ActivityModel>, u64), ServiceError> {
        let mut condition = Condition::all();
        if let Some(user_id) = query.user_id {
            condition = condition.add(activity::Column::UserId.eq(user_id));
        }
        if let Some(entity_type) = &query.entity_type {
            condition = condition.add(activity::Column::EntityType.eq(entity_type.as_str()));
        }
        if let Some(activity_type) = query.activity_type {
            condition = condition.add(activity::Column::ActivityType.eq(activity_type));
        }

        self.page(condition, query.skip, query.limit).await
    }

    /// History of one entity, newest first
    #[instrument(skip(self))]
    pub async fn list_for_entity(
        &self,
        entity_type: &str,
        entity_id: Uuid,
        skip: Option<u64>,
        limit: Option<u64>,
    ) -> Result<(Vec<ActivityModel>, u64), ServiceError> {
        let condition = Condition::all()
            .add(activity::Column::EntityType.eq(entity_type))
            .add(activity::Column::EntityId.eq(entity_id));

        self.page(condition, skip, limit).await
    }

    async fn page(
        &self,
        condition: Condition,
        skip: Option<u64>,
        limit: Option<u64>,
    ) -> Result<(Vec<ActivityModel>, u64), ServiceError> {
        let limit = limit
            .unwrap_or(DEFAULT_ACTIVITY_PAGE)
            .clamp(1, MAX_ACTIVITY_PAGE);

        let total = activity::Entity::find()
            .filter(condition.clone())
            .count(&*self.db)
            .await
            .map_err(ServiceError::db_error)?;

        let rows = activity::Entity::find()
            .filter(condition)
            .order_by_desc(activity::Column::CreatedAt)
            .offset(skip.unwrap_or(0))
            .limit(limit)
            .all(&*self.db)
            .await
            .map_err(ServiceError::db_error)?;

        Ok((rows, total))
    }
}
