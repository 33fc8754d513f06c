use crate::{
    entities::{inventory_item, warehouse, ActivityType, InventoryItem, Warehouse, WarehouseModel},
    errors::ServiceError,
    services::activity::{entity_types, log_activity, NewActivity},
};
use chrono::Utc;
use metrics::counter;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateWarehouseRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(min = 1, max = 255))]
    pub location: String,
    #[validate(length(max = 500))]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateWarehouseRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub location: Option<String>,
    #[validate(length(max = 500))]
    pub description: Option<String>,
}

/// Warehouse CRUD; every mutation writes its activity row in the same transaction
#[derive(Clone)]
pub struct WarehouseService {
    db: Arc<DatabaseConnection>,
}

impl WarehouseService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create(
        &self,
        actor_id: Uuid,
        request: CreateWarehouseRequest,
    ) -> Result<WarehouseModel, ServiceError> {
        request.validate()?;

        let created = self
            .db
            .transaction::<_, WarehouseModel, ServiceError>(move |txn| {
                Box::pin(async move {
                    if find_by_name(txn, &request.name).await?.is_some() {
                        return Err(ServiceError::BadRequest(
                            "Warehouse name already exists".to_string(),
                        ));
                    }

                    let now = Utc::now();
                    let saved = warehouse::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        name: Set(request.name),
                        location: Set(request.location),
                        description: Set(request.description),
                        created_at: Set(now),
                        updated_at: Set(now),
                    }
                    .insert(txn)
                    .await
                    .map_err(ServiceError::db_error)?;

                    log_activity(
                        txn,
                        NewActivity::new(
                            Some(actor_id),
                            ActivityType::WarehouseCreated,
                            entity_types::WAREHOUSE,
                            Some(saved.id),
                            format!("Created warehouse {}", saved.name),
                        )
                        .with_metadata(json!({
                            "name": saved.name,
                            "location": saved.location,
                        })),
                    )
                    .await?;

                    Ok(saved)
                })
            })
            .await?;

        counter!("inventory_api.warehouses_created", 1);
        info!(warehouse_id = %created.id, "Warehouse created");
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn list(&self, skip: u64, limit: u64) -> Result<Vec<WarehouseModel>, ServiceError> {
        Warehouse::find()
            .order_by_asc(warehouse::Column::Name)
            .offset(skip)
            .limit(limit)
            .all(&*self.db)
            .await
            .map_err(ServiceError::db_error)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<WarehouseModel, ServiceError> {
        Warehouse::find_by_id(id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound("Warehouse not found".to_string()))
    }

    #[instrument(skip(self, request))]
    pub async fn update(
        &self,
        actor_id: Uuid,
        id: Uuid,
        request: UpdateWarehouseRequest,
    ) -> Result<WarehouseModel, ServiceError> {
        request.validate()?;

        let updated = self
            .db
            .transaction::<_, WarehouseModel, ServiceError>(move |txn| {
                Box::pin(async move {
                    let existing = Warehouse::find_by_id(id)
                        .one(txn)
                        .await
                        .map_err(ServiceError::db_error)?
                        .ok_or_else(|| ServiceError::NotFound("Warehouse not found".to_string()))?;

                    let mut changed = Vec::new();
                    let mut active: warehouse::ActiveModel = existing.clone().into();

                    if let Some(name) = request.name {
                        if name != existing.name {
                            if find_by_name(txn, &name).await?.is_some() {
                                return Err(ServiceError::BadRequest(
                                    "Warehouse name already taken".to_string(),
                                ));
                            }
                            active.name = Set(name);
                            changed.push("name");
                        }
                    }
                    if let Some(location) = request.location {
                        active.location = Set(location);
                        changed.push("location");
                    }
                    if let Some(description) = request.description {
                        active.description = Set(Some(description));
                        changed.push("description");
                    }
                    active.updated_at = Set(Utc::now());

                    let saved = active.update(txn).await.map_err(ServiceError::db_error)?;

                    log_activity(
                        txn,
                        NewActivity::new(
                            Some(actor_id),
                            ActivityType::WarehouseUpdated,
                            entity_types::WAREHOUSE,
                            Some(saved.id),
                            format!("Updated warehouse {}", saved.name),
                        )
                        .with_metadata(json!({ "updated_fields": changed })),
                    )
                    .await?;

                    Ok(saved)
                })
            })
            .await?;

        info!(warehouse_id = %updated.id, "Warehouse updated");
        Ok(updated)
    }

    /// Deletes a warehouse. Its inventory items go with it.
    #[instrument(skip(self))]
    pub async fn delete(&self, actor_id: Uuid, id: Uuid) -> Result<(), ServiceError> {
        self.db
            .transaction::<_, (), ServiceError>(move |txn| {
                Box::pin(async move {
                    let existing = Warehouse::find_by_id(id)
                        .one(txn)
                        .await
                        .map_err(ServiceError::db_error)?
                        .ok_or_else(|| ServiceError::NotFound("Warehouse not found".to_string()))?;

                    // Explicit so the cascade holds even where FK enforcement is off.
                    let items = InventoryItem::delete_many()
                        .filter(inventory_item::Column::WarehouseId.eq(id))
                        .exec(txn)
                        .await
                        .map_err(ServiceError::db_error)?;

                    Warehouse::delete_by_id(id)
                        .exec(txn)
                        .await
                        .map_err(ServiceError::db_error)?;

                    log_activity(
                        txn,
                        NewActivity::new(
                            Some(actor_id),
                            ActivityType::WarehouseDeleted,
                            entity_types::WAREHOUSE,
                            Some(id),
                            format!("Deleted warehouse {}", existing.name),
                        )
                        .with_metadata(json!({
                            "name": existing.name,
                            "location": existing.location,
                            "deleted_items": items.rows_affected,
                        })),
                    )
                    .await?;

                    Ok(())
                })
            })
            .await?;

        counter!("inventory_api.warehouses_deleted", 1);
        info!(warehouse_id = %id, "Warehouse deleted");
        Ok(())
    }
}

async fn find_by_name<C: ConnectionTrait>(
    conn: &C,
    name: &str,
) -> Result<Option<WarehouseModel>, ServiceError> {
    Warehouse::find()
        .filter(warehouse::Column::Name.eq(name))
        .one(conn)
        .await
        .map_err(ServiceError::db_error)
}
