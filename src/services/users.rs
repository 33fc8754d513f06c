use crate::{
    auth::{hash_password, policy, verify_password},
    entities::{user, ActivityType, User, UserModel, UserRole, Warehouse},
    errors::ServiceError,
    services::activity::{entity_types, log_activity, NewActivity},
};
use chrono::{DateTime, Utc};
use metrics::counter;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

pub const MAX_USER_PAGE: u64 = 100;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[validate(email)]
    #[schema(example = "jane@example.com")]
    pub email: String,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(min = 6, max = 16))]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateUserRequest {
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(length(min = 6, max = 16))]
    pub password: Option<String>,
    /// Super admin only
    pub role: Option<UserRole>,
    /// Super admin only
    pub warehouse_id: Option<Uuid>,
    /// Super admin only
    pub is_active: Option<bool>,
}

impl UpdateUserRequest {
    fn touches_privileged_fields(&self) -> bool {
        self.role.is_some() || self.warehouse_id.is_some() || self.is_active.is_some()
    }
}

/// Public view of an account; never carries the password hash
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: UserRole,
    pub warehouse_id: Option<Uuid>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<UserModel> for UserResponse {
    fn from(user: UserModel) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            role: user.role,
            warehouse_id: user.warehouse_id,
            is_active: user.is_active,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Account management and credential checks
#[derive(Clone)]
pub struct UserService {
    db: Arc<DatabaseConnection>,
}

impl UserService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Creates a `warehouse` account. The new user is its own actor in the
    /// `user_created` activity.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn register(&self, request: RegisterRequest) -> Result<UserModel, ServiceError> {
        request.validate()?;
        let password_hash = hash_password(&request.password)?;

        let created = self
            .db
            .transaction::<_, UserModel, ServiceError>(move |txn| {
                Box::pin(async move {
                    if find_by_email(txn, &request.email).await?.is_some() {
                        return Err(ServiceError::BadRequest(
                            "Email already registered".to_string(),
                        ));
                    }

                    let now = Utc::now();
                    let saved = user::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        name: Set(request.name),
                        email: Set(request.email),
                        password_hash: Set(password_hash),
                        role: Set(UserRole::Warehouse),
                        warehouse_id: Set(None),
                        is_active: Set(true),
                        created_at: Set(now),
                        updated_at: Set(now),
                    }
                    .insert(txn)
                    .await
                    .map_err(ServiceError::db_error)?;

                    log_activity(
                        txn,
                        NewActivity::new(
                            Some(saved.id),
                            ActivityType::UserCreated,
                            entity_types::USER,
                            Some(saved.id),
                            format!("Registered user {}", saved.email),
                        )
                        .with_metadata(json!({ "role": saved.role })),
                    )
                    .await?;

                    Ok(saved)
                })
            })
            .await?;

        counter!("inventory_api.users_registered", 1);
        info!(user_id = %created.id, "User registered");
        Ok(created)
    }

    /// Checks credentials and records a `user_login` activity.
    ///
    /// Unknown email and wrong password are indistinguishable to the caller.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn login(&self, request: LoginRequest) -> Result<UserModel, ServiceError> {
        request.validate()?;

        let invalid = || ServiceError::Unauthorized("Incorrect email or password".to_string());

        let user = find_by_email(&*self.db, &request.email)
            .await?
            .ok_or_else(invalid)?;

        if !verify_password(&request.password, &user.password_hash) {
            counter!("inventory_api.login_failures", 1);
            warn!(user_id = %user.id, "Login rejected: bad password");
            return Err(invalid());
        }

        if !user.is_active {
            return Err(ServiceError::Forbidden(
                "User account is inactive".to_string(),
            ));
        }

        log_activity(
            &*self.db,
            NewActivity::new(
                Some(user.id),
                ActivityType::UserLogin,
                entity_types::USER,
                Some(user.id),
                format!("User {} logged in", user.email),
            ),
        )
        .await?;

        counter!("inventory_api.logins", 1);
        info!(user_id = %user.id, "User logged in");
        Ok(user)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<UserModel, ServiceError> {
        User::find_by_id(id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))
    }

    #[instrument(skip(self))]
    pub async fn list(&self, skip: u64, limit: u64) -> Result<Vec<UserModel>, ServiceError> {
        User::find()
            .order_by_asc(user::Column::CreatedAt)
            .offset(skip)
            .limit(limit.clamp(1, MAX_USER_PAGE))
            .all(&*self.db)
            .await
            .map_err(ServiceError::db_error)
    }

    /// Applies a partial update. Role, warehouse and activation changes are
    /// reserved to super admins.
    #[instrument(skip(self, request))]
    pub async fn update(
        &self,
        actor_id: Uuid,
        actor_role: UserRole,
        id: Uuid,
        request: UpdateUserRequest,
    ) -> Result<UserModel, ServiceError> {
        if !policy::can_access_user(actor_role, actor_id, id) {
            return Err(ServiceError::Forbidden(
                "Not enough permissions".to_string(),
            ));
        }
        if request.touches_privileged_fields()
            && !policy::can_change_privileged_user_fields(actor_role)
        {
            return Err(ServiceError::Forbidden(
                "Only super admin users can change role, warehouse or active status".to_string(),
            ));
        }
        request.validate()?;

        let password_hash = match &request.password {
            Some(password) => Some(hash_password(password)?),
            None => None,
        };

        let updated = self
            .db
            .transaction::<_, UserModel, ServiceError>(move |txn| {
                Box::pin(async move {
                    let existing = User::find_by_id(id)
                        .one(txn)
                        .await
                        .map_err(ServiceError::db_error)?
                        .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))?;

                    let mut changed = Vec::new();
                    let mut active: user::ActiveModel = existing.clone().into();

                    if let Some(email) = request.email {
                        if email != existing.email {
                            if let Some(other) = find_by_email(txn, &email).await? {
                                if other.id != id {
                                    return Err(ServiceError::BadRequest(
                                        "Email already taken".to_string(),
                                    ));
                                }
                            }
                            active.email = Set(email);
                            changed.push("email");
                        }
                    }
                    if let Some(name) = request.name {
                        active.name = Set(name);
                        changed.push("name");
                    }
                    if let Some(hash) = password_hash {
                        active.password_hash = Set(hash);
                        changed.push("password");
                    }
                    if let Some(role) = request.role {
                        active.role = Set(role);
                        changed.push("role");
                    }
                    if let Some(warehouse_id) = request.warehouse_id {
                        Warehouse::find_by_id(warehouse_id)
                            .one(txn)
                            .await
                            .map_err(ServiceError::db_error)?
                            .ok_or_else(|| {
                                ServiceError::NotFound(format!(
                                    "Warehouse with ID {} not found",
                                    warehouse_id
                                ))
                            })?;
                        active.warehouse_id = Set(Some(warehouse_id));
                        changed.push("warehouse_id");
                    }
                    if let Some(is_active) = request.is_active {
                        active.is_active = Set(is_active);
                        changed.push("is_active");
                    }
                    active.updated_at = Set(Utc::now());

                    let saved = active.update(txn).await.map_err(ServiceError::db_error)?;

                    log_activity(
                        txn,
                        NewActivity::new(
                            Some(actor_id),
                            ActivityType::UserUpdated,
                            entity_types::USER,
                            Some(saved.id),
                            format!("Updated user {}", saved.email),
                        )
                        .with_metadata(json!({ "updated_fields": changed })),
                    )
                    .await?;

                    Ok(saved)
                })
            })
            .await?;

        info!(user_id = %updated.id, "User updated");
        Ok(updated)
    }

    /// Removes an account. Super admins cannot remove themselves.
    #[instrument(skip(self))]
    pub async fn delete(&self, actor_id: Uuid, id: Uuid) -> Result<(), ServiceError> {
        if actor_id == id {
            return Err(ServiceError::BadRequest(
                "Cannot delete your own account".to_string(),
            ));
        }

        self.db
            .transaction::<_, (), ServiceError>(move |txn| {
                Box::pin(async move {
                    let existing = User::find_by_id(id)
                        .one(txn)
                        .await
                        .map_err(ServiceError::db_error)?
                        .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))?;

                    User::delete_by_id(id)
                        .exec(txn)
                        .await
                        .map_err(ServiceError::db_error)?;

                    log_activity(
                        txn,
                        NewActivity::new(
                            Some(actor_id),
                            ActivityType::UserDeleted,
                            entity_types::USER,
                            Some(id),
                            format!("Deleted user {}", existing.email),
                        )
                        .with_metadata(json!({ "email": existing.email, "role": existing.role })),
                    )
                    .await?;

                    Ok(())
                })
            })
            .await?;

        counter!("inventory_api.users_deleted", 1);
        info!(user_id = %id, "User deleted");
        Ok(())
    }
}

pub(crate) async fn find_by_email<C: ConnectionTrait>(
    conn: &C,
    email: &str,
) -> Result<Option<UserModel>, ServiceError> {
    User::find()
        .filter(user::Column::Email.eq(email))
        .one(conn)
        .await
        .map_err(ServiceError::db_error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn privileged_fields_are_detected() {
        let plain = UpdateUserRequest {
            name: Some("New name".into()),
            ..Default::default()
        };
        assert!(!plain.touches_privileged_fields());

        let promote = UpdateUserRequest {
            role: Some(UserRole::SuperAdmin),
            ..Default::default()
        };
        assert!(promote.touches_privileged_fields());

        let deactivate = UpdateUserRequest {
            is_active: Some(false),
            ..Default::default()
        };
        assert!(deactivate.touches_privileged_fields());
    }

    #[test]
    fn register_request_enforces_password_length() {
        let short = RegisterRequest {
            email: "a@b.io".into(),
            name: "A".into(),
            password: "12345".into(),
        };
        assert!(short.validate().is_err());

        let long = RegisterRequest {
            password: "x".repeat(17),
            ..short.clone()
        };
        assert!(long.validate().is_err());

        let ok = RegisterRequest {
            password: "123456".into(),
            ..short
        };
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn response_drops_password_hash() {
        let now = Utc::now();
        let model = UserModel {
            id: Uuid::new_v4(),
            name: "Jane".into(),
            email: "jane@example.com".into(),
            password_hash: "$argon2id$secret".into(),
            role: UserRole::Warehouse,
            warehouse_id: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        let body = serde_json::to_value(UserResponse::from(model)).unwrap();
        assert!(body.get("password_hash").is_none());
        assert_eq!(body["role"], "warehouse");
    }
}
