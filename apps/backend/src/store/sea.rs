//! SeaORM-backed user store (Postgres or SQLite).

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, IntoActiveModel,
    QueryFilter, QueryOrder, Set, SqlErr,
};
use time::OffsetDateTime;
use tracing::error;

use super::{
    new_user_id, NewUser, StoreError, UserFilter, UserPatch, UserRecord, UserStatus, UserStore,
};
use crate::auth::claims::Role;
use crate::entities::users;

#[derive(Clone)]
pub struct SeaUserStore {
    db: DatabaseConnection,
}

impl SeaUserStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

/// Which unique column a violation names. SQLite reports
/// `UNIQUE constraint failed: users.email`, Postgres the index name.
fn duplicate_field(message: &str) -> &'static str {
    if message.contains("users.username") || message.contains("ux_users_username") {
        "username"
    } else {
        "email"
    }
}

fn map_db_err(e: DbErr) -> StoreError {
    if let Some(SqlErr::UniqueConstraintViolation(message)) = e.sql_err() {
        return StoreError::Duplicate {
            field: duplicate_field(&message),
        };
    }
    // Row contents stay out of the log; the message is driver text only.
    error!(error = %e, "user store query failed");
    StoreError::Backend(e.to_string())
}

fn to_record(model: users::Model) -> Result<UserRecord, StoreError> {
    let role = model
        .role
        .parse::<Role>()
        .map_err(|e| StoreError::Corrupt(e.to_string()))?;
    let status = model.status.parse::<UserStatus>()?;
    Ok(UserRecord {
        id: model.id,
        name: model.name,
        username: model.username,
        email: model.email,
        role,
        status,
        password_hash: model.password_hash,
        created_at: model.created_at,
        updated_at: model.updated_at,
    })
}

impl SeaUserStore {
    async fn find_model(&self, filter: &UserFilter) -> Result<Option<users::Model>, StoreError> {
        let query = match filter {
            UserFilter::Id(id) => users::Entity::find_by_id(id.clone()),
            UserFilter::Email(email) => {
                users::Entity::find().filter(users::Column::Email.eq(email.as_str()))
            }
            UserFilter::Username(username) => {
                users::Entity::find().filter(users::Column::Username.eq(username.as_str()))
            }
            UserFilter::Role(role) => users::Entity::find()
                .filter(users::Column::Role.eq(role.as_str()))
                .order_by_asc(users::Column::CreatedAt),
        };
        query.one(&self.db).await.map_err(map_db_err)
    }
}

#[async_trait]
impl UserStore for SeaUserStore {
    async fn find_one(&self, filter: &UserFilter) -> Result<Option<UserRecord>, StoreError> {
        self.find_model(filter).await?.map(to_record).transpose()
    }

    async fn find_all(&self) -> Result<Vec<UserRecord>, StoreError> {
        users::Entity::find()
            .order_by_asc(users::Column::CreatedAt)
            .order_by_asc(users::Column::Id)
            .all(&self.db)
            .await
            .map_err(map_db_err)?
            .into_iter()
            .map(to_record)
            .collect()
    }

    async fn insert_one(&self, user: NewUser) -> Result<UserRecord, StoreError> {
        let now = OffsetDateTime::now_utc();
        let active = users::ActiveModel {
            id: Set(new_user_id()),
            name: Set(user.name),
            username: Set(user.username.filter(|u| !u.is_empty())),
            email: Set(user.email),
            role: Set(user.role.as_str().to_string()),
            status: Set(user.status.as_str().to_string()),
            password_hash: Set(user.password_hash),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let model = active.insert(&self.db).await.map_err(map_db_err)?;
        to_record(model)
    }

    async fn update_one(&self, id: &str, patch: UserPatch) -> Result<Option<UserRecord>, StoreError> {
        let Some(model) = self.find_model(&UserFilter::Id(id.to_string())).await? else {
            return Ok(None);
        };

        let mut active = model.into_active_model();
        if let Some(name) = patch.name {
            active.name = Set(name);
        }
        if let Some(username) = patch.username {
            active.username = Set(username.filter(|u| !u.is_empty()));
        }
        if let Some(email) = patch.email {
            active.email = Set(email);
        }
        if let Some(role) = patch.role {
            active.role = Set(role.as_str().to_string());
        }
        if let Some(status) = patch.status {
            active.status = Set(status.as_str().to_string());
        }
        if let Some(password_hash) = patch.password_hash {
            active.password_hash = Set(password_hash);
        }
        active.updated_at = Set(OffsetDateTime::now_utc());

        let model = active.update(&self.db).await.map_err(map_db_err)?;
        to_record(model).map(Some)
    }

    async fn delete_one(&self, id: &str) -> Result<bool, StoreError> {
        let result = users::Entity::delete_by_id(id.to_string())
            .exec(&self.db)
            .await
            .map_err(map_db_err)?;
        Ok(result.rows_affected > 0)
    }
}
