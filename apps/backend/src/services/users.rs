//! User lifecycle: sign-in checks, registration, admin CRUD, password
//! resets and admin seeding. Handlers stay thin and call in here.
//!
//! Argon2 is deliberately slow, so hashing and verification run on the
//! blocking pool instead of an actix worker.

use tracing::{debug, info, warn};

use crate::auth::claims::Role;
use crate::auth::password::CredentialHasher;
use crate::config::AdminSeed;
use crate::error::AppError;
use crate::errors::ErrorCode;
use crate::logging::pii::Redacted;
use crate::store::{bounded, NewUser, UserFilter, UserPatch, UserRecord, UserStatus, UserStore};

/// Emails are compared case-insensitively by storing them lowercased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// How a caller identifies themselves at login. Email wins when both are given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginIdentifier {
    Email(String),
    Username(String),
}

pub struct CreateUser {
    pub name: String,
    pub username: Option<String>,
    pub email: String,
    pub password: String,
    pub role: Role,
    pub status: UserStatus,
}

#[derive(Default)]
pub struct UpdateUser {
    pub name: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<Role>,
    pub status: Option<UserStatus>,
}

async fn hash_password(hasher: &CredentialHasher, password: &str) -> Result<String, AppError> {
    let hasher = hasher.clone();
    let password = password.to_string();
    tokio::task::spawn_blocking(move || hasher.hash(&password))
        .await
        .map_err(|e| AppError::internal(ErrorCode::HashingError, format!("hashing task failed: {e}")))?
        .map_err(AppError::from)
}

async fn verify_password(hasher: &CredentialHasher, digest: &str, password: &str) -> Result<bool, AppError> {
    let hasher = hasher.clone();
    let digest = digest.to_string();
    let password = password.to_string();
    tokio::task::spawn_blocking(move || hasher.verify(&digest, &password))
        .await
        .map_err(|e| AppError::internal(ErrorCode::HashingError, format!("verify task failed: {e}")))
}

async fn verify_missing(hasher: &CredentialHasher, password: &str) -> Result<bool, AppError> {
    let hasher = hasher.clone();
    let password = password.to_string();
    tokio::task::spawn_blocking(move || hasher.verify_missing(&password))
        .await
        .map_err(|e| AppError::internal(ErrorCode::HashingError, format!("verify task failed: {e}")))
}

/// Checks a login. Unknown accounts, wrong passwords and accounts that are
/// not active all fail the same way, so the response reveals nothing about
/// which accounts exist.
pub async fn authenticate(
    store: &dyn UserStore,
    hasher: &CredentialHasher,
    identifier: LoginIdentifier,
    password: &str,
) -> Result<UserRecord, AppError> {
    let filter = match identifier {
        LoginIdentifier::Email(email) => UserFilter::Email(normalize_email(&email)),
        LoginIdentifier::Username(username) => UserFilter::Username(username.trim().to_string()),
    };

    let Some(user) = bounded(store.find_one(&filter)).await? else {
        // Pay the Argon2 cost anyway so timing does not reveal the miss.
        verify_missing(hasher, password).await?;
        debug!("login rejected: no matching account");
        return Err(AppError::invalid_credentials());
    };

    if !verify_password(hasher, &user.password_hash, password).await? {
        debug!(user_id = %user.id, "login rejected: password mismatch");
        return Err(AppError::invalid_credentials());
    }

    if user.status != UserStatus::Active {
        debug!(user_id = %user.id, status = %user.status, "login rejected: account not active");
        return Err(AppError::invalid_credentials());
    }

    info!(user_id = %user.id, role = %user.role, "login succeeded");
    Ok(user)
}

pub async fn create_user(
    store: &dyn UserStore,
    hasher: &CredentialHasher,
    input: CreateUser,
) -> Result<UserRecord, AppError> {
    let password_hash = hash_password(hasher, &input.password).await?;
    let user = bounded(store.insert_one(NewUser {
        name: input.name.trim().to_string(),
        username: input.username.map(|u| u.trim().to_string()).filter(|u| !u.is_empty()),
        email: normalize_email(&input.email),
        role: input.role,
        status: input.status,
        password_hash,
    }))
    .await?;

    info!(user_id = %user.id, role = %user.role, "user created");
    Ok(user)
}

/// Self-service sign-up: always an active operator.
pub async fn register(
    store: &dyn UserStore,
    hasher: &CredentialHasher,
    name: String,
    username: Option<String>,
    email: String,
    password: String,
) -> Result<UserRecord, AppError> {
    create_user(
        store,
        hasher,
        CreateUser {
            name,
            username,
            email,
            password,
            role: Role::Operator,
            status: UserStatus::Active,
        },
    )
    .await
}

pub async fn get_user(store: &dyn UserStore, id: &str) -> Result<UserRecord, AppError> {
    bounded(store.find_one(&UserFilter::Id(id.to_string())))
        .await?
        .ok_or_else(AppError::user_not_found)
}

pub async fn find_by_email(store: &dyn UserStore, email: &str) -> Result<Option<UserRecord>, AppError> {
    Ok(bounded(store.find_one(&UserFilter::Email(normalize_email(email)))).await?)
}

pub async fn list_users(store: &dyn UserStore) -> Result<Vec<UserRecord>, AppError> {
    Ok(bounded(store.find_all()).await?)
}

pub async fn update_user(
    store: &dyn UserStore,
    hasher: &CredentialHasher,
    id: &str,
    input: UpdateUser,
) -> Result<UserRecord, AppError> {
    let password_hash = match input.password {
        Some(password) => Some(hash_password(hasher, &password).await?),
        None => None,
    };

    let patch = UserPatch {
        name: input.name.map(|n| n.trim().to_string()),
        username: input
            .username
            .map(|u| Some(u.trim().to_string()).filter(|u| !u.is_empty())),
        email: input.email.map(|e| normalize_email(&e)),
        role: input.role,
        status: input.status,
        password_hash,
    };

    let user = bounded(store.update_one(id, patch))
        .await?
        .ok_or_else(AppError::user_not_found)?;
    info!(user_id = %user.id, "user updated");
    Ok(user)
}

pub async fn delete_user(store: &dyn UserStore, id: &str) -> Result<(), AppError> {
    if bounded(store.delete_one(id)).await? {
        info!(user_id = %id, "user deleted");
        Ok(())
    } else {
        Err(AppError::user_not_found())
    }
}

/// Replaces the password of the account behind `email`. The caller has
/// already proven control of the address with a reset token.
pub async fn reset_password(
    store: &dyn UserStore,
    hasher: &CredentialHasher,
    email: &str,
    new_password: &str,
) -> Result<UserRecord, AppError> {
    let Some(user) = find_by_email(store, email).await? else {
        // Token was valid but the account is gone.
        warn!(email = %Redacted(email), "password reset for missing account");
        return Err(AppError::unauthorized());
    };

    let password_hash = hash_password(hasher, new_password).await?;
    let patch = UserPatch {
        password_hash: Some(password_hash),
        ..Default::default()
    };
    let user = bounded(store.update_one(&user.id, patch))
        .await?
        .ok_or_else(AppError::unauthorized)?;

    info!(user_id = %user.id, "password reset");
    Ok(user)
}

/// Creates the seed admin unless some admin already exists. Returns the new
/// record when one was created.
pub async fn ensure_admin_user(
    store: &dyn UserStore,
    hasher: &CredentialHasher,
    seed: &AdminSeed,
) -> Result<Option<UserRecord>, AppError> {
    if bounded(store.find_one(&UserFilter::Role(Role::Admin)))
        .await?
        .is_some()
    {
        debug!("admin account present, seeding skipped");
        return Ok(None);
    }

    let user = create_user(
        store,
        hasher,
        CreateUser {
            name: "Administrator".to_string(),
            username: Some(seed.username.clone()),
            email: seed.email.clone(),
            password: seed.password.clone(),
            role: Role::Admin,
            status: UserStatus::Active,
        },
    )
    .await?;

    info!(user_id = %user.id, email = %Redacted(&user.email), "seeded admin account");
    Ok(Some(user))
}
