use std::future::Future;
use std::pin::Pin;

use actix_web::dev::Payload;
use actix_web::{web, FromRequest, HttpRequest};

use crate::auth::identity::{self, RequestIdentity};
use crate::error::AppError;
use crate::errors::ErrorCode;
use crate::services::users;
use crate::state::app_state::AppState;
use crate::store::UserRecord;

/// The signed-in caller's identity together with their current record.
///
/// The identity comes from the session token; the record is looked up by
/// email on every extraction. A token that outlives its account yields
/// 404 "User not found".
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub identity: RequestIdentity,
    pub record: UserRecord,
}

impl FromRequest for CurrentUser {
    type Error = AppError;
    type Future = Pin<Box<dyn Future<Output = Result<Self, Self::Error>>>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let identity = identity::read(req);
        let state = req.app_data::<web::Data<AppState>>().cloned();

        Box::pin(async move {
            let identity = identity.ok_or_else(AppError::unauthorized)?;
            let state = state.ok_or_else(|| {
                AppError::internal(ErrorCode::Internal, "AppState missing from app data")
            })?;

            let record = users::find_by_email(state.store(), &identity.email)
                .await?
                .ok_or_else(AppError::user_not_found)?;

            Ok(CurrentUser { identity, record })
        })
    }
}
