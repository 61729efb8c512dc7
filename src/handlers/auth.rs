use std::future::{ready, Ready};

use actix_web::dev::Payload;
use actix_web::{web, FromRequest, HttpRequest};
use uuid::Uuid;

use crate::errors::AppError;

pub const USER_ID_HEADER: &str = "X-User-ID";

/// The calling user, as asserted by the upstream gateway in `X-User-ID`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser(pub Uuid);

impl FromRequest for CurrentUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let user = req
            .headers()
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| Uuid::parse_str(v.trim()).ok())
            .map(CurrentUser);

        ready(user.ok_or_else(|| {
            log::warn!(
                "Rejected {} {}: missing or invalid {} header",
                req.method(),
                req.path(),
                USER_ID_HEADER
            );
            AppError::Unauthorized
        }))
    }
}

pub const ADMIN_TOKEN_HEADER: &str = "X-Admin-Token";

/// The shared secret back-office callers present in `X-Admin-Token`.
/// With no token configured every admin request is refused.
#[derive(Debug, Clone, Default)]
pub struct AdminToken(pub Option<String>);

/// A caller that presented the configured admin token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdminCaller;

impl FromRequest for AdminCaller {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let expected = req
            .app_data::<web::Data<AdminToken>>()
            .and_then(|t| t.0.as_deref());
        let presented = req
            .headers()
            .get(ADMIN_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok());

        match (expected, presented) {
            (Some(expected), Some(presented)) if expected == presented => ready(Ok(AdminCaller)),
            _ => {
                log::warn!(
                    "Rejected admin request {} {}: missing or wrong {} header",
                    req.method(),
                    req.path(),
                    ADMIN_TOKEN_HEADER
                );
                ready(Err(AppError::Unauthorized))
            }
        }
    }
}
