use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::application::user_service::UserService;
use crate::domain::user::User;
use crate::errors::{AppError, ErrorResponse};

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterUserRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub user_id: Uuid,
    pub email: String,
    pub name: String,
    pub created_at: String,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self {
            user_id: u.id,
            email: u.email,
            name: u.name,
            created_at: u.created_at.to_rfc3339(),
        }
    }
}

/// POST /users
///
/// Registers a user. The returned `userId` is what callers send as
/// `X-User-ID`.
#[utoipa::path(
    post,
    path = "/users",
    request_body = RegisterUserRequest,
    responses(
        (status = 201, description = "User registered", body = UserResponse),
        (status = 400, description = "Invalid email or name", body = ErrorResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse),
    ),
    tag = "users"
)]
pub async fn register_user(
    service: web::Data<UserService>,
    body: web::Json<RegisterUserRequest>,
) -> Result<HttpResponse, AppError> {
    let RegisterUserRequest { email, name } = body.into_inner();

    let user = web::block(move || service.register(&email, &name))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Created().json(UserResponse::from(user)))
}
