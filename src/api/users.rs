use crate::{
    middleware::SessionContext,
    models::{NewUser, UserPatch, UserProfile},
    services::UserRepository,
    utils::AppError,
};
use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct UserResponse {
    pub success: bool,
    pub user: UserProfile,
}

#[utoipa::path(
    post,
    path = "/api/users/register",
    tag = "Users",
    request_body = NewUser,
    responses(
        (status = 201, description = "User registered", body = UserResponse),
        (status = 400, description = "Missing required field"),
        (status = 409, description = "Email already registered"),
        (status = 503, description = "Store unavailable")
    )
)]
pub async fn register(
    users: web::Data<UserRepository>,
    session: SessionContext,
    request: web::Json<NewUser>,
) -> Result<HttpResponse, AppError> {
    let email = request.email.as_deref().unwrap_or("N/A");
    log::info!("📝 POST /api/users/register - email: {}", email);

    let user = match users.register(&request).await {
        Ok(user) => user,
        Err(e) => {
            log::warn!("❌ Registration failed: {} - {}", email, e);
            return Err(e);
        }
    };

    session.set_user_id(&user.id)?;
    session.renew();

    log::info!("✅ Registration successful: {}", user.record.email);
    Ok(HttpResponse::Created().json(UserResponse {
        success: true,
        user: UserProfile::from(&user),
    }))
}

#[utoipa::path(
    post,
    path = "/api/users/login",
    tag = "Users",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = UserResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    users: web::Data<UserRepository>,
    session: SessionContext,
    request: web::Json<LoginRequest>,
) -> Result<HttpResponse, AppError> {
    log::info!("🔐 POST /api/users/login - email: {}", request.email);

    let user = match users.authenticate(&request.email, &request.password).await {
        Ok(user) => user,
        Err(e) => {
            log::warn!("❌ Login failed: {} - {}", request.email, e);
            return Err(e);
        }
    };

    session.set_user_id(&user.id)?;
    session.renew();

    log::info!("✅ Login successful: {}", request.email);
    Ok(HttpResponse::Ok().json(UserResponse {
        success: true,
        user: UserProfile::from(&user),
    }))
}

#[utoipa::path(
    post,
    path = "/api/users/logout",
    tag = "Users",
    responses(
        (status = 200, description = "Session discarded")
    )
)]
pub async fn logout(session: SessionContext) -> HttpResponse {
    log::info!("👋 POST /api/users/logout");
    session.purge();
    HttpResponse::Ok().json(serde_json::json!({ "success": true }))
}

#[utoipa::path(
    get,
    path = "/api/users/me",
    tag = "Users",
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Login required")
    )
)]
pub async fn get_me(
    users: web::Data<UserRepository>,
    session: SessionContext,
) -> Result<HttpResponse, AppError> {
    let user_id = session.require_user_id()?;
    log::info!("👤 GET /api/users/me - user: {}", user_id);

    match users.find_by_id(&user_id).await? {
        Some(user) => Ok(HttpResponse::Ok().json(UserResponse {
            success: true,
            user: UserProfile::from(&user),
        })),
        None => {
            // The account is gone, the session is worthless
            log::warn!("⚠️  Session refers to unknown user {}", user_id);
            session.purge();
            Err(AppError::Unauthorized)
        }
    }
}

#[utoipa::path(
    patch,
    path = "/api/users/me",
    tag = "Users",
    request_body = UserPatch,
    responses(
        (status = 200, description = "User updated", body = UserResponse),
        (status = 400, description = "Blank field in patch"),
        (status = 401, description = "Login required"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn update_me(
    users: web::Data<UserRepository>,
    session: SessionContext,
    patch: web::Json<UserPatch>,
) -> Result<HttpResponse, AppError> {
    let user_id = session.require_user_id()?;
    log::info!("✏️  PATCH /api/users/me - user: {}", user_id);

    match users.update(&user_id, &patch).await {
        Ok(user) => {
            log::info!("✅ User updated: {}", user_id);
            Ok(HttpResponse::Ok().json(UserResponse {
                success: true,
                user: UserProfile::from(&user),
            }))
        }
        Err(e) => {
            log::warn!("❌ Update failed: {} - {}", user_id, e);
            Err(e)
        }
    }
}
