use crate::{database::ConnectionState, services::UserRepository};
use actix_web::{web, HttpResponse, Responder};
use serde::{Deserialize, Serialize};

pub const HEALTH_MESSAGE: &str = "Server Set Up Successfully (Health Check)";

#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub message: String,
}

#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct StoreHealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub database: String,
    pub timestamp: i64,
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Health",
    responses(
        (status = 200, description = "Server is up", body = HealthResponse)
    )
)]
pub async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        message: HEALTH_MESSAGE.to_string(),
    })
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Store is connected", body = StoreHealthResponse),
        (status = 503, description = "Store is not connected", body = StoreHealthResponse)
    )
)]
pub async fn store_health(users: web::Data<UserRepository>) -> impl Responder {
    let state = users.state();
    let connected = state == ConnectionState::Connected;
    let body = StoreHealthResponse {
        status: if connected {
            "healthy".to_string()
        } else {
            "degraded".to_string()
        },
        service: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: state.as_str().to_string(),
        timestamp: chrono::Utc::now().timestamp(),
    };

    if connected {
        HttpResponse::Ok().json(body)
    } else {
        HttpResponse::ServiceUnavailable().json(body)
    }
}
