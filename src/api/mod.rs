pub mod health;
pub mod swagger;
pub mod users;

use crate::utils::AppError;
use actix_web::web;

/// Routes shared by the server and the HTTP tests.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| AppError::InvalidRequest(err.to_string()).into()),
    )
    .route("/", web::get().to(health::health_check))
    .route("/health", web::get().to(health::store_health))
    .service(
        web::scope("/api/users")
            .route("/register", web::post().to(users::register))
            .route("/login", web::post().to(users::login))
            .route("/logout", web::post().to(users::logout))
            .route("/me", web::get().to(users::get_me))
            .route("/me", web::patch().to(users::update_me)),
    );
}
