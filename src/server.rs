use crate::{
    api::{self, swagger::ApiDoc},
    middleware::{AdmissionGate, AllowedOrigins, SessionSettings},
    services::UserRepository,
};
use actix_web::{
    body::MessageBody,
    dev::{ServiceFactory, ServiceRequest, ServiceResponse},
    middleware::Logger,
    web, App,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Everything a worker needs to build its `App`.
#[derive(Clone)]
pub struct AppState {
    pub users: web::Data<UserRepository>,
    pub origins: AllowedOrigins,
    pub sessions: SessionSettings,
}

/// Builds the application with its middleware stack.
///
/// Outermost first: request log, admission gate, CORS headers, sessions.
/// A rejected origin therefore never reaches the session store.
pub fn build_app(
    state: AppState,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let openapi = ApiDoc::openapi();

    App::new()
        .app_data(state.users.clone())
        .configure(api::configure)
        .service(SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", openapi))
        .wrap(state.sessions.middleware())
        .wrap(state.origins.cors())
        .wrap(AdmissionGate::new(state.origins.clone()))
        .wrap(Logger::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        api::health::HEALTH_MESSAGE,
        api::users::UserResponse,
        database::{ConnectionState, MemoryUserStore},
        middleware::{session::SESSION_COOKIE, MemorySessionStore},
    };
    use actix_web::{
        cookie::Cookie,
        http::{header, StatusCode},
        test,
    };
    use serde_json::json;
    use std::sync::Arc;

    const CLIENT: &str = "https://app.example.com";
    const EVIL: &str = "https://evil.example.com";

    struct Fixture {
        state: AppState,
        users: Arc<MemoryUserStore>,
        sessions: MemorySessionStore,
    }

    fn fixture() -> Fixture {
        let users = Arc::new(MemoryUserStore::new());
        let sessions = MemorySessionStore::new();
        let state = AppState {
            users: web::Data::new(UserRepository::new(users.clone(), 4)),
            origins: AllowedOrigins::new(CLIENT),
            sessions: SessionSettings::new(sessions.clone(), "keyboard cat", 3600, false),
        };
        Fixture {
            state,
            users,
            sessions,
        }
    }

    fn registration(email: &str) -> serde_json::Value {
        json!({
            "name": "A",
            "email": email,
            "mobile_no": "555",
            "password": "h"
        })
    }

    fn session_cookie(res: &ServiceResponse<impl MessageBody>) -> Cookie<'static> {
        res.response()
            .cookies()
            .find(|c| c.name() == SESSION_COOKIE)
            .expect("session cookie set")
            .into_owned()
    }

    #[actix_web::test]
    async fn test_health_check_with_any_origin() {
        let f = fixture();
        let app = test::init_service(build_app(f.state)).await;

        for origin in [None, Some(CLIENT), Some(EVIL)] {
            let mut req = test::TestRequest::get().uri("/");
            if let Some(origin) = origin {
                req = req.insert_header((header::ORIGIN, origin));
            }
            let res = test::call_service(&app, req.to_request()).await;
            assert_eq!(res.status(), StatusCode::OK);
            assert!(res.response().cookies().next().is_none());
            let body: serde_json::Value = test::read_body_json(res).await;
            assert_eq!(body, json!({ "message": HEALTH_MESSAGE }));
        }
        assert_eq!(f.sessions.len().await, 0);
    }

    #[actix_web::test]
    async fn test_disallowed_origin_is_rejected_without_session() {
        let f = fixture();
        let app = test::init_service(build_app(f.state)).await;

        let req = test::TestRequest::post()
            .uri("/api/users/register")
            .insert_header((header::ORIGIN, EVIL))
            .set_json(registration("a@x.com"))
            .to_request();
        let res = test::call_service(&app, req).await;

        assert_eq!(res.status(), StatusCode::FORBIDDEN);
        assert!(res.response().cookies().next().is_none());
        assert_eq!(f.users.len().await, 0);
        assert_eq!(f.sessions.len().await, 0);
    }

    #[actix_web::test]
    async fn test_allowed_origin_gets_credentialed_cors_headers() {
        let f = fixture();
        let app = test::init_service(build_app(f.state)).await;

        let req = test::TestRequest::get()
            .uri("/health")
            .insert_header((header::ORIGIN, CLIENT))
            .to_request();
        let res = test::call_service(&app, req).await;

        assert_eq!(res.status(), StatusCode::OK);
        let headers = res.headers();
        assert_eq!(
            headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            CLIENT
        );
        assert_eq!(
            headers.get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS).unwrap(),
            "true"
        );
    }

    #[actix_web::test]
    async fn test_preflight_from_allowed_origin() {
        let f = fixture();
        let app = test::init_service(build_app(f.state)).await;

        let req = test::TestRequest::default()
            .method(actix_web::http::Method::OPTIONS)
            .uri("/api/users/login")
            .insert_header((header::ORIGIN, "http://localhost:3000"))
            .insert_header((header::ACCESS_CONTROL_REQUEST_METHOD, "POST"))
            .to_request();
        let res = test::call_service(&app, req).await;

        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(
            res.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "http://localhost:3000"
        );
    }

    #[actix_web::test]
    async fn test_register_then_me_then_logout() {
        let f = fixture();
        let app = test::init_service(build_app(f.state)).await;

        let req = test::TestRequest::post()
            .uri("/api/users/register")
            .insert_header((header::ORIGIN, CLIENT))
            .set_json(registration("a@x.com"))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::CREATED);
        let cookie = session_cookie(&res);
        let body: serde_json::Value = test::read_body_json(res).await;
        assert_eq!(body["user"]["email"], "a@x.com");
        assert!(body["user"].get("password").is_none());

        let req = test::TestRequest::get()
            .uri("/api/users/me")
            .cookie(cookie.clone())
            .to_request();
        let me: UserResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(me.user.name, "A");

        let req = test::TestRequest::post()
            .uri("/api/users/logout")
            .cookie(cookie.clone())
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
        assert_eq!(f.sessions.len().await, 0);

        let req = test::TestRequest::get()
            .uri("/api/users/me")
            .cookie(cookie)
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[actix_web::test]
    async fn test_login_renews_the_session_key() {
        let f = fixture();
        let app = test::init_service(build_app(f.state)).await;

        let req = test::TestRequest::post()
            .uri("/api/users/register")
            .set_json(registration("a@x.com"))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::CREATED);
        let registered = session_cookie(&res);
        assert_eq!(f.sessions.len().await, 1);

        let req = test::TestRequest::post()
            .uri("/api/users/login")
            .cookie(registered.clone())
            .set_json(json!({ "email": "a@x.com", "password": "h" }))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::OK);
        let logged_in = session_cookie(&res);

        assert_ne!(logged_in.value(), registered.value());
        // The pre-login entry is gone, only the renewed one is left
        assert_eq!(f.sessions.len().await, 1);

        let req = test::TestRequest::get()
            .uri("/api/users/me")
            .cookie(registered)
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::UNAUTHORIZED
        );

        let req = test::TestRequest::get()
            .uri("/api/users/me")
            .cookie(logged_in)
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn test_duplicate_and_missing_field_over_http() {
        let f = fixture();
        let app = test::init_service(build_app(f.state)).await;

        let req = test::TestRequest::post()
            .uri("/api/users/register")
            .set_json(registration("a@x.com"))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

        let req = test::TestRequest::post()
            .uri("/api/users/register")
            .set_json(json!({
                "name": "B",
                "email": "a@x.com",
                "mobile_no": "999",
                "password": "h2"
            }))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::CONFLICT);
        assert!(res.response().cookies().next().is_none());

        let req = test::TestRequest::post()
            .uri("/api/users/register")
            .set_json(json!({ "name": "C", "email": "c@x.com", "password": "h" }))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = test::read_body_json(res).await;
        assert_eq!(body["error"], "Missing required field: mobile_no");

        assert_eq!(f.users.len().await, 1);
    }

    #[actix_web::test]
    async fn test_login_and_update_profile() {
        let f = fixture();
        let app = test::init_service(build_app(f.state)).await;

        let req = test::TestRequest::post()
            .uri("/api/users/register")
            .set_json(registration("a@x.com"))
            .to_request();
        test::call_service(&app, req).await;

        let req = test::TestRequest::post()
            .uri("/api/users/login")
            .set_json(json!({ "email": "a@x.com", "password": "wrong" }))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::UNAUTHORIZED
        );

        let req = test::TestRequest::post()
            .uri("/api/users/login")
            .set_json(json!({ "email": "a@x.com", "password": "h" }))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::OK);
        let cookie = session_cookie(&res);

        let req = test::TestRequest::patch()
            .uri("/api/users/me")
            .cookie(cookie)
            .set_json(json!({ "mobile_no": "777" }))
            .to_request();
        let updated: UserResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(updated.user.mobile_no, "777");
        assert_eq!(updated.user.email, "a@x.com");
    }

    #[actix_web::test]
    async fn test_patch_requires_session() {
        let f = fixture();
        let app = test::init_service(build_app(f.state)).await;

        let req = test::TestRequest::patch()
            .uri("/api/users/me")
            .set_json(json!({ "name": "X" }))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[actix_web::test]
    async fn test_store_outage_surfaces_as_503() {
        let f = fixture();
        f.users.set_state(ConnectionState::Disconnected);
        let app = test::init_service(build_app(f.state)).await;

        let req = test::TestRequest::post()
            .uri("/api/users/register")
            .set_json(registration("a@x.com"))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::SERVICE_UNAVAILABLE
        );

        let req = test::TestRequest::get().uri("/health").to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body: serde_json::Value = test::read_body_json(res).await;
        assert_eq!(body["database"], "disconnected");
    }

    #[actix_web::test]
    async fn test_malformed_json_is_bad_request() {
        let f = fixture();
        let app = test::init_service(build_app(f.state)).await;

        let req = test::TestRequest::post()
            .uri("/api/users/login")
            .insert_header((header::CONTENT_TYPE, "application/json"))
            .set_payload("{not json")
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = test::read_body_json(res).await;
        assert_eq!(body["success"], false);
    }
}
