use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Expense Tracker API",
        version = "0.1.0",
        description = "REST backend for the expense tracker.\n\n**Sessions:** login and registration set a signed `sid` cookie; browser clients must send requests with credentials from an allowed origin."
    ),
    paths(
        crate::api::health::health_check,
        crate::api::health::store_health,
        crate::api::users::register,
        crate::api::users::login,
        crate::api::users::logout,
        crate::api::users::get_me,
        crate::api::users::update_me,
    ),
    components(
        schemas(
            crate::api::health::HealthResponse,
            crate::api::health::StoreHealthResponse,
            crate::api::users::LoginRequest,
            crate::api::users::UserResponse,
            crate::models::NewUser,
            crate::models::UserPatch,
            crate::models::UserProfile,
        )
    ),
    tags(
        (name = "Health", description = "Liveness and store connectivity."),
        (name = "Users", description = "Registration, login and profile of the session's user."),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_user_routes() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&String> = doc.paths.paths.keys().collect();
        assert!(paths.iter().any(|p| p.as_str() == "/api/users/register"));
        assert!(paths.iter().any(|p| p.as_str() == "/api/users/me"));
        assert!(paths.iter().any(|p| p.as_str() == "/"));
    }
}
