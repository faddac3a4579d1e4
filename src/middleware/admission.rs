use crate::{config::DEV_ORIGIN, utils::AppError};
use actix_cors::Cors;
use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::{header, Method},
    Error, ResponseError,
};
use futures::future::LocalBoxFuture;
use std::future::{ready, Ready};
use std::sync::Arc;

/// Path of the health check, answered for every caller regardless of origin.
pub const HEALTH_PATH: &str = "/";

/// Browser origins allowed to call the API with credentials.
#[derive(Debug, Clone)]
pub struct AllowedOrigins(Arc<Vec<String>>);

impl AllowedOrigins {
    /// The configured client origin plus the local development origin.
    pub fn new(client_url: &str) -> Self {
        let mut origins = vec![client_url.trim().to_string()];
        if origins[0] != DEV_ORIGIN {
            origins.push(DEV_ORIGIN.to_string());
        }
        Self(Arc::new(origins))
    }

    pub fn contains(&self, origin: &str) -> bool {
        self.0.iter().any(|allowed| allowed == origin)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Requests without an origin (curl, mobile apps) and requests from an
    /// allowed origin pass; everything else is `CorsRejected`.
    pub fn admit(&self, origin: Option<&str>) -> Result<(), AppError> {
        match origin {
            None | Some("") => Ok(()),
            Some(origin) if self.contains(origin) => Ok(()),
            Some(origin) => Err(AppError::CorsRejected(origin.to_string())),
        }
    }

    /// CORS header handling for admitted origins, cookies allowed both ways.
    ///
    /// Rejection is left to [`AdmissionGate`]; requests that get here with a
    /// foreign origin (the health check) pass without CORS headers.
    pub fn cors(&self) -> Cors {
        let origins = self.clone();
        Cors::default()
            .allowed_origin_fn(move |origin, _req_head| {
                origin
                    .to_str()
                    .map(|value| origins.contains(value))
                    .unwrap_or(false)
            })
            .allowed_methods(vec!["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"])
            .allowed_headers(vec![
                header::AUTHORIZATION,
                header::CONTENT_TYPE,
                header::ACCEPT,
            ])
            .expose_headers(vec![header::CONTENT_TYPE])
            .supports_credentials()
            .block_on_origin_mismatch(false)
            .max_age(3600)
    }
}

/// Origin check that runs before CORS headers, sessions and routes.
pub struct AdmissionGate {
    origins: AllowedOrigins,
}

impl AdmissionGate {
    pub fn new(origins: AllowedOrigins) -> Self {
        Self { origins }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AdmissionGate
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = AdmissionGateService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AdmissionGateService {
            service,
            origins: self.origins.clone(),
        }))
    }
}

pub struct AdmissionGateService<S> {
    service: S,
    origins: AllowedOrigins,
}

impl<S, B> Service<ServiceRequest> for AdmissionGateService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let is_health_check = req.path() == HEALTH_PATH && *req.method() == Method::GET;

        let verdict = if is_health_check {
            Ok(())
        } else {
            match req.headers().get(header::ORIGIN) {
                None => self.origins.admit(None),
                Some(value) => match value.to_str() {
                    Ok(origin) => self.origins.admit(Some(origin)),
                    Err(_) => Err(AppError::CorsRejected("<non-ascii origin>".to_string())),
                },
            }
        };

        match verdict {
            Ok(()) => {
                let fut = self.service.call(req);
                Box::pin(async move {
                    let res = fut.await?;
                    Ok(res.map_into_left_body())
                })
            }
            Err(e) => {
                log::warn!("🚫 {} {} - {}", req.method(), req.path(), e);
                let response = e.error_response();
                Box::pin(async move { Ok(req.into_response(response).map_into_right_body()) })
            }
        }
    }
}
