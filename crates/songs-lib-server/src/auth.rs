//! HTTP Basic auth for mutating song routes.
//!
//! Reads stay public; POST/PUT/PATCH/DELETE under `/songs` need credentials
//! when they are configured.

use std::task::{Context, Poll};

use actix_web::body::EitherBody;
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::{Method, header};
use actix_web::{Error, HttpResponse};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use futures_util::future::{LocalBoxFuture, Ready, ok};

use crate::config::AuthConfig;
use crate::models::ErrorResponse;

const REALM: &str = "songs-service";

/// Return true when the request must carry credentials.
fn requires_auth(method: &Method, path: &str) -> bool {
    let mutating = matches!(*method, Method::POST | Method::PUT | Method::PATCH | Method::DELETE);
    mutating && (path == "/songs" || path.starts_with("/songs/"))
}

/// Check an `Authorization` header value against the configured credentials.
fn authorized(authorization: Option<&str>, credentials: &AuthConfig) -> bool {
    let Some(value) = authorization else {
        return false;
    };
    let Some((scheme, encoded)) = value.trim().split_once(' ') else {
        return false;
    };
    if !scheme.eq_ignore_ascii_case("basic") {
        return false;
    }
    let Ok(decoded) = STANDARD.decode(encoded.trim()) else {
        return false;
    };
    let Ok(decoded) = String::from_utf8(decoded) else {
        return false;
    };
    match decoded.split_once(':') {
        Some((user, password)) => user == credentials.user && password == credentials.password,
        None => false,
    }
}

/// Actix middleware enforcing Basic auth on mutating routes.
pub struct BasicAuth {
    credentials: Option<AuthConfig>,
}

impl BasicAuth {
    /// `None` disables the check.
    pub fn new(credentials: Option<AuthConfig>) -> Self {
        Self { credentials }
    }
}

impl<S, B> Transform<S, ServiceRequest> for BasicAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = BasicAuthMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(BasicAuthMiddleware {
            service,
            credentials: self.credentials.clone(),
        })
    }
}

pub struct BasicAuthMiddleware<S> {
    service: S,
    credentials: Option<AuthConfig>,
}

impl<S, B> Service<ServiceRequest> for BasicAuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, ctx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        if let Some(credentials) = self.credentials.as_ref() {
            if requires_auth(req.method(), req.path()) {
                let authorization = req
                    .headers()
                    .get(header::AUTHORIZATION)
                    .and_then(|v| v.to_str().ok());
                if !authorized(authorization, credentials) {
                    tracing::warn!(
                        method = %req.method(),
                        path = %req.path(),
                        "rejected unauthorized request"
                    );
                    let resp = HttpResponse::Unauthorized()
                        .insert_header((
                            header::WWW_AUTHENTICATE,
                            format!("Basic realm=\"{REALM}\""),
                        ))
                        .json(ErrorResponse::new("unauthorized"));
                    return Box::pin(async move { Ok(req.into_response(resp).map_into_right_body()) });
                }
            }
        }

        let fut = self.service.call(req);
        Box::pin(async move { Ok(fut.await?.map_into_left_body()) })
    }
}
