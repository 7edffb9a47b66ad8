use actix_web::{HttpResponse, Responder, get, web};
use serde::Serialize;
use utoipa::ToSchema;

use crate::api::run_blocking;
use crate::state::AppState;

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Liveness plus a store round-trip.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service and store are healthy", body = HealthResponse),
        (status = 503, description = "Store is unreachable", body = HealthResponse)
    )
)]
#[get("/health")]
pub async fn health(state: web::Data<AppState>) -> impl Responder {
    let songs = state.songs.clone();
    match run_blocking(move || songs.ping()).await {
        Ok(()) => HttpResponse::Ok().json(HealthResponse {
            status: "ok",
            version: crate::VERSION,
        }),
        Err(err) => {
            tracing::error!(error = %err, "health check failed");
            HttpResponse::ServiceUnavailable().json(HealthResponse {
                status: "degraded",
                version: crate::VERSION,
            })
        }
    }
}
