//! Actix server startup + app wiring.
//!
//! Loads config, opens the store, builds the service graph, and serves the
//! routes with logging, auth, and OpenAPI endpoints.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::task::{Context, Poll};

use actix_web::dev::{Service, ServiceRequest, ServiceResponse};
use actix_web::http::header::{HeaderName, HeaderValue};
use actix_web::{App, Error, HttpMessage, HttpServer, web};
use anyhow::Result;
use futures_util::future::{LocalBoxFuture, Ready, ok};
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api;
use crate::auth::BasicAuth;
use crate::config;
use crate::openapi;
use crate::song_db::SongDb;
use crate::song_details::SongDetailsClient;
use crate::song_service::SongService;
use crate::state::AppState;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Per-request correlation id, stored in request extensions.
#[derive(Clone, Debug)]
pub(crate) struct RequestId(pub String);

/// Build server state and start the Actix HTTP server.
pub(crate) async fn run(args: crate::Args) -> Result<()> {
    let cfg = load_config(args.config.as_ref())?;
    init_tracing(cfg.env());

    let bind = resolve_bind(args.bind, &cfg)?;
    let db_path = resolve_db_path(args.db_path, &cfg)?;
    let external_api = config::external_api_from_config(&cfg)?;
    let page_size_limit = cfg.page_size_limit()?;
    tracing::info!(
        env = cfg.env(),
        bind = %bind,
        db_path = %db_path.display(),
        external_api = %external_api,
        version = crate::VERSION,
        "starting songs-lib-server"
    );
    tracing::debug!("debug messages are enabled");

    let store = SongDb::new(&db_path)?;
    tracing::info!(schema_version = store.schema_version(), "song db ready");
    let details = SongDetailsClient::new(&external_api, cfg.timeout());
    let service = SongService::new(Arc::new(store), Arc::new(details));
    let state = web::Data::new(AppState::new(service, page_size_limit));

    let auth = cfg.auth.clone();
    if auth.is_none() {
        tracing::warn!("no [auth] section; mutating routes are unauthenticated");
    }

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(BasicAuth::new(auth.clone()))
            .wrap(RequestLogger)
            .configure(routes)
    })
    .client_request_timeout(cfg.timeout())
    .keep_alive(cfg.idle_timeout())
    .shutdown_timeout(cfg.shutdown_grace_secs())
    .bind(bind)?
    .run()
    .await?;

    tracing::info!("server stopped");
    Ok(())
}

/// Register the API, health and OpenAPI routes.
pub(crate) fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        SwaggerUi::new("/swagger-ui/{_:.*}")
            .url("/api-doc/openapi.json", openapi::ApiDoc::openapi()),
    )
    .service(api::health::health)
    .service(api::save_song)
    .service(api::list_songs)
    .service(api::song_text)
    .service(api::update_song)
    .service(api::delete_song);
}

/// Open the database, apply the schema, and exit.
pub(crate) fn migrate(args: crate::Args) -> Result<()> {
    let cfg = load_config(args.config.as_ref())?;
    init_tracing(cfg.env());
    let db_path = resolve_db_path(args.db_path, &cfg)?;
    let store = SongDb::new(&db_path)?;
    tracing::info!(
        db_path = %db_path.display(),
        schema_version = store.schema_version(),
        "migrations applied"
    );
    Ok(())
}

/// `RUST_LOG` wins; otherwise the level follows the configured env.
fn init_tracing(env: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config::log_filter_for_env(env)));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Return true when the request path should be logged.
fn should_log_path(path: &str) -> bool {
    path != "/health"
}

/// Actix middleware that tags requests with an id and logs them.
struct RequestLogger;

impl<S, B> actix_web::dev::Transform<S, ServiceRequest> for RequestLogger
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = RequestLoggerMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(RequestLoggerMiddleware { service })
    }
}

struct RequestLoggerMiddleware<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for RequestLoggerMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, ctx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let request_id = uuid::Uuid::new_v4().to_string();
        req.extensions_mut().insert(RequestId(request_id.clone()));

        let path = req.path().to_string();
        let should_log = should_log_path(&path);
        let method = req.method().clone();
        let peer = req
            .connection_info()
            .realip_remote_addr()
            .unwrap_or("-")
            .to_string();
        let ua = req
            .headers()
            .get("User-Agent")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-")
            .to_string();
        let start = std::time::Instant::now();
        let fut = self.service.call(req);
        Box::pin(async move {
            let mut res = fut.await?;
            if let Ok(value) = HeaderValue::from_str(&request_id) {
                res.headers_mut()
                    .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
            }
            if should_log {
                tracing::info!(
                    request_id = %request_id,
                    method = %method,
                    path = %path,
                    status = %res.status().as_u16(),
                    user_agent = %ua,
                    peer = %peer,
                    elapsed_ms = %start.elapsed().as_millis(),
                    "http request"
                );
            }
            Ok(res)
        })
    }
}

/// Locate the config file: explicit path, then next to the binary, then the
/// working directory.
fn load_config(path: Option<&PathBuf>) -> Result<config::ServerConfig> {
    if let Some(path) = path {
        return config::ServerConfig::load(path);
    }
    let exe_dir_config = std::env::current_exe()
        .ok()
        .and_then(|path| path.parent().map(|dir| dir.join("config.toml")));
    let candidates = exe_dir_config
        .into_iter()
        .chain(std::iter::once(PathBuf::from("config.toml")));
    for candidate in candidates {
        if candidate.exists() {
            return config::ServerConfig::load(&candidate);
        }
    }
    Err(anyhow::anyhow!(
        "config file is required; use --config or place config.toml next to the binary"
    ))
}

/// Resolve the final bind address from args + config.
fn resolve_bind(bind: Option<SocketAddr>, cfg: &config::ServerConfig) -> Result<SocketAddr> {
    match bind {
        Some(addr) => Ok(addr),
        None => config::bind_from_config(cfg),
    }
}

/// Resolve the database path from args + config.
fn resolve_db_path(path: Option<PathBuf>, cfg: &config::ServerConfig) -> Result<PathBuf> {
    match path {
        Some(path) => Ok(path),
        None => config::db_path_from_config(cfg),
    }
}
