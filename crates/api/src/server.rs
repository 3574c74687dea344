use anyhow::Context;
use axum::{
    async_trait,
    extract::{FromRequestParts, Path, Query, State},
    http::{request::Parts, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use endorsement_core::{
    Caller, Endorsement, EndorsementError, EndorsementList, EndorsementService,
    OrgMembershipAccess, Page, PageRequest,
};
use endorsement_storage::Storage;
use serde::{Deserialize, Serialize};
use std::{convert::Infallible, net::SocketAddr, sync::Arc};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};

use crate::config::{Config, PaginationConfig};

/// Header carrying the caller's organization MRN.
pub const HEADER_CALLER_ORG_MRN: &str = "x-caller-org-mrn";
/// Header carrying the caller's own MRN.
pub const HEADER_CALLER_USER_MRN: &str = "x-caller-user-mrn";
/// Header carrying the caller's roles, comma separated.
pub const HEADER_CALLER_ROLES: &str = "x-caller-roles";

#[derive(Clone)]
struct AppState {
    service: EndorsementService,
    storage: Storage,
    pagination: PaginationConfig,
}

async fn build_state(config: &Config) -> anyhow::Result<AppState> {
    let storage = Storage::new(
        &config.database.url,
        Some(config.database.max_connections),
        Some(config.database.min_connections),
    )
    .await?;
    storage
        .run_migrations()
        .await
        .context("Failed to run migrations")?;

    let service = EndorsementService::new(
        Arc::new(storage.clone()),
        Arc::new(OrgMembershipAccess::new(config.access.admin_role.clone())),
    );

    Ok(AppState {
        service,
        storage,
        pagination: config.pagination,
    })
}

fn router_for_state(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/oidc/endorsements", post(create_endorsement))
        .route(
            "/oidc/endorsements/:service_mrn",
            get(get_endorsements_by_service_mrn),
        )
        .route(
            "/oidc/endorsements/:service_mrn/:org_mrn",
            delete(delete_endorsement),
        )
        .route("/oidc/endorsement-list", post(get_endorsement_lists))
        .route(
            "/oidc/endorsements-by/:service_level/:org_mrn",
            get(get_endorsements_by_org_mrn),
        )
        .route(
            "/oidc/endorsement-by/:service_mrn/:org_mrn",
            get(get_endorsement),
        )
        .route(
            "/oidc/endorsed-children/:parent_mrn",
            get(get_endorsed_by_parent_mrn),
        )
        .route(
            "/oidc/endorsed-children/:parent_mrn/:org_mrn",
            get(get_endorsed_by_parent_mrn_and_org_mrn),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Build an in-process API router from explicit config.
///
/// Connects to the database and applies migrations.
pub async fn build_app(config: &Config) -> anyhow::Result<Router> {
    let state = build_state(config).await?;
    Ok(router_for_state(state))
}

/// Create the database and apply migrations, then close the pool.
pub async fn init_database(config: &Config) -> anyhow::Result<()> {
    let state = build_state(config).await?;
    info!("Database ready at {}", config.database.url);
    state.storage.close().await;
    Ok(())
}

/// Run the API server with explicit configuration.
pub async fn run_with_config(config: Config) -> anyhow::Result<()> {
    let state = build_state(&config).await?;
    let storage_for_shutdown = state.storage.clone();
    let app = router_for_state(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| {
            format!(
                "Invalid listen address {}:{}",
                config.server.host, config.server.port
            )
        })?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Endorsement API listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    storage_for_shutdown.close().await;
    info!("Endorsement API shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", err);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                error!("Failed to install SIGTERM handler: {}", err);
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}

/// Caller identity asserted by the authenticating proxy in front of this service.
struct CallerIdentity(Caller);

#[async_trait]
impl<S> FromRequestParts<S> for CallerIdentity
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(CallerIdentity(caller_from_headers(&parts.headers)))
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn caller_from_headers(headers: &HeaderMap) -> Caller {
    let roles = header_value(headers, HEADER_CALLER_ROLES)
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    Caller {
        org_mrn: header_value(headers, HEADER_CALLER_ORG_MRN),
        user_mrn: header_value(headers, HEADER_CALLER_USER_MRN),
        roles,
    }
}

#[derive(Debug, Deserialize)]
struct PageParams {
    page: Option<u32>,
    size: Option<u32>,
}

impl PageParams {
    fn resolve(&self, limits: PaginationConfig) -> PageRequest {
        PageRequest::bounded(
            self.page.unwrap_or(0),
            self.size.unwrap_or(limits.default_size),
            limits.max_size,
        )
    }
}

const ERROR_CODE_INVALID_REQUEST: &str = "invalid_request";
const ERROR_CODE_FORBIDDEN: &str = "forbidden";
const ERROR_CODE_INTERNAL_ERROR: &str = "internal_error";

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorInfo,
}

#[derive(Serialize)]
struct ErrorInfo {
    code: &'static str,
    message: String,
}

fn api_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> (StatusCode, Json<ErrorResponse>) {
    (
        status,
        Json(ErrorResponse {
            error: ErrorInfo {
                code,
                message: message.into(),
            },
        }),
    )
}

fn bad_request(msg: impl Into<String>) -> (StatusCode, Json<ErrorResponse>) {
    api_error(StatusCode::BAD_REQUEST, ERROR_CODE_INVALID_REQUEST, msg)
}

fn forbidden(msg: impl Into<String>) -> (StatusCode, Json<ErrorResponse>) {
    api_error(StatusCode::FORBIDDEN, ERROR_CODE_FORBIDDEN, msg)
}

fn service_unavailable(msg: impl Into<String>) -> (StatusCode, Json<ErrorResponse>) {
    api_error(
        StatusCode::SERVICE_UNAVAILABLE,
        ERROR_CODE_INTERNAL_ERROR,
        msg,
    )
}

fn internal_error<E: std::fmt::Display>(err: E) -> (StatusCode, Json<ErrorResponse>) {
    api_error(
        StatusCode::INTERNAL_SERVER_ERROR,
        ERROR_CODE_INTERNAL_ERROR,
        format!("Internal error: {}", err),
    )
}

/// Map a service outcome onto the HTTP contract. Absence is a bare 404.
fn service_error(err: EndorsementError) -> Response {
    match err {
        EndorsementError::NotFound => StatusCode::NOT_FOUND.into_response(),
        EndorsementError::InvalidInput(msg) => bad_request(msg).into_response(),
        err @ EndorsementError::Forbidden { .. } => forbidden(err.to_string()).into_response(),
        EndorsementError::Store(err) => {
            error!("Store failure: {:#}", err);
            internal_error(format!("{:#}", err)).into_response()
        }
    }
}

async fn health(State(state): State<AppState>) -> Result<&'static str, Response> {
    state
        .storage
        .health_check()
        .await
        .map_err(|e| service_unavailable(format!("{:#}", e)).into_response())?;
    Ok("OK")
}

async fn create_endorsement(
    State(state): State<AppState>,
    CallerIdentity(caller): CallerIdentity,
    Json(input): Json<Endorsement>,
) -> Result<Json<Endorsement>, Response> {
    state
        .service
        .create_or_update(&caller, input)
        .await
        .map(Json)
        .map_err(service_error)
}

async fn get_endorsements_by_service_mrn(
    State(state): State<AppState>,
    Path(service_mrn): Path<String>,
    Query(params): Query<PageParams>,
) -> Result<Json<Page<Endorsement>>, Response> {
    state
        .service
        .list_by_service(&service_mrn, params.resolve(state.pagination))
        .await
        .map(Json)
        .map_err(service_error)
}

async fn get_endorsement_lists(
    State(state): State<AppState>,
    Json(service_mrns): Json<Option<Vec<String>>>,
) -> Result<Json<Vec<EndorsementList>>, Response> {
    state
        .service
        .list_by_services(service_mrns.as_deref())
        .await
        .map(Json)
        .map_err(service_error)
}

async fn get_endorsements_by_org_mrn(
    State(state): State<AppState>,
    Path((service_level, org_mrn)): Path<(String, String)>,
    Query(params): Query<PageParams>,
) -> Result<Json<Page<Endorsement>>, Response> {
    state
        .service
        .list_by_org_and_level(&org_mrn, &service_level, params.resolve(state.pagination))
        .await
        .map(Json)
        .map_err(service_error)
}

async fn delete_endorsement(
    State(state): State<AppState>,
    CallerIdentity(caller): CallerIdentity,
    Path((service_mrn, org_mrn)): Path<(String, String)>,
) -> Result<StatusCode, Response> {
    state
        .service
        .delete(&caller, &org_mrn, &service_mrn)
        .await
        .map_err(service_error)?;
    Ok(StatusCode::OK)
}

async fn get_endorsement(
    State(state): State<AppState>,
    Path((service_mrn, org_mrn)): Path<(String, String)>,
) -> Result<Json<Endorsement>, Response> {
    state
        .service
        .get_by_key(&org_mrn, &service_mrn)
        .await
        .map(Json)
        .map_err(service_error)
}

async fn get_endorsed_by_parent_mrn(
    State(state): State<AppState>,
    Path(parent_mrn): Path<String>,
    Query(params): Query<PageParams>,
) -> Result<Json<Page<Endorsement>>, Response> {
    state
        .service
        .list_by_parent(&parent_mrn, params.resolve(state.pagination))
        .await
        .map(Json)
        .map_err(service_error)
}

async fn get_endorsed_by_parent_mrn_and_org_mrn(
    State(state): State<AppState>,
    Path((parent_mrn, org_mrn)): Path<(String, String)>,
    Query(params): Query<PageParams>,
) -> Result<Json<Page<Endorsement>>, Response> {
    state
        .service
        .list_by_parent_and_org(&parent_mrn, &org_mrn, params.resolve(state.pagination))
        .await
        .map(Json)
        .map_err(service_error)
}
