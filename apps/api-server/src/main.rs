//! api-server: mock collection endpoint for the WorldWise cities app.
//!
//! A generic JSON-file CRUD router: every array in the data file is a
//! collection served at `/{collection}` and `/{collection}/{id}`.
//! - Storage: the JSON data file (default, rewritten on every change) or
//!   in-memory when `STORAGE_PROVIDER=memory`.
//! - Middleware: request ids, request tracing, CORS, and an optional static
//!   directory answered ahead of the API routes.
//!
//! Run:
//! ```bash
//! # pretty logs (default); serves data/cities.json on port 3000
//! cargo run -p api-server
//!
//! # throwaway data, JSON logs
//! STORAGE_PROVIDER=memory LOG_FORMAT=json cargo run -p api-server
//! ```
//!
//! Configuration: See `config.rs` for all environment variables.

mod config;
mod response;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::http::HeaderValue;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use domain::adapters::memory_repo::InMemoryRepo;
use domain::ids::NextIdGenerator;
use domain::service::{CollectionService, ListQuery};
use domain::validate::validate_collection;
use domain::{CollectionName, CollectionRepository, CoreError, Record, RecordId};
use serde_json::{Map, Value};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::response::{core_error_response, json_error_with_message};

/// Collection exposed read-only at `/api/cities`.
const CITIES: &str = "cities";

// Local repo abstraction supporting memory or a JSON file (feature-gated).
enum RepoKind {
    Memory(InMemoryRepo),
    #[cfg(feature = "json-file")]
    JsonFile(json_file_adapter::JsonFileRepo),
}

#[derive(Clone)]
struct AnyRepo {
    kind: Arc<RepoKind>,
}

impl AnyRepo {
    /// In-memory store holding one empty collection.
    fn memory(collection: &str) -> Result<Self, CoreError> {
        let repo = InMemoryRepo::new();
        repo.seed(CollectionName::new(collection)?, Vec::new())?;
        Ok(Self {
            kind: Arc::new(RepoKind::Memory(repo)),
        })
    }

    #[cfg(feature = "json-file")]
    fn json_file(path: &std::path::Path) -> Result<Self, CoreError> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|e| {
                CoreError::Repository(format!("io: creating {}: {}", dir.display(), e))
            })?;
        }
        Ok(Self {
            kind: Arc::new(RepoKind::JsonFile(json_file_adapter::JsonFileRepo::open(
                path,
            )?)),
        })
    }

    fn inner(&self) -> &dyn CollectionRepository {
        match &*self.kind {
            RepoKind::Memory(r) => r,
            #[cfg(feature = "json-file")]
            RepoKind::JsonFile(r) => r,
        }
    }
}

impl CollectionRepository for AnyRepo {
    fn collections(&self) -> Result<Vec<CollectionName>, CoreError> {
        self.inner().collections()
    }

    fn list(&self, collection: &CollectionName) -> Result<Vec<Record>, CoreError> {
        self.inner().list(collection)
    }

    fn get(
        &self,
        collection: &CollectionName,
        id: &RecordId,
    ) -> Result<Option<Record>, CoreError> {
        self.inner().get(collection, id)
    }

    fn insert(&self, collection: &CollectionName, record: Record) -> Result<(), CoreError> {
        self.inner().insert(collection, record)
    }

    fn replace(
        &self,
        collection: &CollectionName,
        id: &RecordId,
        record: Record,
    ) -> Result<(), CoreError> {
        self.inner().replace(collection, id, record)
    }

    fn delete(&self, collection: &CollectionName, id: &RecordId) -> Result<(), CoreError> {
        self.inner().delete(collection, id)
    }
}

type Service = CollectionService<AnyRepo, NextIdGenerator>;

#[derive(Clone)]
struct AppState {
    svc: Arc<Service>,
    /// Served verbatim by `/api/cities`, whatever the storage backend.
    data_file: Arc<PathBuf>,
}

impl AppState {
    fn new(repo: AnyRepo, data_file: PathBuf) -> Self {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or_default();
        Self {
            svc: Arc::new(CollectionService::new(repo, NextIdGenerator::new(7, seed))),
            data_file: Arc::new(data_file),
        }
    }
}

#[tokio::main]
async fn main() {
    // Load and validate config first (fail fast on misconfiguration)
    let cfg = match config::Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    init_tracing(&cfg);
    cfg.warn_if_ephemeral();

    let repo = match build_repo(&cfg) {
        Ok(r) => r,
        Err(e) => {
            error!(err = %e, path = %cfg.data_file.display(), "failed to open storage");
            std::process::exit(1);
        }
    };
    let app = build_app(AppState::new(repo, cfg.data_file.clone()), &cfg);

    let addr: SocketAddr = ([0, 0, 0, 0], cfg.port).into();
    info!(%addr, "api-server listening");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("bind port");
    axum::serve(listener, app).await.expect("server error");
}

fn init_tracing(cfg: &config::Config) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);
    match cfg.log_format {
        config::LogFormat::Json => {
            registry
                .with(
                    fmt::layer()
                        .json()
                        .with_target(true)
                        .with_timer(fmt::time::SystemTime)
                        .with_writer(std::io::stdout),
                )
                .init();
        }
        config::LogFormat::Pretty => {
            registry
                .with(
                    fmt::layer()
                        .pretty()
                        .with_target(true)
                        .with_writer(std::io::stdout),
                )
                .init();
        }
    }
}

// Construct a repository instance based on config and feature flags.
fn build_repo(cfg: &config::Config) -> Result<AnyRepo, CoreError> {
    match cfg.storage_provider {
        #[cfg(feature = "json-file")]
        config::StorageProvider::JsonFile => AnyRepo::json_file(&cfg.data_file),
        _ => AnyRepo::memory(CITIES),
    }
}

/// Collection routes without middleware.
fn api_router(state: AppState) -> Router {
    Router::new()
        .route("/db", get(get_db))
        .route("/api/cities", get(get_cities_file))
        .route("/:collection", get(list_records).post(create_record))
        .route(
            "/:collection/:id",
            get(get_record).put(replace_record).delete(delete_record),
        )
        .with_state(state)
}

/// Full application: static stub (if configured) ahead of the API, wrapped in
/// request-id, tracing and CORS layers.
fn build_app(state: AppState, cfg: &config::Config) -> Router {
    let api = api_router(state);
    let app = match &cfg.static_dir {
        Some(dir) => Router::new().fallback_service(
            ServeDir::new(dir)
                .call_fallback_on_method_not_allowed(true)
                .fallback(api),
        ),
        None => api,
    };

    // Request ID header name
    let x_request_id = axum::http::HeaderName::from_static("x-request-id");

    let cors = if cfg.cors_allow_origin == HeaderValue::from_static("*") {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
            .allow_origin(AllowOrigin::list([cfg.cors_allow_origin.clone()]))
            .allow_methods([
                axum::http::Method::GET,
                axum::http::Method::POST,
                axum::http::Method::PUT,
                axum::http::Method::DELETE,
                axum::http::Method::OPTIONS,
            ])
            .allow_headers([axum::http::header::CONTENT_TYPE])
    };

    app.layer(PropagateRequestIdLayer::new(x_request_id.clone()))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("-");
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                )
            }),
        )
        .layer(SetRequestIdLayer::new(x_request_id, MakeRequestUuid))
        .layer(cors)
}

/// Split query-string pairs into field filters and `_limit`. Other
/// underscore-prefixed keys are reserved and ignored.
fn list_query(params: Vec<(String, String)>) -> Result<ListQuery, Response> {
    let mut query = ListQuery::default();
    for (key, value) in params {
        if key == "_limit" {
            let limit = value.parse::<usize>().map_err(|_| {
                (
                    StatusCode::BAD_REQUEST,
                    Json(json_error_with_message(
                        "invalid_request",
                        "_limit must be a non-negative integer",
                    )),
                )
                    .into_response()
            })?;
            query.limit = Some(limit);
        } else if !key.starts_with('_') {
            query.filters.push((key, value));
        }
    }
    Ok(query)
}

fn parse_target(collection: &str, id: &str) -> Result<(CollectionName, RecordId), CoreError> {
    Ok((validate_collection(collection)?, RecordId::parse(id)?))
}

async fn list_records(
    State(state): State<AppState>,
    Path(collection): Path<String>,
    Query(params): Query<Vec<(String, String)>>,
) -> Response {
    let query = match list_query(params) {
        Ok(q) => q,
        Err(resp) => return resp,
    };
    let result = validate_collection(&collection).and_then(|c| state.svc.list(&c, &query));
    match result {
        Ok(items) => {
            info!(collection = %collection, count = items.len(), "list ok");
            (StatusCode::OK, Json(items)).into_response()
        }
        Err(e) => core_error_response(e),
    }
}

async fn create_record(
    State(state): State<AppState>,
    Path(collection): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let result = validate_collection(&collection).and_then(|c| state.svc.create(&c, body));
    match result {
        Ok(record) => {
            let id = RecordId::of(&record).map(|id| id.to_string()).unwrap_or_default();
            info!(collection = %collection, id = %id, "create ok");
            (StatusCode::CREATED, Json(record)).into_response()
        }
        Err(e) => core_error_response(e),
    }
}

async fn get_record(
    State(state): State<AppState>,
    Path((collection, id)): Path<(String, String)>,
) -> Response {
    let result = parse_target(&collection, &id).and_then(|(c, id)| state.svc.get(&c, &id));
    match result {
        Ok(record) => (StatusCode::OK, Json(record)).into_response(),
        Err(e) => core_error_response(e),
    }
}

async fn replace_record(
    State(state): State<AppState>,
    Path((collection, id)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Response {
    let result =
        parse_target(&collection, &id).and_then(|(c, rid)| state.svc.replace(&c, &rid, body));
    match result {
        Ok(record) => {
            info!(collection = %collection, id = %id, "replace ok");
            (StatusCode::OK, Json(record)).into_response()
        }
        Err(e) => core_error_response(e),
    }
}

async fn delete_record(
    State(state): State<AppState>,
    Path((collection, id)): Path<(String, String)>,
) -> Response {
    let result = parse_target(&collection, &id).and_then(|(c, rid)| state.svc.delete(&c, &rid));
    match result {
        Ok(()) => {
            info!(collection = %collection, id = %id, "delete ok");
            (StatusCode::OK, Json(Value::Object(Map::new()))).into_response()
        }
        Err(e) => core_error_response(e),
    }
}

/// Every collection keyed by name.
async fn get_db(State(state): State<AppState>) -> Response {
    let repo = state.svc.repo();
    let result = repo.collections().and_then(|names| {
        names
            .into_iter()
            .map(|name| {
                let items = repo.list(&name)?;
                Ok((
                    name.as_str().to_string(),
                    Value::Array(items.into_iter().map(Value::Object).collect()),
                ))
            })
            .collect::<Result<Map<String, Value>, CoreError>>()
    });
    match result {
        Ok(db) => (StatusCode::OK, Json(Value::Object(db))).into_response(),
        Err(e) => core_error_response(e),
    }
}

/// The data file exactly as it is on disk.
async fn get_cities_file(State(state): State<AppState>) -> Response {
    match read_data_file(&state.data_file).await {
        Ok(doc) => (StatusCode::OK, Json(doc)).into_response(),
        Err(e) => {
            error!(err = %e, path = %state.data_file.display(), "Error reading cities data");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": "Failed to read cities data"})),
            )
                .into_response()
        }
    }
}

async fn read_data_file(path: &std::path::Path) -> Result<Value, String> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| format!("io: {}", e))?;
    serde_json::from_str(&text).map_err(|e| format!("json: {}", e))
}
