use actix_cors::Cors;
use actix_web::{error, http::StatusCode, middleware, web, App, HttpResponse, HttpServer};
use roomie_match::config::{Settings, StoreBackend};
use roomie_match::routes::{self, AppState};
use roomie_match::services::{
    AppwriteClient, AppwriteCollections, CacheManager, DocumentSource, LocalJsonStore,
    MemoryNotifiedStore, NotifiedStore, PoolLoader, PostgresClient,
};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// JSON error response for JSON payload errors
#[derive(Debug, serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

impl std::fmt::Display for JsonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

impl std::error::Error for JsonError {}

impl error::ResponseError for JsonError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::BAD_REQUEST))
            .json(self)
    }
}

/// Handle JSON payload errors
pub fn handle_json_payload_error(err: error::JsonPayloadError, req: &actix_web::HttpRequest) -> actix_web::Error {
    tracing::info!("JSON payload error on {}: {}", req.path(), err);
    JsonError {
        error: "invalid_json".to_string(),
        message: format!("Invalid JSON: {}", err),
        status_code: 400,
    }
    .into()
}

/// Handle query payload errors
pub fn handle_query_payload_error(err: error::QueryPayloadError, _req: &actix_web::HttpRequest) -> actix_web::Error {
    JsonError {
        error: "invalid_query".to_string(),
        message: format!("Invalid query: {}", err),
        status_code: 400,
    }
    .into()
}

fn init_tracing(level: &str, format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    if format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.json().init();
    }
}

fn build_source(settings: &Settings) -> std::io::Result<DocumentSource> {
    match settings.store.backend {
        StoreBackend::Local => {
            info!("Using local JSON store at {}", settings.store.data_dir);
            Ok(DocumentSource::Local(LocalJsonStore::new(&settings.store.data_dir)))
        }
        StoreBackend::Appwrite => {
            let Some(appwrite) = settings.appwrite.clone() else {
                error!("store.backend is appwrite but the [appwrite] section is missing");
                return Err(std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "Appwrite settings required",
                ));
            };

            let collections = AppwriteCollections {
                profiles: appwrite.profiles_collection,
                listings: appwrite.listings_collection,
            };
            let client = AppwriteClient::new(
                appwrite.endpoint,
                appwrite.api_key,
                appwrite.project_id,
                appwrite.database_id,
                collections,
            )
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;

            info!("Appwrite client initialized");
            Ok(DocumentSource::Appwrite(client))
        }
    }
}

async fn build_notified_store(settings: &Settings) -> NotifiedStore {
    let Some(url) = settings.database.url.as_deref() else {
        warn!("No database configured, notified matches are kept in memory");
        return NotifiedStore::Memory(MemoryNotifiedStore::new());
    };

    let db = &settings.database;
    let client = PostgresClient::from_settings(
        url,
        db.max_connections,
        db.min_connections,
        db.acquire_timeout_secs,
        db.idle_timeout_secs,
    )
    .await
    .unwrap_or_else(|e| {
        error!("Failed to connect to PostgreSQL: {}", e);
        panic!("PostgreSQL connection error: {}", e);
    });

    info!("PostgreSQL client initialized");
    NotifiedStore::Postgres(client)
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    let settings = Settings::load().unwrap_or_else(|e| panic!("Configuration error: {}", e));

    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| settings.logging.format.clone());
    init_tracing(&settings.logging.level, &log_format);

    info!("Starting roomie matching service...");

    let source = build_source(&settings)?;

    // Pool cache (Redis optional)
    let cache_ttl = settings.cache.ttl_secs.unwrap_or(300);
    let l1_cache_size = settings.cache.l1_cache_size.unwrap_or(1000);
    let cache = CacheManager::connect_or_local(
        settings.cache.redis_url.as_deref(),
        l1_cache_size,
        cache_ttl,
    )
    .await;

    info!("Cache manager initialized (L1: {} entries, TTL: {}s)", l1_cache_size, cache_ttl);

    let notified = build_notified_store(&settings).await;
    for (scope, config) in &settings.watcher_scopes {
        if let Err(e) = notified.store_watcher_config(scope, config).await {
            warn!("Failed to seed watcher config for scope {}: {}", scope, e);
        }
    }
    if !settings.watcher_scopes.is_empty() {
        info!("Seeded {} per-scope watcher configs", settings.watcher_scopes.len());
    }

    let matcher = settings.matching.matcher();
    let default_mode = settings.matching.retrieval_mode();

    info!(
        "Matcher initialized (mode: {}, weights: {:?})",
        default_mode,
        matcher.match_config().weights
    );

    let app_state = AppState {
        pools: Arc::new(PoolLoader::new(source, cache)),
        notified: Arc::new(notified),
        matcher,
        default_mode,
        watcher: settings.watcher.clone(),
    };

    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
            .app_data(web::QueryConfig::default().error_handler(handle_query_payload_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}
