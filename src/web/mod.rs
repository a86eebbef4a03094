mod error;
mod routes;

pub use routes::{coerce_int, router};

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::http::{HeaderValue, Method};
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::Config;
use crate::db::Database;
use crate::feed::{FeedService, FeedSettings};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub feed: FeedService,
    pub config: Arc<Config>,
}

impl AppState {
    /// State backed by the SQLite database.
    #[must_use]
    pub fn new(config: Config, db: Database) -> Self {
        let feed = FeedService::new(Arc::new(db), FeedSettings::from_config(&config));
        Self {
            feed,
            config: Arc::new(config),
        }
    }
}

/// Run the web server until `shutdown` resolves.
///
/// # Errors
///
/// Returns an error if the address is invalid, the listener cannot be bound,
/// or the server fails.
pub async fn serve<F>(config: Config, db: Database, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr: SocketAddr = format!("{}:{}", config.web_host, config.web_port)
        .parse()
        .context("Invalid web server address")?;

    let app = create_app(AppState::new(config, db));

    info!(addr = %addr, "Starting HTTP web server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind web server")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("Web server error")?;

    info!("Web server stopped");
    Ok(())
}

/// Create the main application router.
pub fn create_app(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_allowed_origins);

    Router::new()
        .merge(routes::router())
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// CORS for the browser client. An empty origin list allows any origin.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new().allow_methods([Method::GET]);

    if origins.is_empty() {
        return base.allow_origin(Any);
    }

    let values: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin: {e}");
                None
            }
        })
        .collect();

    base.allow_origin(AllowOrigin::list(values))
}
