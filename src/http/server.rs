//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with the four forwarding modes
//! - Wire up middleware (request ID, tracing, CORS, request timeout)
//! - Trim trailing slashes before routing
//! - Apply configuration reloads to the shared config
//! - Start the admin listener when enabled
//! - Stop accepting connections on shutdown

use axum::{extract::Request, routing::get, Router, ServiceExt};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower::{Layer, ServiceBuilder};
use tower_http::{
    cors::CorsLayer,
    normalize_path::{NormalizePath, NormalizePathLayer},
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::admin;
use crate::config::{GatewayConfig, SharedConfig};
use crate::http::handlers;
use crate::http::request::MakeGatewayRequestId;
use crate::lifecycle::shutdown::wait_for;
use crate::sequencer::{DelayedFlow, Dispatcher, Downstream, HttpDownstream, Registry};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: SharedConfig,
    pub dispatcher: Arc<Dispatcher>,
    pub delayed: Arc<DelayedFlow>,
    pub downstream: Arc<dyn Downstream>,
}

impl AppState {
    /// State backed by a real HTTP client.
    pub fn new(config: GatewayConfig) -> Self {
        let downstream: Arc<dyn Downstream> = Arc::new(HttpDownstream::new(&config.downstream));
        Self::with_downstream(config, downstream)
    }

    pub fn with_downstream(config: GatewayConfig, downstream: Arc<dyn Downstream>) -> Self {
        let config = crate::config::shared(config);
        let registry = Registry::new(downstream.clone(), config.clone());
        Self {
            dispatcher: Arc::new(Dispatcher::new(registry, config.clone())),
            delayed: Arc::new(DelayedFlow::new(downstream.clone(), config.clone())),
            downstream,
            config,
        }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        self.dispatcher.registry()
    }
}

/// HTTP server for the gateway.
pub struct HttpServer {
    app: NormalizePath<Router>,
    state: AppState,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: GatewayConfig) -> Self {
        Self::with_state(AppState::new(config))
    }

    pub fn with_state(state: AppState) -> Self {
        // Applied outside the router so the rewrite happens before matching.
        let app = NormalizePathLayer::trim_trailing_slash().layer(Self::build_router(&state));
        Self { app, state }
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// The request timeout is read once here; changing it needs a restart.
    #[allow(deprecated)]
    fn build_router(state: &AppState) -> Router {
        let request_timeout = Duration::from_secs(state.config.load().timeouts.request_secs);

        Router::new()
            .route("/simple/{*rest}", get(handlers::simple))
            .route("/sequenced/{*rest}", get(handlers::sequenced))
            .route("/metered/{*rest}", get(handlers::metered))
            .route("/delayed/{*rest}", get(handlers::delayed))
            .with_state(state.clone())
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeGatewayRequestId))
                    .layer(PropagateRequestIdLayer::x_request_id())
                    .layer(TraceLayer::new_for_http())
                    .layer(CorsLayer::permissive())
                    .layer(TimeoutLayer::new(request_timeout)),
            )
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Run the server, accepting connections on the given listener until
    /// `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<GatewayConfig>,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let shared = self.state.config.clone();
        tokio::spawn(async move {
            while let Some(new_config) = config_updates.recv().await {
                let old = shared.load();
                if old.listener.bind_address != new_config.listener.bind_address {
                    tracing::warn!(
                        old = %old.listener.bind_address,
                        new = %new_config.listener.bind_address,
                        "Listener address change requires a restart"
                    );
                }
                if old.admin != new_config.admin {
                    tracing::warn!("Admin listener changes require a restart");
                }
                shared.store(Arc::new(new_config));
                tracing::info!("Configuration reloaded");
            }
        });

        let admin_config = self.state.config.load().admin.clone();
        if admin_config.enabled {
            let admin_listener = TcpListener::bind(&admin_config.bind_address).await?;
            tracing::info!(address = %admin_config.bind_address, "Admin API starting");
            let app = admin::router(self.state.clone());
            let admin_shutdown = shutdown.resubscribe();
            tokio::spawn(async move {
                if let Err(e) = axum::serve(admin_listener, app)
                    .with_graceful_shutdown(wait_for(admin_shutdown))
                    .await
                {
                    tracing::error!(error = %e, "Admin API failed");
                }
            });
        }

        axum::serve(listener, ServiceExt::<Request>::into_make_service(self.app))
            .with_graceful_shutdown(wait_for(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
