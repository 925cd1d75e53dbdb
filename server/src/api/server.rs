//! API server initialization

use std::net::SocketAddr;

use anyhow::Result;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use super::middleware;
use super::routes::{AppState, auth, health};
use crate::core::CoreApp;
use crate::core::constants::AUTH_BODY_LIMIT;

/// Build the HTTP router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/health", get(health::health))
        .nest(
            "/api/v1/auth",
            auth::routes().layer(DefaultBodyLimit::max(AUTH_BODY_LIMIT)),
        )
        .fallback(middleware::handle_404)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

pub struct ApiServer {
    app: CoreApp,
}

impl ApiServer {
    pub fn new(app: CoreApp) -> Self {
        Self { app }
    }

    /// Returns CoreApp for graceful shutdown
    pub async fn start(self) -> Result<CoreApp> {
        let Self { app } = self;

        let shutdown = app.shutdown.clone();
        let addr = SocketAddr::new(app.config.server.host.parse()?, app.config.server.port);

        let router = router(AppState {
            resolver: app.resolver.clone(),
            users: app.users.clone(),
        });

        let listener = TcpListener::bind(addr).await?;
        tracing::info!(
            %addr,
            trust_mode = %app.resolver.trust_mode(),
            "Gatehouse listening"
        );

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown.wait())
            .await?;

        Ok(app)
    }
}
