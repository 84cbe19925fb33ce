//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (tracing, security headers, timeout, body limit,
//!   admission, access control)
//! - Run the rate bucket eviction task alongside the server
//! - Serve until shutdown, then drain within the grace period

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::{limit::RequestBodyLimitLayer, timeout::TimeoutLayer};

use super::handlers;
use super::request::trace_requests;
use crate::auth::{AuthService, CredentialCodec, TokenIssuer};
use crate::config::GatekeeperConfig;
use crate::lifecycle::{shutdown::drain, LifecycleError, Shutdown, ShutdownOutcome};
use crate::security::{
    access_control_middleware, rate_limit_middleware, AdmissionController,
    ClientIdentityResolver, SecurityHeadersLayer,
};
use crate::storage::UserStore;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub auth: AuthService,
    pub health_probe_secs: u64,
}

/// The gatekeeper HTTP server.
pub struct HttpServer {
    router: Router,
    config: GatekeeperConfig,
    admission: Arc<AdmissionController>,
}

impl HttpServer {
    /// Create a new HTTP server over `store`.
    pub fn new(config: GatekeeperConfig, store: Arc<dyn UserStore>) -> Result<Self, LifecycleError> {
        let codec = CredentialCodec::new(&config.auth.password_hash)
            .map_err(|e| LifecycleError::Init(e.to_string()))?;
        let issuer = Arc::new(TokenIssuer::new(
            config.auth.jwt_secret.as_bytes(),
            config.auth.token_ttl(),
        ));
        let admission = Arc::new(AdmissionController::new(&config.rate_limit));

        let state = AppState {
            auth: AuthService::new(store, issuer.clone(), codec),
            health_probe_secs: config.timeouts.health_probe_secs,
        };

        let router = Self::build_router(&config, state, issuer, admission.clone());
        Ok(Self {
            router,
            config,
            admission,
        })
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// Outermost first: tracing, security headers, timeout, body limit,
    /// admission. Access control wraps only the protected routes.
    #[allow(deprecated)]
    fn build_router(
        config: &GatekeeperConfig,
        state: AppState,
        issuer: Arc<TokenIssuer>,
        admission: Arc<AdmissionController>,
    ) -> Router {
        let protected = Router::new()
            .route("/auth/me", get(handlers::me))
            .route_layer(from_fn_with_state(issuer, access_control_middleware));

        let mut router = Router::new()
            .route("/auth/register", post(handlers::register))
            .route("/auth/login", post(handlers::login))
            .route("/healthz", get(handlers::health))
            .route("/ready", get(handlers::health))
            .merge(protected)
            .with_state(state);

        if config.rate_limit.enabled {
            router = router.layer(from_fn_with_state(admission, rate_limit_middleware));
        }

        let resolver = Arc::new(ClientIdentityResolver::new(&config.rate_limit.trusted_proxies));
        router
            .layer(RequestBodyLimitLayer::new(config.listener.max_body_bytes))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(SecurityHeadersLayer::new(config.is_production()))
            .layer(from_fn_with_state(resolver, trace_requests))
    }

    /// Serve on `listener` until `shutdown` fires, then drain.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: Shutdown,
    ) -> Result<ShutdownOutcome, LifecycleError> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            environment = ?self.config.environment,
            "HTTP server starting"
        );

        let mut signal = shutdown.subscribe();
        let mut stop_accepting = shutdown.subscribe();
        let eviction = self
            .config
            .rate_limit
            .enabled
            .then(|| tokio::spawn(self.admission.clone().run_eviction(shutdown.subscribe())));

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        let mut server = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { stop_accepting.recv().await })
                .await
        });

        let exited_early = tokio::select! {
            joined = &mut server => Some(joined),
            () = signal.recv() => None,
        };

        let outcome = match exited_early {
            Some(joined) => {
                tracing::error!("HTTP server exited without a shutdown signal");
                shutdown.trigger();
                match joined {
                    Ok(result) => result.map(|()| ShutdownOutcome::Drained).map_err(LifecycleError::from),
                    Err(e) => Err(LifecycleError::Serve(std::io::Error::other(e))),
                }
            }
            None => {
                let grace = self.config.shutdown.grace_period();
                tracing::info!(
                    grace_secs = grace.as_secs(),
                    "Stopped accepting connections, draining in-flight requests"
                );
                drain(server, grace).await
            }
        };

        if let Some(eviction) = eviction {
            let _ = eviction.await;
        }
        tracing::info!(outcome = ?outcome.as_ref().ok(), "HTTP server stopped");
        outcome
    }
}
