use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{error_handling::HandleErrorLayer, middleware, Router};
use tokio::signal;
use tower::{timeout::TimeoutLayer, ServiceBuilder};
use tower_http::catch_panic::CatchPanicLayer;
use tracing::info;

use crate::{
    config::ConfigError,
    middleware::{
        access_log::access_log_layer, basic_auth::require_basic_auth, bearer::require_bearer,
        cors::cors_layer, recover::panic_response, request_id::assign_request_id,
        timeout::handle_timeout,
    },
    routes::{health, ops},
    state::AppState,
    users::handlers::{token_routes, user_routes},
};

/// Builds the full router. Layers, outermost first: request id, access log
/// (optional), panic recovery, timeout. CORS covers `/api` only; bearer
/// auth covers the user routes; basic auth covers the operator routes.
pub fn build_app(state: AppState) -> Result<Router, ConfigError> {
    let cfg = state.config.clone();

    let protected = user_routes().route_layer(middleware::from_fn_with_state(
        state.tokens.clone(),
        require_bearer,
    ));
    let api = Router::new()
        .nest("/v1", token_routes().merge(protected))
        .layer(cors_layer(&cfg.cors)?);

    let mut operator = ops::doc_routes();
    if cfg.debug_routes {
        operator = operator.merge(ops::debug_routes());
    }
    let operator = operator.route_layer(middleware::from_fn_with_state(
        Arc::new(cfg.basic_auth.clone()),
        require_basic_auth,
    ));

    let mut app = Router::new()
        .merge(health::router::<AppState>())
        .nest("/api", api)
        .merge(operator)
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_timeout))
                .layer(TimeoutLayer::new(Duration::from_secs(cfg.request_timeout_secs))),
        )
        .layer(CatchPanicLayer::custom(panic_response));
    if cfg.access_log {
        app = app.layer(access_log_layer());
    }
    Ok(app.layer(middleware::from_fn(assign_request_id)))
}

pub async fn serve(app: Router, host: &str, port: u16) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{host}:{port}").parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "ctrl-c handler failed");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "SIGTERM handler failed");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
