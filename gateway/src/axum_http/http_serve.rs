use crate::{
    axum_http::{default_routers, guards, routers},
    config::config_model::DotEnvyConfig,
    usecases::pixeldrain::PixeldrainUseCase,
};
use anyhow::{Context, Result};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{
        HeaderValue, Method,
        header::{AUTHORIZATION, CONTENT_TYPE},
        request::Parts,
    },
    middleware,
    routing::get,
};
use crates::domain::repositories::file_host::FileHostClient;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};
use url::Url;

pub fn app<C>(config: Arc<DotEnvyConfig>, usecase: Arc<PixeldrainUseCase<C>>) -> Result<Router>
where
    C: FileHostClient + Send + Sync + 'static,
{
    let access = Arc::new(config.access.clone());
    let body_limit = config
        .gateway_server
        .body_limit_bytes()
        .context("GATEWAY_BODY_LIMIT_MB is too large for this platform")?;
    let deadline = Duration::from_secs(config.gateway_server.timeout);

    let pixeldrain = routers::pixeldrain::routes(usecase).route_layer(
        middleware::from_fn_with_state(Arc::clone(&access), guards::bearer_token),
    );

    let app = Router::new()
        .fallback(default_routers::not_found)
        .nest("/pixeldrain", pixeldrain)
        .route("/health-check", get(default_routers::health_check))
        .layer(middleware::from_fn_with_state(access, guards::local_caller))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(middleware::from_fn_with_state(deadline, guards::request_deadline))
        .layer(
            CorsLayer::new()
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers([AUTHORIZATION, CONTENT_TYPE])
                .allow_origin(AllowOrigin::predicate(is_local_origin)),
        )
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid));

    Ok(app)
}

pub async fn start<C>(config: Arc<DotEnvyConfig>, usecase: Arc<PixeldrainUseCase<C>>) -> Result<()>
where
    C: FileHostClient + Send + Sync + 'static,
{
    let app = app(Arc::clone(&config), usecase)?;

    let addr = SocketAddr::new(config.gateway_server.host, config.gateway_server.port);
    if !addr.ip().is_loopback() {
        warn!(%addr, allow_remote = config.access.allow_remote, "Gateway is bound to a non-loopback address");
    }

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    info!("Gateway is running on {}", addr);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}

/// Browser pages on localhost and `file://` pages (origin `null`) of the
/// desktop shell.
fn is_local_origin(origin: &HeaderValue, _request: &Parts) -> bool {
    let Ok(origin) = origin.to_str() else {
        return false;
    };
    if origin == "null" {
        return true;
    }

    Url::parse(origin)
        .ok()
        .and_then(|url| url.host_str().map(str::to_string))
        .is_some_and(|host| matches!(host.as_str(), "localhost" | "127.0.0.1" | "[::1]"))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "Failed to install CTRL+C signal handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "Failed to install SIGTERM signal handler");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received ctrl+C signal"),
        _ = terminate => info!("Received terminate signal"),
    }
}
