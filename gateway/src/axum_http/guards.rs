use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, header::AUTHORIZATION},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::warn;

use crate::{axum_http::error_responses::GatewayError, config::config_model::Access};

/// Rejects peers that are not on the loopback interface unless remote
/// callers were explicitly allowed.
pub async fn local_caller(
    State(access): State<Arc<Access>>,
    request: Request,
    next: Next,
) -> Response {
    if access.allow_remote {
        return next.run(request).await;
    }

    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    match peer {
        Some(addr) if is_loopback_peer(&addr) => next.run(request).await,
        Some(addr) => {
            warn!(peer = %addr, "local_caller: rejected non-loopback peer");
            GatewayError::Forbidden.into_response()
        }
        None => {
            warn!("local_caller: peer address unavailable");
            GatewayError::Forbidden.into_response()
        }
    }
}

/// Bounds the time until response headers are ready. Streamed bodies are
/// not covered.
pub async fn request_deadline(
    State(limit): State<Duration>,
    request: Request,
    next: Next,
) -> Response {
    tokio::time::timeout(limit, next.run(request))
        .await
        .unwrap_or_else(|_| GatewayError::DeadlineExceeded(limit.as_secs()).into_response())
}

/// Requires `Authorization: Bearer <token>` when a gateway token is configured.
pub async fn bearer_token(
    State(access): State<Arc<Access>>,
    request: Request,
    next: Next,
) -> Response {
    let Some(expected) = access.token.as_deref() else {
        return next.run(request).await;
    };

    if authorize_bearer(request.headers(), expected) {
        next.run(request).await
    } else {
        GatewayError::Unauthorized.into_response()
    }
}

/// Dual-stack listeners report IPv4 peers as `::ffff:a.b.c.d`.
fn is_loopback_peer(addr: &SocketAddr) -> bool {
    addr.ip().to_canonical().is_loopback()
}

fn authorize_bearer(headers: &HeaderMap, expected_token: &str) -> bool {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|auth| auth.strip_prefix("Bearer "))
        .is_some_and(|token| token.trim() == expected_token)
}
