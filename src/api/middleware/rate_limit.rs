//! Rate limiting middleware backed by the application limiters.

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, FromRequestParts, Request, State},
    http::{HeaderMap, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::debug;

use crate::state::AppState;

/// Body of every `429 Too Many Requests` response.
pub const REJECTED_MESSAGE: &str = "Request rejected by rate limiter";

/// Identity used when neither a proxy header nor a peer address is known.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Debits one token from the global bucket per request.
///
/// # Example
///
/// ```rust,ignore
/// let app = Router::new()
///     .route("/health", get(health_handler))
///     .layer(middleware::from_fn_with_state(state.clone(), rate_limit::global));
/// ```
pub async fn global(State(st): State<AppState>, req: Request, next: Next) -> Response {
    if !st.global_limiter.allow(1) {
        debug!(path = %req.uri().path(), "Global rate limit exceeded");
        return rejected();
    }

    next.run(req).await
}

/// Applies the sliding-window limit to the calling client.
///
/// The client is identified by [`client_identity`].
pub async fn per_client(State(st): State<AppState>, req: Request, next: Next) -> Response {
    let (mut parts, body) = req.into_parts();

    let peer = ConnectInfo::<SocketAddr>::from_request_parts(&mut parts, &())
        .await
        .ok()
        .map(|ConnectInfo(addr)| addr);
    let client = client_identity(&parts.headers, peer, st.config.behind_proxy);

    if !st.client_limiter.allow(&client) {
        debug!(%client, "Client rate limit exceeded");
        return rejected();
    }

    next.run(Request::from_parts(parts, body)).await
}

/// Resolves the key a request is rate limited under.
///
/// When `behind_proxy` is set, the first `X-Forwarded-For` entry wins, then
/// `X-Real-IP`. Otherwise, or when neither header is usable, the peer IP is
/// used. Proxy headers are ignored unless `behind_proxy` is set since any
/// client can forge them.
pub fn client_identity(
    headers: &HeaderMap,
    peer: Option<SocketAddr>,
    behind_proxy: bool,
) -> String {
    if behind_proxy {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());
        let real_ip = || {
            headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        };

        if let Some(ip) = forwarded.or_else(real_ip) {
            return ip.to_string();
        }
    }

    peer.map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

fn rejected() -> Response {
    (
        StatusCode::TOO_MANY_REQUESTS,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        REJECTED_MESSAGE,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn peer() -> Option<SocketAddr> {
        Some("192.0.2.7:51234".parse().unwrap())
    }

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn test_peer_ip_without_proxy() {
        let headers = headers(&[("x-forwarded-for", "203.0.113.9")]);
        assert_eq!(client_identity(&headers, peer(), false), "192.0.2.7");
    }

    #[test]
    fn test_first_forwarded_entry_behind_proxy() {
        let headers = headers(&[
            ("x-forwarded-for", " 203.0.113.9 , 10.0.0.1"),
            ("x-real-ip", "198.51.100.3"),
        ]);
        assert_eq!(client_identity(&headers, peer(), true), "203.0.113.9");
    }

    #[test]
    fn test_real_ip_fallback_behind_proxy() {
        let headers = headers(&[("x-real-ip", "198.51.100.3")]);
        assert_eq!(client_identity(&headers, peer(), true), "198.51.100.3");
    }

    #[test]
    fn test_peer_fallback_behind_proxy() {
        let headers = headers(&[("x-forwarded-for", "")]);
        assert_eq!(client_identity(&headers, peer(), true), "192.0.2.7");
    }

    #[test]
    fn test_unknown_client() {
        assert_eq!(client_identity(&HeaderMap::new(), None, false), UNKNOWN_CLIENT);
    }

    #[tokio::test]
    async fn test_rejected_response() {
        let response = rejected();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; charset=utf-8"
        );
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], REJECTED_MESSAGE.as_bytes());
    }
}
