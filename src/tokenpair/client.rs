//! Who is calling: user agent and client IP.

use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{header::USER_AGENT, request::Parts, HeaderMap},
};
use std::convert::Infallible;
use std::net::SocketAddr;

/// Recorded in place of an address when none can be determined.
pub const UNKNOWN_IP: &str = "unknown";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientContext {
    pub user_agent: String,
    pub ip: String,
}

impl<S> FromRequestParts<S> for ClientContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string());

        Ok(Self {
            user_agent: user_agent(&parts.headers),
            ip: client_ip(&parts.headers)
                .or(peer)
                .unwrap_or_else(|| UNKNOWN_IP.to_string()),
        })
    }
}

fn user_agent(headers: &HeaderMap) -> String {
    headers
        .get(USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// First `X-Forwarded-For` entry, else `X-Real-IP`.
pub(crate) fn client_ip(headers: &HeaderMap) -> Option<String> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty());
    if forwarded.is_some() {
        return forwarded.map(str::to_string);
    }
    headers
        .get("x-real-ip")
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, Request};

    async fn extract(request: Request<()>) -> ClientContext {
        let (mut parts, ()) = request.into_parts();
        match ClientContext::from_request_parts(&mut parts, &()).await {
            Ok(context) => context,
            Err(never) => match never {},
        }
    }

    #[test]
    fn forwarded_for_takes_first_entry() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static(" 203.0.113.7 , 10.0.0.1"),
        );
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.2"));
        assert_eq!(client_ip(&headers), Some("203.0.113.7".to_string()));
    }

    #[test]
    fn real_ip_is_used_without_forwarded_for() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static(""));
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.2"));
        assert_eq!(client_ip(&headers), Some("10.0.0.2".to_string()));
    }

    #[test]
    fn no_proxy_headers() {
        assert_eq!(client_ip(&HeaderMap::new()), None);
    }

    #[tokio::test]
    async fn falls_back_to_peer_address() -> Result<(), axum::http::Error> {
        let mut request = Request::builder()
            .header(USER_AGENT, "UA1")
            .body(())?;
        let peer: SocketAddr = ([192, 0, 2, 10], 4711).into();
        request.extensions_mut().insert(ConnectInfo(peer));

        let context = extract(request).await;
        assert_eq!(context.user_agent, "UA1");
        assert_eq!(context.ip, "192.0.2.10");
        Ok(())
    }

    #[tokio::test]
    async fn headers_win_over_peer_address() -> Result<(), axum::http::Error> {
        let mut request = Request::builder()
            .header("x-real-ip", "198.51.100.4")
            .body(())?;
        let peer: SocketAddr = ([192, 0, 2, 10], 4711).into();
        request.extensions_mut().insert(ConnectInfo(peer));

        let context = extract(request).await;
        assert_eq!(context.ip, "198.51.100.4");
        assert_eq!(context.user_agent, "");
        Ok(())
    }

    #[tokio::test]
    async fn unknown_without_any_source() -> Result<(), axum::http::Error> {
        let context = extract(Request::builder().body(())?).await;
        assert_eq!(context.ip, UNKNOWN_IP);
        Ok(())
    }
}
