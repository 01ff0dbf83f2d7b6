//! Request extractors

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;

/// Client address as reported by the transport.
///
/// Resolves to `None` when the server was not built with connect info, so
/// handlers can treat the address as best-effort metadata.
#[derive(Debug, Clone)]
pub struct ClientIp(pub Option<String>);

impl ClientIp {
    pub fn as_deref(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(ClientIp(
            parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;

    #[tokio::test]
    async fn test_resolves_connect_info() {
        let addr: SocketAddr = "203.0.113.9:44000".parse().unwrap();
        let request = Request::builder()
            .extension(ConnectInfo(addr))
            .body(Body::empty())
            .unwrap();
        let (mut parts, _) = request.into_parts();

        let ip = ClientIp::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(ip.as_deref(), Some("203.0.113.9"));
    }

    #[tokio::test]
    async fn test_absent_connect_info_is_none() {
        let request = Request::builder().body(Body::empty()).unwrap();
        let (mut parts, _) = request.into_parts();

        let ip = ClientIp::from_request_parts(&mut parts, &()).await.unwrap();
        assert!(ip.0.is_none());
    }
}
