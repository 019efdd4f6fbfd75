//! Application that forwards requests to an upstream HTTP server.

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{
        uri::{Authority, PathAndQuery, Scheme},
        Request, StatusCode, Uri,
    },
    response::{IntoResponse, Response},
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use url::Url;

use crate::app::inflight::InFlightTracker;
use crate::app::{AppError, Application};
use crate::config::UpstreamConfig;

/// Forwards every delegated request to the configured upstream.
///
/// Without an upstream every request is answered with 404.
pub struct UpstreamApp {
    authority: Option<Authority>,
    client: Client<HttpConnector, Body>,
    inflight: InFlightTracker,
}

impl UpstreamApp {
    pub fn new(config: &UpstreamConfig) -> Result<Self, AppError> {
        let authority = config.url.as_deref().map(parse_authority).transpose()?;
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        match &authority {
            Some(authority) => tracing::info!(upstream = %authority, "Application forwarding to upstream"),
            None => tracing::info!("No upstream configured; unmatched requests return 404"),
        }

        Ok(Self {
            authority,
            client,
            inflight: InFlightTracker::new(),
        })
    }

    /// Number of requests currently being forwarded.
    pub fn in_flight(&self) -> u64 {
        self.inflight.active_count()
    }
}

fn parse_authority(raw: &str) -> Result<Authority, AppError> {
    let url = Url::parse(raw).map_err(|e| AppError::InvalidUpstream(e.to_string()))?;
    let host = url
        .host_str()
        .ok_or_else(|| AppError::InvalidUpstream("missing host".to_string()))?;
    let authority = match url.port_or_known_default() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    };
    authority
        .parse()
        .map_err(|e: axum::http::uri::InvalidUri| AppError::InvalidUpstream(e.to_string()))
}

#[async_trait]
impl Application for UpstreamApp {
    async fn dispatch(&self, request: Request<Body>) -> Response {
        let Some(_guard) = self.inflight.track() else {
            return (StatusCode::SERVICE_UNAVAILABLE, "Service is shutting down").into_response();
        };

        let Some(authority) = self.authority.clone() else {
            return (StatusCode::NOT_FOUND, "Not Found").into_response();
        };

        let (mut parts, body) = request.into_parts();
        let mut uri_parts = parts.uri.clone().into_parts();
        uri_parts.scheme = Some(Scheme::HTTP);
        uri_parts.authority = Some(authority);
        if uri_parts.path_and_query.is_none() {
            uri_parts.path_and_query = Some(PathAndQuery::from_static("/"));
        }
        parts.uri = match Uri::from_parts(uri_parts) {
            Ok(uri) => uri,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to build upstream URI");
                return (StatusCode::BAD_REQUEST, "Bad Request").into_response();
            }
        };

        let method = parts.method.clone();
        let uri = parts.uri.clone();
        match self.client.request(Request::from_parts(parts, body)).await {
            Ok(response) => {
                tracing::debug!(method = %method, uri = %uri, status = %response.status(), "Upstream responded");
                let (parts, body) = response.into_parts();
                Response::from_parts(parts, Body::new(body))
            }
            Err(e) => {
                tracing::error!(method = %method, uri = %uri, error = %e, "Upstream error");
                (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
            }
        }
    }

    async fn teardown(&self) -> Result<(), AppError> {
        let pending = self.inflight.active_count();
        if pending > 0 {
            tracing::info!(pending, "Waiting for in-flight upstream requests");
        }
        self.inflight.drain().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[test]
    fn authority_includes_default_port() {
        assert_eq!(parse_authority("http://backend").unwrap().as_str(), "backend:80");
        assert_eq!(parse_authority("http://10.0.0.1:4000/api").unwrap().as_str(), "10.0.0.1:4000");
        assert!(parse_authority("not a url").is_err());
    }

    #[tokio::test]
    async fn without_upstream_returns_not_found() {
        let app = UpstreamApp::new(&UpstreamConfig::default()).unwrap();
        let response = app
            .dispatch(Request::get("/anything").body(Body::empty()).unwrap())
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn refuses_requests_after_teardown() {
        let app = UpstreamApp::new(&UpstreamConfig::default()).unwrap();
        app.teardown().await.unwrap();

        let response = app
            .dispatch(Request::get("/anything").body(Body::empty()).unwrap())
            .await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"Service is shutting down");
    }

    #[tokio::test]
    async fn unreachable_upstream_is_bad_gateway() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let config = UpstreamConfig {
            url: Some(format!("http://{}", addr)),
        };
        let app = UpstreamApp::new(&config).unwrap();
        let response = app
            .dispatch(Request::get("/x").body(Body::empty()).unwrap())
            .await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(app.in_flight(), 0);
    }
}
