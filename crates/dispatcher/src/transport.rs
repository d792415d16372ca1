//! HTTP transport used by all targets
//!
//! Targets build an [`OutboundRequest`]; the transport performs it with a
//! bounded timeout and maps every failure onto [`ContractError`].

use contracts::ContractError;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

use crate::error::DispatcherError;

/// Per-request network timeout
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Request body
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Json(serde_json::Value),
    Text(String),
}

/// A single POST to a target
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundRequest {
    /// Target name, for error context
    pub target: String,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: RequestBody,
}

impl OutboundRequest {
    /// JSON POST
    pub fn json<T: Serialize>(
        target: impl Into<String>,
        url: Url,
        body: &T,
    ) -> Result<Self, ContractError> {
        let target = target.into();
        let value = serde_json::to_value(body)
            .map_err(|e| ContractError::payload_encode(&target, e.to_string()))?;
        Ok(Self {
            target,
            url,
            headers: Vec::new(),
            body: RequestBody::Json(value),
        })
    }

    /// Plain-text POST
    pub fn text(target: impl Into<String>, url: Url, body: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            url,
            headers: Vec::new(),
            body: RequestBody::Text(body.into()),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Response status and body
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Keep the response when `accepted` holds for its status, otherwise
    /// turn it into [`ContractError::RemoteRejection`]
    pub fn accept_if(
        self,
        target: &str,
        accepted: impl FnOnce(u16) -> bool,
    ) -> Result<Self, ContractError> {
        if accepted(self.status) {
            Ok(self)
        } else {
            Err(ContractError::remote_rejection(target, self.status, self.body))
        }
    }
}

/// Performs outbound requests
///
/// A non-2xx status is *not* an error at this layer; targets decide what
/// counts as success.
#[trait_variant::make(HttpTransport: Send)]
pub trait LocalHttpTransport {
    async fn send(&self, request: OutboundRequest) -> Result<HttpResponse, ContractError>;
}

/// `reqwest`-backed transport
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Build a client with the standard request timeout
    pub fn new() -> Result<Self, DispatcherError> {
        Self::with_timeout(REQUEST_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, DispatcherError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("tilt-forwarder/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DispatcherError::client_build(e.to_string()))?;
        Ok(Self { client })
    }
}

impl HttpTransport for ReqwestTransport {
    #[instrument(
        name = "http_transport_send",
        skip(self, request),
        fields(target = %request.target, url = %request.url)
    )]
    async fn send(&self, request: OutboundRequest) -> Result<HttpResponse, ContractError> {
        let OutboundRequest {
            target,
            url,
            headers,
            body,
        } = request;

        let mut builder = self.client.post(url);
        for (name, value) in &headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder = match body {
            RequestBody::Json(value) => builder.json(&value),
            RequestBody::Text(text) => builder
                .header(reqwest::header::CONTENT_TYPE, "text/plain; charset=utf-8")
                .body(text),
        };

        let response = builder
            .send()
            .await
            .map_err(|e| ContractError::transport(&target, describe(&e)))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| ContractError::transport(&target, describe(&e)))?;

        debug!(target = %target, status, bytes = body.len(), "Response received");
        Ok(HttpResponse { status, body })
    }
}

fn describe(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        format!("timed out: {err}")
    } else if err.is_connect() {
        format!("connection failed: {err}")
    } else {
        err.to_string()
    }
}
