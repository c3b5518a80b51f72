//! ---
//! hub_section: "05-networking-external-interfaces"
//! hub_subsection: "module"
//! hub_type: "source"
//! hub_scope: "code"
//! hub_description: "Blocking HTTP transport seam and bearer token sources."
//! hub_version: "v0.0.0-prealpha"
//! hub_owner: "tbd"
//! ---
use std::sync::Arc;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header;
use serde_json::Value;
use strum::Display;
use tracing::trace;
use url::Url;

use crate::error::Result;

/// HTTP verbs used by the hub APIs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Patch,
    Delete,
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// A single request against one of the hub APIs.
#[derive(Debug, Clone, PartialEq)]
pub struct HubRequest {
    pub method: Method,
    pub url: Url,
    pub body: Option<Value>,
}

impl HubRequest {
    pub fn get(url: Url) -> Self {
        Self {
            method: Method::Get,
            url,
            body: None,
        }
    }

    pub fn post(url: Url, body: Value) -> Self {
        Self {
            method: Method::Post,
            url,
            body: Some(body),
        }
    }

    pub fn patch(url: Url, body: Value) -> Self {
        Self {
            method: Method::Patch,
            url,
            body: Some(body),
        }
    }

    pub fn delete(url: Url) -> Self {
        Self {
            method: Method::Delete,
            url,
            body: None,
        }
    }
}

/// Raw response: status plus JSON body (`Null` when empty).
#[derive(Debug, Clone, PartialEq)]
pub struct HubResponse {
    pub status: u16,
    pub body: Value,
}

impl HubResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    pub fn ok(body: Value) -> Self {
        Self::new(200, body)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Executes requests. Implemented by [`HttpTransport`] and by in-memory fakes.
pub trait Transport: Send + Sync {
    /// Send one request and return whatever the server answered.
    ///
    /// Only failures to obtain a response are errors here; status handling
    /// belongs to the caller.
    fn execute(&self, request: HubRequest) -> Result<HubResponse>;
}

/// Supplies the bearer token attached to every request.
pub trait TokenSource: Send + Sync {
    fn token(&self) -> Option<String>;
}

/// Token fixed at construction time.
#[derive(Debug, Clone, Default)]
pub struct StaticToken(Option<String>);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(Some(token.into()))
    }

    pub fn anonymous() -> Self {
        Self(None)
    }
}

impl TokenSource for StaticToken {
    fn token(&self) -> Option<String> {
        self.0.clone()
    }
}

/// Token read from an environment variable on every request.
#[derive(Debug, Clone)]
pub struct EnvToken {
    var: String,
}

impl EnvToken {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl TokenSource for EnvToken {
    fn token(&self) -> Option<String> {
        std::env::var(&self.var)
            .ok()
            .filter(|value| !value.trim().is_empty())
    }
}

/// Blocking `reqwest` transport.
pub struct HttpTransport {
    client: Client,
    tokens: Arc<dyn TokenSource>,
    referer: Option<String>,
}

impl HttpTransport {
    pub fn new(
        tokens: Arc<dyn TokenSource>,
        timeout: Duration,
        referer: Option<String>,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("r-hub/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            tokens,
            referer,
        })
    }
}

impl Transport for HttpTransport {
    fn execute(&self, request: HubRequest) -> Result<HubResponse> {
        trace!(method = %request.method, url = %request.url, "sending request");
        let mut builder = self
            .client
            .request(request.method.into(), request.url.clone())
            .header(header::ACCEPT, "application/json");
        if let Some(token) = self.tokens.token() {
            builder = builder.bearer_auth(token);
        }
        if let Some(referer) = &self.referer {
            builder = builder.header(header::REFERER, referer);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send()?;
        let status = response.status().as_u16();
        let text = response.text()?;
        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };
        trace!(status, "received response");
        Ok(HubResponse { status, body })
    }
}
