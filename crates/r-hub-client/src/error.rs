//! ---
//! hub_section: "05-networking-external-interfaces"
//! hub_subsection: "module"
//! hub_type: "source"
//! hub_scope: "code"
//! hub_description: "Error type shared by every hub operation."
//! hub_version: "v0.0.0-prealpha"
//! hub_owner: "tbd"
//! ---
use serde_json::Value;
use thiserror::Error;

use crate::endpoints::Endpoint;
use crate::item::ResourceKind;

/// Errors raised by the resource client and the managers built on it.
#[derive(Debug, Error)]
pub enum HubError {
    /// Local validation failed before any remote call was made.
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// An item was fetched but is not the kind of resource the caller asked for.
    #[error("item {id} is not a valid {expected} (found {found})")]
    WrongKind {
        id: String,
        expected: ResourceKind,
        found: ResourceKind,
    },

    /// A keyed lookup returned nothing.
    #[error("{endpoint} '{id}' not found")]
    NotFound { endpoint: Endpoint, id: String },

    /// The remote service answered with an error status or error body.
    #[error("remote service returned status {status}: {body}")]
    Remote { status: u16, body: Value },

    /// The remote service answered but reported `success: false`.
    #[error("remote service rejected {operation} on '{target}'")]
    Rejected { operation: String, target: String },

    /// No free hostname could be found for a site.
    #[error("domain '{0}' is already registered")]
    DomainUnavailable(String),

    /// The request never produced a response.
    #[error("transport error: {0}")]
    Transport(String),

    /// The response parsed but lacked a field we rely on.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
}

impl From<reqwest::Error> for HubError {
    fn from(err: reqwest::Error) -> Self {
        HubError::Transport(err.to_string())
    }
}

impl HubError {
    /// Construct a [`HubError::Rejected`].
    pub fn rejected(operation: impl Into<String>, target: impl Into<String>) -> Self {
        HubError::Rejected {
            operation: operation.into(),
            target: target.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, HubError::NotFound { .. })
            || matches!(self, HubError::Remote { status: 404, .. })
    }

    /// HTTP-like status when the error came from the remote side.
    pub fn status(&self) -> Option<u16> {
        match self {
            HubError::Remote { status, .. } => Some(*status),
            HubError::NotFound { .. } => Some(404),
            _ => None,
        }
    }
}

/// Result alias used throughout the hub crates.
pub type Result<T> = std::result::Result<T, HubError>;

/// Turn a remote `success` flag into an error when it is false.
pub fn ensure_success(flag: bool, operation: &str, target: &str) -> Result<()> {
    if flag {
        Ok(())
    } else {
        Err(HubError::rejected(operation, target))
    }
}
