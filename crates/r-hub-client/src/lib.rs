//! ---
//! hub_section: "05-networking-external-interfaces"
//! hub_subsection: "module"
//! hub_type: "source"
//! hub_scope: "code"
//! hub_description: "Resource client for the portal, hub and discussions REST APIs."
//! hub_version: "v0.0.0-prealpha"
//! hub_owner: "tbd"
//! ---
//! Uniform CRUD access to hub resources.
//!
//! Every remote call made by the provisioning managers goes through
//! [`ResourceClient`], which in turn delegates to a [`Transport`]. Production
//! code uses [`HttpTransport`]; tests plug in an in-memory platform.

pub mod client;
pub mod endpoints;
pub mod error;
pub mod item;
pub mod org;
pub mod transport;

pub use client::{DomainRecord, DomainRegistration, GroupMembers, ResourceClient, Sharing};
pub use endpoints::{ApiRoots, Endpoint};
pub use error::{ensure_success, HubError, Result};
pub use item::{Item, ItemDraft, ResourceKind};
pub use org::{OrgContext, PortalFlavor, UserInfo};
pub use transport::{
    EnvToken, HttpTransport, HubRequest, HubResponse, Method, StaticToken, TokenSource, Transport,
};
