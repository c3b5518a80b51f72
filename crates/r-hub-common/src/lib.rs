//! ---
//! hub_section: "01-core-functionality"
//! hub_subsection: "module"
//! hub_type: "source"
//! hub_scope: "code"
//! hub_description: "Shared primitives and utilities for the hub client workspace."
//! hub_version: "v0.0.0-prealpha"
//! hub_owner: "tbd"
//! ---
//! Core shared primitives for the R-Hub workspace.
//! This crate exposes configuration loading, logging initialisation and
//! time helpers consumed across the workspace.

pub mod config;
pub mod logging;
pub mod time;

pub use config::{
    AppConfig, FailurePolicy, HubConfig, HubEnvironment, HubTier, LoadedAppConfig, LoggingConfig,
    PortalConfig, ProvisioningConfig,
};
pub use logging::{init_tracing, LogFormat};
