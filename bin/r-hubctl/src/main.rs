//! ---
//! hub_section: "05-networking-external-interfaces"
//! hub_subsection: "binary"
//! hub_type: "source"
//! hub_scope: "code"
//! hub_description: "Operator CLI for provisioning and inspecting hub resources."
//! hub_version: "v0.0.0-prealpha"
//! hub_owner: "tbd"
//! ---
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use r_hub_common::{init_tracing, AppConfig, LoadedAppConfig};
use r_hub_core::Hub;
use serde::Serialize;

mod initiative;
mod site;

const CONFIG_CANDIDATES: [&str; 2] = ["r-hub.toml", "/etc/r-hub/config.toml"];

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "R-Hub provisioning utility",
    long_about = None
)]
struct Cli {
    /// Configuration file; overrides the default search locations.
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(subcommand, about = "Provision and manage initiatives")]
    Initiative(initiative::InitiativeCommand),
    #[command(subcommand, about = "Inspect recorded provisioning workflows")]
    Workflow(initiative::WorkflowCommand),
    #[command(subcommand, about = "Create and manage sites")]
    Site(site::SiteCommand),
    #[command(subcommand, about = "Link pages to sites")]
    Page(site::PageCommand),
    #[command(subcommand, about = "Configuration helpers")]
    Config(ConfigCommand),
}

#[derive(Debug, Subcommand)]
enum ConfigCommand {
    /// Print the effective configuration and where it was loaded from.
    Show,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let loaded = load_config(cli.config)?;
    init_tracing("r-hubctl", &loaded.config.logging)?;

    match cli.command {
        Commands::Config(ConfigCommand::Show) => print_json(&serde_json::json!({
            "source": loaded.source,
            "environment": loaded.config.environment(),
            "config": loaded.config,
        })),
        Commands::Initiative(cmd) => initiative::run(&connect(&loaded)?, cmd),
        Commands::Workflow(cmd) => initiative::run_workflow(&connect(&loaded)?, cmd),
        Commands::Site(cmd) => site::run(&connect(&loaded)?, cmd),
        Commands::Page(cmd) => site::run_page(&connect(&loaded)?, cmd),
    }
}

fn load_config(explicit: Option<PathBuf>) -> Result<LoadedAppConfig> {
    let mut candidates: Vec<PathBuf> = explicit.into_iter().collect();
    candidates.extend(CONFIG_CANDIDATES.iter().map(PathBuf::from));
    AppConfig::load_with_source(&candidates)
}

fn connect(loaded: &LoadedAppConfig) -> Result<Hub> {
    Hub::connect(&loaded.config)
}

/// Write a value to stdout as pretty JSON.
pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
