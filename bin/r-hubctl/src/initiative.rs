//! ---
//! hub_section: "05-networking-external-interfaces"
//! hub_subsection: "binary"
//! hub_type: "source"
//! hub_scope: "code"
//! hub_description: "Initiative provisioning and workflow ledger commands."
//! hub_version: "v0.0.0-prealpha"
//! hub_owner: "tbd"
//! ---
use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use r_hub_core::{Hub, Initiative, NewInitiative, WorkflowError};
use serde_json::json;
use tracing::warn;
use uuid::Uuid;

use crate::print_json;

#[derive(Debug, Subcommand)]
pub enum InitiativeCommand {
    /// Provision an initiative with its groups and site.
    Add(AddArgs),
    /// Print an initiative.
    Get(IdArgs),
    /// Delete an initiative together with its site and groups.
    Delete(IdArgs),
    /// Continue an aborted provisioning workflow.
    Resume(WorkflowArgs),
    /// Remove everything an aborted workflow created.
    Rollback(WorkflowArgs),
    /// List the members of an initiative's followers group.
    Followers(IdArgs),
    /// Hand an initiative with its site and groups to another user.
    Reassign(ReassignArgs),
}

#[derive(Debug, Subcommand)]
pub enum WorkflowCommand {
    /// List recorded provisioning workflows.
    List,
}

#[derive(Debug, Args)]
pub struct AddArgs {
    /// Initiative title; also the default site subdomain.
    #[arg(long)]
    title: String,
    /// Optional description stored on the item.
    #[arg(long)]
    description: Option<String>,
    /// Existing site to clone as the initiative's site.
    #[arg(long, value_name = "SITE_ID")]
    template_site: Option<String>,
}

#[derive(Debug, Args)]
pub struct IdArgs {
    /// Initiative item id.
    id: String,
}

#[derive(Debug, Args)]
pub struct ReassignArgs {
    /// Initiative item id.
    id: String,
    /// Username of the new owner.
    owner: String,
}

#[derive(Debug, Args)]
pub struct WorkflowArgs {
    /// Workflow id reported when provisioning aborted.
    workflow: Uuid,
}

pub fn run(hub: &Hub, command: InitiativeCommand) -> Result<()> {
    let initiatives = hub.initiatives();
    match command {
        InitiativeCommand::Add(args) => {
            let template_site = args
                .template_site
                .as_deref()
                .map(|id| hub.sites().get(id))
                .transpose()
                .context("unable to load template site")?;
            let request = NewInitiative {
                title: args.title,
                description: args.description,
                template_site,
            };
            let initiative = initiatives.add(request).map_err(report_abort)?;
            print_json(&summary(&initiative))
        }
        InitiativeCommand::Get(args) => {
            let initiative = initiatives.get(&args.id)?;
            print_json(&initiative)
        }
        InitiativeCommand::Delete(args) => {
            let initiative = initiatives.get(&args.id)?;
            initiatives.delete(initiative)?;
            print_json(&json!({ "deleted": args.id }))
        }
        InitiativeCommand::Resume(args) => {
            let initiative = initiatives.resume(args.workflow).map_err(report_abort)?;
            print_json(&summary(&initiative))
        }
        InitiativeCommand::Rollback(args) => {
            let record = initiatives.rollback(args.workflow)?;
            print_json(&record)
        }
        InitiativeCommand::Followers(args) => {
            let initiative = initiatives.get(&args.id)?;
            print_json(&initiatives.followers(&initiative)?)
        }
        InitiativeCommand::Reassign(args) => {
            let initiative = initiatives.get(&args.id)?;
            let moved = initiatives.reassign_to(&initiative, &args.owner)?;
            print_json(&json!({ "id": moved.id(), "owner": moved.item().owner }))
        }
    }
}

pub fn run_workflow(hub: &Hub, command: WorkflowCommand) -> Result<()> {
    match command {
        WorkflowCommand::List => {
            let records = hub.initiatives().workflows()?;
            print_json(&records)
        }
    }
}

fn summary(initiative: &Initiative) -> serde_json::Value {
    json!({
        "id": initiative.id(),
        "title": initiative.title(),
        "url": initiative.url(),
        "siteId": initiative.site_id(),
        "contentGroupId": initiative.content_group_id(),
        "collaborationGroupId": initiative.collab_group_id(),
        "followersGroupId": initiative.followers_group_id(),
    })
}

fn report_abort(err: WorkflowError) -> anyhow::Error {
    if let WorkflowError::Aborted { workflow_id, step, .. } = &err {
        warn!(
            %workflow_id,
            %step,
            "provisioning aborted; run `r-hubctl initiative resume {workflow_id}` or `rollback`"
        );
    }
    err.into()
}
