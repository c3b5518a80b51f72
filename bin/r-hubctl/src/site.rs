//! ---
//! hub_section: "05-networking-external-interfaces"
//! hub_subsection: "binary"
//! hub_type: "source"
//! hub_scope: "code"
//! hub_description: "Site and page commands."
//! hub_version: "v0.0.0-prealpha"
//! hub_owner: "tbd"
//! ---
use anyhow::Result;
use clap::{Args, Subcommand};
use r_hub_core::{Hub, Site};
use serde_json::json;

use crate::print_json;

#[derive(Debug, Subcommand)]
pub enum SiteCommand {
    /// Create a site, registering its domain.
    Add(SiteAddArgs),
    /// Print a site by item id.
    Get(SiteIdArgs),
    /// Resolve a site from a hostname or site url.
    ByDomain(DomainArgs),
    /// Move a site to a new subdomain.
    Subdomain(SubdomainArgs),
    /// Delete a site with its domain, groups and orphaned pages.
    Delete(SiteIdArgs),
    /// Search the items shared with a site's catalog groups.
    Search(SearchArgs),
    /// Hand a site and its pages to another user.
    Reassign(ReassignArgs),
}

#[derive(Debug, Subcommand)]
pub enum PageCommand {
    /// Add an existing page to a site.
    Link(LinkArgs),
    /// Remove a page from a site; pages left without sites are deleted.
    Unlink(LinkArgs),
}

#[derive(Debug, Args)]
pub struct SiteAddArgs {
    #[arg(long)]
    title: String,
    /// Subdomain label; derived from the title when omitted.
    #[arg(long)]
    subdomain: Option<String>,
    /// Parent initiative id. Required on premium hubs.
    #[arg(long, value_name = "INITIATIVE_ID")]
    initiative: Option<String>,
}

#[derive(Debug, Args)]
pub struct SiteIdArgs {
    id: String,
}

#[derive(Debug, Args)]
pub struct DomainArgs {
    /// Hostname, full site url, or enterprise `#/subdomain` url.
    domain: String,
}

#[derive(Debug, Args)]
pub struct SearchArgs {
    id: String,
    /// Keep items whose title contains this text.
    #[arg(long)]
    query: Option<String>,
    /// Keep items of exactly this type, e.g. "Web Map".
    #[arg(long = "type", value_name = "ITEM_TYPE")]
    item_type: Option<String>,
}

#[derive(Debug, Args)]
pub struct ReassignArgs {
    id: String,
    /// Username of the new owner.
    owner: String,
}

#[derive(Debug, Args)]
pub struct SubdomainArgs {
    id: String,
    subdomain: String,
}

#[derive(Debug, Args)]
pub struct LinkArgs {
    #[arg(long)]
    page: String,
    #[arg(long)]
    site: String,
    /// Slug to use in the site's page list.
    #[arg(long)]
    slug: Option<String>,
}

pub fn run(hub: &Hub, command: SiteCommand) -> Result<()> {
    let sites = hub.sites();
    match command {
        SiteCommand::Add(args) => {
            let parent = args
                .initiative
                .as_deref()
                .map(|id| hub.initiatives().get(id))
                .transpose()?;
            let site = sites.add_site(&args.title, args.subdomain.as_deref(), parent.as_ref())?;
            print_json(&summary(&site))
        }
        SiteCommand::Get(args) => print_json(&sites.get(&args.id)?),
        SiteCommand::ByDomain(args) => print_json(&summary(&sites.get_by_domain(&args.domain)?)),
        SiteCommand::Subdomain(args) => {
            let mut site = sites.get(&args.id)?;
            sites.update_subdomain(&mut site, &args.subdomain)?;
            print_json(&summary(&site))
        }
        SiteCommand::Delete(args) => {
            let site = sites.get(&args.id)?;
            sites.delete(site)?;
            print_json(&json!({ "deleted": args.id }))
        }
        SiteCommand::Search(args) => {
            let site = sites.get(&args.id)?;
            let items =
                sites.search_catalog(&site, args.query.as_deref(), args.item_type.as_deref())?;
            print_json(&items)
        }
        SiteCommand::Reassign(args) => {
            let site = sites.get(&args.id)?;
            let moved = sites.reassign_to(&site, &args.owner)?;
            print_json(&summary(&moved))
        }
    }
}

pub fn run_page(hub: &Hub, command: PageCommand) -> Result<()> {
    let (args, linking) = match command {
        PageCommand::Link(args) => (args, true),
        PageCommand::Unlink(args) => (args, false),
    };
    let mut page = hub.pages().get(&args.page)?;
    let mut site = hub.sites().get(&args.site)?;
    let linker = hub.linker();
    let changed = if linking {
        linker.link(&mut page, &mut site, args.slug.as_deref())?
    } else {
        linker.unlink(&mut page, &mut site)?
    };
    print_json(&json!({
        "page": args.page,
        "site": args.site,
        "linked": linking,
        "success": changed,
    }))
}

fn summary(site: &Site) -> serde_json::Value {
    json!({
        "id": site.id(),
        "title": site.title(),
        "url": site.url(),
        "subdomain": site.subdomain(),
        "clientId": site.client_id(),
        "parentInitiativeId": site.parent_initiative_id(),
        "pages": site.pages(),
    })
}
