//! ---
//! hub_section: "02-provisioning-orchestration"
//! hub_subsection: "module"
//! hub_type: "source"
//! hub_scope: "code"
//! hub_description: "Reference linker keeping initiative/site and site/page back-references consistent."
//! hub_version: "v0.0.0-prealpha"
//! hub_owner: "tbd"
//! ---
//! Two-sided references between hub resources.
//!
//! No transaction spans the two document writes of a link. Writes happen
//! in a fixed order so that a crash between them always leaves the same
//! side ahead: on link the page learns about the site first, on unlink the
//! site forgets the page first.

use std::sync::Arc;

use r_hub_client::{ResourceClient, Result};
use serde_json::{json, Value};
use tracing::debug;

use crate::model::{slugify, values_mut, Initiative, Page, PageRef, Site, SiteRef};
use crate::persist::{delete_item, entry, item_fields, merge_properties, save_data};

#[derive(Clone)]
pub struct ReferenceLinker {
    client: Arc<ResourceClient>,
}

impl ReferenceLinker {
    pub fn new(client: Arc<ResourceClient>) -> Self {
        Self { client }
    }

    /// Record the page on the site and the site on the page.
    ///
    /// Existing records are not duplicated. The slug defaults to the page's own.
    pub fn link(&self, page: &mut Page, site: &mut Site, slug: Option<&str>) -> Result<bool> {
        let slug = slug.map(slugify).unwrap_or_else(|| page.slug());

        let mut sites = page.sites();
        if !sites.iter().any(|entry| entry.id == site.id()) {
            sites.push(SiteRef {
                id: site.id().to_owned(),
                title: site.title().to_owned(),
            });
        }
        let mut page_data = page.data().clone();
        write_sites(&mut page_data, &sites);
        if !save_data(&self.client, page.id(), &page_data)? {
            return Ok(false);
        }
        *page.data_mut() = page_data;

        let mut pages = site.pages();
        match pages.iter_mut().find(|entry| entry.id == page.id()) {
            Some(existing) => existing.slug = slug,
            None => pages.push(PageRef {
                id: page.id().to_owned(),
                title: page.title().to_owned(),
                slug,
            }),
        }
        let mut site_data = site.data().clone();
        write_pages(&mut site_data, &pages);
        if !save_data(&self.client, site.id(), &site_data)? {
            return Ok(false);
        }
        *site.data_mut() = site_data;
        debug!(page = page.id(), site = site.id(), "page linked");
        Ok(true)
    }

    /// Remove the link from both sides. A page left without sites is deleted.
    pub fn unlink(&self, page: &mut Page, site: &mut Site) -> Result<bool> {
        let mut pages = site.pages();
        pages.retain(|entry| entry.id != page.id());
        let mut site_data = site.data().clone();
        write_pages(&mut site_data, &pages);
        if !save_data(&self.client, site.id(), &site_data)? {
            return Ok(false);
        }
        *site.data_mut() = site_data;

        let mut sites = page.sites();
        sites.retain(|entry| entry.id != site.id());
        if sites.is_empty() {
            debug!(page = page.id(), "page has no sites left, deleting");
            page.set_sites(&sites);
            return delete_item(&self.client, page.id());
        }
        let mut page_data = page.data().clone();
        write_sites(&mut page_data, &sites);
        if !save_data(&self.client, page.id(), &page_data)? {
            return Ok(false);
        }
        *page.data_mut() = page_data;
        debug!(page = page.id(), site = site.id(), "page unlinked");
        Ok(true)
    }

    /// Point the initiative at its site and the site back at the initiative.
    pub fn link_initiative(&self, initiative: &mut Initiative, site: &mut Site) -> Result<bool> {
        let mut updates = entry("siteId", site.id());
        if let Some(url) = site.url() {
            updates.insert("url".to_owned(), json!(url));
        }
        let extra = item_fields(&[("url", site.url())]);
        let (ok, merged) = merge_properties(&self.client, initiative.item(), updates, extra)?;
        if !ok {
            return Ok(false);
        }
        let site_url = site.url().map(str::to_owned);
        let item = initiative.item_mut();
        item.properties = merged;
        if site_url.is_some() {
            item.url = site_url;
        }

        let mut site_data = site.data().clone();
        values_mut(&mut site_data).insert(
            "parentInitiativeId".to_owned(),
            Value::String(initiative.id().to_owned()),
        );
        if !save_data(&self.client, site.id(), &site_data)? {
            return Ok(false);
        }
        *site.data_mut() = site_data;

        let (ok, merged) = merge_properties(
            &self.client,
            site.item(),
            entry("parentInitiativeId", initiative.id()),
            None,
        )?;
        if ok {
            site.item_mut().properties = merged;
            debug!(initiative = initiative.id(), site = site.id(), "initiative linked");
        }
        Ok(ok)
    }
}

fn write_sites(data: &mut Value, sites: &[SiteRef]) {
    values_mut(data).insert("sites".to_owned(), json!(sites));
}

fn write_pages(data: &mut Value, pages: &[PageRef]) {
    values_mut(data).insert("pages".to_owned(), json!(pages));
}
