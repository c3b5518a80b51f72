//! ---
//! hub_section: "02-provisioning-orchestration"
//! hub_subsection: "module"
//! hub_type: "source"
//! hub_scope: "code"
//! hub_description: "Page manager: create, clone, relink and delete site pages."
//! hub_version: "v0.0.0-prealpha"
//! hub_owner: "tbd"
//! ---
use std::sync::Arc;

use r_hub_client::{
    ensure_success, Endpoint, HubError, ItemDraft, OrgContext, ResourceClient, ResourceKind,
    Result, Sharing,
};
use serde_json::{json, Map, Value};
use tracing::{debug, info};

use crate::linker::ReferenceLinker;
use crate::model::{slugify, values_mut, Page, SearchFilter, Site};
use crate::persist::{delete_item, fetch, save_data};
use crate::templates::page_data;

const PAGE_KEYWORDS: [&str; 9] = [
    "Hub",
    "hubPage",
    "JavaScript",
    "Map",
    "Mapping Site",
    "Online Map",
    "OpenData",
    "selfConfigured",
    "Web Map",
];

#[derive(Clone)]
pub struct PageManager {
    client: Arc<ResourceClient>,
    org: Arc<OrgContext>,
    linker: ReferenceLinker,
}

impl PageManager {
    pub fn new(client: Arc<ResourceClient>, org: Arc<OrgContext>) -> Self {
        let linker = ReferenceLinker::new(client.clone());
        Self {
            client,
            org,
            linker,
        }
    }

    pub fn get(&self, page_id: &str) -> Result<Page> {
        fetch(&self.client, page_id, Page::from_parts)
    }

    pub fn search(&self, filter: &SearchFilter, max: usize) -> Result<Vec<Page>> {
        let marker = ResourceKind::Page.marker().unwrap_or("hubPage");
        self.client
            .search_items(&filter.to_query(marker), max)?
            .into_iter()
            .filter(|item| item.kind() == ResourceKind::Page)
            .map(|item| {
                let data = self.client.get_item_data(&item.id)?;
                Page::from_parts(item, data)
            })
            .collect()
    }

    /// Pages listed on a site. Entries whose page no longer exists are skipped.
    pub fn for_site(&self, site: &Site) -> Result<Vec<Page>> {
        let mut pages = Vec::new();
        for entry in site.pages() {
            match self.get(&entry.id) {
                Ok(page) => pages.push(page),
                Err(err) if err.is_not_found() => {
                    debug!(site = site.id(), page = %entry.id, "stale page reference skipped")
                }
                Err(err) => return Err(err),
            }
        }
        Ok(pages)
    }

    /// Create a page, protect it and link it to `site`.
    pub fn add(&self, title: &str, site: &mut Site) -> Result<Page> {
        let title = title.trim();
        if title.is_empty() {
            return Err(HubError::Precondition("page title is required".to_owned()));
        }
        let item_type = if self.org.is_online() {
            "Hub Page"
        } else {
            "Site Page"
        };
        let draft = ItemDraft {
            culture: self.org.user.culture.clone(),
            ..ItemDraft::new(title, item_type)
                .keywords(PAGE_KEYWORDS)
                .tags(["Hub Page"])
                .property("schemaVersion", 2)
        };
        let page_id = self.client.create_item(&draft)?;

        if let Some(group) = site.collab_group_id() {
            let sharing = Sharing {
                confirm_item_control: true,
                ..Sharing::with_groups([group])
            };
            let refused = self.client.share_item(&page_id, &sharing)?;
            if !refused.is_empty() {
                return Err(HubError::rejected("share page", page_id));
            }
        }
        let protected = self.client.set_protected(Endpoint::Item, &page_id, true)?;
        ensure_success(protected, "protect page", &page_id)?;

        let data = page_data(title, &slugify(title), &self.org.user.username);
        ensure_success(
            save_data(&self.client, &page_id, &data)?,
            "write page data",
            &page_id,
        )?;

        let mut page = self.get(&page_id)?;
        let linked = self.linker.link(&mut page, site, None)?;
        ensure_success(linked, "link page", &page_id)?;
        info!(page = %page_id, site = site.id(), "page created");
        Ok(page)
    }

    /// Copy a page into `site`, carrying over its layout.
    pub fn clone_page(&self, page: &Page, site: &mut Site, title: Option<&str>) -> Result<Page> {
        let mut copy = self.add(title.unwrap_or(page.title()), site)?;
        if let Some(layout) = page.layout() {
            self.update_layout(&mut copy, layout.clone())?;
        }
        Ok(copy)
    }

    /// Change top-level item fields and optionally the slug.
    ///
    /// A new slug or title is written into every site that lists the page.
    pub fn update(
        &self,
        page: &mut Page,
        changes: Map<String, Value>,
        slug: Option<&str>,
    ) -> Result<()> {
        if !changes.is_empty() {
            let patch = Value::Object(changes.clone());
            let ok = self.client.update(Endpoint::Item, page.id(), &patch)?;
            ensure_success(ok, "update page", page.id())?;
            if let Some(title) = changes.get("title").and_then(Value::as_str) {
                page.item_mut().title = title.to_owned();
            }
        }

        let renamed = changes.contains_key("title");
        if slug.is_none() && !renamed {
            return Ok(());
        }
        if let Some(slug) = slug {
            let mut data = page.data().clone();
            values_mut(&mut data).insert("slug".to_owned(), json!(slugify(slug)));
            ensure_success(
                save_data(&self.client, page.id(), &data)?,
                "write page data",
                page.id(),
            )?;
            *page.data_mut() = data;
        }

        let slug = page.slug();
        for site_ref in page.sites() {
            let mut site = match fetch(&self.client, &site_ref.id, Site::from_parts) {
                Ok(site) => site,
                Err(err) if err.is_not_found() => continue,
                Err(err) => return Err(err),
            };
            let mut entries = site.pages();
            for entry in entries.iter_mut().filter(|entry| entry.id == page.id()) {
                entry.slug = slug.clone();
                entry.title = page.title().to_owned();
            }
            site.set_pages(&entries);
            ensure_success(
                save_data(&self.client, site.id(), site.data())?,
                "write site data",
                site.id(),
            )?;
        }
        Ok(())
    }

    pub fn update_layout(&self, page: &mut Page, layout: Value) -> Result<()> {
        let mut data = page.data().clone();
        values_mut(&mut data).insert("layout".to_owned(), layout);
        ensure_success(
            save_data(&self.client, page.id(), &data)?,
            "update page layout",
            page.id(),
        )?;
        *page.data_mut() = data;
        Ok(())
    }

    /// Link an existing page to another site.
    pub fn link(&self, page: &mut Page, site: &mut Site, slug: Option<&str>) -> Result<bool> {
        self.linker.link(page, site, slug)
    }

    pub fn unlink(&self, page: &mut Page, site: &mut Site) -> Result<bool> {
        self.linker.unlink(page, site)
    }

    /// Remove the page from every site that lists it, then delete it.
    pub fn delete(&self, page: Page) -> Result<()> {
        for site_ref in page.sites() {
            let mut site = match fetch(&self.client, &site_ref.id, Site::from_parts) {
                Ok(site) => site,
                Err(err) if err.is_not_found() => continue,
                Err(err) => return Err(err),
            };
            let mut entries = site.pages();
            entries.retain(|entry| entry.id != page.id());
            site.set_pages(&entries);
            ensure_success(
                save_data(&self.client, site.id(), site.data())?,
                "write site data",
                site.id(),
            )?;
        }
        ensure_success(delete_item(&self.client, page.id())?, "delete page", page.id())?;
        info!(page = page.id(), "page deleted");
        Ok(())
    }
}
