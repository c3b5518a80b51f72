//! ---
//! hub_section: "02-provisioning-orchestration"
//! hub_subsection: "module"
//! hub_type: "source"
//! hub_scope: "code"
//! hub_description: "Site provisioner: subdomain selection, domain registration and site documents."
//! hub_version: "v0.0.0-prealpha"
//! hub_owner: "tbd"
//! ---
//! Sites and their hostnames.
//!
//! On ArcGIS Online a site is reachable at `{subdomain}-{urlKey}.{hub host}`
//! once a domain entry maps that hostname to the site item. Enterprise
//! portals have no registry: the subdomain lives in a `hubsubdomain|...`
//! type keyword and the site is served below the portal.
//!
//! Creation runs in two halves. [`SiteManager::create_site_item`] returns
//! the item id before anything else is attached, so a caller can record it;
//! [`SiteManager::finish_site`] completes that item and can be repeated.

use std::collections::HashSet;
use std::sync::Arc;

use r_hub_client::{
    ensure_success, DomainRegistration, Endpoint, HubError, Item, ItemDraft, OrgContext,
    ResourceClient, ResourceKind, Result, Sharing,
};
use r_hub_common::time::copy_title;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::domains::{
    check_length, enterprise_site_url, hosted_hostname, hostname_of, next_candidate,
    normalize_subdomain, select_subdomain,
};
use crate::groups::GroupProvisioner;
use crate::linker::ReferenceLinker;
use crate::model::{ensure_object, values_mut, GroupSet, Initiative, SearchFilter, Site};
use crate::ownership::{Holdings, OwnershipTransfer};
use crate::pages::PageManager;
use crate::persist::{delete_item, entry, fetch, item_fields, merge_properties, save_data};
use crate::templates::{default_global_nav, site_data};

const ONLINE_SITE_KEYWORDS: [&str; 12] = [
    "Hub",
    "hubSite",
    "hubSolution",
    "JavaScript",
    "Map",
    "Mapping Site",
    "Online Map",
    "OpenData",
    "Ready To Use",
    "selfConfigured",
    "Web Map",
    "Registered App",
];

const ENTERPRISE_SITE_KEYWORDS: [&str; 9] = [
    "Hub",
    "hubSite",
    "hubSolution",
    "JavaScript",
    "Map",
    "Mapping Site",
    "Online Map",
    "OpenData",
    "selfConfigured",
];

/// Client id enterprise sites authenticate with.
const ENTERPRISE_CLIENT_ID: &str = "arcgisonline";
const SUBDOMAIN_KEYWORD: &str = "hubsubdomain|";
const CATALOG_LIMIT: usize = 100;

/// Where a site will live, decided before anything is created.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Placement {
    subdomain: String,
    hostname: String,
    url: String,
}

#[derive(Clone)]
pub struct SiteManager {
    client: Arc<ResourceClient>,
    org: Arc<OrgContext>,
    groups: GroupProvisioner,
    linker: ReferenceLinker,
    pages: PageManager,
    ownership: OwnershipTransfer,
}

impl SiteManager {
    pub fn new(client: Arc<ResourceClient>, org: Arc<OrgContext>) -> Self {
        Self {
            groups: GroupProvisioner::new(client.clone(), org.clone()),
            linker: ReferenceLinker::new(client.clone()),
            pages: PageManager::new(client.clone(), org.clone()),
            ownership: OwnershipTransfer::new(client.clone(), org.clone()),
            client,
            org,
        }
    }

    pub fn get(&self, site_id: &str) -> Result<Site> {
        fetch(&self.client, site_id, Site::from_parts)
    }

    /// Resolve a site from a hostname, a site URL, or an enterprise subdomain.
    pub fn get_by_domain(&self, domain: &str) -> Result<Site> {
        if self.org.is_online() {
            let hostname = hostname_of(domain);
            let record = self
                .client
                .lookup_domain(&hostname)?
                .ok_or_else(|| HubError::NotFound {
                    endpoint: Endpoint::Domain,
                    id: hostname.clone(),
                })?;
            return self.get(&record.site_id);
        }
        let subdomain = match domain.split_once("#/") {
            Some((_, rest)) => rest.trim_matches('/').to_owned(),
            None => normalize_subdomain(domain),
        };
        self.find_enterprise_site(&subdomain)?
            .ok_or_else(|| HubError::NotFound {
                endpoint: Endpoint::Item,
                id: format!("{SUBDOMAIN_KEYWORD}{subdomain}"),
            })
            .and_then(|item| self.get(&item.id))
    }

    pub fn search(&self, filter: &SearchFilter, max: usize) -> Result<Vec<Site>> {
        let marker = ResourceKind::Site.marker().unwrap_or("hubSite");
        self.client
            .search_items(&filter.to_query(marker), max)?
            .into_iter()
            .filter(|item| item.kind() == ResourceKind::Site)
            .map(|item| {
                let data = self.client.get_item_data(&item.id)?;
                Site::from_parts(item, data)
            })
            .collect()
    }

    /// Items shared with the site's catalog groups, each listed once.
    ///
    /// `query` keeps items whose title contains it, ignoring case;
    /// `item_type` keeps items of exactly that type.
    pub fn search_catalog(
        &self,
        site: &Site,
        query: Option<&str>,
        item_type: Option<&str>,
    ) -> Result<Vec<Item>> {
        let query = query.map(str::to_lowercase);
        let mut seen = HashSet::new();
        let mut found = Vec::new();
        for group in site.catalog_groups() {
            for item in self.client.group_content(&group, CATALOG_LIMIT)? {
                if !seen.insert(item.id.clone()) {
                    continue;
                }
                let title_matches = query
                    .as_deref()
                    .map_or(true, |q| item.title.to_lowercase().contains(q));
                let type_matches = item_type.map_or(true, |t| item.item_type == t);
                if title_matches && type_matches {
                    found.push(item);
                }
            }
        }
        Ok(found)
    }

    /// Hand a site and its pages to `target`.
    ///
    /// A standalone site's core team and content group move too. Sites of
    /// an initiative leave the shared groups to the initiative.
    pub fn reassign_to(&self, site: &Site, target: &str) -> Result<Site> {
        let pages: Vec<String> = site.pages().into_iter().map(|page| page.id).collect();
        let standalone = site.parent_initiative_id().is_none();
        let mut items = vec![site.id()];
        items.extend(pages.iter().map(String::as_str));
        let holdings = Holdings {
            items,
            core_team: site.collab_group_id().filter(|_| standalone),
            groups: site
                .content_group_id()
                .filter(|_| standalone)
                .into_iter()
                .collect(),
        };
        self.ownership.transfer(&holdings, target)?;
        self.get(site.id())
    }

    /// Create a site.
    ///
    /// The subdomain defaults to the title. Sites on premium online hubs
    /// belong to an initiative and share its groups; other sites get their
    /// own content and core team groups.
    pub fn add_site(
        &self,
        title: &str,
        subdomain: Option<&str>,
        parent: Option<&Initiative>,
    ) -> Result<Site> {
        let site_id = self.create_site_item(title, subdomain, parent)?;
        self.finish_site(&site_id).map_err(|err| {
            warn!(site = %site_id, error = %err, "site left partially provisioned");
            err
        })
    }

    /// First half of [`Self::add_site`]: validate, place, settle the groups
    /// and create the item. Returns the new item id.
    ///
    /// The site is not served until [`Self::finish_site`] has run on it.
    pub fn create_site_item(
        &self,
        title: &str,
        subdomain: Option<&str>,
        parent: Option<&Initiative>,
    ) -> Result<String> {
        let title = title.trim();
        if title.is_empty() {
            return Err(HubError::Precondition("site title is required".to_owned()));
        }
        let candidate = normalize_subdomain(subdomain.unwrap_or(title));
        let url_key = self.org.is_online().then_some(self.org.url_key.as_str());
        check_length(&candidate, url_key)?;
        if self.org.requires_initiatives() && parent.is_none() {
            return Err(HubError::Precondition(
                "sites on a premium hub must belong to an initiative".to_owned(),
            ));
        }
        let inherited = match parent {
            Some(initiative) => Some(parent_groups(initiative)?),
            None => None,
        };

        let placement = self.place(&candidate)?;
        let groups = match inherited {
            Some(groups) => groups,
            None => self.groups.provision_site_groups(title)?,
        };

        let site_id = self.client.create_item(&self.draft(title, &placement, &groups, parent))?;
        debug!(site = %site_id, hostname = %placement.hostname, "site item created");
        Ok(site_id)
    }

    /// Second half of [`Self::add_site`]: share with the core team, protect,
    /// register the hostname and write the data document.
    ///
    /// Everything is read back from the item, so a site whose finish failed
    /// half way can be finished again. A domain entry already pointing at
    /// the site is reused and an existing data document is updated in place.
    pub fn finish_site(&self, site_id: &str) -> Result<Site> {
        let item = self.client.get_item(site_id)?;
        let placement = self.placement_of(&item)?;
        let groups = item_groups(&item)?;
        let title = item.title.as_str();

        let sharing = Sharing {
            confirm_item_control: true,
            ..Sharing::with_groups([groups.collaboration.as_str()])
        };
        if !self.client.share_item(site_id, &sharing)?.is_empty() {
            return Err(HubError::rejected("share site", site_id));
        }
        if !item.protected {
            ensure_success(
                self.client.set_protected(Endpoint::Item, site_id, true)?,
                "protect site",
                site_id,
            )?;
        }

        let (client_id, domain_id) = if self.org.is_online() {
            let (client_id, domain_id) = self.register(site_id, title, &placement.hostname)?;
            (client_id, Some(domain_id))
        } else {
            (ENTERPRISE_CLIENT_ID.to_owned(), None)
        };

        let mut data = match self.client.get_item_data(site_id)? {
            existing @ Value::Object(_) => existing,
            _ => site_data(title),
        };
        {
            let values = values_mut(&mut data);
            values.insert("subdomain".to_owned(), json!(placement.subdomain));
            values.insert("defaultHostname".to_owned(), json!(placement.hostname));
            values.insert("internalUrl".to_owned(), json!(placement.hostname));
            values.insert("clientId".to_owned(), json!(client_id));
            values.insert("collaborationGroupId".to_owned(), json!(groups.collaboration));
            values.insert("contentGroupId".to_owned(), json!(groups.content));
            values.insert("updatedBy".to_owned(), json!(self.org.user.username));
            values.insert(
                "map".to_owned(),
                json!({"basemaps": {"primary": self.org.default_basemap}}),
            );
            values.insert("defaultExtent".to_owned(), self.org.default_extent.clone());
            if let Some(domain_id) = domain_id {
                values.insert("siteId".to_owned(), json!(domain_id));
            }
            if let Some(parent_id) = item.property_str("parentInitiativeId") {
                values.insert("parentInitiativeId".to_owned(), json!(parent_id));
            }
            let nav = self
                .org
                .shared_theme_header
                .clone()
                .unwrap_or_else(default_global_nav);
            let theme = ensure_object(values.entry("theme").or_insert_with(|| json!({})));
            theme.insert("globalNav".to_owned(), nav);
        }
        let root = ensure_object(&mut data);
        let catalog = ensure_object(root.entry("catalog").or_insert_with(|| json!({})));
        catalog.insert("groups".to_owned(), json!([groups.content]));

        ensure_success(
            save_data(&self.client, site_id, &data)?,
            "write site data",
            site_id,
        )?;
        let site = self.get(site_id)?;
        info!(site = %site_id, url = %placement.url, "site created");
        Ok(site)
    }

    /// Client id and domain entry id for a site, registering only what is missing.
    fn register(&self, site_id: &str, title: &str, hostname: &str) -> Result<(String, String)> {
        let existing = self
            .client
            .domains_for_site(site_id)?
            .into_iter()
            .find(|record| record.hostname == hostname);
        if let Some(record) = existing {
            let client_id = match record.client_key {
                Some(key) if !key.is_empty() => key,
                _ => self.client.register_app(site_id)?,
            };
            debug!(site = %site_id, domain = %record.id, "domain entry reused");
            return Ok((client_id, record.id));
        }
        let client_id = self.client.register_app(site_id)?;
        let record = self
            .client
            .register_domain(&self.registration(hostname, site_id, title, &client_id))?;
        Ok((client_id, record.id))
    }

    /// Recover the placement chosen at creation from the item's url and keywords.
    fn placement_of(&self, item: &Item) -> Result<Placement> {
        let url = item
            .url
            .clone()
            .ok_or_else(|| HubError::Precondition(format!("site {} has no url", item.id)))?;
        let hostname = hostname_of(&url);
        let subdomain = if self.org.is_online() {
            let suffix = format!("-{}", self.org.url_key);
            hostname
                .split('.')
                .next()
                .and_then(|label| label.strip_suffix(suffix.as_str()))
                .map(str::to_owned)
        } else {
            item.type_keywords
                .iter()
                .find_map(|k| k.strip_prefix(SUBDOMAIN_KEYWORD))
                .map(str::to_owned)
        };
        let subdomain = subdomain.ok_or_else(|| {
            HubError::UnexpectedResponse(format!("cannot derive the subdomain of site {}", item.id))
        })?;
        Ok(Placement {
            subdomain,
            hostname,
            url,
        })
    }

    fn draft(
        &self,
        title: &str,
        placement: &Placement,
        groups: &GroupSet,
        parent: Option<&Initiative>,
    ) -> ItemDraft {
        let (item_type, keywords, tags, created_from) = if self.org.is_online() {
            let created_from = if parent.is_some() {
                "defaultInitiativeSiteTemplate"
            } else {
                "basicDefaultSite Solution Template (embedded)"
            };
            let keywords: Vec<String> =
                ONLINE_SITE_KEYWORDS.iter().map(|k| (*k).to_owned()).collect();
            ("Hub Site Application", keywords, "Hub Site", created_from)
        } else {
            let mut keywords: Vec<String> =
                ENTERPRISE_SITE_KEYWORDS.iter().map(|k| (*k).to_owned()).collect();
            keywords.push(format!("{SUBDOMAIN_KEYWORD}{}", placement.subdomain));
            ("Site Application", keywords, "Enterprise Site", "portalDefaultSite")
        };

        let mut draft = ItemDraft {
            url: Some(placement.url.clone()),
            culture: self.org.user.culture.clone(),
            ..ItemDraft::new(title, item_type)
                .keywords(keywords)
                .tags([tags])
                .property("hasSeenGlobalNav", true)
                .property("createdFrom", created_from)
                .property("schemaVersion", 1.5)
                .property("contentGroupId", groups.content.as_str())
                .property("collaborationGroupId", groups.collaboration.as_str())
                .property("children", json!([]))
        };
        if let Some(followers) = groups.followers.as_deref() {
            draft = draft.property("followersGroupId", followers);
        }
        if let Some(initiative) = parent {
            draft = draft.property("parentInitiativeId", initiative.id());
        }
        draft
    }

    fn registration(
        &self,
        hostname: &str,
        site_id: &str,
        title: &str,
        client_id: &str,
    ) -> DomainRegistration {
        DomainRegistration {
            hostname: hostname.to_owned(),
            site_id: site_id.to_owned(),
            site_title: title.to_owned(),
            org_id: self.org.org_id.clone(),
            org_key: self.org.url_key.clone(),
            org_title: self.org.name.clone(),
            ssl_only: true,
            client_key: client_id.to_owned(),
        }
    }

    /// Pick a free subdomain and derive hostname and URL from it.
    fn place(&self, candidate: &str) -> Result<Placement> {
        if self.org.is_online() {
            let subdomain = select_subdomain(&self.client, &self.org, candidate)?;
            let hub_host = self.client.roots().hub().host_str().unwrap_or_default();
            let hostname = hosted_hostname(&subdomain, &self.org.url_key, hub_host);
            return Ok(Placement {
                url: format!("https://{hostname}"),
                hostname,
                subdomain,
            });
        }
        let subdomain = self.select_enterprise_subdomain(candidate)?;
        let url = enterprise_site_url(self.client.roots().portal(), &subdomain);
        Ok(Placement {
            hostname: hostname_of(&url),
            url,
            subdomain,
        })
    }

    fn select_enterprise_subdomain(&self, candidate: &str) -> Result<String> {
        if self.find_enterprise_site(candidate)?.is_none() {
            return Ok(candidate.to_owned());
        }
        let bumped = next_candidate(candidate);
        check_length(&bumped, None)?;
        match self.find_enterprise_site(&bumped)? {
            None => Ok(bumped),
            Some(_) => Err(HubError::DomainUnavailable(bumped)),
        }
    }

    fn find_enterprise_site(&self, subdomain: &str) -> Result<Option<Item>> {
        let query = format!("typekeywords:\"{SUBDOMAIN_KEYWORD}{subdomain}\"");
        Ok(self.client.search_items(&query, 1)?.into_iter().next())
    }

    /// Create a new site from an existing one, copying layout and theme.
    pub fn clone_site(
        &self,
        source: &Site,
        title: Option<&str>,
        parent: Option<&Initiative>,
        copy_pages: bool,
    ) -> Result<Site> {
        let title = title
            .map(str::to_owned)
            .unwrap_or_else(|| copy_title(source.title()));
        let mut site = self.add_site(&title, None, parent)?;
        self.copy_from(source, &mut site, copy_pages)?;
        info!(source = source.id(), site = site.id(), "site cloned");
        Ok(site)
    }

    /// Copy layout, theme and optionally pages of `source` onto `site`.
    ///
    /// The site keeps its own global navigation and header title. Pages
    /// whose title the site already lists are not copied again.
    pub fn copy_from(&self, source: &Site, site: &mut Site, copy_pages: bool) -> Result<()> {
        let title = site.title().to_owned();
        let mut data = site.data().clone();
        {
            let values = values_mut(&mut data);
            if let Some(mut layout) = source.layout().cloned() {
                if let Some(header) = layout.pointer_mut("/header/component/settings") {
                    ensure_object(header).insert("title".to_owned(), json!(title));
                }
                values.insert("layout".to_owned(), layout);
            }
            if let Some(mut theme) = source.theme().cloned() {
                let nav = site.theme().and_then(|t| t.get("globalNav")).cloned();
                if let Some(nav) = nav {
                    ensure_object(&mut theme).insert("globalNav".to_owned(), nav);
                }
                values.insert("theme".to_owned(), theme);
            }
        }
        ensure_success(
            save_data(&self.client, site.id(), &data)?,
            "write site data",
            site.id(),
        )?;
        *site.data_mut() = data;

        if copy_pages {
            for page in self.pages.for_site(source)? {
                if site.pages().iter().any(|p| p.title == page.title()) {
                    continue;
                }
                self.pages.clone_page(&page, site, None)?;
            }
        }
        Ok(())
    }

    /// Move a site to a new subdomain.
    ///
    /// Online: the old domain entries are removed and a new one registered.
    /// The parent initiative's url follows the site.
    pub fn update_subdomain(&self, site: &mut Site, subdomain: &str) -> Result<()> {
        let candidate = normalize_subdomain(subdomain);
        let url_key = self.org.is_online().then_some(self.org.url_key.as_str());
        check_length(&candidate, url_key)?;
        if site.subdomain() == Some(candidate.as_str()) {
            return Ok(());
        }
        let placement = self.place(&candidate)?;

        let mut item_patch = serde_json::Map::new();
        item_patch.insert("url".to_owned(), json!(placement.url));
        let mut domain_id = None;
        if self.org.is_online() {
            for record in self.client.domains_for_site(site.id())? {
                ensure_success(
                    self.client.delete(Endpoint::Domain, &record.id)?,
                    "delete domain",
                    &record.id,
                )?;
            }
            let client_id = match site.client_id() {
                Some(id) => id.to_owned(),
                None => self.client.register_app(site.id())?,
            };
            let record = self.client.register_domain(&self.registration(
                &placement.hostname,
                site.id(),
                site.title(),
                &client_id,
            ))?;
            domain_id = Some(record.id);
        } else {
            let mut keywords: Vec<String> = site
                .item()
                .type_keywords
                .iter()
                .filter(|k| !k.starts_with(SUBDOMAIN_KEYWORD))
                .cloned()
                .collect();
            keywords.push(format!("{SUBDOMAIN_KEYWORD}{}", placement.subdomain));
            item_patch.insert("typeKeywords".to_owned(), json!(keywords));
        }

        let ok = self
            .client
            .update(Endpoint::Item, site.id(), &Value::Object(item_patch.clone()))?;
        ensure_success(ok, "update site url", site.id())?;
        {
            let item = site.item_mut();
            item.url = Some(placement.url.clone());
            if let Some(keywords) = item_patch.get("typeKeywords") {
                item.type_keywords = serde_json::from_value(keywords.clone())?;
            }
        }

        let mut data = site.data().clone();
        {
            let values = values_mut(&mut data);
            values.insert("subdomain".to_owned(), json!(placement.subdomain));
            values.insert("defaultHostname".to_owned(), json!(placement.hostname));
            values.insert("internalUrl".to_owned(), json!(placement.hostname));
            if let Some(domain_id) = domain_id {
                values.insert("siteId".to_owned(), json!(domain_id));
            }
        }
        ensure_success(
            save_data(&self.client, site.id(), &data)?,
            "write site data",
            site.id(),
        )?;
        *site.data_mut() = data;

        if let Some(parent_id) = site.parent_initiative_id().map(str::to_owned) {
            match fetch(&self.client, &parent_id, Initiative::from_parts) {
                Ok(initiative) => {
                    let (ok, _) = merge_properties(
                        &self.client,
                        initiative.item(),
                        entry("url", placement.url.as_str()),
                        item_fields(&[("url", Some(placement.url.as_str()))]),
                    )?;
                    ensure_success(ok, "update initiative url", &parent_id)?;
                }
                Err(err) if err.is_not_found() => {
                    warn!(site = site.id(), initiative = %parent_id, "parent initiative missing")
                }
                Err(err) => return Err(err),
            }
        }
        info!(site = site.id(), subdomain = %placement.subdomain, "site subdomain updated");
        Ok(())
    }

    /// Drop unpublished `draft-*` resources so a layout write is not shadowed.
    fn discard_drafts(&self, site: &Site) -> Result<()> {
        for resource in self.client.item_resources(site.id())? {
            if resource.starts_with("draft-") {
                let ok = self.client.remove_item_resource(site.id(), &resource)?;
                ensure_success(ok, "remove draft", &resource)?;
            }
        }
        Ok(())
    }

    fn write_value(&self, site: &mut Site, key: &str, value: Value) -> Result<()> {
        self.discard_drafts(site)?;
        let mut data = site.data().clone();
        values_mut(&mut data).insert(key.to_owned(), value);
        ensure_success(
            save_data(&self.client, site.id(), &data)?,
            "write site data",
            site.id(),
        )?;
        *site.data_mut() = data;
        Ok(())
    }

    pub fn update_layout(&self, site: &mut Site, layout: Value) -> Result<()> {
        self.write_value(site, "layout", layout)
    }

    pub fn update_theme(&self, site: &mut Site, theme: Value) -> Result<()> {
        self.write_value(site, "theme", theme)
    }

    /// Add a group to the site's catalog. Already listed groups are ignored.
    pub fn add_catalog_group(&self, site: &mut Site, group_id: &str) -> Result<()> {
        let mut groups = site.catalog_groups();
        if groups.iter().any(|g| g == group_id) {
            return Ok(());
        }
        groups.push(group_id.to_owned());
        self.write_catalog(site, groups)
    }

    pub fn delete_catalog_group(&self, site: &mut Site, group_id: &str) -> Result<()> {
        let mut groups = site.catalog_groups();
        let before = groups.len();
        groups.retain(|g| g != group_id);
        if groups.len() == before {
            return Err(HubError::NotFound {
                endpoint: Endpoint::Group,
                id: group_id.to_owned(),
            });
        }
        self.write_catalog(site, groups)
    }

    fn write_catalog(&self, site: &mut Site, groups: Vec<String>) -> Result<()> {
        let mut updated = site.clone();
        updated.set_catalog_groups(&groups);
        ensure_success(
            save_data(&self.client, site.id(), updated.data())?,
            "write site catalog",
            site.id(),
        )?;
        *site = updated;
        Ok(())
    }

    /// Share items with the site's content group.
    pub fn add_content(&self, site: &Site, item_ids: &[&str]) -> Result<()> {
        let group = site.content_group_id().ok_or_else(|| {
            HubError::Precondition(format!("site {} has no content group", site.id()))
        })?;
        for item_id in item_ids {
            let refused = self.client.share_item(item_id, &Sharing::with_groups([group]))?;
            if !refused.is_empty() {
                return Err(HubError::rejected("share with content group", *item_id));
            }
        }
        Ok(())
    }

    /// Delete a site with its pages, domain entries and owned groups.
    ///
    /// Pages still linked to other sites survive. Groups are released only
    /// when the site does not belong to an initiative.
    pub fn delete(&self, mut site: Site) -> Result<()> {
        for page_ref in site.pages() {
            let mut page = match self.pages.get(&page_ref.id) {
                Ok(page) => page,
                Err(err) if err.is_not_found() => continue,
                Err(err) => return Err(err),
            };
            let ok = self.linker.unlink(&mut page, &mut site)?;
            ensure_success(ok, "unlink page", &page_ref.id)?;
        }

        if site.parent_initiative_id().is_none() {
            let owned = [site.content_group_id(), site.collab_group_id()];
            for group in owned.into_iter().flatten() {
                self.groups.release(group)?;
            }
        }

        if self.org.is_online() {
            for record in self.client.domains_for_site(site.id())? {
                ensure_success(
                    self.client.delete(Endpoint::Domain, &record.id)?,
                    "delete domain",
                    &record.id,
                )?;
            }
        }
        ensure_success(delete_item(&self.client, site.id())?, "delete site", site.id())?;
        info!(site = site.id(), "site deleted");
        Ok(())
    }
}

/// Groups a site item was created with.
fn item_groups(item: &Item) -> Result<GroupSet> {
    match (
        item.property_str("contentGroupId"),
        item.property_str("collaborationGroupId"),
    ) {
        (Some(content), Some(collaboration)) => Ok(GroupSet {
            content: content.to_owned(),
            collaboration: collaboration.to_owned(),
            followers: item.property_str("followersGroupId").map(str::to_owned),
        }),
        _ => Err(HubError::Precondition(format!(
            "site {} has no content and core team groups",
            item.id
        ))),
    }
}

fn parent_groups(initiative: &Initiative) -> Result<GroupSet> {
    match (initiative.content_group_id(), initiative.collab_group_id()) {
        (Some(content), Some(collaboration)) => Ok(GroupSet {
            content: content.to_owned(),
            collaboration: collaboration.to_owned(),
            followers: initiative.followers_group_id().map(str::to_owned),
        }),
        _ => Err(HubError::Precondition(format!(
            "initiative {} has no content and core team groups",
            initiative.id()
        ))),
    }
}
