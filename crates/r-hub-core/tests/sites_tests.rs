//! ---
//! hub_section: "15-testing-qa-runbook"
//! hub_subsection: "integration-tests"
//! hub_type: "source"
//! hub_scope: "code"
//! hub_description: "Site provisioning, subdomains, pages and reference links."
//! hub_version: "v0.0.0-prealpha"
//! hub_owner: "tbd"
//! ---
use std::sync::Arc;

use r_hub_client::{HubError, Method};
use r_hub_core::{Hub, HubSettings, SearchFilter};
use r_hub_testharness::{
    basic_online, client_for, enterprise, org_for, premium_online, FakePlatform,
    ENTERPRISE_PORTAL, ONLINE_PORTAL,
};
use serde_json::json;

fn hub_for(platform: &Arc<FakePlatform>, portal: &str) -> Hub {
    Hub::from_parts(
        client_for(platform, portal),
        org_for(platform, portal),
        HubSettings::default(),
    )
}

#[test]
fn basic_site_gets_its_own_groups_and_domain() {
    let platform = basic_online();
    let hub = hub_for(&platform, ONLINE_PORTAL);

    let site = hub
        .sites()
        .add_site("Parks and Trails", None, None)
        .expect("site created");

    assert_eq!(site.subdomain(), Some("parks-and-trails"));
    assert_eq!(site.url(), Some("https://parks-and-trails-cityx.hub.arcgis.com"));
    assert_eq!(platform.count(Method::Post, "/community/groups"), 2);
    assert!(site.parent_initiative_id().is_none());

    let domain = platform
        .domain_by_host("parks-and-trails-cityx.hub.arcgis.com")
        .expect("domain registered");
    assert_eq!(domain["siteId"], site.id());
    assert_eq!(site.client_id(), domain["clientKey"].as_str());
    assert_eq!(site.catalog_groups(), vec![site.content_group_id().unwrap().to_owned()]);
    assert!(platform.is_shared_with(site.id(), site.collab_group_id().unwrap()));
}

#[test]
fn taken_subdomain_is_bumped_once() {
    let platform = basic_online();
    let hub = hub_for(&platform, ONLINE_PORTAL);
    platform.register_domain("foo-cityx.hub.arcgis.com", "someone-else");

    let site = hub.sites().add_site("Foo", None, None).expect("site created");

    assert_eq!(site.subdomain(), Some("foo1"));
    assert!(platform.domain_by_host("foo1-cityx.hub.arcgis.com").is_some());
}

#[test]
fn second_collision_is_domain_unavailable() {
    let platform = basic_online();
    let hub = hub_for(&platform, ONLINE_PORTAL);
    platform.register_domain("foo-cityx.hub.arcgis.com", "a");
    platform.register_domain("foo1-cityx.hub.arcgis.com", "b");

    let err = hub
        .sites()
        .add_site("Foo", None, None)
        .expect_err("both candidates taken");
    assert!(
        matches!(err, HubError::DomainUnavailable(ref host) if host == "foo1-cityx.hub.arcgis.com")
    );
    assert!(platform.item_ids().is_empty());
}

#[test]
fn long_subdomain_fails_before_any_call() {
    let platform = basic_online();
    let hub = hub_for(&platform, ONLINE_PORTAL);

    let err = hub
        .sites()
        .add_site("Title", Some(&"x".repeat(58)), None)
        .expect_err("label too long");
    assert!(matches!(err, HubError::Precondition(_)));
    assert!(platform.calls().is_empty());
}

#[test]
fn premium_sites_need_an_initiative() {
    let platform = premium_online();
    let hub = hub_for(&platform, ONLINE_PORTAL);

    let err = hub
        .sites()
        .add_site("Orphan", None, None)
        .expect_err("premium sites belong to initiatives");
    assert!(matches!(err, HubError::Precondition(_)));
    assert!(platform.calls().is_empty());
}

#[test]
fn site_is_found_by_hostname_or_url() {
    let platform = basic_online();
    let hub = hub_for(&platform, ONLINE_PORTAL);
    let site = hub.sites().add_site("Parks", None, None).expect("site created");

    let by_host = hub
        .sites()
        .get_by_domain("parks-cityx.hub.arcgis.com")
        .expect("found by hostname");
    let by_url = hub
        .sites()
        .get_by_domain("https://parks-cityx.hub.arcgis.com/pages/about")
        .expect("found by url");
    assert_eq!(by_host.id(), site.id());
    assert_eq!(by_url.id(), site.id());

    let missing = hub
        .sites()
        .get_by_domain("nowhere-cityx.hub.arcgis.com")
        .expect_err("unknown hostname");
    assert!(missing.is_not_found());
}

#[test]
fn enterprise_site_uses_subdomain_keyword() {
    let platform = enterprise();
    let hub = hub_for(&platform, ENTERPRISE_PORTAL);

    let site = hub
        .sites()
        .add_site("Open Data", None, None)
        .expect("site created");

    assert_eq!(site.item().item_type, "Site Application");
    assert!(site.item().has_keyword("hubsubdomain|open-data"));
    assert_eq!(
        site.url(),
        Some("https://gis.example.org/portal/apps/sites/#/open-data")
    );
    assert_eq!(site.client_id(), Some("arcgisonline"));
    assert_eq!(platform.domain_count(), 0);

    let found = hub
        .sites()
        .get_by_domain("https://gis.example.org/portal/apps/sites/#/open-data")
        .expect("found by enterprise url");
    assert_eq!(found.id(), site.id());

    let second = hub
        .sites()
        .add_site("Open Data", None, None)
        .expect("second site created");
    assert_eq!(second.subdomain(), Some("open-data1"));
}

#[test]
fn enterprise_site_item_is_finished_from_its_keyword() {
    let platform = enterprise();
    let hub = hub_for(&platform, ENTERPRISE_PORTAL);

    let site_id = hub
        .sites()
        .create_site_item("Open Data", None, None)
        .expect("item created");
    assert!(hub.sites().get(&site_id).unwrap().subdomain().is_none());

    let site = hub.sites().finish_site(&site_id).expect("site finished");
    assert_eq!(site.subdomain(), Some("open-data"));
    assert_eq!(site.client_id(), Some("arcgisonline"));
    assert_eq!(platform.item(&site_id).unwrap()["protected"], true);
}

#[test]
fn finishing_a_site_again_keeps_one_domain_entry() {
    let platform = basic_online();
    let hub = hub_for(&platform, ONLINE_PORTAL);
    let site = hub.sites().add_site("Parks", None, None).expect("site created");

    let again = hub.sites().finish_site(site.id()).expect("finish repeated");

    assert_eq!(platform.domain_count(), 1);
    assert_eq!(platform.count(Method::Post, "/api/v3/domains"), 1);
    assert_eq!(again.domain_site_id(), site.domain_site_id());
    assert_eq!(again.client_id(), site.client_id());
    assert_eq!(again.subdomain(), Some("parks"));
}

#[test]
fn subdomain_update_moves_the_domain() {
    let platform = basic_online();
    let hub = hub_for(&platform, ONLINE_PORTAL);
    let mut site = hub.sites().add_site("Parks", None, None).expect("site created");

    hub.sites()
        .update_subdomain(&mut site, "green-spaces")
        .expect("subdomain updated");

    assert!(platform.domain_by_host("parks-cityx.hub.arcgis.com").is_none());
    assert!(platform
        .domain_by_host("green-spaces-cityx.hub.arcgis.com")
        .is_some());
    assert_eq!(platform.domain_count(), 1);
    assert_eq!(site.subdomain(), Some("green-spaces"));
    let stored = hub.sites().get(site.id()).expect("site readable");
    assert_eq!(stored.url(), Some("https://green-spaces-cityx.hub.arcgis.com"));
}

#[test]
fn layout_update_discards_drafts() {
    let platform = basic_online();
    let hub = hub_for(&platform, ONLINE_PORTAL);
    let mut site = hub.sites().add_site("Parks", None, None).expect("site created");
    platform.seed_resource(site.id(), "draft-1700000000.json");
    platform.seed_resource(site.id(), "logo.png");

    hub.sites()
        .update_layout(&mut site, json!({"sections": []}))
        .expect("layout written");

    assert_eq!(platform.count(Method::Post, "/removeResources"), 1);
    let stored = hub.sites().get(site.id()).expect("site readable");
    assert_eq!(stored.layout(), Some(&json!({"sections": []})));
}

#[test]
fn catalog_groups_are_added_once_and_removed() {
    let platform = basic_online();
    let hub = hub_for(&platform, ONLINE_PORTAL);
    let mut site = hub.sites().add_site("Parks", None, None).expect("site created");

    hub.sites().add_catalog_group(&mut site, "extra").unwrap();
    hub.sites().add_catalog_group(&mut site, "extra").unwrap();
    assert_eq!(site.catalog_groups().len(), 2);

    hub.sites().delete_catalog_group(&mut site, "extra").unwrap();
    assert_eq!(site.catalog_groups().len(), 1);
    let err = hub
        .sites()
        .delete_catalog_group(&mut site, "extra")
        .expect_err("group no longer listed");
    assert!(err.is_not_found());
}

#[test]
fn site_delete_removes_domain_groups_and_orphan_pages() {
    let platform = basic_online();
    let hub = hub_for(&platform, ONLINE_PORTAL);
    let mut site = hub.sites().add_site("Parks", None, None).expect("site created");
    hub.pages().add("About", &mut site).expect("page added");

    hub.sites().delete(site).expect("site deleted");

    assert!(platform.item_ids().is_empty(), "site and its only page are gone");
    assert!(platform.group_ids().is_empty());
    assert_eq!(platform.domain_count(), 0);
}

#[test]
fn link_and_unlink_keep_both_sides_consistent() {
    let platform = basic_online();
    let hub = hub_for(&platform, ONLINE_PORTAL);
    let mut alpha = hub.sites().add_site("Alpha", None, None).expect("alpha");
    let mut beta = hub.sites().add_site("Beta", None, None).expect("beta");
    let mut page = hub.pages().add("About Us", &mut alpha).expect("page added");

    assert!(hub.linker().link(&mut page, &mut beta, Some("Who We Are")).unwrap());
    assert!(hub.linker().link(&mut page, &mut beta, None).unwrap());
    assert_eq!(beta.pages().len(), 1, "linking twice does not duplicate");
    assert_eq!(page.sites().len(), 2);

    assert!(hub.linker().unlink(&mut page, &mut beta).unwrap());
    assert!(beta.pages().is_empty());
    let stored = hub.pages().get(page.id()).expect("page still exists");
    assert_eq!(stored.sites().len(), 1);
    assert_eq!(stored.sites()[0].id, alpha.id());
    let stored_beta = hub.sites().get(beta.id()).expect("beta readable");
    assert!(stored_beta.pages().is_empty());

    assert!(hub.linker().unlink(&mut page, &mut alpha).unwrap());
    assert!(platform.item(page.id()).is_none(), "page without sites is deleted");
}

#[test]
fn page_slug_change_is_written_to_sites() {
    let platform = basic_online();
    let hub = hub_for(&platform, ONLINE_PORTAL);
    let mut site = hub.sites().add_site("Parks", None, None).expect("site created");
    let mut page = hub.pages().add("About Us", &mut site).expect("page added");
    assert_eq!(site.pages()[0].slug, "about-us");

    let mut changes = serde_json::Map::new();
    changes.insert("title".into(), json!("Our Mission"));
    hub.pages()
        .update(&mut page, changes, Some("mission"))
        .expect("page updated");

    let stored = hub.sites().get(site.id()).expect("site readable");
    assert_eq!(stored.pages()[0].slug, "mission");
    assert_eq!(stored.pages()[0].title, "Our Mission");
    assert_eq!(page.slug(), "mission");
}

#[test]
fn enterprise_pages_are_site_pages() {
    let platform = enterprise();
    let hub = hub_for(&platform, ENTERPRISE_PORTAL);
    let mut site = hub.sites().add_site("Open Data", None, None).expect("site created");

    let page = hub.pages().add("Contact", &mut site).expect("page added");
    assert_eq!(page.item().item_type, "Site Page");
    assert_eq!(platform.item(page.id()).unwrap()["protected"], true);

    let found = hub
        .pages()
        .search(&SearchFilter::title("Contact"), 10)
        .expect("search succeeds");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id(), page.id());
}

#[test]
fn page_delete_removes_it_from_every_site() {
    let platform = basic_online();
    let hub = hub_for(&platform, ONLINE_PORTAL);
    let mut alpha = hub.sites().add_site("Alpha", None, None).expect("alpha");
    let mut beta = hub.sites().add_site("Beta", None, None).expect("beta");
    let mut page = hub.pages().add("FAQ", &mut alpha).expect("page added");
    hub.pages().link(&mut page, &mut beta, None).unwrap();
    let page_id = page.id().to_owned();

    hub.pages().delete(page).expect("page deleted");

    assert!(platform.item(&page_id).is_none());
    for site in [&alpha, &beta] {
        let stored = hub.sites().get(site.id()).expect("site readable");
        assert!(stored.pages().is_empty());
    }
}

#[test]
fn link_then_unlink_restores_both_documents() {
    let platform = basic_online();
    let hub = hub_for(&platform, ONLINE_PORTAL);
    let mut alpha = hub.sites().add_site("Alpha", None, None).expect("alpha");
    let mut beta = hub.sites().add_site("Beta", None, None).expect("beta");
    let mut page = hub.pages().add("Contact", &mut alpha).expect("page added");
    let page_before = platform.data(page.id()).expect("page data");
    let beta_before = platform.data(beta.id()).expect("site data");

    hub.linker().link(&mut page, &mut beta, None).unwrap();
    hub.linker().unlink(&mut page, &mut beta).unwrap();

    let page_after = platform.data(page.id()).expect("page data");
    let beta_after = platform.data(beta.id()).expect("site data");
    assert_eq!(page_after["values"]["sites"], page_before["values"]["sites"]);
    assert_eq!(beta_after["values"]["pages"], beta_before["values"]["pages"]);
}
