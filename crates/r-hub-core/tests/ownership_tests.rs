//! ---
//! hub_section: "15-testing-qa-runbook"
//! hub_subsection: "integration-tests"
//! hub_type: "source"
//! hub_scope: "code"
//! hub_description: "Ownership transfer, followers and site catalog search."
//! hub_version: "v0.0.0-prealpha"
//! hub_owner: "tbd"
//! ---
use std::sync::Arc;

use r_hub_client::{HubError, Method, Sharing};
use r_hub_core::{GroupRole, GroupScope, Hub, HubSettings, Initiative, NewInitiative};
use r_hub_testharness::{
    basic_online, client_for, org_for, premium_online, FakePlatform, ONLINE_PORTAL, USERNAME,
};
use serde_json::json;

fn hub_for(platform: &Arc<FakePlatform>) -> Hub {
    Hub::from_parts(
        client_for(platform, ONLINE_PORTAL),
        org_for(platform, ONLINE_PORTAL),
        HubSettings::default(),
    )
}

fn vision_zero(hub: &Hub) -> Initiative {
    hub.initiatives()
        .add(NewInitiative::titled("Vision Zero"))
        .expect("initiative provisioned")
}

fn owner(platform: &FakePlatform, item_id: &str) -> String {
    platform.item(item_id).expect("item exists")["owner"]
        .as_str()
        .unwrap_or_default()
        .to_owned()
}

fn group_owner(platform: &FakePlatform, group_id: &str) -> String {
    platform.group(group_id).expect("group exists")["owner"]
        .as_str()
        .unwrap_or_default()
        .to_owned()
}

#[test]
fn plain_user_receives_items_one_by_one() {
    let platform = premium_online();
    let hub = hub_for(&platform);
    platform.seed_user("ana", "org_user");
    let initiative = vision_zero(&hub);
    let site_id = initiative.site_id().unwrap().to_owned();
    let mut site = hub.sites().get(&site_id).unwrap();
    let page = hub.pages().add("About", &mut site).expect("page added");

    let moved = hub
        .initiatives()
        .reassign_to(&initiative, "ana")
        .expect("initiative reassigned");

    assert_eq!(moved.item().owner, "ana");
    assert_eq!(owner(&platform, &site_id), "ana");
    assert_eq!(owner(&platform, page.id()), "ana");
    assert_eq!(group_owner(&platform, initiative.content_group_id().unwrap()), "ana");
    assert_eq!(group_owner(&platform, initiative.followers_group_id().unwrap()), "ana");
    assert_eq!(
        group_owner(&platform, initiative.collab_group_id().unwrap()),
        USERNAME,
        "the core team stays with an administrator"
    );
}

#[test]
fn administrator_takes_the_core_team_and_its_content() {
    let platform = premium_online();
    let hub = hub_for(&platform);
    platform.seed_user("lead", "org_admin");
    let initiative = vision_zero(&hub);
    let core_team = initiative.collab_group_id().unwrap().to_owned();
    let site_id = initiative.site_id().unwrap().to_owned();

    hub.initiatives()
        .reassign_to(&initiative, "lead")
        .expect("initiative reassigned");

    assert_eq!(group_owner(&platform, &core_team), "lead");
    assert!(platform.members(&core_team).contains(&"lead".to_owned()));
    for item_id in [initiative.id(), site_id.as_str()] {
        assert_eq!(owner(&platform, item_id), "lead");
        assert!(
            platform.is_shared_with(item_id, &core_team),
            "{item_id} shared back with the core team"
        );
    }
    assert_eq!(group_owner(&platform, initiative.content_group_id().unwrap()), "lead");
}

#[test]
fn reassign_requires_an_administrator() {
    let platform = premium_online();
    let setup = hub_for(&platform);
    let initiative = vision_zero(&setup);
    platform.seed_user("ana", "org_user");

    let mut org = (*org_for(&platform, ONLINE_PORTAL)).clone();
    org.user.role = Some("org_publisher".into());
    let hub = Hub::from_parts(
        client_for(&platform, ONLINE_PORTAL),
        Arc::new(org),
        HubSettings::default(),
    );

    let err = hub
        .initiatives()
        .reassign_to(&initiative, "ana")
        .expect_err("publishers cannot reassign");
    assert!(matches!(err, HubError::Precondition(_)));
    assert_eq!(platform.count_matching(Method::Post, "/reassign"), 0);
}

#[test]
fn standalone_site_takes_its_content_group_along() {
    let platform = basic_online();
    let hub = hub_for(&platform);
    platform.seed_user("ana", "org_user");
    let site = hub.sites().add_site("Parks", None, None).expect("site created");

    let moved = hub.sites().reassign_to(&site, "ana").expect("site reassigned");

    assert_eq!(moved.item().owner, "ana");
    assert_eq!(group_owner(&platform, site.content_group_id().unwrap()), "ana");
    assert_eq!(group_owner(&platform, site.collab_group_id().unwrap()), USERNAME);
}

#[test]
fn followers_are_the_followers_group_members() {
    let platform = premium_online();
    let hub = hub_for(&platform);
    let initiative = vision_zero(&hub);
    platform.seed_member(initiative.followers_group_id().unwrap(), "fan");

    let followers = hub
        .initiatives()
        .followers(&initiative)
        .expect("followers listed");
    assert_eq!(followers.owner, USERNAME);
    assert_eq!(followers.users, vec!["fan".to_owned()]);

    let basic = basic_online();
    let basic_hub = hub_for(&basic);
    let parks = basic_hub
        .initiatives()
        .add(NewInitiative::titled("Parks"))
        .expect("initiative provisioned");
    let err = basic_hub
        .initiatives()
        .followers(&parks)
        .expect_err("basic hubs have no followers group");
    assert!(matches!(err, HubError::Precondition(_)));
}

#[test]
fn catalog_search_filters_by_title_and_type() {
    let platform = basic_online();
    let hub = hub_for(&platform);
    let mut site = hub.sites().add_site("Parks", None, None).expect("site created");
    let seed = |title: &str, item_type: &str| {
        platform.seed_item(json!({
            "title": title,
            "type": item_type,
            "owner": USERNAME,
            "typeKeywords": [],
            "tags": []
        }))
    };
    let school_map = seed("School Map", "Web Map");
    let school_survey = seed("School Survey", "Form");
    let roads = seed("Roads", "Web Map");
    hub.sites()
        .add_content(&site, &[school_map.as_str(), school_survey.as_str(), roads.as_str()])
        .expect("content shared");

    let extra = hub
        .groups()
        .create_group(GroupScope::HubSite, GroupRole::Content, "Schools")
        .expect("group created");
    hub.client()
        .share_item(&school_map, &Sharing::with_groups([extra.as_str()]))
        .expect("shared with second group");
    hub.sites()
        .add_catalog_group(&mut site, &extra)
        .expect("catalog group added");

    let all = hub.sites().search_catalog(&site, None, None).expect("search");
    assert_eq!(all.len(), 3, "an item in two catalog groups is listed once");

    let maps = hub
        .sites()
        .search_catalog(&site, Some("SCHOOL"), Some("Web Map"))
        .expect("search");
    assert_eq!(maps.len(), 1);
    assert_eq!(maps[0].id, school_map);
}
