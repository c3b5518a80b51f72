//! ---
//! hub_section: "15-testing-qa-runbook"
//! hub_subsection: "01-bootstrap"
//! hub_type: "source"
//! hub_scope: "code"
//! hub_description: "Test harness exports and ready-made organisation fixtures."
//! hub_version: "v0.1.0"
//! hub_owner: "tbd"
//! ---
//! In-memory stand-in for the hub platform.
//!
//! Tests build a [`FakePlatform`] from one of the organisation fixtures,
//! wrap it in a [`ResourceClient`] with [`client_for`], and assert on the
//! recorded calls and the stored documents afterwards.

mod platform;

use std::sync::Arc;

use r_hub_client::{ApiRoots, OrgContext, ResourceClient};
use r_hub_common::HubEnvironment;
use serde_json::{json, Value};
use url::Url;

pub use platform::{FakePlatform, RecordedCall};

/// Portal URL answered by the online fixtures.
pub const ONLINE_PORTAL: &str = "https://cityx.maps.arcgis.com";
/// Portal URL answered by the enterprise fixture.
pub const ENTERPRISE_PORTAL: &str = "https://gis.example.org/portal";
/// URL key of the online fixtures.
pub const URL_KEY: &str = "cityx";
/// Signed-in user of every fixture.
pub const USERNAME: &str = "hub-admin";

fn portal_self(is_portal: bool, premium: bool) -> Value {
    json!({
        "id": "org0001",
        "urlKey": if is_portal { Value::Null } else { json!(URL_KEY) },
        "name": "City X",
        "isPortal": is_portal,
        "subscriptionInfo": {"hubSettings": {"enabled": premium}},
        "user": {
            "username": USERNAME,
            "fullName": "Hub Admin",
            "email": "hub-admin@cityx.invalid",
            "role": "org_admin",
            "culture": "en-us"
        },
        "defaultBasemap": {"title": "Topographic"},
        "defaultExtent": {"xmin": -1, "ymin": -1, "xmax": 1, "ymax": 1},
    })
}

/// ArcGIS Online organisation with a premium hub.
pub fn premium_online() -> Arc<FakePlatform> {
    Arc::new(FakePlatform::with_portal_self(portal_self(false, true)))
}

/// ArcGIS Online organisation with a basic hub.
pub fn basic_online() -> Arc<FakePlatform> {
    Arc::new(FakePlatform::with_portal_self(portal_self(false, false)))
}

/// Enterprise portal.
pub fn enterprise() -> Arc<FakePlatform> {
    Arc::new(FakePlatform::with_portal_self(portal_self(true, false)))
}

/// Resource client bound to `platform`, acting as [`USERNAME`].
pub fn client_for(platform: &Arc<FakePlatform>, portal: &str) -> Arc<ResourceClient> {
    let portal = Url::parse(portal).unwrap_or_else(|err| panic!("fixture portal url: {err}"));
    let roots = ApiRoots::new(&portal, HubEnvironment::Prod)
        .unwrap_or_else(|err| panic!("fixture api roots: {err}"));
    Arc::new(ResourceClient::new(platform.clone(), roots, USERNAME))
}

/// Organisation context as the client would resolve it, without recording a call.
pub fn org_for(platform: &Arc<FakePlatform>, portal: &str) -> Arc<OrgContext> {
    let client = client_for(platform, portal);
    let org = client
        .org_context()
        .unwrap_or_else(|err| panic!("fixture org context: {err}"));
    platform.clear_calls();
    Arc::new(org)
}

#[cfg(test)]
mod tests {
    use super::*;
    use r_hub_client::{Endpoint, HubError, Method};

    #[test]
    fn protected_items_refuse_deletion() {
        let platform = premium_online();
        let client = client_for(&platform, ONLINE_PORTAL);
        let id = client
            .create(Endpoint::Item, &json!({"title": "t", "typeKeywords": ["hubSite"]}))
            .unwrap();
        assert!(client.set_protected(Endpoint::Item, &id, true).unwrap());
        assert!(!client.delete(Endpoint::Item, &id).unwrap());
        assert!(client.set_protected(Endpoint::Item, &id, false).unwrap());
        assert!(client.delete(Endpoint::Item, &id).unwrap());
        assert!(platform.item(&id).is_none());
    }

    #[test]
    fn injected_failure_is_consumed_once() {
        let platform = premium_online();
        let client = client_for(&platform, ONLINE_PORTAL);
        platform.fail_once(Method::Post, "/community/groups", 500);
        let err = client
            .create(Endpoint::Group, &json!({"title": "g"}))
            .unwrap_err();
        assert!(matches!(err, HubError::Remote { status: 500, .. }));
        assert!(client.create(Endpoint::Group, &json!({"title": "g"})).is_ok());
        assert_eq!(platform.count(Method::Post, "/community/groups"), 2);
    }

    #[test]
    fn search_filters_on_keywords_and_title() {
        let platform = premium_online();
        platform.seed_item(json!({"title": "Vision Zero", "typeKeywords": ["hubInitiative"]}));
        platform.seed_item(json!({"title": "Vision Zero Site", "typeKeywords": ["hubSite"]}));
        let client = client_for(&platform, ONLINE_PORTAL);
        let found = client
            .search_items("typekeywords:hubInitiative AND title:vision", 10)
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "Vision Zero");
    }

    #[test]
    fn enterprise_paths_are_routed() {
        let platform = enterprise();
        let org = org_for(&platform, ENTERPRISE_PORTAL);
        assert!(!org.is_online());
        assert!(platform.calls().is_empty());
    }
}
