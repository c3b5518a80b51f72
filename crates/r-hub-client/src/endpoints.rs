//! ---
//! hub_section: "05-networking-external-interfaces"
//! hub_subsection: "module"
//! hub_type: "source"
//! hub_scope: "code"
//! hub_description: "Endpoint discriminants and URL construction for the hub APIs."
//! hub_version: "v0.0.0-prealpha"
//! hub_owner: "tbd"
//! ---
use r_hub_common::HubEnvironment;
use strum::Display;
use url::Url;

use crate::error::Result;

/// Resource families reachable through the uniform CRUD contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Endpoint {
    /// Portal content item (metadata and properties).
    Item,
    /// The JSON data document stored with an item.
    ItemData,
    /// Portal group.
    Group,
    /// Hub domain registry entry, keyed by hostname on read and id on delete.
    Domain,
    Post,
    Channel,
    Reaction,
}

/// Base URLs of the three APIs a hub client talks to.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRoots {
    portal: Url,
    rest: Url,
    hub: Url,
    discussions: Url,
}

impl ApiRoots {
    /// Derive every root from the portal URL and the hub environment.
    pub fn new(portal_url: &Url, environment: HubEnvironment) -> Result<Self> {
        let portal = with_trailing_slash(portal_url.clone());
        let rest = portal.join("sharing/rest/")?;
        let hub = Url::parse(&format!("https://{}/", environment.host()))?;
        let discussions = hub.join("api/discussions/v1/")?;
        Ok(Self {
            portal,
            rest,
            hub,
            discussions,
        })
    }

    /// Portal root, always ending in `/`.
    pub fn portal(&self) -> &Url {
        &self.portal
    }

    pub fn hub(&self) -> &Url {
        &self.hub
    }

    /// Collection URL for an endpoint (target of creates and listings).
    pub fn collection(&self, endpoint: Endpoint) -> Result<Url> {
        match endpoint {
            Endpoint::Item | Endpoint::ItemData => self.rest_path(&["content", "items"]),
            Endpoint::Group => self.rest_path(&["community", "groups"]),
            Endpoint::Domain => self.hub_path(&["api", "v3", "domains"]),
            Endpoint::Post => self.discussions_path(&["posts"]),
            Endpoint::Channel => self.discussions_path(&["channels"]),
            Endpoint::Reaction => self.discussions_path(&["reactions"]),
        }
    }

    /// URL of one keyed resource.
    pub fn resource(&self, endpoint: Endpoint, id: &str) -> Result<Url> {
        let collection = self.collection(endpoint)?;
        match endpoint {
            Endpoint::ItemData => push_segments(collection, &[id, "data"]),
            _ => push_segments(collection, &[id]),
        }
    }

    /// URL of an action on a keyed resource, e.g. `content/items/{id}/share`.
    pub fn action(&self, endpoint: Endpoint, id: &str, action: &str) -> Result<Url> {
        push_segments(self.collection(endpoint)?, &[id, action])
    }

    /// Path below `{portal}/sharing/rest/`.
    pub fn rest_path(&self, segments: &[&str]) -> Result<Url> {
        push_segments(self.rest.clone(), segments)
    }

    /// Path below the hub API host.
    pub fn hub_path(&self, segments: &[&str]) -> Result<Url> {
        push_segments(self.hub.clone(), segments)
    }

    fn discussions_path(&self, segments: &[&str]) -> Result<Url> {
        push_segments(self.discussions.clone(), segments)
    }

    /// Feature layer holding the organisation's hub events.
    pub fn events_layer(&self, org_id: &str) -> Result<Url> {
        self.hub_path(&[
            "api",
            "v3",
            "events",
            org_id,
            "Hub Events",
            "FeatureServer",
            "0",
        ])
    }

    /// Public URL of an item resource file (banner images, icons).
    pub fn item_resource_url(&self, item_id: &str, file_name: &str) -> Result<Url> {
        self.rest_path(&["content", "items", item_id, "resources", file_name])
    }
}

fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

/// Append percent-encoded path segments to `url`.
pub(crate) fn push_segments(mut url: Url, segments: &[&str]) -> Result<Url> {
    {
        let mut path = url
            .path_segments_mut()
            .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?;
        path.pop_if_empty();
        for segment in segments {
            path.push(segment);
        }
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roots(portal: &str) -> ApiRoots {
        ApiRoots::new(&Url::parse(portal).unwrap(), HubEnvironment::Prod).unwrap()
    }

    #[test]
    fn item_urls_hang_off_sharing_rest() {
        let roots = roots("https://cityx.maps.arcgis.com");
        assert_eq!(
            roots.resource(Endpoint::Item, "abc").unwrap().as_str(),
            "https://cityx.maps.arcgis.com/sharing/rest/content/items/abc"
        );
        assert_eq!(
            roots.resource(Endpoint::ItemData, "abc").unwrap().as_str(),
            "https://cityx.maps.arcgis.com/sharing/rest/content/items/abc/data"
        );
        assert_eq!(
            roots.action(Endpoint::Group, "g1", "protect").unwrap().as_str(),
            "https://cityx.maps.arcgis.com/sharing/rest/community/groups/g1/protect"
        );
    }

    #[test]
    fn enterprise_web_adaptor_path_is_preserved() {
        let roots = roots("https://gis.example.org/portal");
        assert_eq!(
            roots.collection(Endpoint::Item).unwrap().as_str(),
            "https://gis.example.org/portal/sharing/rest/content/items"
        );
    }

    #[test]
    fn hub_and_discussion_urls_follow_environment() {
        let roots = ApiRoots::new(
            &Url::parse("https://cityx.mapsdevext.arcgis.com").unwrap(),
            HubEnvironment::Dev,
        )
        .unwrap();
        assert_eq!(
            roots.collection(Endpoint::Post).unwrap().as_str(),
            "https://hubdev.arcgis.com/api/discussions/v1/posts"
        );
        assert_eq!(
            roots
                .resource(Endpoint::Domain, "vz-cityx.hubdev.arcgis.com")
                .unwrap()
                .as_str(),
            "https://hubdev.arcgis.com/api/v3/domains/vz-cityx.hubdev.arcgis.com"
        );
        assert_eq!(
            roots.events_layer("org1").unwrap().as_str(),
            "https://hubdev.arcgis.com/api/v3/events/org1/Hub%20Events/FeatureServer/0"
        );
    }
}
