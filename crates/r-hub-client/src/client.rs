//! ---
//! hub_section: "05-networking-external-interfaces"
//! hub_subsection: "module"
//! hub_type: "source"
//! hub_scope: "code"
//! hub_description: "Uniform create/get/update/delete over the hub REST endpoints."
//! hub_version: "v0.0.0-prealpha"
//! hub_owner: "tbd"
//! ---
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;
use url::Url;

use crate::endpoints::{push_segments, ApiRoots, Endpoint};
use crate::error::{HubError, Result};
use crate::item::{Item, ItemDraft};
use crate::org::{OrgContext, UserInfo};
use crate::transport::{HubRequest, HubResponse, Transport};

/// Sharing request for an item.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Sharing {
    pub everyone: bool,
    pub org: bool,
    pub groups: Vec<String>,
    /// Lets members of the target groups edit the item.
    pub confirm_item_control: bool,
}

impl Sharing {
    pub fn with_groups<I, S>(groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            groups: groups.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }
}

/// Domain registry entry mapping a hostname to a site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainRecord {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub hostname: String,
    pub site_id: String,
    #[serde(default)]
    pub site_title: Option<String>,
    #[serde(default)]
    pub client_key: Option<String>,
    #[serde(default)]
    pub org_id: Option<String>,
    #[serde(default)]
    pub ssl_only: bool,
}

/// Membership of a portal group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMembers {
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub admins: Vec<String>,
    #[serde(default)]
    pub users: Vec<String>,
}

impl GroupMembers {
    pub fn contains(&self, username: &str) -> bool {
        self.owner == username
            || self.admins.iter().any(|u| u == username)
            || self.users.iter().any(|u| u == username)
    }
}

/// Body of a domain registration.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainRegistration {
    pub hostname: String,
    pub site_id: String,
    pub site_title: String,
    pub org_id: String,
    pub org_key: String,
    pub org_title: String,
    pub ssl_only: bool,
    pub client_key: String,
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, found {other}"
        ))),
    }
}

/// The single point through which every manager reaches the platform.
///
/// Status handling follows one rule: an error status or an `error` object in
/// the body is an `Err`, while a well-formed answer carrying `success: false`
/// surfaces as `Ok(false)` from `update`/`delete`.
pub struct ResourceClient {
    transport: Arc<dyn Transport>,
    roots: ApiRoots,
    owner: String,
}

impl ResourceClient {
    pub fn new(transport: Arc<dyn Transport>, roots: ApiRoots, owner: impl Into<String>) -> Self {
        Self {
            transport,
            roots,
            owner: owner.into(),
        }
    }

    pub fn roots(&self) -> &ApiRoots {
        &self.roots
    }

    /// Username new items are created for.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Re-target the client at another owner once the signed-in user is known.
    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = owner.into();
        self
    }

    fn send(&self, request: HubRequest) -> Result<Value> {
        debug!(method = %request.method, url = %request.url, "hub request");
        let response = self.transport.execute(request)?;
        check(response)
    }

    /// Create a resource and return its id.
    pub fn create(&self, endpoint: Endpoint, payload: &Value) -> Result<String> {
        let mut payload = payload.clone();
        if endpoint == Endpoint::Item {
            if let Some(map) = payload.as_object_mut() {
                map.entry("owner")
                    .or_insert_with(|| Value::String(self.owner.clone()));
            }
        }
        let url = self.roots.collection(endpoint)?;
        let body = self.send(HubRequest::post(url, payload))?;
        if !success_flag(&body) {
            return Err(HubError::rejected("create", endpoint.to_string()));
        }
        extract_id(&body).ok_or_else(|| {
            HubError::UnexpectedResponse(format!("{endpoint} create returned no id: {body}"))
        })
    }

    /// Fetch a resource by id. A missing resource is [`HubError::NotFound`].
    pub fn get(&self, endpoint: Endpoint, id: &str) -> Result<Value> {
        let url = self.roots.resource(endpoint, id)?;
        match self.send(HubRequest::get(url)) {
            Err(HubError::Remote { status: 404, .. }) => Err(HubError::NotFound {
                endpoint,
                id: id.to_owned(),
            }),
            other => other,
        }
    }

    /// Partial update; for [`Endpoint::ItemData`] the patch replaces the document.
    pub fn update(&self, endpoint: Endpoint, id: &str, patch: &Value) -> Result<bool> {
        let url = self.roots.resource(endpoint, id)?;
        let body = self.send(HubRequest::patch(url, patch.clone()))?;
        Ok(success_flag(&body))
    }

    pub fn delete(&self, endpoint: Endpoint, id: &str) -> Result<bool> {
        let url = self.roots.resource(endpoint, id)?;
        let body = self.send(HubRequest::delete(url))?;
        Ok(success_flag(&body))
    }

    /// List a collection. Results are read from `items` or `results`.
    pub fn list(&self, endpoint: Endpoint, query: &[(&str, String)]) -> Result<Vec<Value>> {
        let mut url = self.roots.collection(endpoint)?;
        append_query(&mut url, query);
        let body = self.send(HubRequest::get(url))?;
        Ok(collection_entries(&body, &["items", "results"]))
    }

    /// Typed item fetch.
    pub fn get_item(&self, id: &str) -> Result<Item> {
        let value = self.get(Endpoint::Item, id)?;
        Ok(serde_json::from_value(value)?)
    }

    /// Data document of an item; an empty document reads as `{}`.
    pub fn get_item_data(&self, id: &str) -> Result<Value> {
        let value = self.get(Endpoint::ItemData, id)?;
        Ok(if value.is_null() { json!({}) } else { value })
    }

    pub fn create_item(&self, draft: &ItemDraft) -> Result<String> {
        self.create(Endpoint::Item, &serde_json::to_value(draft)?)
    }

    /// Search items with a portal query string such as `typekeywords:hubSite`.
    pub fn search_items(&self, query: &str, max: usize) -> Result<Vec<Item>> {
        let mut url = self.roots.rest_path(&["search"])?;
        append_query(
            &mut url,
            &[("q", query.to_owned()), ("num", max.to_string())],
        );
        let body = self.send(HubRequest::get(url))?;
        collection_entries(&body, &["results"])
            .into_iter()
            .map(|entry| serde_json::from_value(entry).map_err(HubError::from))
            .collect()
    }

    /// Share an item; returns the groups the platform refused.
    pub fn share_item(&self, id: &str, sharing: &Sharing) -> Result<Vec<String>> {
        let url = self.roots.action(Endpoint::Item, id, "share")?;
        let body = self.send(HubRequest::post(url, serde_json::to_value(sharing)?))?;
        Ok(body
            .get("notSharedWith")
            .and_then(Value::as_array)
            .map(|groups| {
                groups
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default())
    }

    pub fn unshare_item(&self, id: &str, sharing: &Sharing) -> Result<bool> {
        let url = self.roots.action(Endpoint::Item, id, "unshare")?;
        let body = self.send(HubRequest::post(url, serde_json::to_value(sharing)?))?;
        Ok(success_flag(&body))
    }

    /// Set or clear the delete guard on an item or group.
    pub fn set_protected(&self, endpoint: Endpoint, id: &str, protected: bool) -> Result<bool> {
        let action = if protected { "protect" } else { "unprotect" };
        let url = self.roots.action(endpoint, id, action)?;
        let body = self.send(HubRequest::post(url, json!({})))?;
        Ok(success_flag(&body))
    }

    /// Names of the resource files attached to an item.
    pub fn item_resources(&self, id: &str) -> Result<Vec<String>> {
        let url = self.roots.action(Endpoint::Item, id, "resources")?;
        let body = self.send(HubRequest::get(url))?;
        Ok(collection_entries(&body, &["resources"])
            .iter()
            .filter_map(|entry| entry.get("resource").and_then(Value::as_str))
            .map(str::to_owned)
            .collect())
    }

    pub fn remove_item_resource(&self, id: &str, resource: &str) -> Result<bool> {
        let url = self.roots.action(Endpoint::Item, id, "removeResources")?;
        let body = self.send(HubRequest::post(url, json!({ "resource": resource })))?;
        Ok(success_flag(&body))
    }

    /// Items shared with a group.
    pub fn group_content(&self, group_id: &str, max: usize) -> Result<Vec<Item>> {
        self.search_items(&format!("group:{group_id}"), max)
    }

    pub fn group_members(&self, group_id: &str) -> Result<GroupMembers> {
        let url = self.roots.action(Endpoint::Group, group_id, "users")?;
        let body = self.send(HubRequest::get(url))?;
        Ok(serde_json::from_value(body)?)
    }

    /// Add users to a group; returns the usernames the platform refused.
    pub fn add_group_users(&self, group_id: &str, usernames: &[&str]) -> Result<Vec<String>> {
        let url = self.roots.action(Endpoint::Group, group_id, "addUsers")?;
        let body = self.send(HubRequest::post(url, json!({ "users": usernames.join(",") })))?;
        Ok(collection_entries(&body, &["notAdded"])
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_owned)
            .collect())
    }

    /// Portal user record, including the role.
    pub fn get_user(&self, username: &str) -> Result<UserInfo> {
        let url = self.roots.rest_path(&["community", "users", username])?;
        let body = self.send(HubRequest::get(url))?;
        Ok(serde_json::from_value(body)?)
    }

    /// Transfer an item from `current_owner` to `target`.
    pub fn reassign_item(&self, item_id: &str, current_owner: &str, target: &str) -> Result<bool> {
        let url = self.roots.rest_path(&[
            "content",
            "users",
            current_owner,
            "items",
            item_id,
            "reassign",
        ])?;
        let body = self.send(HubRequest::post(url, json!({ "targetUsername": target })))?;
        Ok(success_flag(&body))
    }

    pub fn reassign_group(&self, group_id: &str, target: &str) -> Result<bool> {
        let url = self.roots.action(Endpoint::Group, group_id, "reassign")?;
        let body = self.send(HubRequest::post(url, json!({ "targetUsername": target })))?;
        Ok(success_flag(&body))
    }

    /// Register an item as an application and return its client id.
    pub fn register_app(&self, item_id: &str) -> Result<String> {
        let url = self.roots.rest_path(&["oauth2", "registerApp"])?;
        let body = self.send(HubRequest::post(
            url,
            json!({ "itemId": item_id, "appType": "multiple", "redirect_uris": [] }),
        ))?;
        body.get("client_id")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .ok_or_else(|| HubError::UnexpectedResponse(format!("registerApp: {body}")))
    }

    /// Look up a hostname in the domain registry. `None` means it is free.
    pub fn lookup_domain(&self, hostname: &str) -> Result<Option<DomainRecord>> {
        match self.get(Endpoint::Domain, hostname) {
            Ok(body) => Ok(Some(serde_json::from_value(body)?)),
            Err(HubError::NotFound { .. }) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Domain entries registered for a site.
    pub fn domains_for_site(&self, site_id: &str) -> Result<Vec<DomainRecord>> {
        let mut url = self.roots.collection(Endpoint::Domain)?;
        append_query(&mut url, &[("siteId", site_id.to_owned())]);
        let body = self.send(HubRequest::get(url))?;
        let entries = match body {
            Value::Array(entries) => entries,
            other => collection_entries(&other, &["items"]),
        };
        entries
            .into_iter()
            .map(|entry| serde_json::from_value(entry).map_err(HubError::from))
            .collect()
    }

    pub fn register_domain(&self, registration: &DomainRegistration) -> Result<DomainRecord> {
        let url = self.roots.collection(Endpoint::Domain)?;
        let body = self.send(HubRequest::post(url, serde_json::to_value(registration)?))?;
        Ok(serde_json::from_value(body)?)
    }

    /// Resolve the organisation this client acts for.
    pub fn org_context(&self) -> Result<OrgContext> {
        let url = self.roots.rest_path(&["portals", "self"])?;
        let body = self.send(HubRequest::get(url))?;
        OrgContext::from_portal_self(self.roots.portal().clone(), &body)
    }

    // ---- feature layer rows ----

    /// Query a feature layer; returns the `features` array.
    pub fn query_features(&self, layer: &Url, filter: &str) -> Result<Vec<Value>> {
        let mut url = push_segments(layer.clone(), &["query"])?;
        append_query(
            &mut url,
            &[
                ("where", filter.to_owned()),
                ("outFields", "*".to_owned()),
                ("returnGeometry", "true".to_owned()),
                ("f", "json".to_owned()),
            ],
        );
        let body = self.send(HubRequest::get(url))?;
        Ok(collection_entries(&body, &["features"]))
    }

    /// Fetch one feature by object id.
    pub fn get_feature(&self, layer: &Url, object_id: i64) -> Result<Value> {
        let url = push_segments(layer.clone(), &[&object_id.to_string()])?;
        match self.send(HubRequest::get(url)) {
            Ok(body) => Ok(body.get("feature").cloned().unwrap_or(body)),
            Err(HubError::Remote { status: 404, .. }) => Err(HubError::NotFound {
                endpoint: Endpoint::Item,
                id: format!("feature {object_id}"),
            }),
            Err(err) => Err(err),
        }
    }

    /// Add features; returns the new object ids.
    pub fn add_features(&self, layer: &Url, features: Vec<Value>) -> Result<Vec<i64>> {
        let url = push_segments(layer.clone(), &["addFeatures"])?;
        let body = self.send(HubRequest::post(url, json!({ "features": features })))?;
        let results = collection_entries(&body, &["addResults"]);
        results
            .iter()
            .map(|result| {
                if !success_flag(result) {
                    return Err(HubError::rejected("addFeatures", layer.as_str()));
                }
                result
                    .get("objectId")
                    .and_then(Value::as_i64)
                    .ok_or_else(|| HubError::UnexpectedResponse(format!("addFeatures: {body}")))
            })
            .collect()
    }

    pub fn update_features(&self, layer: &Url, features: Vec<Value>) -> Result<bool> {
        let url = push_segments(layer.clone(), &["updateFeatures"])?;
        let body = self.send(HubRequest::post(url, json!({ "features": features })))?;
        Ok(all_succeeded(&body, "updateResults"))
    }

    pub fn delete_features(&self, layer: &Url, object_ids: &[i64]) -> Result<bool> {
        let url = push_segments(layer.clone(), &["deleteFeatures"])?;
        let ids = object_ids
            .iter()
            .map(i64::to_string)
            .collect::<Vec<_>>()
            .join(",");
        let body = self.send(HubRequest::post(url, json!({ "objectIds": ids })))?;
        Ok(all_succeeded(&body, "deleteResults"))
    }
}

fn check(response: HubResponse) -> Result<Value> {
    if !response.is_success() {
        return Err(HubError::Remote {
            status: response.status,
            body: response.body,
        });
    }
    let error_status = response
        .body
        .get("error")
        .filter(|error| error.is_object())
        .map(|error| {
            error
                .get("code")
                .and_then(Value::as_u64)
                .and_then(|code| u16::try_from(code).ok())
                .unwrap_or(400)
        });
    if let Some(status) = error_status {
        return Err(HubError::Remote {
            status,
            body: response.body,
        });
    }
    Ok(response.body)
}

/// Remote success flag; absent means success.
fn success_flag(body: &Value) -> bool {
    body.get("success").and_then(Value::as_bool).unwrap_or(true)
}

fn all_succeeded(body: &Value, key: &str) -> bool {
    collection_entries(body, &[key]).iter().all(success_flag)
}

fn extract_id(body: &Value) -> Option<String> {
    ["/id", "/group/id", "/itemId"]
        .iter()
        .find_map(|pointer| body.pointer(pointer))
        .and_then(|id| match id {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
}

fn collection_entries(body: &Value, keys: &[&str]) -> Vec<Value> {
    if let Value::Array(entries) = body {
        return entries.clone();
    }
    keys.iter()
        .find_map(|key| body.get(*key).and_then(Value::as_array))
        .cloned()
        .unwrap_or_default()
}

fn append_query(url: &mut Url, query: &[(&str, String)]) {
    if query.is_empty() {
        return;
    }
    let mut pairs = url.query_pairs_mut();
    for (key, value) in query {
        pairs.append_pair(key, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use r_hub_common::HubEnvironment;

    /// Replays canned responses and remembers requests.
    struct Scripted {
        responses: Mutex<Vec<HubResponse>>,
        seen: Mutex<Vec<HubRequest>>,
    }

    impl Scripted {
        fn new(mut responses: Vec<HubResponse>) -> Arc<Self> {
            responses.reverse();
            Arc::new(Self {
                responses: Mutex::new(responses),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    impl Transport for Scripted {
        fn execute(&self, request: HubRequest) -> Result<HubResponse> {
            self.seen.lock().push(request);
            self.responses
                .lock()
                .pop()
                .ok_or_else(|| HubError::Transport("script exhausted".to_owned()))
        }
    }

    fn client(transport: Arc<Scripted>) -> ResourceClient {
        let roots = ApiRoots::new(
            &Url::parse("https://cityx.maps.arcgis.com").unwrap(),
            HubEnvironment::Prod,
        )
        .unwrap();
        ResourceClient::new(transport, roots, "admin")
    }

    #[test]
    fn create_injects_owner_and_reads_group_id() {
        let transport = Scripted::new(vec![
            HubResponse::ok(json!({"success": true, "id": "item1"})),
            HubResponse::ok(json!({"success": true, "group": {"id": "grp1"}})),
        ]);
        let client = client(transport.clone());
        assert_eq!(
            client.create(Endpoint::Item, &json!({"title": "t"})).unwrap(),
            "item1"
        );
        assert_eq!(
            client.create(Endpoint::Group, &json!({"title": "g"})).unwrap(),
            "grp1"
        );
        let seen = transport.seen.lock();
        assert_eq!(seen[0].body.as_ref().unwrap()["owner"], "admin");
        assert!(seen[1].body.as_ref().unwrap().get("owner").is_none());
    }

    #[test]
    fn item_reassign_targets_the_current_owner_path() {
        let transport = Scripted::new(vec![HubResponse::ok(json!({"success": true}))]);
        let client = client(transport.clone());
        assert!(client.reassign_item("item1", "old.owner", "new.owner").unwrap());
        let seen = transport.seen.lock();
        assert!(seen[0]
            .url
            .path()
            .ends_with("/sharing/rest/content/users/old.owner/items/item1/reassign"));
        assert_eq!(seen[0].body.as_ref().unwrap()["targetUsername"], "new.owner");
    }

    #[test]
    fn group_members_include_the_owner() {
        let transport = Scripted::new(vec![HubResponse::ok(
            json!({"owner": "admin", "admins": ["lead"], "users": ["ana"]}),
        )]);
        let members = client(transport).group_members("grp1").unwrap();
        assert!(members.contains("admin"));
        assert!(members.contains("ana"));
        assert!(!members.contains("bob"));
    }

    #[test]
    fn error_body_with_ok_status_is_remote_error() {
        let transport = Scripted::new(vec![HubResponse::ok(
            json!({"error": {"code": 403, "message": "denied"}}),
        )]);
        let err = client(transport).get(Endpoint::Item, "x").unwrap_err();
        assert_eq!(err.status(), Some(403));
    }

    #[test]
    fn missing_resource_maps_to_not_found() {
        let transport = Scripted::new(vec![HubResponse::new(404, Value::Null)]);
        let err = client(transport).get(Endpoint::Group, "gone").unwrap_err();
        assert!(matches!(
            err,
            HubError::NotFound {
                endpoint: Endpoint::Group,
                ..
            }
        ));
    }

    #[test]
    fn success_false_is_reported_not_raised() {
        let transport = Scripted::new(vec![HubResponse::ok(json!({"success": false}))]);
        assert!(!client(transport).delete(Endpoint::Item, "x").unwrap());
    }

    #[test]
    fn free_domain_reads_as_none() {
        let transport = Scripted::new(vec![HubResponse::new(404, json!({"message": "nope"}))]);
        assert_eq!(
            client(transport)
                .lookup_domain("foo-cityx.hub.arcgis.com")
                .unwrap(),
            None
        );
    }

    #[test]
    fn search_appends_encoded_query() {
        let transport = Scripted::new(vec![HubResponse::ok(json!({"results": [
            {"id": "i1", "title": "Vision Zero", "typeKeywords": ["hubInitiative"]}
        ]}))]);
        let client = client(transport.clone());
        let items = client
            .search_items("typekeywords:hubInitiative AND title:Vision Zero", 10)
            .unwrap();
        assert_eq!(items.len(), 1);
        let url = transport.seen.lock()[0].url.clone();
        let q: Vec<_> = url.query_pairs().collect();
        assert_eq!(q[0].1, "typekeywords:hubInitiative AND title:Vision Zero");
        assert_eq!(q[1].1, "10");
    }
}
