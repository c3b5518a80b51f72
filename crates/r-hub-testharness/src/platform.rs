//! ---
//! hub_section: "15-testing-qa-runbook"
//! hub_subsection: "01-bootstrap"
//! hub_type: "source"
//! hub_scope: "code"
//! hub_description: "In-memory platform answering portal, domain, events and discussions requests."
//! hub_version: "v0.1.0"
//! hub_owner: "tbd"
//! ---
use std::collections::{BTreeMap, BTreeSet};

use parking_lot::Mutex;
use r_hub_client::{HubRequest, HubResponse, Method, Result, Transport};
use serde_json::{json, Map, Value};
use tracing::trace;

/// One request as seen by the platform.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub method: Method,
    /// Percent-decoded URL path.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl RecordedCall {
    pub fn is(&self, method: Method, path_suffix: &str) -> bool {
        self.method == method && self.path.ends_with(path_suffix)
    }
}

#[derive(Debug, Clone)]
struct FailureRule {
    method: Method,
    suffix: String,
    status: u16,
    skip: usize,
    remaining: Option<usize>,
}

#[derive(Debug, Default)]
struct State {
    next_id: u64,
    items: BTreeMap<String, Value>,
    data: BTreeMap<String, Value>,
    groups: BTreeMap<String, Value>,
    shares: BTreeMap<String, BTreeSet<String>>,
    resources: BTreeMap<String, Vec<String>>,
    domains: BTreeMap<String, Value>,
    users: BTreeMap<String, Value>,
    members: BTreeMap<String, BTreeSet<String>>,
    features: BTreeMap<i64, Value>,
    discussions: BTreeMap<String, Value>,
    calls: Vec<RecordedCall>,
    failures: Vec<FailureRule>,
}

impl State {
    fn next(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}{:04}", self.next_id)
    }
}

/// Fake hub platform implementing [`Transport`].
///
/// Items, data documents, groups, domains, event features and discussion
/// records live in memory. Ids are sequential and deterministic. Protected
/// items and groups refuse deletion with `success: false`, like the real
/// portal.
pub struct FakePlatform {
    portal_self: Value,
    state: Mutex<State>,
}

impl FakePlatform {
    /// Platform answering `portals/self` with `portal_self`.
    ///
    /// The signed-in user of `portal_self` is known to the user directory.
    pub fn with_portal_self(portal_self: Value) -> Self {
        let mut state = State::default();
        if let Some(username) = portal_self.pointer("/user/username").and_then(Value::as_str) {
            state.users.insert(username.to_owned(), portal_self["user"].clone());
        }
        Self {
            portal_self,
            state: Mutex::new(state),
        }
    }

    fn signed_in(&self) -> Value {
        self.portal_self
            .pointer("/user/username")
            .cloned()
            .unwrap_or(Value::Null)
    }

    // ---- scripting ----

    /// Answer every request whose path ends with `path_suffix` with `status` from now on.
    pub fn fail_on(&self, method: Method, path_suffix: &str, status: u16) {
        self.state.lock().failures.push(FailureRule {
            method,
            suffix: path_suffix.to_owned(),
            status,
            skip: 0,
            remaining: None,
        });
    }

    /// Answer the next matching request with `status`.
    pub fn fail_once(&self, method: Method, path_suffix: &str, status: u16) {
        self.state.lock().failures.push(FailureRule {
            method,
            suffix: path_suffix.to_owned(),
            status,
            skip: 0,
            remaining: Some(1),
        });
    }

    /// Let `skip` matching requests through, then fail the next one.
    pub fn fail_after(&self, method: Method, path_suffix: &str, skip: usize, status: u16) {
        self.state.lock().failures.push(FailureRule {
            method,
            suffix: path_suffix.to_owned(),
            status,
            skip,
            remaining: Some(1),
        });
    }

    pub fn clear_failures(&self) {
        self.state.lock().failures.clear();
    }

    /// Pre-register a hostname as taken.
    pub fn register_domain(&self, hostname: &str, site_id: &str) -> String {
        let mut state = self.state.lock();
        let id = state.next("domain");
        state.domains.insert(
            id.clone(),
            json!({"id": id, "hostname": hostname, "siteId": site_id, "sslOnly": true}),
        );
        id
    }

    /// Insert an item directly, bypassing the call log.
    pub fn seed_item(&self, mut item: Value) -> String {
        let mut state = self.state.lock();
        let id = match item.get("id").and_then(Value::as_str) {
            Some(id) => id.to_owned(),
            None => state.next("item"),
        };
        item["id"] = json!(id);
        if item.get("protected").is_none() {
            item["protected"] = json!(false);
        }
        state.items.insert(id.clone(), item);
        id
    }

    /// Add a user with `role` to the user directory.
    pub fn seed_user(&self, username: &str, role: &str) {
        self.state.lock().users.insert(
            username.to_owned(),
            json!({"username": username, "role": role}),
        );
    }

    /// Make `username` a plain member of a group.
    pub fn seed_member(&self, group_id: &str, username: &str) {
        self.state
            .lock()
            .members
            .entry(group_id.to_owned())
            .or_default()
            .insert(username.to_owned());
    }

    pub fn seed_data(&self, item_id: &str, data: Value) {
        self.state.lock().data.insert(item_id.to_owned(), data);
    }

    pub fn seed_resource(&self, item_id: &str, name: &str) {
        self.state
            .lock()
            .resources
            .entry(item_id.to_owned())
            .or_default()
            .push(name.to_owned());
    }

    // ---- inspection ----

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    /// Number of calls with `method` whose path ends with `path_suffix`.
    pub fn count(&self, method: Method, path_suffix: &str) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|call| call.is(method, path_suffix))
            .count()
    }

    /// Number of calls with `method` whose path contains `fragment`.
    pub fn count_matching(&self, method: Method, fragment: &str) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|call| call.method == method && call.path.contains(fragment))
            .count()
    }

    pub fn item(&self, id: &str) -> Option<Value> {
        self.state.lock().items.get(id).cloned()
    }

    pub fn data(&self, id: &str) -> Option<Value> {
        self.state.lock().data.get(id).cloned()
    }

    pub fn group(&self, id: &str) -> Option<Value> {
        self.state.lock().groups.get(id).cloned()
    }

    /// Plain members of a group, owner excluded.
    pub fn members(&self, group_id: &str) -> Vec<String> {
        self.state
            .lock()
            .members
            .get(group_id)
            .map(|users| users.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn item_ids(&self) -> Vec<String> {
        self.state.lock().items.keys().cloned().collect()
    }

    pub fn group_ids(&self) -> Vec<String> {
        self.state.lock().groups.keys().cloned().collect()
    }

    pub fn domain_by_host(&self, hostname: &str) -> Option<Value> {
        self.state
            .lock()
            .domains
            .values()
            .find(|d| d["hostname"] == hostname)
            .cloned()
    }

    pub fn domain_count(&self) -> usize {
        self.state.lock().domains.len()
    }

    pub fn is_shared_with(&self, item_id: &str, group_id: &str) -> bool {
        self.state
            .lock()
            .shares
            .get(item_id)
            .is_some_and(|groups| groups.contains(group_id))
    }

    pub fn features(&self) -> Vec<Value> {
        self.state.lock().features.values().cloned().collect()
    }

    pub fn discussion(&self, id: &str) -> Option<Value> {
        self.state
            .lock()
            .discussions
            .values()
            .find(|record| record["id"] == id)
            .cloned()
    }

    // ---- routing ----

    fn route(&self, state: &mut State, call: &RecordedCall) -> HubResponse {
        let segments: Vec<&str> = call
            .path
            .trim_matches('/')
            .split('/')
            .filter(|s| !s.is_empty())
            .collect();
        // Enterprise portals sit below a web adaptor path.
        let start = segments
            .windows(2)
            .position(|pair| pair == ["sharing", "rest"])
            .unwrap_or(0);
        match &segments[start..] {
            ["sharing", "rest", rest @ ..] => self.portal(state, call, rest),
            ["api", "v3", "domains", rest @ ..] => domains(state, call, rest),
            ["api", "v3", "events", _org, _layer, "FeatureServer", "0", rest @ ..] => {
                features(state, call, rest)
            }
            ["api", "discussions", "v1", kind, rest @ ..] => discussions(state, call, kind, rest),
            _ => not_found(),
        }
    }

    fn portal(&self, state: &mut State, call: &RecordedCall, rest: &[&str]) -> HubResponse {
        let body = call.body.clone().unwrap_or(Value::Null);
        match (call.method, rest) {
            (Method::Get, ["portals", "self"]) => HubResponse::ok(self.portal_self.clone()),
            (Method::Get, ["search"]) => search(state, call),
            (Method::Get, ["community", "users", username]) => {
                state.users.get(*username).cloned().map(HubResponse::ok).unwrap_or_else(not_found)
            }
            (Method::Post, ["content", "users", _owner, "items", id, "reassign"]) => {
                match state.items.get_mut(*id) {
                    Some(item) => {
                        item["owner"] = body["targetUsername"].clone();
                        HubResponse::ok(json!({"success": true, "itemId": id}))
                    }
                    None => not_found(),
                }
            }
            (Method::Post, ["oauth2", "registerApp"]) => {
                let client_id = state.next("client");
                HubResponse::ok(json!({"client_id": client_id, "itemId": body["itemId"]}))
            }
            (Method::Post, ["content", "items"]) => {
                let id = state.next("item");
                let mut item = body;
                item["id"] = json!(id);
                item["protected"] = json!(false);
                item["created"] = json!(state.next_id);
                state.items.insert(id.clone(), item);
                HubResponse::ok(json!({"success": true, "id": id}))
            }
            (method, ["content", "items", id, tail @ ..]) => {
                item_route(state, method, id, tail, body)
            }
            (Method::Post, ["community", "groups"]) => {
                let id = state.next("group");
                let mut group = body;
                group["id"] = json!(id);
                group["owner"] = self.signed_in();
                group["protected"] = json!(false);
                state.groups.insert(id.clone(), group);
                HubResponse::ok(json!({"success": true, "group": {"id": id}}))
            }
            (method, ["community", "groups", id, tail @ ..]) => {
                group_route(state, method, id, tail, body)
            }
            _ => not_found(),
        }
    }
}

impl Transport for FakePlatform {
    fn execute(&self, request: HubRequest) -> Result<HubResponse> {
        let call = RecordedCall {
            method: request.method,
            path: decode(request.url.path()),
            query: request
                .url
                .query_pairs()
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect(),
            body: request.body,
        };
        trace!(method = %call.method, path = %call.path, "fake platform call");
        let mut state = self.state.lock();
        state.calls.push(call.clone());

        let failure = state.failures.iter_mut().find(|rule| {
            rule.method == call.method
                && call.path.ends_with(&rule.suffix)
                && rule.remaining.map_or(true, |left| left > 0)
        });
        if let Some(rule) = failure {
            if rule.skip > 0 {
                rule.skip -= 1;
                return Ok(self.route(&mut state, &call));
            }
            if let Some(left) = rule.remaining.as_mut() {
                *left -= 1;
            }
            let status = rule.status;
            return Ok(HubResponse::new(
                status,
                json!({"error": {"code": status, "message": "injected failure"}}),
            ));
        }

        Ok(self.route(&mut state, &call))
    }
}

fn decode(path: &str) -> String {
    path.replace("%20", " ").replace("%7C", "|")
}

fn not_found() -> HubResponse {
    HubResponse::new(
        404,
        json!({"error": {"code": 404, "message": "resource not found"}}),
    )
}

fn refused(reason: &str) -> HubResponse {
    HubResponse::ok(json!({"success": false, "message": reason}))
}

fn merge(target: &mut Value, patch: Value) {
    if let (Some(target), Value::Object(patch)) = (target.as_object_mut(), patch) {
        for (key, value) in patch {
            target.insert(key, value);
        }
    }
}

fn item_route(
    state: &mut State,
    method: Method,
    id: &str,
    tail: &[&str],
    body: Value,
) -> HubResponse {
    if !state.items.contains_key(id) {
        return not_found();
    }
    match (method, tail) {
        (Method::Get, []) => HubResponse::ok(state.items[id].clone()),
        (Method::Patch, []) => {
            if let Some(item) = state.items.get_mut(id) {
                merge(item, body);
            }
            HubResponse::ok(json!({"success": true, "id": id}))
        }
        (Method::Delete, []) => {
            if state.items[id]["protected"] == json!(true) {
                return refused("item is protected");
            }
            state.items.remove(id);
            state.data.remove(id);
            state.shares.remove(id);
            state.resources.remove(id);
            HubResponse::ok(json!({"success": true, "itemId": id}))
        }
        (Method::Get, ["data"]) => {
            HubResponse::ok(state.data.get(id).cloned().unwrap_or(Value::Null))
        }
        (Method::Patch, ["data"]) => {
            state.data.insert(id.to_owned(), body);
            HubResponse::ok(json!({"success": true, "id": id}))
        }
        (Method::Post, [action @ ("protect" | "unprotect")]) => {
            if let Some(item) = state.items.get_mut(id) {
                item["protected"] = json!(*action == "protect");
            }
            HubResponse::ok(json!({"success": true}))
        }
        (Method::Post, ["share"]) => {
            let groups = string_list(&body["groups"]);
            state
                .shares
                .entry(id.to_owned())
                .or_default()
                .extend(groups);
            if let Some(item) = state.items.get_mut(id) {
                if body["everyone"] == json!(true) {
                    item["access"] = json!("public");
                } else if body["org"] == json!(true) {
                    item["access"] = json!("org");
                }
            }
            HubResponse::ok(json!({"notSharedWith": [], "itemId": id}))
        }
        (Method::Post, ["unshare"]) => {
            let groups = string_list(&body["groups"]);
            if let Some(shared) = state.shares.get_mut(id) {
                for group in groups {
                    shared.remove(&group);
                }
            }
            HubResponse::ok(json!({"success": true}))
        }
        (Method::Get, ["resources"]) => {
            let resources: Vec<Value> = state
                .resources
                .get(id)
                .map(|names| names.iter().map(|n| json!({"resource": n})).collect())
                .unwrap_or_default();
            HubResponse::ok(json!({"resources": resources}))
        }
        (Method::Post, ["removeResources"]) => {
            let name = body["resource"].as_str().unwrap_or_default().to_owned();
            if let Some(names) = state.resources.get_mut(id) {
                names.retain(|n| *n != name);
            }
            HubResponse::ok(json!({"success": true}))
        }
        _ => not_found(),
    }
}

fn group_route(
    state: &mut State,
    method: Method,
    id: &str,
    tail: &[&str],
    body: Value,
) -> HubResponse {
    if !state.groups.contains_key(id) {
        return not_found();
    }
    match (method, tail) {
        (Method::Get, []) => HubResponse::ok(state.groups[id].clone()),
        (Method::Patch, []) => {
            if let Some(group) = state.groups.get_mut(id) {
                merge(group, body);
            }
            HubResponse::ok(json!({"success": true, "groupId": id}))
        }
        (Method::Delete, []) => {
            if state.groups[id]["protected"] == json!(true) {
                return refused("group is protected");
            }
            state.groups.remove(id);
            HubResponse::ok(json!({"success": true, "groupId": id}))
        }
        (Method::Post, [action @ ("protect" | "unprotect")]) => {
            if let Some(group) = state.groups.get_mut(id) {
                group["protected"] = json!(*action == "protect");
            }
            HubResponse::ok(json!({"success": true}))
        }
        (Method::Get, ["users"]) => {
            let users: Vec<String> = state
                .members
                .get(id)
                .map(|users| users.iter().cloned().collect())
                .unwrap_or_default();
            HubResponse::ok(json!({
                "owner": state.groups[id]["owner"],
                "admins": [state.groups[id]["owner"]],
                "users": users,
            }))
        }
        (Method::Post, ["addUsers"]) => {
            let (known, unknown): (Vec<String>, Vec<String>) = string_list(&body["users"])
                .into_iter()
                .partition(|user| state.users.contains_key(user));
            state.members.entry(id.to_owned()).or_default().extend(known);
            HubResponse::ok(json!({"notAdded": unknown}))
        }
        (Method::Post, ["reassign"]) => {
            if let Some(group) = state.groups.get_mut(id) {
                group["owner"] = body["targetUsername"].clone();
            }
            HubResponse::ok(json!({"success": true}))
        }
        _ => not_found(),
    }
}

fn string_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(entries) => entries
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_owned)
            .collect(),
        Value::String(joined) => joined
            .split(',')
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect(),
        _ => Vec::new(),
    }
}

/// Supports `field:value` clauses joined by ` AND ` over
/// typekeywords, title, owner, tags, id and group.
fn search(state: &State, call: &RecordedCall) -> HubResponse {
    let param = |name: &str| {
        call.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.clone())
    };
    let q = param("q").unwrap_or_default();
    let num = param("num")
        .and_then(|n| n.parse::<usize>().ok())
        .unwrap_or(100);
    let clauses: Vec<(String, String)> = q
        .split(" AND ")
        .filter_map(|clause| clause.split_once(':'))
        .map(|(field, value)| {
            (
                field.trim().to_lowercase(),
                value.trim().trim_matches('"').to_owned(),
            )
        })
        .collect();

    let results: Vec<Value> = state
        .items
        .values()
        .filter(|item| {
            clauses.iter().all(|(field, value)| match field.as_str() {
                "typekeywords" => string_list(&item["typeKeywords"])
                    .iter()
                    .any(|k| k.trim() == value),
                "title" => item["title"]
                    .as_str()
                    .is_some_and(|t| t.to_lowercase().contains(&value.to_lowercase())),
                "owner" => item["owner"] == json!(value),
                "tags" => string_list(&item["tags"]).iter().any(|t| t == value),
                "id" => item["id"] == json!(value),
                "group" => item["id"]
                    .as_str()
                    .and_then(|id| state.shares.get(id))
                    .is_some_and(|groups| groups.contains(value)),
                _ => true,
            })
        })
        .take(num)
        .cloned()
        .collect();
    HubResponse::ok(json!({"total": results.len(), "results": results}))
}

fn domains(state: &mut State, call: &RecordedCall, rest: &[&str]) -> HubResponse {
    match (call.method, rest) {
        (Method::Post, []) => {
            let body = call.body.clone().unwrap_or(Value::Null);
            let hostname = body["hostname"].clone();
            if state.domains.values().any(|d| d["hostname"] == hostname) {
                return HubResponse::new(
                    409,
                    json!({"error": {"code": 409, "message": "hostname already registered"}}),
                );
            }
            let id = state.next("domain");
            let mut record = body;
            record["id"] = json!(id);
            state.domains.insert(id, record.clone());
            HubResponse::ok(record)
        }
        (Method::Get, []) => {
            let site_id = call
                .query
                .iter()
                .find(|(k, _)| k == "siteId")
                .map(|(_, v)| v.clone());
            let entries: Vec<Value> = state
                .domains
                .values()
                .filter(|d| site_id.as_ref().map_or(true, |id| d["siteId"] == json!(id)))
                .cloned()
                .collect();
            HubResponse::ok(Value::Array(entries))
        }
        (Method::Get, [hostname]) => state
            .domains
            .values()
            .find(|d| d["hostname"] == json!(hostname))
            .cloned()
            .map(HubResponse::ok)
            .unwrap_or_else(not_found),
        (Method::Delete, [id]) => match state.domains.remove(*id) {
            Some(_) => HubResponse::ok(json!({"success": true})),
            None => not_found(),
        },
        _ => not_found(),
    }
}

fn where_matches(filter: &str, attributes: &Value) -> bool {
    filter
        .split(" AND ")
        .map(str::trim)
        .filter(|clause| *clause != "1=1")
        .all(|clause| match clause.split_once('=') {
            Some((field, value)) => {
                let value = value.trim().trim_matches('\'');
                match &attributes[field.trim()] {
                    Value::String(s) => s == value,
                    Value::Number(n) => n.to_string() == value,
                    _ => false,
                }
            }
            None => true,
        })
}

fn features(state: &mut State, call: &RecordedCall, rest: &[&str]) -> HubResponse {
    let body = call.body.clone().unwrap_or(Value::Null);
    match (call.method, rest) {
        (Method::Get, ["query"]) => {
            let filter = call
                .query
                .iter()
                .find(|(k, _)| k == "where")
                .map(|(_, v)| v.clone())
                .unwrap_or_else(|| "1=1".to_owned());
            let features: Vec<Value> = state
                .features
                .values()
                .filter(|f| where_matches(&filter, &f["attributes"]))
                .cloned()
                .collect();
            HubResponse::ok(json!({"features": features}))
        }
        (Method::Post, ["addFeatures"]) => {
            let mut results = Vec::new();
            for mut feature in body["features"].as_array().cloned().unwrap_or_default() {
                let object_id = state.features.keys().max().copied().unwrap_or(0) + 1;
                feature["attributes"]["OBJECTID"] = json!(object_id);
                state.features.insert(object_id, feature);
                results.push(json!({"objectId": object_id, "success": true}));
            }
            HubResponse::ok(json!({"addResults": results}))
        }
        (Method::Post, ["updateFeatures"]) => {
            let mut results = Vec::new();
            for feature in body["features"].as_array().cloned().unwrap_or_default() {
                let object_id = feature["attributes"]["OBJECTID"].as_i64().unwrap_or(-1);
                let success = match state.features.get_mut(&object_id) {
                    Some(existing) => {
                        merge(&mut existing["attributes"], feature["attributes"].clone());
                        if !feature["geometry"].is_null() {
                            existing["geometry"] = feature["geometry"].clone();
                        }
                        true
                    }
                    None => false,
                };
                results.push(json!({"objectId": object_id, "success": success}));
            }
            HubResponse::ok(json!({"updateResults": results}))
        }
        (Method::Post, ["deleteFeatures"]) => {
            let ids = body["objectIds"].as_str().unwrap_or_default().to_owned();
            let results: Vec<Value> = ids
                .split(',')
                .filter_map(|id| id.trim().parse::<i64>().ok())
                .map(|id| json!({"objectId": id, "success": state.features.remove(&id).is_some()}))
                .collect();
            HubResponse::ok(json!({"deleteResults": results}))
        }
        (Method::Get, [object_id]) => object_id
            .parse::<i64>()
            .ok()
            .and_then(|id| state.features.get(&id).cloned())
            .map(|feature| HubResponse::ok(json!({"feature": feature})))
            .unwrap_or_else(not_found),
        _ => not_found(),
    }
}

fn discussions(state: &mut State, call: &RecordedCall, kind: &str, rest: &[&str]) -> HubResponse {
    let prefix = kind.trim_end_matches('s');
    let key = |id: &str| format!("{kind}/{id}");
    match (call.method, rest) {
        (Method::Post, []) => {
            let id = state.next(prefix);
            let mut record = call.body.clone().unwrap_or_else(|| json!({}));
            record["id"] = json!(id);
            state.discussions.insert(key(&id), record.clone());
            HubResponse::ok(record)
        }
        (Method::Get, []) => {
            let num = call
                .query
                .iter()
                .find(|(k, _)| k == "num")
                .and_then(|(_, v)| v.parse::<usize>().ok())
                .unwrap_or(usize::MAX);
            let prefix = format!("{kind}/");
            let items: Vec<Value> = state
                .discussions
                .iter()
                .filter(|(k, _)| k.starts_with(&prefix))
                .map(|(_, v)| v.clone())
                .take(num)
                .collect();
            HubResponse::ok(json!({"items": items, "total": items.len()}))
        }
        (Method::Get, [id]) => state
            .discussions
            .get(&key(*id))
            .cloned()
            .map(HubResponse::ok)
            .unwrap_or_else(not_found),
        (Method::Patch, [id]) => match state.discussions.get_mut(&key(*id)) {
            Some(record) => {
                merge(record, call.body.clone().unwrap_or(Value::Object(Map::new())));
                HubResponse::ok(record.clone())
            }
            None => not_found(),
        },
        (Method::Delete, [id]) => match state.discussions.remove(&key(*id)) {
            Some(_) => HubResponse::ok(json!({"success": true})),
            None => not_found(),
        },
        _ => not_found(),
    }
}
