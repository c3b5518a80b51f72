//! ---
//! hub_section: "02-provisioning-orchestration"
//! hub_subsection: "module"
//! hub_type: "source"
//! hub_scope: "code"
//! hub_description: "Hub events stored as rows of the organisation's events feature service."
//! hub_version: "v0.0.0-prealpha"
//! hub_owner: "tbd"
//! ---
use std::sync::Arc;

use r_hub_client::{ensure_success, Endpoint, HubError, OrgContext, ResourceClient, Result};
use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::{info, warn};
use url::Url;

use crate::groups::{GroupDraft, GroupProvisioner};
use crate::model::{slugify, Initiative};
use crate::persist::fetch;

const REQUIRED_KEYS: [&str; 9] = [
    "title",
    "description",
    "initiativeId",
    "venue",
    "address1",
    "status",
    "startDate",
    "endDate",
    "isAllDay",
];
const STATUSES: [&str; 4] = ["private", "planned", "public", "draft"];

/// One row of the events layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    attributes: Map<String, Value>,
    geometry: Value,
}

impl Event {
    fn from_feature(feature: Value) -> Result<Self> {
        let attributes = feature
            .get("attributes")
            .and_then(Value::as_object)
            .cloned()
            .ok_or_else(|| {
                HubError::UnexpectedResponse(format!("event without attributes: {feature}"))
            })?;
        let geometry = match feature.get("geometry") {
            Some(geometry) if !geometry.is_null() => geometry.clone(),
            _ => json!({"x": 0.0, "y": 0.0}),
        };
        Ok(Self {
            attributes,
            geometry,
        })
    }

    fn text(&self, key: &str) -> &str {
        self.attributes
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    pub fn event_id(&self) -> i64 {
        self.attributes
            .get("OBJECTID")
            .and_then(Value::as_i64)
            .unwrap_or_default()
    }

    pub fn title(&self) -> &str {
        self.text("title")
    }

    pub fn venue(&self) -> &str {
        self.text("venue")
    }

    pub fn address(&self) -> &str {
        self.text("address1")
    }

    pub fn description(&self) -> &str {
        self.text("description")
    }

    pub fn initiative_id(&self) -> &str {
        self.text("initiativeId")
    }

    pub fn site_id(&self) -> Option<&str> {
        self.attributes.get("siteId").and_then(Value::as_str)
    }

    /// Organizer list; stored as a JSON string on the layer.
    pub fn organizers(&self) -> Vec<Value> {
        match self.attributes.get("organizers") {
            Some(Value::String(raw)) => serde_json::from_str(raw).unwrap_or_default(),
            Some(Value::Array(list)) => list.clone(),
            _ => Vec::new(),
        }
    }

    pub fn start_date(&self) -> Option<i64> {
        self.attributes.get("startDate").and_then(Value::as_i64)
    }

    pub fn end_date(&self) -> Option<i64> {
        self.attributes.get("endDate").and_then(Value::as_i64)
    }

    pub fn capacity(&self) -> Option<i64> {
        self.attributes.get("capacity").and_then(Value::as_i64)
    }

    /// Event status: private, planned, public or draft.
    pub fn access(&self) -> &str {
        self.text("status")
    }

    pub fn group_id(&self) -> Option<&str> {
        self.attributes
            .get("groupId")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
    }

    pub fn is_cancelled(&self) -> bool {
        match self.attributes.get("isCancelled") {
            Some(Value::Bool(flag)) => *flag,
            Some(Value::Number(n)) => n.as_i64() == Some(1),
            _ => false,
        }
    }

    pub fn geometry(&self) -> &Value {
        &self.geometry
    }

    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }

    fn to_feature(&self) -> Value {
        json!({"attributes": self.attributes, "geometry": self.geometry})
    }
}

/// Criteria for [`EventManager::search`]; text criteria match substrings.
#[derive(Debug, Clone, Default)]
pub struct EventFilter<'a> {
    pub initiative_id: Option<&'a str>,
    pub title: Option<&'a str>,
    pub venue: Option<&'a str>,
    pub organizer: Option<&'a str>,
}

#[derive(Clone)]
pub struct EventManager {
    client: Arc<ResourceClient>,
    org: Arc<OrgContext>,
    groups: GroupProvisioner,
}

impl EventManager {
    pub fn new(client: Arc<ResourceClient>, org: Arc<OrgContext>) -> Self {
        Self {
            groups: GroupProvisioner::new(client.clone(), org.clone()),
            client,
            org,
        }
    }

    fn layer(&self) -> Result<Url> {
        self.client.roots().events_layer(&self.org.org_id)
    }

    pub fn all(&self) -> Result<Vec<Event>> {
        self.client
            .query_features(&self.layer()?, "1=1")?
            .into_iter()
            .map(Event::from_feature)
            .collect()
    }

    pub fn search(&self, filter: &EventFilter<'_>) -> Result<Vec<Event>> {
        Ok(self
            .all()?
            .into_iter()
            .filter(|event| {
                filter.initiative_id.map_or(true, |id| event.initiative_id() == id)
                    && filter.title.map_or(true, |t| event.title().contains(t))
                    && filter.venue.map_or(true, |v| event.venue().contains(v))
                    && filter.organizer.map_or(true, |name| {
                        event
                            .organizers()
                            .iter()
                            .any(|o| o["name"].as_str().is_some_and(|n| n.contains(name)))
                    })
            })
            .collect())
    }

    pub fn get(&self, event_id: i64) -> Result<Event> {
        Event::from_feature(self.client.get_feature(&self.layer()?, event_id)?)
    }

    /// Schedule an event for an initiative.
    ///
    /// `properties` must hold every required key and a `geometry`; there is
    /// no geocoding. The event gets its own protected public group.
    pub fn add(&self, mut properties: Map<String, Value>) -> Result<Event> {
        let missing: Vec<&str> = REQUIRED_KEYS
            .into_iter()
            .filter(|key| properties.get(*key).map_or(true, Value::is_null))
            .collect();
        if !missing.is_empty() {
            return Err(HubError::Precondition(format!(
                "event is missing required keys: {}",
                missing.join(", ")
            )));
        }
        let status = properties["status"].as_str().unwrap_or_default();
        if !STATUSES.contains(&status) {
            return Err(HubError::Precondition(format!(
                "event status must be one of {}",
                STATUSES.join(", ")
            )));
        }
        let geometry = properties
            .remove("geometry")
            .filter(|g| !g.is_null())
            .ok_or_else(|| HubError::Precondition("event geometry is required".to_owned()))?;
        let title = properties["title"].as_str().unwrap_or_default().to_owned();

        let initiative_id = properties["initiativeId"].as_str().unwrap_or_default().to_owned();
        let initiative = fetch(&self.client, &initiative_id, Initiative::from_parts)?;
        properties.insert("siteId".to_owned(), json!(initiative.site_id()));

        let organizers = match properties.remove("organizers") {
            Some(Value::String(raw)) => raw,
            Some(list) if !list.is_null() => list.to_string(),
            _ => json!([{
                "name": self.org.user.full_name.as_deref().unwrap_or(&self.org.user.username),
                "contact": self.org.user.email,
                "username": self.org.user.username,
            }])
            .to_string(),
        };
        properties.insert("organizers".to_owned(), json!(organizers));
        let sponsors = match properties.remove("sponsors") {
            Some(Value::String(raw)) => raw,
            Some(list) if !list.is_null() => list.to_string(),
            _ => "[]".to_owned(),
        };
        properties.insert("sponsors".to_owned(), json!(sponsors));
        properties
            .entry("onlineLocation")
            .or_insert_with(|| json!(""));
        properties.insert("schemaVersion".to_owned(), json!(2));
        properties.insert("location".to_owned(), json!(""));
        properties.insert("url".to_owned(), json!(slugify(&title)));

        let layer = self.layer()?;
        let next_id = self
            .all()?
            .iter()
            .map(Event::event_id)
            .max()
            .unwrap_or(0)
            + 1;
        let group_id = self
            .groups
            .create_protected(&GroupDraft::for_event(&title, next_id))?;
        properties.insert("groupId".to_owned(), json!(group_id));

        let feature = json!({"attributes": properties, "geometry": geometry});
        let added = match self.client.add_features(&layer, vec![feature]) {
            Ok(ids) => ids,
            Err(err) => {
                if let Err(release) = self.groups.release(&group_id) {
                    warn!(group = %group_id, error = %release, "event group left behind");
                }
                return Err(err);
            }
        };
        let object_id = added
            .first()
            .copied()
            .ok_or_else(|| HubError::UnexpectedResponse("addFeatures returned no ids".to_owned()))?;
        info!(event = object_id, group = %group_id, "event added");
        self.get(object_id)
    }

    /// Overwrite attributes; a `geometry` key replaces the location.
    pub fn update(&self, event: &mut Event, mut properties: Map<String, Value>) -> Result<()> {
        let mut updated = event.clone();
        if let Some(geometry) = properties.remove("geometry").filter(|g| !g.is_null()) {
            updated.geometry = geometry;
        }
        updated.attributes.extend(properties);
        updated
            .attributes
            .insert("OBJECTID".to_owned(), json!(event.event_id()));
        let ok = self
            .client
            .update_features(&self.layer()?, vec![updated.to_feature()])?;
        ensure_success(ok, "update event", &event.event_id().to_string())?;
        *event = updated;
        Ok(())
    }

    /// Release the event group and delete the row.
    pub fn delete(&self, event: Event) -> Result<()> {
        if let Some(group) = event.group_id() {
            self.groups.release(group)?;
        }
        let id = event.event_id();
        let ok = self.client.delete_features(&self.layer()?, &[id])?;
        if !ok {
            return Err(HubError::NotFound {
                endpoint: Endpoint::Item,
                id: format!("event {id}"),
            });
        }
        info!(event = id, "event deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn organizers_are_decoded_from_json_string() {
        let event = Event::from_feature(json!({
            "attributes": {
                "OBJECTID": 3,
                "title": "Town Hall",
                "organizers": "[{\"name\":\"Ada\",\"contact\":\"ada@example.org\"}]",
                "isCancelled": 1
            }
        }))
        .unwrap();
        assert_eq!(event.event_id(), 3);
        assert_eq!(event.organizers()[0]["name"], "Ada");
        assert!(event.is_cancelled());
        assert_eq!(event.geometry(), &json!({"x": 0.0, "y": 0.0}));
    }
}
