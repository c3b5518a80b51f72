//! ---
//! hub_section: "02-provisioning-orchestration"
//! hub_subsection: "module"
//! hub_type: "source"
//! hub_scope: "code"
//! hub_description: "Write helpers shared by the managers: data documents, properties, guarded deletes."
//! hub_version: "v0.0.0-prealpha"
//! hub_owner: "tbd"
//! ---
use r_hub_client::{Endpoint, Item, ResourceClient, Result};
use serde_json::{json, Map, Value};
use tracing::debug;

/// Replace an item's data document.
pub(crate) fn save_data(client: &ResourceClient, item_id: &str, data: &Value) -> Result<bool> {
    client.update(Endpoint::ItemData, item_id, data)
}

/// Merge `updates` into the item's last known properties and write the whole bag.
///
/// Returns the merged bag so callers can refresh their local copy.
pub(crate) fn merge_properties(
    client: &ResourceClient,
    item: &Item,
    updates: Map<String, Value>,
    extra: Option<Map<String, Value>>,
) -> Result<(bool, Map<String, Value>)> {
    let mut merged = item.properties.clone();
    merged.extend(updates);
    let mut patch = extra.unwrap_or_default();
    patch.insert("properties".to_owned(), Value::Object(merged.clone()));
    let ok = client.update(Endpoint::Item, &item.id, &Value::Object(patch))?;
    Ok((ok, merged))
}

/// Clear the delete guard and delete an item. Missing items count as deleted.
pub(crate) fn delete_item(client: &ResourceClient, item_id: &str) -> Result<bool> {
    match client.set_protected(Endpoint::Item, item_id, false) {
        Ok(_) => {}
        Err(err) if err.is_not_found() => return Ok(true),
        Err(err) => return Err(err),
    }
    match client.delete(Endpoint::Item, item_id) {
        Ok(flag) => {
            debug!(item = item_id, deleted = flag, "item delete");
            Ok(flag)
        }
        Err(err) if err.is_not_found() => Ok(true),
        Err(err) => Err(err),
    }
}

/// Build a one-entry map, for property patches.
pub(crate) fn entry(key: &str, value: impl Into<Value>) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert(key.to_owned(), value.into());
    map
}

/// Top-level item fields that may be changed alongside properties.
pub(crate) fn item_fields(fields: &[(&str, Option<&str>)]) -> Option<Map<String, Value>> {
    let map: Map<String, Value> = fields
        .iter()
        .filter_map(|(key, value)| value.map(|v| ((*key).to_owned(), json!(v))))
        .collect();
    (!map.is_empty()).then_some(map)
}

/// Fetch an item and its data document and wrap them as a typed resource.
pub(crate) fn fetch<T>(
    client: &ResourceClient,
    id: &str,
    build: fn(Item, Value) -> Result<T>,
) -> Result<T> {
    let item = client.get_item(id)?;
    let data = client.get_item_data(id)?;
    build(item, data)
}
