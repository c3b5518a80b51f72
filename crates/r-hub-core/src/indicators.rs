//! ---
//! hub_section: "02-provisioning-orchestration"
//! hub_subsection: "module"
//! hub_type: "source"
//! hub_scope: "code"
//! hub_description: "Indicators embedded in an initiative's data document."
//! hub_version: "v0.0.0-prealpha"
//! hub_owner: "tbd"
//! ---
use std::sync::Arc;

use r_hub_client::{ensure_success, Endpoint, HubError, ResourceClient, Result, Sharing};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::model::{ensure_object, Initiative};
use crate::persist::save_data;

/// Layer an indicator reads from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndicatorSource {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub source_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub mappings: Vec<Value>,
}

/// One entry of an initiative's `indicators` list. Unknown keys are kept.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Indicator {
    pub id: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub indicator_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub optional: bool,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub definition: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<IndicatorSource>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Read-modify-write access to one initiative's indicators.
///
/// Writes work on the raw entries: an entry that does not parse as an
/// [`Indicator`] is left out of `list` but is written back untouched.
pub struct IndicatorManager {
    client: Arc<ResourceClient>,
    initiative: Initiative,
}

impl IndicatorManager {
    pub fn new(client: Arc<ResourceClient>, initiative: Initiative) -> Self {
        Self { client, initiative }
    }

    pub fn initiative(&self) -> &Initiative {
        &self.initiative
    }

    /// Indicators as of the last read or write.
    pub fn list(&self) -> Vec<Indicator> {
        self.initiative
            .indicators()
            .into_iter()
            .filter_map(|entry| match serde_json::from_value(entry) {
                Ok(indicator) => Some(indicator),
                Err(err) => {
                    debug!(initiative = self.initiative.id(), error = %err, "indicator skipped");
                    None
                }
            })
            .collect()
    }

    pub fn get(&self, indicator_id: &str) -> Result<Indicator> {
        self.list()
            .into_iter()
            .find(|indicator| indicator.id == indicator_id)
            .ok_or_else(|| not_found(indicator_id))
    }

    /// Indicators matching every given criterion.
    pub fn search(
        &self,
        url: Option<&str>,
        item_id: Option<&str>,
        name: Option<&str>,
    ) -> Vec<Indicator> {
        self.list()
            .into_iter()
            .filter(|indicator| {
                let source = indicator.source.as_ref();
                url.map_or(true, |url| source.and_then(|s| s.url.as_deref()) == Some(url))
                    && item_id.map_or(true, |id| {
                        source.and_then(|s| s.item_id.as_deref()) == Some(id)
                    })
                    && name.map_or(true, |name| indicator.name.as_deref() == Some(name))
            })
            .collect()
    }

    /// Append an indicator. Ids must be unique within the initiative.
    ///
    /// The source item is shared with the content group when possible; a
    /// refused share is logged and does not fail the add.
    pub fn add(&mut self, indicator: Indicator) -> Result<Indicator> {
        if indicator.id.trim().is_empty() {
            return Err(HubError::Precondition("indicator id is required".to_owned()));
        }
        let mut current = self.refresh()?;
        if current.iter().any(|entry| entry_id(entry) == Some(indicator.id.as_str())) {
            return Err(HubError::Precondition(format!(
                "indicator '{}' already exists",
                indicator.id
            )));
        }
        current.push(serde_json::to_value(&indicator)?);
        self.write(current)?;
        self.share_source(&indicator);
        Ok(indicator)
    }

    /// Replace the indicator with the same id.
    pub fn update(&mut self, indicator: Indicator) -> Result<Indicator> {
        if indicator.id.trim().is_empty() {
            return Err(HubError::Precondition("indicator id is required".to_owned()));
        }
        let mut current = self.refresh()?;
        let slot = current
            .iter_mut()
            .find(|entry| entry_id(entry) == Some(indicator.id.as_str()))
            .ok_or_else(|| not_found(&indicator.id))?;
        *slot = serde_json::to_value(&indicator)?;
        self.write(current)?;
        Ok(indicator)
    }

    pub fn delete(&mut self, indicator_id: &str) -> Result<()> {
        let mut current = self.refresh()?;
        let before = current.len();
        current.retain(|entry| entry_id(entry) != Some(indicator_id));
        if current.len() == before {
            return Err(not_found(indicator_id));
        }
        self.write(current)
    }

    /// Re-read the data document so writes start from the latest state.
    fn refresh(&mut self) -> Result<Vec<Value>> {
        let data = self.client.get_item_data(self.initiative.id())?;
        *self.initiative.data_mut() = data;
        Ok(self.initiative.indicators())
    }

    fn write(&mut self, indicators: Vec<Value>) -> Result<()> {
        let count = indicators.len();
        let mut data = self.initiative.data().clone();
        ensure_object(&mut data).insert("indicators".to_owned(), Value::Array(indicators));
        let id = self.initiative.id().to_owned();
        ensure_success(save_data(&self.client, &id, &data)?, "write indicators", &id)?;
        *self.initiative.data_mut() = data;
        debug!(initiative = %id, count, "indicators written");
        Ok(())
    }

    fn share_source(&self, indicator: &Indicator) {
        let item_id = indicator.source.as_ref().and_then(|s| s.item_id.as_deref());
        let (Some(item_id), Some(group)) = (item_id, self.initiative.content_group_id()) else {
            return;
        };
        match self.client.share_item(item_id, &Sharing::with_groups([group])) {
            Ok(refused) if refused.is_empty() => {}
            Ok(_) => warn!(item = item_id, group, "indicator source not shared"),
            Err(err) => warn!(item = item_id, group, error = %err, "indicator source not shared"),
        }
    }
}

fn entry_id(entry: &Value) -> Option<&str> {
    entry.get("id").and_then(Value::as_str)
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Vec<Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default())
}

fn not_found(indicator_id: &str) -> HubError {
    HubError::NotFound {
        endpoint: Endpoint::ItemData,
        id: format!("indicator {indicator_id}"),
    }
}
