//! ---
//! hub_section: "05-networking-external-interfaces"
//! hub_subsection: "module"
//! hub_type: "source"
//! hub_scope: "code"
//! hub_description: "Portal item model and resource-kind classification."
//! hub_version: "v0.0.0-prealpha"
//! hub_owner: "tbd"
//! ---
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use strum::{Display, EnumString};

/// Closed set of hub resource kinds, decided once from `typeKeywords`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ResourceKind {
    Initiative,
    Site,
    Page,
    EventsLayer,
    #[default]
    Other,
}

impl ResourceKind {
    const CLASSIFIED: [ResourceKind; 4] = [
        ResourceKind::Initiative,
        ResourceKind::Site,
        ResourceKind::Page,
        ResourceKind::EventsLayer,
    ];

    /// Type keyword that marks an item as this kind.
    pub fn marker(&self) -> Option<&'static str> {
        match self {
            ResourceKind::Initiative => Some("hubInitiative"),
            ResourceKind::Site => Some("hubSite"),
            ResourceKind::Page => Some("hubPage"),
            ResourceKind::EventsLayer => Some("hubEventsLayer"),
            ResourceKind::Other => None,
        }
    }

    /// Classify a keyword list. Matching is exact per keyword.
    pub fn classify<S: AsRef<str>>(keywords: &[S]) -> Self {
        Self::CLASSIFIED
            .into_iter()
            .find(|kind| {
                kind.marker()
                    .is_some_and(|marker| keywords.iter().any(|k| k.as_ref() == marker))
            })
            .unwrap_or(ResourceKind::Other)
    }
}

/// Wire shape of an item; tolerant of nulls and missing collections.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawItem {
    id: String,
    #[serde(default)]
    owner: String,
    #[serde(default)]
    title: String,
    #[serde(rename = "type", default)]
    item_type: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    snippet: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    tags: Vec<String>,
    #[serde(default, deserialize_with = "keywords")]
    type_keywords: Vec<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    properties: Map<String, Value>,
    #[serde(default)]
    culture: Option<String>,
    #[serde(default)]
    access: Option<String>,
    #[serde(default)]
    protected: bool,
    #[serde(default)]
    created: Option<i64>,
    #[serde(default)]
    modified: Option<i64>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accepts either a JSON array or the comma separated string form.
fn keywords<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Keywords {
        List(Vec<String>),
        Joined(String),
        Missing(()),
    }

    Ok(match Keywords::deserialize(deserializer)? {
        Keywords::List(list) => list,
        Keywords::Joined(joined) => joined
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_owned)
            .collect(),
        Keywords::Missing(()) => Vec::new(),
    })
}

/// A portal content item with its kind resolved at deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawItem", rename_all = "camelCase")]
pub struct Item {
    pub id: String,
    pub owner: String,
    pub title: String,
    #[serde(rename = "type")]
    pub item_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
    pub tags: Vec<String>,
    pub type_keywords: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub properties: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub culture: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access: Option<String>,
    pub protected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified: Option<i64>,
    #[serde(skip)]
    kind: ResourceKind,
}

impl From<RawItem> for Item {
    fn from(raw: RawItem) -> Self {
        let kind = ResourceKind::classify(&raw.type_keywords);
        Self {
            id: raw.id,
            owner: raw.owner,
            title: raw.title,
            item_type: raw.item_type,
            description: raw.description,
            snippet: raw.snippet,
            tags: raw.tags,
            type_keywords: raw.type_keywords,
            url: raw.url,
            properties: raw.properties,
            culture: raw.culture,
            access: raw.access,
            protected: raw.protected,
            created: raw.created,
            modified: raw.modified,
            kind,
        }
    }
}

impl Item {
    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn has_keyword(&self, keyword: &str) -> bool {
        self.type_keywords.iter().any(|k| k == keyword)
    }

    /// String value of a top-level entry in `properties`.
    pub fn property_str(&self, key: &str) -> Option<&str> {
        self.properties
            .get(key)
            .and_then(Value::as_str)
            .filter(|value| !value.is_empty())
    }
}

/// Payload for creating a new item.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemDraft {
    pub title: String,
    #[serde(rename = "type")]
    pub item_type: String,
    pub type_keywords: Vec<String>,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license_info: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub culture: Option<String>,
    pub properties: Map<String, Value>,
}

impl ItemDraft {
    pub fn new(title: impl Into<String>, item_type: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            item_type: item_type.into(),
            ..Self::default()
        }
    }

    pub fn keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.type_keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn property(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.properties.insert(key.to_owned(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn kind_is_classified_once_from_keywords() {
        let item: Item = serde_json::from_value(json!({
            "id": "a1",
            "title": "Vision Zero",
            "typeKeywords": ["Hub", "hubInitiative", "OpenData"],
            "properties": null
        }))
        .unwrap();
        assert_eq!(item.kind(), ResourceKind::Initiative);
        assert!(item.properties.is_empty());
    }

    #[test]
    fn keyword_match_is_exact() {
        assert_eq!(
            ResourceKind::classify(&["hubSiteApplication"]),
            ResourceKind::Other
        );
        assert_eq!(ResourceKind::classify(&["Hub", "hubPage"]), ResourceKind::Page);
    }

    #[test]
    fn comma_joined_keywords_are_split() {
        let item: Item = serde_json::from_value(json!({
            "id": "s1",
            "typeKeywords": "Hub, hubSite, hubSolution"
        }))
        .unwrap();
        assert_eq!(item.kind(), ResourceKind::Site);
        assert_eq!(item.type_keywords.len(), 3);
    }

    #[test]
    fn draft_serializes_wire_names() {
        let draft = ItemDraft::new("Vision Zero", "Hub Initiative")
            .keywords(["Hub", "hubInitiative"])
            .property("contentGroupId", "g1");
        let value = serde_json::to_value(&draft).unwrap();
        assert_eq!(value["type"], "Hub Initiative");
        assert_eq!(value["typeKeywords"][1], "hubInitiative");
        assert_eq!(value["properties"]["contentGroupId"], "g1");
        assert!(value.get("url").is_none());
    }
}
