//! ---
//! hub_section: "02-provisioning-orchestration"
//! hub_subsection: "module"
//! hub_type: "source"
//! hub_scope: "code"
//! hub_description: "Typed views over initiative, site and page items and their data documents."
//! hub_version: "v0.0.0-prealpha"
//! hub_owner: "tbd"
//! ---
use r_hub_client::{HubError, Item, ResourceKind, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Group ids created for an initiative or a site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupSet {
    pub content: String,
    pub collaboration: String,
    #[serde(default)]
    pub followers: Option<String>,
}

impl GroupSet {
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        [Some(self.content.as_str()), Some(self.collaboration.as_str()), self.followers.as_deref()]
            .into_iter()
            .flatten()
    }
}

/// Entry of a site's `values.pages` list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRef {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub slug: String,
}

/// Entry of a page's `values.sites` list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteRef {
    pub id: String,
    pub title: String,
}

/// URL slug for a title: lowercase with spaces as hyphens.
pub fn slugify(title: &str) -> String {
    title.trim().replace(' ', "-").to_lowercase()
}

/// Optional clauses narrowing a search for one kind of hub item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchFilter {
    pub title: Option<String>,
    pub owner: Option<String>,
    /// Portal date range, e.g. `[1640995200000 TO 1672531199000]`.
    pub created: Option<String>,
    pub modified: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl SearchFilter {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    /// Portal query for items carrying `marker`, narrowed by every set clause.
    pub fn to_query(&self, marker: &str) -> String {
        let mut clauses = vec![format!("typekeywords:{marker}")];
        let fields = [
            ("title", &self.title),
            ("owner", &self.owner),
            ("created", &self.created),
            ("modified", &self.modified),
        ];
        for (field, value) in fields {
            if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
                clauses.push(format!("{field}:{value}"));
            }
        }
        clauses.extend(self.tags.iter().map(|tag| format!("tags:{tag}")));
        clauses.join(" AND ")
    }
}

fn require_kind(item: &Item, expected: ResourceKind) -> Result<()> {
    if item.kind() == expected {
        Ok(())
    } else {
        Err(HubError::WrongKind {
            id: item.id.clone(),
            expected,
            found: item.kind(),
        })
    }
}

/// `values` object of a data document, if present.
pub(crate) fn values(data: &Value) -> Option<&Map<String, Value>> {
    data.get("values").and_then(Value::as_object)
}

/// `values` object of a data document, created when missing.
pub(crate) fn values_mut(data: &mut Value) -> &mut Map<String, Value> {
    let root = ensure_object(data);
    ensure_object(root.entry("values").or_insert_with(|| json!({})))
}

/// Coerce `value` into an object, replacing any non-object content.
pub(crate) fn ensure_object(value: &mut Value) -> &mut Map<String, Value> {
    if !value.is_object() {
        *value = Value::Object(Map::new());
    }
    match value {
        Value::Object(map) => map,
        _ => unreachable!("value was just replaced by an object"),
    }
}

fn value_str<'a>(data: &'a Value, key: &str) -> Option<&'a str> {
    values(data)
        .and_then(|values| values.get(key))
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

fn value_list<T: for<'de> Deserialize<'de>>(data: &Value, key: &str) -> Vec<T> {
    values(data)
        .and_then(|values| values.get(key))
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter_map(|entry| serde_json::from_value(entry.clone()).ok())
                .collect()
        })
        .unwrap_or_default()
}

macro_rules! typed_item {
    ($name:ident, $kind:expr) => {
        impl $name {
            /// Wrap an item and its data document, rejecting any other kind.
            pub fn from_parts(item: Item, data: Value) -> Result<Self> {
                require_kind(&item, $kind)?;
                Ok(Self { item, data })
            }

            pub fn item(&self) -> &Item {
                &self.item
            }

            pub fn data(&self) -> &Value {
                &self.data
            }

            pub fn id(&self) -> &str {
                &self.item.id
            }

            pub fn title(&self) -> &str {
                &self.item.title
            }

            pub fn url(&self) -> Option<&str> {
                self.item.url.as_deref()
            }

            pub(crate) fn item_mut(&mut self) -> &mut Item {
                &mut self.item
            }

            pub(crate) fn data_mut(&mut self) -> &mut Value {
                &mut self.data
            }
        }
    };
}

/// An item marked `hubInitiative` together with its data document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Initiative {
    item: Item,
    data: Value,
}

typed_item!(Initiative, ResourceKind::Initiative);

impl Initiative {
    pub fn content_group_id(&self) -> Option<&str> {
        self.item.property_str("contentGroupId")
    }

    pub fn collab_group_id(&self) -> Option<&str> {
        self.item.property_str("collaborationGroupId")
    }

    pub fn followers_group_id(&self) -> Option<&str> {
        self.item.property_str("followersGroupId")
    }

    /// Site id from the item properties, falling back to the first
    /// "inform" step of the data document.
    pub fn site_id(&self) -> Option<&str> {
        self.item.property_str("siteId").or_else(|| {
            self.data
                .get("steps")
                .and_then(Value::as_array)
                .and_then(|steps| steps.iter().find(|s| s["id"] == "informTools"))
                .and_then(|step| step["itemIds"].get(0))
                .and_then(Value::as_str)
        })
    }

    /// Indicator definitions embedded in the data document.
    pub fn indicators(&self) -> Vec<Value> {
        self.data
            .get("indicators")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default()
    }
}

/// An item marked `hubSite` together with its data document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Site {
    item: Item,
    data: Value,
}

typed_item!(Site, ResourceKind::Site);

impl Site {
    pub fn subdomain(&self) -> Option<&str> {
        value_str(&self.data, "subdomain")
    }

    pub fn content_group_id(&self) -> Option<&str> {
        self.item.property_str("contentGroupId").or_else(|| {
            self.data
                .pointer("/catalog/groups/0")
                .and_then(Value::as_str)
        })
    }

    pub fn collab_group_id(&self) -> Option<&str> {
        self.item
            .property_str("collaborationGroupId")
            .or_else(|| value_str(&self.data, "collaborationGroupId"))
    }

    pub fn followers_group_id(&self) -> Option<&str> {
        self.item.property_str("followersGroupId")
    }

    pub fn parent_initiative_id(&self) -> Option<&str> {
        value_str(&self.data, "parentInitiativeId")
            .or_else(|| self.item.property_str("parentInitiativeId"))
    }

    /// Domain registry id stored when the site was registered.
    pub fn domain_site_id(&self) -> Option<&str> {
        value_str(&self.data, "siteId")
    }

    pub fn client_id(&self) -> Option<&str> {
        value_str(&self.data, "clientId")
    }

    pub fn pages(&self) -> Vec<PageRef> {
        value_list(&self.data, "pages")
    }

    pub fn catalog_groups(&self) -> Vec<String> {
        self.data
            .pointer("/catalog/groups")
            .and_then(Value::as_array)
            .map(|groups| {
                groups
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn layout(&self) -> Option<&Value> {
        values(&self.data).and_then(|values| values.get("layout"))
    }

    pub fn theme(&self) -> Option<&Value> {
        values(&self.data).and_then(|values| values.get("theme"))
    }

    pub(crate) fn set_pages(&mut self, pages: &[PageRef]) {
        values_mut(&mut self.data).insert("pages".to_owned(), json!(pages));
    }

    pub(crate) fn set_catalog_groups(&mut self, groups: &[String]) {
        let root = ensure_object(&mut self.data);
        let catalog = ensure_object(root.entry("catalog").or_insert_with(|| json!({})));
        catalog.insert("groups".to_owned(), json!(groups));
    }
}

/// An item marked `hubPage` together with its data document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page {
    item: Item,
    data: Value,
}

typed_item!(Page, ResourceKind::Page);

impl Page {
    pub fn sites(&self) -> Vec<SiteRef> {
        value_list(&self.data, "sites")
    }

    /// Slug recorded on the page, or one derived from the title.
    pub fn slug(&self) -> String {
        value_str(&self.data, "slug")
            .map(str::to_owned)
            .unwrap_or_else(|| slugify(self.title()))
    }

    pub fn layout(&self) -> Option<&Value> {
        values(&self.data).and_then(|values| values.get("layout"))
    }

    pub(crate) fn set_sites(&mut self, sites: &[SiteRef]) {
        values_mut(&mut self.data).insert("sites".to_owned(), json!(sites));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(keywords: &[&str], properties: Value) -> Item {
        serde_json::from_value(json!({
            "id": "i1",
            "title": "Vision Zero",
            "typeKeywords": keywords,
            "properties": properties
        }))
        .unwrap()
    }

    #[test]
    fn wrong_kind_is_rejected() {
        let err = Initiative::from_parts(item(&["hubSite"], json!({})), json!({})).unwrap_err();
        assert!(matches!(
            err,
            HubError::WrongKind {
                expected: ResourceKind::Initiative,
                found: ResourceKind::Site,
                ..
            }
        ));
    }

    #[test]
    fn initiative_site_id_falls_back_to_steps() {
        let initiative = Initiative::from_parts(
            item(&["hubInitiative"], json!({"contentGroupId": "g1"})),
            json!({"steps": [{"id": "informTools", "itemIds": ["site9"]}]}),
        )
        .unwrap();
        assert_eq!(initiative.site_id(), Some("site9"));
        assert_eq!(initiative.content_group_id(), Some("g1"));
        assert_eq!(initiative.collab_group_id(), None);
    }

    #[test]
    fn site_pages_round_trip_through_values() {
        let mut site = Site::from_parts(item(&["hubSite"], json!({})), Value::Null).unwrap();
        assert!(site.pages().is_empty());
        let pages = vec![PageRef {
            id: "p1".into(),
            title: "About".into(),
            slug: "about".into(),
        }];
        site.set_pages(&pages);
        assert_eq!(site.pages(), pages);
        site.set_catalog_groups(&["g1".to_owned()]);
        assert_eq!(site.content_group_id(), Some("g1"));
    }

    #[test]
    fn filter_clauses_are_joined_with_and() {
        let filter = SearchFilter {
            title: Some("Vision".into()),
            owner: Some("hub-admin".into()),
            tags: vec!["safety".into()],
            ..SearchFilter::default()
        };
        assert_eq!(
            filter.to_query("hubInitiative"),
            "typekeywords:hubInitiative AND title:Vision AND owner:hub-admin AND tags:safety"
        );
        assert_eq!(SearchFilter::default().to_query("hubSite"), "typekeywords:hubSite");
    }

    #[test]
    fn page_slug_defaults_to_title() {
        let page = Page::from_parts(item(&["hubPage"], json!({})), json!({})).unwrap();
        assert_eq!(page.slug(), "vision-zero");
    }
}
