//! ---
//! hub_section: "05-networking-external-interfaces"
//! hub_subsection: "module"
//! hub_type: "source"
//! hub_scope: "code"
//! hub_description: "Organisation context resolved from the portal's self description."
//! hub_version: "v0.0.0-prealpha"
//! hub_owner: "tbd"
//! ---
use r_hub_common::HubTier;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::Display;
use url::Url;

use crate::error::{HubError, Result};

/// Which portal product hosts the hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PortalFlavor {
    /// ArcGIS Online: hosted domains through the hub domain registry.
    Online,
    /// Self-hosted Enterprise portal: subdomain carried in a type keyword.
    Enterprise,
}

/// The signed-in user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub username: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub culture: Option<String>,
}

/// Everything the managers need to know about the organisation they act for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrgContext {
    pub org_id: String,
    pub url_key: String,
    pub name: String,
    pub portal_url: Url,
    pub flavor: PortalFlavor,
    pub tier: HubTier,
    pub user: UserInfo,
    #[serde(default)]
    pub default_basemap: Value,
    #[serde(default)]
    pub default_extent: Value,
    #[serde(default)]
    pub shared_theme_header: Option<Value>,
}

impl OrgContext {
    /// Build the context from a `portals/self` response.
    pub fn from_portal_self(portal_url: Url, body: &Value) -> Result<Self> {
        let org_id = body
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| HubError::UnexpectedResponse("portals/self lacks 'id'".to_owned()))?
            .to_owned();
        let is_portal = body
            .get("isPortal")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let flavor = if is_portal {
            PortalFlavor::Enterprise
        } else {
            PortalFlavor::Online
        };
        let url_key = body
            .get("urlKey")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned();
        if flavor == PortalFlavor::Online && url_key.is_empty() {
            return Err(HubError::UnexpectedResponse(
                "online organisation has no 'urlKey'".to_owned(),
            ));
        }
        let premium = body
            .pointer("/subscriptionInfo/hubSettings/enabled")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let user = match body.get("user") {
            Some(user) if user.is_object() => serde_json::from_value(user.clone())?,
            _ => UserInfo::default(),
        };

        Ok(Self {
            org_id,
            url_key,
            name: body
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_owned(),
            portal_url,
            flavor,
            tier: if premium {
                HubTier::Premium
            } else {
                HubTier::Basic
            },
            user,
            default_basemap: body.get("defaultBasemap").cloned().unwrap_or(Value::Null),
            default_extent: body.get("defaultExtent").cloned().unwrap_or(Value::Null),
            shared_theme_header: body
                .pointer("/portalProperties/sharedTheme/header")
                .cloned(),
        })
    }

    /// Replace the tier reported by the portal.
    pub fn with_tier(mut self, tier: HubTier) -> Self {
        self.tier = tier;
        self
    }

    pub fn is_online(&self) -> bool {
        self.flavor == PortalFlavor::Online
    }

    pub fn is_premium(&self) -> bool {
        self.tier.is_premium()
    }

    /// Premium hubs on ArcGIS Online organise sites under initiatives.
    pub fn requires_initiatives(&self) -> bool {
        self.is_online() && self.is_premium()
    }
}
