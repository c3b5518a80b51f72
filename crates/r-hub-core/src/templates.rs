//! ---
//! hub_section: "02-provisioning-orchestration"
//! hub_subsection: "module"
//! hub_type: "source"
//! hub_scope: "code"
//! hub_description: "Data-document templates for initiatives, sites and pages."
//! hub_version: "v0.0.0-prealpha"
//! hub_owner: "tbd"
//! ---
use r_hub_client::{ApiRoots, Result};
use serde_json::{json, Value};

use crate::model::GroupSet;

fn image_asset(roots: &ApiRoots, item_id: &str, id: &str, file: &str, mime: &str) -> Result<Value> {
    Ok(json!({
        "id": id,
        "url": roots.item_resource_url(item_id, file)?.as_str(),
        "properties": {"type": "resource", "fileName": file, "mimeType": mime},
        "license": {"type": "none"},
    }))
}

/// Initiative data document: banner assets, the three workflow steps
/// (the site is the first "inform" tool), no indicators yet, and the group ids.
pub fn initiative_data(
    roots: &ApiRoots,
    initiative_id: &str,
    site_id: &str,
    groups: &GroupSet,
) -> Result<Value> {
    let mut banner = image_asset(
        roots,
        initiative_id,
        "bannerImage",
        "detail-image.jpg",
        "image/jpeg",
    )?;
    banner["display"] = json!({"position": {"x": "center", "y": "center"}});
    Ok(json!({
        "assets": [
            banner,
            image_asset(roots, initiative_id, "iconDark", "icon-dark.png", "image/png")?,
            image_asset(roots, initiative_id, "iconLight", "icon-light.png", "image/png")?,
        ],
        "steps": [
            {
                "id": "informTools",
                "title": "Inform the Public",
                "description": "Share data about your initiative with the public so people can easily find, download and use your data in different formats.",
                "templateIds": [],
                "itemIds": [site_id],
            },
            {
                "id": "listenTools",
                "title": "Listen to the Public",
                "description": "Create ways to gather citizen feedback to help inform your city officials.",
                "templateIds": [],
                "itemIds": [],
            },
            {
                "id": "monitorTools",
                "title": "Monitor Progress",
                "description": "Establish performance measures that incorporate the publics perspective.",
                "templateIds": [],
                "itemIds": [],
            },
        ],
        "indicators": [],
        "values": {
            "collaborationGroupId": groups.collaboration,
            "contentGroupId": groups.content,
            "followersGroupId": groups.followers,
            "bannerImage": {
                "source": "bannerImage",
                "display": {"position": {"x": "center", "y": "center"}},
            },
        },
    }))
}

/// Skeleton site document; the site provisioner fills in identity values.
pub fn site_data(title: &str) -> Value {
    json!({
        "catalog": {"groups": []},
        "values": {
            "title": title,
            "uiVersion": "2.3",
            "layout": {
                "header": {"component": {"name": "site-header", "settings": {"title": title}}},
                "sections": [],
                "footer": {"component": {"name": "site-footer", "settings": {}}},
            },
            "theme": {
                "header": {"background": "#fff", "text": "#000000"},
                "body": {"background": "#fff", "text": "#000000", "link": "#0079c1"},
                "button": {"background": "#0079c1", "text": "#fff"},
            },
            "pages": [],
            "groups": [],
        },
    })
}

/// Default global navigation colours when the org has no shared theme.
pub fn default_global_nav() -> Value {
    json!({"background": "#fff", "text": "#000000"})
}

/// Skeleton page document.
pub fn page_data(title: &str, slug: &str, updated_by: &str) -> Value {
    json!({
        "values": {
            "title": title,
            "slug": slug,
            "layout": {"sections": []},
            "sites": [],
            "updatedBy": updated_by,
        },
    })
}
