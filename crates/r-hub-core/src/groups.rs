//! ---
//! hub_section: "02-provisioning-orchestration"
//! hub_subsection: "module"
//! hub_type: "source"
//! hub_scope: "code"
//! hub_description: "Group provisioner creating protected content, core team and followers groups."
//! hub_version: "v0.0.0-prealpha"
//! hub_owner: "tbd"
//! ---
use std::sync::Arc;

use r_hub_client::{ensure_success, Endpoint, HubError, OrgContext, ResourceClient, Result};
use serde::{Deserialize, Serialize};
use serde_json::json;
use strum::Display;
use tracing::{debug, warn};

use crate::model::GroupSet;

/// Purpose of a supporting group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum GroupRole {
    /// Public catalog of the resource's content.
    Content,
    /// Org members allowed to edit the resource.
    CoreTeam,
    /// Public followers; premium hubs only.
    Followers,
}

impl GroupRole {
    pub fn title_for(&self, title: &str) -> String {
        match self {
            GroupRole::Content => format!("{title} Content"),
            GroupRole::CoreTeam => format!("{title} Core Team"),
            GroupRole::Followers => format!("{title} Followers"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum GroupAccess {
    Public,
    Org,
    Private,
}

/// Which tag vocabulary a group belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupScope {
    Initiative,
    HubSite,
    EnterpriseSite,
}

/// Payload of a group create.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupDraft {
    pub title: String,
    pub access: GroupAccess,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capabilities: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub membership_access: Option<String>,
}

impl GroupDraft {
    fn new(title: String, access: GroupAccess, tags: &[&str]) -> Self {
        Self {
            title,
            access,
            tags: tags.iter().map(|t| (*t).to_owned()).collect(),
            snippet: None,
            capabilities: None,
            membership_access: None,
        }
    }

    /// Draft for one role within a scope, named after `title`.
    pub fn for_role(scope: GroupScope, role: GroupRole, title: &str) -> Self {
        let name = role.title_for(title);
        let editors = format!(
            "Members of this group can create, edit, and manage the site, pages, and other content related to {title}."
        );
        match (scope, role) {
            (GroupScope::Initiative, GroupRole::Content) => GroupDraft::new(
                name,
                GroupAccess::Public,
                &["Hub Group", "Hub Content Group", "Hub Site Group", "Hub Initiative Group"],
            ),
            (GroupScope::Initiative, GroupRole::CoreTeam) => GroupDraft {
                snippet: Some(editors),
                capabilities: Some("updateitemcontrol".to_owned()),
                membership_access: Some("collaboration".to_owned()),
                ..GroupDraft::new(
                    name,
                    GroupAccess::Org,
                    &[
                        "Hub Group",
                        "Hub Initiative Group",
                        "Hub Site Group",
                        "Hub Core Team Group",
                        "Hub Team Group",
                    ],
                )
            },
            (_, GroupRole::Followers) => GroupDraft::new(
                name,
                GroupAccess::Public,
                &["Hub Group", "Hub Initiative Group", "Hub Initiative Followers Group"],
            ),
            (GroupScope::HubSite, GroupRole::Content) => GroupDraft::new(
                name,
                GroupAccess::Public,
                &["Hub Group", "Hub Content Group", "Hub Site Group"],
            ),
            (GroupScope::HubSite, GroupRole::CoreTeam) => GroupDraft {
                snippet: Some(editors),
                capabilities: Some("updateitemcontrol".to_owned()),
                membership_access: Some("collaboration".to_owned()),
                ..GroupDraft::new(
                    name,
                    GroupAccess::Org,
                    &["Hub Group", "Hub Site Group", "Hub Core Team Group", "Hub Team Group"],
                )
            },
            (GroupScope::EnterpriseSite, GroupRole::Content) => GroupDraft {
                snippet: Some(format!(
                    "Applications, maps, data, etc. shared with this group generates the {title} content catalog."
                )),
                ..GroupDraft::new(name, GroupAccess::Org, &["Sites Group", "Sites Content Group"])
            },
            (GroupScope::EnterpriseSite, GroupRole::CoreTeam) => GroupDraft {
                snippet: Some(editors),
                capabilities: Some("updateitemcontrol".to_owned()),
                membership_access: Some("org".to_owned()),
                ..GroupDraft::new(
                    name,
                    GroupAccess::Org,
                    &["Sites Group", "Sites Core Team Group"],
                )
            },
        }
    }

    /// Draft for the group backing a hub event.
    pub fn for_event(title: &str, event_id: i64) -> Self {
        GroupDraft::new(
            title.to_owned(),
            GroupAccess::Public,
            &["Hub Event Group", "Open Data", &format!("hubEvent|{event_id}")],
        )
    }
}

/// Creates the supporting groups of initiatives and sites.
///
/// Every group is protected right after it is created. Creates are not
/// transactional with each other: a failure leaves earlier groups in place.
/// The provisioning workflow records each id between create and protect.
#[derive(Clone)]
pub struct GroupProvisioner {
    client: Arc<ResourceClient>,
    org: Arc<OrgContext>,
}

impl GroupProvisioner {
    pub fn new(client: Arc<ResourceClient>, org: Arc<OrgContext>) -> Self {
        Self { client, org }
    }

    /// Roles created for a scope on this organisation's tier.
    pub fn roles(&self, scope: GroupScope) -> Vec<GroupRole> {
        let mut roles = vec![GroupRole::Content, GroupRole::CoreTeam];
        if scope == GroupScope::Initiative && self.org.is_premium() {
            roles.push(GroupRole::Followers);
        }
        roles
    }

    /// Content, core team and (premium) followers groups for an initiative.
    pub fn provision_groups(&self, title: &str) -> Result<GroupSet> {
        self.provision(GroupScope::Initiative, title)
    }

    /// Content and core team groups for a standalone site.
    pub fn provision_site_groups(&self, title: &str) -> Result<GroupSet> {
        let scope = if self.org.is_online() {
            GroupScope::HubSite
        } else {
            GroupScope::EnterpriseSite
        };
        self.provision(scope, title)
    }

    fn provision(&self, scope: GroupScope, title: &str) -> Result<GroupSet> {
        let mut content = None;
        let mut collaboration = None;
        let mut followers = None;
        for role in self.roles(scope) {
            let id = self.create_group(scope, role, title)?;
            match role {
                GroupRole::Content => content = Some(id),
                GroupRole::CoreTeam => collaboration = Some(id),
                GroupRole::Followers => followers = Some(id),
            }
        }
        match (content, collaboration) {
            (Some(content), Some(collaboration)) => Ok(GroupSet {
                content,
                collaboration,
                followers,
            }),
            _ => Err(HubError::UnexpectedResponse(
                "group provisioning finished without content and core team groups".to_owned(),
            )),
        }
    }

    /// Create one role's group and protect it.
    pub fn create_group(&self, scope: GroupScope, role: GroupRole, title: &str) -> Result<String> {
        self.create_protected(&GroupDraft::for_role(scope, role, title))
    }

    /// Create one role's group without protecting it.
    ///
    /// For callers that persist the id first and then call [`Self::protect`].
    /// Recorded ids are re-checked with [`Self::ensure_protected`].
    pub fn create_unprotected(
        &self,
        scope: GroupScope,
        role: GroupRole,
        title: &str,
    ) -> Result<String> {
        self.create_draft(&GroupDraft::for_role(scope, role, title))
    }

    /// Create a group from a draft and protect it immediately.
    ///
    /// A group that cannot be protected is deleted again before the error
    /// is returned, so no id escapes unrecorded.
    pub fn create_protected(&self, draft: &GroupDraft) -> Result<String> {
        let id = self.create_draft(draft)?;
        if let Err(err) = self.protect(&id) {
            match self.client.delete(Endpoint::Group, &id) {
                Ok(true) => debug!(group = %id, "unprotected group discarded"),
                Ok(false) | Err(_) => warn!(group = %id, error = %err, "group left unprotected"),
            }
            return Err(err);
        }
        Ok(id)
    }

    fn create_draft(&self, draft: &GroupDraft) -> Result<String> {
        let id = self
            .client
            .create(Endpoint::Group, &serde_json::to_value(draft)?)?;
        debug!(group = %id, title = %draft.title, "group created");
        Ok(id)
    }

    /// Set the delete guard on a group.
    pub fn protect(&self, group_id: &str) -> Result<()> {
        ensure_success(
            self.client.set_protected(Endpoint::Group, group_id, true)?,
            "protect",
            group_id,
        )
    }

    /// [`Self::protect`] unless the group already reports itself protected.
    pub fn ensure_protected(&self, group_id: &str) -> Result<()> {
        let group = self.client.get(Endpoint::Group, group_id)?;
        if group["protected"] == json!(true) {
            return Ok(());
        }
        self.protect(group_id)
    }

    /// Clear protection and delete a group. A group that is already gone is fine.
    pub fn release(&self, group_id: &str) -> Result<()> {
        match self.client.set_protected(Endpoint::Group, group_id, false) {
            Ok(_) => {}
            Err(err) if err.is_not_found() => return Ok(()),
            Err(err) => return Err(err),
        }
        match self.client.delete(Endpoint::Group, group_id) {
            Ok(flag) => ensure_success(flag, "delete group", group_id),
            Err(err) if err.is_not_found() => Ok(()),
            Err(err) => Err(err),
        }
    }

    /// Rename a group to `role.title_for(title)`.
    pub fn rename(&self, group_id: &str, role: GroupRole, title: &str) -> Result<()> {
        let flag = self.client.update(
            Endpoint::Group,
            group_id,
            &json!({ "title": role.title_for(title) }),
        )?;
        ensure_success(flag, "rename group", group_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_team_draft_carries_update_control() {
        let draft =
            GroupDraft::for_role(GroupScope::Initiative, GroupRole::CoreTeam, "Vision Zero");
        let value = serde_json::to_value(&draft).unwrap();
        assert_eq!(value["title"], "Vision Zero Core Team");
        assert_eq!(value["access"], "org");
        assert_eq!(value["capabilities"], "updateitemcontrol");
        assert_eq!(value["membershipAccess"], "collaboration");
    }

    #[test]
    fn content_draft_is_public_without_capabilities() {
        let value = serde_json::to_value(GroupDraft::for_role(
            GroupScope::Initiative,
            GroupRole::Content,
            "Vision Zero",
        ))
        .unwrap();
        assert_eq!(value["access"], "public");
        assert!(value.get("capabilities").is_none());
        assert_eq!(value["tags"][3], "Hub Initiative Group");
    }

    #[test]
    fn enterprise_groups_use_sites_vocabulary() {
        let draft = GroupDraft::for_role(GroupScope::EnterpriseSite, GroupRole::CoreTeam, "parks");
        assert_eq!(draft.tags, vec!["Sites Group", "Sites Core Team Group"]);
        assert_eq!(draft.membership_access.as_deref(), Some("org"));
    }

    #[test]
    fn event_group_is_tagged_with_event_id() {
        let draft = GroupDraft::for_event("Town Hall", 7);
        assert!(draft.tags.contains(&"hubEvent|7".to_owned()));
    }
}
