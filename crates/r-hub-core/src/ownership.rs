//! ---
//! hub_section: "02-provisioning-orchestration"
//! hub_subsection: "module"
//! hub_type: "source"
//! hub_scope: "code"
//! hub_description: "Ownership transfer of initiatives and sites with their groups."
//! hub_version: "v0.0.0-prealpha"
//! hub_owner: "tbd"
//! ---
//! Moving an initiative or site to another owner.
//!
//! A core team group carries shared update control, which only an
//! administrator may own. When the new owner is an administrator the core
//! team moves with everything shared into it. Otherwise the core team stays
//! where it is and the items are handed over one by one.

use std::sync::Arc;

use r_hub_client::{ensure_success, HubError, OrgContext, ResourceClient, Result, Sharing};
use tracing::{debug, info};

const ADMIN_ROLE: &str = "org_admin";
const GROUP_CONTENT_LIMIT: usize = 100;

/// What changes hands in one transfer.
#[derive(Debug, Clone, Default)]
pub(crate) struct Holdings<'a> {
    /// Items handed over directly when the core team stays behind.
    pub items: Vec<&'a str>,
    pub core_team: Option<&'a str>,
    /// Groups that always follow the new owner.
    pub groups: Vec<&'a str>,
}

#[derive(Clone)]
pub(crate) struct OwnershipTransfer {
    client: Arc<ResourceClient>,
    org: Arc<OrgContext>,
}

impl OwnershipTransfer {
    pub fn new(client: Arc<ResourceClient>, org: Arc<OrgContext>) -> Self {
        Self { client, org }
    }

    pub fn transfer(&self, holdings: &Holdings<'_>, target: &str) -> Result<()> {
        let acting_as_admin = self
            .org
            .user
            .role
            .as_deref()
            .is_some_and(|role| role.contains("admin"));
        if !acting_as_admin {
            return Err(HubError::Precondition(
                "only administrators can reassign hub resources".to_owned(),
            ));
        }
        let target_role = self.client.get_user(target)?.role;

        match holdings.core_team {
            Some(core_team) if target_role.as_deref() == Some(ADMIN_ROLE) => {
                self.move_core_team(core_team, target)?
            }
            _ => {
                for item_id in &holdings.items {
                    self.reassign_item(item_id, target)?;
                }
            }
        }
        for group_id in &holdings.groups {
            ensure_success(
                self.client.reassign_group(group_id, target)?,
                "reassign group",
                group_id,
            )?;
        }
        info!(new_owner = target, items = holdings.items.len(), "ownership transferred");
        Ok(())
    }

    /// Hand the core team and everything shared with it to `target`.
    ///
    /// Items are unshared before the reassign and shared back afterwards,
    /// since an item cannot change owner while shared with a group the new
    /// owner does not belong to.
    fn move_core_team(&self, core_team: &str, target: &str) -> Result<()> {
        if !self.client.group_members(core_team)?.contains(target) {
            let refused = self.client.add_group_users(core_team, &[target])?;
            if !refused.is_empty() {
                return Err(HubError::rejected("add to core team", target));
            }
        }
        let content = self.client.group_content(core_team, GROUP_CONTENT_LIMIT)?;
        let core = Sharing::with_groups([core_team]);
        for item in &content {
            ensure_success(
                self.client.unshare_item(&item.id, &core)?,
                "unshare from core team",
                &item.id,
            )?;
            ensure_success(
                self.client.reassign_item(&item.id, &item.owner, target)?,
                "reassign item",
                &item.id,
            )?;
            let sharing = Sharing {
                confirm_item_control: true,
                ..core.clone()
            };
            if !self.client.share_item(&item.id, &sharing)?.is_empty() {
                return Err(HubError::rejected("share with core team", &item.id));
            }
        }
        debug!(group = core_team, items = content.len(), "core team content moved");
        ensure_success(
            self.client.reassign_group(core_team, target)?,
            "reassign group",
            core_team,
        )
    }

    fn reassign_item(&self, item_id: &str, target: &str) -> Result<()> {
        let item = self.client.get_item(item_id)?;
        if item.owner == target {
            return Ok(());
        }
        ensure_success(
            self.client.reassign_item(item_id, &item.owner, target)?,
            "reassign item",
            item_id,
        )
    }
}
