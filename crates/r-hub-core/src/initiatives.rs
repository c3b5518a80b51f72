//! ---
//! hub_section: "02-provisioning-orchestration"
//! hub_subsection: "module"
//! hub_type: "source"
//! hub_scope: "code"
//! hub_description: "Initiative orchestrator: recorded provisioning saga and initiative management."
//! hub_version: "v0.0.0-prealpha"
//! hub_owner: "tbd"
//! ---
//! Initiative provisioning.
//!
//! `add` runs the seven steps of [`ProvisioningStep`] in order and writes a
//! [`ProvisioningRecord`] after each one. Every created id lands in the
//! record as soon as the platform returns it, so a failed run can be
//! continued with `resume` (recorded resources are skipped) or undone with
//! `rollback`.

use std::sync::Arc;

use r_hub_client::{
    ensure_success, Endpoint, GroupMembers, HubError, ItemDraft, OrgContext, ResourceClient,
    ResourceKind, Result, Sharing,
};
use r_hub_common::time::copy_title;
use r_hub_common::FailurePolicy;
use r_hub_logging::{hub_debug, hub_error, log_workflow_event, LogContext, WorkflowOutcome};
use serde_json::{Map, Value};
use tracing::{info, warn};
use uuid::Uuid;

use crate::domains::{check_length, normalize_subdomain};
use crate::error::{WorkflowError, WorkflowResult};
use crate::groups::{GroupProvisioner, GroupRole, GroupScope};
use crate::indicators::IndicatorManager;
use crate::linker::ReferenceLinker;
use crate::model::{Initiative, SearchFilter, Site};
use crate::ownership::{Holdings, OwnershipTransfer};
use crate::persist::{delete_item, fetch, save_data};
use crate::sites::SiteManager;
use crate::templates::initiative_data;
use crate::workflow::{ProvisioningRecord, ProvisioningStep, ProvisioningStore, WorkflowStatus};

const INITIATIVE_KEYWORDS: [&str; 3] = ["Hub", "hubInitiative", "OpenData"];
const DEFAULT_SNIPPET: &str = "Create your own initiative by combining existing applications with a custom site. Use this initiative to form teams around a problem and invite your community to participate.";

/// Input of [`InitiativeOrchestrator::add`].
#[derive(Debug, Clone, Default)]
pub struct NewInitiative {
    pub title: String,
    pub description: Option<String>,
    /// Site to clone instead of provisioning a fresh one.
    pub template_site: Option<Site>,
}

impl NewInitiative {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

#[derive(Clone)]
pub struct InitiativeOrchestrator {
    client: Arc<ResourceClient>,
    org: Arc<OrgContext>,
    groups: GroupProvisioner,
    sites: SiteManager,
    linker: ReferenceLinker,
    ownership: OwnershipTransfer,
    store: Arc<dyn ProvisioningStore>,
    policy: FailurePolicy,
}

impl InitiativeOrchestrator {
    pub fn new(
        client: Arc<ResourceClient>,
        org: Arc<OrgContext>,
        store: Arc<dyn ProvisioningStore>,
        policy: FailurePolicy,
    ) -> Self {
        Self {
            groups: GroupProvisioner::new(client.clone(), org.clone()),
            sites: SiteManager::new(client.clone(), org.clone()),
            linker: ReferenceLinker::new(client.clone()),
            ownership: OwnershipTransfer::new(client.clone(), org.clone()),
            client,
            org,
            store,
            policy,
        }
    }

    /// Provision an initiative with its groups and site.
    ///
    /// Always starts a new workflow. On failure the returned
    /// [`WorkflowError::Aborted`] carries the workflow id for `resume` or
    /// `rollback`.
    pub fn add(&self, request: NewInitiative) -> WorkflowResult<Initiative> {
        let title = request.title.trim().to_owned();
        if title.is_empty() {
            return Err(HubError::Precondition("initiative title is required".to_owned()).into());
        }
        let url_key = self.org.is_online().then_some(self.org.url_key.as_str());
        check_length(&normalize_subdomain(&title), url_key)?;

        let mut record = ProvisioningRecord::new(title, request.description);
        record.template_site_id = request.template_site.as_ref().map(|s| s.id().to_owned());
        record.mark_done(ProvisioningStep::Validate);
        self.save(&record)?;
        info!(workflow = %record.id, title = %record.title, "initiative provisioning started");
        self.drive(&mut record, request.template_site.as_ref())
    }

    /// Continue a recorded workflow from its first incomplete step.
    pub fn resume(&self, workflow_id: Uuid) -> WorkflowResult<Initiative> {
        let mut record = self.load(workflow_id)?;
        match record.status {
            WorkflowStatus::RolledBack => {
                return Err(HubError::Precondition(format!(
                    "workflow {workflow_id} was rolled back"
                ))
                .into())
            }
            WorkflowStatus::Completed => {
                let id = record.initiative_id.clone().ok_or_else(|| {
                    WorkflowError::Store(anyhow::anyhow!(
                        "completed workflow {workflow_id} has no initiative id"
                    ))
                })?;
                return Ok(self.get(&id)?);
            }
            WorkflowStatus::InProgress | WorkflowStatus::Aborted => {}
        }
        let template = match record.template_site_id.as_deref() {
            Some(id) => Some(self.sites.get(id)?),
            None => None,
        };
        record.mark_in_progress();
        self.save(&record)?;
        self.drive(&mut record, template.as_ref())
    }

    /// Remove everything a workflow created, newest first.
    pub fn rollback(&self, workflow_id: Uuid) -> WorkflowResult<ProvisioningRecord> {
        let mut record = self.load(workflow_id)?;
        self.compensate(&mut record)?;
        Ok(record)
    }

    pub fn workflows(&self) -> WorkflowResult<Vec<ProvisioningRecord>> {
        self.store.list().map_err(WorkflowError::Store)
    }

    fn load(&self, workflow_id: Uuid) -> WorkflowResult<ProvisioningRecord> {
        self.store
            .load(workflow_id)
            .map_err(WorkflowError::Store)?
            .ok_or(WorkflowError::UnknownWorkflow(workflow_id))
    }

    fn save(&self, record: &ProvisioningRecord) -> WorkflowResult<()> {
        self.store.save(record).map_err(WorkflowError::Store)
    }

    fn drive(
        &self,
        record: &mut ProvisioningRecord,
        template: Option<&Site>,
    ) -> WorkflowResult<Initiative> {
        let workflow = record.id.to_string();
        while let Some(step) = record.next_step() {
            let step_name = step.to_string();
            let ctx = LogContext::new()
                .with_workflow(&workflow)
                .with_resource("initiative")
                .with_step(&step_name);
            match self.run_step(step, record, template) {
                Ok(outcome) => {
                    record.mark_done(step);
                    self.save(record)?;
                    log_workflow_event(Some(&ctx), "initiative.step", &step_name, outcome);
                }
                Err(source) => {
                    record.mark_failed(step, &source);
                    self.save(record)?;
                    log_workflow_event(
                        Some(&ctx),
                        "initiative.step",
                        &source.to_string(),
                        WorkflowOutcome::Aborted,
                    );
                    if self.policy == FailurePolicy::Compensate {
                        if let Err(err) = self.compensate(record) {
                            hub_error!(context = ctx, "compensation failed: {err}");
                        }
                    }
                    return Err(WorkflowError::Aborted {
                        workflow_id: record.id,
                        step,
                        source,
                    });
                }
            }
        }
        let id = record.initiative_id.clone().ok_or_else(|| {
            WorkflowError::Store(anyhow::anyhow!(
                "workflow {} finished without an initiative",
                record.id
            ))
        })?;
        info!(workflow = %record.id, initiative = %id, "initiative provisioned");
        Ok(self.get(&id)?)
    }

    fn run_step(
        &self,
        step: ProvisioningStep,
        record: &mut ProvisioningRecord,
        template: Option<&Site>,
    ) -> Result<WorkflowOutcome> {
        match step {
            ProvisioningStep::Validate => Ok(WorkflowOutcome::Completed),
            ProvisioningStep::CreateGroups => self.create_groups(record),
            ProvisioningStep::CreateItem => self.create_item(record),
            ProvisioningStep::ShareItem => {
                let (item_id, groups) = recorded(record)?;
                let sharing = Sharing {
                    confirm_item_control: true,
                    ..Sharing::with_groups([groups.collaboration])
                };
                if !self.client.share_item(&item_id, &sharing)?.is_empty() {
                    return Err(HubError::rejected("share initiative", item_id));
                }
                Ok(WorkflowOutcome::Completed)
            }
            ProvisioningStep::ProvisionSite => self.provision_site(record, template),
            ProvisioningStep::CrossLink => {
                let (item_id, _) = recorded(record)?;
                let site_id = record.site_id.clone().ok_or_else(|| {
                    HubError::Precondition("no site recorded for cross-link".to_owned())
                })?;
                let mut initiative = self.get(&item_id)?;
                let mut site = self.sites.get(&site_id)?;
                let linked = self.linker.link_initiative(&mut initiative, &mut site)?;
                ensure_success(linked, "link initiative", &item_id)?;
                Ok(WorkflowOutcome::Completed)
            }
            ProvisioningStep::WriteData => {
                let (item_id, groups) = recorded(record)?;
                let site_id = record.site_id.as_deref().unwrap_or_default();
                let data = initiative_data(self.client.roots(), &item_id, site_id, &groups)?;
                ensure_success(
                    save_data(&self.client, &item_id, &data)?,
                    "write initiative data",
                    &item_id,
                )?;
                Ok(WorkflowOutcome::Completed)
            }
        }
    }

    /// Create the groups that are not recorded yet.
    ///
    /// Each id is saved before the group is protected. Recorded groups are
    /// only checked for protection.
    fn create_groups(&self, record: &mut ProvisioningRecord) -> Result<WorkflowOutcome> {
        let mut created = false;
        for role in self.groups.roles(GroupScope::Initiative) {
            if let Some(group_id) = group_slot(record, role).clone() {
                self.groups.ensure_protected(&group_id)?;
                continue;
            }
            let group_id =
                self.groups
                    .create_unprotected(GroupScope::Initiative, role, &record.title)?;
            *group_slot(record, role) = Some(group_id.clone());
            created = true;
            self.persist_id(record, "group", &group_id);
            self.groups.protect(&group_id)?;
        }
        Ok(if created {
            WorkflowOutcome::Completed
        } else {
            WorkflowOutcome::Skipped
        })
    }

    /// Create the site item, record its id, then finish it.
    ///
    /// A recorded site is finished again rather than recreated. The
    /// template copy skips pages the site already lists.
    fn provision_site(
        &self,
        record: &mut ProvisioningRecord,
        template: Option<&Site>,
    ) -> Result<WorkflowOutcome> {
        let (item_id, _) = recorded(record)?;
        let site_id = match record.site_id.clone() {
            Some(site_id) => site_id,
            None => {
                let initiative = self.get(&item_id)?;
                let site_id =
                    self.sites
                        .create_site_item(&record.title, None, Some(&initiative))?;
                record.site_id = Some(site_id.clone());
                self.persist_id(record, "site", &site_id);
                site_id
            }
        };
        let mut site = self.sites.finish_site(&site_id)?;
        if let Some(template) = template {
            self.sites.copy_from(template, &mut site, true)?;
            info!(source = template.id(), site = %site_id, "site cloned");
        }
        Ok(WorkflowOutcome::Completed)
    }

    /// Save the record mid-step so a created id survives a later failure.
    fn persist_id(&self, record: &ProvisioningRecord, resource: &str, id: &str) {
        let workflow = record.id.to_string();
        let ctx = LogContext::new()
            .with_workflow(&workflow)
            .with_resource(resource)
            .with_resource_id(id);
        match self.store.save(record) {
            Ok(()) => hub_debug!(context = ctx, "{resource} id recorded"),
            Err(err) => {
                warn!(workflow = %workflow, %resource, id, error = %err, "id not persisted")
            }
        }
    }

    fn create_item(&self, record: &mut ProvisioningRecord) -> Result<WorkflowOutcome> {
        if let Some(item_id) = record.initiative_id.clone() {
            let item = self.client.get_item(&item_id)?;
            if !item.protected {
                let ok = self.client.set_protected(Endpoint::Item, &item_id, true)?;
                ensure_success(ok, "protect initiative", &item_id)?;
            }
            return Ok(WorkflowOutcome::Skipped);
        }
        let groups = record.groups.complete().ok_or_else(|| {
            HubError::Precondition("initiative groups were not all created".to_owned())
        })?;
        let mut draft = ItemDraft {
            description: record.description.clone(),
            snippet: Some(DEFAULT_SNIPPET.to_owned()),
            license_info: Some("CC-BY-SA".to_owned()),
            culture: self.org.user.culture.clone(),
            ..ItemDraft::new(record.title.as_str(), "Hub Initiative")
                .keywords(INITIATIVE_KEYWORDS)
                .property("schemaVersion", 2)
                .property("contentGroupId", groups.content.as_str())
                .property("collaborationGroupId", groups.collaboration.as_str())
        };
        if let Some(followers) = groups.followers.as_deref() {
            draft = draft.property("followersGroupId", followers);
        }
        let item_id = self.client.create_item(&draft)?;
        record.initiative_id = Some(item_id.clone());
        self.persist_id(record, "initiative", &item_id);
        let ok = self.client.set_protected(Endpoint::Item, &item_id, true)?;
        ensure_success(ok, "protect initiative", &item_id)?;
        Ok(WorkflowOutcome::Completed)
    }

    /// Delete recorded resources in reverse creation order and mark the
    /// record rolled back.
    fn compensate(&self, record: &mut ProvisioningRecord) -> WorkflowResult<()> {
        let workflow = record.id.to_string();
        let ctx = LogContext::new().with_workflow(&workflow);

        if let Some(site_id) = record.site_id.as_deref() {
            match self.sites.get(site_id) {
                Ok(site) => self.sites.delete(site)?,
                Err(err) if err.is_not_found() => {}
                Err(err) => return Err(err.into()),
            }
            log_workflow_event(
                Some(&ctx.clone().with_resource("site").with_resource_id(site_id)),
                "initiative.compensate",
                "site removed",
                WorkflowOutcome::Compensated,
            );
        }
        if let Some(item_id) = record.initiative_id.as_deref() {
            ensure_success(delete_item(&self.client, item_id)?, "delete initiative", item_id)?;
            log_workflow_event(
                Some(&ctx.clone().with_resource("initiative").with_resource_id(item_id)),
                "initiative.compensate",
                "item removed",
                WorkflowOutcome::Compensated,
            );
        }
        for group in record.groups.ids() {
            self.groups.release(group)?;
            log_workflow_event(
                Some(&ctx.clone().with_resource("group").with_resource_id(group)),
                "initiative.compensate",
                "group released",
                WorkflowOutcome::Compensated,
            );
        }

        record.mark_rolled_back();
        self.save(record)
    }

    pub fn get(&self, initiative_id: &str) -> Result<Initiative> {
        fetch(&self.client, initiative_id, Initiative::from_parts)
    }

    pub fn search(&self, filter: &SearchFilter, max: usize) -> Result<Vec<Initiative>> {
        let marker = ResourceKind::Initiative.marker().unwrap_or("hubInitiative");
        self.client
            .search_items(&filter.to_query(marker), max)?
            .into_iter()
            .filter(|item| item.kind() == ResourceKind::Initiative)
            .map(|item| {
                let data = self.client.get_item_data(&item.id)?;
                Initiative::from_parts(item, data)
            })
            .collect()
    }

    /// Provision a new initiative whose site is cloned from the source's site.
    pub fn clone_initiative(
        &self,
        source: &Initiative,
        title: Option<&str>,
    ) -> WorkflowResult<Initiative> {
        let title = title
            .map(str::to_owned)
            .unwrap_or_else(|| copy_title(source.title()));
        let template_site = match source.site_id() {
            Some(site_id) => match self.sites.get(site_id) {
                Ok(site) => Some(site),
                Err(err) if err.is_not_found() => None,
                Err(err) => return Err(err.into()),
            },
            None => None,
        };
        self.add(NewInitiative {
            title,
            description: source.item().description.clone(),
            template_site,
        })
    }

    /// Patch top-level item fields. A new title renames the groups too.
    pub fn update(&self, initiative: &mut Initiative, changes: Map<String, Value>) -> Result<()> {
        if changes.is_empty() {
            return Ok(());
        }
        let ok = self
            .client
            .update(Endpoint::Item, initiative.id(), &Value::Object(changes.clone()))?;
        ensure_success(ok, "update initiative", initiative.id())?;

        if let Some(title) = changes.get("title").and_then(Value::as_str) {
            let roles = [
                (initiative.content_group_id(), GroupRole::Content),
                (initiative.collab_group_id(), GroupRole::CoreTeam),
                (initiative.followers_group_id(), GroupRole::Followers),
            ];
            for (group, role) in roles {
                if let Some(group) = group {
                    self.groups.rename(group, role, title)?;
                }
            }
            initiative.item_mut().title = title.to_owned();
        }
        if let Some(description) = changes.get("description").and_then(Value::as_str) {
            initiative.item_mut().description = Some(description.to_owned());
        }
        if let Some(snippet) = changes.get("snippet").and_then(Value::as_str) {
            initiative.item_mut().snippet = Some(snippet.to_owned());
        }
        Ok(())
    }

    /// Share the site first, then the initiative.
    pub fn share(&self, initiative: &Initiative, sharing: &Sharing) -> Result<()> {
        for item_id in site_then_initiative(initiative) {
            if !self.client.share_item(item_id, sharing)?.is_empty() {
                return Err(HubError::rejected("share", item_id));
            }
        }
        Ok(())
    }

    pub fn unshare(&self, initiative: &Initiative, sharing: &Sharing) -> Result<()> {
        for item_id in site_then_initiative(initiative) {
            ensure_success(self.client.unshare_item(item_id, sharing)?, "unshare", item_id)?;
        }
        Ok(())
    }

    /// Share items with the initiative's core team and content groups.
    pub fn add_content(&self, initiative: &Initiative, item_ids: &[&str]) -> Result<()> {
        let groups: Vec<&str> = [initiative.collab_group_id(), initiative.content_group_id()]
            .into_iter()
            .flatten()
            .collect();
        if groups.is_empty() {
            return Err(HubError::Precondition(format!(
                "initiative {} has no groups",
                initiative.id()
            )));
        }
        for item_id in item_ids {
            let refused = self
                .client
                .share_item(item_id, &Sharing::with_groups(groups.iter().copied()))?;
            if !refused.is_empty() {
                return Err(HubError::rejected("share with initiative groups", *item_id));
            }
        }
        Ok(())
    }

    /// Delete the site, release the groups, then delete the initiative item.
    pub fn delete(&self, initiative: Initiative) -> Result<()> {
        if let Some(site_id) = initiative.site_id() {
            match self.sites.get(site_id) {
                Ok(site) => self.sites.delete(site)?,
                Err(err) if err.is_not_found() => {}
                Err(err) => return Err(err),
            }
        }
        let groups = [
            initiative.content_group_id(),
            initiative.collab_group_id(),
            initiative.followers_group_id(),
        ];
        for group in groups.into_iter().flatten() {
            self.groups.release(group)?;
        }
        ensure_success(
            delete_item(&self.client, initiative.id())?,
            "delete initiative",
            initiative.id(),
        )?;
        info!(initiative = initiative.id(), "initiative deleted");
        Ok(())
    }

    /// Members of the followers group.
    pub fn followers(&self, initiative: &Initiative) -> Result<GroupMembers> {
        let group = initiative.followers_group_id().ok_or_else(|| {
            HubError::Precondition(format!(
                "initiative {} has no followers group",
                initiative.id()
            ))
        })?;
        self.client.group_members(group)
    }

    /// Hand the initiative with its site, pages and groups to `target`.
    pub fn reassign_to(&self, initiative: &Initiative, target: &str) -> Result<Initiative> {
        let site = match initiative.site_id() {
            Some(site_id) => match self.sites.get(site_id) {
                Ok(site) => Some(site),
                Err(err) if err.is_not_found() => None,
                Err(err) => return Err(err),
            },
            None => None,
        };
        let pages: Vec<String> = site
            .as_ref()
            .map(|site| site.pages().into_iter().map(|page| page.id).collect())
            .unwrap_or_default();

        let mut items = vec![initiative.id()];
        items.extend(site.as_ref().map(Site::id));
        items.extend(pages.iter().map(String::as_str));
        let holdings = Holdings {
            items,
            core_team: initiative.collab_group_id(),
            groups: [initiative.content_group_id(), initiative.followers_group_id()]
                .into_iter()
                .flatten()
                .collect(),
        };
        self.ownership.transfer(&holdings, target)?;
        self.get(initiative.id())
    }

    /// Indicators embedded in the initiative's data document.
    pub fn indicators(&self, initiative: Initiative) -> IndicatorManager {
        IndicatorManager::new(self.client.clone(), initiative)
    }
}

fn recorded(record: &ProvisioningRecord) -> Result<(String, crate::model::GroupSet)> {
    let item_id = record
        .initiative_id
        .clone()
        .ok_or_else(|| HubError::Precondition("no initiative item recorded".to_owned()))?;
    let groups = record
        .groups
        .complete()
        .ok_or_else(|| HubError::Precondition("initiative groups incomplete".to_owned()))?;
    Ok((item_id, groups))
}

fn group_slot(record: &mut ProvisioningRecord, role: GroupRole) -> &mut Option<String> {
    match role {
        GroupRole::Content => &mut record.groups.content,
        GroupRole::CoreTeam => &mut record.groups.collaboration,
        GroupRole::Followers => &mut record.groups.followers,
    }
}

fn site_then_initiative(initiative: &Initiative) -> Vec<&str> {
    initiative
        .site_id()
        .into_iter()
        .chain(std::iter::once(initiative.id()))
        .collect()
}
