//! ---
//! hub_section: "15-testing-qa-runbook"
//! hub_subsection: "integration-tests"
//! hub_type: "source"
//! hub_scope: "code"
//! hub_description: "Initiative provisioning saga against the in-memory platform."
//! hub_version: "v0.0.0-prealpha"
//! hub_owner: "tbd"
//! ---
use std::sync::Arc;

use r_hub_client::Method;
use r_hub_common::FailurePolicy;
use r_hub_core::{
    Hub, HubSettings, MemoryProvisioningStore, NewInitiative, ProvisioningStep, WorkflowError,
    WorkflowStatus,
};
use r_hub_testharness::{
    basic_online, client_for, org_for, premium_online, FakePlatform, ONLINE_PORTAL,
};

fn hub_for(platform: &Arc<FakePlatform>, settings: HubSettings) -> Hub {
    Hub::from_parts(
        client_for(platform, ONLINE_PORTAL),
        org_for(platform, ONLINE_PORTAL),
        settings,
    )
}

fn compensating() -> HubSettings {
    HubSettings {
        on_failure: FailurePolicy::Compensate,
        store: Arc::new(MemoryProvisioningStore::new()),
    }
}

#[test]
fn groups_exist_before_the_initiative_item() {
    let platform = premium_online();
    let hub = hub_for(&platform, HubSettings::default());

    hub.initiatives()
        .add(NewInitiative::titled("Vision Zero"))
        .expect("initiative provisioned");

    let calls = platform.calls();
    let first_item = calls
        .iter()
        .position(|call| call.is(Method::Post, "/content/items"))
        .expect("initiative item created");
    let groups_before = calls[..first_item]
        .iter()
        .filter(|call| call.is(Method::Post, "/community/groups"))
        .count();
    assert_eq!(groups_before, 3, "content, core team and followers groups come first");

    let payload = calls[first_item].body.clone().expect("item payload");
    let properties = &payload["properties"];
    for key in ["contentGroupId", "collaborationGroupId", "followersGroupId"] {
        let id = properties[key].as_str().expect("group id in payload");
        assert!(platform.group(id).is_some(), "{key} points at a created group");
    }
}

#[test]
fn vision_zero_end_to_end() {
    let platform = premium_online();
    let hub = hub_for(&platform, HubSettings::default());

    let initiative = hub
        .initiatives()
        .add(NewInitiative {
            title: "Vision Zero".into(),
            description: Some("Eliminate traffic deaths".into()),
            template_site: None,
        })
        .expect("initiative provisioned");

    let site_id = initiative.site_id().expect("site linked").to_owned();
    let ids = [
        initiative.id(),
        site_id.as_str(),
        initiative.content_group_id().expect("content group"),
        initiative.collab_group_id().expect("core team group"),
        initiative.followers_group_id().expect("followers group"),
    ];
    let mut unique = ids.to_vec();
    unique.sort_unstable();
    unique.dedup();
    assert_eq!(unique.len(), ids.len(), "every created id is distinct");

    let site = hub.sites().get(&site_id).expect("site readable");
    assert_eq!(site.parent_initiative_id(), Some(initiative.id()));
    assert_eq!(site.subdomain(), Some("vision-zero"));
    assert_eq!(site.collab_group_id(), initiative.collab_group_id());
    assert!(platform
        .domain_by_host("vision-zero-cityx.hub.arcgis.com")
        .is_some());
    assert_eq!(
        initiative.url(),
        Some("https://vision-zero-cityx.hub.arcgis.com")
    );
    assert!(platform.is_shared_with(initiative.id(), initiative.collab_group_id().unwrap()));
    assert_eq!(platform.item(initiative.id()).unwrap()["protected"], true);
    for group in &ids[2..] {
        assert_eq!(platform.group(group).unwrap()["protected"], true, "{group} protected");
    }

    let data = initiative.data();
    assert_eq!(data["steps"][0]["itemIds"][0], site_id.as_str());

    let records = hub.initiatives().workflows().expect("ledger readable");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, WorkflowStatus::Completed);
    assert_eq!(records[0].initiative_id.as_deref(), Some(initiative.id()));
}

#[test]
fn site_failure_leaves_initiative_unlinked() {
    let platform = premium_online();
    let hub = hub_for(&platform, HubSettings::default());
    // The first item create is the initiative, the second the site.
    platform.fail_after(Method::Post, "/content/items", 1, 500);

    let err = hub
        .initiatives()
        .add(NewInitiative::titled("Vision Zero"))
        .expect_err("site creation fails");
    let WorkflowError::Aborted { step, .. } = &err else {
        panic!("expected an aborted workflow, got {err:?}");
    };
    assert_eq!(*step, ProvisioningStep::ProvisionSite);

    let records = hub.initiatives().workflows().expect("ledger readable");
    let record = &records[0];
    assert_eq!(record.status, WorkflowStatus::Aborted);
    assert_eq!(record.failed_step, Some(ProvisioningStep::ProvisionSite));
    let initiative_id = record.initiative_id.clone().expect("initiative recorded");
    assert!(record.site_id.is_none());

    assert_eq!(
        platform.count(Method::Patch, &format!("/content/items/{initiative_id}")),
        0,
        "initiative is never patched with a site reference"
    );
    assert!(platform.item(&initiative_id).is_some(), "default policy leaves resources");
    assert_eq!(platform.group_ids().len(), 3);
}

#[test]
fn resume_continues_without_duplicating_groups() {
    let platform = premium_online();
    let hub = hub_for(&platform, HubSettings::default());
    platform.fail_after(Method::Post, "/content/items", 1, 500);

    let err = hub
        .initiatives()
        .add(NewInitiative::titled("Vision Zero"))
        .expect_err("site creation fails");
    let WorkflowError::Aborted { workflow_id, .. } = err else {
        panic!("expected an aborted workflow");
    };
    let groups_after_failure = platform.group_ids();

    let initiative = hub
        .initiatives()
        .resume(workflow_id)
        .expect("resumed workflow completes");

    assert_eq!(platform.group_ids(), groups_after_failure);
    assert_eq!(platform.count(Method::Post, "/community/groups"), 3);
    assert!(initiative.site_id().is_some());
    assert_eq!(platform.item_ids().len(), 2, "one initiative and one site");

    let record = hub
        .initiatives()
        .workflows()
        .expect("ledger readable")
        .remove(0);
    assert_eq!(record.status, WorkflowStatus::Completed);
    assert!(record.failed_step.is_none());
}

#[test]
fn rollback_removes_everything_recorded() {
    let platform = premium_online();
    let hub = hub_for(&platform, HubSettings::default());
    platform.fail_after(Method::Post, "/content/items", 1, 500);

    let Err(WorkflowError::Aborted { workflow_id, .. }) =
        hub.initiatives().add(NewInitiative::titled("Vision Zero"))
    else {
        panic!("expected an aborted workflow");
    };

    let record = hub
        .initiatives()
        .rollback(workflow_id)
        .expect("rollback succeeds");
    assert_eq!(record.status, WorkflowStatus::RolledBack);
    assert!(record.initiative_id.is_none());
    assert!(platform.item_ids().is_empty());
    assert!(platform.group_ids().is_empty());

    let err = hub
        .initiatives()
        .resume(workflow_id)
        .expect_err("rolled back workflows cannot resume");
    assert!(matches!(err, WorkflowError::Hub(_)));
}

#[test]
fn compensate_policy_rolls_back_on_failure() {
    let platform = premium_online();
    let hub = hub_for(&platform, compensating());
    platform.fail_after(Method::Post, "/content/items", 1, 500);

    let err = hub
        .initiatives()
        .add(NewInitiative::titled("Vision Zero"))
        .expect_err("site creation fails");
    assert_eq!(err.failed_step(), Some(ProvisioningStep::ProvisionSite));

    assert!(platform.item_ids().is_empty());
    assert!(platform.group_ids().is_empty());
    let records = hub.initiatives().workflows().expect("ledger readable");
    assert_eq!(records[0].status, WorkflowStatus::RolledBack);
}

#[test]
fn failed_group_creation_aborts_before_any_item() {
    let platform = premium_online();
    let hub = hub_for(&platform, HubSettings::default());
    platform.fail_after(Method::Post, "/community/groups", 1, 500);

    let err = hub
        .initiatives()
        .add(NewInitiative::titled("Vision Zero"))
        .expect_err("second group fails");
    assert_eq!(err.failed_step(), Some(ProvisioningStep::CreateGroups));
    assert_eq!(platform.count(Method::Post, "/content/items"), 0);

    let record = hub
        .initiatives()
        .workflows()
        .expect("ledger readable")
        .remove(0);
    assert!(record.groups.content.is_some(), "the first group is recorded");
    assert!(record.groups.collaboration.is_none());
}

#[test]
fn overlong_titles_are_rejected_before_any_call() {
    let platform = premium_online();
    let hub = hub_for(&platform, HubSettings::default());

    let err = hub
        .initiatives()
        .add(NewInitiative::titled("a".repeat(60)))
        .expect_err("title too long for a hostname");
    assert!(matches!(err, WorkflowError::Hub(ref e) if e.to_string().contains("too long")));
    assert!(platform.calls().is_empty());
    assert!(hub.initiatives().workflows().unwrap().is_empty());
}

#[test]
fn basic_hub_initiatives_have_no_followers_group() {
    let platform = basic_online();
    let hub = hub_for(&platform, HubSettings::default());

    let initiative = hub
        .initiatives()
        .add(NewInitiative::titled("Parks"))
        .expect("initiative provisioned");
    assert!(initiative.followers_group_id().is_none());
    assert_eq!(platform.count(Method::Post, "/community/groups"), 2);
}

#[test]
fn deleting_an_initiative_removes_site_groups_and_domain() {
    let platform = premium_online();
    let hub = hub_for(&platform, HubSettings::default());
    let initiative = hub
        .initiatives()
        .add(NewInitiative::titled("Vision Zero"))
        .expect("initiative provisioned");

    hub.initiatives()
        .delete(initiative)
        .expect("initiative deleted");
    assert!(platform.item_ids().is_empty());
    assert!(platform.group_ids().is_empty());
    assert_eq!(platform.domain_count(), 0);
}

#[test]
fn cloning_copies_site_layout_and_pages() {
    let platform = premium_online();
    let hub = hub_for(&platform, HubSettings::default());
    let source = hub
        .initiatives()
        .add(NewInitiative::titled("Vision Zero"))
        .expect("source provisioned");
    let mut source_site = hub
        .sites()
        .get(source.site_id().unwrap())
        .expect("source site");
    hub.sites()
        .update_layout(&mut source_site, serde_json::json!({"sections": [{"id": "hero"}]}))
        .expect("layout written");
    hub.pages()
        .add("About", &mut source_site)
        .expect("page added");

    let copy = hub
        .initiatives()
        .clone_initiative(&source, None)
        .expect("clone provisioned");
    assert!(copy.title().starts_with("Vision Zero-copy-"));
    let copy_site = hub.sites().get(copy.site_id().unwrap()).expect("copy site");
    assert_ne!(copy_site.id(), source_site.id());
    assert_eq!(copy_site.layout(), source_site.layout());
    assert_eq!(copy_site.pages().len(), 1);
    assert_ne!(copy_site.pages()[0].id, source_site.pages()[0].id);
}

#[test]
fn renaming_an_initiative_renames_its_groups() {
    let platform = basic_online();
    let hub = hub_for(&platform, HubSettings::default());
    let mut initiative = hub
        .initiatives()
        .add(NewInitiative::titled("Parks"))
        .expect("initiative provisioned");

    let mut changes = serde_json::Map::new();
    changes.insert("title".into(), "Green Spaces".into());
    hub.initiatives()
        .update(&mut initiative, changes)
        .expect("initiative updated");

    assert_eq!(initiative.title(), "Green Spaces");
    let core_team = platform
        .group(initiative.collab_group_id().unwrap())
        .expect("group exists");
    assert_eq!(core_team["title"], "Green Spaces Core Team");
}

#[test]
fn provisioning_groups_twice_creates_two_sets() {
    let platform = premium_online();
    let hub = hub_for(&platform, HubSettings::default());

    let first = hub.groups().provision_groups("Vision Zero").unwrap();
    let second = hub.groups().provision_groups("Vision Zero").unwrap();

    assert_ne!(first, second, "same title does not dedupe");
    assert_eq!(platform.group_ids().len(), 6);
    let title = platform.group(&second.content).unwrap()["title"].clone();
    assert_eq!(title, "Vision Zero Content");
}

#[test]
fn every_group_create_is_followed_by_its_protect() {
    let platform = premium_online();
    let hub = hub_for(&platform, HubSettings::default());
    hub.initiatives()
        .add(NewInitiative::titled("Vision Zero"))
        .expect("initiative provisioned");

    let calls = platform.calls();
    let mut protected = Vec::new();
    for (index, call) in calls.iter().enumerate() {
        if !call.is(Method::Post, "/community/groups") {
            continue;
        }
        let next = calls.get(index + 1).expect("a call follows the group create");
        assert!(
            next.method == Method::Post
                && next.path.contains("/community/groups/")
                && next.path.ends_with("/protect"),
            "group create at {index} is followed by {} {}",
            next.method,
            next.path
        );
        protected.push(next.path.rsplit('/').nth(1).unwrap().to_owned());
    }
    assert_eq!(protected, platform.group_ids());
}

#[test]
fn domain_failure_still_records_the_site() {
    let platform = premium_online();
    let hub = hub_for(&platform, HubSettings::default());
    platform.fail_once(Method::Post, "/api/v3/domains", 500);

    let err = hub
        .initiatives()
        .add(NewInitiative::titled("Vision Zero"))
        .expect_err("domain registration fails");
    assert_eq!(err.failed_step(), Some(ProvisioningStep::ProvisionSite));

    let record = hub
        .initiatives()
        .workflows()
        .expect("ledger readable")
        .remove(0);
    let site_id = record.site_id.clone().expect("site id recorded");
    assert!(platform.item(&site_id).is_some());
    assert_eq!(platform.item_ids().len(), 2);
}

#[test]
fn rollback_after_domain_failure_leaves_nothing() {
    let platform = premium_online();
    let hub = hub_for(&platform, HubSettings::default());
    platform.fail_once(Method::Post, "/api/v3/domains", 500);

    let Err(WorkflowError::Aborted { workflow_id, .. }) =
        hub.initiatives().add(NewInitiative::titled("Vision Zero"))
    else {
        panic!("expected an aborted workflow");
    };

    hub.initiatives()
        .rollback(workflow_id)
        .expect("rollback succeeds");
    assert!(platform.item_ids().is_empty(), "the half-built site is removed too");
    assert!(platform.group_ids().is_empty());
    assert_eq!(platform.domain_count(), 0);
}

#[test]
fn resume_after_domain_failure_finishes_the_same_site() {
    let platform = premium_online();
    let hub = hub_for(&platform, HubSettings::default());
    platform.fail_once(Method::Post, "/api/v3/domains", 500);

    let Err(WorkflowError::Aborted { workflow_id, .. }) =
        hub.initiatives().add(NewInitiative::titled("Vision Zero"))
    else {
        panic!("expected an aborted workflow");
    };
    let recorded_site = hub.initiatives().workflows().unwrap()[0]
        .site_id
        .clone()
        .expect("site id recorded");

    let initiative = hub
        .initiatives()
        .resume(workflow_id)
        .expect("resumed workflow completes");

    assert_eq!(initiative.site_id(), Some(recorded_site.as_str()));
    assert_eq!(platform.item_ids().len(), 2, "one initiative and one site");
    assert_eq!(platform.count(Method::Post, "/content/items"), 2);
    assert_eq!(platform.domain_count(), 1);
    let site = hub.sites().get(&recorded_site).expect("site readable");
    assert_eq!(site.subdomain(), Some("vision-zero"));
    assert_eq!(site.parent_initiative_id(), Some(initiative.id()));
}

#[test]
fn resume_reuses_a_domain_registered_before_the_failure() {
    let platform = premium_online();
    let hub = hub_for(&platform, HubSettings::default());
    // The site data document is the first data write of the workflow.
    platform.fail_once(Method::Patch, "/data", 500);

    let Err(WorkflowError::Aborted { workflow_id, step, .. }) =
        hub.initiatives().add(NewInitiative::titled("Vision Zero"))
    else {
        panic!("expected an aborted workflow");
    };
    assert_eq!(step, ProvisioningStep::ProvisionSite);
    assert_eq!(platform.domain_count(), 1);

    let initiative = hub
        .initiatives()
        .resume(workflow_id)
        .expect("resumed workflow completes");

    assert_eq!(platform.count(Method::Post, "/api/v3/domains"), 1);
    assert_eq!(platform.domain_count(), 1);
    let domain = platform
        .domain_by_host("vision-zero-cityx.hub.arcgis.com")
        .expect("domain registered");
    let site = hub
        .sites()
        .get(initiative.site_id().unwrap())
        .expect("site readable");
    assert_eq!(site.domain_site_id(), domain["id"].as_str());
    assert_eq!(site.client_id(), domain["clientKey"].as_str());
}

#[test]
fn protect_failure_records_the_group_for_rollback() {
    let platform = premium_online();
    let hub = hub_for(&platform, HubSettings::default());
    platform.fail_once(Method::Post, "/protect", 500);

    let Err(WorkflowError::Aborted { workflow_id, step, .. }) =
        hub.initiatives().add(NewInitiative::titled("Vision Zero"))
    else {
        panic!("expected an aborted workflow");
    };
    assert_eq!(step, ProvisioningStep::CreateGroups);
    let record = hub.initiatives().workflows().unwrap().remove(0);
    let content = record.groups.content.clone().expect("unprotected group recorded");
    assert_eq!(platform.group(&content).unwrap()["protected"], false);

    hub.initiatives()
        .rollback(workflow_id)
        .expect("rollback succeeds");
    assert!(platform.group_ids().is_empty());
}

#[test]
fn resume_after_protect_failure_protects_the_recorded_group() {
    let platform = premium_online();
    let hub = hub_for(&platform, HubSettings::default());
    platform.fail_once(Method::Post, "/protect", 500);

    let Err(WorkflowError::Aborted { workflow_id, .. }) =
        hub.initiatives().add(NewInitiative::titled("Vision Zero"))
    else {
        panic!("expected an aborted workflow");
    };

    let initiative = hub
        .initiatives()
        .resume(workflow_id)
        .expect("resumed workflow completes");

    assert_eq!(platform.count(Method::Post, "/community/groups"), 3);
    assert_eq!(platform.group_ids().len(), 3);
    for group in platform.group_ids() {
        assert_eq!(platform.group(&group).unwrap()["protected"], true, "{group} protected");
    }
    assert!(initiative.content_group_id().is_some());
}

#[test]
fn unprotectable_standalone_group_is_discarded() {
    let platform = basic_online();
    let hub = hub_for(&platform, HubSettings::default());
    platform.fail_once(Method::Post, "/protect", 500);

    hub.groups()
        .provision_site_groups("Parks")
        .expect_err("protect fails");
    assert!(platform.group_ids().is_empty());
}
