//! ---
//! hub_section: "15-testing-qa-runbook"
//! hub_subsection: "integration-tests"
//! hub_type: "source"
//! hub_scope: "code"
//! hub_description: "Provisioning ledger persisted on disk across orchestrator instances."
//! hub_version: "v0.0.0-prealpha"
//! hub_owner: "tbd"
//! ---
use std::sync::Arc;

use r_hub_client::Method;
use r_hub_common::FailurePolicy;
use r_hub_core::{
    FileProvisioningStore, Hub, HubSettings, NewInitiative, ProvisioningRecord, ProvisioningStep,
    ProvisioningStore, WorkflowError, WorkflowStatus,
};
use r_hub_testharness::{client_for, org_for, premium_online, ONLINE_PORTAL};
use tempfile::tempdir;
use uuid::Uuid;

#[test]
fn records_survive_a_restart() {
    let temp = tempdir().expect("tempdir");
    let store = FileProvisioningStore::new(temp.path()).expect("store");

    let mut record = ProvisioningRecord::new("Vision Zero", None);
    record.mark_done(ProvisioningStep::Validate);
    record.groups.content = Some("group0001".into());
    store.save(&record).expect("saved");

    let reopened = FileProvisioningStore::new(temp.path()).expect("store");
    let loaded = reopened
        .load(record.id)
        .expect("readable")
        .expect("record present");
    assert_eq!(loaded, record);
    assert_eq!(loaded.next_step(), Some(ProvisioningStep::CreateGroups));
    assert_eq!(reopened.list().expect("listable").len(), 1);
    assert!(reopened.load(Uuid::new_v4()).expect("readable").is_none());
}

#[test]
fn a_new_process_resumes_from_the_ledger() {
    let temp = tempdir().expect("tempdir");
    let platform = premium_online();
    let connect = || {
        Hub::from_parts(
            client_for(&platform, ONLINE_PORTAL),
            org_for(&platform, ONLINE_PORTAL),
            HubSettings {
                on_failure: FailurePolicy::Leave,
                store: Arc::new(FileProvisioningStore::new(temp.path()).expect("store")),
            },
        )
    };

    platform.fail_after(Method::Post, "/content/items", 1, 503);
    let Err(WorkflowError::Aborted { workflow_id, .. }) =
        connect().initiatives().add(NewInitiative::titled("Vision Zero"))
    else {
        panic!("expected an aborted workflow");
    };
    assert!(temp.path().join(format!("{workflow_id}.json")).exists());

    let hub = connect();
    let initiative = hub
        .initiatives()
        .resume(workflow_id)
        .expect("resumed from disk");
    assert!(initiative.site_id().is_some());

    let records = hub.initiatives().workflows().expect("ledger readable");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, WorkflowStatus::Completed);
    assert_eq!(records[0].completed.len(), ProvisioningStep::ALL.len());
}

#[test]
fn unknown_workflows_are_reported() {
    let temp = tempdir().expect("tempdir");
    let platform = premium_online();
    let hub = Hub::from_parts(
        client_for(&platform, ONLINE_PORTAL),
        org_for(&platform, ONLINE_PORTAL),
        HubSettings {
            on_failure: FailurePolicy::Leave,
            store: Arc::new(FileProvisioningStore::new(temp.path()).expect("store")),
        },
    );
    let id = Uuid::new_v4();
    let err = hub.initiatives().resume(id).expect_err("nothing recorded");
    assert!(matches!(err, WorkflowError::UnknownWorkflow(found) if found == id));
}
