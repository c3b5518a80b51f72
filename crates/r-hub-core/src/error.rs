//! ---
//! hub_section: "02-provisioning-orchestration"
//! hub_subsection: "module"
//! hub_type: "source"
//! hub_scope: "code"
//! hub_description: "Errors raised by multi-step provisioning workflows."
//! hub_version: "v0.0.0-prealpha"
//! hub_owner: "tbd"
//! ---
use r_hub_client::HubError;
use thiserror::Error;
use uuid::Uuid;

use crate::workflow::ProvisioningStep;

#[derive(Debug, Error)]
pub enum WorkflowError {
    /// A step failed. Everything recorded before it still exists remotely
    /// unless the workflow was compensated.
    #[error("workflow {workflow_id} aborted at step {step}: {source}")]
    Aborted {
        workflow_id: Uuid,
        step: ProvisioningStep,
        #[source]
        source: HubError,
    },

    #[error("no provisioning workflow with id {0}")]
    UnknownWorkflow(Uuid),

    /// The workflow ledger could not be read or written.
    #[error("workflow ledger error: {0}")]
    Store(#[source] anyhow::Error),

    /// Input rejected before the workflow was recorded.
    #[error(transparent)]
    Hub(#[from] HubError),
}

impl WorkflowError {
    /// The step a workflow stopped at, when it stopped at one.
    pub fn failed_step(&self) -> Option<ProvisioningStep> {
        match self {
            WorkflowError::Aborted { step, .. } => Some(*step),
            _ => None,
        }
    }
}

pub type WorkflowResult<T> = std::result::Result<T, WorkflowError>;
