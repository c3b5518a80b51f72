//! ---
//! hub_section: "03-persistence-logging"
//! hub_subsection: "module"
//! hub_type: "source"
//! hub_scope: "code"
//! hub_description: "Structured logging context for provisioning workflows."
//! hub_version: "v0.0.0-prealpha"
//! hub_owner: "tbd"
//! ---
#![warn(missing_docs)]

use tracing::Level;

pub mod macros;

/// Structured logging context propagated by the convenience macros.
#[derive(Debug, Default, Clone)]
pub struct LogContext<'a> {
    /// Provisioning workflow identifier.
    pub workflow: Option<&'a str>,
    /// Kind of resource being touched (initiative, site, page, group).
    pub resource: Option<&'a str>,
    /// Remote identifier of that resource.
    pub resource_id: Option<&'a str>,
    /// Workflow step name.
    pub step: Option<&'a str>,
}

impl<'a> LogContext<'a> {
    /// Create an empty logging context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a workflow identifier.
    pub fn with_workflow(mut self, workflow: &'a str) -> Self {
        self.workflow = Some(workflow);
        self
    }

    /// Attach a resource kind.
    pub fn with_resource(mut self, resource: &'a str) -> Self {
        self.resource = Some(resource);
        self
    }

    /// Attach a resource identifier.
    pub fn with_resource_id(mut self, resource_id: &'a str) -> Self {
        self.resource_id = Some(resource_id);
        self
    }

    /// Attach a workflow step.
    pub fn with_step(mut self, step: &'a str) -> Self {
        self.step = Some(step);
        self
    }
}

/// Outcome attached to workflow lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowOutcome {
    /// The step completed.
    Completed,
    /// The step was already recorded and was skipped.
    Skipped,
    /// The step failed and the workflow stopped.
    Aborted,
    /// A compensating action ran.
    Compensated,
}

impl WorkflowOutcome {
    fn as_str(&self) -> &'static str {
        match self {
            WorkflowOutcome::Completed => "completed",
            WorkflowOutcome::Skipped => "skipped",
            WorkflowOutcome::Aborted => "aborted",
            WorkflowOutcome::Compensated => "compensated",
        }
    }

    fn level(&self) -> Level {
        match self {
            WorkflowOutcome::Completed | WorkflowOutcome::Compensated => Level::INFO,
            WorkflowOutcome::Skipped => Level::DEBUG,
            WorkflowOutcome::Aborted => Level::WARN,
        }
    }
}

/// Emit a standardized workflow event.
pub fn log_workflow_event(
    context: Option<&LogContext>,
    event: &str,
    message: &str,
    outcome: WorkflowOutcome,
) {
    let default = LogContext::default();
    let ctx = context.unwrap_or(&default);
    // `tracing::event!` takes a constant level.
    match outcome.level() {
        Level::DEBUG => tracing::event!(
            Level::DEBUG,
            event,
            outcome = outcome.as_str(),
            workflow = ctx.workflow.unwrap_or(""),
            resource = ctx.resource.unwrap_or(""),
            resource_id = ctx.resource_id.unwrap_or(""),
            step = ctx.step.unwrap_or(""),
            message = %message
        ),
        Level::WARN => tracing::event!(
            Level::WARN,
            event,
            outcome = outcome.as_str(),
            workflow = ctx.workflow.unwrap_or(""),
            resource = ctx.resource.unwrap_or(""),
            resource_id = ctx.resource_id.unwrap_or(""),
            step = ctx.step.unwrap_or(""),
            message = %message
        ),
        _ => tracing::event!(
            Level::INFO,
            event,
            outcome = outcome.as_str(),
            workflow = ctx.workflow.unwrap_or(""),
            resource = ctx.resource.unwrap_or(""),
            resource_id = ctx.resource_id.unwrap_or(""),
            step = ctx.step.unwrap_or(""),
            message = %message
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::{fmt as subscriber_fmt, prelude::*, EnvFilter, Registry};

    fn init() {
        let _ = Registry::default()
            .with(EnvFilter::from_default_env().add_directive(Level::DEBUG.into()))
            .with(subscriber_fmt::layer().with_test_writer())
            .try_init();
    }

    #[test]
    fn macros_emit_without_panic() {
        init();
        let ctx = LogContext::new()
            .with_workflow("wf-1")
            .with_resource("site");
        hub_info!(context = ctx.clone(), "site registered");
        hub_debug!("debug message");
        hub_error!(context = ctx, "remote status: {}", 500);
    }

    #[test]
    fn workflow_event_helper_emits() {
        init();
        let ctx = LogContext::new().with_workflow("wf-1").with_step("create_groups");
        log_workflow_event(
            Some(&ctx),
            "initiative.step",
            "groups created",
            WorkflowOutcome::Completed,
        );
        log_workflow_event(None, "initiative.step", "aborted", WorkflowOutcome::Aborted);
    }

    #[test]
    fn resource_id_is_carried_by_derived_contexts() {
        init();
        let base = LogContext::new().with_workflow("wf-2");
        let site = base.clone().with_resource("site").with_resource_id("item0007");
        assert_eq!(site.workflow, Some("wf-2"));
        assert_eq!(site.resource_id, Some("item0007"));
        assert_eq!(base.resource_id, None);
        log_workflow_event(
            Some(&site),
            "initiative.compensate",
            "site removed",
            WorkflowOutcome::Compensated,
        );
        hub_debug!(context = site, "site id recorded");
    }
}
