//! ---
//! hub_section: "03-persistence-logging"
//! hub_subsection: "module"
//! hub_type: "source"
//! hub_scope: "code"
//! hub_description: "Context-enriched logging macros."
//! hub_version: "v0.0.0-prealpha"
//! hub_owner: "tbd"
//! ---
/// Emit an informational log enriched with workflow context.
#[macro_export]
macro_rules! hub_info {
    (context = $ctx:expr, $($arg:tt)+) => {{
        let ctx = &$ctx;
        tracing::event!(
            tracing::Level::INFO,
            workflow = ctx.workflow.unwrap_or(""),
            resource = ctx.resource.unwrap_or(""),
            resource_id = ctx.resource_id.unwrap_or(""),
            step = ctx.step.unwrap_or(""),
            message = %format_args!($($arg)+)
        );
    }};
    ($($arg:tt)+) => {{
        $crate::hub_info!(context = $crate::LogContext::default(), $($arg)+)
    }};
}

/// Emit a debug log enriched with workflow context.
#[macro_export]
macro_rules! hub_debug {
    (context = $ctx:expr, $($arg:tt)+) => {{
        let ctx = &$ctx;
        tracing::event!(
            tracing::Level::DEBUG,
            workflow = ctx.workflow.unwrap_or(""),
            resource = ctx.resource.unwrap_or(""),
            resource_id = ctx.resource_id.unwrap_or(""),
            step = ctx.step.unwrap_or(""),
            message = %format_args!($($arg)+)
        );
    }};
    ($($arg:tt)+) => {{
        $crate::hub_debug!(context = $crate::LogContext::default(), $($arg)+)
    }};
}

/// Emit an error log enriched with workflow context.
#[macro_export]
macro_rules! hub_error {
    (context = $ctx:expr, $($arg:tt)+) => {{
        let ctx = &$ctx;
        tracing::event!(
            tracing::Level::ERROR,
            workflow = ctx.workflow.unwrap_or(""),
            resource = ctx.resource.unwrap_or(""),
            resource_id = ctx.resource_id.unwrap_or(""),
            step = ctx.step.unwrap_or(""),
            message = %format_args!($($arg)+)
        );
    }};
    ($($arg:tt)+) => {{
        $crate::hub_error!(context = $crate::LogContext::default(), $($arg)+)
    }};
}
