//! ---
//! hub_section: "01-core-functionality"
//! hub_subsection: "module"
//! hub_type: "source"
//! hub_scope: "code"
//! hub_description: "Wall-clock helpers used for titles and workflow timestamps."
//! hub_version: "v0.0.0-prealpha"
//! hub_owner: "tbd"
//! ---
use chrono::{DateTime, Utc};

/// Current wall-clock time.
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Milliseconds since the Unix epoch.
pub fn epoch_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Default title for a copy of an existing resource.
pub fn copy_title(title: &str) -> String {
    format!("{}-copy-{}", title, epoch_millis())
}
