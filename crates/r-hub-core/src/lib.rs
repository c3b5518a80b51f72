//! ---
//! hub_section: "02-provisioning-orchestration"
//! hub_subsection: "module"
//! hub_type: "source"
//! hub_scope: "code"
//! hub_description: "Provisioning orchestration and resource managers."
//! hub_version: "v0.0.0-prealpha"
//! hub_owner: "tbd"
//! ---
//! Initiative provisioning, site and page management, and the reference
//! links that hold them together.
//!
//! Start from [`Hub`]: it resolves the organisation once and hands out the
//! managers. Multi-step initiative provisioning is recorded in a
//! [`ProvisioningStore`] so a failed run can be resumed or rolled back.

pub mod discussions;
pub mod domains;
pub mod error;
pub mod events;
pub mod groups;
pub mod hub;
pub mod indicators;
pub mod initiatives;
pub mod linker;
pub mod model;
mod ownership;
pub mod pages;
mod persist;
pub mod sites;
pub mod templates;
pub mod workflow;

pub use discussions::{
    Channel, ChannelManager, ChannelUpdate, DiscussionAccess, NewChannel, NewPost, Post,
    PostManager, PostUpdate, Reaction,
};
pub use error::{WorkflowError, WorkflowResult};
pub use events::{Event, EventFilter, EventManager};
pub use groups::{GroupAccess, GroupDraft, GroupProvisioner, GroupRole, GroupScope};
pub use hub::{Hub, HubSettings};
pub use indicators::{Indicator, IndicatorManager, IndicatorSource};
pub use initiatives::{InitiativeOrchestrator, NewInitiative};
pub use linker::ReferenceLinker;
pub use model::{GroupSet, Initiative, Page, PageRef, SearchFilter, Site, SiteRef};
pub use pages::PageManager;
pub use sites::SiteManager;
pub use workflow::{
    FileProvisioningStore, MemoryProvisioningStore, ProvisioningRecord, ProvisioningStep,
    ProvisioningStore, RecordedGroups, WorkflowStatus,
};
