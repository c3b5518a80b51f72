//! ---
//! hub_section: "02-provisioning-orchestration"
//! hub_subsection: "module"
//! hub_type: "source"
//! hub_scope: "code"
//! hub_description: "Entry point bundling the resource managers for one signed-in organisation."
//! hub_version: "v0.0.0-prealpha"
//! hub_owner: "tbd"
//! ---
use std::sync::Arc;

use anyhow::{Context, Result};
use r_hub_client::{ApiRoots, EnvToken, HttpTransport, OrgContext, ResourceClient};
use r_hub_common::{AppConfig, FailurePolicy};
use r_hub_logging::hub_info;

use crate::discussions::{ChannelManager, PostManager};
use crate::events::EventManager;
use crate::groups::GroupProvisioner;
use crate::initiatives::InitiativeOrchestrator;
use crate::linker::ReferenceLinker;
use crate::pages::PageManager;
use crate::sites::SiteManager;
use crate::workflow::{FileProvisioningStore, MemoryProvisioningStore, ProvisioningStore};

/// How initiative workflows are recorded and what happens when one fails.
#[derive(Clone)]
pub struct HubSettings {
    pub on_failure: FailurePolicy,
    pub store: Arc<dyn ProvisioningStore>,
}

impl Default for HubSettings {
    fn default() -> Self {
        Self {
            on_failure: FailurePolicy::Leave,
            store: Arc::new(MemoryProvisioningStore::new()),
        }
    }
}

/// One authenticated connection to a portal and its hub.
#[derive(Clone)]
pub struct Hub {
    client: Arc<ResourceClient>,
    org: Arc<OrgContext>,
    initiatives: InitiativeOrchestrator,
    sites: SiteManager,
    pages: PageManager,
}

impl Hub {
    /// Build the HTTP client from configuration and resolve the organisation.
    pub fn connect(config: &AppConfig) -> Result<Self> {
        let portal_url = config.portal_url()?;
        let transport = HttpTransport::new(
            Arc::new(EnvToken::new(config.portal.token_env.clone())),
            config.portal.timeout,
            config.portal.referer.clone(),
        )
        .context("failed to build hub http client")?;
        let roots = ApiRoots::new(&portal_url, config.environment())?;
        let client = ResourceClient::new(Arc::new(transport), roots, "");
        let mut org = client
            .org_context()
            .with_context(|| format!("unable to read organisation from {portal_url}"))?;
        if let Some(tier) = config.hub.tier {
            org = org.with_tier(tier);
        }
        let client = client.with_owner(org.user.username.clone());
        let store = FileProvisioningStore::from_config(&config.provisioning)?;

        hub_info!(
            "connected to {} as {} ({:?} {:?})",
            org.name,
            org.user.username,
            org.flavor,
            org.tier
        );
        Ok(Self::from_parts(
            Arc::new(client),
            Arc::new(org),
            HubSettings {
                on_failure: config.provisioning.on_failure,
                store: Arc::new(store),
            },
        ))
    }

    /// Assemble a hub around an existing client and organisation context.
    pub fn from_parts(
        client: Arc<ResourceClient>,
        org: Arc<OrgContext>,
        settings: HubSettings,
    ) -> Self {
        Self {
            initiatives: InitiativeOrchestrator::new(
                client.clone(),
                org.clone(),
                settings.store,
                settings.on_failure,
            ),
            sites: SiteManager::new(client.clone(), org.clone()),
            pages: PageManager::new(client.clone(), org.clone()),
            client,
            org,
        }
    }

    pub fn client(&self) -> &Arc<ResourceClient> {
        &self.client
    }

    pub fn org(&self) -> &OrgContext {
        &self.org
    }

    pub fn initiatives(&self) -> &InitiativeOrchestrator {
        &self.initiatives
    }

    pub fn sites(&self) -> &SiteManager {
        &self.sites
    }

    pub fn pages(&self) -> &PageManager {
        &self.pages
    }

    pub fn groups(&self) -> GroupProvisioner {
        GroupProvisioner::new(self.client.clone(), self.org.clone())
    }

    pub fn linker(&self) -> ReferenceLinker {
        ReferenceLinker::new(self.client.clone())
    }

    pub fn events(&self) -> EventManager {
        EventManager::new(self.client.clone(), self.org.clone())
    }

    pub fn posts(&self) -> PostManager {
        PostManager::new(self.client.clone())
    }

    pub fn channels(&self) -> ChannelManager {
        ChannelManager::new(self.client.clone())
    }
}
