//! Composition root: everything a session needs, built once at startup.
use anyhow::{anyhow, Context, Result};
use tracing::info;

use crate::admin::AdminWorkflow;
use crate::config::Config;
use crate::db::{PostStore, SqliteStore};
use crate::graphql::Publication;
use crate::model::Profile;

pub struct AppContext {
    pub config: Config,
    pub store: SqliteStore,
    pub publication: Publication,
    viewer: Option<Profile>,
}

impl AppContext {
    pub async fn bootstrap(config: Config) -> Result<Self> {
        config.ensure_dirs().context("failed to create data dir")?;
        let store = SqliteStore::connect(&config.database_url())
            .await
            .context("failed to open database")?;
        let publication = Publication::from_config(&config)?;
        info!(host = publication.host(), "application context ready");
        Ok(Self {
            config,
            store,
            publication,
            viewer: None,
        })
    }

    /// Load the viewer's profile. Authentication itself happens upstream.
    pub async fn sign_in(&mut self, profile_id: &str) -> Result<&Profile> {
        let profile = self
            .store
            .get_profile(profile_id)
            .await?
            .ok_or_else(|| anyhow!("profile {} not found", profile_id))?;
        info!(id = %profile.id, role = profile.role.as_str(), "signed in");
        Ok(&*self.viewer.insert(profile))
    }

    pub fn viewer(&self) -> Option<&Profile> {
        self.viewer.as_ref()
    }

    /// Gates admin-only affordances; the store enforces the real access rules.
    pub fn is_admin(&self) -> bool {
        self.viewer.as_ref().map_or(false, Profile::is_admin)
    }

    pub fn admin(&self) -> Result<AdminWorkflow<SqliteStore>> {
        let viewer = self
            .viewer
            .as_ref()
            .filter(|p| p.is_admin())
            .ok_or_else(|| anyhow!("admin role required"))?;
        Ok(AdminWorkflow::new(
            self.store.clone(),
            Some(viewer.id.clone()),
            self.config.notice_ttl(),
        ))
    }
}
