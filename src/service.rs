//! Composition root shared by the CLI, HTTP server and MCP bridge.
//!
//! A [`DocsService`] owns the configuration and one [`DocsEngine`]. It is
//! the only place that knows where documents come from (a local docs
//! directory or a synced repository checkout) and it drives rebuilds.

use anyhow::{Context, Result};
use klipper_docs_core::engine::{BuildSummary, DocsEngine};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::config::Config;
use crate::parser;
use crate::sync::{self, SyncOutcome};

/// Result of one [`DocsService::refresh`].
#[derive(Debug, Clone, Serialize)]
pub struct RefreshReport {
    pub docs_root: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sync: Option<SyncOutcome>,
    pub build: BuildSummary,
}

pub struct DocsService {
    config: Config,
    engine: DocsEngine,
    // Serializes refreshes; searches never wait on it.
    refresh_lock: Mutex<()>,
}

impl DocsService {
    pub fn new(config: Config) -> Self {
        let engine = DocsEngine::new(config.search.clone());
        Self {
            config,
            engine,
            refresh_lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn engine(&self) -> &DocsEngine {
        &self.engine
    }

    /// Where documents are read from for the current configuration.
    pub fn docs_root(&self) -> PathBuf {
        match &self.config.repository {
            Some(repo) => sync::docs_root(repo),
            None => self.config.docs.root.clone(),
        }
    }

    /// Optionally sync the repository, parse the docs, and rebuild the index.
    ///
    /// On failure the previous index stays in effect.
    pub async fn refresh(&self, sync_repo: bool) -> Result<RefreshReport> {
        let _guard = self.refresh_lock.lock().await;

        let sync = match (&self.config.repository, sync_repo) {
            (Some(repo), true) => Some(sync::sync_repository_async(repo.clone()).await?),
            _ => None,
        };

        let docs_root = sync
            .as_ref()
            .map(|s| s.docs_root.clone())
            .unwrap_or_else(|| self.docs_root());

        let root = docs_root.clone();
        let docs_config = self.config.docs.clone();
        let documents = tokio::task::spawn_blocking(move || parser::scan_docs(&root, &docs_config))
            .await
            .context("docs scan task panicked")??;

        let build = self
            .engine
            .build_index(documents)
            .context("Failed to build search index")?;

        Ok(RefreshReport {
            docs_root,
            sync,
            build,
        })
    }

    /// First load: sync only when a repository is configured and no
    /// checkout exists yet.
    pub async fn load(&self) -> Result<RefreshReport> {
        let needs_clone = self
            .config
            .repository
            .as_ref()
            .is_some_and(|repo| !repo.checkout_dir().join(".git").exists());
        self.refresh(needs_clone).await
    }

    /// Spawn periodic repository resyncs if `sync_interval_secs` is set.
    pub fn spawn_periodic_refresh(self: &Arc<Self>) -> Option<tokio::task::JoinHandle<()>> {
        let secs = self.config.repository.as_ref()?.sync_interval_secs?;
        let service = Arc::clone(self);

        Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(secs));
            // The first tick completes immediately.
            interval.tick().await;
            loop {
                interval.tick().await;
                match service.refresh(true).await {
                    Ok(report) => tracing::info!(
                        documents = report.build.documents,
                        "periodic refresh finished"
                    ),
                    Err(e) => tracing::warn!(error = %format!("{:#}", e), "periodic refresh failed"),
                }
            }
        }))
    }
}
