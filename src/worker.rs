//! Background sync loop: fetch each configured table from the engine, write
//! the raw export locally, push it to the backend when a session exists.

use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::auth::AuthManager;
use crate::backend::BackendClient;
use crate::config::{Config, ConfigError};
use crate::tally::{count_records, TableKind, TallyClient};

/// Result of one pass over the table catalog.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleOutcome {
    pub synced: usize,
    pub failed: usize,
}

pub struct SyncWorker {
    tables: Vec<TableKind>,
    interval: Duration,
    export_path: PathBuf,
    organisation_id: Option<u32>,
    tally: TallyClient,
    backend: BackendClient,
    auth: AuthManager,
    company_checked: bool,
}

impl SyncWorker {
    /// Builds a worker from configuration and ready-made collaborators.
    pub fn new(
        config: &Config,
        tally: TallyClient,
        backend: BackendClient,
        auth: AuthManager,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            tables: config.sync.table_kinds()?,
            interval: Duration::from_secs(config.sync.interval_minutes * 60),
            export_path: config.sync.export_path.clone(),
            organisation_id: config.backend.organisation_id,
            tally,
            backend,
            auth,
            company_checked: false,
        })
    }

    /// Wires the clients and auth state from configuration alone.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let tally = TallyClient::new(&config.tally);
        let backend = BackendClient::new(&config.backend.url);
        let auth = AuthManager::load(Config::default_auth_state_path(), backend.clone());
        Self::new(config, tally, backend, auth)
    }

    /// Runs cycles until `shutdown` flips to true. The sleep between cycles
    /// is interruptible, so shutdown takes effect without waiting out the
    /// interval.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) {
        info!(
            "Sync worker started: {} tables every {} minute(s)",
            self.tables.len(),
            self.interval.as_secs() / 60
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            self.run_cycle().await;

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                changed = shutdown.changed() => {
                    // A dropped sender counts as shutdown.
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        info!("Sync worker stopped");
    }

    /// One pass over the configured tables. A failing table is logged and
    /// skipped; the rest of the cycle continues.
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        let started = std::time::Instant::now();
        let mut outcome = CycleOutcome::default();

        if let Err(e) = tokio::fs::create_dir_all(&self.export_path).await {
            error!(
                "Cannot create export directory {}: {}",
                self.export_path.display(),
                e
            );
            outcome.failed = self.tables.len();
            return outcome;
        }

        self.resolve_active_company().await;

        let token = self.auth.get_valid_token();
        if token.is_none() {
            warn!("Not authenticated; exports are written locally but not pushed");
        }

        for table in self.tables.clone() {
            match self.sync_table(table, token.as_deref()).await {
                Ok(()) => outcome.synced += 1,
                Err(e) => {
                    error!("{} sync failed: {}", table, e);
                    outcome.failed += 1;
                }
            }
        }

        info!(
            "Cycle finished: {} synced, {} failed in {:.1}s",
            outcome.synced,
            outcome.failed,
            started.elapsed().as_secs_f64()
        );
        outcome
    }

    /// Pins exports to the engine's only loaded company when none is
    /// configured. With several companies loaded the requests stay
    /// unscoped and the engine's open company applies.
    async fn resolve_active_company(&mut self) {
        if self.company_checked || self.tally.active_company().is_some() {
            return;
        }
        match self.tally.list_companies().await {
            Ok(companies) => {
                if let [company] = companies.as_slice() {
                    self.tally.set_active_company(&company.name);
                }
                self.company_checked = true;
            }
            Err(e) => warn!("Company lookup failed: {}; retrying next cycle", e),
        }
    }

    async fn sync_table(
        &self,
        table: TableKind,
        token: Option<&str>,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let xml = self.tally.fetch_table(table, None, None).await?;
        let records = count_records(&xml, table.collection_type());
        debug!("{}: {} record(s) in export", table, records);

        let file_path = self.export_path.join(format!("{}.xml", table.name()));
        tokio::fs::write(&file_path, &xml).await?;

        if let Some(token) = token {
            self.backend
                .push_table(token, self.organisation_id, table.name(), &xml)
                .await?;
        }
        Ok(())
    }
}
