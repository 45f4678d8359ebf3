// 🔁 One run: load → fetch → extract → reconcile → save → render
//
// Save is the single commit point. Everything before it is side-effect free,
// everything after it (rendering) is allowed to fail without undoing it.

use crate::config::LedgerConfig;
use crate::error::RenderError;
use crate::extractor::{ExtractionResult, Extractor, MarkupScheme};
use crate::fetch::PageSource;
use crate::presenter::Presenter;
use crate::reconciliation::{ChangeKind, Reconciler, Reconciliation};
use crate::store::RegistryStore;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use tracing::{info, warn};

/// What one invocation did
#[derive(Debug)]
pub struct RunReport {
    pub reconciliation: Reconciliation,
    /// Layout that produced the observation, if any
    pub scheme: Option<MarkupScheme>,
    pub state_file: PathBuf,
    /// Rendering outcome; an error here does not undo the save
    pub render: Result<PathBuf, RenderError>,
}

impl RunReport {
    pub fn is_stale(&self) -> bool {
        self.reconciliation.is_stale()
    }
}

/// All components for one configuration
pub struct Pipeline {
    config: LedgerConfig,
    store: RegistryStore,
    extractor: Extractor,
    reconciler: Reconciler,
    presenter: Presenter,
}

impl Pipeline {
    pub fn new(config: LedgerConfig) -> Self {
        Pipeline {
            store: RegistryStore::new(config.data_file.clone()),
            extractor: Extractor::new(&config.heading_needle),
            reconciler: Reconciler::new(),
            presenter: Presenter::new(config.template_file.clone(), config.output_file.clone()),
            config,
        }
    }

    /// Swap the extraction strategies (e.g. to pin a single scheme)
    pub fn with_extractor(mut self, extractor: Extractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn run(&self, source: &dyn PageSource, now: DateTime<Utc>) -> Result<RunReport> {
        let previous = self.store.open().with_context(|| {
            format!(
                "Refusing to run over untrusted state at {}",
                self.store.path().display()
            )
        })?;

        let fetched = source.fetch(&self.config.target_url, self.config.fetch_timeout());
        let observation = self.extractor.observe(fetched);
        let scheme = observation.listing().and_then(|l| l.scheme());

        let reconciliation = self.reconciler.reconcile(&previous, &observation, now);
        log_reconciliation(&reconciliation, &observation);

        self.store.save(&reconciliation.state).with_context(|| {
            format!(
                "Failed to persist registry state to {}",
                self.store.path().display()
            )
        })?;

        let render = self.presenter.render(&reconciliation.state);
        if let Err(err) = &render {
            warn!("Render skipped: {}", err);
        }

        Ok(RunReport {
            reconciliation,
            scheme,
            state_file: self.store.path().to_path_buf(),
            render,
        })
    }
}

fn log_reconciliation(reconciliation: &Reconciliation, observation: &ExtractionResult) {
    if let ExtractionResult::Unavailable(reason) = observation {
        warn!("Observation unavailable ({}); keeping previous records", reason);
    }

    for change in reconciliation.changes.iter().filter(|c| c.kind.is_transition()) {
        match change.kind {
            ChangeKind::NewlyAccredited => info!("New accreditation: {}", change.identifier),
            ChangeKind::Reaccredited => info!("Re-accredited: {}", change.identifier),
            ChangeKind::NewlyUnlisted => info!("No longer listed: {}", change.identifier),
            ChangeKind::StillAccredited | ChangeKind::StillUnlisted => {}
        }
    }

    for change in reconciliation.changes.iter() {
        if let Some(old) = &change.renamed_from {
            info!("Renamed: {} (was {:?})", change.identifier, old);
        }
    }

    info!("{}", reconciliation.summary_line());
}
