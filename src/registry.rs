//! Report status tracking and background generation
//!
//! Each report is created `Running` and moved exactly once to `Complete` or
//! `Failed` by the worker that owns it.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{error, info};
use uuid::Uuid;

use crate::ingest::Dataset;
use crate::report::generate_report_file;

pub type ReportId = String;

/// Lifecycle of a report
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum ReportStatus {
    Running,
    Complete { location: PathBuf },
    Failed { cause: String },
}

impl ReportStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ReportStatus::Running)
    }

    /// Next status for a worker outcome, or None if already terminal
    pub fn transition(&self, outcome: Result<PathBuf, String>) -> Option<ReportStatus> {
        if self.is_terminal() {
            return None;
        }
        Some(match outcome {
            Ok(location) => ReportStatus::Complete { location },
            Err(cause) => ReportStatus::Failed { cause },
        })
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("report {0} not found")]
    NotFound(ReportId),

    #[error("report {0} already finished")]
    AlreadyFinished(ReportId),
}

/// In-memory status store keyed by report id
#[derive(Debug, Default)]
pub struct ReportRegistry {
    reports: RwLock<HashMap<ReportId, ReportStatus>>,
}

impl ReportRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a new id in the `Running` state
    pub fn create(&self) -> ReportId {
        let id = Uuid::new_v4().to_string();
        self.reports
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.clone(), ReportStatus::Running);
        id
    }

    /// Record the terminal outcome of a report. Only the first call succeeds.
    pub fn finish(&self, id: &str, outcome: Result<PathBuf, String>) -> Result<(), RegistryError> {
        let mut reports = self.reports.write().unwrap_or_else(PoisonError::into_inner);
        let current = reports
            .get_mut(id)
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))?;
        let next = current
            .transition(outcome)
            .ok_or_else(|| RegistryError::AlreadyFinished(id.to_string()))?;
        *current = next;
        Ok(())
    }

    pub fn status(&self, id: &str) -> Option<ReportStatus> {
        self.reports
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.reports.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Triggers and looks up reports over a shared, read-only dataset
#[derive(Debug, Clone)]
pub struct ReportService {
    registry: Arc<ReportRegistry>,
    dataset: Arc<Dataset>,
    output_dir: PathBuf,
}

impl ReportService {
    pub fn new(registry: Arc<ReportRegistry>, dataset: Arc<Dataset>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            registry,
            dataset,
            output_dir: output_dir.into(),
        }
    }

    pub fn registry(&self) -> &Arc<ReportRegistry> {
        &self.registry
    }

    /// Start a report in the background and return its id immediately.
    /// Must be called from within a tokio runtime.
    pub fn trigger_report(&self) -> (ReportId, JoinHandle<()>) {
        let id = self.registry.create();
        let path = self.output_dir.join(format!("{}_report.csv", id));
        info!("Report {} started", id);

        let registry = self.registry.clone();
        let dataset = self.dataset.clone();
        let report_id = id.clone();
        let handle = tokio::spawn(async move {
            let result = tokio::task::spawn_blocking(move || {
                generate_report_file(&dataset, &path).map(|_| path)
            })
            .await;

            let outcome = match result {
                Ok(Ok(path)) => {
                    info!("Report {} complete: {}", report_id, path.display());
                    Ok(path)
                }
                Ok(Err(e)) => {
                    error!("Report {} failed: {}", report_id, e);
                    Err(e.to_string())
                }
                Err(e) => {
                    error!("Report {} worker panicked: {}", report_id, e);
                    Err(format!("report worker panicked: {}", e))
                }
            };

            if let Err(e) = registry.finish(&report_id, outcome) {
                error!("Could not record outcome: {}", e);
            }
        });

        (id, handle)
    }

    /// Current status, or None for an unknown id
    pub fn fetch_report(&self, id: &str) -> Option<ReportStatus> {
        self.registry.status(id)
    }
}
