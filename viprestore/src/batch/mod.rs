// File: viprestore/src/batch/mod.rs
//! Save, restore and cancel workflows over many independent controller calls.
//!
//! Each item moves `Pending -> InFlight -> Succeeded | Failed` exactly once
//! and is attempted at most once per run. Items run concurrently up to the
//! configured bound; the returned [`BatchResult`] always holds one outcome per
//! input item, in input order.
//!
//! The abort token is the way to stop a batch and still get its result.
//! Dropping a batch future aborts every item task, in-flight calls included,
//! and no result is produced.

use futures::future::join_all;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::AbortHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::constants::batch::{CANCELLED_DETAIL, MISSING_ENTRY_DETAIL};
use crate::errors::RestoreError;
use crate::model::{ServiceId, ServiceRecord};
use crate::remote::{RemoteClient, Session};
use crate::selection::{SelectionEntry, SelectionFile};

const PANICKED_DETAIL: &str = "task panicked";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ItemStatus {
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemOutcome {
    /// Caller-side id: the selection-file key or the cancelled service id
    pub identifier: ServiceId,
    pub status: ItemStatus,
    pub detail: Option<String>,
    /// Id assigned by the controller when a restore created a service
    pub remote_id: Option<ServiceId>,
}

impl ItemOutcome {
    pub fn succeeded(identifier: impl Into<ServiceId>, remote_id: Option<ServiceId>) -> Self {
        Self {
            identifier: identifier.into(),
            status: ItemStatus::Succeeded,
            detail: None,
            remote_id,
        }
    }

    pub fn failed(identifier: impl Into<ServiceId>, detail: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            status: ItemStatus::Failed,
            detail: Some(detail.into()),
            remote_id: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ItemStatus::Succeeded
    }
}

/// Outcome of one batch invocation
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct BatchResult {
    outcomes: Vec<ItemOutcome>,
}

impl BatchResult {
    pub fn new(outcomes: Vec<ItemOutcome>) -> Self {
        Self { outcomes }
    }

    pub fn outcomes(&self) -> &[ItemOutcome] {
        &self.outcomes
    }

    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.total() - self.succeeded()
    }

    pub fn failures(&self) -> impl Iterator<Item = &ItemOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    pub fn is_complete_success(&self) -> bool {
        self.failed() == 0
    }

    /// "N of M succeeded", followed by one line per failed item.
    pub fn summary(&self) -> String {
        let mut summary = format!("{} of {} succeeded", self.succeeded(), self.total());
        for failure in self.failures() {
            summary.push_str(&format!(
                "\n  {}: {}",
                failure.identifier,
                failure.detail.as_deref().unwrap_or("unknown error")
            ));
        }
        summary
    }
}

impl fmt::Display for BatchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}

enum Job {
    Create(SelectionEntry),
    Cancel,
    Missing,
}

impl Job {
    async fn execute(self, remote: &dyn RemoteClient, session: &Session, id: ServiceId) -> ItemOutcome {
        match self {
            Job::Create(entry) => {
                match remote
                    .create_service(session, &entry.service_definition, &entry.schedule_info)
                    .await
                {
                    Ok(new_id) => {
                        info!("Restored {} as {}", id, new_id);
                        ItemOutcome::succeeded(id, Some(new_id))
                    }
                    Err(e) => {
                        warn!("Failed to restore {}: {}", id, e);
                        ItemOutcome::failed(id, e.to_string())
                    }
                }
            }
            Job::Cancel => match remote.cancel_service(session, &id).await {
                Ok(()) => {
                    info!("Cancelled {}", id);
                    ItemOutcome::succeeded(id, None)
                }
                Err(e) => {
                    warn!("Failed to cancel {}: {}", id, e);
                    ItemOutcome::failed(id, e.to_string())
                }
            },
            Job::Missing => ItemOutcome::failed(id, MISSING_ENTRY_DETAIL),
        }
    }
}

/// Aborts every item task when dropped, so dropping a batch future does not
/// leave controller calls running in the background.
struct AbortOnDrop(Vec<AbortHandle>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        for handle in &self.0 {
            handle.abort();
        }
    }
}

/// Ordered, first-occurrence-wins copy of `ids`.
fn dedupe(ids: &[ServiceId]) -> Vec<ServiceId> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter().filter(|id| seen.insert(id.as_str())).cloned().collect()
}

pub struct BatchOrchestrator {
    remote: Arc<dyn RemoteClient>,
    session: Session,
    max_concurrency: usize,
}

impl BatchOrchestrator {
    /// `max_concurrency` below 1 is treated as 1.
    pub fn new(remote: Arc<dyn RemoteClient>, session: Session, max_concurrency: usize) -> Self {
        Self {
            remote,
            session,
            max_concurrency: max_concurrency.max(1),
        }
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Project `records` and write them to `destination`. No controller calls.
    #[instrument(skip(self, records), fields(records = records.len()))]
    pub async fn save_selection(
        &self,
        records: &[ServiceRecord],
        destination: &Path,
    ) -> Result<SelectionFile, RestoreError> {
        let file = SelectionFile::from_records(records);
        file.save(destination).await?;
        Ok(file)
    }

    /// Load `source` and restore the selected entries.
    ///
    /// A malformed or unreadable file fails here, before any controller call.
    pub async fn restore_from_path(
        &self,
        source: &Path,
        selected: &[ServiceId],
        abort: CancellationToken,
    ) -> Result<BatchResult, RestoreError> {
        let file = SelectionFile::load(source).await?;
        Ok(self.restore_selection(&file, selected, abort).await)
    }

    /// Create one service per selected entry of `file`.
    #[instrument(skip(self, file, selected, abort), fields(selected = selected.len()))]
    pub async fn restore_selection(
        &self,
        file: &SelectionFile,
        selected: &[ServiceId],
        abort: CancellationToken,
    ) -> BatchResult {
        let items = dedupe(selected)
            .into_iter()
            .map(|id| {
                let job = match file.get(&id) {
                    Some(entry) => Job::Create(entry.clone()),
                    None => Job::Missing,
                };
                (id, job)
            })
            .collect();

        self.run("restore", items, abort).await
    }

    /// Cancel each id. Duplicate ids are cancelled once.
    #[instrument(skip(self, ids, abort), fields(ids = ids.len()))]
    pub async fn cancel_selection(&self, ids: &[ServiceId], abort: CancellationToken) -> BatchResult {
        let items = dedupe(ids).into_iter().map(|id| (id, Job::Cancel)).collect();
        self.run("cancel", items, abort).await
    }

    async fn run(
        &self,
        operation: &'static str,
        items: Vec<(ServiceId, Job)>,
        abort: CancellationToken,
    ) -> BatchResult {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let mut identifiers = Vec::with_capacity(items.len());
        let mut tasks = Vec::with_capacity(items.len());

        info!(
            "Starting {} batch with {} items (concurrency {})",
            operation,
            items.len(),
            self.max_concurrency
        );

        for (id, job) in items {
            identifiers.push(id.clone());

            let task = {
                let remote = self.remote.clone();
                let session = self.session.clone();
                let semaphore = semaphore.clone();
                let abort = abort.clone();

                tokio::spawn(async move {
                    if matches!(job, Job::Missing) {
                        return job.execute(remote.as_ref(), &session, id).await;
                    }

                    // Pending until a permit is granted; an abort before that fails the item.
                    let _permit = tokio::select! {
                        biased;
                        _ = abort.cancelled() => {
                            debug!("{} cancelled before dispatch", id);
                            return ItemOutcome::failed(id, CANCELLED_DETAIL);
                        }
                        permit = semaphore.acquire_owned() => match permit {
                            Ok(permit) => permit,
                            Err(_) => return ItemOutcome::failed(id, CANCELLED_DETAIL),
                        },
                    };

                    debug!("{} in flight", id);
                    job.execute(remote.as_ref(), &session, id).await
                })
            };
            tasks.push(task);
        }

        let _guard = AbortOnDrop(tasks.iter().map(|task| task.abort_handle()).collect());
        let results = join_all(tasks).await;
        let outcomes: Vec<ItemOutcome> = results
            .into_iter()
            .zip(identifiers)
            .map(|(result, id)| match result {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!("{} task for {} panicked: {}", operation, id, e);
                    ItemOutcome::failed(id, PANICKED_DETAIL)
                }
            })
            .collect();

        let result = BatchResult::new(outcomes);
        info!(
            "Finished {} batch: {} succeeded, {} failed",
            operation,
            result.succeeded(),
            result.failed()
        );
        result
    }
}
