//! The collection aggregator — rebuilds every project's `collected` cache
//! from the authoritative donation log.
//!
//! The total is always recomputed from completed donations and fully
//! overwritten in every storage representation; it is never incremented.
//! This makes reconciliation safe to run any number of times, in any
//! order, concurrently with itself.

use std::{collections::BTreeSet, sync::Arc};

use crate::{Error, Result, repository::ProjectRepository, store::DonationStore};

/// Outcome of a [`CollectionAggregator::reconcile_all`] pass.
///
/// Per-project failures are isolated: a poison project never blocks the
/// rest of the batch.
#[derive(Debug, Default)]
pub struct ReconcileReport {
  /// Number of projects whose caches were rebuilt.
  pub reconciled: usize,
  /// Projects that failed, with the error that stopped them.
  pub failures:   Vec<(String, Error)>,
}

impl ReconcileReport {
  pub fn is_clean(&self) -> bool { self.failures.is_empty() }
}

/// Recomputes per-project collected totals across all storage
/// representations.
pub struct CollectionAggregator<D> {
  donations:    Arc<D>,
  repositories: Vec<Arc<dyn ProjectRepository>>,
}

impl<D> CollectionAggregator<D>
where
  D: DonationStore,
{
  pub fn new(
    donations: Arc<D>,
    repositories: Vec<Arc<dyn ProjectRepository>>,
  ) -> Self {
    Self { donations, repositories }
  }

  pub fn repositories(&self) -> &[Arc<dyn ProjectRepository>] {
    &self.repositories
  }

  /// Recompute one project's total and write it into every representation
  /// that holds the project. Returns the recomputed total.
  ///
  /// Errors with [`Error::ProjectNotFound`] if no representation holds the
  /// id — callers going through [`reconcile_all`](Self::reconcile_all)
  /// never see this, since the ids come from the representations
  /// themselves.
  pub async fn reconcile_project(&self, project_id: &str) -> Result<i64> {
    let total = self
      .donations
      .sum_completed(project_id)
      .await
      .map_err(Error::store)?;

    let mut found = false;
    for repo in &self.repositories {
      if repo.set_collected(project_id, total).await? {
        tracing::debug!(
          project_id,
          repository = repo.name(),
          collected = total,
          "collected cache rebuilt"
        );
        found = true;
      }
    }

    if !found {
      return Err(Error::ProjectNotFound(project_id.to_owned()));
    }
    Ok(total)
  }

  /// Reconcile every project known to any representation.
  ///
  /// Individual failures are logged and reported but do not abort the
  /// batch, and do not roll back projects already reconciled.
  pub async fn reconcile_all(&self) -> ReconcileReport {
    let mut ids = BTreeSet::new();
    for repo in &self.repositories {
      match repo.project_ids().await {
        Ok(repo_ids) => ids.extend(repo_ids),
        Err(err) => {
          tracing::warn!(
            repository = repo.name(),
            error = %err,
            "could not list projects; skipping representation"
          );
        }
      }
    }

    let mut report = ReconcileReport::default();
    for id in ids {
      match self.reconcile_project(&id).await {
        Ok(_) => report.reconciled += 1,
        Err(err) => {
          tracing::warn!(project_id = %id, error = %err, "reconciliation failed");
          report.failures.push((id, err));
        }
      }
    }
    report
  }
}
