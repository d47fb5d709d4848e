//! The `ProjectRepository` trait — one adapter per storage representation.
//!
//! The same conceptual project may live as a relational row, as an entry
//! embedded in a parish site-configuration document, or both. Rather than
//! branching on storage kind inline, the aggregator holds a list of
//! `dyn ProjectRepository` adapters and applies every write to each of
//! them. This trait is object-safe (hence `async_trait`), unlike the
//! store and gateway seams which are generic.

use async_trait::async_trait;

use crate::{Result, project::Project};

/// One storage representation of projects.
#[async_trait]
pub trait ProjectRepository: Send + Sync {
  /// Short label used in logs (e.g. `"rows"`, `"site-config"`).
  fn name(&self) -> &'static str;

  /// All projects this representation holds.
  async fn projects(&self) -> Result<Vec<Project>>;

  /// Overwrite the cached `collected` field for a project. Returns `false`
  /// (not an error) if this representation does not hold the project.
  ///
  /// Only the aggregator calls this; nothing else may touch `collected`.
  async fn set_collected(&self, project_id: &str, collected: i64) -> Result<bool>;

  /// Look up a single project by id.
  async fn find_project(&self, project_id: &str) -> Result<Option<Project>> {
    Ok(
      self
        .projects()
        .await?
        .into_iter()
        .find(|p| p.project_id == project_id),
    )
  }

  /// Ids of all projects this representation holds.
  async fn project_ids(&self) -> Result<Vec<String>> {
    Ok(
      self
        .projects()
        .await?
        .into_iter()
        .map(|p| p.project_id)
        .collect(),
    )
  }
}
