//! Project — a fundraising campaign with a target and a cached total.
//!
//! The `collected` field is a derived cache owned by the
//! [`CollectionAggregator`](crate::aggregate::CollectionAggregator). It is
//! always fully overwritten from the donation log, never incremented, so it
//! cannot drift from missed or duplicated events.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A fundraising campaign. May be stored as a relational row, as an entry
/// embedded in a parish's site configuration, or both; every representation
/// must agree on `collected` after a reconciliation pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
  pub project_id:  String,
  pub parish_id:   Uuid,
  pub title:       String,
  pub description: Option<String>,
  /// Path or URL of the campaign image.
  pub image:       Option<String>,
  /// Theme/category tag; embedded entries inherit it from their section key.
  pub theme:       Option<String>,
  /// Target amount in whole currency units.
  pub goal:        i64,
  /// Sum of completed donation amounts; aggregator-owned.
  pub collected:   i64,
  pub featured:    bool,
  pub active:      bool,
}

impl Project {
  /// Fraction of the goal reached, clamped to `[0, 1]`. Zero-goal projects
  /// report 0 rather than dividing by zero.
  pub fn progress(&self) -> f64 {
    if self.goal <= 0 {
      return 0.0;
    }
    (self.collected as f64 / self.goal as f64).clamp(0.0, 1.0)
  }
}
