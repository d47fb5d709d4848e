//! Parish — the tenant boundary.
//!
//! A parish owns zero or more projects and a semi-structured site
//! configuration blob. The blob may itself embed project records, keyed by
//! theme or collected under a "featured" list; those embedded entries are a
//! second storage representation of the same conceptual entity and must be
//! kept consistent with the relational rows.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::project::Project;

/// An administrative unit with its own subdomain-scoped site.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parish {
  pub parish_id:   Uuid,
  pub name:        String,
  pub subdomain:   String,
  pub site_config: SiteConfig,
  pub created_at:  DateTime<Utc>,
}

/// The parish site-configuration document.
///
/// Only the project-bearing sections are modelled here; unknown keys are
/// preserved verbatim so the aggregator can rewrite the blob without
/// destroying page content it does not understand.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SiteConfig {
  /// Theme-keyed project lists (e.g. `"restoration"`, `"solidarity"`).
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub themes:   BTreeMap<String, Vec<EmbeddedProject>>,
  /// Projects highlighted on the landing page.
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub featured: Vec<EmbeddedProject>,
  /// Everything else in the document, passed through untouched.
  #[serde(flatten)]
  pub extra:    BTreeMap<String, serde_json::Value>,
}

/// A project record embedded in a [`SiteConfig`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddedProject {
  pub id:          String,
  pub title:       String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub image:       Option<String>,
  /// Target amount in whole currency units.
  pub goal:        i64,
  /// Aggregator-owned cache, same invariant as [`Project::collected`].
  #[serde(default)]
  pub collected:   i64,
  #[serde(default = "default_active")]
  pub active:      bool,
}

fn default_active() -> bool { true }

impl SiteConfig {
  /// Iterate every embedded project together with the theme key it lives
  /// under (`None` for featured-list entries).
  pub fn projects(&self) -> impl Iterator<Item = (Option<&str>, &EmbeddedProject)> {
    self
      .themes
      .iter()
      .flat_map(|(theme, list)| {
        list.iter().map(move |p| (Some(theme.as_str()), p))
      })
      .chain(self.featured.iter().map(|p| (None, p)))
  }

  /// Ids of all embedded projects, in document order, without duplicates
  /// removed — callers union across representations anyway.
  pub fn project_ids(&self) -> Vec<String> {
    self.projects().map(|(_, p)| p.id.clone()).collect()
  }

  /// Find an embedded project and lift it into the shared [`Project`] shape.
  pub fn find_project(&self, project_id: &str, parish_id: Uuid) -> Option<Project> {
    let (theme, entry) = self.projects().find(|(_, p)| p.id == project_id)?;
    Some(Project {
      project_id:  entry.id.clone(),
      parish_id,
      title:       entry.title.clone(),
      description: entry.description.clone(),
      image:       entry.image.clone(),
      theme:       theme.map(str::to_owned),
      goal:        entry.goal,
      collected:   entry.collected,
      featured:    self.featured.iter().any(|p| p.id == project_id),
      active:      entry.active,
    })
  }

  /// Overwrite `collected` on every embedded entry with this id — a project
  /// can appear both under a theme and in the featured list, and the copies
  /// must not diverge. Returns `true` if any entry matched.
  pub fn set_collected(&mut self, project_id: &str, collected: i64) -> bool {
    let mut found = false;
    for entry in self
      .themes
      .values_mut()
      .flat_map(|list| list.iter_mut())
      .chain(self.featured.iter_mut())
    {
      if entry.id == project_id {
        entry.collected = collected;
        found = true;
      }
    }
    found
  }
}
