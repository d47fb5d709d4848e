//! The two [`ProjectRepository`] adapters.
//!
//! [`ProjectRows`] reads and writes the relational `projects` table.
//! [`SiteConfigProjects`] reads and writes project entries embedded in
//! parish site-configuration documents. The aggregator treats both
//! uniformly; a project present in both representations gets the same
//! recomputed total written to each.

use async_trait::async_trait;

use ecclesia_core::{
  Error as CoreError, Result as CoreResult, project::Project,
  repository::ProjectRepository,
};

use crate::{
  SqliteStore,
  encode::{RawProject, decode_site_config, encode_site_config},
};

// ─── Relational rows ─────────────────────────────────────────────────────────

/// Projects stored as rows in the `projects` table.
#[derive(Clone)]
pub struct ProjectRows {
  store: SqliteStore,
}

impl ProjectRows {
  pub fn new(store: SqliteStore) -> Self { Self { store } }
}

const PROJECT_COLUMNS: &str = "project_id, parish_id, title, description, \
   image, theme, goal, collected, featured, active";

fn raw_project(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawProject> {
  Ok(RawProject {
    project_id:  row.get(0)?,
    parish_id:   row.get(1)?,
    title:       row.get(2)?,
    description: row.get(3)?,
    image:       row.get(4)?,
    theme:       row.get(5)?,
    goal:        row.get(6)?,
    collected:   row.get(7)?,
    featured:    row.get(8)?,
    active:      row.get(9)?,
  })
}

#[async_trait]
impl ProjectRepository for ProjectRows {
  fn name(&self) -> &'static str { "rows" }

  async fn projects(&self) -> CoreResult<Vec<Project>> {
    let raws: Vec<RawProject> = self
      .store
      .conn
      .call(|conn| {
        let mut stmt =
          conn.prepare(&format!("SELECT {PROJECT_COLUMNS} FROM projects"))?;
        let rows = stmt
          .query_map([], raw_project)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
      .map_err(CoreError::store)?;

    raws
      .into_iter()
      .map(|r| r.into_project().map_err(CoreError::store))
      .collect()
  }

  async fn find_project(&self, project_id: &str) -> CoreResult<Option<Project>> {
    use rusqlite::OptionalExtension as _;

    let id = project_id.to_owned();
    let raw: Option<RawProject> = self
      .store
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE project_id = ?1"),
              rusqlite::params![id],
              raw_project,
            )
            .optional()?,
        )
      })
      .await
      .map_err(CoreError::store)?;

    raw
      .map(|r| r.into_project().map_err(CoreError::store))
      .transpose()
  }

  async fn set_collected(&self, project_id: &str, collected: i64) -> CoreResult<bool> {
    let id = project_id.to_owned();
    let updated = self
      .store
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE projects SET collected = ?2 WHERE project_id = ?1",
          rusqlite::params![id, collected],
        )?)
      })
      .await
      .map_err(CoreError::store)?;

    Ok(updated > 0)
  }
}

// ─── Embedded site-config entries ────────────────────────────────────────────

/// Projects embedded in parish `site_config` documents (theme-keyed lists
/// and the featured list).
#[derive(Clone)]
pub struct SiteConfigProjects {
  store: SqliteStore,
}

impl SiteConfigProjects {
  pub fn new(store: SqliteStore) -> Self { Self { store } }
}

#[async_trait]
impl ProjectRepository for SiteConfigProjects {
  fn name(&self) -> &'static str { "site-config" }

  async fn projects(&self) -> CoreResult<Vec<Project>> {
    let parishes = self.store.parishes().await.map_err(CoreError::store)?;

    let mut out: Vec<Project> = Vec::new();
    for parish in parishes {
      for id in parish.site_config.project_ids() {
        if out.iter().any(|p| p.project_id == id) {
          continue;
        }
        if let Some(p) = parish.site_config.find_project(&id, parish.parish_id) {
          out.push(p);
        }
      }
    }
    Ok(out)
  }

  async fn set_collected(&self, project_id: &str, collected: i64) -> CoreResult<bool> {
    let id = project_id.to_owned();

    // Read-modify-write of each parish document in one connection call, so
    // a concurrent aggregation pass cannot interleave between the read and
    // the write of the same blob.
    let found = self
      .store
      .conn
      .call(move |conn| {
        let rows: Vec<(String, String)> = {
          let mut stmt =
            conn.prepare("SELECT parish_id, site_config FROM parishes")?;
          stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };

        let mut found = false;
        for (parish_id, config_str) in rows {
          // Unparseable documents are skipped, not fatal; the relational
          // representation still gets its update.
          let mut config = match decode_site_config(&config_str) {
            Ok(config) => config,
            Err(err) => {
              tracing::warn!(
                %parish_id,
                error = %err,
                "skipping unparseable site config"
              );
              continue;
            }
          };
          if !config.set_collected(&id, collected) {
            continue;
          }
          let updated = match encode_site_config(&config) {
            Ok(updated) => updated,
            Err(err) => {
              tracing::warn!(
                %parish_id,
                error = %err,
                "site config did not re-encode; leaving document untouched"
              );
              continue;
            }
          };
          conn.execute(
            "UPDATE parishes SET site_config = ?2 WHERE parish_id = ?1",
            rusqlite::params![parish_id, updated],
          )?;
          found = true;
        }
        Ok(found)
      })
      .await
      .map_err(CoreError::store)?;

    Ok(found)
  }
}
