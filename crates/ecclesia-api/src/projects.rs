//! Handlers for the project listing endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET` | `/api/projects` | Optional `?parish_id=<uuid>` filter |
//! | `GET` | `/api/projects/{id}` | 404 if no representation holds it |
//!
//! The front end renders progress bars from `collected` / `goal`; the
//! listing merges both storage representations, deduplicated by id.

use axum::{
  Json,
  extract::{Path, Query, State},
};
use ecclesia_core::{
  gateway::CheckoutGateway, project::Project, store::DonationStore,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{AppState, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub parish_id: Option<Uuid>,
}

/// `GET /api/projects[?parish_id=<uuid>]`
pub async fn list<D, G>(
  State(state): State<AppState<D, G>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Project>>, ApiError>
where
  D: DonationStore,
  G: CheckoutGateway,
{
  let mut merged: Vec<Project> = Vec::new();
  for repo in state.reconciler.aggregator().repositories() {
    let projects = repo
      .projects()
      .await
      .map_err(|e| ApiError::Store(Box::new(e)))?;
    for project in projects {
      if merged.iter().any(|p| p.project_id == project.project_id) {
        continue;
      }
      merged.push(project);
    }
  }

  if let Some(parish_id) = params.parish_id {
    merged.retain(|p| p.parish_id == parish_id);
  }

  Ok(Json(merged))
}

/// `GET /api/projects/{id}`
pub async fn get_one<D, G>(
  State(state): State<AppState<D, G>>,
  Path(id): Path<String>,
) -> Result<Json<Project>, ApiError>
where
  D: DonationStore,
  G: CheckoutGateway,
{
  for repo in state.reconciler.aggregator().repositories() {
    if let Some(project) = repo
      .find_project(&id)
      .await
      .map_err(|e| ApiError::Store(Box::new(e)))?
    {
      return Ok(Json(project));
    }
  }
  Err(ApiError::NotFound(format!("project {id} not found")))
}
