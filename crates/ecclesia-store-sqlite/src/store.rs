//! [`SqliteStore`] — SQLite-backed donation and parish persistence.

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use ecclesia_core::{
  donation::{CompletedPayment, Donation, DonationStatus, NewDonation},
  parish::{Parish, SiteConfig},
  project::Project,
  store::DonationStore,
};

use crate::{
  Error, Result,
  encode::{
    RawDonation, RawParish, encode_dt, encode_site_config, encode_status,
    encode_uuid,
  },
  schema::SCHEMA,
};

const DONATION_COLUMNS: &str = "donation_id, project_id, amount, status, \
   donor_first_name, donor_last_name, donor_email, donor_phone, \
   anonymous, message, checkout_session_id, payment_intent_id, created_at";

fn raw_donation(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawDonation> {
  Ok(RawDonation {
    donation_id:         row.get(0)?,
    project_id:          row.get(1)?,
    amount:              row.get(2)?,
    status:              row.get(3)?,
    donor_first_name:    row.get(4)?,
    donor_last_name:     row.get(5)?,
    donor_email:         row.get(6)?,
    donor_phone:         row.get(7)?,
    anonymous:           row.get(8)?,
    message:             row.get(9)?,
    checkout_session_id: row.get(10)?,
    payment_intent_id:   row.get(11)?,
    created_at:          row.get(12)?,
  })
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// An Ecclesia store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Parishes ──────────────────────────────────────────────────────────────

  /// Create and persist a new parish tenant.
  pub async fn add_parish(
    &self,
    name: &str,
    subdomain: &str,
    site_config: SiteConfig,
  ) -> Result<Parish> {
    let parish = Parish {
      parish_id: Uuid::new_v4(),
      name: name.to_owned(),
      subdomain: subdomain.to_owned(),
      site_config,
      created_at: Utc::now(),
    };

    let id_str     = encode_uuid(parish.parish_id);
    let name_str   = parish.name.clone();
    let sub_str    = parish.subdomain.clone();
    let config_str = encode_site_config(&parish.site_config)?;
    let at_str     = encode_dt(parish.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO parishes (parish_id, name, subdomain, site_config, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![id_str, name_str, sub_str, config_str, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(parish)
  }

  /// Retrieve a parish by id. Returns `None` if not found.
  pub async fn parish(&self, id: Uuid) -> Result<Option<Parish>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawParish> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT parish_id, name, subdomain, site_config, created_at
               FROM parishes WHERE parish_id = ?1",
              rusqlite::params![id_str],
              |row| {
                Ok(RawParish {
                  parish_id:   row.get(0)?,
                  name:        row.get(1)?,
                  subdomain:   row.get(2)?,
                  site_config: row.get(3)?,
                  created_at:  row.get(4)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawParish::into_parish).transpose()
  }

  /// List all parishes.
  pub async fn parishes(&self) -> Result<Vec<Parish>> {
    let raws: Vec<RawParish> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT parish_id, name, subdomain, site_config, created_at FROM parishes",
        )?;
        let rows = stmt
          .query_map([], |row| {
            Ok(RawParish {
              parish_id:   row.get(0)?,
              name:        row.get(1)?,
              subdomain:   row.get(2)?,
              site_config: row.get(3)?,
              created_at:  row.get(4)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawParish::into_parish).collect()
  }

  /// Replace a parish's site-configuration document.
  pub async fn update_site_config(
    &self,
    parish_id: Uuid,
    config: &SiteConfig,
  ) -> Result<()> {
    let id_str     = encode_uuid(parish_id);
    let config_str = encode_site_config(config)?;

    let updated = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE parishes SET site_config = ?2 WHERE parish_id = ?1",
          rusqlite::params![id_str, config_str],
        )?)
      })
      .await?;

    if updated == 0 {
      return Err(Error::ParishNotFound(parish_id));
    }
    Ok(())
  }

  // ── Projects (relational rows) ────────────────────────────────────────────

  /// Insert a project row. The caller controls the id so a row can mirror
  /// an entry that also exists in a site-config document.
  pub async fn add_project(&self, project: &Project) -> Result<()> {
    let project_id  = project.project_id.clone();
    let parish_str  = encode_uuid(project.parish_id);
    let title       = project.title.clone();
    let description = project.description.clone();
    let image       = project.image.clone();
    let theme       = project.theme.clone();
    let goal        = project.goal;
    let collected   = project.collected;
    let featured    = project.featured;
    let active      = project.active;
    let at_str      = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO projects (
             project_id, parish_id, title, description, image, theme,
             goal, collected, featured, active, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
          rusqlite::params![
            project_id,
            parish_str,
            title,
            description,
            image,
            theme,
            goal,
            collected,
            featured,
            active,
            at_str,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── DonationStore impl ──────────────────────────────────────────────────────

impl DonationStore for SqliteStore {
  type Error = Error;

  async fn create_donation(&self, input: NewDonation) -> Result<Donation> {
    input.validate().map_err(Error::Core)?;

    let donation = Donation {
      donation_id:         Uuid::new_v4(),
      project_id:          input.project_id,
      amount:              input.amount,
      status:              DonationStatus::Pending,
      donor:               input.donor,
      anonymous:           input.anonymous,
      message:             input.message,
      checkout_session_id: None,
      payment_intent_id:   None,
      created_at:          Utc::now(),
    };

    let id_str     = encode_uuid(donation.donation_id);
    let project_id = donation.project_id.clone();
    let amount     = donation.amount;
    let status_str = encode_status(donation.status).to_owned();
    let donor      = donation.donor.clone().unwrap_or_default();
    let anonymous  = donation.anonymous;
    let message    = donation.message.clone();
    let at_str     = encode_dt(donation.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO donations (
             donation_id, project_id, amount, status,
             donor_first_name, donor_last_name, donor_email, donor_phone,
             anonymous, message, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
          rusqlite::params![
            id_str,
            project_id,
            amount,
            status_str,
            donor.first_name,
            donor.last_name,
            donor.email,
            donor.phone,
            anonymous,
            message,
            at_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(donation)
  }

  async fn donation(&self, id: Uuid) -> Result<Option<Donation>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawDonation> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {DONATION_COLUMNS} FROM donations WHERE donation_id = ?1"),
              rusqlite::params![id_str],
              raw_donation,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawDonation::into_donation).transpose()
  }

  async fn attach_checkout_session(
    &self,
    id: Uuid,
    session_id: &str,
  ) -> Result<Donation> {
    let id_str      = encode_uuid(id);
    let session_str = session_id.to_owned();

    let updated = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE donations SET checkout_session_id = ?2 WHERE donation_id = ?1",
          rusqlite::params![id_str, session_str],
        )?)
      })
      .await?;

    if updated == 0 {
      return Err(Error::DonationNotFound(id));
    }
    self
      .donation(id)
      .await?
      .ok_or(Error::DonationNotFound(id))
  }

  async fn mark_complete(
    &self,
    id: Uuid,
    payment: CompletedPayment,
  ) -> Result<Donation> {
    let id_str      = encode_uuid(id);
    let session_str = payment.checkout_session_id;
    let intent_str  = payment.payment_intent_id;

    // Conditional update: only a pending row transitions, so concurrent
    // calls (webhook racing a success-page visit) observe exactly one
    // pending -> complete flip and a replay never rewrites the row.
    self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE donations
           SET status = 'complete',
               checkout_session_id = ?2,
               payment_intent_id   = ?3
           WHERE donation_id = ?1 AND status = 'pending'",
          rusqlite::params![id_str, session_str, intent_str],
        )?)
      })
      .await?;

    self
      .donation(id)
      .await?
      .ok_or(Error::DonationNotFound(id))
  }

  async fn sum_completed(&self, project_id: &str) -> Result<i64> {
    let project_str = project_id.to_owned();

    let total: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT COALESCE(SUM(amount), 0) FROM donations
           WHERE project_id = ?1 AND status = 'complete'",
          rusqlite::params![project_str],
          |row| row.get(0),
        )?)
      })
      .await?;

    Ok(total)
  }
}
