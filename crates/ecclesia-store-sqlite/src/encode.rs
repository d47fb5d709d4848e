//! Encoding and decoding helpers between Rust domain types and the
//! plain-text representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings, UUIDs as hyphenated
//! lowercase strings, the site configuration as a JSON document, and
//! flags as integers.

use chrono::{DateTime, Utc};
use ecclesia_core::{
  donation::{Donation, DonationStatus, Donor},
  parish::{Parish, SiteConfig},
  project::Project,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── DonationStatus ──────────────────────────────────────────────────────────

pub fn encode_status(s: DonationStatus) -> &'static str {
  match s {
    DonationStatus::Pending => "pending",
    DonationStatus::Complete => "complete",
  }
}

pub fn decode_status(s: &str) -> Result<DonationStatus> {
  match s {
    "pending" => Ok(DonationStatus::Pending),
    "complete" => Ok(DonationStatus::Complete),
    other => Err(Error::UnknownStatus(other.to_owned())),
  }
}

// ─── SiteConfig ──────────────────────────────────────────────────────────────

pub fn encode_site_config(config: &SiteConfig) -> Result<String> {
  Ok(serde_json::to_string(config)?)
}

pub fn decode_site_config(s: &str) -> Result<SiteConfig> {
  Ok(serde_json::from_str(s)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `donations` row.
pub struct RawDonation {
  pub donation_id:         String,
  pub project_id:          String,
  pub amount:              i64,
  pub status:              String,
  pub donor_first_name:    Option<String>,
  pub donor_last_name:     Option<String>,
  pub donor_email:         Option<String>,
  pub donor_phone:         Option<String>,
  pub anonymous:           bool,
  pub message:             Option<String>,
  pub checkout_session_id: Option<String>,
  pub payment_intent_id:   Option<String>,
  pub created_at:          String,
}

impl RawDonation {
  pub fn into_donation(self) -> Result<Donation> {
    let donor = if self.donor_first_name.is_some()
      || self.donor_last_name.is_some()
      || self.donor_email.is_some()
      || self.donor_phone.is_some()
    {
      Some(Donor {
        first_name: self.donor_first_name,
        last_name:  self.donor_last_name,
        email:      self.donor_email,
        phone:      self.donor_phone,
      })
    } else {
      None
    };

    Ok(Donation {
      donation_id: decode_uuid(&self.donation_id)?,
      project_id: self.project_id,
      amount: self.amount,
      status: decode_status(&self.status)?,
      donor,
      anonymous: self.anonymous,
      message: self.message,
      checkout_session_id: self.checkout_session_id,
      payment_intent_id: self.payment_intent_id,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from a `projects` row.
pub struct RawProject {
  pub project_id:  String,
  pub parish_id:   String,
  pub title:       String,
  pub description: Option<String>,
  pub image:       Option<String>,
  pub theme:       Option<String>,
  pub goal:        i64,
  pub collected:   i64,
  pub featured:    bool,
  pub active:      bool,
}

impl RawProject {
  pub fn into_project(self) -> Result<Project> {
    Ok(Project {
      project_id:  self.project_id,
      parish_id:   decode_uuid(&self.parish_id)?,
      title:       self.title,
      description: self.description,
      image:       self.image,
      theme:       self.theme,
      goal:        self.goal,
      collected:   self.collected,
      featured:    self.featured,
      active:      self.active,
    })
  }
}

/// Raw strings read directly from a `parishes` row.
pub struct RawParish {
  pub parish_id:   String,
  pub name:        String,
  pub subdomain:   String,
  pub site_config: String,
  pub created_at:  String,
}

impl RawParish {
  pub fn into_parish(self) -> Result<Parish> {
    Ok(Parish {
      parish_id:   decode_uuid(&self.parish_id)?,
      name:        self.name,
      subdomain:   self.subdomain,
      site_config: decode_site_config(&self.site_config)?,
      created_at:  decode_dt(&self.created_at)?,
    })
  }
}
