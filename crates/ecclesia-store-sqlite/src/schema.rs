//! SQL schema for the Ecclesia SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS parishes (
    parish_id   TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    subdomain   TEXT NOT NULL UNIQUE,
    site_config TEXT NOT NULL DEFAULT '{}',  -- JSON document; may embed projects
    created_at  TEXT NOT NULL               -- ISO 8601 UTC
);

CREATE TABLE IF NOT EXISTS projects (
    project_id  TEXT PRIMARY KEY,
    parish_id   TEXT NOT NULL REFERENCES parishes(parish_id),
    title       TEXT NOT NULL,
    description TEXT,
    image       TEXT,
    theme       TEXT,
    goal        INTEGER NOT NULL,
    collected   INTEGER NOT NULL DEFAULT 0,  -- cache; rebuilt by the aggregator
    featured    INTEGER NOT NULL DEFAULT 0,
    active      INTEGER NOT NULL DEFAULT 1,
    created_at  TEXT NOT NULL
);

-- Donations are never deleted. Status only ever moves pending -> complete;
-- the UPDATE in mark_complete is conditional on status = 'pending'.
-- project_id is intentionally not a foreign key: a project may exist only
-- inside a parish's site_config document.
CREATE TABLE IF NOT EXISTS donations (
    donation_id         TEXT PRIMARY KEY,
    project_id          TEXT NOT NULL,
    amount              INTEGER NOT NULL CHECK (amount > 0),
    status              TEXT NOT NULL DEFAULT 'pending',  -- 'pending' | 'complete'
    donor_first_name    TEXT,
    donor_last_name     TEXT,
    donor_email         TEXT,
    donor_phone         TEXT,
    anonymous           INTEGER NOT NULL DEFAULT 1,
    message             TEXT,
    checkout_session_id TEXT,
    payment_intent_id   TEXT,
    created_at          TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS donations_project_idx ON donations(project_id, status);
CREATE INDEX IF NOT EXISTS donations_session_idx ON donations(checkout_session_id);
CREATE INDEX IF NOT EXISTS projects_parish_idx   ON projects(parish_id);

PRAGMA user_version = 1;
";
