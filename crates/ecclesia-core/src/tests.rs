//! Tests for the aggregator and the reconciliation orchestrator, against
//! in-memory fakes that honour the store and gateway contracts.

use std::{
  collections::HashMap,
  sync::{
    Arc, Mutex,
    atomic::{AtomicBool, Ordering},
  },
};

use chrono::Utc;
use thiserror::Error;
use uuid::Uuid;

use crate::{
  Error, Result,
  aggregate::CollectionAggregator,
  donation::{CompletedPayment, Donation, DonationStatus, NewDonation},
  gateway::{
    CheckoutGateway, CheckoutSession, CreatedSession, PaymentState, ReturnUrls,
    SessionState,
  },
  parish::{EmbeddedProject, SiteConfig},
  project::Project,
  reconcile::{Confirmation, Reconciler},
  repository::ProjectRepository,
  store::DonationStore,
};

// ─── Fake donation store ─────────────────────────────────────────────────────

#[derive(Debug, Error)]
enum MemError {
  #[error("invalid amount: {0}")]
  InvalidAmount(i64),

  #[error("donation not found: {0}")]
  NotFound(Uuid),
}

#[derive(Default)]
struct MemoryDonations {
  rows: Mutex<HashMap<Uuid, Donation>>,
}

impl DonationStore for MemoryDonations {
  type Error = MemError;

  async fn create_donation(&self, input: NewDonation) -> Result<Donation, MemError> {
    input
      .validate()
      .map_err(|_| MemError::InvalidAmount(input.amount))?;
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
    self
      .rows
      .lock()
      .unwrap()
      .insert(donation.donation_id, donation.clone());
    Ok(donation)
  }

  async fn donation(&self, id: Uuid) -> Result<Option<Donation>, MemError> {
    Ok(self.rows.lock().unwrap().get(&id).cloned())
  }

  async fn attach_checkout_session(
    &self,
    id: Uuid,
    session_id: &str,
  ) -> Result<Donation, MemError> {
    let mut rows = self.rows.lock().unwrap();
    let row = rows.get_mut(&id).ok_or(MemError::NotFound(id))?;
    row.checkout_session_id = Some(session_id.to_owned());
    Ok(row.clone())
  }

  async fn mark_complete(
    &self,
    id: Uuid,
    payment: CompletedPayment,
  ) -> Result<Donation, MemError> {
    let mut rows = self.rows.lock().unwrap();
    let row = rows.get_mut(&id).ok_or(MemError::NotFound(id))?;
    // Conditional update: already-complete rows come back unchanged.
    if row.status.is_complete() {
      return Ok(row.clone());
    }
    row.status = DonationStatus::Complete;
    row.checkout_session_id = Some(payment.checkout_session_id);
    row.payment_intent_id = payment.payment_intent_id;
    Ok(row.clone())
  }

  async fn sum_completed(&self, project_id: &str) -> Result<i64, MemError> {
    Ok(
      self
        .rows
        .lock()
        .unwrap()
        .values()
        .filter(|d| d.status.is_complete() && d.project_id == project_id)
        .map(|d| d.amount)
        .sum(),
    )
  }
}

// ─── Fake gateway ────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
enum GwError {
  #[error("gateway unavailable")]
  Unavailable,

  #[error("unknown session: {0}")]
  Unknown(String),
}

#[derive(Default)]
struct FakeGateway {
  sessions: Mutex<HashMap<String, CheckoutSession>>,
  fail:     AtomicBool,
}

impl FakeGateway {
  /// Flip the session to settled, as the processor would after payment.
  fn settle(&self, session_id: &str) {
    let mut sessions = self.sessions.lock().unwrap();
    let session = sessions.get_mut(session_id).expect("session exists");
    session.state = SessionState::Complete;
    session.payment = PaymentState::Paid;
    session.payment_intent_id = Some(format!("pi_{session_id}"));
  }

  /// Insert a settled session whose metadata carries no donation id.
  fn insert_orphan(&self, session_id: &str) {
    self.sessions.lock().unwrap().insert(
      session_id.to_owned(),
      CheckoutSession {
        session_id:        session_id.to_owned(),
        state:             SessionState::Complete,
        payment:           PaymentState::Paid,
        payment_intent_id: Some("pi_orphan".to_owned()),
        donation_id:       None,
      },
    );
  }
}

impl CheckoutGateway for FakeGateway {
  type Error = GwError;

  async fn create_session(
    &self,
    donation: &Donation,
    _urls: &ReturnUrls,
  ) -> Result<CreatedSession, GwError> {
    let mut sessions = self.sessions.lock().unwrap();
    let session_id = format!("cs_test_{}", sessions.len() + 1);
    sessions.insert(session_id.clone(), CheckoutSession {
      session_id:        session_id.clone(),
      state:             SessionState::Open,
      payment:           PaymentState::Unpaid,
      payment_intent_id: None,
      donation_id:       Some(donation.donation_id),
    });
    Ok(CreatedSession {
      url: format!("https://pay.example/c/{session_id}"),
      session_id,
    })
  }

  async fn retrieve_session(&self, session_id: &str) -> Result<CheckoutSession, GwError> {
    if self.fail.load(Ordering::SeqCst) {
      return Err(GwError::Unavailable);
    }
    self
      .sessions
      .lock()
      .unwrap()
      .get(session_id)
      .cloned()
      .ok_or_else(|| GwError::Unknown(session_id.to_owned()))
  }
}

// ─── Fake repositories ───────────────────────────────────────────────────────

/// Relational-style representation; optionally poisoned for one id.
struct MemoryProjects {
  label:  &'static str,
  rows:   Mutex<Vec<Project>>,
  poison: Option<String>,
}

impl MemoryProjects {
  fn new(label: &'static str, rows: Vec<Project>) -> Self {
    Self { label, rows: Mutex::new(rows), poison: None }
  }

  fn collected(&self, project_id: &str) -> i64 {
    self
      .rows
      .lock()
      .unwrap()
      .iter()
      .find(|p| p.project_id == project_id)
      .map(|p| p.collected)
      .expect("project exists")
  }
}

#[async_trait::async_trait]
impl ProjectRepository for MemoryProjects {
  fn name(&self) -> &'static str { self.label }

  async fn projects(&self) -> Result<Vec<Project>> {
    Ok(self.rows.lock().unwrap().clone())
  }

  async fn set_collected(&self, project_id: &str, collected: i64) -> Result<bool> {
    if self.poison.as_deref() == Some(project_id) {
      return Err(Error::store(std::io::Error::other("simulated write failure")));
    }
    let mut rows = self.rows.lock().unwrap();
    let mut found = false;
    for p in rows.iter_mut().filter(|p| p.project_id == project_id) {
      p.collected = collected;
      found = true;
    }
    Ok(found)
  }
}

/// Embedded-document representation backed by a real [`SiteConfig`].
struct ConfigProjects {
  parish_id: Uuid,
  config:    Mutex<SiteConfig>,
}

impl ConfigProjects {
  fn new(config: SiteConfig) -> Self {
    Self { parish_id: Uuid::new_v4(), config: Mutex::new(config) }
  }

  fn collected(&self, project_id: &str) -> i64 {
    self
      .config
      .lock()
      .unwrap()
      .find_project(project_id, self.parish_id)
      .expect("embedded project exists")
      .collected
  }
}

#[async_trait::async_trait]
impl ProjectRepository for ConfigProjects {
  fn name(&self) -> &'static str { "site-config" }

  async fn projects(&self) -> Result<Vec<Project>> {
    let config = self.config.lock().unwrap();
    let mut out: Vec<Project> = Vec::new();
    for id in config.project_ids() {
      if out.iter().any(|p| p.project_id == id) {
        continue;
      }
      if let Some(p) = config.find_project(&id, self.parish_id) {
        out.push(p);
      }
    }
    Ok(out)
  }

  async fn set_collected(&self, project_id: &str, collected: i64) -> Result<bool> {
    Ok(self.config.lock().unwrap().set_collected(project_id, collected))
  }
}

// ─── Fixtures ────────────────────────────────────────────────────────────────

fn project(id: &str, goal: i64) -> Project {
  Project {
    project_id:  id.to_owned(),
    parish_id:   Uuid::new_v4(),
    title:       format!("Project {id}"),
    description: None,
    image:       None,
    theme:       None,
    goal,
    collected:   0,
    featured:    false,
    active:      true,
  }
}

fn embedded(id: &str, goal: i64) -> EmbeddedProject {
  EmbeddedProject {
    id:          id.to_owned(),
    title:       format!("Project {id}"),
    description: None,
    image:       None,
    goal,
    collected:   0,
    active:      true,
  }
}

struct Harness {
  donations:  Arc<MemoryDonations>,
  gateway:    Arc<FakeGateway>,
  rows:       Arc<MemoryProjects>,
  reconciler: Arc<Reconciler<MemoryDonations, FakeGateway>>,
}

fn harness(rows: MemoryProjects, extra: Vec<Arc<dyn ProjectRepository>>) -> Harness {
  let donations = Arc::new(MemoryDonations::default());
  let gateway = Arc::new(FakeGateway::default());
  let rows = Arc::new(rows);

  let mut repositories: Vec<Arc<dyn ProjectRepository>> =
    vec![rows.clone() as Arc<dyn ProjectRepository>];
  repositories.extend(extra);

  let aggregator = CollectionAggregator::new(donations.clone(), repositories);
  let reconciler =
    Arc::new(Reconciler::new(donations.clone(), gateway.clone(), aggregator));

  Harness { donations, gateway, rows, reconciler }
}

fn return_urls() -> ReturnUrls {
  ReturnUrls {
    success: "https://example.parish/donate/thanks".to_owned(),
    cancel:  "https://example.parish/donate".to_owned(),
  }
}

/// Create a pending donation and its (unsettled) checkout session.
async fn start_donation(h: &Harness, project_id: &str, amount: i64) -> (Donation, String) {
  let donation = h
    .donations
    .create_donation(NewDonation::new(project_id, amount))
    .await
    .unwrap();
  let created = h
    .gateway
    .create_session(&donation, &return_urls())
    .await
    .unwrap();
  let donation = h
    .donations
    .attach_checkout_session(donation.donation_id, &created.session_id)
    .await
    .unwrap();
  (donation, created.session_id)
}

// ─── Store contract ──────────────────────────────────────────────────────────

#[tokio::test]
async fn create_donation_rejects_non_positive_amount() {
  let h = harness(MemoryProjects::new("rows", vec![project("p1", 100)]), vec![]);
  let err = h
    .donations
    .create_donation(NewDonation::new("p1", 0))
    .await
    .unwrap_err();
  assert!(matches!(err, MemError::InvalidAmount(0)));
}

#[tokio::test]
async fn mark_complete_is_idempotent() {
  let h = harness(MemoryProjects::new("rows", vec![project("p1", 100)]), vec![]);
  let (donation, session_id) = start_donation(&h, "p1", 50).await;

  let payment = CompletedPayment {
    checkout_session_id: session_id.clone(),
    payment_intent_id:   Some("pi_1".to_owned()),
  };
  let first = h
    .donations
    .mark_complete(donation.donation_id, payment.clone())
    .await
    .unwrap();
  let second = h
    .donations
    .mark_complete(donation.donation_id, payment)
    .await
    .unwrap();

  assert_eq!(first.status, DonationStatus::Complete);
  assert_eq!(second.status, DonationStatus::Complete);
  assert_eq!(second.created_at, first.created_at);
  assert_eq!(second.amount, first.amount);
  assert_eq!(h.donations.sum_completed("p1").await.unwrap(), 50);
}

#[tokio::test]
async fn sum_completed_ignores_pending_donations() {
  let h = harness(MemoryProjects::new("rows", vec![project("p1", 100)]), vec![]);
  start_donation(&h, "p1", 50).await;
  assert_eq!(h.donations.sum_completed("p1").await.unwrap(), 0);
}

// ─── Aggregator ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn reconcile_project_sums_completed_donations() {
  let h = harness(MemoryProjects::new("rows", vec![project("p2", 500)]), vec![]);

  for amount in [30, 70] {
    let (donation, session_id) = start_donation(&h, "p2", amount).await;
    h.gateway.settle(&session_id);
    h.reconciler.confirm(&session_id).await.unwrap();
    assert!(
      h.donations
        .donation(donation.donation_id)
        .await
        .unwrap()
        .unwrap()
        .status
        .is_complete()
    );
  }

  let total = h.reconciler.aggregator().reconcile_project("p2").await.unwrap();
  assert_eq!(total, 100);
  assert_eq!(h.rows.collected("p2"), 100);
}

#[tokio::test]
async fn reconcile_project_without_donations_writes_zero() {
  let mut rows = vec![project("p1", 100)];
  rows[0].collected = 999; // stale cache from a previous bug
  let h = harness(MemoryProjects::new("rows", rows), vec![]);

  let total = h.reconciler.aggregator().reconcile_project("p1").await.unwrap();
  assert_eq!(total, 0);
  assert_eq!(h.rows.collected("p1"), 0);
}

#[tokio::test]
async fn reconcile_unknown_project_errors() {
  let h = harness(MemoryProjects::new("rows", vec![]), vec![]);
  let err = h
    .reconciler
    .aggregator()
    .reconcile_project("nope")
    .await
    .unwrap_err();
  assert!(matches!(err, Error::ProjectNotFound(id) if id == "nope"));
}

#[tokio::test]
async fn reconcile_all_keeps_both_representations_equal() {
  let mut config = SiteConfig::default();
  config
    .themes
    .insert("restoration".to_owned(), vec![embedded("p1", 100)]);
  let config_repo = Arc::new(ConfigProjects::new(config));

  let h = harness(
    MemoryProjects::new("rows", vec![project("p1", 100)]),
    vec![config_repo.clone() as Arc<dyn ProjectRepository>],
  );

  let (_, session_id) = start_donation(&h, "p1", 50).await;
  h.gateway.settle(&session_id);
  h.reconciler.confirm(&session_id).await.unwrap();

  assert_eq!(h.rows.collected("p1"), 50);
  assert_eq!(config_repo.collected("p1"), 50);
}

#[tokio::test]
async fn reconcile_all_isolates_per_project_failures() {
  let mut rows = MemoryProjects::new("rows", vec![project("pa", 100), project("pb", 100)]);
  rows.poison = Some("pa".to_owned());
  let h = harness(rows, vec![]);

  let (_, session_id) = start_donation(&h, "pb", 40).await;
  h.gateway.settle(&session_id);
  h.reconciler.confirm(&session_id).await.unwrap();

  let report = h.reconciler.aggregator().reconcile_all().await;
  assert_eq!(report.reconciled, 1);
  assert_eq!(report.failures.len(), 1);
  assert_eq!(report.failures[0].0, "pa");
  // The poison project did not block pb.
  assert_eq!(h.rows.collected("pb"), 40);
}

// ─── Orchestrator ────────────────────────────────────────────────────────────

#[tokio::test]
async fn happy_path_marks_complete_and_rebuilds_caches() {
  let h = harness(MemoryProjects::new("rows", vec![project("p1", 200)]), vec![]);
  let (donation, session_id) = start_donation(&h, "p1", 50).await;

  h.gateway.settle(&session_id);
  let outcome = h.reconciler.confirm(&session_id).await.unwrap();

  let Confirmation::Completed(confirmed) = outcome else {
    panic!("expected Completed");
  };
  assert_eq!(confirmed.donation_id, donation.donation_id);
  assert_eq!(confirmed.payment_intent_id.as_deref(), Some(format!("pi_{session_id}").as_str()));
  assert_eq!(h.donations.sum_completed("p1").await.unwrap(), 50);
  assert_eq!(h.rows.collected("p1"), 50);
}

#[tokio::test]
async fn unsettled_payment_stays_pending_without_mutation() {
  let h = harness(MemoryProjects::new("rows", vec![project("p1", 200)]), vec![]);
  let (donation, session_id) = start_donation(&h, "p1", 50).await;

  let outcome = h.reconciler.confirm(&session_id).await.unwrap();

  assert!(matches!(outcome, Confirmation::Pending(_)));
  let stored = h
    .donations
    .donation(donation.donation_id)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(stored.status, DonationStatus::Pending);
  assert_eq!(h.rows.collected("p1"), 0);
}

#[tokio::test]
async fn replayed_confirmation_does_not_double_count() {
  let h = harness(MemoryProjects::new("rows", vec![project("p1", 200)]), vec![]);
  let (donation, session_id) = start_donation(&h, "p1", 50).await;

  h.gateway.settle(&session_id);
  let first = h.reconciler.confirm(&session_id).await.unwrap();
  let second = h.reconciler.confirm(&session_id).await.unwrap();

  let (Confirmation::Completed(a), Confirmation::Completed(b)) = (first, second) else {
    panic!("both attempts should report Completed");
  };
  assert_eq!(a.donation_id, donation.donation_id);
  assert_eq!(b.created_at, a.created_at);
  assert_eq!(b.amount, 50);
  assert_eq!(h.donations.sum_completed("p1").await.unwrap(), 50);
  assert_eq!(h.rows.collected("p1"), 50);
}

#[tokio::test]
async fn concurrent_confirmations_count_once() {
  let h = harness(MemoryProjects::new("rows", vec![project("p1", 200)]), vec![]);
  let (_, session_id) = start_donation(&h, "p1", 50).await;
  h.gateway.settle(&session_id);

  let mut handles = Vec::new();
  for _ in 0..8 {
    let reconciler = h.reconciler.clone();
    let session_id = session_id.clone();
    handles.push(tokio::spawn(async move {
      reconciler.confirm(&session_id).await
    }));
  }
  for handle in handles {
    assert!(matches!(
      handle.await.unwrap().unwrap(),
      Confirmation::Completed(_)
    ));
  }

  assert_eq!(h.donations.sum_completed("p1").await.unwrap(), 50);
  assert_eq!(h.rows.collected("p1"), 50);
}

#[tokio::test]
async fn session_without_donation_reference_errors() {
  let h = harness(MemoryProjects::new("rows", vec![project("p1", 200)]), vec![]);
  h.gateway.insert_orphan("cs_orphan");

  let err = h.reconciler.confirm("cs_orphan").await.unwrap_err();
  assert!(matches!(err, Error::MissingReference { session_id } if session_id == "cs_orphan"));
}

#[tokio::test]
async fn unknown_donation_id_errors() {
  let h = harness(MemoryProjects::new("rows", vec![project("p1", 200)]), vec![]);
  let (donation, session_id) = start_donation(&h, "p1", 50).await;
  h.gateway.settle(&session_id);
  // Simulate a session pointing at a donation another environment owns.
  h.donations.rows.lock().unwrap().remove(&donation.donation_id);

  let err = h.reconciler.confirm(&session_id).await.unwrap_err();
  assert!(matches!(err, Error::DonationNotFound(id) if id == donation.donation_id));
}

#[tokio::test]
async fn gateway_failure_leaves_local_state_untouched() {
  let h = harness(MemoryProjects::new("rows", vec![project("p1", 200)]), vec![]);
  let (donation, session_id) = start_donation(&h, "p1", 50).await;
  h.gateway.fail.store(true, Ordering::SeqCst);

  let err = h.reconciler.confirm(&session_id).await.unwrap_err();
  assert!(matches!(err, Error::Gateway(_)));

  let stored = h
    .donations
    .donation(donation.donation_id)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(stored.status, DonationStatus::Pending);
  assert_eq!(h.rows.collected("p1"), 0);
}

// ─── SiteConfig ──────────────────────────────────────────────────────────────

#[test]
fn site_config_updates_every_copy_of_a_project() {
  let mut config = SiteConfig::default();
  config
    .themes
    .insert("roof".to_owned(), vec![embedded("p1", 100), embedded("p2", 50)]);
  config.featured.push(embedded("p1", 100));

  assert!(config.set_collected("p1", 75));

  let themed = &config.themes["roof"][0];
  let featured = &config.featured[0];
  assert_eq!(themed.collected, 75);
  assert_eq!(featured.collected, 75);
  assert_eq!(config.themes["roof"][1].collected, 0);
}

#[test]
fn site_config_set_collected_reports_missing_project() {
  let mut config = SiteConfig::default();
  assert!(!config.set_collected("ghost", 10));
}

#[test]
fn site_config_round_trip_preserves_unknown_keys() {
  let raw = serde_json::json!({
    "themes": { "organ": [ { "id": "p1", "title": "Organ fund", "goal": 1000 } ] },
    "featured": [ { "id": "p1", "title": "Organ fund", "goal": 1000 } ],
    "banner": { "text": "Welcome" },
    "colors": ["#aa0000", "#ffffff"],
  });

  let config: SiteConfig = serde_json::from_value(raw).unwrap();
  assert_eq!(config.themes["organ"][0].collected, 0);
  assert!(config.themes["organ"][0].active);

  let back = serde_json::to_value(&config).unwrap();
  assert_eq!(back["banner"]["text"], "Welcome");
  assert_eq!(back["colors"][0], "#aa0000");
}
