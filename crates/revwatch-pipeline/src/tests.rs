//! Pipeline tests against an in-memory `SqliteStore`, a scripted crawler, a
//! recording messenger and a manually advanced clock.

use std::{
  collections::{HashMap, HashSet},
  sync::{
    Arc, Mutex,
    atomic::{AtomicBool, AtomicUsize, Ordering},
  },
  time::Duration,
};

use chrono::{DateTime, TimeDelta, Utc};
use revwatch_core::{
  crawl::{CrawlFailure, Crawler},
  messaging::{DeliveryFailure, Destination, Messenger, Notification, Resolution},
  profile::{Profile, ProfileSnapshot},
  review::{Review, ReviewSnapshot},
  store::ReviewStore,
  subscription::{NewSubscription, SubscribeOutcome, Subscription},
};
use revwatch_store_sqlite::SqliteStore;

use crate::{
  Error, Phase, PipelineConfig,
  clock::Clock,
  dispatch::Dispatcher,
  format::Formatter,
  orchestrator::supervise,
  queue::{NotificationEvent, NotificationQueue, notification_queue},
  scan::Scanner,
  update::ReviewUpdater,
};

// ─── Fakes ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum Script {
  Review(ReviewSnapshot),
  Nothing,
  Fail,
  Hang,
  /// Another writer installs `Review` while this crawl is in flight; the
  /// crawl then reports `ReviewSnapshot`.
  Race(Review, ReviewSnapshot),
}

struct FakeCrawler {
  store:         Arc<SqliteStore>,
  names:         Mutex<HashMap<String, String>>,
  scripts:       Mutex<HashMap<String, Script>>,
  review_calls:  Mutex<Vec<String>>,
  profile_calls: AtomicUsize,
}

impl FakeCrawler {
  fn new(store: Arc<SqliteStore>) -> Self {
    Self {
      store,
      names: Mutex::default(),
      scripts: Mutex::default(),
      review_calls: Mutex::default(),
      profile_calls: AtomicUsize::new(0),
    }
  }

  fn knows(&self, id: &str, name: &str) {
    self.names.lock().unwrap().insert(id.into(), name.into());
  }

  fn script(&self, id: &str, script: Script) {
    self.scripts.lock().unwrap().insert(id.into(), script);
  }

  fn review_calls(&self) -> Vec<String> { self.review_calls.lock().unwrap().clone() }
}

impl Crawler for FakeCrawler {
  async fn fetch_profile(&self, profile_id: &str) -> Result<ProfileSnapshot, CrawlFailure> {
    self.profile_calls.fetch_add(1, Ordering::SeqCst);
    let name = self.names.lock().unwrap().get(profile_id).cloned();
    match name {
      Some(display_name) => Ok(ProfileSnapshot {
        profile_id: profile_id.into(),
        display_name,
      }),
      None => Err(CrawlFailure::ProfileNotFound(profile_id.into())),
    }
  }

  async fn fetch_latest_review(
    &self,
    profile: &Profile,
  ) -> Result<Option<ReviewSnapshot>, CrawlFailure> {
    let id = profile.profile_id.clone();
    self.review_calls.lock().unwrap().push(id.clone());
    let script = self.scripts.lock().unwrap().get(&id).cloned();
    match script.unwrap_or(Script::Nothing) {
      Script::Review(snapshot) => Ok(Some(snapshot)),
      Script::Nothing => Ok(None),
      Script::Fail => Err(CrawlFailure::Network("connection reset".into())),
      Script::Hang => {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(None)
      }
      Script::Race(winner, snapshot) => {
        self.store.install_review(winner, None).await.unwrap();
        Ok(Some(snapshot))
      }
    }
  }
}

#[derive(Default)]
struct FakeMessenger {
  missing_groups:   Mutex<HashSet<String>>,
  missing_channels: Mutex<HashSet<String>>,
  unreachable:      AtomicBool,
  failing_send:     AtomicBool,
  sent:             Mutex<Vec<(Destination, Notification)>>,
}

impl FakeMessenger {
  fn sent(&self) -> Vec<(Destination, Notification)> { self.sent.lock().unwrap().clone() }
}

impl Messenger for FakeMessenger {
  async fn resolve_destination(
    &self,
    group_id: &str,
    channel_id: &str,
  ) -> Result<Resolution, DeliveryFailure> {
    if self.unreachable.load(Ordering::SeqCst) {
      return Err(DeliveryFailure::Network("platform unreachable".into()));
    }
    if self.missing_groups.lock().unwrap().contains(group_id) {
      return Ok(Resolution::GroupNotFound);
    }
    if self.missing_channels.lock().unwrap().contains(channel_id) {
      return Ok(Resolution::ChannelNotFound);
    }
    Ok(Resolution::Found(Destination {
      group_id:   group_id.into(),
      channel_id: channel_id.into(),
    }))
  }

  async fn send(
    &self,
    destination: &Destination,
    notification: &Notification,
  ) -> Result<(), DeliveryFailure> {
    if self.failing_send.load(Ordering::SeqCst) {
      return Err(DeliveryFailure::RateLimited { retry_after: None });
    }
    self
      .sent
      .lock()
      .unwrap()
      .push((destination.clone(), notification.clone()));
    Ok(())
  }
}

struct ManualClock(Mutex<DateTime<Utc>>);

impl ManualClock {
  fn advance(&self, by: TimeDelta) { *self.0.lock().unwrap() += by; }
}

impl Clock for ManualClock {
  fn now(&self) -> DateTime<Utc> { *self.0.lock().unwrap() }
}

// ─── Harness ─────────────────────────────────────────────────────────────────

struct Harness {
  store:     Arc<SqliteStore>,
  crawler:   Arc<FakeCrawler>,
  messenger: Arc<FakeMessenger>,
  clock:     Arc<ManualClock>,
  config:    PipelineConfig,
}

async fn harness() -> Harness {
  let store = Arc::new(SqliteStore::open_in_memory().await.expect("in-memory store"));
  Harness {
    crawler: Arc::new(FakeCrawler::new(Arc::clone(&store))),
    store,
    messenger: Arc::new(FakeMessenger::default()),
    clock: Arc::new(ManualClock(Mutex::new(Utc::now()))),
    config: PipelineConfig {
      profile_delay_secs: 0,
      idle_secs: 0,
      crawl_timeout_secs: 1,
      ..PipelineConfig::default()
    },
  }
}

impl Harness {
  fn clock(&self) -> Arc<dyn Clock> { self.clock.clone() }

  fn updater(&self) -> ReviewUpdater<SqliteStore, FakeCrawler> {
    ReviewUpdater::new(
      Arc::clone(&self.store),
      Arc::clone(&self.crawler),
      self.config.freshness(),
      self.config.crawl_timeout(),
      self.clock(),
    )
  }

  fn scanner(&self) -> Scanner<SqliteStore, FakeCrawler> {
    Scanner::new(
      Arc::clone(&self.store),
      self.updater(),
      self.config.profile_delay(),
      self.clock(),
    )
  }

  fn dispatcher(&self) -> Dispatcher<SqliteStore, FakeMessenger> {
    Dispatcher::new(
      Arc::clone(&self.store),
      Arc::clone(&self.messenger),
      Formatter::new(self.config.star_glyph.clone(), self.config.recheck_window_secs),
    )
  }

  fn pipeline(
    &self,
  ) -> (
    crate::Orchestrator<SqliteStore, FakeCrawler, FakeMessenger>,
    crate::ReviewService<SqliteStore, FakeCrawler>,
  ) {
    self.pipeline_on(NotificationQueue::new())
  }

  fn pipeline_on(
    &self,
    queue: NotificationQueue,
  ) -> (
    crate::Orchestrator<SqliteStore, FakeCrawler, FakeMessenger>,
    crate::ReviewService<SqliteStore, FakeCrawler>,
  ) {
    crate::build_with_queue(
      Arc::clone(&self.store),
      Arc::clone(&self.crawler),
      Arc::clone(&self.messenger),
      &self.config,
      self.clock(),
      queue,
    )
  }

  /// Add a profile without going through the crawler.
  async fn profile(&self, id: &str, name: &str) -> Profile {
    let snapshot = ProfileSnapshot {
      profile_id:   id.into(),
      display_name: name.into(),
    };
    self.store.add_profile(snapshot, self.clock.now()).await.unwrap()
  }

  async fn follow(&self, group: &str, channel: &str, id: &str, original: bool) -> Subscription {
    let input = NewSubscription {
      group_id:                  group.into(),
      channel_id:                channel.into(),
      profile_id:                id.into(),
      deliver_original_language: original,
    };
    self
      .store
      .subscribe(input, self.clock.now())
      .await
      .unwrap()
      .into_subscription()
  }

  /// A profile followed by `g1`/`c1`.
  async fn tracked(&self, id: &str, name: &str) -> Profile {
    let profile = self.profile(id, name).await;
    self.follow("g1", "c1", id, false).await;
    profile
  }
}

fn snap(place: &str, stars: u8, body: &str) -> ReviewSnapshot {
  ReviewSnapshot {
    place_id:               place.into(),
    place_name:             format!("Place {place}"),
    star_rating:            stars,
    body:                   body.into(),
    body_original_language: None,
  }
}

// ─── Update transaction ──────────────────────────────────────────────────────

#[tokio::test]
async fn first_update_installs_and_fresh_review_skips_crawl() {
  let h = harness().await;
  let profile = h.tracked("p1", "Alice").await;
  h.crawler.script("p1", Script::Review(snap("X", 4, "Great")));
  let updater = h.updater();

  let installed = updater.update_latest(&profile).await.unwrap().unwrap();
  assert_eq!(installed.place_id, "X");
  assert_eq!(installed.crawled_at, h.clock.now());
  assert_eq!(h.store.current_review("p1").await.unwrap(), Some(installed));

  h.clock.advance(TimeDelta::hours(1));
  h.crawler.script("p1", Script::Review(snap("Y", 1, "Meh")));
  assert!(updater.update_latest(&profile).await.unwrap().is_none());
  assert_eq!(h.crawler.review_calls().len(), 1);
  assert_eq!(h.store.current_review("p1").await.unwrap().unwrap().place_id, "X");
}

#[tokio::test]
async fn stale_review_is_replaced_and_only_one_row_remains() {
  let h = harness().await;
  let profile = h.tracked("p1", "Alice").await;
  let updater = h.updater();

  let mut last = None;
  for (i, place) in ["A", "B", "C"].into_iter().enumerate() {
    h.crawler.script("p1", Script::Review(snap(place, i as u8 + 1, "text")));
    last = updater.update_latest(&profile).await.unwrap();
    assert!(last.is_some());
    h.clock.advance(TimeDelta::hours(3));
  }

  assert_eq!(h.store.count_reviews("p1").await.unwrap(), 1);
  let stored = h.store.get_profile("p1").await.unwrap().unwrap();
  assert_eq!(stored.latest_review_id, last.map(|r| r.review_id));
}

#[tokio::test]
async fn unchanged_review_only_moves_capture_time() {
  let h = harness().await;
  let profile = h.tracked("p1", "Alice").await;
  h.crawler.script("p1", Script::Review(snap("X", 4, "Great")));
  let updater = h.updater();

  let first = updater.update_latest(&profile).await.unwrap().unwrap();
  h.clock.advance(TimeDelta::hours(4));
  assert!(updater.update_latest(&profile).await.unwrap().is_none());

  let current = h.store.current_review("p1").await.unwrap().unwrap();
  assert_eq!(current.review_id, first.review_id);
  assert_eq!(current.crawled_at, h.clock.now());
}

#[tokio::test]
async fn crawl_failure_leaves_storage_untouched() {
  let h = harness().await;
  let profile = h.tracked("p1", "Alice").await;
  h.crawler.script("p1", Script::Review(snap("X", 4, "Great")));
  let updater = h.updater();
  let first = updater.update_latest(&profile).await.unwrap().unwrap();

  h.clock.advance(TimeDelta::hours(4));
  h.crawler.script("p1", Script::Fail);
  let err = updater.update_latest(&profile).await.unwrap_err();
  assert!(matches!(err, Error::Crawl(CrawlFailure::Network(_))));

  assert_eq!(h.store.count_reviews("p1").await.unwrap(), 1);
  assert_eq!(h.store.current_review("p1").await.unwrap(), Some(first));
}

#[tokio::test]
async fn hung_crawl_times_out_without_writing() {
  let h = harness().await;
  let profile = h.tracked("p1", "Alice").await;
  h.crawler.script("p1", Script::Hang);

  let err = h.updater().update_latest(&profile).await.unwrap_err();
  assert!(matches!(err, Error::Crawl(CrawlFailure::Timeout(_))));
  assert!(h.store.current_review("p1").await.unwrap().is_none());
}

#[tokio::test]
async fn invalid_scraped_review_is_a_crawl_failure() {
  let h = harness().await;
  let profile = h.tracked("p1", "Alice").await;
  h.crawler.script("p1", Script::Review(snap("X", 9, "Too many stars")));

  let err = h.updater().update_latest(&profile).await.unwrap_err();
  assert!(matches!(err, Error::Crawl(CrawlFailure::Parse(_))));
  assert_eq!(h.store.count_reviews("p1").await.unwrap(), 0);
}

#[tokio::test]
async fn concurrent_writer_wins_and_update_is_discarded() {
  let h = harness().await;
  let profile = h.tracked("p1", "Alice").await;
  let winner = snap("R", 5, "First in").into_review("p1", h.clock.now());
  h.crawler.script("p1", Script::Race(winner.clone(), snap("Q", 2, "Too late")));

  assert!(h.updater().update_latest(&profile).await.unwrap().is_none());
  assert_eq!(h.store.count_reviews("p1").await.unwrap(), 1);
  assert_eq!(h.store.current_review("p1").await.unwrap(), Some(winner));
}

#[tokio::test]
async fn profile_without_reviews_yields_nothing() {
  let h = harness().await;
  let profile = h.tracked("p1", "Alice").await;
  assert!(h.updater().update_latest(&profile).await.unwrap().is_none());
  assert!(h.store.current_review("p1").await.unwrap().is_none());
}

// ─── Sweep ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn sweep_skips_unfollowed_and_recently_crawled_profiles() {
  let h = harness().await;
  let recent = h.tracked("p1", "Recent").await;
  h.tracked("p2", "Never").await;
  h.profile("p3", "Lonely").await;

  h.crawler.script("p1", Script::Review(snap("X", 3, "ok")));
  h.updater().update_latest(&recent).await.unwrap();

  // Past the recheck window but inside the sweep window.
  h.clock.advance(TimeDelta::hours(4));
  let (tx, mut rx) = notification_queue();
  let report = h.scanner().run_sweep(&tx).await.unwrap();

  assert_eq!(report.considered, 2);
  assert_eq!(report.skipped, 1);
  assert_eq!(report.visited, 1);
  assert_eq!(h.crawler.review_calls(), ["p1", "p2"]);
  assert!(rx.drain_pending().is_empty());
}

#[tokio::test]
async fn sweep_continues_past_a_failing_profile() {
  let h = harness().await;
  h.tracked("p1", "Broken").await;
  h.tracked("p2", "Working").await;
  h.crawler.script("p1", Script::Fail);
  h.crawler.script("p2", Script::Review(snap("X", 5, "Lovely")));

  let (tx, mut rx) = notification_queue();
  let report = h.scanner().run_sweep(&tx).await.unwrap();

  assert_eq!(report.visited, 2);
  assert_eq!(report.failures, 1);
  assert_eq!(report.installed.len(), 1);

  let events = rx.drain_pending();
  assert_eq!(events.len(), 1);
  assert_eq!(events[0].review.profile_id, "p2");
  assert_eq!(events[0].profile_display_name, "Working");
  assert_eq!(report.installed, [events[0].review.review_id]);
}

#[tokio::test]
async fn unfollowed_profile_drops_out_of_the_sweep() {
  let h = harness().await;
  let (_, service) = h.pipeline();
  h.tracked("p1", "Alice").await;

  assert!(service.unsubscribe("g1", "p1").await.unwrap());
  assert!(!service.unsubscribe("g1", "p1").await.unwrap());

  let (tx, _rx) = notification_queue();
  let report = h.scanner().run_sweep(&tx).await.unwrap();
  assert_eq!(report.considered, 0);
  assert!(h.crawler.review_calls().is_empty());
}

// ─── Dispatch ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn dispatch_renders_per_subscription_language() {
  let h = harness().await;
  let profile = h.profile("p1", "Alice").await;
  h.follow("g1", "c1", "p1", false).await;
  h.follow("g2", "c2", "p1", true).await;

  let mut s = snap("X", 4, "Great");
  s.body_original_language = Some("Genial".into());
  let event = NotificationEvent::new_review(&profile, s.into_review("p1", h.clock.now()));

  let report = h.dispatcher().dispatch(&event).await.unwrap();
  assert_eq!(report.delivered, 2);

  let sent = h.messenger.sent();
  let body_for = |channel: &str| {
    sent
      .iter()
      .find(|(d, _)| d.channel_id == channel)
      .map(|(_, n)| n.body.clone())
  };
  assert_eq!(body_for("c1").as_deref(), Some("Great"));
  assert_eq!(body_for("c2").as_deref(), Some("Genial"));
  assert!(sent.iter().all(|(_, n)| n.stars == "⭐⭐⭐⭐"));
}

#[tokio::test]
async fn vanished_destinations_prune_subscriptions() {
  let h = harness().await;
  let profile = h.profile("p1", "Alice").await;
  let gone_channel = h.follow("g1", "c1", "p1", false).await;
  let gone_group = h.follow("g2", "c2", "p1", false).await;
  let alive = h.follow("g3", "c3", "p1", false).await;
  h.messenger.missing_channels.lock().unwrap().insert("c1".into());
  h.messenger.missing_groups.lock().unwrap().insert("g2".into());

  let event = NotificationEvent::new_review(&profile, snap("X", 1, "x").into_review("p1", h.clock.now()));
  let report = h.dispatcher().dispatch(&event).await.unwrap();

  assert_eq!(report.pruned, 2);
  assert_eq!(report.delivered, 1);
  for sub in [&gone_channel, &gone_group] {
    assert!(h.store.get_subscription(sub.subscription_id).await.unwrap().is_none());
  }
  assert!(h.store.get_subscription(alive.subscription_id).await.unwrap().is_some());
  assert_eq!(h.messenger.sent().len(), 1);
}

#[tokio::test]
async fn transient_delivery_errors_keep_subscriptions() {
  let h = harness().await;
  let profile = h.profile("p1", "Alice").await;
  let sub = h.follow("g1", "c1", "p1", false).await;
  let event = NotificationEvent::new_review(&profile, snap("X", 1, "x").into_review("p1", h.clock.now()));

  h.messenger.failing_send.store(true, Ordering::SeqCst);
  let report = h.dispatcher().dispatch(&event).await.unwrap();
  assert_eq!((report.delivered, report.failed, report.pruned), (0, 1, 0));

  h.messenger.failing_send.store(false, Ordering::SeqCst);
  h.messenger.unreachable.store(true, Ordering::SeqCst);
  let report = h.dispatcher().dispatch(&event).await.unwrap();
  assert_eq!((report.delivered, report.failed, report.pruned), (0, 1, 0));

  assert!(h.store.get_subscription(sub.subscription_id).await.unwrap().is_some());
}

#[tokio::test]
async fn drain_sends_a_review_once_per_subscription() {
  let h = harness().await;
  let profile = h.profile("p1", "Alice").await;
  let sub = h.follow("g1", "c1", "p1", false).await;
  let review = snap("X", 4, "Great").into_review("p1", h.clock.now());
  let newer = snap("Y", 2, "Later").into_review("p1", h.clock.now());

  let (tx, mut rx) = notification_queue();
  tx.enqueue(NotificationEvent::new_review(&profile, review.clone()));
  tx.enqueue(NotificationEvent::welcome(&profile, review, sub.subscription_id));
  tx.enqueue(NotificationEvent::welcome(&profile, newer, sub.subscription_id));

  let report = h.dispatcher().drain(&mut rx).await;
  assert_eq!(report.events, 3);
  assert_eq!((report.delivered, report.repeats), (2, 1));

  let titles: Vec<_> = h.messenger.sent().into_iter().map(|(_, n)| n.title).collect();
  assert_eq!(titles, ["Place X", "Place Y"]);
}

// ─── Orchestrator + service ──────────────────────────────────────────────────

#[tokio::test]
async fn sweep_then_dispatch_delivers_each_new_review_once() {
  let h = harness().await;
  h.crawler.knows("p1", "Alice");
  let (mut orchestrator, service) = h.pipeline();

  let outcome = service.subscribe("g1", "c1", "p1", false).await.unwrap();
  assert!(outcome.is_created());
  h.crawler.script("p1", Script::Review(snap("X", 4, "Great")));

  assert_eq!(orchestrator.phase(), Phase::Scanning);
  assert_eq!(orchestrator.step().await, Phase::Dispatching);

  let latest = service.get_latest_review("p1").await.unwrap().unwrap();
  assert_eq!(latest.place_id, "X");

  assert_eq!(orchestrator.step().await, Phase::Idle);
  let sent = h.messenger.sent();
  assert_eq!(sent.len(), 1);
  let (dest, n) = &sent[0];
  assert_eq!(dest.channel_id, "c1");
  assert_eq!(n.title, "Place X");
  assert_eq!(n.author, "Alice");
  assert_eq!(n.stars, "⭐⭐⭐⭐");
  assert_eq!(n.body, "Great");
  assert_eq!(n.timestamp, latest.crawled_at);

  assert_eq!(orchestrator.step().await, Phase::Scanning);
  assert_eq!(orchestrator.cycles(), 1);
  assert_eq!(h.crawler.review_calls().len(), 1);
}

#[tokio::test]
async fn follow_during_sweep_window_gets_the_new_review_once() {
  let h = harness().await;
  h.crawler.knows("p1", "Alice");
  let (mut orchestrator, service) = h.pipeline();
  service.subscribe("g1", "c1", "p1", false).await.unwrap();
  h.crawler.script("p1", Script::Review(snap("X", 4, "Great")));

  // The sweep queues X for all followers; g2 follows before it is dispatched
  // and is queued a welcome for the same review.
  assert_eq!(orchestrator.step().await, Phase::Dispatching);
  assert!(service.subscribe("g2", "c2", "p1", false).await.unwrap().is_created());
  assert_eq!(orchestrator.step().await, Phase::Idle);

  let sent = h.messenger.sent();
  let sent_to = |channel: &str| sent.iter().filter(|(d, _)| d.channel_id == channel).count();
  assert_eq!(sent_to("c1"), 1);
  assert_eq!(sent_to("c2"), 1);
}

#[tokio::test]
async fn restarted_loop_delivers_events_queued_before_the_crash() {
  let h = harness().await;
  h.crawler.knows("p1", "Alice");
  let queue = NotificationQueue::new();
  let (_, service) = h.pipeline_on(queue.clone());
  service.subscribe("g1", "c1", "p1", false).await.unwrap();

  // An on-demand refresh installs X and queues it for g1.
  h.crawler.script("p1", Script::Review(snap("X", 4, "Great")));
  assert!(service.get_latest_review("p1").await.unwrap().is_some());

  let starts = AtomicUsize::new(0);
  supervise(
    || {
      let n = starts.fetch_add(1, Ordering::SeqCst);
      let (mut orchestrator, _) = h.pipeline_on(queue.clone());
      tokio::spawn(async move {
        if n == 0 {
          panic!("loop crashed before dispatching");
        }
        orchestrator.step().await;
        orchestrator.step().await;
      })
    },
    Duration::ZERO,
  )
  .await;

  assert_eq!(starts.load(Ordering::SeqCst), 2);
  let sent = h.messenger.sent();
  assert_eq!(sent.len(), 1);
  assert_eq!(sent[0].1.title, "Place X");
}

#[tokio::test]
async fn resubscribe_updates_in_place_and_welcomes_once() {
  let h = harness().await;
  let profile = h.profile("p1", "Alice").await;
  h.crawler.script("p1", Script::Review(snap("X", 5, "Great")));
  h.updater().update_latest(&profile).await.unwrap();

  let (mut orchestrator, service) = h.pipeline();
  let first = service.subscribe("g1", "c1", "p1", false).await.unwrap();
  h.clock.advance(TimeDelta::minutes(5));
  let second = service.subscribe("g1", "c2", "p1", true).await.unwrap();

  let SubscribeOutcome::Updated(updated) = second else {
    panic!("expected an update");
  };
  assert_eq!(updated.subscription_id, first.subscription().subscription_id);
  assert_eq!(updated.created_at, h.clock.now() - TimeDelta::minutes(5));
  assert_eq!(h.store.subscriptions_for_profile("p1").await.unwrap().len(), 1);

  orchestrator.step().await;
  orchestrator.step().await;

  let sent = h.messenger.sent();
  assert_eq!(sent.len(), 1);
  assert_eq!(sent[0].0.channel_id, "c2");

  let followed = service.followed_profiles("g1").await.unwrap();
  assert_eq!(followed.len(), 1);
  assert_eq!(followed[0].display_name, "Alice");
}

#[tokio::test]
async fn tracking_fetches_a_profile_once() {
  let h = harness().await;
  h.crawler.knows("p1", "  ");
  let (_, service) = h.pipeline();

  let first = service.ensure_profile_tracked(" p1 ").await.unwrap();
  let second = service.ensure_profile_tracked("p1").await.unwrap();
  assert_eq!(first, second);
  assert_eq!(first.display_name, "p1");
  assert_eq!(first.created_at, h.clock.now());
  assert_eq!(h.crawler.profile_calls.load(Ordering::SeqCst), 1);

  let err = service.ensure_profile_tracked("").await.unwrap_err();
  assert!(matches!(err, Error::Invalid(revwatch_core::Error::EmptyProfileId)));
}

#[tokio::test]
async fn unknown_profile_cannot_be_followed() {
  let h = harness().await;
  let (_, service) = h.pipeline();

  let err = service.subscribe("g1", "c1", "ghost", false).await.unwrap_err();
  assert!(matches!(err, Error::Crawl(CrawlFailure::ProfileNotFound(_))));
  assert!(h.store.get_profile("ghost").await.unwrap().is_none());

  let err = service.subscribe(" ", "c1", "ghost", false).await.unwrap_err();
  assert!(matches!(err, Error::Invalid(revwatch_core::Error::EmptyField("group_id"))));
}

#[tokio::test]
async fn latest_review_survives_a_failed_refresh() {
  let h = harness().await;
  h.crawler.knows("p1", "Alice");
  let (mut orchestrator, service) = h.pipeline();
  service.subscribe("g1", "c1", "p1", false).await.unwrap();

  assert!(service.get_latest_review("p1").await.unwrap().is_none());

  h.crawler.script("p1", Script::Review(snap("X", 3, "Fine")));
  h.clock.advance(TimeDelta::hours(3));
  let stored = service.get_latest_review("p1").await.unwrap().unwrap();

  h.clock.advance(TimeDelta::hours(3));
  h.crawler.script("p1", Script::Fail);
  assert_eq!(service.get_latest_review("p1").await.unwrap(), Some(stored));

  // The opportunistic install above was queued for followers.
  orchestrator.step().await;
  orchestrator.step().await;
  assert_eq!(h.messenger.sent().len(), 1);
}

#[tokio::test]
async fn run_returns_on_shutdown() {
  let h = harness().await;
  let (orchestrator, _) = h.pipeline();
  let finished =
    tokio::time::timeout(Duration::from_secs(5), orchestrator.run(std::future::ready(()))).await;
  assert!(finished.is_ok());
}

#[tokio::test]
async fn supervise_restarts_a_panicked_loop() {
  let starts = Arc::new(AtomicUsize::new(0));
  let counter = Arc::clone(&starts);

  supervise(
    move || {
      let n = counter.fetch_add(1, Ordering::SeqCst);
      tokio::spawn(async move {
        if n == 0 {
          panic!("first run blows up");
        }
      })
    },
    Duration::ZERO,
  )
  .await;

  assert_eq!(starts.load(Ordering::SeqCst), 2);
}
