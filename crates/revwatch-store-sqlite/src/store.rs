//! [`SqliteStore`]: the SQLite implementation of [`ReviewStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use revwatch_core::{
  profile::{Profile, ProfileSnapshot, TrackedProfile},
  review::Review,
  store::{InstallOutcome, ReviewStore},
  subscription::{NewSubscription, SubscribeOutcome, Subscription},
};

use crate::{
  encode::{
    decode_uuid, encode_dt, encode_uuid, RawProfile, RawReview, RawSubscription,
    PROFILE_COLUMNS, REVIEW_COLUMNS, SUBSCRIPTION_COLUMNS,
  },
  schema::SCHEMA,
  Error, Result,
};

// ─── Transaction outcomes ────────────────────────────────────────────────────

/// What happened inside the install transaction, before UUID decoding.
enum RawInstall {
  MissingProfile,
  Conflict(Option<String>),
  Installed(Option<String>),
}

/// What happened inside the subscribe transaction.
enum RawSubscribe {
  MissingProfile,
  Created(RawSubscription),
  Updated(RawSubscription),
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A revwatch store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
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

  /// Number of review rows stored for `profile_id`. The schema keeps this at
  /// zero or one; exposed for diagnostics and tests.
  pub async fn count_reviews(&self, profile_id: &str) -> Result<usize> {
    let profile_id = profile_id.to_owned();
    let count: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT COUNT(*) FROM reviews WHERE profile_id = ?1",
          rusqlite::params![profile_id],
          |r| r.get(0),
        )?)
      })
      .await?;
    Ok(count as usize)
  }
}

// ─── ReviewStore impl ────────────────────────────────────────────────────────

impl ReviewStore for SqliteStore {
  type Error = Error;

  // ── Profiles ──────────────────────────────────────────────────────────────

  async fn add_profile(
    &self,
    snapshot: ProfileSnapshot,
    created_at: DateTime<Utc>,
  ) -> Result<Profile> {
    let profile_id = snapshot.profile_id.clone();
    let at_str     = encode_dt(created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO profiles (profile_id, display_name, latest_review_id, created_at)
           VALUES (?1, ?2, NULL, ?3)
           ON CONFLICT (profile_id) DO NOTHING",
          rusqlite::params![snapshot.profile_id, snapshot.display_name, at_str],
        )?;
        Ok(())
      })
      .await?;

    let stored = self.get_profile(&profile_id).await?;
    stored.ok_or(Error::ProfileNotFound(profile_id))
  }

  async fn get_profile(&self, profile_id: &str) -> Result<Option<Profile>> {
    let profile_id = profile_id.to_owned();

    let raw: Option<RawProfile> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {PROFILE_COLUMNS} FROM profiles p WHERE p.profile_id = ?1"),
            rusqlite::params![profile_id],
            |row| RawProfile::from_row(row, 0),
          )
          .optional()?)
      })
      .await?;

    raw.map(RawProfile::into_profile).transpose()
  }

  async fn list_subscribed_profiles(&self) -> Result<Vec<TrackedProfile>> {
    let raws: Vec<(RawProfile, Option<RawReview>)> = self
      .conn
      .call(|conn| {
        // Never-crawled profiles first, then the stalest.
        let mut stmt = conn.prepare(&format!(
          "SELECT {PROFILE_COLUMNS}, {REVIEW_COLUMNS}
           FROM profiles p
           LEFT JOIN reviews r ON r.review_id = p.latest_review_id
           WHERE EXISTS (
             SELECT 1 FROM subscriptions s WHERE s.profile_id = p.profile_id
           )
           ORDER BY r.crawled_at IS NOT NULL, r.crawled_at, p.profile_id"
        ))?;

        let rows = stmt
          .query_map([], |row| {
            let profile   = RawProfile::from_row(row, 0)?;
            let review_id: Option<String> = row.get(4)?;
            let review = match review_id {
              Some(_) => Some(RawReview::from_row(row, 4)?),
              None    => None,
            };
            Ok((profile, review))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(|(profile, review)| {
        Ok(TrackedProfile {
          profile:       profile.into_profile()?,
          latest_review: review.map(RawReview::into_review).transpose()?,
        })
      })
      .collect()
  }

  // ── Reviews ───────────────────────────────────────────────────────────────

  async fn current_review(&self, profile_id: &str) -> Result<Option<Review>> {
    let profile_id = profile_id.to_owned();

    let raw: Option<RawReview> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!(
              "SELECT {REVIEW_COLUMNS}
               FROM profiles p
               JOIN reviews r ON r.review_id = p.latest_review_id
               WHERE p.profile_id = ?1"
            ),
            rusqlite::params![profile_id],
            |row| RawReview::from_row(row, 0),
          )
          .optional()?)
      })
      .await?;

    raw.map(RawReview::into_review).transpose()
  }

  async fn install_review(
    &self,
    review: Review,
    expected_current: Option<Uuid>,
  ) -> Result<InstallOutcome> {
    let profile_id     = review.profile_id.clone();
    let review_id_str  = encode_uuid(review.review_id);
    let expected_str   = expected_current.map(encode_uuid);
    let crawled_at_str = encode_dt(review.crawled_at);

    let raw = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let current: Option<Option<String>> = tx
          .query_row(
            "SELECT latest_review_id FROM profiles WHERE profile_id = ?1",
            rusqlite::params![review.profile_id],
            |r| r.get(0),
          )
          .optional()?;

        // Returning early drops `tx`, which rolls back.
        let Some(current) = current else {
          return Ok(RawInstall::MissingProfile);
        };
        if current != expected_str {
          return Ok(RawInstall::Conflict(current));
        }

        // Delete before insert: UNIQUE(profile_id) forbids two rows, and the
        // deferred pointer FK tolerates the gap until COMMIT.
        tx.execute(
          "DELETE FROM reviews WHERE profile_id = ?1",
          rusqlite::params![review.profile_id],
        )?;
        tx.execute(
          "INSERT INTO reviews (
             review_id, profile_id, place_id, place_name, star_rating,
             body, body_original, crawled_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
          rusqlite::params![
            review_id_str,
            review.profile_id,
            review.place_id,
            review.place_name,
            review.star_rating,
            review.body,
            review.body_original_language,
            crawled_at_str,
          ],
        )?;
        tx.execute(
          "UPDATE profiles SET latest_review_id = ?1 WHERE profile_id = ?2",
          rusqlite::params![review_id_str, review.profile_id],
        )?;
        tx.commit()?;

        Ok(RawInstall::Installed(current))
      })
      .await?;

    match raw {
      RawInstall::MissingProfile => Err(Error::ProfileNotFound(profile_id)),
      RawInstall::Conflict(current) => Ok(InstallOutcome::Conflict {
        current: current.as_deref().map(decode_uuid).transpose()?,
      }),
      RawInstall::Installed(previous) => {
        let replaced = previous.as_deref().map(decode_uuid).transpose()?;
        tracing::debug!(%profile_id, ?replaced, "installed review");
        Ok(InstallOutcome::Installed { replaced })
      }
    }
  }

  async fn touch_review(&self, review_id: Uuid, crawled_at: DateTime<Utc>) -> Result<bool> {
    let id_str = encode_uuid(review_id);
    let at_str = encode_dt(crawled_at);

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE reviews SET crawled_at = ?1 WHERE review_id = ?2",
          rusqlite::params![at_str, id_str],
        )?)
      })
      .await?;

    Ok(changed > 0)
  }

  // ── Subscriptions ─────────────────────────────────────────────────────────

  async fn subscribe(
    &self,
    input: NewSubscription,
    created_at: DateTime<Utc>,
  ) -> Result<SubscribeOutcome> {
    let profile_id = input.profile_id.clone();
    let new_id     = encode_uuid(Uuid::new_v4());
    let at_str     = encode_dt(created_at);

    let raw = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let tracked: bool = tx
          .query_row(
            "SELECT 1 FROM profiles WHERE profile_id = ?1",
            rusqlite::params![input.profile_id],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if !tracked {
          return Ok(RawSubscribe::MissingProfile);
        }

        let existing: Option<String> = tx
          .query_row(
            "SELECT subscription_id FROM subscriptions
             WHERE group_id = ?1 AND profile_id = ?2",
            rusqlite::params![input.group_id, input.profile_id],
            |r| r.get(0),
          )
          .optional()?;

        let (subscription_id, created) = match existing {
          Some(id) => {
            tx.execute(
              "UPDATE subscriptions SET channel_id = ?1, deliver_original = ?2
               WHERE subscription_id = ?3",
              rusqlite::params![input.channel_id, input.deliver_original_language, id],
            )?;
            (id, false)
          }
          None => {
            tx.execute(
              "INSERT INTO subscriptions (
                 subscription_id, group_id, channel_id, profile_id,
                 deliver_original, created_at
               ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
              rusqlite::params![
                new_id,
                input.group_id,
                input.channel_id,
                input.profile_id,
                input.deliver_original_language,
                at_str,
              ],
            )?;
            (new_id, true)
          }
        };

        let row = tx.query_row(
          &format!(
            "SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions s
             WHERE s.subscription_id = ?1"
          ),
          rusqlite::params![subscription_id],
          |row| RawSubscription::from_row(row, 0),
        )?;
        tx.commit()?;

        Ok(if created {
          RawSubscribe::Created(row)
        } else {
          RawSubscribe::Updated(row)
        })
      })
      .await?;

    match raw {
      RawSubscribe::MissingProfile => Err(Error::ProfileNotFound(profile_id)),
      RawSubscribe::Created(row) => Ok(SubscribeOutcome::Created(row.into_subscription()?)),
      RawSubscribe::Updated(row) => Ok(SubscribeOutcome::Updated(row.into_subscription()?)),
    }
  }

  async fn unsubscribe(&self, group_id: &str, profile_id: &str) -> Result<bool> {
    let group_id   = group_id.to_owned();
    let profile_id = profile_id.to_owned();

    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM subscriptions WHERE group_id = ?1 AND profile_id = ?2",
          rusqlite::params![group_id, profile_id],
        )?)
      })
      .await?;

    Ok(deleted > 0)
  }

  async fn get_subscription(&self, subscription_id: Uuid) -> Result<Option<Subscription>> {
    let id_str = encode_uuid(subscription_id);

    let raw: Option<RawSubscription> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!(
              "SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions s
               WHERE s.subscription_id = ?1"
            ),
            rusqlite::params![id_str],
            |row| RawSubscription::from_row(row, 0),
          )
          .optional()?)
      })
      .await?;

    raw.map(RawSubscription::into_subscription).transpose()
  }

  async fn subscriptions_for_profile(&self, profile_id: &str) -> Result<Vec<Subscription>> {
    let profile_id = profile_id.to_owned();

    let raws: Vec<RawSubscription> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions s
           WHERE s.profile_id = ?1
           ORDER BY s.created_at"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![profile_id], |row| {
            RawSubscription::from_row(row, 0)
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSubscription::into_subscription).collect()
  }

  async fn delete_subscription(&self, subscription_id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(subscription_id);

    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM subscriptions WHERE subscription_id = ?1",
          rusqlite::params![id_str],
        )?)
      })
      .await?;

    Ok(deleted > 0)
  }

  async fn followed_profiles(&self, group_id: &str) -> Result<Vec<Profile>> {
    let group_id = group_id.to_owned();

    let raws: Vec<RawProfile> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {PROFILE_COLUMNS}
           FROM profiles p
           JOIN subscriptions s ON s.profile_id = p.profile_id
           WHERE s.group_id = ?1
           ORDER BY p.display_name, p.profile_id"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![group_id], |row| RawProfile::from_row(row, 0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawProfile::into_profile).collect()
  }
}
