//! Renders a queued review into a platform-neutral [`Notification`].

use revwatch_core::messaging::Notification;

use crate::queue::NotificationEvent;

#[derive(Debug, Clone)]
pub struct Formatter {
  star_glyph:    String,
  recheck_hours: u64,
}

impl Formatter {
  pub fn new(star_glyph: impl Into<String>, recheck_window_secs: u64) -> Self {
    Self {
      star_glyph:    star_glyph.into(),
      recheck_hours: recheck_window_secs.div_ceil(3600),
    }
  }

  /// Render `event` for one subscription. `original_language` picks the
  /// untranslated body when the review has one.
  pub fn render(&self, event: &NotificationEvent, original_language: bool) -> Notification {
    let review = &event.review;
    Notification {
      title:     review.place_name.clone(),
      author:    event.profile_display_name.clone(),
      stars:     self.star_glyph.repeat(usize::from(review.star_rating)),
      body:      review.body_for(original_language).to_owned(),
      footer:    format!(
        "Due to caching, this review may be up to {} hours old.",
        self.recheck_hours
      ),
      timestamp: review.crawled_at,
    }
  }
}
