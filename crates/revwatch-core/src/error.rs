//! Error types for `revwatch-core`.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
  #[error("profile id must not be empty")]
  EmptyProfileId,

  #[error("profile id is {0} characters long, the limit is {max}", max = crate::profile::MAX_PROFILE_ID_LEN)]
  ProfileIdTooLong(usize),

  #[error("profile id {0:?} contains path or control characters")]
  ProfileIdMalformed(String),

  #[error("star rating {0} is outside 0..=5")]
  StarRatingOutOfRange(u8),

  #[error("{0} must not be empty")]
  EmptyField(&'static str),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
