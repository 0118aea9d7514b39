pub mod auth;
pub mod comment;
pub mod post;
pub mod reaction;
pub mod user;

use crate::{
    model::{
        auth::InvalidAuthTokenHashError,
        comment::{InvalidCommentContentError, InvalidDepthError},
        post::{InvalidMoodError, InvalidPostContentError, InvalidPostTitleError},
        reaction::InvalidEmojiError,
        user::{InvalidAnonymousNameError, InvalidRoleError},
    },
    snowflake::{Epoch, Snowflake, SnowflakeGenerator},
    util::NonPositiveDurationError,
};
use serde::{Deserialize, Serialize};
use std::{fmt::Display, marker::PhantomData};
use thiserror::Error;
use time::{UtcDateTime, macros::utc_datetime};

#[derive(Clone, Eq, PartialEq, Debug, Hash, Error)]
pub enum ModelValidationError {
    #[error(transparent)]
    AnonymousName(#[from] InvalidAnonymousNameError),
    #[error(transparent)]
    Role(#[from] InvalidRoleError),
    #[error(transparent)]
    PostContent(#[from] InvalidPostContentError),
    #[error(transparent)]
    PostTitle(#[from] InvalidPostTitleError),
    #[error(transparent)]
    Mood(#[from] InvalidMoodError),
    #[error(transparent)]
    Emoji(#[from] InvalidEmojiError),
    #[error(transparent)]
    CommentContent(#[from] InvalidCommentContentError),
    #[error(transparent)]
    Depth(#[from] InvalidDepthError),
    #[error(transparent)]
    NonPositiveDuration(#[from] NonPositiveDurationError),
    #[error(transparent)]
    TokenHash(#[from] InvalidAuthTokenHashError),
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct VentwallEpoch;
impl Epoch for VentwallEpoch {
    const EPOCH_TIME: UtcDateTime = utc_datetime!(2025-01-01 00:00);
}

pub type VentwallSnowflake = Snowflake<VentwallEpoch>;
pub type VentwallSnowflakeGenerator = SnowflakeGenerator<VentwallEpoch>;

#[derive(
    Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Id<Marker>(VentwallSnowflake, #[serde(skip)] PhantomData<Marker>);

impl<Marker> Id<Marker> {
    #[must_use]
    pub fn new(snowflake: VentwallSnowflake) -> Self {
        Self(snowflake, PhantomData)
    }

    #[must_use]
    pub fn snowflake(self) -> VentwallSnowflake {
        self.0
    }
}

impl<Marker> Display for Id<Marker> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl<Marker> From<VentwallSnowflake> for Id<Marker> {
    fn from(value: VentwallSnowflake) -> Self {
        Self::new(value)
    }
}

impl<Marker> From<Id<Marker>> for VentwallSnowflake {
    fn from(value: Id<Marker>) -> Self {
        value.0
    }
}

impl<Marker> From<u64> for Id<Marker> {
    fn from(value: u64) -> Self {
        Id::new(VentwallSnowflake::new(value))
    }
}

impl<Marker> From<Id<Marker>> for u64 {
    fn from(value: Id<Marker>) -> Self {
        value.snowflake().get()
    }
}
