use crate::model::{Id, post::PostMarker, user::UserMarker};
use serde::{
    Deserialize, Deserializer, Serialize,
    de::{Error, Unexpected},
};
use thiserror::Error;
use time::UtcDateTime;

pub const COMMENT_CONTENT_MIN_LEN: usize = 1;
pub const COMMENT_CONTENT_MAX_LEN: usize = 2000;

/// Replies are flat: a top-level comment sits at depth 0, a reply at depth 1,
/// and nothing nests below that.
pub const MAX_COMMENT_DEPTH: u8 = 1;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct CommentMarker;

#[derive(Clone, Eq, PartialEq, Debug, Serialize)]
pub struct Comment {
    pub id: Id<CommentMarker>,
    pub post: Id<PostMarker>,
    pub author: Id<UserMarker>,
    pub content: CommentContent,
    pub parent: Option<Id<CommentMarker>>,
    pub depth: Depth,
    pub is_visible: bool,
    pub deleted_by_admin: bool,
    pub created_at: UtcDateTime,
}

#[derive(
    Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "u8", into = "u8")]
pub struct Depth(u8);

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("Comment depth exceeds the maximum of {MAX_COMMENT_DEPTH}: {0}")]
pub struct InvalidDepthError(pub u8);

impl Depth {
    pub const TOP_LEVEL: Depth = Depth(0);

    pub fn new(depth: u8) -> Result<Self, InvalidDepthError> {
        if depth <= MAX_COMMENT_DEPTH {
            Ok(Depth(depth))
        } else {
            Err(InvalidDepthError(depth))
        }
    }

    #[must_use]
    pub fn get(self) -> u8 {
        self.0
    }

    /// The depth a reply to a comment at this depth would get, or `None` when
    /// the nesting cap is reached.
    #[must_use]
    pub fn reply(self) -> Option<Depth> {
        (self.0 < MAX_COMMENT_DEPTH).then_some(Depth(self.0 + 1))
    }
}

impl TryFrom<u8> for Depth {
    type Error = InvalidDepthError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Depth> for u8 {
    fn from(value: Depth) -> Self {
        value.get()
    }
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Serialize)]
#[serde(transparent)]
pub struct CommentContent(String);

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("Comment content must be {COMMENT_CONTENT_MIN_LEN}-{COMMENT_CONTENT_MAX_LEN} characters")]
pub struct InvalidCommentContentError;

impl CommentContent {
    pub fn new(content: impl Into<String>) -> Result<Self, InvalidCommentContentError> {
        let content = content.into();
        let trimmed = content.trim();
        let len = trimmed.chars().count();

        if (COMMENT_CONTENT_MIN_LEN..=COMMENT_CONTENT_MAX_LEN).contains(&len) {
            Ok(CommentContent(trimmed.to_owned()))
        } else {
            Err(InvalidCommentContentError)
        }
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for CommentContent {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = String::deserialize(deserializer)?;
        CommentContent::new(inner.as_str())
            .map_err(|_| Error::invalid_value(Unexpected::Str(&inner), &"CommentContent"))
    }
}

#[cfg(test)]
mod tests {
    use super::{CommentContent, Depth};

    #[test]
    fn content_bounds() {
        assert!(CommentContent::new("").is_err());
        assert!(CommentContent::new("   ").is_err());
        assert!(CommentContent::new("k").is_ok());
        assert!(CommentContent::new("x".repeat(2000)).is_ok());
        assert!(CommentContent::new("x".repeat(2001)).is_err());
    }

    #[test]
    fn depth_is_capped() {
        assert_eq!(Depth::TOP_LEVEL.reply(), Some(Depth::new(1).unwrap()));
        assert_eq!(Depth::new(1).unwrap().reply(), None);
        assert!(Depth::new(2).is_err());
    }
}
