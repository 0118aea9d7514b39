use crate::model::{Id, reaction::ReactionCounts, user::UserMarker};
use serde::{
    Deserialize, Deserializer, Serialize,
    de::{Error, Unexpected},
};
use thiserror::Error;
use time::UtcDateTime;

pub const POST_CONTENT_MIN_LEN: usize = 10;
pub const POST_CONTENT_MAX_LEN: usize = 5000;
pub const POST_TITLE_MAX_LEN: usize = 200;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct PostMarker;

#[derive(Clone, Eq, PartialEq, Debug, Serialize)]
pub struct Post {
    pub id: Id<PostMarker>,
    pub author: Id<UserMarker>,
    pub title: Option<PostTitle>,
    pub content: PostContent,
    pub mood: Mood,
    pub reaction_counts: ReactionCounts,
    pub comment_count: i32,
    pub auto_delete: AutoDelete,
    pub is_visible: bool,
    pub deleted_by_admin: bool,
    pub created_at: UtcDateTime,
    pub updated_at: UtcDateTime,
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Happy,
    Sad,
    Angry,
    Anxious,
    Confused,
    Neutral,
    Hopeful,
    Grateful,
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("Unknown mood: {0}")]
pub struct InvalidMoodError(String);

impl Mood {
    pub const ALL: [Mood; 8] = [
        Mood::Happy,
        Mood::Sad,
        Mood::Angry,
        Mood::Anxious,
        Mood::Confused,
        Mood::Neutral,
        Mood::Hopeful,
        Mood::Grateful,
    ];

    #[must_use]
    pub fn tag(self) -> &'static str {
        match self {
            Mood::Happy => "happy",
            Mood::Sad => "sad",
            Mood::Angry => "angry",
            Mood::Anxious => "anxious",
            Mood::Confused => "confused",
            Mood::Neutral => "neutral",
            Mood::Hopeful => "hopeful",
            Mood::Grateful => "grateful",
        }
    }

    pub fn from_tag(tag: &str) -> Result<Self, InvalidMoodError> {
        Self::ALL
            .into_iter()
            .find(|mood| mood.tag() == tag)
            .ok_or_else(|| InvalidMoodError(tag.to_owned()))
    }
}

/// Auto-deletion configuration of a post. When enabled, `delete_at` is the
/// absolute deadline after which the post becomes eligible for the sweep.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default, Hash, Serialize, Deserialize)]
pub struct AutoDelete {
    pub enabled: bool,
    pub delete_at: Option<UtcDateTime>,
}

impl AutoDelete {
    #[must_use]
    pub fn off() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn due_by(self, now: UtcDateTime) -> bool {
        self.enabled && self.delete_at.is_some_and(|delete_at| delete_at <= now)
    }
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Serialize)]
#[serde(transparent)]
pub struct PostContent(String);

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("Post content must be {POST_CONTENT_MIN_LEN}-{POST_CONTENT_MAX_LEN} characters")]
pub struct InvalidPostContentError;

impl PostContent {
    pub fn new(content: impl Into<String>) -> Result<Self, InvalidPostContentError> {
        let content = content.into();
        let trimmed = content.trim();
        let len = trimmed.chars().count();

        if (POST_CONTENT_MIN_LEN..=POST_CONTENT_MAX_LEN).contains(&len) {
            Ok(PostContent(trimmed.to_owned()))
        } else {
            Err(InvalidPostContentError)
        }
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for PostContent {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = String::deserialize(deserializer)?;
        PostContent::new(inner.as_str())
            .map_err(|_| Error::invalid_value(Unexpected::Str(&inner), &"PostContent"))
    }
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize)]
#[serde(transparent)]
pub struct PostTitle(String);

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("Post title cannot exceed {POST_TITLE_MAX_LEN} characters")]
pub struct InvalidPostTitleError;

impl PostTitle {
    pub fn new(title: impl Into<String>) -> Result<Self, InvalidPostTitleError> {
        let title = title.into();
        let trimmed = title.trim();

        if trimmed.chars().count() <= POST_TITLE_MAX_LEN {
            Ok(PostTitle(trimmed.to_owned()))
        } else {
            Err(InvalidPostTitleError)
        }
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for PostTitle {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = String::deserialize(deserializer)?;
        PostTitle::new(inner.as_str())
            .map_err(|_| Error::invalid_value(Unexpected::Str(&inner), &"PostTitle"))
    }
}
