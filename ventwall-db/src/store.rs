use crate::error::Result;
use async_trait::async_trait;
use serde::Serialize;
use time::UtcDateTime;
use ventwall_common::model::{
    Id,
    auth::{AuthTokenHash, Authentication},
    comment::{Comment, CommentContent, CommentMarker, Depth},
    post::{AutoDelete, Mood, Post, PostContent, PostMarker, PostTitle},
    reaction::Emoji,
    user::{AnonymousName, User, UserMarker},
};

#[derive(Clone, Eq, PartialEq, Debug)]
pub struct NewUser {
    pub anonymous_name: AnonymousName,
    pub password_hash: String,
    pub tokens: i64,
}

#[derive(Clone, Eq, PartialEq, Debug)]
pub struct NewPost {
    pub author: Id<UserMarker>,
    pub title: Option<PostTitle>,
    pub content: PostContent,
    pub mood: Mood,
    pub auto_delete: AutoDelete,
}

#[derive(Clone, Eq, PartialEq, Debug)]
pub struct NewComment {
    pub post: Id<PostMarker>,
    pub author: Id<UserMarker>,
    pub content: CommentContent,
    pub parent: Option<Id<CommentMarker>>,
    pub depth: Depth,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Default)]
pub struct PostQuery {
    pub mood: Option<Mood>,
    /// 1-based page number. Page 0 is treated as page 1.
    pub page: u32,
    pub per_page: u32,
}

pub const DEFAULT_POSTS_PER_PAGE: u32 = 10;

impl PostQuery {
    #[must_use]
    pub fn first_page(mood: Option<Mood>) -> Self {
        Self {
            mood,
            page: 1,
            per_page: DEFAULT_POSTS_PER_PAGE,
        }
    }

    #[must_use]
    pub fn offset(self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.per_page)
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Default, Serialize)]
pub struct Stats {
    pub total_users: i64,
    pub total_posts: i64,
    pub total_comments: i64,
}

/// The document store behind the board.
///
/// All mutating counter operations (`adjust_*`) are single atomic add-deltas
/// on one stored document; concurrent callers never lose updates. Adjustments
/// and updates of a missing document fail with [`StoreError::NotFound`] and
/// apply nothing, deletes of a missing document succeed and report `false`.
///
/// [`StoreError::NotFound`]: crate::error::StoreError::NotFound
#[async_trait]
pub trait Store: Send + Sync {
    async fn insert_user(&self, new: NewUser) -> Result<User>;
    async fn fetch_user(&self, id: Id<UserMarker>) -> Result<Option<User>>;
    async fn fetch_user_by_name(&self, name: &AnonymousName) -> Result<Option<User>>;
    async fn list_users(&self) -> Result<Vec<User>>;
    async fn update_user_name(&self, id: Id<UserMarker>, name: &AnonymousName) -> Result<()>;
    async fn update_user_password(&self, id: Id<UserMarker>, password_hash: &str) -> Result<()>;
    async fn set_user_active(&self, id: Id<UserMarker>, active: bool) -> Result<()>;
    /// Atomically adds `delta` to the user's token balance and returns the
    /// new balance.
    async fn adjust_tokens(&self, id: Id<UserMarker>, delta: i64) -> Result<i64>;

    async fn insert_auth(&self, authentication: &Authentication) -> Result<()>;
    async fn fetch_auth(&self, token_hash: &AuthTokenHash) -> Result<Option<Authentication>>;

    async fn insert_post(&self, new: NewPost) -> Result<Post>;
    async fn fetch_post(&self, id: Id<PostMarker>) -> Result<Option<Post>>;
    /// Visible posts, newest first.
    async fn list_posts(&self, query: PostQuery) -> Result<Vec<Post>>;
    async fn list_posts_by_author(&self, author: Id<UserMarker>) -> Result<Vec<Post>>;
    /// Deletes the post and its reaction records.
    async fn delete_post(&self, id: Id<PostMarker>) -> Result<bool>;
    async fn adjust_comment_count(&self, post: Id<PostMarker>, delta: i32) -> Result<()>;
    async fn adjust_reaction_count(
        &self,
        post: Id<PostMarker>,
        emoji: Emoji,
        delta: i32,
    ) -> Result<()>;
    /// The sweeper's selection predicate: visible posts whose auto-delete
    /// deadline has passed.
    async fn expired_posts(&self, now: UtcDateTime) -> Result<Vec<Id<PostMarker>>>;

    async fn fetch_reaction(
        &self,
        post: Id<PostMarker>,
        user: Id<UserMarker>,
    ) -> Result<Option<Emoji>>;
    /// Inserts or replaces the (post, user) reaction record.
    async fn upsert_reaction(
        &self,
        post: Id<PostMarker>,
        user: Id<UserMarker>,
        emoji: Emoji,
    ) -> Result<()>;

    async fn insert_comment(&self, new: NewComment) -> Result<Comment>;
    async fn fetch_comment(&self, id: Id<CommentMarker>) -> Result<Option<Comment>>;
    /// Comments of a post, oldest first.
    async fn list_post_comments(&self, post: Id<PostMarker>) -> Result<Vec<Comment>>;
    async fn delete_comment(&self, id: Id<CommentMarker>) -> Result<bool>;
    async fn delete_post_comments(&self, post: Id<PostMarker>) -> Result<u64>;

    async fn stats(&self) -> Result<Stats>;
}
