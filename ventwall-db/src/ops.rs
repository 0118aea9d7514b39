//! Multi-step store protocols.
//!
//! These operations compose several [`Store`] calls. Each one commits its
//! primary effect first and treats follow-up counter or balance adjustments
//! as best-effort: a failed adjustment is logged and the operation still
//! succeeds, so callers never observe a half-rolled-back primary record.

use crate::{
    error::StoreError,
    store::{NewComment, Store},
};
use thiserror::Error;
use time::UtcDateTime;
use tracing::{debug, info, warn};
use ventwall_common::model::{
    Id,
    comment::{Comment, CommentContent, CommentMarker, Depth},
    post::PostMarker,
    reaction::{Emoji, ReactionCounts},
    user::UserMarker,
};

/// Tokens granted for a top-level comment.
pub const COMMENT_REWARD_TOKENS: i64 = 2;
/// Tokens granted for a reply.
pub const REPLY_REWARD_TOKENS: i64 = 1;

#[derive(Debug, Error)]
pub enum OpError {
    #[error("Post {0} not found")]
    PostNotFound(Id<PostMarker>),
    #[error("Comment {0} not found")]
    CommentNotFound(Id<CommentMarker>),
    #[error("Replies to replies are not allowed")]
    ReplyDepthExceeded,
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type OpResult<T> = Result<T, OpError>;

/// Records or changes a user's reaction on a post and returns the post's
/// reaction counts afterwards.
///
/// Re-submitting the emoji already on record is a no-op. Switching emoji
/// moves one count from the old emoji to the new one via two atomic deltas,
/// so two users switching concurrently never lose each other's updates.
pub async fn react_to_post(
    store: &dyn Store,
    post: Id<PostMarker>,
    user: Id<UserMarker>,
    emoji: Emoji,
) -> OpResult<ReactionCounts> {
    let Some(current) = store.fetch_post(post).await? else {
        return Err(OpError::PostNotFound(post));
    };

    let previous = store.fetch_reaction(post, user).await?;
    if previous == Some(emoji) {
        return Ok(current.reaction_counts);
    }

    store.upsert_reaction(post, user, emoji).await?;

    if let Some(previous) = previous
        && let Err(error) = store.adjust_reaction_count(post, previous, -1).await
    {
        warn!(
            %post,
            emoji = previous.tag(),
            %error,
            "Failed to decrement replaced reaction count"
        );
    }
    if let Err(error) = store.adjust_reaction_count(post, emoji, 1).await {
        warn!(%post, emoji = emoji.tag(), %error, "Failed to increment reaction count");
    }

    match store.fetch_post(post).await? {
        Some(post) => Ok(post.reaction_counts),
        None => Err(OpError::PostNotFound(post)),
    }
}

/// A stored comment together with the reward granted for it.
///
/// `token_balance` is `None` when the grant could not be applied; the
/// comment itself still stands.
#[derive(Clone, Debug)]
pub struct CreatedComment {
    pub comment: Comment,
    pub tokens_earned: i64,
    pub token_balance: Option<i64>,
}

pub async fn create_comment(
    store: &dyn Store,
    post: Id<PostMarker>,
    author: Id<UserMarker>,
    content: CommentContent,
) -> OpResult<CreatedComment> {
    if store.fetch_post(post).await?.is_none() {
        return Err(OpError::PostNotFound(post));
    }

    let new = NewComment {
        post,
        author,
        content,
        parent: None,
        depth: Depth::TOP_LEVEL,
    };
    store_comment(store, new, COMMENT_REWARD_TOKENS).await
}

pub async fn create_reply(
    store: &dyn Store,
    parent: Id<CommentMarker>,
    author: Id<UserMarker>,
    content: CommentContent,
) -> OpResult<CreatedComment> {
    let Some(parent) = store.fetch_comment(parent).await? else {
        return Err(OpError::CommentNotFound(parent));
    };

    // Depth is checked before anything is written, so a rejected reply
    // leaves no trace.
    let Some(depth) = parent.depth.reply() else {
        return Err(OpError::ReplyDepthExceeded);
    };

    let new = NewComment {
        post: parent.post,
        author,
        content,
        parent: Some(parent.id),
        depth,
    };
    store_comment(store, new, REPLY_REWARD_TOKENS).await
}

/// Grants follow confirmed creation: the comment is stored first, and only
/// then are the post's counter and the author's balance touched.
async fn store_comment(
    store: &dyn Store,
    new: NewComment,
    reward: i64,
) -> OpResult<CreatedComment> {
    let author = new.author;
    let comment = store.insert_comment(new).await?;

    if let Err(error) = store.adjust_comment_count(comment.post, 1).await {
        warn!(post = %comment.post, %error, "Failed to increment comment count");
    }

    let token_balance = match store.adjust_tokens(author, reward).await {
        Ok(balance) => Some(balance),
        Err(error) => {
            warn!(user = %author, reward, %error, "Failed to grant comment reward");
            None
        }
    };

    Ok(CreatedComment {
        comment,
        tokens_earned: reward,
        token_balance,
    })
}

/// Deletes a post with its comments and reactions. Returns whether the post
/// still existed; deleting an already-deleted post is a no-op.
pub async fn delete_post(store: &dyn Store, post: Id<PostMarker>) -> Result<bool, StoreError> {
    let comments = store.delete_post_comments(post).await?;
    if comments > 0 {
        debug!(%post, comments, "Deleted comments of post");
    }

    store.delete_post(post).await
}

/// Deletes a comment and decrements its post's comment count. Returns
/// whether the comment still existed.
pub async fn delete_comment(
    store: &dyn Store,
    comment: Id<CommentMarker>,
) -> Result<bool, StoreError> {
    let Some(comment) = store.fetch_comment(comment).await? else {
        return Ok(false);
    };

    if !store.delete_comment(comment.id).await? {
        return Ok(false);
    }

    if let Err(error) = store.adjust_comment_count(comment.post, -1).await {
        warn!(post = %comment.post, %error, "Failed to decrement comment count");
    }

    Ok(true)
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Default)]
pub struct SweepSummary {
    pub deleted: u64,
    pub failed: u64,
}

/// One sweep pass over auto-delete deadlines.
///
/// A failure on one post never aborts the pass; the post stays selected and
/// the next pass picks it up again. Only enumerating the candidates can fail
/// as a whole.
pub async fn sweep_expired(
    store: &dyn Store,
    now: UtcDateTime,
) -> Result<SweepSummary, StoreError> {
    let mut summary = SweepSummary::default();

    for post in store.expired_posts(now).await? {
        match delete_post(store, post).await {
            Ok(true) => {
                summary.deleted += 1;
                info!(%post, "Swept expired post");
            }
            Ok(false) => {
                debug!(%post, "Expired post already gone");
            }
            Err(error) => {
                summary.failed += 1;
                warn!(%post, %error, "Failed to sweep expired post, will retry next sweep");
            }
        }
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::{COMMENT_REWARD_TOKENS, OpError, REPLY_REWARD_TOKENS};
    use crate::{
        error::{Result as StoreResult, StoreError},
        mem::MemStore,
        ops,
        store::{NewComment, NewPost, NewUser, PostQuery, Stats, Store},
    };
    use async_trait::async_trait;
    use std::sync::Arc;
    use time::{Duration, UtcDateTime};
    use ventwall_common::model::{
        Id,
        auth::{Authentication, AuthTokenHash},
        comment::{Comment, CommentContent, CommentMarker},
        post::{AutoDelete, Mood, Post, PostContent, PostMarker},
        reaction::Emoji,
        user::{AnonymousName, User, UserMarker},
    };

    async fn user(store: &dyn Store, name: &str) -> User {
        store
            .insert_user(NewUser {
                anonymous_name: AnonymousName::new(name).unwrap(),
                password_hash: "phc-string".to_owned(),
                tokens: 10,
            })
            .await
            .unwrap()
    }

    async fn post(store: &dyn Store, author: &User, auto_delete: AutoDelete) -> Post {
        store
            .insert_post(NewPost {
                author: author.id,
                title: None,
                content: PostContent::new("today was a lot, writing it down helps").unwrap(),
                mood: Mood::Anxious,
                auto_delete,
            })
            .await
            .unwrap()
    }

    fn content(text: &str) -> CommentContent {
        CommentContent::new(text).unwrap()
    }

    /// A [`MemStore`] whose selected operations fail, for exercising the
    /// logged-and-tolerated error paths.
    #[derive(Default)]
    struct FaultyStore {
        inner: MemStore,
        fail_adjust_tokens: bool,
        fail_adjust_comment_count: bool,
        fail_adjust_reaction_count: bool,
        fail_delete_post: Option<Id<PostMarker>>,
    }

    fn store_down() -> StoreError {
        StoreError::Sqlx(sqlx::Error::PoolClosed)
    }

    #[async_trait]
    impl Store for FaultyStore {
        async fn insert_user(&self, new: NewUser) -> StoreResult<User> {
            self.inner.insert_user(new).await
        }

        async fn fetch_user(&self, id: Id<UserMarker>) -> StoreResult<Option<User>> {
            self.inner.fetch_user(id).await
        }

        async fn fetch_user_by_name(&self, name: &AnonymousName) -> StoreResult<Option<User>> {
            self.inner.fetch_user_by_name(name).await
        }

        async fn list_users(&self) -> StoreResult<Vec<User>> {
            self.inner.list_users().await
        }

        async fn update_user_name(
            &self,
            id: Id<UserMarker>,
            name: &AnonymousName,
        ) -> StoreResult<()> {
            self.inner.update_user_name(id, name).await
        }

        async fn update_user_password(
            &self,
            id: Id<UserMarker>,
            password_hash: &str,
        ) -> StoreResult<()> {
            self.inner.update_user_password(id, password_hash).await
        }

        async fn set_user_active(&self, id: Id<UserMarker>, active: bool) -> StoreResult<()> {
            self.inner.set_user_active(id, active).await
        }

        async fn adjust_tokens(&self, id: Id<UserMarker>, delta: i64) -> StoreResult<i64> {
            if self.fail_adjust_tokens {
                return Err(store_down());
            }
            self.inner.adjust_tokens(id, delta).await
        }

        async fn insert_auth(&self, authentication: &Authentication) -> StoreResult<()> {
            self.inner.insert_auth(authentication).await
        }

        async fn fetch_auth(
            &self,
            token_hash: &AuthTokenHash,
        ) -> StoreResult<Option<Authentication>> {
            self.inner.fetch_auth(token_hash).await
        }

        async fn insert_post(&self, new: NewPost) -> StoreResult<Post> {
            self.inner.insert_post(new).await
        }

        async fn fetch_post(&self, id: Id<PostMarker>) -> StoreResult<Option<Post>> {
            self.inner.fetch_post(id).await
        }

        async fn list_posts(&self, query: PostQuery) -> StoreResult<Vec<Post>> {
            self.inner.list_posts(query).await
        }

        async fn list_posts_by_author(&self, author: Id<UserMarker>) -> StoreResult<Vec<Post>> {
            self.inner.list_posts_by_author(author).await
        }

        async fn delete_post(&self, id: Id<PostMarker>) -> StoreResult<bool> {
            if self.fail_delete_post == Some(id) {
                return Err(store_down());
            }
            self.inner.delete_post(id).await
        }

        async fn adjust_comment_count(&self, post: Id<PostMarker>, delta: i32) -> StoreResult<()> {
            if self.fail_adjust_comment_count {
                return Err(store_down());
            }
            self.inner.adjust_comment_count(post, delta).await
        }

        async fn adjust_reaction_count(
            &self,
            post: Id<PostMarker>,
            emoji: Emoji,
            delta: i32,
        ) -> StoreResult<()> {
            if self.fail_adjust_reaction_count {
                return Err(store_down());
            }
            self.inner.adjust_reaction_count(post, emoji, delta).await
        }

        async fn expired_posts(&self, now: UtcDateTime) -> StoreResult<Vec<Id<PostMarker>>> {
            self.inner.expired_posts(now).await
        }

        async fn fetch_reaction(
            &self,
            post: Id<PostMarker>,
            user: Id<UserMarker>,
        ) -> StoreResult<Option<Emoji>> {
            self.inner.fetch_reaction(post, user).await
        }

        async fn upsert_reaction(
            &self,
            post: Id<PostMarker>,
            user: Id<UserMarker>,
            emoji: Emoji,
        ) -> StoreResult<()> {
            self.inner.upsert_reaction(post, user, emoji).await
        }

        async fn insert_comment(&self, new: NewComment) -> StoreResult<Comment> {
            self.inner.insert_comment(new).await
        }

        async fn fetch_comment(&self, id: Id<CommentMarker>) -> StoreResult<Option<Comment>> {
            self.inner.fetch_comment(id).await
        }

        async fn list_post_comments(&self, post: Id<PostMarker>) -> StoreResult<Vec<Comment>> {
            self.inner.list_post_comments(post).await
        }

        async fn delete_comment(&self, id: Id<CommentMarker>) -> StoreResult<bool> {
            self.inner.delete_comment(id).await
        }

        async fn delete_post_comments(&self, post: Id<PostMarker>) -> StoreResult<u64> {
            self.inner.delete_post_comments(post).await
        }

        async fn stats(&self) -> StoreResult<Stats> {
            self.inner.stats().await
        }
    }

    #[tokio::test]
    async fn reaction_switch_moves_one_count() {
        let store = MemStore::new();
        let alice = user(&store, "alice").await;
        let bob = user(&store, "bob").await;
        let post = post(&store, &alice, AutoDelete::off()).await;

        let counts = ops::react_to_post(&store, post.id, alice.id, Emoji::Heart)
            .await
            .unwrap();
        assert_eq!(counts.get(Emoji::Heart), 1);

        // Same emoji again changes nothing.
        let counts = ops::react_to_post(&store, post.id, alice.id, Emoji::Heart)
            .await
            .unwrap();
        assert_eq!(counts.get(Emoji::Heart), 1);
        assert_eq!(counts.total(), 1);

        // Switching moves the count rather than adding one.
        let counts = ops::react_to_post(&store, post.id, alice.id, Emoji::Pray)
            .await
            .unwrap();
        assert_eq!(counts.get(Emoji::Heart), 0);
        assert_eq!(counts.get(Emoji::Pray), 1);

        let counts = ops::react_to_post(&store, post.id, bob.id, Emoji::Pray)
            .await
            .unwrap();
        assert_eq!(counts.get(Emoji::Pray), 2);
        assert_eq!(counts.total(), 2);
    }

    #[tokio::test]
    async fn reacting_to_missing_post_fails() {
        let store = MemStore::new();
        let alice = user(&store, "alice").await;

        let missing = Id::from(42u64);
        assert!(matches!(
            ops::react_to_post(&store, missing, alice.id, Emoji::Hug).await,
            Err(OpError::PostNotFound(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn concurrent_reactions_lose_no_updates() {
        let store = Arc::new(MemStore::new());
        let author = user(&*store, "author").await;
        let post = post(&*store, &author, AutoDelete::off()).await;

        let mut handles = Vec::new();
        for n in 0..16u64 {
            let store = Arc::clone(&store);
            let reactor = user(&*store, &format!("reactor {n}")).await;
            handles.push(tokio::spawn(async move {
                ops::react_to_post(store.as_ref(), post.id, reactor.id, Emoji::Muscle).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let counts = store.fetch_post(post.id).await.unwrap().unwrap().reaction_counts;
        assert_eq!(counts.get(Emoji::Muscle), 16);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn concurrent_rewards_lose_no_updates() {
        let store = Arc::new(MemStore::new());
        let author = user(&*store, "author").await;
        let commenter = user(&*store, "commenter").await;
        let post = post(&*store, &author, AutoDelete::off()).await;

        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                ops::create_comment(
                    store.as_ref(),
                    post.id,
                    commenter.id,
                    content("hang in there"),
                )
                .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let balance = store.fetch_user(commenter.id).await.unwrap().unwrap().tokens;
        assert_eq!(balance, 10 + 16 * COMMENT_REWARD_TOKENS);
        let count = store.fetch_post(post.id).await.unwrap().unwrap().comment_count;
        assert_eq!(count, 16);
    }

    #[tokio::test]
    async fn comment_grants_reward_after_creation() {
        let store = MemStore::new();
        let author = user(&store, "author").await;
        let commenter = user(&store, "commenter").await;
        let post = post(&store, &author, AutoDelete::off()).await;

        let created = ops::create_comment(&store, post.id, commenter.id, content("same"))
            .await
            .unwrap();

        assert_eq!(created.tokens_earned, COMMENT_REWARD_TOKENS);
        assert_eq!(created.token_balance, Some(10 + COMMENT_REWARD_TOKENS));
        assert_eq!(created.comment.depth.get(), 0);
        assert!(created.comment.parent.is_none());

        let reloaded = store.fetch_post(post.id).await.unwrap().unwrap();
        assert_eq!(reloaded.comment_count, 1);
    }

    #[tokio::test]
    async fn reply_rewards_less_and_nests_once() {
        let store = MemStore::new();
        let author = user(&store, "author").await;
        let replier = user(&store, "replier").await;
        let post = post(&store, &author, AutoDelete::off()).await;

        let top = ops::create_comment(&store, post.id, author.id, content("first"))
            .await
            .unwrap();
        let reply = ops::create_reply(&store, top.comment.id, replier.id, content("second"))
            .await
            .unwrap();

        assert_eq!(reply.tokens_earned, REPLY_REWARD_TOKENS);
        assert_eq!(reply.comment.depth.get(), 1);
        assert_eq!(reply.comment.parent, Some(top.comment.id));
        assert_eq!(reply.comment.post, post.id);
    }

    #[tokio::test]
    async fn reply_to_reply_is_rejected_without_side_effects() {
        let store = MemStore::new();
        let author = user(&store, "author").await;
        let post = post(&store, &author, AutoDelete::off()).await;

        let top = ops::create_comment(&store, post.id, author.id, content("first"))
            .await
            .unwrap();
        let reply = ops::create_reply(&store, top.comment.id, author.id, content("second"))
            .await
            .unwrap();

        let balance_before = store.fetch_user(author.id).await.unwrap().unwrap().tokens;
        assert!(matches!(
            ops::create_reply(&store, reply.comment.id, author.id, content("third")).await,
            Err(OpError::ReplyDepthExceeded)
        ));

        // Nothing was written and nothing was granted.
        let reloaded = store.fetch_post(post.id).await.unwrap().unwrap();
        assert_eq!(reloaded.comment_count, 2);
        assert_eq!(store.list_post_comments(post.id).await.unwrap().len(), 2);
        let balance_after = store.fetch_user(author.id).await.unwrap().unwrap().tokens;
        assert_eq!(balance_after, balance_before);
    }

    #[tokio::test]
    async fn deleting_comment_decrements_count() {
        let store = MemStore::new();
        let author = user(&store, "author").await;
        let post = post(&store, &author, AutoDelete::off()).await;

        let created = ops::create_comment(&store, post.id, author.id, content("gone soon"))
            .await
            .unwrap();

        assert!(ops::delete_comment(&store, created.comment.id).await.unwrap());
        let reloaded = store.fetch_post(post.id).await.unwrap().unwrap();
        assert_eq!(reloaded.comment_count, 0);

        // Second delete reports the comment as already gone.
        assert!(!ops::delete_comment(&store, created.comment.id).await.unwrap());
        let reloaded = store.fetch_post(post.id).await.unwrap().unwrap();
        assert_eq!(reloaded.comment_count, 0);
    }

    #[tokio::test]
    async fn delete_post_takes_comments_and_reactions_along() {
        let store = MemStore::new();
        let author = user(&store, "author").await;
        let post = post(&store, &author, AutoDelete::off()).await;

        ops::create_comment(&store, post.id, author.id, content("one"))
            .await
            .unwrap();
        ops::react_to_post(&store, post.id, author.id, Emoji::Crying)
            .await
            .unwrap();

        assert!(ops::delete_post(&store, post.id).await.unwrap());
        assert!(store.fetch_post(post.id).await.unwrap().is_none());
        assert!(store.list_post_comments(post.id).await.unwrap().is_empty());
        assert!(
            store
                .fetch_reaction(post.id, author.id)
                .await
                .unwrap()
                .is_none()
        );

        assert!(!ops::delete_post(&store, post.id).await.unwrap());
    }

    fn due(now: UtcDateTime, in_seconds: i64) -> AutoDelete {
        AutoDelete {
            enabled: true,
            delete_at: Some(now + Duration::seconds(in_seconds)),
        }
    }

    #[tokio::test]
    async fn sweep_deletes_only_due_posts() {
        let store = MemStore::new();
        let author = user(&store, "author").await;
        let now = UtcDateTime::now();

        let expired = post(&store, &author, due(now, -60)).await;
        let boundary = post(&store, &author, due(now, 0)).await;
        let future = post(&store, &author, due(now, 3600)).await;
        let keeper = post(&store, &author, AutoDelete::off()).await;

        ops::create_comment(&store, expired.id, author.id, content("orphan soon"))
            .await
            .unwrap();

        let summary = ops::sweep_expired(&store, now).await.unwrap();
        assert_eq!(summary.deleted, 2);
        assert_eq!(summary.failed, 0);

        assert!(store.fetch_post(expired.id).await.unwrap().is_none());
        assert!(store.fetch_post(boundary.id).await.unwrap().is_none());
        assert!(store.fetch_post(future.id).await.unwrap().is_some());
        assert!(store.fetch_post(keeper.id).await.unwrap().is_some());
        assert!(store.list_post_comments(expired.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn sweep_is_idempotent() {
        let store = MemStore::new();
        let author = user(&store, "author").await;
        let now = UtcDateTime::now();
        post(&store, &author, due(now, -1)).await;

        let first = ops::sweep_expired(&store, now).await.unwrap();
        assert_eq!(first.deleted, 1);

        let second = ops::sweep_expired(&store, now).await.unwrap();
        assert_eq!(second.deleted, 0);
        assert_eq!(second.failed, 0);
    }

    #[tokio::test]
    async fn failed_grant_leaves_comment_standing() {
        let store = FaultyStore {
            fail_adjust_tokens: true,
            ..FaultyStore::default()
        };
        let author = user(&store, "author").await;
        let commenter = user(&store, "commenter").await;
        let post = post(&store, &author, AutoDelete::off()).await;

        let created = ops::create_comment(&store, post.id, commenter.id, content("still here"))
            .await
            .unwrap();

        // The comment stands, only the grant is missing.
        assert_eq!(created.tokens_earned, COMMENT_REWARD_TOKENS);
        assert_eq!(created.token_balance, None);
        assert!(
            store
                .fetch_comment(created.comment.id)
                .await
                .unwrap()
                .is_some()
        );

        let reloaded = store.fetch_post(post.id).await.unwrap().unwrap();
        assert_eq!(reloaded.comment_count, 1);
        let balance = store.fetch_user(commenter.id).await.unwrap().unwrap().tokens;
        assert_eq!(balance, 10);
    }

    #[tokio::test]
    async fn failed_comment_count_adjust_is_tolerated() {
        let store = FaultyStore {
            fail_adjust_comment_count: true,
            ..FaultyStore::default()
        };
        let author = user(&store, "author").await;
        let post = post(&store, &author, AutoDelete::off()).await;

        let created = ops::create_comment(&store, post.id, author.id, content("counted later"))
            .await
            .unwrap();

        assert_eq!(created.token_balance, Some(10 + COMMENT_REWARD_TOKENS));
        assert!(
            store
                .fetch_comment(created.comment.id)
                .await
                .unwrap()
                .is_some()
        );

        // The counter adjustment never applied.
        let reloaded = store.fetch_post(post.id).await.unwrap().unwrap();
        assert_eq!(reloaded.comment_count, 0);
    }

    #[tokio::test]
    async fn failed_reaction_count_adjust_keeps_the_record() {
        let mut store = FaultyStore::default();
        let alice = user(&store, "alice").await;
        let post = post(&store, &alice, AutoDelete::off()).await;

        ops::react_to_post(&store, post.id, alice.id, Emoji::Heart)
            .await
            .unwrap();

        // Counters go unreachable while the reaction record stays writable.
        store.fail_adjust_reaction_count = true;
        let counts = ops::react_to_post(&store, post.id, alice.id, Emoji::Pray)
            .await
            .unwrap();

        assert_eq!(
            store.fetch_reaction(post.id, alice.id).await.unwrap(),
            Some(Emoji::Pray)
        );
        assert_eq!(counts.get(Emoji::Heart), 1);
        assert_eq!(counts.get(Emoji::Pray), 0);
    }

    #[tokio::test]
    async fn sweep_isolates_failing_posts() {
        let mut store = FaultyStore::default();
        let author = user(&store, "author").await;
        let now = UtcDateTime::now();

        let sticky = post(&store, &author, due(now, -120)).await;
        let doomed_a = post(&store, &author, due(now, -60)).await;
        let doomed_b = post(&store, &author, due(now, -30)).await;
        store.fail_delete_post = Some(sticky.id);

        let summary = ops::sweep_expired(&store, now).await.unwrap();
        assert_eq!(summary.deleted, 2);
        assert_eq!(summary.failed, 1);

        assert!(store.fetch_post(doomed_a.id).await.unwrap().is_none());
        assert!(store.fetch_post(doomed_b.id).await.unwrap().is_none());
        // The failed post stays selected for the next pass.
        assert!(store.fetch_post(sticky.id).await.unwrap().is_some());
        assert_eq!(store.expired_posts(now).await.unwrap(), vec![sticky.id]);

        store.fail_delete_post = None;
        let retry = ops::sweep_expired(&store, now).await.unwrap();
        assert_eq!(retry.deleted, 1);
        assert_eq!(retry.failed, 0);
        assert!(store.fetch_post(sticky.id).await.unwrap().is_none());
    }
}
