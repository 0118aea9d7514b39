use crate::{
    error::{Result, StoreError},
    store::{NewComment, NewPost, NewUser, PostQuery, Stats, Store},
};
use async_trait::async_trait;
use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard, PoisonError},
};
use time::UtcDateTime;
use ventwall_common::{
    model::{
        Id, VentwallSnowflakeGenerator,
        auth::{AuthTokenHash, Authentication},
        comment::{Comment, CommentMarker},
        post::{Post, PostMarker},
        reaction::{Emoji, ReactionCounts},
        user::{AnonymousName, Role, User, UserMarker},
    },
    snowflake::{ProcessId, WorkerId},
};

#[derive(Default)]
struct State {
    users: HashMap<u64, User>,
    auths: HashMap<AuthTokenHash, Authentication>,
    posts: HashMap<u64, Post>,
    comments: HashMap<u64, Comment>,
    reactions: HashMap<(u64, u64), Emoji>,
}

/// In-memory [`Store`] with the same atomicity discipline as the Postgres
/// implementation: every operation runs under one lock, so counter deltas
/// never interleave with a read-modify-write race.
pub struct MemStore {
    state: Mutex<State>,
    snowflake_generator: Mutex<VentwallSnowflakeGenerator>,
}

impl Default for MemStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            snowflake_generator: Mutex::new(VentwallSnowflakeGenerator::new(
                WorkerId::default(),
                ProcessId::default(),
            )),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn generate<Marker>(&self) -> Id<Marker> {
        self.snowflake_generator
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .generate()
            .into()
    }
}

#[async_trait]
impl Store for MemStore {
    async fn insert_user(&self, new: NewUser) -> Result<User> {
        let user = User {
            id: self.generate(),
            anonymous_name: new.anonymous_name,
            password_hash: new.password_hash,
            tokens: new.tokens,
            role: Role::Member,
            is_active: true,
            created_at: UtcDateTime::now(),
        };

        self.state().users.insert(user.id.into(), user.clone());
        Ok(user)
    }

    async fn fetch_user(&self, id: Id<UserMarker>) -> Result<Option<User>> {
        Ok(self.state().users.get(&id.into()).cloned())
    }

    async fn fetch_user_by_name(&self, name: &AnonymousName) -> Result<Option<User>> {
        Ok(self
            .state()
            .users
            .values()
            .find(|user| user.anonymous_name == *name)
            .cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let mut users: Vec<User> = self.state().users.values().cloned().collect();
        users.sort_by_key(|user| std::cmp::Reverse(u64::from(user.id)));
        Ok(users)
    }

    async fn update_user_name(&self, id: Id<UserMarker>, name: &AnonymousName) -> Result<()> {
        let mut state = self.state();
        let user = state.users.get_mut(&id.into()).ok_or(StoreError::NotFound)?;
        user.anonymous_name = name.clone();
        Ok(())
    }

    async fn update_user_password(&self, id: Id<UserMarker>, password_hash: &str) -> Result<()> {
        let mut state = self.state();
        let user = state.users.get_mut(&id.into()).ok_or(StoreError::NotFound)?;
        user.password_hash = password_hash.to_owned();
        Ok(())
    }

    async fn set_user_active(&self, id: Id<UserMarker>, active: bool) -> Result<()> {
        let mut state = self.state();
        let user = state.users.get_mut(&id.into()).ok_or(StoreError::NotFound)?;
        user.is_active = active;
        Ok(())
    }

    async fn adjust_tokens(&self, id: Id<UserMarker>, delta: i64) -> Result<i64> {
        let mut state = self.state();
        let user = state.users.get_mut(&id.into()).ok_or(StoreError::NotFound)?;
        user.tokens += delta;
        Ok(user.tokens)
    }

    async fn insert_auth(&self, authentication: &Authentication) -> Result<()> {
        self.state()
            .auths
            .insert(authentication.token_hash.clone(), authentication.clone());
        Ok(())
    }

    async fn fetch_auth(&self, token_hash: &AuthTokenHash) -> Result<Option<Authentication>> {
        Ok(self.state().auths.get(token_hash).cloned())
    }

    async fn insert_post(&self, new: NewPost) -> Result<Post> {
        let now = UtcDateTime::now();
        let post = Post {
            id: self.generate(),
            author: new.author,
            title: new.title,
            content: new.content,
            mood: new.mood,
            reaction_counts: ReactionCounts::default(),
            comment_count: 0,
            auto_delete: new.auto_delete,
            is_visible: true,
            deleted_by_admin: false,
            created_at: now,
            updated_at: now,
        };

        self.state().posts.insert(post.id.into(), post.clone());
        Ok(post)
    }

    async fn fetch_post(&self, id: Id<PostMarker>) -> Result<Option<Post>> {
        Ok(self.state().posts.get(&id.into()).cloned())
    }

    async fn list_posts(&self, query: PostQuery) -> Result<Vec<Post>> {
        let mut posts: Vec<Post> = self
            .state()
            .posts
            .values()
            .filter(|post| post.is_visible)
            .filter(|post| query.mood.is_none_or(|mood| post.mood == mood))
            .cloned()
            .collect();
        posts.sort_by_key(|post| std::cmp::Reverse(u64::from(post.id)));

        let offset = usize::try_from(query.offset()).unwrap_or(usize::MAX);
        let per_page = usize::try_from(query.per_page).unwrap_or(usize::MAX);
        Ok(posts.into_iter().skip(offset).take(per_page).collect())
    }

    async fn list_posts_by_author(&self, author: Id<UserMarker>) -> Result<Vec<Post>> {
        let mut posts: Vec<Post> = self
            .state()
            .posts
            .values()
            .filter(|post| post.author == author)
            .cloned()
            .collect();
        posts.sort_by_key(|post| std::cmp::Reverse(u64::from(post.id)));
        Ok(posts)
    }

    async fn delete_post(&self, id: Id<PostMarker>) -> Result<bool> {
        let mut state = self.state();
        let existed = state.posts.remove(&id.into()).is_some();

        // Mirrors the cascade the Postgres schema performs.
        state.reactions.retain(|(post, _), _| *post != u64::from(id));
        state.comments.retain(|_, comment| comment.post != id);

        Ok(existed)
    }

    async fn adjust_comment_count(&self, post: Id<PostMarker>, delta: i32) -> Result<()> {
        let mut state = self.state();
        let post = state.posts.get_mut(&post.into()).ok_or(StoreError::NotFound)?;
        post.comment_count += delta;
        post.updated_at = UtcDateTime::now();
        Ok(())
    }

    async fn adjust_reaction_count(
        &self,
        post: Id<PostMarker>,
        emoji: Emoji,
        delta: i32,
    ) -> Result<()> {
        let mut state = self.state();
        let post = state.posts.get_mut(&post.into()).ok_or(StoreError::NotFound)?;
        post.reaction_counts.apply(emoji, delta);
        post.updated_at = UtcDateTime::now();
        Ok(())
    }

    async fn expired_posts(&self, now: UtcDateTime) -> Result<Vec<Id<PostMarker>>> {
        Ok(self
            .state()
            .posts
            .values()
            .filter(|post| post.is_visible && post.auto_delete.due_by(now))
            .map(|post| post.id)
            .collect())
    }

    async fn fetch_reaction(
        &self,
        post: Id<PostMarker>,
        user: Id<UserMarker>,
    ) -> Result<Option<Emoji>> {
        Ok(self
            .state()
            .reactions
            .get(&(post.into(), user.into()))
            .copied())
    }

    async fn upsert_reaction(
        &self,
        post: Id<PostMarker>,
        user: Id<UserMarker>,
        emoji: Emoji,
    ) -> Result<()> {
        let mut state = self.state();
        // Matches the foreign key constraint of the Postgres schema.
        if !state.posts.contains_key(&post.into()) {
            return Err(StoreError::NotFound);
        }

        state.reactions.insert((post.into(), user.into()), emoji);
        Ok(())
    }

    async fn insert_comment(&self, new: NewComment) -> Result<Comment> {
        let comment = Comment {
            id: self.generate(),
            post: new.post,
            author: new.author,
            content: new.content,
            parent: new.parent,
            depth: new.depth,
            is_visible: true,
            deleted_by_admin: false,
            created_at: UtcDateTime::now(),
        };

        self.state()
            .comments
            .insert(comment.id.into(), comment.clone());
        Ok(comment)
    }

    async fn fetch_comment(&self, id: Id<CommentMarker>) -> Result<Option<Comment>> {
        Ok(self.state().comments.get(&id.into()).cloned())
    }

    async fn list_post_comments(&self, post: Id<PostMarker>) -> Result<Vec<Comment>> {
        let mut comments: Vec<Comment> = self
            .state()
            .comments
            .values()
            .filter(|comment| comment.post == post)
            .cloned()
            .collect();
        comments.sort_by_key(|comment| u64::from(comment.id));
        Ok(comments)
    }

    async fn delete_comment(&self, id: Id<CommentMarker>) -> Result<bool> {
        Ok(self.state().comments.remove(&id.into()).is_some())
    }

    async fn delete_post_comments(&self, post: Id<PostMarker>) -> Result<u64> {
        let mut state = self.state();
        let before = state.comments.len();
        state.comments.retain(|_, comment| comment.post != post);
        Ok(u64::try_from(before - state.comments.len()).unwrap_or(u64::MAX))
    }

    async fn stats(&self) -> Result<Stats> {
        fn count(len: usize) -> i64 {
            i64::try_from(len).unwrap_or(i64::MAX)
        }

        let state = self.state();
        Ok(Stats {
            total_users: count(state.users.len()),
            total_posts: count(state.posts.len()),
            total_comments: count(state.comments.len()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::MemStore;
    use crate::{
        error::StoreError,
        store::{NewPost, NewUser, PostQuery, Store},
    };
    use ventwall_common::model::{
        Id,
        post::{AutoDelete, Mood, PostContent},
        reaction::Emoji,
        user::{AnonymousName, UserMarker},
    };

    fn new_user(name: &str) -> NewUser {
        NewUser {
            anonymous_name: AnonymousName::new(name).unwrap(),
            password_hash: "phc-string".to_owned(),
            tokens: 10,
        }
    }

    fn new_post(author: Id<UserMarker>, mood: Mood) -> NewPost {
        NewPost {
            author,
            title: None,
            content: PostContent::new("something heavy on my mind today").unwrap(),
            mood,
            auto_delete: AutoDelete::off(),
        }
    }

    #[tokio::test]
    async fn fetch_user_by_name_matches_exactly() {
        let store = MemStore::new();
        let user = store.insert_user(new_user("night owl")).await.unwrap();

        let found = store
            .fetch_user_by_name(&AnonymousName::new("night owl").unwrap())
            .await
            .unwrap();
        assert_eq!(found.map(|user| user.id), Some(user.id));

        let missing = store
            .fetch_user_by_name(&AnonymousName::new("day owl").unwrap())
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn adjust_tokens_requires_existing_user() {
        let store = MemStore::new();
        let user = store.insert_user(new_user("saver")).await.unwrap();

        assert_eq!(store.adjust_tokens(user.id, 5).await.unwrap(), 15);
        assert_eq!(store.adjust_tokens(user.id, -3).await.unwrap(), 12);

        let missing = Id::from(999_999u64);
        assert!(matches!(
            store.adjust_tokens(missing, 1).await,
            Err(StoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn upsert_reaction_replaces_previous_record() {
        let store = MemStore::new();
        let user = store.insert_user(new_user("reactor")).await.unwrap();
        let post = store
            .insert_post(new_post(user.id, Mood::Neutral))
            .await
            .unwrap();

        store
            .upsert_reaction(post.id, user.id, Emoji::Heart)
            .await
            .unwrap();
        store
            .upsert_reaction(post.id, user.id, Emoji::Pray)
            .await
            .unwrap();

        assert_eq!(
            store.fetch_reaction(post.id, user.id).await.unwrap(),
            Some(Emoji::Pray)
        );
    }

    #[tokio::test]
    async fn upsert_reaction_requires_existing_post() {
        let store = MemStore::new();
        let user = store.insert_user(new_user("reactor")).await.unwrap();

        let missing = Id::from(123_456u64);
        assert!(matches!(
            store.upsert_reaction(missing, user.id, Emoji::Heart).await,
            Err(StoreError::NotFound)
        ));
        assert!(
            store
                .fetch_reaction(missing, user.id)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn list_posts_filters_and_pages() {
        let store = MemStore::new();
        let user = store.insert_user(new_user("prolific")).await.unwrap();

        for _ in 0..3 {
            store
                .insert_post(new_post(user.id, Mood::Hopeful))
                .await
                .unwrap();
        }
        store
            .insert_post(new_post(user.id, Mood::Angry))
            .await
            .unwrap();

        let hopeful = store
            .list_posts(PostQuery {
                mood: Some(Mood::Hopeful),
                page: 1,
                per_page: 10,
            })
            .await
            .unwrap();
        assert_eq!(hopeful.len(), 3);
        assert!(hopeful.iter().all(|post| post.mood == Mood::Hopeful));

        let second_page = store
            .list_posts(PostQuery {
                mood: None,
                page: 2,
                per_page: 3,
            })
            .await
            .unwrap();
        assert_eq!(second_page.len(), 1);
    }
}
