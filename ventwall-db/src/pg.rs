use crate::{
    error::{Result, StoreError},
    record::{AuthenticationRecord, CommentRecord, PostRecord, UserRecord},
    store::{NewComment, NewPost, NewUser, PostQuery, Stats, Store},
};
use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::{Mutex, MutexGuard, PoisonError};
use time::{PrimitiveDateTime, UtcDateTime};
use ventwall_common::{
    model::{
        Id, ModelValidationError, VentwallSnowflakeGenerator,
        auth::{AuthTokenHash, Authentication},
        comment::{Comment, CommentMarker},
        post::{Mood, Post, PostMarker},
        reaction::{Emoji, ReactionCounts},
        user::{AnonymousName, Role, User, UserMarker},
    },
    snowflake::{ProcessId, WorkerId},
};

const POST_COLUMNS: &str = "post_snowflake, author_snowflake, title, content, mood, \
    heart_count, hug_count, crying_count, angry_count, muscle_count, pray_count, \
    comment_count, auto_delete_enabled, delete_at, is_visible, deleted_by_admin, \
    created_at, updated_at";

const COMMENT_COLUMNS: &str = "comment_snowflake, post_snowflake, author_snowflake, \
    content, parent_snowflake, depth, is_visible, deleted_by_admin, created_at";

/// Postgres-backed [`Store`].
pub struct PgStore {
    pool: PgPool,
    snowflake_generator: Mutex<VentwallSnowflakeGenerator>,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool, worker_id: WorkerId, process_id: ProcessId) -> Self {
        Self {
            pool,
            snowflake_generator: Mutex::new(VentwallSnowflakeGenerator::new(
                worker_id, process_id,
            )),
        }
    }

    fn generator(&self) -> MutexGuard<'_, VentwallSnowflakeGenerator> {
        self.snowflake_generator
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

fn to_db_time(time: UtcDateTime) -> PrimitiveDateTime {
    PrimitiveDateTime::new(time.date(), time.time())
}

fn signed<Marker>(id: Id<Marker>) -> i64 {
    u64::from(id).cast_signed()
}

#[async_trait]
impl Store for PgStore {
    async fn insert_user(&self, new: NewUser) -> Result<User> {
        let id: Id<UserMarker> = self.generator().generate().into();
        let now = UtcDateTime::now();

        sqlx::query(
            "
            INSERT INTO users
                (user_snowflake, anonymous_name, password_hash, tokens, role, is_active, created_at)
            VALUES ($1, $2, $3, $4, $5, TRUE, $6)
            ",
        )
        .bind(signed(id))
        .bind(new.anonymous_name.get())
        .bind(&new.password_hash)
        .bind(new.tokens)
        .bind(Role::Member.tag())
        .bind(to_db_time(now))
        .execute(&self.pool)
        .await?;

        Ok(User {
            id,
            anonymous_name: new.anonymous_name,
            password_hash: new.password_hash,
            tokens: new.tokens,
            role: Role::Member,
            is_active: true,
            created_at: now,
        })
    }

    async fn fetch_user(&self, id: Id<UserMarker>) -> Result<Option<User>> {
        let record = sqlx::query_as::<_, UserRecord>(
            "
            SELECT user_snowflake, anonymous_name, password_hash, tokens, role, is_active,
                created_at
            FROM users
            WHERE user_snowflake = $1
            ",
        )
        .bind(signed(id))
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(User::try_from).transpose()?)
    }

    async fn fetch_user_by_name(&self, name: &AnonymousName) -> Result<Option<User>> {
        let record = sqlx::query_as::<_, UserRecord>(
            "
            SELECT user_snowflake, anonymous_name, password_hash, tokens, role, is_active,
                created_at
            FROM users
            WHERE anonymous_name = $1
            ",
        )
        .bind(name.get())
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(User::try_from).transpose()?)
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let records = sqlx::query_as::<_, UserRecord>(
            "
            SELECT user_snowflake, anonymous_name, password_hash, tokens, role, is_active,
                created_at
            FROM users
            ORDER BY user_snowflake DESC
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(records
            .into_iter()
            .map(User::try_from)
            .collect::<Result<_, _>>()?)
    }

    async fn update_user_name(&self, id: Id<UserMarker>, name: &AnonymousName) -> Result<()> {
        let result = sqlx::query("UPDATE users SET anonymous_name = $1 WHERE user_snowflake = $2")
            .bind(name.get())
            .bind(signed(id))
            .execute(&self.pool)
            .await?;

        (result.rows_affected() > 0)
            .then_some(())
            .ok_or(StoreError::NotFound)
    }

    async fn update_user_password(&self, id: Id<UserMarker>, password_hash: &str) -> Result<()> {
        let result = sqlx::query("UPDATE users SET password_hash = $1 WHERE user_snowflake = $2")
            .bind(password_hash)
            .bind(signed(id))
            .execute(&self.pool)
            .await?;

        (result.rows_affected() > 0)
            .then_some(())
            .ok_or(StoreError::NotFound)
    }

    async fn set_user_active(&self, id: Id<UserMarker>, active: bool) -> Result<()> {
        let result = sqlx::query("UPDATE users SET is_active = $1 WHERE user_snowflake = $2")
            .bind(active)
            .bind(signed(id))
            .execute(&self.pool)
            .await?;

        (result.rows_affected() > 0)
            .then_some(())
            .ok_or(StoreError::NotFound)
    }

    async fn adjust_tokens(&self, id: Id<UserMarker>, delta: i64) -> Result<i64> {
        let balance = sqlx::query_scalar::<_, i64>(
            "UPDATE users SET tokens = tokens + $1 WHERE user_snowflake = $2 RETURNING tokens",
        )
        .bind(delta)
        .bind(signed(id))
        .fetch_optional(&self.pool)
        .await?;

        balance.ok_or(StoreError::NotFound)
    }

    async fn insert_auth(&self, authentication: &Authentication) -> Result<()> {
        sqlx::query(
            "
            INSERT INTO auth_tokens (user_snowflake, token_hash, created_at, expires_after_seconds)
            VALUES ($1, $2, $3, $4)
            ",
        )
        .bind(signed(authentication.user))
        .bind(authentication.token_hash.as_bytes())
        .bind(to_db_time(authentication.created_at))
        .bind(
            authentication
                .expires_after
                .map(|ttl| ttl.get().whole_seconds()),
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn fetch_auth(&self, token_hash: &AuthTokenHash) -> Result<Option<Authentication>> {
        let record = sqlx::query_as::<_, AuthenticationRecord>(
            "
            SELECT user_snowflake, token_hash, created_at, expires_after_seconds
            FROM auth_tokens
            WHERE token_hash = $1
            ",
        )
        .bind(token_hash.as_bytes())
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(Authentication::try_from).transpose()?)
    }

    async fn insert_post(&self, new: NewPost) -> Result<Post> {
        let id: Id<PostMarker> = self.generator().generate().into();
        let now = UtcDateTime::now();

        sqlx::query(
            "
            INSERT INTO posts
                (post_snowflake, author_snowflake, title, content, mood,
                auto_delete_enabled, delete_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
            ",
        )
        .bind(signed(id))
        .bind(signed(new.author))
        .bind(new.title.as_ref().map(|title| title.get().to_owned()))
        .bind(new.content.get())
        .bind(new.mood.tag())
        .bind(new.auto_delete.enabled)
        .bind(new.auto_delete.delete_at.map(to_db_time))
        .bind(to_db_time(now))
        .execute(&self.pool)
        .await?;

        Ok(Post {
            id,
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
        })
    }

    async fn fetch_post(&self, id: Id<PostMarker>) -> Result<Option<Post>> {
        let record = sqlx::query_as::<_, PostRecord>(&format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE post_snowflake = $1"
        ))
        .bind(signed(id))
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(Post::try_from).transpose()?)
    }

    async fn list_posts(&self, query: PostQuery) -> Result<Vec<Post>> {
        let records = sqlx::query_as::<_, PostRecord>(&format!(
            "
            SELECT {POST_COLUMNS}
            FROM posts
            WHERE is_visible AND ($1::text IS NULL OR mood = $1)
            ORDER BY post_snowflake DESC
            LIMIT $2 OFFSET $3
            "
        ))
        .bind(query.mood.map(Mood::tag))
        .bind(i64::from(query.per_page))
        .bind(query.offset().cast_signed())
        .fetch_all(&self.pool)
        .await?;

        Ok(records
            .into_iter()
            .map(Post::try_from)
            .collect::<Result<_, _>>()?)
    }

    async fn list_posts_by_author(&self, author: Id<UserMarker>) -> Result<Vec<Post>> {
        let records = sqlx::query_as::<_, PostRecord>(&format!(
            "
            SELECT {POST_COLUMNS}
            FROM posts
            WHERE author_snowflake = $1
            ORDER BY post_snowflake DESC
            "
        ))
        .bind(signed(author))
        .fetch_all(&self.pool)
        .await?;

        Ok(records
            .into_iter()
            .map(Post::try_from)
            .collect::<Result<_, _>>()?)
    }

    async fn delete_post(&self, id: Id<PostMarker>) -> Result<bool> {
        // Reactions (and any leftover comments) go with the post via
        // ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM posts WHERE post_snowflake = $1")
            .bind(signed(id))
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn adjust_comment_count(&self, post: Id<PostMarker>, delta: i32) -> Result<()> {
        let result = sqlx::query(
            "
            UPDATE posts
            SET comment_count = comment_count + $1, updated_at = $2
            WHERE post_snowflake = $3
            ",
        )
        .bind(delta)
        .bind(to_db_time(UtcDateTime::now()))
        .bind(signed(post))
        .execute(&self.pool)
        .await?;

        (result.rows_affected() > 0)
            .then_some(())
            .ok_or(StoreError::NotFound)
    }

    async fn adjust_reaction_count(
        &self,
        post: Id<PostMarker>,
        emoji: Emoji,
        delta: i32,
    ) -> Result<()> {
        // The column name comes from the fixed emoji set, never from input.
        let column = format!("{}_count", emoji.tag());
        let result = sqlx::query(&format!(
            "UPDATE posts SET {column} = {column} + $1, updated_at = $2 WHERE post_snowflake = $3"
        ))
        .bind(delta)
        .bind(to_db_time(UtcDateTime::now()))
        .bind(signed(post))
        .execute(&self.pool)
        .await?;

        (result.rows_affected() > 0)
            .then_some(())
            .ok_or(StoreError::NotFound)
    }

    async fn expired_posts(&self, now: UtcDateTime) -> Result<Vec<Id<PostMarker>>> {
        let snowflakes = sqlx::query_scalar::<_, i64>(
            "
            SELECT post_snowflake
            FROM posts
            WHERE auto_delete_enabled AND delete_at <= $1 AND is_visible
            ",
        )
        .bind(to_db_time(now))
        .fetch_all(&self.pool)
        .await?;

        Ok(snowflakes
            .into_iter()
            .map(|snowflake| snowflake.cast_unsigned().into())
            .collect())
    }

    async fn fetch_reaction(
        &self,
        post: Id<PostMarker>,
        user: Id<UserMarker>,
    ) -> Result<Option<Emoji>> {
        let tag = sqlx::query_scalar::<_, String>(
            "SELECT emoji FROM reactions WHERE post_snowflake = $1 AND user_snowflake = $2",
        )
        .bind(signed(post))
        .bind(signed(user))
        .fetch_optional(&self.pool)
        .await?;

        Ok(tag
            .map(|tag| Emoji::from_tag(&tag))
            .transpose()
            .map_err(ModelValidationError::from)?)
    }

    async fn upsert_reaction(
        &self,
        post: Id<PostMarker>,
        user: Id<UserMarker>,
        emoji: Emoji,
    ) -> Result<()> {
        sqlx::query(
            "
            INSERT INTO reactions (post_snowflake, user_snowflake, emoji)
            VALUES ($1, $2, $3)
            ON CONFLICT (post_snowflake, user_snowflake) DO UPDATE SET emoji = EXCLUDED.emoji
            ",
        )
        .bind(signed(post))
        .bind(signed(user))
        .bind(emoji.tag())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn insert_comment(&self, new: NewComment) -> Result<Comment> {
        let id: Id<CommentMarker> = self.generator().generate().into();
        let now = UtcDateTime::now();

        sqlx::query(
            "
            INSERT INTO comments
                (comment_snowflake, post_snowflake, author_snowflake, content,
                parent_snowflake, depth, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ",
        )
        .bind(signed(id))
        .bind(signed(new.post))
        .bind(signed(new.author))
        .bind(new.content.get())
        .bind(new.parent.map(signed))
        .bind(i16::from(new.depth.get()))
        .bind(to_db_time(now))
        .execute(&self.pool)
        .await?;

        Ok(Comment {
            id,
            post: new.post,
            author: new.author,
            content: new.content,
            parent: new.parent,
            depth: new.depth,
            is_visible: true,
            deleted_by_admin: false,
            created_at: now,
        })
    }

    async fn fetch_comment(&self, id: Id<CommentMarker>) -> Result<Option<Comment>> {
        let record = sqlx::query_as::<_, CommentRecord>(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE comment_snowflake = $1"
        ))
        .bind(signed(id))
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(Comment::try_from).transpose()?)
    }

    async fn list_post_comments(&self, post: Id<PostMarker>) -> Result<Vec<Comment>> {
        let records = sqlx::query_as::<_, CommentRecord>(&format!(
            "
            SELECT {COMMENT_COLUMNS}
            FROM comments
            WHERE post_snowflake = $1
            ORDER BY comment_snowflake ASC
            "
        ))
        .bind(signed(post))
        .fetch_all(&self.pool)
        .await?;

        Ok(records
            .into_iter()
            .map(Comment::try_from)
            .collect::<Result<_, _>>()?)
    }

    async fn delete_comment(&self, id: Id<CommentMarker>) -> Result<bool> {
        let result = sqlx::query("DELETE FROM comments WHERE comment_snowflake = $1")
            .bind(signed(id))
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_post_comments(&self, post: Id<PostMarker>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM comments WHERE post_snowflake = $1")
            .bind(signed(post))
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn stats(&self) -> Result<Stats> {
        let total_users = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        let total_posts = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM posts")
            .fetch_one(&self.pool)
            .await?;
        let total_comments = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM comments")
            .fetch_one(&self.pool)
            .await?;

        Ok(Stats {
            total_users,
            total_posts,
            total_comments,
        })
    }
}
