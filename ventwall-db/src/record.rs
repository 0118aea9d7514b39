use time::{Duration, PrimitiveDateTime};
use ventwall_common::model::{
    ModelValidationError,
    auth::Authentication,
    comment::{Comment, CommentContent, Depth},
    post::{AutoDelete, Mood, Post, PostContent, PostTitle},
    reaction::ReactionCounts,
    user::{AnonymousName, Role, User},
};

#[derive(Clone, Eq, PartialEq, Debug, sqlx::FromRow)]
pub(crate) struct UserRecord {
    pub user_snowflake: i64,
    pub anonymous_name: String,
    pub password_hash: String,
    pub tokens: i64,
    pub role: String,
    pub is_active: bool,
    pub created_at: PrimitiveDateTime,
}

#[derive(Clone, Eq, PartialEq, Debug, sqlx::FromRow)]
pub(crate) struct PostRecord {
    pub post_snowflake: i64,
    pub author_snowflake: i64,
    pub title: Option<String>,
    pub content: String,
    pub mood: String,
    pub heart_count: i32,
    pub hug_count: i32,
    pub crying_count: i32,
    pub angry_count: i32,
    pub muscle_count: i32,
    pub pray_count: i32,
    pub comment_count: i32,
    pub auto_delete_enabled: bool,
    pub delete_at: Option<PrimitiveDateTime>,
    pub is_visible: bool,
    pub deleted_by_admin: bool,
    pub created_at: PrimitiveDateTime,
    pub updated_at: PrimitiveDateTime,
}

#[derive(Clone, Eq, PartialEq, Debug, sqlx::FromRow)]
pub(crate) struct CommentRecord {
    pub comment_snowflake: i64,
    pub post_snowflake: i64,
    pub author_snowflake: i64,
    pub content: String,
    pub parent_snowflake: Option<i64>,
    pub depth: i16,
    pub is_visible: bool,
    pub deleted_by_admin: bool,
    pub created_at: PrimitiveDateTime,
}

#[derive(Clone, Eq, PartialEq, Debug, sqlx::FromRow)]
pub(crate) struct AuthenticationRecord {
    pub user_snowflake: i64,
    pub token_hash: Vec<u8>,
    pub created_at: PrimitiveDateTime,
    pub expires_after_seconds: Option<i64>,
}

impl TryFrom<UserRecord> for User {
    type Error = ModelValidationError;

    fn try_from(value: UserRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.user_snowflake.cast_unsigned().into(),
            anonymous_name: AnonymousName::new(value.anonymous_name)?,
            password_hash: value.password_hash,
            tokens: value.tokens,
            role: Role::from_tag(&value.role)?,
            is_active: value.is_active,
            created_at: value.created_at.as_utc(),
        })
    }
}

impl TryFrom<PostRecord> for Post {
    type Error = ModelValidationError;

    fn try_from(value: PostRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.post_snowflake.cast_unsigned().into(),
            author: value.author_snowflake.cast_unsigned().into(),
            title: value.title.map(PostTitle::new).transpose()?,
            content: PostContent::new(value.content)?,
            mood: Mood::from_tag(&value.mood)?,
            reaction_counts: ReactionCounts {
                heart: value.heart_count,
                hug: value.hug_count,
                crying: value.crying_count,
                angry: value.angry_count,
                muscle: value.muscle_count,
                pray: value.pray_count,
            },
            comment_count: value.comment_count,
            auto_delete: AutoDelete {
                enabled: value.auto_delete_enabled,
                delete_at: value.delete_at.map(PrimitiveDateTime::as_utc),
            },
            is_visible: value.is_visible,
            deleted_by_admin: value.deleted_by_admin,
            created_at: value.created_at.as_utc(),
            updated_at: value.updated_at.as_utc(),
        })
    }
}

impl TryFrom<CommentRecord> for Comment {
    type Error = ModelValidationError;

    fn try_from(value: CommentRecord) -> Result<Self, Self::Error> {
        let raw_depth = u8::try_from(value.depth).unwrap_or(u8::MAX);

        Ok(Self {
            id: value.comment_snowflake.cast_unsigned().into(),
            post: value.post_snowflake.cast_unsigned().into(),
            author: value.author_snowflake.cast_unsigned().into(),
            content: CommentContent::new(value.content)?,
            parent: value
                .parent_snowflake
                .map(|parent| parent.cast_unsigned().into()),
            depth: Depth::new(raw_depth)?,
            is_visible: value.is_visible,
            deleted_by_admin: value.deleted_by_admin,
            created_at: value.created_at.as_utc(),
        })
    }
}

impl TryFrom<AuthenticationRecord> for Authentication {
    type Error = ModelValidationError;

    fn try_from(value: AuthenticationRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            user: value.user_snowflake.cast_unsigned().into(),
            token_hash: value.token_hash.into_boxed_slice().try_into()?,
            created_at: value.created_at.as_utc(),
            expires_after: value
                .expires_after_seconds
                .map(|seconds| Duration::seconds(seconds).try_into())
                .transpose()?,
        })
    }
}
