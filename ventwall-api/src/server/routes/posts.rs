use crate::server::{Result, ServerError, ServerRouter, auth::AuthenticatedUser, json::Json};
use axum::extract::{Query, State, rejection::QueryRejection};
use axum_extra::routing::{RouterExt, TypedPath};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use time::UtcDateTime;
use ventwall_common::model::{
    Id,
    comment::{Comment, CommentContent},
    post::{AutoDelete, Mood, Post, PostContent, PostMarker, PostTitle},
    reaction::{Emoji, ReactionCounts},
};
use ventwall_db::{
    Store, ops,
    store::{NewPost, PostQuery},
};

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(list_posts)
        .typed_post(create_post)
        .typed_get(my_posts)
        .typed_get(get_post)
        .typed_delete(delete_post)
        .typed_post(react)
        .typed_get(list_comments)
        .typed_post(create_comment)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts", rejection(ServerError))]
struct ListPostsPath();

#[derive(Debug, Default, Deserialize)]
struct ListPostsQuery {
    mood: Option<Mood>,
    page: Option<u32>,
}

async fn list_posts(
    ListPostsPath(): ListPostsPath,
    State(store): State<Arc<dyn Store>>,
    query: Result<Query<ListPostsQuery>, QueryRejection>,
) -> Result<Json<Vec<Post>>> {
    let Query(query) = query?;

    let posts = store
        .list_posts(PostQuery {
            page: query.page.unwrap_or(1),
            ..PostQuery::first_page(query.mood)
        })
        .await?;

    Ok(Json(posts))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/create", rejection(ServerError))]
struct CreatePostPath();

#[derive(Debug, Deserialize)]
struct CreatePostRequest {
    title: Option<PostTitle>,
    content: PostContent,
    mood: Mood,
    #[serde(default)]
    auto_delete: Option<AutoDelete>,
}

async fn create_post(
    CreatePostPath(): CreatePostPath,
    State(store): State<Arc<dyn Store>>,
    user: AuthenticatedUser,
    Json(request): Json<CreatePostRequest>,
) -> Result<Json<Post>> {
    let auto_delete = request.auto_delete.unwrap_or_else(AutoDelete::off);
    if auto_delete.enabled
        && !auto_delete
            .delete_at
            .is_some_and(|delete_at| delete_at > UtcDateTime::now())
    {
        return Err(ServerError::AutoDeleteNotInFuture);
    }

    let post = store
        .insert_post(NewPost {
            author: user.user_id(),
            title: request.title,
            content: request.content,
            mood: request.mood,
            auto_delete,
        })
        .await?;

    Ok(Json(post))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/mine", rejection(ServerError))]
struct MyPostsPath();

async fn my_posts(
    MyPostsPath(): MyPostsPath,
    State(store): State<Arc<dyn Store>>,
    user: AuthenticatedUser,
) -> Result<Json<Vec<Post>>> {
    let posts = store.list_posts_by_author(user.user_id()).await?;

    Ok(Json(posts))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}", rejection(ServerError))]
struct PostPath {
    id: Id<PostMarker>,
}

async fn get_post(
    PostPath { id }: PostPath,
    State(store): State<Arc<dyn Store>>,
) -> Result<Json<Post>> {
    let post = store
        .fetch_post(id)
        .await?
        .filter(|post| post.is_visible)
        .ok_or(ServerError::PostByIdNotFound(id))?;

    Ok(Json(post))
}

#[derive(Debug, Serialize)]
struct DeletedResponse {
    deleted: bool,
}

async fn delete_post(
    PostPath { id }: PostPath,
    State(store): State<Arc<dyn Store>>,
    user: AuthenticatedUser,
) -> Result<Json<DeletedResponse>> {
    // Deleting an already-deleted post is not an error.
    let Some(post) = store.fetch_post(id).await? else {
        return Ok(Json(DeletedResponse { deleted: false }));
    };

    if post.author != user.user_id() && !user.is_admin() {
        return Err(ServerError::Forbidden);
    }

    let deleted = ops::delete_post(store.as_ref(), id).await?;

    Ok(Json(DeletedResponse { deleted }))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}/react", rejection(ServerError))]
struct ReactPath {
    id: Id<PostMarker>,
}

#[derive(Debug, Deserialize)]
struct ReactRequest {
    emoji: Emoji,
}

async fn react(
    ReactPath { id }: ReactPath,
    State(store): State<Arc<dyn Store>>,
    user: AuthenticatedUser,
    Json(request): Json<ReactRequest>,
) -> Result<Json<ReactionCounts>> {
    let counts = ops::react_to_post(store.as_ref(), id, user.user_id(), request.emoji).await?;

    Ok(Json(counts))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}/comments", rejection(ServerError))]
struct PostCommentsPath {
    id: Id<PostMarker>,
}

async fn list_comments(
    PostCommentsPath { id }: PostCommentsPath,
    State(store): State<Arc<dyn Store>>,
) -> Result<Json<Vec<Comment>>> {
    if store.fetch_post(id).await?.is_none() {
        return Err(ServerError::PostByIdNotFound(id));
    }

    let comments = store.list_post_comments(id).await?;

    Ok(Json(comments))
}

#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    pub content: CommentContent,
}

#[derive(Debug, Serialize)]
pub struct CommentResponse {
    pub comment: Comment,
    pub tokens_earned: i64,
    pub token_balance: Option<i64>,
}

impl From<ops::CreatedComment> for CommentResponse {
    fn from(created: ops::CreatedComment) -> Self {
        Self {
            comment: created.comment,
            tokens_earned: created.tokens_earned,
            token_balance: created.token_balance,
        }
    }
}

async fn create_comment(
    PostCommentsPath { id }: PostCommentsPath,
    State(store): State<Arc<dyn Store>>,
    user: AuthenticatedUser,
    Json(request): Json<CommentRequest>,
) -> Result<Json<CommentResponse>> {
    let created =
        ops::create_comment(store.as_ref(), id, user.user_id(), request.content).await?;

    Ok(Json(created.into()))
}
