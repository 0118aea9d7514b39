use crate::server::{
    Result, ServerError, ServerRouter,
    auth::AuthenticatedUser,
    json::Json,
    routes::posts::{CommentRequest, CommentResponse},
};
use axum::extract::State;
use axum_extra::routing::{RouterExt, TypedPath};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use ventwall_common::model::{Id, comment::CommentMarker};
use ventwall_db::{Store, ops};

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_post(reply)
        .typed_delete(delete_comment)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/comments/{id}/reply", rejection(ServerError))]
struct ReplyPath {
    id: Id<CommentMarker>,
}

async fn reply(
    ReplyPath { id }: ReplyPath,
    State(store): State<Arc<dyn Store>>,
    user: AuthenticatedUser,
    Json(request): Json<CommentRequest>,
) -> Result<Json<CommentResponse>> {
    let created = ops::create_reply(store.as_ref(), id, user.user_id(), request.content).await?;

    Ok(Json(created.into()))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/comments/{id}", rejection(ServerError))]
struct CommentPath {
    id: Id<CommentMarker>,
}

#[derive(Debug, Serialize)]
struct DeletedResponse {
    deleted: bool,
}

async fn delete_comment(
    CommentPath { id }: CommentPath,
    State(store): State<Arc<dyn Store>>,
    user: AuthenticatedUser,
) -> Result<Json<DeletedResponse>> {
    let Some(comment) = store.fetch_comment(id).await? else {
        return Ok(Json(DeletedResponse { deleted: false }));
    };

    if comment.author != user.user_id() && !user.is_admin() {
        return Err(ServerError::Forbidden);
    }

    let deleted = ops::delete_comment(store.as_ref(), id).await?;

    Ok(Json(DeletedResponse { deleted }))
}
