//! Friends and list sharing endpoints.

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    Extension, Json,
};

use super::{ApiResult, MessageResponse};
use crate::auth::Identity;
use crate::models::{FriendQuery, FriendRequest, ShareListRequest, SharedListInfo, UserRecord};
use crate::AppState;

/// GET /api/friends
pub async fn list_friends(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> ApiResult<Json<Vec<UserRecord>>> {
    let user_id = identity.user_id()?;
    Ok(Json(state.social.friends(user_id).await?))
}

/// POST /api/friends/add - Befriend another user; both sides see it at once.
pub async fn add_friend(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    payload: Result<Json<FriendRequest>, JsonRejection>,
) -> ApiResult<Json<MessageResponse>> {
    let user_id = identity.user_id()?;
    let Json(request) = payload?;
    state.social.add_friend(user_id, &request.friend_id).await?;
    Ok(Json(MessageResponse::new("Friend added")))
}

/// DELETE /api/friends/remove?friend_id=
pub async fn remove_friend(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<FriendQuery>,
) -> ApiResult<Json<MessageResponse>> {
    let user_id = identity.user_id()?;
    state.social.remove_friend(user_id, &query.friend_id).await?;
    Ok(Json(MessageResponse::new("Friend removed")))
}

/// GET /api/shared-lists - Lists other users shared with the caller.
pub async fn shared_lists(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> ApiResult<Json<Vec<SharedListInfo>>> {
    let user_id = identity.user_id()?;
    Ok(Json(state.social.shared_lists(user_id).await?))
}

/// POST /api/share-list
pub async fn share_list(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    payload: Result<Json<ShareListRequest>, JsonRejection>,
) -> ApiResult<Json<MessageResponse>> {
    let user_id = identity.user_id()?;
    let Json(request) = payload?;
    state
        .social
        .share_list(user_id, &request.friend_id, &request.category)
        .await?;
    Ok(Json(MessageResponse::new("List shared")))
}
