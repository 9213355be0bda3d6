//! User directory endpoints.

use axum::{
    extract::{Query, State},
    Extension, Json,
};

use super::ApiResult;
use crate::auth::Identity;
use crate::errors::AppError;
use crate::models::{SearchQuery, UserRecord};
use crate::AppState;

/// GET /api/user - The logged-in user.
pub async fn current_user(Extension(identity): Extension<Identity>) -> ApiResult<Json<UserRecord>> {
    let user = identity
        .user
        .ok_or_else(|| AppError::Unauthorized("Login required".to_string()))?;
    Ok(Json(UserRecord {
        id: user.user_id,
        name: user.name,
        email: user.email,
    }))
}

/// GET /api/users/search?q= - Non-friends matching a name or email fragment.
pub async fn search_users(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<Vec<UserRecord>>> {
    let user_id = identity.user_id()?;
    Ok(Json(state.social.search_users(user_id, &query.q).await?))
}

/// GET /api/users/all - Every known user who is neither the caller nor a friend.
pub async fn all_users(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> ApiResult<Json<Vec<UserRecord>>> {
    let user_id = identity.user_id()?;
    Ok(Json(state.social.other_users(user_id).await?))
}
