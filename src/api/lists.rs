//! Shopping list endpoints.

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Extension, Json,
};

use super::{ApiResult, MessageResponse};
use crate::auth::Identity;
use crate::db::keys::SHAREABLE_CATEGORY;
use crate::models::{BuyRequest, CategoryQuery, EditQuery, ListItem};
use crate::AppState;

/// GET /list?category= - Items of one category.
///
/// A logged-in user asking for the shareable list also sees the lists
/// friends have shared with them.
pub async fn list_items(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<CategoryQuery>,
) -> ApiResult<Json<Vec<ListItem>>> {
    let items = match &identity.user {
        Some(user) if query.category == SHAREABLE_CATEGORY => {
            state.social.shared_view(&state.lists, &user.user_id).await?
        }
        _ => state.lists.list(&identity.owner, &query.category).await?,
    };
    Ok(Json(items))
}

/// POST /add - Append an item.
pub async fn add_item(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    payload: Result<Json<ListItem>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<MessageResponse>)> {
    let Json(item) = payload?;
    state.lists.add(&identity.owner, item).await?;
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new("Item added successfully")),
    ))
}

/// PUT /buy/{name} - Set the bought flag of the first item with that name.
pub async fn buy_item(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(name): Path<String>,
    payload: Result<Json<BuyRequest>, JsonRejection>,
) -> ApiResult<StatusCode> {
    let Json(request) = payload?;
    let updated = state
        .lists
        .set_bought(&identity.owner, &request.category, &name, request.bought)
        .await?;
    if !updated {
        tracing::debug!(owner = %identity.owner, name = %name, "No item to mark as bought");
    }
    Ok(StatusCode::OK)
}

/// DELETE /delete/{name}?category= - Remove every item with that name.
pub async fn delete_item(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(name): Path<String>,
    Query(query): Query<CategoryQuery>,
) -> ApiResult<StatusCode> {
    state
        .lists
        .remove(&identity.owner, &query.category, &name)
        .await?;
    Ok(StatusCode::OK)
}

/// PUT /edit/{name}?oldCategory= - Replace an item, possibly moving it.
pub async fn edit_item(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(name): Path<String>,
    Query(query): Query<EditQuery>,
    payload: Result<Json<ListItem>, JsonRejection>,
) -> ApiResult<StatusCode> {
    let Json(item) = payload?;
    state
        .lists
        .edit(&identity.owner, &name, &query.old_category, item)
        .await?;
    Ok(StatusCode::OK)
}

/// POST /reorder - Replace a category with the given sequence.
pub async fn reorder_items(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    payload: Result<Json<Vec<ListItem>>, JsonRejection>,
) -> ApiResult<StatusCode> {
    let Json(items) = payload?;
    state.lists.reorder(&identity.owner, items).await?;
    Ok(StatusCode::OK)
}
