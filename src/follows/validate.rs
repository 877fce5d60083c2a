//! The follow creation chain: resolve the target, stamp the follower, then
//! reject self-follows and duplicates. Nothing is written here; the caller
//! persists the returned [`NewFollow`] and the store's unique constraint
//! settles any race between the duplicate check and the insert.

use crate::{
    auth::AuthUser,
    error::AppError,
    follows::{FollowPayload, NewFollow},
    store::Store,
};

pub const SELF_FOLLOW: &str = "You cannot follow yourself";
pub const ALREADY_FOLLOWING: &str = "You are already following this user";

pub async fn validate_follow(
    store: &dyn Store,
    actor: &AuthUser,
    payload: FollowPayload,
) -> Result<NewFollow, AppError> {
    let following = store
        .find_user_by_username(payload.following.trim())
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))?;

    let new_follow = NewFollow {
        user_id: actor.id,
        following_id: following.id,
    };

    if new_follow.user_id == new_follow.following_id {
        return Err(AppError::BadRequest(SELF_FOLLOW.to_string()));
    }

    if store
        .follow_exists(new_follow.user_id, new_follow.following_id)
        .await?
    {
        return Err(AppError::BadRequest(ALREADY_FOLLOWING.to_string()));
    }

    Ok(new_follow)
}
