//! Follow graph between users (`follows` table).

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::require_auth;
use crate::backend::{BackendError, Query, Rest};

const TABLE: &str = "follows";

/// Row of the `follows` table: `follower_id` follows `following_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Follow {
    pub follower_id: String,
    pub following_id: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Serialize)]
struct NewFollow<'a> {
    follower_id: &'a str,
    following_id: &'a str,
}

/// # Errors
///
/// Returns an error if the caller is not signed in, tries to follow
/// themselves, or the insert fails.
pub async fn follow_user(rest: &Rest<'_>, follower_id: &str, following_id: &str) -> Result<Follow, BackendError> {
    require_auth(rest)?;
    if follower_id == following_id {
        return Err(BackendError::InvalidInput("cannot follow yourself".into()));
    }
    let follow: Follow = rest.insert(TABLE, &NewFollow { follower_id, following_id }).await?;
    tracing::info!(%follower_id, %following_id, "followed user");
    Ok(follow)
}

/// # Errors
///
/// Returns an error if the caller is not signed in or the delete fails.
pub async fn unfollow_user(rest: &Rest<'_>, follower_id: &str, following_id: &str) -> Result<(), BackendError> {
    require_auth(rest)?;
    rest.delete(
        TABLE,
        &Query::new()
            .eq("follower_id", follower_id)
            .eq("following_id", following_id),
    )
    .await?;
    tracing::info!(%follower_id, %following_id, "unfollowed user");
    Ok(())
}

/// Who follows `user_id`, newest first.
///
/// # Errors
///
/// Returns an error if the request fails.
pub async fn list_followers(rest: &Rest<'_>, user_id: &str) -> Result<Vec<Follow>, BackendError> {
    rest.select(
        TABLE,
        &Query::new()
            .select("*")
            .eq("following_id", user_id)
            .order("created_at", false),
    )
    .await
}

/// Whom `user_id` follows, newest first.
///
/// # Errors
///
/// Returns an error if the request fails.
pub async fn list_following(rest: &Rest<'_>, user_id: &str) -> Result<Vec<Follow>, BackendError> {
    rest.select(
        TABLE,
        &Query::new()
            .select("*")
            .eq("follower_id", user_id)
            .order("created_at", false),
    )
    .await
}

/// # Errors
///
/// Returns an error if the request fails.
pub async fn is_following(rest: &Rest<'_>, follower_id: &str, following_id: &str) -> Result<bool, BackendError> {
    let rows: Vec<Follow> = rest
        .select(
            TABLE,
            &Query::new()
                .select("*")
                .eq("follower_id", follower_id)
                .eq("following_id", following_id)
                .limit(1),
        )
        .await?;
    Ok(!rows.is_empty())
}

#[cfg(test)]
#[path = "follows_test.rs"]
mod tests;
