//! Group posts (`posts` table).

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::{clean_text, require_auth};
use crate::backend::{BackendError, Query, Rest};

const TABLE: &str = "posts";

pub const MAX_POST_LEN: usize = 5000;

/// Row of the `posts` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub group_id: Uuid,
    pub author_id: String,
    pub content: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Serialize)]
struct NewPost<'a> {
    group_id: Uuid,
    author_id: &'a str,
    content: &'a str,
}

/// Posts in a group, newest first, optionally capped at `limit`.
///
/// # Errors
///
/// Returns an error if the request fails.
pub async fn list_group_posts(rest: &Rest<'_>, group_id: Uuid, limit: Option<usize>) -> Result<Vec<Post>, BackendError> {
    let mut query = Query::new()
        .select("*")
        .eq("group_id", group_id)
        .order("created_at", false);
    if let Some(n) = limit {
        query = query.limit(n);
    }
    rest.select(TABLE, &query).await
}

/// # Errors
///
/// Returns an error if the caller is not signed in, the content is blank or
/// too long, or the insert fails.
pub async fn create_post(rest: &Rest<'_>, group_id: Uuid, author_id: &str, content: &str) -> Result<Post, BackendError> {
    require_auth(rest)?;
    let content = clean_text("post content", content, MAX_POST_LEN)?;
    let post: Post = rest
        .insert(TABLE, &NewPost { group_id, author_id, content: &content })
        .await?;
    tracing::info!(post_id = %post.id, %group_id, %author_id, "post created");
    Ok(post)
}

/// # Errors
///
/// Returns an error if the caller is not signed in or the delete fails.
pub async fn delete_post(rest: &Rest<'_>, post_id: Uuid) -> Result<(), BackendError> {
    require_auth(rest)?;
    rest.delete(TABLE, &Query::new().eq("id", post_id)).await?;
    tracing::info!(%post_id, "post deleted");
    Ok(())
}

#[cfg(test)]
#[path = "posts_test.rs"]
mod tests;
