//! Groups and memberships (`groups`, `group_members` tables).

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::{clean_text, require_auth};
use crate::backend::{BackendError, Query, Rest};

const GROUPS: &str = "groups";
const MEMBERS: &str = "group_members";

pub const MAX_GROUP_NAME_LEN: usize = 100;
pub const MAX_GROUP_DESCRIPTION_LEN: usize = 1000;

/// Row of the `groups` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub created_by: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    Admin,
    Member,
}

/// Row of the `group_members` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMember {
    pub group_id: Uuid,
    pub user_id: String,
    pub role: MemberRole,
    #[serde(with = "time::serde::rfc3339")]
    pub joined_at: OffsetDateTime,
}

#[derive(Serialize)]
struct NewGroup<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    created_by: &'a str,
}

#[derive(Serialize)]
struct NewMember<'a> {
    group_id: Uuid,
    user_id: &'a str,
    role: MemberRole,
}

/// All groups visible to the caller, newest first.
///
/// # Errors
///
/// Returns an error if the request fails.
pub async fn list_groups(rest: &Rest<'_>) -> Result<Vec<Group>, BackendError> {
    rest.select(GROUPS, &Query::new().select("*").order("created_at", false))
        .await
}

/// # Errors
///
/// Returns an error if the request fails.
pub async fn fetch_group(rest: &Rest<'_>, group_id: Uuid) -> Result<Option<Group>, BackendError> {
    let rows: Vec<Group> = rest
        .select(GROUPS, &Query::new().select("*").eq("id", group_id).limit(1))
        .await?;
    Ok(rows.into_iter().next())
}

/// Create a group and enroll its creator as admin.
///
/// # Errors
///
/// Returns an error if the caller is not signed in, the name is blank or too
/// long, or either insert fails. When enrolling the creator fails, the new
/// group row is deleted again before the error is returned.
pub async fn create_group(
    rest: &Rest<'_>,
    creator_id: &str,
    name: &str,
    description: Option<&str>,
) -> Result<Group, BackendError> {
    require_auth(rest)?;
    let name = clean_text("group name", name, MAX_GROUP_NAME_LEN)?;
    let description = description
        .filter(|d| !d.trim().is_empty())
        .map(|d| clean_text("group description", d, MAX_GROUP_DESCRIPTION_LEN))
        .transpose()?;

    let group: Group = rest
        .insert(GROUPS, &NewGroup { name: &name, description: description.as_deref(), created_by: creator_id })
        .await?;
    let enrolled: Result<GroupMember, _> = rest
        .insert(MEMBERS, &NewMember { group_id: group.id, user_id: creator_id, role: MemberRole::Admin })
        .await;
    if let Err(err) = enrolled {
        // Roll back the group row; the enrollment error is what the caller sees.
        match rest.delete(GROUPS, &Query::new().eq("id", group.id)).await {
            Ok(()) => tracing::warn!(group_id = %group.id, error = %err, "admin enrollment failed; group removed"),
            Err(cleanup) => tracing::error!(
                group_id = %group.id,
                error = %err,
                cleanup_error = %cleanup,
                "admin enrollment failed; orphan group left behind"
            ),
        }
        return Err(err);
    }

    tracing::info!(group_id = %group.id, %creator_id, "group created");
    Ok(group)
}

/// # Errors
///
/// Returns an error if the caller is not signed in or the insert fails
/// (including when already a member).
pub async fn join_group(rest: &Rest<'_>, group_id: Uuid, user_id: &str) -> Result<GroupMember, BackendError> {
    require_auth(rest)?;
    let member: GroupMember = rest
        .insert(MEMBERS, &NewMember { group_id, user_id, role: MemberRole::Member })
        .await?;
    tracing::info!(%group_id, %user_id, "joined group");
    Ok(member)
}

/// # Errors
///
/// Returns an error if the caller is not signed in or the delete fails.
pub async fn leave_group(rest: &Rest<'_>, group_id: Uuid, user_id: &str) -> Result<(), BackendError> {
    require_auth(rest)?;
    rest.delete(MEMBERS, &Query::new().eq("group_id", group_id).eq("user_id", user_id))
        .await?;
    tracing::info!(%group_id, %user_id, "left group");
    Ok(())
}

/// Members of a group in join order.
///
/// # Errors
///
/// Returns an error if the request fails.
pub async fn list_members(rest: &Rest<'_>, group_id: Uuid) -> Result<Vec<GroupMember>, BackendError> {
    rest.select(
        MEMBERS,
        &Query::new()
            .select("*")
            .eq("group_id", group_id)
            .order("joined_at", true),
    )
    .await
}

/// # Errors
///
/// Returns an error if the request fails.
pub async fn is_member(rest: &Rest<'_>, group_id: Uuid, user_id: &str) -> Result<bool, BackendError> {
    let rows: Vec<GroupMember> = rest
        .select(
            MEMBERS,
            &Query::new()
                .select("*")
                .eq("group_id", group_id)
                .eq("user_id", user_id)
                .limit(1),
        )
        .await?;
    Ok(!rows.is_empty())
}

#[cfg(test)]
#[path = "groups_test.rs"]
mod tests;
