//! User profiles (`profiles` table), keyed by auth user id.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::{clean_text, require_auth};
use crate::backend::{BackendError, Query, Rest};

const TABLE: &str = "profiles";

pub const MAX_USERNAME_LEN: usize = 30;
pub const MAX_DISPLAY_NAME_LEN: usize = 80;
pub const MAX_BIO_LEN: usize = 500;

/// Row of the `profiles` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Profile fields to change. `None` leaves a column untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
}

impl ProfileUpdate {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.username.is_none() && self.display_name.is_none() && self.avatar_url.is_none() && self.bio.is_none()
    }

    /// Trim and bound every set field.
    fn validated(&self) -> Result<Self, BackendError> {
        let username = match &self.username {
            Some(raw) => Some(validate_username(raw)?),
            None => None,
        };
        let display_name = self
            .display_name
            .as_deref()
            .map(|raw| clean_text("display name", raw, MAX_DISPLAY_NAME_LEN))
            .transpose()?;
        // An empty bio clears it; only the upper bound applies.
        let bio = match self.bio.as_deref().map(str::trim) {
            Some(text) if text.chars().count() > MAX_BIO_LEN => {
                return Err(BackendError::InvalidInput(format!("bio must be at most {MAX_BIO_LEN} characters")));
            }
            other => other.map(str::to_string),
        };
        let avatar_url = self.avatar_url.as_deref().map(|u| u.trim().to_string());
        Ok(Self { username, display_name, avatar_url, bio })
    }
}

/// Usernames are 3 to 30 ASCII letters, digits or underscores.
///
/// # Errors
///
/// Returns `InvalidInput` describing the first rule broken.
pub fn validate_username(raw: &str) -> Result<String, BackendError> {
    let name = raw.trim();
    if name.len() < 3 || name.len() > MAX_USERNAME_LEN {
        return Err(BackendError::InvalidInput(format!(
            "username must be 3 to {MAX_USERNAME_LEN} characters"
        )));
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(BackendError::InvalidInput(
            "username may only contain letters, digits and underscores".into(),
        ));
    }
    Ok(name.to_string())
}

/// # Errors
///
/// Returns an error if the request fails.
pub async fn fetch_profile(rest: &Rest<'_>, user_id: &str) -> Result<Option<Profile>, BackendError> {
    let rows: Vec<Profile> = rest
        .select(TABLE, &Query::new().select("*").eq("id", user_id).limit(1))
        .await?;
    Ok(rows.into_iter().next())
}

/// # Errors
///
/// Returns an error if the caller is not signed in, the update is invalid,
/// or the profile does not exist.
pub async fn update_profile(rest: &Rest<'_>, user_id: &str, update: &ProfileUpdate) -> Result<Profile, BackendError> {
    require_auth(rest)?;
    if update.is_empty() {
        return Err(BackendError::InvalidInput("nothing to update".into()));
    }
    let body = update.validated()?;

    let rows: Vec<Profile> = rest.update(TABLE, &Query::new().eq("id", user_id), &body).await?;
    let profile = rows
        .into_iter()
        .next()
        .ok_or_else(|| BackendError::NotFound(format!("profile {user_id}")))?;
    tracing::info!(%user_id, "profile updated");
    Ok(profile)
}

#[cfg(test)]
#[path = "profiles_test.rs"]
mod tests;
