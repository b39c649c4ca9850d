//! Data services over the backend's REST tables.
//!
//! ARCHITECTURE
//! ============
//! Each module wraps the calls for one table family and nothing else: no
//! caching, no retries. Input that the tables would reject anyway (blank
//! names, self-follows) is refused locally so the caller gets a readable
//! error without a round trip.

pub mod follows;
pub mod groups;
pub mod posts;
pub mod profiles;

use crate::backend::{BackendError, Rest};

/// Writes need a signed-in caller; row-level security would reject them anyway.
pub(crate) fn require_auth(rest: &Rest<'_>) -> Result<(), BackendError> {
    if rest.is_authenticated() { Ok(()) } else { Err(BackendError::NoSession) }
}

/// Trim `raw` and check it is non-empty and at most `max_chars` long.
pub(crate) fn clean_text(field: &str, raw: &str, max_chars: usize) -> Result<String, BackendError> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(BackendError::InvalidInput(format!("{field} must not be empty")));
    }
    if text.chars().count() > max_chars {
        return Err(BackendError::InvalidInput(format!("{field} must be at most {max_chars} characters")));
    }
    Ok(text.to_string())
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
