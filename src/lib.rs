//! # groupspace
//!
//! Client-side core for a social group-management application built on a
//! hosted backend-as-a-service: authentication, profiles, groups, posts and
//! follows.
//!
//! The interesting piece is [`auth::SessionSync`], which mirrors the auth
//! service's session stream into a published [`auth::AuthViewState`] and
//! drives login redirects. Everything under [`services`] is a thin typed
//! wrapper over one REST call each.

pub mod auth;
pub mod backend;
pub mod config;
pub mod nav;
pub mod services;

#[cfg(test)]
pub mod test_helpers;
