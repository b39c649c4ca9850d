//! Table access over the backend's PostgREST-style REST API.

use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::{BackendClient, BackendError, send, send_json};

/// Query-string builder using PostgREST filter syntax (`column=eq.value`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    params: Vec<(String, String)>,
}

impl Query {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn select(mut self, columns: &str) -> Self {
        self.params.push(("select".into(), columns.into()));
        self
    }

    #[must_use]
    pub fn eq(mut self, column: &str, value: impl std::fmt::Display) -> Self {
        self.params.push((column.into(), format!("eq.{value}")));
        self
    }

    #[must_use]
    pub fn order(mut self, column: &str, ascending: bool) -> Self {
        let direction = if ascending { "asc" } else { "desc" };
        self.params.push(("order".into(), format!("{column}.{direction}")));
        self
    }

    #[must_use]
    pub fn limit(mut self, n: usize) -> Self {
        self.params.push(("limit".into(), n.to_string()));
        self
    }

    #[must_use]
    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    fn has_filter(&self) -> bool {
        self.params
            .iter()
            .any(|(key, _)| !matches!(key.as_str(), "select" | "order" | "limit"))
    }
}

/// REST calls made on behalf of one caller.
#[derive(Debug, Clone, Copy)]
pub struct Rest<'a> {
    client: &'a BackendClient,
    token: Option<&'a str>,
}

impl<'a> Rest<'a> {
    pub(crate) fn new(client: &'a BackendClient, token: Option<&'a str>) -> Self {
        Self { client, token }
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// # Errors
    ///
    /// Returns an error if the request fails or rows cannot be decoded.
    pub async fn select<T: DeserializeOwned>(&self, table: &str, query: &Query) -> Result<Vec<T>, BackendError> {
        let builder = self
            .client
            .request(Method::GET, &self.client.rest_endpoint(table), self.token)
            .query(query.params());
        send_json(builder).await
    }

    /// Insert one row and return the stored representation.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the backend returns no row.
    pub async fn insert<B, T>(&self, table: &str, body: &B) -> Result<T, BackendError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let builder = self
            .client
            .request(Method::POST, &self.client.rest_endpoint(table), self.token)
            .header("Prefer", "return=representation")
            .json(body);
        let rows: Vec<T> = send_json(builder).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| BackendError::Parse(format!("insert into {table} returned no rows")))
    }

    /// Patch every row matching `query` and return the updated rows.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, or before sending if `query` has
    /// no filter (an unfiltered update would touch the whole table).
    pub async fn update<B, T>(&self, table: &str, query: &Query, body: &B) -> Result<Vec<T>, BackendError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        if !query.has_filter() {
            return Err(BackendError::InvalidInput(format!("refusing unfiltered update on {table}")));
        }
        let builder = self
            .client
            .request(Method::PATCH, &self.client.rest_endpoint(table), self.token)
            .header("Prefer", "return=representation")
            .query(query.params())
            .json(body);
        send_json(builder).await
    }

    /// Delete every row matching `query`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, or before sending if `query` has
    /// no filter.
    pub async fn delete(&self, table: &str, query: &Query) -> Result<(), BackendError> {
        if !query.has_filter() {
            return Err(BackendError::InvalidInput(format!("refusing unfiltered delete on {table}")));
        }
        let builder = self
            .client
            .request(Method::DELETE, &self.client.rest_endpoint(table), self.token)
            .query(query.params());
        let (status, body) = send(builder).await?;
        if !(200..300).contains(&status) {
            return Err(BackendError::from_response(status, &body));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "rest_test.rs"]
mod tests;
