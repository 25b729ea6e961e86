//! Domain DTOs for the list store API.
//!
//! # Design
//! These types mirror the mock-server's schema but are defined independently;
//! integration tests catch drift between the two crates. Field names on the
//! wire follow the store's casing (`Id`, `Title`), Rust names stay snake_case.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A single list item as returned by the store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ListItem {
    #[serde(rename = "Id")]
    pub id: u64,
    #[serde(rename = "Title")]
    pub title: String,
}

impl fmt::Display for ListItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.title, self.id)
    }
}

/// Opaque entity tag issued by the store for one revision of an item.
///
/// Only ever echoed back in `If-Match`; never parsed or compared locally.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionTag(String);

impl VersionTag {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VersionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Request payload for creating a new item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewItem {
    #[serde(rename = "Title")]
    pub title: String,
}

/// Request payload for changing an existing item. Omitted fields stay
/// unchanged on the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemUpdate {
    #[serde(rename = "Title", skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// Envelope the store wraps collection results in.
#[derive(Debug, Deserialize)]
pub(crate) struct Collection<T> {
    pub value: Vec<T>,
}

/// Projection returned by the latest-id query (`$select=Id`).
#[derive(Debug, Deserialize)]
pub(crate) struct IdOnly {
    #[serde(rename = "Id")]
    pub id: u64,
}

/// An item read with minimal metadata.
#[derive(Debug, Deserialize)]
pub(crate) struct ItemWithMetadata {
    #[serde(flatten)]
    pub item: ListItem,
    #[serde(rename = "odata.etag")]
    pub etag: Option<String>,
}
