//! In-memory list store with per-item version tags.
//!
//! Identifiers are allocated per list from a counter that only moves
//! forward, so a deleted id is never handed out again. Every successful
//! write bumps the item's version, which changes its entity tag.

use std::collections::{BTreeMap, HashMap};

use thiserror::Error;

/// `If-Match` value that matches any existing revision.
pub const ANY_TAG: &str = "*";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredItem {
    pub id: u64,
    pub title: String,
    pub version: u64,
}

impl StoredItem {
    /// Quoted entity tag for the current revision.
    pub fn etag(&self) -> String {
        format!("\"{}\"", self.version)
    }

    fn matches(&self, if_match: &str) -> bool {
        if_match.trim() == ANY_TAG || if_match.trim() == self.etag()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Fault {
    #[error("list '{0}' does not exist")]
    ListNotFound(String),

    #[error("item {0} does not exist")]
    ItemNotFound(u64),

    #[error("the version tag does not match item {0}")]
    PreconditionFailed(u64),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortField {
    Id,
    Title,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Order {
    pub field: SortField,
    pub descending: bool,
}

impl Default for Order {
    fn default() -> Self {
        Self {
            field: SortField::Id,
            descending: false,
        }
    }
}

#[derive(Debug, Default)]
struct ItemList {
    last_id: u64,
    items: BTreeMap<u64, StoredItem>,
}

/// All lists, keyed by lowercase title.
#[derive(Debug, Default)]
pub struct Store {
    lists: HashMap<String, ItemList>,
}

fn key(list: &str) -> String {
    list.to_lowercase()
}

impl Store {
    pub fn with_lists<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let lists = names
            .into_iter()
            .map(|name| (key(name.as_ref()), ItemList::default()))
            .collect();
        Self { lists }
    }

    fn list(&self, list: &str) -> Result<&ItemList, Fault> {
        self.lists
            .get(&key(list))
            .ok_or_else(|| Fault::ListNotFound(list.to_string()))
    }

    fn list_mut(&mut self, list: &str) -> Result<&mut ItemList, Fault> {
        self.lists
            .get_mut(&key(list))
            .ok_or_else(|| Fault::ListNotFound(list.to_string()))
    }

    pub fn query(&self, list: &str, order: Order, top: Option<usize>) -> Result<Vec<StoredItem>, Fault> {
        let mut items: Vec<StoredItem> = self.list(list)?.items.values().cloned().collect();
        match order.field {
            SortField::Id => {}
            SortField::Title => items.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id))),
        }
        if order.descending {
            items.reverse();
        }
        if let Some(top) = top {
            items.truncate(top);
        }
        Ok(items)
    }

    pub fn get(&self, list: &str, id: u64) -> Result<StoredItem, Fault> {
        self.list(list)?
            .items
            .get(&id)
            .cloned()
            .ok_or(Fault::ItemNotFound(id))
    }

    pub fn create(&mut self, list: &str, title: String) -> Result<StoredItem, Fault> {
        let list = self.list_mut(list)?;
        list.last_id += 1;
        let item = StoredItem {
            id: list.last_id,
            title,
            version: 1,
        };
        list.items.insert(item.id, item.clone());
        Ok(item)
    }

    /// Apply a change if `if_match` names the item's current revision. A
    /// missing item fails the precondition rather than reporting 404.
    pub fn update(
        &mut self,
        list: &str,
        id: u64,
        if_match: &str,
        title: Option<String>,
    ) -> Result<StoredItem, Fault> {
        let item = self
            .list_mut(list)?
            .items
            .get_mut(&id)
            .ok_or(Fault::PreconditionFailed(id))?;
        if !item.matches(if_match) {
            return Err(Fault::PreconditionFailed(id));
        }
        if let Some(title) = title {
            item.title = title;
        }
        item.version += 1;
        Ok(item.clone())
    }

    pub fn delete(&mut self, list: &str, id: u64, if_match: &str) -> Result<(), Fault> {
        let items = &mut self.list_mut(list)?.items;
        if !items.get(&id).is_some_and(|item| item.matches(if_match)) {
            return Err(Fault::PreconditionFailed(id));
        }
        items.remove(&id);
        Ok(())
    }
}
