//! `ListItemGateway`: every read and write against the remote list store.
//!
//! # Design
//! The gateway pairs the I/O-free `ListClient` with a `Transport`. Each
//! primitive is a single round-trip; failures are classified into the
//! `StoreError` taxonomy (reads → `Query`, writes → `Write`, a stale tag →
//! `ConcurrencyConflict`) and returned without retrying.
//!
//! The composite flows (`read_latest`, `update_latest`, `delete_latest`) are
//! a fixed pipeline of awaited steps: latest id → read with version tag →
//! conditional write. What one step learns is carried to the next as a
//! `LatestItem` value; the gateway itself holds no per-flow state, so two
//! flows running at once cannot see each other's identifiers or tags.

use tracing::{debug, info, warn};

use crate::client::ListClient;
use crate::error::{ApiError, StoreError, StoreResult};
use crate::http::{HttpRequest, HttpResponse};
use crate::transport::Transport;
use crate::types::{ItemUpdate, ListItem, NewItem, VersionTag};

/// Progress points of a composite flow, reported before each remote call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowStep {
    /// Looking up the most recent item. Always the first step of a flow.
    Resolving,
    /// Fetching the item found by `Resolving`.
    Loading { id: u64 },
    /// About to delete the item.
    Deleting { id: u64 },
}

/// Receives `FlowStep`s while a composite flow runs.
pub trait FlowObserver: Send + Sync {
    fn on_step(&self, step: FlowStep);
}

impl FlowObserver for () {
    fn on_step(&self, _step: FlowStep) {}
}

/// Snapshot of the latest item together with the tag that guards writes to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LatestItem {
    pub item: ListItem,
    pub version: VersionTag,
}

/// Mediates all store access for one list.
#[derive(Debug, Clone)]
pub struct ListItemGateway<T> {
    client: ListClient,
    transport: T,
}

impl<T: Transport> ListItemGateway<T> {
    pub fn new(client: ListClient, transport: T) -> Self {
        Self { client, transport }
    }

    pub fn client(&self) -> &ListClient {
        &self.client
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        debug!(
            list = self.client.list_name(),
            method = request.method.as_str(),
            path = %request.path,
            "store request"
        );
        let response = self.transport.execute(request).await?;
        debug!(status = response.status, "store response");
        Ok(response)
    }

    /// Identifier of the most recently created item, `None` for an empty list.
    pub async fn get_latest_item_id(&self) -> StoreResult<Option<u64>> {
        let response = self
            .send(self.client.build_latest_item_id())
            .await
            .map_err(StoreError::Query)?;
        self.client
            .parse_latest_item_id(response)
            .map_err(StoreError::Query)
    }

    pub async fn create_item(&self, title: &str) -> StoreResult<ListItem> {
        let request = self
            .client
            .build_create_item(&NewItem {
                title: title.to_string(),
            })
            .map_err(StoreError::Write)?;
        let response = self.send(request).await.map_err(StoreError::Write)?;
        let item = self
            .client
            .parse_create_item(response)
            .map_err(StoreError::Write)?;
        info!(id = item.id, "item created");
        Ok(item)
    }

    pub async fn read_item(&self, id: u64) -> StoreResult<ListItem> {
        let response = self
            .send(self.client.build_get_item(id))
            .await
            .map_err(StoreError::Query)?;
        self.client.parse_get_item(response).map_err(StoreError::Query)
    }

    /// Read an item together with its current version tag.
    pub async fn read_item_with_version(&self, id: u64) -> StoreResult<(ListItem, VersionTag)> {
        let response = self
            .send(self.client.build_get_item_with_version(id))
            .await
            .map_err(StoreError::Query)?;
        self.client
            .parse_get_item_with_version(response)
            .map_err(StoreError::Query)
    }

    /// Change the title, provided `version` is still the item's current tag.
    pub async fn update_item(&self, id: u64, title: &str, version: &VersionTag) -> StoreResult<()> {
        let input = ItemUpdate {
            title: Some(title.to_string()),
        };
        let request = self
            .client
            .build_update_item(id, &input, version)
            .map_err(StoreError::Write)?;
        let response = self
            .send(request)
            .await
            .map_err(|e| StoreError::from_write(id, e))?;
        self.client
            .parse_update_item(response)
            .map_err(|e| StoreError::from_write(id, e))
            .inspect_err(|e| log_write_failure("update", id, e))?;
        info!(id, "item updated");
        Ok(())
    }

    /// Remove the item, provided `version` is still the item's current tag.
    pub async fn delete_item(&self, id: u64, version: &VersionTag) -> StoreResult<()> {
        let response = self
            .send(self.client.build_delete_item(id, version))
            .await
            .map_err(|e| StoreError::from_write(id, e))?;
        self.client
            .parse_delete_item(response)
            .map_err(|e| StoreError::from_write(id, e))
            .inspect_err(|e| log_write_failure("delete", id, e))?;
        info!(id, "item deleted");
        Ok(())
    }

    async fn resolve_latest(&self, observer: &dyn FlowObserver) -> StoreResult<u64> {
        observer.on_step(FlowStep::Resolving);
        self.get_latest_item_id().await?.ok_or(StoreError::EmptyList)
    }

    async fn load_latest(&self, observer: &dyn FlowObserver) -> StoreResult<LatestItem> {
        let id = self.resolve_latest(observer).await?;
        observer.on_step(FlowStep::Loading { id });
        let (item, version) = self.read_item_with_version(id).await?;
        Ok(LatestItem { item, version })
    }

    /// Latest id → read.
    pub async fn read_latest(&self, observer: &dyn FlowObserver) -> StoreResult<ListItem> {
        let id = self.resolve_latest(observer).await?;
        observer.on_step(FlowStep::Loading { id });
        self.read_item(id).await
    }

    /// Latest id → read with tag → conditional update. Returns the id updated.
    pub async fn update_latest(&self, title: &str, observer: &dyn FlowObserver) -> StoreResult<u64> {
        let latest = self.load_latest(observer).await?;
        self.update_item(latest.item.id, title, &latest.version).await?;
        Ok(latest.item.id)
    }

    /// Latest id → read with tag → conditional delete. Returns the id deleted.
    pub async fn delete_latest(&self, observer: &dyn FlowObserver) -> StoreResult<u64> {
        let latest = self.load_latest(observer).await?;
        observer.on_step(FlowStep::Deleting { id: latest.item.id });
        self.delete_item(latest.item.id, &latest.version).await?;
        Ok(latest.item.id)
    }
}

fn log_write_failure(action: &str, id: u64, err: &StoreError) {
    if err.is_conflict() {
        warn!(id, action, "version tag is stale");
    } else {
        warn!(id, action, error = %err, "write failed");
    }
}
