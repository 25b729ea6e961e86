//! Presentation glue: four triggers that run gateway flows and report status.
//!
//! # Design
//! `ListWidget` owns a `ListItemGateway` and a `WidgetHost` sink. Each
//! trigger is one `async fn` that pushes progress strings to the host and
//! converts every error into a final status message, so the widget stays
//! usable after any failure.
//!
//! Every action has its own in-flight flag. Triggering an action that is
//! already running reports that fact and returns `TriggerOutcome::Busy`
//! instead of starting an interleaved second flow.

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Local;
use tracing::{debug, info};

use crate::gateway::{FlowObserver, FlowStep, ListItemGateway};
use crate::transport::Transport;
use crate::types::ListItem;

pub const DELETE_PROMPT: &str = "Are you sure you want to delete the latest item?";

/// The surface a host page provides to the widget.
pub trait WidgetHost: Send + Sync {
    /// Replace the status text and the rendered item list.
    fn update_status(&self, status: &str, items: &[ListItem]);

    /// Ask the user to confirm a destructive action.
    fn confirm(&self, _prompt: &str) -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
}

impl Action {
    pub fn label(self) -> &'static str {
        match self {
            Action::Create => "Create item",
            Action::Read => "Read item",
            Action::Update => "Update item",
            Action::Delete => "Delete item",
        }
    }

    fn slot(self) -> usize {
        self as usize
    }
}

/// How a trigger ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    Completed,
    Failed,
    /// The same action was still running; nothing was sent.
    Busy,
    /// The user declined the confirmation prompt.
    Cancelled,
}

/// Render items the way the host lists them, one per line.
pub fn render_items(items: &[ListItem]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

pub struct ListWidget<T, H> {
    gateway: ListItemGateway<T>,
    host: H,
    in_flight: [AtomicBool; 4],
}

#[cfg(feature = "reqwest")]
impl<H: WidgetHost> ListWidget<crate::transport::ReqwestTransport, H> {
    /// Build a widget talking to the store described by `config`.
    pub fn connect(
        config: &crate::config::StoreConfig,
        host: H,
    ) -> Result<Self, crate::error::ApiError> {
        let transport = crate::transport::ReqwestTransport::new(config)?;
        let client = crate::client::ListClient::new(config.base_url(), config.list_name());
        Ok(Self::new(ListItemGateway::new(client, transport), host))
    }
}

impl<T: Transport, H: WidgetHost> ListWidget<T, H> {
    pub fn new(gateway: ListItemGateway<T>, host: H) -> Self {
        Self {
            gateway,
            host,
            in_flight: Default::default(),
        }
    }

    pub fn gateway(&self) -> &ListItemGateway<T> {
        &self.gateway
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// Title of the list this widget operates on.
    pub fn list_name(&self) -> &str {
        self.gateway.client().list_name()
    }

    /// Dispatch by action, as a host wiring buttons would.
    pub async fn trigger(&self, action: Action) -> TriggerOutcome {
        match action {
            Action::Create => self.create_item().await,
            Action::Read => self.read_item().await,
            Action::Update => self.update_item().await,
            Action::Delete => self.delete_item().await,
        }
    }

    fn status(&self, status: &str) {
        self.host.update_status(status, &[]);
    }

    fn begin(&self, action: Action) -> Option<InFlight<'_>> {
        let flag = &self.in_flight[action.slot()];
        if flag
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!(action = action.label(), "trigger ignored, already running");
            self.status(&format!("{} already in progress", action.label()));
            return None;
        }
        Some(InFlight(flag))
    }

    pub async fn create_item(&self) -> TriggerOutcome {
        let Some(_guard) = self.begin(Action::Create) else {
            return TriggerOutcome::Busy;
        };
        self.status("Creating item...");

        let title = format!("Item {}", timestamp());
        match self.gateway.create_item(&title).await {
            Ok(item) => {
                self.status(&format!(
                    "Item '{}' (ID: {}) successfully created",
                    item.title, item.id
                ));
                TriggerOutcome::Completed
            }
            Err(e) => {
                self.status(&format!("Error while creating the item: {e}"));
                TriggerOutcome::Failed
            }
        }
    }

    pub async fn read_item(&self) -> TriggerOutcome {
        let Some(_guard) = self.begin(Action::Read) else {
            return TriggerOutcome::Busy;
        };
        let progress = StatusProgress::new(&self.host, "Reading latest items...");
        match self.gateway.read_latest(&progress).await {
            Ok(item) => {
                self.host.update_status(
                    &format!("Item ID: {}, Title: {}", item.id, item.title),
                    std::slice::from_ref(&item),
                );
                TriggerOutcome::Completed
            }
            Err(e) => {
                self.status(&format!("Loading latest item failed with error: {e}"));
                TriggerOutcome::Failed
            }
        }
    }

    pub async fn update_item(&self) -> TriggerOutcome {
        let Some(_guard) = self.begin(Action::Update) else {
            return TriggerOutcome::Busy;
        };
        let title = format!("Updated Item {}", timestamp());
        let progress = StatusProgress::new(&self.host, "Loading latest items...");
        match self.gateway.update_latest(&title, &progress).await {
            Ok(id) => {
                self.status(&format!("Item with ID: {id} successfully updated"));
                TriggerOutcome::Completed
            }
            Err(e) => {
                self.status(&format!("Loading latest item failed with error: {e}"));
                TriggerOutcome::Failed
            }
        }
    }

    /// Confirmation is asked only once the delete slot is held.
    pub async fn delete_item(&self) -> TriggerOutcome {
        let Some(_guard) = self.begin(Action::Delete) else {
            return TriggerOutcome::Busy;
        };
        if !self.host.confirm(DELETE_PROMPT) {
            info!("delete cancelled by user");
            return TriggerOutcome::Cancelled;
        }

        let progress = StatusProgress::new(&self.host, "Loading latest items...");
        match self.gateway.delete_latest(&progress).await {
            Ok(id) => {
                self.status(&format!("Item with ID: {id} successfully deleted"));
                TriggerOutcome::Completed
            }
            Err(e) => {
                self.status(&format!("Error deleting item: {e}"));
                TriggerOutcome::Failed
            }
        }
    }
}

/// Clears an action's in-flight flag when the trigger returns.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Turns flow steps into the host's progress messages.
struct StatusProgress<'a, H> {
    host: &'a H,
    resolving: &'static str,
}

impl<'a, H> StatusProgress<'a, H> {
    fn new(host: &'a H, resolving: &'static str) -> Self {
        Self { host, resolving }
    }
}

impl<H: WidgetHost> FlowObserver for StatusProgress<'_, H> {
    fn on_step(&self, step: FlowStep) {
        match step {
            FlowStep::Resolving => self.host.update_status(self.resolving, &[]),
            FlowStep::Loading { id } => self
                .host
                .update_status(&format!("Loading information about item ID: {id}..."), &[]),
            FlowStep::Deleting { id } => self
                .host
                .update_status(&format!("Deleting item with ID: {id}..."), &[]),
        }
    }
}

fn timestamp() -> String {
    Local::now().format("%a %b %d %Y %H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    use super::*;
    use crate::client::ListClient;
    use crate::transport::testing::ScriptedTransport;

    #[derive(Default)]
    struct RecordingHost {
        statuses: Mutex<Vec<String>>,
        items: Mutex<Vec<ListItem>>,
        decline: bool,
        confirms: AtomicUsize,
    }

    impl RecordingHost {
        fn statuses(&self) -> Vec<String> {
            self.statuses.lock().unwrap().clone()
        }
    }

    impl WidgetHost for RecordingHost {
        fn update_status(&self, status: &str, items: &[ListItem]) {
            self.statuses.lock().unwrap().push(status.to_string());
            *self.items.lock().unwrap() = items.to_vec();
        }

        fn confirm(&self, _prompt: &str) -> bool {
            self.confirms.fetch_add(1, Ordering::SeqCst);
            !self.decline
        }
    }

    fn widget(
        transport: ScriptedTransport,
        host: RecordingHost,
    ) -> ListWidget<ScriptedTransport, RecordingHost> {
        let gateway = ListItemGateway::new(ListClient::new("http://store", "Items"), transport);
        ListWidget::new(gateway, host)
    }

    #[tokio::test]
    async fn create_reports_new_item() {
        let w = widget(
            ScriptedTransport::new().respond(201, r#"{"Id":1,"Title":"Item A"}"#),
            RecordingHost::default(),
        );
        assert_eq!(w.create_item().await, TriggerOutcome::Completed);
        assert_eq!(
            w.host().statuses(),
            vec![
                "Creating item...".to_string(),
                "Item 'Item A' (ID: 1) successfully created".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn read_on_empty_list_reports_empty_list() {
        let w = widget(
            ScriptedTransport::new().respond(200, r#"{"value":[]}"#),
            RecordingHost::default(),
        );
        assert_eq!(w.read_item().await, TriggerOutcome::Failed);
        assert_eq!(
            w.host().statuses().last().unwrap(),
            "Loading latest item failed with error: No items found in the list"
        );
        assert_eq!(w.gateway().transport().requests().len(), 1);
    }

    #[tokio::test]
    async fn read_renders_the_item() {
        let w = widget(
            ScriptedTransport::new()
                .respond(200, r#"{"value":[{"Id":4}]}"#)
                .respond(200, r#"{"Id":4,"Title":"Four"}"#),
            RecordingHost::default(),
        );
        assert_eq!(w.read_item().await, TriggerOutcome::Completed);
        assert_eq!(
            w.host().statuses(),
            vec![
                "Reading latest items...".to_string(),
                "Loading information about item ID: 4...".to_string(),
                "Item ID: 4, Title: Four".to_string(),
            ]
        );
        assert_eq!(render_items(&w.host().items.lock().unwrap()), "Four (4)");
    }

    #[tokio::test]
    async fn update_sends_generated_title() {
        let w = widget(
            ScriptedTransport::new()
                .respond(200, r#"{"value":[{"Id":7}]}"#)
                .respond(200, r#"{"odata.etag":"v1","Id":7,"Title":"Old"}"#)
                .respond(204, ""),
            RecordingHost::default(),
        );
        assert_eq!(w.update_item().await, TriggerOutcome::Completed);
        assert_eq!(
            w.host().statuses().last().unwrap(),
            "Item with ID: 7 successfully updated"
        );
    }

    #[tokio::test]
    async fn stale_update_reports_conflict() {
        let w = widget(
            ScriptedTransport::new()
                .respond(200, r#"{"value":[{"Id":7}]}"#)
                .respond(200, r#"{"odata.etag":"v1","Id":7,"Title":"Old"}"#)
                .respond(412, ""),
            RecordingHost::default(),
        );
        assert_eq!(w.update_item().await, TriggerOutcome::Failed);
        let last = w.host().statuses().last().unwrap().clone();
        assert!(last.starts_with("Loading latest item failed with error: item 7"));
    }

    #[tokio::test]
    async fn delete_walks_through_progress_messages() {
        let w = widget(
            ScriptedTransport::new()
                .respond(200, r#"{"value":[{"Id":2}]}"#)
                .respond(200, r#"{"odata.etag":"\"1\"","Id":2,"Title":"x"}"#)
                .respond(204, ""),
            RecordingHost::default(),
        );
        assert_eq!(w.delete_item().await, TriggerOutcome::Completed);
        assert_eq!(
            w.host().statuses(),
            vec![
                "Loading latest items...".to_string(),
                "Loading information about item ID: 2...".to_string(),
                "Deleting item with ID: 2...".to_string(),
                "Item with ID: 2 successfully deleted".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn declined_delete_sends_nothing() {
        let host = RecordingHost {
            decline: true,
            ..Default::default()
        };
        let w = widget(ScriptedTransport::new(), host);
        assert_eq!(w.delete_item().await, TriggerOutcome::Cancelled);
        assert!(w.host().statuses().is_empty());
        assert!(w.begin(Action::Delete).is_some());
    }

    #[tokio::test]
    async fn busy_delete_does_not_ask_for_confirmation() {
        let w = widget(ScriptedTransport::new(), RecordingHost::default());
        let _held = w.begin(Action::Delete).unwrap();
        assert_eq!(w.delete_item().await, TriggerOutcome::Busy);
        assert_eq!(w.host().confirms.load(Ordering::SeqCst), 0);
        assert_eq!(
            w.host().statuses(),
            vec!["Delete item already in progress".to_string()]
        );
    }

    #[tokio::test]
    async fn busy_action_is_not_started_twice() {
        let w = widget(ScriptedTransport::new(), RecordingHost::default());
        let _held = w.begin(Action::Update).unwrap();
        assert_eq!(w.update_item().await, TriggerOutcome::Busy);
        assert_eq!(
            w.host().statuses(),
            vec!["Update item already in progress".to_string()]
        );
    }

    #[tokio::test]
    async fn guard_is_released_after_failure() {
        let w = widget(
            ScriptedTransport::new().fail("down").fail("down"),
            RecordingHost::default(),
        );
        assert_eq!(w.trigger(Action::Create).await, TriggerOutcome::Failed);
        assert_eq!(w.trigger(Action::Create).await, TriggerOutcome::Failed);
    }

    #[test]
    fn render_items_lists_title_and_id() {
        let items = vec![
            ListItem {
                id: 1,
                title: "A".to_string(),
            },
            ListItem {
                id: 2,
                title: "B".to_string(),
            },
        ];
        assert_eq!(render_items(&items), "A (1)\nB (2)");
    }
}
