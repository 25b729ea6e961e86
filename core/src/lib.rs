//! Client core for a remote list store with optimistic concurrency.
//!
//! # Overview
//! `ListClient` builds `HttpRequest` values and parses `HttpResponse` values
//! without touching the network (host-does-IO pattern). `ListItemGateway`
//! drives it through a `Transport` and adds the create/read/update/delete
//! operations plus the "act on the latest item" flows, whose writes are
//! conditioned on the version tag read immediately before. `ListWidget` is
//! the thin presentation layer a host wires its buttons to.
//!
//! # Design
//! - `ListClient` is stateless: it holds only the base URL and list name.
//! - Each store operation is split into `build_*` and `parse_*`, so the I/O
//!   boundary is explicit and testable with plain data.
//! - Writes always carry `If-Match`; a stale tag surfaces as
//!   `StoreError::ConcurrencyConflict` and is never retried.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod client;
pub mod config;
pub mod error;
pub mod gateway;
pub mod http;
pub mod transport;
pub mod types;
pub mod widget;

pub use client::{ListClient, MINIMAL_METADATA};
pub use config::{StoreConfig, WidgetProperties};
pub use error::{ApiError, ConfigError, StoreError, StoreResult};
pub use gateway::{FlowObserver, FlowStep, LatestItem, ListItemGateway};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
#[cfg(feature = "reqwest")]
pub use transport::ReqwestTransport;
pub use transport::Transport;
pub use types::{ItemUpdate, ListItem, NewItem, VersionTag};
pub use widget::{render_items, Action, ListWidget, TriggerOutcome, WidgetHost};
