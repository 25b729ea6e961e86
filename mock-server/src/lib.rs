//! HTTP front of the in-memory list store.
//!
//! Routes mirror a list REST API: `/lists/{list}/items` for queries and
//! creation, `/lists/{list}/items/{id}` for reads and conditional writes.
//! Writes require `If-Match`; the current tag is served in the `ETag` header
//! and, when the caller asks for `odata=minimalmetadata`, as `odata.etag` in
//! the body.

pub mod store;

use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tower_http::trace::TraceLayer;
use tracing::{debug, info};
use uuid::Uuid;

use store::{Fault, Order, SortField, Store, StoredItem};

pub const DEFAULT_LIST: &str = "Items";
pub const ETAG_FIELD: &str = "odata.etag";
pub const REQUEST_ID: &str = "request-id";

/// Item as it appears on the wire (metadata fields aside).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    #[serde(rename = "Id")]
    pub id: u64,
    #[serde(rename = "Title")]
    pub title: String,
}

#[derive(Deserialize)]
pub struct CreateItem {
    #[serde(rename = "Title")]
    pub title: String,
}

#[derive(Deserialize)]
pub struct UpdateItem {
    #[serde(rename = "Title", default)]
    pub title: Option<String>,
}

/// OData-style query options.
#[derive(Debug, Default, Deserialize)]
pub struct ItemsQuery {
    #[serde(rename = "$orderby")]
    pub orderby: Option<String>,
    #[serde(rename = "$top")]
    pub top: Option<usize>,
    #[serde(rename = "$select")]
    pub select: Option<String>,
}

pub type Db = Arc<RwLock<Store>>;

/// Router with the single default list provisioned.
pub fn app() -> Router {
    app_with_lists([DEFAULT_LIST])
}

pub fn app_with_lists<I, S>(lists: I) -> Router
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let db: Db = Arc::new(RwLock::new(Store::with_lists(lists)));
    Router::new()
        .route("/lists/{list}/items", get(query_items).post(create_item))
        .route(
            "/lists/{list}/items/{id}",
            get(get_item).patch(update_item).delete(delete_item),
        )
        .layer(middleware::map_response(stamp_request_id))
        .layer(TraceLayer::new_for_http())
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

pub async fn run_with_lists(listener: TcpListener, lists: Vec<String>) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_lists(lists)).await
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Error response with a `{"error":{"code","message"}}` body.
#[derive(Debug)]
pub struct ServiceError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl ServiceError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: "BadRequest",
            message: message.into(),
        }
    }

    fn precondition_required() -> Self {
        Self {
            status: StatusCode::PRECONDITION_REQUIRED,
            code: "PreconditionRequired",
            message: "writes must carry an If-Match header".to_string(),
        }
    }
}

/// Extractor rejections keep axum's status but use the store's error body.
macro_rules! rejection_into_service_error {
    ($($rejection:ty),*) => {$(
        impl From<$rejection> for ServiceError {
            fn from(rejection: $rejection) -> Self {
                let status = rejection.status();
                let code = if status == StatusCode::UNSUPPORTED_MEDIA_TYPE {
                    "UnsupportedMediaType"
                } else if status == StatusCode::UNPROCESSABLE_ENTITY {
                    "InvalidBody"
                } else {
                    "BadRequest"
                };
                Self {
                    status,
                    code,
                    message: rejection.body_text(),
                }
            }
        }
    )*};
}

rejection_into_service_error!(JsonRejection, PathRejection, QueryRejection);

impl From<Fault> for ServiceError {
    fn from(fault: Fault) -> Self {
        let (status, code) = match fault {
            Fault::ListNotFound(_) => (StatusCode::NOT_FOUND, "ListNotFound"),
            Fault::ItemNotFound(_) => (StatusCode::NOT_FOUND, "ItemNotFound"),
            Fault::PreconditionFailed(_) => (StatusCode::PRECONDITION_FAILED, "PreconditionFailed"),
        };
        Self {
            status,
            code,
            message: fault.to_string(),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        debug!(status = self.status.as_u16(), code = self.code, message = %self.message, "request rejected");
        let body = json!({ "error": { "code": self.code, "message": self.message } });
        (self.status, Json(body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// Query options and projection
// ---------------------------------------------------------------------------

fn parse_orderby(raw: Option<&str>) -> Result<Order, ServiceError> {
    let Some(raw) = raw else {
        return Ok(Order::default());
    };
    let mut parts = raw.split_whitespace();
    let field = match parts.next() {
        Some(f) if f.eq_ignore_ascii_case("Id") => SortField::Id,
        Some(f) if f.eq_ignore_ascii_case("Title") => SortField::Title,
        _ => return Err(ServiceError::bad_request(format!("cannot order by '{raw}'"))),
    };
    let descending = match parts.next() {
        None => false,
        Some(d) if d.eq_ignore_ascii_case("asc") => false,
        Some(d) if d.eq_ignore_ascii_case("desc") => true,
        Some(d) => return Err(ServiceError::bad_request(format!("unknown direction '{d}'"))),
    };
    Ok(Order { field, descending })
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Selection {
    id: bool,
    title: bool,
}

impl Selection {
    const ALL: Selection = Selection {
        id: true,
        title: true,
    };

    fn parse(raw: Option<&str>) -> Result<Self, ServiceError> {
        let Some(raw) = raw else {
            return Ok(Self::ALL);
        };
        let mut selection = Selection {
            id: false,
            title: false,
        };
        for field in raw.split(',').map(str::trim).filter(|f| !f.is_empty()) {
            if field.eq_ignore_ascii_case("Id") {
                selection.id = true;
            } else if field.eq_ignore_ascii_case("Title") {
                selection.title = true;
            } else {
                return Err(ServiceError::bad_request(format!("unknown field '{field}'")));
            }
        }
        Ok(selection)
    }
}

fn wants_metadata(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|accept| {
            accept.contains("odata=minimalmetadata") || accept.contains("odata=fullmetadata")
        })
}

fn project(item: &StoredItem, selection: Selection, metadata: bool) -> Value {
    let mut fields = Map::new();
    if metadata {
        fields.insert(ETAG_FIELD.to_string(), Value::String(item.etag()));
    }
    if selection.id {
        fields.insert("Id".to_string(), json!(item.id));
    }
    if selection.title {
        fields.insert("Title".to_string(), json!(item.title));
    }
    Value::Object(fields)
}

fn with_etag(item: &StoredItem, body: impl IntoResponse) -> Response {
    let mut response = body.into_response();
    if let Ok(value) = HeaderValue::from_str(&item.etag()) {
        response.headers_mut().insert(header::ETAG, value);
    }
    response
}

fn if_match(headers: &HeaderMap) -> Result<String, ServiceError> {
    headers
        .get(header::IF_MATCH)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .ok_or_else(ServiceError::precondition_required)
}

async fn stamp_request_id(mut response: Response) -> Response {
    if let Ok(value) = HeaderValue::from_str(&Uuid::new_v4().to_string()) {
        response.headers_mut().insert(REQUEST_ID, value);
    }
    response
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn query_items(
    State(db): State<Db>,
    path: Result<Path<String>, PathRejection>,
    query: Result<Query<ItemsQuery>, QueryRejection>,
    headers: HeaderMap,
) -> Result<Json<Value>, ServiceError> {
    let Path(list) = path?;
    let Query(query) = query?;
    let order = parse_orderby(query.orderby.as_deref())?;
    let selection = Selection::parse(query.select.as_deref())?;
    let metadata = wants_metadata(&headers);
    let items = db.read().await.query(&list, order, query.top)?;
    let value: Vec<Value> = items
        .iter()
        .map(|item| project(item, selection, metadata))
        .collect();
    Ok(Json(json!({ "value": value })))
}

async fn get_item(
    State(db): State<Db>,
    path: Result<Path<(String, u64)>, PathRejection>,
    query: Result<Query<ItemsQuery>, QueryRejection>,
    headers: HeaderMap,
) -> Result<Response, ServiceError> {
    let Path((list, id)) = path?;
    let Query(query) = query?;
    let selection = Selection::parse(query.select.as_deref())?;
    let item = db.read().await.get(&list, id)?;
    let body = project(&item, selection, wants_metadata(&headers));
    Ok(with_etag(&item, Json(body)))
}

async fn create_item(
    State(db): State<Db>,
    path: Result<Path<String>, PathRejection>,
    input: Result<Json<CreateItem>, JsonRejection>,
) -> Result<Response, ServiceError> {
    let Path(list) = path?;
    let Json(input) = input?;
    let item = db.write().await.create(&list, input.title)?;
    info!(list = %list, id = item.id, "item created");
    let body = project(&item, Selection::ALL, true);
    Ok(with_etag(&item, (StatusCode::CREATED, Json(body))))
}

async fn update_item(
    State(db): State<Db>,
    path: Result<Path<(String, u64)>, PathRejection>,
    headers: HeaderMap,
    input: Result<Json<UpdateItem>, JsonRejection>,
) -> Result<Response, ServiceError> {
    let Path((list, id)) = path?;
    let tag = if_match(&headers)?;
    let Json(input) = input?;
    let item = db.write().await.update(&list, id, &tag, input.title)?;
    info!(list = %list, id, etag = %item.etag(), "item updated");
    Ok(with_etag(&item, StatusCode::NO_CONTENT))
}

async fn delete_item(
    State(db): State<Db>,
    path: Result<Path<(String, u64)>, PathRejection>,
    headers: HeaderMap,
) -> Result<StatusCode, ServiceError> {
    let Path((list, id)) = path?;
    let tag = if_match(&headers)?;
    db.write().await.delete(&list, id, &tag)?;
    info!(list = %list, id, "item deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored() -> StoredItem {
        StoredItem {
            id: 7,
            title: "Seven".to_string(),
            version: 2,
        }
    }

    #[test]
    fn orderby_defaults_to_ascending_id() {
        assert_eq!(parse_orderby(None).unwrap(), Order::default());
    }

    #[test]
    fn orderby_parses_direction() {
        let order = parse_orderby(Some("Id desc")).unwrap();
        assert_eq!(order.field, SortField::Id);
        assert!(order.descending);
    }

    #[test]
    fn orderby_rejects_unknown_field() {
        let err = parse_orderby(Some("Modified desc")).unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn select_limits_projection() {
        let selection = Selection::parse(Some("Id")).unwrap();
        let value = project(&stored(), selection, false);
        assert_eq!(value, json!({ "Id": 7 }));
    }

    #[test]
    fn metadata_adds_etag() {
        let value = project(&stored(), Selection::ALL, true);
        assert_eq!(value[ETAG_FIELD], "\"2\"");
        assert_eq!(value["Title"], "Seven");
    }

    #[test]
    fn minimal_metadata_is_detected_in_accept() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("application/json;odata=minimalmetadata"),
        );
        assert!(wants_metadata(&headers));
        assert!(!wants_metadata(&HeaderMap::new()));
    }

    #[test]
    fn create_item_rejects_missing_title() {
        let result: Result<CreateItem, _> = serde_json::from_str(r#"{"Name":"x"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn update_item_title_is_optional() {
        let input: UpdateItem = serde_json::from_str("{}").unwrap();
        assert!(input.title.is_none());
    }

    #[test]
    fn fault_maps_to_status() {
        let err: ServiceError = Fault::PreconditionFailed(1).into();
        assert_eq!(err.status, StatusCode::PRECONDITION_FAILED);
        let err: ServiceError = Fault::ListNotFound("x".to_string()).into();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }
}
