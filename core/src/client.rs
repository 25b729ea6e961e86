//! Stateless HTTP request builder and response parser for the list store.
//!
//! # Design
//! `ListClient` holds only the base URL and the list it is bound to, and
//! carries no mutable state between calls. Each store operation is split into
//! a `build_*` method that produces an `HttpRequest` and a `parse_*` method
//! that consumes an `HttpResponse`. Whoever executes the round-trip sits in
//! between, keeping this module deterministic and free of I/O.

use serde::de::DeserializeOwned;

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::types::{
    Collection, IdOnly, ItemUpdate, ItemWithMetadata, ListItem, NewItem, VersionTag,
};

/// `Accept` value that makes the store surface `odata.etag` in item bodies.
pub const MINIMAL_METADATA: &str = "application/json;odata=minimalmetadata";

const JSON: &str = "application/json";

/// Synchronous, stateless client for one list of the store.
#[derive(Debug, Clone)]
pub struct ListClient {
    base_url: String,
    list_name: String,
}

impl ListClient {
    pub fn new(base_url: &str, list_name: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            list_name: list_name.to_string(),
        }
    }

    pub fn list_name(&self) -> &str {
        &self.list_name
    }

    fn items_url(&self) -> String {
        format!(
            "{}/lists/{}/items",
            self.base_url,
            urlencoding::encode(&self.list_name)
        )
    }

    fn item_url(&self, id: u64) -> String {
        format!("{}/{id}", self.items_url())
    }

    /// Most recently created item, identifier only.
    pub fn build_latest_item_id(&self) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            path: format!("{}?$orderby=Id%20desc&$top=1&$select=Id", self.items_url()),
            headers: vec![("accept".to_string(), JSON.to_string())],
            body: None,
        }
    }

    pub fn build_get_item(&self, id: u64) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            path: format!("{}?$select=Id,Title", self.item_url(id)),
            headers: vec![("accept".to_string(), JSON.to_string())],
            body: None,
        }
    }

    /// Like `build_get_item`, but asks the store to include the version tag.
    pub fn build_get_item_with_version(&self, id: u64) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            path: format!("{}?$select=Id,Title", self.item_url(id)),
            headers: vec![("accept".to_string(), MINIMAL_METADATA.to_string())],
            body: None,
        }
    }

    pub fn build_create_item(&self, input: &NewItem) -> Result<HttpRequest, ApiError> {
        let body = serde_json::to_string(input)
            .map_err(|e| ApiError::SerializationError(e.to_string()))?;
        Ok(HttpRequest {
            method: HttpMethod::Post,
            path: self.items_url(),
            headers: vec![
                ("accept".to_string(), JSON.to_string()),
                ("content-type".to_string(), JSON.to_string()),
            ],
            body: Some(body),
        })
    }

    pub fn build_update_item(
        &self,
        id: u64,
        input: &ItemUpdate,
        version: &VersionTag,
    ) -> Result<HttpRequest, ApiError> {
        let body = serde_json::to_string(input)
            .map_err(|e| ApiError::SerializationError(e.to_string()))?;
        Ok(HttpRequest {
            method: HttpMethod::Patch,
            path: self.item_url(id),
            headers: vec![
                ("content-type".to_string(), JSON.to_string()),
                ("if-match".to_string(), version.as_str().to_string()),
            ],
            body: Some(body),
        })
    }

    pub fn build_delete_item(&self, id: u64, version: &VersionTag) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Delete,
            path: self.item_url(id),
            headers: vec![("if-match".to_string(), version.as_str().to_string())],
            body: None,
        }
    }

    /// `None` when the list holds no items.
    pub fn parse_latest_item_id(&self, response: HttpResponse) -> Result<Option<u64>, ApiError> {
        check_status(&response, 200)?;
        let items: Collection<IdOnly> = decode(&response.body)?;
        Ok(items.value.first().map(|item| item.id))
    }

    pub fn parse_get_item(&self, response: HttpResponse) -> Result<ListItem, ApiError> {
        check_status(&response, 200)?;
        decode(&response.body)
    }

    /// Extract the item and its version tag. The body's `odata.etag` wins;
    /// the `ETag` header is the fallback.
    pub fn parse_get_item_with_version(
        &self,
        response: HttpResponse,
    ) -> Result<(ListItem, VersionTag), ApiError> {
        check_status(&response, 200)?;
        let parsed: ItemWithMetadata = decode(&response.body)?;
        let tag = parsed
            .etag
            .or_else(|| response.header("etag").map(str::to_string))
            .filter(|tag| !tag.is_empty())
            .ok_or(ApiError::MissingVersionTag)?;
        Ok((parsed.item, VersionTag::new(tag)))
    }

    pub fn parse_create_item(&self, response: HttpResponse) -> Result<ListItem, ApiError> {
        check_status(&response, 201)?;
        decode(&response.body)
    }

    pub fn parse_update_item(&self, response: HttpResponse) -> Result<(), ApiError> {
        check_success(&response)
    }

    pub fn parse_delete_item(&self, response: HttpResponse) -> Result<(), ApiError> {
        check_success(&response)
    }
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<T, ApiError> {
    serde_json::from_str(body).map_err(|e| ApiError::DeserializationError(e.to_string()))
}

/// Map non-success status codes to the appropriate `ApiError` variant.
fn check_status(response: &HttpResponse, expected: u16) -> Result<(), ApiError> {
    if response.status == expected {
        return Ok(());
    }
    Err(status_error(response))
}

/// Writes answer 204, but some stores reply 200 with the item.
fn check_success(response: &HttpResponse) -> Result<(), ApiError> {
    match response.status {
        200 | 204 => Ok(()),
        _ => Err(status_error(response)),
    }
}

fn status_error(response: &HttpResponse) -> ApiError {
    match response.status {
        404 => ApiError::NotFound,
        412 => ApiError::PreconditionFailed,
        status => ApiError::HttpError {
            status,
            message: error_message(&response.body),
        },
    }
}

/// Pull `error.message` out of a store error body, or fall back to the raw text.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> ListClient {
        ListClient::new("http://localhost:3000", "Items")
    }

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: Vec::new(),
            body: body.to_string(),
        }
    }

    #[test]
    fn build_latest_item_id_orders_descending_and_selects_id() {
        let req = client().build_latest_item_id();
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(
            req.path,
            "http://localhost:3000/lists/Items/items?$orderby=Id%20desc&$top=1&$select=Id"
        );
        assert!(req.body.is_none());
    }

    #[test]
    fn list_name_is_percent_encoded() {
        let req = ListClient::new("http://localhost:3000", "My Tasks").build_get_item(2);
        assert_eq!(
            req.path,
            "http://localhost:3000/lists/My%20Tasks/items/2?$select=Id,Title"
        );
    }

    #[test]
    fn build_get_item_with_version_negotiates_minimal_metadata() {
        let req = client().build_get_item_with_version(7);
        assert_eq!(req.header("Accept"), Some(MINIMAL_METADATA));
        assert_eq!(
            req.path,
            "http://localhost:3000/lists/Items/items/7?$select=Id,Title"
        );
    }

    #[test]
    fn build_create_item_produces_correct_request() {
        let input = NewItem {
            title: "Item A".to_string(),
        };
        let req = client().build_create_item(&input).unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.path, "http://localhost:3000/lists/Items/items");
        assert_eq!(req.header("content-type"), Some("application/json"));
        let body: serde_json::Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body["Title"], "Item A");
    }

    #[test]
    fn build_update_item_sends_if_match() {
        let input = ItemUpdate {
            title: Some("New Title".to_string()),
        };
        let req = client()
            .build_update_item(7, &input, &VersionTag::new("v1"))
            .unwrap();
        assert_eq!(req.method, HttpMethod::Patch);
        assert_eq!(req.path, "http://localhost:3000/lists/Items/items/7");
        assert_eq!(req.header("If-Match"), Some("v1"));
    }

    #[test]
    fn build_delete_item_sends_if_match() {
        let req = client().build_delete_item(7, &VersionTag::new("\"4\""));
        assert_eq!(req.method, HttpMethod::Delete);
        assert_eq!(req.header("if-match"), Some("\"4\""));
        assert!(req.body.is_none());
    }

    #[test]
    fn parse_latest_item_id_empty_list() {
        let id = client()
            .parse_latest_item_id(response(200, r#"{"value":[]}"#))
            .unwrap();
        assert_eq!(id, None);
    }

    #[test]
    fn parse_latest_item_id_takes_first_row() {
        let id = client()
            .parse_latest_item_id(response(200, r#"{"value":[{"Id":12}]}"#))
            .unwrap();
        assert_eq!(id, Some(12));
    }

    #[test]
    fn parse_get_item_not_found() {
        let err = client().parse_get_item(response(404, "")).unwrap_err();
        assert!(matches!(err, ApiError::NotFound));
    }

    #[test]
    fn parse_get_item_with_version_prefers_body_tag() {
        let mut resp = response(200, r#"{"odata.etag":"\"2\"","Id":7,"Title":"A"}"#);
        resp.headers.push(("ETag".to_string(), "\"ignored\"".to_string()));
        let (item, tag) = client().parse_get_item_with_version(resp).unwrap();
        assert_eq!(item.id, 7);
        assert_eq!(tag.as_str(), "\"2\"");
    }

    #[test]
    fn parse_get_item_with_version_falls_back_to_header() {
        let mut resp = response(200, r#"{"Id":7,"Title":"A"}"#);
        resp.headers.push(("ETag".to_string(), "\"9\"".to_string()));
        let (_, tag) = client().parse_get_item_with_version(resp).unwrap();
        assert_eq!(tag.as_str(), "\"9\"");
    }

    #[test]
    fn parse_get_item_with_version_requires_a_tag() {
        let err = client()
            .parse_get_item_with_version(response(200, r#"{"Id":7,"Title":"A"}"#))
            .unwrap_err();
        assert!(matches!(err, ApiError::MissingVersionTag));
    }

    #[test]
    fn parse_create_item_wrong_status_uses_store_message() {
        let err = client()
            .parse_create_item(response(
                500,
                r#"{"error":{"code":"internal","message":"disk full"}}"#,
            ))
            .unwrap_err();
        match err {
            ApiError::HttpError { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "disk full");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn parse_update_item_stale_tag() {
        let err = client().parse_update_item(response(412, "")).unwrap_err();
        assert!(matches!(err, ApiError::PreconditionFailed));
    }

    #[test]
    fn parse_delete_item_accepts_204_and_200() {
        assert!(client().parse_delete_item(response(204, "")).is_ok());
        assert!(client().parse_delete_item(response(200, "")).is_ok());
    }

    #[test]
    fn trailing_slash_is_stripped() {
        let client = ListClient::new("http://localhost:3000/", "Items");
        let req = client.build_latest_item_id();
        assert!(req.path.starts_with("http://localhost:3000/lists/"));
    }

    #[test]
    fn parse_get_item_bad_json() {
        let err = client().parse_get_item(response(200, "not json")).unwrap_err();
        assert!(matches!(err, ApiError::DeserializationError(_)));
    }
}
