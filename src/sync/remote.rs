//! The web app's REST API as seen by the sync client.

use std::time::Duration;

use async_trait::async_trait;
use lifesync_common::EntityKind;
use reqwest::{RequestBuilder, Response, Url};
use serde_json::Value;

use crate::errors::SyncError;

/// Per-request timeout for sync calls.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Collection-level operations the sync client needs from the web app.
///
/// Records travel as raw JSON so that implementations stay independent of
/// the record types; the client decodes them.
#[async_trait]
pub trait RemoteApi: Send + Sync {
    fn base_url(&self) -> &str;

    /// `GET /api/health`
    async fn health(&self) -> Result<(), SyncError>;

    /// `GET /api/<collection>`
    async fn fetch(&self, kind: EntityKind) -> Result<Vec<Value>, SyncError>;

    /// `POST /api/<collection>`
    async fn create(&self, kind: EntityKind, record: &Value) -> Result<(), SyncError>;

    /// `PUT /api/<collection>/<id>`
    async fn update(&self, kind: EntityKind, id: &str, record: &Value) -> Result<(), SyncError>;
}

/// [`RemoteApi`] over HTTP with `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpApi {
    pub fn new(base_url: impl Into<String>) -> Result<Self, SyncError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("lifesync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| SyncError::Request {
                url: base_url.clone(),
                source,
            })?;
        Ok(Self { client, base_url })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn collection_url(&self, kind: EntityKind) -> Result<String, SyncError> {
        kind.api_path()
            .map(|path| self.url(path))
            .ok_or(SyncError::NotSynced { kind })
    }

    /// `<collection>/<id>` with the id percent-encoded as a single segment.
    fn record_url(&self, kind: EntityKind, id: &str) -> Result<String, SyncError> {
        let collection = self.collection_url(kind)?;
        let invalid = |message: String| SyncError::InvalidUrl {
            url: collection.clone(),
            message,
        };
        let mut url = Url::parse(&collection).map_err(|e| invalid(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|()| invalid("URL cannot have path segments".to_string()))?
            .push(id);
        Ok(url.into())
    }

    async fn send(
        &self,
        method: &'static str,
        url: &str,
        request: RequestBuilder,
    ) -> Result<Response, SyncError> {
        tracing::debug!(method, url, "Sending request");
        let response = request
            .send()
            .await
            .map_err(|source| self.classify(url, source))?;
        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::Status {
                method,
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }

    /// Connection refusal means the web app is down; anything else is a
    /// generic request failure.
    fn classify(&self, url: &str, source: reqwest::Error) -> SyncError {
        if source.is_connect() {
            SyncError::WebAppNotRunning {
                url: self.base_url.clone(),
            }
        } else {
            SyncError::Request {
                url: url.to_string(),
                source,
            }
        }
    }
}

#[async_trait]
impl RemoteApi for HttpApi {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn health(&self) -> Result<(), SyncError> {
        let url = self.url("/api/health");
        self.send("GET", &url, self.client.get(&url)).await?;
        Ok(())
    }

    async fn fetch(&self, kind: EntityKind) -> Result<Vec<Value>, SyncError> {
        let url = self.collection_url(kind)?;
        let body: Value = self
            .send("GET", &url, self.client.get(&url))
            .await?
            .json()
            .await
            .map_err(|e| SyncError::Decode {
                url: url.clone(),
                message: e.to_string(),
            })?;
        records_from_body(body).ok_or_else(|| SyncError::Decode {
            url,
            message: "expected a JSON array of records".to_string(),
        })
    }

    async fn create(&self, kind: EntityKind, record: &Value) -> Result<(), SyncError> {
        let url = self.collection_url(kind)?;
        self.send("POST", &url, self.client.post(&url).json(record))
            .await?;
        Ok(())
    }

    async fn update(&self, kind: EntityKind, id: &str, record: &Value) -> Result<(), SyncError> {
        let url = self.record_url(kind, id)?;
        self.send("PUT", &url, self.client.put(&url).json(record))
            .await?;
        Ok(())
    }
}

/// Accept a bare array or an object wrapping the array under `data`.
fn records_from_body(body: Value) -> Option<Vec<Value>> {
    match body {
        Value::Array(records) => Some(records),
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Array(records)) => Some(records),
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_records_from_bare_array() {
        let records = records_from_body(json!([{"id": 1}, {"id": 2}])).unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_records_from_data_envelope() {
        let records = records_from_body(json!({"data": [{"id": 1}], "total": 1})).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_records_from_unexpected_shape() {
        assert!(records_from_body(json!({"items": []})).is_none());
        assert!(records_from_body(json!("nope")).is_none());
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let api = HttpApi::new("http://localhost:3001/").unwrap();
        assert_eq!(api.base_url(), "http://localhost:3001");
        assert_eq!(
            api.collection_url(EntityKind::Meals).unwrap(),
            "http://localhost:3001/api/meals"
        );
    }

    #[test]
    fn test_record_url_encodes_id_as_one_segment() {
        let api = HttpApi::new("http://localhost:3001").unwrap();
        assert_eq!(
            api.record_url(EntityKind::Shopping, "abc-123").unwrap(),
            "http://localhost:3001/api/shopping/abc-123"
        );
        assert_eq!(
            api.record_url(EntityKind::Recipes, "a/b?c#d").unwrap(),
            "http://localhost:3001/api/recipes/a%2Fb%3Fc%23d"
        );
    }

    #[test]
    fn test_unsynced_collection_has_no_url() {
        let api = HttpApi::new("http://localhost:3001").unwrap();
        assert!(matches!(
            api.collection_url(EntityKind::Todos),
            Err(SyncError::NotSynced { .. })
        ));
    }
}
