//! Qdrant REST backend.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{Result, SearchError};
use crate::payload::{ChunkPayload, ScoredPoint, VectorPoint};
use crate::store::{Distance, VectorStore};

/// [`VectorStore`] backed by a Qdrant server.
pub struct QdrantStore {
    /// Server URL, e.g. `http://localhost:6333`.
    base_url: String,

    /// Optional API key sent as the `api-key` header.
    api_key: Option<String>,

    /// HTTP client.
    client: reqwest::Client,

    /// Metric for collections this store creates.
    distance: Distance,

    /// Per-request timeout.
    timeout: Duration,
}

impl QdrantStore {
    /// Create a store for the server at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: None,
            client: reqwest::Client::new(),
            distance: Distance::Cosine,
            timeout: Duration::from_secs(10),
        }
    }

    /// Set the API key.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set the distance metric used when creating collections.
    pub fn with_distance(mut self, distance: Distance) -> Self {
        self.distance = distance;
        self
    }

    /// Bound every request to `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let mut builder = self
            .client
            .request(method, format!("{}{path}", self.base_url))
            .timeout(self.timeout);
        if let Some(key) = &self.api_key {
            builder = builder.header("api-key", key);
        }
        builder
    }

    async fn check(response: reqwest::Response, collection: &str) -> Result<reqwest::Response> {
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(SearchError::CollectionNotFound(collection.to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    result: Vec<RawHit>,
}

#[derive(Debug, Deserialize)]
struct RawHit {
    id: serde_json::Value,
    score: f32,
    #[serde(default)]
    payload: Option<serde_json::Value>,
}

fn id_to_string(id: &serde_json::Value) -> String {
    match id {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[async_trait]
impl VectorStore for QdrantStore {
    fn name(&self) -> &str {
        "qdrant"
    }

    async fn ensure_collection(&self, collection: &str, dimension: usize) -> Result<()> {
        let response = self
            .request(reqwest::Method::GET, &format!("/collections/{collection}"))
            .send()
            .await?;
        if response.status().is_success() {
            debug!("Collection {collection} exists");
            return Ok(());
        }
        if response.status() != reqwest::StatusCode::NOT_FOUND {
            Self::check(response, collection).await?;
            return Ok(());
        }

        let body = serde_json::json!({
            "vectors": { "size": dimension, "distance": self.distance }
        });
        let response = self
            .request(reqwest::Method::PUT, &format!("/collections/{collection}"))
            .json(&body)
            .send()
            .await?;
        Self::check(response, collection).await?;
        info!("Created collection {collection} ({dimension} dims, {:?})", self.distance);
        Ok(())
    }

    async fn upsert(&self, collection: &str, points: Vec<VectorPoint>) -> Result<()> {
        let Some(first) = points.first() else {
            return Ok(());
        };
        self.ensure_collection(collection, first.vector.len()).await?;

        let count = points.len();
        let body = serde_json::json!({ "points": points });
        let response = self
            .request(
                reqwest::Method::PUT,
                &format!("/collections/{collection}/points?wait=true"),
            )
            .json(&body)
            .send()
            .await?;
        Self::check(response, collection).await?;
        info!("Upserted {count} points into {collection}");
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        query_vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredPoint>> {
        let body = serde_json::json!({
            "vector": query_vector,
            "limit": top_k,
            "with_payload": true
        });
        let response = self
            .request(
                reqwest::Method::POST,
                &format!("/collections/{collection}/points/search"),
            )
            .json(&body)
            .send()
            .await?;
        let response = Self::check(response, collection).await?;
        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| SearchError::InvalidResponse(e.to_string()))?;

        let hits: Vec<ScoredPoint> = parsed
            .result
            .into_iter()
            .filter_map(|hit| {
                let id = id_to_string(&hit.id);
                let payload = ChunkPayload::from_value(&id, hit.payload?)?;
                Some(ScoredPoint {
                    id,
                    score: hit.score,
                    payload,
                })
            })
            .collect();

        debug!("Search in {collection} returned {} hits", hits.len());
        Ok(hits)
    }

    async fn delete_by_document_id(&self, collection: &str, document_id: &str) -> Result<()> {
        let body = serde_json::json!({
            "filter": {
                "must": [
                    { "key": "document_id", "match": { "value": document_id } }
                ]
            }
        });
        let response = self
            .request(
                reqwest::Method::POST,
                &format!("/collections/{collection}/points/delete?wait=true"),
            )
            .json(&body)
            .send()
            .await?;
        match Self::check(response, collection).await {
            Ok(_) => {
                info!("Deleted points of document {document_id} from {collection}");
                Ok(())
            }
            // Nothing was ever written for this knowledge base.
            Err(SearchError::CollectionNotFound(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_search_validates_payloads() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/collections/global_kb/points/search"))
            .and(body_partial_json(serde_json::json!({ "limit": 3 })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "ok",
                "time": 0.001,
                "result": [
                    { "id": 1, "score": 0.9, "payload": { "chunk": "kept", "document_id": "d" } },
                    { "id": 2, "score": 0.8, "payload": { "title": "no chunk" } },
                    { "id": "5c56c793-69f3-4fbf-87e6-c4bf54c28c26", "score": 0.7 }
                ]
            })))
            .mount(&server)
            .await;

        let store = QdrantStore::new(server.uri());
        let hits = store.search("global_kb", &[0.1, 0.2], 3).await.unwrap();

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "1");
        assert_eq!(hits[0].payload.chunk, "kept");
    }

    #[tokio::test]
    async fn test_search_missing_collection() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/collections/personal_kb/points/search"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let store = QdrantStore::new(server.uri());
        let err = store.search("personal_kb", &[0.1], 3).await.unwrap_err();
        assert!(matches!(err, SearchError::CollectionNotFound(_)));
    }

    #[tokio::test]
    async fn test_upsert_creates_missing_collection() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/collections/global_kb"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/collections/global_kb"))
            .and(body_partial_json(serde_json::json!({
                "vectors": { "size": 2, "distance": "Cosine" }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "result": true, "status": "ok"
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/collections/global_kb/points"))
            .and(header("api-key", "secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "result": { "status": "completed" }, "status": "ok"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let store = QdrantStore::new(server.uri()).with_api_key("secret");
        let points = vec![VectorPoint {
            id: crate::payload::point_id("d", 0),
            vector: vec![1.0, 0.0],
            payload: ChunkPayload::new("text").global(),
        }];

        store.upsert("global_kb", points).await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_filters_on_document_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/collections/personal_kb/points/delete"))
            .and(body_partial_json(serde_json::json!({
                "filter": { "must": [ { "key": "document_id", "match": { "value": "doc-9" } } ] }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "result": { "status": "completed" }, "status": "ok"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let store = QdrantStore::new(server.uri());
        store
            .delete_by_document_id("personal_kb", "doc-9")
            .await
            .unwrap();
    }
}
