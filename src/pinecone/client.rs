//! Blocking HTTP client for the Pinecone REST API

use reqwest::blocking::{Client as HttpClient, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use super::{AnnService, IndexDescription, ScoredVector, VectorRecord};
use crate::config::PineconeSettings;
use crate::error::{KnowledgeError, Result};

/// Control plane used to look up an index's data-plane host
pub const CONTROL_PLANE_URL: &str = "https://api.pinecone.io";

/// REST API version pinned in every request
pub const API_VERSION: &str = "2024-07";

const API_KEY_HEADER: &str = "Api-Key";
const VERSION_HEADER: &str = "X-Pinecone-API-Version";

/// Pinecone data-plane client for one index (and optionally one namespace)
pub struct PineconeClient {
    base_url: String,
    api_key: String,
    namespace: Option<String>,
    timeout: Duration,
    http: HttpClient,
}

impl PineconeClient {
    /// Connect using settings, resolving the index host if it isn't configured
    pub fn connect(settings: &PineconeSettings) -> Result<Self> {
        Self::connect_via(CONTROL_PLANE_URL, settings)
    }

    /// As [`connect`](Self::connect), with an explicit control-plane URL
    pub fn connect_via(control_plane: &str, settings: &PineconeSettings) -> Result<Self> {
        let timeout = settings.timeout();
        let http = build_http(timeout)?;

        let host = match settings.index_host.as_deref().map(str::trim) {
            Some(host) if !host.is_empty() => host.to_string(),
            _ => resolve_host(&http, control_plane, settings)?,
        };

        let client = Self {
            base_url: normalize_host(&host),
            api_key: settings.api_key.clone(),
            namespace: settings.namespace.clone().filter(|ns| !ns.is_empty()),
            timeout,
            http,
        };
        tracing::info!(host = %client.base_url, index = %settings.index_name, "pinecone index connected");
        Ok(client)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header(API_KEY_HEADER, &self.api_key)
            .header(VERSION_HEADER, API_VERSION)
    }

    fn post<B: Serialize + ?Sized>(
        &self,
        operation: &'static str,
        path: &str,
        body: &B,
    ) -> Result<Response> {
        let url = format!("{}{}", self.base_url, path);
        let request = self.authorized(self.http.post(url).json(body));
        execute(operation, request, self.timeout)
    }
}

impl AnnService for PineconeClient {
    fn upsert(&self, vectors: &[VectorRecord]) -> Result<()> {
        let body = UpsertRequest {
            vectors,
            namespace: self.namespace.as_deref(),
        };
        self.post("upsert", "/vectors/upsert", &body)?;
        Ok(())
    }

    fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<ScoredVector>> {
        let body = QueryRequest {
            vector,
            top_k,
            include_metadata: true,
            include_values: false,
            namespace: self.namespace.as_deref(),
        };
        let response = self.post("query", "/query", &body)?;
        let parsed: QueryResponse = decode("query", response, self.timeout)?;
        Ok(parsed.matches)
    }

    fn delete(&self, ids: &[String]) -> Result<()> {
        let body = DeleteRequest {
            ids,
            namespace: self.namespace.as_deref(),
        };
        self.post("delete", "/vectors/delete", &body)?;
        Ok(())
    }

    fn describe_index_stats(&self) -> Result<IndexDescription> {
        let response = self.post("describe_index_stats", "/describe_index_stats", &serde_json::json!({}))?;
        let stats: DescribeStatsResponse = decode("describe_index_stats", response, self.timeout)?;
        Ok(stats.describe(self.namespace.as_deref()))
    }

    fn fetch(&self, ids: &[String]) -> Result<Vec<VectorRecord>> {
        let url = format!("{}/vectors/fetch", self.base_url);
        let mut params: Vec<(&str, &str)> = ids.iter().map(|id| ("ids", id.as_str())).collect();
        if let Some(ns) = self.namespace.as_deref() {
            params.push(("namespace", ns));
        }

        let request = self.authorized(self.http.get(url).query(&params));
        let response = execute("fetch", request, self.timeout)?;
        let mut parsed: FetchResponse = decode("fetch", response, self.timeout)?;

        Ok(ids
            .iter()
            .filter_map(|id| parsed.vectors.remove(id))
            .collect())
    }
}

/// Accept `host`, `host:port` or a full URL; bare hosts get https
pub fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    }
}

fn build_http(timeout: Duration) -> Result<HttpClient> {
    HttpClient::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| KnowledgeError::BackendUnavailable(format!("failed to create HTTP client: {}", e)))
}

fn resolve_host(http: &HttpClient, control_plane: &str, settings: &PineconeSettings) -> Result<String> {
    let url = format!(
        "{}/indexes/{}",
        control_plane.trim_end_matches('/'),
        settings.index_name
    );
    let request = http
        .get(url)
        .header(API_KEY_HEADER, &settings.api_key)
        .header(VERSION_HEADER, API_VERSION);

    let response = execute("describe_index", request, settings.timeout())?;
    let index: IndexModel = decode("describe_index", response, settings.timeout())?;
    tracing::debug!(index = %settings.index_name, host = %index.host, "resolved pinecone host");
    Ok(index.host)
}

/// Send, mapping transport failures and non-success statuses to typed errors
fn execute(operation: &'static str, request: RequestBuilder, timeout: Duration) -> Result<Response> {
    let response = request
        .send()
        .map_err(|e| transport_error(operation, e, timeout))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().unwrap_or_default();
        tracing::warn!(operation, %status, "pinecone request failed");
        return Err(KnowledgeError::BackendUnavailable(format!(
            "pinecone {} returned {}: {}",
            operation,
            status,
            body.trim()
        )));
    }
    Ok(response)
}

fn decode<R: DeserializeOwned>(operation: &'static str, response: Response, timeout: Duration) -> Result<R> {
    response.json::<R>().map_err(|e| {
        if e.is_timeout() {
            transport_error(operation, e, timeout)
        } else {
            KnowledgeError::BackendUnavailable(format!(
                "pinecone {} returned an unreadable response: {}",
                operation, e
            ))
        }
    })
}

fn transport_error(operation: &'static str, err: reqwest::Error, timeout: Duration) -> KnowledgeError {
    if err.is_timeout() {
        tracing::warn!(operation, ?timeout, "pinecone request timed out");
        KnowledgeError::BackendTimeout { operation, timeout }
    } else {
        tracing::warn!(operation, error = %err, "pinecone unreachable");
        KnowledgeError::BackendUnavailable(format!("pinecone {} failed: {}", operation, err))
    }
}

#[derive(Serialize)]
struct UpsertRequest<'a> {
    vectors: &'a [VectorRecord],
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
    include_values: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<ScoredVector>,
}

#[derive(Serialize)]
struct DeleteRequest<'a> {
    ids: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(Deserialize)]
struct FetchResponse {
    #[serde(default)]
    vectors: HashMap<String, VectorRecord>,
}

#[derive(Deserialize)]
struct IndexModel {
    host: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DescribeStatsResponse {
    #[serde(default)]
    dimension: usize,
    #[serde(default)]
    total_vector_count: usize,
    #[serde(default)]
    namespaces: HashMap<String, NamespaceSummary>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NamespaceSummary {
    #[serde(default)]
    vector_count: usize,
}

impl DescribeStatsResponse {
    /// With a namespace configured, count only that namespace
    fn describe(&self, namespace: Option<&str>) -> IndexDescription {
        let total_vector_count = match namespace {
            Some(ns) => self.namespaces.get(ns).map_or(0, |s| s.vector_count),
            None => self.total_vector_count,
        };
        IndexDescription {
            dimension: self.dimension,
            total_vector_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_host_normalization() {
        assert_eq!(
            normalize_host("kb-abc123.svc.aped-4627.pinecone.io"),
            "https://kb-abc123.svc.aped-4627.pinecone.io"
        );
        assert_eq!(normalize_host("http://127.0.0.1:5080/"), "http://127.0.0.1:5080");
        assert_eq!(normalize_host("  https://x.pinecone.io "), "https://x.pinecone.io");
    }

    #[test]
    fn test_query_request_serialization() {
        let vector = [0.5, -0.5];
        let body = QueryRequest {
            vector: &vector,
            top_k: 3,
            include_metadata: true,
            include_values: false,
            namespace: None,
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(
            value,
            json!({"vector": [0.5, -0.5], "topK": 3, "includeMetadata": true, "includeValues": false})
        );
    }

    #[test]
    fn test_upsert_request_includes_namespace() {
        let mut metadata = crate::store::Metadata::new();
        metadata.insert("text".into(), json!("hello"));
        let vectors = vec![VectorRecord {
            id: "a".into(),
            values: vec![1.0],
            metadata,
        }];
        let body = UpsertRequest {
            vectors: &vectors,
            namespace: Some("notes"),
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["namespace"], "notes");
        assert_eq!(value["vectors"][0]["id"], "a");
        assert_eq!(value["vectors"][0]["metadata"]["text"], "hello");
    }

    #[test]
    fn test_describe_stats_parsing() {
        let stats: DescribeStatsResponse = serde_json::from_value(json!({
            "namespaces": {"": {"vectorCount": 4}, "notes": {"vectorCount": 2}},
            "dimension": 384,
            "indexFullness": 0.0,
            "totalVectorCount": 6
        }))
        .unwrap();

        assert_eq!(
            stats.describe(None),
            IndexDescription { dimension: 384, total_vector_count: 6 }
        );
        assert_eq!(stats.describe(Some("notes")).total_vector_count, 2);
        assert_eq!(stats.describe(Some("absent")).total_vector_count, 0);
    }

    #[test]
    fn test_query_response_without_metadata() {
        let parsed: QueryResponse = serde_json::from_value(json!({
            "matches": [{"id": "x", "score": 0.91}],
            "namespace": ""
        }))
        .unwrap();
        assert_eq!(parsed.matches.len(), 1);
        assert!(parsed.matches[0].metadata.is_empty());
    }
}
