use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::CONTENT_TYPE;
use reqwest::Method;
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{debug, error};
use url::Url;

use super::error::{ApiError, ApiResult};
use super::provider::{LogSearch, MonitoringApi};
use crate::config::{AxonOpsConfig, ClusterConfig};
use crate::util::retry::retry_with_max_retries;

pub const USER_AGENT: &str = "axonops-analyzer/1.0.0";
const ORG_HEADER: &str = "X-Grafana-Org-Id";

/// AxonOps REST client.
///
/// Every call is authenticated with the bearer token and retried on 429/5xx
/// and on connection failures. Bodies are returned as loose JSON; the
/// collector decides what to keep.
#[derive(Debug, Clone)]
pub struct AxonOpsClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
    max_retries: usize,
}

impl AxonOpsClient {
    /// Creates a client from the `axonops` configuration block.
    ///
    /// # Errors
    ///
    /// Returns an error if `api_url` is not a valid URL or the HTTP client
    /// cannot be constructed.
    pub fn new(config: &AxonOpsConfig) -> ApiResult<Self> {
        let base_url = Url::parse(&config.api_url)?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.as_str().trim_end_matches('/').to_string(),
            token: config.token.clone(),
            max_retries: config.max_retries,
        })
    }

    fn endpoint(&self, path: &str) -> ApiResult<Url> {
        Ok(Url::parse(&format!(
            "{}/{}",
            self.base_url,
            path.trim_start_matches('/')
        ))?)
    }

    async fn request(
        &self,
        method: Method,
        path: &str,
        org: Option<&str>,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> ApiResult<Value> {
        let url = self.endpoint(path)?;
        retry_with_max_retries(self.max_retries, path, || {
            self.send_once(method.clone(), url.clone(), path, org, query, body)
        })
        .await
    }

    async fn send_once(
        &self,
        method: Method,
        url: Url,
        path: &str,
        org: Option<&str>,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> ApiResult<Value> {
        debug!("API request, method={}, url={}, params={:?}", method, url, query);

        let mut request = self
            .http
            .request(method.clone(), url.clone())
            .bearer_auth(&self.token)
            .header(CONTENT_TYPE, "application/json")
            .query(query);
        if let Some(org) = org {
            request = request.header(ORG_HEADER, org);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let text = response.text().await?;
        debug!("API response, status={}, content_length={}", status, text.len());

        match status {
            401 => Err(ApiError::Authentication),
            404 => Err(ApiError::NotFound(path.to_string())),
            s if s >= 400 => {
                error!(
                    "API error response, status={}, method={}, url={}, body={}",
                    s, method, url, text
                );
                Err(ApiError::Api {
                    status: s,
                    message: text,
                })
            }
            _ if text.trim().is_empty() => Ok(Value::Object(Map::new())),
            _ => Ok(serde_json::from_str(&text)?),
        }
    }

    async fn get_cluster_resource(&self, resource: &str, cluster: &ClusterConfig) -> ApiResult<Value> {
        let path = format!(
            "/api/v1/{}/{}/{}/{}",
            resource, cluster.org, cluster.cluster_type, cluster.cluster
        );
        self.request(Method::GET, &path, Some(&cluster.org), &[], None)
            .await
    }
}

/// Lists come back either bare or wrapped in an object under `key`.
fn into_list(value: Value, key: &str) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove(key) {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

fn window_params(start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<(&'static str, String)> {
    vec![
        ("start", start.timestamp().to_string()),
        ("end", end.timestamp().to_string()),
    ]
}

#[async_trait]
impl MonitoringApi for AxonOpsClient {
    async fn health_check(&self) -> ApiResult<()> {
        self.request(Method::GET, "/api/v1/healthz", None, &[], None)
            .await
            .map(|_| ())
    }

    async fn get_orgs(&self) -> ApiResult<Vec<Value>> {
        let value = self
            .request(Method::GET, "/api/v1/orgs", None, &[], None)
            .await?;
        Ok(into_list(value, "orgs"))
    }

    async fn get_cluster_settings(&self, cluster: &ClusterConfig) -> ApiResult<Value> {
        self.get_cluster_resource("clusterSettings", cluster).await
    }

    async fn get_nodes(&self, cluster: &ClusterConfig) -> ApiResult<Vec<Value>> {
        let value = self.get_cluster_resource("nodes-full", cluster).await?;
        Ok(into_list(value, "data"))
    }

    async fn get_keyspaces(&self, cluster: &ClusterConfig) -> ApiResult<Vec<Value>> {
        let value = self.get_cluster_resource("keyspaces", cluster).await?;
        Ok(into_list(value, "data"))
    }

    async fn query_metrics_range(
        &self,
        org: &str,
        query: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        step_seconds: u32,
    ) -> ApiResult<Value> {
        let mut params = vec![("query", query.to_string())];
        params.extend(window_params(start, end));
        params.push(("step", format!("{}s", step_seconds)));
        self.request(Method::GET, "/api/v1/query_range", Some(org), &params, None)
            .await
    }

    async fn query_metrics_instant(&self, org: &str, query: &str) -> ApiResult<Value> {
        // AxonOps wants a window even for instant queries
        let now = Utc::now();
        let mut params = vec![("query", query.to_string())];
        params.extend(window_params(now, now));
        params.push(("time", now.timestamp().to_string()));
        self.request(Method::GET, "/api/v1/query", Some(org), &params, None)
            .await
    }

    async fn search_logs(
        &self,
        cluster: &ClusterConfig,
        search: &LogSearch,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> ApiResult<Value> {
        let path = format!(
            "/api/v1/histogram/{}/{}/{}",
            cluster.org, cluster.cluster_type, cluster.cluster
        );
        let body = serde_json::to_value(search)?;
        self.request(
            Method::POST,
            &path,
            Some(&cluster.org),
            &window_params(start, end),
            Some(&body),
        )
        .await
    }

    async fn get_events(
        &self,
        cluster: &ClusterConfig,
        search: &LogSearch,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> ApiResult<Vec<Value>> {
        let path = format!(
            "/api/v1/events/{}/{}/{}",
            cluster.org, cluster.cluster_type, cluster.cluster
        );
        let mut body = serde_json::to_value(search)?;
        if let Value::Object(map) = &mut body {
            map.insert("search_after".to_string(), Value::Null);
        }
        let mut params = window_params(start, end);
        params.push(("sort", "desc".to_string()));
        let value = self
            .request(Method::POST, &path, Some(&cluster.org), &params, Some(&body))
            .await?;
        Ok(into_list(value, "data"))
    }

    async fn get_agent_config(&self, cluster: &ClusterConfig) -> ApiResult<Value> {
        self.get_cluster_resource("agentconfig", cluster).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::retry::Retryable;
    use chrono::TimeZone;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer, max_retries: usize) -> AxonOpsClient {
        AxonOpsClient::new(&AxonOpsConfig {
            api_url: server.uri(),
            token: "secret".to_string(),
            timeout: 5,
            max_retries,
        })
        .unwrap()
    }

    fn cluster() -> ClusterConfig {
        ClusterConfig {
            org: "acme".to_string(),
            cluster: "prod".to_string(),
            cluster_type: "cassandra".to_string(),
        }
    }

    #[tokio::test]
    async fn test_health_check_sends_auth_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/healthz"))
            .and(header("Authorization", "Bearer secret"))
            .and(header("User-Agent", USER_AGENT))
            .and(header("Content-Type", "application/json"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server, 0).health_check().await.unwrap();
    }

    #[tokio::test]
    async fn test_get_nodes_routes_by_org() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/nodes-full/acme/cassandra/prod"))
            .and(header(ORG_HEADER, "acme"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"host_id": "n1", "DC": "dc1", "Details": {}},
                {"host_id": "n2", "DC": "dc1", "Details": {}}
            ])))
            .mount(&server)
            .await;

        let nodes = client_for(&server, 0).get_nodes(&cluster()).await.unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[1]["host_id"], json!("n2"));
    }

    #[tokio::test]
    async fn test_status_mapping() {
        let server = MockServer::start().await;
        Mock::given(path("/api/v1/orgs"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
        Mock::given(path("/api/v1/keyspaces/acme/cassandra/prod"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(path("/api/v1/agentconfig/acme/cassandra/prod"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad filter"))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, 2);
        assert!(matches!(client.get_orgs().await, Err(ApiError::Authentication)));
        assert!(matches!(
            client.get_keyspaces(&cluster()).await,
            Err(ApiError::NotFound(_))
        ));
        match client.get_agent_config(&cluster()).await {
            Err(ApiError::Api { status, message }) => {
                assert_eq!(status, 400);
                assert_eq!(message, "bad filter");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_retries_server_errors() {
        let server = MockServer::start().await;
        Mock::given(path("/api/v1/clusterSettings/acme/cassandra/prod"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(path("/api/v1/clusterSettings/acme/cassandra/prod"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"retention": 7})))
            .mount(&server)
            .await;

        let settings = client_for(&server, 3)
            .get_cluster_settings(&cluster())
            .await
            .unwrap();
        assert_eq!(settings["retention"], json!(7));
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let server = MockServer::start().await;
        Mock::given(path("/api/v1/healthz"))
            .respond_with(ResponseTemplate::new(500))
            .expect(2)
            .mount(&server)
            .await;

        let err = client_for(&server, 1).health_check().await.unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_query_range_parameters() {
        let server = MockServer::start().await;
        let start = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let end = Utc.timestamp_opt(1_700_086_400, 0).unwrap();
        Mock::given(method("GET"))
            .and(path("/api/v1/query_range"))
            .and(query_param("query", "cas_Compaction_PendingTasks{org=\"acme\"}"))
            .and(query_param("start", "1700000000"))
            .and(query_param("end", "1700086400"))
            .and(query_param("step", "60s"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "success"})))
            .mount(&server)
            .await;

        let value = client_for(&server, 0)
            .query_metrics_range("acme", "cas_Compaction_PendingTasks{org=\"acme\"}", start, end, 60)
            .await
            .unwrap();
        assert_eq!(value["status"], json!("success"));
    }

    #[tokio::test]
    async fn test_search_logs_body_and_empty_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/histogram/acme/cassandra/prod"))
            .and(body_partial_json(json!({
                "message": "GCInspector",
                "bucket": 25,
                "type": "",
            })))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let now = Utc::now();
        let value = client_for(&server, 0)
            .search_logs(&cluster(), &LogSearch::message("GCInspector"), now, now)
            .await
            .unwrap();
        assert_eq!(value, json!({}));
    }

    #[tokio::test]
    async fn test_events_unwrap_data() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/events/acme/cassandra/prod"))
            .and(query_param("sort", "desc"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"data": [{"message": "x"}]})),
            )
            .mount(&server)
            .await;

        let now = Utc::now();
        let events = client_for(&server, 0)
            .get_events(&cluster(), &LogSearch::message(""), now, now)
            .await
            .unwrap();
        assert_eq!(events, vec![json!({"message": "x"})]);
    }

    #[test]
    fn test_rejects_invalid_url() {
        let config = AxonOpsConfig {
            api_url: "::not a url".to_string(),
            ..AxonOpsConfig::default()
        };
        assert!(matches!(AxonOpsClient::new(&config), Err(ApiError::UrlParse(_))));
    }
}
