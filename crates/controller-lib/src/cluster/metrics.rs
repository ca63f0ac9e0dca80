//! Metrics service client
//!
//! Fetches per-pod usage through the API server's service proxy, the path
//! heapster-style metrics services are exposed on:
//! `/api/v1/namespaces/{ns}/services/{scheme}:{name}:{port}/proxy` followed
//! by `{api_root}/namespaces/{pod_ns}/pods/{pod_name}`.

use crate::enforce::{async_trait, MetricsClient};
use crate::error::{BoxedSource, Error};
use crate::models::{UsageSample, WorkloadRef};
use crate::quantity::{Quantity, ResourceKind, ResourceVector};
use kube::Client;
use serde::Deserialize;
use std::collections::BTreeMap;

/// Where the metrics service lives and which API it serves.
#[derive(Debug, Clone)]
pub struct MetricsServiceConfig {
    /// Namespace the metrics service runs in
    pub namespace: String,
    /// Proxy scheme (http or https)
    pub scheme: String,
    /// Service name
    pub service: String,
    /// Service port; empty selects the default port
    pub port: String,
    /// Root path of the metrics API behind the proxy
    pub api_root: String,
}

impl Default for MetricsServiceConfig {
    fn default() -> Self {
        Self {
            namespace: "kube-system".to_string(),
            scheme: "http".to_string(),
            service: "heapster".to_string(),
            port: String::new(),
            api_root: "/apis/metrics/v1alpha1".to_string(),
        }
    }
}

/// Usage client backed by the API-server service proxy.
pub struct MetricsServiceClient {
    client: Client,
    config: MetricsServiceConfig,
}

impl MetricsServiceClient {
    pub fn new(client: Client) -> Self {
        Self::with_config(client, MetricsServiceConfig::default())
    }

    pub fn with_config(client: Client, config: MetricsServiceConfig) -> Self {
        Self { client, config }
    }

    fn usage_path(&self, workload: &WorkloadRef) -> String {
        format!(
            "/api/v1/namespaces/{}/services/{}:{}:{}/proxy{}/namespaces/{}/pods/{}",
            self.config.namespace,
            self.config.scheme,
            self.config.service,
            self.config.port,
            self.config.api_root,
            workload.namespace,
            workload.name
        )
    }
}

fn unavailable(workload: &WorkloadRef, source: impl Into<BoxedSource>) -> Error {
    Error::MetricsUnavailable {
        workload: workload.to_string(),
        source: source.into(),
    }
}

#[async_trait]
impl MetricsClient for MetricsServiceClient {
    async fn usage(&self, workload: &WorkloadRef) -> Result<Vec<UsageSample>, Error> {
        let request = http::Request::get(self.usage_path(workload))
            .body(Vec::new())
            .map_err(|error| unavailable(workload, error))?;

        let response: PodMetricsResponse = self
            .client
            .request(request)
            .await
            .map_err(|error| unavailable(workload, error))?;

        samples_from_response(response, workload)
    }
}

/// Per-pod response body of the metrics API.
#[derive(Debug, Deserialize)]
struct PodMetricsResponse {
    #[serde(default)]
    containers: Vec<ContainerSample>,
}

#[derive(Debug, Deserialize)]
struct ContainerSample {
    #[serde(default)]
    name: String,
    /// Resource name to quantity literal, e.g. `{"cpu": "4m", "memory": "11Mi"}`
    #[serde(default)]
    usage: BTreeMap<String, String>,
}

/// Type the wire samples through the quantity model. An unparseable quantity
/// means the body was not what the metrics API serves, so the whole fetch is
/// reported unavailable.
fn samples_from_response(
    response: PodMetricsResponse,
    workload: &WorkloadRef,
) -> Result<Vec<UsageSample>, Error> {
    let mut samples = Vec::with_capacity(response.containers.len());
    for container in response.containers {
        let mut usage = ResourceVector::new();
        for (resource, literal) in &container.usage {
            let Some(kind) = ResourceKind::from_name(resource) else {
                continue;
            };
            let quantity =
                Quantity::parse(literal, kind).map_err(|error| unavailable(workload, error))?;
            usage.insert(kind, quantity);
        }
        samples.push(UsageSample {
            container: container.name,
            usage,
        });
    }
    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference() -> WorkloadRef {
        WorkloadRef {
            namespace: "default".to_string(),
            name: "web-0".to_string(),
        }
    }

    fn decode(body: &str) -> Result<Vec<UsageSample>, Error> {
        let response: PodMetricsResponse = serde_json::from_str(body).unwrap();
        samples_from_response(response, &reference())
    }

    #[test]
    fn test_default_proxy_path() {
        let config = MetricsServiceConfig::default();
        assert_eq!(config.service, "heapster");

        // Path layout matters more than the struct fields themselves
        let path = format!(
            "/api/v1/namespaces/{}/services/{}:{}:{}/proxy{}/namespaces/default/pods/web-0",
            config.namespace, config.scheme, config.service, config.port, config.api_root
        );
        assert_eq!(
            path,
            "/api/v1/namespaces/kube-system/services/http:heapster:/proxy\
             /apis/metrics/v1alpha1/namespaces/default/pods/web-0"
        );
    }

    #[test]
    fn test_decodes_container_samples() {
        let samples = decode(
            r#"{
                "metadata": { "name": "web-0", "namespace": "default" },
                "timestamp": "2018-03-05T10:00:00Z",
                "window": "1m0s",
                "containers": [
                    { "name": "app", "usage": { "cpu": "150m", "memory": "100Mi" } },
                    { "name": "sidecar", "usage": { "cpu": "10m" } }
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].container, "app");
        assert_eq!(
            samples[0].usage.get(ResourceKind::Cpu),
            Some(Quantity::new(150))
        );
        assert_eq!(
            samples[0].usage.get(ResourceKind::Memory),
            Some(Quantity::new(100 * 1024 * 1024))
        );
        assert_eq!(samples[1].usage.get(ResourceKind::Memory), None);
    }

    #[test]
    fn test_empty_body_yields_no_samples() {
        assert!(decode("{}").unwrap().is_empty());
    }

    #[test]
    fn test_unknown_resources_are_skipped() {
        let samples = decode(
            r#"{ "containers": [
                { "name": "app", "usage": { "cpu": "5m", "network": "12" } }
            ] }"#,
        )
        .unwrap();

        assert_eq!(samples[0].usage.len(), 1);
    }

    #[test]
    fn test_garbled_quantity_is_unavailable() {
        let result = decode(
            r#"{ "containers": [
                { "name": "app", "usage": { "cpu": "lots" } }
            ] }"#,
        );

        assert!(matches!(
            result,
            Err(Error::MetricsUnavailable { .. })
        ));
    }
}
