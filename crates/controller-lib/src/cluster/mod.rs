//! Kubernetes-backed collaborator implementations
//!
//! Thin wrappers mapping the enforcement traits onto the cluster API: pod
//! listing, pod deletion, and event recording. Usage retrieval lives in the
//! `metrics` submodule.

mod metrics;

pub use metrics::{MetricsServiceClient, MetricsServiceConfig};

use crate::enforce::{async_trait, EventRecorder, WorkloadLister, WorkloadTerminator};
use crate::error::Error;
use crate::models::{Workload, WorkloadRef};
use crate::quantity::{Quantity, ResourceKind, ResourceVector};
use k8s_openapi::api::core::v1::{Container, ObjectReference, Pod};
use kube::api::{Api, DeleteParams, ListParams};
use kube::runtime::events::{Event, EventType, Recorder, Reporter};
use kube::Client;
use tracing::{debug, warn};

const CONTROLLER_NAME: &str = "soft-limit-controller";

/// Lists pods in the configured namespace.
pub struct PodLister {
    pods: Api<Pod>,
}

impl PodLister {
    pub fn new(client: Client, namespace: &str) -> Self {
        Self {
            pods: Api::namespaced(client, namespace),
        }
    }
}

#[async_trait]
impl WorkloadLister for PodLister {
    async fn list(&self) -> Result<Vec<Workload>, Error> {
        let pods = self
            .pods
            .list(&ListParams::default())
            .await
            .map_err(Error::List)?;
        Ok(pods.items.iter().map(workload_from_pod).collect())
    }
}

/// Convert an API pod into the model evaluated by the enforcement pass.
fn workload_from_pod(pod: &Pod) -> Workload {
    let container_limits = pod
        .spec
        .as_ref()
        .map(|spec| spec.containers.iter().map(container_hard_limits).collect())
        .unwrap_or_default();

    Workload {
        namespace: pod.metadata.namespace.clone().unwrap_or_default(),
        name: pod.metadata.name.clone().unwrap_or_default(),
        uid: pod.metadata.uid.clone(),
        annotations: pod.metadata.annotations.clone().unwrap_or_default(),
        container_limits,
    }
}

fn container_hard_limits(container: &Container) -> ResourceVector {
    let mut limits = ResourceVector::new();
    let Some(declared) = container
        .resources
        .as_ref()
        .and_then(|resources| resources.limits.as_ref())
    else {
        return limits;
    };

    for (name, quantity) in declared {
        let Some(kind) = ResourceKind::from_name(name) else {
            continue;
        };
        match Quantity::parse(&quantity.0, kind) {
            Ok(parsed) => limits.insert(kind, parsed),
            Err(error) => {
                // A hard limit the API server accepted but we cannot read is
                // treated as undeclared for that kind.
                debug!(container = %container.name, %error, "skipping unparseable hard limit");
            }
        }
    }
    limits
}

/// Deletes pods through the cluster API.
pub struct PodTerminator {
    client: Client,
}

impl PodTerminator {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl WorkloadTerminator for PodTerminator {
    async fn terminate(&self, workload: &WorkloadRef) -> Result<(), Error> {
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), &workload.namespace);
        pods.delete(&workload.name, &DeleteParams::default())
            .await
            .map(|_| ())
            .map_err(|source| Error::Termination {
                workload: workload.to_string(),
                source,
            })
    }
}

/// Publishes termination notices as Kubernetes events on the affected pod.
pub struct PodEventRecorder {
    client: Client,
    reporter: Reporter,
}

impl PodEventRecorder {
    pub fn new(client: Client) -> Self {
        let reporter = Reporter {
            controller: CONTROLLER_NAME.to_string(),
            instance: std::env::var("HOSTNAME").ok(),
        };
        Self { client, reporter }
    }
}

#[async_trait]
impl EventRecorder for PodEventRecorder {
    async fn exceeded(&self, workload: &Workload) {
        let reference = ObjectReference {
            api_version: Some("v1".to_string()),
            kind: Some("Pod".to_string()),
            namespace: Some(workload.namespace.clone()),
            name: Some(workload.name.clone()),
            uid: workload.uid.clone(),
            ..ObjectReference::default()
        };

        let recorder = Recorder::new(self.client.clone(), self.reporter.clone(), reference);
        let event = Event {
            type_: EventType::Normal,
            reason: "ExceededSoftLimit".to_string(),
            note: Some("Killing pod.".to_string()),
            action: "Terminating".to_string(),
            secondary: None,
        };

        if let Err(error) = recorder.publish(event).await {
            warn!(pod = %workload.workload_ref(), %error, "failed to record termination event");
        }
    }
}
