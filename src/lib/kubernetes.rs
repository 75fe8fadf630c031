use std::collections::BTreeMap;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Node as KubeNode, Pod as KubePod};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use kube::api::ListParams;
use kube::{Api, Client, Config, config::KubeConfigOptions};
use log::{debug, info};

use crate::lib::inventory::{
    ContainerResources, InventoryProvider, Node, NodeCapacity, Pod, ResourceKind, ResourceList,
};
use crate::{
    Config as ReportConfig, ConfigError::InvalidValue, KubernetesError::ApiError,
    KubernetesError::ConnectionFailed, KubernetesError::InvalidResource, ResourceQuantity, Result,
    Selector,
};

/// Inventory provider backed by the Kubernetes API server
pub struct KubernetesLoader {
    client: Client,
}

impl KubernetesLoader {
    pub async fn new(config: &ReportConfig) -> Result<Self> {
        let client = if let Some(ref context) = config.context {
            debug!("Using custom context for Kubeconfig");
            let custom_config = Config::from_kubeconfig(&KubeConfigOptions {
                context: Some(context.clone()),
                ..Default::default()
            })
            .await
            .map_err(|e| InvalidValue(e.to_string()))?;

            debug!("Creating a Kubernetes client using custom Kubeconfig");
            Client::try_from(custom_config).map_err(|e| ConnectionFailed(e.to_string()))?
        } else {
            debug!("Creating a Kubernetes client using default Kubeconfig");
            Client::try_default()
                .await
                .map_err(|e| ConnectionFailed(e.to_string()))?
        };

        info!("Successfully created Kubernetes client");
        Ok(Self { client })
    }
}

#[async_trait]
impl InventoryProvider for KubernetesLoader {
    async fn list_nodes(&self, selector: &Selector) -> Result<Vec<Node>> {
        let mut lp = ListParams::default();
        if !selector.is_empty() {
            lp = lp.labels(&selector.to_string());
        }

        debug!("Listing nodes with label selector '{}'", selector);
        let api: Api<KubeNode> = Api::all(self.client.clone());
        let nodes = api.list(&lp).await.map_err(|e| ApiError(e.to_string()))?;

        info!("Retrieved {} nodes", nodes.items.len());
        nodes.items.into_iter().map(node_from_kube).collect()
    }

    async fn list_non_terminal_pods(&self, node_name: &str) -> Result<Vec<Pod>> {
        let lp = ListParams::default().fields(&non_terminal_pods_selector(node_name));

        debug!("Listing non-terminated pods on node {node_name}");
        let api: Api<KubePod> = Api::all(self.client.clone());
        let pods = api.list(&lp).await.map_err(|e| ApiError(e.to_string()))?;

        pods.items.into_iter().map(pod_from_kube).collect()
    }
}

/// Field selector for the pods bound to a node, excluding Succeeded and
/// Failed ones
fn non_terminal_pods_selector(node_name: &str) -> String {
    format!("spec.nodeName={node_name},status.phase!=Succeeded,status.phase!=Failed")
}

fn parse_quantity(owner: &str, name: &str, quantity: &Quantity) -> Result<ResourceQuantity> {
    ResourceQuantity::try_from(quantity).map_err(|e| {
        InvalidResource(format!("{owner}: {name} quantity '{}': {e}", quantity.0)).into()
    })
}

fn resource_list(
    owner: &str,
    quantities: Option<&BTreeMap<String, Quantity>>,
) -> Result<ResourceList> {
    quantities
        .into_iter()
        .flatten()
        .map(|(name, quantity)| -> Result<(ResourceKind, ResourceQuantity)> {
            Ok((ResourceKind::from(name.as_str()), parse_quantity(owner, name, quantity)?))
        })
        .collect()
}

fn node_from_kube(node: KubeNode) -> Result<Node> {
    let name = node.metadata.name.unwrap_or_default();
    let capacity = node.status.and_then(|s| s.capacity).unwrap_or_default();

    let get = |key: &str| match capacity.get(key) {
        Some(quantity) => parse_quantity(&name, key, quantity),
        None => Ok(ResourceQuantity::ZERO),
    };
    let capacity = NodeCapacity {
        cpu: get("cpu")?,
        memory: get("memory")?,
        pods: get("pods")?,
    };

    Ok(Node {
        labels: node.metadata.labels.unwrap_or_default(),
        capacity,
        name,
    })
}

fn pod_from_kube(pod: KubePod) -> Result<Pod> {
    let name = pod.metadata.name.unwrap_or_default();
    let namespace = pod.metadata.namespace.unwrap_or_default();
    let owner = format!("{namespace}/{name}");

    let containers = pod
        .spec
        .map(|spec| spec.containers)
        .unwrap_or_default()
        .into_iter()
        .map(|container| -> Result<ContainerResources> {
            let resources = container.resources.as_ref();
            Ok(ContainerResources {
                requests: resource_list(&owner, resources.and_then(|r| r.requests.as_ref()))?,
                limits: resource_list(&owner, resources.and_then(|r| r.limits.as_ref()))?,
                name: container.name,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Pod {
        name,
        namespace,
        containers,
    })
}
