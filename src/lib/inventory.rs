use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use log::debug;

use crate::{ResourceQuantity, Result, Selector};

/// Label carrying the machine class of a node, e.g. `m5.2xlarge`
pub const INSTANCE_TYPE_LABEL: &str = "node.kubernetes.io/instance-type";

/// Resource name as used in container requests, limits and node capacity
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ResourceKind {
    Cpu,
    Memory,
    Other(String),
}

impl From<&str> for ResourceKind {
    fn from(name: &str) -> Self {
        match name {
            "cpu" => ResourceKind::Cpu,
            "memory" => ResourceKind::Memory,
            other => ResourceKind::Other(other.to_string()),
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Cpu => f.write_str("cpu"),
            ResourceKind::Memory => f.write_str("memory"),
            ResourceKind::Other(name) => f.write_str(name),
        }
    }
}

pub type ResourceList = BTreeMap<ResourceKind, ResourceQuantity>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeCapacity {
    pub cpu: ResourceQuantity,
    pub memory: ResourceQuantity,
    pub pods: ResourceQuantity,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Node {
    pub name: String,
    pub labels: BTreeMap<String, String>,
    pub capacity: NodeCapacity,
}

impl Node {
    /// Instance type label value, empty when the node does not carry it
    pub fn instance_type(&self) -> &str {
        self.labels
            .get(INSTANCE_TYPE_LABEL)
            .map(String::as_str)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContainerResources {
    pub name: String,
    pub requests: ResourceList,
    pub limits: ResourceList,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pod {
    pub name: String,
    pub namespace: String,
    /// Regular containers only; init containers are not tracked
    pub containers: Vec<ContainerResources>,
}

/// Source of the node and pod snapshot the report is built from
#[async_trait]
pub trait InventoryProvider {
    /// Nodes matching the selector
    async fn list_nodes(&self, selector: &Selector) -> Result<Vec<Node>>;

    /// Pods bound to the node that are neither Succeeded nor Failed
    async fn list_non_terminal_pods(&self, node_name: &str) -> Result<Vec<Pod>>;
}

/// In-memory inventory, for offline snapshots and tests.
///
/// Pods handed to it are assumed to be non-terminal already.
#[derive(Debug, Clone, Default)]
pub struct StaticInventory {
    nodes: Vec<Node>,
    pods: BTreeMap<String, Vec<Pod>>,
}

impl StaticInventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_node(mut self, node: Node, pods: Vec<Pod>) -> Self {
        self.pods.insert(node.name.clone(), pods);
        self.nodes.push(node);
        self
    }
}

#[async_trait]
impl InventoryProvider for StaticInventory {
    async fn list_nodes(&self, selector: &Selector) -> Result<Vec<Node>> {
        let nodes: Vec<Node> = self
            .nodes
            .iter()
            .filter(|node| selector.matches(&node.labels))
            .cloned()
            .collect();
        debug!("Static inventory matched {} of {} nodes", nodes.len(), self.nodes.len());
        Ok(nodes)
    }

    async fn list_non_terminal_pods(&self, node_name: &str) -> Result<Vec<Pod>> {
        Ok(self.pods.get(node_name).cloned().unwrap_or_default())
    }
}
