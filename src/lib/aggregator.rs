use log::{debug, info};

use crate::lib::allocation::{
    ClusterMetrics, compute_node_allocation, fold_by_instance_type, fold_totals,
};
use crate::lib::inventory::InventoryProvider;
use crate::{Config, Result, Selector};

/// Builds the allocated resources report from an inventory provider.
pub struct AllocatedResourcesClient<P> {
    provider: P,
    config: Config,
}

impl<P: InventoryProvider> AllocatedResourcesClient<P> {
    pub fn new(provider: P, config: Config) -> Self {
        Self { provider, config }
    }

    /// Fetch the selected nodes and their pods, then fold them into the
    /// report. The selector is validated before the provider is called, and
    /// any failure aborts the whole report.
    pub async fn get_allocated_resources(&self) -> Result<ClusterMetrics> {
        let selector = Selector::parse(&self.config.label_selector)?;
        debug!("Listing nodes matching '{}'", selector);

        let nodes = self.provider.list_nodes(&selector).await?;
        info!("Found {} nodes matching '{}'", nodes.len(), selector);

        let mut node_results = Vec::with_capacity(nodes.len());
        for node in &nodes {
            let pods = self.provider.list_non_terminal_pods(&node.name).await?;
            debug!("Node {} has {} non-terminated pods", node.name, pods.len());
            node_results.push(compute_node_allocation(node, &pods)?);
        }

        let totals = fold_totals(&node_results)?;
        let instance_types = if self.config.group_by_instance_type {
            Some(fold_by_instance_type(&node_results)?)
        } else {
            None
        };
        let nodes = self.config.node_details.then_some(node_results);

        Ok(ClusterMetrics {
            totals,
            instance_types,
            nodes,
        })
    }
}
