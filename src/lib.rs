//! Kubernetes Allocated Resources Library
//!
//! This library reads node and pod inventory from a Kubernetes cluster and
//! reports allocated CPU, memory and pod capacity per node, per instance type
//! and for the whole selection.

pub mod lib {
    pub mod aggregator;
    pub mod allocation;
    pub mod cli;
    pub mod config;
    pub mod error;
    pub mod inventory;
    pub mod kubernetes;
    pub mod logger;
    pub mod output;
    pub mod quantity;
    pub mod selector;
    pub mod tui;
}

// Re-export commonly used types at the root level for convenience
pub use lib::aggregator::AllocatedResourcesClient;
pub use lib::allocation::{
    ClusterMetrics, NodeAllocatedResources, compute_node_allocation, fold_by_instance_type,
    fold_totals, percentage, sum_container_resources,
};
pub use lib::cli::{Cli, OutputFormat};
pub use lib::config::{Config, DEFAULT_SELECTOR};
pub use lib::error::{
    AllocatedResourcesError, ConfigError, KubernetesError, QuantityError, Result, SelectorError,
};
pub use lib::inventory::{
    ContainerResources, INSTANCE_TYPE_LABEL, InventoryProvider, Node, NodeCapacity, Pod,
    ResourceKind, ResourceList, StaticInventory,
};
pub use lib::kubernetes::KubernetesLoader;
pub use lib::logger::init_logger;
pub use lib::output::render;
pub use lib::quantity::ResourceQuantity;
pub use lib::selector::Selector;
pub use lib::tui::display_allocation_table;
