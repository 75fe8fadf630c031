use std::collections::BTreeMap;

use serde::Serialize;

use crate::lib::inventory::{Node, Pod, ResourceKind, ResourceList};
use crate::QuantityError;

/// Allocated resources of a single node, or of a group of nodes.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeAllocatedResources {
    /// Number of nodes folded into this entry
    pub node_count: usize,

    /// Node name, empty for aggregates
    #[serde(skip_serializing_if = "String::is_empty")]
    pub node_name: String,

    /// The instance type like m5.2xlarge
    #[serde(skip_serializing_if = "String::is_empty")]
    pub instance_type: String,

    /// Requested millicores
    pub cpu_requests: i64,
    pub cpu_requests_percentage: f64,

    /// CPU limit in millicores, may exceed the total when overcommitted
    pub cpu_limits: i64,
    pub cpu_limits_percentage: f64,

    /// Node CPU capacity in millicores
    pub cpu_total: i64,

    /// Requested memory in bytes
    pub memory_requests: i64,
    pub memory_requests_percentage: f64,

    /// Memory limit in bytes, may exceed the total when overcommitted
    pub memory_limits: i64,
    pub memory_limits_percentage: f64,

    /// Node memory capacity in bytes
    pub memory_total: i64,

    /// Number of non-terminated pods on the node
    pub pods_allocated: i64,

    /// Maximum number of pods the node accepts
    pub pods_total: i64,
    pub pods_allocated_percentage: f64,

    #[serde(skip)]
    pub labels: BTreeMap<String, String>,
}

impl NodeAllocatedResources {
    /// Add the additive fields of `other`, failing instead of wrapping when a
    /// sum leaves the `i64` range.
    fn checked_add_assign(&mut self, other: &Self) -> Result<(), QuantityError> {
        self.node_count = self
            .node_count
            .checked_add(other.node_count)
            .ok_or_else(|| QuantityError::Overflow("nodeCount".to_string()))?;
        self.cpu_requests = checked_sum("cpuRequests", self.cpu_requests, other.cpu_requests)?;
        self.cpu_limits = checked_sum("cpuLimits", self.cpu_limits, other.cpu_limits)?;
        self.cpu_total = checked_sum("cpuTotal", self.cpu_total, other.cpu_total)?;
        self.memory_requests =
            checked_sum("memoryRequests", self.memory_requests, other.memory_requests)?;
        self.memory_limits = checked_sum("memoryLimits", self.memory_limits, other.memory_limits)?;
        self.memory_total = checked_sum("memoryTotal", self.memory_total, other.memory_total)?;
        self.pods_allocated =
            checked_sum("podsAllocated", self.pods_allocated, other.pods_allocated)?;
        self.pods_total = checked_sum("podsTotal", self.pods_total, other.pods_total)?;
        Ok(())
    }

    fn update_percentages(&mut self) {
        self.cpu_requests_percentage = percentage(self.cpu_requests, self.cpu_total);
        self.cpu_limits_percentage = percentage(self.cpu_limits, self.cpu_total);
        self.memory_requests_percentage = percentage(self.memory_requests, self.memory_total);
        self.memory_limits_percentage = percentage(self.memory_limits, self.memory_total);
        self.pods_allocated_percentage = percentage(self.pods_allocated, self.pods_total);
    }
}

/// Report for one inventory snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterMetrics {
    /// Summed up metrics of all selected nodes
    pub totals: NodeAllocatedResources,

    /// Totals per instance type, only when grouping was requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_types: Option<Vec<NodeAllocatedResources>>,

    /// Allocated resources of each node, only when details were requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nodes: Option<Vec<NodeAllocatedResources>>,
}

/// `used` as a percentage of `total`, or 0 when there is no capacity.
/// Never capped at 100.
pub fn percentage(used: i64, total: i64) -> f64 {
    if total > 0 {
        used as f64 / total as f64 * 100.0
    } else {
        0.0
    }
}

fn checked_sum(field: &str, a: i64, b: i64) -> Result<i64, QuantityError> {
    a.checked_add(b)
        .ok_or_else(|| QuantityError::Overflow(format!("{field}: {a} + {b}")))
}

fn accumulate(into: &mut ResourceList, from: &ResourceList) -> Result<(), QuantityError> {
    for (kind, quantity) in from {
        let entry = into.entry(kind.clone()).or_default();
        *entry = entry.checked_add(quantity)?;
    }
    Ok(())
}

/// Sum requests and limits over the regular containers of a pod.
pub fn sum_container_resources(pod: &Pod) -> Result<(ResourceList, ResourceList), QuantityError> {
    let mut requests = ResourceList::new();
    let mut limits = ResourceList::new();
    for container in &pod.containers {
        accumulate(&mut requests, &container.requests)?;
        accumulate(&mut limits, &container.limits)?;
    }
    Ok((requests, limits))
}

/// Allocated resources of one node given its non-terminated pods.
pub fn compute_node_allocation(
    node: &Node,
    pods: &[Pod],
) -> Result<NodeAllocatedResources, QuantityError> {
    let mut requests = ResourceList::new();
    let mut limits = ResourceList::new();
    for pod in pods {
        let (pod_requests, pod_limits) = sum_container_resources(pod)?;
        accumulate(&mut requests, &pod_requests)?;
        accumulate(&mut limits, &pod_limits)?;
    }

    let get = |list: &ResourceList, kind: &ResourceKind| {
        list.get(kind).copied().unwrap_or_default()
    };

    let mut allocated = NodeAllocatedResources {
        node_count: 1,
        node_name: node.name.clone(),
        instance_type: node.instance_type().to_string(),
        cpu_requests: get(&requests, &ResourceKind::Cpu).milli_value()?,
        cpu_limits: get(&limits, &ResourceKind::Cpu).milli_value()?,
        cpu_total: node.capacity.cpu.milli_value()?,
        memory_requests: get(&requests, &ResourceKind::Memory).value()?,
        memory_limits: get(&limits, &ResourceKind::Memory).value()?,
        memory_total: node.capacity.memory.value()?,
        pods_allocated: pods.len() as i64,
        pods_total: node.capacity.pods.value()?,
        labels: node.labels.clone(),
        ..Default::default()
    };
    allocated.update_percentages();
    Ok(allocated)
}

/// Sum every additive field of the node results and recompute percentages
/// from the sums. A sum outside the `i64` range is reported as an overflow.
pub fn fold_totals<'a, I>(node_results: I) -> Result<NodeAllocatedResources, QuantityError>
where
    I: IntoIterator<Item = &'a NodeAllocatedResources>,
{
    let mut totals = NodeAllocatedResources::default();
    for node in node_results {
        totals.checked_add_assign(node)?;
    }
    totals.update_percentages();
    Ok(totals)
}

/// Totals per distinct instance type, sorted by instance type. Nodes without
/// the instance type label form the group keyed by the empty string.
pub fn fold_by_instance_type(
    node_results: &[NodeAllocatedResources],
) -> Result<Vec<NodeAllocatedResources>, QuantityError> {
    let mut groups: BTreeMap<&str, Vec<&NodeAllocatedResources>> = BTreeMap::new();
    for node in node_results {
        groups.entry(node.instance_type.as_str()).or_default().push(node);
    }

    groups
        .into_iter()
        .map(|(instance_type, members)| {
            Ok(NodeAllocatedResources {
                instance_type: instance_type.to_string(),
                ..fold_totals(members)?
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ResourceQuantity;
    use crate::lib::inventory::{ContainerResources, INSTANCE_TYPE_LABEL, NodeCapacity};

    fn q(s: &str) -> ResourceQuantity {
        s.parse().unwrap()
    }

    fn resources(cpu: &str, memory: &str) -> ResourceList {
        ResourceList::from([(ResourceKind::Cpu, q(cpu)), (ResourceKind::Memory, q(memory))])
    }

    fn pod(requests: ResourceList, limits: ResourceList) -> Pod {
        Pod {
            name: "pod".to_string(),
            namespace: "default".to_string(),
            containers: vec![ContainerResources {
                name: "app".to_string(),
                requests,
                limits,
            }],
        }
    }

    fn node(name: &str, cpu: &str, memory: &str, pods: &str) -> Node {
        Node {
            name: name.to_string(),
            labels: BTreeMap::new(),
            capacity: NodeCapacity {
                cpu: q(cpu),
                memory: q(memory),
                pods: q(pods),
            },
        }
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn sums_requests_and_limits_across_containers() {
        let pod = Pod {
            containers: vec![
                ContainerResources {
                    name: "app".to_string(),
                    requests: resources("250m", "128Mi"),
                    limits: ResourceList::from([(ResourceKind::Cpu, q("1"))]),
                },
                ContainerResources {
                    name: "sidecar".to_string(),
                    requests: ResourceList::from([
                        (ResourceKind::Cpu, q("50m")),
                        (ResourceKind::from("nvidia.com/gpu"), q("1")),
                    ]),
                    limits: ResourceList::new(),
                },
            ],
            ..Default::default()
        };

        let (requests, limits) = sum_container_resources(&pod).unwrap();
        assert_eq!(requests[&ResourceKind::Cpu].milli_value().unwrap(), 300);
        assert_eq!(requests[&ResourceKind::Memory].value().unwrap(), 128 * 1024 * 1024);
        assert_eq!(requests[&ResourceKind::from("nvidia.com/gpu")].value().unwrap(), 1);
        assert_eq!(limits[&ResourceKind::Cpu].milli_value().unwrap(), 1000);
        assert!(!limits.contains_key(&ResourceKind::Memory));
    }

    #[test]
    fn computes_node_allocation() {
        let node = node("worker-1", "4", "8Gi", "110");
        let pods = vec![
            pod(resources("500m", "1Gi"), resources("1000m", "2Gi")),
            pod(resources("500m", "1Gi"), resources("1000m", "2Gi")),
        ];

        let allocated = compute_node_allocation(&node, &pods).unwrap();
        assert_eq!(allocated.node_name, "worker-1");
        assert_eq!(allocated.node_count, 1);
        assert_eq!(allocated.cpu_total, 4000);
        assert_eq!(allocated.cpu_requests, 1000);
        assert_close(allocated.cpu_requests_percentage, 25.0);
        assert_eq!(allocated.cpu_limits, 2000);
        assert_close(allocated.cpu_limits_percentage, 50.0);
        assert_eq!(allocated.memory_requests, 2 * 1024 * 1024 * 1024);
        assert_close(allocated.memory_requests_percentage, 25.0);
        assert_close(allocated.memory_limits_percentage, 50.0);
        assert_eq!(allocated.pods_allocated, 2);
        assert_eq!(allocated.pods_total, 110);
        assert_close(allocated.pods_allocated_percentage, 200.0 / 110.0);
    }

    #[test]
    fn empty_pod_list_yields_zero_allocation() {
        let allocated = compute_node_allocation(&node("idle", "2", "4Gi", "110"), &[]).unwrap();
        assert_eq!(allocated.pods_allocated, 0);
        assert_eq!(allocated.cpu_requests, 0);
        assert_eq!(allocated.cpu_requests_percentage, 0.0);
        assert_eq!(allocated.pods_allocated_percentage, 0.0);
    }

    #[test]
    fn zero_capacity_never_divides() {
        let node = node("broken", "0", "0", "0");
        let pods = vec![pod(resources("500m", "1Gi"), resources("1", "2Gi"))];

        let allocated = compute_node_allocation(&node, &pods).unwrap();
        assert_eq!(allocated.cpu_requests_percentage, 0.0);
        assert_eq!(allocated.cpu_limits_percentage, 0.0);
        assert_eq!(allocated.memory_requests_percentage, 0.0);
        assert_eq!(allocated.memory_limits_percentage, 0.0);
        assert_eq!(allocated.pods_allocated_percentage, 0.0);

        let missing = Node {
            name: "no-capacity".to_string(),
            ..Default::default()
        };
        let allocated = compute_node_allocation(&missing, &pods).unwrap();
        assert!(allocated.cpu_requests_percentage.is_finite());
        assert_eq!(allocated.cpu_total, 0);
    }

    #[test]
    fn overcommit_is_not_capped() {
        let node = node("small", "1000m", "1Gi", "10");
        let pods = vec![pod(resources("2000m", "512Mi"), resources("3", "3Gi"))];

        let allocated = compute_node_allocation(&node, &pods).unwrap();
        assert_close(allocated.cpu_requests_percentage, 200.0);
        assert_close(allocated.cpu_limits_percentage, 300.0);
        assert_close(allocated.memory_limits_percentage, 300.0);
    }

    #[test]
    fn folds_totals_and_recomputes_percentages() {
        let a = compute_node_allocation(
            &node("a", "4", "8Gi", "110"),
            &[pod(resources("1", "1Gi"), resources("2", "2Gi"))],
        )
        .unwrap();
        let b = compute_node_allocation(
            &node("b", "2", "4Gi", "10"),
            &[
                pod(resources("500m", "512Mi"), ResourceList::new()),
                pod(resources("500m", "512Mi"), ResourceList::new()),
            ],
        )
        .unwrap();

        let totals = fold_totals([&a, &b]).unwrap();
        assert_eq!(totals.node_count, 2);
        assert!(totals.node_name.is_empty());
        assert_eq!(totals.cpu_requests, a.cpu_requests + b.cpu_requests);
        assert_eq!(totals.cpu_limits, a.cpu_limits + b.cpu_limits);
        assert_eq!(totals.cpu_total, 6000);
        assert_eq!(totals.memory_requests, a.memory_requests + b.memory_requests);
        assert_eq!(totals.memory_total, a.memory_total + b.memory_total);
        assert_eq!(totals.pods_allocated, 3);
        assert_eq!(totals.pods_total, 120);
        assert_close(totals.cpu_requests_percentage, 2000.0 / 6000.0 * 100.0);
        assert_close(totals.pods_allocated_percentage, 3.0 / 120.0 * 100.0);
    }

    #[test]
    fn aggregate_percentages_are_not_truncated() {
        // integer division would report 33.0 here
        let node = compute_node_allocation(
            &node("a", "3", "3", "3"),
            &[pod(resources("1", "1"), ResourceList::new())],
        )
        .unwrap();

        let totals = fold_totals([&node]).unwrap();
        assert_close(totals.cpu_requests_percentage, 100.0 / 3.0);
        assert_eq!(totals.cpu_requests_percentage, node.cpu_requests_percentage);
        assert_eq!(totals.pods_allocated_percentage, node.pods_allocated_percentage);
    }

    #[test]
    fn folding_nothing_gives_zero_totals() {
        let totals = fold_totals(&Vec::new()).unwrap();
        assert_eq!(totals, NodeAllocatedResources::default());
        assert_eq!(totals.cpu_requests_percentage, 0.0);
    }

    #[test]
    fn folding_past_i64_reports_overflow() {
        let a = compute_node_allocation(&node("a", "4", "8E", "110"), &[]).unwrap();
        let b = compute_node_allocation(&node("b", "4", "8E", "110"), &[]).unwrap();
        assert_eq!(a.memory_total, 8_000_000_000_000_000_000);

        assert!(matches!(
            fold_totals([&a, &b]),
            Err(QuantityError::Overflow(_))
        ));
        assert!(matches!(
            fold_by_instance_type(&[a, b]),
            Err(QuantityError::Overflow(_))
        ));
    }

    #[test]
    fn capacity_beyond_i64_is_reported() {
        let huge = node("huge", "4", "16E", "110");
        assert!(matches!(
            compute_node_allocation(&huge, &[]),
            Err(QuantityError::Overflow(_))
        ));

        let cpu = node("cpu", "10E", "1Gi", "110");
        assert!(matches!(
            compute_node_allocation(&cpu, &[]),
            Err(QuantityError::Overflow(_))
        ));
    }

    #[test]
    fn groups_by_instance_type_including_unlabeled() {
        let mut labeled = node("a", "2", "4Gi", "110");
        labeled
            .labels
            .insert(INSTANCE_TYPE_LABEL.to_string(), "m5.large".to_string());
        let unlabeled = node("b", "4", "8Gi", "110");

        let results = vec![
            compute_node_allocation(&labeled, &[]).unwrap(),
            compute_node_allocation(&unlabeled, &[]).unwrap(),
        ];
        let groups = fold_by_instance_type(&results).unwrap();

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].instance_type, "");
        assert_eq!(groups[0].node_count, 1);
        assert_eq!(groups[0].cpu_total, 4000);
        assert_eq!(groups[1].instance_type, "m5.large");
        assert_eq!(groups[1].node_count, 1);
        assert_eq!(groups[1].cpu_total, 2000);
        assert!(groups.iter().all(|g| g.node_name.is_empty()));
    }

    #[test]
    fn group_node_counts_partition_the_totals() {
        let types = ["m5.large", "m5.xlarge", "", "c5.2xlarge"];
        let results: Vec<_> = (0..13)
            .map(|i| {
                let mut n = node(&format!("node-{i}"), "2", "4Gi", "110");
                let instance_type = types[i % types.len()];
                if !instance_type.is_empty() {
                    n.labels
                        .insert(INSTANCE_TYPE_LABEL.to_string(), instance_type.to_string());
                }
                let pods = vec![pod(resources("100m", "64Mi"), ResourceList::new()); i % 3];
                compute_node_allocation(&n, &pods).unwrap()
            })
            .collect();

        let totals = fold_totals(&results).unwrap();
        let groups = fold_by_instance_type(&results).unwrap();

        assert_eq!(groups.len(), types.len());
        assert_eq!(groups.iter().map(|g| g.node_count).sum::<usize>(), totals.node_count);
        assert_eq!(
            groups.iter().map(|g| g.cpu_requests).sum::<i64>(),
            totals.cpu_requests
        );
        assert_eq!(
            groups.iter().map(|g| g.pods_allocated).sum::<i64>(),
            totals.pods_allocated
        );
    }

    #[test]
    fn serializes_without_labels() {
        let mut n = node("worker-1", "1", "1Gi", "10");
        n.labels.insert("secret".to_string(), "label".to_string());
        let allocated = compute_node_allocation(&n, &[]).unwrap();

        let json = serde_json::to_value(&allocated).unwrap();
        assert_eq!(json["nodeName"], "worker-1");
        assert_eq!(json["cpuTotal"], 1000);
        assert_eq!(json["podsAllocatedPercentage"], 0.0);
        assert!(json.get("labels").is_none());
        assert!(json.get("instanceType").is_none());
    }
}
