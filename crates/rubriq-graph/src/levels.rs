use std::collections::{BTreeMap, VecDeque};

use rubriq_core::error::{ConfigError, Result};

/// Partition a dependency graph into topological layers, roots first.
///
/// `graph` maps each requirement name to the names it unlocks. Every node's
/// prerequisites land in strictly earlier layers. Names within a layer are
/// sorted so concurrent-dispatch logs stay reproducible.
pub fn topological_levels(graph: &BTreeMap<String, Vec<String>>) -> Result<Vec<Vec<String>>> {
    let mut in_degree: BTreeMap<&str, usize> = BTreeMap::new();
    let mut children: BTreeMap<&str, Vec<&str>> = BTreeMap::new();

    for (parent, unlocks) in graph {
        in_degree.entry(parent.as_str()).or_insert(0);
        for child in unlocks {
            *in_degree.entry(child.as_str()).or_insert(0) += 1;
            children.entry(parent.as_str()).or_default().push(child.as_str());
        }
    }

    let mut layer: Vec<&str> = in_degree
        .iter()
        .filter(|(_, d)| **d == 0)
        .map(|(name, _)| *name)
        .collect();
    let mut levels: Vec<Vec<String>> = Vec::new();
    let mut emitted = 0usize;

    while !layer.is_empty() {
        layer.sort_unstable();
        emitted += layer.len();
        levels.push(layer.iter().map(|n| n.to_string()).collect());

        let mut queue: VecDeque<&str> = layer.drain(..).collect();
        while let Some(node) = queue.pop_front() {
            for &child in children.get(node).map(|c| c.as_slice()).unwrap_or(&[]) {
                if let Some(degree) = in_degree.get_mut(child) {
                    *degree -= 1;
                    if *degree == 0 {
                        layer.push(child);
                    }
                }
            }
        }
    }

    if emitted != in_degree.len() {
        return Err(ConfigError::CycleDetected.into());
    }
    Ok(levels)
}
