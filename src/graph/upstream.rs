use std::collections::HashMap;

use super::builder::{DependencyGraph, ROOT_NODE};

/// Default number of chains reported per violating package.
pub const DEFAULT_UPSTREAM_LIMIT: usize = 5;

/// Per-run memo of resolved chains, keyed by node only.
///
/// Keying ignores the traversal trail, so a node first reached from inside a
/// cycle keeps the shorter chain set it saw then. This bounds the work on
/// densely shared graphs at the cost of completeness on cyclic diamonds.
#[derive(Debug, Default)]
pub struct ChainCache {
    chains: HashMap<String, Vec<Vec<String>>>,
}

impl ChainCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }
}

/// Chains of node keys ending at `node`, and whether they are anchored,
/// i.e. start at a node with no recorded parents.
///
/// When every path from `node` loops back onto the trail, `node` heads an
/// unanchored chain. Those only stand in when no anchored chain exists and
/// are never cached, since they hold for the current trail alone.
fn resolve(
    node: &str,
    graph: &DependencyGraph,
    limit: usize,
    trail: &mut Vec<String>,
    cache: &mut ChainCache,
) -> (Vec<Vec<String>>, bool) {
    if let Some(hit) = cache.chains.get(node) {
        return (hit.clone(), true);
    }

    if !graph.has_parents(node) {
        let chains = vec![vec![node.to_string()]];
        cache.chains.insert(node.to_string(), chains.clone());
        return (chains, true);
    }

    let mut anchored = Vec::new();
    let mut looped = Vec::new();
    trail.push(node.to_string());
    for parent in graph.parents(node) {
        if anchored.len() >= limit {
            break;
        }
        if trail.iter().any(|visited| visited == parent) {
            continue;
        }
        let (chains, is_anchored) = resolve(parent, graph, limit, trail, cache);
        let bucket = if is_anchored { &mut anchored } else { &mut looped };
        for mut chain in chains {
            if bucket.len() >= limit {
                break;
            }
            chain.push(node.to_string());
            bucket.push(chain);
        }
    }
    trail.pop();

    if !anchored.is_empty() {
        cache.chains.insert(node.to_string(), anchored.clone());
        return (anchored, true);
    }
    if looped.is_empty() {
        looped.push(vec![node.to_string()]);
    }
    (looped, false)
}

/// Explain why `target` is installed: up to `limit` paths from a top-level
/// dependency down to (but excluding) `target`, as `name@version` labels.
///
/// A direct dependency of the project yields no chains.
pub fn upstream_chains(
    target: &str,
    graph: &DependencyGraph,
    limit: usize,
    cache: &mut ChainCache,
) -> Vec<Vec<String>> {
    let limit = limit.max(1);
    let mut trail = Vec::new();

    let (chains, _) = resolve(target, graph, limit, &mut trail, cache);
    chains
        .into_iter()
        .filter_map(|mut chain| {
            chain.pop();
            let labels: Vec<String> = chain
                .iter()
                .skip_while(|node| node.as_str() == ROOT_NODE)
                .map(|node| graph.label(node))
                .collect();
            (!labels.is_empty()).then_some(labels)
        })
        .collect()
}
