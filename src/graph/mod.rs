pub mod builder;
pub mod upstream;

pub use builder::{
    build_graph, filter_by_dependency_types, DependencyEntry, DependencyGraph, ROOT_NODE,
    UNKNOWN_VERSION,
};
pub use upstream::{upstream_chains, ChainCache, DEFAULT_UPSTREAM_LIMIT};
