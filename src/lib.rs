pub mod config;
pub mod engine;
pub mod error;
pub mod graph;
pub mod init;
pub mod license;
pub mod npm_lock;
pub mod output;
pub mod policy;

// Re-export main types for easy access
pub use engine::{evaluate, CheckOptions, ComplianceReport, ReasonType, Violation, ViolationSummary};
pub use error::{GateError, GateResult};
pub use graph::{build_graph, DependencyEntry, DependencyGraph};
pub use policy::{load_policy, Policy, PolicyBundle};
