use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::decision::{decide, decide_legacy, Decision, ReasonType};
use super::exceptions::find_exception;
use super::remediation::{remediation_for, RemediationContext};
use crate::graph::{filter_by_dependency_types, upstream_chains, ChainCache, DependencyEntry, DependencyGraph};
use crate::license::CategoryLookup;
use crate::policy::{DependencyType, Policy};

/// A dependency that failed the gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Violation {
    #[serde(flatten)]
    pub entry: DependencyEntry,
    pub reason: String,
    pub reason_type: ReasonType,
    pub remediation: Vec<String>,
    pub upstream: Vec<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViolationSummary {
    pub total_dependencies: usize,
    /// Entries left after the dependency-type filter.
    pub evaluated: usize,
    pub allowed: usize,
    /// Denials suppressed by an active exception.
    pub excepted: usize,
    pub violations: usize,
    pub by_reason: BTreeMap<ReasonType, usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceReport {
    pub generated_at: DateTime<Utc>,
    pub evaluated_at: DateTime<Utc>,
    pub legacy_policy: bool,
    pub summary: ViolationSummary,
    pub violations: Vec<Violation>,
}

impl ComplianceReport {
    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Knobs for a single gate run.
#[derive(Debug, Clone, Copy)]
pub struct CheckOptions {
    pub now: DateTime<Utc>,
    pub upstream_limit: usize,
}

/// Evaluate every in-scope entry of `graph` against `policy`.
///
/// Entries are judged independently; the only state shared across them is
/// the upstream chain cache, which is local to this call.
pub fn evaluate(
    graph: &DependencyGraph,
    policy: &Policy,
    catalog: &dyn CategoryLookup,
    options: CheckOptions,
) -> ComplianceReport {
    let types: &[DependencyType] = match policy {
        Policy::Governed(bundle) => bundle.settings.dependency_types.as_slice(),
        Policy::Legacy(_) => &DependencyType::ALL[..],
    };
    let in_scope = filter_by_dependency_types(graph.entries(), types);

    let mut summary = ViolationSummary {
        total_dependencies: graph.entries().len(),
        evaluated: in_scope.len(),
        ..Default::default()
    };
    let mut violations = Vec::new();
    let mut cache = ChainCache::new();

    for entry in in_scope {
        let Some(mut violation) = evaluate_entry(entry, policy, catalog, options.now, &mut summary) else {
            continue;
        };
        violation.upstream = upstream_chains(&entry.identity_path, graph, options.upstream_limit, &mut cache);
        *summary.by_reason.entry(violation.reason_type).or_insert(0) += 1;
        violations.push(violation);
    }

    summary.violations = violations.len();
    tracing::debug!(
        evaluated = summary.evaluated,
        allowed = summary.allowed,
        excepted = summary.excepted,
        violations = summary.violations,
        cached_chains = cache.len(),
        "evaluation finished"
    );

    ComplianceReport {
        generated_at: Utc::now(),
        evaluated_at: options.now,
        legacy_policy: matches!(policy, Policy::Legacy(_)),
        summary,
        violations,
    }
}

fn evaluate_entry(
    entry: &DependencyEntry,
    policy: &Policy,
    catalog: &dyn CategoryLookup,
    now: DateTime<Utc>,
    summary: &mut ViolationSummary,
) -> Option<Violation> {
    let bundle = match policy {
        Policy::Governed(bundle) => bundle,
        Policy::Legacy(legacy) => {
            let decision = decide_legacy(entry, legacy);
            return denial(entry, decision, summary, |reason_type, tokens| {
                remediation_for(
                    reason_type,
                    entry,
                    RemediationContext {
                        tokens,
                        ..Default::default()
                    },
                )
            });
        }
    };

    let (reason_type, message, tokens, governing) = match decide(entry, bundle, catalog, now) {
        Decision::Allowed { .. } => {
            tracing::debug!(package = %entry.label(), "allowed");
            summary.allowed += 1;
            return None;
        }
        Decision::Denied {
            reason_type,
            message,
            tokens,
            governing,
        } => (reason_type, message, tokens, governing),
    };

    let exception = find_exception(entry, bundle.exceptions(), now);
    if exception.active {
        tracing::debug!(package = %entry.label(), "denial suppressed by active exception");
        summary.excepted += 1;
        return None;
    }

    let (reason_type, reason) = match exception.governing {
        Some(record) if exception.matched => (
            ReasonType::ExpiredException,
            format!(
                "Exception for {} expired at {} ({})",
                entry.label(),
                record.expires_at.as_deref().unwrap_or("an unreadable date"),
                message
            ),
        ),
        _ => (reason_type, message),
    };
    tracing::debug!(package = %entry.label(), reason = %reason_type, "denied");

    let remediation = remediation_for(
        reason_type,
        entry,
        RemediationContext {
            tokens: &tokens,
            license_record: governing,
            exception: exception.governing,
        },
    );

    Some(Violation {
        entry: entry.clone(),
        reason,
        reason_type,
        remediation,
        upstream: Vec::new(),
    })
}

fn denial(
    entry: &DependencyEntry,
    decision: Decision<'_>,
    summary: &mut ViolationSummary,
    remediate: impl FnOnce(ReasonType, &[String]) -> Vec<String>,
) -> Option<Violation> {
    match decision {
        Decision::Allowed { .. } => {
            summary.allowed += 1;
            None
        }
        Decision::Denied {
            reason_type,
            message,
            tokens,
            ..
        } => Some(Violation {
            entry: entry.clone(),
            reason: message,
            remediation: remediate(reason_type, &tokens),
            reason_type,
            upstream: Vec::new(),
        }),
    }
}
