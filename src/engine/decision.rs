use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::graph::DependencyEntry;
use crate::license::{tokenize, CategoryLookup, UNKNOWN_LICENSE};
use crate::policy::{most_recent, LegacyPolicy, LicenseRecord, Partition, PolicyBundle};

/// Why a dependency was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReasonType {
    UnknownLicense,
    ExpiredLicensePolicy,
    LicenseNotAllowed,
    ExpiredException,
    LegacyNotAllowed,
}

impl ReasonType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasonType::UnknownLicense => "unknown-license",
            ReasonType::ExpiredLicensePolicy => "expired-license-policy",
            ReasonType::LicenseNotAllowed => "license-not-allowed",
            ReasonType::ExpiredException => "expired-exception",
            ReasonType::LegacyNotAllowed => "legacy-not-allowed",
        }
    }
}

impl fmt::Display for ReasonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which path let a dependency through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AllowedVia {
    ExplicitLicenseRecord,
    CategoryAllowlist,
    Exception,
    LegacyAllowlist,
}

/// Verdict for one dependency, before exceptions are consulted.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision<'a> {
    Allowed {
        via: AllowedVia,
        token: String,
        /// Set when an explicit record granted the approval.
        governing: Option<&'a LicenseRecord>,
        /// Set when the category allowlist granted the approval.
        category: Option<String>,
    },
    Denied {
        reason_type: ReasonType,
        message: String,
        tokens: Vec<String>,
        /// Most recent expired record for `expired-license-policy`.
        governing: Option<&'a LicenseRecord>,
    },
}

impl<'a> Decision<'a> {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed { .. })
    }

    pub fn reason_type(&self) -> Option<ReasonType> {
        match self {
            Decision::Allowed { .. } => None,
            Decision::Denied { reason_type, .. } => Some(*reason_type),
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            Decision::Allowed { .. } => None,
            Decision::Denied { message, .. } => Some(message),
        }
    }

    pub fn governing_record(&self) -> Option<&'a LicenseRecord> {
        match self {
            Decision::Allowed { governing, .. } | Decision::Denied { governing, .. } => *governing,
        }
    }
}

/// Decide whether `entry`'s license is authorized by `bundle` at `now`.
///
/// Explicit records are consulted first and, once any exists for an
/// identifier, that identifier never falls through to the category
/// allowlist, even when every record for it has lapsed.
pub fn decide<'a>(
    entry: &DependencyEntry,
    bundle: &'a PolicyBundle,
    catalog: &dyn CategoryLookup,
    now: DateTime<Utc>,
) -> Decision<'a> {
    let tokens = tokenize(entry.license.as_deref());
    let mut explicitly_governed: HashSet<&str> = HashSet::new();
    let mut pending_expired: Option<(&str, &'a LicenseRecord)> = None;

    for token in tokens.iter().filter(|t| *t != UNKNOWN_LICENSE) {
        let partition = Partition::new(bundle.records_for(token), now);
        if partition.is_empty() {
            continue;
        }
        explicitly_governed.insert(token.as_str());

        if let Some(governing) = most_recent(partition.active.iter().copied()) {
            return Decision::Allowed {
                via: AllowedVia::ExplicitLicenseRecord,
                token: token.clone(),
                governing: Some(governing),
                category: None,
            };
        }

        // Only the first lapsed identifier is reported
        if pending_expired.is_none() {
            if let Some(expired) = most_recent(partition.expired.iter().copied()) {
                pending_expired = Some((token.as_str(), expired));
            }
        }
    }

    for token in tokens.iter() {
        if token == UNKNOWN_LICENSE || explicitly_governed.contains(token.as_str()) {
            continue;
        }
        if let Some(category) = catalog.category_of(token) {
            if bundle.settings.allows_category(category) {
                return Decision::Allowed {
                    via: AllowedVia::CategoryAllowlist,
                    token: token.clone(),
                    governing: None,
                    category: Some(category.to_string()),
                };
            }
        }
    }

    let has_unknown = tokens.contains(UNKNOWN_LICENSE);
    let token_list: Vec<String> = tokens.iter().cloned().collect();

    if has_unknown && bundle.settings.fail_on_unknown_license {
        return Decision::Denied {
            reason_type: ReasonType::UnknownLicense,
            message: format!("{} declares no recognizable license", entry.label()),
            tokens: token_list,
            governing: None,
        };
    }

    if let Some((token, record)) = pending_expired {
        return Decision::Denied {
            reason_type: ReasonType::ExpiredLicensePolicy,
            message: format!(
                "Approval for license '{}' expired at {} (approved {}, evidence {})",
                token,
                record.expires_at.as_deref().unwrap_or("an unreadable date"),
                record.approved_at,
                record.evidence_ref
            ),
            tokens: token_list,
            governing: Some(record),
        };
    }

    Decision::Denied {
        reason_type: ReasonType::LicenseNotAllowed,
        message: format!(
            "License '{}' has no license record and no allowed category",
            entry.license.as_deref().unwrap_or(UNKNOWN_LICENSE)
        ),
        tokens: token_list,
        governing: None,
    }
}

/// Degraded evaluation against an unmigrated allowlist policy.
pub fn decide_legacy<'a>(entry: &DependencyEntry, policy: &LegacyPolicy) -> Decision<'a> {
    let tokens = tokenize(entry.license.as_deref());

    if let Some(exception) = policy.is_exception(&entry.name, &entry.version) {
        return Decision::Allowed {
            via: AllowedVia::Exception,
            token: exception.reason.clone(),
            governing: None,
            category: None,
        };
    }

    for token in tokens.iter().filter(|t| *t != UNKNOWN_LICENSE) {
        if policy.allowed_licenses.matches(token) {
            return Decision::Allowed {
                via: AllowedVia::LegacyAllowlist,
                token: token.clone(),
                governing: None,
                category: None,
            };
        }
    }

    Decision::Denied {
        reason_type: ReasonType::LegacyNotAllowed,
        message: format!(
            "License '{}' is not in the legacy allowlist",
            entry.license.as_deref().unwrap_or(UNKNOWN_LICENSE)
        ),
        tokens: tokens.into_iter().collect(),
        governing: None,
    }
}
