use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::GateError;

/// The relationship under which a package is installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DependencyType {
    #[serde(rename = "dependencies")]
    Dependencies,
    #[serde(rename = "devDependencies")]
    DevDependencies,
    #[serde(rename = "peerDependencies")]
    PeerDependencies,
    #[serde(rename = "optionalDependencies")]
    OptionalDependencies,
    #[serde(rename = "bundledDependencies")]
    BundledDependencies,
}

impl DependencyType {
    pub const ALL: [DependencyType; 5] = [
        DependencyType::Dependencies,
        DependencyType::DevDependencies,
        DependencyType::PeerDependencies,
        DependencyType::OptionalDependencies,
        DependencyType::BundledDependencies,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DependencyType::Dependencies => "dependencies",
            DependencyType::DevDependencies => "devDependencies",
            DependencyType::PeerDependencies => "peerDependencies",
            DependencyType::OptionalDependencies => "optionalDependencies",
            DependencyType::BundledDependencies => "bundledDependencies",
        }
    }
}

impl fmt::Display for DependencyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DependencyType {
    type Err = GateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DependencyType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| GateError::InvalidDependencyType(s.to_string()))
    }
}

/// Run-wide policy switches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicySettings {
    #[serde(default, alias = "allowedCategories")]
    pub allowed_categories: Vec<String>,

    #[serde(default = "default_true", alias = "failOnUnknownLicense")]
    pub fail_on_unknown_license: bool,

    #[serde(default = "all_dependency_types", alias = "dependencyTypes")]
    pub dependency_types: Vec<DependencyType>,
}

fn default_true() -> bool {
    true
}

pub(crate) fn all_dependency_types() -> Vec<DependencyType> {
    DependencyType::ALL.to_vec()
}

impl Default for PolicySettings {
    fn default() -> Self {
        Self {
            allowed_categories: Vec::new(),
            fail_on_unknown_license: true,
            dependency_types: all_dependency_types(),
        }
    }
}

impl PolicySettings {
    pub fn allows_category(&self, category: &str) -> bool {
        self.allowed_categories.iter().any(|c| c == category)
    }
}

/// One audited approval of a single license identifier.
///
/// Records are never edited. A renewal or revocation is a new record with
/// a later `approved_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LicenseRecord {
    pub identifier: String,
    pub category: String,
    pub rationale: String,
    #[serde(alias = "approvedBy")]
    pub approved_by: Vec<String>,
    #[serde(alias = "approvedAt")]
    pub approved_at: String,
    #[serde(default, alias = "expiresAt", skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
    #[serde(alias = "evidenceRef")]
    pub evidence_ref: String,
}

/// Which versions of a package an exception covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ExceptionScope {
    Exact { version: String },
    Range { range: String },
    Any,
}

impl ExceptionScope {
    /// Sort rank for canonical storage: exact < range < any.
    pub fn rank(&self) -> u8 {
        match self {
            ExceptionScope::Exact { .. } => 0,
            ExceptionScope::Range { .. } => 1,
            ExceptionScope::Any => 2,
        }
    }

    pub fn value(&self) -> &str {
        match self {
            ExceptionScope::Exact { version } => version,
            ExceptionScope::Range { range } => range,
            ExceptionScope::Any => "",
        }
    }
}

impl fmt::Display for ExceptionScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExceptionScope::Exact { version } => write!(f, "exact {}", version),
            ExceptionScope::Range { range } => write!(f, "range {}", range),
            ExceptionScope::Any => f.write_str("any version"),
        }
    }
}

/// A per-package override of license-based denial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExceptionRecord {
    pub package: String,
    #[serde(default, alias = "detectedLicenses")]
    pub detected_licenses: Vec<String>,
    pub reason: String,
    #[serde(alias = "approvedBy")]
    pub approved_by: Vec<String>,
    #[serde(alias = "approvedAt")]
    pub approved_at: String,
    #[serde(default, alias = "expiresAt", skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
    #[serde(alias = "evidenceRef")]
    pub evidence_ref: String,
    // Kept last so TOML output never places plain values after a sub-table
    pub scope: ExceptionScope,
}

/// Settings plus the two append-only approval ledgers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicyBundle {
    #[serde(default)]
    pub settings: PolicySettings,
    #[serde(default)]
    licenses: Vec<LicenseRecord>,
    #[serde(default)]
    exceptions: Vec<ExceptionRecord>,
}

impl PolicyBundle {
    pub fn new(
        settings: PolicySettings,
        licenses: Vec<LicenseRecord>,
        exceptions: Vec<ExceptionRecord>,
    ) -> Self {
        Self {
            settings,
            licenses,
            exceptions,
        }
    }

    pub fn licenses(&self) -> &[LicenseRecord] {
        &self.licenses
    }

    pub fn exceptions(&self) -> &[ExceptionRecord] {
        &self.exceptions
    }

    /// All records approving `identifier`, in ledger order.
    pub fn records_for<'a, 'id>(&'a self, identifier: &'id str) -> impl Iterator<Item = &'a LicenseRecord> + 'id
    where
        'a: 'id,
    {
        self.licenses.iter().filter(move |r| r.identifier == identifier)
    }

    pub fn append_license(&mut self, record: LicenseRecord) {
        self.licenses.push(record);
    }

    /// Reorder both ledgers into canonical storage order.
    pub fn canonicalize(&mut self) {
        super::activity::sort_license_records(&mut self.licenses);
        super::activity::sort_exception_records(&mut self.exceptions);
    }
}
