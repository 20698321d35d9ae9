use glob::Pattern;
use serde::{Deserialize, Serialize};

/// Allowlist rule from the legacy policy format: exact names plus globs.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LicenseRule {
    #[serde(default)]
    pub exact: Vec<String>,
    /// Glob patterns, e.g. "BSD-*"
    #[serde(default)]
    pub patterns: Vec<String>,
}

impl LicenseRule {
    pub fn matches(&self, license: &str) -> bool {
        self.find_match(license).is_some()
    }

    /// Describe the rule entry that matched `license`, if any.
    pub fn find_match(&self, license: &str) -> Option<String> {
        if let Some(exact) = self.exact.iter().find(|exact| *exact == license) {
            return Some(format!("exact: {}", exact));
        }

        for pattern_str in &self.patterns {
            match Pattern::new(pattern_str) {
                Ok(pattern) if pattern.matches(license) => {
                    return Some(format!("pattern: {}", pattern_str));
                }
                Ok(_) => {}
                Err(err) => {
                    tracing::warn!(pattern = %pattern_str, %err, "ignoring invalid legacy license pattern");
                }
            }
        }

        None
    }
}

/// Version-less package exception from the legacy format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegacyException {
    pub name: String,
    pub version: Option<String>,
    pub reason: String,
}

/// Unmigrated policy: a plain allowlist with no approval ledger.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LegacyPolicy {
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(default, alias = "allowedLicenses")]
    pub allowed_licenses: LicenseRule,
    #[serde(default)]
    pub exceptions: Vec<LegacyException>,
}

impl LegacyPolicy {
    pub fn is_exception(&self, package_name: &str, package_version: &str) -> Option<&LegacyException> {
        self.exceptions.iter().find(|exception| {
            exception.name == package_name
                && exception
                    .version
                    .as_deref()
                    .map_or(true, |v| v == "*" || v == package_version)
        })
    }
}
