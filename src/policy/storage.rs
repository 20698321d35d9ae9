use serde::Deserialize;
use std::fs;
use std::path::Path;

use super::activity::parse_timestamp;
use super::legacy::LegacyPolicy;
use super::model::{
    all_dependency_types, DependencyType, ExceptionRecord, LicenseRecord, PolicyBundle,
    PolicySettings,
};
use crate::error::{GateError, GateResult};
use crate::license::CategoryLookup;

/// A loaded policy, either governed by approval ledgers or a legacy allowlist.
#[derive(Debug, Clone)]
pub enum Policy {
    Governed(PolicyBundle),
    Legacy(LegacyPolicy),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyFormat {
    Toml,
    Json,
}

impl PolicyFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => PolicyFormat::Json,
            _ => PolicyFormat::Toml,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawSettings {
    #[serde(default, alias = "allowedCategories")]
    allowed_categories: Vec<String>,
    #[serde(default, alias = "failOnUnknownLicense")]
    fail_on_unknown_license: Option<bool>,
    #[serde(default, alias = "dependencyTypes")]
    dependency_types: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct RawPolicyFile {
    settings: RawSettings,
    #[serde(default)]
    licenses: Vec<LicenseRecord>,
    #[serde(default)]
    exceptions: Vec<ExceptionRecord>,
}

/// A document with an allowlist but no `settings` table predates the ledger format.
fn is_legacy_document(has_key: impl Fn(&str) -> bool) -> bool {
    !has_key("settings") && (has_key("allowed_licenses") || has_key("allowedLicenses"))
}

fn parse_error(path: &Path, err: impl std::fmt::Display) -> GateError {
    GateError::PolicyParse {
        path: path.to_path_buf(),
        reason: err.to_string(),
    }
}

/// Parse policy text without validating it against a catalog.
fn parse_document(path: &Path, content: &str, format: PolicyFormat) -> GateResult<RawDocument> {
    match format {
        PolicyFormat::Toml => {
            let table: toml::Table = toml::from_str(content).map_err(|e| parse_error(path, e))?;
            let legacy = is_legacy_document(|key| table.contains_key(key));
            let value = toml::Value::Table(table);
            if legacy {
                value.try_into().map(RawDocument::Legacy).map_err(|e| parse_error(path, e))
            } else {
                value.try_into().map(RawDocument::Governed).map_err(|e| parse_error(path, e))
            }
        }
        PolicyFormat::Json => {
            let value: serde_json::Value =
                serde_json::from_str(content).map_err(|e| parse_error(path, e))?;
            let legacy = is_legacy_document(|key| value.get(key).is_some());
            if legacy {
                serde_json::from_value(value).map(RawDocument::Legacy).map_err(|e| parse_error(path, e))
            } else {
                serde_json::from_value(value).map(RawDocument::Governed).map_err(|e| parse_error(path, e))
            }
        }
    }
}

enum RawDocument {
    Governed(RawPolicyFile),
    Legacy(LegacyPolicy),
}

fn require_non_empty(field: String, value: &str) -> GateResult<()> {
    if value.trim().is_empty() {
        return Err(GateError::EmptyField { field });
    }
    Ok(())
}

fn require_approvers(field: String, approvers: &[String]) -> GateResult<()> {
    if approvers.iter().all(|a| a.trim().is_empty()) {
        return Err(GateError::EmptyField { field });
    }
    Ok(())
}

fn require_timestamp(field: String, value: &str) -> GateResult<()> {
    if parse_timestamp(value).is_none() {
        return Err(GateError::InvalidTimestamp {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}

fn require_category(category: &str, catalog: &dyn CategoryLookup, known: &[&str]) -> GateResult<()> {
    if !catalog.has_category(category) {
        return Err(GateError::InvalidCategory {
            category: category.to_string(),
            known: known.join(", "),
        });
    }
    Ok(())
}

fn validate_settings(raw: RawSettings, catalog: &dyn CategoryLookup, known: &[&str]) -> GateResult<PolicySettings> {
    for category in &raw.allowed_categories {
        require_category(category, catalog, known)?;
    }

    let dependency_types = match raw.dependency_types {
        None => all_dependency_types(),
        Some(names) if names.is_empty() => return Err(GateError::EmptyDependencyTypes),
        Some(names) => {
            let mut types = Vec::new();
            for name in names {
                let dep_type: DependencyType = name.parse()?;
                if !types.contains(&dep_type) {
                    types.push(dep_type);
                }
            }
            types
        }
    };

    Ok(PolicySettings {
        allowed_categories: raw.allowed_categories,
        fail_on_unknown_license: raw.fail_on_unknown_license.unwrap_or(true),
        dependency_types,
    })
}

/// Check the value-level invariants a schema cannot express.
///
/// `known_categories` is used only for error messages.
pub fn validate_bundle(
    settings: PolicySettings,
    licenses: Vec<LicenseRecord>,
    exceptions: Vec<ExceptionRecord>,
    catalog: &dyn CategoryLookup,
    known_categories: &[&str],
) -> GateResult<PolicyBundle> {
    for (i, record) in licenses.iter().enumerate() {
        require_non_empty(format!("licenses[{}].identifier", i), &record.identifier)?;
        require_category(&record.category, catalog, known_categories)?;
        require_approvers(format!("licenses[{}].approved_by", i), &record.approved_by)?;
        require_timestamp(format!("licenses[{}].approved_at", i), &record.approved_at)?;
        require_non_empty(format!("licenses[{}].evidence_ref", i), &record.evidence_ref)?;
        if let Some(expires) = &record.expires_at {
            if parse_timestamp(expires).is_none() {
                tracing::warn!(identifier = %record.identifier, expires_at = %expires, "unparsable expiry; record will never be active");
            }
        }
    }

    for (i, record) in exceptions.iter().enumerate() {
        require_non_empty(format!("exceptions[{}].package", i), &record.package)?;
        require_approvers(format!("exceptions[{}].approved_by", i), &record.approved_by)?;
        require_timestamp(format!("exceptions[{}].approved_at", i), &record.approved_at)?;
        require_non_empty(format!("exceptions[{}].evidence_ref", i), &record.evidence_ref)?;
    }

    Ok(PolicyBundle::new(settings, licenses, exceptions))
}

/// Parse and validate policy text.
pub fn parse_policy(
    path: &Path,
    content: &str,
    format: PolicyFormat,
    catalog: &dyn CategoryLookup,
    known_categories: &[&str],
) -> GateResult<Policy> {
    match parse_document(path, content, format)? {
        RawDocument::Legacy(legacy) => {
            tracing::warn!(path = %path.display(), "legacy allowlist policy loaded; run in degraded mode");
            Ok(Policy::Legacy(legacy))
        }
        RawDocument::Governed(raw) => {
            let settings = validate_settings(raw.settings, catalog, known_categories)?;
            validate_bundle(settings, raw.licenses, raw.exceptions, catalog, known_categories)
                .map(Policy::Governed)
        }
    }
}

/// Read, parse and validate a policy file.
pub fn load_policy(path: &Path, catalog: &crate::license::SpdxCatalog) -> GateResult<Policy> {
    let content = fs::read_to_string(path).map_err(|e| GateError::PolicyRead {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let known: Vec<&str> = catalog.categories().collect();
    parse_policy(path, &content, PolicyFormat::from_path(path), catalog, &known)
}

/// Render a bundle in canonical storage order.
pub fn render_policy(bundle: &PolicyBundle, format: PolicyFormat) -> anyhow::Result<String> {
    let mut canonical = bundle.clone();
    canonical.canonicalize();
    let content = match format {
        PolicyFormat::Toml => toml::to_string_pretty(&canonical)?,
        PolicyFormat::Json => serde_json::to_string_pretty(&canonical)? + "\n",
    };
    Ok(content)
}

pub fn write_policy(path: &Path, bundle: &PolicyBundle) -> anyhow::Result<()> {
    use anyhow::Context;

    let content = render_policy(bundle, PolicyFormat::from_path(path))?;
    fs::write(path, content)
        .with_context(|| format!("Failed to write policy file: {}", path.display()))
}

fn exception_to_table(record: &ExceptionRecord) -> anyhow::Result<toml_edit::Table> {
    let rendered = toml::to_string(record)?;
    let doc = rendered.parse::<toml_edit::DocumentMut>()?;

    // A fresh table has no document position, so it renders after existing entries
    let mut table = toml_edit::Table::new();
    for (key, item) in doc.iter() {
        let item = match item.as_table() {
            Some(sub) => {
                let mut inline = sub.clone().into_inline_table();
                inline.fmt();
                toml_edit::Item::Value(toml_edit::Value::InlineTable(inline))
            }
            None => item.clone(),
        };
        table.insert(key, item);
    }
    Ok(table)
}

/// Append exception records to the end of an existing policy file.
///
/// Existing records, comments and layout are left untouched.
pub fn append_exceptions(path: &Path, records: &[ExceptionRecord]) -> anyhow::Result<()> {
    use anyhow::Context;

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read policy file: {}", path.display()))?;

    let updated = match PolicyFormat::from_path(path) {
        PolicyFormat::Toml => {
            let mut doc = content
                .parse::<toml_edit::DocumentMut>()
                .with_context(|| format!("Failed to parse policy file: {}", path.display()))?;
            if !doc.contains_key("exceptions") {
                doc["exceptions"] = toml_edit::Item::ArrayOfTables(toml_edit::ArrayOfTables::new());
            }
            let exceptions = doc["exceptions"]
                .as_array_of_tables_mut()
                .ok_or_else(|| anyhow::anyhow!("`exceptions` in {} is not an array of tables", path.display()))?;
            for record in records {
                exceptions.push(exception_to_table(record)?);
            }
            doc.to_string()
        }
        PolicyFormat::Json => {
            let mut value: serde_json::Value = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse policy file: {}", path.display()))?;
            let object = value
                .as_object_mut()
                .ok_or_else(|| anyhow::anyhow!("policy file {} is not a JSON object", path.display()))?;
            let exceptions = object
                .entry("exceptions")
                .or_insert_with(|| serde_json::Value::Array(Vec::new()))
                .as_array_mut()
                .ok_or_else(|| anyhow::anyhow!("`exceptions` in {} is not an array", path.display()))?;
            for record in records {
                exceptions.push(serde_json::to_value(record)?);
            }
            serde_json::to_string_pretty(&value)? + "\n"
        }
    };

    fs::write(path, updated)
        .with_context(|| format!("Failed to write policy file: {}", path.display()))
}
