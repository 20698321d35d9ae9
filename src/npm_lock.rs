use indexmap::IndexMap;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::{GateError, GateResult};

/// `package-lock.json` (lockfileVersion 2 and 3).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageLock {
    pub name: Option<String>,
    pub version: Option<String>,
    pub lockfile_version: Option<u32>,
    /// Install path -> package metadata. `""` is the project itself.
    pub packages: Option<IndexMap<String, LockPackage>>,
}

/// The `license` field in the shapes seen across the registry.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum LicenseField {
    Expression(String),
    Object {
        #[serde(rename = "type")]
        kind: Option<String>,
    },
    List(Vec<LicenseField>),
}

impl LicenseField {
    /// Flatten to a single expression; lists become an `OR` of their members.
    pub fn to_expression(&self) -> Option<String> {
        match self {
            LicenseField::Expression(s) => {
                let s = s.trim();
                (!s.is_empty()).then(|| s.to_string())
            }
            LicenseField::Object { kind } => kind
                .as_deref()
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(str::to_string),
            LicenseField::List(items) => {
                let parts: Vec<String> = items.iter().filter_map(LicenseField::to_expression).collect();
                match parts.len() {
                    0 => None,
                    1 => parts.into_iter().next(),
                    _ => Some(parts.join(" OR ")),
                }
            }
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockPackage {
    pub name: Option<String>,
    pub version: Option<String>,
    pub resolved: Option<String>,
    pub license: Option<LicenseField>,
    /// Deprecated `licenses` array from old manifests.
    pub licenses: Option<LicenseField>,
    #[serde(default)]
    pub dev: bool,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub dev_optional: bool,
    #[serde(default)]
    pub peer: bool,
    #[serde(default)]
    pub in_bundle: bool,
    #[serde(default)]
    pub link: bool,
    #[serde(default)]
    pub dependencies: IndexMap<String, String>,
    #[serde(default)]
    pub dev_dependencies: IndexMap<String, String>,
    #[serde(default)]
    pub peer_dependencies: IndexMap<String, String>,
    #[serde(default)]
    pub optional_dependencies: IndexMap<String, String>,
    pub repository: Option<serde_json::Value>,
}

/// An installed `package.json`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageManifest {
    pub name: Option<String>,
    pub version: Option<String>,
    pub license: Option<LicenseField>,
    pub licenses: Option<LicenseField>,
    pub repository: Option<serde_json::Value>,
    #[serde(default)]
    pub dependencies: IndexMap<String, String>,
    #[serde(default)]
    pub dev_dependencies: IndexMap<String, String>,
    #[serde(default)]
    pub peer_dependencies: IndexMap<String, String>,
    #[serde(default)]
    pub optional_dependencies: IndexMap<String, String>,
}

/// Supplies installed manifests for lock entries that lack metadata.
pub trait ManifestSource {
    /// `install_path` is a lock key; `""` is the project root.
    fn manifest(&self, install_path: &str) -> Option<PackageManifest>;
}

/// Evaluate the lock file alone.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoManifests;

impl ManifestSource for NoManifests {
    fn manifest(&self, _install_path: &str) -> Option<PackageManifest> {
        None
    }
}

/// Reads `<project>/<install-path>/package.json`.
#[derive(Debug, Clone)]
pub struct FsManifests {
    project_dir: PathBuf,
}

impl FsManifests {
    pub fn new(project_dir: impl Into<PathBuf>) -> Self {
        Self {
            project_dir: project_dir.into(),
        }
    }
}

impl ManifestSource for FsManifests {
    fn manifest(&self, install_path: &str) -> Option<PackageManifest> {
        let path = self.project_dir.join(install_path).join("package.json");
        let content = std::fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&content) {
            Ok(manifest) => Some(manifest),
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "ignoring unreadable package manifest");
                None
            }
        }
    }
}

pub struct PackageLockParser;

impl PackageLockParser {
    /// Parse package-lock.json and return structured data
    pub fn parse_file<P: AsRef<Path>>(path: P) -> GateResult<PackageLock> {
        let path_ref = path.as_ref();

        if !path_ref.exists() {
            return Err(GateError::LockNotFound {
                path: path_ref.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path_ref).map_err(|e| GateError::LockParse {
            path: path_ref.to_path_buf(),
            reason: e.to_string(),
        })?;

        Self::parse_str(path_ref, &content)
    }

    pub fn parse_str(path: &Path, content: &str) -> GateResult<PackageLock> {
        if content.trim().is_empty() {
            return Err(GateError::LockParse {
                path: path.to_path_buf(),
                reason: "file is empty".to_string(),
            });
        }

        let lock: PackageLock = serde_json::from_str(content).map_err(|e| GateError::LockParse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        if lock.lockfile_version.is_some_and(|v| v < 2) {
            tracing::warn!(path = %path.display(), "lockfileVersion 1 has no `packages` map");
        }

        Ok(lock)
    }

    /// Find package-lock.json in `start` or its parent directories
    pub fn find_lock(start: &Path) -> Option<PathBuf> {
        let mut current = start.to_path_buf();

        loop {
            let candidate = current.join("package-lock.json");
            if candidate.is_file() {
                return Some(candidate);
            }
            if !current.pop() {
                break;
            }
        }

        None
    }
}
