use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

use crate::error::{GateError, GateResult};
use crate::npm_lock::{LockPackage, ManifestSource, PackageLock, PackageManifest};
use crate::policy::DependencyType;

/// Synthetic parent of every direct project dependency.
pub const ROOT_NODE: &str = "ROOT";

/// Version recorded when neither the lock nor the manifest has one.
pub const UNKNOWN_VERSION: &str = "UNKNOWN";

/// One resolved package instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyEntry {
    pub name: String,
    pub version: String,
    pub license: Option<String>,
    pub identity_path: String,
    pub dependency_types: BTreeSet<DependencyType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<serde_json::Value>,
}

impl DependencyEntry {
    /// `name@version`
    pub fn label(&self) -> String {
        format!("{}@{}", self.name, self.version)
    }
}

/// The deduplicated inventory plus the reverse dependency index.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    entries: Vec<DependencyEntry>,
    /// Install path -> index into `entries`.
    node_index: HashMap<String, usize>,
    /// Install path -> install paths (or `ROOT`) that declare it.
    reverse: HashMap<String, IndexSet<String>>,
}

impl DependencyGraph {
    /// Entries ordered by `(name, version)`.
    pub fn entries(&self) -> &[DependencyEntry] {
        &self.entries
    }

    pub fn entry_for(&self, node: &str) -> Option<&DependencyEntry> {
        self.node_index.get(node).map(|&i| &self.entries[i])
    }

    pub fn parents(&self, node: &str) -> impl Iterator<Item = &str> {
        self.reverse.get(node).into_iter().flatten().map(String::as_str)
    }

    pub fn has_parents(&self, node: &str) -> bool {
        self.reverse.get(node).is_some_and(|p| !p.is_empty())
    }

    /// Display label for a node: `name@version`, or the raw key if unknown.
    pub fn label(&self, node: &str) -> String {
        self.entry_for(node)
            .map(DependencyEntry::label)
            .unwrap_or_else(|| node.to_string())
    }
}

/// Keep entries owned by at least one of `types`.
pub fn filter_by_dependency_types<'a>(
    entries: &'a [DependencyEntry],
    types: &[DependencyType],
) -> Vec<&'a DependencyEntry> {
    entries
        .iter()
        .filter(|entry| entry.dependency_types.iter().any(|t| types.contains(t)))
        .collect()
}

/// Name implied by an install path: the part after the last `node_modules/`.
pub fn name_from_path(path: &str) -> &str {
    path.rsplit_once("node_modules/")
        .map(|(_, name)| name)
        .unwrap_or(path)
}

fn is_installed_node(path: &str) -> bool {
    path.starts_with("node_modules/") || path.contains("/node_modules/")
}

/// Which of the project's own declarations name each package.
fn root_declarations(root: &RootSpec) -> HashMap<String, BTreeSet<DependencyType>> {
    let mut declared: HashMap<String, BTreeSet<DependencyType>> = HashMap::new();
    let groups = [
        (&root.dependencies, DependencyType::Dependencies),
        (&root.dev_dependencies, DependencyType::DevDependencies),
        (&root.peer_dependencies, DependencyType::PeerDependencies),
        (&root.optional_dependencies, DependencyType::OptionalDependencies),
    ];
    for (names, dep_type) in groups {
        for name in names.keys() {
            declared.entry(name.clone()).or_default().insert(dep_type);
        }
    }
    declared
}

/// Union of lock flags and root-manifest membership; `dependencies` if neither applies.
fn detect_types(
    package: &LockPackage,
    name: &str,
    declared: &HashMap<String, BTreeSet<DependencyType>>,
) -> BTreeSet<DependencyType> {
    let mut types = BTreeSet::new();
    if package.dev || package.dev_optional {
        types.insert(DependencyType::DevDependencies);
    }
    if package.optional || package.dev_optional {
        types.insert(DependencyType::OptionalDependencies);
    }
    if package.peer {
        types.insert(DependencyType::PeerDependencies);
    }
    if package.in_bundle {
        types.insert(DependencyType::BundledDependencies);
    }
    if let Some(root_types) = declared.get(name) {
        types.extend(root_types.iter().copied());
    }
    if types.is_empty() {
        types.insert(DependencyType::Dependencies);
    }
    types
}

/// Structured license, then the manifest's, then the legacy `licenses` arrays.
fn extract_license(package: &LockPackage, manifest: Option<&PackageManifest>) -> Option<String> {
    package
        .license
        .as_ref()
        .and_then(|l| l.to_expression())
        .or_else(|| manifest.and_then(|m| m.license.as_ref()).and_then(|l| l.to_expression()))
        .or_else(|| package.licenses.as_ref().and_then(|l| l.to_expression()))
        .or_else(|| manifest.and_then(|m| m.licenses.as_ref()).and_then(|l| l.to_expression()))
}

/// Resolve where `child` is installed as seen from `parent`, walking from the
/// parent's own `node_modules` outward to the top level.
fn resolve_install_path(
    packages: &IndexMap<String, LockPackage>,
    parent: &str,
    child: &str,
) -> Option<String> {
    let mut base = parent;
    loop {
        let candidate = if base.is_empty() {
            format!("node_modules/{}", child)
        } else {
            format!("{}/node_modules/{}", base, child)
        };
        if packages.contains_key(&candidate) {
            return Some(candidate);
        }
        if base.is_empty() {
            return None;
        }
        base = match base.rfind("/node_modules/") {
            Some(i) => &base[..i],
            None => "",
        };
    }
}

/// Direct dependency declarations of the project.
#[derive(Debug, Default)]
struct RootSpec {
    dependencies: IndexMap<String, String>,
    dev_dependencies: IndexMap<String, String>,
    peer_dependencies: IndexMap<String, String>,
    optional_dependencies: IndexMap<String, String>,
}

impl RootSpec {
    fn from_lock(package: &LockPackage) -> Self {
        Self {
            dependencies: package.dependencies.clone(),
            dev_dependencies: package.dev_dependencies.clone(),
            peer_dependencies: package.peer_dependencies.clone(),
            optional_dependencies: package.optional_dependencies.clone(),
        }
    }

    fn from_manifest(manifest: PackageManifest) -> Self {
        Self {
            dependencies: manifest.dependencies,
            dev_dependencies: manifest.dev_dependencies,
            peer_dependencies: manifest.peer_dependencies,
            optional_dependencies: manifest.optional_dependencies,
        }
    }

    fn names(&self) -> impl Iterator<Item = &String> {
        self.dependencies
            .keys()
            .chain(self.dev_dependencies.keys())
            .chain(self.peer_dependencies.keys())
            .chain(self.optional_dependencies.keys())
    }
}

/// Build the dependency inventory and reverse index from a parsed lock.
pub fn build_graph(lock: &PackageLock, manifests: &dyn ManifestSource) -> GateResult<DependencyGraph> {
    let packages = lock.packages.as_ref().ok_or_else(|| GateError::MissingPackages {
        path: "package-lock.json".into(),
    })?;

    let root = match packages.get("") {
        Some(root) => RootSpec::from_lock(root),
        None => manifests.manifest("").map(RootSpec::from_manifest).unwrap_or_default(),
    };
    let declared = root_declarations(&root);

    // Dedup by name@version, first occurrence wins
    let mut entries: Vec<DependencyEntry> = Vec::new();
    let mut by_label: HashMap<String, usize> = HashMap::new();
    let mut node_labels: Vec<(String, String)> = Vec::new();

    for (path, package) in packages {
        if path.is_empty() || package.link || !is_installed_node(path) {
            continue;
        }

        let needs_manifest = package.name.is_none() || package.version.is_none() || package.license.is_none();
        let manifest = if needs_manifest { manifests.manifest(path) } else { None };

        let name = package
            .name
            .clone()
            .or_else(|| manifest.as_ref().and_then(|m| m.name.clone()))
            .unwrap_or_else(|| name_from_path(path).to_string());
        let version = package
            .version
            .clone()
            .or_else(|| manifest.as_ref().and_then(|m| m.version.clone()))
            .unwrap_or_else(|| UNKNOWN_VERSION.to_string());

        let entry = DependencyEntry {
            license: extract_license(package, manifest.as_ref()),
            dependency_types: detect_types(package, &name, &declared),
            repository: package
                .repository
                .clone()
                .or_else(|| manifest.as_ref().and_then(|m| m.repository.clone())),
            identity_path: path.clone(),
            name,
            version,
        };

        let label = entry.label();
        node_labels.push((path.clone(), label.clone()));
        if !by_label.contains_key(&label) {
            by_label.insert(label, entries.len());
            entries.push(entry);
        }
    }

    entries.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.version.cmp(&b.version)));
    let position: HashMap<String, usize> = entries
        .iter()
        .enumerate()
        .map(|(i, e)| (e.label(), i))
        .collect();
    let node_index: HashMap<String, usize> = node_labels
        .into_iter()
        .filter_map(|(path, label)| position.get(&label).map(|&i| (path, i)))
        .collect();

    let mut reverse: HashMap<String, IndexSet<String>> = HashMap::new();
    let mut unresolved = 0usize;

    for name in root.names() {
        match resolve_install_path(packages, "", name) {
            Some(child) => {
                reverse.entry(child).or_default().insert(ROOT_NODE.to_string());
            }
            None => unresolved += 1,
        }
    }

    for (path, package) in packages {
        if path.is_empty() || package.link {
            continue;
        }
        let children = package
            .dependencies
            .keys()
            .chain(package.optional_dependencies.keys())
            .chain(package.peer_dependencies.keys());
        for child in children {
            match resolve_install_path(packages, path, child) {
                Some(child_path) => {
                    reverse.entry(child_path).or_default().insert(path.clone());
                }
                None => {
                    // Optional and peer edges are often legitimately absent
                    tracing::debug!(parent = %path, child = %child, "dependency edge has no installed target");
                    unresolved += 1;
                }
            }
        }
    }

    tracing::debug!(
        nodes = node_index.len(),
        entries = entries.len(),
        edges = reverse.values().map(IndexSet::len).sum::<usize>(),
        unresolved,
        "dependency graph built"
    );

    Ok(DependencyGraph {
        entries,
        node_index,
        reverse,
    })
}
