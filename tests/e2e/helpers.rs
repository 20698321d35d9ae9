use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// Lock for a small app: two direct runtime dependencies, one dev tool and
/// transitive packages under each.
pub const LOCK: &str = r#"{
  "name": "app",
  "version": "1.0.0",
  "lockfileVersion": 3,
  "requires": true,
  "packages": {
    "": {
      "name": "app",
      "version": "1.0.0",
      "dependencies": { "express": "^4.18.0", "pkg-a": "^1.4.0" },
      "devDependencies": { "jest": "^29.0.0" }
    },
    "node_modules/express": {
      "version": "4.18.2",
      "license": "MIT",
      "dependencies": { "debug": "2.6.9", "nolicense": "^0.1.0" }
    },
    "node_modules/debug": { "version": "2.6.9", "license": "MIT" },
    "node_modules/nolicense": { "version": "0.1.0" },
    "node_modules/pkg-a": {
      "version": "1.4.0",
      "license": "Custom-License",
      "dependencies": { "gpl-lib": "^2.0.0" }
    },
    "node_modules/gpl-lib": { "version": "2.0.0", "license": "GPL-3.0-only" },
    "node_modules/jest": {
      "version": "29.0.0",
      "license": "MIT",
      "dev": true,
      "dependencies": { "agpl-tool": "^1.0.0" }
    },
    "node_modules/agpl-tool": { "version": "1.0.0", "license": "AGPL-3.0-only", "dev": true }
  }
}"#;

/// Runtime-only policy allowing permissive licenses by category.
pub const POLICY: &str = r#"# team license policy
[settings]
allowed_categories = ["Permissive Licenses"]
fail_on_unknown_license = true
dependency_types = ["dependencies", "peerDependencies", "optionalDependencies", "bundledDependencies"]
"#;

pub struct TestProject {
    pub dir: TempDir,
    pub binary_path: String,
}

impl TestProject {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let binary_path = env!("CARGO_BIN_EXE_license-gate").to_string();

        Self { dir, binary_path }
    }

    /// A project with the fixture lock and policy in place.
    pub fn with_fixture() -> Self {
        let project = Self::new();
        project.write("package-lock.json", LOCK);
        project.write("license-policy.toml", POLICY);
        project
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn file(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn write(&self, name: &str, content: &str) {
        fs::write(self.file(name), content).expect("Failed to write fixture file");
    }

    pub fn append(&self, name: &str, content: &str) {
        let existing = fs::read_to_string(self.file(name)).unwrap_or_default();
        self.write(name, &format!("{}{}", existing, content));
    }

    pub fn read(&self, name: &str) -> String {
        fs::read_to_string(self.file(name)).expect("Failed to read fixture file")
    }

    pub fn run(&self, args: &[&str]) -> Output {
        Command::new(&self.binary_path)
            .args(args)
            .current_dir(self.path())
            .env_remove("RUST_LOG")
            .output()
            .expect("Failed to run license-gate")
    }

    /// Run `check --format json` and parse the report.
    pub fn check_json(&self, extra: &[&str]) -> (Output, serde_json::Value) {
        let mut args = vec!["check", "--format", "json"];
        args.extend_from_slice(extra);
        let output = self.run(&args);
        let report = serde_json::from_slice(&output.stdout).unwrap_or_else(|err| {
            panic!(
                "stdout is not a JSON report ({}): {}\nstderr: {}",
                err,
                String::from_utf8_lossy(&output.stdout),
                String::from_utf8_lossy(&output.stderr)
            )
        });
        (output, report)
    }
}

/// `name -> reasonType` for every violation in a JSON report.
pub fn violation_reasons(report: &serde_json::Value) -> Vec<(String, String)> {
    report["violations"]
        .as_array()
        .expect("violations array")
        .iter()
        .map(|v| {
            (
                v["name"].as_str().unwrap_or_default().to_string(),
                v["reasonType"].as_str().unwrap_or_default().to_string(),
            )
        })
        .collect()
}

pub fn reason_of(report: &serde_json::Value, name: &str) -> Option<String> {
    violation_reasons(report)
        .into_iter()
        .find(|(n, _)| n == name)
        .map(|(_, reason)| reason)
}
