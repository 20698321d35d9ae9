use super::helpers::TestProject;

#[test]
fn test_config_validate_and_show() {
    let project = TestProject::with_fixture();

    let output = project.run(&["config", "--validate"]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("Configuration is valid"));

    let output = project.run(&["config", "--show"]);
    assert!(output.status.success());
    let config: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(config["upstream_limit"], 5);
    assert_eq!(config["policy"], "license-policy.toml");
}

#[test]
fn test_invalid_category_is_fatal() {
    let project = TestProject::with_fixture();
    project.write(
        "license-policy.toml",
        r#"
[settings]
allowed_categories = ["Permissive Licences"]
"#,
    );

    let output = project.run(&["check"]);
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Permissive Licences"));
    assert!(output.stdout.is_empty());

    let output = project.run(&["config", "--validate"]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_missing_approver_is_fatal() {
    let project = TestProject::with_fixture();
    project.append(
        "license-policy.toml",
        r#"
[[licenses]]
identifier = "MPL-2.0"
category = "Weak Copyleft Licenses"
rationale = "reviewed"
approved_by = []
approved_at = "2025-01-01"
evidence_ref = "LEGAL-5"
"#,
    );

    let output = project.run(&["check"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("approved_by"));
}

#[test]
fn test_missing_lock_is_fatal() {
    let project = TestProject::new();
    project.write("license-policy.toml", super::helpers::POLICY);

    let output = project.run(&["check"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("lock file not found"));
}

#[test]
fn test_invalid_at_timestamp() {
    let project = TestProject::with_fixture();

    let output = project.run(&["check", "--at", "next tuesday"]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_normalize_sorts_records() {
    let project = TestProject::with_fixture();
    project.append(
        "license-policy.toml",
        r#"
[[licenses]]
identifier = "MPL-2.0"
category = "Weak Copyleft Licenses"
rationale = "second"
approved_by = ["legal"]
approved_at = "2025-02-01"
evidence_ref = "LEGAL-2"

[[licenses]]
identifier = "GPL-3.0-only"
category = "Strong Copyleft Licenses"
rationale = "first"
approved_by = ["legal"]
approved_at = "2025-01-01"
evidence_ref = "LEGAL-1"
"#,
    );

    let output = project.run(&["config", "--normalize"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let policy = project.read("license-policy.toml");
    let gpl = policy.find("GPL-3.0-only").unwrap();
    let mpl = policy.find("MPL-2.0").unwrap();
    assert!(gpl < mpl);

    let output = project.run(&["config", "--validate"]);
    assert!(output.status.success());
}

#[test]
fn test_json_policy_file() {
    let project = TestProject::new();
    project.write("package-lock.json", super::helpers::LOCK);
    project.write(
        "policy.json",
        r#"{
  "settings": {
    "allowedCategories": ["Permissive Licenses"],
    "failOnUnknownLicense": false,
    "dependencyTypes": ["dependencies"]
  },
  "exceptions": [
    {
      "package": "pkg-a",
      "reason": "Vendor agreement",
      "approvedBy": ["legal"],
      "approvedAt": "2025-06-01",
      "evidenceRef": "LEGAL-3",
      "scope": { "kind": "any" }
    }
  ]
}"#,
    );

    let output = project.run(&["check", "--format", "json", "--policy", "policy.json"]);
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let names: Vec<&str> = report["violations"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["gpl-lib", "nolicense"]);
    assert_eq!(report["violations"][1]["reasonType"], "license-not-allowed");
}
