use super::helpers::{reason_of, violation_reasons, TestProject};

#[test]
fn test_check_reports_violations() {
    let project = TestProject::with_fixture();

    let (output, report) = project.check_json(&[]);

    assert_eq!(output.status.code(), Some(1));
    assert_eq!(
        violation_reasons(&report),
        vec![
            ("gpl-lib".to_string(), "license-not-allowed".to_string()),
            ("nolicense".to_string(), "unknown-license".to_string()),
            ("pkg-a".to_string(), "license-not-allowed".to_string()),
        ]
    );
    assert_eq!(report["summary"]["totalDependencies"], 7);
    assert_eq!(report["summary"]["evaluated"], 5);
    assert_eq!(report["summary"]["allowed"], 2);
    assert!(String::from_utf8_lossy(&output.stderr).contains("License violations found"));
}

#[test]
fn test_upstream_chains_explain_transitive_violations() {
    let project = TestProject::with_fixture();

    let (_, report) = project.check_json(&[]);
    let violations = report["violations"].as_array().unwrap();

    let gpl = violations.iter().find(|v| v["name"] == "gpl-lib").unwrap();
    assert_eq!(gpl["upstream"], serde_json::json!([["pkg-a@1.4.0"]]));

    let unknown = violations.iter().find(|v| v["name"] == "nolicense").unwrap();
    assert_eq!(unknown["upstream"], serde_json::json!([["express@4.18.2"]]));

    let direct = violations.iter().find(|v| v["name"] == "pkg-a").unwrap();
    assert_eq!(direct["upstream"], serde_json::json!([]));
}

#[test]
fn test_exit_zero_and_fail_on_violations() {
    let project = TestProject::with_fixture();

    let output = project.run(&["check", "--exit-zero"]);
    assert!(output.status.success());

    project.write("license-gate.toml", "fail_on_violations = false\n");
    let output = project.run(&["check"]);
    assert!(output.status.success());
}

#[test]
fn test_explicit_record_takes_precedence_over_categories() {
    let project = TestProject::with_fixture();
    project.append(
        "license-policy.toml",
        r#"
[[licenses]]
identifier = "GPL-3.0-only"
category = "Strong Copyleft Licenses"
rationale = "Used only by the internal build"
approved_by = ["legal@example.com"]
approved_at = "2025-01-01T00:00:00Z"
evidence_ref = "LEGAL-9"
"#,
    );

    let (_, report) = project.check_json(&["--at", "2026-01-01T00:00:00Z"]);
    assert_eq!(reason_of(&report, "gpl-lib"), None);
}

#[test]
fn test_license_record_expiry_and_follow_up() {
    let project = TestProject::with_fixture();
    project.append(
        "license-policy.toml",
        r#"
[[licenses]]
identifier = "GPL-3.0-only"
category = "Strong Copyleft Licenses"
rationale = "Pilot"
approved_by = ["legal@example.com"]
approved_at = "2025-01-01T00:00:00Z"
expires_at = "2025-06-01T00:00:00Z"
evidence_ref = "LEGAL-1"
"#,
    );

    let (_, report) = project.check_json(&["--at", "2026-01-01T00:00:00Z"]);
    assert_eq!(reason_of(&report, "gpl-lib").as_deref(), Some("expired-license-policy"));

    project.append(
        "license-policy.toml",
        r#"
[[licenses]]
identifier = "GPL-3.0-only"
category = "Strong Copyleft Licenses"
rationale = "Renewed after review"
approved_by = ["legal@example.com"]
approved_at = "2025-07-01T00:00:00Z"
evidence_ref = "LEGAL-2"
"#,
    );

    let (_, report) = project.check_json(&["--at", "2026-01-01T00:00:00Z"]);
    assert_eq!(reason_of(&report, "gpl-lib"), None);
}

#[test]
fn test_range_exception_suppresses_then_expires() {
    let project = TestProject::with_fixture();
    project.append(
        "license-policy.toml",
        r#"
[[exceptions]]
package = "pkg-a"
detected_licenses = ["Custom-License"]
reason = "Vendor agreement"
approved_by = ["legal@example.com"]
approved_at = "2025-06-01T00:00:00Z"
expires_at = "2026-06-01T00:00:00Z"
evidence_ref = "LEGAL-42"
scope = { kind = "range", range = "^1.2.0" }
"#,
    );

    let (_, report) = project.check_json(&["--at", "2026-01-01T00:00:00Z"]);
    assert_eq!(reason_of(&report, "pkg-a"), None);
    assert_eq!(report["summary"]["excepted"], 1);

    let (_, report) = project.check_json(&["--at", "2026-07-01T00:00:00Z"]);
    assert_eq!(reason_of(&report, "pkg-a").as_deref(), Some("expired-exception"));
}

#[test]
fn test_package_at_version_exception() {
    let project = TestProject::with_fixture();
    project.append(
        "license-policy.toml",
        r#"
[[exceptions]]
package = "gpl-lib@2.0.0"
reason = "Isolated in a separate process"
approved_by = ["legal@example.com"]
approved_at = "2025-06-01"
evidence_ref = "LEGAL-77"
scope = { kind = "exact", version = "2.0.0" }
"#,
    );

    let (_, report) = project.check_json(&[]);
    assert_eq!(reason_of(&report, "gpl-lib"), None);
}

#[test]
fn test_dependency_types_setting() {
    let project = TestProject::with_fixture();
    project.write(
        "license-policy.toml",
        r#"
[settings]
allowed_categories = ["Permissive Licenses"]
"#,
    );

    let (_, report) = project.check_json(&[]);
    assert_eq!(report["summary"]["evaluated"], 7);
    assert_eq!(reason_of(&report, "agpl-tool").as_deref(), Some("license-not-allowed"));
}

#[test]
fn test_table_output() {
    let project = TestProject::with_fixture();

    let output = project.run(&["check", "--verbose"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("License Gate (7 dependencies"));
    assert!(stdout.contains("│ gpl-lib"));
    assert!(stdout.contains("pkg-a@1.4.0 → gpl-lib@2.0.0"));
    assert!(stdout.contains("Next steps"));
}

#[test]
fn test_output_file() {
    let project = TestProject::with_fixture();

    let output = project.run(&["check", "--format", "json", "--output", "report.json", "--exit-zero"]);
    assert!(output.status.success());
    assert!(output.stdout.is_empty());

    let report: serde_json::Value = serde_json::from_str(&project.read("report.json")).unwrap();
    assert_eq!(report["summary"]["violations"], 3);
}

#[test]
fn test_fix_dry_run_then_apply() {
    let project = TestProject::with_fixture();

    let output = project.run(&["fix", "--dry-run"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Would add 3 exceptions"));
    assert!(!project.read("license-policy.toml").contains("[[exceptions]]"));

    let output = project.run(&["fix", "--evidence", "TICKET-1"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let policy = project.read("license-policy.toml");
    assert!(policy.starts_with("# team license policy"));
    assert_eq!(policy.matches("[[exceptions]]").count(), 3);
    assert!(policy.contains("TICKET-1"));

    let output = project.run(&["check"]);
    assert!(output.status.success());
}

#[test]
fn test_init_presets() {
    let project = TestProject::new();
    project.write("package-lock.json", super::helpers::LOCK);

    let output = project.run(&["init", "strict"]);
    assert!(output.status.success());
    assert!(project.read("license-gate.toml").contains("license-policy.toml"));

    let (_, report) = project.check_json(&[]);
    assert_eq!(report["summary"]["evaluated"], 7);

    let output = project.run(&["init", "permissive"]);
    assert_eq!(output.status.code(), Some(2));

    let output = project.run(&["--quiet", "init", "weak-copyleft", "--force"]);
    assert!(output.status.success());
    assert!(output.stdout.is_empty());
}

#[test]
fn test_legacy_policy_runs_degraded() {
    let project = TestProject::with_fixture();
    project.write(
        "license-policy.toml",
        r#"
name = "Old allowlist"
[allowed_licenses]
exact = ["MIT", "Custom-License"]
patterns = ["GPL-*"]
"#,
    );

    let (_, report) = project.check_json(&[]);
    assert_eq!(report["legacyPolicy"], true);
    assert_eq!(
        violation_reasons(&report),
        vec![
            ("agpl-tool".to_string(), "legacy-not-allowed".to_string()),
            ("nolicense".to_string(), "legacy-not-allowed".to_string()),
        ]
    );
}
