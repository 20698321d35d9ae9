use crate::engine::{ComplianceReport, Violation};

pub fn format_json_output(report: &ComplianceReport) -> serde_json::Result<String> {
    serde_json::to_string_pretty(report)
}

pub fn format_table_output(report: &ComplianceReport, verbose: bool) -> String {
    let mut output = String::new();
    let summary = &report.summary;

    // Summary header
    output.push_str(&format!(
        "📦 License Gate ({} dependencies, {} evaluated at {})\n",
        summary.total_dependencies,
        summary.evaluated,
        report.evaluated_at.format("%Y-%m-%dT%H:%M:%SZ")
    ));
    output.push_str(&format!(
        "✅ {} allowed  🛡️ {} excepted  🚫 {} violations\n",
        summary.allowed, summary.excepted, summary.violations
    ));
    if report.legacy_policy {
        output.push_str("⚠️  Legacy allowlist policy in use; migrate to license records\n");
    }
    output.push('\n');

    if report.violations.is_empty() {
        output.push_str("✅ No violations found!\n");
        return output;
    }

    for (reason_type, count) in &summary.by_reason {
        output.push_str(&format!("  {:<24} {}\n", reason_type.as_str(), count));
    }
    output.push('\n');

    output.push_str("🚫 Violations:\n");
    output.push_str(&format_violation_table(&report.violations));

    if verbose {
        output.push('\n');
        for violation in &report.violations {
            output.push_str(&format_violation_details(violation));
        }
    } else {
        output.push_str("\n💡 Run with --verbose to see remediation steps and upstream chains\n");
    }

    output
}

fn format_violation_table(violations: &[Violation]) -> String {
    let mut output = String::new();

    // Table header
    output.push_str("┌──────────────────────┬────────────┬──────────────────┬────────────────────────┐\n");
    output.push_str("│ Package              │ Version    │ License          │ Reason                 │\n");
    output.push_str("├──────────────────────┼────────────┼──────────────────┼────────────────────────┤\n");

    for violation in violations {
        let entry = &violation.entry;
        let name = truncate(&entry.name, 20);
        let version = truncate(&entry.version, 10);
        let license = truncate(entry.license.as_deref().unwrap_or("(unknown)"), 16);
        let reason = truncate(violation.reason_type.as_str(), 22);

        output.push_str(&format!(
            "│ {:<20} │ {:<10} │ {:<16} │ {:<22} │\n",
            name, version, license, reason
        ));
    }

    output.push_str("└──────────────────────┴────────────┴──────────────────┴────────────────────────┘\n");

    output
}

fn format_violation_details(violation: &Violation) -> String {
    let mut output = format!("{} [{}]\n", violation.entry.label(), violation.reason_type);
    output.push_str(&format!("  {}\n", violation.reason));

    if !violation.upstream.is_empty() {
        output.push_str("  Required by:\n");
        for chain in &violation.upstream {
            output.push_str(&format!("    {} → {}\n", chain.join(" → "), violation.entry.label()));
        }
    }

    output.push_str("  Next steps:\n");
    for (i, step) in violation.remediation.iter().enumerate() {
        output.push_str(&format!("    {}. {}\n", i + 1, step));
    }
    output.push('\n');

    output
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_chars - 1).collect();
        format!("{}…", kept)
    }
}
