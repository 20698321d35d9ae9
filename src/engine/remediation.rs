use super::decision::ReasonType;
use crate::graph::DependencyEntry;
use crate::policy::{ExceptionRecord, LicenseRecord};

/// What a remediation message may refer to besides the entry itself.
#[derive(Debug, Default, Clone, Copy)]
pub struct RemediationContext<'a> {
    pub tokens: &'a [String],
    pub license_record: Option<&'a LicenseRecord>,
    pub exception: Option<&'a ExceptionRecord>,
}

/// Ordered next steps for resolving a violation, most direct first.
pub fn remediation_for(
    reason_type: ReasonType,
    entry: &DependencyEntry,
    context: RemediationContext<'_>,
) -> Vec<String> {
    let label = entry.label();
    let licenses = if context.tokens.is_empty() {
        "UNKNOWN".to_string()
    } else {
        context.tokens.join(", ")
    };

    match reason_type {
        ReasonType::UnknownLicense => vec![
            format!("Confirm the license of {} from its repository or published tarball", label),
            format!(
                "Add an exception for {} with the verified license and evidence",
                entry.name
            ),
            "Set fail_on_unknown_license = false only if unknown licenses are reviewed elsewhere".to_string(),
        ],
        ReasonType::ExpiredLicensePolicy => {
            let mut steps = Vec::new();
            match context.license_record {
                Some(record) => steps.push(format!(
                    "Renew the approval for {}: append a new [[licenses]] record (previous evidence {})",
                    record.identifier, record.evidence_ref
                )),
                None => steps.push(format!("Append a new [[licenses]] record for {}", licenses)),
            }
            steps.push(format!("Replace {} with a dependency under an approved license", label));
            steps
        }
        ReasonType::LicenseNotAllowed => vec![
            format!(
                "Request legal review and append a [[licenses]] record for one of: {}",
                licenses
            ),
            format!("Add a scoped exception for {} if only this package is affected", label),
            format!("Replace {} with a dependency under an approved license", label),
        ],
        ReasonType::ExpiredException => {
            let mut steps = Vec::new();
            match context.exception {
                Some(record) => steps.push(format!(
                    "Renew the exception for {} ({} scope): append a new [[exceptions]] record (previous evidence {})",
                    entry.name,
                    record.scope,
                    record.evidence_ref
                )),
                None => steps.push(format!("Append a new [[exceptions]] record for {}", entry.name)),
            }
            steps.push(format!(
                "Append a [[licenses]] record for one of: {} to stop relying on the exception",
                licenses
            ));
            steps.push(format!("Replace {} with a dependency under an approved license", label));
            steps
        }
        ReasonType::LegacyNotAllowed => vec![
            format!("Add one of {} to allowed_licenses, or list {} under exceptions", licenses, entry.name),
            "Migrate the policy to [settings] with license and exception records".to_string(),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::DependencyType;
    use std::collections::BTreeSet;

    fn entry() -> DependencyEntry {
        DependencyEntry {
            name: "pkg-a".to_string(),
            version: "1.4.0".to_string(),
            license: Some("Custom-License".to_string()),
            identity_path: "node_modules/pkg-a".to_string(),
            dependency_types: BTreeSet::from([DependencyType::Dependencies]),
            repository: None,
        }
    }

    #[test]
    fn test_not_allowed_names_licenses() {
        let tokens = vec!["Custom-License".to_string()];
        let steps = remediation_for(
            ReasonType::LicenseNotAllowed,
            &entry(),
            RemediationContext {
                tokens: &tokens,
                ..Default::default()
            },
        );
        assert_eq!(steps.len(), 3);
        assert!(steps[0].contains("Custom-License"));
        assert!(steps[1].contains("pkg-a@1.4.0"));
    }

    #[test]
    fn test_expired_policy_cites_previous_evidence() {
        let record = LicenseRecord {
            identifier: "MIT".to_string(),
            category: "Permissive Licenses".to_string(),
            rationale: "ok".to_string(),
            approved_by: vec!["legal".to_string()],
            approved_at: "2025-01-01".to_string(),
            expires_at: Some("2025-06-01".to_string()),
            evidence_ref: "LEGAL-1".to_string(),
        };
        let steps = remediation_for(
            ReasonType::ExpiredLicensePolicy,
            &entry(),
            RemediationContext {
                license_record: Some(&record),
                ..Default::default()
            },
        );
        assert!(steps[0].starts_with("Renew the approval for MIT"));
        assert!(steps[0].contains("LEGAL-1"));
    }
}
