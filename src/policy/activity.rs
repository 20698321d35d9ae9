use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::cmp::Ordering;

use super::model::{ExceptionRecord, LicenseRecord};

/// Parse a policy timestamp.
///
/// Accepts RFC 3339, a naive `YYYY-MM-DDTHH:MM:SS` (taken as UTC) and a
/// bare `YYYY-MM-DD` (midnight UTC).
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(ts) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(ts.and_utc());
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|ts| ts.and_utc())
}

/// An approval-ledger entry with an approval time and optional expiry.
pub trait Governed {
    fn approved_at(&self) -> &str;
    fn expires_at(&self) -> Option<&str>;
}

impl Governed for LicenseRecord {
    fn approved_at(&self) -> &str {
        &self.approved_at
    }

    fn expires_at(&self) -> Option<&str> {
        self.expires_at.as_deref()
    }
}

impl Governed for ExceptionRecord {
    fn approved_at(&self) -> &str {
        &self.approved_at
    }

    fn expires_at(&self) -> Option<&str> {
        self.expires_at.as_deref()
    }
}

/// A record is active at `now` if it never expires or expires strictly later.
/// An expiry that cannot be parsed counts as already expired.
pub fn is_active<R: Governed + ?Sized>(record: &R, now: DateTime<Utc>) -> bool {
    match record.expires_at() {
        None => true,
        Some(raw) => match parse_timestamp(raw) {
            Some(expires) => expires > now,
            None => {
                tracing::warn!(expires_at = raw, "unparsable expiry, treating record as expired");
                false
            }
        },
    }
}

/// The record with the latest `approved_at`; the earliest-listed one wins ties.
///
/// An unparsable `approved_at` sorts before every valid timestamp.
pub fn most_recent<'a, R, I>(records: I) -> Option<&'a R>
where
    R: Governed + 'a,
    I: IntoIterator<Item = &'a R>,
{
    let mut best: Option<(&'a R, Option<DateTime<Utc>>)> = None;
    for record in records {
        let approved = parse_timestamp(record.approved_at());
        let newer = match &best {
            Some((_, best_at)) => approved > *best_at,
            None => true,
        };
        if newer {
            best = Some((record, approved));
        }
    }
    best.map(|(record, _)| record)
}

/// Records split by activity at a given instant, preserving input order.
#[derive(Debug)]
pub struct Partition<'a, R> {
    pub active: Vec<&'a R>,
    pub expired: Vec<&'a R>,
}

impl<'a, R: Governed> Partition<'a, R> {
    pub fn new<I>(records: I, now: DateTime<Utc>) -> Self
    where
        I: IntoIterator<Item = &'a R>,
    {
        let (active, expired) = records.into_iter().partition(|r| is_active(*r, now));
        Self { active, expired }
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty() && self.expired.is_empty()
    }

    /// Most recent active record, else most recent expired one.
    pub fn governing(&self) -> Option<&'a R> {
        most_recent(self.active.iter().copied()).or_else(|| most_recent(self.expired.iter().copied()))
    }
}

fn compare_approved(a: &str, b: &str) -> Ordering {
    parse_timestamp(a)
        .cmp(&parse_timestamp(b))
        .then_with(|| a.cmp(b))
}

/// Canonical storage order: `(identifier, approved_at)`.
pub fn sort_license_records(records: &mut [LicenseRecord]) {
    records.sort_by(|a, b| {
        a.identifier
            .cmp(&b.identifier)
            .then_with(|| compare_approved(&a.approved_at, &b.approved_at))
    });
}

/// Canonical storage order: `(package, scope kind, scope value, approved_at)`.
pub fn sort_exception_records(records: &mut [ExceptionRecord]) {
    records.sort_by(|a, b| {
        a.package
            .cmp(&b.package)
            .then_with(|| a.scope.rank().cmp(&b.scope.rank()))
            .then_with(|| a.scope.value().cmp(b.scope.value()))
            .then_with(|| compare_approved(&a.approved_at, &b.approved_at))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::model::ExceptionScope;

    fn record(approved_at: &str, expires_at: Option<&str>) -> LicenseRecord {
        LicenseRecord {
            identifier: "MIT".to_string(),
            category: "Permissive Licenses".to_string(),
            rationale: "standard permissive".to_string(),
            approved_by: vec!["legal".to_string()],
            approved_at: approved_at.to_string(),
            expires_at: expires_at.map(str::to_string),
            evidence_ref: "LEGAL-1".to_string(),
        }
    }

    fn at(value: &str) -> DateTime<Utc> {
        parse_timestamp(value).unwrap()
    }

    #[test]
    fn test_parse_timestamp_formats() {
        assert_eq!(at("2025-06-01"), at("2025-06-01T00:00:00Z"));
        assert_eq!(at("2025-06-01T12:30:00"), at("2025-06-01T12:30:00+00:00"));
        assert_eq!(at("2025-06-01T14:30:00+02:00"), at("2025-06-01T12:30:00Z"));
        assert!(parse_timestamp("next tuesday").is_none());
    }

    #[test]
    fn test_is_active() {
        let now = at("2026-01-01T00:00:00Z");
        assert!(is_active(&record("2025-01-01", None), now));
        assert!(is_active(&record("2025-01-01", Some("2026-01-02")), now));
        assert!(!is_active(&record("2025-01-01", Some("2025-06-01T00:00:00Z")), now));
        // expiry exactly at `now` is no longer active
        assert!(!is_active(&record("2025-01-01", Some("2026-01-01T00:00:00Z")), now));
    }

    #[test]
    fn test_unparsable_expiry_is_inactive() {
        let now = at("2026-01-01T00:00:00Z");
        assert!(!is_active(&record("2025-01-01", Some("someday")), now));
    }

    #[test]
    fn test_most_recent_picks_latest() {
        let records = vec![
            record("2025-01-01", None),
            record("2025-07-01", None),
            record("2025-03-01", None),
        ];
        assert_eq!(most_recent(&records).unwrap().approved_at, "2025-07-01");
    }

    #[test]
    fn test_most_recent_unparsable_never_beats_valid() {
        let records = vec![record("garbage", None), record("2020-01-01", None)];
        assert_eq!(most_recent(&records).unwrap().approved_at, "2020-01-01");

        let records = vec![record("2020-01-01", None), record("garbage", None)];
        assert_eq!(most_recent(&records).unwrap().approved_at, "2020-01-01");
    }

    #[test]
    fn test_most_recent_tie_keeps_first() {
        let mut first = record("2025-01-01", None);
        first.evidence_ref = "first".to_string();
        let mut second = record("2025-01-01", None);
        second.evidence_ref = "second".to_string();
        let records = vec![first, second];
        assert_eq!(most_recent(&records).unwrap().evidence_ref, "first");
    }

    #[test]
    fn test_partition_governing_prefers_active() {
        let now = at("2026-01-01T00:00:00Z");
        let records = vec![
            record("2025-09-01", Some("2025-12-01")),
            record("2025-01-01", None),
        ];
        let partition = Partition::new(&records, now);
        assert_eq!(partition.active.len(), 1);
        assert_eq!(partition.expired.len(), 1);
        assert_eq!(partition.governing().unwrap().approved_at, "2025-01-01");
    }

    #[test]
    fn test_canonical_order() {
        let mut licenses = vec![
            LicenseRecord { identifier: "MIT".to_string(), ..record("2025-05-01", None) },
            LicenseRecord { identifier: "ISC".to_string(), ..record("2025-09-01", None) },
            LicenseRecord { identifier: "MIT".to_string(), ..record("2024-05-01", None) },
        ];
        sort_license_records(&mut licenses);
        let order: Vec<_> = licenses
            .iter()
            .map(|r| (r.identifier.as_str(), r.approved_at.as_str()))
            .collect();
        assert_eq!(
            order,
            vec![("ISC", "2025-09-01"), ("MIT", "2024-05-01"), ("MIT", "2025-05-01")]
        );

        let exception = |scope: ExceptionScope, approved_at: &str| ExceptionRecord {
            package: "pkg-a".to_string(),
            scope,
            detected_licenses: vec![],
            reason: "vendor contract".to_string(),
            approved_by: vec!["legal".to_string()],
            approved_at: approved_at.to_string(),
            expires_at: None,
            evidence_ref: "LEGAL-2".to_string(),
        };
        let mut exceptions = vec![
            exception(ExceptionScope::Any, "2025-01-01"),
            exception(ExceptionScope::Range { range: "^1.0.0".to_string() }, "2025-01-01"),
            exception(ExceptionScope::Exact { version: "1.4.0".to_string() }, "2025-03-01"),
            exception(ExceptionScope::Exact { version: "1.4.0".to_string() }, "2025-02-01"),
        ];
        sort_exception_records(&mut exceptions);
        let kinds: Vec<_> = exceptions
            .iter()
            .map(|e| (e.scope.rank(), e.approved_at.as_str()))
            .collect();
        assert_eq!(
            kinds,
            vec![(0, "2025-02-01"), (0, "2025-03-01"), (1, "2025-01-01"), (2, "2025-01-01")]
        );
    }
}
