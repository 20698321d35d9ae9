use chrono::{DateTime, Utc};
use semver::{BuildMetadata, Comparator, Op, Version, VersionReq};

use crate::graph::DependencyEntry;
use crate::policy::{ExceptionRecord, ExceptionScope, Partition};

/// Outcome of looking up exceptions for one entry.
#[derive(Debug, Clone, Copy)]
pub struct ExceptionMatch<'a> {
    pub matched: bool,
    pub active: bool,
    pub governing: Option<&'a ExceptionRecord>,
}

/// Lenient version parse: surrounding whitespace and a leading `v` or `=` are ignored.
pub fn parse_version_loose(value: &str) -> Option<Version> {
    let trimmed = value.trim();
    let trimmed = trimmed.strip_prefix('=').unwrap_or(trimmed).trim_start();
    let trimmed = trimmed
        .strip_prefix('v')
        .or_else(|| trimmed.strip_prefix('V'))
        .unwrap_or(trimmed);
    Version::parse(trimmed).ok()
}

/// Strip a trailing `@<version>` from an exception's package field.
///
/// Only a suffix that parses as a version is removed, so `@scope/name` and
/// `name@latest` are kept as written.
pub fn normalize_package_name(package: &str) -> &str {
    match package.rfind('@') {
        Some(i) if i > 0 && parse_version_loose(&package[i + 1..]).is_some() => &package[..i],
        _ => package,
    }
}

fn is_operator_only(token: &str) -> bool {
    !token.is_empty() && token.chars().all(|c| matches!(c, '<' | '>' | '=' | '~' | '^'))
}

/// Rewrite one npm comparator into `semver` crate syntax.
fn convert_comparator(token: &str) -> String {
    let op_len = token
        .find(|c: char| !matches!(c, '<' | '>' | '=' | '~' | '^'))
        .unwrap_or(token.len());
    let (op, rest) = token.split_at(op_len);
    let rest = rest
        .strip_prefix('v')
        .or_else(|| rest.strip_prefix('V'))
        .unwrap_or(rest);

    if op.is_empty() {
        if rest.contains(['x', 'X', '*']) {
            // bare wildcards already mean the same thing in both syntaxes
            rest.to_string()
        } else {
            // npm treats a bare version as exact; `semver` would read it as caret
            format!("={}", rest)
        }
    } else {
        format!("{}{}", op, rest)
    }
}

/// Convert one `||`-free npm range into a `VersionReq`.
fn convert_alternative(alternative: &str) -> Option<VersionReq> {
    let alternative = alternative.trim();
    if alternative.is_empty() || alternative == "*" || alternative.eq_ignore_ascii_case("x") {
        return Some(VersionReq::STAR);
    }

    // Hyphen range: `1.2.3 - 2.3.4`
    if let Some((low, high)) = alternative.split_once(" - ") {
        let text = format!(">={}, <={}", low.trim().trim_start_matches('v'), high.trim().trim_start_matches('v'));
        return VersionReq::parse(&text).ok();
    }

    // Glue detached operators (`>= 1.2.3`) back onto their version
    let mut comparators: Vec<String> = Vec::new();
    let mut pending_op = String::new();
    for token in alternative.split_whitespace() {
        if is_operator_only(token) {
            pending_op.push_str(token);
            continue;
        }
        let joined = format!("{}{}", pending_op, token);
        pending_op.clear();
        comparators.push(convert_comparator(&joined));
    }
    if !pending_op.is_empty() {
        return None;
    }

    VersionReq::parse(&comparators.join(", ")).ok()
}

/// Parse an npm-style range (`^1.2.0`, `>=1 <2`, `1.x || 2.x`, `1.0.0 - 1.4.0`).
pub fn parse_npm_range(range: &str) -> Option<Vec<VersionReq>> {
    range.split("||").map(convert_alternative).collect()
}

fn release(version: &Version) -> (u64, u64, u64) {
    (version.major, version.minor, version.patch)
}

/// Whether `version` satisfies one comparator with pre-releases included.
///
/// Partial versions (`1.2`, `1.x`) cover every pre-release of the range they
/// name, and upper bounds stop before the first pre-release of the next
/// release, so `^1.2.0` admits `1.3.0-beta.1` but not `2.0.0-rc.1`.
/// Release triples are compared where a bound ends in `-0`; everything else
/// uses full semver precedence.
fn comparator_admits(comparator: &Comparator, version: &Version) -> bool {
    let major = comparator.major;
    let minor = comparator.minor.unwrap_or(0);
    let patch = comparator.patch.unwrap_or(0);
    let floor = (major, minor, patch);
    let full = comparator.patch.map(|patch| Version {
        major,
        minor,
        patch,
        pre: comparator.pre.clone(),
        build: BuildMetadata::EMPTY,
    });
    // first release past what a partial version names: `1` -> 2.0.0, `1.2` -> 1.3.0
    let past_partial = match comparator.minor {
        None => (major.saturating_add(1), 0, 0),
        Some(minor) => (major, minor.saturating_add(1), 0),
    };
    let at = release(version);
    let at_least_floor = match &full {
        Some(full) => version >= full,
        None => at >= floor,
    };

    match comparator.op {
        Op::Exact | Op::Wildcard => match &full {
            Some(full) => version == full,
            None => at >= floor && at < past_partial,
        },
        Op::Greater => match &full {
            Some(full) => version > full,
            None => at >= past_partial,
        },
        Op::GreaterEq => at_least_floor,
        Op::Less => match &full {
            Some(full) => version < full,
            None => at < floor,
        },
        Op::LessEq => match &full {
            Some(full) => version <= full,
            None => at < past_partial,
        },
        Op::Tilde => {
            let ceiling = match comparator.minor {
                None => (major.saturating_add(1), 0, 0),
                Some(minor) => (major, minor.saturating_add(1), 0),
            };
            at_least_floor && at < ceiling
        }
        Op::Caret => {
            let ceiling = match (comparator.minor, comparator.patch) {
                _ if major > 0 => (major.saturating_add(1), 0, 0),
                (None, _) => (1, 0, 0),
                (Some(minor), _) if minor > 0 => (0, minor.saturating_add(1), 0),
                (Some(_), None) => (0, 1, 0),
                (Some(_), Some(patch)) => (0, 0, patch.saturating_add(1)),
            };
            at_least_floor && at < ceiling
        }
        _ => false,
    }
}

/// Whether `version` satisfies `range`. Invalid input never matches.
///
/// Pre-release versions take part in matching by their own precedence:
/// `1.2.0-beta.1` is below `>=1.2.0` and `2.0.0-rc.1` is below `<2.0.0`.
pub fn satisfies_range(version: &str, range: &str) -> bool {
    let Some(version) = parse_version_loose(version) else {
        return false;
    };
    let Some(requirements) = parse_npm_range(range) else {
        tracing::warn!(range, "invalid version range in exception, ignoring");
        return false;
    };

    let version = Version {
        build: BuildMetadata::EMPTY,
        ..version
    };
    requirements.iter().any(|req| {
        req.comparators
            .iter()
            .all(|comparator| comparator_admits(comparator, &version))
    })
}

pub fn scope_matches(scope: &ExceptionScope, version: &str) -> bool {
    match scope {
        ExceptionScope::Exact { version: wanted } => wanted == version,
        ExceptionScope::Range { range } => satisfies_range(version, range),
        ExceptionScope::Any => true,
    }
}

/// Find the exception governing `entry` at `now`.
pub fn find_exception<'a>(
    entry: &DependencyEntry,
    exceptions: &'a [ExceptionRecord],
    now: DateTime<Utc>,
) -> ExceptionMatch<'a> {
    let matching = exceptions.iter().filter(|record| {
        normalize_package_name(&record.package) == entry.name && scope_matches(&record.scope, &entry.version)
    });
    let partition = Partition::new(matching, now);

    ExceptionMatch {
        matched: !partition.is_empty(),
        active: !partition.active.is_empty(),
        governing: partition.governing(),
    }
}
