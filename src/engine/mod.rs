pub mod checker;
pub mod decision;
pub mod exceptions;
pub mod remediation;

pub use checker::{evaluate, CheckOptions, ComplianceReport, Violation, ViolationSummary};
pub use decision::{decide, decide_legacy, AllowedVia, Decision, ReasonType};
pub use exceptions::{find_exception, normalize_package_name, satisfies_range, ExceptionMatch};
pub use remediation::{remediation_for, RemediationContext};
