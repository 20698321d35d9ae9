pub mod activity;
pub mod legacy;
pub mod model;
pub mod storage;

// Re-export main types
pub use activity::{is_active, most_recent, parse_timestamp, Governed, Partition};
pub use legacy::{LegacyException, LegacyPolicy, LicenseRule};
pub use model::{
    DependencyType, ExceptionRecord, ExceptionScope, LicenseRecord, PolicyBundle, PolicySettings,
};
pub use storage::{load_policy, Policy, PolicyFormat};
