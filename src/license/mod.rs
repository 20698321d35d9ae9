pub mod catalog;
pub mod expression;

// Re-export from submodules
pub use catalog::{CategoryLookup, SpdxCatalog};
pub use expression::{parse_expression, tokenize, LicenseExpr, UNKNOWN_LICENSE};
