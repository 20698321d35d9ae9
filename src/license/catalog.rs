use indexmap::{IndexMap, IndexSet};
use serde::Deserialize;
use std::collections::HashMap;

const BUILTIN_CATALOG: &str = include_str!("../../data/spdx-categories.toml");

/// Maps an SPDX identifier to its default license category.
pub trait CategoryLookup {
    fn category_of(&self, identifier: &str) -> Option<&str>;

    /// Whether `category` is a name this catalog knows about.
    fn has_category(&self, category: &str) -> bool;
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    categories: IndexMap<String, Vec<String>>,
}

/// Category catalog loaded from a `[categories]` table of
/// `"Category Name" = ["SPDX-ID", ...]` entries.
#[derive(Debug, Clone, Default)]
pub struct SpdxCatalog {
    by_identifier: HashMap<String, String>,
    categories: IndexSet<String>,
}

impl SpdxCatalog {
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        let file: CatalogFile = toml::from_str(content)?;
        let mut catalog = SpdxCatalog::default();

        for (category, identifiers) in file.categories {
            for identifier in identifiers {
                // First listing wins if an identifier appears twice
                catalog
                    .by_identifier
                    .entry(identifier)
                    .or_insert_with(|| category.clone());
            }
            catalog.categories.insert(category);
        }

        Ok(catalog)
    }

    /// The catalog shipped with the binary.
    pub fn builtin() -> Self {
        Self::from_toml_str(BUILTIN_CATALOG).expect("embedded SPDX catalog is valid TOML")
    }

    /// A catalog that knows no identifiers; category fallback never succeeds.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.categories.iter().map(String::as_str)
    }
}

impl CategoryLookup for SpdxCatalog {
    fn category_of(&self, identifier: &str) -> Option<&str> {
        self.by_identifier.get(identifier).map(String::as_str)
    }

    fn has_category(&self, category: &str) -> bool {
        self.categories.contains(category)
    }
}
