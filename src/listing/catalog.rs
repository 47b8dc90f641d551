//! Breed catalog
//!
//! The catalog is configuration data rather than a compiled-in constant: the
//! binary builds it from `CatalogSettings`, and tests build small fixtures
//! directly. Breed order is significant because the consumer's menu is
//! 1-indexed over it.

use crate::config::CatalogSettings;
use crate::listing::Species;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreedCatalog {
    dogs: Vec<String>,
    cats: Vec<String>,
}

impl BreedCatalog {
    pub fn new(dogs: Vec<String>, cats: Vec<String>) -> Self {
        Self { dogs, cats }
    }

    pub fn breeds(&self, species: Species) -> &[String] {
        match species {
            Species::Dog => &self.dogs,
            Species::Cat => &self.cats,
        }
    }

    /// Exact, case-sensitive membership test.
    pub fn contains(&self, species: Species, breed: &str) -> bool {
        self.breeds(species).iter().any(|b| b == breed)
    }

    /// Resolve a 1-based menu position. Returns `None` outside `1..=len`.
    pub fn resolve(&self, species: Species, position: usize) -> Option<&str> {
        position
            .checked_sub(1)
            .and_then(|index| self.breeds(species).get(index))
            .map(String::as_str)
    }
}

impl From<&CatalogSettings> for BreedCatalog {
    fn from(settings: &CatalogSettings) -> Self {
        Self::new(settings.dog_breeds.clone(), settings.cat_breeds.clone())
    }
}
