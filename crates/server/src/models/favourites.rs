//! A user's favourite products.

use serde::{Deserialize, Serialize};

use emporium_core::ProductId;

/// Set of favourite product ids, kept in the order they were added.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Favourites {
    ids: Vec<ProductId>,
}

impl Favourites {
    /// Build from stored ids, dropping repeats.
    #[must_use]
    pub fn from_ids(ids: impl IntoIterator<Item = ProductId>) -> Self {
        let mut favourites = Self::default();
        for id in ids {
            favourites.insert(id);
        }
        favourites
    }

    #[must_use]
    pub fn contains(&self, id: ProductId) -> bool {
        self.ids.contains(&id)
    }

    /// Returns `true` if the id was newly added.
    pub fn insert(&mut self, id: ProductId) -> bool {
        if self.contains(id) {
            return false;
        }
        self.ids.push(id);
        true
    }

    /// Returns `true` if the id was present.
    pub fn remove(&mut self, id: ProductId) -> bool {
        let before = self.ids.len();
        self.ids.retain(|existing| *existing != id);
        self.ids.len() != before
    }

    #[must_use]
    pub fn ids(&self) -> &[ProductId] {
        &self.ids
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_is_idempotent() {
        let mut favourites = Favourites::default();
        let id = ProductId::generate();
        assert!(favourites.insert(id));
        assert!(!favourites.insert(id));
        assert_eq!(favourites.len(), 1);
    }

    #[test]
    fn test_remove_reports_membership() {
        let mut favourites = Favourites::default();
        let id = ProductId::generate();
        assert!(!favourites.remove(id));
        favourites.insert(id);
        assert!(favourites.remove(id));
        assert!(favourites.is_empty());
    }

    #[test]
    fn test_from_ids_dedupes() {
        let id = ProductId::generate();
        let favourites = Favourites::from_ids([id, id, ProductId::generate()]);
        assert_eq!(favourites.len(), 2);
        assert_eq!(favourites.ids()[0], id);
    }
}
