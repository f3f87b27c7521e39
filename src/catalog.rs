//! Product descriptions used to render rules for people

use crate::itemset::{Item, Itemset};
use std::collections::HashMap;

/// Stock code to product description lookup
#[derive(Debug, Clone, Default)]
pub struct ProductCatalog {
    descriptions: HashMap<String, String>,
}

impl ProductCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a description; the first one seen for a code wins
    pub fn insert(&mut self, code: impl Into<String>, description: impl Into<String>) {
        let description = description.into();
        let description = description.trim();
        if description.is_empty() {
            return;
        }
        self.descriptions
            .entry(code.into().trim().to_string())
            .or_insert_with(|| description.to_string());
    }

    /// Take every description from `other`, replacing ours where both
    /// name the same code
    pub fn merge(&mut self, other: ProductCatalog) {
        self.descriptions.extend(other.descriptions);
    }

    pub fn len(&self) -> usize {
        self.descriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptions.is_empty()
    }

    pub fn name(&self, item: &Item) -> String {
        match self.descriptions.get(item.code()) {
            Some(description) => description.clone(),
            None => format!("Unknown Product ({})", item),
        }
    }

    /// Names of every item, joined with "and"
    pub fn names(&self, itemset: &Itemset) -> String {
        itemset
            .iter()
            .map(|item| self.name(item))
            .collect::<Vec<_>>()
            .join(" and ")
    }
}

impl<C: Into<String>, D: Into<String>> FromIterator<(C, D)> for ProductCatalog {
    fn from_iter<T: IntoIterator<Item = (C, D)>>(iter: T) -> Self {
        let mut catalog = Self::new();
        for (code, description) in iter {
            catalog.insert(code, description);
        }
        catalog
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_and_fallback() {
        let catalog: ProductCatalog = [
            ("85123A", "WHITE HANGING HEART T-LIGHT HOLDER"),
            ("85123A", "DUPLICATE NAME"),
            ("71053", "  WHITE METAL LANTERN "),
            ("22633", ""),
        ]
        .into_iter()
        .collect();

        assert_eq!(catalog.len(), 2);
        assert_eq!(
            catalog.name(&Item::from("85123A")),
            "WHITE HANGING HEART T-LIGHT HOLDER"
        );
        assert_eq!(catalog.name(&Item::from("71053")), "WHITE METAL LANTERN");
        assert_eq!(catalog.name(&Item::from("22633")), "Unknown Product (22633)");
    }

    #[test]
    fn test_merge_prefers_other() {
        let mut catalog: ProductCatalog =
            [("21212", "cake cases"), ("22423", "REGENCY CAKESTAND 3 TIER")].into_iter().collect();
        let lookup: ProductCatalog =
            [("21212", "PACK OF 72 RETROSPOT CAKE CASES"), ("47566", "PARTY BUNTING")]
                .into_iter()
                .collect();

        catalog.merge(lookup);

        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.name(&Item::from("21212")), "PACK OF 72 RETROSPOT CAKE CASES");
        assert_eq!(catalog.name(&Item::from("22423")), "REGENCY CAKESTAND 3 TIER");
    }

    #[test]
    fn test_names_joined() {
        let catalog: ProductCatalog = [("a", "Apple"), ("b", "Banana")].into_iter().collect();
        let itemset = Itemset::try_new(["b", "a"]).unwrap();
        assert_eq!(catalog.names(&itemset), "Apple and Banana");
    }
}
