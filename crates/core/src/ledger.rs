use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;

use super::category::Category;
use super::entry::LedgerEntry;

/// Append-only, category-partitioned record of entries.
///
/// Serializes as a plain JSON object keyed by category label. Both known
/// categories are present after construction and after deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "BTreeMap<Category, Vec<LedgerEntry>>")]
pub struct Ledger {
    categories: BTreeMap<Category, Vec<LedgerEntry>>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::from(BTreeMap::new())
    }

    /// Push `entry` onto the end of `category`, creating the category if needed.
    pub fn append(&mut self, category: Category, entry: LedgerEntry) {
        self.categories.entry(category).or_default().push(entry);
    }

    pub fn entries(&self, category: &Category) -> &[LedgerEntry] {
        self.categories
            .get(category)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn categories(&self) -> impl Iterator<Item = (&Category, &[LedgerEntry])> {
        self.categories.iter().map(|(c, e)| (c, e.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.categories.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

impl From<BTreeMap<Category, Vec<LedgerEntry>>> for Ledger {
    fn from(mut categories: BTreeMap<Category, Vec<LedgerEntry>>) -> Self {
        for known in Category::KNOWN {
            categories.entry(known).or_default();
        }
        Ledger { categories }
    }
}

impl Serialize for Ledger {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.categories.serialize(serializer)
    }
}
