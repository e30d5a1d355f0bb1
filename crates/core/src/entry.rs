use serde::{Deserialize, Serialize};

/// One recognized line of a receipt. `amount` is kept as the digit string the
/// extractor produced; it is never parsed or validated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub item: String,
    pub amount: String,
}

impl LedgerEntry {
    pub fn new(item: impl Into<String>, amount: impl Into<String>) -> Self {
        LedgerEntry {
            item: item.into(),
            amount: amount.into(),
        }
    }
}
