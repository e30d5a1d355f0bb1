use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub const INCOME_LABEL: &str = "収入";
pub const EXPENSE_LABEL: &str = "支出";

/// A ledger partition. The two known categories always exist in a [`crate::Ledger`];
/// any other label is accepted and created on first use.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Category {
    Income,
    Expense,
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CategoryError {
    #[error("Category label must not be empty")]
    Empty,
    #[error("Stored category label {0:?} has surrounding whitespace")]
    Untrimmed(String),
}

impl Category {
    pub const KNOWN: [Category; 2] = [Category::Income, Category::Expense];

    pub fn label(&self) -> &str {
        match self {
            Category::Income => INCOME_LABEL,
            Category::Expense => EXPENSE_LABEL,
            Category::Other(label) => label,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Category::Other(_))
    }

    fn rank(&self) -> u8 {
        match self {
            Category::Income => 0,
            Category::Expense => 1,
            Category::Other(_) => 2,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Category {
    type Err = CategoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" => Err(CategoryError::Empty),
            INCOME_LABEL => Ok(Category::Income),
            EXPENSE_LABEL => Ok(Category::Expense),
            other => Ok(Category::Other(other.to_string())),
        }
    }
}

/// Strict conversion used when reading a stored ledger: labels are kept
/// verbatim, so two keys can never collapse into one.
impl TryFrom<String> for Category {
    type Error = CategoryError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.trim() != value {
            return Err(CategoryError::Untrimmed(value));
        }
        value.parse()
    }
}

impl From<Category> for String {
    fn from(category: Category) -> Self {
        match category {
            Category::Other(label) => label,
            known => known.label().to_string(),
        }
    }
}

// Known categories first, then the rest by label, so the file layout is stable.
impl Ord for Category {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank()
            .cmp(&other.rank())
            .then_with(|| self.label().cmp(other.label()))
    }
}

impl PartialOrd for Category {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_labels_parse_to_variants() {
        assert_eq!("収入".parse::<Category>().unwrap(), Category::Income);
        assert_eq!("支出".parse::<Category>().unwrap(), Category::Expense);
    }

    #[test]
    fn unknown_label_becomes_other() {
        let c: Category = " 貯金 ".parse().unwrap();
        assert_eq!(c, Category::Other("貯金".into()));
        assert!(!c.is_known());
    }

    #[test]
    fn blank_label_is_rejected() {
        assert_eq!("   ".parse::<Category>(), Err(CategoryError::Empty));
    }

    #[test]
    fn display_uses_label() {
        assert_eq!(Category::Expense.to_string(), "支出");
        assert_eq!(Category::Other("gift".into()).to_string(), "gift");
    }

    #[test]
    fn known_categories_sort_first() {
        let mut all = vec![
            Category::Other("a".into()),
            Category::Expense,
            Category::Income,
        ];
        all.sort();
        assert_eq!(
            all,
            vec![Category::Income, Category::Expense, Category::Other("a".into())]
        );
    }

    #[test]
    fn serializes_as_label_string() {
        let json = serde_json::to_string(&Category::Income).unwrap();
        assert_eq!(json, "\"収入\"");
        let back: Category = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Category::Income);
    }

    #[test]
    fn stored_labels_are_not_trimmed() {
        let err = Category::try_from(" 支出".to_string()).unwrap_err();
        assert_eq!(err, CategoryError::Untrimmed(" 支出".into()));
        assert!(serde_json::from_str::<Category>("\"貯金 \"").is_err());
        assert_eq!(Category::try_from("貯金".to_string()), Ok(Category::Other("貯金".into())));
    }
}
