pub mod category;
pub mod entry;
pub mod ledger;

pub use category::{Category, CategoryError, EXPENSE_LABEL, INCOME_LABEL};
pub use entry::LedgerEntry;
pub use ledger::Ledger;
