//! Transaction-type catalog.
//!
//! The catalog is reference data owned elsewhere; the queue only reads it to
//! validate intake and step-1 classification and to label board entries.

mod memory;
mod types;

pub use memory::StaticTransactionTypes;
pub use types::*;

/// Read-only access to the transaction types tickets can be issued for.
pub trait TransactionTypeCatalog: Send + Sync {
    /// Look up one transaction type.
    fn get(&self, id: i64) -> Result<Option<TransactionType>, CatalogError>;

    /// All transaction types, ordered by id.
    fn list(&self) -> Result<Vec<TransactionType>, CatalogError>;

    /// Whether `id` names a known transaction type.
    fn contains(&self, id: i64) -> Result<bool, CatalogError> {
        Ok(self.get(id)?.is_some())
    }
}
