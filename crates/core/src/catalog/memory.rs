use std::collections::BTreeMap;

use super::{CatalogError, TransactionType, TransactionTypeCatalog};
use crate::config::TransactionTypeConfig;

/// Catalog held in memory, loaded from the `[[transaction_types]]` config tables.
#[derive(Debug, Clone, Default)]
pub struct StaticTransactionTypes {
    types: BTreeMap<i64, TransactionType>,
}

impl StaticTransactionTypes {
    pub fn new(types: impl IntoIterator<Item = TransactionType>) -> Self {
        Self {
            types: types.into_iter().map(|t| (t.id, t)).collect(),
        }
    }

    pub fn from_config(configs: &[TransactionTypeConfig]) -> Self {
        Self::new(configs.iter().map(TransactionType::from))
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl TransactionTypeCatalog for StaticTransactionTypes {
    fn get(&self, id: i64) -> Result<Option<TransactionType>, CatalogError> {
        Ok(self.types.get(&id).cloned())
    }

    fn list(&self) -> Result<Vec<TransactionType>, CatalogError> {
        Ok(self.types.values().cloned().collect())
    }
}
