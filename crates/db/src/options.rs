//! Per-call options threaded through every helper.

use crate::transaction::TxHandle;

/// Batch size used by `bulk_insert` when none is given.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// Options bag accepted by every helper.
///
/// Cloning shares the transaction handle, so nested calls given a clone
/// run inside the same transaction.
#[derive(Debug, Clone, Default)]
pub struct QueryOpts {
    /// Run on this transaction instead of the default connection.
    pub transaction: Option<TxHandle>,
    /// Lock selected rows (`FOR UPDATE`).
    pub for_update: bool,
    /// Return rows with storage (snake_case) keys.
    pub snake_case: bool,
    /// Rows per statement for `bulk_insert`.
    pub chunk_size: Option<usize>,
}

impl QueryOpts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_transaction(mut self, tx: TxHandle) -> Self {
        self.transaction = Some(tx);
        self
    }

    pub fn for_update(mut self) -> Self {
        self.for_update = true;
        self
    }

    pub fn snake_case(mut self) -> Self {
        self.snake_case = true;
        self
    }

    pub fn chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = Some(size);
        self
    }

    /// Zero or unset falls back to [`DEFAULT_CHUNK_SIZE`].
    pub fn effective_chunk_size(&self) -> usize {
        self.chunk_size
            .filter(|&size| size > 0)
            .unwrap_or(DEFAULT_CHUNK_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_size_defaults_to_one_thousand() {
        assert_eq!(QueryOpts::new().effective_chunk_size(), 1000);
        assert_eq!(QueryOpts::new().chunk_size(0).effective_chunk_size(), 1000);
        assert_eq!(QueryOpts::new().chunk_size(2).effective_chunk_size(), 2);
    }

    #[test]
    fn builder_methods_set_flags() {
        let opts = QueryOpts::new().for_update().snake_case();
        assert!(opts.for_update);
        assert!(opts.snake_case);
        assert!(opts.transaction.is_none());
    }
}
