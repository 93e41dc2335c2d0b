// ============================================================================
// Transaction Handles
// ============================================================================
//
// `Transaction::Real` wraps one live driver transaction; `Transaction::Noop`
// is what a nested `begin` gets when the context already carries one. Both
// expose the same commit/rollback/end surface, so callers never have to know
// whether they are the outermost unit of work.
//
// ============================================================================

pub mod state;

pub use state::{TransactionId, TransactionState};

use crate::context::Context;
use crate::core::{Error, Result};
use state::LiveTransaction;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error};

pub(crate) type SharedTransaction = Arc<Mutex<LiveTransaction>>;

/// Context key under which the active transaction travels
#[derive(Clone)]
struct TransactionKey(SharedTransaction);

/// Attach `tx` to a context derived from `ctx`
pub(crate) fn inject(ctx: &Context, tx: &SharedTransaction) -> Context {
    ctx.with_value(TransactionKey(Arc::clone(tx)))
}

/// The transaction carried by `ctx`, if any
pub(crate) fn extract(ctx: &Context) -> Option<SharedTransaction> {
    ctx.value::<TransactionKey>().map(|key| Arc::clone(&key.0))
}

#[derive(Debug)]
pub enum Transaction {
    /// Backed by an open datastore transaction
    Real(TxAdapter),
    /// A transaction is already active higher up the call chain
    Noop,
}

impl Transaction {
    pub(crate) fn real(tx: SharedTransaction, id: TransactionId) -> Self {
        Transaction::Real(TxAdapter { id, tx })
    }

    pub fn is_noop(&self) -> bool {
        matches!(self, Transaction::Noop)
    }

    /// Identifier of the underlying transaction; `None` for `Noop`
    pub fn id(&self) -> Option<TransactionId> {
        match self {
            Transaction::Real(adapter) => Some(adapter.id),
            Transaction::Noop => None,
        }
    }

    /// Lifecycle state; `None` for `Noop`
    pub async fn state(&self) -> Option<TransactionState> {
        match self {
            Transaction::Real(adapter) => Some(adapter.state().await),
            Transaction::Noop => None,
        }
    }

    pub async fn commit(&self) -> Result<()> {
        match self {
            Transaction::Real(adapter) => adapter.commit().await,
            Transaction::Noop => Ok(()),
        }
    }

    pub async fn rollback(&self) -> Result<()> {
        match self {
            Transaction::Real(adapter) => adapter.rollback().await,
            Transaction::Noop => Ok(()),
        }
    }

    /// Commit or roll back depending on `result`.
    ///
    /// An `Err` triggers a rollback and is returned untouched; a rollback
    /// failure is only logged. An `Ok` triggers a commit, and a commit failure
    /// replaces the result. `Noop` hands `result` back as is.
    pub async fn end<T, E>(&self, result: std::result::Result<T, E>) -> std::result::Result<T, E>
    where
        E: From<Error>,
    {
        let Transaction::Real(adapter) = self else {
            return result;
        };

        match result {
            Ok(value) => {
                adapter.commit().await?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = adapter.rollback().await {
                    error!(
                        transaction = %adapter.id,
                        error = %rollback_err,
                        "Rollback transaction failed"
                    );
                }
                Err(err)
            }
        }
    }
}

/// Handle on a real transaction
pub struct TxAdapter {
    id: TransactionId,
    tx: SharedTransaction,
}

impl TxAdapter {
    pub async fn state(&self) -> TransactionState {
        self.tx.lock().await.state()
    }

    pub async fn commit(&self) -> Result<()> {
        let mut tx = self.tx.lock().await;
        let elapsed = tx.duration();
        tx.commit().await?;
        debug!(transaction = %self.id, ?elapsed, "Transaction committed");
        Ok(())
    }

    pub async fn rollback(&self) -> Result<()> {
        let mut tx = self.tx.lock().await;
        let elapsed = tx.duration();
        tx.rollback().await?;
        debug!(transaction = %self.id, ?elapsed, "Transaction rolled back");
        Ok(())
    }
}

impl std::fmt::Debug for TxAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TxAdapter").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_noop_operations_succeed() {
        let tx = Transaction::Noop;

        assert!(tx.is_noop());
        assert!(tx.commit().await.is_ok());
        assert!(tx.rollback().await.is_ok());
        assert!(tx.commit().await.is_ok());
        assert_eq!(tx.id(), None);
        assert_eq!(tx.state().await, None);
    }

    #[tokio::test]
    async fn test_noop_end_passes_result_through() {
        let tx = Transaction::Noop;

        let ok: std::result::Result<i32, Error> = tx.end(Ok(5)).await;
        assert_eq!(ok.unwrap(), 5);

        let err: std::result::Result<i32, Error> =
            tx.end(Err(Error::SequenceNotFound("users".into()))).await;
        assert!(matches!(err, Err(Error::SequenceNotFound(table)) if table == "users"));
    }

    #[test]
    fn test_background_context_has_no_transaction() {
        assert!(extract(&Context::background()).is_none());
    }
}
