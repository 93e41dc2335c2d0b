// ============================================================================
// Transaction State Management
// ============================================================================
//
// A live datastore transaction moves through:
//
//   Active ──commit──> Committed
//     │
//     └──rollback / failed commit──> Aborted
//
// Once terminal, the driver transaction is gone and every further
// commit/rollback/statement is rejected with `AlreadyFinalized`.
//
// ============================================================================

use crate::core::{Error, Result};
use sqlx::sqlite::{Sqlite, SqliteConnection};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

static NEXT_TXN_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier of a real transaction, used in log events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransactionId(u64);

impl TransactionId {
    fn next() -> Self {
        TransactionId(NEXT_TXN_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "txn_{}", self.0)
    }
}

/// Where a real transaction is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    /// Open; statements run inside it
    Active,
    /// Committed by the datastore
    Committed,
    /// Rolled back, or the commit failed
    Aborted,
}

impl TransactionState {
    /// No further commit, rollback or statement is accepted
    pub fn is_terminal(self) -> bool {
        self != TransactionState::Active
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TransactionState::Active => "active",
            TransactionState::Committed => "committed",
            TransactionState::Aborted => "aborted",
        }
    }
}

impl std::fmt::Display for TransactionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Driver transaction plus its lifecycle state.
///
/// Lives behind an async mutex shared by the handle and the carrier. Dropping
/// it while still active lets the driver roll the transaction back.
pub(crate) struct LiveTransaction {
    id: TransactionId,
    state: TransactionState,
    inner: Option<sqlx::Transaction<'static, Sqlite>>,
    start_time: Instant,
}

impl LiveTransaction {
    pub(crate) fn new(inner: sqlx::Transaction<'static, Sqlite>) -> Self {
        Self {
            id: TransactionId::next(),
            state: TransactionState::Active,
            inner: Some(inner),
            start_time: Instant::now(),
        }
    }

    pub(crate) fn id(&self) -> TransactionId {
        self.id
    }

    pub(crate) fn state(&self) -> TransactionState {
        self.state
    }

    pub(crate) fn duration(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// The driver connection the transaction runs on
    pub(crate) fn connection(&mut self) -> Result<&mut SqliteConnection> {
        self.inner.as_deref_mut().ok_or(Error::AlreadyFinalized)
    }

    fn take(&mut self) -> Result<sqlx::Transaction<'static, Sqlite>> {
        if self.state.is_terminal() {
            return Err(Error::AlreadyFinalized);
        }
        self.inner.take().ok_or(Error::AlreadyFinalized)
    }

    pub(crate) async fn commit(&mut self) -> Result<()> {
        let inner = self.take()?;
        match inner.commit().await {
            Ok(()) => {
                self.state = TransactionState::Committed;
                Ok(())
            }
            Err(err) => {
                self.state = TransactionState::Aborted;
                Err(err.into())
            }
        }
    }

    pub(crate) async fn rollback(&mut self) -> Result<()> {
        let inner = self.take()?;
        self.state = TransactionState::Aborted;
        inner.rollback().await?;
        Ok(())
    }
}

impl std::fmt::Debug for LiveTransaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveTransaction")
            .field("id", &self.id)
            .field("state", &self.state)
            .finish()
    }
}
