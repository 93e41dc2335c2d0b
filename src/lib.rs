// ============================================================================
// sqlite-transaction Library
// ============================================================================
//
// Context-scoped SQLite transactions: a unit of work begins once, travels
// down the call chain inside an immutable `Context`, and is committed or
// rolled back exactly once by whoever began it. Nested `begin` calls get a
// no-op handle instead of a second transaction.
//
// ============================================================================

pub mod core;
pub mod connection;
pub mod context;
pub mod session;
pub mod sequence;
pub mod transaction;

pub use crate::core::{Error, Result};
pub use crate::connection::{
    Connection,
    config::{AutoVacuum, ConnectionConfig, Encoding, JournalMode, Synchronous, TempStore},
};
pub use crate::context::Context;
pub use crate::session::{Executor, Session};
pub use crate::sequence::{Identifier, Sequence};
pub use crate::transaction::{Transaction, TransactionId, TransactionState, TxAdapter};

/// Convenience re-exports for repositories built on this crate
pub mod prelude {
    pub use crate::connection::Connection;
    pub use crate::context::Context;
    pub use crate::core::{Error, Result};
    pub use crate::session::{Executor, Session};
    pub use crate::transaction::Transaction;
}
