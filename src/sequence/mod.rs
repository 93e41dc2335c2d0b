// ============================================================================
// Sequences
// ============================================================================
//
// An in-memory id cursor for one table, seeded from `MAX(id)` and advanced
// with a single atomic add. It is never re-read from the database after
// `refresh`: rows inserted by another process, or by a path that doesn't take
// ids from `next_value`, are invisible to it.
//
// ============================================================================

pub mod identifier;

pub use identifier::Identifier;

use crate::context::Context;
use crate::core::Result;
use crate::session::Session;
use std::sync::atomic::{AtomicI64, Ordering};

/// Column the sequence is seeded from
pub const KEY_COLUMN: &str = "id";

#[derive(Debug)]
pub struct Sequence {
    table: Identifier,
    value: AtomicI64,
}

impl Sequence {
    pub fn new(table: Identifier) -> Self {
        Self {
            table,
            value: AtomicI64::new(0),
        }
    }

    pub fn table(&self) -> &Identifier {
        &self.table
    }

    /// Reload the current value from `MAX(id)`.
    ///
    /// Runs on whatever executor `ctx` resolves to, so inside a unit of work
    /// it sees that transaction's uncommitted rows. An empty table, or one
    /// without an `id` column, yields 0.
    pub async fn refresh<S>(&self, session: &S, ctx: &Context) -> Result<()>
    where
        S: Session + ?Sized,
    {
        let executor = session.executor(ctx);

        let probe = match self.table.schema() {
            Some(schema) => sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM pragma_table_info(?1, ?2) WHERE name = ?3 COLLATE NOCASE",
            )
            .bind(self.table.table_name())
            .bind(schema)
            .bind(KEY_COLUMN),
            None => sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM pragma_table_info(?1) WHERE name = ?2 COLLATE NOCASE",
            )
            .bind(self.table.table_name())
            .bind(KEY_COLUMN),
        };
        let has_key_column = executor.fetch_scalar(probe).await? > 0;

        // Without a key column the statement still has to fail for a missing table.
        let sql = if has_key_column {
            format!(
                "SELECT COALESCE(MAX({}), 0) FROM {}",
                KEY_COLUMN,
                self.table.quoted()
            )
        } else {
            format!("SELECT 0 FROM {} LIMIT 0", self.table.quoted())
        };

        let max = executor
            .fetch_optional_scalar(sqlx::query_scalar::<_, i64>(&sql))
            .await?;

        self.value.store(max.unwrap_or(0), Ordering::SeqCst);
        Ok(())
    }

    /// Allocate the next id
    pub fn next_value(&self) -> i64 {
        self.value.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn current_value(&self) -> i64 {
        self.value.load(Ordering::SeqCst)
    }
}
