// ============================================================================
// Sessions
// ============================================================================
//
// Repositories ask a `Session` for an `Executor` with the context they were
// given. The executor runs every statement on the transaction that context
// carries, or on the base pool when it carries none.
//
// ============================================================================

use crate::context::Context;
use crate::core::Result;
use crate::transaction::SharedTransaction;
use sqlx::query::{Query, QueryAs, QueryScalar};
use sqlx::sqlite::{Sqlite, SqliteArguments, SqlitePool, SqliteQueryResult, SqliteRow};
use sqlx::FromRow;

/// Source of the statement surface for a given context
///
/// Repositories depend on this instead of on `Connection`, so tests can hand
/// them anything that knows how to resolve a context.
pub trait Session {
    /// Executor bound to the transaction carried by `ctx`, or to the base pool
    fn executor(&self, ctx: &Context) -> Executor;
}

#[derive(Clone)]
enum Target {
    Pool(SqlitePool),
    Transaction(SharedTransaction),
}

/// Statement-execution surface
///
/// Every call is routed either to the shared pool or to the single connection
/// that holds the active transaction. Statements built with `sqlx::query*` or
/// `sqlx::QueryBuilder` are accepted as is.
#[derive(Clone)]
pub struct Executor {
    target: Target,
}

impl Executor {
    pub(crate) fn pool(pool: SqlitePool) -> Self {
        Self {
            target: Target::Pool(pool),
        }
    }

    pub(crate) fn transaction(tx: SharedTransaction) -> Self {
        Self {
            target: Target::Transaction(tx),
        }
    }

    /// Whether statements run inside a transaction
    pub fn is_transactional(&self) -> bool {
        matches!(self.target, Target::Transaction(_))
    }

    /// Execute a statement that doesn't return rows
    pub async fn execute<'q>(
        &self,
        query: Query<'q, Sqlite, SqliteArguments<'q>>,
    ) -> Result<SqliteQueryResult> {
        match &self.target {
            Target::Pool(pool) => Ok(query.execute(pool).await?),
            Target::Transaction(tx) => {
                let mut tx = tx.lock().await;
                Ok(query.execute(tx.connection()?).await?)
            }
        }
    }

    /// Execute unparameterized SQL, possibly several `;`-separated statements
    pub async fn execute_raw(&self, sql: &str) -> Result<SqliteQueryResult> {
        let statement = sqlx::raw_sql(sql);
        match &self.target {
            Target::Pool(pool) => Ok(statement.execute(pool).await?),
            Target::Transaction(tx) => {
                let mut tx = tx.lock().await;
                Ok(statement.execute(tx.connection()?).await?)
            }
        }
    }

    pub async fn fetch_all<'q>(
        &self,
        query: Query<'q, Sqlite, SqliteArguments<'q>>,
    ) -> Result<Vec<SqliteRow>> {
        match &self.target {
            Target::Pool(pool) => Ok(query.fetch_all(pool).await?),
            Target::Transaction(tx) => {
                let mut tx = tx.lock().await;
                Ok(query.fetch_all(tx.connection()?).await?)
            }
        }
    }

    pub async fn fetch_one<'q>(
        &self,
        query: Query<'q, Sqlite, SqliteArguments<'q>>,
    ) -> Result<SqliteRow> {
        match &self.target {
            Target::Pool(pool) => Ok(query.fetch_one(pool).await?),
            Target::Transaction(tx) => {
                let mut tx = tx.lock().await;
                Ok(query.fetch_one(tx.connection()?).await?)
            }
        }
    }

    pub async fn fetch_optional<'q>(
        &self,
        query: Query<'q, Sqlite, SqliteArguments<'q>>,
    ) -> Result<Option<SqliteRow>> {
        match &self.target {
            Target::Pool(pool) => Ok(query.fetch_optional(pool).await?),
            Target::Transaction(tx) => {
                let mut tx = tx.lock().await;
                Ok(query.fetch_optional(tx.connection()?).await?)
            }
        }
    }

    /// Scan every row into `O`
    pub async fn fetch_all_as<'q, O>(
        &self,
        query: QueryAs<'q, Sqlite, O, SqliteArguments<'q>>,
    ) -> Result<Vec<O>>
    where
        O: Send + Unpin + for<'r> FromRow<'r, SqliteRow>,
    {
        match &self.target {
            Target::Pool(pool) => Ok(query.fetch_all(pool).await?),
            Target::Transaction(tx) => {
                let mut tx = tx.lock().await;
                Ok(query.fetch_all(tx.connection()?).await?)
            }
        }
    }

    pub async fn fetch_one_as<'q, O>(
        &self,
        query: QueryAs<'q, Sqlite, O, SqliteArguments<'q>>,
    ) -> Result<O>
    where
        O: Send + Unpin + for<'r> FromRow<'r, SqliteRow>,
    {
        match &self.target {
            Target::Pool(pool) => Ok(query.fetch_one(pool).await?),
            Target::Transaction(tx) => {
                let mut tx = tx.lock().await;
                Ok(query.fetch_one(tx.connection()?).await?)
            }
        }
    }

    pub async fn fetch_optional_as<'q, O>(
        &self,
        query: QueryAs<'q, Sqlite, O, SqliteArguments<'q>>,
    ) -> Result<Option<O>>
    where
        O: Send + Unpin + for<'r> FromRow<'r, SqliteRow>,
    {
        match &self.target {
            Target::Pool(pool) => Ok(query.fetch_optional(pool).await?),
            Target::Transaction(tx) => {
                let mut tx = tx.lock().await;
                Ok(query.fetch_optional(tx.connection()?).await?)
            }
        }
    }

    /// Scan the first column of the first row
    pub async fn fetch_scalar<'q, O>(
        &self,
        query: QueryScalar<'q, Sqlite, O, SqliteArguments<'q>>,
    ) -> Result<O>
    where
        O: Send + Unpin,
        (O,): Send + Unpin + for<'r> FromRow<'r, SqliteRow>,
    {
        match &self.target {
            Target::Pool(pool) => Ok(query.fetch_one(pool).await?),
            Target::Transaction(tx) => {
                let mut tx = tx.lock().await;
                Ok(query.fetch_one(tx.connection()?).await?)
            }
        }
    }

    pub async fn fetch_optional_scalar<'q, O>(
        &self,
        query: QueryScalar<'q, Sqlite, O, SqliteArguments<'q>>,
    ) -> Result<Option<O>>
    where
        O: Send + Unpin,
        (O,): Send + Unpin + for<'r> FromRow<'r, SqliteRow>,
    {
        match &self.target {
            Target::Pool(pool) => Ok(query.fetch_optional(pool).await?),
            Target::Transaction(tx) => {
                let mut tx = tx.lock().await;
                Ok(query.fetch_optional(tx.connection()?).await?)
            }
        }
    }
}

impl std::fmt::Debug for Executor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor")
            .field("transactional", &self.is_transactional())
            .finish()
    }
}
