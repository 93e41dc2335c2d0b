// ============================================================================
// Connection
// ============================================================================
//
// Owns the pool, the pragma setup done at open, and the sequence registry.
// Transactions are begun here and handed down the call chain inside a
// `Context`; nothing below needs a reference to the transaction itself.
//
// ============================================================================

pub mod config;

use crate::context::Context;
use crate::core::{Error, Result};
use crate::sequence::{Identifier, Sequence};
use crate::session::{Executor, Session};
use crate::transaction::{self, Transaction, state::LiveTransaction};
use config::ConnectionConfig;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{ConnectOptions, Connection as _};
use std::collections::HashMap;
use std::future::Future;
use std::str::FromStr;
use std::sync::{Arc, RwLock};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Transaction manager and session over one SQLite database
///
/// Open it once at startup and share it (usually behind an `Arc`). Units of
/// work are delimited with [`Connection::begin`] or [`Connection::wrap`];
/// everything below them reaches the database through
/// [`Connection::executor`] with the context they were handed.
pub struct Connection {
    pool: SqlitePool,
    config: ConnectionConfig,
    sequences: RwLock<HashMap<String, Arc<Sequence>>>,
}

impl Connection {
    /// Open the database and apply every configured pragma.
    ///
    /// Each pragma runs as its own statement; the first one that fails is
    /// reported as [`Error::Configuration`] and no connection is returned.
    /// The same pragmas are then registered on the pool so that every pooled
    /// connection gets them.
    pub async fn open(config: ConnectionConfig) -> Result<Self> {
        config.validate().map_err(Error::InvalidConfig)?;

        let open_error = |source: sqlx::Error| Error::Open {
            database: config.database.clone(),
            source,
        };

        let base = if config.database.starts_with("sqlite:") {
            SqliteConnectOptions::from_str(&config.database).map_err(open_error)?
        } else {
            SqliteConnectOptions::new().filename(&config.database)
        }
        .create_if_missing(true)
        .log_statements(config.log_statements);

        let mut setup = base.connect().await.map_err(open_error)?;
        for (name, value) in config.pragmas() {
            let directive = format!("PRAGMA {}={}", name, value);
            if let Err(source) = sqlx::query(&directive).execute(&mut setup).await {
                let _ = setup.close().await;
                return Err(Error::Configuration { directive, source });
            }
            debug!(database = %config.database, %directive, "Applied pragma");
        }
        if let Err(err) = setup.close().await {
            warn!(database = %config.database, error = %err, "Closing setup connection failed");
        }

        let options = config
            .pragmas()
            .into_iter()
            .fold(base, |options, (name, value)| options.pragma(name, value));

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await
            .map_err(open_error)?;

        info!(
            database = %config.database,
            journal_mode = %config.journal_mode,
            max_connections = config.max_connections,
            "Database opened"
        );

        Ok(Self {
            pool,
            config,
            sequences: RwLock::new(HashMap::new()),
        })
    }

    /// Raw driver pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Start a unit of work.
    ///
    /// If `ctx` already carries a transaction, the same context comes back with
    /// a [`Transaction::Noop`] and nothing is opened. Otherwise a new
    /// transaction is begun and attached to a context derived from `ctx`.
    pub async fn begin(&self, ctx: &Context) -> Result<(Context, Transaction)> {
        if transaction::extract(ctx).is_some() {
            return Ok((ctx.clone(), Transaction::Noop));
        }

        let tx = self.pool.begin().await.map_err(Error::TransactionStart)?;
        let live = LiveTransaction::new(tx);
        let id = live.id();
        let shared = Arc::new(Mutex::new(live));

        debug!(transaction = %id, "Transaction started");

        Ok((transaction::inject(ctx, &shared), Transaction::real(shared, id)))
    }

    /// Run `unit_of_work` inside a transaction and finalize it.
    ///
    /// Commits on `Ok` and returns the commit error, if any. Rolls back on
    /// `Err` and returns that error unchanged; a failing rollback is logged.
    /// Called with a context that already carries a transaction, this is a
    /// plain call of `unit_of_work` and the outer unit of work finalizes.
    pub async fn wrap<F, Fut, T, E>(&self, ctx: &Context, unit_of_work: F) -> std::result::Result<T, E>
    where
        F: FnOnce(Context) -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: From<Error>,
    {
        let (tx_ctx, tx) = self.begin(ctx).await?;
        tx.end(unit_of_work(tx_ctx).await).await
    }

    /// Statement surface for `ctx`: the carried transaction if there is one,
    /// the base pool otherwise.
    pub fn executor(&self, ctx: &Context) -> Executor {
        match transaction::extract(ctx) {
            Some(tx) => Executor::transaction(tx),
            None => Executor::pool(self.pool.clone()),
        }
    }

    /// Create a sequence for `table`, seed it from `MAX(id)` and register it
    /// under the table name, replacing any previous registration.
    pub async fn register_sequence(&self, table: impl Into<Identifier>) -> Result<()> {
        let table = table.into();
        let sequence = Sequence::new(table.clone());

        sequence
            .refresh(self, &Context::background())
            .await
            .map_err(|source| Error::SequenceRefresh {
                table: table.to_string(),
                source: Box::new(source),
            })?;

        debug!(%table, value = sequence.current_value(), "Sequence registered");

        self.sequences
            .write()?
            .insert(table.table_name().to_string(), Arc::new(sequence));

        Ok(())
    }

    /// Sequence registered for `table`
    pub fn sequence(&self, table: impl Into<Identifier>) -> Result<Arc<Sequence>> {
        let table = table.into();
        self.sequences
            .read()?
            .get(table.table_name())
            .cloned()
            .ok_or_else(|| Error::SequenceNotFound(table.table_name().to_string()))
    }

    /// Close every pooled connection
    pub async fn close(&self) {
        self.pool.close().await;
        info!(database = %self.config.database, "Database closed");
    }
}

impl Session for Connection {
    fn executor(&self, ctx: &Context) -> Executor {
        Connection::executor(self, ctx)
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("database", &self.config.database)
            .finish()
    }
}
