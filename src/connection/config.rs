use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// `PRAGMA auto_vacuum` modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AutoVacuum {
    #[default]
    None,
    Full,
    Incremental,
}

/// `PRAGMA journal_mode` modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JournalMode {
    Delete,
    Truncate,
    Persist,
    Memory,
    #[default]
    Wal,
    Off,
}

/// `PRAGMA synchronous` levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Synchronous {
    Off,
    #[default]
    Normal,
    Full,
    Extra,
}

/// `PRAGMA temp_store` locations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TempStore {
    #[default]
    Default,
    File,
    Memory,
}

/// `PRAGMA encoding` values. Only honored when the database file is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Encoding {
    #[default]
    #[serde(rename = "UTF-8")]
    Utf8,
    #[serde(rename = "UTF-16")]
    Utf16,
    #[serde(rename = "UTF-16le")]
    Utf16Le,
    #[serde(rename = "UTF-16be")]
    Utf16Be,
}

macro_rules! keyword_enum {
    ($ty:ident { $($variant:ident => $keyword:literal),+ $(,)? }) => {
        impl $ty {
            /// Keyword as understood by SQLite
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $keyword,)+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $(
                    if s.eq_ignore_ascii_case($keyword) {
                        return Ok($ty::$variant);
                    }
                )+
                Err(format!("unknown {} value '{}'", stringify!($ty), s))
            }
        }
    };
}

keyword_enum!(AutoVacuum {
    None => "NONE",
    Full => "FULL",
    Incremental => "INCREMENTAL",
});

keyword_enum!(JournalMode {
    Delete => "DELETE",
    Truncate => "TRUNCATE",
    Persist => "PERSIST",
    Memory => "MEMORY",
    Wal => "WAL",
    Off => "OFF",
});

keyword_enum!(Synchronous {
    Off => "OFF",
    Normal => "NORMAL",
    Full => "FULL",
    Extra => "EXTRA",
});

keyword_enum!(TempStore {
    Default => "DEFAULT",
    File => "FILE",
    Memory => "MEMORY",
});

keyword_enum!(Encoding {
    Utf8 => "UTF-8",
    Utf16 => "UTF-16",
    Utf16Le => "UTF-16le",
    Utf16Be => "UTF-16be",
});

/// Database connection configuration
///
/// Every pragma field is applied as its own `PRAGMA` statement when the
/// connection is opened, and again on every connection the pool creates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Path of the database file (or a `sqlite:` URL)
    pub database: String,

    pub auto_vacuum: AutoVacuum,

    /// Cache size in pages; negative values are KiB, as SQLite defines it
    pub cache_size_pages: i64,

    pub journal_mode: JournalMode,

    pub page_size_bytes: u32,

    pub synchronous: Synchronous,

    pub temp_store: TempStore,

    pub encoding: Encoding,

    /// Maximum number of pooled connections
    pub max_connections: u32,

    /// Level at which the driver logs executed statements
    pub log_statements: LevelFilter,
}

impl ConnectionConfig {
    /// Create a configuration for the given database file
    pub fn new(database: &str) -> Self {
        Self {
            database: database.to_string(),
            auto_vacuum: AutoVacuum::None,
            cache_size_pages: -2000,
            journal_mode: JournalMode::Wal,
            page_size_bytes: 4096,
            synchronous: Synchronous::Normal,
            temp_store: TempStore::Default,
            encoding: Encoding::Utf8,
            max_connections: 5,
            log_statements: LevelFilter::Debug,
        }
    }

    /// Set the database file
    pub fn database(mut self, database: &str) -> Self {
        self.database = database.to_string();
        self
    }

    pub fn auto_vacuum(mut self, mode: AutoVacuum) -> Self {
        self.auto_vacuum = mode;
        self
    }

    pub fn cache_size_pages(mut self, pages: i64) -> Self {
        self.cache_size_pages = pages;
        self
    }

    pub fn journal_mode(mut self, mode: JournalMode) -> Self {
        self.journal_mode = mode;
        self
    }

    pub fn page_size_bytes(mut self, bytes: u32) -> Self {
        self.page_size_bytes = bytes;
        self
    }

    pub fn synchronous(mut self, level: Synchronous) -> Self {
        self.synchronous = level;
        self
    }

    pub fn temp_store(mut self, location: TempStore) -> Self {
        self.temp_store = location;
        self
    }

    pub fn encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Set maximum connections
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Set the statement log level (`LevelFilter::Off` disables it)
    pub fn log_statements(mut self, level: LevelFilter) -> Self {
        self.log_statements = level;
        self
    }

    /// Pragmas in the order they are applied, as `(name, value)` pairs
    pub fn pragmas(&self) -> Vec<(&'static str, String)> {
        vec![
            ("auto_vacuum", self.auto_vacuum.to_string()),
            ("cache_size", self.cache_size_pages.to_string()),
            ("encoding", format!("'{}'", self.encoding)),
            ("journal_mode", self.journal_mode.to_string()),
            ("page_size", self.page_size_bytes.to_string()),
            ("synchronous", self.synchronous.to_string()),
            ("temp_store", self.temp_store.to_string()),
        ]
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.database.is_empty() {
            return Err("Database cannot be empty".to_string());
        }

        if self.max_connections == 0 {
            return Err("max_connections must be > 0".to_string());
        }

        let page_size = self.page_size_bytes;
        if !(512..=65536).contains(&page_size) || !page_size.is_power_of_two() {
            return Err(format!(
                "page_size_bytes must be a power of two between 512 and 65536, got {}",
                page_size
            ));
        }

        Ok(())
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self::new("sqlite.db")
    }
}
