//! SQLite persistence layer for the read-only marketplace stores.
//!
//! RULE: Only the store module talks to the database.
//! The engine and ledger call store methods and never execute SQL directly.
//!
//! The insert_* methods stand in for the admin and payment subsystems
//! that own these tables; the engine itself only uses the read side.
//!
//! The directory loader and the payment ledger each hold their own
//! connection. `reopen` hands the ledger a second connection onto the same
//! marketplace data, which is why a CLI run over generated data uses a
//! named shared-memory database rather than a private one.

use crate::error::EngineResult;
use rusqlite::{Connection, OpenFlags};

mod directory;
mod payment;
mod profile;

/// Schema files, applied in order by `migrate`.
const MIGRATIONS: &[(&str, &str)] = &[(
    "001_foundation",
    include_str!("../../../migrations/001_foundation.sql"),
)];

/// Where the marketplace data lives.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Location {
    /// A private `:memory:` database, visible to one connection only.
    Private,
    /// A file path or `file:` URI that further connections can join.
    Shared(String),
}

pub struct FeeStore {
    conn: Connection,
    location: Location,
}

impl FeeStore {
    /// Open a marketplace database by path or `file:` URI.
    pub fn open(path: &str) -> EngineResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_URI,
        )?;
        // Memory databases report "memory" here; only files switch to WAL.
        let mode: String = conn.query_row("PRAGMA journal_mode=WAL;", [], |row| row.get(0))?;
        log::debug!("store: opened {path} (journal_mode={mode})");
        Self::with_connection(conn, Location::Shared(path.to_string()))
    }

    pub fn in_memory() -> EngineResult<Self> {
        Self::with_connection(Connection::open_in_memory()?, Location::Private)
    }

    /// Named shared-cache memory database. Connections opened under the
    /// same name see the same marketplace rows while any one stays open.
    pub fn shared_memory(name: &str) -> EngineResult<Self> {
        Self::open(&format!("file:{name}?mode=memory&cache=shared"))
    }

    /// A second connection for the payment ledger. A private store has
    /// nothing to share, so it yields a fresh, empty database.
    pub fn reopen(&self) -> EngineResult<Self> {
        match &self.location {
            Location::Shared(path) => Self::open(path),
            Location::Private => Self::in_memory(),
        }
    }

    pub fn migrate(&self) -> EngineResult<()> {
        for (name, sql) in MIGRATIONS {
            self.conn.execute_batch(sql)?;
            log::debug!("store: applied migration {name}");
        }
        Ok(())
    }

    fn with_connection(conn: Connection, location: Location) -> EngineResult<Self> {
        // Overrides and applications reference student_profile.
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn, location })
    }
}
