//! SQLite persistence for the VelocityCMDB core.
//!
//! Three databases under DATA_DIR:
//!
//! - `assets.db` - devices, components, current captures, snapshot history,
//!   change records, FTS index, named collection jobs
//! - `arp_cat.db` - ARP entries with VRF/VDOM contexts, indexed by MAC/IP
//! - `users.db` - local users (auth backends live outside the core)
//!
//! Each store opens its file with a single-connection pool: one writer per
//! database, short transactions, concurrent readers are a non-goal at this
//! layer. Tests use in-memory databases.

pub mod arp;
pub mod assets;
pub mod error;
pub mod models;
pub mod schema;
pub mod users;

pub use arp::ArpCatDb;
pub use assets::AssetsDb;
pub use error::DbError;
pub use models::{
    ArpEntryRecord, CaptureChange, CaptureSnapshot, Component, CurrentCapture, Device,
    DeviceUpsert, SavedJob, SearchHit,
};
pub use users::UsersDb;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;

/// Open a single-connection pool on a database file, creating it if needed.
/// Foreign keys are enforced on every connection.
pub(crate) async fn open_pool(path: &Path) -> Result<SqlitePool, DbError> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;
    Ok(pool)
}

/// In-memory pool for tests. Single connection: each SQLite `:memory:`
/// connection is its own database.
pub(crate) async fn open_memory_pool() -> Result<SqlitePool, DbError> {
    let options = SqliteConnectOptions::new()
        .filename(":memory:")
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;
    Ok(pool)
}
