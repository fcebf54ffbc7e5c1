use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use tracing::debug;

use crate::error::Result;

embed_migrations!("./migrations");

/// Milliseconds a writer waits on a locked database before giving up.
const BUSY_TIMEOUT_MS: u32 = 5_000;

/// Opens the database at `location` (a path or `:memory:`) and brings its
/// schema up to date.
pub fn connect(location: &str) -> Result<SqliteConnection> {
    debug!(location, "opening database");
    let conn = SqliteConnection::establish(location)?;
    // https://sqlite.org/foreignkeys.html#fk_enable
    conn.batch_execute(&format!(
        "PRAGMA foreign_keys = ON; PRAGMA busy_timeout = {};",
        BUSY_TIMEOUT_MS
    ))?;

    embedded_migrations::run(&conn)?;
    Ok(conn)
}
