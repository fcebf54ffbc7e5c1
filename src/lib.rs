#[macro_use]
extern crate diesel;
#[macro_use]
extern crate diesel_migrations;

pub mod account;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod filter;
pub mod logging;
pub mod metadata;
pub mod models;
pub mod render;
pub mod schema;
pub mod shelf;
pub mod storage;
pub mod url;

pub use error::{Error, Result};

use config::Config;
use metadata::{HttpMetadataFetcher, MetadataFetcher, UnconfiguredFetcher};
use shelf::Shelf;
use storage::{LocalStore, SqliteNamespace};

/// The fetcher `config` asks for, or one that always fails when no
/// endpoint is set.
pub fn fetcher_for(config: &Config) -> Result<Box<dyn MetadataFetcher>> {
    Ok(match &config.endpoint {
        Some(endpoint) => Box::new(HttpMetadataFetcher::new(
            endpoint.as_str(),
            config.fetch_timeout,
        )?),
        None => Box::new(UnconfiguredFetcher),
    })
}

/// Opens the shelf stored in the configured database.
pub fn open_shelf(config: &Config) -> Result<Shelf<SqliteNamespace>> {
    let conn = db::connect(&config.database)?;
    Shelf::open(LocalStore::new(SqliteNamespace::new(conn)), fetcher_for(config)?)
}
