use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use clap::ArgMatches;
use tracing::debug;

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Path of the SQLite file, or `:memory:`.
    pub database: String,
    pub endpoint: Option<String>,
    pub fetch_timeout: Option<Duration>,
    pub verbosity: u64,
}

impl Config {
    pub fn from_matches(matches: &ArgMatches) -> Result<Self> {
        let database = match global_value(matches, "database") {
            Some(value) => value.to_string(),
            None => default_database()?,
        };
        let endpoint = global_value(matches, "endpoint")
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .map(str::to_string);
        let fetch_timeout = global_value(matches, "fetch-timeout")
            .map(parse_timeout)
            .transpose()?;

        Ok(Config {
            database,
            endpoint,
            fetch_timeout,
            verbosity: verbosity(matches),
        })
    }
}

/// Global options may be given before or after the subcommand.
fn global_value<'m>(matches: &'m ArgMatches, name: &str) -> Option<&'m str> {
    matches
        .value_of(name)
        .or_else(|| matches.subcommand().1.and_then(|sub| global_value(sub, name)))
}

fn verbosity(matches: &ArgMatches) -> u64 {
    let nested = matches.subcommand().1.map_or(0, verbosity);
    matches.occurrences_of("verbose").max(nested)
}

fn parse_timeout(value: &str) -> Result<Duration> {
    match value.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(Error::Config(format!(
            "fetch timeout must be a positive number of seconds, got {:?}",
            value
        ))),
    }
}

fn default_database() -> Result<String> {
    let home_var = if cfg!(windows) { "APPDATA" } else { "HOME" };
    let home = env::var(home_var)
        .map_err(|_| Error::Config(format!("{} is not set, pass --database", home_var)))?;

    let mut path = PathBuf::from(home);
    path.push(".linkshelf");
    fs::create_dir_all(&path)?;
    path.push("linkshelf.db");
    debug!(path = %path.display(), "using default database");

    path.into_os_string()
        .into_string()
        .map_err(|_| Error::Config("database path is not valid unicode".to_string()))
}
