use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Could not open database: {0}")]
    Connection(#[from] diesel::ConnectionError),

    #[error("Could not migrate database: {0}")]
    Migration(#[from] diesel_migrations::RunMigrationsError),

    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("Could not encode bookmark list: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Stored bookmark list is unreadable: {0}")]
    Corrupt(#[source] serde_json::Error),

    #[error("{key} was modified concurrently (expected revision {expected}, found {found})")]
    Conflict {
        key: String,
        expected: i64,
        found: i64,
    },

    #[error("Invalid account: {0} is required")]
    InvalidAccount(&'static str),

    #[error("An account with this identity, email or username already exists")]
    DuplicateAccount,

    #[error("Could not build HTTP client: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
