use thiserror::Error;

// every failure that stops the run; per-row insert failures are counted instead
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Invalid argument: {0}")]
    Usage(String),

    #[error("Cannot load configuration: {0}")]
    Config(#[from] figment::Error),

    #[error("Configuration has no [{0}] section")]
    MissingEnvironment(String),

    #[error("Cannot properly read csv file: {0}")]
    Csv(#[from] csv::Error),

    #[error("Empty csv, no header row in {0}")]
    EmptyInput(String),

    #[error("Header has {found} columns, the table template expects {expected}")]
    HeaderWidth { found: usize, expected: usize },

    #[error("Script could not connect to database: {0}")]
    Connect(#[source] sqlx::Error),

    #[error("Table {0} exists, stop the script.")]
    TableExists(String),

    #[error("Failed to create the table {table}, stop the script: {source}")]
    CreateTable {
        table: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Cannot save logs: {0}")]
    Io(#[from] std::io::Error),
}
