use std::process::exit;
use tracing::info;
use tracing_subscriber::EnvFilter;
use modules::config::{get_arguments, Arguments, Config};
use modules::error::IngestError;
use modules::loader::Loader;
use modules::mysql::MySqlStore;
use modules::parser::Parser;
use modules::schema::{derive_table_name, TableSchema};
use modules::utility::{preview_row, read_dataset};

mod modules;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let arguments = get_arguments();

    if let Err(error) = run(arguments).await {
        println!("\n  !!!!! {} !!!!!\n", error);
        exit(1);
    }
}

async fn run(arguments: Arguments) -> Result<(), IngestError> {
    let config = Config::load(&arguments.config_path, arguments.environment)?;
    let table_name = derive_table_name(&arguments.csv_path)?;
    info!(environment = %config.environment, table = %table_name, "starting ingest");

    let dataset = read_dataset(&arguments.csv_path, &Parser::new(config.chapter))?;
    let schema = TableSchema::new(table_name, &dataset.header)?;

    if arguments.should_preview_record {
        if let Some(first) = dataset.rows.first() {
            let columns: Vec<&str> = schema.column_names().collect();
            if !preview_row(&columns, first)? {
                println!("Incorrect format, exiting...");
                return Ok(());
            }
        }
    }

    let store = MySqlStore::connect(&config.database).await?;
    println!("\n  <<<<<  Script connected to database  >>>>>  \n");

    let log_directory = if arguments.enable_log {
        Some(config.app_path())
    } else {
        None
    };

    let mut loader = Loader::new(store, log_directory);
    loader.load(&schema, &dataset.rows, arguments.action).await?;
    loader.into_store().close().await
}
