use async_trait::async_trait;
use chrono::Local;
use std::{fmt, fs::{self, File}, io::{self, BufWriter, Write}, path::{Path, PathBuf}};
use tracing::{info, warn};
use super::config::{Action, LOG_FILE_NAME, FAILED_CSV_FILE_NAME};
use super::error::IngestError;
use super::schema::TableSchema;
use super::utility::ProgressPrinter;

/// The statements the loader needs from a database.
#[async_trait]
pub trait TableStore {
    async fn table_exists(&mut self, table: &str) -> Result<bool, sqlx::Error>;

    async fn execute(&mut self, sql: &str) -> Result<(), sqlx::Error>;

    async fn insert_row(&mut self, sql: &str, values: &[String]) -> Result<(), sqlx::Error>;
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LoadSummary {
    pub attempted: usize,
    pub inserted: usize,
    pub failed: usize,
}

impl fmt::Display for LoadSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} insert errors: {} rows attempted, {} rows inserted",
            self.failed, self.attempted, self.inserted
        )
    }
}

pub struct Loader<S> {
    store: S,
    log_directory: Option<PathBuf>,
    run_log: Option<RunLog>,
}

impl<S: TableStore + Send> Loader<S> {

    // logs are only opened once the table is ready, an aborted run keeps the previous ones
    pub fn new(store: S, log_directory: Option<PathBuf>) -> Loader<S> {
        Loader {
            store: store,
            log_directory: log_directory,
            run_log: None,
        }
    }

    pub fn into_store(self) -> S {
        self.store
    }

    // create (or replace) the table, then insert every row
    pub async fn load(&mut self, schema: &TableSchema, rows: &[Vec<String>], action: Action) -> Result<LoadSummary, IngestError> {
        self.prepare_table(schema, action).await?;

        if let Some(directory) = self.log_directory.as_ref() {
            self.run_log = Some(RunLog::create(directory, schema)?);
        }

        println!("Starting to insert rows into {}:", schema.table());
        let summary = self.insert_all(schema, rows).await?;

        if let Some(run_log) = self.run_log.as_mut() {
            run_log.finish(&summary)?;
            println!("Logs has been saved to {}", run_log.directory);
        }
        println!("\n  ## {}. Script finished.\n", summary);

        Ok(summary)
    }

    // an existing table is only dropped when replacing
    async fn prepare_table(&mut self, schema: &TableSchema, action: Action) -> Result<(), IngestError> {
        if self.store.table_exists(schema.table()).await? {
            match action {
                Action::Replace => {
                    info!(table = schema.table(), "dropping existing table");
                    self.store.execute(&schema.drop_table_sql()).await?;
                }
                Action::Create => return Err(IngestError::TableExists(schema.table().to_string())),
            }
        }

        self.store
            .execute(&schema.create_table_sql())
            .await
            .map_err(|source| IngestError::CreateTable {
                table: schema.table().to_string(),
                source: source,
            })?;
        info!(table = schema.table(), "created table");

        Ok(())
    }

    // one insert per row; a failed row is reported and the rest still go in
    async fn insert_all(&mut self, schema: &TableSchema, rows: &[Vec<String>]) -> Result<LoadSummary, IngestError> {
        let insert_sql = schema.insert_sql();
        let mut summary = LoadSummary::default();
        let mut progress_printer = ProgressPrinter::new(rows.len(), io::stdout());

        for (i, row) in rows.iter().enumerate() {
            summary.attempted += 1;

            match self.store.insert_row(&insert_sql, row).await {
                Ok(()) => {
                    summary.inserted += 1;
                    if let Some(run_log) = self.run_log.as_mut() {
                        run_log.log_insert(schema, row, None)?;
                    }
                }
                Err(error) => {
                    let id = row.first().map(String::as_str).unwrap_or("?");
                    println!("    !!!!! Insert error occurred for #{}.", id);
                    warn!(id = id, %error, "insert failed");
                    summary.failed += 1;
                    if let Some(run_log) = self.run_log.as_mut() {
                        run_log.log_insert(schema, row, Some(&error))?;
                        run_log.save_failed_row(row)?;
                    }
                }
            }

            progress_printer.update_progress(i + 1)?;
        }

        Ok(summary)
    }
}

/// Insert outcomes and failed rows saved next to the application.
pub struct RunLog {
    directory: String,
    logger: BufWriter<File>,
    csv_writer: csv::Writer<File>,
}

impl RunLog {

    // the failed rows file starts with the table's column names so it can be re-imported
    pub fn create(directory: &Path, schema: &TableSchema) -> Result<RunLog, IngestError> {
        fs::create_dir_all(directory)?;

        let mut logger = BufWriter::new(File::create(directory.join(LOG_FILE_NAME))?);
        writeln!(logger, "{} loading {}", Local::now().format("%Y-%m-%d %H:%M:%S"), schema.table())?;

        let mut csv_writer = csv::WriterBuilder::new()
            .flexible(true)
            .from_path(directory.join(FAILED_CSV_FILE_NAME))?;
        csv_writer.write_record(schema.column_names())?;

        Ok(RunLog {
            directory: directory.display().to_string(),
            logger: logger,
            csv_writer: csv_writer,
        })
    }

    // one line per row: outcome, then the column/value pairs as json
    fn log_insert(&mut self, schema: &TableSchema, row: &[String], error: Option<&sqlx::Error>) -> io::Result<()> {
        let request_result = match error {
            None => "Success",
            Some(_) => "Failure",
        };

        let pairs: Vec<(&str, &str)> = schema.column_names().zip(row.iter().map(String::as_str)).collect();
        writeln!(self.logger, "{}: {}", request_result, serde_json::to_string(&pairs)?)?;

        if let Some(error) = error {
            writeln!(self.logger, "Error message: {}", error)?;
        }
        Ok(())
    }

    fn save_failed_row(&mut self, row: &[String]) -> Result<(), csv::Error> {
        self.csv_writer.write_record(row)
    }

    fn finish(&mut self, summary: &LoadSummary) -> io::Result<()> {
        writeln!(self.logger, "=====")?;
        writeln!(self.logger, "{} {}", Local::now().format("%Y-%m-%d %H:%M:%S"), summary)?;
        self.logger.flush()?;
        self.csv_writer.flush()
    }
}
