use async_trait::async_trait;
use sqlx::{mysql::{MySqlConnectOptions, MySqlConnection}, Connection, Executor};
use tracing::{debug, info};
use super::config::DatabaseConfig;
use super::error::IngestError;
use super::loader::TableStore;

/// One connection for the whole run, statements are issued one at a time.
pub struct MySqlStore {
    connection: MySqlConnection,
}

impl MySqlStore {

    pub async fn connect(config: &DatabaseConfig) -> Result<MySqlStore, IngestError> {
        let options = MySqlConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .password(&config.password)
            .database(&config.database);

        let connection = MySqlConnection::connect_with(&options)
            .await
            .map_err(IngestError::Connect)?;

        info!(host = %config.host, database = %config.database, "connected to mysql");
        Ok(MySqlStore { connection })
    }

    pub async fn close(self) -> Result<(), IngestError> {
        self.connection.close().await?;
        Ok(())
    }
}

#[async_trait]
impl TableStore for MySqlStore {

    async fn table_exists(&mut self, table: &str) -> Result<bool, sqlx::Error> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM information_schema.tables WHERE table_schema = DATABASE() AND table_name = ?",
        )
        .bind(table)
        .fetch_one(&mut self.connection)
        .await?;

        Ok(count > 0)
    }

    // DDL goes through the text protocol
    async fn execute(&mut self, sql: &str) -> Result<(), sqlx::Error> {
        debug!(sql = sql, "executing statement");
        (&mut self.connection).execute(sql).await?;
        Ok(())
    }

    async fn insert_row(&mut self, sql: &str, values: &[String]) -> Result<(), sqlx::Error> {
        let mut query = sqlx::query(sql);
        for value in values {
            query = query.bind(value.as_str());
        }
        query.execute(&mut self.connection).await?;
        Ok(())
    }
}
