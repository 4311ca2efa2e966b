use itertools::Itertools;
use std::{fmt, path::Path};
use super::error::IngestError;

pub const TABLE_SUFFIX: &str = "_pims";
pub const TABLE_PREFIX_LENGTH: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Int(u16),
    VarChar(u16),
    Char(u16),
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::Int(width) => write!(f, "int({})", width),
            ColumnType::VarChar(width) => write!(f, "varchar({})", width),
            ColumnType::Char(width) => write!(f, "char({})", width),
        }
    }
}

/// Positional column types of a PIMs export. The header row supplies the names.
pub const COLUMN_TEMPLATE: [ColumnType; 24] = [
    ColumnType::Int(25),
    ColumnType::VarChar(60),
    ColumnType::VarChar(60),
    ColumnType::Int(3),
    ColumnType::VarChar(20),
    ColumnType::Int(25),
    ColumnType::VarChar(3),
    ColumnType::Char(2),
    ColumnType::VarChar(10),
    ColumnType::VarChar(100),
    ColumnType::VarChar(2),
    ColumnType::VarChar(50),
    ColumnType::VarChar(8),
    ColumnType::VarChar(10),
    ColumnType::VarChar(10),
    ColumnType::VarChar(10),
    ColumnType::VarChar(10),
    ColumnType::VarChar(9),
    ColumnType::VarChar(9),
    ColumnType::VarChar(5),
    ColumnType::VarChar(100),
    ColumnType::VarChar(30),
    ColumnType::VarChar(3),
    ColumnType::VarChar(255),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub column_type: ColumnType,
}

/// A target table: the fixed template with the sanitized header names bound to it.
#[derive(Debug, Clone)]
pub struct TableSchema {
    table: String,
    columns: Vec<Column>,
}

impl TableSchema {

    /// Fails when the header does not have one name per template column.
    /// Duplicate names are left for the database to reject.
    pub fn new(table: impl Into<String>, header: &[String]) -> Result<TableSchema, IngestError> {
        if header.len() != COLUMN_TEMPLATE.len() {
            return Err(IngestError::HeaderWidth {
                found: header.len(),
                expected: COLUMN_TEMPLATE.len(),
            });
        }

        let columns = header
            .iter()
            .zip(COLUMN_TEMPLATE.iter())
            .map(|(name, column_type)| Column {
                name: name.to_owned(),
                column_type: *column_type,
            })
            .collect();

        Ok(TableSchema {
            table: table.into(),
            columns: columns,
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns().iter().map(|column| column.name.as_str())
    }

    pub fn create_table_sql(&self) -> String {
        let data_columns = self
            .columns
            .iter()
            .map(|column| format!("  {} {} NOT NULL,", quote_identifier(&column.name), column.column_type))
            .join("\n");

        format!(
            "CREATE TABLE {} (\n  `id` int(51) NOT NULL AUTO_INCREMENT,\n  `modified` timestamp NOT NULL DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP,\n{}\n  PRIMARY KEY (`id`)\n) ENGINE=InnoDB DEFAULT CHARSET=utf8",
            quote_identifier(&self.table),
            data_columns
        )
    }

    pub fn drop_table_sql(&self) -> String {
        format!("DROP TABLE {}", quote_identifier(&self.table))
    }

    // values are bound as parameters, one placeholder per column
    pub fn insert_sql(&self) -> String {
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_identifier(&self.table),
            self.column_names().map(quote_identifier).join(", "),
            self.columns.iter().map(|_| "?").join(", ")
        )
    }
}

pub fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

// first 7 characters of the file name, e.g. 2016-11_CSUEU_PIMS.csv -> 2016-11_pims
pub fn derive_table_name(csv_path: &Path) -> Result<String, IngestError> {
    let file_name = csv_path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| IngestError::Usage(format!("{} is not a valid csv file name", csv_path.display())))?;

    let prefix: String = file_name.chars().take(TABLE_PREFIX_LENGTH).collect();
    Ok(format!("{}{}", prefix, TABLE_SUFFIX))
}
