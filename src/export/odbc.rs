//! ODBC connector for SQL Server staging tables.
//!
//! Rows travel as text parameters through a columnar bulk inserter; the
//! driver converts them to the destination column types.

use super::{insert_statement, sql_text, Connector, StageTarget, StagingConnection};
use crate::error::{Result, StageError};
use crate::types::Table;
use odbc_api::{Connection, ConnectionOptions, Environment};

/// Rows sent to the driver per round trip
const BATCH_SIZE: usize = 1000;

/// Opens ODBC connections with autocommit disabled
pub struct OdbcConnector {
    environment: Environment,
}

impl OdbcConnector {
    pub fn new() -> Result<Self> {
        let environment =
            Environment::new().map_err(|e| StageError::Connection(e.to_string()))?;
        Ok(OdbcConnector { environment })
    }
}

impl Connector for OdbcConnector {
    type Connection<'c> = OdbcStagingConnection<'c>;

    fn connect(&self, connection_string: &str) -> Result<Self::Connection<'_>> {
        let connection = self
            .environment
            .connect_with_connection_string(connection_string, ConnectionOptions::default())
            .map_err(|e| StageError::Connection(e.to_string()))?;

        connection
            .set_autocommit(false)
            .map_err(|e| StageError::Connection(e.to_string()))?;

        tracing::debug!("Opened ODBC connection");
        Ok(OdbcStagingConnection { connection })
    }
}

/// One ODBC connection holding an open transaction
pub struct OdbcStagingConnection<'env> {
    connection: Connection<'env>,
}

impl StagingConnection for OdbcStagingConnection<'_> {
    fn bulk_append(&mut self, target: &StageTarget, table: &Table) -> Result<u64> {
        let insert_err = |e: odbc_api::Error| StageError::Insert {
            target: target.to_string(),
            message: e.to_string(),
        };

        let cells: Vec<Vec<Option<String>>> = table
            .rows()
            .iter()
            .map(|row| row.iter().map(sql_text).collect())
            .collect();

        // Buffers grow on demand; start at the widest value seen per column
        let max_str_len: Vec<usize> = (0..table.num_columns())
            .map(|column| {
                cells
                    .iter()
                    .filter_map(|row| row[column].as_ref().map(String::len))
                    .max()
                    .unwrap_or(0)
                    .max(1)
            })
            .collect();

        let sql = insert_statement(target, table.columns());
        tracing::debug!(%sql, rows = cells.len(), "Bulk inserting");

        let prepared = self.connection.prepare(&sql).map_err(insert_err)?;
        let capacity = BATCH_SIZE.min(cells.len()).max(1);
        let mut inserter = prepared
            .into_text_inserter(capacity, max_str_len)
            .map_err(insert_err)?;

        for chunk in cells.chunks(capacity) {
            inserter.clear();
            for row in chunk {
                inserter
                    .append(row.iter().map(|cell| cell.as_deref().map(str::as_bytes)))
                    .map_err(insert_err)?;
            }
            inserter.execute().map_err(insert_err)?;
        }

        Ok(cells.len() as u64)
    }

    fn commit(self) -> Result<()> {
        self.connection
            .commit()
            .map_err(|e| StageError::Transaction {
                action: "commit",
                message: e.to_string(),
            })
    }

    fn rollback(self) -> Result<()> {
        self.connection
            .rollback()
            .map_err(|e| StageError::Transaction {
                action: "rollback",
                message: e.to_string(),
            })
    }
}
