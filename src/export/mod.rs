//! Loading flattened tables into a SQL Server staging schema
//!
//! Each export scopes its own connection: connect, append the rows when there
//! are any, then commit on success or roll back on failure. Both paths consume
//! the connection, which closes it.

#[cfg(feature = "odbc")]
pub mod odbc;

#[cfg(feature = "odbc")]
pub use odbc::{OdbcConnector, OdbcStagingConnection};

use crate::error::{Result, StageError};
use crate::types::Table;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::fmt;

/// Schema every staging table lives in unless configured otherwise
pub const DEFAULT_SCHEMA: &str = "Stage";

static IDENTIFIER_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,127}$").unwrap()
});

/// A schema-qualified destination table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageTarget {
    pub schema: String,
    pub table: String,
}

impl StageTarget {
    /// Validate both parts as plain SQL identifiers
    pub fn new(schema: &str, table: &str) -> Result<Self> {
        for part in [schema, table] {
            if !IDENTIFIER_REGEX.is_match(part) {
                return Err(StageError::InvalidIdentifier(part.to_string()));
            }
        }
        Ok(StageTarget {
            schema: schema.to_string(),
            table: table.to_string(),
        })
    }

    /// Bracket-quoted name for use in SQL text
    pub fn quoted(&self) -> String {
        format!("{}.{}", quote_identifier(&self.schema), quote_identifier(&self.table))
    }
}

impl fmt::Display for StageTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.table)
    }
}

/// Quote a SQL Server identifier, doubling any closing bracket
pub fn quote_identifier(name: &str) -> String {
    format!("[{}]", name.replace(']', "]]"))
}

/// Parameterized `INSERT` for every column of a table
pub fn insert_statement(target: &StageTarget, columns: &[String]) -> String {
    let names: Vec<String> = columns.iter().map(|c| quote_identifier(c)).collect();
    let placeholders = vec!["?"; columns.len()].join(", ");
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        target.quoted(),
        names.join(", "),
        placeholders
    )
}

/// Text form of a cell as sent to the database; `None` is SQL NULL.
pub fn sql_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Bool(b) => Some(if *b { "1" } else { "0" }.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        nested => Some(nested.to_string()),
    }
}

/// An open database connection with an uncommitted transaction
pub trait StagingConnection {
    /// Append every row of `table` to `target`, returning the number of rows sent
    fn bulk_append(&mut self, target: &StageTarget, table: &Table) -> Result<u64>;

    /// Commit and close
    fn commit(self) -> Result<()>;

    /// Roll back and close
    fn rollback(self) -> Result<()>;
}

/// Opens staging connections from a connection string
pub trait Connector {
    type Connection<'c>: StagingConnection
    where
        Self: 'c;

    fn connect(&self, connection_string: &str) -> Result<Self::Connection<'_>>;
}

/// Outcome of one export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportReport {
    pub target: StageTarget,
    pub rows: u64,
}

/// Loads tables into `<schema>.<table>` through a [`Connector`]
pub struct Exporter<C: Connector> {
    connector: C,
    connection_string: String,
    schema: String,
}

impl<C: Connector> Exporter<C> {
    pub fn new(connector: C, connection_string: impl Into<String>) -> Self {
        Exporter {
            connector,
            connection_string: connection_string.into(),
            schema: DEFAULT_SCHEMA.to_string(),
        }
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = schema.into();
        self
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Append `table` to the staging table `table_name`.
    ///
    /// `label` names the data in progress messages, usually the source file.
    /// A table without rows still opens, commits and closes a connection.
    pub fn export(&self, table: &Table, table_name: &str, label: &str) -> Result<ExportReport> {
        let target = StageTarget::new(&self.schema, table_name)?;
        let mut connection = self.connector.connect(&self.connection_string)?;

        tracing::info!("Inserting {} into {} table...", label, table_name);

        let appended = if table.is_empty() {
            Ok(0)
        } else if table.num_columns() == 0 {
            tracing::warn!(rows = table.len(), "Table has rows but no columns, nothing to insert");
            Ok(0)
        } else {
            connection.bulk_append(&target, table)
        };

        match appended {
            Ok(rows) => {
                connection.commit()?;
                tracing::info!(rows, "{}...inserted into {} table!", label, target);
                Ok(ExportReport { target, rows })
            }
            Err(err) => {
                if let Err(rollback_err) = connection.rollback() {
                    tracing::warn!(error = %rollback_err, "Rollback after failed insert also failed");
                }
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::records_to_table;
    use serde_json::json;
    use std::cell::RefCell;

    #[derive(Debug, Clone, PartialEq)]
    enum Event {
        Connect(String),
        Append { target: String, rows: usize },
        Commit,
        Rollback,
    }

    #[derive(Default)]
    struct RecordingConnector {
        events: RefCell<Vec<Event>>,
        fail_connect: bool,
        fail_append: bool,
    }

    struct RecordingConnection<'c> {
        connector: &'c RecordingConnector,
    }

    impl Connector for RecordingConnector {
        type Connection<'c> = RecordingConnection<'c>;

        fn connect(&self, connection_string: &str) -> Result<Self::Connection<'_>> {
            if self.fail_connect {
                return Err(StageError::Connection("login failed".to_string()));
            }
            self.events
                .borrow_mut()
                .push(Event::Connect(connection_string.to_string()));
            Ok(RecordingConnection { connector: self })
        }
    }

    impl StagingConnection for RecordingConnection<'_> {
        fn bulk_append(&mut self, target: &StageTarget, table: &Table) -> Result<u64> {
            if self.connector.fail_append {
                return Err(StageError::Insert {
                    target: target.to_string(),
                    message: "column count mismatch".to_string(),
                });
            }
            self.connector.events.borrow_mut().push(Event::Append {
                target: target.to_string(),
                rows: table.len(),
            });
            Ok(table.len() as u64)
        }

        fn commit(self) -> Result<()> {
            self.connector.events.borrow_mut().push(Event::Commit);
            Ok(())
        }

        fn rollback(self) -> Result<()> {
            self.connector.events.borrow_mut().push(Event::Rollback);
            Ok(())
        }
    }

    const CONN: &str = "DRIVER={ODBC Driver 17 for SQL Server};SERVER=db;DATABASE=etl;Trusted_Connection=yes;";

    #[test]
    fn test_export_appends_and_commits() {
        let exporter = Exporter::new(RecordingConnector::default(), CONN);
        let table = records_to_table(vec![json!({"id": 1}), json!({"id": 2})]);

        let report = exporter.export(&table, "Orders", "orders_2024.json").unwrap();
        assert_eq!(report.rows, 2);
        assert_eq!(report.target.to_string(), "Stage.Orders");
        assert_eq!(
            *exporter.connector.events.borrow(),
            vec![
                Event::Connect(CONN.to_string()),
                Event::Append {
                    target: "Stage.Orders".to_string(),
                    rows: 2
                },
                Event::Commit,
            ]
        );
    }

    #[test]
    fn test_export_empty_table_still_commits() {
        let exporter = Exporter::new(RecordingConnector::default(), CONN);

        let report = exporter.export(&Table::default(), "Orders", "empty.json").unwrap();
        assert_eq!(report.rows, 0);
        assert_eq!(
            *exporter.connector.events.borrow(),
            vec![Event::Connect(CONN.to_string()), Event::Commit]
        );
    }

    #[test]
    fn test_rows_without_columns_commit_without_append() {
        let exporter = Exporter::new(RecordingConnector::default(), CONN);
        let table = records_to_table(vec![json!({}), json!({})]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.num_columns(), 0);

        let report = exporter.export(&table, "Orders", "blank.json").unwrap();
        assert_eq!(report.rows, 0);
        assert_eq!(
            *exporter.connector.events.borrow(),
            vec![Event::Connect(CONN.to_string()), Event::Commit]
        );
    }

    #[test]
    fn test_failed_append_rolls_back() {
        let connector = RecordingConnector {
            fail_append: true,
            ..RecordingConnector::default()
        };
        let exporter = Exporter::new(connector, CONN).with_schema("Landing");
        let table = records_to_table(vec![json!({"id": 1})]);

        let err = exporter.export(&table, "Orders", "orders.json").unwrap_err();
        assert!(matches!(err, StageError::Insert { ref target, .. } if target == "Landing.Orders"));
        assert_eq!(
            *exporter.connector.events.borrow(),
            vec![Event::Connect(CONN.to_string()), Event::Rollback]
        );
    }

    #[test]
    fn test_connection_failure_propagates() {
        let connector = RecordingConnector {
            fail_connect: true,
            ..RecordingConnector::default()
        };
        let exporter = Exporter::new(connector, CONN);

        let err = exporter.export(&Table::default(), "Orders", "x.json").unwrap_err();
        assert!(matches!(err, StageError::Connection(_)));
        assert!(exporter.connector.events.borrow().is_empty());
    }

    #[test]
    fn test_invalid_table_name_never_connects() {
        let exporter = Exporter::new(RecordingConnector::default(), CONN);

        let err = exporter
            .export(&Table::default(), "Orders; DROP TABLE x", "x.json")
            .unwrap_err();
        assert!(matches!(err, StageError::InvalidIdentifier(_)));
        assert!(exporter.connector.events.borrow().is_empty());
    }

    #[test]
    fn test_insert_statement() {
        let target = StageTarget::new("Stage", "Orders").unwrap();
        let columns = vec!["id".to_string(), "address.city".to_string(), "odd]name".to_string()];

        assert_eq!(
            insert_statement(&target, &columns),
            "INSERT INTO [Stage].[Orders] ([id], [address.city], [odd]]name]) VALUES (?, ?, ?)"
        );
    }

    #[test]
    fn test_sql_text() {
        assert_eq!(sql_text(&Value::Null), None);
        assert_eq!(sql_text(&json!(true)).as_deref(), Some("1"));
        assert_eq!(sql_text(&json!(2.5)).as_deref(), Some("2.5"));
        assert_eq!(sql_text(&json!("x")).as_deref(), Some("x"));
        assert_eq!(sql_text(&json!([1, 2])).as_deref(), Some("[1,2]"));
    }
}
