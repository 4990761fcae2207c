use crate::types::Table;
use anyhow::{Context, Result};
use serde_json::{Map, Value};
use std::io::Write;

/// Writes table rows as JSON Lines, one object per row in column order
pub struct RowWriter<W: Write> {
    writer: W,
}

impl<W: Write> RowWriter<W> {
    pub fn new(writer: W) -> Self {
        RowWriter { writer }
    }

    pub fn write_table(&mut self, table: &Table) -> Result<()> {
        for row in table.rows() {
            let data: Map<String, Value> = table
                .columns()
                .iter()
                .cloned()
                .zip(row.iter().cloned())
                .collect();

            let json = serde_json::to_string(&data)
                .context("Failed to serialize row")?;
            writeln!(self.writer, "{}", json)
                .context("Failed to write row")?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush().context("Failed to flush writer")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::records_to_table;
    use serde_json::json;

    #[test]
    fn test_rows_keep_column_order() {
        let mut buffer = Vec::new();
        let mut writer = RowWriter::new(&mut buffer);

        let table = records_to_table(vec![
            json!({"name": "Alice", "id": 1}),
            json!({"id": 2}),
        ]);

        writer.write_table(&table).unwrap();
        writer.flush().unwrap();

        let output = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines[0], r#"{"name":"Alice","id":1}"#);
        assert_eq!(lines[1], r#"{"name":null,"id":2}"#);
    }
}
