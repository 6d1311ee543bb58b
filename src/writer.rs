use crate::engine::{ExportView, QueryResult};
use crate::types::FlatRow;
use anyhow::{Context, Result};
use std::io::Write;

/// Writes flat rows as JSON Lines, one object per row
pub struct RowWriter<W: Write> {
    writer: W,
    include_row_numbers: bool,
}

impl<W: Write> RowWriter<W> {
    pub fn new(writer: W) -> Self {
        RowWriter {
            writer,
            include_row_numbers: false,
        }
    }

    /// Prefix each object with a 1-based `_row` field
    pub fn with_row_numbers(mut self, enabled: bool) -> Self {
        self.include_row_numbers = enabled;
        self
    }

    pub fn write_rows<'a, I>(&mut self, rows: I, first_row: usize) -> Result<usize>
    where
        I: IntoIterator<Item = &'a FlatRow>,
    {
        let mut written = 0;
        for (offset, row) in rows.into_iter().enumerate() {
            let mut data = serde_json::Map::new();
            if self.include_row_numbers {
                data.insert("_row".to_string(), serde_json::Value::from(first_row + offset));
            }
            data.extend(row.to_json());

            let json = serde_json::to_string(&data)
                .context("Failed to serialize row")?;
            writeln!(self.writer, "{}", json)
                .context("Failed to write row")?;
            written += 1;
        }
        Ok(written)
    }

    pub fn write_page(&mut self, page: &QueryResult) -> Result<usize> {
        self.write_rows(&page.rows, page.start_row.max(1))
    }

    pub fn write_export(&mut self, export: &ExportView) -> Result<usize> {
        self.write_rows(&export.rows, 1)
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush().context("Failed to flush writer")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Engine;
    use crate::query::{FilterState, PaginationState, SortState};
    use serde_json::json;

    #[test]
    fn test_write_page() {
        let engine = Engine::default();
        engine
            .load(&json!([{"id": 1, "name": "Alice"}, {"id": 2, "name": "Bob"}]), None)
            .unwrap();
        let page =
            engine.query(&FilterState::new(), &SortState::none(), &PaginationState::new(2, 1));

        let mut buffer = Vec::new();
        let written = RowWriter::new(&mut buffer)
            .with_row_numbers(true)
            .write_page(&page)
            .unwrap();

        let output = String::from_utf8(buffer).unwrap();
        assert_eq!(written, 1);
        assert_eq!(output, "{\"_row\":2,\"id\":2,\"name\":\"Bob\"}\n");
    }
}
