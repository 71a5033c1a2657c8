//! CSV file standing in for the expense spreadsheet.

use std::fs::{self, File, OpenOptions};
use std::path::Path;

use rcpt_core::error::ReceiptError;
use rcpt_core::sink::EXPENSE_COLUMNS;
use rcpt_core::RowSink;

/// Appends expense rows to a CSV file, writing the header to new files.
pub struct CsvSink {
    writer: csv::Writer<File>,
}

impl CsvSink {
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let has_content = path.exists() && fs::metadata(path)?.len() > 0;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        if !has_content {
            writer.write_record(EXPENSE_COLUMNS)?;
            writer.flush()?;
        }

        Ok(Self { writer })
    }
}

impl RowSink for CsvSink {
    fn append(&mut self, columns: &[String]) -> rcpt_core::Result<()> {
        self.writer
            .write_record(columns)
            .map_err(|e| ReceiptError::Sink(e.to_string()))?;
        self.writer.flush()?;
        Ok(())
    }
}
