use crate::constants::{PLAYER_COLUMN, SOURCE_COLUMN};
use crate::error::{Result, ScraperError};
use crate::files::write_atomic;
use crate::types::{ExportFormat, PlayerRecord};
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

/// Accumulates parsed records and serializes them on demand
#[derive(Debug)]
pub struct Exporter {
    fields: Vec<String>,
    records: Vec<PlayerRecord>,
}

impl Exporter {
    /// `fields` is the configured field order; it alone decides the CSV columns.
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
            records: Vec::new(),
        }
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn push(&mut self, record: PlayerRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[PlayerRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[instrument(skip(self), fields(records = self.records.len()))]
    pub fn export(&self, path: &Path, format: ExportFormat) -> Result<()> {
        write_atomic(path, |w| match format {
            ExportFormat::Csv => write_csv(&self.fields, &self.records, w),
            ExportFormat::Json => write_json(&self.records, w),
        })?;
        info!("Wrote {} records to {}", self.records.len(), path.display());
        Ok(())
    }
}

/// Picks the output path and format: an explicit format wins, then the
/// extension of an explicit path, then CSV. Without a path the file goes to
/// `output_dir/players_<timestamp>.<ext>`.
pub fn resolve_output(
    format: Option<ExportFormat>,
    output: Option<PathBuf>,
    output_dir: &str,
    timestamp: &str,
) -> (PathBuf, ExportFormat) {
    let format = format
        .or_else(|| output.as_deref().and_then(ExportFormat::from_path))
        .unwrap_or(ExportFormat::Csv);
    let path = output.unwrap_or_else(|| {
        Path::new(output_dir).join(format!("players_{timestamp}.{}", format.extension()))
    });
    (path, format)
}

/// Column order: `player`, the configured fields, `source`. Record contents
/// never change the header.
pub fn csv_columns(fields: &[String]) -> Vec<String> {
    let mut columns = Vec::with_capacity(fields.len() + 2);
    columns.push(PLAYER_COLUMN.to_string());
    columns.extend(fields.iter().cloned());
    columns.push(SOURCE_COLUMN.to_string());
    columns
}

/// Values for fields outside `fields` are not written.
pub fn write_csv<W: Write>(fields: &[String], records: &[PlayerRecord], writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(csv_columns(fields))?;

    for record in records {
        let mut row = Vec::with_capacity(fields.len() + 2);
        row.push(record.player.clone());
        for name in fields {
            row.push(record.get(name).map(|v| v.to_string()).unwrap_or_default());
        }
        row.push(record.source.clone());
        csv_writer.write_record(&row)?;
    }

    csv_writer.flush()?;
    Ok(())
}

pub fn write_json<W: Write>(records: &[PlayerRecord], mut writer: W) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, records)?;
    writer.write_all(b"\n")?;
    Ok(())
}

/// Reads back a file produced by a JSON export.
pub fn load_json(path: &Path) -> Result<Vec<PlayerRecord>> {
    let file = File::open(path)?;
    serde_json::from_reader(BufReader::new(file)).map_err(ScraperError::from)
}
