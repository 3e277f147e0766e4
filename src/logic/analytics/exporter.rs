//! Analytics Exporter
//!
//! Writes recorded events to files for offline analysis.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use super::error::AnalyticsResult;
use super::event::AnalyticsEvent;
use super::recorder::AnalyticsExport;

// ============================================================================
// EXPORT FORMATS
// ============================================================================

/// Supported export formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// One JSON object per line
    Jsonl,
    /// CSV for spreadsheet analysis
    Csv,
    /// Pretty JSON array
    JsonArray,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Jsonl => "jsonl",
            ExportFormat::Csv => "csv",
            ExportFormat::JsonArray => "json",
        }
    }

    /// Guess from a file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "jsonl" => Some(ExportFormat::Jsonl),
            "csv" => Some(ExportFormat::Csv),
            "json" => Some(ExportFormat::JsonArray),
            _ => None,
        }
    }
}

// ============================================================================
// EXPORT FUNCTIONS
// ============================================================================

/// Write `events` to `destination`, returning how many were written
pub fn export_events(
    events: &[AnalyticsEvent],
    destination: &Path,
    format: ExportFormat,
) -> AnalyticsResult<usize> {
    let mut file = BufWriter::new(File::create(destination)?);

    match format {
        ExportFormat::Jsonl => {
            for event in events {
                writeln!(file, "{}", serde_json::to_string(event)?)?;
            }
        }
        ExportFormat::JsonArray => {
            serde_json::to_writer_pretty(&mut file, events)?;
        }
        ExportFormat::Csv => {
            export_csv(&mut file, events)?;
        }
    }

    file.flush()?;
    log::info!("Exported {} analytics events to {:?}", events.len(), destination);
    Ok(events.len())
}

/// Write the whole `export_all` bundle as pretty JSON
pub fn export_bundle(bundle: &AnalyticsExport, destination: &Path) -> AnalyticsResult<()> {
    let mut file = BufWriter::new(File::create(destination)?);
    serde_json::to_writer_pretty(&mut file, bundle)?;
    file.flush()?;
    Ok(())
}

fn csv_field(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

fn export_csv<W: Write>(out: &mut W, events: &[AnalyticsEvent]) -> AnalyticsResult<()> {
    writeln!(out, "id,timestamp,session_id,name,url,properties")?;

    for event in events {
        let url = event
            .property("url")
            .and_then(|v| v.as_str())
            .unwrap_or("");
        let properties = serde_json::to_string(&event.properties)?;

        writeln!(
            out,
            "{},{},{},{},{},{}",
            csv_field(&event.id),
            event.timestamp,
            csv_field(&event.session_id),
            csv_field(&event.name),
            csv_field(url),
            csv_field(&properties)
        )?;
    }

    Ok(())
}
