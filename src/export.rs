use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::document::Document;

/// One CSV line per document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableRow {
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub text: String,
    pub web_link: String,
    pub local_link: String,
    pub other_data: String,
    pub pub_date: String,
    pub load_date: String,
}

impl From<&Document> for TableRow {
    fn from(doc: &Document) -> Self {
        Self {
            title: doc.title.clone(),
            abstract_text: doc.abstract_text.clone().unwrap_or_default(),
            text: doc.text.clone().unwrap_or_default(),
            web_link: doc.web_link.clone(),
            local_link: doc.local_link.clone().unwrap_or_default(),
            other_data: String::new(),
            pub_date: timestamp_string(doc.pub_date),
            load_date: timestamp_string(doc.load_date),
        }
    }
}

/// Unix seconds as a float string (`1710374400.0`); empty when unset.
pub fn timestamp_string(ts: Option<DateTime<Utc>>) -> String {
    let Some(ts) = ts else {
        return String::new();
    };
    let micros = ts.timestamp_subsec_micros();
    if micros == 0 {
        format!("{}.0", ts.timestamp())
    } else {
        let frac = format!("{:06}", micros);
        format!("{}.{}", ts.timestamp(), frac.trim_end_matches('0'))
    }
}

fn create_parent(path: &Path) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    Ok(())
}

/// Write the whole document list as pretty JSON.
pub fn write_archive(path: &Path, docs: &[Document]) -> Result<()> {
    create_parent(path)?;
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), docs)
        .with_context(|| format!("Failed to write archive {}", path.display()))?;
    Ok(())
}

pub fn read_archive(path: &Path) -> Result<Vec<Document>> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    serde_json::from_reader(std::io::BufReader::new(file))
        .with_context(|| format!("Failed to parse archive {}", path.display()))
}

/// Write the flattened table as CSV with a header row.
pub fn write_table(path: &Path, docs: &[Document]) -> Result<()> {
    create_parent(path)?;
    let mut writer = csv::WriterBuilder::new()
        .from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    if docs.is_empty() {
        writer.write_record([
            "title", "abstract", "text", "web_link", "local_link", "other_data", "pub_date",
            "load_date",
        ])?;
    }
    for doc in docs {
        writer.serialize(TableRow::from(doc))?;
    }
    writer.flush()?;
    Ok(())
}

/// Outcome of [`write_all`]; each target succeeds or fails on its own.
#[derive(Debug)]
pub struct ExportReport {
    pub archive: Result<()>,
    pub table: Result<()>,
}

/// Write the archive, then the table. A failed archive does not stop the table.
pub fn write_all(archive: &Path, table: &Path, docs: &[Document]) -> ExportReport {
    ExportReport {
        archive: write_archive(archive, docs),
        table: write_table(table, docs),
    }
}
