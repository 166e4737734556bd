//! Document parsing and text extraction.

use std::fs;
use std::path::Path;
use strictqa_core::{AppError, AppResult};

/// Supported document kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Markdown,
    PlainText,
    Csv,
}

impl ContentType {
    /// Detect content type from file extension. `None` for unsupported files.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "md" | "markdown" => Some(Self::Markdown),
            "txt" => Some(Self::PlainText),
            "csv" => Some(Self::Csv),
            _ => None,
        }
    }

    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Markdown => "markdown",
            Self::PlainText => "text",
            Self::Csv => "csv",
        }
    }
}

/// Parse a document and extract clean text.
pub fn parse_file(path: &Path) -> AppResult<String> {
    let content_type = ContentType::from_path(path)
        .ok_or_else(|| AppError::Knowledge(format!("Unsupported document type: {:?}", path)))?;

    let raw = fs::read_to_string(path)
        .map_err(|e| AppError::Knowledge(format!("Failed to read {:?}: {}", path, e)))?;

    let cleaned = match content_type {
        ContentType::Markdown => clean_markdown(&raw),
        ContentType::PlainText => raw.trim().to_string(),
        ContentType::Csv => table_to_text(&raw)?,
    };

    Ok(cleaned)
}

/// Clean markdown by removing header marks and fences.
fn clean_markdown(text: &str) -> String {
    let mut result = String::with_capacity(text.len());

    for line in text.lines() {
        let trimmed = line.trim_start_matches('#').trim();

        if trimmed.starts_with("---") || trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            continue;
        }

        if !trimmed.is_empty() {
            result.push_str(trimmed);
            result.push('\n');
        }
    }

    result.trim().to_string()
}

/// Flatten a CSV table so every row carries its column names.
///
/// Output: a `Columns:` line, then one `Row N: col: value | col: value` line
/// per row. Empty cells are left out and rows with no values are skipped.
fn table_to_text(raw: &str) -> AppResult<String> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(raw.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| AppError::Knowledge(format!("Failed to read CSV header: {}", e)))?
        .clone();

    let mut out = format!(
        "Columns: {}\n\n",
        headers.iter().collect::<Vec<_>>().join(", ")
    );

    for (index, record) in reader.records().enumerate() {
        let record =
            record.map_err(|e| AppError::Knowledge(format!("Failed to read CSV row: {}", e)))?;

        let cells: Vec<String> = headers
            .iter()
            .zip(record.iter())
            .filter(|(_, value)| !value.is_empty())
            .map(|(column, value)| format!("{}: {}", column, value))
            .collect();

        if !cells.is_empty() {
            out.push_str(&format!("Row {}: {}\n", index + 1, cells.join(" | ")));
        }
    }

    Ok(out.trim_end().to_string())
}
