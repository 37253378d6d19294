// src/fetch/pdf.rs

use anyhow::{bail, Context, Result};
use lopdf::Document;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use tracing::{debug, info, instrument};

use crate::table::{infer::table_from_strings, Table};

/// Cells in extracted PDF text are separated by tabs or wide gaps.
static CELL_GAP: Lazy<Regex> = Lazy::new(|| Regex::new(r"\t+|\s{2,}").expect("static regex"));

/// Read the table printed across every page of a PDF.
#[instrument(level = "info", skip(path), fields(path = %path.as_ref().display()))]
pub fn retrieve_pdf_data(path: impl AsRef<Path>) -> Result<Table> {
    let path = path.as_ref();
    let document =
        Document::load(path).with_context(|| format!("loading PDF {}", path.display()))?;

    let mut pages = Vec::new();
    for page_number in document.get_pages().keys() {
        let text = document
            .extract_text(&[*page_number])
            .with_context(|| format!("extracting text from page {}", page_number))?;
        pages.push(text);
    }
    info!(pages = pages.len(), "extracted PDF text");

    table_from_pages(&pages)
}

fn split_cells(line: &str) -> Vec<String> {
    CELL_GAP
        .split(line.trim())
        .map(|c| c.trim().to_string())
        .collect()
}

/// Build one table from page texts, in page order. The first non-empty line
/// is the header; the header repeated at the top of later pages is skipped.
pub fn table_from_pages(pages: &[String]) -> Result<Table> {
    let mut lines = pages
        .iter()
        .flat_map(|p| p.lines())
        .map(str::trim)
        .filter(|l| !l.is_empty());

    let header_line = match lines.next() {
        Some(l) => l,
        None => bail!("PDF contains no text"),
    };
    let headers = split_cells(header_line);

    let mut rows = Vec::new();
    for line in lines {
        let cells = split_cells(line);
        if cells == headers {
            debug!("skipping repeated header");
            continue;
        }
        rows.push(cells);
    }

    table_from_strings(&headers, rows)
}
