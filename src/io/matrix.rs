//!
//! Observation matrices as delimited text
//!
//! One time step per record, features separated by a single-byte delimiter
//! (tab or comma). Fields are trimmed and may be quoted. Empty lines and lines
//! starting with `#` are skipped. A first record that does not parse as numbers
//! is taken as a header.
//!
use crate::error::{HmmError, Result};
use csv::{ReaderBuilder, Trim, WriterBuilder};
use ndarray::prelude::*;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

///
/// Observations read from a file with optional column names
///
#[derive(Clone, Debug, PartialEq)]
pub struct Observations {
    pub header: Option<Vec<String>>,
    /// `T x D`
    pub data: Array2<f64>,
}

///
/// Delimiter for a file name: `,` for `.csv`, tab otherwise (`.tsv`, `.txt`
/// and files written by `write_observations`).
///
pub fn delimiter_of<P: AsRef<Path>>(path: P) -> u8 {
    match path
        .as_ref()
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("csv") => b',',
        _ => b'\t',
    }
}

///
/// Parse observations from a reader with the given field delimiter
///
pub fn parse_observations<R: Read>(reader: R, delimiter: u8) -> Result<Observations> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .delimiter(delimiter)
        .trim(Trim::All)
        .comment(Some(b'#'))
        .from_reader(reader);

    let mut header = None;
    let mut values: Vec<f64> = Vec::new();
    let mut n_cols: Option<usize> = None;
    let mut n_rows = 0;

    for record in reader.records() {
        // unequal record lengths are reported here
        let record = record?;
        let parsed: std::result::Result<Vec<f64>, _> =
            record.iter().map(|s| s.parse::<f64>()).collect();
        let row = match parsed {
            Ok(row) => row,
            Err(_) if n_cols.is_none() && header.is_none() => {
                header = Some(record.iter().map(|s| s.to_string()).collect::<Vec<_>>());
                n_cols = Some(record.len());
                continue;
            }
            Err(e) => {
                let line = record.position().map_or(0, |p| p.line());
                return Err(HmmError::invalid(format!(
                    "line {}: cannot parse {:?} ({})",
                    line,
                    record.iter().collect::<Vec<_>>(),
                    e
                )));
            }
        };
        n_cols = Some(row.len());
        values.extend(row);
        n_rows += 1;
    }

    let data = Array2::from_shape_vec((n_rows, n_cols.unwrap_or(0)), values)
        .map_err(|e| HmmError::invalid(format!("malformed observation matrix: {}", e)))?;
    Ok(Observations { header, data })
}

///
/// Read observations from a file, with the delimiter chosen by `delimiter_of`
///
pub fn read_observations<P: AsRef<Path>>(path: P) -> Result<Observations> {
    let delimiter = delimiter_of(&path);
    let file = File::open(path)?;
    parse_observations(file, delimiter)
}

///
/// Write a matrix as tab-separated rows
///
pub fn write_observations<W: Write>(writer: W, xs: ArrayView2<f64>) -> Result<()> {
    let mut writer = WriterBuilder::new().delimiter(b'\t').from_writer(writer);
    for row in xs.outer_iter() {
        writer.write_record(row.iter().map(|x| x.to_string()))?;
    }
    writer.flush()?;
    Ok(())
}

///
/// Write one label per line
///
pub fn write_labels<W: Write>(mut writer: W, labels: &[usize]) -> Result<()> {
    for label in labels {
        writeln!(writer, "{}", label)?;
    }
    Ok(())
}
