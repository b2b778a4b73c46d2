// src/process/mod.rs
pub mod cache;
pub mod convert;
pub mod date_parser;
pub mod filter;
pub mod header;
pub mod prune;
pub mod raw_table;
pub mod subset;
pub mod utils;

pub use raw_table::RawGrid;

use crate::error::{PipelineError, Result};
use crate::table::RecordTable;
use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, File},
    io::{self, Cursor, Read},
    path::Path,
};
use tracing::{debug, info};
use zip::ZipArchive;

/// Read `path` into a [`RawGrid`].
///
/// A `.zip` path is opened as an archive and its first `.csv` entry is read;
/// anything else is parsed as CSV directly. There is no header row: rows 0
/// and 1 are kept as data for the header fuser.
#[tracing::instrument(level = "info", skip(path), fields(path = %path.as_ref().display()))]
pub fn load_raw_grid<P: AsRef<Path>>(path: P) -> Result<RawGrid> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(PipelineError::Io(io::Error::new(
            io::ErrorKind::NotFound,
            format!("CSV file not found: {}", path.display()),
        )));
    }

    let is_zip = path
        .extension()
        .and_then(|s| s.to_str())
        .map_or(false, |ext| ext.eq_ignore_ascii_case("zip"));
    let data = if is_zip {
        read_first_csv_entry(path)?
    } else {
        fs::read(path)?
    };

    let grid = parse_grid(Cursor::new(data))?;
    if grid.num_rows() == 0 {
        return Err(PipelineError::structural(format!(
            "the CSV file {} is empty",
            path.display()
        )));
    }
    info!(
        rows = grid.num_rows(),
        columns = grid.num_columns(),
        "loaded source grid"
    );
    Ok(grid)
}

fn read_first_csv_entry(zip_path: &Path) -> Result<Vec<u8>> {
    let file = File::open(zip_path)?;
    let mut archive = ZipArchive::new(file)?;
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let name = entry.name().to_string();
        if entry.is_file() && name.to_lowercase().ends_with(".csv") {
            debug!(entry = %name, "reading CSV entry from archive");
            let mut buf = Vec::with_capacity(entry.size() as usize);
            entry.read_to_end(&mut buf)?;
            return Ok(buf);
        }
    }
    Err(PipelineError::structural(format!(
        "no .csv entry in archive {}",
        zip_path.display()
    )))
}

/// Parse delimited text with no header row and flexible record widths.
/// Fields are decoded lossily so stray non-UTF-8 bytes do not abort the load.
pub fn parse_grid<R: Read>(reader: R) -> Result<RawGrid> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut rows = Vec::new();
    for result in rdr.byte_records() {
        let record = result?;
        let row: Vec<Option<String>> = record
            .iter()
            .map(|field| utils::to_cell(&String::from_utf8_lossy(field)))
            .collect();
        rows.push(row);
    }
    Ok(RawGrid::new(rows))
}

/// What preprocessing removed or could not parse.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreprocessReport {
    pub empty_columns: Vec<String>,
    pub minimal_data_columns: Vec<String>,
    pub unparseable_dates: usize,
}

/// Header fusion, both pruning passes, and date normalization, in that order.
#[tracing::instrument(level = "info", skip(grid))]
pub fn preprocess(
    grid: &RawGrid,
    minimal_data_threshold: usize,
    date_column: &str,
) -> Result<(RecordTable, PreprocessReport)> {
    let table = header::fuse_headers(grid)?;
    let (table, empty_columns) = prune::delete_empty_columns(&table)?;
    let (table, minimal_data_columns) =
        prune::delete_minimal_data_columns(&table, minimal_data_threshold)?;
    let (table, unparseable_dates) = convert::normalize_dates(&table, date_column)?;

    info!(
        rows = table.num_rows(),
        columns = table.num_columns(),
        "preprocessed source table"
    );
    Ok((
        table,
        PreprocessReport {
            empty_columns,
            minimal_data_columns,
            unparseable_dates,
        },
    ))
}
