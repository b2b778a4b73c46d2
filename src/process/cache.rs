use crate::error::{PipelineError, Result};
use crate::process::PreprocessReport;
use crate::table::RecordTable;
use arrow::compute::concat_batches;
use parquet::{
    arrow::{arrow_reader::ParquetRecordBatchReaderBuilder, ArrowWriter},
    basic::Compression,
    file::properties::WriterProperties,
};
use sha2::{Digest, Sha256};
use std::{
    fs::{self, File},
    path::{Path, PathBuf},
    time::UNIX_EPOCH,
};
use tracing::{debug, info, warn};

/// Preprocessing settings a snapshot was built with. A snapshot only serves
/// loads that use the same settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SnapshotParams<'a> {
    pub minimal_data_threshold: usize,
    pub date_column: &'a str,
}

/// Parquet snapshots of the preprocessed source table.
///
/// A snapshot is keyed by the source file name, its modification time, and a
/// digest of the canonical source path plus the preprocessing settings, so
/// replacing the source or changing the settings invalidates it without any
/// bookkeeping.
pub struct SnapshotCache {
    cache_dir: PathBuf,
}

impl SnapshotCache {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Result<Self> {
        let cache_dir = cache_dir.into();
        fs::create_dir_all(&cache_dir)?;
        Ok(Self { cache_dir })
    }

    /// `<stem>---<mtime secs>---<digest prefix>`
    pub(crate) fn key_for(source: &Path, params: &SnapshotParams<'_>) -> Result<String> {
        let modified = fs::metadata(source)?.modified()?;
        let secs = modified
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let stem = source
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("source");

        let canonical = fs::canonicalize(source)?;
        let mut hasher = Sha256::new();
        hasher.update(canonical.to_string_lossy().as_bytes());
        hasher.update([0u8]);
        hasher.update(params.minimal_data_threshold.to_le_bytes());
        hasher.update(params.date_column.as_bytes());
        let digest = format!("{:x}", hasher.finalize());

        Ok(format!("{}---{}---{}", stem, secs, &digest[..16]))
    }

    fn paths(&self, key: &str) -> (PathBuf, PathBuf) {
        (
            self.cache_dir.join(format!("{}.parquet", key)),
            self.cache_dir.join(format!("{}.report.json", key)),
        )
    }

    /// Load the snapshot for `source` built with `params`, if one matches its
    /// current mtime. A corrupt snapshot is logged and treated as absent.
    pub fn load(
        &self,
        source: &Path,
        params: &SnapshotParams<'_>,
    ) -> Result<Option<(RecordTable, PreprocessReport)>> {
        let key = Self::key_for(source, params)?;
        let (table_path, report_path) = self.paths(&key);
        if !table_path.is_file() || !report_path.is_file() {
            debug!(key = %key, "no snapshot");
            return Ok(None);
        }
        match read_snapshot(&table_path, &report_path) {
            Ok(found) => {
                info!(path = %table_path.display(), rows = found.0.num_rows(), "loaded snapshot");
                Ok(Some(found))
            }
            Err(e) => {
                warn!(path = %table_path.display(), error = %e, "ignoring unreadable snapshot");
                Ok(None)
            }
        }
    }

    /// Write the snapshot for `source` built with `params`, replacing any
    /// previous one with the same key.
    pub fn store(
        &self,
        source: &Path,
        params: &SnapshotParams<'_>,
        table: &RecordTable,
        report: &PreprocessReport,
    ) -> Result<PathBuf> {
        let key = Self::key_for(source, params)?;
        let (table_path, report_path) = self.paths(&key);

        let file = File::create(&table_path)?;
        let props = WriterProperties::builder()
            .set_compression(Compression::SNAPPY)
            .build();
        let mut writer = ArrowWriter::try_new(file, table.batch().schema(), Some(props))?;
        writer.write(table.batch())?;
        writer.close()?;

        fs::write(&report_path, serde_json::to_vec_pretty(report)?)?;
        info!(path = %table_path.display(), rows = table.num_rows(), "wrote snapshot");
        Ok(table_path)
    }
}

fn read_snapshot(table_path: &Path, report_path: &Path) -> Result<(RecordTable, PreprocessReport)> {
    let file = File::open(table_path)?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    let schema = builder.schema().clone();
    let reader = builder.build()?;
    let batches = reader.collect::<std::result::Result<Vec<_>, _>>()?;
    let batch = concat_batches(&schema, &batches)?;
    let report: PreprocessReport = serde_json::from_slice(&fs::read(report_path)?)
        .map_err(|e| PipelineError::structural(format!("bad snapshot report: {}", e)))?;
    Ok((RecordTable::from_batch(batch), report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::{parse_grid, preprocess};
    use anyhow::Result;
    use std::io::{Cursor, Write};
    use std::time::{Duration, SystemTime};
    use tempfile::tempdir;

    const SAMPLE: &str = "\
,Time,Place.1
ACN,Date,State Reference
1,201801,CA
2,bad,TX
";

    const DEFAULTS: SnapshotParams<'static> = SnapshotParams {
        minimal_data_threshold: 0,
        date_column: "Date [Time]",
    };

    fn write_source(path: &Path) -> Result<()> {
        File::create(path)?.write_all(SAMPLE.as_bytes())?;
        Ok(())
    }

    fn preprocessed() -> Result<(RecordTable, PreprocessReport)> {
        let grid = parse_grid(Cursor::new(SAMPLE))?;
        Ok(preprocess(&grid, 0, "Date [Time]")?)
    }

    #[test]
    fn snapshot_round_trip() -> Result<()> {
        let dir = tempdir()?;
        let source = dir.path().join("extract.csv");
        write_source(&source)?;
        let (table, report) = preprocessed()?;

        let cache = SnapshotCache::new(dir.path().join("cache"))?;
        assert!(cache.load(&source, &DEFAULTS)?.is_none());
        cache.store(&source, &DEFAULTS, &table, &report)?;

        let (loaded, loaded_report) = cache.load(&source, &DEFAULTS)?.expect("snapshot present");
        assert_eq!(loaded.labels(), table.labels());
        assert_eq!(loaded.batch().columns(), table.batch().columns());
        assert_eq!(loaded_report, report);
        Ok(())
    }

    #[test]
    fn different_settings_miss() -> Result<()> {
        let dir = tempdir()?;
        let source = dir.path().join("extract.csv");
        write_source(&source)?;
        let (table, report) = preprocessed()?;

        let cache = SnapshotCache::new(dir.path().join("cache"))?;
        cache.store(&source, &DEFAULTS, &table, &report)?;

        let stricter = SnapshotParams {
            minimal_data_threshold: 1,
            ..DEFAULTS
        };
        assert!(cache.load(&source, &stricter)?.is_none());
        let other_date = SnapshotParams {
            date_column: "Event Date [Time]",
            ..DEFAULTS
        };
        assert!(cache.load(&source, &other_date)?.is_none());
        assert!(cache.load(&source, &DEFAULTS)?.is_some());
        Ok(())
    }

    #[test]
    fn new_mtime_invalidates() -> Result<()> {
        let dir = tempdir()?;
        let source = dir.path().join("extract.csv");
        write_source(&source)?;
        let (table, report) = preprocessed()?;

        let cache = SnapshotCache::new(dir.path().join("cache"))?;
        cache.store(&source, &DEFAULTS, &table, &report)?;

        let later = SystemTime::now() + Duration::from_secs(3600);
        File::options().write(true).open(&source)?.set_modified(later)?;
        assert!(cache.load(&source, &DEFAULTS)?.is_none());
        Ok(())
    }

    #[test]
    fn same_name_in_other_directory_misses() -> Result<()> {
        let dir = tempdir()?;
        let (a, b) = (dir.path().join("a"), dir.path().join("b"));
        fs::create_dir_all(&a)?;
        fs::create_dir_all(&b)?;
        let first = a.join("extract.csv");
        let second = b.join("extract.csv");
        write_source(&first)?;
        write_source(&second)?;
        let stamp = SystemTime::now();
        File::options().write(true).open(&first)?.set_modified(stamp)?;
        File::options().write(true).open(&second)?.set_modified(stamp)?;
        let (table, report) = preprocessed()?;

        let cache = SnapshotCache::new(dir.path().join("cache"))?;
        cache.store(&first, &DEFAULTS, &table, &report)?;
        assert!(cache.load(&second, &DEFAULTS)?.is_none());
        Ok(())
    }
}
