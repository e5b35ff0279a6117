//! Persist a fetched series in the layout `load_historical` reads.

use std::fs::create_dir_all;
use std::io::{BufWriter, Write};
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::info;

use crate::domain::SeriesDataset;
use crate::error::{AppError, ErrorKind};

/// Write `date,value` rows (ascending), creating parent directories as needed.
///
/// The previous file stays in place until the new one is completely written.
pub fn write_historical_csv(path: &Path, dataset: &SeriesDataset) -> Result<(), AppError> {
    replace_file(path, |out| {
        writeln!(out, "date,value")?;
        for obs in dataset.iter() {
            writeln!(out, "{},{}", obs.date.format("%Y-%m-%d"), obs.value)?;
        }
        Ok(())
    })?;

    info!(path = %path.display(), n = dataset.len(), "wrote historical series");
    Ok(())
}

/// Write into a temp file next to `path` and rename it over `path` on success.
///
/// On any error the temp file is removed and `path` is left untouched.
fn replace_file<F>(path: &Path, write: F) -> Result<(), AppError>
where
    F: FnOnce(&mut dyn Write) -> std::io::Result<()>,
{
    let io_err = |what: &str, e: std::io::Error| {
        AppError::new(ErrorKind::Io, format!("Failed to {what} '{}': {e}", path.display()))
    };

    let dir = match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => {
            create_dir_all(parent).map_err(|e| io_err("create directory for", e))?;
            parent
        }
        None => Path::new("."),
    };

    let tmp = NamedTempFile::new_in(dir).map_err(|e| io_err("create temp file for", e))?;
    let mut out = BufWriter::new(tmp);
    write(&mut out).map_err(|e| io_err("write", e))?;
    let tmp = out
        .into_inner()
        .map_err(|e| io_err("flush", e.into_error()))?;
    tmp.as_file().sync_all().map_err(|e| io_err("sync", e))?;
    tmp.persist(path).map_err(|e| io_err("replace", e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::io;

    use chrono::NaiveDate;
    use tempfile::TempDir;

    use super::*;
    use crate::domain::Observation;
    use crate::io::ingest::load_historical;

    fn sample() -> SeriesDataset {
        SeriesDataset::from_observations(vec![
            Observation {
                date: NaiveDate::from_ymd_opt(2020, 2, 1).unwrap(),
                value: 4.4,
            },
            Observation {
                date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
                value: 3.5,
            },
        ])
        .unwrap()
    }

    #[test]
    fn written_file_loads_back_identically() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/processed/unemployment_rate.csv");
        let ds = sample();

        write_historical_csv(&path, &ds).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text, "date,value\n2020-01-01,3.5\n2020-02-01,4.4\n");
        assert_eq!(load_historical(&path).unwrap(), ds);
    }

    #[test]
    fn rewrite_replaces_previous_contents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("unemployment_rate.csv");
        fs::write(&path, "date,value\n1999-01-01,4.3\n1999-02-01,4.4\n1999-03-01,4.2\n").unwrap();

        write_historical_csv(&path, &sample()).unwrap();
        assert_eq!(load_historical(&path).unwrap(), sample());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn failed_write_keeps_previous_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("unemployment_rate.csv");
        let previous = "date,value\n2020-01-01,3.5\n2020-02-01,4.4\n";
        fs::write(&path, previous).unwrap();

        let err = replace_file(&path, |out| {
            writeln!(out, "date,value")?;
            writeln!(out, "2021-01-01,6.0")?;
            Err(io::Error::new(io::ErrorKind::StorageFull, "disk full"))
        })
        .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(err.to_string().contains("disk full"), "{err}");
        assert_eq!(fs::read_to_string(&path).unwrap(), previous);
        // No stray temp file left beside the target.
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
