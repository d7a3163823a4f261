//! Whole-file reads.

use std::io::ErrorKind;
use std::path::Path;

use ntd_codec::decode_with;
use ntd_core::config::DecodeConfig;
use ntd_core::{Error, Record, Result};
use tracing::{debug, warn};

use crate::layout::ArchiveFile;

/// Read a file fully into memory.
///
/// A missing file is reported as [`Error::SourceNotFound`].
pub fn read_source(path: impl AsRef<Path>) -> Result<Vec<u8>> {
    let path = path.as_ref();
    match std::fs::read(path) {
        Ok(bytes) => {
            debug!(path = %path.display(), bytes = bytes.len(), "source read");
            Ok(bytes)
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            warn!(path = %path.display(), "source not found");
            Err(Error::source_not_found(path))
        }
        Err(e) => Err(e.into()),
    }
}

/// Read and decode an archive file with default settings.
pub fn decode_file(file: &ArchiveFile) -> Result<Vec<Record>> {
    decode_file_with(file, DecodeConfig::default())
}

/// Read and decode an archive file; the first decode error is returned.
pub fn decode_file_with(file: &ArchiveFile, config: DecodeConfig) -> Result<Vec<Record>> {
    let bytes = read_source(&file.path)?;
    let records = decode_with(file.format, &bytes, config)?.collect::<Result<Vec<_>>>()?;
    debug!(
        instrument = %file.instrument,
        date = %file.date,
        format = %file.format,
        records = records.len(),
        "archive file decoded"
    );
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use ntd_codec::test_utils::{NcdFileBuilder, NtdFileBuilder};
    use ntd_codec::Format;
    use tempfile::TempDir;

    fn archive_file(path: std::path::PathBuf, format: Format) -> ArchiveFile {
        ArchiveFile {
            instrument: "ES".to_string(),
            date: NaiveDate::from_ymd_opt(2020, 6, 15).unwrap(),
            format,
            path,
        }
    }

    #[test]
    fn test_missing_source() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("20200615.ncd");
        let err = read_source(&path).unwrap_err();
        assert!(matches!(err, Error::SourceNotFound { path: p } if p == path));
        assert!(!Error::source_not_found("x").is_corrupt_input());
    }

    #[test]
    fn test_decode_ntd_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("20090301.ntd");
        let bytes = NtdFileBuilder::new(0.01, 25.37, 633_979_008_000_000_000, 10)
            .record(0b0001_0001, &[30, 9])
            .build();
        std::fs::write(&path, bytes).unwrap();

        let records = decode_file(&archive_file(path, Format::NtdTick)).unwrap();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.as_tick().is_some()));
    }

    #[test]
    fn test_decode_error_is_returned() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("20200615.ncd");
        let bytes = NcdFileBuilder::new(0.25, 100.0, 637_284_708_000_000_000)
            .record(0x00, 0b0010_0000, &[1])
            .record(0x00, 0x00, &[])
            .build();
        std::fs::write(&path, bytes).unwrap();

        let err = decode_file(&archive_file(path, Format::NcdTick)).unwrap_err();
        assert!(matches!(err, Error::UnrecognizedFlag { field: "volume", .. }));
    }
}
