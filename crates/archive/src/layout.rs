//! Archive directory layout and dated-file enumeration.
//!
//! ```text
//! {root}/tick/{instrument}/20200615.ncd     NCD ticks
//! {root}/tick/{instrument}/20090301.ntd     legacy ticks
//! {root}/minute/{instrument}/20200615.ncd   NCD minute bars
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use ntd_codec::Format;
use ntd_core::config::{ArchiveConfig, DecodeConfig};
use ntd_core::{Config, Record, Result};
use tracing::{debug, warn};

use crate::source::decode_file_with;

/// Path scheme of an archive, built from [`ArchiveConfig`].
#[derive(Debug, Clone)]
pub struct ArchiveLayout {
    config: ArchiveConfig,
}

impl ArchiveLayout {
    pub fn new(config: ArchiveConfig) -> Self {
        Self { config }
    }

    pub fn root(&self) -> &Path {
        &self.config.root
    }

    /// Sub-directory holding files of `format`.
    pub fn format_dir(&self, format: Format) -> &str {
        match format {
            Format::NcdTick | Format::NtdTick => &self.config.tick_dir,
            Format::NcdMinute => &self.config.minute_dir,
        }
    }

    /// File extension of `format`, without the dot.
    pub fn extension(&self, format: Format) -> &str {
        match format {
            Format::NcdTick | Format::NcdMinute => &self.config.ncd_extension,
            Format::NtdTick => &self.config.ntd_extension,
        }
    }

    /// Directory holding one instrument's files of `format`.
    pub fn instrument_dir(&self, instrument: &str, format: Format) -> PathBuf {
        self.config
            .root
            .join(self.format_dir(format))
            .join(instrument)
    }

    /// Path of the file for one instrument, format and trading date.
    pub fn file_path(&self, instrument: &str, format: Format, date: NaiveDate) -> PathBuf {
        self.instrument_dir(instrument, format).join(format!(
            "{}.{}",
            date.format(&self.config.date_format),
            self.extension(format)
        ))
    }

    /// Trading date encoded in a file stem, if it is one.
    pub fn parse_date(&self, stem: &str) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(stem, &self.config.date_format).ok()
    }
}

/// One dated file in the archive.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArchiveFile {
    pub instrument: String,
    pub date: NaiveDate,
    pub format: Format,
    pub path: PathBuf,
}

/// An archive on disk plus the settings its files are decoded with.
#[derive(Debug, Clone)]
pub struct Archive {
    layout: ArchiveLayout,
    decode: DecodeConfig,
}

impl Archive {
    pub fn new(layout: ArchiveLayout, decode: DecodeConfig) -> Self {
        Self { layout, decode }
    }

    /// Build from the archive and decode sections of a [`Config`].
    pub fn from_config(config: &Config) -> Self {
        Self::new(ArchiveLayout::new(config.archive.clone()), config.decode)
    }

    pub fn layout(&self) -> &ArchiveLayout {
        &self.layout
    }

    /// All dated files for an instrument and format, oldest first.
    ///
    /// Files whose stem is not a date, or whose extension belongs to another
    /// format, are skipped. A missing instrument directory lists as empty.
    pub fn list(&self, instrument: &str, format: Format) -> Result<Vec<ArchiveFile>> {
        let dir = self.layout.instrument_dir(instrument, format);
        if !dir.is_dir() {
            warn!(path = %dir.display(), %format, "archive directory missing");
            return Ok(Vec::new());
        }

        let extension = self.layout.extension(format);
        let mut files = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            let matches_ext = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case(extension));
            if !matches_ext {
                continue;
            }
            let Some(date) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| self.layout.parse_date(s))
            else {
                debug!(path = %path.display(), "skipping file without a date stem");
                continue;
            };
            files.push(ArchiveFile {
                instrument: instrument.to_string(),
                date,
                format,
                path,
            });
        }

        files.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.path.cmp(&b.path)));
        debug!(instrument, %format, files = files.len(), "archive listed");
        Ok(files)
    }

    /// Files dated within `start..=end`, oldest first.
    pub fn select(
        &self,
        instrument: &str,
        format: Format,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<ArchiveFile>> {
        let files: Vec<ArchiveFile> = self
            .list(instrument, format)?
            .into_iter()
            .filter(|f| f.date >= start && f.date <= end)
            .collect();
        debug!(instrument, %format, %start, %end, files = files.len(), "archive files selected");
        Ok(files)
    }

    /// Decode every selected file in date order into one record sequence.
    pub fn read_range(
        &self,
        instrument: &str,
        format: Format,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Record>> {
        let mut records = Vec::new();
        for file in self.select(instrument, format, start, end)? {
            records.extend(decode_file_with(&file, self.decode)?);
        }
        Ok(records)
    }
}
