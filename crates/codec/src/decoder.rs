//! Format selection and a single record stream over all three decoders.

use std::fmt;
use std::iter::FusedIterator;
use std::str::FromStr;

use ntd_core::config::DecodeConfig;
use ntd_core::{Error, Record, Result};

use crate::ncd_minute::NcdMinuteReader;
use crate::ncd_tick::NcdTickReader;
use crate::ntd_tick::NtdTickReader;

/// Archive format, chosen by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    /// NCD tick file.
    NcdTick,
    /// NCD minute-bar file.
    NcdMinute,
    /// Legacy NTD tick file.
    NtdTick,
}

impl Format {
    pub const ALL: [Format; 3] = [Format::NcdTick, Format::NcdMinute, Format::NtdTick];

    /// Stable short name.
    pub fn as_str(self) -> &'static str {
        match self {
            Format::NcdTick => "ncd-tick",
            Format::NcdMinute => "ncd-minute",
            Format::NtdTick => "ntd-tick",
        }
    }

    /// Whether records are bars rather than ticks.
    pub fn is_bar(self) -> bool {
        matches!(self, Format::NcdMinute)
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Format {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Format::ALL
            .into_iter()
            .find(|format| format.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::config(format!("unknown format '{s}'")))
    }
}

/// Record stream for any format.
#[derive(Debug, Clone)]
pub enum Decoder<'a> {
    NcdTick(NcdTickReader<'a>),
    NcdMinute(NcdMinuteReader<'a>),
    NtdTick(NtdTickReader<'a>),
}

impl<'a> Decoder<'a> {
    /// Format this decoder reads.
    pub fn format(&self) -> Format {
        match self {
            Decoder::NcdTick(_) => Format::NcdTick,
            Decoder::NcdMinute(_) => Format::NcdMinute,
            Decoder::NtdTick(_) => Format::NtdTick,
        }
    }

    /// Records yielded so far.
    pub fn yielded(&self) -> usize {
        match self {
            Decoder::NcdTick(r) => r.yielded(),
            Decoder::NcdMinute(r) => r.yielded(),
            Decoder::NtdTick(r) => r.yielded(),
        }
    }
}

impl Iterator for Decoder<'_> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            Decoder::NcdTick(r) => r.next().map(|t| t.map(Record::Tick)),
            Decoder::NcdMinute(r) => r.next().map(|b| b.map(Record::Bar)),
            Decoder::NtdTick(r) => r.next().map(|t| t.map(Record::Tick)),
        }
    }
}

impl FusedIterator for Decoder<'_> {}

/// Start decoding `bytes` as `format` with default settings.
pub fn decode(format: Format, bytes: &[u8]) -> Result<Decoder<'_>> {
    decode_with(format, bytes, DecodeConfig::default())
}

/// Start decoding `bytes` as `format`.
pub fn decode_with(format: Format, bytes: &[u8], config: DecodeConfig) -> Result<Decoder<'_>> {
    Ok(match format {
        Format::NcdTick => Decoder::NcdTick(NcdTickReader::new(bytes)?),
        Format::NcdMinute => Decoder::NcdMinute(NcdMinuteReader::new(bytes)?),
        Format::NtdTick => Decoder::NtdTick(NtdTickReader::with_config(bytes, config)?),
    })
}

/// Decode everything up to the first error.
///
/// Returns the complete records and, if decoding stopped early, the error.
pub fn decode_prefix(decoder: Decoder<'_>) -> (Vec<Record>, Option<Error>) {
    let mut records = Vec::new();
    for item in decoder {
        match item {
            Ok(record) => records.push(record),
            Err(e) => return (records, Some(e)),
        }
    }
    (records, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{NcdFileBuilder, NtdFileBuilder};

    #[test]
    fn test_format_names() {
        for format in Format::ALL {
            assert_eq!(format.to_string().parse::<Format>().unwrap(), format);
        }
        assert_eq!("NCD-Minute".parse::<Format>().unwrap(), Format::NcdMinute);
        assert!("csv".parse::<Format>().is_err());
        assert!(Format::NcdMinute.is_bar());
        assert!(!Format::NtdTick.is_bar());
    }

    #[test]
    fn test_same_bytes_different_formats() {
        let bytes = NcdFileBuilder::new(0.25, 100.0, 637_284_708_000_000_000)
            .record(0b0010_0000, 0b0100_0000, &[4, 7])
            .build();

        // As ticks: volume 100 x 4, then a dangling byte.
        let mut ticks = decode(Format::NcdTick, &bytes).unwrap();
        let tick = ticks.next().unwrap().unwrap();
        assert_eq!(tick.as_tick().unwrap().volume, 400);
        assert!(matches!(ticks.next(), Some(Err(Error::TruncatedInput { .. }))));

        // As bars: low 4 increments under open, volume 7.
        let mut bars = decode(Format::NcdMinute, &bytes).unwrap();
        let bar = *bars.next().unwrap().unwrap().as_bar().unwrap();
        assert_eq!(bar.low.into_inner(), 99.0);
        assert_eq!(bar.volume, 7);
        assert!(bars.next().is_none());
        assert_eq!(bars.format(), Format::NcdMinute);
        assert_eq!(bars.yielded(), 1);
    }

    #[test]
    fn test_decode_prefix_stops_at_error() {
        let bytes = NtdFileBuilder::new(0.25, 1000.0, 633_979_008_000_000_000, 1)
            .record(0b0001_0001, &[5, 2])
            .record(0b0001_0001, &[5])
            .build();
        let (records, err) = decode_prefix(decode(Format::NtdTick, &bytes).unwrap());

        assert_eq!(records.len(), 2);
        assert!(matches!(err, Some(Error::TruncatedInput { .. })));
    }

    #[test]
    fn test_decode_with_lenient_config() {
        let bytes = NtdFileBuilder::new(0.25, 1000.0, 633_979_008_000_000_000, 1)
            .record_count(3)
            .build();
        let config = DecodeConfig {
            strict_record_count: false,
            ..DecodeConfig::default()
        };
        let (records, err) = decode_prefix(decode_with(Format::NtdTick, &bytes, config).unwrap());

        assert_eq!(records.len(), 1);
        assert!(err.is_none());
    }
}
