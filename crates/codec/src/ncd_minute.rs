//! NCD minute file decoder.
//!
//! ```text
//! byte1: vvv x oo tt   vvv = volume, oo = open width, tt = time width
//! byte2: ll hh xx cc   ll = low width, hh = high width, cc = close width
//! ```
//!
//! Trailing bytes follow in the order time, open, high, low, close, volume.
//! Open moves from the previous bar's open; high and low hang off the new
//! open, close hangs off low.

use std::iter::FusedIterator;

use ntd_core::{add_ticks, ticks_to_datetime, Bar, DotNetTicks, Error, Result, TICKS_PER_MINUTE};
use tracing::{debug, warn};

use crate::cursor::ByteCursor;
use crate::ncd::{read_unsigned_delta, read_volume, NcdHeader};
use crate::quantizer::Quantizer;

/// Running state between minute records.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MinuteState {
    /// Timestamp of the previous bar.
    pub ticks: DotNetTicks,
    /// Open of the previous bar.
    pub open: f64,
    /// Price grid from the header.
    pub quantizer: Quantizer,
}

impl MinuteState {
    /// State before the first bar.
    pub fn from_header(header: &NcdHeader) -> Self {
        Self {
            ticks: header.initial_ticks,
            open: header.initial_price,
            quantizer: header.quantizer,
        }
    }
}

/// Signed delta with the bias at the midpoint of its width; `00` means `zero`.
fn read_biased_delta(code: u8, zero: i64, cursor: &mut ByteCursor<'_>) -> Result<i64> {
    let delta = match code & 0b11 {
        0b00 => zero,
        0b01 => i64::from(cursor.read_u8()?),
        0b10 => cursor.read_be_u64(2)? as i64 - (1 << 15),
        _ => cursor.read_be_u64(4)? as i64 - (1 << 31),
    };
    Ok(delta)
}

/// Decode one bar, returning the advanced state alongside it.
pub fn decode_minute_record(
    state: &MinuteState,
    cursor: &mut ByteCursor<'_>,
) -> Result<(MinuteState, Bar)> {
    let record_offset = cursor.position();
    let byte1 = cursor.read_u8()?;
    let byte2 = cursor.read_u8()?;

    // A one-byte minute delta is unsigned.
    let minutes = read_biased_delta(byte1, 1, cursor)?;
    let ticks = minutes
        .checked_mul(TICKS_PER_MINUTE)
        .ok_or(Error::TimestampOutOfRange { ticks: state.ticks })
        .and_then(|delta| add_ticks(state.ticks, delta))?;

    let q = state.quantizer;
    let open_delta = match (byte1 >> 2) & 0b11 {
        0b01 => i64::from(cursor.read_u8()?) - (1 << 7),
        code => read_biased_delta(code, 0, cursor)?,
    };
    let open = q.increment(state.open, open_delta)?;

    let high = q.increment(open, read_unsigned_delta(byte2 >> 4, cursor)?)?;
    let low = q
        .negated()
        .increment(open, read_unsigned_delta(byte2 >> 6, cursor)?)?;
    let close = q.increment(low, read_unsigned_delta(byte2, cursor)?)?;

    let volume = read_volume(byte1 >> 5, true, record_offset, cursor)?;

    let bar = Bar::new(ticks_to_datetime(ticks)?, open, high, low, close, volume);
    Ok((MinuteState { ticks, open, ..*state }, bar))
}

/// Lazy, fused sequence of bars from an NCD minute buffer.
#[derive(Debug, Clone)]
pub struct NcdMinuteReader<'a> {
    cursor: ByteCursor<'a>,
    header: NcdHeader,
    state: MinuteState,
    yielded: usize,
    done: bool,
}

impl<'a> NcdMinuteReader<'a> {
    /// Parse the header and position the reader at the first bar.
    pub fn new(bytes: &'a [u8]) -> Result<Self> {
        let mut cursor = ByteCursor::new(bytes);
        let header = NcdHeader::parse(&mut cursor)?;
        debug!(
            increment = header.increment(),
            initial_open = header.initial_price,
            initial_ticks = header.initial_ticks,
            bytes = bytes.len(),
            "ncd minute header parsed"
        );
        Ok(Self {
            cursor,
            state: MinuteState::from_header(&header),
            header,
            yielded: 0,
            done: false,
        })
    }

    /// Header of the file being decoded.
    pub fn header(&self) -> &NcdHeader {
        &self.header
    }

    /// State after the last yielded bar.
    pub fn state(&self) -> &MinuteState {
        &self.state
    }

    /// Bars yielded so far.
    pub fn yielded(&self) -> usize {
        self.yielded
    }
}

impl Iterator for NcdMinuteReader<'_> {
    type Item = Result<Bar>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if self.cursor.is_empty() {
            self.done = true;
            debug!(records = self.yielded, "ncd minute decode finished");
            return None;
        }
        match decode_minute_record(&self.state, &mut self.cursor) {
            Ok((state, bar)) => {
                self.state = state;
                self.yielded += 1;
                Some(Ok(bar))
            }
            Err(e) => {
                self.done = true;
                warn!(records = self.yielded, error = %e, "ncd minute decode aborted");
                Some(Err(e))
            }
        }
    }
}

impl FusedIterator for NcdMinuteReader<'_> {}

/// Decode an NCD minute buffer into a lazy sequence of bars.
pub fn decode_ncd_bars(bytes: &[u8]) -> Result<NcdMinuteReader<'_>> {
    NcdMinuteReader::new(bytes)
}
