//! Legacy NTD tick file decoder.
//!
//! The header is read by absolute offset:
//!
//! ```text
//! 0x00  f64  negated price multiplier
//! 0x0C  u32  record count (including the header record)
//! 0x10  f64  first price
//! 0x30  i64  first timestamp (100ns ticks)
//! 0x38  u64  first volume
//! ```
//!
//! Delta records start at 0x40, each led by one mask byte `x vvv pp tt`:
//! time width, price width, volume encoding.
//!
//! Prices are carried as decimals so that summing thousands of
//! multiplier-scaled deltas stays exact to the cent.

use std::iter::FusedIterator;

use ntd_core::config::DecodeConfig;
use ntd_core::{
    add_ticks, ticks_to_datetime, DotNetTicks, Error, Result, Tick, Volume, TICKS_PER_SECOND,
};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::cursor::ByteCursor;

/// Size of the fixed header; delta records start here.
pub const NTD_HEADER_LEN: usize = 0x40;

const MULTIPLIER_OFFSET: usize = 0x00;
const RECORD_COUNT_OFFSET: usize = 0x0C;
const PRICE_OFFSET: usize = 0x10;
const TIME_OFFSET: usize = 0x30;
const VOLUME_OFFSET: usize = 0x38;

fn to_decimal(value: f64, what: &str) -> Result<Decimal> {
    Decimal::try_from(value)
        .map_err(|e| Error::invalid_header(format!("{what} {value} has no decimal form: {e}")))
}

/// Header fields of a legacy file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NtdHeader {
    /// Price change per unit of delta.
    pub price_multiplier: Decimal,
    /// Total records, the header record included.
    pub record_count: u32,
    pub initial_price: Decimal,
    pub initial_ticks: DotNetTicks,
    pub initial_volume: Volume,
}

impl NtdHeader {
    /// Read the header by absolute offset and leave the cursor at the first delta record.
    pub fn parse(cursor: &mut ByteCursor<'_>) -> Result<Self> {
        cursor.seek(0)?;
        cursor.require(NTD_HEADER_LEN)?;

        cursor.seek(MULTIPLIER_OFFSET)?;
        let price_multiplier = to_decimal(-cursor.read_f64()?, "price multiplier")?;

        cursor.seek(RECORD_COUNT_OFFSET)?;
        let record_count = cursor.read_le_u32()?;

        cursor.seek(PRICE_OFFSET)?;
        let initial_price = to_decimal(cursor.read_f64()?, "initial price")?;

        cursor.seek(TIME_OFFSET)?;
        let initial_ticks = cursor.read_le_i64()?;

        cursor.seek(VOLUME_OFFSET)?;
        let initial_volume = cursor.read_le_u64()?;

        cursor.seek(NTD_HEADER_LEN)?;
        Ok(Self {
            price_multiplier,
            record_count,
            initial_price,
            initial_ticks,
            initial_volume,
        })
    }
}

/// Running state between legacy records.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NtdState {
    pub ticks: DotNetTicks,
    /// Exact running price.
    pub price: Decimal,
    pub volume: Volume,
    /// Price change per unit of delta, from the header.
    pub multiplier: Decimal,
}

impl NtdState {
    /// State describing the header record.
    pub fn from_header(header: &NtdHeader) -> Self {
        Self {
            ticks: header.initial_ticks,
            price: header.initial_price,
            volume: header.initial_volume,
            multiplier: header.price_multiplier,
        }
    }

    /// Render the state as a tick.
    pub fn to_tick(&self) -> Result<Tick> {
        let price = self.price.to_f64().ok_or_else(|| {
            Error::price_overflow(format!("{} has no f64 form", self.price))
        })?;
        Ok(Tick::last_only(ticks_to_datetime(self.ticks)?, price, self.volume))
    }
}

fn read_volume(mask: u8, mask_offset: usize, cursor: &mut ByteCursor<'_>) -> Result<Volume> {
    let code = (mask >> 4) & 0b111;
    let volume = match code {
        0b001 => cursor.read_be_u64(1)?,
        0b110 => cursor.read_be_u64(2)?,
        0b111 => cursor.read_be_u64(4)?,
        0b010 => cursor.read_be_u64(8)?,
        0b011 => cursor.read_be_u64(1)? * 100,
        0b100 => cursor.read_be_u64(1)? * 500,
        0b101 => cursor.read_be_u64(1)? * 1000,
        _ => return Err(Error::unrecognized_flag("volume", code, mask_offset)),
    };
    Ok(volume)
}

/// Decode one delta record, returning the advanced state alongside the tick.
pub fn decode_ntd_record(state: &NtdState, cursor: &mut ByteCursor<'_>) -> Result<(NtdState, Tick)> {
    let mask_offset = cursor.position();
    let mask = cursor.read_u8()?;

    let seconds = match mask & 0b11 {
        0b00 => 0,
        0b01 => cursor.read_be_u64(1)?,
        0b10 => cursor.read_be_u64(2)?,
        _ => cursor.read_be_u64(3)?,
    };
    let ticks = add_ticks(state.ticks, seconds as i64 * TICKS_PER_SECOND)?;

    let delta = match (mask >> 2) & 0b11 {
        0b00 => 0,
        0b01 => cursor.read_be_u64(1)? as i64 - (1 << 7),
        0b10 => cursor.read_be_u64(2)? as i64 - (1 << 15),
        _ => cursor.read_be_u64(4)? as i64 - (1 << 31),
    };
    let price = state
        .multiplier
        .checked_mul(Decimal::from(delta))
        .and_then(|step| state.price.checked_add(step))
        .ok_or_else(|| Error::price_overflow(format!("{} + {delta} units", state.price)))?;

    let volume = read_volume(mask, mask_offset, cursor)?;

    let next = NtdState {
        ticks,
        price,
        volume,
        ..*state
    };
    Ok((next, next.to_tick()?))
}

/// Lazy, fused sequence of ticks from a legacy NTD buffer.
#[derive(Debug, Clone)]
pub struct NtdTickReader<'a> {
    cursor: ByteCursor<'a>,
    header: NtdHeader,
    state: NtdState,
    config: DecodeConfig,
    first: Option<Tick>,
    /// Delta records still to read.
    pending: u32,
    yielded: usize,
    done: bool,
}

impl<'a> NtdTickReader<'a> {
    /// Parse the header with default decode settings.
    pub fn new(bytes: &'a [u8]) -> Result<Self> {
        Self::with_config(bytes, DecodeConfig::default())
    }

    /// Parse the header; the header record is ready to yield afterwards.
    pub fn with_config(bytes: &'a [u8], config: DecodeConfig) -> Result<Self> {
        let mut cursor = ByteCursor::new(bytes);
        let header = NtdHeader::parse(&mut cursor)?;
        let state = NtdState::from_header(&header);
        let first = state.to_tick()?;
        debug!(
            multiplier = %header.price_multiplier,
            initial_price = %header.initial_price,
            initial_ticks = header.initial_ticks,
            record_count = header.record_count,
            bytes = bytes.len(),
            "ntd header parsed"
        );
        Ok(Self {
            cursor,
            header,
            state,
            config,
            first: Some(first),
            pending: header.record_count.saturating_sub(1),
            yielded: 0,
            done: false,
        })
    }

    /// Header of the file being decoded.
    pub fn header(&self) -> &NtdHeader {
        &self.header
    }

    /// State after the last yielded record.
    pub fn state(&self) -> &NtdState {
        &self.state
    }

    /// Records yielded so far, the header record included.
    pub fn yielded(&self) -> usize {
        self.yielded
    }

    fn finish(&mut self) {
        self.done = true;
        if self.config.warn_on_trailing_bytes && !self.cursor.is_empty() {
            warn!(
                trailing = self.cursor.remaining(),
                offset = self.cursor.position(),
                "ntd bytes after last counted record"
            );
        }
        debug!(records = self.yielded, "ntd decode finished");
    }
}

impl Iterator for NtdTickReader<'_> {
    type Item = Result<Tick>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if let Some(first) = self.first.take() {
            self.yielded += 1;
            return Some(Ok(first));
        }
        if self.pending == 0 {
            self.finish();
            return None;
        }
        if self.cursor.is_empty() && !self.config.strict_record_count {
            debug!(
                missing = self.pending,
                "ntd buffer ended before record count"
            );
            self.finish();
            return None;
        }
        match decode_ntd_record(&self.state, &mut self.cursor) {
            Ok((state, tick)) => {
                self.state = state;
                self.pending -= 1;
                self.yielded += 1;
                Some(Ok(tick))
            }
            Err(e) => {
                self.done = true;
                warn!(records = self.yielded, error = %e, "ntd decode aborted");
                Some(Err(e))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.done {
            return (0, Some(0));
        }
        let upper = self.pending as usize + usize::from(self.first.is_some());
        (0, Some(upper))
    }
}

impl FusedIterator for NtdTickReader<'_> {}

/// Decode a legacy NTD buffer into a lazy sequence of ticks.
pub fn decode_ntd_ticks(bytes: &[u8]) -> Result<NtdTickReader<'_>> {
    NtdTickReader::new(bytes)
}
