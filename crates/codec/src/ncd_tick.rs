//! NCD tick file decoder.
//!
//! Each record starts with two flag bytes:
//!
//! ```text
//! byte1: pp sss ttt    pp = price width, sss = spread, ttt = time width
//! byte2: vvv ppppp     vvv = volume width, ppppp = inline price delta
//! ```
//!
//! followed by the bytes each flag group selects, in the order
//! time, price, spread, volume.

use std::iter::FusedIterator;

use ntd_core::{add_ticks, ticks_to_datetime, DotNetTicks, Error, Result, Tick, TICKS_PER_SECOND};
use tracing::{debug, warn};

use crate::cursor::ByteCursor;
use crate::ncd::{read_volume, NcdHeader};
use crate::quantizer::Quantizer;

/// Running state between tick records.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickState {
    /// Timestamp of the previous record.
    pub ticks: DotNetTicks,
    /// Price of the previous record.
    pub price: f64,
    /// Price grid from the header.
    pub quantizer: Quantizer,
}

impl TickState {
    /// State before the first record.
    pub fn from_header(header: &NcdHeader) -> Self {
        Self {
            ticks: header.initial_ticks,
            price: header.initial_price,
            quantizer: header.quantizer,
        }
    }
}

fn read_time_delta(byte1: u8, flag_offset: usize, cursor: &mut ByteCursor<'_>) -> Result<i64> {
    let code = byte1 & 0b111;
    let delta = match code {
        0b000 => 0,
        0b001 => i64::from(cursor.read_u8()?),
        0b010 => cursor.read_be_u64(2)? as i64,
        0b011 => cursor.read_be_u64(4)? as i64,
        0b100 => cursor.read_be_i64(8)?,
        0b101 => i64::from(cursor.read_u8()?) * TICKS_PER_SECOND,
        _ => return Err(Error::unrecognized_flag("time", code, flag_offset)),
    };
    Ok(delta)
}

fn read_price_delta(byte1: u8, byte2: u8, cursor: &mut ByteCursor<'_>) -> Result<i64> {
    let delta = match byte1 >> 6 {
        0b00 => 0,
        0b01 => i64::from(byte2 & 0b1_1111) - (1 << 4),
        0b10 => i64::from(cursor.read_u8()?) - (1 << 7),
        _ => cursor.read_be_u64(4)? as i64 - (1 << 31),
    };
    Ok(delta)
}

/// Bid and ask distances from the trade price, in increments.
fn read_spread(byte1: u8, cursor: &mut ByteCursor<'_>) -> Result<(i64, i64)> {
    let flags = (byte1 >> 3) & 0b111;
    match flags {
        0b110 => {
            let packed = cursor.read_u8()?;
            Ok((i64::from(packed >> 4), i64::from(packed & 0b1111)))
        }
        0b111 => {
            let bid = cursor.read_u8()?;
            let ask = cursor.read_u8()?;
            Ok((i64::from(bid), i64::from(ask)))
        }
        _ => {
            let bid = i64::from(flags & 0b001);
            let ask = 1 - bid;
            let scale = if flags & 0b010 != 0 {
                2
            } else if flags & 0b100 != 0 {
                3
            } else {
                1
            };
            Ok((bid * scale, ask * scale))
        }
    }
}

/// Decode one record, returning the advanced state alongside the tick.
///
/// `state` is never modified; on error the caller's state is still the state
/// after the last complete record.
pub fn decode_tick_record(
    state: &TickState,
    cursor: &mut ByteCursor<'_>,
) -> Result<(TickState, Tick)> {
    let record_offset = cursor.position();
    let byte1 = cursor.read_u8()?;
    let byte2 = cursor.read_u8()?;

    let ticks = add_ticks(state.ticks, read_time_delta(byte1, record_offset, cursor)?)?;

    let q = state.quantizer;
    let price = q.increment(state.price, read_price_delta(byte1, byte2, cursor)?)?;

    let (bid_offset, ask_offset) = read_spread(byte1, cursor)?;
    let bid = q.increment(price, -bid_offset)?;
    let ask = q.increment(price, ask_offset)?;

    let volume = read_volume(byte2 >> 5, false, record_offset + 1, cursor)?;

    let tick = Tick::with_quote(ticks_to_datetime(ticks)?, price, bid, ask, volume);
    Ok((TickState { ticks, price, ..*state }, tick))
}

/// Lazy, fused sequence of ticks from an NCD tick buffer.
#[derive(Debug, Clone)]
pub struct NcdTickReader<'a> {
    cursor: ByteCursor<'a>,
    header: NcdHeader,
    state: TickState,
    yielded: usize,
    done: bool,
}

impl<'a> NcdTickReader<'a> {
    /// Parse the header and position the reader at the first record.
    pub fn new(bytes: &'a [u8]) -> Result<Self> {
        let mut cursor = ByteCursor::new(bytes);
        let header = NcdHeader::parse(&mut cursor)?;
        debug!(
            increment = header.increment(),
            initial_price = header.initial_price,
            initial_ticks = header.initial_ticks,
            bytes = bytes.len(),
            "ncd tick header parsed"
        );
        Ok(Self {
            cursor,
            state: TickState::from_header(&header),
            header,
            yielded: 0,
            done: false,
        })
    }

    /// Header of the file being decoded.
    pub fn header(&self) -> &NcdHeader {
        &self.header
    }

    /// State after the last yielded record.
    pub fn state(&self) -> &TickState {
        &self.state
    }

    /// Records yielded so far.
    pub fn yielded(&self) -> usize {
        self.yielded
    }
}

impl Iterator for NcdTickReader<'_> {
    type Item = Result<Tick>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if self.cursor.is_empty() {
            self.done = true;
            debug!(records = self.yielded, "ncd tick decode finished");
            return None;
        }
        match decode_tick_record(&self.state, &mut self.cursor) {
            Ok((state, tick)) => {
                self.state = state;
                self.yielded += 1;
                Some(Ok(tick))
            }
            Err(e) => {
                self.done = true;
                warn!(records = self.yielded, error = %e, "ncd tick decode aborted");
                Some(Err(e))
            }
        }
    }
}

impl FusedIterator for NcdTickReader<'_> {}

/// Decode an NCD tick buffer into a lazy sequence of ticks.
pub fn decode_ncd_ticks(bytes: &[u8]) -> Result<NcdTickReader<'_>> {
    NcdTickReader::new(bytes)
}
