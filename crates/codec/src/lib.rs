//! Decoders for NinjaTrader market-data archives.
//!
//! ## Formats
//!
//! - **NCD tick**: trades with bid/ask, delta-encoded against the previous record
//! - **NCD minute**: OHLCV bars, delta-encoded against the previous bar's open
//! - **NTD tick**: legacy trades with a fixed 64-byte header and decimal price steps
//!
//! Every decoder takes a fully buffered file and returns a lazy iterator.
//! Decoding stops at the first malformed record; everything before it has
//! already been yielded.

pub mod cursor;
pub mod decoder;
pub mod ncd;
pub mod ncd_minute;
pub mod ncd_tick;
pub mod ntd_tick;
pub mod quantizer;

// Fixture builders (test builds or the test-utils feature only)
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use cursor::ByteCursor;
pub use decoder::{decode, decode_prefix, decode_with, Decoder, Format};
pub use ncd::{NcdHeader, NCD_HEADER_LEN};
pub use ncd_minute::{decode_minute_record, decode_ncd_bars, MinuteState, NcdMinuteReader};
pub use ncd_tick::{decode_ncd_ticks, decode_tick_record, NcdTickReader, TickState};
pub use ntd_tick::{
    decode_ntd_record, decode_ntd_ticks, NtdHeader, NtdState, NtdTickReader, NTD_HEADER_LEN,
};
pub use quantizer::{increment, Quantizer};
