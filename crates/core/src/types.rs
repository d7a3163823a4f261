//! Core data types for the ntd-reader system.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Timestamp in 100-nanosecond ticks since 0001-01-01T00:00:00 (local wall clock).
pub type DotNetTicks = i64;

/// Price type with ordering and hashing support.
pub type Price = OrderedFloat<f64>;

/// Volume (contracts or shares).
pub type Volume = u64;

/// Ticks in one second.
pub const TICKS_PER_SECOND: DotNetTicks = 10_000_000;

/// Ticks in one minute.
pub const TICKS_PER_MINUTE: DotNetTicks = 60 * TICKS_PER_SECOND;

/// Largest tick count that maps to a calendar instant (9999-12-31T23:59:59.9999999).
pub const MAX_TICKS: DotNetTicks = 3_155_378_975_999_999_999;

fn tick_epoch() -> Option<NaiveDateTime> {
    NaiveDate::from_ymd_opt(1, 1, 1)?.and_hms_opt(0, 0, 0)
}

/// Convert a tick count into a calendar timestamp.
pub fn ticks_to_datetime(ticks: DotNetTicks) -> Result<NaiveDateTime> {
    let out_of_range = || Error::TimestampOutOfRange { ticks };
    if !(0..=MAX_TICKS).contains(&ticks) {
        return Err(out_of_range());
    }
    let epoch = tick_epoch().ok_or_else(out_of_range)?;
    let delta = Duration::seconds(ticks / TICKS_PER_SECOND)
        + Duration::nanoseconds((ticks % TICKS_PER_SECOND) * 100);
    epoch.checked_add_signed(delta).ok_or_else(out_of_range)
}

/// Convert a calendar timestamp into a tick count.
///
/// Sub-tick precision (below 100ns) is truncated.
pub fn datetime_to_ticks(ts: NaiveDateTime) -> Result<DotNetTicks> {
    let epoch = tick_epoch().ok_or(Error::TimestampOutOfRange { ticks: 0 })?;
    let delta = ts.signed_duration_since(epoch);
    let secs = delta.num_seconds();
    let sub_nanos = (delta - Duration::seconds(secs))
        .num_nanoseconds()
        .unwrap_or(0);
    let ticks = secs
        .checked_mul(TICKS_PER_SECOND)
        .and_then(|t| t.checked_add(sub_nanos / 100))
        .ok_or(Error::TimestampOutOfRange { ticks: i64::MAX })?;
    if !(0..=MAX_TICKS).contains(&ticks) {
        return Err(Error::TimestampOutOfRange { ticks });
    }
    Ok(ticks)
}

/// Advance a running tick count, rejecting overflow.
#[inline]
pub fn add_ticks(ticks: DotNetTicks, delta: i64) -> Result<DotNetTicks> {
    ticks
        .checked_add(delta)
        .ok_or(Error::TimestampOutOfRange { ticks })
}

/// A single trade print, optionally with the prevailing bid/ask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tick {
    /// Trade time (local wall clock of the recording machine).
    pub timestamp: NaiveDateTime,
    /// Trade price.
    pub price: Price,
    /// Best bid at the trade. Absent in legacy NTD files.
    pub bid: Option<Price>,
    /// Best ask at the trade. Absent in legacy NTD files.
    pub ask: Option<Price>,
    /// Trade size.
    pub volume: Volume,
}

impl Tick {
    /// Create a tick carrying bid/ask.
    pub fn with_quote(timestamp: NaiveDateTime, price: f64, bid: f64, ask: f64, volume: Volume) -> Self {
        Self {
            timestamp,
            price: OrderedFloat(price),
            bid: Some(OrderedFloat(bid)),
            ask: Some(OrderedFloat(ask)),
            volume,
        }
    }

    /// Create a tick without quote data.
    pub fn last_only(timestamp: NaiveDateTime, price: f64, volume: Volume) -> Self {
        Self {
            timestamp,
            price: OrderedFloat(price),
            bid: None,
            ask: None,
            volume,
        }
    }

    /// Spread between ask and bid, when both are present.
    #[inline]
    pub fn spread(&self) -> Option<f64> {
        Some(self.ask?.into_inner() - self.bid?.into_inner())
    }
}

/// 1-minute OHLCV bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Bar {
    /// Bar timestamp.
    pub timestamp: NaiveDateTime,
    /// Open price.
    pub open: Price,
    /// High price.
    pub high: Price,
    /// Low price.
    pub low: Price,
    /// Close price.
    pub close: Price,
    /// Total volume.
    pub volume: Volume,
}

impl Bar {
    /// Create a bar from plain prices.
    pub fn new(
        timestamp: NaiveDateTime,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: Volume,
    ) -> Self {
        Self {
            timestamp,
            open: OrderedFloat(open),
            high: OrderedFloat(high),
            low: OrderedFloat(low),
            close: OrderedFloat(close),
            volume,
        }
    }

    /// High minus low.
    #[inline]
    pub fn range(&self) -> f64 {
        self.high.into_inner() - self.low.into_inner()
    }
}

/// A decoded record of either kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Record {
    Tick(Tick),
    Bar(Bar),
}

impl Record {
    /// Timestamp of the underlying record.
    pub fn timestamp(&self) -> NaiveDateTime {
        match self {
            Record::Tick(t) => t.timestamp,
            Record::Bar(b) => b.timestamp,
        }
    }

    /// Volume of the underlying record.
    pub fn volume(&self) -> Volume {
        match self {
            Record::Tick(t) => t.volume,
            Record::Bar(b) => b.volume,
        }
    }

    pub fn as_tick(&self) -> Option<&Tick> {
        match self {
            Record::Tick(t) => Some(t),
            Record::Bar(_) => None,
        }
    }

    pub fn as_bar(&self) -> Option<&Bar> {
        match self {
            Record::Bar(b) => Some(b),
            Record::Tick(_) => None,
        }
    }
}

impl From<Tick> for Record {
    fn from(tick: Tick) -> Self {
        Record::Tick(tick)
    }
}

impl From<Bar> for Record {
    fn from(bar: Bar) -> Self {
        Record::Bar(bar)
    }
}
