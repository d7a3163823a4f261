//! Pieces shared by the NCD tick and minute formats.
//!
//! Both formats open with the same little-endian header:
//!
//! ```text
//! offset  size  field
//! 0x00    4     reserved
//! 0x04    8     price increment (f64)
//! 0x0C    8     initial price / open (f64)
//! 0x14    8     initial timestamp (i64, 100ns ticks)
//! ```

use ntd_core::{DotNetTicks, Error, Result, Volume};

use crate::cursor::ByteCursor;
use crate::quantizer::Quantizer;

/// Size of the NCD header in bytes.
pub const NCD_HEADER_LEN: usize = 28;

/// Header fields read once per NCD file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NcdHeader {
    /// Unused leading word.
    pub reserved: u32,
    /// Price increment grid.
    pub quantizer: Quantizer,
    /// Price (tick files) or open (minute files) the first delta applies to.
    pub initial_price: f64,
    /// Timestamp the first delta applies to.
    pub initial_ticks: DotNetTicks,
}

impl NcdHeader {
    /// Read the header from the cursor's current position.
    pub fn parse(cursor: &mut ByteCursor<'_>) -> Result<Self> {
        cursor.require(NCD_HEADER_LEN)?;
        let reserved = cursor.read_le_u32()?;
        let increment = cursor.read_f64()?;
        let initial_price = cursor.read_f64()?;
        let initial_ticks = cursor.read_le_i64()?;

        let quantizer = Quantizer::new(increment)?;
        if !initial_price.is_finite() {
            return Err(Error::invalid_header(format!(
                "initial price {initial_price} is not finite"
            )));
        }

        Ok(Self {
            reserved,
            quantizer,
            initial_price,
            initial_ticks,
        })
    }

    /// The price increment.
    #[inline]
    pub fn increment(&self) -> f64 {
        self.quantizer.step()
    }
}

/// Read a volume selected by a 3-bit code.
///
/// Tick files leave `000` undefined; minute files use it for zero volume.
pub(crate) fn read_volume(
    code: u8,
    zero_allowed: bool,
    flag_offset: usize,
    cursor: &mut ByteCursor<'_>,
) -> Result<Volume> {
    let volume = match code {
        0b000 if zero_allowed => 0,
        0b001 => u64::from(cursor.read_u8()?),
        0b010 => 100 * u64::from(cursor.read_u8()?),
        0b011 => 500 * u64::from(cursor.read_u8()?),
        0b100 => 1000 * u64::from(cursor.read_u8()?),
        0b101 => cursor.read_be_u64(2)?,
        0b110 => cursor.read_be_u64(4)?,
        0b111 => cursor.read_be_u64(8)?,
        _ => return Err(Error::unrecognized_flag("volume", code, flag_offset)),
    };
    Ok(volume)
}

/// Read an unsigned delta selected by a 2-bit width code (0, 1, 2 or 4 bytes).
pub(crate) fn read_unsigned_delta(code: u8, cursor: &mut ByteCursor<'_>) -> Result<i64> {
    let delta = match code & 0b11 {
        0b00 => 0,
        0b01 => i64::from(cursor.read_u8()?),
        0b10 => cursor.read_be_u64(2)? as i64,
        _ => cursor.read_be_u64(4)? as i64,
    };
    Ok(delta)
}
