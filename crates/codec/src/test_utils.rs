//! Byte-level fixture builders for decoder tests.
//!
//! These assemble raw archive bytes from explicit flag bytes and trailing
//! fields. They do not encode records; every bit is chosen by the test.

use crate::ntd_tick::NTD_HEADER_LEN;

/// Big-endian bytes of `value`, keeping the low `width` bytes.
pub fn be(value: u64, width: usize) -> Vec<u8> {
    value.to_be_bytes()[8 - width..].to_vec()
}

/// A complete NCD header.
pub fn ncd_header(increment: f64, initial_price: f64, initial_ticks: i64) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(28);
    bytes.extend_from_slice(&0u32.to_le_bytes());
    bytes.extend_from_slice(&increment.to_le_bytes());
    bytes.extend_from_slice(&initial_price.to_le_bytes());
    bytes.extend_from_slice(&initial_ticks.to_le_bytes());
    bytes
}

/// Builder for NCD tick and minute buffers.
#[derive(Debug, Clone)]
pub struct NcdFileBuilder {
    bytes: Vec<u8>,
    record_ends: Vec<usize>,
}

impl NcdFileBuilder {
    /// Start a buffer with the given header.
    pub fn new(increment: f64, initial_price: f64, initial_ticks: i64) -> Self {
        Self {
            bytes: ncd_header(increment, initial_price, initial_ticks),
            record_ends: Vec::new(),
        }
    }

    /// Append one record: two flag bytes then the trailing field bytes.
    pub fn record(mut self, byte1: u8, byte2: u8, trailing: &[u8]) -> Self {
        self.bytes.push(byte1);
        self.bytes.push(byte2);
        self.bytes.extend_from_slice(trailing);
        self.record_ends.push(self.bytes.len());
        self
    }

    /// Append the same record `n` times.
    pub fn repeat(mut self, n: usize, byte1: u8, byte2: u8, trailing: &[u8]) -> Self {
        for _ in 0..n {
            self = self.record(byte1, byte2, trailing);
        }
        self
    }

    /// Offsets just past each record, in order.
    pub fn record_ends(&self) -> &[usize] {
        &self.record_ends
    }

    pub fn build(self) -> Vec<u8> {
        self.bytes
    }
}

/// Builder for legacy NTD buffers.
#[derive(Debug, Clone)]
pub struct NtdFileBuilder {
    header: [u8; NTD_HEADER_LEN],
    records: Vec<u8>,
    record_ends: Vec<usize>,
    record_count: Option<u32>,
}

impl NtdFileBuilder {
    /// Start a buffer. `tick_size` is stored negated at offset 0, as the format does.
    pub fn new(tick_size: f64, initial_price: f64, initial_ticks: i64, initial_volume: u64) -> Self {
        let mut header = [0u8; NTD_HEADER_LEN];
        header[0x00..0x08].copy_from_slice(&(-tick_size).to_le_bytes());
        header[0x10..0x18].copy_from_slice(&initial_price.to_le_bytes());
        header[0x30..0x38].copy_from_slice(&initial_ticks.to_le_bytes());
        header[0x38..0x40].copy_from_slice(&initial_volume.to_le_bytes());
        Self {
            header,
            records: Vec::new(),
            record_ends: Vec::new(),
            record_count: None,
        }
    }

    /// Append one record: mask byte then trailing field bytes.
    pub fn record(mut self, mask: u8, trailing: &[u8]) -> Self {
        self.records.push(mask);
        self.records.extend_from_slice(trailing);
        self.record_ends.push(NTD_HEADER_LEN + self.records.len());
        self
    }

    /// Override the record count written at 0x0C.
    pub fn record_count(mut self, count: u32) -> Self {
        self.record_count = Some(count);
        self
    }

    /// Offsets just past each delta record, in order.
    pub fn record_ends(&self) -> &[usize] {
        &self.record_ends
    }

    pub fn build(mut self) -> Vec<u8> {
        let count = self
            .record_count
            .unwrap_or(self.record_ends.len() as u32 + 1);
        self.header[0x0C..0x10].copy_from_slice(&count.to_le_bytes());
        let mut bytes = self.header.to_vec();
        bytes.extend_from_slice(&self.records);
        bytes
    }
}
