//! Drift-free price stepping.
//!
//! A price moved by `n` increments is recomputed from its increment index
//! instead of being accumulated, so thousands of sequential deltas never
//! leave the increment grid. The index is rounded half away from zero and the
//! final multiplication runs in decimal arithmetic.

use ntd_core::{Error, Result};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Price increment with its decimal form cached.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quantizer {
    step: f64,
    step_dec: Decimal,
}

impl Quantizer {
    /// Validate an increment read from a file header.
    pub fn new(step: f64) -> Result<Self> {
        if !step.is_finite() || step == 0.0 {
            return Err(Error::invalid_header(format!(
                "price increment {step} is not a finite non-zero number"
            )));
        }
        let step_dec = Decimal::try_from(step).map_err(|e| {
            Error::invalid_header(format!("price increment {step} has no decimal form: {e}"))
        })?;
        if step_dec.is_zero() {
            return Err(Error::invalid_header(format!(
                "price increment {step} is below decimal precision"
            )));
        }
        Ok(Self { step, step_dec })
    }

    /// The increment as read.
    #[inline]
    pub fn step(&self) -> f64 {
        self.step
    }

    /// The increment in decimal form.
    #[inline]
    pub fn step_decimal(&self) -> Decimal {
        self.step_dec
    }

    /// Same grid, stepping in the opposite direction.
    pub fn negated(&self) -> Self {
        Self {
            step: -self.step,
            step_dec: -self.step_dec,
        }
    }

    /// Move `value` by `n` increments (negative `n` moves against the step).
    pub fn increment(&self, value: f64, n: i64) -> Result<f64> {
        if n == 0 {
            return Ok(value);
        }
        // f64::round rounds half away from zero.
        let units = (value / self.step).round();
        if !units.is_finite() || units.abs() >= 9.2e18 {
            return Err(Error::price_overflow(format!(
                "{value} is not addressable with increment {}",
                self.step
            )));
        }
        let units = (units as i64).checked_add(n).ok_or_else(|| {
            Error::price_overflow(format!("increment index overflow moving {value} by {n}"))
        })?;
        self.step_dec
            .checked_mul(Decimal::from(units))
            .and_then(|price| price.to_f64())
            .ok_or_else(|| {
                Error::price_overflow(format!("{units} x {} exceeds decimal range", self.step_dec))
            })
    }
}

/// Move `value` by `n` increments of `step`.
pub fn increment(value: f64, step: f64, n: i64) -> Result<f64> {
    Quantizer::new(step)?.increment(value, n)
}
