//! PyO3 bindings for the archive decoders.
//!
//! Exposes to Python:
//! - Tick and Bar record types
//! - Decoding of in-memory NCD tick, NCD minute and legacy NTD buffers
//! - Reading and decoding a file by path
//! - Log subscriber setup

use pyo3::exceptions::{PyFileNotFoundError, PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ntd_archive::read_source;
use ntd_codec::{decode, Format};
use ntd_core::config::LoggingConfig;
use ntd_core::{
    datetime_to_ticks, Bar as RustBar, Error as RustError, Record, Tick as RustTick,
};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

fn to_py_err(err: RustError) -> PyErr {
    match err {
        RustError::SourceNotFound { .. } => PyFileNotFoundError::new_err(err.to_string()),
        RustError::Io(_) => PyRuntimeError::new_err(err.to_string()),
        _ => PyValueError::new_err(err.to_string()),
    }
}

// ============================================================================
// Python-exposed Types
// ============================================================================

/// A decoded trade. Legacy NTD ticks carry no bid/ask.
#[pyclass]
#[derive(Clone)]
pub struct Tick {
    /// Local wall-clock time, ISO 8601 without zone.
    #[pyo3(get)]
    pub timestamp: String,
    /// 100ns ticks since 0001-01-01.
    #[pyo3(get)]
    pub ticks: i64,
    #[pyo3(get)]
    pub price: f64,
    #[pyo3(get)]
    pub bid: Option<f64>,
    #[pyo3(get)]
    pub ask: Option<f64>,
    #[pyo3(get)]
    pub volume: u64,
}

#[pymethods]
impl Tick {
    #[getter]
    fn spread(&self) -> Option<f64> {
        Some(self.ask? - self.bid?)
    }

    fn __repr__(&self) -> String {
        format!(
            "Tick(timestamp={}, price={}, bid={:?}, ask={:?}, volume={})",
            self.timestamp, self.price, self.bid, self.ask, self.volume
        )
    }
}

impl TryFrom<RustTick> for Tick {
    type Error = RustError;

    fn try_from(t: RustTick) -> Result<Self, Self::Error> {
        Ok(Tick {
            timestamp: t.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            ticks: datetime_to_ticks(t.timestamp)?,
            price: t.price.into_inner(),
            bid: t.bid.map(|p| p.into_inner()),
            ask: t.ask.map(|p| p.into_inner()),
            volume: t.volume,
        })
    }
}

/// A decoded one-minute bar.
#[pyclass]
#[derive(Clone)]
pub struct Bar {
    #[pyo3(get)]
    pub timestamp: String,
    #[pyo3(get)]
    pub ticks: i64,
    #[pyo3(get)]
    pub open: f64,
    #[pyo3(get)]
    pub high: f64,
    #[pyo3(get)]
    pub low: f64,
    #[pyo3(get)]
    pub close: f64,
    #[pyo3(get)]
    pub volume: u64,
}

#[pymethods]
impl Bar {
    #[getter]
    fn range(&self) -> f64 {
        self.high - self.low
    }

    fn __repr__(&self) -> String {
        format!(
            "Bar(timestamp={}, o={}, h={}, l={}, c={}, volume={})",
            self.timestamp, self.open, self.high, self.low, self.close, self.volume
        )
    }
}

impl TryFrom<RustBar> for Bar {
    type Error = RustError;

    fn try_from(b: RustBar) -> Result<Self, Self::Error> {
        Ok(Bar {
            timestamp: b.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            ticks: datetime_to_ticks(b.timestamp)?,
            open: b.open.into_inner(),
            high: b.high.into_inner(),
            low: b.low.into_inner(),
            close: b.close.into_inner(),
            volume: b.volume,
        })
    }
}

// ============================================================================
// Decoding
// ============================================================================

fn decode_records(format: Format, data: &[u8]) -> Result<Vec<Record>, RustError> {
    decode(format, data)?.collect()
}

fn ticks_from(format: Format, data: &[u8]) -> PyResult<Vec<Tick>> {
    decode_records(format, data)
        .and_then(|records| {
            records
                .into_iter()
                .filter_map(|r| r.as_tick().copied())
                .map(Tick::try_from)
                .collect()
        })
        .map_err(to_py_err)
}

/// Decode an NCD tick file held in memory.
#[pyfunction]
fn decode_ncd_ticks(data: &[u8]) -> PyResult<Vec<Tick>> {
    ticks_from(Format::NcdTick, data)
}

/// Decode an NCD minute file held in memory.
#[pyfunction]
fn decode_ncd_bars(data: &[u8]) -> PyResult<Vec<Bar>> {
    decode_records(Format::NcdMinute, data)
        .and_then(|records| {
            records
                .into_iter()
                .filter_map(|r| r.as_bar().copied())
                .map(Bar::try_from)
                .collect()
        })
        .map_err(to_py_err)
}

/// Decode a legacy NTD tick file held in memory.
#[pyfunction]
fn decode_ntd_ticks(data: &[u8]) -> PyResult<Vec<Tick>> {
    ticks_from(Format::NtdTick, data)
}

/// Read and decode a file. `format` is one of `ncd-tick`, `ncd-minute`, `ntd-tick`.
#[pyfunction]
fn read_file(py: Python<'_>, path: &str, format: &str) -> PyResult<Vec<PyObject>> {
    let format: Format = format.parse().map_err(to_py_err)?;
    let bytes = read_source(path).map_err(to_py_err)?;
    let records = decode_records(format, &bytes).map_err(to_py_err)?;

    records
        .into_iter()
        .map(|record| match record {
            Record::Tick(t) => Ok(Tick::try_from(t).map_err(to_py_err)?.into_py(py)),
            Record::Bar(b) => Ok(Bar::try_from(b).map_err(to_py_err)?.into_py(py)),
        })
        .collect()
}

/// Install a stderr log subscriber. `RUST_LOG` overrides `level` when set.
#[pyfunction]
#[pyo3(signature = (level = None))]
fn init_logging(level: Option<&str>) -> PyResult<()> {
    let level = level
        .map(str::to_string)
        .unwrap_or_else(|| LoggingConfig::default().level);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .map_err(|e| PyRuntimeError::new_err(format!("Failed to init logging: {e}")))
}

// ============================================================================
// Module Definition
// ============================================================================

/// NinjaTrader NCD/NTD archive reader.
#[pymodule]
fn ntd_reader(m: &Bound<'_, PyModule>) -> PyResult<()> {
    // Types
    m.add_class::<Tick>()?;
    m.add_class::<Bar>()?;

    // Functions
    m.add_function(wrap_pyfunction!(decode_ncd_ticks, m)?)?;
    m.add_function(wrap_pyfunction!(decode_ncd_bars, m)?)?;
    m.add_function(wrap_pyfunction!(decode_ntd_ticks, m)?)?;
    m.add_function(wrap_pyfunction!(read_file, m)?)?;
    m.add_function(wrap_pyfunction!(init_logging, m)?)?;

    Ok(())
}
