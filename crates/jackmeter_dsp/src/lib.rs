//! jackmeter DSP - Probe Processors
//!
//! This crate provides the processors that run inside the audio graph's
//! realtime callback, including:
//! - A single `Processor` trait with an always-present sample rate
//! - Peak level tracking (latest/min/max, signal detection)
//! - FFT spectrum in half-complex layout, windowed to 20 Hz - 20 kHz
//! - Column mapping and bucket classification for spectrum display
//!
//! # Architecture
//!
//! Every processor is split in two: the realtime half implements
//! `Processor` and is owned by exactly one probe, while a cloneable meter
//! handle (`PeakMeter`, `SpectrumMeter`) lets the display thread read the
//! published results without locking.

pub mod display;
mod error;
mod peak;
mod processor;
mod spectrum;

pub use display::{Bucket, Glyphs, BUCKET_COUNT};
pub use error::DspError;
pub use peak::{amplitude_to_db, PeakMeter, PeakProcessor, PeakState};
pub use processor::{Meter, ProcessContext, Processor};
pub use spectrum::{
    spectrum_window, SpectralSnapshot, SpectrumMeter, SpectrumProcessor, SPECTRUM_FREQ_END,
    SPECTRUM_FREQ_START,
};
