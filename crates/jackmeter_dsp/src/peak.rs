//! Peak Level Processor
//!
//! Tracks the latest, minimum and maximum absolute amplitude seen on a probe.
//!
//! # Thread Safety
//!
//! Every field is an independent atomic. A reader sees a recent value for
//! each field, but two fields read one after the other may come from
//! different periods; there is no joint snapshot.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use crate::error::DspError;
use crate::processor::{ProcessContext, Processor};

/// Convert a linear amplitude to decibels
///
/// A value of `0.0` yields `f32::NEG_INFINITY`; callers render it as "-inf".
#[inline]
pub fn amplitude_to_db(value: f32) -> f32 {
    20.0 * value.log10()
}

/// Peak state shared between the realtime processor and its meters
///
/// Rust pattern: AtomicF32 doesn't exist, so floats are stored as bits.
#[derive(Debug)]
struct PeakShared {
    name: String,
    latest_bits: AtomicU32,
    min_bits: AtomicU32,
    max_bits: AtomicU32,
    signal_detected: AtomicBool,
}

impl PeakShared {
    fn new(name: String) -> Self {
        Self {
            name,
            latest_bits: AtomicU32::new(0.0_f32.to_bits()),
            min_bits: AtomicU32::new(0.0_f32.to_bits()),
            max_bits: AtomicU32::new(0.0_f32.to_bits()),
            signal_detected: AtomicBool::new(false),
        }
    }

    #[inline]
    fn load(bits: &AtomicU32) -> f32 {
        f32::from_bits(bits.load(Ordering::Relaxed))
    }

    #[inline]
    fn store(bits: &AtomicU32, value: f32) {
        bits.store(value.to_bits(), Ordering::Relaxed);
    }
}

/// Point-in-time copy of the peak fields
///
/// Each field is read atomically on its own; see the module docs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeakState {
    pub latest_peak: f32,
    pub min_peak: f32,
    pub max_peak: f32,
    pub signal_detected: bool,
}

/// Realtime half of the peak meter
pub struct PeakProcessor {
    shared: Arc<PeakShared>,
}

impl PeakProcessor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            shared: Arc::new(PeakShared::new(name.into())),
        }
    }

    /// Reader handle for the display thread
    pub fn meter(&self) -> PeakMeter {
        PeakMeter {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Update the peak fields from one buffer
    ///
    /// `min_peak` is seeded by the first peak that raises the running max
    /// once signal appears, never by the initial zero.
    pub fn process_samples(&mut self, samples: &[f32]) {
        let buffer_peak = samples
            .iter()
            .fold(0.0_f32, |peak, sample| peak.max(sample.abs()));

        let shared = &self.shared;
        PeakShared::store(&shared.latest_bits, buffer_peak);

        if buffer_peak > PeakShared::load(&shared.max_bits) {
            PeakShared::store(&shared.max_bits, buffer_peak);
            if !shared.signal_detected.load(Ordering::Relaxed) {
                PeakShared::store(&shared.min_bits, buffer_peak);
                shared.signal_detected.store(true, Ordering::Relaxed);
            }
        }

        if buffer_peak < PeakShared::load(&shared.min_bits) {
            PeakShared::store(&shared.min_bits, buffer_peak);
        }
    }
}

impl Processor for PeakProcessor {
    fn process(&mut self, samples: &[f32], _context: &ProcessContext) -> Result<(), DspError> {
        self.process_samples(samples);
        Ok(())
    }

    fn name(&self) -> &str {
        &self.shared.name
    }
}

/// Display-side view of a [`PeakProcessor`]
#[derive(Debug, Clone)]
pub struct PeakMeter {
    shared: Arc<PeakShared>,
}

impl PeakMeter {
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn signal_detected(&self) -> bool {
        self.shared.signal_detected.load(Ordering::Relaxed)
    }

    pub fn latest_peak(&self) -> f32 {
        PeakShared::load(&self.shared.latest_bits)
    }

    pub fn min_peak(&self) -> f32 {
        PeakShared::load(&self.shared.min_bits)
    }

    pub fn max_peak(&self) -> f32 {
        PeakShared::load(&self.shared.max_bits)
    }

    pub fn latest_peak_db(&self) -> f32 {
        amplitude_to_db(self.latest_peak())
    }

    pub fn min_peak_db(&self) -> f32 {
        amplitude_to_db(self.min_peak())
    }

    pub fn max_peak_db(&self) -> f32 {
        amplitude_to_db(self.max_peak())
    }

    pub fn state(&self) -> PeakState {
        PeakState {
            latest_peak: self.latest_peak(),
            min_peak: self.min_peak(),
            max_peak: self.max_peak(),
            signal_detected: self.signal_detected(),
        }
    }
}
