//! Processor Trait
//!
//! Defines the single capability every probe processor implements, and the
//! tagged reader handle the display uses to look at a processor's results.

use crate::error::DspError;
use crate::peak::PeakMeter;
use crate::spectrum::SpectrumMeter;

/// Context passed to processors containing period metadata
///
/// The frame count is the length of the sample slice handed to `process`,
/// so only the sample rate travels here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessContext {
    pub sample_rate: u32,
}

impl ProcessContext {
    pub fn new(sample_rate: u32) -> Self {
        Self { sample_rate }
    }
}

/// Trait for processors attached to a probe
///
/// # Real-time Safety Contract
///
/// `process()` runs inside the audio graph's realtime callback:
/// - NO heap allocations in steady state (same frame count as last call)
/// - NO syscalls (no file I/O, no locks shared with the display thread)
/// - O(n) or O(n log n) in the number of frames
///
/// Failures are reported through the returned `Result`; the dispatcher
/// aborts the current period on the first error.
pub trait Processor: Send {
    /// Consume one period of mono samples
    fn process(&mut self, samples: &[f32], context: &ProcessContext) -> Result<(), DspError>;

    /// Name of the source this processor is listening to
    fn name(&self) -> &str;
}

/// Reader-side handle onto a processor's published state
///
/// Cheap to clone; safe to poll from any thread while the realtime
/// callback keeps processing.
#[derive(Debug, Clone)]
pub enum Meter {
    Peak(PeakMeter),
    Spectrum(SpectrumMeter),
}

impl Meter {
    pub fn name(&self) -> &str {
        match self {
            Meter::Peak(meter) => meter.name(),
            Meter::Spectrum(meter) => meter.name(),
        }
    }

    pub fn signal_detected(&self) -> bool {
        match self {
            Meter::Peak(meter) => meter.signal_detected(),
            Meter::Spectrum(meter) => meter.signal_detected(),
        }
    }

    pub fn as_peak(&self) -> Option<&PeakMeter> {
        match self {
            Meter::Peak(meter) => Some(meter),
            Meter::Spectrum(_) => None,
        }
    }

    pub fn as_spectrum(&self) -> Option<&SpectrumMeter> {
        match self {
            Meter::Spectrum(meter) => Some(meter),
            Meter::Peak(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PeakProcessor, SpectrumProcessor};

    /// Test processor that always fails (for exercising error paths)
    struct FailingProcessor;

    impl Processor for FailingProcessor {
        fn process(&mut self, _samples: &[f32], _context: &ProcessContext) -> Result<(), DspError> {
            Err(DspError::ProcessingFailed {
                name: self.name().to_string(),
                reason: "always fails".into(),
            })
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    #[test]
    fn test_process_context() {
        let ctx = ProcessContext::new(48000);
        assert_eq!(ctx.sample_rate, 48000);
    }

    #[test]
    fn test_trait_objects() {
        let mut processors: Vec<Box<dyn Processor>> = vec![
            Box::new(PeakProcessor::new("a")),
            Box::new(SpectrumProcessor::new("b")),
            Box::new(FailingProcessor),
        ];
        let ctx = ProcessContext::new(48000);
        let samples = [0.25_f32; 64];

        assert!(processors[0].process(&samples, &ctx).is_ok());
        assert!(processors[1].process(&samples, &ctx).is_ok());
        assert!(processors[2].process(&samples, &ctx).is_err());
        assert_eq!(processors[0].name(), "a");
    }

    #[test]
    fn test_meter_variants() {
        let peak = PeakProcessor::new("left");
        let spectrum = SpectrumProcessor::new("right");

        let peak_meter = Meter::Peak(peak.meter());
        let spectrum_meter = Meter::Spectrum(spectrum.meter());

        assert_eq!(peak_meter.name(), "left");
        assert_eq!(spectrum_meter.name(), "right");
        assert!(peak_meter.as_peak().is_some());
        assert!(peak_meter.as_spectrum().is_none());
        assert!(spectrum_meter.as_spectrum().is_some());
        assert!(!spectrum_meter.signal_detected());
    }
}
