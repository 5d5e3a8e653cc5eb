//! FFT Spectrum Processor
//!
//! Runs a real-to-half-complex FFT over every period a probe receives and
//! publishes the result for the display thread.
//!
//! # Architecture
//!
//! The realtime half (`SpectrumProcessor`) owns the FFT plan and the working
//! buffers. Both are sized for the current frame count and only rebuilt when
//! the audio graph changes its period size.
//!
//! Each period is written into a private `SpectralSnapshot` and published
//! with a single atomic pointer swap. The display half (`SpectrumMeter`)
//! always sees a complete snapshot from some earlier period, never one that
//! is being written. The snapshot swapped out is kept as the next write
//! target, so steady-state processing does not allocate as long as the
//! reader has let go of it.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use rustfft::{num_complex::Complex, Fft, FftPlanner};

use crate::error::DspError;
use crate::processor::{ProcessContext, Processor};

/// Lower bound of the displayed spectrum (Hz)
pub const SPECTRUM_FREQ_START: f64 = 20.0;

/// Upper bound of the displayed spectrum (Hz)
pub const SPECTRUM_FREQ_END: f64 = 20000.0;

/// Result of one period's transform
///
/// `output` uses the half-complex layout: `output[k]` holds the real part of
/// bin `k` for `0 <= k <= n/2`, and `output[n - k]` holds its imaginary part
/// for `0 < k < n - k`.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectralSnapshot {
    /// Samples of the period, widened to f64
    pub input: Vec<f64>,
    /// Transformed samples in half-complex layout
    pub output: Vec<f64>,
    /// First bin at or above 20 Hz
    pub start_index: usize,
    /// Number of bins from `start_index` up to 20 kHz (or Nyquist)
    pub bin_count: usize,
    /// Sample rate of the period this snapshot was computed from
    pub sample_rate: u32,
}

impl SpectralSnapshot {
    fn with_frames(frames: usize) -> Self {
        Self {
            input: vec![0.0; frames],
            output: vec![0.0; frames],
            start_index: 0,
            bin_count: 0,
            sample_rate: 0,
        }
    }

    /// Frame count of the period this snapshot was computed from
    pub fn frames(&self) -> usize {
        self.input.len()
    }

    /// Real parts of the bins inside the audible window
    pub fn audible_bins(&self) -> &[f64] {
        let start = self.start_index.min(self.output.len());
        let end = (self.start_index + self.bin_count).min(self.output.len());
        &self.output[start..end]
    }
}

/// Compute `(start_index, bin_count)` of the 20 Hz - 20 kHz window
///
/// Derived only from this period's frame count and sample rate. The bin
/// count is clipped to the usable half of the transform and never negative.
pub fn spectrum_window(frames: usize, sample_rate: u32) -> (usize, usize) {
    if sample_rate == 0 {
        return (0, 0);
    }

    // 640 / 48000 = 0.0133; * 20 = 0.27 -> 1; * 20000 = 266.7 -> 267; 267 - 1 = 266
    let sample_ratio = frames as f64 / f64::from(sample_rate);
    let start_index = (sample_ratio * SPECTRUM_FREQ_START).ceil();
    let end_index = (sample_ratio * SPECTRUM_FREQ_END)
        .ceil()
        .min((frames / 2) as f64)
        .floor();
    let bin_count = (end_index - start_index).max(0.0);

    (start_index as usize, bin_count as usize)
}

/// Pack a full complex spectrum of real input into half-complex layout
fn pack_half_complex(spectrum: &[Complex<f64>], output: &mut [f64]) {
    let n = spectrum.len();
    if n == 0 {
        return;
    }

    for k in 0..=n / 2 {
        output[k] = spectrum[k].re;
    }
    for k in 1..(n + 1) / 2 {
        output[n - k] = spectrum[k].im;
    }
}

struct SpectrumShared {
    name: String,
    snapshot: ArcSwapOption<SpectralSnapshot>,
    /// Reserved; the spectral path does not apply a detection threshold
    signal_detected: AtomicBool,
}

/// Realtime half of the spectrum meter
pub struct SpectrumProcessor {
    shared: Arc<SpectrumShared>,
    /// Plan for the current frame count (None when there are no frames)
    fft: Option<Arc<dyn Fft<f64>>>,
    frames: usize,
    /// Working buffer for the in-place transform
    buffer: Vec<Complex<f64>>,
    /// Scratch space so the transform never allocates
    scratch: Vec<Complex<f64>>,
    /// Snapshot swapped out on the last publish; reused as the next target
    spare: Option<Arc<SpectralSnapshot>>,
}

impl SpectrumProcessor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            shared: Arc::new(SpectrumShared {
                name: name.into(),
                snapshot: ArcSwapOption::from(None),
                signal_detected: AtomicBool::new(false),
            }),
            fft: None,
            frames: 0,
            buffer: Vec::new(),
            scratch: Vec::new(),
            spare: None,
        }
    }

    /// Reader handle for the display thread
    pub fn meter(&self) -> SpectrumMeter {
        SpectrumMeter {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Rebuild the plan and working buffers for a new period size
    ///
    /// Note: This allocates. It only runs when the frame count changes.
    fn resize(&mut self, frames: usize) {
        if frames == 0 {
            self.fft = None;
            self.buffer.clear();
            self.scratch.clear();
        } else {
            let fft = FftPlanner::<f64>::new().plan_fft_forward(frames);
            self.buffer = vec![Complex::new(0.0, 0.0); frames];
            self.scratch = vec![Complex::new(0.0, 0.0); fft.get_inplace_scratch_len()];
            self.fft = Some(fft);
        }
        self.frames = frames;
        self.spare = None;
    }
}

impl Processor for SpectrumProcessor {
    fn process(&mut self, samples: &[f32], context: &ProcessContext) -> Result<(), DspError> {
        if context.sample_rate == 0 {
            return Err(DspError::InvalidSampleRate(context.sample_rate));
        }

        let frames = samples.len();
        if frames != self.frames {
            self.resize(frames);
        }

        let (start_index, bin_count) = spectrum_window(frames, context.sample_rate);

        // Reuse the previously published snapshot when nobody is reading it;
        // make_mut only copies if the display still holds a reference.
        let mut snapshot = self
            .spare
            .take()
            .filter(|spare| spare.frames() == frames)
            .unwrap_or_else(|| Arc::new(SpectralSnapshot::with_frames(frames)));

        {
            let target = Arc::make_mut(&mut snapshot);
            target.start_index = start_index;
            target.bin_count = bin_count;
            target.sample_rate = context.sample_rate;

            for (dst, &src) in target.input.iter_mut().zip(samples) {
                *dst = f64::from(src);
            }

            if let Some(fft) = &self.fft {
                for (dst, &src) in self.buffer.iter_mut().zip(&target.input) {
                    *dst = Complex::new(src, 0.0);
                }
                fft.process_with_scratch(&mut self.buffer, &mut self.scratch);
                pack_half_complex(&self.buffer, &mut target.output);
            }
        }

        self.spare = self.shared.snapshot.swap(Some(snapshot));
        Ok(())
    }

    fn name(&self) -> &str {
        &self.shared.name
    }
}

/// Display-side view of a [`SpectrumProcessor`]
#[derive(Clone)]
pub struct SpectrumMeter {
    shared: Arc<SpectrumShared>,
}

impl SpectrumMeter {
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Always false for the spectral variant
    pub fn signal_detected(&self) -> bool {
        self.shared.signal_detected.load(Ordering::Relaxed)
    }

    /// Latest published snapshot
    ///
    /// Fails with [`DspError::Uninitialized`] until the first period has
    /// been processed.
    pub fn spectrum(&self) -> Result<Arc<SpectralSnapshot>, DspError> {
        self.shared
            .snapshot
            .load_full()
            .ok_or_else(|| DspError::Uninitialized(self.shared.name.clone()))
    }
}

impl fmt::Debug for SpectrumMeter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpectrumMeter")
            .field("name", &self.shared.name)
            .finish_non_exhaustive()
    }
}
