//! Meter and Display Configuration

use serde::{Deserialize, Serialize};

use jackmeter_dsp::{Meter, PeakProcessor, Processor, SpectrumProcessor};

/// Which processor each probe runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessorKind {
    /// Latest/min/max peak level
    Peak,
    /// FFT spectrum windowed to the audible range
    #[default]
    Spectrum,
}

impl ProcessorKind {
    /// Build a processor for `name` together with its reader handle
    pub fn build(self, name: &str) -> (Box<dyn Processor>, Meter) {
        match self {
            ProcessorKind::Peak => {
                let processor = PeakProcessor::new(name);
                let meter = Meter::Peak(processor.meter());
                (Box::new(processor), meter)
            }
            ProcessorKind::Spectrum => {
                let processor = SpectrumProcessor::new(name);
                let meter = Meter::Spectrum(processor.meter());
                (Box::new(processor), meter)
            }
        }
    }
}

/// How and for how long results are shown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Refreshes per second
    pub refresh_rate: u32,

    /// Stop after this many seconds
    pub duration_secs: Option<u64>,

    /// Stop after this many refreshes
    pub max_measurements: Option<u64>,

    /// Timestamped text lines instead of spectrum rows
    pub plain: bool,

    /// Spectrum row width in columns
    pub width: usize,

    /// Unicode block glyphs instead of ASCII
    pub blocks: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            refresh_rate: 8,
            duration_secs: None,
            max_measurements: None,
            plain: false,
            width: 100,
            blocks: false,
        }
    }
}

impl DisplayConfig {
    /// Pause between two refreshes
    pub fn interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(1.0 / self.refresh_rate.max(1) as f64)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.refresh_rate == 0 || self.refresh_rate > 1000 {
            return Err(format!("Invalid refresh rate: {}", self.refresh_rate));
        }
        if self.width == 0 || self.width > 1000 {
            return Err(format!("Invalid display width: {}", self.width));
        }
        if self.max_measurements == Some(0) {
            return Err("Measurement count must be at least 1".into());
        }
        Ok(())
    }
}

/// Overall meter configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeterConfig {
    /// Client name requested from the audio graph
    pub client_name: String,

    /// Port names, or patterns when `pattern_matching` is on
    pub ports: Vec<String>,

    /// Only meter ports that currently have connections
    pub connected_only: bool,

    /// Treat `ports` as patterns; otherwise use them verbatim, in order
    pub pattern_matching: bool,

    /// Processor attached to every probe
    pub processor: ProcessorKind,

    pub display: DisplayConfig,
}

impl Default for MeterConfig {
    fn default() -> Self {
        Self {
            client_name: "jackmeter".to_string(),
            ports: Vec::new(),
            connected_only: false,
            pattern_matching: true,
            processor: ProcessorKind::default(),
            display: DisplayConfig::default(),
        }
    }
}

impl MeterConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.client_name.is_empty() {
            return Err("Client name must not be empty".into());
        }
        if !self.pattern_matching && self.ports.is_empty() {
            return Err("Port names are required when pattern matching is off".into());
        }
        self.display.validate()
    }
}
