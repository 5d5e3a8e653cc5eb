//! jackmeter Core - Meter Engine
//!
//! This crate ties the probe processors to an audio graph, including:
//! - Port selection (patterns, connected-only, or verbatim names)
//! - Probe registration with one local sink per probe
//! - Realtime dispatch of each period to every processor, in order
//! - Orderly teardown on every exit path
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Display Thread                         │
//! │   MeterEngine ──meters()──▶ PeakMeter / SpectrumMeter       │
//! │        ▲                        (atomics, ArcSwap)          │
//! │        └──────events── crossbeam-channel                    │
//! └─────────────────────────────────────────────────────────────┘
//!                              ▲
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Realtime Callback                       │
//! │   AudioGraph ──period──▶ Dispatcher ──▶ Processor (each)    │
//! │              (no locks, no steady-state allocation)         │
//! └─────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod engine;
mod error;
mod message;
mod registry;

pub use config::{DisplayConfig, MeterConfig, ProcessorKind};
pub use engine::{select_ports, MeterEngine};
pub use error::{EngineError, EngineResult};
pub use message::Event;
pub use registry::{Dispatcher, Link, ProbeRegistry};

// Re-export the types the display needs
pub use jackmeter_dsp::{Meter, PeakMeter, SpectralSnapshot, SpectrumMeter};
