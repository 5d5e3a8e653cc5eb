//! Audio Graph Traits
//!
//! Defines the interface every audio graph backend must provide, and the
//! realtime hook the graph calls once per period.

use crate::error::PlatformError;
use crate::natural::PortSet;

/// Handle of a locally registered sink (input) port
pub type SinkId = usize;

/// Outcome of one realtime period, reported back to the graph
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackStatus {
    /// Keep calling
    Continue,
    /// The period failed; the graph decides what happens next
    Failed,
}

/// Buffers available during one realtime period
pub trait PeriodBuffers {
    /// Frames in this period
    fn frames(&self) -> usize;

    /// Sample rate the graph is running at
    fn sample_rate(&self) -> u32;

    /// Samples received on a sink this period
    ///
    /// Unknown sinks read as an empty slice.
    fn sink(&self, sink: SinkId) -> &[f32];
}

/// Realtime hook invoked by the graph once per period
///
/// # Real-time Safety
///
/// Called on the graph's realtime thread. Must not block or allocate in
/// steady state.
pub trait PeriodHandler: Send + 'static {
    fn on_period(&mut self, period: &dyn PeriodBuffers) -> CallbackStatus;
}

/// Trait for audio graph backends
///
/// A backend owns its client connection; dropping the backend releases it.
/// Sinks must be registered before `activate` and unregistered after
/// `deactivate`; connections need an active client.
pub trait AudioGraph {
    /// Client name as registered with the graph (may differ from the one requested)
    fn name(&self) -> &str;

    /// Current sample rate in Hz
    fn sample_rate(&self) -> u32;

    /// Current period size in frames (advisory; periods may differ)
    fn buffer_size(&self) -> u32;

    /// Audio output ports, naturally ordered
    ///
    /// An empty `filter` lists every port; otherwise ports matching any of
    /// the patterns are collected. With `connected_only`, ports without a
    /// connection are skipped.
    fn output_ports(&self, filter: &[String], connected_only: bool) -> Result<PortSet, PlatformError>;

    /// Whether a port with this full name exists
    fn has_port(&self, port: &str) -> bool;

    /// Register a local sink port and return its handle
    fn register_sink(&mut self, name: &str) -> Result<SinkId, PlatformError>;

    /// Release a local sink port
    fn unregister_sink(&mut self, sink: SinkId) -> Result<(), PlatformError>;

    /// Full name of a registered sink (e.g. "jackmeter:in_0")
    fn sink_name(&self, sink: SinkId) -> Option<String>;

    /// Connect an external source port to a local sink
    fn connect(&mut self, source: &str, sink: SinkId) -> Result<(), PlatformError>;

    /// Remove a connection made with `connect`
    fn disconnect(&mut self, source: &str, sink: SinkId) -> Result<(), PlatformError>;

    /// Start invoking `handler` once per period
    fn activate(&mut self, handler: Box<dyn PeriodHandler>) -> Result<(), PlatformError>;

    /// Stop the realtime callback and hand the handler back
    fn deactivate(&mut self) -> Result<Option<Box<dyn PeriodHandler>>, PlatformError>;

    /// Whether the realtime callback is running
    fn is_active(&self) -> bool;
}
