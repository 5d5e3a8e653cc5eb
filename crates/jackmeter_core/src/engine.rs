//! Meter Engine - Main Entry Point
//!
//! The MeterEngine is the context object tying one audio graph client to a
//! set of probes and the meter handles the display polls.
//!
//! # Lifecycle
//!
//! ```text
//! new()    select ports, register one probe + sink per port
//! start()  activate the realtime callback, then connect sources
//! ...      display polls meters() and poll_event()
//! stop()   disconnect, deactivate, unregister (also runs on drop)
//! ```

use crossbeam_channel::{bounded, Receiver};
use tracing::info;

use jackmeter_dsp::Meter;
use jackmeter_platform::AudioGraph;

use crate::config::MeterConfig;
use crate::error::{EngineError, EngineResult};
use crate::message::Event;
use crate::registry::{Link, ProbeRegistry};

/// Events buffered between the realtime callback and the display
const EVENT_CAPACITY: usize = 64;

/// Resolve the configured port list against the graph
///
/// With pattern matching, every audio output port matching one of the
/// patterns (all of them when there are none) is collected in natural
/// order. Without it, the names are used verbatim and in the given order.
pub fn select_ports(graph: &dyn AudioGraph, config: &MeterConfig) -> EngineResult<Vec<String>> {
    if !config.pattern_matching {
        return Ok(config.ports.clone());
    }

    let ports = graph.output_ports(&config.ports, config.connected_only)?;
    Ok(ports.into_iter().map(|port| port.0).collect())
}

/// The meter engine controller
///
/// Lives on the display thread; the realtime callback only touches the
/// processors it was handed at `start()`.
pub struct MeterEngine {
    registry: ProbeRegistry,
    meters: Vec<Meter>,
    event_receiver: Receiver<Event>,
    config: MeterConfig,
}

impl MeterEngine {
    /// Register one probe per selected port on `graph`
    pub fn new(graph: Box<dyn AudioGraph>, config: MeterConfig) -> EngineResult<Self> {
        config.validate().map_err(EngineError::ConfigError)?;

        let ports = select_ports(graph.as_ref(), &config)?;
        if ports.is_empty() {
            return Err(EngineError::NoPortsSelected);
        }

        let (event_sender, event_receiver) = bounded::<Event>(EVENT_CAPACITY);
        let mut registry = ProbeRegistry::new(graph).with_events(event_sender);
        let mut meters = Vec::with_capacity(ports.len());

        for port in &ports {
            let (processor, meter) = config.processor.build(port);
            registry.add_probe(port, processor)?;
            meters.push(meter);
        }

        info!(
            "Metering {} port(s) on '{}' ({} Hz, {} frames)",
            ports.len(),
            registry.graph().name(),
            registry.graph().sample_rate(),
            registry.graph().buffer_size()
        );

        Ok(Self {
            registry,
            meters,
            event_receiver,
            config,
        })
    }

    /// Start metering
    ///
    /// Returns the number of probes whose source could be connected.
    pub fn start(&mut self) -> EngineResult<usize> {
        self.registry.activate()?;
        Ok(self.registry.connect())
    }

    /// Tear down every probe
    pub fn stop(&mut self) -> EngineResult<()> {
        self.registry.shutdown()
    }

    pub fn is_running(&self) -> bool {
        self.registry.is_active()
    }

    /// Reader handles, one per probe in registration order
    pub fn meters(&self) -> &[Meter] {
        &self.meters
    }

    pub fn links(&self) -> &[Link] {
        self.registry.links()
    }

    /// Get next event (non-blocking)
    pub fn poll_event(&self) -> Option<Event> {
        self.event_receiver.try_recv().ok()
    }

    /// Drain every pending event
    pub fn poll_events(&self) -> Vec<Event> {
        self.event_receiver.try_iter().collect()
    }

    pub fn sample_rate(&self) -> u32 {
        self.registry.graph().sample_rate()
    }

    /// Get current configuration
    pub fn config(&self) -> &MeterConfig {
        &self.config
    }
}
