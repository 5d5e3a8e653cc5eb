//! In-Process Audio Graph
//!
//! A self-contained graph backend with scripted source ports. Periods are
//! driven explicitly with [`MemoryGraph::run_period`], which makes the whole
//! realtime path reproducible without an audio server.
//!
//! `MemoryGraph` is a cheap cloneable handle: one clone can be boxed into the
//! engine while another keeps driving periods and inspecting links.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::error::PlatformError;
use crate::natural::{port_set, PortSet};
use crate::traits::{AudioGraph, CallbackStatus, PeriodBuffers, PeriodHandler, SinkId};

struct Source {
    name: String,
    signal: Vec<f32>,
    externally_connected: bool,
}

struct Sink {
    full_name: String,
    links: Vec<String>,
}

struct MemoryState {
    name: String,
    sample_rate: u32,
    buffer_size: u32,
    sources: Vec<Source>,
    sinks: Vec<Option<Sink>>,
    refused: HashSet<String>,
    handler: Option<Box<dyn PeriodHandler>>,
    buffers: Vec<Vec<f32>>,
    periods: u64,
}

impl MemoryState {
    fn source(&self, name: &str) -> Option<&Source> {
        self.sources.iter().find(|s| s.name == name)
    }

    fn sink(&self, sink: SinkId) -> Result<&Sink, PlatformError> {
        self.sinks
            .get(sink)
            .and_then(Option::as_ref)
            .ok_or(PlatformError::SinkNotFound(sink))
    }

    fn sink_mut(&mut self, sink: SinkId) -> Result<&mut Sink, PlatformError> {
        self.sinks
            .get_mut(sink)
            .and_then(Option::as_mut)
            .ok_or(PlatformError::SinkNotFound(sink))
    }

    fn is_connected(&self, source: &str) -> bool {
        self.sinks
            .iter()
            .flatten()
            .any(|sink| sink.links.iter().any(|l| l == source))
    }

    /// Mix every linked source into its sink buffer for one period
    fn fill_buffers(&mut self) {
        let frames = self.buffer_size as usize;
        self.buffers.resize_with(self.sinks.len(), Vec::new);

        for (slot, sink) in self.sinks.iter().enumerate() {
            let buffer = &mut self.buffers[slot];
            buffer.clear();
            buffer.resize(frames, 0.0);

            let Some(sink) = sink else { continue };
            for link in &sink.links {
                if let Some(source) = self.sources.iter().find(|s| &s.name == link) {
                    for (out, sample) in buffer.iter_mut().zip(&source.signal) {
                        *out += sample;
                    }
                }
            }
        }
    }
}

struct MemoryPeriod<'a> {
    frames: usize,
    sample_rate: u32,
    buffers: &'a [Vec<f32>],
}

impl PeriodBuffers for MemoryPeriod<'_> {
    fn frames(&self) -> usize {
        self.frames
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn sink(&self, sink: SinkId) -> &[f32] {
        self.buffers.get(sink).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// In-process audio graph backend
#[derive(Clone)]
pub struct MemoryGraph {
    name: Arc<str>,
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryGraph {
    pub fn new(name: &str, sample_rate: u32, buffer_size: u32) -> Self {
        Self {
            name: Arc::from(name),
            state: Arc::new(Mutex::new(MemoryState {
                name: name.to_string(),
                sample_rate,
                buffer_size,
                sources: Vec::new(),
                sinks: Vec::new(),
                refused: HashSet::new(),
                handler: None,
                buffers: Vec::new(),
                periods: 0,
            })),
        }
    }

    /// Add an output port owned by some other client
    pub fn add_source(&self, name: &str) {
        let mut state = self.state.lock();
        if state.source(name).is_none() {
            state.sources.push(Source {
                name: name.to_string(),
                signal: Vec::new(),
                externally_connected: false,
            });
        }
    }

    /// Mark a source as connected elsewhere in the graph
    pub fn mark_connected(&self, source: &str, connected: bool) {
        let mut state = self.state.lock();
        if let Some(s) = state.sources.iter_mut().find(|s| s.name == source) {
            s.externally_connected = connected;
        }
    }

    /// Samples a source emits every period (truncated or zero-padded to the period size)
    pub fn set_signal(&self, source: &str, signal: Vec<f32>) {
        let mut state = self.state.lock();
        if let Some(s) = state.sources.iter_mut().find(|s| s.name == source) {
            s.signal = signal;
        }
    }

    pub fn set_buffer_size(&self, frames: u32) {
        self.state.lock().buffer_size = frames;
    }

    pub fn set_sample_rate(&self, sample_rate: u32) {
        self.state.lock().sample_rate = sample_rate;
    }

    /// Make every later connection from `source` fail
    pub fn refuse_connection(&self, source: &str) {
        self.state.lock().refused.insert(source.to_string());
    }

    /// Run one realtime period
    ///
    /// Returns `None` when no handler is active.
    pub fn run_period(&self) -> Option<CallbackStatus> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        state.handler.as_ref()?;

        state.fill_buffers();
        state.periods += 1;

        let period = MemoryPeriod {
            frames: state.buffer_size as usize,
            sample_rate: state.sample_rate,
            buffers: &state.buffers,
        };
        state.handler.as_mut().map(|handler| handler.on_period(&period))
    }

    /// Periods run since creation
    pub fn periods(&self) -> u64 {
        self.state.lock().periods
    }

    /// Current connections as `(source, sink)` full names
    pub fn links(&self) -> Vec<(String, String)> {
        let state = self.state.lock();
        state
            .sinks
            .iter()
            .flatten()
            .flat_map(|sink| {
                sink.links
                    .iter()
                    .map(move |source| (source.clone(), sink.full_name.clone()))
            })
            .collect()
    }

    /// Full names of every registered sink
    pub fn sinks(&self) -> Vec<String> {
        let state = self.state.lock();
        state
            .sinks
            .iter()
            .flatten()
            .map(|sink| sink.full_name.clone())
            .collect()
    }
}

impl AudioGraph for MemoryGraph {
    fn name(&self) -> &str {
        &self.name
    }

    fn sample_rate(&self) -> u32 {
        self.state.lock().sample_rate
    }

    fn buffer_size(&self) -> u32 {
        self.state.lock().buffer_size
    }

    fn output_ports(&self, filter: &[String], connected_only: bool) -> Result<PortSet, PlatformError> {
        let state = self.state.lock();
        let matches = |name: &str| filter.is_empty() || filter.iter().any(|p| name.contains(p.as_str()));

        Ok(port_set(
            state
                .sources
                .iter()
                .filter(|s| matches(&s.name))
                .filter(|s| !connected_only || s.externally_connected || state.is_connected(&s.name))
                .map(|s| s.name.clone()),
        ))
    }

    fn has_port(&self, port: &str) -> bool {
        let state = self.state.lock();
        state.source(port).is_some() || state.sinks.iter().flatten().any(|s| s.full_name == port)
    }

    fn register_sink(&mut self, name: &str) -> Result<SinkId, PlatformError> {
        let mut state = self.state.lock();
        if state.handler.is_some() {
            return Err(PlatformError::InvalidState(
                "cannot register ports while active".into(),
            ));
        }

        let full_name = format!("{}:{}", state.name, name);
        if state.sinks.iter().flatten().any(|s| s.full_name == full_name) {
            return Err(PlatformError::PortRegistrationFailed {
                name: full_name,
                reason: "port name already in use".into(),
            });
        }

        debug!("Registered sink {}", full_name);
        state.sinks.push(Some(Sink {
            full_name,
            links: Vec::new(),
        }));
        Ok(state.sinks.len() - 1)
    }

    fn unregister_sink(&mut self, sink: SinkId) -> Result<(), PlatformError> {
        let mut state = self.state.lock();
        if state.handler.is_some() {
            return Err(PlatformError::InvalidState(
                "cannot unregister ports while active".into(),
            ));
        }
        state.sink(sink)?;
        state.sinks[sink] = None;
        Ok(())
    }

    fn sink_name(&self, sink: SinkId) -> Option<String> {
        let state = self.state.lock();
        state.sink(sink).ok().map(|s| s.full_name.clone())
    }

    fn connect(&mut self, source: &str, sink: SinkId) -> Result<(), PlatformError> {
        let mut state = self.state.lock();
        let sink_port = state.sink(sink)?.full_name.clone();
        let failed = |reason: &str| PlatformError::ConnectionFailed {
            source_port: source.to_string(),
            sink_port: sink_port.clone(),
            reason: reason.to_string(),
        };

        if state.handler.is_none() {
            return Err(failed("client is not active"));
        }
        if state.source(source).is_none() {
            return Err(failed("no such port"));
        }
        if state.refused.contains(source) {
            return Err(failed("connection refused"));
        }

        let links = &mut state.sink_mut(sink)?.links;
        if links.iter().any(|l| l == source) {
            return Err(failed("already connected"));
        }
        links.push(source.to_string());
        Ok(())
    }

    fn disconnect(&mut self, source: &str, sink: SinkId) -> Result<(), PlatformError> {
        let mut state = self.state.lock();
        let target = state.sink_mut(sink)?;
        match target.links.iter().position(|l| l == source) {
            Some(index) => {
                target.links.remove(index);
                Ok(())
            }
            None => Err(PlatformError::ConnectionFailed {
                source_port: source.to_string(),
                sink_port: target.full_name.clone(),
                reason: "not connected".into(),
            }),
        }
    }

    fn activate(&mut self, handler: Box<dyn PeriodHandler>) -> Result<(), PlatformError> {
        let mut state = self.state.lock();
        if state.handler.is_some() {
            return Err(PlatformError::ActivationFailed {
                name: state.name.clone(),
                reason: "already active".into(),
            });
        }
        state.handler = Some(handler);
        Ok(())
    }

    fn deactivate(&mut self) -> Result<Option<Box<dyn PeriodHandler>>, PlatformError> {
        Ok(self.state.lock().handler.take())
    }

    fn is_active(&self) -> bool {
        self.state.lock().handler.is_some()
    }
}
