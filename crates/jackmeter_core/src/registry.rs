//! Probe Registry and Realtime Dispatch
//!
//! A probe binds an external source port to a local sink port and a
//! processor. The registry owns the graph backend, keeps the probes in
//! registration order and hands their processors to a [`Dispatcher`] when
//! the realtime callback starts.
//!
//! ```text
//! Setup:     add_probe() ──▶ sink in_<k> registered, processor queued
//! Active:    activate()  ──▶ Dispatcher owns processors, graph calls it
//!            connect()   ──▶ source -> sink links (failures are skipped)
//! Teardown:  shutdown()  ──▶ disconnect all, deactivate, unregister all
//! ```

use crossbeam_channel::Sender;
use tracing::{debug, error, info, warn};

use jackmeter_dsp::{ProcessContext, Processor};
use jackmeter_platform::{AudioGraph, CallbackStatus, PeriodBuffers, PeriodHandler, SinkId};

use crate::error::{EngineError, EngineResult};
use crate::message::Event;

/// A registered source -> sink pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    /// External source port
    pub source: String,
    /// Local sink handle
    pub sink: SinkId,
    /// Full name of the local sink port
    pub sink_name: String,
    connected: bool,
}

impl Link {
    pub fn is_connected(&self) -> bool {
        self.connected
    }
}

/// Realtime half of the registry: every probe's processor, in order
pub struct Dispatcher {
    probes: Vec<(SinkId, Box<dyn Processor>)>,
    events: Option<Sender<Event>>,
}

impl Dispatcher {
    pub fn new(probes: Vec<(SinkId, Box<dyn Processor>)>, events: Option<Sender<Event>>) -> Self {
        Self { probes, events }
    }

    /// Hand one period to every processor in registration order
    ///
    /// The first failure aborts the rest of the period.
    pub fn dispatch(&mut self, period: &dyn PeriodBuffers) -> CallbackStatus {
        let context = ProcessContext::new(period.sample_rate());

        for (sink, processor) in self.probes.iter_mut() {
            if let Err(e) = processor.process(period.sink(*sink), &context) {
                error!("Processing '{}' failed: {}", processor.name(), e);
                if let Some(events) = &self.events {
                    let _ = events.try_send(Event::PeriodFailed {
                        probe: processor.name().to_string(),
                        message: e.to_string(),
                    });
                }
                return CallbackStatus::Failed;
            }
        }

        CallbackStatus::Continue
    }

    pub fn len(&self) -> usize {
        self.probes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.probes.is_empty()
    }
}

impl PeriodHandler for Dispatcher {
    fn on_period(&mut self, period: &dyn PeriodBuffers) -> CallbackStatus {
        self.dispatch(period)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Setup,
    Active,
    Closed,
}

/// Ordered probes plus the graph they live in
///
/// Dropping the registry runs [`ProbeRegistry::shutdown`] and then releases
/// the graph client.
pub struct ProbeRegistry {
    graph: Box<dyn AudioGraph>,
    links: Vec<Link>,
    processors: Vec<Box<dyn Processor>>,
    events: Option<Sender<Event>>,
    phase: Phase,
}

impl ProbeRegistry {
    pub fn new(graph: Box<dyn AudioGraph>) -> Self {
        Self {
            graph,
            links: Vec::new(),
            processors: Vec::new(),
            events: None,
            phase: Phase::Setup,
        }
    }

    /// Report connection failures and realtime errors on `events`
    pub fn with_events(mut self, events: Sender<Event>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn graph(&self) -> &dyn AudioGraph {
        self.graph.as_ref()
    }

    /// Probes in registration order
    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn is_active(&self) -> bool {
        self.phase == Phase::Active
    }

    /// Register a probe on `source`, creating local sink `in_<k>`
    ///
    /// The same source may be probed more than once.
    pub fn add_probe(&mut self, source: &str, processor: Box<dyn Processor>) -> EngineResult<SinkId> {
        match self.phase {
            Phase::Setup => {}
            Phase::Active => return Err(EngineError::AlreadyRunning),
            Phase::Closed => return Err(EngineError::NotRunning),
        }
        if !self.graph.has_port(source) {
            return Err(EngineError::PortNotFound(source.to_string()));
        }

        let local = format!("in_{}", self.links.len());
        let sink = self.graph.register_sink(&local)?;
        let sink_name = self
            .graph
            .sink_name(sink)
            .unwrap_or_else(|| format!("{}:{}", self.graph.name(), local));

        debug!("Probe {} -> {}", source, sink_name);
        self.links.push(Link {
            source: source.to_string(),
            sink,
            sink_name,
            connected: false,
        });
        self.processors.push(processor);
        Ok(sink)
    }

    /// Start the realtime callback
    pub fn activate(&mut self) -> EngineResult<()> {
        match self.phase {
            Phase::Setup => {}
            Phase::Active => return Err(EngineError::AlreadyRunning),
            Phase::Closed => return Err(EngineError::NotRunning),
        }

        let probes = self
            .links
            .iter()
            .map(|link| link.sink)
            .zip(self.processors.drain(..))
            .collect();
        let dispatcher = Dispatcher::new(probes, self.events.clone());

        // The processors went with the dispatcher, so a failed activation
        // leaves nothing to retry with.
        self.phase = Phase::Closed;
        self.graph.activate(Box::new(dispatcher))?;
        self.phase = Phase::Active;

        info!("Activated '{}' with {} probe(s)", self.graph.name(), self.links.len());
        self.send(Event::Activated);
        Ok(())
    }

    /// Connect every probe's source to its sink
    ///
    /// Failures are logged and reported as events; the remaining probes
    /// are still connected. Returns the number of connected probes.
    pub fn connect(&mut self) -> usize {
        let mut connected = 0;

        for index in 0..self.links.len() {
            let (source, sink) = (self.links[index].source.clone(), self.links[index].sink);
            if self.links[index].connected {
                connected += 1;
                continue;
            }

            match self.graph.connect(&source, sink) {
                Ok(()) => {
                    self.links[index].connected = true;
                    connected += 1;
                }
                Err(e) => {
                    let sink_name = self.links[index].sink_name.clone();
                    warn!("Can't connect ports {} -> {}: {}", source, sink_name, e);
                    self.send(Event::ConnectFailed {
                        source,
                        sink: sink_name,
                        message: e.to_string(),
                    });
                }
            }
        }

        connected
    }

    /// Disconnect every probe, stop the callback, release every sink
    ///
    /// Safe to call more than once. Every step runs even if an earlier one
    /// failed; the first failure is returned.
    pub fn shutdown(&mut self) -> EngineResult<()> {
        if self.phase == Phase::Closed && self.links.is_empty() {
            return Ok(());
        }

        let mut first_error: Option<EngineError> = None;
        let mut record = |result: Result<(), jackmeter_platform::PlatformError>, what: &str| {
            if let Err(e) = result {
                warn!("{} failed: {}", what, e);
                if first_error.is_none() {
                    first_error = Some(e.into());
                }
            }
        };

        for link in self.links.iter_mut().filter(|link| link.connected) {
            record(self.graph.disconnect(&link.source, link.sink), "Disconnect");
            link.connected = false;
        }

        if self.graph.is_active() {
            let stopped = self.graph.deactivate().map(|_| ());
            let ok = stopped.is_ok();
            record(stopped, "Deactivate");
            if ok {
                if let Some(events) = &self.events {
                    let _ = events.try_send(Event::Deactivated);
                }
            }
        }

        for link in self.links.drain(..) {
            record(self.graph.unregister_sink(link.sink), "Unregister");
        }

        self.processors.clear();
        self.phase = Phase::Closed;
        info!("Closed '{}'", self.graph.name());

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn send(&self, event: Event) {
        if let Some(events) = &self.events {
            let _ = events.try_send(event);
        }
    }
}

impl Drop for ProbeRegistry {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            warn!("Teardown incomplete: {}", e);
        }
    }
}
