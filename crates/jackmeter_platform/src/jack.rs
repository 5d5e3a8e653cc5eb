//! JACK Backend
//!
//! Wraps a JACK client. Input ports are owned by the backend while the client
//! is inactive and move into the process handler for as long as it is active.
//!
//! ```text
//! Inactive { Client, ports }  --activate-->   Active(AsyncClient<(), ProbeProcess>)
//!                             <--deactivate--
//! ```

use jack::{
    AsyncClient, AudioIn, Client, ClientOptions, ClientStatus, Control, Port, PortFlags,
    ProcessHandler, ProcessScope,
};
use tracing::{debug, info, warn};

use crate::error::PlatformError;
use crate::natural::{port_set, PortSet};
use crate::traits::{AudioGraph, CallbackStatus, PeriodBuffers, PeriodHandler, SinkId};

/// Port type JACK uses for mono float audio
const AUDIO_TYPE: &str = "32 bit float mono audio";

type Sinks = Vec<Option<Port<AudioIn>>>;

/// Realtime side: sinks plus the handler they feed
struct ProbeProcess {
    ports: Sinks,
    handler: Box<dyn PeriodHandler>,
}

struct JackPeriod<'a> {
    ports: &'a Sinks,
    scope: &'a ProcessScope,
    sample_rate: u32,
}

impl PeriodBuffers for JackPeriod<'_> {
    fn frames(&self) -> usize {
        self.scope.n_frames() as usize
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn sink(&self, sink: SinkId) -> &[f32] {
        match self.ports.get(sink) {
            Some(Some(port)) => port.as_slice(self.scope),
            _ => &[],
        }
    }
}

impl ProcessHandler for ProbeProcess {
    fn process(&mut self, client: &Client, scope: &ProcessScope) -> Control {
        let period = JackPeriod {
            ports: &self.ports,
            scope,
            sample_rate: client.sample_rate() as u32,
        };
        match self.handler.on_period(&period) {
            CallbackStatus::Continue => Control::Continue,
            CallbackStatus::Failed => Control::Quit,
        }
    }
}

enum ClientState {
    Inactive { client: Client, ports: Sinks },
    Active(AsyncClient<(), ProbeProcess>),
    /// Deactivation failed and took the client with it
    Closed,
}

/// Audio graph backed by a JACK server
pub struct JackGraph {
    name: String,
    state: ClientState,
    sink_names: Vec<Option<String>>,
}

impl JackGraph {
    /// Open a client on the default server
    pub fn open(client_name: &str) -> Result<Self, PlatformError> {
        let (client, status) =
            Client::new(client_name, ClientOptions::empty()).map_err(|e| PlatformError::ClientOpenFailed {
                name: client_name.to_string(),
                reason: e.to_string(),
            })?;

        if status.contains(ClientStatus::SERVER_STARTED) {
            warn!("JACK server started");
        }
        let name = client.name().to_string();
        if status.contains(ClientStatus::NAME_NOT_UNIQUE) {
            warn!("Unique name '{}' assigned", name);
        }
        info!(
            "Opened JACK client '{}' ({} Hz, {} frames)",
            name,
            client.sample_rate(),
            client.buffer_size()
        );

        Ok(Self {
            name,
            state: ClientState::Inactive {
                client,
                ports: Vec::new(),
            },
            sink_names: Vec::new(),
        })
    }

    fn client(&self) -> Result<&Client, PlatformError> {
        match &self.state {
            ClientState::Inactive { client, .. } => Ok(client),
            ClientState::Active(async_client) => Ok(async_client.as_client()),
            ClientState::Closed => Err(PlatformError::InvalidState("client is closed".into())),
        }
    }

    fn sink_port(&self, sink: SinkId) -> Result<&str, PlatformError> {
        self.sink_names
            .get(sink)
            .and_then(Option::as_deref)
            .ok_or(PlatformError::SinkNotFound(sink))
    }

    fn port_is_connected(client: &Client, port: &str) -> bool {
        client
            .port_by_name(port)
            .and_then(|p| p.connected_count().ok())
            .is_some_and(|count| count > 0)
    }
}

impl AudioGraph for JackGraph {
    fn name(&self) -> &str {
        &self.name
    }

    fn sample_rate(&self) -> u32 {
        self.client().map_or(0, |c| c.sample_rate() as u32)
    }

    fn buffer_size(&self) -> u32 {
        self.client().map_or(0, |c| c.buffer_size())
    }

    fn output_ports(&self, filter: &[String], connected_only: bool) -> Result<PortSet, PlatformError> {
        let client = self.client()?;
        let list = |pattern: Option<&str>| client.ports(pattern, Some(AUDIO_TYPE), PortFlags::IS_OUTPUT);

        let names: Vec<String> = if filter.is_empty() {
            list(None)
        } else {
            filter.iter().flat_map(|pattern| list(Some(pattern.as_str()))).collect()
        };

        Ok(port_set(
            names
                .into_iter()
                .filter(|port| !connected_only || Self::port_is_connected(client, port)),
        ))
    }

    fn has_port(&self, port: &str) -> bool {
        self.client()
            .map(|c| c.port_by_name(port).is_some())
            .unwrap_or(false)
    }

    fn register_sink(&mut self, name: &str) -> Result<SinkId, PlatformError> {
        let ClientState::Inactive { client, ports } = &mut self.state else {
            return Err(PlatformError::InvalidState(
                "cannot register ports while active".into(),
            ));
        };

        let failed = |reason: String| PlatformError::PortRegistrationFailed {
            name: name.to_string(),
            reason,
        };
        let port = client
            .register_port(name, AudioIn::default())
            .map_err(|e| failed(e.to_string()))?;
        let full_name = port.name().map_err(|e| failed(e.to_string()))?;

        debug!("Registered sink {}", full_name);
        ports.push(Some(port));
        self.sink_names.push(Some(full_name));
        Ok(self.sink_names.len() - 1)
    }

    fn unregister_sink(&mut self, sink: SinkId) -> Result<(), PlatformError> {
        let ClientState::Inactive { client, ports } = &mut self.state else {
            return Err(PlatformError::InvalidState(
                "cannot unregister ports while active".into(),
            ));
        };

        let port = ports
            .get_mut(sink)
            .and_then(Option::take)
            .ok_or(PlatformError::SinkNotFound(sink))?;
        let name = self.sink_names.get_mut(sink).and_then(Option::take);

        client
            .unregister_port(port)
            .map_err(|e| PlatformError::Internal(format!("unregistering {:?}: {}", name, e)))
    }

    fn sink_name(&self, sink: SinkId) -> Option<String> {
        self.sink_port(sink).ok().map(str::to_string)
    }

    fn connect(&mut self, source: &str, sink: SinkId) -> Result<(), PlatformError> {
        let sink_port = self.sink_port(sink)?;
        self.client()?
            .connect_ports_by_name(source, sink_port)
            .map_err(|e| PlatformError::ConnectionFailed {
                source_port: source.to_string(),
                sink_port: sink_port.to_string(),
                reason: e.to_string(),
            })
    }

    fn disconnect(&mut self, source: &str, sink: SinkId) -> Result<(), PlatformError> {
        let sink_port = self.sink_port(sink)?;
        self.client()?
            .disconnect_ports_by_name(source, sink_port)
            .map_err(|e| PlatformError::ConnectionFailed {
                source_port: source.to_string(),
                sink_port: sink_port.to_string(),
                reason: e.to_string(),
            })
    }

    fn activate(&mut self, handler: Box<dyn PeriodHandler>) -> Result<(), PlatformError> {
        match std::mem::replace(&mut self.state, ClientState::Closed) {
            ClientState::Inactive { client, ports } => {
                let process = ProbeProcess { ports, handler };
                let active = client
                    .activate_async((), process)
                    .map_err(|e| PlatformError::ActivationFailed {
                        name: self.name.clone(),
                        reason: e.to_string(),
                    })?;
                self.state = ClientState::Active(active);
                debug!("Activated JACK client '{}'", self.name);
                Ok(())
            }
            other => {
                self.state = other;
                Err(PlatformError::ActivationFailed {
                    name: self.name.clone(),
                    reason: "client is not inactive".into(),
                })
            }
        }
    }

    fn deactivate(&mut self) -> Result<Option<Box<dyn PeriodHandler>>, PlatformError> {
        match std::mem::replace(&mut self.state, ClientState::Closed) {
            ClientState::Active(active) => {
                let (client, (), process) = active
                    .deactivate()
                    .map_err(|e| PlatformError::Internal(format!("deactivating client: {}", e)))?;
                self.state = ClientState::Inactive {
                    client,
                    ports: process.ports,
                };
                debug!("Deactivated JACK client '{}'", self.name);
                Ok(Some(process.handler))
            }
            other => {
                self.state = other;
                Ok(None)
            }
        }
    }

    fn is_active(&self) -> bool {
        matches!(self.state, ClientState::Active(_))
    }
}
