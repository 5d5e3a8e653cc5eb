//! jackmeter Platform - Audio Graph Backends
//!
//! This crate provides the audio graph connection layer:
//! - Output port discovery, naturally ordered
//! - Local sink registration and connection management
//! - Delivery of each realtime period to a [`PeriodHandler`]
//!
//! # Backends
//!
//! | Backend       | Feature | Use                                   |
//! |---------------|---------|---------------------------------------|
//! | `JackGraph`   | `jack`  | A running JACK server                 |
//! | `MemoryGraph` | always  | In-process graph for tests and benches |
//!
//! Each backend implements the [`AudioGraph`] trait, so the engine never
//! sees server specifics.

mod error;
mod traits;

pub mod memory;
pub mod natural;

#[cfg(feature = "jack")]
pub mod jack;

pub use error::PlatformError;
pub use memory::MemoryGraph;
pub use natural::{natural_cmp, natural_less, NaturalKey, PortSet};
pub use traits::{AudioGraph, CallbackStatus, PeriodBuffers, PeriodHandler, SinkId};

/// Open a client on the audio server this build supports
///
/// Returns a boxed trait object; the client is released when it is dropped.
pub fn open_graph(client_name: &str) -> Result<Box<dyn AudioGraph>, PlatformError> {
    #[cfg(feature = "jack")]
    {
        Ok(Box::new(jack::JackGraph::open(client_name)?))
    }

    #[cfg(not(feature = "jack"))]
    {
        Err(PlatformError::FeatureNotAvailable(format!(
            "cannot open '{}': built without the jack feature",
            client_name
        )))
    }
}

/// Check if this build can talk to a JACK server
pub fn supports_jack() -> bool {
    cfg!(feature = "jack")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_graph_without_server_support() {
        if supports_jack() {
            return;
        }
        match open_graph("jackmeter") {
            Err(PlatformError::FeatureNotAvailable(msg)) => assert!(msg.contains("jackmeter")),
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("expected FeatureNotAvailable"),
        }
    }

    #[test]
    fn test_memory_graph_as_trait_object() {
        let graph = MemoryGraph::new("meter", 44100, 256);
        graph.add_source("a:out_1");

        let boxed: Box<dyn AudioGraph> = Box::new(graph);
        assert_eq!(boxed.name(), "meter");
        assert_eq!(boxed.sample_rate(), 44100);
        assert_eq!(boxed.buffer_size(), 256);
        assert!(boxed.has_port("a:out_1"));
        assert!(!boxed.is_active());
    }
}
