//! jackmeter - realtime peak and spectrum meter for JACK output ports

mod display;

use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Context};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use jackmeter_core::{DisplayConfig, EngineError, Event, MeterConfig, MeterEngine, ProcessorKind};
use jackmeter_dsp::Glyphs;

#[derive(Parser, Debug)]
#[command(name = "jackmeter")]
#[command(version, about = "Realtime peak and spectrum meter for JACK ports", long_about = None)]
struct Cli {
    /// How often to update the meter per second
    #[arg(short = 'f', long = "freq", default_value_t = 8)]
    freq: u32,

    /// Stop after this many seconds (0 = run until interrupted)
    #[arg(short = 'd', long = "duration", value_name = "SECONDS")]
    duration: Option<u64>,

    /// Stop after this many measurements (0 = no limit)
    #[arg(short = 'n', long = "count", value_name = "MEASUREMENTS")]
    count: Option<u64>,

    /// Monitor only connected output ports
    #[arg(short = 'c', long = "connected")]
    connected: bool,

    /// Plain output: timestamped peak levels instead of a spectrum
    #[arg(short = 'p', long = "plain")]
    plain: bool,

    /// Don't do pattern matching and don't sort
    #[arg(short = 'x', long = "no-matching")]
    no_matching: bool,

    /// Spectrum width in columns
    #[arg(long, default_value_t = 100)]
    width: usize,

    /// Draw the spectrum with Unicode blocks
    #[arg(long)]
    blocks: bool,

    /// Client name to register with the server
    #[arg(long, default_value = "jackmeter")]
    client_name: String,

    /// Port(s) to monitor; partial matching with regex support. All ports when empty
    ports: Vec<String>,
}

impl Cli {
    fn config(&self) -> MeterConfig {
        MeterConfig {
            client_name: self.client_name.clone(),
            ports: self.ports.clone(),
            connected_only: self.connected,
            pattern_matching: !self.no_matching,
            processor: if self.plain {
                ProcessorKind::Peak
            } else {
                ProcessorKind::Spectrum
            },
            display: DisplayConfig {
                refresh_rate: self.freq,
                duration_secs: self.duration.filter(|&secs| secs > 0),
                max_measurements: self.count.filter(|&count| count > 0),
                plain: self.plain,
                width: self.width,
                blocks: self.blocks,
            },
        }
    }
}

/// Why the display loop ended
#[derive(Debug, PartialEq, Eq)]
enum StopReason {
    Requested,
    Elapsed,
    Counted,
    Failed(String),
}

/// Raise `stop` on ctrl-c or on any input from stdin
fn install_stop_triggers(stop: &Arc<AtomicBool>) -> anyhow::Result<()> {
    let flag = Arc::clone(stop);
    ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst))
        .context("installing ctrl-c handler")?;

    let flag = Arc::clone(stop);
    thread::Builder::new()
        .name("jackmeter-stdin".into())
        .spawn(move || {
            let mut byte = [0u8; 1];
            // EOF (closed or redirected stdin) does not stop metering
            if let Ok(1) = std::io::stdin().read(&mut byte) {
                flag.store(true, Ordering::SeqCst);
            }
        })
        .context("spawning stdin watcher")?;

    Ok(())
}

fn run_display<W: Write>(engine: &MeterEngine, stop: &AtomicBool, out: &mut W) -> anyhow::Result<StopReason> {
    let settings = &engine.config().display;
    let glyphs = if settings.blocks { Glyphs::Blocks } else { Glyphs::Ascii };
    let deadline = settings
        .duration_secs
        .map(|secs| Instant::now() + Duration::from_secs(secs));
    let mut measurement: u64 = 0;

    loop {
        if stop.load(Ordering::SeqCst) {
            return Ok(StopReason::Requested);
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            return Ok(StopReason::Elapsed);
        }
        measurement += 1;
        if settings.max_measurements.is_some_and(|max| measurement > max) {
            return Ok(StopReason::Counted);
        }

        for event in engine.poll_events() {
            if let Event::PeriodFailed { probe, message } = event {
                return Ok(StopReason::Failed(format!("{}: {}", probe, message)));
            }
        }

        let frame = if settings.plain {
            display::plain_report(engine.meters(), &chrono::Local::now())
        } else {
            display::spectrum_frame(engine.meters(), settings.width, glyphs)
        };
        out.write_all(frame.as_bytes())?;
        out.flush()?;

        thread::sleep(settings.interval());
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = cli.config();
    config.validate().map_err(anyhow::Error::msg)?;

    let graph = jackmeter_platform::open_graph(&config.client_name)?;
    let mut engine = match MeterEngine::new(graph, config) {
        Err(EngineError::NoPortsSelected) => {
            bail!("no ports selected\n\nUsage: jackmeter [-h] [-c] [-p] [-x] [-f <freq>] [-d <seconds>] [-n <measurements>] [<port> ...]")
        }
        other => other?,
    };

    let stop = Arc::new(AtomicBool::new(false));
    install_stop_triggers(&stop)?;

    let connected = engine.start()?;
    info!("Connected {} of {} port(s)", connected, engine.meters().len());

    // Teardown runs whatever the display loop returns
    let outcome = {
        let _screen = (!engine.config().display.plain).then(display::Screen::enter);
        run_display(&engine, &stop, &mut std::io::stdout().lock())
    };
    engine.stop()?;

    match outcome? {
        StopReason::Failed(reason) => {
            error!("Metering stopped: {}", reason);
            bail!("processing failed: {}", reason)
        }
        reason => {
            info!("Stopped ({:?})", reason);
            Ok(())
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("jackmeter=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    run(Cli::parse())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["jackmeter"]).unwrap();
        let config = cli.config();

        assert_eq!(config, MeterConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_short_options() {
        let cli = Cli::try_parse_from([
            "jackmeter", "-f", "4", "-d", "10", "-n", "3", "-c", "-p", "system:capture",
        ])
        .unwrap();
        let config = cli.config();

        assert_eq!(config.display.refresh_rate, 4);
        assert_eq!(config.display.duration_secs, Some(10));
        assert_eq!(config.display.max_measurements, Some(3));
        assert!(config.connected_only);
        assert!(config.display.plain);
        assert_eq!(config.processor, ProcessorKind::Peak);
        assert_eq!(config.ports, vec!["system:capture"]);
    }

    #[test]
    fn test_zero_means_unlimited() {
        let cli = Cli::try_parse_from(["jackmeter", "-d", "0", "-n", "0"]).unwrap();
        let config = cli.config();

        assert_eq!(config.display.duration_secs, None);
        assert_eq!(config.display.max_measurements, None);
    }

    #[test]
    fn test_verbatim_ports_keep_order() {
        let cli = Cli::try_parse_from(["jackmeter", "-x", "b:out_10", "b:out_2", "b:out_10"]).unwrap();
        let config = cli.config();

        assert!(!config.pattern_matching);
        assert_eq!(config.ports, vec!["b:out_10", "b:out_2", "b:out_10"]);
    }

    #[test]
    fn test_unknown_option_rejected() {
        assert!(Cli::try_parse_from(["jackmeter", "-q"]).is_err());
        assert!(Cli::try_parse_from(["jackmeter", "-f", "fast"]).is_err());
    }

    #[test]
    fn test_display_loop_stops_on_count() {
        let graph = jackmeter_platform::MemoryGraph::new("jackmeter", 48000, 64);
        graph.add_source("a:out");
        let cli = Cli::try_parse_from(["jackmeter", "-p", "-n", "2", "-f", "1000"]).unwrap();

        let mut engine = MeterEngine::new(Box::new(graph), cli.config()).unwrap();
        engine.start().unwrap();

        let stop = AtomicBool::new(false);
        let mut out = Vec::new();
        assert_eq!(run_display(&engine, &stop, &mut out).unwrap(), StopReason::Counted);
        engine.stop().unwrap();

        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.matches("# jackmeter ").count(), 2);
        assert!(text.contains("a:out :"));
    }

    #[test]
    fn test_display_loop_stops_on_request() {
        let graph = jackmeter_platform::MemoryGraph::new("jackmeter", 48000, 64);
        graph.add_source("a:out");
        let cli = Cli::try_parse_from(["jackmeter", "-p"]).unwrap();

        let engine = MeterEngine::new(Box::new(graph), cli.config()).unwrap();
        let stop = AtomicBool::new(true);
        let mut out = Vec::new();
        assert_eq!(run_display(&engine, &stop, &mut out).unwrap(), StopReason::Requested);
        assert!(out.is_empty());
    }
}
