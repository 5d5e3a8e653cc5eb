//! Terminal output for the meter loop
//!
//! Plain mode writes a timestamped block of peak lines per refresh.
//! Interactive mode redraws one spectrum row per probe in place.

use std::fmt::Write as _;

use chrono::{DateTime, TimeZone};
use jackmeter_dsp::{display, DspError, Glyphs, Meter};

const CLEAR_SCREEN: &str = "\x1b[2J";
const CURSOR_HOME: &str = "\x1b[H";
const HIDE_CURSOR: &str = "\x1b[?25l";
const SHOW_CURSOR: &str = "\x1b[?25h";
const CLEAR_LINE: &str = "\x1b[K";

/// One peak line: `name :   -6.0 db  (min: -20.1, max:  -3.2)`
pub fn peak_line(meter: &Meter) -> Option<String> {
    let peak = meter.as_peak()?;
    Some(format!(
        "{} : {:6.1} db  (min:{:6.1}, max:{:6.1})",
        peak.name(),
        peak.latest_peak_db(),
        peak.min_peak_db(),
        peak.max_peak_db()
    ))
}

/// Timestamp header followed by one line per peak meter
pub fn plain_report<Tz>(meters: &[Meter], now: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let mut out = format!("# jackmeter {}\n", now.format("%Y-%m-%dt%H:%M:%S"));
    for line in meters.iter().filter_map(peak_line) {
        out.push_str(&line);
        out.push('\n');
    }
    out
}

/// Spectrum row for one meter, or `None` while it has nothing to show
pub fn spectrum_line(meter: &Meter, width: usize, glyphs: Glyphs) -> Option<String> {
    match meter {
        Meter::Spectrum(spectrum) => match spectrum.spectrum() {
            Ok(snapshot) => Some(display::render_row(&snapshot, width, glyphs)),
            Err(DspError::Uninitialized(_)) => None,
            Err(e) => {
                tracing::debug!("Skipping {}: {}", spectrum.name(), e);
                None
            }
        },
        Meter::Peak(peak) => Some(format!("{:6.1} db", peak.latest_peak_db())),
    }
}

/// Full-screen redraw: one row per probe, name underneath
pub fn spectrum_frame(meters: &[Meter], width: usize, glyphs: Glyphs) -> String {
    let mut out = String::from(CURSOR_HOME);
    for meter in meters {
        let row = spectrum_line(meter, width, glyphs).unwrap_or_default();
        let _ = write!(out, "{}{}\r\n{}{}\r\n", row, CLEAR_LINE, meter.name(), CLEAR_LINE);
    }
    out
}

/// Puts the terminal into redraw mode and restores it when dropped
pub struct Screen;

impl Screen {
    pub fn enter() -> Self {
        print!("{}{}", CLEAR_SCREEN, HIDE_CURSOR);
        Screen
    }
}

impl Drop for Screen {
    fn drop(&mut self) {
        print!("{}", SHOW_CURSOR);
    }
}
