use std::fs::File;
use std::io::{self, IsTerminal};
use std::path::Path;

use tracing_subscriber::filter::{LevelFilter, Targets};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

pub fn setup_logging_file(level: tracing::Level, trace_bus: bool, path: &Path) -> io::Result<()> {
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(File::create(path)?)
        .log_internal_errors(false);

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(logging_targets(level, trace_bus))
        .init();
    Ok(())
}

pub fn setup_logging_stdio(level: tracing::Level, trace_bus: bool) {
    let format = tracing_subscriber::fmt::format()
        .with_target(false)
        .with_line_number(false)
        .with_level(false)
        .without_time();

    // Decoded output goes to stdout; keep diagnostics out of it
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_ansi(io::stderr().is_terminal())
        .with_writer(io::stderr)
        .event_format(format)
        .log_internal_errors(false);

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(logging_targets(level, trace_bus))
        .init();
}

/// Per-frame bus tracing is only shown when asked for.
fn logging_targets(level: tracing::Level, trace_bus: bool) -> Targets {
    let level = LevelFilter::from_level(level);
    let bus = if trace_bus {
        LevelFilter::TRACE
    } else {
        level.min(LevelFilter::DEBUG)
    };
    Targets::new()
        .with_target("ps2_kbd::device::bus", bus)
        .with_default(level)
}
