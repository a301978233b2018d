use std::path::PathBuf;

use clap::Parser;
use tracing::{Level, info};

use ps2_kbd::device::bus::{BusTiming, CLK_HALF_PERIOD_US};
use ps2_kbd::device::typematic::{TYPEMATIC_DELAY_MS, TYPEMATIC_RATE_MS};
use ps2_kbd::device::{INTER_BYTE_DELAY_MS, Ps2Config};
use ps2_kbd::host::logging::{setup_logging_file, setup_logging_stdio};
use ps2_kbd::host::script::{Step, load_script};
use ps2_kbd::host::session::Session;
use ps2_kbd::mode::{ArbiterConfig, MODE_DEBOUNCE_MS, MODE_SETTLE_MS, Mode};

/// PS/2 keyboard simulator
/// Runs a key script through the USB/PS2 mode arbiter on a simulated bus and
/// prints what a host would see
#[derive(Parser)]
#[command(name = "ps2-sim")]
#[command(about = "Drive a simulated PS/2 keyboard from a key script")]
struct Args {
    /// Key script to run
    script: Option<PathBuf>,

    /// Type this text in PS/2 mode instead of running a script
    #[arg(long, conflicts_with = "script")]
    text: Option<String>,

    /// Bus clock half-period in microseconds
    #[arg(long, default_value_t = CLK_HALF_PERIOD_US)]
    half_period_us: u32,

    /// Typematic delay in milliseconds
    #[arg(long, default_value_t = TYPEMATIC_DELAY_MS)]
    typematic_delay: u32,

    /// Typematic repeat period in milliseconds
    #[arg(long, default_value_t = TYPEMATIC_RATE_MS)]
    typematic_rate: u32,

    /// Mode selector debounce window in milliseconds
    #[arg(long, default_value_t = MODE_DEBOUNCE_MS)]
    debounce_ms: u32,

    /// Write logs to a file instead of stderr
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Include per-frame bus tracing in the log
    #[arg(long)]
    trace_bus: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let level = if args.verbose {
        Level::TRACE
    } else {
        Level::INFO
    };
    match &args.log_file {
        Some(path) => setup_logging_file(level, args.trace_bus, path)?,
        None => setup_logging_stdio(level, args.trace_bus),
    }

    let steps = match (&args.script, &args.text) {
        (Some(path), _) => {
            info!("Running script {path:?}");
            load_script(path)?
        }
        (None, Some(text)) => vec![Step::Mode(Mode::Ps2), Step::Type(text.clone())],
        (None, None) => return Err("either a script or --text is required".into()),
    };

    let ps2_config = Ps2Config {
        timing: BusTiming {
            half_period_us: args.half_period_us,
            ..BusTiming::default()
        },
        inter_byte_delay_ms: INTER_BYTE_DELAY_MS,
        typematic_delay_ms: args.typematic_delay,
        typematic_rate_ms: args.typematic_rate,
    };
    let arbiter_config = ArbiterConfig {
        debounce_ms: args.debounce_ms,
        settle_ms: MODE_SETTLE_MS,
    };

    let mut session = Session::new(ps2_config, arbiter_config)?;
    for step in &steps {
        session.step(step)?;
        for event in session.take_events() {
            println!("{event}");
        }
    }
    info!("Finished at {} ms", session.now_ms());

    Ok(())
}
