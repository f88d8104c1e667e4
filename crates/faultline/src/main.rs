use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use faultline_core::constants;
use faultline_core::journal::JOURNAL_CAPACITY;
use faultline_core::platform::PROGRAM_COUNTER;
use faultline_core::prelude::*;
use faultline_core::recovery::DEFAULT_SKIP_BYTES;
use faultline_utils::{debug, info, init_logging, init_logging_to_dir, init_logging_with_level, warn, LogFormat, LogLevel};

mod stimulus;

use stimulus::Stimulus;

/// Intercept hardware faults, skip the faulting instruction, and keep running.
#[derive(Parser, Debug)]
#[command(name = "faultline")]
#[command(version)]
#[command(about = "Intercept hardware faults, skip the faulting instruction, and keep running", long_about = None)]
struct Cli
{
    #[command(subcommand)]
    command: Commands,

    /// Log level (overrides RUST_LOG)
    #[arg(long, global = true)]
    log_level: Option<LogLevel>,

    /// Log output format
    #[arg(long, global = true, env = "FAULTLINE_LOG_FORMAT", default_value = "pretty")]
    log_format: LogFormat,

    /// Write logs to a dated file in this directory instead of stderr
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands
{
    /// Install the fault dispatcher, raise faults and recover from them
    Run
    {
        /// Faults to raise
        #[arg(long, value_enum, default_value_t = Stimulus::All)]
        stimulus: Stimulus,
        /// Fault kinds to install the dispatcher for
        #[arg(long, value_delimiter = ',', default_values = ["segv", "ill"])]
        kinds: Vec<FaultKind>,
        /// Bytes to skip past the faulting instruction pointer
        #[arg(long, env = "FAULTLINE_SKIP_BYTES", default_value_t = DEFAULT_SKIP_BYTES)]
        skip_bytes: u64,
        /// Echo each report to stderr from inside the handler
        #[arg(long, env = "FAULTLINE_ECHO")]
        echo: bool,
    },
    /// Classify a fault offline from its signal and si_code
    Classify
    {
        /// Fault kind (segv, ill, bus, fpe)
        kind: FaultKind,
        /// Raw si_code (decimal or 0x-prefixed hex)
        #[arg(value_parser = parse_code, allow_negative_numbers = true)]
        code: i32,
        /// Faulting address (decimal or 0x-prefixed hex)
        #[arg(long, value_parser = parse_address)]
        address: Option<u64>,
    },
    /// Show platform information and the currently installed fault actions
    Info,
}

fn main()
{
    let cli = Cli::parse();

    if let Err(e) = setup_logging(&cli) {
        eprintln!("Failed to initialize logging: {}", e);
        process::exit(1);
    }

    if let Err(e) = run_command(cli.command) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn setup_logging(cli: &Cli) -> Result<(), faultline_utils::LoggingError>
{
    match (&cli.log_dir, cli.log_level) {
        (Some(dir), level) => {
            init_logging_to_dir(dir, level)?;
            Ok(())
        }
        (None, Some(level)) => init_logging_with_level(level, cli.log_format),
        (None, None) => init_logging(),
    }
}

fn run_command(command: Commands) -> FaultResult<()>
{
    match command {
        Commands::Run {
            stimulus,
            kinds,
            skip_bytes,
            echo,
        } => {
            let options = DispatchOptions {
                policy: RecoveryPolicy::skip(skip_bytes),
                echo,
            };
            run_stimuli(stimulus, &kinds, options)
        }
        Commands::Classify { kind, code, address } => {
            print_classification(kind, code, address);
            Ok(())
        }
        Commands::Info => print_info(),
    }
}

fn run_stimuli(stimulus: Stimulus, kinds: &[FaultKind], options: DispatchOptions) -> FaultResult<()>
{
    if let Some(missing) = stimulus.required_kinds().into_iter().find(|k| !kinds.contains(k)) {
        return Err(FaultError::InvalidArgument(format!(
            "stimulus {stimulus:?} raises {missing}, which is not in --kinds"
        )));
    }
    if options.policy.skip_bytes() != DEFAULT_SKIP_BYTES {
        warn!(
            skip_bytes = options.policy.skip_bytes(),
            "stimuli are laid out for a one-byte skip; resuming may fault again"
        );
    }

    println!("faultline {}: intercepting {} fault kind(s)", env!("CARGO_PKG_VERSION"), kinds.len());

    let mut registry = HandlerRegistry::new();
    for &kind in kinds {
        // The Rust runtime owns SIGSEGV and SIGBUS for stack overflow reports
        registry.reset(kind)?;
        registry.install_dispatcher(kind, options)?;
    }

    stimulus::trigger(stimulus)?;

    let records = JOURNAL.drain();
    info!(count = records.len(), "faults recovered");
    for record in &records {
        debug!(
            kind = %record.metadata.kind,
            ip = %record.instruction_pointer,
            resumed_at = %record.resumed_at,
            "journal record"
        );
        print!("{}", FaultReport::new(record));
    }
    if JOURNAL.dropped() > 0 {
        warn!(dropped = JOURNAL.dropped(), "fault journal overflowed");
    }

    for &kind in kinds {
        registry.reset(kind)?;
    }

    println!("All went well. Bye.");
    Ok(())
}

fn print_classification(kind: FaultKind, code: i32, address: Option<u64>)
{
    let mut metadata = FaultMetadata::new(kind, code);
    if let Some(address) = address {
        metadata = metadata.with_address(Address::new(address));
    }
    let diagnosis = classify(&metadata);

    println!("Fault: {}", diagnosis.kind);
    println!("  si_code: {:#x}", diagnosis.cause_code);
    println!("  Known cause: {}", diagnosis.is_known_cause);
    println!("  Cause: {}", diagnosis.cause_description);
    if let Some(address) = diagnosis.faulting_address {
        println!("  Address: {}", address);
    }
    if diagnosis.matches_kernel_marker {
        println!("  Matches SI_KERNEL: true");
    }
    if let Some(note) = diagnosis.note {
        println!("  Note: {}", note);
    }
}

fn print_info() -> FaultResult<()>
{
    let registry = HandlerRegistry::new();

    println!("\nfaultline Information:");
    println!("  Architecture: {}-{}", std::env::consts::ARCH, std::env::consts::OS);
    println!(
        "  Program Counter: {} ({})",
        PROGRAM_COUNTER.register, PROGRAM_COUNTER.location
    );
    println!("  Default Skip: {} byte(s)", DEFAULT_SKIP_BYTES);
    println!("  Journal Capacity: {}", JOURNAL_CAPACITY);
    match constants::SI_KERNEL {
        Some(marker) => println!("  SI_KERNEL: {:#x}", marker),
        None => println!("  SI_KERNEL: n/a"),
    }

    println!("  Fault Kinds:");
    for kind in FaultKind::ALL {
        let action = registry.current_action(kind)?;
        println!("    {:<32} {}", kind.to_string(), action);
    }

    Ok(())
}

fn parse_code(s: &str) -> Result<i32, String>
{
    let value = parse_integer(s)?;
    i32::try_from(value).map_err(|_| format!("si_code out of range: {s}"))
}

fn parse_address(s: &str) -> Result<u64, String>
{
    let value = parse_integer(s)?;
    u64::try_from(value).map_err(|_| format!("address out of range: {s}"))
}

/// Parse a decimal or `0x`-prefixed hexadecimal integer, optionally negative.
fn parse_integer(s: &str) -> Result<i128, String>
{
    let s = s.trim();
    let (negative, digits) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    let magnitude = match digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        Some(hex) => i128::from_str_radix(hex, 16),
        None => digits.parse::<i128>(),
    }
    .map_err(|e| format!("invalid number '{s}': {e}"))?;
    Ok(if negative { -magnitude } else { magnitude })
}
