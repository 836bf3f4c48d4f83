//! Resim CLI - Command-line interface for Stairs Resim
//!
//! Commands:
//! - simulate: Re-simulate a recording under one parameter set
//! - compare: Compare a tuned parameter set against a baseline
//! - validate: Check frame ordering and parameters without simulating
//! - events: Query the committed events of a run

use clap::{Parser, Subcommand, ValueEnum};
use log::info;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use stairs_resim::encoder::ReportEncoder;
use stairs_resim::events::{EventLog, DEFAULT_PAGE_LIMIT};
use stairs_resim::types::{EventType, FrameRecord};
use stairs_resim::{FrameSource, SimulationError, SimulationParams, Simulator, RESIM_VERSION};

/// Resim - Parameter re-simulation for staircase safety recordings
#[derive(Parser)]
#[command(name = "resim")]
#[command(version = RESIM_VERSION)]
#[command(about = "Replay vision-pipeline output under new thresholds", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Parameter flags shared by every command that runs a simulation
#[derive(clap::Args, Clone)]
struct ParamArgs {
    /// Load parameters from a JSON file (flags below override it)
    #[arg(long)]
    params: Option<PathBuf>,

    /// Phone detection distance threshold (normalized)
    #[arg(long)]
    phone_threshold: Option<f64>,

    /// Debounce duration in seconds
    #[arg(long)]
    debounce: Option<f64>,

    /// Assumed capture frame rate
    #[arg(long)]
    fps: Option<u32>,
}

#[derive(Subcommand)]
enum Commands {
    /// Re-simulate a recording under one parameter set
    Simulate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Input format
        #[arg(long, default_value = "json")]
        input_format: InputFormat,

        /// Output format (pretty JSON on a terminal, compact otherwise)
        #[arg(long)]
        output_format: Option<OutputFormat>,

        /// Include the re-simulated frames in the report
        #[arg(long)]
        include_frames: bool,

        #[command(flatten)]
        params: ParamArgs,
    },

    /// Compare a tuned parameter set against a baseline
    Compare {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "json")]
        input_format: InputFormat,

        /// Baseline parameters JSON file (defaults when omitted)
        #[arg(long)]
        baseline_params: Option<PathBuf>,

        /// Tuned parameters JSON file (baseline when omitted)
        #[arg(long)]
        tuned_params: Option<PathBuf>,

        /// Tuned phone detection distance threshold
        #[arg(long)]
        tuned_phone_threshold: Option<f64>,

        /// Tuned debounce duration in seconds
        #[arg(long)]
        tuned_debounce: Option<f64>,

        /// Output format (pretty JSON on a terminal, compact otherwise)
        #[arg(long)]
        output_format: Option<OutputFormat>,
    },

    /// Check frame ordering and parameters without simulating
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "json")]
        input_format: InputFormat,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        params: ParamArgs,
    },

    /// Query the committed events of a run
    Events {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "json")]
        input_format: InputFormat,

        /// Only events of this type
        #[arg(long)]
        event_type: Option<EventTypeArg>,

        /// Number of events to skip
        #[arg(long, default_value = "0")]
        offset: usize,

        /// Maximum number of events to return
        #[arg(long, default_value_t = DEFAULT_PAGE_LIMIT)]
        limit: usize,

        #[command(flatten)]
        params: ParamArgs,
    },
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// JSON array of frame records
    Json,
    /// Newline-delimited JSON (one frame record per line)
    Ndjson,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Compact JSON
    Json,
    /// Pretty-printed JSON
    JsonPretty,
    /// One re-simulated frame per line
    Ndjson,
}

#[derive(Clone, Copy, ValueEnum)]
enum EventTypeArg {
    CompliantStart,
    NonCompliantStart,
    PhoneDetected,
    PhoneEnded,
}

impl From<EventTypeArg> for EventType {
    fn from(arg: EventTypeArg) -> Self {
        match arg {
            EventTypeArg::CompliantStart => EventType::CompliantStart,
            EventTypeArg::NonCompliantStart => EventType::NonCompliantStart,
            EventTypeArg::PhoneDetected => EventType::PhoneDetected,
            EventTypeArg::PhoneEnded => EventType::PhoneEnded,
        }
    }
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), ResimCliError> {
    match cli.command {
        Commands::Simulate {
            input,
            output,
            input_format,
            output_format,
            include_frames,
            params,
        } => cmd_simulate(
            &input,
            &output,
            input_format,
            output_format,
            include_frames,
            &params,
        ),

        Commands::Compare {
            input,
            input_format,
            baseline_params,
            tuned_params,
            tuned_phone_threshold,
            tuned_debounce,
            output_format,
        } => cmd_compare(
            &input,
            input_format,
            baseline_params.as_deref(),
            &ParamArgs {
                params: tuned_params,
                phone_threshold: tuned_phone_threshold,
                debounce: tuned_debounce,
                fps: None,
            },
            output_format,
        ),

        Commands::Validate {
            input,
            input_format,
            json,
            params,
        } => cmd_validate(&input, input_format, json, &params),

        Commands::Events {
            input,
            input_format,
            event_type,
            offset,
            limit,
            params,
        } => cmd_events(
            &input,
            input_format,
            event_type.map(EventType::from),
            offset,
            limit,
            &params,
        ),
    }
}

fn cmd_simulate(
    input: &Path,
    output: &Path,
    input_format: InputFormat,
    output_format: Option<OutputFormat>,
    include_frames: bool,
    param_args: &ParamArgs,
) -> Result<(), ResimCliError> {
    let frames = read_frames(input, &input_format)?;
    let params = resolve_params(SimulationParams::default(), param_args)?;

    let mut simulator = Simulator::new(frames);
    let run = simulator.run(&params)?;

    let output_data = if matches!(output_format, Some(OutputFormat::Ndjson)) {
        let mut lines = String::new();
        for frame in &run.frames {
            lines.push_str(&serde_json::to_string(frame)?);
            lines.push('\n');
        }
        lines
    } else {
        let report = ReportEncoder::new().encode_run(run, include_frames);
        format_json(&report, output_format, output)?
    };
    write_output(output, &output_data)?;

    info!(
        "wrote {} frames, {} events to {}",
        run.frames.len(),
        run.events.len(),
        output.display()
    );
    Ok(())
}

fn cmd_compare(
    input: &Path,
    input_format: InputFormat,
    baseline_params: Option<&Path>,
    tuned_args: &ParamArgs,
    output_format: Option<OutputFormat>,
) -> Result<(), ResimCliError> {
    let frames = read_frames(input, &input_format)?;

    let baseline = match baseline_params {
        Some(path) => SimulationParams::from_json(&fs::read_to_string(path)?)?,
        None => SimulationParams::default(),
    };
    let tuned = resolve_params(baseline, tuned_args)?;

    let mut simulator = Simulator::new(frames);
    let result = simulator.compare(&baseline, &tuned)?;
    let report = ReportEncoder::new().encode_comparison(&baseline, &tuned, &result);

    let stdout = Path::new("-");
    let output_data = format_json(&report, output_format, stdout)?;
    write_output(stdout, &output_data)?;
    Ok(())
}

fn cmd_validate(
    input: &Path,
    input_format: InputFormat,
    json: bool,
    param_args: &ParamArgs,
) -> Result<(), ResimCliError> {
    let frames = read_frames(input, &input_format)?;
    let params = resolve_params(SimulationParams::default(), param_args)?;

    let mut checks = Vec::new();

    checks.push(match params.validate() {
        Ok(()) => ValidationCheck::ok(
            "params",
            format!(
                "phone_threshold={}, debounce={}s, fps={} (min run {} frames)",
                params.phone_threshold,
                params.debounce_duration_sec,
                params.fps,
                params.min_run_length()
            ),
        ),
        Err(e) => ValidationCheck::error("params", e.to_string()),
    });

    checks.push(match FrameSource::validate(&frames) {
        Ok(()) => ValidationCheck::ok("frame_order", "timestamps and frame numbers increase".to_string()),
        Err(e) => ValidationCheck::error("frame_order", e.to_string()),
    });

    let empty = frames.iter().filter(|f| f.persons.is_empty()).count();
    checks.push(ValidationCheck::ok(
        "persons",
        format!("{} of {} frames have no persons", empty, frames.len()),
    ));

    let report = ValidationReport {
        total_frames: frames.len(),
        first_timestamp_sec: frames.first().map(|f| f.timestamp_sec),
        last_timestamp_sec: frames.last().map(|f| f.timestamp_sec),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Total frames: {}", report.total_frames);
        if let (Some(first), Some(last)) = (report.first_timestamp_sec, report.last_timestamp_sec) {
            println!("Time span:    {:.3}s - {:.3}s", first, last);
        }
        println!("\nChecks:");
        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let failed = report
        .checks
        .iter()
        .filter(|c| matches!(c.status, CheckStatus::Error))
        .count();
    if failed > 0 {
        Err(ResimCliError::ValidationFailed(failed))
    } else {
        Ok(())
    }
}

fn cmd_events(
    input: &Path,
    input_format: InputFormat,
    event_type: Option<EventType>,
    offset: usize,
    limit: usize,
    param_args: &ParamArgs,
) -> Result<(), ResimCliError> {
    let frames = read_frames(input, &input_format)?;
    let params = resolve_params(SimulationParams::default(), param_args)?;

    let mut simulator = Simulator::new(frames);
    let run = simulator.run(&params)?;
    let log = EventLog::new(&run.events);

    let response = serde_json::json!({
        "page": log.page(offset, limit, event_type),
        "summary": log.summary(),
    });
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

// Helper functions

fn read_input(input: &Path) -> Result<String, ResimCliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn read_frames(input: &Path, format: &InputFormat) -> Result<Vec<FrameRecord>, ResimCliError> {
    let input_data = read_input(input)?;
    let frames = match format {
        InputFormat::Json => FrameSource::parse_array(&input_data)?,
        InputFormat::Ndjson => FrameSource::parse_ndjson(&input_data)?,
    };
    info!("loaded {} frames from {}", frames.len(), input.display());
    Ok(frames)
}

/// Layer the optional params file and then individual flags over `base`
fn resolve_params(
    base: SimulationParams,
    args: &ParamArgs,
) -> Result<SimulationParams, ResimCliError> {
    let mut params = match &args.params {
        Some(path) => base.overlay_json(&fs::read_to_string(path)?)?,
        None => base,
    };
    if let Some(threshold) = args.phone_threshold {
        params = params.with_phone_threshold(threshold);
    }
    if let Some(debounce) = args.debounce {
        params = params.with_debounce_duration(debounce);
    }
    if let Some(fps) = args.fps {
        params = params.with_fps(fps);
    }
    Ok(params)
}

fn format_json<T: serde::Serialize>(
    value: &T,
    format: Option<OutputFormat>,
    output: &Path,
) -> Result<String, ResimCliError> {
    let format = format.unwrap_or_else(|| {
        if output.to_string_lossy() == "-" && atty::is(atty::Stream::Stdout) {
            OutputFormat::JsonPretty
        } else {
            OutputFormat::Json
        }
    });

    Ok(match format {
        OutputFormat::JsonPretty => serde_json::to_string_pretty(value)? + "\n",
        // A single document is one line either way
        OutputFormat::Json | OutputFormat::Ndjson => serde_json::to_string(value)? + "\n",
    })
}

fn write_output(output: &Path, data: &str) -> Result<(), ResimCliError> {
    if output.to_string_lossy() == "-" {
        print!("{}", data);
    } else {
        fs::write(output, data)?;
    }
    Ok(())
}

// Error types

#[derive(Debug)]
enum ResimCliError {
    Io(io::Error),
    Simulation(SimulationError),
    Json(serde_json::Error),
    ValidationFailed(usize),
}

impl From<io::Error> for ResimCliError {
    fn from(e: io::Error) -> Self {
        ResimCliError::Io(e)
    }
}

impl From<SimulationError> for ResimCliError {
    fn from(e: SimulationError) -> Self {
        ResimCliError::Simulation(e)
    }
}

impl From<serde_json::Error> for ResimCliError {
    fn from(e: serde_json::Error) -> Self {
        ResimCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<ResimCliError> for CliError {
    fn from(e: ResimCliError) -> Self {
        match e {
            ResimCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            ResimCliError::Simulation(e) => {
                let hint = match &e {
                    SimulationError::InvalidThreshold(_)
                    | SimulationError::InvalidDebounceDuration(_)
                    | SimulationError::InvalidFps(_) => "Adjust the simulation parameters",
                    SimulationError::OutOfOrderFrames { .. }
                    | SimulationError::NonMonotonicFrameNumber { .. }
                    | SimulationError::InvalidTimestamp { .. } => {
                        "Run 'resim validate' and sort frames by timestamp"
                    }
                    SimulationError::IncomparableRuns { .. } => {
                        "Compare runs over the same recording"
                    }
                    SimulationError::JsonError(_) | SimulationError::ParseError(_) => {
                        "Check --input-format and the frame record JSON"
                    }
                };
                CliError {
                    code: "SIMULATION_ERROR".to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
            ResimCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            ResimCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} checks failed", count),
                hint: Some("Fix validation errors and retry".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    total_frames: usize,
    first_timestamp_sec: Option<f64>,
    last_timestamp_sec: Option<f64>,
    checks: Vec<ValidationCheck>,
}

#[derive(serde::Serialize)]
struct ValidationCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

impl ValidationCheck {
    fn ok(name: &str, message: String) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message,
        }
    }

    fn error(name: &str, message: String) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message,
        }
    }
}

#[derive(serde::Serialize)]
enum CheckStatus {
    Ok,
    Error,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_params(json: &str) -> PathBuf {
        let path =
            std::env::temp_dir().join(format!("resim-params-{}.json", uuid::Uuid::new_v4()));
        fs::write(&path, json).unwrap();
        path
    }

    fn no_overrides(params: Option<PathBuf>) -> ParamArgs {
        ParamArgs {
            params,
            phone_threshold: None,
            debounce: None,
            fps: None,
        }
    }

    #[test]
    fn test_tuned_file_layers_over_baseline_file() {
        let baseline_path = write_params(r#"{"debounce_duration_sec": 0.3}"#);
        let tuned_path = write_params(r#"{"phone_threshold": 0.08}"#);

        let baseline = resolve_params(
            SimulationParams::default(),
            &no_overrides(Some(baseline_path.clone())),
        )
        .unwrap();
        let tuned = resolve_params(baseline, &no_overrides(Some(tuned_path.clone()))).unwrap();

        assert_eq!(baseline.debounce_duration_sec, 0.3);
        assert_eq!(tuned.phone_threshold, 0.08);
        assert_eq!(tuned.debounce_duration_sec, 0.3);
        assert_eq!(tuned.fps, baseline.fps);

        fs::remove_file(baseline_path).unwrap();
        fs::remove_file(tuned_path).unwrap();
    }

    #[test]
    fn test_flags_override_file() {
        let path = write_params(r#"{"phone_threshold": 0.08, "fps": 30}"#);
        let args = ParamArgs {
            debounce: Some(0.2),
            phone_threshold: Some(0.1),
            ..no_overrides(Some(path.clone()))
        };

        let params = resolve_params(SimulationParams::default(), &args).unwrap();
        assert_eq!(params.phone_threshold, 0.1);
        assert_eq!(params.debounce_duration_sec, 0.2);
        assert_eq!(params.fps, 30);

        fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_no_file_keeps_base() {
        let base = SimulationParams::new(0.07, 0.4);
        assert_eq!(resolve_params(base, &no_overrides(None)).unwrap(), base);
    }
}
