//! AFCS command line: firing solutions from CSV range tables, table listing and self-update.
use std::io::{self, BufRead, Write};
use std::process::ExitCode;

use camino::{Utf8Path, Utf8PathBuf};
use clap::{ArgAction, Args, Parser, Subcommand};
use tracing::debug;

use afcs::afcs_errors::AfcsError;
use afcs::catalog::DirectorySource;
use afcs::config::AfcsConfig;
use afcs::constants::{Charge, APP_VERSION};
use afcs::logging::init_logging;
use afcs::range_table::interpolation::InterpolationMode;
use afcs::range_table::Trajectory;
use afcs::report::CatalogDisplay;
use afcs::solver::{FireQuery, Solver};
use afcs::update::download::FetchPolicy;
use afcs::update::manifest::UpdateManifest;
use afcs::update::{run_update, UpdateOptions, UpdateOutcome};

#[derive(Parser)]
#[command(name = "afcs", version)]
#[command(about = "Artillery fire-control calculator working from CSV range tables", long_about = None)]
struct Cli {
    /// Range tables directory (default: $AFCS_RANGE_TABLES, the config file, or ./rangeTables)
    #[arg(long, global = true)]
    tables_dir: Option<Utf8PathBuf>,

    /// Configuration file (default: $AFCS_CONFIG, then the platform config directory)
    #[arg(long, global = true)]
    config: Option<Utf8PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compute firing solutions for a target
    Solve(SolveArgs),
    /// List the available range tables
    List(ListArgs),
    /// Check an update manifest and replace the executable with a newer release
    Update(UpdateArgs),
    /// Print the version of this build
    Version,
}

#[derive(Args)]
struct SolveArgs {
    /// Weapon system (M109A6, M1129, M119, RM-70, siala, ...)
    #[arg(long)]
    system: String,

    /// Distance to target in meters
    #[arg(long)]
    distance: f64,

    /// Own altitude minus target altitude, in meters
    #[arg(long, allow_hyphen_values = true, conflicts_with_all = ["own_altitude", "target_altitude"])]
    altitude_delta: Option<f64>,

    /// Own altitude in meters (with --target-altitude)
    #[arg(long, allow_hyphen_values = true, requires = "target_altitude")]
    own_altitude: Option<f64>,

    /// Target altitude in meters (with --own-altitude)
    #[arg(long, allow_hyphen_values = true, requires = "own_altitude")]
    target_altitude: Option<f64>,

    /// Restrict to one trajectory (low or high)
    #[arg(long)]
    trajectory: Option<Trajectory>,

    /// Restrict to one charge
    #[arg(long)]
    charge: Option<Charge>,

    /// Use linear interpolation instead of quadratic
    #[arg(long)]
    linear: bool,

    /// Show base mill and altitude correction of every solution
    #[arg(long)]
    detailed: bool,

    /// Print the solutions as JSON
    #[arg(long, conflicts_with = "detailed")]
    json: bool,
}

#[derive(Args)]
struct ListArgs {
    /// Only this weapon system
    #[arg(long)]
    system: Option<String>,

    /// Only this trajectory (low or high)
    #[arg(long)]
    trajectory: Option<Trajectory>,
}

#[derive(Args)]
struct UpdateArgs {
    /// Update manifest URL or local path
    #[arg(long)]
    manifest: String,

    /// Executable to replace (default: this program)
    #[arg(long)]
    binary: Option<Utf8PathBuf>,

    /// Directory receiving the download (default: the system temporary directory)
    #[arg(long)]
    download_dir: Option<Utf8PathBuf>,

    /// Replace without asking for confirmation
    #[arg(long)]
    yes: bool,
}

fn solver(cli_dir: Option<&Utf8Path>, config: AfcsConfig) -> Solver<DirectorySource> {
    let dir = config.tables_dir(cli_dir);
    debug!("range tables directory: {dir}");
    Solver::from_dir(config, dir)
}

fn run_solve(cli: &Cli, args: &SolveArgs) -> Result<(), AfcsError> {
    let mut config = AfcsConfig::load(cli.config.as_deref())?;
    if args.linear {
        config.interpolation = InterpolationMode::Linear;
    }

    let mut builder = FireQuery::builder(&args.system, args.distance)
        .trajectory(args.trajectory)
        .charge(args.charge);
    builder = match (args.altitude_delta, args.own_altitude, args.target_altitude) {
        (Some(delta), _, _) => builder.altitude_delta(delta),
        (None, Some(own), Some(target)) => builder.altitudes(own, target),
        _ => builder,
    };
    let query = builder.build()?;

    let solutions = solver(cli.tables_dir.as_deref(), config).solve(&query)?;
    let trajectories = query.trajectories();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&solutions)?);
    } else {
        println!(
            "{}",
            solutions
                .show()
                .trajectories(&trajectories)
                .detailed(args.detailed)
        );
    }
    Ok(())
}

fn run_list(cli: &Cli, args: &ListArgs) -> Result<(), AfcsError> {
    let config = AfcsConfig::load(cli.config.as_deref())?;
    let tables = solver(cli.tables_dir.as_deref(), config)
        .list_available(args.system.as_deref(), args.trajectory)?;
    println!("{}", CatalogDisplay::new(&tables));
    Ok(())
}

fn confirm_on_stdin(manifest: &UpdateManifest) -> bool {
    if let Some(notes) = &manifest.notes {
        println!("{notes}");
    }
    print!("Download and install version {}? [y/N] ", manifest.version);
    let _ = io::stdout().flush();

    let mut answer = String::new();
    if io::stdin().lock().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

fn run_self_update(args: &UpdateArgs) -> Result<(), AfcsError> {
    let binary = match &args.binary {
        Some(path) => path.clone(),
        None => Utf8PathBuf::from_path_buf(std::env::current_exe()?)
            .map_err(|p| AfcsError::Utf8PathError(p.display().to_string()))?,
    };
    let download_dir = match &args.download_dir {
        Some(dir) => dir.clone(),
        None => Utf8PathBuf::from_path_buf(std::env::temp_dir())
            .map_err(|p| AfcsError::Utf8PathError(p.display().to_string()))?,
    };

    let options = UpdateOptions {
        manifest: args.manifest.clone(),
        binary,
        download_dir,
        current_version: APP_VERSION.to_string(),
        policy: FetchPolicy::default(),
    };

    println!("Current version: {APP_VERSION}");
    let outcome = run_update(&options, |manifest| {
        println!("New version {} available", manifest.version);
        args.yes || confirm_on_stdin(manifest)
    })?;

    match outcome {
        UpdateOutcome::UpToDate { remote } => println!("Already up to date (remote {remote})"),
        UpdateOutcome::Declined { .. } => println!("Update cancelled"),
        UpdateOutcome::Updated { remote, binary } => {
            println!("Updated {binary} to version {remote}")
        }
    }
    Ok(())
}

fn run(cli: &Cli) -> Result<(), AfcsError> {
    init_logging(cli.verbose)?;

    match &cli.command {
        Command::Solve(args) => run_solve(cli, args),
        Command::List(args) => run_list(cli, args),
        Command::Update(args) => run_self_update(args),
        Command::Version => {
            println!("afcs {APP_VERSION}");
            Ok(())
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err}");
            ExitCode::from(err.exit_code())
        }
    }
}
