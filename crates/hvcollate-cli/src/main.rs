//! hvcollate CLI - Collate Hyper-V build artifacts into an output directory.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use hvcollate_core::{
    CollateConfig, ConsoleUi, FsDriver, NativePaths, PathTranslator, RunContext, RunOutcome,
    Runner, StateBag, StepCollateArtifacts, Ui, WslPaths, DEFAULT_OUTPUT_DIR,
};
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

/// Move Hyper-V build artifacts into the layout users expect.
#[derive(Parser)]
#[command(name = "hvcollate")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Collate the artifacts of a finished build.
    Collate {
        /// Directory the artifacts should end up in.
        #[arg(short, long, default_value = DEFAULT_OUTPUT_DIR)]
        output_dir: PathBuf,

        /// The VM export was skipped; only collect virtual disks.
        #[arg(long)]
        skip_export: bool,

        /// Directory the VM was built in (used with --skip-export).
        #[arg(long)]
        build_dir: Option<PathBuf>,

        /// Directory the VM was exported into (used without --skip-export).
        #[arg(long)]
        export_path: Option<PathBuf>,

        /// Never translate WSL paths, even when running under WSL.
        #[arg(long)]
        no_translate: bool,

        /// Suppress progress output.
        #[arg(short, long)]
        quiet: bool,
    },

    /// Print the host-native form of a path.
    Translate {
        /// Path to convert.
        path: PathBuf,

        /// Convert a Windows path back into the WSL form.
        #[arg(short, long)]
        reverse: bool,
    },
}

/// [`Ui`] that keeps a spinner running while the build is collated.
struct SpinnerUi {
    bar: ProgressBar,
}

impl Ui for SpinnerUi {
    fn say(&self, message: &str) {
        self.bar.set_message(message.to_string());
    }

    fn error(&self, message: &str) {
        self.bar.suspend(|| eprintln!("==> {}", message));
    }
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Collate {
            output_dir,
            skip_export,
            build_dir,
            export_path,
            no_translate,
            quiet,
        } => {
            let config = CollateConfig::new(output_dir, skip_export);
            run_collate(config, build_dir, export_path, no_translate, quiet)?;
        }
        Commands::Translate { path, reverse } => {
            translate(&path, reverse)?;
        }
    }

    Ok(())
}

/// Diagnostic logs go to stderr, filtered by `RUST_LOG` (default `warn`).
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn run_collate(
    config: CollateConfig,
    build_dir: Option<PathBuf>,
    export_path: Option<PathBuf>,
    no_translate: bool,
    quiet: bool,
) -> Result<()> {
    config.validate()?;

    let mut state = StateBag::new();
    state.set_output_dir(&config.output_dir);
    if let Some(dir) = build_dir {
        state.set_build_dir(dir);
    }
    if let Some(dir) = export_path {
        state.set_export_path(dir);
    }

    let paths: Box<dyn PathTranslator> = if no_translate {
        Box::new(NativePaths)
    } else {
        Box::new(WslPaths::detect())
    };

    let spinner = if quiet {
        None
    } else {
        let bar = ProgressBar::new_spinner();
        bar.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
        bar.enable_steady_tick(Duration::from_millis(100));
        Some(bar)
    };

    let ui: Box<dyn Ui> = match &spinner {
        Some(bar) => Box::new(SpinnerUi { bar: bar.clone() }),
        None => Box::new(ConsoleUi),
    };

    let step = StepCollateArtifacts::new(&config, Box::new(FsDriver::new()), ui, paths);
    let mut runner = Runner::new(Vec::new());
    runner.push(Box::new(step));

    let outcome = runner.run(&RunContext::new(), &mut state);

    if let Some(bar) = spinner {
        bar.finish_and_clear();
    }

    match outcome {
        RunOutcome::Completed => {
            if !quiet {
                println!("Artifacts collated in {}", config.output_dir.display());
            }
            Ok(())
        }
        RunOutcome::Halted => match state.take_error() {
            Some(err) => Err(err).context("collation halted"),
            None => bail!("collation halted"),
        },
        RunOutcome::Cancelled => bail!("collation cancelled"),
    }
}

fn translate(path: &Path, reverse: bool) -> Result<()> {
    let paths = WslPaths::detect();
    if !paths.is_alternate_environment() {
        eprintln!("Not running under WSL; path left unchanged.");
    }

    let converted = if reverse {
        paths.to_environment_path(path)
    } else {
        paths.to_host_native_path(path)
    }
    .with_context(|| format!("failed to translate {}", path.display()))?;

    println!("{}", converted.display());
    Ok(())
}
