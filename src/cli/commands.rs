//! Command implementations for the DRS processor CLI

use crate::app::adapters::cube_store::{CubeStore, SaveOptions, load_cubes};
use crate::app::adapters::filesystem::OsFileSystem;
use crate::app::services::concatenation::{ConcatenationEngine, ConcatenationOutcome, chunk_sizes};
use crate::app::services::data_finder::{DataFinder, get_start_end_year};
use crate::cli::args::{Args, Commands, CommonArgs, ConcatArgs, FindArgs, YearsArgs};
use crate::config::Config;
use crate::constants::FX_FREQUENCY;
use crate::error::Result;
use anyhow::Context;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Main entry point for command execution
pub fn run(args: Args) -> anyhow::Result<()> {
    match args.command {
        Some(Commands::Find(find_args)) => run_find(find_args),
        Some(Commands::Years(years_args)) => run_years(years_args),
        Some(Commands::Concat(concat_args)) => run_concat(concat_args),
        None => Ok(()),
    }
}

/// Set up structured logging based on verbosity settings
pub fn setup_logging(args: &CommonArgs) {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let log_level = args.get_log_level();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("drs_processor={}", log_level)));

    if args.quiet {
        // Minimal logging for quiet mode
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .init();
    } else {
        // Standard logging with timestamps
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_timer(fmt::time::uptime())
                    .with_writer(std::io::stderr),
            )
            .init();
    }

    debug!("Logging initialized at level: {}", log_level);
}

/// Load the user configuration and optional developer templates
fn load_config(args: &CommonArgs) -> anyhow::Result<Config> {
    let mut config = Config::load(args.config.as_deref()).context("Failed to load user configuration")?;
    if let Some(path) = &args.developer_config {
        config = config
            .with_developer_config(path)
            .with_context(|| format!("Failed to load developer configuration {}", path.display()))?;
    }
    Ok(config)
}

/// Cube store used for reading data files
///
/// Without the `netcdf` feature no file content can be read, so only file
/// names can be used to date files.
#[cfg(feature = "netcdf")]
fn data_store() -> Box<dyn CubeStore> {
    Box::new(crate::app::adapters::cube_store::NetcdfStore)
}

#[cfg(not(feature = "netcdf"))]
fn data_store() -> Box<dyn CubeStore> {
    Box::new(NameOnlyStore)
}

#[cfg(not(feature = "netcdf"))]
const NO_BACKEND: &str =
    "file name carries no dates and this build cannot read file content, rebuild with `--features netcdf`";

/// Store for builds without a NetCDF backend, every read fails
#[cfg(not(feature = "netcdf"))]
struct NameOnlyStore;

#[cfg(not(feature = "netcdf"))]
impl CubeStore for NameOnlyStore {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn load(&self, path: &Path) -> Result<Vec<crate::app::cube::Cube>> {
        Err(crate::error::DrsError::unreadable(path, NO_BACKEND))
    }

    fn save(&self, _cubes: &[crate::app::cube::Cube], path: &Path, _options: &SaveOptions) -> Result<()> {
        Err(crate::error::DrsError::unreadable(path, NO_BACKEND))
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        Ok(std::fs::rename(from, to)?)
    }
}

/// Create a progress bar for multi-file work
pub fn create_progress_bar(total: u64, message: &str) -> ProgressBar {
    let pb = ProgressBar::new(total);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
    pb.set_style(style);
    pb.set_message(message.to_string());
    pb
}

fn run_find(args: FindArgs) -> anyhow::Result<()> {
    setup_logging(&args.common);
    args.validate().context("Invalid dataset tags")?;

    let mut config = load_config(&args.common)?;
    let descriptor = args.descriptor();
    let project = args.project().unwrap_or_default().to_string();
    if !args.rootpath.is_empty() {
        config = config.with_rootpath(&project, args.rootpath.clone());
    }
    if let Some(drs) = &args.drs {
        config = config.with_drs(&project, drs);
    }
    info!("Locating files for {}", descriptor);

    let store = data_store();
    let finder = DataFinder::new(&config, &OsFileSystem, store.as_ref());

    let gated = descriptor.year_range().is_some() || descriptor.frequency() == Some(FX_FREQUENCY);
    let files: Vec<(PathBuf, Option<String>)> = if gated {
        finder
            .get_input_filelist(&descriptor)
            .context("Failed to select input files")?
            .into_iter()
            .map(|record| {
                let years = record.years().map(|y| y.to_string());
                (record.into_path(), years)
            })
            .collect()
    } else {
        finder
            .find_input_files(&descriptor)
            .context("Failed to locate input files")?
            .into_iter()
            .map(|path| (path, None))
            .collect()
    };

    for (path, years) in &files {
        match years {
            Some(years) => println!("{} {}", path.display(), format!("({})", years).bright_black()),
            None => println!("{}", path.display()),
        }
    }

    if !args.common.quiet {
        if files.is_empty() {
            eprintln!("{}", "No input files found".yellow().bold());
        } else {
            eprintln!(
                "{} {}",
                "Found".bright_green().bold(),
                format!("{} input files", files.len()).bright_white()
            );
        }
    }
    Ok(())
}

fn run_years(args: YearsArgs) -> anyhow::Result<()> {
    setup_logging(&args.common);

    let store = data_store();

    let mut failures = 0;
    for path in &args.files {
        match get_start_end_year(path, store.as_ref()) {
            Ok(years) => println!("{}: {} {}", path.display(), years.start, years.end),
            Err(e) => {
                failures += 1;
                eprintln!("{} {}", "Failed:".red().bold(), e);
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("Could not determine years of {} of {} files", failures, args.files.len());
    }
    Ok(())
}

#[cfg(feature = "netcdf")]
fn run_concat(args: ConcatArgs) -> anyhow::Result<()> {
    setup_logging(&args.common);
    let config = load_config(&args.common)?;

    let store = crate::app::adapters::cube_store::NetcdfStore;
    let progress = args
        .common
        .show_progress()
        .then(|| create_progress_bar(args.inputs.len() as u64, "Concatenating"));

    let outcomes = concat_into(
        &store,
        &args.inputs,
        &args.target,
        args.compress || config.user.compress_netcdf,
        args.optimize_access.as_deref(),
        progress.as_ref(),
    )
    .with_context(|| format!("Failed to write {}", args.target.display()))?;

    if let Some(pb) = progress {
        pb.finish_and_clear();
    }
    if !args.common.quiet {
        print_concat_summary(&args.target, &outcomes);
    }
    Ok(())
}

#[cfg(not(feature = "netcdf"))]
fn run_concat(args: ConcatArgs) -> anyhow::Result<()> {
    setup_logging(&args.common);
    anyhow::bail!(
        "Cannot merge into {}: this build has no NetCDF backend, rebuild with `--features netcdf`",
        args.target.display()
    )
}

/// Merge the cubes of every input file into `target`, one file at a time
///
/// Input files that cannot be read abort the run; problems with the target
/// are handled by the concatenation engine.
pub fn concat_into(
    store: &dyn CubeStore,
    inputs: &[PathBuf],
    target: &Path,
    compress: bool,
    optimize_access: Option<&str>,
    progress: Option<&ProgressBar>,
) -> Result<Vec<ConcatenationOutcome>> {
    let mut outcomes = Vec::with_capacity(inputs.len());
    for input in inputs {
        let cubes = load_cubes(store, input)?;

        let mut options = SaveOptions::default().with_compression(compress);
        if let (Some(access), Some(first)) = (optimize_access, cubes.first()) {
            options = options.with_chunk_sizes(chunk_sizes(first, access)?);
        }

        let outcome = ConcatenationEngine::new(store, options).concatenate_output(cubes, target)?;
        if let ConcatenationOutcome::IndividualFallback { reason, .. } = &outcome {
            warn!("{} was not merged into {}: {}", input.display(), target.display(), reason);
        }
        outcomes.push(outcome);

        if let Some(pb) = progress {
            pb.inc(1);
        }
    }
    Ok(outcomes)
}

#[cfg(feature = "netcdf")]
fn print_concat_summary(target: &Path, outcomes: &[ConcatenationOutcome]) {
    println!("\n{}", "Concatenation Complete".bright_green().bold());
    println!("   Target: {}", target.display());
    for outcome in outcomes {
        match outcome {
            ConcatenationOutcome::Empty => println!("   {} empty input", "•".bright_black()),
            ConcatenationOutcome::DirectWrite => println!("   {} written", "•".green()),
            ConcatenationOutcome::Merged { overwritten_years } if overwritten_years.is_empty() => {
                println!("   {} merged", "•".green())
            }
            ConcatenationOutcome::Merged { overwritten_years } => println!(
                "   {} merged, overwrote years {:?}",
                "•".yellow(),
                overwritten_years
            ),
            ConcatenationOutcome::ReplacedCorrupt { moved_to } => println!(
                "   {} unreadable target moved to {}",
                "•".yellow(),
                moved_to.display()
            ),
            ConcatenationOutcome::IndividualFallback { written, .. } => {
                println!("   {} not merged, written to:", "•".red());
                for path in written {
                    println!("       {}", path.display());
                }
            }
        }
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::adapters::cube_store::MemoryCubeStore;
    use crate::app::cube::tests::monthly_cube;

    #[test]
    fn test_concat_into_merges_inputs_in_order() {
        let store = MemoryCubeStore::new();
        store.insert("/in/tas_2000.nc", vec![monthly_cube("tas", 2000, 1, 0.0)]);
        store.insert("/in/tas_2001.nc", vec![monthly_cube("tas", 2001, 1, 100.0)]);
        let inputs = vec![
            PathBuf::from("/in/tas_2000.nc"),
            PathBuf::from("/in/tas_2001.nc"),
        ];
        let target = Path::new("/out/tas.nc");

        let outcomes = concat_into(&store, &inputs, target, false, Some("timeseries"), None).unwrap();

        assert_eq!(outcomes[0], ConcatenationOutcome::DirectWrite);
        assert!(matches!(outcomes[1], ConcatenationOutcome::Merged { .. }));
        let merged = store.get(target).unwrap();
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].shape(), &[24, 2, 2]);
        assert_eq!(store.save_options(target).unwrap().chunk_sizes, Some(vec![12, 1, 1]));
    }

    #[test]
    fn test_concat_into_fails_on_missing_input() {
        let store = MemoryCubeStore::new();
        let inputs = vec![PathBuf::from("/in/missing.nc")];

        assert!(concat_into(&store, &inputs, Path::new("/out/tas.nc"), false, None, None).is_err());
        assert!(store.paths().is_empty());
    }

    #[cfg(not(feature = "netcdf"))]
    #[test]
    fn test_undated_name_without_backend_explains_why() {
        let store = data_store();

        let err = get_start_end_year(Path::new("/data/OBS_ERA-Interim_reanaly_1_T3M_tas.nc"), store.as_ref())
            .unwrap_err();
        assert!(err.to_string().contains("cannot read file content"));

        let years = get_start_end_year(Path::new("/data/tas_Amon_MODEL_185001-200512.nc"), store.as_ref()).unwrap();
        assert_eq!((years.start, years.end), (1850, 2005));
    }

    #[test]
    fn test_progress_bar_counts_files() {
        let pb = create_progress_bar(3, "Concatenating");
        pb.inc(2);
        assert_eq!(pb.position(), 2);
        assert_eq!(pb.length(), Some(3));
    }
}
