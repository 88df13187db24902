use crate::{
    archive::write_tar_gz,
    config::Config,
    handler::ReportHandler,
    reshape::reshape_results,
    synth::{DEFAULT_FROM_DIR, DEFAULT_TO_DIR, Synthesizer},
    util::{copy_source_files, ensure_dir, now_rfc3339, sha256_file},
};
use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use time::{Duration, OffsetDateTime, format_description::well_known::Rfc3339};
use tracing::{debug, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "tix-reshape")]
#[command(
    about = "Shapes report files into the batches a processor would take, and packs them into a tar.gz"
)]
pub struct Args {
    #[command(subcommand)]
    pub cmd: Option<Command>,

    #[command(flatten)]
    pub reshape: ReshapeArgs,

    /// Path to config TOML. If omitted, uses ./tix-reshape.toml if present.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Override log level (trace/debug/info/warn/error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,
}

#[derive(clap::Args, Debug, Default)]
pub struct ReshapeArgs {
    /// The path to the directory where the reports are.
    #[arg(long = "source_directory", visible_alias = "source-directory")]
    pub source_directory: Option<PathBuf>,

    /// The directory the archive is written to.
    #[arg(long = "output_directory", visible_alias = "output-directory")]
    pub output_directory: Option<PathBuf>,

    /// The name of the output file. Defaults to output.archive_filename.
    #[arg(short = 'o', long = "output_filename", visible_alias = "output-filename")]
    pub output_filename: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the batch the handler would take from a directory right now.
    Inspect {
        #[arg(long)]
        input: PathBuf,
    },
    /// Write synthetic one-report-per-span files into a directory.
    Synthesize {
        #[arg(long)]
        out_dir: PathBuf,
        /// Keep writing reports until at least this many observations exist.
        #[arg(long)]
        observations: usize,
        /// RFC 3339 start instant. Defaults to now.
        #[arg(long)]
        start: Option<String>,
        #[arg(long, default_value_t = 60)]
        report_seconds: i64,
        #[arg(long, default_value_t = 1)]
        step_seconds: i64,
        #[arg(long, default_value = DEFAULT_FROM_DIR)]
        from_dir: String,
        #[arg(long, default_value = DEFAULT_TO_DIR)]
        to_dir: String,
        #[arg(long, default_value_t = 1)]
        user_id: u64,
        #[arg(long, default_value_t = 1)]
        installation_id: u64,
    },
}

pub fn dispatch(args: Args) -> Result<()> {
    let cfg = match resolve_config_path(args.config.as_deref()) {
        Some(path) => Config::load(&path)?,
        None => Config::default(),
    };
    let log_path = resolve_log_path(&cfg);
    let _guard = init_logging(&args, &cfg, log_path.as_deref())?;
    debug!(?args, "arguments");

    match &args.cmd {
        Some(Command::Inspect { input }) => inspect(&cfg, input),
        Some(Command::Synthesize {
            out_dir,
            observations,
            start,
            report_seconds,
            step_seconds,
            from_dir,
            to_dir,
            user_id,
            installation_id,
        }) => {
            let synth = Synthesizer {
                from_dir: from_dir.clone(),
                to_dir: to_dir.clone(),
                user_id: *user_id,
                installation_id: *installation_id,
                report_span: Duration::seconds(*report_seconds),
                observation_step: Duration::seconds(*step_seconds),
            };
            synthesize(&synth, out_dir, *observations, start.as_deref())
        }
        None => reshape(&cfg, &args.reshape),
    }
}

fn resolve_config_path(user: Option<&Path>) -> Option<PathBuf> {
    if let Some(p) = user {
        return Some(p.to_path_buf());
    }
    ["tix-reshape.toml", "tix-reshape.example.toml"]
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
}

fn init_logging(args: &Args, cfg: &Config, file_path: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let level = args
        .log_level
        .as_deref()
        .unwrap_or(cfg.logging.level.as_str());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let stderr_layer = if cfg.logging.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    };

    let (file_layer, guard) = if let Some(path) = file_path {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        ensure_dir(parent)?;
        let file = std::fs::File::create(path)
            .with_context(|| format!("create log file: {}", path.display()))?;
        let (non_blocking, guard) = tracing_appender::non_blocking(file);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true)
            .boxed();
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow!("failed to init logging: {e}"))?;

    Ok(guard)
}

fn resolve_log_path(cfg: &Config) -> Option<PathBuf> {
    if !cfg.logging.write_to_file {
        return None;
    }

    if !cfg.logging.file_path.is_empty() {
        return Some(PathBuf::from(&cfg.logging.file_path));
    }

    Some(PathBuf::from(&cfg.paths.work_dir).join("tix-reshape.log"))
}

fn reshape(cfg: &Config, args: &ReshapeArgs) -> Result<()> {
    let source = args
        .source_directory
        .as_deref()
        .ok_or_else(|| anyhow!("--source_directory is required"))?;
    let output_dir = args
        .output_directory
        .as_deref()
        .ok_or_else(|| anyhow!("--output_directory is required"))?;
    let filename = args
        .output_filename
        .clone()
        .unwrap_or_else(|| cfg.output.archive_filename.clone());

    let abs_source = std::path::absolute(source)
        .with_context(|| format!("resolving source: {}", source.display()))?;
    if !abs_source.is_dir() {
        return Err(anyhow!("source is not a directory: {}", abs_source.display()));
    }
    let abs_output = std::path::absolute(output_dir)
        .with_context(|| format!("resolving output: {}", output_dir.display()))?;
    ensure_dir(&abs_output)?;

    let started = now_rfc3339();
    let work_dir = PathBuf::from(&cfg.paths.work_dir).join(format!(
        "run-{}",
        OffsetDateTime::now_utc().unix_timestamp_nanos()
    ));
    ensure_dir(&work_dir)?;

    info!("copying reports to working area {}", work_dir.display());
    let copied = copy_source_files(&abs_source, &work_dir, cfg.input.skip_empty_files)
        .with_context(|| format!("copying reports from {}", abs_source.display()))?;
    info!("copied {copied} report files");

    info!("generating batches");
    let summary = reshape_results(&work_dir, &cfg.handler_settings())
        .with_context(|| format!("reshaping {}", work_dir.display()))?;

    let archive = abs_output.join(&filename);
    info!("creating output archive {}", archive.display());
    write_tar_gz(&work_dir, &archive)?;
    let digest = sha256_file(&archive)?;
    info!("output archive created");

    if cfg.global.keep_work_dir {
        info!("keeping working area {}", work_dir.display());
    } else {
        info!("deleting working area {}", work_dir.display());
        std::fs::remove_dir_all(&work_dir)
            .with_context(|| format!("removing {}", work_dir.display()))?;
    }

    if cfg.global.print_summary {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "started": started,
                "finished": now_rfc3339(),
                "source": abs_source,
                "archive": archive,
                "sha256": digest,
                "copied_files": copied,
                "batches": summary.batches,
                "failed_results_kept": summary.failed_results_kept,
                "status": "ok"
            }))?
        );
    }

    Ok(())
}

fn inspect(cfg: &Config, input: &Path) -> Result<()> {
    let handler = ReportHandler::with_settings(input, &cfg.handler_settings())?;
    let pick = handler.select()?;
    let paths: Vec<_> = pick.reports.iter().filter_map(|r| r.file_path.clone()).collect();
    let oversized: Vec<_> = pick.oversized.iter().filter_map(|r| r.file_path.clone()).collect();
    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "input": input,
            "thresholds": handler.thresholds(),
            "selection": pick.selection,
            "day_timestamp": pick.reports.first().and_then(|r| r.day_timestamp()),
            "reports": paths,
            "oversized": oversized,
        }))?
    );
    Ok(())
}

fn synthesize(synth: &Synthesizer, out_dir: &Path, observations: usize, start: Option<&str>) -> Result<()> {
    if synth.observation_step <= Duration::ZERO || synth.report_span <= Duration::ZERO {
        return Err(anyhow!("report and step spans must be positive"));
    }
    let start = match start {
        Some(s) => OffsetDateTime::parse(s, &Rfc3339).with_context(|| format!("parsing start: {s}"))?,
        None => OffsetDateTime::now_utc().replace_nanosecond(0)?,
    };
    ensure_dir(out_dir)?;
    let reports = synth.write_reports(out_dir, observations, start)?;
    info!(
        "wrote {} reports ({} observations) to {}",
        reports.len(),
        ReportHandler::calculate_observations_quantity(&reports),
        out_dir.display()
    );
    Ok(())
}
