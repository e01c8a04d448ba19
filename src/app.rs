//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and installs the log subscriber
//! - parses CLI arguments
//! - opens the dataset store
//! - runs uploads and prints summaries, dashboards and plots

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{BatchArgs, Cli, Command, ExportArgs, IngestArgs, ParseArgs, SessionArgs, ShowArgs, ShowFormat};
use crate::domain::{Dialect, IngestConfig, Metric, OwnerContext};
use crate::error::AppError;
use crate::report::{format_dashboard, format_upload_summary};
use crate::store::FsStore;

pub mod access;
pub mod pipeline;

use pipeline::Dashboard;

/// Entry point for the `dash` binary.
pub fn run() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let store = FsStore::open(&cli.store_dir)?;

    match cli.command {
        Command::Ingest(args) => handle_ingest(store, args),
        Command::Batch(args) => handle_batch(store, args),
        Command::Show(args) => handle_show(store, args),
        Command::Export(args) => handle_export(store, args),
        Command::Purge(args) => handle_purge(store, args),
    }
}

/// Logs go to stderr so stdout stays clean for JSON/CSV output.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn session(args: &SessionArgs) -> Result<OwnerContext, AppError> {
    access::authenticate(&args.owner, args.role)
}

fn handle_ingest(store: FsStore, args: IngestArgs) -> Result<(), AppError> {
    let ctx = session(&args.session)?;
    let dash = Dashboard::new(store, ingest_config_from_args(&args.parse)?);

    let outcome = dash.upload_file(&ctx, &args.file)?;
    print!("{}", format_upload_summary(&outcome, args.parse.max_errors));

    match &outcome.fatal {
        Some(fatal) => Err(AppError::from(fatal)),
        None => Ok(()),
    }
}

fn handle_batch(store: FsStore, args: BatchArgs) -> Result<(), AppError> {
    let dash = Dashboard::new(store, ingest_config_from_args(&args.parse)?);
    let results = dash.upload_batch(args.role, &args.jobs);

    // Report the most severe failure's exit code.
    let mut worst: Option<AppError> = None;
    for (i, result) in results.iter().enumerate() {
        if i > 0 {
            println!();
        }
        println!("--- {} <- {} ---", result.job.owner, result.job.path.display());
        let failure = match &result.outcome {
            Ok(outcome) => {
                print!("{}", format_upload_summary(outcome, args.parse.max_errors));
                outcome.fatal.as_ref().map(AppError::from)
            }
            Err(err) => {
                println!("error: {err}");
                Some(err.clone())
            }
        };
        if let Some(err) = failure {
            if worst.as_ref().is_none_or(|w| err.exit_code() > w.exit_code()) {
                worst = Some(err);
            }
        }
    }

    let failed = results
        .iter()
        .filter(|r| !matches!(&r.outcome, Ok(o) if o.accepted))
        .count();
    match worst {
        Some(err) => Err(AppError::new(
            err.exit_code(),
            format!("{failed} of {} uploads failed", results.len()),
        )),
        None => Ok(()),
    }
}

fn handle_show(store: FsStore, args: ShowArgs) -> Result<(), AppError> {
    let ctx = session(&args.session)?;
    let dash = Dashboard::new(store, IngestConfig::default());
    let view = dash.view(&ctx)?;

    match args.format {
        ShowFormat::Json => {
            let json = serde_json::to_string_pretty(&view)
                .map_err(|e| AppError::new(4, format!("Failed to encode dashboard JSON: {e}")))?;
            println!("{json}");
        }
        ShowFormat::Table => {
            print!("{}", format_dashboard(&view));
            if args.plot {
                println!();
                println!("{}", crate::plot::render_series_plot(Metric::Sales, &view.sales, args.width, args.height));
                print!("{}", crate::plot::render_series_plot(Metric::Quantity, &view.quantity, args.width, args.height));
            }
        }
    }
    Ok(())
}

fn handle_export(store: FsStore, args: ExportArgs) -> Result<(), AppError> {
    let ctx = session(&args.session)?;
    let dash = Dashboard::new(store, IngestConfig::default());
    let aggregate = dash
        .aggregate(&ctx)?
        .ok_or_else(|| AppError::new(3, format!("No data uploaded for owner '{}'", ctx.id)))?;

    crate::io::export::write_aggregate_csv(&args.out, &aggregate)?;
    println!("Exported {} to {}", ctx.id, args.out.display());
    Ok(())
}

fn handle_purge(store: FsStore, args: SessionArgs) -> Result<(), AppError> {
    let ctx = session(&args)?;
    let dash = Dashboard::new(store, IngestConfig::default());
    if dash.purge(&ctx)? {
        println!("Purged data for {}", ctx.id);
    } else {
        println!("No data stored for {}", ctx.id);
    }
    Ok(())
}

pub fn ingest_config_from_args(args: &ParseArgs) -> Result<IngestConfig, AppError> {
    if args.delimiter == args.quote {
        return Err(AppError::new(
            2,
            format!("--delimiter and --quote must differ (both are {:?})", args.delimiter),
        ));
    }
    Ok(IngestConfig {
        dialect: Dialect {
            delimiter: args.delimiter,
            quote: args.quote,
        },
        label_column: args.label_column.clone(),
        sales_column: args.sales_column.clone(),
        quantity_column: args.quantity_column.clone(),
        bucket: args.bucket,
        dedupe_rows: args.dedupe,
    })
}
