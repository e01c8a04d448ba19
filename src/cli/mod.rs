//! Command-line parsing for the dashboard tool.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! ingestion core and the store.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::domain::{BucketMode, Role};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "dash", version, about = "Sales/quantity dashboard: CSV uploads and per-owner aggregates")]
pub struct Cli {
    /// Directory holding one aggregate document per owner.
    #[arg(long, global = true, env = "DASH_STORE_DIR", default_value = ".dash")]
    pub store_dir: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Upload a CSV file and replace the owner's aggregate (admin only).
    Ingest(IngestArgs),
    /// Upload several files for several owners in parallel (admin only).
    Batch(BatchArgs),
    /// Print the owner's dashboard series.
    Show(ShowArgs),
    /// Export the owner's aggregate as `metric,label,value` CSV.
    Export(ExportArgs),
    /// Delete the owner's stored aggregate (admin only).
    Purge(SessionArgs),
}

/// Who is acting. Stands in for the session established at login.
#[derive(Debug, Args, Clone)]
pub struct SessionArgs {
    /// Owner (user/tenant) id.
    #[arg(long)]
    pub owner: String,

    /// Role of the session.
    #[arg(long, value_enum, default_value_t = Role::Viewer)]
    pub role: Role,
}

/// How uploaded files are split, mapped and bucketed.
#[derive(Debug, Args, Clone)]
pub struct ParseArgs {
    /// Field delimiter (a single character, or `tab`).
    #[arg(long, default_value = ",", value_parser = parse_char)]
    pub delimiter: char,

    /// Quote character that may wrap a field containing the delimiter.
    #[arg(long, default_value = "\"", value_parser = parse_char)]
    pub quote: char,

    /// Header name of the label (time bucket) column.
    #[arg(long, default_value = "date")]
    pub label_column: String,

    /// Header name of the sales value column.
    #[arg(long, default_value = "sales")]
    pub sales_column: String,

    /// Header name of the quantity value column.
    #[arg(long, default_value = "quantity")]
    pub quantity_column: String,

    /// How labels are bucketed before aggregation.
    #[arg(long, value_enum, default_value_t = BucketMode::Raw)]
    pub bucket: BucketMode,

    /// Skip data rows that exactly repeat an earlier row.
    #[arg(long)]
    pub dedupe: bool,

    /// Maximum number of skipped-row messages to print.
    #[arg(long, default_value_t = 20)]
    pub max_errors: usize,
}

#[derive(Debug, Args, Clone)]
pub struct IngestArgs {
    #[command(flatten)]
    pub session: SessionArgs,

    /// File to upload (`.csv` or `.tsv`).
    #[arg(long, value_name = "CSV")]
    pub file: PathBuf,

    #[command(flatten)]
    pub parse: ParseArgs,
}

/// One `OWNER=PATH` upload in a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadJob {
    pub owner: String,
    pub path: PathBuf,
}

#[derive(Debug, Args, Clone)]
pub struct BatchArgs {
    /// Role of the session running the batch.
    #[arg(long, value_enum, default_value_t = Role::Viewer)]
    pub role: Role,

    /// Upload job, repeatable.
    #[arg(long = "job", value_name = "OWNER=PATH", required = true, value_parser = parse_job)]
    pub jobs: Vec<UploadJob>,

    #[command(flatten)]
    pub parse: ParseArgs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ShowFormat {
    Table,
    Json,
}

#[derive(Debug, Args, Clone)]
pub struct ShowArgs {
    #[command(flatten)]
    pub session: SessionArgs,

    /// Output format.
    #[arg(long, value_enum, default_value_t = ShowFormat::Table)]
    pub format: ShowFormat,

    /// Also draw an ASCII chart per series (table format only).
    #[arg(long)]
    pub plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 60)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 12)]
    pub height: usize,
}

#[derive(Debug, Args, Clone)]
pub struct ExportArgs {
    #[command(flatten)]
    pub session: SessionArgs,

    /// Destination CSV path.
    #[arg(long, value_name = "CSV")]
    pub out: PathBuf,
}

fn parse_char(s: &str) -> Result<char, String> {
    if s.eq_ignore_ascii_case("tab") || s == "\\t" {
        return Ok('\t');
    }
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(format!("expected a single character, got '{s}'")),
    }
}

fn parse_job(s: &str) -> Result<UploadJob, String> {
    let (owner, path) = s
        .split_once('=')
        .ok_or_else(|| format!("expected OWNER=PATH, got '{s}'"))?;
    let owner = owner.trim();
    if owner.is_empty() || path.trim().is_empty() {
        return Err(format!("expected OWNER=PATH, got '{s}'"));
    }
    Ok(UploadJob {
        owner: owner.to_string(),
        path: PathBuf::from(path.trim()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ingest_defaults_match_default_columns() {
        let cli = Cli::try_parse_from(["dash", "ingest", "--owner", "alice", "--role", "admin", "--file", "q1.csv"]).unwrap();
        let Command::Ingest(args) = cli.command else {
            panic!("expected ingest");
        };
        assert_eq!(args.session.role, Role::Admin);
        assert_eq!(args.parse.delimiter, ',');
        assert_eq!(args.parse.quote, '"');
        assert_eq!(args.parse.label_column, "date");
        assert_eq!(args.parse.bucket, BucketMode::Raw);
        assert!(!args.parse.dedupe);
    }

    #[test]
    fn batch_parses_jobs_and_tab_delimiter() {
        let cli = Cli::try_parse_from([
            "dash", "batch", "--role", "admin", "--delimiter", "tab", "--job", "alice=a.tsv", "--job", "bob = b.tsv",
        ])
        .unwrap();
        let Command::Batch(args) = cli.command else {
            panic!("expected batch");
        };
        assert_eq!(args.parse.delimiter, '\t');
        assert_eq!(
            args.jobs,
            vec![
                UploadJob { owner: "alice".into(), path: "a.tsv".into() },
                UploadJob { owner: "bob".into(), path: "b.tsv".into() },
            ]
        );
    }

    #[test]
    fn rejects_bad_char_and_job() {
        assert!(parse_char(";;").is_err());
        assert!(parse_job("no-separator").is_err());
        assert!(parse_job("=x.csv").is_err());
    }
}
