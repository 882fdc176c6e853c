use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use clap::{ArgAction, Args, Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use crate::anchors::list_anchors;
use crate::axtree::extract_link_nodes;
use crate::config::MapperConfig;
use crate::mapping::LinkMapping;
use crate::matcher::{DEFAULT_MIN_SCORE, MatchPolicyKind};
use crate::pipeline::map_axtree_links_to_html_hrefs;
use crate::quality::{DEFAULT_SHOW_EXAMPLES, QualityOptions, check_quality};
use crate::source::{load_json, read_lossy, read_text_or_path};
use crate::{Error, Result};

#[derive(Debug, Parser)]
#[command(
    name = "axmap",
    about = "Map accessibility-tree link nodes to the hrefs of their HTML anchors",
    version
)]
pub struct Cli {
    /// Raise log verbosity (-v debug, -vv trace). RUST_LOG overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Match link nodes against anchors and print the mapping as JSON.
    Map(MapArgs),

    /// List every <a> element with its raw attributes.
    Anchors(AnchorsArgs),

    /// List the link nodes extracted from an accessibility tree.
    Links(LinksArgs),

    /// Run the quality gate over a saved mapping.
    Check(CheckArgs),
}

#[derive(Debug, Args)]
pub struct MapArgs {
    /// Accessibility tree: a JSON file path or inline JSON.
    #[arg(long)]
    pub axtree: String,

    /// HTML document: a file path or inline markup.
    #[arg(long)]
    pub html: String,

    /// JSON config file; flags below override it.
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long)]
    pub base_url: Option<String>,

    /// Exact name matches only.
    #[arg(long)]
    pub strict: bool,

    #[arg(long)]
    pub min_score: Option<u32>,

    #[arg(long)]
    pub lookahead: Option<usize>,

    /// Report hrefs as written instead of resolved against --base-url.
    #[arg(long)]
    pub raw_hrefs: bool,

    /// Write the mapping here instead of stdout.
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Run the quality gate on the fresh mapping.
    #[arg(long)]
    pub check: bool,

    #[command(flatten)]
    pub gate: GateArgs,
}

#[derive(Debug, Args)]
pub struct AnchorsArgs {
    #[arg(long)]
    pub html: String,
}

#[derive(Debug, Args)]
pub struct LinksArgs {
    #[arg(long)]
    pub axtree: String,
}

#[derive(Debug, Args)]
pub struct CheckArgs {
    /// Mapping JSON produced by `axmap map`.
    #[arg(long)]
    pub mapping: PathBuf,

    #[arg(long, default_value_t = DEFAULT_MIN_SCORE)]
    pub min_score: u32,

    /// Do not check scores (exact-only mappings).
    #[arg(long)]
    pub skip_score: bool,

    #[command(flatten)]
    pub gate: GateArgs,
}

#[derive(Debug, Clone, Args)]
pub struct GateArgs {
    #[arg(long, default_value_t = 0)]
    pub max_bad: usize,

    #[arg(long)]
    pub allow_empty_href: bool,

    #[arg(long)]
    pub allow_unmatched: bool,

    /// Write failing entries here as JSON.
    #[arg(long)]
    pub dump: Option<PathBuf>,

    #[arg(long, default_value_t = DEFAULT_SHOW_EXAMPLES)]
    pub show_examples: usize,
}

impl GateArgs {
    fn quality_options(&self, min_score: Option<u32>) -> QualityOptions {
        QualityOptions {
            require_href: !self.allow_empty_href,
            require_matched_name: !self.allow_unmatched,
            min_score,
            max_bad: self.max_bad,
            dump_path: self.dump.clone(),
            show_examples: self.show_examples,
        }
    }
}

pub fn run_from_env() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let stdout = std::io::stdout();
    run(cli, &mut stdout.lock())
}

pub fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

pub fn run(cli: Cli, out: &mut impl Write) -> Result<()> {
    match cli.command {
        Commands::Map(args) => run_map(args, out),
        Commands::Anchors(args) => {
            let html = read_text_or_path(&args.html)?;
            write_json(out, &list_anchors(&html)?)
        }
        Commands::Links(args) => {
            let axtree = load_json(&args.axtree)?;
            write_json(out, &extract_link_nodes(&axtree)?)
        }
        Commands::Check(args) => run_check(args, out),
    }
}

fn run_map(args: MapArgs, out: &mut impl Write) -> Result<()> {
    let config = map_config(&args)?;
    let axtree = load_json(&args.axtree)?;
    let html = read_text_or_path(&args.html)?;
    let mapping = map_axtree_links_to_html_hrefs(&axtree, &html, &config)?;

    match &args.output {
        Some(path) => write_file(path, &mapping.to_json_pretty()?)?,
        None => write_json(out, &mapping)?,
    }

    if args.check {
        let min_score = match config.policy {
            MatchPolicyKind::Strict => None,
            MatchPolicyKind::Scored => Some(config.min_score),
        };
        check_quality(&mapping, &args.gate.quality_options(min_score))?;
    }
    Ok(())
}

fn map_config(args: &MapArgs) -> Result<MapperConfig> {
    let mut config = match &args.config {
        Some(path) => MapperConfig::from_json_file(path)?,
        None => MapperConfig::default(),
    };
    if let Some(base_url) = &args.base_url {
        config.base_url = Some(base_url.clone());
    }
    if args.strict {
        config.policy = MatchPolicyKind::Strict;
    }
    if let Some(min_score) = args.min_score {
        config.min_score = min_score;
    }
    if let Some(lookahead) = args.lookahead {
        config.lookahead = lookahead;
    }
    if args.raw_hrefs {
        config.resolve_urls = false;
    }
    config.validate()?;
    Ok(config)
}

fn run_check(args: CheckArgs, out: &mut impl Write) -> Result<()> {
    let mapping = LinkMapping::from_json_str(&read_lossy(&args.mapping)?)?;
    let min_score = (!args.skip_score).then_some(args.min_score);
    let report = check_quality(&mapping, &args.gate.quality_options(min_score))?;
    writeln!(out, "ok: bad={}/{}", report.bad, report.total).map_err(stdout_error)
}

fn write_json<T: Serialize + ?Sized>(out: &mut impl Write, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out).map_err(stdout_error)
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn stdout_error(source: std::io::Error) -> Error {
    Error::Io {
        path: PathBuf::from("<stdout>"),
        source,
    }
}
