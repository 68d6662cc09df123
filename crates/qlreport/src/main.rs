use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::{debug, info, warn};

use qlreport_core::{
    LinkContext, PublishOptions, WriteOutcome, classify_output_kind, collect_result_index,
    inject_version_control_provenance, publish_results, rank_result_index,
    render_summary_markdown, resolve_result_count, sarif_output_kind, sarif_result_count,
    write_result_set,
};
use qlreport_types::{
    BqrsInfo, CompatibleQueryKinds, DecodedResults, QueryMetadata, QueryRunMetadata,
    ReadErrorPolicy, ResultIndex, SELECT_RESULT_SET, Sarif,
};

mod config_loader;
mod env_expand;
mod publisher;

use config_loader::{Settings, load_config};
use env_expand::expand_env_vars;
use publisher::DirectoryPublisher;

#[derive(Parser)]
#[command(name = "qlreport")]
#[command(about = "Render, classify and aggregate static-analysis query results", long_about = None)]
struct Cli {
    /// Enable verbose (info-level) logging to stderr.
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// Enable debug-level logging to stderr.
    #[arg(long, global = true)]
    debug: bool,

    /// Path to a config file. If omitted, uses ./qlreport.toml if present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render one repository's decoded results as a size-bounded Markdown table.
    Render(RenderArgs),

    /// Print the output kind licensed by query metadata and compatible kinds.
    Classify(ClassifyArgs),

    /// Add version-control provenance to a SARIF file and report its result count.
    Sarif(SarifArgs),

    /// Build a ranked result index from downloaded artifact directories.
    Index(IndexArgs),

    /// Publish ranked results and write the summary report.
    Summarize(SummarizeArgs),

    /// Write a repository's run metadata file.
    Metadata(MetadataArgs),
}

/// Where the compatible output kinds come from.
#[derive(Args, Debug, Default)]
struct KindSource {
    /// A compatible query kind tag (`Problem`, `PathProblem`, `Table`, ...). Repeatable.
    #[arg(long = "compatible-kind", action = clap::ArgAction::Append)]
    compatible_kinds: Vec<String>,

    /// `bqrs info --format=json` output; its compatible kinds are added to the set.
    #[arg(long, value_name = "PATH")]
    bqrs_info: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Decoded result sets (JSON, keyed by result-set name).
    #[arg(long, value_name = "PATH")]
    results: PathBuf,

    /// Repository the results belong to (`owner/repo`).
    #[arg(long)]
    nwo: String,

    /// Source root that file locations are relative to.
    #[arg(long)]
    source_location_prefix: String,

    /// Ref used in blob links (defaults to config, else HEAD).
    #[arg(long = "ref", value_name = "REF")]
    git_ref: Option<String>,

    #[command(flatten)]
    kinds: KindSource,

    /// Result set to render.
    #[arg(long, default_value = SELECT_RESULT_SET)]
    result_set: String,

    /// Character budget (defaults to config, else 64000).
    #[arg(long)]
    max_chars: Option<usize>,

    /// Where to write the Markdown. Defaults to stdout.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct ClassifyArgs {
    /// `resolve metadata` output (JSON).
    #[arg(long, value_name = "PATH")]
    metadata: PathBuf,

    #[command(flatten)]
    kinds: KindSource,

    /// Only report kinds that produce SARIF.
    #[arg(long)]
    sarif_only: bool,
}

#[derive(Parser, Debug)]
struct SarifArgs {
    /// SARIF file to annotate.
    #[arg(long, value_name = "PATH")]
    sarif: PathBuf,

    /// Repository the results belong to (`owner/repo`).
    #[arg(long)]
    nwo: String,

    /// Analyzed commit, when known.
    #[arg(long)]
    sha: Option<String>,

    /// Where to write the annotated SARIF. Defaults to stdout.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ReadErrorArg {
    Abort,
    Skip,
}

impl From<ReadErrorArg> for ReadErrorPolicy {
    fn from(v: ReadErrorArg) -> Self {
        match v {
            ReadErrorArg::Abort => ReadErrorPolicy::Abort,
            ReadErrorArg::Skip => ReadErrorPolicy::Skip,
        }
    }
}

#[derive(Parser, Debug)]
struct IndexArgs {
    /// Directory holding one subdirectory per downloaded artifact.
    #[arg(long, value_name = "DIR")]
    artifacts_dir: PathBuf,

    /// What to do with an unreadable artifact (defaults to config, else abort).
    #[arg(long, value_enum)]
    on_read_error: Option<ReadErrorArg>,

    /// Where to write the index JSON. Defaults to stdout.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct SummarizeArgs {
    /// Result index written by `qlreport index`.
    #[arg(long, value_name = "PATH")]
    index: PathBuf,

    /// Directory holding the artifacts the index was built from.
    #[arg(long, value_name = "DIR")]
    artifacts_dir: PathBuf,

    /// Directory that receives one Markdown file per promoted repository.
    #[arg(long, value_name = "DIR")]
    comments_dir: PathBuf,

    /// Prefix for links in the summary. Defaults to the comments directory.
    #[arg(long)]
    link_base: Option<String>,

    /// File with the query text, shown in a collapsible section.
    #[arg(long, value_name = "PATH")]
    query: Option<PathBuf>,

    /// Maximum number of repositories to publish individually.
    #[arg(long)]
    max_promoted: Option<usize>,

    /// Delay between two publications, in milliseconds.
    #[arg(long)]
    pacing_ms: Option<u64>,

    /// Where to write the summary Markdown. Defaults to stdout.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct MetadataArgs {
    #[arg(long)]
    nwo: String,

    /// Explicit result count; otherwise derived from `--sarif` / `--bqrs-info`.
    #[arg(long, conflicts_with_all = ["bqrs_info", "sarif"])]
    result_count: Option<u64>,

    /// SARIF produced for the repository; its results are counted when present.
    #[arg(long, value_name = "PATH")]
    sarif: Option<PathBuf>,

    /// `bqrs info` output; `#select` rows are counted when there is no SARIF.
    #[arg(long, value_name = "PATH")]
    bqrs_info: Option<PathBuf>,

    #[arg(long)]
    sha: Option<String>,

    #[arg(long)]
    source_location_prefix: Option<String>,

    /// Where to write `metadata.json`.
    #[arg(long)]
    out: PathBuf,
}

#[cfg(not(test))]
fn main() -> std::process::ExitCode {
    match run_with_args(std::env::args_os()) {
        Ok(code) => std::process::ExitCode::from(code as u8),
        Err(err) => {
            eprintln!("{err:?}");
            std::process::ExitCode::from(1)
        }
    }
}

fn run_with_args<I, T>(args: I) -> Result<i32>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = Cli::parse_from(args);

    init_logging(cli.verbose, cli.debug);

    let config = load_config(cli.config.as_deref(), |s| {
        expand_env_vars(s).map(Cow::into_owned)
    })?;
    let settings = Settings::from_config(&config);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("start async runtime")?;

    match cli.command {
        Commands::Render(args) => runtime.block_on(cmd_render(args, &settings))?,
        Commands::Classify(args) => cmd_classify(args)?,
        Commands::Sarif(args) => cmd_sarif(args)?,
        Commands::Index(args) => runtime.block_on(cmd_index(args, &settings))?,
        Commands::Summarize(args) => runtime.block_on(cmd_summarize(args, &settings))?,
        Commands::Metadata(args) => cmd_metadata(args)?,
    }

    Ok(0)
}

/// Initialize tracing/logging based on CLI flags.
fn init_logging(verbose: bool, debug: bool) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let level = if debug {
        "debug"
    } else if verbose {
        "info"
    } else {
        "warn"
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init();

    debug!("Logging initialized at level: {}", level);
}

async fn cmd_render(args: RenderArgs, settings: &Settings) -> Result<()> {
    let mut decoded: DecodedResults = read_json(&args.results, "decoded results")?;
    let Some(result_set) = decoded.take(&args.result_set) else {
        let available: Vec<&str> = decoded.names().collect();
        bail!(
            "result set '{}' not found in {} (available: {})",
            args.result_set,
            args.results.display(),
            available.join(", ")
        );
    };

    let compatible = resolve_kinds(&args.kinds)?;
    if compatible.is_empty() {
        warn!("no compatible query kinds given; rendering as a raw table");
    }

    let budget = settings.budget(args.max_chars)?;
    let git_ref = args.git_ref.as_deref().or(settings.git_ref.as_deref());
    let ctx = LinkContext::new(&args.nwo, &args.source_location_prefix, git_ref);

    debug!(
        "Rendering {} tuple(s) of '{}' for {} (budget {budget})",
        result_set.tuples.len(),
        result_set.name,
        args.nwo
    );

    let outcome = match &args.out {
        Some(path) => {
            create_parent_dir(path)?;
            let mut file = tokio::fs::File::create(path)
                .await
                .with_context(|| format!("create {}", path.display()))?;
            write_result_set(&mut file, &result_set, &compatible, &ctx, budget)
                .await
                .with_context(|| format!("write {}", path.display()))?
        }
        None => {
            let mut stdout = tokio::io::stdout();
            write_result_set(&mut stdout, &result_set, &compatible, &ctx, budget)
                .await
                .context("write stdout")?
        }
    };

    log_write_outcome(&args.nwo, result_set.tuples.len(), &outcome);
    Ok(())
}

fn log_write_outcome(nwo: &str, total_rows: usize, outcome: &WriteOutcome) {
    if outcome.truncated {
        warn!(
            "{nwo}: output truncated after {} of {total_rows} row(s) ({} chars)",
            outcome.rows_written, outcome.chars_written
        );
    } else {
        info!(
            "{nwo}: wrote {} row(s) ({} chars)",
            outcome.rows_written, outcome.chars_written
        );
    }
}

fn cmd_classify(args: ClassifyArgs) -> Result<()> {
    let metadata: QueryMetadata = read_json(&args.metadata, "query metadata")?;
    let compatible = resolve_kinds(&args.kinds)?;

    let kind = if args.sarif_only {
        sarif_output_kind(&metadata, &compatible)
    } else {
        classify_output_kind(&metadata, &compatible)
    };

    match kind {
        Some(kind) => println!("{kind}"),
        None => {
            info!(
                "kind {:?} is not licensed by compatible kinds {:?}",
                metadata.kind, compatible.0
            );
            println!("none");
        }
    }
    Ok(())
}

fn cmd_sarif(args: SarifArgs) -> Result<()> {
    let mut sarif: Sarif = read_json(&args.sarif, "SARIF")?;

    inject_version_control_provenance(&mut sarif, &args.nwo, args.sha.as_deref());
    let count = sarif_result_count(&sarif);
    info!("{}: {count} SARIF result(s)", args.nwo);

    match args.out {
        Some(path) => write_json(&path, &sarif)?,
        None => {
            let text = serde_json::to_string_pretty(&sarif).context("serialize SARIF")?;
            println!("{text}");
        }
    }
    Ok(())
}

async fn cmd_index(args: IndexArgs, settings: &Settings) -> Result<()> {
    let policy = args
        .on_read_error
        .map(ReadErrorPolicy::from)
        .unwrap_or(settings.on_read_error);
    debug!(
        "Indexing {} (on read error: {})",
        args.artifacts_dir.display(),
        policy.as_str()
    );

    let index = collect_result_index(&args.artifacts_dir, policy)
        .await
        .with_context(|| format!("index artifacts in {}", args.artifacts_dir.display()))?;

    for failure in &index.failures {
        warn!("{}: {}", failure.nwo, failure.error);
    }
    info!(
        "Indexed {} success(es), {} failure(s)",
        index.successes.len(),
        index.failures.len()
    );

    match args.out {
        Some(path) => write_json(&path, &index)?,
        None => {
            let text = serde_json::to_string_pretty(&index).context("serialize index")?;
            println!("{text}");
        }
    }
    Ok(())
}

async fn cmd_summarize(args: SummarizeArgs, settings: &Settings) -> Result<()> {
    let index: ResultIndex = read_json(&args.index, "result index")?;
    let index = rank_result_index(index);

    let query = match &args.query {
        Some(path) => Some(
            std::fs::read_to_string(path)
                .with_context(|| format!("read query {}", path.display()))?,
        ),
        None => None,
    };

    let options = PublishOptions {
        max_promoted: args.max_promoted.unwrap_or(settings.max_promoted),
        pacing: args
            .pacing_ms
            .map(Duration::from_millis)
            .unwrap_or(settings.pacing),
    };

    let mut publisher = DirectoryPublisher::new(
        &args.artifacts_dir,
        &args.comments_dir,
        args.link_base.as_deref(),
    );
    let report = publish_results(&index.successes, &mut publisher, &options)
        .await
        .context("publish results")?;

    if report.cap_reached {
        warn!(
            "published the first {} repositories with results; the rest are listed inline",
            report.max_promoted
        );
    }
    info!("Published {} repositories", report.promoted);

    let summary = render_summary_markdown(&report, query.as_deref(), &index.failures);
    match args.out {
        Some(path) => write_text(&path, &summary)?,
        None => print!("{summary}"),
    }
    Ok(())
}

fn cmd_metadata(args: MetadataArgs) -> Result<()> {
    let sarif: Option<Sarif> = args
        .sarif
        .as_deref()
        .map(|path| read_json(path, "SARIF"))
        .transpose()?;

    let result_count = match (args.result_count, &args.bqrs_info) {
        (Some(count), _) => Some(count),
        (None, Some(path)) => {
            let info: BqrsInfo = read_json(path, "bqrs info")?;
            let count = resolve_result_count(sarif.as_ref(), &info)
                .with_context(|| format!("count results in {}", path.display()))?;
            Some(count)
        }
        (None, None) => sarif.as_ref().map(sarif_result_count),
    };
    debug!("{}: result count {result_count:?}", args.nwo);

    let meta = QueryRunMetadata {
        nwo: args.nwo,
        result_count,
        sha: args.sha,
        source_location_prefix: args.source_location_prefix,
    };
    write_json(&args.out, &meta)
}

/// Union of the `--compatible-kind` flags and the kinds in `--bqrs-info`.
fn resolve_kinds(source: &KindSource) -> Result<CompatibleQueryKinds> {
    let mut kinds: CompatibleQueryKinds = source.compatible_kinds.iter().cloned().collect();
    if let Some(path) = &source.bqrs_info {
        let info: BqrsInfo = read_json(path, "bqrs info")?;
        kinds.0.extend(info.compatible_query_kinds.0);
    }
    Ok(kinds)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read {what} {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parse {what} {}", path.display()))
}

fn create_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create dir {}", parent.display()))?;
        }
    }
    Ok(())
}

fn write_json(path: &Path, value: &impl serde::Serialize) -> Result<()> {
    create_parent_dir(path)?;
    let bytes = serde_json::to_vec_pretty(value).context("serialize JSON")?;
    std::fs::write(path, bytes).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

fn write_text(path: &Path, text: &str) -> Result<()> {
    create_parent_dir(path)?;
    std::fs::write(path, text).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}
