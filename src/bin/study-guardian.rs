//! CLI binary for study-guardian.
//!
//! A thin shim over the library crate: `serve` runs the HTTP service,
//! `analyze` produces one study guide (in-process or via a running server),
//! `last` prints the cached one.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Read, Write};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use study_guardian::{
    export_markdown, render_markdown, AnalysisRequest, AnalysisResult, Analyzer, AnalyzerConfig,
    HarmBlockThreshold, Language, RemoteClient, ResultCache, ServerConfig, StudyGuardianError,
};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Study guide from a PDF, printed as Markdown
  study-guardian analyze lecture-03.pdf

  # Pasted notes, Arabic output, saved to a file
  study-guardian analyze --text "Mitosis is..." --language arabic -o guide.md

  # Notes from stdin
  cat notes.txt | study-guardian analyze --text -

  # Run the HTTP service
  study-guardian serve --bind 0.0.0.0:3000

  # Send the request to a running service instead of calling Gemini directly
  study-guardian analyze slides.png --server http://localhost:3000

  # Show the last study guide again (no network)
  study-guardian last

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY             Primary Gemini API key
  GEMINI_API_KEY_BACKUP      Backup key, rotated with the primary
  GEMINI_API_KEYS            Extra keys, comma-separated
  STUDY_GUARDIAN_MODELS      Candidate models, comma-separated (default gemini-2.5-flash)
  GEMINI_BASE_URL            API endpoint override
  STUDY_GUARDIAN_CACHE_DIR   Where the last result and language are kept

  A .env file in the working directory is loaded first.
"#;

/// Exam-focused study guides from notes, slides and PDFs.
#[derive(Parser, Debug)]
#[command(
    name = "study-guardian",
    version,
    about = "Exam-focused study guides from notes, slides and PDFs",
    long_about = "Turn lecture notes, slides (PDF or image) or pasted text into a study guide \
with a summary, five exam questions, a simple explanation and a study plan, using Google Gemini.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "STUDY_GUARDIAN_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "STUDY_GUARDIAN_QUIET")]
    quiet: bool,

    /// Directory for the cached last result and language.
    #[arg(long, global = true, env = "STUDY_GUARDIAN_CACHE_DIR")]
    cache_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP service.
    Serve(ServeArgs),
    /// Produce a study guide for one file or text.
    Analyze(AnalyzeArgs),
    /// Print the last study guide from the local cache.
    Last(LastArgs),
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Address to listen on.
    #[arg(long, env = "STUDY_GUARDIAN_BIND", default_value = "127.0.0.1:3000")]
    bind: SocketAddr,

    /// Ceiling on one analysis request, in seconds.
    #[arg(long, env = "STUDY_GUARDIAN_REQUEST_TIMEOUT", default_value_t = 60)]
    request_timeout: u64,

    #[command(flatten)]
    model: ModelArgs,
}

#[derive(Args, Debug)]
struct AnalyzeArgs {
    /// PDF or image to analyse (pdf, png, jpg, webp, gif, heic).
    file: Option<PathBuf>,

    /// Text to analyse instead of a file; `-` reads stdin.
    #[arg(long, conflicts_with = "file")]
    text: Option<String>,

    /// Output language. Defaults to the last one used.
    #[arg(short, long, value_enum)]
    language: Option<LanguageArg>,

    /// Send the request to a running server instead of calling Gemini.
    #[arg(long, env = "STUDY_GUARDIAN_SERVER")]
    server: Option<String>,

    /// Also write the Markdown study guide to this file.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print the result as JSON instead of Markdown.
    #[arg(long)]
    json: bool,

    /// Do not store the result in the local cache.
    #[arg(long)]
    no_cache: bool,

    /// Disable the spinner.
    #[arg(long, env = "STUDY_GUARDIAN_NO_PROGRESS")]
    no_progress: bool,

    #[command(flatten)]
    model: ModelArgs,
}

#[derive(Args, Debug)]
struct LastArgs {
    /// Print the result as JSON instead of Markdown.
    #[arg(long)]
    json: bool,

    /// Write the Markdown study guide to this file.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Forget the cached study guide instead of printing it.
    #[arg(long, conflicts_with_all = ["json", "output"])]
    clear: bool,
}

/// Model settings shared by `serve` and in-process `analyze`.
#[derive(Args, Debug)]
struct ModelArgs {
    /// Candidate model, tried in order; repeat or comma-separate.
    #[arg(long = "model", value_delimiter = ',')]
    models: Vec<String>,

    /// Sampling temperature (0.0–2.0).
    #[arg(long, env = "STUDY_GUARDIAN_TEMPERATURE", default_value_t = 0.7)]
    temperature: f32,

    /// Blocking threshold sent for every harm category.
    #[arg(long, env = "STUDY_GUARDIAN_SAFETY", value_enum, default_value = "block-none")]
    safety: SafetyArg,

    /// Per-call timeout for the Gemini API, in seconds.
    #[arg(long, env = "STUDY_GUARDIAN_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    /// Largest accepted upload, in MiB.
    #[arg(long, env = "STUDY_GUARDIAN_MAX_UPLOAD_MB", default_value_t = 20)]
    max_upload_mb: usize,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum LanguageArg {
    English,
    Arabic,
}

impl From<LanguageArg> for Language {
    fn from(v: LanguageArg) -> Self {
        match v {
            LanguageArg::English => Language::English,
            LanguageArg::Arabic => Language::Arabic,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum SafetyArg {
    BlockNone,
    BlockOnlyHigh,
    BlockMediumAndAbove,
    BlockLowAndAbove,
    Off,
}

impl From<SafetyArg> for HarmBlockThreshold {
    fn from(v: SafetyArg) -> Self {
        match v {
            SafetyArg::BlockNone => HarmBlockThreshold::BlockNone,
            SafetyArg::BlockOnlyHigh => HarmBlockThreshold::BlockOnlyHigh,
            SafetyArg::BlockMediumAndAbove => HarmBlockThreshold::BlockMediumAndAbove,
            SafetyArg::BlockLowAndAbove => HarmBlockThreshold::BlockLowAndAbove,
            SafetyArg::Off => HarmBlockThreshold::Off,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner gives all the feedback a one-shot analysis needs, so INFO
    // logs are only shown by default for the long-running server.
    let default_filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else if matches!(cli.command, Command::Serve(_)) {
        "info"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(io::stderr)
        .init();

    let cache = match &cli.cache_dir {
        Some(dir) => ResultCache::open(dir),
        None => ResultCache::open_default(),
    }
    .context("Failed to open the local cache")?;

    match cli.command {
        Command::Serve(ref args) => run_serve(args).await,
        Command::Analyze(ref args) => run_analyze(args, &cache, cli.quiet).await,
        Command::Last(ref args) => run_last(args, &cache).await,
    }
}

async fn run_serve(args: &ServeArgs) -> Result<()> {
    let config = build_analyzer_config(&args.model)?;
    let analyzer = Arc::new(Analyzer::new(config).context("Failed to create the Gemini client")?);
    let server = ServerConfig {
        bind_addr: args.bind,
        request_timeout_secs: args.request_timeout,
    };
    study_guardian::server::serve(server, analyzer)
        .await
        .context("Server failed")
}

async fn run_analyze(args: &AnalyzeArgs, cache: &ResultCache, quiet: bool) -> Result<()> {
    let language = args
        .language
        .map(Language::from)
        .or_else(|| cache.load_language())
        .unwrap_or_default();
    if args.language.is_some() && !args.no_cache {
        cache
            .store_language(language)
            .context("Failed to remember the language")?;
    }

    let max_bytes = args.model.max_upload_mb.saturating_mul(1024 * 1024);
    let request = build_request(args, language, max_bytes).await?;

    let spinner = (!quiet && !args.no_progress).then(|| spinner("Analyzing your material…"));
    let start = Instant::now();

    let outcome = match &args.server {
        Some(url) => {
            let client = RemoteClient::new(url, args.model.api_timeout + 5)
                .context("Failed to create the HTTP client")?;
            client.analyze(&request).await.map_err(anyhow::Error::new)
        }
        None => {
            let config = build_analyzer_config(&args.model)?;
            let analyzer = Analyzer::new(config).context("Failed to create the Gemini client")?;
            analyzer.analyze(&request).await.map_err(explain)
        }
    };

    if let Some(bar) = &spinner {
        bar.finish_and_clear();
    }
    let result = outcome.context("Analysis failed")?;

    if !quiet {
        eprintln!(
            "{} Study guide ready  {}  {}",
            green("✔"),
            dim(&result.used_model),
            dim(&format!("{:.1}s", start.elapsed().as_secs_f64()))
        );
    }

    if !args.no_cache {
        cache
            .store_result(&result)
            .context("Failed to cache the result")?;
    }
    emit(&result, args.json, args.output.as_ref(), quiet).await
}

async fn run_last(args: &LastArgs, cache: &ResultCache) -> Result<()> {
    if args.clear {
        return cache
            .clear_result()
            .context("Failed to clear the cached study guide");
    }
    let Some(result) = cache.load_result() else {
        anyhow::bail!(
            "No cached study guide in {}. Run `study-guardian analyze` first.",
            cache.dir().display()
        );
    };
    emit(&result, args.json, args.output.as_ref(), false).await
}

/// Map CLI args on top of the environment to an `AnalyzerConfig`.
fn build_analyzer_config(args: &ModelArgs) -> Result<AnalyzerConfig> {
    let env = AnalyzerConfig::from_env().context("Invalid environment configuration")?;
    let models = if args.models.is_empty() {
        env.models
    } else {
        args.models.clone()
    };

    AnalyzerConfig::builder()
        .api_keys(env.api_keys)
        .base_url(env.base_url)
        .models(models)
        .temperature(args.temperature)
        .safety_threshold(args.safety.into())
        .api_timeout_secs(args.api_timeout)
        .max_upload_bytes(args.max_upload_mb.saturating_mul(1024 * 1024))
        .build()
        .context("Invalid configuration")
}

async fn build_request(
    args: &AnalyzeArgs,
    language: Language,
    max_bytes: usize,
) -> Result<AnalysisRequest> {
    if let Some(path) = &args.file {
        return AnalysisRequest::from_path(path, language, max_bytes)
            .await
            .map_err(explain);
    }

    let text = match args.text.as_deref() {
        Some("-") => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read text from stdin")?;
            buf
        }
        Some(text) => text.to_string(),
        None => String::new(),
    };
    AnalysisRequest::text(text, language).map_err(explain)
}

/// Print and/or export a study guide.
async fn emit(
    result: &AnalysisResult,
    json: bool,
    output: Option<&PathBuf>,
    quiet: bool,
) -> Result<()> {
    if let Some(path) = output {
        export_markdown(result, path)
            .await
            .context("Failed to export the study guide")?;
        if !quiet {
            eprintln!("{} {}", green("→"), bold(&path.display().to_string()));
        }
        if !json {
            return Ok(());
        }
    }

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    if json {
        let body = serde_json::to_string_pretty(result).context("Failed to serialise result")?;
        writeln!(handle, "{body}").context("Failed to write to stdout")?;
    } else {
        handle
            .write_all(render_markdown(result).as_bytes())
            .context("Failed to write to stdout")?;
    }
    Ok(())
}

/// Lead with the friendly message for the error kind when there is one.
fn explain(err: StudyGuardianError) -> anyhow::Error {
    match err.kind().friendly_message() {
        Some(friendly) => anyhow::Error::new(err).context(friendly),
        None => anyhow::Error::new(err),
    }
}

fn spinner(message: &str) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
    );
    bar.set_message(message.to_string());
    bar.enable_steady_tick(Duration::from_millis(80));
    bar
}
