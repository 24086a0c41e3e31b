//! CLI binary for boleto-slicer.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `SlicerConfig`, writes the page files and prints a summary.

use anyhow::{Context, Result};
use boleto_slicer::pipeline::export;
use boleto_slicer::{
    inspect, slice, ExtractionStrategy, ProgressCallback, Sentinel, SliceProgressCallback,
    SlicerConfig,
};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Live progress bar plus one log line per page.
struct CliProgressCallback {
    bar: ProgressBar,
    degraded: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_prefix("Preparing");
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self {
            bar,
            degraded: AtomicUsize::new(0),
        })
    }
}

impl SliceProgressCallback for CliProgressCallback {
    fn on_slice_start(&self, total_pages: usize) {
        self.bar.set_length(total_pages as u64);
        self.bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}/{len} pages  \
                 ⏱ {elapsed_precise}  {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  "),
        );
        self.bar.set_prefix("Slicing");
        self.bar.reset_eta();
    }

    fn on_page_start(&self, page_num: usize, _total_pages: usize) {
        self.bar.set_message(format!("page {page_num}"));
    }

    fn on_page_degraded(&self, _page_num: usize, _total_pages: usize, _reason: Sentinel) {
        self.degraded.fetch_add(1, Ordering::SeqCst);
    }

    fn on_page_complete(&self, page_num: usize, total_pages: usize, label: &str) {
        let mark = if label.starts_with("BOLETO-PAG-") {
            yellow("•")
        } else {
            green("✓")
        };
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}",
            mark,
            page_num,
            total_pages,
            dim(&format!("{label}.pdf"))
        ));
        self.bar.inc(1);
    }

    fn on_slice_complete(&self, _total_pages: usize, _identified: usize) {
        self.bar.finish_and_clear();
    }

    fn on_slice_error(&self, _error: &str) {
        self.bar.abandon();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Vision strategy (default), one PDF per page into ./boletos
  boleto-slicer lote.pdf

  # Offline text strategy, custom output directory, plus a ZIP archive
  boleto-slicer --strategy text -o ./saida --zip lote.pdf

  # Page count only (no API key needed)
  boleto-slicer --inspect-only lote.pdf

OUTPUT NAMES:
  <document number>.pdf     e.g. 24277-4.pdf
  BOLETO-PAG-<page>.pdf     when the number could not be read
  <number>_<page>.pdf       when an earlier page had the same number
  BOLETOS_<millis>.zip      with --zip

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY          API key for the default vision provider
  OPENAI_API_KEY          API key when --provider openai
  ANTHROPIC_API_KEY       API key when --provider anthropic
  PDFIUM_LIB_PATH         Directory containing libpdfium
"#;

/// Split a boleto PDF into one file per page, named after its document number.
#[derive(Parser, Debug)]
#[command(
    name = "boleto-slicer",
    version,
    about = "Split boleto PDFs into single pages named after their document number",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path or HTTP/HTTPS URL.
    input: String,

    /// Directory for the page files.
    #[arg(short, long, env = "BOLETO_SLICER_OUTPUT", default_value = "./boletos")]
    output: PathBuf,

    /// How to read the document number: vision or text.
    #[arg(long, env = "BOLETO_SLICER_STRATEGY", value_enum, default_value = "vision")]
    strategy: StrategyArg,

    /// Also write BOLETOS_<millis>.zip with every page.
    #[arg(long, env = "BOLETO_SLICER_ZIP")]
    zip: bool,

    /// Print the result as JSON on stdout.
    #[arg(long, env = "BOLETO_SLICER_JSON")]
    json: bool,

    /// Vision provider: gemini, openai, anthropic, mistral, ollama.
    #[arg(long, env = "BOLETO_SLICER_PROVIDER", default_value = "gemini")]
    provider: String,

    /// Vision model ID. Default depends on the provider.
    #[arg(long, env = "BOLETO_SLICER_MODEL")]
    model: Option<String>,

    /// Page render scale for the vision strategy (2.0–2.5).
    #[arg(long, env = "BOLETO_SLICER_SCALE", default_value_t = 2.0)]
    scale: f32,

    /// Vision temperature (0.0–0.2).
    #[arg(long, env = "BOLETO_SLICER_TEMPERATURE", default_value_t = 0.1)]
    temperature: f32,

    /// Retries per page on a failed vision call.
    #[arg(long, env = "BOLETO_SLICER_MAX_RETRIES", default_value_t = 2)]
    max_retries: u32,

    /// Per-call vision timeout in seconds.
    #[arg(long, env = "BOLETO_SLICER_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    /// Line grouping tolerance in PDF points for the text strategy.
    #[arg(long, env = "BOLETO_SLICER_LINE_TOLERANCE", default_value_t = 5.0)]
    line_tolerance: f32,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "BOLETO_SLICER_PASSWORD")]
    password: Option<String>,

    /// Path to a text file with a replacement vision prompt.
    #[arg(long, env = "BOLETO_SLICER_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "BOLETO_SLICER_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Print page count and size only.
    #[arg(long)]
    inspect_only: bool,

    /// Disable progress bar.
    #[arg(long, env = "BOLETO_SLICER_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "BOLETO_SLICER_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "BOLETO_SLICER_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum StrategyArg {
    Vision,
    Text,
}

impl From<StrategyArg> for ExtractionStrategy {
    fn from(v: StrategyArg) -> Self {
        match v {
            StrategyArg::Vision => ExtractionStrategy::Vision,
            StrategyArg::Text => ExtractionStrategy::Text,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs; --verbose always wins.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let cli_cb = (show_progress && !cli.inspect_only).then(CliProgressCallback::new);
    let progress_cb = cli_cb
        .clone()
        .map(|cb| cb as Arc<dyn SliceProgressCallback>);
    let config = build_config(&cli, progress_cb).await?;

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let info = inspect(&cli.input, &config)
            .await
            .context("Failed to inspect PDF")?;
        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&info).context("Failed to serialize document info")?
            );
        } else {
            println!("File:   {}", cli.input);
            println!("Pages:  {}", info.page_count);
            println!("Size:   {} bytes", info.size_bytes);
        }
        return Ok(());
    }

    // ── Run ──────────────────────────────────────────────────────────────
    let output = slice(&cli.input, &config).await.context("Slicing failed")?;

    export::write_pages(&cli.output, &output.pages)
        .await
        .context("Failed to write page files")?;

    let archive = if cli.zip {
        Some(
            export::write_archive(&cli.output, &output.pages)
                .await
                .context("Failed to write archive")?,
        )
    } else {
        None
    };

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    }

    if !cli.quiet {
        let stats = &output.stats;
        eprintln!(
            "{}  {}/{} pages identified  {}ms  →  {}",
            if stats.placeholder_pages == 0 {
                green("✔")
            } else {
                yellow("⚠")
            },
            stats.identified_pages,
            stats.total_pages,
            stats.duration_ms,
            bold(&cli.output.display().to_string()),
        );
        if let Some(cb) = &cli_cb {
            let degraded = cb.degraded.load(Ordering::SeqCst);
            if degraded > 0 {
                eprintln!("   {} pages fell back to BOLETO-PAG-<n>", red(&degraded.to_string()));
            }
        }
        if let Some(path) = archive {
            eprintln!("   archive: {}", bold(&path.display().to_string()));
        }
    }

    Ok(())
}

/// Map CLI args to `SlicerConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<SlicerConfig> {
    let mut builder = SlicerConfig::builder()
        .strategy(cli.strategy.into())
        .provider_name(cli.provider.clone())
        .render_scale(cli.scale)
        .temperature(cli.temperature)
        .max_retries(cli.max_retries)
        .api_timeout_secs(cli.api_timeout)
        .line_tolerance(cli.line_tolerance)
        .download_timeout_secs(cli.download_timeout);

    if let Some(ref model) = cli.model {
        builder = builder.model(model.clone());
    }
    if let Some(ref password) = cli.password {
        builder = builder.password(password.clone());
    }
    if let Some(ref path) = cli.system_prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read system prompt from {:?}", path))?;
        builder = builder.system_prompt(prompt);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
