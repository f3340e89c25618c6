//! CLI binary for edgequake-studyguide.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `GenerationConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_studyguide::pipeline::input::resolve_upload;
use edgequake_studyguide::{
    extract_upload, generate, prepare_text, write_atomic, write_export, ExportFormat,
    GenerationConfig, GenerationOutput, GenerationProgressCallback, PdfEngine, ProgressCallback,
    RemoteClient,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal spinner with one log line per finished stage.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style =
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Preparing");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl GenerationProgressCallback for CliProgressCallback {
    fn on_extract_start(&self, filename: &str, bytes: usize) {
        self.bar.set_prefix("Reading");
        self.bar.set_message(format!("{filename} ({bytes} bytes)"));
    }

    fn on_extract_complete(&self, filename: &str, chars: usize) {
        self.bar.println(format!(
            "  {} {}  {}",
            green("✓"),
            filename,
            dim(&format!("{chars} chars"))
        ));
    }

    fn on_truncated(&self, original_chars: usize, kept_chars: usize) {
        self.bar.println(format!(
            "  {} input truncated from {original_chars} to {kept_chars} characters",
            yellow("⚠")
        ));
    }

    fn on_request_start(&self, input_chars: usize) {
        self.bar.set_prefix("Generating");
        self.bar.set_message(format!("study guide from {input_chars} chars…"));
    }

    fn on_request_complete(&self, concepts: usize, questions: usize) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} study guide ready: {} concepts, {} questions",
            green("✔"),
            bold(&concepts.to_string()),
            bold(&questions.to_string())
        );
    }

    fn on_error(&self, error: &str) {
        self.bar.finish_and_clear();
        let first_line = error.lines().next().unwrap_or(error);
        eprintln!("{} {}", red("✘"), red(first_line));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Study guide from a PDF (stdout, plain text)
  studyguide lecture.pdf

  # Word document to a printable HTML file
  studyguide notes.docx --format html -o guide.html

  # Pasted text
  studyguide --text "Photosynthesis converts light energy into chemical energy..."

  # From stdin
  cat chapter3.md | studyguide -

  # Download and summarise
  studyguide https://example.com/handout.pdf

  # Show what would be sent to the model (no API key needed)
  studyguide --extract-only slides.pdf

  # Use a hosted endpoint instead of calling the model directly
  studyguide --endpoint https://study.example.com/api/generate notes.md

SUPPORTED INPUTS:
  .pdf                 page text via pdfium, pages separated by a blank line
  .docx .doc           Word package text (legacy binary .doc is not supported)
  .txt .md .text       verbatim
  anything else        decoded as UTF-8, best effort
  Uploads are limited to 10 MB (pdf/docx/doc) or 5 MB (everything else);
  text longer than 10,000 characters is truncated with a warning.

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
  PDFIUM_LIB_PATH         Path to a pdfium shared library
  STUDYGUIDE_ENDPOINT     Remote /api/generate URL (same as --endpoint)
"#;

/// Generate study guides from notes, PDFs and Word documents.
#[derive(Parser, Debug)]
#[command(
    name = "studyguide",
    version,
    about = "Generate study guides from notes, PDFs and Word documents",
    long_about = "Turn study material (text, Markdown, PDF or Word) into a summary, a detailed \
summary, key concepts with definitions and practice questions using an LLM. Supports OpenAI, \
Anthropic, Google Gemini, Ollama and any provider known to edgequake-llm.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local file path, HTTP/HTTPS URL, or `-` for stdin.
    #[arg(required_unless_present = "text", conflicts_with = "text")]
    input: Option<String>,

    /// Study material given directly on the command line.
    #[arg(long, env = "STUDYGUIDE_TEXT")]
    text: Option<String>,

    /// Write the guide to this file instead of stdout.
    #[arg(short, long, env = "STUDYGUIDE_OUTPUT")]
    output: Option<PathBuf>,

    /// Output format.
    #[arg(long, env = "STUDYGUIDE_FORMAT", value_enum, default_value = "text")]
    format: FormatArg,

    /// Send the text to a remote /api/generate endpoint instead of an LLM.
    #[arg(long, env = "STUDYGUIDE_ENDPOINT")]
    endpoint: Option<String>,

    /// LLM model ID (e.g. gpt-4.1-nano, gpt-4.1-mini, claude-sonnet-4-20250514).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(
        long,
        env = "EDGEQUAKE_PROVIDER",
        long_help = "LLM provider. Auto-detected from API key env vars if not set.\n\
          Supported: openai, anthropic, gemini, azure, ollama, or any OpenAI-compatible URL."
    )]
    provider: Option<String>,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "STUDYGUIDE_TEMPERATURE", default_value_t = 0.4)]
    temperature: f32,

    /// Max LLM output tokens.
    #[arg(long, env = "STUDYGUIDE_MAX_TOKENS", default_value_t = 700)]
    max_tokens: usize,

    /// Follow-up requests when the model answer is not valid JSON (0–2).
    #[arg(long, env = "STUDYGUIDE_REPAIR_ATTEMPTS", default_value_t = 0,
          value_parser = clap::value_parser!(u32).range(0..=2))]
    repair_attempts: u32,

    /// Path to a text file containing a custom system prompt.
    #[arg(long, env = "STUDYGUIDE_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Path to the pdfium shared library.
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "STUDYGUIDE_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Print the text that would be sent to the model, then stop.
    #[arg(long)]
    extract_only: bool,

    /// Disable the progress spinner.
    #[arg(long, env = "STUDYGUIDE_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "STUDYGUIDE_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "STUDYGUIDE_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Text,
    Html,
    Json,
}

impl From<FormatArg> for ExportFormat {
    fn from(v: FormatArg) -> Self {
        match v {
            FormatArg::Text => ExportFormat::Text,
            FormatArg::Html => ExportFormat::Html,
            FormatArg::Json => ExportFormat::Json,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner gives all the feedback that matters; keep library logs
    // at ERROR while it is visible.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.extract_only;
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

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn GenerationProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb).await?;
    let engine = match cli.pdfium_lib {
        Some(ref p) => PdfEngine::with_library_path(p.clone()),
        None => PdfEngine::new(),
    };

    // ── Gather the study material ────────────────────────────────────────
    let raw_text = read_material(&cli, &engine, &config).await?;

    // ── Extract-only mode ────────────────────────────────────────────────
    if cli.extract_only {
        let guarded = prepare_text(&raw_text, &config).context("Nothing to send")?;
        if let Some(w) = guarded.warning() {
            eprintln!("{} {}", yellow("⚠"), w);
        }
        let mut stdout = io::stdout().lock();
        stdout
            .write_all(guarded.as_str().as_bytes())
            .context("Failed to write to stdout")?;
        if !guarded.as_str().ends_with('\n') {
            stdout
                .write_all(b"\n")
                .context("Failed to write to stdout")?;
        }
        return Ok(());
    }

    // ── Generate ─────────────────────────────────────────────────────────
    let output = match cli.endpoint {
        Some(ref endpoint) => generate_remote(endpoint, &raw_text, &config).await?,
        None => generate(&raw_text, &config)
            .await
            .context("Study guide generation failed")?,
    };

    if !show_progress && !cli.quiet {
        for w in &output.warnings {
            eprintln!("{} {}", yellow("⚠"), w);
        }
    }

    // ── Write results ────────────────────────────────────────────────────
    let format = ExportFormat::from(cli.format);
    let rendered = match format {
        // JSON keeps warnings and stats next to the guide.
        ExportFormat::Json => {
            serde_json::to_string_pretty(&output).context("Failed to serialise output")?
        }
        _ => format.render(&output.result).context("Failed to render study guide")?,
    };

    if let Some(ref path) = cli.output {
        if format == ExportFormat::Json {
            write_atomic(path, &rendered)
                .await
                .context("Failed to write study guide")?;
        } else {
            write_export(&output.result, format, path)
                .await
                .context("Failed to write study guide")?;
        }
        if !cli.quiet {
            eprintln!("{}  →  {}", green("✔"), bold(&path.display().to_string()));
        }
    } else {
        let mut stdout = io::stdout().lock();
        stdout
            .write_all(rendered.as_bytes())
            .context("Failed to write to stdout")?;
        if !rendered.ends_with('\n') {
            stdout
                .write_all(b"\n")
                .context("Failed to write to stdout")?;
        }
    }

    if !cli.quiet {
        eprintln!(
            "   {} tokens in  /  {} tokens out  —  {}ms",
            dim(&output.stats.input_tokens.to_string()),
            dim(&output.stats.output_tokens.to_string()),
            output.stats.duration_ms,
        );
    }

    Ok(())
}

/// Text from `--text`, stdin, or an extracted file/URL.
async fn read_material(cli: &Cli, engine: &PdfEngine, config: &GenerationConfig) -> Result<String> {
    if let Some(ref text) = cli.text {
        return Ok(text.clone());
    }
    let input = cli.input.as_deref().unwrap_or("-");
    if input == "-" {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read study material from stdin")?;
        return Ok(buf);
    }

    let upload = resolve_upload(input, config.download_timeout_secs)
        .await
        .with_context(|| format!("Failed to open {input}"))?;
    extract_upload(&upload, engine, config)
        .await
        .with_context(|| format!("Failed to extract text from {input}"))
}

/// Thin-client mode: the endpoint holds the credential.
async fn generate_remote(
    endpoint: &str,
    text: &str,
    config: &GenerationConfig,
) -> Result<GenerationOutput> {
    let client = RemoteClient::new(endpoint).context("Failed to create HTTP client")?;
    let guarded = prepare_text(text, config).context("Nothing to send")?;
    if let Some(ref cb) = config.progress_callback {
        cb.on_request_start(guarded.char_len());
    }
    match client.generate(guarded.as_str()).await {
        Ok(mut output) => {
            if let Some(ref cb) = config.progress_callback {
                cb.on_request_complete(output.result.concepts.len(), output.result.questions.len());
            }
            output.warnings.extend(guarded.warning().cloned());
            Ok(output)
        }
        Err(e) => {
            if let Some(ref cb) = config.progress_callback {
                cb.on_error(&e.to_string());
            }
            anyhow::bail!("Request to {} failed: {}", client.endpoint(), e.user_message())
        }
    }
}

/// Map CLI args to `GenerationConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<GenerationConfig> {
    let system_prompt = if let Some(ref path) = cli.system_prompt {
        Some(
            tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read system prompt from {:?}", path))?,
        )
    } else {
        None
    };

    let mut builder = GenerationConfig::builder()
        .temperature(cli.temperature)
        .max_tokens(cli.max_tokens)
        .repair_attempts(cli.repair_attempts)
        .download_timeout_secs(cli.download_timeout);

    if let Some(ref m) = cli.model {
        builder = builder.model(m.clone());
    }
    if let Some(ref p) = cli.provider {
        builder = builder.provider_name(p.clone());
    }
    if let Some(prompt) = system_prompt {
        builder = builder.system_prompt(prompt);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
