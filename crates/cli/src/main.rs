//! CLI tool for translating spreadsheets and slide decks.

use anyhow::{bail, Context, Result};
use clap::Parser;
use pptrans_core::{
    output_path, Document, DocumentFormat, DryRunTranslator, EditorSession, FragmentFilter,
    RunReport, TranslationJob, Translator, DEFAULT_SOURCE_LANGUAGE,
};
use pptrans_google::{Credentials, GoogleConfig, GoogleTranslator, DEFAULT_ENDPOINT};
use pptrans_pptx::SlideDeck;
use pptrans_xlsx::Workbook;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Translate the text of an Excel workbook or PowerPoint deck.
///
/// Writes `<name>.<language>.<ext>` next to the input; the input is never modified.
#[derive(Parser, Debug)]
#[command(name = "pptrans")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input document (.xlsx or .pptx)
    file: PathBuf,

    /// Target language code (e.g. de, fr, zh-TW)
    language: String,

    /// Source language code
    #[arg(short, long, default_value = DEFAULT_SOURCE_LANGUAGE)]
    source: String,

    /// Google Cloud Translation API key
    #[arg(long, env = "GOOGLE_TRANSLATE_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// OAuth access token, used when no API key is given
    #[arg(long, env = "GOOGLE_ACCESS_TOKEN", hide_env_values = true)]
    access_token: Option<String>,

    /// Translation endpoint
    #[arg(long, env = "PPTRANS_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    endpoint: String,

    /// Request timeout in seconds
    #[arg(long, default_value = "60")]
    timeout: u64,

    /// Proxy for translation requests
    #[arg(long, env = "PPTRANS_PROXY")]
    proxy: Option<String>,

    /// Show what would be translated without calling the service or writing output
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Print the run report as JSON on stdout
    #[arg(long)]
    json: bool,

    /// Wait for Enter before exiting
    #[arg(long)]
    pause: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let env = env_logger::Env::default().default_filter_or(default_log_filter(args.verbose));
    env_logger::Builder::from_env(env).init();

    let result = run(&args);

    if args.pause {
        pause();
    }

    result
}

/// Per-fragment progress from the pipeline is shown unless `RUST_LOG` says otherwise.
fn default_log_filter(verbose: bool) -> &'static str {
    if verbose {
        "debug"
    } else {
        "warn,pptrans_core=info"
    }
}

fn run(args: &Args) -> Result<()> {
    validate_language(&args.language)?;

    let input = std::path::absolute(&args.file)
        .with_context(|| format!("Failed to resolve {}", args.file.display()))?;
    let format = DocumentFormat::from_path(&input)?;

    let translator = build_translator(args)?;
    let filter = build_filter();
    let job = TranslationJob::new(translator.as_ref(), &filter, args.language.as_str())
        .with_source(args.source.as_str());

    let output = if args.dry_run {
        None
    } else {
        Some(output_path(&input, &args.language)?)
    };

    if args.verbose {
        eprintln!("Processing {}: {}", format, input.display());
    }

    let report = match format {
        DocumentFormat::Spreadsheet => {
            let workbook = Workbook::open(&input)
                .with_context(|| format!("Failed to open workbook {}", input.display()))?;
            translate(workbook, &job, output.as_deref())?
        }
        DocumentFormat::SlideDeck => {
            let deck = SlideDeck::open(&input)
                .with_context(|| format!("Failed to open slide deck {}", input.display()))?;
            translate(deck, &job, output.as_deref())?
        }
    };

    log::info!(
        "translated {} fragments, skipped {}",
        report.translated,
        report.skipped_total()
    );

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if let Some(output) = &report.output {
        println!("Output: {}", output.display());
        println!();
        println!("{}", review_hint(format));
    } else {
        println!(
            "Dry run: {} fragments would be translated, {} skipped",
            report.translated,
            report.skipped_total()
        );
    }

    Ok(())
}

/// Translate an open document and save it under `output`, if given.
///
/// The document is closed on every path, including failures.
fn translate<D: Document>(
    document: D,
    job: &TranslationJob<'_>,
    output: Option<&Path>,
) -> Result<RunReport> {
    let mut session = EditorSession::new(document);
    let mut report = job
        .run(session.document_mut()?)
        .context("Translation failed")?;

    match output {
        Some(path) => {
            session
                .finish(path)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            report.output = Some(path.to_path_buf());
        }
        None => session.close()?,
    }

    Ok(report)
}

fn build_translator(args: &Args) -> Result<Box<dyn Translator>> {
    if args.dry_run {
        return Ok(Box::new(DryRunTranslator));
    }

    let credentials = match (&args.api_key, &args.access_token) {
        (Some(key), _) if !key.is_empty() => Credentials::ApiKey(key.clone()),
        (_, Some(token)) if !token.is_empty() => Credentials::AccessToken(token.clone()),
        _ => bail!(
            "No credentials: set GOOGLE_TRANSLATE_API_KEY or GOOGLE_ACCESS_TOKEN (or use --dry-run)"
        ),
    };

    let mut config = GoogleConfig::new(credentials)
        .with_endpoint(args.endpoint.as_str())
        .with_timeout(Duration::from_secs(args.timeout));
    if let Some(proxy) = &args.proxy {
        config = config.with_proxy(proxy.as_str());
    }

    Ok(Box::new(GoogleTranslator::new(config)?))
}

#[cfg(feature = "glyph-metrics")]
fn build_filter() -> FragmentFilter {
    FragmentFilter::new().with_monospace_policy(pptrans_core::filter::GlyphWidthPolicy::new())
}

#[cfg(not(feature = "glyph-metrics"))]
fn build_filter() -> FragmentFilter {
    FragmentFilter::new()
}

/// The language code ends up in the output file name.
fn validate_language(language: &str) -> Result<()> {
    if language.trim().is_empty() {
        bail!("Language code must not be empty");
    }
    if language.contains(['/', '\\']) {
        bail!("Language code must not contain path separators: {}", language);
    }
    Ok(())
}

fn review_hint(format: DocumentFormat) -> &'static str {
    match format {
        DocumentFormat::Spreadsheet => "Ready. Please check the workbook for translation errors!",
        DocumentFormat::SlideDeck => {
            "Ready. Please check the presentation for colors, layout and translation errors!"
        }
    }
}

fn pause() {
    eprint!("Press Enter to exit...");
    let _ = io::stderr().flush();
    let mut line = String::new();
    let _ = io::stdin().lock().read_line(&mut line);
}
