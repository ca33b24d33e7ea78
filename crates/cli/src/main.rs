use anyhow::Context;
use clap::Parser;
use projection_core::config::{ProjectionDefaults, Settings};
use projection_core::domain::input::ProjectionInput;
use projection_core::domain::metric::Metric;
use projection_core::domain::output::OutputDocument;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "projection_engine")]
struct Args {
    /// Path to the input document (ticker, parameters, historical series, guidance).
    #[arg(long)]
    context: PathBuf,

    /// Where to write the projection JSON. Defaults to stdout.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Date stamped into `generated_at` (YYYY-MM-DD). Defaults to today's local date.
    #[arg(long)]
    as_of_date: Option<String>,
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    // stdout carries the document, so logs go to stderr.
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    if let Err(err) = run(&args, &settings) {
        sentry_anyhow::capture_anyhow(&err);
        tracing::error!(context = %args.context.display(), error = %err, "projection run failed");
        return Err(err);
    }
    Ok(())
}

fn run(args: &Args, settings: &Settings) -> anyhow::Result<()> {
    let defaults = settings.projection_defaults()?;
    let generated_at = resolve_as_of_date(args.as_of_date.as_deref())?;

    let doc = project_file(&args.context, &defaults, generated_at)?;
    let rendered = render(&doc)?;

    let destination = match &args.output {
        Some(path) => {
            std::fs::write(path, rendered)
                .with_context(|| format!("write output failed: {}", path.display()))?;
            path.display().to_string()
        }
        None => {
            use std::io::Write;
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(rendered.as_bytes())
                .context("write to stdout failed")?;
            stdout.flush().context("flush stdout failed")?;
            "stdout".to_string()
        }
    };

    let projected = doc.projections.series.len();
    tracing::info!(
        ticker = %doc.ticker,
        output = %destination,
        projected,
        skipped = Metric::ALL.len() - projected,
        "projection written"
    );

    Ok(())
}

fn project_file(
    path: &Path,
    defaults: &ProjectionDefaults,
    generated_at: chrono::NaiveDate,
) -> anyhow::Result<OutputDocument> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read context failed: {}", path.display()))?;
    let input: ProjectionInput = serde_json::from_str(&text)
        .with_context(|| format!("parse context failed: {}", path.display()))?;

    tracing::debug!(ticker = input.ticker(), %generated_at, "running projection");

    projection_core::run_projection(&input, defaults, generated_at)
        .with_context(|| format!("projection failed for {}", input.ticker()))
}

fn render(doc: &OutputDocument) -> anyhow::Result<String> {
    let mut rendered = serde_json::to_string_pretty(doc).context("serialize output failed")?;
    rendered.push('\n');
    Ok(rendered)
}

fn init_sentry(settings: &Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}

fn resolve_as_of_date(as_of_date_arg: Option<&str>) -> anyhow::Result<chrono::NaiveDate> {
    if let Some(s) = as_of_date_arg {
        return chrono::NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .with_context(|| format!("invalid --as-of-date: {s}"));
    }
    Ok(chrono::Local::now().date_naive())
}
