use anyhow::Context;
use std::io::Write;
use std::path::Path;
use wmipf::cli::{Cli, OutputFormat};
use wmipf::config::{Config, ConfigValidator};
use wmipf::report::{BenignAllowList, JsonRenderer, Report, TextRenderer};
use wmipf::scanner::Scanner;
use wmipf::source::{ByteSource, FileSource};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse_args();

    init_logging(cli.verbose);

    let config = load_config(cli.config.as_deref())?;
    let source = FileSource::new(&cli.input);

    // Nothing is printed for an input that cannot be opened
    drop(
        source
            .open()
            .with_context(|| format!("Cannot read input file {}", cli.input.display()))?,
    );

    let scanner = Scanner::new(&config.scan)?;
    let allow_list = BenignAllowList::from_config(&config.report);

    match cli.format {
        OutputFormat::Text => run_text(&scanner, &source, &allow_list),
        OutputFormat::Json => run_json(&scanner, &source, &allow_list),
    }
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_level = if verbose { "wmipf=debug" } else { "wmipf=warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run_text(
    scanner: &Scanner,
    source: &FileSource,
    allow_list: &BenignAllowList,
) -> anyhow::Result<()> {
    let renderer = TextRenderer;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    renderer.write_header(&mut out)?;
    out.flush().context("Failed to flush report header")?;

    let bindings = scanner
        .locate_bindings(source)
        .context("Binding pass failed")?;

    renderer.write_progress(&mut out, bindings.binding_count())?;
    out.flush().context("Failed to flush report progress")?;

    let results = scanner
        .extract_details(source, bindings)
        .context("Detail pass failed")?;

    let report = Report::assemble(&results, allow_list, source.describe());
    renderer.write_bindings(&mut out, &report)?;
    renderer.write_footer(&mut out)?;
    out.flush().context("Failed to flush report")?;

    Ok(())
}

fn run_json(
    scanner: &Scanner,
    source: &FileSource,
    allow_list: &BenignAllowList,
) -> anyhow::Result<()> {
    let results = scanner.scan(source).context("Scan failed")?;
    let report = Report::assemble(&results, allow_list, source.describe());

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    JsonRenderer::new(true).render(&mut out, &report)?;
    out.flush().context("Failed to flush report")?;

    Ok(())
}

fn load_config(config_path: Option<&Path>) -> anyhow::Result<Config> {
    if let Some(path) = config_path {
        return Config::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()));
    }

    let path = match Config::default_path() {
        Ok(path) => path,
        Err(e) => {
            tracing::debug!("No default config location: {}", e);
            return defaults_with_env();
        }
    };

    if !path.exists() {
        tracing::debug!("Config file not found at {:?}, using defaults", path);
        return defaults_with_env();
    }

    Config::load(&path).with_context(|| format!("Failed to load config {}", path.display()))
}

fn defaults_with_env() -> anyhow::Result<Config> {
    let mut config = Config::default();
    config.apply_env_overrides();
    ConfigValidator::validate(&config).context("Invalid environment overrides")?;
    Ok(config)
}
