use std::process::ExitCode;

use camino::Utf8Path;
use clap::Parser;
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use gdc_slide_fetcher::app::App;
use gdc_slide_fetcher::config::{CliOverrides, ConfigLoader};
use gdc_slide_fetcher::error::FetchError;
use gdc_slide_fetcher::gdc::{DownloadedFile, GdcClient, GdcHttpClient};
use gdc_slide_fetcher::output::{ConsoleSink, JsonOutput, OutputMode};
use gdc_slide_fetcher::store::Store;

#[derive(Parser)]
#[command(name = "gdc-sf")]
#[command(about = "Fetch TCGA diagnostic whole-slide images from the GDC data portal")]
#[command(version, author)]
struct Cli {
    /// Cohort label naming the manifest files and the download directory.
    #[arg(long)]
    dataset: Option<String>,

    /// Directory holding the train.csv and test.csv split tables.
    #[arg(long)]
    splits_dir: Option<String>,

    /// Config file path (default: slide-fetch.json, if present).
    #[arg(long)]
    config: Option<String>,

    /// Regenerate the filtered manifest and stop before downloading.
    #[arg(long, conflicts_with = "download_only")]
    filter_only: bool,

    /// Download from an existing filtered manifest without regenerating it.
    #[arg(long)]
    download_only: bool,

    /// Emit JSON results on stdout instead of the interactive summary.
    #[arg(long)]
    non_interactive: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(fetch) = report.downcast_ref::<FetchError>() {
            return ExitCode::from(map_exit_code(fetch));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &FetchError) -> u8 {
    match error {
        FetchError::GdcHttp(_)
        | FetchError::GdcStatus { .. }
        | FetchError::MissingFilename(_) => 3,
        FetchError::InvalidDatasetLabel(_)
        | FetchError::InvalidFileId(_)
        | FetchError::ConfigRead(_)
        | FetchError::ConfigParse(_)
        | FetchError::ManifestRead(..)
        | FetchError::ManifestEmpty(_)
        | FetchError::MissingColumn(_)
        | FetchError::SplitRead(..)
        | FetchError::MissingSlideColumn(_)
        | FetchError::CohortMismatch { .. } => 2,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.non_interactive {
        OutputMode::NonInteractive
    } else {
        OutputMode::Interactive
    };

    let overrides = CliOverrides {
        dataset: cli.dataset,
        splits_dir: cli.splits_dir,
    };
    let resolved = ConfigLoader::resolve(cli.config.as_deref(), overrides).into_diagnostic()?;
    let store = Store::new().into_diagnostic()?;

    if cli.filter_only {
        let app = App::new(store, NopGdc);
        run_filter(&app, &resolved.dataset, &resolved.splits_dir, output_mode)?;
        return Ok(());
    }

    let gdc = GdcHttpClient::new(&resolved.base_url).into_diagnostic()?;
    let app = App::new(store, gdc);

    if !cli.download_only {
        run_filter(&app, &resolved.dataset, &resolved.splits_dir, output_mode)?;
    }

    match output_mode {
        OutputMode::NonInteractive => {
            let result = app.download(&resolved.dataset, &JsonOutput).into_diagnostic()?;
            JsonOutput::print_fetch(&result).into_diagnostic()?;
        }
        OutputMode::Interactive => {
            let result = app.download(&resolved.dataset, &ConsoleSink).into_diagnostic()?;
            print_fetch_summary(&result);
        }
    }
    Ok(())
}

fn run_filter<G: GdcClient>(
    app: &App<G>,
    dataset: &gdc_slide_fetcher::domain::DatasetLabel,
    splits_dir: &Utf8Path,
    output_mode: OutputMode,
) -> miette::Result<()> {
    match output_mode {
        OutputMode::NonInteractive => {
            let result = app.filter(dataset, splits_dir, &JsonOutput).into_diagnostic()?;
            JsonOutput::print_filter(&result).into_diagnostic()?;
        }
        OutputMode::Interactive => {
            let result = app.filter(dataset, splits_dir, &ConsoleSink).into_diagnostic()?;
            println!(
                "filtered manifest: {} ({} of {} slides kept)",
                result.output_path, result.kept, result.requested
            );
        }
    }
    Ok(())
}

fn print_fetch_summary(result: &gdc_slide_fetcher::app::FetchResult) {
    let green = "\x1b[32m";
    let yellow = "\x1b[33m";
    let cyan = "\x1b[36m";
    let reset = "\x1b[0m";

    println!("{cyan}gdc-sf summary ({}){reset}", result.dataset);
    println!("{green}downloaded: {}{reset}", result.downloaded);
    println!("{green}skipped (already on disk): {}{reset}", result.skipped);
    println!("{yellow}failed: {}{reset}", result.failed);
    for item in result.items.iter().filter(|item| item.action == "failed") {
        println!(
            "{yellow}  {} ({}): {}{reset}",
            item.filename,
            item.file_id,
            item.error.as_deref().unwrap_or("unknown error")
        );
    }
}

/// Placeholder client for filter-only runs, which never touch the network.
#[derive(Clone, Copy)]
struct NopGdc;

impl GdcClient for NopGdc {
    fn download_file(
        &self,
        _id: &gdc_slide_fetcher::domain::FileId,
        _dest_dir: &Utf8Path,
    ) -> Result<DownloadedFile, FetchError> {
        Err(FetchError::GdcHttp("GDC client not configured".to_string()))
    }
}
