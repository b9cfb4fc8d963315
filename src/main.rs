use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;

use tripdata_loader::{
    bucket::GcsBucketAdmin,
    config::{Settings, DEFAULT_BASE_URL, DEFAULT_DATA_DIR},
    download::Downloader,
    pipeline::{Pipeline, Report, DEFAULT_WORKERS},
    store::{self, ObjectBlobStore},
    tasks::{parse_month, parse_year, ServiceKind},
    upload::{Uploader, DEFAULT_MAX_RETRIES},
};

/// Downloads NYC taxi trip data releases and loads them into a Google Cloud
/// Storage bucket. The bucket and project come from GCS_BUCKET and
/// GCP_PROJECT_ID (a .env file is honoured).
#[derive(Parser)]
#[command(version, about = "NYC trip data release to GCS loader", long_about = None)]
struct Cli {
    #[arg(short, long, action = clap::ArgAction::Count, help = "Increase debug level (use -d for debug, -dd for trace)")]
    debug: u8,

    /// service to fetch, may be repeated. defaults to yellow and green
    #[arg(long = "service", value_enum)]
    services: Vec<ServiceKind>,

    /// year to fetch, may be repeated. defaults to 2019 and 2020
    #[arg(long = "year", value_parser = parse_year)]
    years: Vec<String>,

    /// month to fetch, may be repeated. defaults to every month
    #[arg(long = "month", value_parser = parse_month)]
    months: Vec<String>,

    /// release host the files are downloaded from
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    base_url: String,

    // scratch directory downloads are written to
    #[arg(long, default_value = DEFAULT_DATA_DIR)]
    data_dir: PathBuf,

    /// concurrent downloads, and then concurrent uploads
    #[arg(short, long, default_value_t = DEFAULT_WORKERS as u64, value_parser = clap::value_parser!(u64).range(1..))]
    workers: u64,

    /// upload attempts per file
    #[arg(long, default_value_t = DEFAULT_MAX_RETRIES, value_parser = clap::value_parser!(u32).range(1..))]
    max_retries: u32,

    /// seconds to wait between upload attempts
    #[arg(long, default_value_t = 5)]
    retry_delay_secs: u64,
}

impl Cli {
    fn apply(self, mut settings: Settings) -> Settings {
        if !self.services.is_empty() {
            settings.tasks.services = self.services;
        }
        if !self.years.is_empty() {
            settings.tasks.years = self.years;
        }
        if !self.months.is_empty() {
            settings.tasks.months = self.months;
        }
        settings.base_url = self.base_url.trim_end_matches('/').to_string();
        settings.data_dir = self.data_dir;
        settings.workers = self.workers as usize;
        settings.retry.max_retries = self.max_retries;
        settings.retry.delay = Duration::from_secs(self.retry_delay_secs);
        settings
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = match cli.debug {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let settings = match Settings::from_env() {
        Ok(settings) => cli.apply(settings),
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    match run(settings).await {
        Ok(report) => {
            println!("{}", report);
            println!("All files processed.");
        }
        Err(e) => {
            log::error!("error: {:#}", e);
            std::process::exit(1);
        }
    }
}

async fn run(settings: Settings) -> Result<Report, anyhow::Error> {
    std::fs::create_dir_all(&settings.data_dir)
        .with_context(|| format!("creating {}", settings.data_dir.display()))?;

    let gcs = store::gcs(&settings.bucket).context("building GCS client")?;
    let admin = GcsBucketAdmin::new(gcs.credentials().clone(), &settings.project_id);
    let blobs = ObjectBlobStore::new(Arc::new(gcs));

    let source = store::http(&settings.base_url).context("building release host client")?;
    let downloader = Downloader::new(Arc::new(source), &settings.base_url, &settings.data_dir);
    let uploader = Uploader::new(Arc::new(blobs), &settings.bucket, settings.retry);

    let pipeline = Pipeline::new(
        Arc::new(admin),
        &settings.bucket,
        downloader,
        uploader,
        settings.workers,
    );

    let report = pipeline.run(settings.tasks.generate()).await?;
    Ok(report)
}
