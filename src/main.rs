// main.rs - logovision CLI entry point
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use logovision::analytics;
use logovision::api_client::ApiClient;
use logovision::app::{AppFlow, SessionOutcome};
use logovision::brands;
use logovision::config::AppConfig;
use logovision::media::{format_confidence, format_file_size, format_seconds};
use logovision::models::ProcessingResult;
use logovision::report;
use logovision::upload::{UploadEvent, UploadManager};

#[derive(Parser, Debug)]
#[command(author, version, about = "Logo detection client for video and image media")]
struct Cli {
    /// Backend base URL; overrides config.json and LOGOVISION_API_URL.
    #[arg(long, global = true)]
    api_url: Option<String>,
    /// Path to a config.json with an `api.url` entry.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check that the backend is reachable and its model is loaded.
    Health,
    /// List media files the backend already knows about.
    Files,
    /// Upload media, run detection on each file, and print the results.
    Analyze {
        /// Video or image files to analyze (processed in the given order).
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Restrict results to these logos; repeatable. Empty means all.
        #[arg(long = "logo")]
        logos: Vec<String>,
        /// Write a printable HTML report next to the results.
        #[arg(long)]
        report: bool,
        /// Directory for the report artifact.
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
    /// Print detection rows for an already-processed file.
    Detections { file_id: i64 },
    /// Download a detection heatmap image for a processed file.
    Heatmap {
        file_id: i64,
        /// Limit the heatmap to a single brand.
        #[arg(long)]
        brand: Option<String>,
        /// Output path; defaults to heatmap-<file_id>.png.
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_logging()?;

    let cli = Cli::parse();

    let api_url = match cli.api_url {
        Some(url) => url,
        None => AppConfig::load(cli.config.as_deref())?.api_url,
    };
    info!("Using backend at {}", api_url);
    let client = ApiClient::new(api_url);

    match cli.command {
        Command::Health => health(&client).await,
        Command::Files => files(&client).await,
        Command::Analyze {
            files,
            logos,
            report,
            out_dir,
        } => analyze(client, files, logos, report, out_dir).await,
        Command::Detections { file_id } => detections(&client, file_id).await,
        Command::Heatmap {
            file_id,
            brand,
            output,
        } => heatmap(&client, file_id, brand, output).await,
    }
}

async fn health(client: &ApiClient) -> anyhow::Result<()> {
    let health = client
        .health()
        .await
        .context("backend health check failed")?;
    println!("status: {}", health.status);
    println!(
        "model:  {}",
        if health.model_loaded { "loaded" } else { "not loaded" }
    );
    Ok(())
}

async fn files(client: &ApiClient) -> anyhow::Result<()> {
    let listing = client.files().await?;
    if listing.files.is_empty() {
        println!("No files on the backend.");
        return Ok(());
    }
    for file in &listing.files {
        let duration = file
            .duration_seconds
            .map(format_seconds)
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:>6}  {:<5}  {:>8}  {}",
            file.id, file.file_type, duration, file.filename
        );
    }
    Ok(())
}

async fn analyze(
    client: ApiClient,
    paths: Vec<PathBuf>,
    logos: Vec<String>,
    write_report: bool,
    out_dir: PathBuf,
) -> anyhow::Result<()> {
    // The backend must be up before any file is touched.
    let health = client
        .health()
        .await
        .context("backend health check failed, not starting analysis")?;
    if !health.model_loaded {
        warn!("Backend is up but reports no loaded model");
    }

    // Upload phase: all files transfer concurrently, each with its own bar.
    let (tx, rx) = mpsc::unbounded_channel();
    let manager = UploadManager::new(client.clone()).with_events(tx);

    let mut bars: HashMap<String, ProgressBar> = HashMap::new();
    let multi = MultiProgress::new();
    let style = ProgressStyle::with_template("{msg:<40} [{bar:30}] {pos:>3}%")?
        .progress_chars("=> ");

    for path in &paths {
        let file = manager
            .register(path)
            .map_err(|e| anyhow!("{}: {}", path.display(), e))?;
        let bar = multi.add(ProgressBar::new(100));
        bar.set_style(style.clone());
        bar.set_message(format!("{} ({})", file.name, format_file_size(file.size)));
        bars.insert(file.id.clone(), bar);
    }

    let progress_task = tokio::spawn(drive_upload_bars(rx, bars));
    let uploaded = manager.upload_all().await;
    progress_task.await.ok();

    for file in uploaded.iter().filter(|f| f.error.is_some()) {
        warn!(
            "Upload failed for {}: {}",
            file.name,
            file.error.as_deref().unwrap_or("unknown error")
        );
    }
    let ready = manager.uploaded_files();
    if ready.is_empty() {
        return Err(anyhow!("no file uploaded successfully"));
    }

    // Processing phase: strictly one file at a time.
    let mut flow = AppFlow::new(Arc::new(client.clone()));
    flow.begin_select();
    flow.select_logos(&logos);

    let cancel = CancellationToken::new();
    let teardown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping polling");
            teardown.cancel();
        }
    });

    flow.process_all(&ready, &cancel, |file, status| {
        let stage = status.stage.as_deref().unwrap_or("working");
        let progress = status.progress.unwrap_or(0.0);
        info!("{}: {} ({:.0}%)", file.name, stage, progress);
    })
    .await;

    // Results phase.
    println!();
    let mut completed: Vec<ProcessingResult> = Vec::new();
    for outcome in flow.results() {
        match outcome {
            SessionOutcome::Completed(result) => {
                let name = flow
                    .file_meta()
                    .get(&result.session_id)
                    .and_then(|m| m.name.clone())
                    .unwrap_or_else(|| result.session_id.clone());
                let visible = brands::filter_brands(flow.logos(), &result.brands_detected);
                let brand_list = if visible.is_empty() {
                    "none".to_string()
                } else {
                    visible
                        .iter()
                        .map(|b| b.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                };
                println!(
                    "{}: {} detections, brands: {}",
                    name, result.detections_count, brand_list
                );
                if let Some(statistics) = &result.statistics {
                    let filtered = brands::filter_statistics(flow.logos(), statistics);
                    let mut rows: Vec<_> = filtered.into_iter().collect();
                    rows.sort_by_key(|(brand, _)| *brand);
                    for (brand, stats) in rows {
                        let avg = stats
                            .avg_score
                            .map(format_confidence)
                            .unwrap_or_else(|| "-".to_string());
                        println!(
                            "  {}: {} detections, avg score {}",
                            brand,
                            stats.total_detections.unwrap_or(0),
                            avg
                        );
                    }
                }
                completed.push(result.clone());
            }
            SessionOutcome::Failed {
                file_name, message, ..
            } => {
                println!("{}: processing failed: {}", file_name, message);
            }
        }
    }

    if write_report {
        if completed.is_empty() {
            warn!("No completed results, skipping report");
        } else {
            let mut data = report::build_report_data(&completed, flow.file_meta(), flow.logos());
            report::enrich(&client, &mut data, flow.logos()).await;
            let path = report::save_report(&data, &out_dir)?;
            println!("\nReport written to {}", path.display());
        }
    }

    Ok(())
}

/// Feed upload events into the progress bars. Every file ends with exactly
/// one Uploaded or Failed event, so the loop exits once each bar is settled.
async fn drive_upload_bars(
    mut rx: mpsc::UnboundedReceiver<UploadEvent>,
    bars: HashMap<String, ProgressBar>,
) {
    let mut remaining = bars.len();
    while remaining > 0 {
        let Some(event) = rx.recv().await else {
            break;
        };
        match event {
            UploadEvent::Progress { file_id, percent } => {
                if let Some(bar) = bars.get(&file_id) {
                    bar.set_position(percent as u64);
                }
            }
            UploadEvent::Uploaded { file_id, .. } => {
                if let Some(bar) = bars.get(&file_id) {
                    bar.finish();
                }
                remaining -= 1;
            }
            UploadEvent::Failed { file_id, error } => {
                if let Some(bar) = bars.get(&file_id) {
                    bar.abandon_with_message(error);
                }
                remaining -= 1;
            }
        }
    }
}

async fn detections(client: &ApiClient, file_id: i64) -> anyhow::Result<()> {
    let response = client.detections(file_id).await?;
    if response.detections.is_empty() {
        println!("No detections for file {}.", file_id);
        return Ok(());
    }

    let grouped = analytics::detections_by_brand(&response.detections, &[]);
    let mut summary: Vec<(&String, usize)> =
        grouped.iter().map(|(brand, rows)| (brand, rows.len())).collect();
    summary.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    for (brand, count) in summary {
        println!("{:<20} {} detections", brand, count);
    }
    println!();

    for det in &response.detections {
        let brand = det.resolve_brand(&[]).unwrap_or("Unknown");
        let window = match (det.t_start, det.t_end) {
            (Some(start), Some(end)) => {
                format!("{} - {}", format_seconds(start), format_seconds(end))
            }
            _ => "-".to_string(),
        };
        println!(
            "{:<20} {:>7}  {:>17}  bbox [{:.0}, {:.0}, {:.0}, {:.0}]",
            brand,
            format_confidence(det.score),
            window,
            det.bbox[0],
            det.bbox[1],
            det.bbox[2],
            det.bbox[3]
        );
    }
    Ok(())
}

async fn heatmap(
    client: &ApiClient,
    file_id: i64,
    brand: Option<String>,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    if brand.is_none() {
        let available = client.heatmap_brands(file_id).await?;
        if !available.brands.is_empty() {
            info!("Brands with heatmaps: {}", available.brands.join(", "));
        }
    }
    let bytes = client.heatmap(file_id, brand.as_deref()).await?;
    let path = output.unwrap_or_else(|| PathBuf::from(format!("heatmap-{}.png", file_id)));
    tokio::fs::write(&path, &bytes).await?;
    println!(
        "Heatmap written to {} ({})",
        path.display(),
        format_file_size(bytes.len() as u64)
    );
    Ok(())
}

// Production-grade logging configuration
fn init_logging() -> anyhow::Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cfg!(debug_assertions) {
            "debug,logovision=debug,reqwest=info,hyper=info".to_string()
        } else {
            "info,logovision=info,reqwest=warn,hyper=warn".to_string()
        }
    });

    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&log_level))?;

    let fmt_layer = if std::env::var("LOG_FORMAT").as_deref() == Ok("json") {
        // JSON logging for log aggregation
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_target(true)
            .boxed()
    } else {
        // Human-readable logging for development
        fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    Ok(())
}
