use crate::CliSourceKind;
use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use humansize::{format_size, DECIMAL};
use indicatif::{ProgressBar, ProgressStyle};
use mediasync_core::AssetInfo;
use mediasync_fs::MergedFs;
use mediasync_pipeline::{ReconcileDriver, ReconcileOptions, RunReport, RunStats, SnapshotCatalog};
use mediasync_source::{LocalFolderBrowser, PairingRules, SourceBrowser, TakeoutBrowser};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Where candidates come from.
#[derive(Debug, Clone)]
pub struct SourceArgs {
    pub paths: Vec<Utf8PathBuf>,
    pub kind: CliSourceKind,
    pub album_from_folder: bool,
    pub pairing: PairingRules,
    pub channel_capacity: usize,
}

#[derive(Debug, Clone)]
pub struct UploadArgs {
    pub source: SourceArgs,
    pub catalog: PathBuf,
    pub device_id: String,
    pub options: ReconcileOptions,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanSummary {
    pub assets: usize,
    pub total_bytes: u64,
    pub undated: usize,
    pub albums: BTreeSet<String>,
}

fn open_browser(src: &SourceArgs) -> Result<Box<dyn SourceBrowser>> {
    let fs = MergedFs::open_paths(&src.paths).context("Failed to open sources")?;
    let fs = Arc::new(fs);
    Ok(match src.kind {
        CliSourceKind::Folder => Box::new(
            LocalFolderBrowser::new(fs)
                .with_capacity(src.channel_capacity)
                .album_from_folder(src.album_from_folder),
        ),
        CliSourceKind::Takeout => Box::new(
            TakeoutBrowser::new(fs)
                .with_rules(src.pairing)
                .with_capacity(src.channel_capacity),
        ),
    })
}

fn spinner() -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(pb)
}

fn stats_line(s: &RunStats) -> String {
    format!(
        "Scanned {} | uploaded {} | replaced {} | duplicates {} | filtered {} | failed {}",
        s.scanned, s.uploaded, s.replaced, s.duplicates, s.filtered, s.failed
    )
}

pub async fn cmd_scan(
    src: SourceArgs,
    output: Option<Utf8PathBuf>,
    cancel: CancellationToken,
) -> Result<ScanSummary> {
    println!(":: Scanning {} source(s)", src.paths.len());
    for p in &src.paths {
        println!("   {}", p);
    }

    let browser = open_browser(&src)?;
    let pb = spinner()?;
    let mut rx = browser.browse(cancel);

    let mut summary = ScanSummary::default();
    let mut assets: Vec<AssetInfo> = Vec::new();
    while let Some(candidate) = rx.recv().await {
        summary.assets += 1;
        summary.total_bytes += candidate.info.size;
        if candidate.info.date_taken.is_none() {
            summary.undated += 1;
        }
        summary.albums.extend(candidate.info.albums.iter().cloned());
        pb.set_message(format!(
            "Found {} assets ({})",
            summary.assets,
            format_size(summary.total_bytes, DECIMAL)
        ));
        assets.push(candidate.info);
    }
    pb.finish_with_message("Scan complete.");

    println!("\n:: Scan Result");
    println!("   Assets:  {}", summary.assets);
    println!("   Size:    {}", format_size(summary.total_bytes, DECIMAL));
    println!("   Undated: {}", summary.undated);
    println!("   Albums:  {}", summary.albums.len());

    if let Some(out) = output {
        let json = serde_json::to_string_pretty(&assets)?;
        std::fs::write(&out, json).with_context(|| format!("Failed to write {}", out))?;
        println!(":: Saved asset list to {}", out);
    }

    Ok(summary)
}

pub async fn cmd_upload(mut args: UploadArgs, cancel: CancellationToken) -> Result<RunReport> {
    println!(":: Reconciling against {}", args.catalog.display());
    println!("   Device: {}", args.device_id);

    if args.source.kind == CliSourceKind::Takeout && args.options.delete_local {
        warn!("Local deletion is not supported for Takeout exports, ignoring --delete");
        args.options.delete_local = false;
    }

    let catalog = SnapshotCatalog::open(&args.catalog)
        .with_context(|| format!("Failed to open catalog {}", args.catalog.display()))?;
    let browser = open_browser(&args.source)?;

    let pb = spinner()?;
    let driver = {
        let pb = pb.clone();
        ReconcileDriver::new(Arc::new(catalog), &args.device_id, args.options)
            .with_progress(move |stats| pb.set_message(stats_line(&stats)))
    };

    let report = driver.run(browser, cancel).await?;
    pb.finish_with_message(stats_line(&report.stats));

    println!("\n:: Run Result");
    println!("   Uploaded:   {}", report.stats.uploaded);
    println!("   Replaced:   {}", report.stats.replaced);
    println!("   Duplicates: {}", report.stats.duplicates);
    println!("   Filtered:   {}", report.stats.filtered);
    println!("   Failed:     {}", report.stats.failed);

    match &report.flush {
        None => println!("   Status:     Cancelled, no changes flushed"),
        Some(flush) => {
            println!("   Albums:     {} created, {} updated", flush.albums_created.len(), flush.albums_updated.len());
            println!("   Deleted:    {} on server, {} local", flush.server_deleted, flush.local_deleted);
            for (album, err) in &flush.album_failures {
                println!("   ! album {}: {}", album, err);
            }
            if let Some(err) = &flush.server_delete_error {
                println!("   ! server deletion: {}", err);
            }
            for (path, err) in &flush.local_failures {
                println!("   ! {}: {}", path, err);
            }
            if flush.interrupted {
                println!("   Status:     Interrupted during flush");
            }
        }
    }

    Ok(report)
}
