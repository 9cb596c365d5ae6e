//! Terminal frontend for the downloader

use anyhow::{Context, Result};
use clap::Parser;
use std::collections::VecDeque;
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tokio::sync::mpsc;

use ytdownloader::cli::{Cli, Commands, ConfigAction, Quality};
use ytdownloader::commands::{self, InfoSummary};
use ytdownloader::core::downloader::{DownloaderConfig, HttpDownloader};
use ytdownloader::core::manager::{DownloadEvent, DownloadManager};
use ytdownloader::core::models::{DownloadOption, PlaylistProgress, ProgressUpdate};
use ytdownloader::core::retry::RetryPolicy;
use ytdownloader::core::source::YtDlpSource;
use ytdownloader::AppConfig;

#[tokio::main]
async fn main() -> Result<()> {
    ytdownloader::init();

    let cli = Cli::parse();
    let config = AppConfig::load_or_default();

    match cli.command {
        Commands::Info { url } => run_info(&config, &url, cli.json).await,
        Commands::Download {
            urls,
            quality,
            folder,
        } => {
            let option = quality
                .unwrap_or_else(|| Quality::from_config_name(&config.output.default_quality))
                .option();
            let folder = folder.unwrap_or_else(|| config.download_folder());

            if urls.len() == 1 {
                run_single_download(&config, &urls[0], &option, &folder).await
            } else {
                run_batch_download(&config, &urls, &option, &folder).await
            }
        }
        Commands::Config { action } => run_config(action, cli.json),
    }
}

fn build_http(config: &AppConfig) -> Result<Arc<HttpDownloader>> {
    let downloader = HttpDownloader::new(&DownloaderConfig::from(&config.download))
        .context("Failed to build HTTP client")?;
    Ok(Arc::new(downloader))
}

async fn run_info(config: &AppConfig, url: &str, json: bool) -> Result<()> {
    let source = YtDlpSource::new();
    let summary = commands::info(&source, build_http(config)?, url).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    match summary {
        InfoSummary::Video(video) => {
            println!("Title:     {}", video.title);
            println!("URL:       {}", video.url);
            if let Some(author) = &video.author {
                println!("Author:    {}", author);
            }
            if let Some(channel) = &video.channel_url {
                println!("Channel:   {}", channel);
            }
            println!("Duration:  {}s", video.duration_seconds);
            if let Some(views) = video.views {
                println!("Views:     {}", views);
            }
            if let Some(thumbnail) = &video.thumbnail_url {
                println!("Thumbnail: {}", thumbnail);
            }
            if let Some(description) = &video.description {
                println!("Description:\n{}", description);
            }
            println!("Options:");
            for option in &video.options {
                println!("  {:>5}  {}", option.quality, option.size);
            }
        }
        InfoSummary::Playlist(playlist) => {
            println!("Playlist:  {}", playlist.title);
            println!("URL:       {}", playlist.url);
            if let Some(owner) = &playlist.owner {
                println!("Owner:     {}", owner);
            }
            if let Some(owner_url) = &playlist.owner_url {
                println!("Owner URL: {}", owner_url);
            }
            println!("Videos:    {}", playlist.video_count);
            if let Some(views) = playlist.views {
                println!("Views:     {}", views);
            }
            if let Some(updated) = &playlist.last_updated {
                println!("Updated:   {}", updated);
            }
            println!("Options:");
            for option in &playlist.options {
                println!("  {:>5}  {}", option.quality, option.size);
            }
        }
    }
    Ok(())
}

async fn run_single_download(
    config: &AppConfig,
    url: &str,
    option: &DownloadOption,
    folder: &PathBuf,
) -> Result<()> {
    let source = YtDlpSource::new();
    let retry = RetryPolicy::from_attempts(config.download.retry_attempts);

    let (video_tx, mut video_rx) = mpsc::unbounded_channel::<ProgressUpdate>();
    let video_printer = tokio::spawn(async move {
        while let Some(update) = video_rx.recv().await {
            print!("\r{:.0}% completed", update.percent);
            let _ = std::io::stdout().flush();
        }
    });

    let (playlist_tx, mut playlist_rx) = mpsc::unbounded_channel::<PlaylistProgress>();
    let playlist_printer = tokio::spawn(async move {
        while let Some(progress) = playlist_rx.recv().await {
            println!(
                "{} of {} - {}",
                progress.completed, progress.total, progress.current_title
            );
        }
    });

    let outcome = commands::download(
        &source,
        build_http(config)?,
        retry,
        url,
        option,
        folder,
        Arc::new(AtomicBool::new(false)),
        Some(video_tx),
        Some(playlist_tx),
    )
    .await;

    let _ = video_printer.await;
    let _ = playlist_printer.await;

    let outcome = outcome?;
    println!("\nSaved to {}", outcome.path.display());
    Ok(())
}

async fn run_batch_download(
    config: &AppConfig,
    urls: &[String],
    option: &DownloadOption,
    folder: &PathBuf,
) -> Result<()> {
    let mut manager = DownloadManager::new(config.download.clone(), Arc::new(YtDlpSource::new()))?;
    let mut events = manager
        .subscribe()
        .context("Event stream already taken")?;

    let mut queue = VecDeque::new();
    for url in urls {
        match manager.add_task(url, option.clone(), folder.clone()).await {
            Ok(task_id) => queue.push_back(task_id),
            Err(e) => eprintln!("Skipping {url}: {e}"),
        }
    }

    let total = queue.len();
    if total == 0 {
        anyhow::bail!("No downloadable URLs given");
    }

    // Keep the semaphore saturated; start the rest as permits free up
    while let Some(task_id) = queue.front() {
        match manager.start_download(task_id).await {
            Ok(()) => {
                queue.pop_front();
            }
            Err(_) => break,
        }
    }

    let mut finished = 0usize;
    let mut failures = 0usize;
    while finished < total {
        let Some(event) = events.recv().await else {
            break;
        };
        match event {
            DownloadEvent::TaskCompleted { file_path, .. } => {
                finished += 1;
                println!("[{}/{}] Saved to {}", finished, total, file_path);
            }
            DownloadEvent::TaskFailed { task_id, error } => {
                finished += 1;
                failures += 1;
                let title = manager
                    .get_task(&task_id)
                    .await
                    .map(|t| t.title)
                    .unwrap_or(task_id);
                eprintln!("[{}/{}] Failed: {} ({})", finished, total, title, error);
            }
            DownloadEvent::TaskCancelled { .. } => {
                finished += 1;
            }
            _ => {}
        }

        while let Some(task_id) = queue.front() {
            match manager.start_download(task_id).await {
                Ok(()) => {
                    queue.pop_front();
                }
                Err(_) => break,
            }
        }
    }

    let stats = manager.get_stats().await;
    println!(
        "Done: {} completed, {} failed",
        stats.completed_tasks, failures
    );
    if failures > 0 {
        anyhow::bail!("{failures} download(s) failed");
    }
    Ok(())
}

fn run_config(action: ConfigAction, json: bool) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = AppConfig::load_or_default();
            println!("{}", config.export()?);
        }
        ConfigAction::Path => {
            println!("{}", AppConfig::get_config_path()?.display());
        }
        ConfigAction::Reset => {
            let config = AppConfig::reset()?;
            if json {
                println!("{}", config.export()?);
            } else {
                println!("Configuration reset to defaults");
            }
        }
    }
    Ok(())
}
