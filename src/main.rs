use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use console::Emoji;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use podtag::{
    CoverArtSource, IngestOptions, LameEmbedder, LoftyTagWriter, NoopReporter, ProgressEvent,
    ProgressReporter, ReqwestClient, SharedProgressReporter, ingest_feed, sweep_duplicate_images,
};

// Emoji with fallback for terminals without Unicode support
static MICROPHONE: Emoji<'_, '_> = Emoji("🎙️  ", "");
static SEARCH: Emoji<'_, '_> = Emoji("🔍 ", "[~] ");
static HEADPHONES: Emoji<'_, '_> = Emoji("🎧 ", "[i] ");
static DOWNLOAD: Emoji<'_, '_> = Emoji("📥 ", "[v] ");
static PICTURE: Emoji<'_, '_> = Emoji("🖼️  ", "[a] ");
static SUCCESS: Emoji<'_, '_> = Emoji("✅ ", "[+] ");
static FAILURE: Emoji<'_, '_> = Emoji("❌ ", "[!] ");
static PARTY: Emoji<'_, '_> = Emoji("🎉 ", "[*] ");
static BROOM: Emoji<'_, '_> = Emoji("🧹 ", "[-] ");
static FOLDER: Emoji<'_, '_> = Emoji("📁 ", "");
static CROSS: Emoji<'_, '_> = Emoji("✗ ", "x ");

/// Download podcast episodes and embed metadata and cover art
#[derive(Parser, Debug)]
#[command(name = "podtag")]
#[command(about = "Download podcast episodes from an RSS feed and embed cover art")]
#[command(version)]
struct Args {
    /// URL of the podcast RSS feed
    rss_url: String,

    /// Output directory for downloaded files
    #[arg(short, long, default_value = "downloads")]
    output: PathBuf,

    /// Maximum number of concurrently processed episodes
    /// (defaults to the host's available parallelism)
    #[arg(short, long)]
    concurrent: Option<usize>,

    /// Quiet mode - suppress progress output
    #[arg(short, long)]
    quiet: bool,
}

/// Progress reporter using indicatif for terminal output
struct IndicatifReporter {
    multi: MultiProgress,
    bars: Mutex<HashMap<usize, ProgressBar>>,
    main_bar: ProgressBar,
}

impl IndicatifReporter {
    fn new() -> Self {
        let multi = MultiProgress::new();

        let main_style = ProgressStyle::default_bar()
            .template("{spinner:.green} {wide_msg}")
            .unwrap();

        let main_bar = multi.add(ProgressBar::new_spinner());
        main_bar.set_style(main_style);
        main_bar.enable_steady_tick(std::time::Duration::from_millis(100));

        Self {
            multi,
            bars: Mutex::new(HashMap::new()),
            main_bar,
        }
    }

    fn get_or_create_bar(&self, download_id: usize) -> ProgressBar {
        let mut bars = self.bars.lock().unwrap();

        if let Some(bar) = bars.get(&download_id) {
            return bar.clone();
        }

        let style = ProgressStyle::default_bar()
            .template(&format!(
                "  {DOWNLOAD}[{{bar:30.cyan/blue}}] {{bytes}}/{{total_bytes}} {{wide_msg}}"
            ))
            .unwrap()
            .progress_chars("█▓░");

        let bar = self.multi.add(ProgressBar::new(0));
        bar.set_style(style);
        bars.insert(download_id, bar.clone());
        bar
    }

    fn finish_bar(&self, download_id: usize) {
        let mut bars = self.bars.lock().unwrap();
        if let Some(bar) = bars.remove(&download_id) {
            bar.finish_and_clear();
        }
    }

    fn println(&self, line: String) {
        let _ = self.multi.println(line);
    }
}

impl ProgressReporter for IndicatifReporter {
    fn report(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::FetchingFeed { url } => {
                self.main_bar
                    .set_message(format!("{SEARCH}Fetching feed: {}", url.cyan()));
            }

            ProgressEvent::FeedParsed {
                podcast_title,
                episode_count,
            } => {
                self.main_bar.set_message(format!(
                    "{HEADPHONES}{} • {} episodes",
                    podcast_title.bold().green(),
                    episode_count.to_string().cyan(),
                ));
            }

            ProgressEvent::CoverArtResolved { source, mime_type } => {
                let source = match source {
                    CoverArtSource::ItunesNamespace => "itunes image",
                    CoverArtSource::ChannelImage => "channel image",
                };
                self.println(format!(
                    "{PICTURE}Cover art: {} ({})",
                    source.green(),
                    mime_type.dimmed()
                ));
            }

            ProgressEvent::CoverArtUnavailable => {
                self.println(format!(
                    "{PICTURE}{}",
                    "No cover art found in feed".yellow()
                ));
            }

            ProgressEvent::DownloadStarting {
                download_id,
                episode_title,
                episode_index,
                episode_count,
                content_length,
            } => {
                let bar = self.get_or_create_bar(download_id);
                bar.set_length(content_length.unwrap_or(0));
                bar.set_position(0);
                bar.set_message(format!(
                    "[{}/{}] {}",
                    (episode_index + 1).to_string().cyan(),
                    episode_count.to_string().cyan(),
                    truncate_title(&episode_title, 40)
                ));
            }

            ProgressEvent::DownloadProgress {
                download_id,
                bytes_downloaded,
                total_bytes,
                ..
            } => {
                let bar = self.get_or_create_bar(download_id);
                if let Some(total) = total_bytes {
                    bar.set_length(total);
                }
                bar.set_position(bytes_downloaded);
            }

            ProgressEvent::EpisodeSkipped { episode_title } => {
                self.println(format!(
                    "  {} {}",
                    "Skipping existing:".dimmed(),
                    truncate_title(&episode_title, 40).dimmed()
                ));
            }

            ProgressEvent::EpisodeMissingAudio { episode_title } => {
                self.println(format!(
                    "  {} {}",
                    "No audio link:".yellow(),
                    truncate_title(&episode_title, 40)
                ));
            }

            ProgressEvent::EmbeddedArtDetected { episode_title } => {
                self.println(format!(
                    "  {} {}",
                    "Keeping upstream tags:".dimmed(),
                    truncate_title(&episode_title, 40).dimmed()
                ));
            }

            ProgressEvent::SidecarImageWritten { path, .. } => {
                self.println(format!(
                    "  {} {}",
                    "Saved cover art:".dimmed(),
                    path.display().to_string().dimmed()
                ));
            }

            ProgressEvent::CoverArtEmbedFailed {
                episode_title,
                error,
            } => {
                self.println(format!(
                    "  {} {} - {}",
                    "Embedding failed:".yellow(),
                    truncate_title(&episode_title, 30),
                    error.dimmed()
                ));
            }

            ProgressEvent::PublishedDateUnparsed {
                episode_title,
                raw_date,
            } => {
                self.println(format!(
                    "  {} {} - {}",
                    "Unparseable date:".yellow(),
                    truncate_title(&episode_title, 30),
                    raw_date.dimmed()
                ));
            }

            ProgressEvent::EpisodeCompleted {
                download_id,
                episode_title,
                bytes_downloaded,
            } => {
                let bar = self.get_or_create_bar(download_id);
                bar.set_position(bytes_downloaded);
                bar.set_message(format!(
                    "{SUCCESS}{}",
                    truncate_title(&episode_title, 40).green()
                ));
                self.finish_bar(download_id);
            }

            ProgressEvent::EpisodeFailed {
                download_id,
                episode_title,
                error,
            } => {
                let bar = self.get_or_create_bar(download_id);
                bar.abandon_with_message(format!(
                    "{FAILURE}{} - {}",
                    truncate_title(&episode_title, 30).red(),
                    error.red()
                ));
                self.finish_bar(download_id);
            }

            ProgressEvent::IngestCompleted {
                downloaded_count,
                skipped_count,
                missing_audio_count,
                failed_count,
            } => {
                self.main_bar.finish_and_clear();
                println!(
                    "\n{PARTY}{} {} downloaded, {} skipped, {} without audio, {} failed",
                    "Run complete:".bold().green(),
                    downloaded_count.to_string().green().bold(),
                    skipped_count.to_string().yellow(),
                    missing_audio_count.to_string().yellow(),
                    if failed_count > 0 {
                        failed_count.to_string().red().bold()
                    } else {
                        failed_count.to_string().green()
                    }
                );
            }

            ProgressEvent::DuplicateImageRemoved { path } => {
                println!(
                    "{BROOM}{} {}",
                    "Removed duplicate:".dimmed(),
                    path.display().to_string().dimmed()
                );
            }

            ProgressEvent::SweepCompleted {
                images_scanned,
                duplicates_removed,
            } => {
                println!(
                    "{BROOM}{} {} images scanned, {} duplicates removed",
                    "Sweep complete:".bold(),
                    images_scanned.to_string().cyan(),
                    duplicates_removed.to_string().yellow()
                );
            }
        }
    }
}

fn truncate_title(title: &str, max_len: usize) -> String {
    if title.chars().count() <= max_len {
        title.to_string()
    } else {
        let truncated: String = title.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    println!(
        "\n{}{} {}\n",
        MICROPHONE,
        "podtag".bold().magenta(),
        "- Podcast Downloader".dimmed()
    );

    let client = ReqwestClient::new();

    let mut options = IngestOptions::default();
    if let Some(concurrent) = args.concurrent {
        options.max_concurrent = concurrent;
    }

    let reporter: SharedProgressReporter = if args.quiet {
        NoopReporter::shared()
    } else {
        Arc::new(IndicatifReporter::new())
    };

    let result = ingest_feed(
        &client,
        LoftyTagWriter::shared(),
        LameEmbedder::shared(),
        &args.rss_url,
        &args.output,
        &options,
        reporter.clone(),
    )
    .await
    .context("Failed to ingest podcast feed")?;

    // Per-episode failures never fail the run; neither does the sweep
    if let Err(e) = sweep_duplicate_images(&args.output, &reporter) {
        eprintln!("{} {}", "Duplicate sweep failed:".red().bold(), e);
    }

    if !args.quiet && !result.failed_episodes.is_empty() {
        println!("\n{}", "Failed episodes:".red().bold());
        for (title, error) in &result.failed_episodes {
            println!(
                "  {}{} - {}",
                CROSS,
                title.yellow(),
                error.to_string().dimmed()
            );
        }
    }

    if !args.quiet {
        println!(
            "\n{FOLDER}Output: {}\n",
            args.output.display().to_string().cyan()
        );
    }

    Ok(())
}
