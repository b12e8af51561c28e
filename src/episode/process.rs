// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::fs::FileTimes;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::DateTime;
use futures::StreamExt;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use crate::cover::CoverArt;
use crate::error::{DownloadError, ProcessError};
use crate::feed::Episode;
use crate::http::HttpClient;
use crate::progress::{ProgressEvent, SharedProgressReporter};

use super::embed::SharedCoverEmbedder;
use super::locate::{AUDIO_EXTENSION, IMAGE_EXTENSION, find_audio_url};
use super::tags::{EpisodeTags, SharedTagWriter};

/// The strict format published dates must match for timestamp patching
const PUBLISHED_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S %z";

/// Context for tracking a download in concurrent scenarios
#[derive(Debug, Clone)]
pub struct DownloadContext {
    /// Slot ID (0 to max_concurrent-1) for progress bar management
    pub download_id: usize,
    /// Index of this episode in the feed
    pub episode_index: usize,
    /// Total number of episodes in the feed
    pub episode_count: usize,
}

/// Per-feed state shared read-only by every episode task
#[derive(Debug, Clone)]
pub struct IngestContext {
    pub output_dir: PathBuf,
    pub cover_art: Option<CoverArt>,
    pub podcast_title: String,
    pub podcast_author: String,
}

/// How a single episode ended up after processing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// Audio downloaded and processed
    Downloaded,
    /// Target file already existed, nothing was touched
    SkippedExisting,
    /// The entry had no audio-typed link
    MissingAudio,
}

/// Download and process one episode.
///
/// The target file's existence is the idempotence marker: an existing
/// file is never re-downloaded or re-tagged. Any processing failure
/// removes the (possibly partial) target file and is confined to this
/// episode; sibling tasks are unaffected.
pub async fn process_episode<C: HttpClient>(
    client: &C,
    tag_writer: &SharedTagWriter,
    embedder: &SharedCoverEmbedder,
    episode: &Episode,
    stem: &str,
    ctx: &IngestContext,
    slot: &DownloadContext,
    reporter: &SharedProgressReporter,
) -> Result<ProcessOutcome, ProcessError> {
    let Some(audio_url) = find_audio_url(episode) else {
        reporter.report(ProgressEvent::EpisodeMissingAudio {
            episode_title: episode.title.clone(),
        });
        return Ok(ProcessOutcome::MissingAudio);
    };

    let audio_path = ctx.output_dir.join(format!("{stem}.{AUDIO_EXTENSION}"));
    if audio_path.exists() {
        reporter.report(ProgressEvent::EpisodeSkipped {
            episode_title: episode.title.clone(),
        });
        return Ok(ProcessOutcome::SkippedExisting);
    }

    let image_path = ctx.output_dir.join(format!("{stem}.{IMAGE_EXTENSION}"));

    match process_fresh_download(
        client,
        tag_writer,
        embedder,
        episode,
        audio_url,
        &audio_path,
        &image_path,
        ctx,
        slot,
        reporter,
    )
    .await
    {
        Ok(bytes_downloaded) => {
            reporter.report(ProgressEvent::EpisodeCompleted {
                download_id: slot.download_id,
                episode_title: episode.title.clone(),
                bytes_downloaded,
            });
            Ok(ProcessOutcome::Downloaded)
        }
        Err(e) => {
            let _ = tokio::fs::remove_file(&audio_path).await;
            reporter.report(ProgressEvent::EpisodeFailed {
                download_id: slot.download_id,
                episode_title: episode.title.clone(),
                error: e.to_string(),
            });
            Err(e)
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn process_fresh_download<C: HttpClient>(
    client: &C,
    tag_writer: &SharedTagWriter,
    embedder: &SharedCoverEmbedder,
    episode: &Episode,
    audio_url: &str,
    audio_path: &Path,
    image_path: &Path,
    ctx: &IngestContext,
    slot: &DownloadContext,
    reporter: &SharedProgressReporter,
) -> Result<u64, ProcessError> {
    let bytes_downloaded =
        download_audio(client, audio_url, audio_path, episode, slot, reporter).await?;

    // Files that arrive with their own embedded picture keep their
    // upstream metadata untouched
    if tag_writer.has_embedded_picture(audio_path)? {
        reporter.report(ProgressEvent::EmbeddedArtDetected {
            episode_title: episode.title.clone(),
        });
        return Ok(bytes_downloaded);
    }

    if let Some(cover) = &ctx.cover_art {
        tokio::fs::write(image_path, &cover.bytes)
            .await
            .map_err(|e| ProcessError::SidecarWriteFailed {
                path: image_path.to_path_buf(),
                source: e,
            })?;
        reporter.report(ProgressEvent::SidecarImageWritten {
            episode_title: episode.title.clone(),
            path: image_path.to_path_buf(),
        });
    }

    let tags = EpisodeTags::from_episode(episode, &ctx.podcast_title, &ctx.podcast_author);
    tag_writer.write(audio_path, &tags)?;

    // The external tool replaces the file in place; its failure keeps
    // the tagged download
    if ctx.cover_art.is_some()
        && let Err(e) = embedder.embed(audio_path, image_path).await
    {
        reporter.report(ProgressEvent::CoverArtEmbedFailed {
            episode_title: episode.title.clone(),
            error: e.to_string(),
        });
    }

    // Timestamps go last so the embed step's in-place replacement
    // cannot clobber them
    if let Some(raw_date) = &episode.published {
        match parse_published(raw_date) {
            Some(instant) => {
                apply_published_times(audio_path, instant).map_err(|e| {
                    ProcessError::TimestampFailed {
                        path: audio_path.to_path_buf(),
                        source: e,
                    }
                })?;
            }
            None => {
                reporter.report(ProgressEvent::PublishedDateUnparsed {
                    episode_title: episode.title.clone(),
                    raw_date: raw_date.clone(),
                });
            }
        }
    }

    Ok(bytes_downloaded)
}

/// Stream the audio body to the target path, reporting progress
async fn download_audio<C: HttpClient>(
    client: &C,
    url: &str,
    output_path: &Path,
    episode: &Episode,
    slot: &DownloadContext,
    reporter: &SharedProgressReporter,
) -> Result<u64, DownloadError> {
    let response = client.get(url).await.map_err(|e| DownloadError::HttpFailed {
        url: url.to_string(),
        source: e,
    })?;

    if response.status >= 400 {
        return Err(DownloadError::HttpStatus {
            url: url.to_string(),
            status: response.status,
        });
    }

    reporter.report(ProgressEvent::DownloadStarting {
        download_id: slot.download_id,
        episode_title: episode.title.clone(),
        episode_index: slot.episode_index,
        episode_count: slot.episode_count,
        content_length: response.content_length,
    });

    let mut file = File::create(output_path)
        .await
        .map_err(|e| DownloadError::FileCreateFailed {
            path: output_path.to_path_buf(),
            source: e,
        })?;

    let mut bytes_downloaded: u64 = 0;
    let mut stream = response.body;

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| DownloadError::StreamFailed {
            url: url.to_string(),
            source: e,
        })?;

        file.write_all(&chunk)
            .await
            .map_err(|e| DownloadError::FileWriteFailed {
                path: output_path.to_path_buf(),
                source: e,
            })?;

        bytes_downloaded += chunk.len() as u64;

        reporter.report(ProgressEvent::DownloadProgress {
            download_id: slot.download_id,
            episode_title: episode.title.clone(),
            bytes_downloaded,
            total_bytes: response.content_length,
        });
    }

    file.flush()
        .await
        .map_err(|e| DownloadError::FileWriteFailed {
            path: output_path.to_path_buf(),
            source: e,
        })?;

    Ok(bytes_downloaded)
}

/// Parse a published date in the fixed RFC-2822-style format
fn parse_published(raw: &str) -> Option<SystemTime> {
    DateTime::parse_from_str(raw, PUBLISHED_DATE_FORMAT)
        .ok()
        .map(SystemTime::from)
}

/// Set both access and modification time to the published instant
fn apply_published_times(path: &Path, instant: SystemTime) -> std::io::Result<()> {
    let file = std::fs::OpenOptions::new().write(true).open(path)?;
    file.set_times(
        FileTimes::new()
            .set_accessed(instant)
            .set_modified(instant),
    )
}
