// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::Mutex;

use crate::cover::resolve_cover_art;
use crate::episode::{
    DownloadContext, IngestContext, ProcessOutcome, SharedCoverEmbedder, SharedTagWriter,
    process_episode, unique_stems,
};
use crate::error::IngestError;
use crate::feed::{fetch_feed_bytes, parse_feed};
use crate::http::HttpClient;
use crate::progress::{ProgressEvent, SharedProgressReporter};

/// Title used when the feed does not name the podcast
const UNKNOWN_PODCAST: &str = "Unknown Podcast";

/// Author used when the feed does not name one
const UNKNOWN_AUTHOR: &str = "Unknown Author";

/// Options for a feed ingestion run
#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Maximum number of concurrently processed episodes
    pub max_concurrent: usize,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            max_concurrent: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
        }
    }
}

/// Result of an ingestion run
#[derive(Debug, Clone)]
pub struct IngestResult {
    /// Number of episodes downloaded and processed
    pub downloaded: usize,
    /// Number of episodes skipped (target file already present)
    pub skipped: usize,
    /// Number of entries without an audio link
    pub missing_audio: usize,
    /// Number of episodes that failed
    pub failed: usize,
    /// Details of failed episodes (title, error message)
    pub failed_episodes: Vec<(String, String)>,
}

/// Ingest a podcast feed into a local directory.
///
/// This is the main entry point for the library. It:
/// 1. Ensures the output directory exists
/// 2. Fetches and parses the feed (failures here abort the run)
/// 3. Resolves cover art once, shared read-only by all episodes
/// 4. Processes every entry concurrently over a bounded slot pool
/// 5. Waits for all episode tasks before returning, so a following
///    duplicate-image sweep only ever sees fully written files
pub async fn ingest_feed<C: HttpClient + Clone + 'static>(
    client: &C,
    tag_writer: SharedTagWriter,
    embedder: SharedCoverEmbedder,
    feed_url: &str,
    output_dir: &Path,
    options: &IngestOptions,
    reporter: SharedProgressReporter,
) -> Result<IngestResult, IngestError> {
    std::fs::create_dir_all(output_dir).map_err(|e| IngestError::CreateDirectoryFailed {
        path: output_dir.to_path_buf(),
        source: e,
    })?;

    reporter.report(ProgressEvent::FetchingFeed {
        url: feed_url.to_string(),
    });

    let raw_feed = fetch_feed_bytes(client, feed_url).await?;
    let podcast = parse_feed(&raw_feed).map_err(IngestError::Feed)?;

    let podcast_title = podcast
        .title
        .clone()
        .unwrap_or_else(|| UNKNOWN_PODCAST.to_string());
    let podcast_author = podcast
        .author
        .clone()
        .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string());

    let episode_count = podcast.episodes.len();
    reporter.report(ProgressEvent::FeedParsed {
        podcast_title: podcast_title.clone(),
        episode_count,
    });

    // Resolved once; absence is reported by the resolver and non-fatal
    let cover_art = resolve_cover_art(client, &raw_feed, &podcast, &reporter).await;

    let ctx = Arc::new(IngestContext {
        output_dir: output_dir.to_path_buf(),
        cover_art,
        podcast_title,
        podcast_author,
    });

    let stems = unique_stems(podcast.episodes.iter().map(|e| e.title.as_str()));

    // Process episodes in parallel using a slot pool
    // The slot pool serves dual purpose: limits concurrency AND provides stable slot IDs
    let (slot_tx, slot_rx) = tokio::sync::mpsc::channel(options.max_concurrent);
    for slot in 0..options.max_concurrent {
        slot_tx.send(slot).await.unwrap();
    }
    let slot_rx = Arc::new(Mutex::new(slot_rx));

    let downloaded_count = Arc::new(AtomicUsize::new(0));
    let skipped_count = Arc::new(AtomicUsize::new(0));
    let missing_audio_count = Arc::new(AtomicUsize::new(0));
    let failed_count = Arc::new(AtomicUsize::new(0));
    let failed_episodes = Arc::new(Mutex::new(Vec::new()));

    let mut handles = Vec::new();

    for (episode_index, (episode, stem)) in
        podcast.episodes.into_iter().zip(stems).enumerate()
    {
        // Acquire a slot from the pool BEFORE spawning (blocks until one is free)
        // This ensures episodes are started in feed order
        let download_id = slot_rx.lock().await.recv().await.unwrap();

        let slot_tx = slot_tx.clone();
        let client = client.clone();
        let tag_writer = tag_writer.clone();
        let embedder = embedder.clone();
        let ctx = ctx.clone();
        let reporter = reporter.clone();
        let downloaded_count = downloaded_count.clone();
        let skipped_count = skipped_count.clone();
        let missing_audio_count = missing_audio_count.clone();
        let failed_count = failed_count.clone();
        let failed_episodes = failed_episodes.clone();

        let handle = tokio::spawn(async move {
            let slot = DownloadContext {
                download_id,
                episode_index,
                episode_count,
            };

            let result = process_episode(
                &client,
                &tag_writer,
                &embedder,
                &episode,
                &stem,
                &ctx,
                &slot,
                &reporter,
            )
            .await;

            match result {
                Ok(ProcessOutcome::Downloaded) => {
                    downloaded_count.fetch_add(1, Ordering::SeqCst);
                }
                Ok(ProcessOutcome::SkippedExisting) => {
                    skipped_count.fetch_add(1, Ordering::SeqCst);
                }
                Ok(ProcessOutcome::MissingAudio) => {
                    missing_audio_count.fetch_add(1, Ordering::SeqCst);
                }
                Err(e) => {
                    failed_count.fetch_add(1, Ordering::SeqCst);
                    failed_episodes
                        .lock()
                        .await
                        .push((episode.title.clone(), e.to_string()));
                }
            }

            // Return slot to the pool when done
            let _ = slot_tx.send(download_id).await;
        });

        handles.push(handle);
    }

    // Wait for all episode tasks to complete; failures never cross
    // this boundary
    for handle in handles {
        let _ = handle.await;
    }

    let downloaded = downloaded_count.load(Ordering::SeqCst);
    let skipped = skipped_count.load(Ordering::SeqCst);
    let missing_audio = missing_audio_count.load(Ordering::SeqCst);
    let failed = failed_count.load(Ordering::SeqCst);
    let failed_eps = failed_episodes.lock().await.clone();

    reporter.report(ProgressEvent::IngestCompleted {
        downloaded_count: downloaded,
        skipped_count: skipped,
        missing_audio_count: missing_audio,
        failed_count: failed,
    });

    Ok(IngestResult {
        downloaded,
        skipped,
        missing_audio,
        failed,
        failed_episodes: failed_eps,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;
    use std::path::PathBuf;

    use async_trait::async_trait;
    use bytes::Bytes;
    use tempfile::tempdir;

    use crate::dedupe::sweep_duplicate_images;
    use crate::episode::{CoverEmbedder, EpisodeTags, TagWriter};
    use crate::error::{EmbedError, HttpError, TagError};
    use crate::http::{ByteStream, HttpResponse};
    use crate::progress::NoopReporter;

    #[derive(Clone, Default)]
    struct MockHttpClient {
        responses: HashMap<String, (u16, Option<String>, Vec<u8>)>,
        broken_streams: Vec<String>,
    }

    impl MockHttpClient {
        fn with_response(mut self, url: &str, status: u16, mime: Option<&str>, body: &[u8]) -> Self {
            self.responses.insert(
                url.to_string(),
                (status, mime.map(String::from), body.to_vec()),
            );
            self
        }

        fn with_broken_stream(mut self, url: &str) -> Self {
            self.responses
                .insert(url.to_string(), (200, None, b"partial".to_vec()));
            self.broken_streams.push(url.to_string());
            self
        }
    }

    #[async_trait]
    impl HttpClient for MockHttpClient {
        async fn get_bytes(&self, url: &str) -> Result<Bytes, HttpError> {
            match self.responses.get(url) {
                Some((_, _, body)) => Ok(Bytes::from(body.clone())),
                None => Err(HttpError::Other(format!("no mock for {url}"))),
            }
        }

        async fn get(&self, url: &str) -> Result<HttpResponse, HttpError> {
            let (status, content_type, body) = self
                .responses
                .get(url)
                .cloned()
                .ok_or_else(|| HttpError::Other(format!("no mock for {url}")))?;

            let len = body.len() as u64;
            let stream: ByteStream = if self.broken_streams.contains(&url.to_string()) {
                Box::pin(futures::stream::iter(vec![
                    Ok(Bytes::from(body)),
                    Err(HttpError::Other("connection reset".to_string())),
                ]))
            } else {
                Box::pin(futures::stream::once(async move { Ok(Bytes::from(body)) }))
            };

            Ok(HttpResponse {
                status,
                content_type,
                content_length: Some(len),
                body: stream,
            })
        }
    }

    /// Tag writer that accepts anything without touching the file
    #[derive(Debug, Default)]
    struct AcceptingTagWriter;

    impl TagWriter for AcceptingTagWriter {
        fn has_embedded_picture(&self, _path: &std::path::Path) -> Result<bool, TagError> {
            Ok(false)
        }

        fn write(&self, _path: &std::path::Path, _tags: &EpisodeTags) -> Result<(), TagError> {
            Ok(())
        }
    }

    #[derive(Debug, Default)]
    struct NoopEmbedder;

    #[async_trait]
    impl CoverEmbedder for NoopEmbedder {
        async fn embed(
            &self,
            _audio_path: &std::path::Path,
            _image_path: &std::path::Path,
        ) -> Result<(), EmbedError> {
            Ok(())
        }
    }

    const SAMPLE_FEED: &str = r#"<?xml version="1.0"?>
<rss version="2.0" xmlns:itunes="http://www.itunes.com/dtds/podcast-1.0.dtd">
  <channel>
    <title>Test Podcast</title>
    <description>A test podcast</description>
    <itunes:author>Test Author</itunes:author>
    <itunes:image href="https://example.com/cover.jpg"/>
    <item>
      <title>Episode 1</title>
      <enclosure url="https://example.com/ep1.mp3" type="audio/mpeg"/>
    </item>
    <item>
      <title>Episode 2</title>
      <enclosure url="https://example.com/ep2.mp3" type="audio/mpeg"/>
    </item>
    <item>
      <title>Text Only</title>
      <link>https://example.com/text-only</link>
    </item>
  </channel>
</rss>"#;

    fn mock_client() -> MockHttpClient {
        MockHttpClient::default()
            .with_response(
                "https://example.com/feed.xml",
                200,
                None,
                SAMPLE_FEED.as_bytes(),
            )
            .with_response(
                "https://example.com/cover.jpg",
                200,
                Some("image/jpeg"),
                b"cover bytes",
            )
            .with_response("https://example.com/ep1.mp3", 200, None, b"audio one")
            .with_response("https://example.com/ep2.mp3", 200, None, b"audio two")
    }

    async fn run_ingest(client: &MockHttpClient, output_dir: &std::path::Path) -> IngestResult {
        ingest_feed(
            client,
            Arc::new(AcceptingTagWriter),
            Arc::new(NoopEmbedder),
            "https://example.com/feed.xml",
            output_dir,
            &IngestOptions { max_concurrent: 3 },
            NoopReporter::shared(),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn ingest_downloads_audio_entries_and_reports_missing_audio() {
        let dir = tempdir().unwrap();
        let client = mock_client();

        let result = run_ingest(&client, dir.path()).await;

        assert_eq!(result.downloaded, 2);
        assert_eq!(result.missing_audio, 1);
        assert_eq!(result.skipped, 0);
        assert_eq!(result.failed, 0);

        assert_eq!(
            std::fs::read(dir.path().join("Episode 1.mp3")).unwrap(),
            b"audio one"
        );
        assert_eq!(
            std::fs::read(dir.path().join("Episode 2.mp3")).unwrap(),
            b"audio two"
        );
        assert!(!dir.path().join("Text Only.mp3").exists());

        // Both sidecars carry the resolved cover art
        assert_eq!(
            std::fs::read(dir.path().join("Episode 1.jpg")).unwrap(),
            b"cover bytes"
        );
        assert_eq!(
            std::fs::read(dir.path().join("Episode 2.jpg")).unwrap(),
            b"cover bytes"
        );
    }

    #[tokio::test]
    async fn second_run_skips_existing_files_untouched() {
        let dir = tempdir().unwrap();
        let client = mock_client();

        run_ingest(&client, dir.path()).await;

        let audio_path = dir.path().join("Episode 1.mp3");
        let bytes_before = std::fs::read(&audio_path).unwrap();
        let mtime_before = std::fs::metadata(&audio_path).unwrap().modified().unwrap();

        let second = run_ingest(&client, dir.path()).await;

        assert_eq!(second.downloaded, 0);
        assert_eq!(second.skipped, 2);
        assert_eq!(second.missing_audio, 1);

        assert_eq!(std::fs::read(&audio_path).unwrap(), bytes_before);
        assert_eq!(
            std::fs::metadata(&audio_path).unwrap().modified().unwrap(),
            mtime_before
        );
    }

    #[tokio::test]
    async fn one_failing_download_does_not_affect_siblings() {
        let dir = tempdir().unwrap();
        let client = MockHttpClient::default()
            .with_response(
                "https://example.com/feed.xml",
                200,
                None,
                SAMPLE_FEED.as_bytes(),
            )
            .with_response(
                "https://example.com/cover.jpg",
                200,
                Some("image/jpeg"),
                b"cover bytes",
            )
            .with_broken_stream("https://example.com/ep1.mp3")
            .with_response("https://example.com/ep2.mp3", 200, None, b"audio two");

        let result = run_ingest(&client, dir.path()).await;

        assert_eq!(result.downloaded, 1);
        assert_eq!(result.failed, 1);
        assert_eq!(result.failed_episodes.len(), 1);
        assert_eq!(result.failed_episodes[0].0, "Episode 1");

        // The failed entry's partial file is gone, the sibling is intact
        assert!(!dir.path().join("Episode 1.mp3").exists());
        assert_eq!(
            std::fs::read(dir.path().join("Episode 2.mp3")).unwrap(),
            b"audio two"
        );
    }

    #[tokio::test]
    async fn ingest_then_sweep_collapses_identical_sidecars() {
        let dir = tempdir().unwrap();
        let client = mock_client();

        run_ingest(&client, dir.path()).await;

        let outcome = sweep_duplicate_images(dir.path(), &NoopReporter::shared()).unwrap();

        assert_eq!(outcome.images_scanned, 2);
        assert_eq!(outcome.duplicates_removed, 1);

        let remaining: Vec<PathBuf> = ["Episode 1.jpg", "Episode 2.jpg"]
            .iter()
            .map(|name| dir.path().join(name))
            .filter(|p| p.exists())
            .collect();
        assert_eq!(remaining.len(), 1);

        // Audio files are never part of the sweep
        assert!(dir.path().join("Episode 1.mp3").exists());
        assert!(dir.path().join("Episode 2.mp3").exists());
    }

    #[tokio::test]
    async fn feed_fetch_failure_is_fatal() {
        let dir = tempdir().unwrap();
        let client = MockHttpClient::default();

        let result = ingest_feed(
            &client,
            Arc::new(AcceptingTagWriter),
            Arc::new(NoopEmbedder),
            "https://example.com/feed.xml",
            dir.path(),
            &IngestOptions { max_concurrent: 2 },
            NoopReporter::shared(),
        )
        .await;

        assert!(matches!(result, Err(IngestError::Feed(_))));
    }

    #[tokio::test]
    async fn feed_parse_failure_is_fatal() {
        let dir = tempdir().unwrap();
        let client = MockHttpClient::default().with_response(
            "https://example.com/feed.xml",
            200,
            None,
            b"this is not xml",
        );

        let result = ingest_feed(
            &client,
            Arc::new(AcceptingTagWriter),
            Arc::new(NoopEmbedder),
            "https://example.com/feed.xml",
            dir.path(),
            &IngestOptions { max_concurrent: 2 },
            NoopReporter::shared(),
        )
        .await;

        assert!(matches!(result, Err(IngestError::Feed(_))));
    }

    #[tokio::test]
    async fn unreachable_cover_art_is_not_fatal() {
        let dir = tempdir().unwrap();
        let client = MockHttpClient::default()
            .with_response(
                "https://example.com/feed.xml",
                200,
                None,
                SAMPLE_FEED.as_bytes(),
            )
            .with_response("https://example.com/cover.jpg", 404, None, b"")
            .with_response("https://example.com/ep1.mp3", 200, None, b"audio one")
            .with_response("https://example.com/ep2.mp3", 200, None, b"audio two");

        let result = run_ingest(&client, dir.path()).await;

        assert_eq!(result.downloaded, 2);
        // No cover art means no sidecars, but downloads proceed
        assert!(!dir.path().join("Episode 1.jpg").exists());
    }
}
