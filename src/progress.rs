use std::path::PathBuf;
use std::sync::Arc;

/// Which feed source a cover image was resolved from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverArtSource {
    /// The `itunes:image` element in the podcast namespace
    ItunesNamespace,
    /// The generic channel-level image
    ChannelImage,
}

/// Events emitted during feed ingestion for progress reporting
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Feed is being fetched from URL
    FetchingFeed { url: String },

    /// Feed has been parsed successfully
    FeedParsed {
        podcast_title: String,
        episode_count: usize,
    },

    /// Cover art was resolved from one of the feed's sources
    CoverArtResolved {
        source: CoverArtSource,
        mime_type: String,
    },

    /// No cover art could be resolved for the feed
    CoverArtUnavailable,

    /// A download is starting
    DownloadStarting {
        /// Identifies the download slot (0 to max_concurrent-1)
        download_id: usize,
        episode_title: String,
        /// Index of this episode in the feed
        episode_index: usize,
        /// Total number of episodes in the feed
        episode_count: usize,
        /// Expected content length in bytes, if known
        content_length: Option<u64>,
    },

    /// Download progress update
    DownloadProgress {
        /// Identifies the download slot
        download_id: usize,
        episode_title: String,
        bytes_downloaded: u64,
        total_bytes: Option<u64>,
    },

    /// The target file already exists, episode left untouched
    EpisodeSkipped { episode_title: String },

    /// The entry carries no audio link, episode cannot be downloaded
    EpisodeMissingAudio { episode_title: String },

    /// The downloaded file already has an embedded picture, its
    /// upstream metadata is respected
    EmbeddedArtDetected { episode_title: String },

    /// A sidecar cover image was written next to the audio file
    SidecarImageWritten {
        episode_title: String,
        path: PathBuf,
    },

    /// The external embedding tool failed; the tagged file is kept
    CoverArtEmbedFailed {
        episode_title: String,
        error: String,
    },

    /// The published date did not match the expected format; file
    /// timestamps were left untouched
    PublishedDateUnparsed {
        episode_title: String,
        raw_date: String,
    },

    /// An episode was fully processed
    EpisodeCompleted {
        /// Identifies the download slot
        download_id: usize,
        episode_title: String,
        bytes_downloaded: u64,
    },

    /// An episode failed; any partial download was removed
    EpisodeFailed {
        /// Identifies the download slot
        download_id: usize,
        episode_title: String,
        error: String,
    },

    /// The ingestion run completed
    IngestCompleted {
        downloaded_count: usize,
        skipped_count: usize,
        missing_audio_count: usize,
        failed_count: usize,
    },

    /// A byte-identical duplicate image was removed by the sweep
    DuplicateImageRemoved { path: PathBuf },

    /// The duplicate-image sweep completed
    SweepCompleted {
        images_scanned: usize,
        duplicates_removed: usize,
    },
}

/// Trait for reporting progress events during ingestion.
///
/// Implementations can use this to display progress bars, log messages,
/// or collect statistics.
pub trait ProgressReporter: Send + Sync {
    /// Report a progress event
    fn report(&self, event: ProgressEvent);
}

/// A shared reference to a progress reporter
pub type SharedProgressReporter = Arc<dyn ProgressReporter>;

/// A no-op progress reporter that silently ignores all events.
/// Useful for tests or quiet mode.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn report(&self, _event: ProgressEvent) {
        // Intentionally empty
    }
}

impl NoopReporter {
    /// Create a new NoopReporter wrapped in an Arc
    pub fn shared() -> SharedProgressReporter {
        Arc::new(Self)
    }
}
