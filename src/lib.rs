pub mod cover;
pub mod dedupe;
pub mod episode;
pub mod error;
pub mod feed;
pub mod hash;
pub mod http;
pub mod ingest;
pub mod progress;

// Re-export main types for convenience
pub use cover::{CoverArt, resolve_cover_art};
pub use dedupe::{SweepOutcome, sweep_duplicate_images};
pub use episode::{
    CoverEmbedder, EpisodeTags, LameEmbedder, LoftyTagWriter, SharedCoverEmbedder, SharedTagWriter,
    TagWriter, sanitize_stem, unique_stems,
};
pub use error::{
    CoverArtError, DownloadError, EmbedError, FeedError, HttpError, IngestError, ProcessError,
    SweepError, TagError,
};
pub use feed::{Episode, MediaLink, Podcast, fetch_feed, parse_feed};
pub use hash::hash_file;
pub use http::{HttpClient, HttpResponse, ReqwestClient};
pub use ingest::{IngestOptions, IngestResult, ingest_feed};
pub use progress::{
    CoverArtSource, NoopReporter, ProgressEvent, ProgressReporter, SharedProgressReporter,
};
