use std::path::PathBuf;
use thiserror::Error;

/// Errors produced by the HTTP client abstraction
#[derive(Error, Debug)]
pub enum HttpError {
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{0}")]
    Other(String),
}

/// Errors that can occur when fetching or parsing RSS feeds
#[derive(Error, Debug)]
pub enum FeedError {
    #[error("Failed to fetch feed from {url}: {source}")]
    FetchFailed {
        url: String,
        #[source]
        source: HttpError,
    },

    #[error("Failed to parse RSS feed: {0}")]
    ParseFailed(#[from] rss::Error),

    #[error("Invalid feed URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Errors from a single cover-art resolution step.
///
/// These never abort a run; the resolver matches on them to fall
/// through to the next source.
#[derive(Error, Debug)]
pub enum CoverArtError {
    #[error("Failed to scan feed markup: {0}")]
    Markup(#[from] quick_xml::Error),

    #[error("Failed to fetch image from {url}: {source}")]
    FetchFailed {
        url: String,
        #[source]
        source: HttpError,
    },

    #[error("HTTP error {status} for {url}")]
    HttpStatus { url: String, status: u16 },
}

/// Errors that can occur during episode downloads
#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("HTTP request failed for {url}: {source}")]
    HttpFailed {
        url: String,
        #[source]
        source: HttpError,
    },

    #[error("HTTP error {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Failed to create file {path}: {source}")]
    FileCreateFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write to file {path}: {source}")]
    FileWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Stream error while downloading {url}: {source}")]
    StreamFailed {
        url: String,
        #[source]
        source: HttpError,
    },
}

/// Errors from the audio tag container
#[derive(Error, Debug)]
pub enum TagError {
    #[error("Failed to open tag container of {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: lofty::error::LoftyError,
    },

    #[error("Failed to persist tags to {path}: {source}")]
    SaveFailed {
        path: PathBuf,
        #[source]
        source: lofty::error::LoftyError,
    },
}

/// Errors from the external cover-art embedding tool
#[derive(Error, Debug)]
pub enum EmbedError {
    #[error("Failed to launch embedding tool: {0}")]
    LaunchFailed(#[from] std::io::Error),

    #[error("Embedding tool failed: {0}")]
    ToolFailed(String),

    #[error("Failed to replace {path} with embedded output: {source}")]
    ReplaceFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Per-episode processing errors, caught at the episode boundary
#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("Download failed: {0}")]
    Download(#[from] DownloadError),

    #[error("Tag error: {0}")]
    Tag(#[from] TagError),

    #[error("Failed to write cover image {path}: {source}")]
    SidecarWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to set file times on {path}: {source}")]
    TimestampFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors that can occur during the duplicate-image sweep
#[derive(Error, Debug)]
pub enum SweepError {
    #[error("Failed to walk directory: {0}")]
    WalkFailed(#[from] walkdir::Error),

    #[error("Failed to hash {path}: {source}")]
    HashFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to remove duplicate {path}: {source}")]
    RemoveFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Top-level errors for a feed ingestion run
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Feed error: {0}")]
    Feed(#[from] FeedError),

    #[error("Failed to create directory {path}: {source}")]
    CreateDirectoryFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
