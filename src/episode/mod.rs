mod embed;
mod locate;
mod process;
mod tags;

pub use embed::{CoverEmbedder, LameEmbedder, SharedCoverEmbedder};
pub use locate::{AUDIO_EXTENSION, IMAGE_EXTENSION, find_audio_url, sanitize_stem, unique_stems};
pub use process::{DownloadContext, IngestContext, ProcessOutcome, process_episode};
pub use tags::{EpisodeTags, LoftyTagWriter, SharedTagWriter, TagWriter};
