mod resolve;

pub use resolve::resolve_cover_art;

use bytes::Bytes;

/// Cover artwork resolved once per feed and shared read-only across
/// all episode tasks
#[derive(Debug, Clone)]
pub struct CoverArt {
    pub bytes: Bytes,
    pub mime_type: String,
}
