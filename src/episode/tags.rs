// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::Path;
use std::sync::Arc;

use lofty::config::WriteOptions;
use lofty::file::TaggedFileExt;
use lofty::prelude::{Accessor, TagExt};
use lofty::read_from_path;
use lofty::tag::{ItemKey, ItemValue, Tag, TagItem};

use crate::error::TagError;
use crate::feed::Episode;

/// The standardized tag set written to a downloaded episode.
///
/// This is the one place where absent feed fields become blank strings;
/// everywhere else absence stays typed as `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct EpisodeTags {
    pub title: String,
    /// Mapped to the artist field; always the podcast author
    pub artist: String,
    /// Mapped to the album field; always the podcast title
    pub album: String,
    /// Extended free-text fields as (description, value), in a fixed
    /// order
    pub extended: Vec<(String, String)>,
}

impl EpisodeTags {
    pub fn from_episode(episode: &Episode, podcast_title: &str, podcast_author: &str) -> Self {
        let text = |value: &Option<String>| value.clone().unwrap_or_default();

        let mut extended = vec![
            ("Description".to_string(), text(&episode.description)),
            ("Link".to_string(), text(&episode.link)),
            ("Published Date".to_string(), text(&episode.published)),
            ("Duration".to_string(), text(&episode.duration)),
            ("Episode Type".to_string(), text(&episode.episode_type)),
            ("Season".to_string(), text(&episode.season)),
            ("Episode".to_string(), text(&episode.episode)),
            ("Explicit".to_string(), text(&episode.explicit)),
            ("Keywords".to_string(), text(&episode.keywords)),
            ("Subtitle".to_string(), text(&episode.subtitle)),
            ("Summary".to_string(), text(&episode.summary)),
            (
                "Author".to_string(),
                episode
                    .author
                    .clone()
                    .unwrap_or_else(|| podcast_author.to_string()),
            ),
        ];

        // The episode number is asserted once more under its own tag;
        // the writer replaces by description, so the last value wins
        if let Some(number) = &episode.episode {
            extended.push(("Episode".to_string(), number.clone()));
        }

        Self {
            title: episode.title.clone(),
            artist: podcast_author.to_string(),
            album: podcast_title.to_string(),
            extended,
        }
    }
}

/// Audio tag container abstraction for testability.
///
/// The production implementation is backed by `lofty`; tests substitute
/// recording mocks the same way `HttpClient` is mocked.
pub trait TagWriter: Send + Sync {
    /// Whether the file already carries an embedded picture frame
    fn has_embedded_picture(&self, path: &Path) -> Result<bool, TagError>;

    /// Write the standardized tag set, creating a tag container if the
    /// file has none, and persist it
    fn write(&self, path: &Path, tags: &EpisodeTags) -> Result<(), TagError>;
}

/// A shared reference to a tag writer
pub type SharedTagWriter = Arc<dyn TagWriter>;

/// Default tag writer implementation using lofty
#[derive(Debug, Default, Clone, Copy)]
pub struct LoftyTagWriter;

impl LoftyTagWriter {
    /// Create a new LoftyTagWriter wrapped in an Arc
    pub fn shared() -> SharedTagWriter {
        Arc::new(Self)
    }
}

impl TagWriter for LoftyTagWriter {
    fn has_embedded_picture(&self, path: &Path) -> Result<bool, TagError> {
        let tagged_file = read_from_path(path).map_err(|e| TagError::OpenFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

        Ok(tagged_file.tags().iter().any(|tag| !tag.pictures().is_empty()))
    }

    fn write(&self, path: &Path, tags: &EpisodeTags) -> Result<(), TagError> {
        let tagged_file = read_from_path(path).map_err(|e| TagError::OpenFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

        let mut tag = tagged_file
            .primary_tag()
            .cloned()
            .unwrap_or_else(|| Tag::new(tagged_file.primary_tag_type()));

        tag.set_title(tags.title.clone());
        tag.set_artist(tags.artist.clone());
        tag.set_album(tags.album.clone());

        for (description, value) in &tags.extended {
            tag.insert(TagItem::new(
                ItemKey::Unknown(description.clone()),
                ItemValue::Text(value.clone()),
            ));
        }

        tag.save_to_path(path, WriteOptions::default())
            .map_err(|e| TagError::SaveFailed {
                path: path.to_path_buf(),
                source: e,
            })
    }
}
