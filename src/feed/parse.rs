// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use url::Url;

use crate::error::FeedError;

/// Represents a parsed podcast feed
#[derive(Debug, Clone)]
pub struct Podcast {
    pub title: Option<String>,
    pub author: Option<String>,
    pub image_url: Option<Url>,
    pub episodes: Vec<Episode>,
}

/// A link attached to an episode, with its declared media type
#[derive(Debug, Clone)]
pub struct MediaLink {
    pub href: String,
    pub mime_type: Option<String>,
}

/// Represents a single podcast episode.
///
/// Every recognized field is declared optional; absence is `None`, not
/// a defaulted string. The tag-writing step alone maps absence to blank
/// strings when building the tag container.
#[derive(Debug, Clone, Default)]
pub struct Episode {
    pub title: String,
    pub links: Vec<MediaLink>,
    pub description: Option<String>,
    pub link: Option<String>,
    /// Publication date, kept verbatim; the processor parses it with
    /// the fixed RFC-2822-style format when patching file timestamps
    pub published: Option<String>,
    pub duration: Option<String>,
    pub episode_type: Option<String>,
    pub season: Option<String>,
    pub episode: Option<String>,
    pub explicit: Option<String>,
    pub keywords: Option<String>,
    pub subtitle: Option<String>,
    pub summary: Option<String>,
    pub author: Option<String>,
}

/// Parse RSS feed XML bytes into a Podcast struct
pub fn parse_feed(xml_bytes: &[u8]) -> Result<Podcast, FeedError> {
    let channel = rss::Channel::read_from(xml_bytes)?;

    let episodes = channel.items().iter().map(parse_episode).collect();

    let image_url = channel
        .image()
        .and_then(|img| Url::parse(img.url()).ok())
        .or_else(|| {
            channel
                .itunes_ext()
                .and_then(|ext| ext.image())
                .and_then(|url| Url::parse(url).ok())
        });

    let author = channel
        .itunes_ext()
        .and_then(|ext| ext.author().map(String::from))
        .or_else(|| channel.managing_editor().map(String::from));

    Ok(Podcast {
        title: Some(channel.title().to_string()).filter(|s| !s.is_empty()),
        author,
        image_url,
        episodes,
    })
}

fn parse_episode(item: &rss::Item) -> Episode {
    let title = item
        .title()
        .map(String::from)
        .unwrap_or_else(|| "Untitled Episode".to_string());

    // The plain <link> element carries no media type; only the
    // enclosure declares one
    let mut links = Vec::new();
    if let Some(href) = item.link() {
        links.push(MediaLink {
            href: href.to_string(),
            mime_type: None,
        });
    }
    if let Some(enclosure) = item.enclosure() {
        links.push(MediaLink {
            href: enclosure.url().to_string(),
            mime_type: Some(enclosure.mime_type().to_string()).filter(|s| !s.is_empty()),
        });
    }

    let itunes = item.itunes_ext();

    Episode {
        title,
        links,
        description: item.description().map(String::from),
        link: item.link().map(String::from),
        published: item.pub_date().map(String::from),
        duration: itunes.and_then(|ext| ext.duration().map(String::from)),
        episode_type: itunes.and_then(|ext| ext.episode_type().map(String::from)),
        season: itunes.and_then(|ext| ext.season().map(String::from)),
        episode: itunes.and_then(|ext| ext.episode().map(String::from)),
        explicit: itunes.and_then(|ext| ext.explicit().map(String::from)),
        keywords: itunes.and_then(|ext| ext.keywords().map(String::from)),
        subtitle: itunes.and_then(|ext| ext.subtitle().map(String::from)),
        summary: itunes.and_then(|ext| ext.summary().map(String::from)),
        author: itunes.and_then(|ext| ext.author().map(String::from)),
    }
}
