// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use quick_xml::events::Event;
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::reader::NsReader;

use crate::error::CoverArtError;
use crate::feed::Podcast;
use crate::http::HttpClient;
use crate::progress::{CoverArtSource, ProgressEvent, SharedProgressReporter};

use super::CoverArt;

const ITUNES_NAMESPACE: Namespace<'static> =
    Namespace(b"http://www.itunes.com/dtds/podcast-1.0.dtd");

/// MIME type assumed when the image response carries no Content-Type
const DEFAULT_IMAGE_MIME: &str = "image/jpeg";

/// Resolve a single best cover image for the feed.
///
/// Sources are tried in priority order, stopping at the first success:
/// the namespaced `itunes:image` element scanned out of the raw feed
/// bytes, then the generic channel image. Every failure along the way
/// (markup error, absent element, non-2xx fetch) falls through to the
/// next source; only full exhaustion yields `None`.
pub async fn resolve_cover_art<C: HttpClient>(
    client: &C,
    raw_feed: &[u8],
    podcast: &Podcast,
    reporter: &SharedProgressReporter,
) -> Option<CoverArt> {
    if let Ok(Some(href)) = itunes_image_href(raw_feed)
        && let Ok(art) = fetch_image(client, &href).await
    {
        reporter.report(ProgressEvent::CoverArtResolved {
            source: CoverArtSource::ItunesNamespace,
            mime_type: art.mime_type.clone(),
        });
        return Some(art);
    }

    if let Some(url) = &podcast.image_url
        && let Ok(art) = fetch_image(client, url.as_str()).await
    {
        reporter.report(ProgressEvent::CoverArtResolved {
            source: CoverArtSource::ChannelImage,
            mime_type: art.mime_type.clone(),
        });
        return Some(art);
    }

    reporter.report(ProgressEvent::CoverArtUnavailable);
    None
}

/// Scan the raw feed markup for an `image` element bound to the podcast
/// namespace and return its `href` attribute.
///
/// Only the first such element is considered; the structured feed
/// parser never surfaces this element with its namespace intact, which
/// is why the raw bytes are scanned here.
fn itunes_image_href(raw_feed: &[u8]) -> Result<Option<String>, CoverArtError> {
    let mut reader = NsReader::from_reader(raw_feed);
    let mut buf = Vec::new();

    loop {
        match reader.read_resolved_event_into(&mut buf)? {
            (ResolveResult::Bound(ns), Event::Start(element) | Event::Empty(element))
                if ns == ITUNES_NAMESPACE && element.local_name().as_ref() == b"image" =>
            {
                if let Some(attr) = element
                    .try_get_attribute("href")
                    .map_err(quick_xml::Error::from)?
                {
                    let href = attr
                        .unescape_value()
                        .map_err(quick_xml::Error::from)?
                        .into_owned();
                    return Ok(Some(href));
                }
            }
            (_, Event::Eof) => return Ok(None),
            _ => {}
        }
        buf.clear();
    }
}

/// Fetch an image URL, treating any non-2xx response as a step failure
async fn fetch_image<C: HttpClient>(client: &C, url: &str) -> Result<CoverArt, CoverArtError> {
    let response = client.get(url).await.map_err(|e| CoverArtError::FetchFailed {
        url: url.to_string(),
        source: e,
    })?;

    if !(200..300).contains(&response.status) {
        return Err(CoverArtError::HttpStatus {
            url: url.to_string(),
            status: response.status,
        });
    }

    let mime_type = response
        .content_type
        .clone()
        .unwrap_or_else(|| DEFAULT_IMAGE_MIME.to_string());

    let bytes = response
        .bytes()
        .await
        .map_err(|e| CoverArtError::FetchFailed {
            url: url.to_string(),
            source: e,
        })?;

    Ok(CoverArt { bytes, mime_type })
}
