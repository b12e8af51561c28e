// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use bytes::Bytes;

use crate::error::FeedError;
use crate::http::HttpClient;

use super::parse::{Podcast, parse_feed};

/// Fetch raw feed bytes from a URL (without parsing).
///
/// The raw bytes are kept around because cover-art resolution scans
/// them for namespaced elements the structured parser does not expose.
pub async fn fetch_feed_bytes<C: HttpClient>(client: &C, url: &str) -> Result<Bytes, FeedError> {
    let bytes = client
        .get_bytes(url)
        .await
        .map_err(|e| FeedError::FetchFailed {
            url: url.to_string(),
            source: e,
        })?;
    Ok(bytes)
}

/// Fetch and parse a podcast feed from a URL
pub async fn fetch_feed<C: HttpClient>(client: &C, url: &str) -> Result<Podcast, FeedError> {
    let bytes = fetch_feed_bytes(client, url).await?;
    parse_feed(&bytes)
}
