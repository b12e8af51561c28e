// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::EmbedError;

/// External cover-art embedding abstraction.
///
/// Splicing image data into an audio container is delegated to an
/// external encoder; this trait keeps that call behind a narrow,
/// mockable seam.
#[async_trait]
pub trait CoverEmbedder: Send + Sync {
    /// Embed the image into the audio file, replacing it in place
    async fn embed(&self, audio_path: &Path, image_path: &Path) -> Result<(), EmbedError>;
}

/// A shared reference to a cover embedder
pub type SharedCoverEmbedder = Arc<dyn CoverEmbedder>;

/// Default embedder implementation invoking the `lame` encoder
#[derive(Debug, Default, Clone, Copy)]
pub struct LameEmbedder;

impl LameEmbedder {
    /// Create a new LameEmbedder wrapped in an Arc
    pub fn shared() -> SharedCoverEmbedder {
        Arc::new(Self)
    }
}

fn tool_output_path(audio_path: &Path) -> PathBuf {
    let mut name = audio_path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

#[async_trait]
impl CoverEmbedder for LameEmbedder {
    async fn embed(&self, audio_path: &Path, image_path: &Path) -> Result<(), EmbedError> {
        let tool_output = tool_output_path(audio_path);

        let output = Command::new("lame")
            .arg("--ti")
            .arg(image_path)
            .arg(audio_path)
            .arg(&tool_output)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !output.status.success() {
            let _ = tokio::fs::remove_file(&tool_output).await;
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(EmbedError::ToolFailed(stderr.trim().to_string()));
        }

        tokio::fs::rename(&tool_output, audio_path)
            .await
            .map_err(|e| EmbedError::ReplaceFailed {
                path: audio_path.to_path_buf(),
                source: e,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_output_keeps_full_audio_name() {
        let path = tool_output_path(Path::new("downloads/Ep 1.mp3"));
        assert_eq!(path, PathBuf::from("downloads/Ep 1.mp3.tmp"));
    }
}
