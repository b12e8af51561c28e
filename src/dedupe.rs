use std::collections::HashMap;
use std::path::Path;

use walkdir::WalkDir;

use crate::error::SweepError;
use crate::hash::hash_file;
use crate::progress::{ProgressEvent, SharedProgressReporter};

/// Result of a duplicate-image sweep
#[derive(Debug, Clone, Default)]
pub struct SweepOutcome {
    /// Number of image files examined
    pub images_scanned: usize,
    /// Number of byte-identical duplicates removed
    pub duplicates_removed: usize,
}

/// Remove byte-identical duplicate cover images under a directory.
///
/// Walks the tree recursively; only files with a `jpg` extension are
/// considered, audio files never are. The first file observed with a
/// given digest is kept as the canonical copy; every later one with
/// the same digest is deleted. First-seen-wins follows directory-walk
/// order, so it is only as stable as the underlying listing order.
pub fn sweep_duplicate_images(
    directory: &Path,
    reporter: &SharedProgressReporter,
) -> Result<SweepOutcome, SweepError> {
    let mut seen: HashMap<String, std::path::PathBuf> = HashMap::new();
    let mut outcome = SweepOutcome::default();

    for entry in WalkDir::new(directory) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        if path.extension().is_none_or(|ext| ext != "jpg") {
            continue;
        }

        outcome.images_scanned += 1;

        let digest = hash_file(path).map_err(|e| SweepError::HashFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

        if seen.contains_key(&digest) {
            std::fs::remove_file(path).map_err(|e| SweepError::RemoveFailed {
                path: path.to_path_buf(),
                source: e,
            })?;
            outcome.duplicates_removed += 1;
            reporter.report(ProgressEvent::DuplicateImageRemoved {
                path: path.to_path_buf(),
            });
        } else {
            seen.insert(digest, path.to_path_buf());
        }
    }

    reporter.report(ProgressEvent::SweepCompleted {
        images_scanned: outcome.images_scanned,
        duplicates_removed: outcome.duplicates_removed,
    });

    Ok(outcome)
}
